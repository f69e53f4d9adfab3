use crate::assets::catalog::AssetCatalog;

/// Transient image stacked above a layer while it crossfades.
#[derive(Clone, Debug, PartialEq)]
pub struct Overlay {
    /// Incoming image identifier.
    pub image: String,
    /// Overlay opacity in `[0, 1]`.
    pub opacity: f64,
}

/// One parallax depth layer of a scene background.
#[derive(Clone, Debug, PartialEq)]
pub struct Layer {
    /// Depth coefficient, driving parallax and sway amplitude.
    pub depth: f64,
    /// Committed image identifier.
    pub image: String,
    /// Opacity of the committed image.
    pub opacity: f64,
    /// Incoming image while a crossfade is in flight.
    pub overlay: Option<Overlay>,
}

impl Layer {
    /// Sum of base and overlay opacity.
    pub fn combined_opacity(&self) -> f64 {
        self.opacity + self.overlay.as_ref().map_or(0.0, |o| o.opacity)
    }

    fn commit(&mut self) {
        if let Some(overlay) = self.overlay.take() {
            self.image = overlay.image;
        }
        self.opacity = 1.0;
    }
}

/// Ordered depth layers belonging to one scene.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerSet {
    /// Folder holding the scene's background images.
    pub folder: String,
    /// Layers, back to front.
    pub layers: Vec<Layer>,
}

impl LayerSet {
    /// Build a set with every layer showing `image` at full opacity.
    pub fn new(folder: impl Into<String>, depths: &[f64], image: &str) -> Self {
        Self {
            folder: folder.into(),
            layers: depths
                .iter()
                .map(|&depth| Layer {
                    depth,
                    image: image.to_owned(),
                    opacity: 1.0,
                    overlay: None,
                })
                .collect(),
        }
    }

    /// The image shared by every layer, or `None` while layers disagree or a crossfade runs.
    pub fn current_image(&self) -> Option<&str> {
        let first = self.layers.first()?;
        let settled = self
            .layers
            .iter()
            .all(|l| l.overlay.is_none() && l.image == first.image);
        settled.then_some(first.image.as_str())
    }

    /// Path of the committed image of layer `index`.
    pub fn image_path(&self, index: usize) -> Option<String> {
        self.layers
            .get(index)
            .map(|l| AssetCatalog::image_path(&self.folder, &l.image))
    }

    /// Show `image` on every layer immediately.
    pub fn set_all(&mut self, image: &str) {
        for layer in &mut self.layers {
            layer.image = image.to_owned();
            layer.opacity = 1.0;
            layer.overlay = None;
        }
    }

    pub(crate) fn commit_layer(&mut self, index: usize) {
        if let Some(layer) = self.layers.get_mut(index) {
            layer.commit();
        }
    }

    pub(crate) fn commit_all(&mut self) {
        for layer in &mut self.layers {
            layer.commit();
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/visual/layers.rs"]
mod tests;
