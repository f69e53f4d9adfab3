use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::foundation::error::{ReverieError, ReverieResult};

/// Microphone acquisition failures. Both fall back to the manual affordance.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum MicrophoneError {
    /// The user refused access.
    #[error("microphone permission denied")]
    Denied,
    /// The platform has no usable microphone.
    #[error("microphone unavailable")]
    Unavailable,
}

/// Live frequency analysis stream over a microphone input.
pub trait MicrophoneStream {
    /// Fill `bins` with the current byte frequency magnitudes (`0..=255`).
    fn frequency_bins(&mut self, bins: &mut [u8]);
    /// Release the input device.
    fn stop(&mut self);
}

/// Blow detection settings.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BlowTuning {
    /// Mean bin magnitude that counts as a blow; strictly greater fires.
    pub threshold: f64,
    /// Number of frequency bins sampled per frame.
    pub bins: usize,
}

impl Default for BlowTuning {
    fn default() -> Self {
        Self {
            threshold: 60.0,
            bins: 128,
        }
    }
}

impl BlowTuning {
    /// Check the threshold and bin count.
    pub fn validate(&self) -> ReverieResult<()> {
        if !(self.threshold.is_finite() && (0.0..=255.0).contains(&self.threshold)) {
            return Err(ReverieError::validation(
                "tuning.blow.threshold must be in [0, 255]",
            ));
        }
        if self.bins == 0 {
            return Err(ReverieError::validation("tuning.blow.bins must be > 0"));
        }
        Ok(())
    }
}

/// Detector lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlowState {
    /// Not started.
    Idle,
    /// Waiting for the platform permission prompt.
    RequestingPermission,
    /// Sampling the microphone; the manual affordance is shown too.
    Monitoring,
    /// No microphone; only the manual affordance can complete.
    ManualOnly,
    /// Completed once.
    Detected,
    /// Torn down.
    Cleaned,
}

/// One-shot blow gesture detector racing microphone amplitude against a manual tap.
///
/// Whichever trigger fires first wins; every later trigger is ignored. The input stream is
/// stopped exactly once, on detection or cleanup.
pub struct BlowGestureDetector {
    tuning: BlowTuning,
    state: BlowState,
    stream: Option<Box<dyn MicrophoneStream>>,
    manual_visible: bool,
    fired: bool,
    bins: Vec<u8>,
}

impl std::fmt::Debug for BlowGestureDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlowGestureDetector")
            .field("state", &self.state)
            .field("manual_visible", &self.manual_visible)
            .field("fired", &self.fired)
            .finish_non_exhaustive()
    }
}

impl BlowGestureDetector {
    /// Create an idle detector.
    pub fn new(tuning: BlowTuning) -> Self {
        Self {
            tuning,
            state: BlowState::Idle,
            stream: None,
            manual_visible: false,
            fired: false,
            bins: vec![0; tuning.bins.max(1)],
        }
    }

    /// Current state.
    pub fn state(&self) -> BlowState {
        self.state
    }

    /// Whether the manual "tap" affordance is shown.
    pub fn manual_visible(&self) -> bool {
        self.manual_visible
    }

    /// Return `true` once the detector completed.
    pub fn has_fired(&self) -> bool {
        self.fired
    }

    /// Begin detection. Without a microphone API only the manual affordance is offered.
    pub fn start(&mut self, microphone_api: bool) {
        if self.state != BlowState::Idle {
            return;
        }
        if microphone_api {
            self.state = BlowState::RequestingPermission;
        } else {
            tracing::warn!("no microphone API; manual blow only");
            self.state = BlowState::ManualOnly;
            self.manual_visible = true;
        }
    }

    /// Deliver the outcome of the permission request.
    pub fn on_permission(&mut self, outcome: Result<Box<dyn MicrophoneStream>, MicrophoneError>) {
        if self.state != BlowState::RequestingPermission {
            if let Ok(mut stream) = outcome {
                stream.stop();
            }
            return;
        }
        match outcome {
            Ok(stream) => {
                tracing::debug!("microphone granted; monitoring");
                self.stream = Some(stream);
                self.state = BlowState::Monitoring;
            }
            Err(err) => {
                tracing::warn!(error = %err, "microphone unavailable; manual blow only");
                self.state = BlowState::ManualOnly;
            }
        }
        self.manual_visible = true;
    }

    /// Sample the stream once (per animation frame). Returns `true` when this sample fired.
    pub fn sample(&mut self) -> bool {
        if self.state != BlowState::Monitoring {
            return false;
        }
        let Some(stream) = self.stream.as_mut() else {
            return false;
        };
        stream.frequency_bins(&mut self.bins);
        let sum: u64 = self.bins.iter().map(|&b| u64::from(b)).sum();
        let mean = sum as f64 / self.bins.len() as f64;
        if mean > self.tuning.threshold {
            tracing::info!(mean, "blow detected");
            return self.fire();
        }
        false
    }

    /// Manual affordance activation. Returns `true` when this tap fired.
    pub fn tap(&mut self) -> bool {
        if !self.manual_visible {
            return false;
        }
        tracing::info!("blow triggered manually");
        self.fire()
    }

    /// Tear down: stop the stream and hide the affordance. Idempotent.
    pub fn cleanup(&mut self) {
        self.stop_stream();
        self.manual_visible = false;
        self.state = BlowState::Cleaned;
    }

    fn fire(&mut self) -> bool {
        if self.fired {
            return false;
        }
        self.fired = true;
        self.stop_stream();
        self.manual_visible = false;
        self.state = BlowState::Detected;
        true
    }

    fn stop_stream(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
        }
    }
}

/// Microphone double that replays scripted mean levels, one frame per sample.
///
/// After the script runs out it keeps reporting silence.
#[derive(Clone, Debug, Default)]
pub struct ScriptedMicrophone {
    levels: VecDeque<u8>,
    stops: Rc<Cell<u32>>,
}

impl ScriptedMicrophone {
    /// Create a stream that reports each level (flat across all bins) on successive frames.
    pub fn new(levels: impl IntoIterator<Item = u8>) -> Self {
        Self {
            levels: levels.into_iter().collect(),
            stops: Rc::new(Cell::new(0)),
        }
    }

    /// Shared counter of `stop` calls, readable after the stream is handed over.
    pub fn stop_counter(&self) -> Rc<Cell<u32>> {
        Rc::clone(&self.stops)
    }
}

impl MicrophoneStream for ScriptedMicrophone {
    fn frequency_bins(&mut self, bins: &mut [u8]) {
        let level = self.levels.pop_front().unwrap_or(0);
        bins.fill(level);
    }

    fn stop(&mut self) {
        self.stops.set(self.stops.get() + 1);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/input/blow.rs"]
mod tests;
