pub mod crossfade;
pub mod layers;
pub mod particles;
pub mod text;
