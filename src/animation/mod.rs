pub mod ease;
pub mod sway;
pub mod timers;
pub mod tween;
