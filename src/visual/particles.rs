use crate::foundation::core::{Rng64, Time};
use crate::foundation::error::{ReverieError, ReverieResult};

/// Particle effect selected by a scene.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticleMode {
    /// No spawning; live particles finish their life.
    #[default]
    None,
    /// Falling petals.
    Petals,
}

/// Particle pool settings.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ParticleTuning {
    /// Preallocated pool size.
    pub pool_size: usize,
    /// Minimum time between automatic spawns, in milliseconds.
    pub spawn_interval_ms: f64,
    /// Life added per simulated frame, in milliseconds.
    pub frame_ms: f64,
    /// Seed for spawn randomness.
    pub seed: u64,
}

impl Default for ParticleTuning {
    fn default() -> Self {
        Self {
            pool_size: 100,
            spawn_interval_ms: 140.0,
            frame_ms: 16.0,
            seed: 0x5EED,
        }
    }
}

impl ParticleTuning {
    /// Check pool and timing settings.
    pub fn validate(&self) -> ReverieResult<()> {
        if self.pool_size == 0 {
            return Err(ReverieError::validation(
                "tuning.particles.pool_size must be > 0",
            ));
        }
        if !(self.spawn_interval_ms.is_finite() && self.spawn_interval_ms >= 0.0)
            || !(self.frame_ms.is_finite() && self.frame_ms > 0.0)
        {
            return Err(ReverieError::validation(
                "tuning.particles timings must be finite and positive",
            ));
        }
        Ok(())
    }
}

/// Maximum simultaneously drawn particles for a viewport width.
pub fn active_cap(width: f64) -> usize {
    if width < 500.0 {
        8
    } else if width < 600.0 {
        12
    } else if width < 900.0 {
        20
    } else {
        60
    }
}

/// One pooled particle. Positions are in pixels, life in milliseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Particle {
    /// Slot in use.
    pub active: bool,
    /// Horizontal position.
    pub x: f64,
    /// Vertical position.
    pub y: f64,
    /// Horizontal velocity per frame.
    pub vx: f64,
    /// Vertical velocity per frame.
    pub vy: f64,
    /// Rotation in radians.
    pub rotation: f64,
    /// Rotation speed per frame.
    pub vr: f64,
    /// Radius.
    pub size: f64,
    /// Elapsed life.
    pub life: f64,
    /// Life at which the particle retires.
    pub max_life: f64,
}

impl Particle {
    /// Fade factor, `1` when spawned and `0` at the end of its life.
    pub fn alpha(&self) -> f64 {
        if self.max_life <= 0.0 {
            return 0.0;
        }
        (1.0 - self.life / self.max_life).clamp(0.0, 1.0)
    }
}

/// Fixed-size particle pool with per-frame physics.
#[derive(Clone, Debug)]
pub struct ParticleField {
    tuning: ParticleTuning,
    mode: ParticleMode,
    pool: Vec<Particle>,
    width: f64,
    height: f64,
    max_active: usize,
    last_spawn: Time,
    rng: Rng64,
}

impl ParticleField {
    /// Create an idle field for a viewport.
    pub fn new(tuning: ParticleTuning, width: f64, height: f64) -> Self {
        Self {
            tuning,
            mode: ParticleMode::None,
            pool: vec![Particle::default(); tuning.pool_size],
            width,
            height,
            max_active: active_cap(width),
            last_spawn: Time::ZERO,
            rng: Rng64::new(tuning.seed),
        }
    }

    /// Switch the effect. Live particles keep animating.
    pub fn set_mode(&mut self, mode: ParticleMode) {
        if mode != self.mode {
            tracing::debug!(?mode, "particle mode changed");
        }
        self.mode = mode;
    }

    /// Current effect.
    pub fn mode(&self) -> ParticleMode {
        self.mode
    }

    /// Adapt to a new viewport size.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
        self.max_active = active_cap(width);
    }

    /// Active particle cap for the current viewport.
    pub fn max_active(&self) -> usize {
        self.max_active
    }

    /// Spawn up to `count` particles at once. Only petal mode spawns.
    pub fn burst(&mut self, count: usize) {
        for _ in 0..count {
            self.spawn_petal();
        }
    }

    /// Live particles.
    pub fn particles(&self) -> impl Iterator<Item = &Particle> {
        self.pool.iter().filter(|p| p.active)
    }

    /// Number of live particles.
    pub fn active_count(&self) -> usize {
        self.pool.iter().filter(|p| p.active).count()
    }

    /// Run one frame at `now`: spawn on schedule, then move and retire particles.
    pub fn advance(&mut self, now: Time) {
        if self.mode == ParticleMode::Petals
            && now.since(self.last_spawn) * 1000.0 > self.tuning.spawn_interval_ms
        {
            self.spawn_petal();
            self.last_spawn = now;
        }

        let frame_ms = self.tuning.frame_ms;
        let mut live = 0;
        for p in self.pool.iter_mut().filter(|p| p.active) {
            if live >= self.max_active {
                p.active = false;
                continue;
            }
            p.life += frame_ms;
            if p.life >= p.max_life {
                p.active = false;
                continue;
            }
            p.x += p.vx;
            p.y += p.vy;
            p.rotation += p.vr;
            p.vx += (p.life / 500.0).sin() * 0.02;
            live += 1;
        }
    }

    fn spawn_petal(&mut self) {
        if self.mode != ParticleMode::Petals {
            return;
        }
        let Some(slot) = self.pool.iter().position(|p| !p.active) else {
            return;
        };
        let rng = &mut self.rng;
        self.pool[slot] = Particle {
            active: true,
            x: rng.next_f64_01() * self.width,
            y: -20.0,
            vx: (rng.next_f64_01() - 0.5) * 0.4,
            vy: rng.range(0.4, 1.0),
            rotation: rng.next_f64_01() * std::f64::consts::TAU,
            vr: (rng.next_f64_01() - 0.5) * 0.01,
            size: rng.range(10.0, 24.0),
            life: 0.0,
            max_life: self.height * 12.0,
        };
    }
}

#[cfg(test)]
#[path = "../../tests/unit/visual/particles.rs"]
mod tests;
