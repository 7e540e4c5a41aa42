//! Movement domain: time-bounded velocity contributors (wall-jump push, dash boost).

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// How a force shrinks over its lifetime. Both laws reach exactly zero when
/// no frames remain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DecayLaw {
    /// `remaining / lifetime` of the initial vector.
    Linear,
    /// Halves every `n` frames, clamped to zero at expiry.
    ExponentialHalfLife(f32),
}

impl DecayLaw {
    pub fn is_valid(&self) -> bool {
        match *self {
            DecayLaw::Linear => true,
            DecayLaw::ExponentialHalfLife(half_life) => half_life.is_finite() && half_life > 0.0,
        }
    }

    /// Fraction of the initial vector still applied.
    pub fn factor(&self, remaining: u32, lifetime: u32) -> f32 {
        if remaining == 0 || lifetime == 0 {
            return 0.0;
        }
        let remaining = remaining.min(lifetime);
        match *self {
            DecayLaw::Linear => remaining as f32 / lifetime as f32,
            DecayLaw::ExponentialHalfLife(half_life) if half_life > 0.0 => {
                let elapsed = (lifetime - remaining) as f32;
                0.5_f32.powf(elapsed / half_life)
            }
            DecayLaw::ExponentialHalfLife(_) => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ForceKind {
    WallJump,
    Dash,
    /// Anything else, e.g. knockback from a gameplay system.
    Impulse,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayingForce {
    pub kind: ForceKind,
    /// Contribution at spawn, in units per second.
    pub vector: Vec2,
    pub lifetime_frames: u32,
    pub remaining_frames: u32,
    pub law: DecayLaw,
}

impl DecayingForce {
    pub fn current(&self) -> Vec2 {
        self.vector * self.law.factor(self.remaining_frames, self.lifetime_frames)
    }

    pub fn magnitude(&self) -> f32 {
        self.current().length()
    }

    pub fn is_expired(&self) -> bool {
        self.remaining_frames == 0
    }
}

/// Active decaying forces, summed into the body's motion every tick.
#[derive(Debug, Default, Clone)]
pub struct DecayingForceSet {
    forces: Vec<DecayingForce>,
}

impl DecayingForceSet {
    /// Add a force. A zero lifetime spawns nothing and returns `false`.
    pub fn spawn(&mut self, kind: ForceKind, vector: Vec2, lifetime_frames: u32, law: DecayLaw) -> bool {
        if lifetime_frames == 0 || !vector.is_finite() {
            debug!("Ignored {:?} force with lifetime {}", kind, lifetime_frames);
            return false;
        }
        debug!(
            "Spawned {:?} force {:?} for {} frames ({:?})",
            kind, vector, lifetime_frames, law
        );
        self.forces.push(DecayingForce {
            kind,
            vector,
            lifetime_frames,
            remaining_frames: lifetime_frames,
            law,
        });
        true
    }

    /// Sum of the current contributions, without advancing time.
    pub fn total(&self) -> Vec2 {
        self.forces.iter().map(DecayingForce::current).sum()
    }

    /// Sum this tick's contributions, then count every force down by one
    /// frame and drop the ones that expired.
    pub fn tick(&mut self) -> Vec2 {
        let total = self.total();
        for force in &mut self.forces {
            force.remaining_frames = force.remaining_frames.saturating_sub(1);
        }
        self.forces.retain(|force| !force.is_expired());
        total
    }

    /// Drop every force of `kind`. Returns how many were removed.
    pub fn cancel(&mut self, kind: ForceKind) -> usize {
        let before = self.forces.len();
        self.forces.retain(|force| force.kind != kind);
        let removed = before - self.forces.len();
        if removed > 0 {
            debug!("Cancelled {} {:?} force(s)", removed, kind);
        }
        removed
    }

    /// Remove the part of every force that pushes into a surface with the
    /// given outward unit `normal`. Forces left with nothing are dropped.
    /// Returns how many forces were affected.
    pub fn block_against(&mut self, normal: Vec2) -> usize {
        let mut affected = 0;
        for force in &mut self.forces {
            let into = force.vector.dot(normal);
            if into < 0.0 {
                force.vector -= normal * into;
                affected += 1;
            }
        }
        self.forces
            .retain(|force| force.vector.length_squared() > f32::EPSILON);
        affected
    }

    pub fn clear(&mut self) {
        self.forces.clear();
    }

    pub fn contains(&self, kind: ForceKind) -> bool {
        self.forces.iter().any(|force| force.kind == kind)
    }

    pub fn get(&self, kind: ForceKind) -> Option<&DecayingForce> {
        self.forces.iter().find(|force| force.kind == kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DecayingForce> {
        self.forces.iter()
    }

    pub fn len(&self) -> usize {
        self.forces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forces.is_empty()
    }
}
