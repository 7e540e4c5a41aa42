//! Movement domain: corner correction.
//!
//! When a move is blocked only by the corner of a solid, the body may be
//! nudged sideways (relative to the motion) just far enough to slip past it.
//! The same routine pushes the body onto a ledge while climbing up, lifts it
//! over steps, and slides it around the edge of an overhang when a jump
//! clips it ("anti head-bonk").

use bevy::prelude::*;

use crate::movement::{CollisionWorld, Hitbox, ShapeCast};

/// Coarse steps tried before bisecting toward the smallest working offset.
const COARSE_STEPS: u32 = 8;
const BISECT_ITERATIONS: u32 = 12;
/// Clearance kept between the corrected body and the corner.
const CORRECTION_SKIN: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CornerCorrection {
    /// The full hitbox is not blocked along the motion.
    Clear,
    /// Shift the body by this offset, then the motion is clear.
    Corrected(Vec2),
    /// No valid correction; resolve as an ordinary blocking collision.
    Blocked,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CornerCorrectionResolver {
    pub max_offset: f32,
}

impl CornerCorrectionResolver {
    pub fn new(max_offset: f32) -> Self {
        Self { max_offset }
    }

    /// Try to clip `motion` past a corner from `position`.
    ///
    /// `directions` are the unit offsets allowed, perpendicular to `motion`.
    /// A committed offset never exceeds `max_offset`, is the smallest found
    /// that clears the full hitbox, and is re-validated before returning.
    pub fn resolve(
        &self,
        world: &impl CollisionWorld,
        hitbox: &Hitbox,
        position: Vec2,
        motion: Vec2,
        directions: &[Vec2],
    ) -> CornerCorrection {
        let full = hitbox.full();
        if motion.length_squared() <= f32::EPSILON
            || world.shapecast(&ShapeCast::along(full, position, motion)).is_none()
        {
            return CornerCorrection::Clear;
        }

        // Only corners qualify: the reduced box must pass where the full one cannot
        let reduced = hitbox.reduced(motion);
        if world.shapecast(&ShapeCast::along(reduced, position, motion)).is_some() {
            return CornerCorrection::Blocked;
        }

        let best = directions
            .iter()
            .filter(|direction| direction.length_squared() > f32::EPSILON)
            .filter_map(|direction| {
                let direction = direction.normalize();
                let offset = self.min_offset(world, full, position, motion, direction)?;
                let clearance = self.clearance(world, full, position + direction * offset, direction);
                Some((direction * offset, offset, clearance))
            })
            .min_by(|a, b| b.2.total_cmp(&a.2).then(a.1.total_cmp(&b.1)));

        let Some((offset, _, _)) = best else {
            return CornerCorrection::Blocked;
        };

        if self.validate(world, full, position, offset, motion) {
            CornerCorrection::Corrected(offset)
        } else {
            CornerCorrection::Blocked
        }
    }

    /// Smallest shift along `direction` after which `motion` is clear, padded
    /// by a small skin but never past `max_offset`.
    fn min_offset(
        &self,
        world: &impl CollisionWorld,
        full: Vec2,
        position: Vec2,
        motion: Vec2,
        direction: Vec2,
    ) -> Option<f32> {
        if self.max_offset <= 0.0 {
            return None;
        }
        let clears = |shift: f32| -> bool {
            let shifted = position + direction * shift;
            world
                .shapecast(&ShapeCast::new(full, position, direction, shift))
                .is_none()
                && world.shapecast(&ShapeCast::along(full, shifted, motion)).is_none()
        };

        let step = self.max_offset / COARSE_STEPS as f32;
        let mut lower = 0.0;
        let mut upper = None;
        for i in 1..=COARSE_STEPS {
            let shift = step * i as f32;
            if clears(shift) {
                upper = Some(shift);
                break;
            }
            lower = shift;
        }
        let mut upper = upper?;

        for _ in 0..BISECT_ITERATIONS {
            let mid = (lower + upper) * 0.5;
            if clears(mid) {
                upper = mid;
            } else {
                lower = mid;
            }
        }

        let padded = (upper + CORRECTION_SKIN).min(self.max_offset);
        Some(if clears(padded) { padded } else { upper })
    }

    /// Free distance along `direction`; farther means fewer obstructions nearby.
    fn clearance(&self, world: &impl CollisionWorld, full: Vec2, position: Vec2, direction: Vec2) -> f32 {
        world
            .shapecast(&ShapeCast::new(full, position, direction, self.max_offset * 2.0))
            .map_or(f32::INFINITY, |hit| hit.distance)
    }

    /// Re-check the full hitbox at the corrected position.
    fn validate(&self, world: &impl CollisionWorld, full: Vec2, position: Vec2, offset: Vec2, motion: Vec2) -> bool {
        let corrected = position + offset;
        offset.length() <= self.max_offset + f32::EPSILON
            && !world.overlaps(full, corrected)
            && world.shapecast(&ShapeCast::along(full, position, offset)).is_none()
            && world.shapecast(&ShapeCast::along(full, corrected, motion)).is_none()
    }
}
