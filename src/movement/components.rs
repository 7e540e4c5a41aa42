//! Movement domain: components, sides and physics layers for locomotion.

use std::ops::{Index, IndexMut, Neg};

use avian2d::prelude::*;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Inputs with an absolute value below this are treated as neutral.
pub const AXIS_DEADZONE: f32 = 0.1;

/// Physics layers for collision filtering
#[derive(PhysicsLayer, Clone, Copy, Debug, Default)]
pub enum GameLayer {
    #[default]
    Default,
    /// Ground surfaces (floors, platforms)
    Ground,
    /// Wall surfaces
    Wall,
    /// Player character
    Player,
}

#[derive(Component, Debug)]
pub struct Player;

/// Horizontal side, used both for facing and for which wall is being touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Side {
    Left,
    #[default]
    Right,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

    /// `-1.0` for left, `1.0` for right.
    #[inline]
    pub fn sign(self) -> f32 {
        match self {
            Side::Left => -1.0,
            Side::Right => 1.0,
        }
    }

    /// The side a horizontal value points to, or `None` inside the deadzone.
    pub fn from_axis(x: f32) -> Option<Side> {
        if x > AXIS_DEADZONE {
            Some(Side::Right)
        } else if x < -AXIS_DEADZONE {
            Some(Side::Left)
        } else {
            None
        }
    }
}

impl Neg for Side {
    type Output = Side;

    fn neg(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// A pair of values indexed by [`Side`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SideMap<A> {
    pub left: A,
    pub right: A,
}

impl<A> Index<Side> for SideMap<A> {
    type Output = A;

    fn index(&self, side: Side) -> &A {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }
}

impl<A> IndexMut<Side> for SideMap<A> {
    fn index_mut(&mut self, side: Side) -> &mut A {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }
}

/// Kinematic state of the controlled body. Mutated only by the simulation tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CharacterBody {
    /// Centre of the hitbox, in world units.
    pub position: Vec2,
    /// Self-driven velocity in units per second (gravity, jumps, run input).
    /// Decaying forces are added on top of this when moving.
    pub velocity: Vec2,
    pub facing: Side,
    pub grounded: bool,
}

impl CharacterBody {
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            ..default()
        }
    }

    /// World-space y of the body's feet for the given hitbox.
    pub fn feet_y(&self, hitbox: &Hitbox) -> f32 {
        self.position.y - hitbox.half_extents.y
    }
}

/// Collision shape of the body: the full box and the reduced "corner" box
/// used to decide whether a blocked move may clip past a corner.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Hitbox {
    pub half_extents: Vec2,
    /// How much the reduced box is shrunk on the axis perpendicular to motion.
    pub corner_inset: f32,
}

impl Hitbox {
    pub fn new(half_extents: Vec2, corner_inset: f32) -> Self {
        Self {
            half_extents,
            corner_inset,
        }
    }

    pub fn full(&self) -> Vec2 {
        self.half_extents
    }

    pub fn height(&self) -> f32 {
        self.half_extents.y * 2.0
    }

    /// Reduced half extents for a move along `motion`: the axis perpendicular
    /// to the dominant motion axis loses `corner_inset`.
    pub fn reduced(&self, motion: Vec2) -> Vec2 {
        let mut reduced = self.half_extents;
        if motion.x.abs() >= motion.y.abs() {
            reduced.y = (reduced.y - self.corner_inset).max(f32::EPSILON);
        } else {
            reduced.x = (reduced.x - self.corner_inset).max(f32::EPSILON);
        }
        reduced
    }
}
