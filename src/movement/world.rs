//! Movement domain: world collision queries.
//!
//! The movement core never owns level geometry. It asks a [`CollisionWorld`]
//! to sweep axis-aligned boxes, either through avian's spatial query pipeline
//! or through [`StaticBoxWorld`] for headless simulation.

use avian2d::prelude::*;
use bevy::math::bounding::Aabb2d;
use bevy::prelude::*;

use crate::movement::GameLayer;

/// Overlaps shallower than this are treated as touching, not penetrating.
const TOUCH_TOLERANCE: f32 = 1e-4;

/// A box swept from `origin` along `direction` for up to `max_distance`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeCast {
    pub half_extents: Vec2,
    pub origin: Vec2,
    pub direction: Vec2,
    pub max_distance: f32,
}

impl ShapeCast {
    pub fn new(half_extents: Vec2, origin: Vec2, direction: Vec2, max_distance: f32) -> Self {
        Self {
            half_extents,
            origin,
            direction,
            max_distance,
        }
    }

    /// Sweep covering the vector `motion` exactly.
    pub fn along(half_extents: Vec2, origin: Vec2, motion: Vec2) -> Self {
        let distance = motion.length();
        let direction = if distance > 0.0 { motion / distance } else { Vec2::ZERO };
        Self::new(half_extents, origin, direction, distance)
    }

    /// Queries that cannot be answered meaningfully: non-finite values, an
    /// empty box, no direction or a negative distance.
    pub fn is_degenerate(&self) -> bool {
        !self.half_extents.is_finite()
            || !self.origin.is_finite()
            || !self.direction.is_finite()
            || !self.max_distance.is_finite()
            || self.half_extents.min_element() <= 0.0
            || self.direction.length_squared() < 1e-12
            || self.max_distance < 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeCastHit {
    /// Distance travelled along the normalized direction before contact.
    pub distance: f32,
    /// Outward surface normal of the obstacle.
    pub normal: Vec2,
    /// Overlap depth at the origin, zero when the box starts clear.
    pub penetration: f32,
}

/// Synchronous collision queries into a static or kinematic world.
///
/// Implementations answer degenerate queries with `None` instead of failing.
pub trait CollisionWorld {
    fn shapecast(&self, cast: &ShapeCast) -> Option<ShapeCastHit>;

    /// Whether a box placed at `origin` overlaps any solid geometry.
    fn overlaps(&self, half_extents: Vec2, origin: Vec2) -> bool {
        self.shapecast(&ShapeCast::new(half_extents, origin, Vec2::Y, 0.0))
            .is_some_and(|hit| hit.penetration > 0.0)
    }
}

// ============================================================================
// Avian adapter
// ============================================================================

/// Shape-casts through avian's [`SpatialQuery`], against ground and wall layers.
pub struct AvianWorld<'a, 'w, 's> {
    spatial_query: &'a SpatialQuery<'w, 's>,
    filter: SpatialQueryFilter,
}

impl<'a, 'w, 's> AvianWorld<'a, 'w, 's> {
    /// Query view for `body`, which is excluded from its own casts.
    pub fn new(spatial_query: &'a SpatialQuery<'w, 's>, body: Entity) -> Self {
        let filter = SpatialQueryFilter::from_mask([GameLayer::Ground, GameLayer::Wall])
            .with_excluded_entities([body]);
        Self {
            spatial_query,
            filter,
        }
    }
}

impl CollisionWorld for AvianWorld<'_, '_, '_> {
    fn shapecast(&self, cast: &ShapeCast) -> Option<ShapeCastHit> {
        if cast.is_degenerate() {
            return None;
        }
        let direction = Dir2::new(cast.direction).ok()?;
        let shape = Collider::rectangle(cast.half_extents.x * 2.0, cast.half_extents.y * 2.0);

        self.spatial_query
            .cast_shape(
                &shape,
                cast.origin,
                0.0,
                direction,
                &ShapeCastConfig {
                    max_distance: cast.max_distance,
                    ignore_origin_penetration: false,
                    ..default()
                },
                &self.filter,
            )
            .map(|hit| ShapeCastHit {
                distance: hit.distance,
                normal: hit.normal2,
                // avian reports a zero distance for overlapping starts but no depth
                penetration: 0.0,
            })
    }

    fn overlaps(&self, half_extents: Vec2, origin: Vec2) -> bool {
        if !half_extents.is_finite() || !origin.is_finite() || half_extents.min_element() <= 0.0 {
            return false;
        }
        // shrink by the touch tolerance so resting contact does not count
        let shrunk = (half_extents - TOUCH_TOLERANCE).max(Vec2::splat(f32::EPSILON));
        let shape = Collider::rectangle(shrunk.x * 2.0, shrunk.y * 2.0);
        !self
            .spatial_query
            .shape_intersections(&shape, origin, 0.0, &self.filter)
            .is_empty()
    }
}

// ============================================================================
// Static box world
// ============================================================================

/// A world made of solid axis-aligned boxes, with exact swept-box queries.
/// Boxes that only touch are not considered overlapping.
#[derive(Debug, Clone, Default)]
pub struct StaticBoxWorld {
    solids: Vec<Aabb2d>,
}

impl StaticBoxWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a solid box from its centre and full size.
    pub fn with_box(mut self, center: Vec2, size: Vec2) -> Self {
        self.add_box(center, size);
        self
    }

    pub fn add_box(&mut self, center: Vec2, size: Vec2) {
        self.solids.push(Aabb2d::new(center, size * 0.5));
    }

    /// Add a solid box from its min and max corners.
    pub fn add_bounds(&mut self, min: Vec2, max: Vec2) {
        self.solids.push(Aabb2d { min, max });
    }

    pub fn solids(&self) -> &[Aabb2d] {
        &self.solids
    }

    fn cast_against(solid: &Aabb2d, cast: &ShapeCast, direction: Vec2) -> Option<ShapeCastHit> {
        if !solid.min.is_finite() || !solid.max.is_finite() || solid.min.cmpgt(solid.max).any() {
            return None;
        }

        // Minkowski sum: sweeping the box is a ray against the expanded solid
        let min = solid.min - cast.half_extents;
        let max = solid.max + cast.half_extents;
        let inner_min = min + TOUCH_TOLERANCE;
        let inner_max = max - TOUCH_TOLERANCE;
        if inner_min.cmpge(inner_max).any() {
            return None;
        }

        let o = cast.origin;
        if o.cmpgt(inner_min).all() && o.cmplt(inner_max).all() {
            let depths = [
                (o.x - min.x, Vec2::NEG_X),
                (max.x - o.x, Vec2::X),
                (o.y - min.y, Vec2::NEG_Y),
                (max.y - o.y, Vec2::Y),
            ];
            let (penetration, normal) = depths
                .into_iter()
                .min_by(|a, b| a.0.total_cmp(&b.0))
                .unwrap_or((0.0, Vec2::Y));
            return Some(ShapeCastHit {
                distance: 0.0,
                normal,
                penetration,
            });
        }

        let (enter, exit, _) = slab_interval(o, direction, inner_min, inner_max)?;
        if enter >= exit || enter < 0.0 || enter >= cast.max_distance {
            return None;
        }

        // report the exact contact distance against the unshrunk solid
        let (exact_enter, _, axis) = slab_interval(o, direction, min, max)?;
        let normal = if axis == 0 {
            Vec2::new(-direction.x.signum(), 0.0)
        } else {
            Vec2::new(0.0, -direction.y.signum())
        };
        Some(ShapeCastHit {
            distance: exact_enter.max(0.0),
            normal,
            penetration: 0.0,
        })
    }
}

/// Ray/box slab test. Returns the entry and exit parameters and the axis the
/// ray enters through (0 = x, 1 = y).
fn slab_interval(origin: Vec2, direction: Vec2, min: Vec2, max: Vec2) -> Option<(f32, f32, usize)> {
    let mut enter = f32::NEG_INFINITY;
    let mut exit = f32::INFINITY;
    let mut enter_axis = 0;

    for axis in 0..2 {
        let (o, d, lo, hi) = (origin[axis], direction[axis], min[axis], max[axis]);
        if d.abs() < 1e-12 {
            if o <= lo || o >= hi {
                return None;
            }
            continue;
        }
        let t1 = (lo - o) / d;
        let t2 = (hi - o) / d;
        let (near, far) = if t1 < t2 { (t1, t2) } else { (t2, t1) };
        if near > enter {
            enter = near;
            enter_axis = axis;
        }
        exit = exit.min(far);
    }

    Some((enter, exit, enter_axis))
}

impl CollisionWorld for StaticBoxWorld {
    fn shapecast(&self, cast: &ShapeCast) -> Option<ShapeCastHit> {
        if cast.is_degenerate() {
            return None;
        }
        let direction = cast.direction.normalize();

        self.solids
            .iter()
            .filter_map(|solid| Self::cast_against(solid, cast, direction))
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}
