//! Movement domain: wall contact sensing.
//!
//! Thin probe boxes are swept sideways from both edges of the body at heights
//! in three bands measured from the feet:
//!
//! ```text
//!   +-----+   ledge band  [h - ledge_band_height, h]
//!   |     |
//!   |     |   body band   between the other two
//!   |     |
//!   +-----+   step band   [0, step_band_height)
//! ```
//!
//! The raw zone is recomputed from probe geometry every tick. Entering
//! `Ledge` is debounced over `ledge_confirm_frames` ticks; every other change,
//! including leaving `Ledge`, is applied on the tick it is observed.

use bevy::prelude::*;
use serde::Serialize;

use crate::movement::{
    CharacterBody, CollisionWorld, Hitbox, MovementTuning, ShapeCast, Side, SideMap,
};

const PROBE_HALF_WIDTH: f32 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum WallZone {
    #[default]
    None,
    /// A wall covering the body band or higher.
    Body,
    /// A wall whose top edge sits below the ledge band: climbable.
    Ledge,
    /// A low obstacle confined to the step band.
    Step,
}

impl WallZone {
    /// Whether the zone is a wall surface the body can slide on.
    pub fn is_wall(self) -> bool {
        matches!(self, WallZone::Body | WallZone::Ledge)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Band {
    Step,
    Body,
    Ledge,
}

/// One probe height on each side of the body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallProbe {
    pub band: Band,
    /// Height of the probe centre above the feet.
    pub height: f32,
}

/// Which bands reported a hit on one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BandHits {
    pub step: bool,
    pub body: bool,
    pub ledge: bool,
}

impl BandHits {
    fn record(&mut self, band: Band) {
        match band {
            Band::Step => self.step = true,
            Band::Body => self.body = true,
            Band::Ledge => self.ledge = true,
        }
    }

    /// Zone for one side, highest platform assist first: Ledge > Step > Body.
    pub fn zone(&self) -> WallZone {
        let ledge = self.body && !self.ledge;
        let step = self.step && !self.body;
        let body = self.body || self.ledge;

        if ledge {
            WallZone::Ledge
        } else if step {
            WallZone::Step
        } else if body {
            WallZone::Body
        } else {
            WallZone::None
        }
    }
}

/// Per-probe hit results for both sides, from a single tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbeResults {
    pub hits: SideMap<Vec<bool>>,
    pub bands: SideMap<BandHits>,
}

/// Zone and side straight from the probes, before hysteresis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawContact {
    pub zone: WallZone,
    pub side: Option<Side>,
}

/// Pick the contact to act on. `preferred` is tried first, then its opposite.
pub fn classify(results: &ProbeResults, preferred: Side) -> RawContact {
    for side in [preferred, -preferred] {
        let zone = results.bands[side].zone();
        if zone != WallZone::None {
            return RawContact {
                zone,
                side: Some(side),
            };
        }
    }
    RawContact::default()
}

/// Debounced wall contact, recomputed every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WallContactState {
    pub zone: WallZone,
    pub side: Option<Side>,
    /// Consecutive ticks the probes reported the current raw reading.
    pub confirmed_frames: u32,
    raw: RawContact,
}

impl WallContactState {
    /// Fold in this tick's raw reading.
    ///
    /// A raw `Ledge` only becomes the zone after `ledge_confirm_frames`
    /// consecutive readings; until then the wall reads as `Body`. Any other
    /// reading replaces the zone at once, so a ledge is left on the first tick
    /// the probes stop seeing it.
    pub fn update(&mut self, raw: RawContact, ledge_confirm_frames: u32) {
        if raw == self.raw {
            self.confirmed_frames = self.confirmed_frames.saturating_add(1);
        } else {
            self.raw = raw;
            self.confirmed_frames = 1;
        }

        self.side = raw.side;
        self.zone = if raw.zone == WallZone::Ledge && self.confirmed_frames < ledge_confirm_frames {
            WallZone::Body
        } else {
            raw.zone
        };
    }

    pub fn raw(&self) -> RawContact {
        self.raw
    }

    pub fn is_ledge_confirmed(&self) -> bool {
        self.zone == WallZone::Ledge
    }

    /// The probes see a ledge that has not been confirmed yet.
    pub fn is_ledge_pending(&self) -> bool {
        self.raw.zone == WallZone::Ledge && self.zone != WallZone::Ledge
    }

    /// Zone on `side`, or `None` when the contact is on the other side.
    pub fn zone_on(&self, side: Side) -> WallZone {
        if self.side == Some(side) {
            self.zone
        } else {
            WallZone::None
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Probe layout plus the debounced state for one body.
#[derive(Debug, Clone, Default)]
pub struct WallContactSensor {
    probes: Vec<WallProbe>,
    probe_half_height: f32,
    reach: f32,
    last_results: ProbeResults,
    state: WallContactState,
}

impl WallContactSensor {
    pub fn new(hitbox: &Hitbox, tuning: &MovementTuning) -> Self {
        let height = hitbox.height();
        let step_top = tuning.step_band_height;
        let ledge_bottom = height - tuning.ledge_band_height;

        let mut probes = Vec::with_capacity(5);
        if tuning.step_band_height > 0.0 {
            probes.push(WallProbe {
                band: Band::Step,
                height: step_top * 0.5,
            });
        }
        for fraction in [1.0 / 3.0, 2.0 / 3.0] {
            probes.push(WallProbe {
                band: Band::Body,
                height: step_top + (ledge_bottom - step_top) * fraction,
            });
        }
        if tuning.ledge_band_height > 0.0 {
            for fraction in [0.25, 0.75] {
                probes.push(WallProbe {
                    band: Band::Ledge,
                    height: ledge_bottom + tuning.ledge_band_height * fraction,
                });
            }
        }

        let smallest_band = [tuning.step_band_height, tuning.ledge_band_height, ledge_bottom - step_top]
            .into_iter()
            .filter(|band| *band > 0.0)
            .fold(height, f32::min);

        Self {
            probes,
            probe_half_height: (smallest_band * 0.125).max(f32::EPSILON),
            reach: tuning.wall_detection_distance,
            last_results: ProbeResults::default(),
            state: WallContactState::default(),
        }
    }

    pub fn probes(&self) -> &[WallProbe] {
        &self.probes
    }

    pub fn state(&self) -> &WallContactState {
        &self.state
    }

    pub fn last_results(&self) -> &ProbeResults {
        &self.last_results
    }

    pub fn reach(&self) -> f32 {
        self.reach
    }

    /// Half extents of one probe box.
    pub fn probe_half_extents(&self) -> Vec2 {
        Vec2::new(PROBE_HALF_WIDTH, self.probe_half_height)
    }

    /// Start position of `probe` on `side`: flush with the inside of the hitbox edge.
    pub fn probe_origin(&self, body: &CharacterBody, hitbox: &Hitbox, probe: &WallProbe, side: Side) -> Vec2 {
        Vec2::new(
            body.position.x + side.sign() * (hitbox.half_extents.x - PROBE_HALF_WIDTH),
            body.feet_y(hitbox) + probe.height,
        )
    }

    /// Sweep every probe on both sides.
    pub fn probe(&self, world: &impl CollisionWorld, body: &CharacterBody, hitbox: &Hitbox) -> ProbeResults {
        let mut results = ProbeResults::default();
        let half_extents = self.probe_half_extents();

        for side in Side::BOTH {
            let mut hits = Vec::with_capacity(self.probes.len());
            for probe in &self.probes {
                let origin = self.probe_origin(body, hitbox, probe, side);
                let cast = ShapeCast::new(half_extents, origin, Vec2::X * side.sign(), self.reach);
                let hit = world.shapecast(&cast).is_some();
                if hit {
                    results.bands[side].record(probe.band);
                }
                hits.push(hit);
            }
            results.hits[side] = hits;
        }

        results
    }

    /// Probe the world and fold the reading into the debounced state.
    ///
    /// `preferred` is the side to report when both sides touch something:
    /// the input direction if any, else the facing.
    pub fn sense(
        &mut self,
        world: &impl CollisionWorld,
        body: &CharacterBody,
        hitbox: &Hitbox,
        preferred: Side,
        ledge_confirm_frames: u32,
    ) -> WallContactState {
        let results = self.probe(world, body, hitbox);
        let raw = classify(&results, preferred);
        self.state.update(raw, ledge_confirm_frames);
        self.last_results = results;
        self.state
    }

    pub fn reset(&mut self) {
        self.state.reset();
        self.last_results = ProbeResults::default();
    }
}
