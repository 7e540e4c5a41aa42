//! Movement domain: platformer locomotion for a single kinematic body.
//!
//! Each fixed tick runs sensor -> state machine -> integrator -> commit on the
//! body's [`CharacterController`]. The core only talks to the level through
//! [`CollisionWorld`], so it runs headless against [`StaticBoxWorld`] as well
//! as inside bevy against avian's spatial queries.

use bevy::input::InputSystems;
use bevy::prelude::*;

mod components;
mod controller;
mod corner;
#[cfg(feature = "dev-tools")]
mod dev;
mod forces;
mod integrator;
mod jump_arc;
mod loader;
mod resources;
mod sensor;
mod state_machine;
mod systems;
mod timers;
mod world;

#[cfg(test)]
mod tests;

pub use components::{AXIS_DEADZONE, CharacterBody, GameLayer, Hitbox, Player, Side, SideMap};
pub use controller::{BodySnapshot, CharacterController, JumpRecord, TickReport};
pub use corner::{CornerCorrection, CornerCorrectionResolver};
#[cfg(feature = "dev-tools")]
pub use dev::{MovementDebug, MovementDebugPlugin};
pub use forces::{DecayLaw, DecayingForce, DecayingForceSet, ForceKind};
pub use integrator::{
    GROUND_PROBE, MotionContext, MotionIntegrator, MoveReport, SKIN, next_horizontal_velocity,
    probe_ground,
};
pub use jump_arc::JumpArc;
pub use loader::{TUNING_PATH, TuningLoadError, load_tuning, parse_tuning, tuning_to_ron};
pub use resources::{MovementInput, MovementTuning, TuningError};
pub use sensor::{
    Band, BandHits, ProbeResults, RawContact, WallContactSensor, WallContactState, WallProbe,
    WallZone, classify,
};
pub use state_machine::{
    CharacterStateMachine, JumpKind, MovementMode, StateMachineState, StepContext, Transition,
};
pub use timers::{CapacitiveFlag, Cooldown};
pub use world::{AvianWorld, CollisionWorld, ShapeCast, ShapeCastHit, StaticBoxWorld};

use systems::{read_input, simulate_players, sync_transforms};

/// Registers movement resources and the fixed-tick simulation.
///
/// Only holds tuning that passed [`MovementTuning::validate`]; the default
/// plugin runs with [`MovementTuning::default`].
#[derive(Default)]
pub struct MovementPlugin {
    tuning: Option<MovementTuning>,
}

impl MovementPlugin {
    pub fn new(tuning: MovementTuning) -> Result<Self, TuningError> {
        tuning.validate()?;
        Ok(Self {
            tuning: Some(tuning),
        })
    }

    pub fn tuning(&self) -> Option<&MovementTuning> {
        self.tuning.as_ref()
    }
}

impl Plugin for MovementPlugin {
    fn build(&self, app: &mut App) {
        let tuning = match &self.tuning {
            Some(tuning) => tuning.clone(),
            None => {
                warn!("No movement tuning provided, using defaults");
                MovementTuning::default()
            }
        };

        let arc = tuning.jump_arc();
        info!(
            "Movement at {} Hz: jump height {:.2} in {} frames, max jump distance {:.2}",
            tuning.fps,
            arc.apex_height(),
            arc.apex_time_frames(),
            arc.max_jump_distance()
        );

        app.insert_resource(Time::<Fixed>::from_hz(f64::from(tuning.fps)))
            .insert_resource(tuning)
            .init_resource::<MovementInput>()
            .add_systems(PreUpdate, read_input.after(InputSystems))
            .add_systems(FixedUpdate, (simulate_players, sync_transforms).chain());

        #[cfg(feature = "dev-tools")]
        app.add_plugins(MovementDebugPlugin);
    }
}
