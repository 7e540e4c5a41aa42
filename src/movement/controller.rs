//! Movement domain: the per-body controller tying sensing, state and motion together.

use bevy::prelude::*;
use serde::Serialize;

use crate::movement::{
    CharacterBody, CharacterStateMachine, CollisionWorld, DecayingForceSet, Hitbox, JumpKind,
    MotionContext, MotionIntegrator, MoveReport, MovementInput, MovementMode, MovementTuning, Side,
    StateMachineState, StepContext, Transition, TuningError, WallContactSensor, WallContactState,
    WallZone,
};

/// Everything that changed in one simulation tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub transitions: Vec<Transition>,
    pub motion: MoveReport,
    pub contact: WallContactState,
}

/// Serializable view of a body, for logs and debugging dumps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BodySnapshot {
    pub mode: MovementMode,
    pub facing: Side,
    pub position: [f32; 2],
    /// Own velocity plus the decaying forces applied last tick.
    pub velocity: [f32; 2],
    pub zone: WallZone,
    pub wall_side: Option<Side>,
    pub grounded: bool,
    pub active_forces: usize,
}

/// Measured flight of one jump, from take-off to landing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct JumpRecord {
    pub kind: JumpKind,
    pub take_off: [f32; 2],
    /// Highest point reached, above the take-off height.
    pub apex_height: f32,
    /// Signed horizontal distance from take-off.
    pub distance: f32,
}

#[derive(Debug, Clone, Copy)]
struct JumpInFlight {
    record: JumpRecord,
    apex_logged: bool,
}

#[derive(Component, Debug, Clone)]
pub struct CharacterController {
    pub body: CharacterBody,
    integrator: MotionIntegrator,
    sensor: WallContactSensor,
    machine: CharacterStateMachine,
    forces: DecayingForceSet,
    last_report: MoveReport,
    jump_in_flight: Option<JumpInFlight>,
    last_jump: Option<JumpRecord>,
}

impl CharacterController {
    /// Build a controller for a box of `half_extents` centred at `position`.
    /// Fails if the tuning is invalid or does not fit the hitbox.
    pub fn new(tuning: &MovementTuning, half_extents: Vec2, position: Vec2) -> Result<Self, TuningError> {
        let hitbox = Hitbox::new(half_extents, tuning.corner_correction_inset);
        tuning.validate_for(&hitbox)?;

        Ok(Self {
            body: CharacterBody::at(position),
            integrator: MotionIntegrator::new(tuning, hitbox),
            sensor: WallContactSensor::new(&hitbox, tuning),
            machine: CharacterStateMachine::new(tuning),
            forces: DecayingForceSet::default(),
            last_report: MoveReport::default(),
            jump_in_flight: None,
            last_jump: None,
        })
    }

    /// One fixed tick: sense walls, evaluate transitions, then move.
    pub fn tick(&mut self, tuning: &MovementTuning, input: &MovementInput, world: &impl CollisionWorld) -> TickReport {
        let preferred = Side::from_axis(self.machine.control_axis(input).x).unwrap_or(self.body.facing);
        let contact = self.sensor.sense(
            world,
            &self.body,
            self.integrator.hitbox(),
            preferred,
            tuning.ledge_confirm_frames,
        );

        let mut transitions = Vec::new();
        let step = StepContext {
            tuning,
            input,
            contact: &contact,
        };
        transitions.extend(self.machine.step(&step, &mut self.body, &mut self.forces));
        if let Some(kind) = self.machine.last_jump() {
            self.jump_in_flight = Some(JumpInFlight {
                record: JumpRecord {
                    kind,
                    take_off: self.body.position.to_array(),
                    apex_height: 0.0,
                    distance: 0.0,
                },
                apex_logged: false,
            });
        }

        let motion = MotionContext {
            tuning,
            mode: self.machine.mode(),
            wall_side: self.machine.state().wall_side,
            control_x: self.machine.control_axis(input).x,
            contact: &contact,
        };
        let report = self
            .integrator
            .integrate(&motion, &mut self.body, &mut self.forces, world);
        transitions.extend(self.machine.after_move(&report, &mut self.forces));
        self.track_jump(tuning, &report);

        self.last_report = report;
        TickReport {
            transitions,
            motion: report,
            contact,
        }
    }

    /// Teleport to `position` and forget all motion, forces and contact history.
    pub fn respawn(&mut self, tuning: &MovementTuning, position: Vec2) {
        info!("Respawning body at {:?}", position);
        self.body = CharacterBody::at(position);
        self.sensor.reset();
        self.machine = CharacterStateMachine::new(tuning);
        self.forces.clear();
        self.last_report = MoveReport::default();
        self.jump_in_flight = None;
        self.last_jump = None;
    }

    /// Measure the jump in flight and log it against the predicted arc.
    fn track_jump(&mut self, tuning: &MovementTuning, report: &MoveReport) {
        let Some(flight) = self.jump_in_flight.as_mut() else {
            return;
        };
        let take_off = Vec2::from_array(flight.record.take_off);
        let record = &mut flight.record;
        record.apex_height = record.apex_height.max(self.body.position.y - take_off.y);
        record.distance = self.body.position.x - take_off.x;

        let arc = tuning.jump_arc();
        if !flight.apex_logged && self.body.velocity.y + report.force_total.y <= 0.0 {
            flight.apex_logged = true;
            info!(
                "{:?} jump apex {:.2} above take-off (arc predicts {:.2})",
                flight.record.kind,
                flight.record.apex_height,
                arc.apex_height()
            );
        }

        if self.body.grounded {
            let record = flight.record;
            info!(
                "{:?} jump landed {:.2} from take-off (arc predicts {:.2} at full run speed)",
                record.kind,
                record.distance,
                arc.max_jump_distance()
            );
            self.last_jump = Some(record);
            self.jump_in_flight = None;
        }
    }

    pub fn snapshot(&self) -> BodySnapshot {
        let contact = self.sensor.state();
        let velocity = self.body.velocity + self.last_report.force_total;
        BodySnapshot {
            mode: self.machine.mode(),
            facing: self.body.facing,
            position: self.body.position.to_array(),
            velocity: velocity.to_array(),
            zone: contact.zone,
            wall_side: contact.side,
            grounded: self.body.grounded,
            active_forces: self.forces.len(),
        }
    }

    pub fn mode(&self) -> MovementMode {
        self.machine.mode()
    }

    pub fn state(&self) -> &StateMachineState {
        self.machine.state()
    }

    pub fn machine(&self) -> &CharacterStateMachine {
        &self.machine
    }

    pub fn hitbox(&self) -> &Hitbox {
        self.integrator.hitbox()
    }

    /// The most recent jump that has landed.
    pub fn last_jump(&self) -> Option<&JumpRecord> {
        self.last_jump.as_ref()
    }

    pub fn sensor(&self) -> &WallContactSensor {
        &self.sensor
    }

    pub fn contact(&self) -> &WallContactState {
        self.sensor.state()
    }

    pub fn forces(&self) -> &DecayingForceSet {
        &self.forces
    }

    /// Mutable access for gameplay systems that add their own impulses.
    pub fn forces_mut(&mut self) -> &mut DecayingForceSet {
        &mut self.forces
    }

    pub fn last_report(&self) -> &MoveReport {
        &self.last_report
    }
}
