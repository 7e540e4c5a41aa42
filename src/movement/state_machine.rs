//! Movement domain: the character's behavioural state machine.
//!
//! One explicit mode per body, changed only through the transition table in
//! [`MovementMode::allows`]. Requests outside the table are ignored.

use bevy::prelude::*;
use serde::Serialize;

use crate::movement::{
    AXIS_DEADZONE, CapacitiveFlag, CharacterBody, Cooldown, DecayingForceSet, ForceKind,
    MoveReport, MovementInput, MovementTuning, Side, WallContactState, WallZone,
};

/// How directly a dash must run into a surface for the hit to end it.
const DASH_BLOCK_DOT: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum MovementMode {
    #[default]
    Idle,
    Run,
    Airborne,
    WallSlide,
    WallClimb,
    LedgeGrab,
    ClimbUp,
    Dash,
}

impl MovementMode {
    /// Modes attached to a wall, all of which a jump turns into a wall jump.
    pub fn is_wall_mode(self) -> bool {
        matches!(
            self,
            MovementMode::WallSlide | MovementMode::WallClimb | MovementMode::LedgeGrab
        )
    }

    /// Modes that take control away from input.
    pub fn locks_control(self) -> bool {
        matches!(self, MovementMode::ClimbUp | MovementMode::Dash)
    }

    pub fn is_grounded_mode(self) -> bool {
        matches!(self, MovementMode::Idle | MovementMode::Run)
    }

    /// The transition table.
    pub fn allows(self, to: MovementMode) -> bool {
        use MovementMode::*;

        match (self, to) {
            (from, to) if from == to => false,
            (ClimbUp, Idle | Run | Airborne) => true,
            (ClimbUp, _) => false,
            (Dash, Airborne) => true,
            (Dash, _) => false,
            (_, Dash) => true,
            (Idle, Run) | (Run, Idle) => true,
            (Idle | Run, Airborne) => true,
            (Airborne, Idle | Run | WallSlide) => true,
            (WallSlide, Airborne | Idle | Run | WallClimb | LedgeGrab) => true,
            (WallClimb, Airborne | Idle | Run | WallSlide | LedgeGrab) => true,
            (LedgeGrab, Airborne | WallSlide | ClimbUp) => true,
            _ => false,
        }
    }
}

/// Which kind of jump a tick started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JumpKind {
    Ground,
    /// Ground jump taken shortly after walking off an edge.
    Coyote,
    Air,
    Wall,
}

/// A mode change and why it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: MovementMode,
    pub to: MovementMode,
    pub reason: &'static str,
}

/// Current mode plus the timers that belong to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StateMachineState {
    pub mode: MovementMode,
    pub frames_in_mode: u32,
    /// Wall the body is attached to, kept through WallSlide, WallClimb,
    /// LedgeGrab and ClimbUp.
    pub wall_side: Option<Side>,
    pub dash_frames_left: u32,
    pub climb_frames_left: u32,
}

/// Everything the state machine reads in one tick.
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    pub tuning: &'a MovementTuning,
    pub input: &'a MovementInput,
    pub contact: &'a WallContactState,
}

#[derive(Debug, Clone, Default)]
pub struct CharacterStateMachine {
    state: StateMachineState,
    grounded: CapacitiveFlag,
    jump_request: CapacitiveFlag,
    jumped_since_grounded: bool,
    jump_cooldown: Cooldown,
    last_jump: Option<JumpKind>,
    air_jumps_remaining: u8,
    air_dash_ready: bool,
    dash_cooldown: Cooldown,
    dash_direction: Vec2,
    wall_jump_lock: Cooldown,
    wall_jump_side: Option<Side>,
    /// Set while attached to a wall, for wall jumps just after letting go.
    wall_contact: CapacitiveFlag,
    last_wall_side: Option<Side>,
    ledge_hold_frames: u32,
}

impl CharacterStateMachine {
    pub fn new(tuning: &MovementTuning) -> Self {
        Self {
            air_jumps_remaining: tuning.max_air_jumps,
            ..default()
        }
    }

    pub fn state(&self) -> &StateMachineState {
        &self.state
    }

    pub fn mode(&self) -> MovementMode {
        self.state.mode
    }

    pub fn air_jumps_remaining(&self) -> u8 {
        self.air_jumps_remaining
    }

    /// The jump started this tick, if any.
    pub fn last_jump(&self) -> Option<JumpKind> {
        self.last_jump
    }

    pub fn is_jump_ready(&self) -> bool {
        self.jump_cooldown.is_ready()
    }

    pub fn is_wall_jump_locked(&self) -> bool {
        !self.wall_jump_lock.is_ready()
    }

    /// Input direction after the wall-jump lock: pushing back toward the wall
    /// just jumped from reads as neutral until the lock runs out.
    pub fn control_axis(&self, input: &MovementInput) -> Vec2 {
        let mut axis = input.axis;
        if self.is_wall_jump_locked()
            && self.wall_jump_side.is_some()
            && Side::from_axis(axis.x) == self.wall_jump_side
        {
            axis.x = 0.0;
        }
        axis
    }

    /// Advance timers and evaluate transitions for this tick, before motion.
    pub fn step(
        &mut self,
        ctx: &StepContext,
        body: &mut CharacterBody,
        forces: &mut DecayingForceSet,
    ) -> Option<Transition> {
        let tuning = ctx.tuning;

        self.last_jump = None;
        self.state.frames_in_mode = self.state.frames_in_mode.saturating_add(1);
        self.grounded.tick(body.grounded);
        self.jump_request.tick(ctx.input.jump_just_pressed);
        self.jump_cooldown.tick();
        self.dash_cooldown.tick();
        self.wall_jump_lock.tick();
        self.wall_contact.tick(self.state.mode.is_wall_mode());
        if self.state.mode.is_wall_mode() {
            self.last_wall_side = self.state.wall_side;
        }

        if body.grounded {
            self.air_jumps_remaining = tuning.max_air_jumps;
            self.jumped_since_grounded = false;
            self.air_dash_ready = true;
            self.wall_contact.clear();
        } else if ctx.contact.zone.is_wall() {
            self.air_dash_ready = true;
        }

        let transition = self.evaluate(ctx, body, forces);
        self.update_facing(ctx.input, body);
        transition
    }

    /// React to the outcome of this tick's motion.
    pub fn after_move(&mut self, report: &MoveReport, forces: &mut DecayingForceSet) -> Option<Transition> {
        if self.state.mode != MovementMode::Dash {
            return None;
        }

        let interrupted = [report.blocked_x, report.blocked_y]
            .into_iter()
            .flatten()
            .any(|hit| self.dash_direction.dot(hit.normal) < -DASH_BLOCK_DOT);
        if interrupted {
            forces.cancel(ForceKind::Dash);
            return self.enter(MovementMode::Airborne, "dash interrupted by collision");
        }
        None
    }

    fn evaluate(
        &mut self,
        ctx: &StepContext,
        body: &mut CharacterBody,
        forces: &mut DecayingForceSet,
    ) -> Option<Transition> {
        use MovementMode::*;

        let StepContext {
            tuning,
            input,
            contact,
        } = *ctx;
        let mode = self.state.mode;

        if input.dash_just_pressed
            && mode.allows(Dash)
            && self.dash_available(tuning, body, contact)
        {
            return self.start_dash(tuning, input, body, forces, contact);
        }

        let wants_jump = self.jump_cooldown.is_ready()
            && self.jump_request.was_set_within(tuning.jump_buffer_frames);
        let control = self.control_axis(input);

        match mode {
            Dash => {
                self.state.dash_frames_left = self.state.dash_frames_left.saturating_sub(1);
                if self.state.dash_frames_left == 0 {
                    forces.cancel(ForceKind::Dash);
                    return self.enter(Airborne, "dash expired");
                }
                None
            }
            ClimbUp => {
                self.state.climb_frames_left = self.state.climb_frames_left.saturating_sub(1);
                let side = self.state.wall_side.unwrap_or(body.facing);
                if body.grounded && !contact.zone_on(side).is_wall() {
                    let next = ground_mode(body, control);
                    return self.enter(next, "climbed onto ledge");
                }
                if self.state.climb_frames_left == 0 {
                    return self.enter(Airborne, "climb-up timed out");
                }
                None
            }
            WallSlide | WallClimb | LedgeGrab if wants_jump => {
                let side = self.state.wall_side.or(contact.side).unwrap_or(body.facing);
                self.wall_jump(tuning, side, body, forces, "wall jump")
            }
            Idle | Run => {
                if wants_jump && self.can_ground_jump(tuning, body) {
                    return self.jump(tuning, body, JumpKind::Ground, "jump");
                }
                if !body.grounded {
                    return self.enter(Airborne, "left ground");
                }
                let next = ground_mode(body, control);
                self.enter(next, "speed changed")
            }
            Airborne => {
                if wants_jump {
                    if self.can_ground_jump(tuning, body) {
                        // coyote time: still counts as a ground jump
                        let kind = if body.grounded { JumpKind::Ground } else { JumpKind::Coyote };
                        return self.jump(tuning, body, kind, "coyote jump");
                    }
                    if let Some(side) = self.recent_wall(tuning) {
                        return self.wall_jump(tuning, side, body, forces, "coyote wall jump");
                    }
                    if self.air_jumps_remaining > 0 {
                        self.air_jumps_remaining -= 1;
                        return self.jump(tuning, body, JumpKind::Air, "air jump");
                    }
                }
                if body.grounded && body.velocity.y <= 0.0 {
                    let next = ground_mode(body, control);
                    return self.enter(next, "landed");
                }
                let total = body.velocity + forces.total();
                if let Some(side) = contact.side
                    && contact.zone.is_wall()
                    && total.y <= 0.0
                    && moving_into(side, control.x, total.x)
                {
                    self.state.wall_side = Some(side);
                    return self.enter(WallSlide, "falling into wall");
                }
                None
            }
            WallSlide | WallClimb => {
                if body.grounded {
                    let next = ground_mode(body, control);
                    return self.enter(next, "reached ground");
                }
                let Some(side) = self.state.wall_side else {
                    return self.enter(Airborne, "lost wall side");
                };
                let zone = contact.zone_on(side);
                let toward = Side::from_axis(control.x) == Some(side);
                let away = Side::from_axis(control.x) == Some(-side);

                if !zone.is_wall() || away {
                    return self.enter(Airborne, "left wall");
                }
                if zone == WallZone::Ledge && (toward || input.holds_up()) {
                    return self.enter(LedgeGrab, "grabbed ledge");
                }
                match mode {
                    WallSlide if zone == WallZone::Body && input.holds_up() => {
                        self.enter(WallClimb, "climbing")
                    }
                    WallClimb if !input.holds_up() => self.enter(WallSlide, "stopped climbing"),
                    _ => None,
                }
            }
            LedgeGrab => {
                let side = self.state.wall_side.unwrap_or(body.facing);
                match contact.zone_on(side) {
                    WallZone::Ledge => {}
                    WallZone::Body => return self.enter(WallSlide, "slipped below ledge"),
                    _ => return self.enter(Airborne, "ledge lost"),
                }
                let toward = Side::from_axis(control.x) == Some(side);
                if toward || input.holds_up() {
                    self.ledge_hold_frames += 1;
                } else {
                    self.ledge_hold_frames = 0;
                }
                if self.ledge_hold_frames >= tuning.ledge_climb_hold_frames.max(1) {
                    self.state.climb_frames_left = tuning.climb_up_frames;
                    return self.enter(ClimbUp, "climbing up");
                }
                None
            }
        }
    }

    fn enter(&mut self, to: MovementMode, reason: &'static str) -> Option<Transition> {
        let from = self.state.mode;
        if !from.allows(to) {
            if from != to {
                trace!("Ignored transition {:?} -> {:?} ({})", from, to, reason);
            }
            return None;
        }

        self.state.mode = to;
        self.state.frames_in_mode = 0;
        self.ledge_hold_frames = 0;
        if !to.is_wall_mode() && to != MovementMode::ClimbUp {
            self.state.wall_side = None;
        }
        debug!("Movement {:?} -> {:?}: {}", from, to, reason);
        Some(Transition { from, to, reason })
    }

    fn can_ground_jump(&self, tuning: &MovementTuning, body: &CharacterBody) -> bool {
        body.grounded
            || (!self.jumped_since_grounded && self.grounded.was_set_within(tuning.coyote_frames))
    }

    /// Wall let go of within `wall_coyote_frames`, if any.
    fn recent_wall(&self, tuning: &MovementTuning) -> Option<Side> {
        self.last_wall_side
            .filter(|_| self.wall_contact.was_set_within(tuning.wall_coyote_frames))
    }

    /// Enter Airborne for a jump. `false` when the current mode cannot jump.
    fn take_off(&mut self, reason: &'static str) -> (bool, Option<Transition>) {
        let transition = self.enter(MovementMode::Airborne, reason);
        if transition.is_none() {
            if self.state.mode != MovementMode::Airborne {
                return (false, None);
            }
            debug!("Movement Airborne: {}", reason);
        }
        (true, transition)
    }

    fn jumped(&mut self, tuning: &MovementTuning, kind: JumpKind) {
        self.jumped_since_grounded = true;
        self.jump_request.clear();
        self.jump_cooldown.reset(tuning.jump_cooldown_frames);
        self.wall_contact.clear();
        self.last_jump = Some(kind);
    }

    fn jump(
        &mut self,
        tuning: &MovementTuning,
        body: &mut CharacterBody,
        kind: JumpKind,
        reason: &'static str,
    ) -> Option<Transition> {
        let (launched, transition) = self.take_off(reason);
        if launched {
            body.velocity.y = tuning.jump_speed;
            self.jumped(tuning, kind);
        }
        transition
    }

    fn wall_jump(
        &mut self,
        tuning: &MovementTuning,
        side: Side,
        body: &mut CharacterBody,
        forces: &mut DecayingForceSet,
        reason: &'static str,
    ) -> Option<Transition> {
        let (launched, transition) = self.take_off(reason);
        if !launched {
            return None;
        }

        // outward and upward, the wall contact is released immediately
        let push = Vec2::new(-side.sign(), 1.0).normalize() * tuning.walljump_force;
        forces.cancel(ForceKind::WallJump);
        forces.spawn(
            ForceKind::WallJump,
            push,
            tuning.walljump_duration_frames,
            tuning.walljump_decay,
        );
        body.velocity = Vec2::ZERO;
        body.facing = -side;

        self.wall_jump_lock.reset(tuning.wall_jump_input_lock_frames);
        self.wall_jump_side = Some(side);
        self.air_jumps_remaining = tuning.max_air_jumps;
        self.jumped(tuning, JumpKind::Wall);
        transition
    }

    fn dash_available(&self, tuning: &MovementTuning, body: &CharacterBody, contact: &WallContactState) -> bool {
        self.dash_cooldown.is_ready()
            && (body.grounded || contact.zone.is_wall() || (tuning.air_dash && self.air_dash_ready))
    }

    fn start_dash(
        &mut self,
        tuning: &MovementTuning,
        input: &MovementInput,
        body: &mut CharacterBody,
        forces: &mut DecayingForceSet,
        contact: &WallContactState,
    ) -> Option<Transition> {
        let transition = self.enter(MovementMode::Dash, "dash")?;

        let direction = if input.axis.length() > AXIS_DEADZONE {
            input.axis.normalize()
        } else {
            Vec2::X * body.facing.sign()
        };
        forces.cancel(ForceKind::Dash);
        forces.spawn(
            ForceKind::Dash,
            direction * tuning.dash_speed,
            tuning.dash_duration_frames,
            tuning.dash_decay,
        );
        body.velocity = Vec2::ZERO;
        if let Some(side) = Side::from_axis(direction.x) {
            body.facing = side;
        }

        if !body.grounded && !contact.zone.is_wall() {
            self.air_dash_ready = false;
        }
        self.dash_direction = direction;
        self.dash_cooldown.reset(tuning.dash_cooldown_frames);
        self.state.dash_frames_left = tuning.dash_duration_frames;
        Some(transition)
    }

    fn update_facing(&self, input: &MovementInput, body: &mut CharacterBody) {
        match self.state.mode {
            MovementMode::Dash => {}
            mode if mode.is_wall_mode() || mode == MovementMode::ClimbUp => {
                if let Some(side) = self.state.wall_side {
                    body.facing = side;
                }
            }
            _ => {
                if let Some(side) = Side::from_axis(self.control_axis(input).x) {
                    body.facing = side;
                }
            }
        }
    }
}

fn ground_mode(body: &CharacterBody, control: Vec2) -> MovementMode {
    if body.velocity.x.abs() > AXIS_DEADZONE || control.x.abs() > AXIS_DEADZONE {
        MovementMode::Run
    } else {
        MovementMode::Idle
    }
}

fn moving_into(side: Side, control_x: f32, velocity_x: f32) -> bool {
    Side::from_axis(control_x) == Some(side) || velocity_x * side.sign() > AXIS_DEADZONE
}
