//! Movement domain: tests for jump math, forces, wall sensing, corner
//! correction and the controller's mode transitions.

use bevy::prelude::Vec2;

use super::{
    BandHits, CharacterController, CharacterStateMachine, CornerCorrection, CornerCorrectionResolver,
    CollisionWorld, DecayLaw, DecayingForceSet, ForceKind, Hitbox, JumpArc, JumpKind, MovementInput,
    MovementMode, MovementPlugin, MovementTuning, ProbeResults, RawContact, ShapeCast, Side,
    StaticBoxWorld, StepContext, TickReport, TuningError, TuningLoadError, WallContactSensor,
    WallContactState, WallZone, classify, next_horizontal_velocity, parse_tuning, tuning_to_ron,
};

const HALF: Vec2 = Vec2::new(1.5, 2.5);
const RIGHT: Vec2 = Vec2::X;

fn hitbox() -> Hitbox {
    Hitbox::new(HALF, 1.0)
}

fn controller_at(tuning: &MovementTuning, position: Vec2) -> CharacterController {
    CharacterController::new(tuning, HALF, position).expect("default tuning fits the hitbox")
}

/// Tick with neutral input until the body stands still on the ground.
fn settle(controller: &mut CharacterController, tuning: &MovementTuning, world: &StaticBoxWorld) {
    for _ in 0..5 {
        controller.tick(tuning, &MovementInput::default(), world);
        if controller.mode() == MovementMode::Idle && controller.body.grounded {
            return;
        }
    }
    panic!("body did not settle: {:?}", controller.snapshot());
}

fn transitioned_to(report: &TickReport, mode: MovementMode) -> bool {
    report.transitions.iter().any(|t| t.to == mode)
}

/// Floor with its top surface at y = 0.
fn floor() -> StaticBoxWorld {
    let mut world = StaticBoxWorld::new();
    world.add_bounds(Vec2::new(-50.0, -2.0), Vec2::new(50.0, 0.0));
    world
}

/// A wall whose face is at x = 10 and top at y = 10, with nothing below it.
fn ledge_world() -> StaticBoxWorld {
    let mut world = StaticBoxWorld::new();
    world.add_bounds(Vec2::new(10.0, -50.0), Vec2::new(20.0, 10.0));
    world
}

/// Body hanging 0.2 from the wall face with the wall top 2.5 above its feet.
const BESIDE_LEDGE: Vec2 = Vec2::new(8.3, 10.0);

// -----------------------------------------------------------------------------
// Jump arc tests
// -----------------------------------------------------------------------------

#[test]
fn test_jump_arc_reference_values() {
    let arc = JumpArc::new(75.0, 5.0, 20.0, 60.0).unwrap();
    assert_eq!(arc.apex_time_frames(), 15);
    assert!((arc.apex_height() - 10.0).abs() < 1e-4);
    assert!((arc.apex_height_discrete() - 10.0).abs() < 1e-4);
    assert!((arc.max_jump_distance() - 10.0).abs() < 1e-4);
}

#[test]
fn test_jump_arc_apex_is_halfway() {
    let arc = JumpArc::new(75.0, 5.0, 20.0, 60.0).unwrap();
    let to_apex = arc.run_speed * arc.apex_time_frames() as f32 / arc.fps;
    assert!((to_apex - arc.max_jump_distance() / 2.0).abs() < 1e-4);
}

#[test]
fn test_jump_arc_closed_form_matches_sum() {
    for (jump_speed, gravity) in [(75.0, 5.0), (80.0, 3.0), (41.5, 2.2), (10.0, 20.0)] {
        let arc = JumpArc::new(jump_speed, gravity, 20.0, 60.0).unwrap();
        assert!(
            (arc.apex_height() - arc.apex_height_discrete()).abs() < 1e-3,
            "{} / {}",
            jump_speed,
            gravity
        );
    }
}

#[test]
fn test_jump_arc_rounds_apex_down() {
    let arc = JumpArc::new(77.0, 5.0, 20.0, 60.0).unwrap();
    assert_eq!(arc.apex_time_frames(), 15);
}

#[test]
fn test_jump_arc_from_apex() {
    let arc = JumpArc::from_apex(10.0, 15, 20.0, 60.0).unwrap();
    assert!((arc.gravity - 5.0).abs() < 1e-4);
    assert!((arc.jump_speed - 75.0).abs() < 1e-3);
    assert_eq!(arc.apex_time_frames(), 15);
}

#[test]
fn test_jump_arc_rejects_bad_inputs() {
    assert_eq!(
        JumpArc::new(75.0, 0.0, 20.0, 60.0),
        Err(TuningError::NonPositiveGravity(0.0))
    );
    assert_eq!(
        JumpArc::new(75.0, 5.0, 20.0, -1.0),
        Err(TuningError::NonPositiveFps(-1.0))
    );
}

#[test]
fn test_tuning_jump_arc_uses_tuning() {
    let tuning = MovementTuning::default();
    let arc = tuning.jump_arc();
    assert_eq!(arc.jump_speed, tuning.jump_speed);
    assert_eq!(arc.apex_time_frames(), 15);
}

// -----------------------------------------------------------------------------
// Decaying force tests
// -----------------------------------------------------------------------------

#[test]
fn test_decay_laws_never_increase_and_end_at_zero() {
    for law in [DecayLaw::Linear, DecayLaw::ExponentialHalfLife(3.0)] {
        let mut previous = f32::INFINITY;
        for remaining in (0..=12).rev() {
            let factor = law.factor(remaining, 12);
            assert!(factor <= previous, "{:?} grew at {}", law, remaining);
            assert!((0.0..=1.0).contains(&factor));
            previous = factor;
        }
        assert_eq!(law.factor(0, 12), 0.0);
        assert_eq!(law.factor(12, 12), 1.0);
    }
}

#[test]
fn test_zero_lifetime_force_is_not_spawned() {
    let mut forces = DecayingForceSet::default();
    assert!(!forces.spawn(ForceKind::Dash, RIGHT * 60.0, 0, DecayLaw::Linear));
    assert!(forces.is_empty());
    assert_eq!(forces.tick(), Vec2::ZERO);
}

#[test]
fn test_force_set_sums_then_expires() {
    let mut forces = DecayingForceSet::default();
    forces.spawn(ForceKind::WallJump, Vec2::new(-10.0, 10.0), 2, DecayLaw::Linear);
    forces.spawn(ForceKind::Impulse, Vec2::new(0.0, 4.0), 1, DecayLaw::Linear);

    assert_eq!(forces.tick(), Vec2::new(-10.0, 14.0));
    assert_eq!(forces.len(), 1);
    assert_eq!(forces.tick(), Vec2::new(-5.0, 5.0));
    assert!(forces.is_empty());
    assert_eq!(forces.tick(), Vec2::ZERO);
}

#[test]
fn test_force_cancel_by_kind() {
    let mut forces = DecayingForceSet::default();
    forces.spawn(ForceKind::Dash, RIGHT * 60.0, 10, DecayLaw::Linear);
    forces.spawn(ForceKind::WallJump, Vec2::Y * 30.0, 10, DecayLaw::Linear);

    assert_eq!(forces.cancel(ForceKind::Dash), 1);
    assert!(!forces.contains(ForceKind::Dash));
    assert!(forces.contains(ForceKind::WallJump));
    assert_eq!(forces.cancel(ForceKind::Dash), 0);
}

#[test]
fn test_force_block_against_keeps_tangent() {
    let mut forces = DecayingForceSet::default();
    forces.spawn(ForceKind::WallJump, Vec2::new(-30.0, 30.0), 10, DecayLaw::Linear);
    forces.spawn(ForceKind::Dash, Vec2::new(-60.0, 0.0), 10, DecayLaw::Linear);
    let before = forces.get(ForceKind::WallJump).unwrap().magnitude();

    // wall on the left, its surface facing right
    assert_eq!(forces.block_against(Vec2::X), 2);

    let wall_jump = forces.get(ForceKind::WallJump).unwrap();
    assert_eq!(wall_jump.vector, Vec2::new(0.0, 30.0));
    assert!(wall_jump.magnitude() <= before);
    assert!(!forces.contains(ForceKind::Dash));
}

// -----------------------------------------------------------------------------
// Static box world tests
// -----------------------------------------------------------------------------

#[test]
fn test_box_world_cast_distance_and_normal() {
    let world = StaticBoxWorld::new().with_box(Vec2::ZERO, Vec2::splat(2.0));
    let hit = world
        .shapecast(&ShapeCast::new(Vec2::splat(0.5), Vec2::new(-5.0, 0.0), RIGHT, 10.0))
        .unwrap();
    assert!((hit.distance - 3.5).abs() < 1e-4);
    assert_eq!(hit.normal, Vec2::NEG_X);
    assert_eq!(hit.penetration, 0.0);

    let short = ShapeCast::new(Vec2::splat(0.5), Vec2::new(-5.0, 0.0), RIGHT, 3.0);
    assert!(world.shapecast(&short).is_none());
}

#[test]
fn test_box_world_touching_is_not_overlapping() {
    let world = StaticBoxWorld::new().with_box(Vec2::ZERO, Vec2::splat(2.0));
    let half = Vec2::splat(0.5);
    let resting = Vec2::new(0.0, 1.5);

    assert!(!world.overlaps(half, resting));
    assert!(world.overlaps(half, Vec2::new(0.0, 1.2)));
    // sliding along the surface is free, pressing into it is not
    assert!(world.shapecast(&ShapeCast::new(half, resting, RIGHT, 5.0)).is_none());
    let down = world
        .shapecast(&ShapeCast::new(half, resting, Vec2::NEG_Y, 5.0))
        .unwrap();
    assert_eq!(down.distance, 0.0);
    assert_eq!(down.normal, Vec2::Y);
}

#[test]
fn test_degenerate_casts_report_no_hit() {
    let world = StaticBoxWorld::new().with_box(Vec2::ZERO, Vec2::splat(2.0));
    let half = Vec2::splat(0.5);
    let origin = Vec2::new(-5.0, 0.0);

    for cast in [
        ShapeCast::new(half, origin, Vec2::ZERO, 10.0),
        ShapeCast::new(half, origin, RIGHT, -1.0),
        ShapeCast::new(half, Vec2::new(f32::NAN, 0.0), RIGHT, 10.0),
        ShapeCast::new(Vec2::ZERO, origin, RIGHT, 10.0),
        ShapeCast::new(half, origin, RIGHT, f32::INFINITY),
    ] {
        assert!(world.shapecast(&cast).is_none(), "{:?}", cast);
    }
}

// -----------------------------------------------------------------------------
// Wall zone classification tests
// -----------------------------------------------------------------------------

fn hits(step: bool, body: bool, ledge: bool) -> BandHits {
    BandHits { step, body, ledge }
}

#[test]
fn test_band_zone_priorities() {
    assert_eq!(hits(false, false, false).zone(), WallZone::None);
    assert_eq!(hits(true, false, false).zone(), WallZone::Step);
    assert_eq!(hits(false, true, false).zone(), WallZone::Ledge);
    assert_eq!(hits(true, true, false).zone(), WallZone::Ledge);
    assert_eq!(hits(true, true, true).zone(), WallZone::Body);
    assert_eq!(hits(false, true, true).zone(), WallZone::Body);
    // an overhang only at head height still reads as a wall
    assert_eq!(hits(false, false, true).zone(), WallZone::Body);
}

#[test]
fn test_classify_prefers_given_side() {
    let mut results = ProbeResults::default();
    results.bands[Side::Left] = hits(true, true, true);
    results.bands[Side::Right] = hits(false, true, false);

    let left = classify(&results, Side::Left);
    assert_eq!(left.side, Some(Side::Left));
    assert_eq!(left.zone, WallZone::Body);

    let right = classify(&results, Side::Right);
    assert_eq!(right.side, Some(Side::Right));
    assert_eq!(right.zone, WallZone::Ledge);

    results.bands[Side::Right] = BandHits::default();
    assert_eq!(classify(&results, Side::Right).side, Some(Side::Left));
}

// -----------------------------------------------------------------------------
// Ledge hysteresis tests
// -----------------------------------------------------------------------------

fn raw(zone: WallZone, side: Side) -> RawContact {
    RawContact {
        zone,
        side: Some(side),
    }
}

#[test]
fn test_ledge_entry_is_debounced() {
    let mut contact = WallContactState::default();

    contact.update(raw(WallZone::Ledge, Side::Right), 3);
    assert_eq!(contact.zone, WallZone::Body);
    assert!(contact.is_ledge_pending());

    contact.update(raw(WallZone::Ledge, Side::Right), 3);
    assert_eq!(contact.zone, WallZone::Body);

    contact.update(raw(WallZone::Ledge, Side::Right), 3);
    assert!(contact.is_ledge_confirmed());
    assert_eq!(contact.confirmed_frames, 3);
}

#[test]
fn test_ledge_exit_is_immediate() {
    for next in [WallZone::None, WallZone::Body, WallZone::Step] {
        let mut contact = WallContactState::default();
        contact.update(raw(WallZone::Ledge, Side::Right), 2);
        contact.update(raw(WallZone::Ledge, Side::Right), 2);
        assert!(contact.is_ledge_confirmed());

        contact.update(raw(next, Side::Right), 2);
        assert_eq!(contact.zone, next, "left ledge for {:?} late", next);
        assert!(!contact.is_ledge_pending());
    }
}

#[test]
fn test_interrupted_ledge_streak_restarts() {
    let mut contact = WallContactState::default();
    contact.update(raw(WallZone::Ledge, Side::Right), 2);
    contact.update(raw(WallZone::Body, Side::Right), 2);
    contact.update(raw(WallZone::Ledge, Side::Right), 2);
    assert_eq!(contact.zone, WallZone::Body);

    // switching sides is a new reading too
    contact.update(raw(WallZone::Ledge, Side::Left), 2);
    assert_eq!(contact.zone, WallZone::Body);
    assert_eq!(contact.side, Some(Side::Left));
    contact.update(raw(WallZone::Ledge, Side::Left), 2);
    assert_eq!(contact.zone_on(Side::Left), WallZone::Ledge);
    assert_eq!(contact.zone_on(Side::Right), WallZone::None);
}

#[test]
fn test_single_frame_confirm_is_immediate() {
    for frames in [0, 1] {
        let mut contact = WallContactState::default();
        contact.update(raw(WallZone::Ledge, Side::Left), frames);
        assert!(contact.is_ledge_confirmed());
    }
}

#[test]
fn test_sensor_leaves_ledge_on_first_clear_reading() {
    let tuning = MovementTuning::default();
    let world = ledge_world();
    let hitbox = hitbox();
    let mut sensor = WallContactSensor::new(&hitbox, &tuning);
    let mut body = super::CharacterBody::at(BESIDE_LEDGE);

    let first = sensor.sense(&world, &body, &hitbox, Side::Right, 2);
    assert_eq!(first.zone, WallZone::Body);
    assert_eq!(first.raw().zone, WallZone::Ledge);
    let second = sensor.sense(&world, &body, &hitbox, Side::Right, 2);
    assert_eq!(second.zone, WallZone::Ledge);
    assert_eq!(second.side, Some(Side::Right));

    body.position.y += 4.0;
    let gone = sensor.sense(&world, &body, &hitbox, Side::Right, 2);
    assert_eq!(gone.zone, WallZone::None);
}

#[test]
fn test_sensor_reads_body_step_and_out_of_reach() {
    let tuning = MovementTuning::default();
    let world = ledge_world();
    let hitbox = hitbox();
    let mut sensor = WallContactSensor::new(&hitbox, &tuning);

    let below = super::CharacterBody::at(Vec2::new(8.3, 0.0));
    assert_eq!(sensor.sense(&world, &below, &hitbox, Side::Right, 2).zone, WallZone::Body);

    // wall top half a unit above the feet
    let step = super::CharacterBody::at(Vec2::new(8.3, 12.0));
    assert_eq!(sensor.sense(&world, &step, &hitbox, Side::Right, 2).zone, WallZone::Step);

    let far = super::CharacterBody::at(Vec2::new(7.0, 0.0));
    assert_eq!(sensor.sense(&world, &far, &hitbox, Side::Right, 2).zone, WallZone::None);
}

// -----------------------------------------------------------------------------
// Corner correction tests
// -----------------------------------------------------------------------------

#[test]
fn test_resolver_clear_when_nothing_blocks() {
    let world = floor();
    let resolver = CornerCorrectionResolver::new(1.25);
    let result = resolver.resolve(&world, &hitbox(), Vec2::new(0.0, 2.51), RIGHT, &[Vec2::Y]);
    assert_eq!(result, CornerCorrection::Clear);
}

#[test]
fn test_resolver_nudges_past_overhang_corner() {
    let mut world = floor();
    world.add_bounds(Vec2::new(1.0, 6.0), Vec2::new(20.0, 8.0));
    let resolver = CornerCorrectionResolver::new(1.25);

    let result = resolver.resolve(
        &world,
        &hitbox(),
        Vec2::new(0.0, 2.51),
        Vec2::new(0.0, 1.5),
        &[Vec2::NEG_X, Vec2::X],
    );
    let CornerCorrection::Corrected(offset) = result else {
        panic!("expected a correction, got {:?}", result);
    };
    assert!(offset.x < -0.5 && offset.x > -0.55, "{:?}", offset);
    assert_eq!(offset.y, 0.0);
}

#[test]
fn test_resolver_lifts_over_step() {
    let mut world = floor();
    world.add_bounds(Vec2::new(2.0, 0.0), Vec2::new(10.0, 0.5));
    let resolver = CornerCorrectionResolver::new(1.25);

    let result = resolver.resolve(&world, &hitbox(), Vec2::new(0.0, 2.51), RIGHT, &[Vec2::Y]);
    let CornerCorrection::Corrected(offset) = result else {
        panic!("expected a correction, got {:?}", result);
    };
    assert_eq!(offset.x, 0.0);
    assert!(offset.y > 0.48 && offset.y <= 0.52, "{:?}", offset);
}

#[test]
fn test_resolver_blocks_flat_walls() {
    let mut world = floor();
    world.add_bounds(Vec2::new(2.0, 0.0), Vec2::new(10.0, 20.0));
    let resolver = CornerCorrectionResolver::new(1.25);

    let result = resolver.resolve(&world, &hitbox(), Vec2::new(0.0, 2.51), RIGHT, &[Vec2::Y]);
    assert_eq!(result, CornerCorrection::Blocked);
}

#[test]
fn test_resolver_respects_max_offset() {
    let mut world = floor();
    world.add_bounds(Vec2::new(2.0, 0.0), Vec2::new(10.0, 0.9));
    let position = Vec2::new(0.0, 2.51);

    let tight = CornerCorrectionResolver::new(0.5);
    assert_eq!(
        tight.resolve(&world, &hitbox(), position, RIGHT, &[Vec2::Y]),
        CornerCorrection::Blocked
    );

    let loose = CornerCorrectionResolver::new(1.25);
    assert!(matches!(
        loose.resolve(&world, &hitbox(), position, RIGHT, &[Vec2::Y]),
        CornerCorrection::Corrected(_)
    ));
}

#[test]
fn test_resolver_never_moves_into_geometry() {
    let mut world = floor();
    world.add_bounds(Vec2::new(2.0, 0.0), Vec2::new(10.0, 0.5));
    // low ceiling: no room to step up
    world.add_bounds(Vec2::new(-10.0, 5.1), Vec2::new(10.0, 8.0));

    let resolver = CornerCorrectionResolver::new(1.25);
    let result = resolver.resolve(&world, &hitbox(), Vec2::new(0.0, 2.51), RIGHT, &[Vec2::Y]);
    assert_eq!(result, CornerCorrection::Blocked);
}

// -----------------------------------------------------------------------------
// Horizontal acceleration tests
// -----------------------------------------------------------------------------

#[test]
fn test_horizontal_velocity_accelerates_and_brakes() {
    assert_eq!(next_horizontal_velocity(0.0, 20.0, 4.0, 5.0), 4.0);
    assert_eq!(next_horizontal_velocity(18.0, 20.0, 4.0, 5.0), 20.0);
    assert_eq!(next_horizontal_velocity(3.0, 0.0, 4.0, 5.0), 0.0);
    assert_eq!(next_horizontal_velocity(10.0, -20.0, 4.0, 5.0), 5.0);
}

#[test]
fn test_horizontal_velocity_keeps_momentum_above_max() {
    let next = next_horizontal_velocity(40.0, 20.0, 4.0, 1.0);
    assert_eq!(next, 39.0);
}

// -----------------------------------------------------------------------------
// Mode transition tests
// -----------------------------------------------------------------------------

#[test]
fn test_transition_table() {
    use MovementMode::*;

    assert!(Idle.allows(Run));
    assert!(Airborne.allows(WallSlide));
    assert!(LedgeGrab.allows(ClimbUp));
    assert!(WallClimb.allows(LedgeGrab));
    assert!(Dash.allows(Airborne));

    assert!(!Idle.allows(LedgeGrab));
    assert!(!Dash.allows(Idle));
    assert!(!ClimbUp.allows(Dash));
    assert!(!ClimbUp.allows(WallSlide));
    assert!(!Airborne.allows(Airborne));
}

/// Out of sensor reach of the ledge wall, with its top level with the chest.
const APPROACH_LEDGE: Vec2 = Vec2::new(7.9, 10.0);

/// A wall whose face is at x = 10, too tall to climb over.
fn tall_wall_world() -> StaticBoxWorld {
    let mut world = StaticBoxWorld::new();
    world.add_bounds(Vec2::new(10.0, -50.0), Vec2::new(20.0, 40.0));
    world
}

/// Drop from `start` into Airborne, then carry the body right at run speed
/// with `input` held until it starts sliding on the wall.
fn slide_into_wall(
    tuning: &MovementTuning,
    world: &StaticBoxWorld,
    start: Vec2,
    input: &MovementInput,
) -> CharacterController {
    let mut controller = controller_at(tuning, start);
    let report = controller.tick(tuning, &MovementInput::default(), world);
    assert!(transitioned_to(&report, MovementMode::Airborne));
    assert_eq!(report.contact.zone, WallZone::None);
    controller.body.velocity.x = tuning.run_speed;

    for _ in 0..3 {
        let report = controller.tick(tuning, input, world);
        if transitioned_to(&report, MovementMode::WallSlide) {
            return controller;
        }
        assert_eq!(controller.mode(), MovementMode::Airborne);
    }
    panic!("never reached the wall: {:?}", controller.snapshot());
}

/// Slide into the ledge wall and grab the ledge on the confirming tick.
fn grab_ledge(tuning: &MovementTuning, world: &StaticBoxWorld, input: &MovementInput) -> CharacterController {
    let mut controller = slide_into_wall(tuning, world, APPROACH_LEDGE, input);
    assert!(controller.contact().is_ledge_pending());

    let report = controller.tick(tuning, input, world);
    assert!(transitioned_to(&report, MovementMode::LedgeGrab), "{:?}", report.transitions);
    assert_eq!(report.contact.zone, WallZone::Ledge);
    controller
}

#[test]
fn test_wall_slide_ledge_grab_and_wall_jump() {
    let tuning = MovementTuning::default();
    let world = ledge_world();
    let toward = MovementInput::held(RIGHT);

    let mut controller = slide_into_wall(&tuning, &world, APPROACH_LEDGE, &toward);
    assert_eq!(controller.state().wall_side, Some(Side::Right));
    // the ledge is still pending on the first reading
    assert_eq!(controller.contact().zone, WallZone::Body);

    let report = controller.tick(&tuning, &toward, &world);
    assert!(transitioned_to(&report, MovementMode::LedgeGrab));
    assert_eq!(controller.body.velocity, Vec2::ZERO);

    let before = controller.body.position;
    let report = controller.tick(&tuning, &toward.with_jump(), &world);
    let jump = report.transitions.first().expect("wall jump transition");
    assert_eq!(jump.from, MovementMode::LedgeGrab);
    assert_eq!(jump.to, MovementMode::Airborne);
    assert_eq!(jump.reason, "wall jump");

    let push = controller.forces().get(ForceKind::WallJump).expect("wall jump force");
    assert!(push.vector.x < 0.0 && push.vector.y > 0.0);
    assert!(controller.body.position.x < before.x);
    assert!(controller.body.position.y > before.y);
    assert_eq!(controller.body.facing, Side::Left);
    assert_eq!(controller.state().wall_side, None);
}

#[test]
fn test_holding_up_grabs_confirmed_ledge() {
    let tuning = MovementTuning::default();
    let world = ledge_world();
    let up = MovementInput::held(Vec2::Y);

    // moving right at run speed is enough to stick to the wall
    let mut controller = slide_into_wall(&tuning, &world, APPROACH_LEDGE, &up);
    assert!(controller.contact().is_ledge_pending());
    assert_eq!(controller.mode(), MovementMode::WallSlide);

    let report = controller.tick(&tuning, &up, &world);
    assert!(report.contact.is_ledge_confirmed());
    let grab = report.transitions.first().expect("ledge grab");
    assert_eq!((grab.from, grab.to), (MovementMode::WallSlide, MovementMode::LedgeGrab));

    let report = controller.tick(&tuning, &up.with_jump(), &world);
    assert!(transitioned_to(&report, MovementMode::Airborne));
    let push = controller.forces().get(ForceKind::WallJump).expect("wall jump force");
    assert!(push.vector.x < 0.0 && push.vector.y > 0.0);
    assert_eq!(controller.machine().last_jump(), Some(JumpKind::Wall));
}

#[test]
fn test_single_ledge_reading_does_not_grab() {
    let tuning = MovementTuning::default();
    let mut machine = CharacterStateMachine::new(&tuning);
    let mut body = super::CharacterBody::at(Vec2::ZERO);
    let mut forces = DecayingForceSet::default();
    let mut contact = WallContactState::default();
    let toward = MovementInput::held(RIGHT);

    let mut step = |machine: &mut CharacterStateMachine, contact: &WallContactState| {
        let ctx = StepContext {
            tuning: &tuning,
            input: &toward,
            contact,
        };
        machine.step(&ctx, &mut body, &mut forces)
    };

    contact.update(raw(WallZone::Body, Side::Right), tuning.ledge_confirm_frames);
    step(&mut machine, &contact);
    step(&mut machine, &contact);
    assert_eq!(machine.mode(), MovementMode::WallSlide);

    // one transient ledge reading between wall readings
    contact.update(raw(WallZone::Ledge, Side::Right), tuning.ledge_confirm_frames);
    assert_eq!(step(&mut machine, &contact), None);
    contact.update(raw(WallZone::Body, Side::Right), tuning.ledge_confirm_frames);
    assert_eq!(step(&mut machine, &contact), None);
    assert_eq!(machine.mode(), MovementMode::WallSlide);

    contact.update(raw(WallZone::Ledge, Side::Right), tuning.ledge_confirm_frames);
    assert_eq!(step(&mut machine, &contact), None);
    contact.update(raw(WallZone::Ledge, Side::Right), tuning.ledge_confirm_frames);
    let grab = step(&mut machine, &contact).expect("confirmed ledge grabs");
    assert_eq!(grab.to, MovementMode::LedgeGrab);
}

#[test]
fn test_wall_jump_locks_input_toward_wall() {
    let tuning = MovementTuning::default();
    let world = ledge_world();
    let toward = MovementInput::held(RIGHT);
    let mut controller = grab_ledge(&tuning, &world, &toward);

    controller.tick(&tuning, &toward.with_jump(), &world);

    assert!(controller.machine().is_wall_jump_locked());
    assert_eq!(controller.machine().control_axis(&toward).x, 0.0);
    let away = MovementInput::held(-RIGHT);
    assert_eq!(controller.machine().control_axis(&away).x, -1.0);

    for _ in 0..tuning.wall_jump_input_lock_frames {
        controller.tick(&tuning, &MovementInput::default(), &world);
    }
    assert!(!controller.machine().is_wall_jump_locked());
    assert_eq!(controller.machine().control_axis(&toward).x, 1.0);
}

#[test]
fn test_ledge_lost_leaves_grab_same_tick() {
    let tuning = MovementTuning::default();
    let world = ledge_world();
    let mut controller = grab_ledge(&tuning, &world, &MovementInput::held(RIGHT));

    controller.tick(&tuning, &MovementInput::default(), &world);
    assert_eq!(controller.mode(), MovementMode::LedgeGrab);

    controller.body.position.y += 6.0;
    let report = controller.tick(&tuning, &MovementInput::default(), &world);
    assert_eq!(report.contact.zone, WallZone::None);
    let lost = report.transitions.first().expect("ledge lost");
    assert_eq!((lost.from, lost.to), (MovementMode::LedgeGrab, MovementMode::Airborne));
}

#[test]
fn test_ledge_grab_slips_to_wall_slide() {
    let tuning = MovementTuning::default();
    let world = ledge_world();
    let mut controller = grab_ledge(&tuning, &world, &MovementInput::held(RIGHT));

    controller.body.position.y -= 3.0;
    let report = controller.tick(&tuning, &MovementInput::default(), &world);
    assert_eq!(report.contact.zone, WallZone::Body);
    let slip = report.transitions.first().expect("slipped");
    assert_eq!((slip.from, slip.to), (MovementMode::LedgeGrab, MovementMode::WallSlide));
}

#[test]
fn test_ledge_climb_needs_held_input() {
    let tuning = MovementTuning::default();
    let world = ledge_world();
    let toward = MovementInput::held(RIGHT);
    let mut controller = grab_ledge(&tuning, &world, &toward);

    for _ in 0..3 {
        controller.tick(&tuning, &toward, &world);
    }
    // letting go of the direction restarts the hold
    controller.tick(&tuning, &MovementInput::default(), &world);
    for _ in 1..tuning.ledge_climb_hold_frames {
        controller.tick(&tuning, &toward, &world);
        assert_eq!(controller.mode(), MovementMode::LedgeGrab);
    }

    let report = controller.tick(&tuning, &toward, &world);
    let climb = report.transitions.first().expect("climb-up");
    assert_eq!((climb.from, climb.to), (MovementMode::LedgeGrab, MovementMode::ClimbUp));
}

#[test]
fn test_climb_up_ends_on_platform() {
    let tuning = MovementTuning::default();
    let world = ledge_world();
    let toward = MovementInput::held(RIGHT);
    let mut controller = grab_ledge(&tuning, &world, &toward);

    for _ in 1..tuning.ledge_climb_hold_frames {
        controller.tick(&tuning, &toward, &world);
    }
    assert_eq!(controller.mode(), MovementMode::LedgeGrab);
    let report = controller.tick(&tuning, &toward, &world);
    assert!(transitioned_to(&report, MovementMode::ClimbUp));

    let mut corrected = false;
    let mut finished = None;
    for _ in 0..tuning.climb_up_frames {
        let report = controller.tick(&tuning, &toward, &world);
        corrected |= report.motion.correction.is_some();
        assert!(!world.overlaps(HALF, controller.body.position));
        if let Some(t) = report.transitions.first() {
            finished = Some(*t);
            break;
        }
    }

    let finished = finished.expect("climb-up finished");
    assert_eq!(finished.from, MovementMode::ClimbUp);
    assert!(finished.to.is_grounded_mode(), "{:?}", finished);
    assert!(corrected);
    assert!(controller.body.grounded);
    assert!(controller.body.feet_y(controller.hitbox()) >= 10.0 - 1e-3);
    assert!(controller.body.position.x + HALF.x > 10.0);
}

#[test]
fn test_wall_climb_rises_while_up_is_held() {
    let tuning = MovementTuning::default();
    let world = tall_wall_world();
    let toward = MovementInput::held(RIGHT);
    let climb = MovementInput::held(Vec2::new(1.0, 1.0));
    let mut controller = slide_into_wall(&tuning, &world, Vec2::new(7.9, 20.0), &toward);
    assert_eq!(controller.contact().zone, WallZone::Body);

    let report = controller.tick(&tuning, &climb, &world);
    let start = report.transitions.first().expect("started climbing");
    assert_eq!((start.from, start.to), (MovementMode::WallSlide, MovementMode::WallClimb));

    let low = controller.body.position.y;
    for _ in 0..10 {
        controller.tick(&tuning, &climb, &world);
        assert_eq!(controller.mode(), MovementMode::WallClimb);
        assert!(controller.body.velocity.y <= tuning.wall_climb_speed);
    }
    assert!(controller.body.velocity.y > 0.0);
    assert!(controller.body.position.y > low);
    assert!(!world.overlaps(HALF, controller.body.position));

    let report = controller.tick(&tuning, &toward, &world);
    let stop = report.transitions.first().expect("stopped climbing");
    assert_eq!((stop.from, stop.to), (MovementMode::WallClimb, MovementMode::WallSlide));
}

#[test]
fn test_wall_jump_shortly_after_letting_go() {
    let tuning = MovementTuning::default();
    let world = tall_wall_world();
    let toward = MovementInput::held(RIGHT);
    let mut controller = slide_into_wall(&tuning, &world, Vec2::new(7.9, 20.0), &toward);

    let report = controller.tick(&tuning, &MovementInput::held(-RIGHT), &world);
    assert!(transitioned_to(&report, MovementMode::Airborne));

    let report = controller.tick(&tuning, &MovementInput::default().with_jump(), &world);
    assert!(report.transitions.is_empty());
    assert_eq!(controller.machine().last_jump(), Some(JumpKind::Wall));
    let push = controller.forces().get(ForceKind::WallJump).expect("wall jump force");
    assert!(push.vector.x < 0.0 && push.vector.y > 0.0);
    assert_eq!(controller.body.facing, Side::Left);
}

#[test]
fn test_no_wall_jump_after_wall_coyote_window() {
    let tuning = MovementTuning::default();
    let world = tall_wall_world();
    let toward = MovementInput::held(RIGHT);
    let mut controller = slide_into_wall(&tuning, &world, Vec2::new(7.9, 20.0), &toward);

    controller.tick(&tuning, &MovementInput::held(-RIGHT), &world);
    for _ in 0..=tuning.wall_coyote_frames {
        controller.tick(&tuning, &MovementInput::default(), &world);
        assert_eq!(controller.mode(), MovementMode::Airborne);
    }

    controller.tick(&tuning, &MovementInput::default().with_jump(), &world);
    assert_eq!(controller.machine().last_jump(), None);
    assert!(!controller.forces().contains(ForceKind::WallJump));
    assert!(controller.body.velocity.y < 0.0);
}

#[test]
fn test_coyote_jump_after_leaving_edge() {
    let tuning = MovementTuning::default();
    let mut world = StaticBoxWorld::new();
    world.add_bounds(Vec2::new(-20.0, -2.0), Vec2::new(0.0, 0.0));
    let mut controller = controller_at(&tuning, Vec2::new(-1.6, 2.51));
    settle(&mut controller, &tuning, &world);

    let run = MovementInput::held(RIGHT);
    for _ in 0..60 {
        controller.tick(&tuning, &run, &world);
        if controller.mode() == MovementMode::Airborne {
            break;
        }
    }
    assert_eq!(controller.mode(), MovementMode::Airborne);
    assert!(!controller.body.grounded);

    controller.tick(&tuning, &run.with_jump(), &world);
    assert!(controller.body.velocity.y > tuning.jump_speed - 2.0 * tuning.gravity);
}

#[test]
fn test_no_coyote_jump_after_window() {
    let tuning = MovementTuning::default();
    let mut world = StaticBoxWorld::new();
    world.add_bounds(Vec2::new(-20.0, -2.0), Vec2::new(0.0, 0.0));
    let mut controller = controller_at(&tuning, Vec2::new(-1.6, 2.51));
    settle(&mut controller, &tuning, &world);

    let run = MovementInput::held(RIGHT);
    while controller.mode() != MovementMode::Airborne {
        controller.tick(&tuning, &run, &world);
    }
    for _ in 0..tuning.coyote_frames + 3 {
        controller.tick(&tuning, &run, &world);
    }

    controller.tick(&tuning, &run.with_jump(), &world);
    assert!(controller.body.velocity.y < 0.0);
}

#[test]
fn test_air_jump_uses_charge() {
    let tuning = MovementTuning {
        max_air_jumps: 1,
        ..MovementTuning::default()
    };
    let world = floor();
    let mut controller = controller_at(&tuning, Vec2::new(0.0, 2.51));
    settle(&mut controller, &tuning, &world);

    controller.tick(&tuning, &MovementInput::default().with_jump(), &world);
    for _ in 0..20 {
        controller.tick(&tuning, &MovementInput::default(), &world);
    }
    assert!(controller.body.velocity.y < 0.0);

    controller.tick(&tuning, &MovementInput::default().with_jump(), &world);
    assert!(controller.body.velocity.y > 0.0);
    assert_eq!(controller.machine().air_jumps_remaining(), 0);
}

#[test]
fn test_jump_cooldown_ignores_early_press() {
    let tuning = MovementTuning {
        max_air_jumps: 1,
        ..MovementTuning::default()
    };
    let world = floor();
    let mut controller = controller_at(&tuning, Vec2::new(0.0, 2.51));
    settle(&mut controller, &tuning, &world);

    controller.tick(&tuning, &MovementInput::default().with_jump(), &world);
    assert_eq!(controller.machine().last_jump(), Some(JumpKind::Ground));
    assert!(!controller.machine().is_jump_ready());

    controller.tick(&tuning, &MovementInput::default().with_jump(), &world);
    assert_eq!(controller.machine().last_jump(), None);
    assert_eq!(controller.machine().air_jumps_remaining(), 1);

    for _ in 0..tuning.jump_cooldown_frames {
        controller.tick(&tuning, &MovementInput::default(), &world);
    }
    assert!(controller.machine().is_jump_ready());
    assert_eq!(controller.machine().air_jumps_remaining(), 1);
    let rising = controller.body.velocity.y;

    controller.tick(&tuning, &MovementInput::default().with_jump(), &world);
    assert_eq!(controller.machine().last_jump(), Some(JumpKind::Air));
    assert_eq!(controller.machine().air_jumps_remaining(), 0);
    assert!(controller.body.velocity.y > rising);
}

#[test]
fn test_landing_records_measured_jump() {
    let tuning = MovementTuning::default();
    let world = floor();
    let mut controller = controller_at(&tuning, Vec2::new(0.0, 2.51));
    settle(&mut controller, &tuning, &world);

    controller.tick(&tuning, &MovementInput::default().with_jump(), &world);
    assert!(controller.last_jump().is_none());
    for _ in 0..60 {
        controller.tick(&tuning, &MovementInput::default(), &world);
        if controller.last_jump().is_some() {
            break;
        }
    }

    let record = controller.last_jump().expect("landed");
    assert_eq!(record.kind, JumpKind::Ground);
    // gravity already applies on the take-off tick
    assert!((record.apex_height - 8.75).abs() < 0.05, "{:?}", record);
    assert!(record.apex_height <= tuning.jump_arc().apex_height() + 1e-3);
    assert!(record.distance.abs() < 1e-3);
    assert!(controller.body.grounded);
}

#[test]
fn test_anti_head_bonk_during_jump() {
    let tuning = MovementTuning::default();
    let mut world = floor();
    world.add_bounds(Vec2::new(1.0, 6.0), Vec2::new(20.0, 8.0));
    let mut controller = controller_at(&tuning, Vec2::new(0.0, 2.51));
    settle(&mut controller, &tuning, &world);

    let report = controller.tick(&tuning, &MovementInput::default().with_jump(), &world);
    let offset = report.motion.correction.expect("corner correction");
    assert!(offset.x < -0.5 && offset.x >= -tuning.corner_correction_max_offset);
    assert!(report.motion.blocked_y.is_none());
    assert!(controller.body.velocity.y > 0.0);
    assert!(!world.overlaps(HALF, controller.body.position));
}

#[test]
fn test_dash_interrupted_by_wall() {
    let tuning = MovementTuning::default();
    let mut world = floor();
    world.add_bounds(Vec2::new(5.0, 0.0), Vec2::new(10.0, 20.0));
    let mut controller = controller_at(&tuning, Vec2::new(0.0, 2.51));
    settle(&mut controller, &tuning, &world);

    let report = controller.tick(&tuning, &MovementInput::held(RIGHT).with_dash(), &world);
    assert!(transitioned_to(&report, MovementMode::Dash));
    assert!(controller.forces().contains(ForceKind::Dash));

    let mut interrupted = None;
    for _ in 0..tuning.dash_duration_frames {
        let report = controller.tick(&tuning, &MovementInput::held(RIGHT), &world);
        if let Some(t) = report.transitions.first() {
            interrupted = Some(*t);
            break;
        }
    }

    let interrupted = interrupted.expect("dash ended");
    assert_eq!(interrupted.to, MovementMode::Airborne);
    assert_eq!(interrupted.reason, "dash interrupted by collision");
    assert!(!controller.forces().contains(ForceKind::Dash));
    assert!(controller.body.position.x + HALF.x <= 5.0);
}

#[test]
fn test_dash_expires_in_open_space() {
    let tuning = MovementTuning::default();
    let world = floor();
    let mut controller = controller_at(&tuning, Vec2::new(-40.0, 2.51));
    settle(&mut controller, &tuning, &world);

    controller.tick(&tuning, &MovementInput::default().with_dash(), &world);
    assert_eq!(controller.mode(), MovementMode::Dash);

    let mut ticks = 0;
    while controller.mode() == MovementMode::Dash {
        controller.tick(&tuning, &MovementInput::default(), &world);
        ticks += 1;
        assert!(ticks <= tuning.dash_duration_frames);
    }
    assert_eq!(controller.mode(), MovementMode::Airborne);
    assert!(!controller.forces().contains(ForceKind::Dash));

    // cooldown blocks an immediate second dash
    controller.tick(&tuning, &MovementInput::default().with_dash(), &world);
    assert_ne!(controller.mode(), MovementMode::Dash);
}

#[test]
fn test_respawn_resets_motion_and_contact() {
    let tuning = MovementTuning::default();
    let world = ledge_world();
    let mut controller = controller_at(&tuning, BESIDE_LEDGE);
    let toward = MovementInput::held(RIGHT);
    controller.tick(&tuning, &toward, &world);
    controller.tick(&tuning, &toward.with_jump(), &world);

    controller.respawn(&tuning, Vec2::new(0.0, 30.0));
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.mode, MovementMode::Idle);
    assert_eq!(snapshot.position, [0.0, 30.0]);
    assert_eq!(snapshot.velocity, [0.0, 0.0]);
    assert_eq!(snapshot.zone, WallZone::None);
    assert_eq!(snapshot.active_forces, 0);
}

// -----------------------------------------------------------------------------
// Tuning tests
// -----------------------------------------------------------------------------

#[test]
fn test_default_tuning_is_valid() {
    let tuning = MovementTuning::default();
    assert_eq!(tuning.validate(), Ok(()));
    assert_eq!(tuning.validate_for(&hitbox()), Ok(()));
}

#[test]
fn test_tuning_validation_errors() {
    let base = MovementTuning::default();

    let no_gravity = MovementTuning {
        gravity: 0.0,
        ..base.clone()
    };
    assert_eq!(no_gravity.validate(), Err(TuningError::NonPositiveGravity(0.0)));

    let negative = MovementTuning {
        run_speed: -1.0,
        ..base.clone()
    };
    assert!(matches!(
        negative.validate(),
        Err(TuningError::InvalidValue { field: "run_speed", .. })
    ));

    let bad_decay = MovementTuning {
        dash_decay: DecayLaw::ExponentialHalfLife(0.0),
        ..base.clone()
    };
    assert!(matches!(
        bad_decay.validate(),
        Err(TuningError::InvalidDecayLaw { field: "dash_decay", .. })
    ));

    let wide_bands = MovementTuning {
        step_band_height: 2.0,
        ledge_band_height: 3.0,
        ..base.clone()
    };
    assert!(matches!(
        wide_bands.validate_for(&hitbox()),
        Err(TuningError::BandsExceedHitbox { .. })
    ));

    let flat_ledge = MovementTuning {
        ledge_band_height: 0.0,
        ..base.clone()
    };
    assert!(matches!(
        flat_ledge.validate(),
        Err(TuningError::NonPositive { field: "ledge_band_height", .. })
    ));
    assert!(CharacterController::new(&flat_ledge, HALF, Vec2::ZERO).is_err());

    let deep_inset = MovementTuning {
        corner_correction_inset: 1.5,
        ..base
    };
    assert!(matches!(
        CharacterController::new(&deep_inset, HALF, Vec2::ZERO),
        Err(TuningError::InsetExceedsHitbox { .. })
    ));
}

#[test]
fn test_plugin_accepts_only_valid_tuning() {
    let still = MovementTuning {
        fps: 0.0,
        ..MovementTuning::default()
    };
    assert!(matches!(
        MovementPlugin::new(still),
        Err(TuningError::NonPositiveFps(_))
    ));

    let plugin = MovementPlugin::new(MovementTuning::default()).unwrap();
    assert_eq!(plugin.tuning(), Some(&MovementTuning::default()));
    assert!(MovementPlugin::default().tuning().is_none());
}

#[test]
fn test_tuning_ron_round_trip() {
    let tuning = MovementTuning {
        gravity: 4.0,
        dash_decay: DecayLaw::ExponentialHalfLife(4.5),
        air_dash: false,
        ..MovementTuning::default()
    };
    let text = tuning_to_ron(&tuning).unwrap();
    let parsed = parse_tuning(&text, "round_trip.ron").unwrap();
    assert_eq!(parsed, tuning);
}

#[test]
fn test_partial_ron_uses_defaults() {
    let parsed = parse_tuning("(jump_speed: 60.0, walljump_decay: Linear)", "partial.ron").unwrap();
    assert_eq!(parsed.jump_speed, 60.0);
    assert_eq!(parsed.gravity, MovementTuning::default().gravity);
}

#[test]
fn test_bad_ron_is_rejected() {
    assert!(matches!(
        parse_tuning("(gravity: -1.0)", "negative.ron"),
        Err(TuningLoadError::Invalid { .. })
    ));
    assert!(matches!(
        parse_tuning("(gravity: ", "broken.ron"),
        Err(TuningLoadError::Parse { .. })
    ));
}

#[test]
fn test_missing_tuning_file_is_not_an_error() {
    let path = std::path::Path::new("does/not/exist/movement.ron");
    assert!(matches!(super::load_tuning(path), Ok(None)));
}

#[test]
fn test_shipped_tuning_file_loads() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/movement.ron");
    let tuning = super::load_tuning(&path).unwrap().expect("assets/movement.ron exists");
    assert_eq!(tuning, MovementTuning::default());
}
