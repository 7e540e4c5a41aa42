//! Movement domain: debug overlay for wall probes, hitboxes and state.
//!
//! F2 toggles the overlay. F3 logs the committed body snapshot as JSON.

use bevy::prelude::*;

use crate::movement::{CharacterController, Player, Side};

const PROBE_HIT_COLOR: Color = Color::srgb(1.0, 0.55, 0.1);
const PROBE_CLEAR_COLOR: Color = Color::srgb(0.2, 0.45, 1.0);
const HITBOX_COLOR: Color = Color::srgb(0.3, 0.9, 0.4);
const REDUCED_HITBOX_COLOR: Color = Color::srgba(0.3, 0.9, 0.4, 0.35);

/// Whether the movement overlay is drawn
#[derive(Resource, Debug)]
pub struct MovementDebug {
    pub visible: bool,
}

impl Default for MovementDebug {
    fn default() -> Self {
        Self { visible: true }
    }
}

/// Marker for the mode/zone status text
#[derive(Component, Debug)]
pub struct MovementStatusText;

pub struct MovementDebugPlugin;

impl Plugin for MovementDebugPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<MovementDebug>()
            .add_systems(Startup, spawn_status_text)
            .add_systems(
                Update,
                (
                    toggle_overlay,
                    dump_snapshot,
                    draw_probes,
                    draw_hitboxes,
                    update_status_text,
                )
                    .chain(),
            );
    }
}

fn spawn_status_text(mut commands: Commands) {
    commands.spawn((
        MovementStatusText,
        Text::new(""),
        TextFont {
            font_size: 14.0,
            ..default()
        },
        TextColor(Color::srgb(0.9, 0.9, 0.9)),
        Node {
            position_type: PositionType::Absolute,
            left: Val::Px(12.0),
            top: Val::Px(12.0),
            ..default()
        },
    ));
}

fn toggle_overlay(keyboard: Res<ButtonInput<KeyCode>>, mut overlay: ResMut<MovementDebug>) {
    if keyboard.just_pressed(KeyCode::F2) {
        overlay.visible = !overlay.visible;
        info!("Movement overlay {}", if overlay.visible { "on" } else { "off" });
    }
}

fn dump_snapshot(keyboard: Res<ButtonInput<KeyCode>>, query: Query<&CharacterController, With<Player>>) {
    if !keyboard.just_pressed(KeyCode::F3) {
        return;
    }
    for controller in &query {
        match serde_json::to_string(&controller.snapshot()) {
            Ok(json) => info!("Body snapshot: {}", json),
            Err(err) => warn!("Failed to serialize body snapshot: {}", err),
        }
    }
}

fn draw_probes(
    overlay: Res<MovementDebug>,
    mut gizmos: Gizmos,
    query: Query<&CharacterController, With<Player>>,
) {
    if !overlay.visible {
        return;
    }

    for controller in &query {
        let sensor = controller.sensor();
        let results = sensor.last_results();
        let half_extents = sensor.probe_half_extents();

        for side in Side::BOTH {
            for (index, probe) in sensor.probes().iter().enumerate() {
                let hit = results.hits[side].get(index).copied().unwrap_or(false);
                let color = if hit { PROBE_HIT_COLOR } else { PROBE_CLEAR_COLOR };
                let origin = sensor.probe_origin(&controller.body, controller.hitbox(), probe, side);
                let reach = Vec2::X * side.sign() * (sensor.reach() + half_extents.x);

                gizmos.rect_2d(Isometry2d::from_translation(origin), half_extents * 2.0, color);
                gizmos.ray_2d(origin, reach, color);
            }
        }
    }
}

fn draw_hitboxes(
    overlay: Res<MovementDebug>,
    mut gizmos: Gizmos,
    query: Query<&CharacterController, With<Player>>,
) {
    if !overlay.visible {
        return;
    }

    for controller in &query {
        let hitbox = controller.hitbox();
        let center = Isometry2d::from_translation(controller.body.position);
        gizmos.rect_2d(center, hitbox.full() * 2.0, HITBOX_COLOR);
        gizmos.rect_2d(center, hitbox.reduced(Vec2::X) * 2.0, REDUCED_HITBOX_COLOR);
        gizmos.rect_2d(center, hitbox.reduced(Vec2::Y) * 2.0, REDUCED_HITBOX_COLOR);
    }
}

fn update_status_text(
    overlay: Res<MovementDebug>,
    query: Query<&CharacterController, With<Player>>,
    mut text_query: Query<&mut Text, With<MovementStatusText>>,
) {
    let Ok(mut text) = text_query.single_mut() else {
        return;
    };
    let Some(controller) = query.iter().next() else {
        text.0.clear();
        return;
    };
    if !overlay.visible {
        text.0.clear();
        return;
    }

    let snapshot = controller.snapshot();
    let last_jump = controller
        .last_jump()
        .map(|jump| {
            format!(
                "{:?} jump {:.2} high, {:.2} across",
                jump.kind, jump.apex_height, jump.distance
            )
        })
        .unwrap_or_default();
    text.0 = format!(
        "{:?} facing {:?}\nzone {:?} {:?}\nvel ({:.1}, {:.1}) grounded {}\nforces {}\n{}",
        snapshot.mode,
        snapshot.facing,
        snapshot.zone,
        snapshot.wall_side,
        snapshot.velocity[0],
        snapshot.velocity[1],
        snapshot.grounded,
        snapshot.active_forces,
        last_jump,
    );
}
