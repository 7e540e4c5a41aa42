//! Sandbox room for trying out the movement controller by hand.

use avian2d::prelude::*;
use bevy::prelude::*;
use thiserror::Error;

use crate::movement::{
    CharacterController, GameLayer, Hitbox, MovementTuning, Player, StaticBoxWorld, TuningError,
    TuningLoadError,
};

pub const PLAYER_HALF_EXTENTS: Vec2 = Vec2::new(1.5, 2.5);
pub const PLAYER_SPAWN: Vec2 = Vec2::new(25.0, 10.0);
/// Below this height the player is put back at the spawn point.
const KILL_PLANE_Y: f32 = -50.0;

/// Reasons the sandbox refuses to start.
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error(transparent)]
    Load(#[from] TuningLoadError),

    #[error("movement tuning does not fit the player: {0}")]
    Tuning(#[from] TuningError),
}

/// Check `tuning` against the sandbox player's hitbox.
pub fn validate_player_tuning(tuning: &MovementTuning) -> Result<(), TuningError> {
    tuning.validate_for(&Hitbox::new(PLAYER_HALF_EXTENTS, tuning.corner_correction_inset))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Ground,
    Wall,
}

/// One solid block of the room.
#[derive(Debug, Clone, Copy)]
pub struct Block {
    pub center: Vec2,
    pub size: Vec2,
    pub surface: Surface,
}

const fn block(x: f32, y: f32, w: f32, h: f32, surface: Surface) -> Block {
    Block {
        center: Vec2::new(x, y),
        size: Vec2::new(w, h),
        surface,
    }
}

/// A closed 100 x 100 room with platforms, two hanging pillars and a ledge.
pub const ROOM: &[Block] = &[
    // floor, walls and ceiling
    block(50.0, 3.0, 98.0, 4.0, Surface::Ground),
    block(3.0, 50.0, 4.0, 98.0, Surface::Wall),
    block(97.0, 50.0, 4.0, 98.0, Surface::Wall),
    block(50.0, 97.0, 98.0, 4.0, Surface::Ground),
    // platforms
    block(75.0, 18.0, 20.0, 4.0, Surface::Ground),
    block(50.0, 30.0, 20.0, 2.0, Surface::Ground),
    block(28.0, 68.0, 20.0, 2.0, Surface::Ground),
    // pillars for wall jumps
    block(35.0, 50.0, 2.0, 20.0, Surface::Wall),
    block(50.0, 58.0, 2.0, 20.0, Surface::Wall),
    // low step next to the spawn point
    block(12.0, 5.5, 6.0, 1.0, Surface::Ground),
];

/// The sandbox room as a headless collision world.
pub fn room_world() -> StaticBoxWorld {
    let mut world = StaticBoxWorld::new();
    for block in ROOM {
        world.add_box(block.center, block.size);
    }
    world
}

pub struct SandboxPlugin;

impl Plugin for SandboxPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, (spawn_camera, spawn_room, spawn_player))
            .add_systems(Update, respawn_player);
    }
}

fn spawn_camera(mut commands: Commands) {
    commands.spawn((
        Camera2d,
        Transform::from_xyz(50.0, 50.0, 1.0).with_scale(Vec3::splat(0.12)),
    ));
}

fn spawn_room(mut commands: Commands) {
    let wall_color = Color::srgb(0.3, 0.3, 0.4);
    let ground_color = Color::srgb(0.4, 0.5, 0.4);

    let ground_layers = CollisionLayers::new(GameLayer::Ground, [GameLayer::Player]);
    let wall_layers = CollisionLayers::new(GameLayer::Wall, [GameLayer::Player]);

    for block in ROOM {
        let (color, layers) = match block.surface {
            Surface::Ground => (ground_color, ground_layers),
            Surface::Wall => (wall_color, wall_layers),
        };
        commands.spawn((
            Sprite {
                color,
                custom_size: Some(block.size),
                ..default()
            },
            Transform::from_xyz(block.center.x, block.center.y, 0.0),
            RigidBody::Static,
            Collider::rectangle(block.size.x, block.size.y),
            layers,
        ));
    }
    info!("Spawned sandbox room with {} blocks", ROOM.len());
}

fn spawn_player(mut commands: Commands, tuning: Res<MovementTuning>) -> Result {
    let controller = CharacterController::new(&tuning, PLAYER_HALF_EXTENTS, PLAYER_SPAWN)?;

    commands.spawn((
        Player,
        controller,
        Sprite {
            color: Color::srgb(1.0, 0.5, 0.0),
            custom_size: Some(PLAYER_HALF_EXTENTS * 2.0),
            ..default()
        },
        Transform::from_xyz(PLAYER_SPAWN.x, PLAYER_SPAWN.y, 0.5),
        RigidBody::Kinematic,
        Collider::rectangle(PLAYER_HALF_EXTENTS.x * 2.0, PLAYER_HALF_EXTENTS.y * 2.0),
        CollisionLayers::new(GameLayer::Player, [GameLayer::Ground, GameLayer::Wall]),
    ));
    Ok(())
}

/// Put the player back at the spawn point on R or after falling out of the room.
fn respawn_player(
    keyboard: Res<ButtonInput<KeyCode>>,
    tuning: Res<MovementTuning>,
    mut query: Query<&mut CharacterController, With<Player>>,
) {
    for mut controller in &mut query {
        if keyboard.just_pressed(KeyCode::KeyR) || controller.body.position.y < KILL_PLANE_Y {
            controller.respawn(&tuning, PLAYER_SPAWN);
        }
    }
}
