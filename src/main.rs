use std::path::Path;

use avian2d::prelude::*;
use bevy::prelude::*;

use ledgecraft::movement::{MovementPlugin, TUNING_PATH, load_tuning};
use ledgecraft::sandbox::{SandboxError, SandboxPlugin, validate_player_tuning};

fn main() -> Result<(), SandboxError> {
    let movement = match load_tuning(Path::new(TUNING_PATH))? {
        Some(tuning) => {
            validate_player_tuning(&tuning)?;
            MovementPlugin::new(tuning)?
        }
        None => MovementPlugin::default(),
    };

    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Ledgecraft".to_string(),
                resolution: (1280, 720).into(),
                resizable: true,
                ..default()
            }),
            ..default()
        }))
        .add_plugins(PhysicsPlugins::default())
        .add_plugins((movement, SandboxPlugin))
        .run();

    Ok(())
}
