//! Movement domain: fixed-tick simulation and transform sync.

use avian2d::prelude::*;
use bevy::prelude::*;

use crate::movement::{AvianWorld, CharacterController, MovementInput, MovementTuning, Player};

/// Run one movement tick for every player body against the avian world.
pub(crate) fn simulate_players(
    spatial_query: SpatialQuery,
    tuning: Res<MovementTuning>,
    mut input: ResMut<MovementInput>,
    mut query: Query<(Entity, &mut CharacterController), With<Player>>,
) {
    for (entity, mut controller) in &mut query {
        let world = AvianWorld::new(&spatial_query, entity);
        let report = controller.tick(&tuning, &input, &world);
        for transition in &report.transitions {
            trace!(
                "{:?}: {:?} -> {:?} ({})",
                entity, transition.from, transition.to, transition.reason
            );
        }
    }

    input.consume_presses();
}

/// Copy the committed body position onto the entity's transform.
pub(crate) fn sync_transforms(mut query: Query<(&CharacterController, &mut Transform), With<Player>>) {
    for (controller, mut transform) in &mut query {
        let position = controller.body.position;
        transform.translation.x = position.x;
        transform.translation.y = position.y;
    }
}
