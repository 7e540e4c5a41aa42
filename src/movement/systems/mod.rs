//! Movement domain: system modules for locomotion updates.

pub(crate) mod input;
pub(crate) mod simulate;

pub(crate) use input::read_input;
pub(crate) use simulate::{simulate_players, sync_transforms};
