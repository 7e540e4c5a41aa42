pub mod movement;
pub mod sandbox;
