//! Frame-driven movement along planned routes

pub mod controller;
pub mod movable;

pub use controller::{MovementController, Step};
pub use movable::{AgentBody, Animation, Movable};
