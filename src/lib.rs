//! Cubicle - office NPC simulation core
//!
//! Grid pathfinding around furniture, segment-by-segment movement, a daily
//! arrival/departure schedule and paced group dialogue. Rendering is left
//! to the host: the simulation reports what happened as events.

pub mod core;
pub mod dialogue;
pub mod movement;
pub mod navigation;
pub mod office;
pub mod roster;
pub mod spatial;
