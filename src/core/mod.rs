pub mod calendar;
pub mod config;
pub mod error;
pub mod timer;
pub mod types;

pub use calendar::{DayClock, TimePeriod};
pub use config::SimulationConfig;
pub use error::{Result, SimError};
pub use timer::{TimerId, TimerQueue};
pub use types::{AgentId, Facing, GroupId, MemberId, Millis, Rect, Vec2};
