//! Configuration models for scheduling behavior and log messages.

pub mod messages;
pub mod scheduler;

pub use messages::{Message, MessageLevel, MessageTemplates};
pub use scheduler::{CycleCheck, SchedulerConfig};
