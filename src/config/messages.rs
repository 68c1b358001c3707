//! Message templates and levels for scheduler log output.
//!
//! Each extension point has one [`Message`]. Templates use sequential `{}`
//! placeholders filled with a fixed argument list per extension point; the
//! argument order is documented on each field of [`MessageTemplates`].

use std::fmt::{self, Display, Write as _};

use serde::{Deserialize, Serialize};

/// Level a message is emitted at. `Off` suppresses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageLevel {
    /// `tracing::Level::TRACE`.
    Trace,
    /// `tracing::Level::DEBUG`.
    Debug,
    /// `tracing::Level::INFO`.
    Info,
    /// `tracing::Level::WARN`.
    Warn,
    /// `tracing::Level::ERROR`.
    Error,
    /// Not emitted.
    Off,
}

/// A template and the level it is logged at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Text with `{}` placeholders.
    pub template: String,
    /// Emission level.
    pub level: MessageLevel,
}

impl Message {
    /// Build a message from a template and level.
    pub fn new(template: impl Into<String>, level: MessageLevel) -> Self {
        Self {
            template: template.into(),
            level,
        }
    }

    /// Whether this message is emitted at all.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.level != MessageLevel::Off
    }

    /// Fill the placeholders in order.
    ///
    /// Surplus arguments are dropped; surplus placeholders stay as `{}`.
    #[must_use]
    pub fn render(&self, args: &[&dyn Display]) -> String {
        let mut out = String::with_capacity(self.template.len() + 16 * args.len());
        let mut args = args.iter();
        let mut rest = self.template.as_str();
        while let Some(idx) = rest.find("{}") {
            out.push_str(&rest[..idx]);
            match args.next() {
                Some(arg) => {
                    let _ = write!(out, "{arg}");
                }
                None => out.push_str("{}"),
            }
            rest = &rest[idx + 2..];
        }
        out.push_str(rest);
        out
    }
}

impl Display for MessageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Off => "off",
        };
        f.write_str(name)
    }
}

/// One message per scheduler extension point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageTemplates {
    /// Args: pool count.
    pub all_pools_start: Message,
    /// Args: total elapsed time.
    pub all_pools_finished: Message,
    /// Args: pool, worker detail.
    pub pool_start: Message,
    /// Args: pool.
    pub pool_empty: Message,
    /// Args: pool, status, elapsed time, worker detail.
    pub pool_complete: Message,
    /// Args: pool, elapsed time, worker detail.
    pub pool_heartbeat: Message,
    /// Args: pool, elapsed time, worker detail.
    pub pool_long_running: Message,
    /// Args: pool.
    pub pool_stop_admission: Message,
    /// Args: pool.
    pub pool_stop_next: Message,
    /// Args: failed pools.
    pub pool_exit_on_error: Message,
    /// Args: worker.
    pub worker_start: Message,
    /// Args: worker, status, elapsed time.
    pub worker_complete: Message,
    /// Args: worker, error. Used when another attempt will follow.
    pub worker_error: Message,
    /// Args: worker, error. Used when no attempts remain.
    pub worker_failed: Message,
    /// Args: scope (`Worker` or `Pool`), name, max attempts, attempt, wait seconds.
    pub retry: Message,
}

impl Default for MessageTemplates {
    fn default() -> Self {
        use MessageLevel::{Debug, Error, Info, Warn};
        Self {
            all_pools_start: Message::new("Starting all pools. There are {} pools.", Info),
            all_pools_finished: Message::new("Finished running all pools. It took {}.", Info),
            pool_start: Message::new("Starting pool {}. Workers: {}", Info),
            pool_empty: Message::new("Pool {} is empty, nothing to start", Debug),
            pool_complete: Message::new(
                "Pool {} finished with status {}. It ran for {}. Workers: {}",
                Info,
            ),
            pool_heartbeat: Message::new("Pool {} has been running for {}. Workers: {}", Info),
            pool_long_running: Message::new(
                "Pool {} is still running after {}. Workers: {}",
                Warn,
            ),
            pool_stop_admission: Message::new(
                "A worker in pool {} failed and stop-on-failure is set; no further workers will start.",
                Info,
            ),
            pool_stop_next: Message::new(
                "Stopping execution because pool {} did not return success.",
                Warn,
            ),
            pool_exit_on_error: Message::new("Pool(s) {} failed; the run is terminal.", Error),
            worker_start: Message::new("Starting worker: {}", Info),
            worker_complete: Message::new("Worker {} completed with status {}. It ran for {}", Info),
            worker_error: Message::new("Worker {} failed: {}", Warn),
            worker_failed: Message::new("Worker {} failed: {}", Error),
            retry: Message::new(
                "{} {} failed and is set to retry {} times. Starting retry {} after waiting {} seconds.",
                Warn,
            ),
        }
    }
}

impl MessageTemplates {
    /// Parse templates from JSON. Missing fields keep their defaults.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))
    }

    /// Set every message to `Off`.
    #[must_use]
    pub fn silent() -> Self {
        let mut templates = Self::default();
        for message in templates.messages_mut() {
            message.level = MessageLevel::Off;
        }
        templates
    }

    fn messages_mut(&mut self) -> [&mut Message; 15] {
        [
            &mut self.all_pools_start,
            &mut self.all_pools_finished,
            &mut self.pool_start,
            &mut self.pool_empty,
            &mut self.pool_complete,
            &mut self.pool_heartbeat,
            &mut self.pool_long_running,
            &mut self.pool_stop_admission,
            &mut self.pool_stop_next,
            &mut self.pool_exit_on_error,
            &mut self.worker_start,
            &mut self.worker_complete,
            &mut self.worker_error,
            &mut self.worker_failed,
            &mut self.retry,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_fills_in_order() {
        let msg = Message::new("{} {} failed; retry {}", MessageLevel::Warn);
        assert_eq!(msg.render(&[&"Pool", &"etl", &2]), "Pool etl failed; retry 2");
    }

    #[test]
    fn test_render_tolerates_arity_mismatch() {
        let msg = Message::new("a {} b {}", MessageLevel::Info);
        assert_eq!(msg.render(&[&1]), "a 1 b {}");
        assert_eq!(msg.render(&[&1, &2, &3]), "a 1 b 2");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let templates =
            MessageTemplates::from_json_str(r#"{"worker_start":{"template":"go {}","level":"debug"}}"#)
                .unwrap();
        assert_eq!(templates.worker_start.level, MessageLevel::Debug);
        assert_eq!(templates.retry, MessageTemplates::default().retry);
    }

    #[test]
    fn test_silent_disables_everything() {
        let templates = MessageTemplates::silent();
        assert!(!templates.pool_start.is_enabled());
        assert!(!templates.retry.is_enabled());
    }
}
