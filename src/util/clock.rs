//! Stopwatch used for reporting elapsed time and heartbeat arithmetic.

use std::fmt;
use std::time::{Duration, Instant};

const MILLIS_PER_HOUR: u128 = 3_600_000;
const MILLIS_PER_MINUTE: u128 = 60_000;

/// Measures elapsed wall-clock time between `start` and `stop` (or now).
#[derive(Debug, Clone, Copy, Default)]
pub struct Stopwatch {
    started: Option<Instant>,
    stopped: Option<Instant>,
}

impl Stopwatch {
    /// Create a stopwatch that has not been started.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            started: None,
            stopped: None,
        }
    }

    /// Create a stopwatch that is already running.
    #[must_use]
    pub fn started() -> Self {
        Self {
            started: Some(Instant::now()),
            stopped: None,
        }
    }

    /// Start (or restart) the stopwatch.
    pub fn start(&mut self) -> &mut Self {
        self.started = Some(Instant::now());
        self.stopped = None;
        self
    }

    /// Freeze the elapsed time at the current instant.
    pub fn stop(&mut self) -> &mut Self {
        if self.started.is_some() {
            self.stopped = Some(Instant::now());
        }
        self
    }

    /// Whether `start` has been called.
    #[must_use]
    pub const fn is_started(&self) -> bool {
        self.started.is_some()
    }

    /// Elapsed time; zero if never started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        match (self.started, self.stopped) {
            (Some(start), Some(end)) => end.saturating_duration_since(start),
            (Some(start), None) => start.elapsed(),
            (None, _) => Duration::ZERO,
        }
    }

    /// Elapsed nanoseconds.
    #[must_use]
    pub fn elapsed_nanos(&self) -> u128 {
        self.elapsed().as_nanos()
    }

    /// Elapsed milliseconds.
    #[must_use]
    pub fn elapsed_millis(&self) -> u128 {
        self.elapsed().as_millis()
    }

    /// Elapsed whole seconds.
    #[must_use]
    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed().as_secs()
    }

    /// `HH:MM:SS (N milliseconds)`.
    #[must_use]
    pub fn human(&self) -> String {
        if !self.is_started() {
            return NOT_STARTED.to_string();
        }
        let millis = self.elapsed_millis();
        format!(
            "{:02}:{:02}:{:02} ({})",
            millis / MILLIS_PER_HOUR,
            (millis % MILLIS_PER_HOUR) / MILLIS_PER_MINUTE,
            (millis % MILLIS_PER_MINUTE) / 1_000,
            self
        )
    }
}

const NOT_STARTED: &str = "stopwatch has not been started";

impl fmt::Display for Stopwatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_started() {
            return f.write_str(NOT_STARTED);
        }
        write!(f, "{} milliseconds", group_thousands(self.elapsed_millis()))
    }
}

/// Format an integer with `,` thousands separators.
#[must_use]
pub fn group_thousands(value: u128) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
