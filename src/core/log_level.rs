//! Log level definitions
//!
//! Levels are plain integers so that applications can log at any point
//! between the named levels. The named levels leave gaps for that purpose.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicI32, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Level(pub i32);

impl Level {
    pub const DEBUG: Level = Level(-4);
    pub const INFO: Level = Level(0);
    /// Normal but significant events, such as start up, shut down, or configuration.
    pub const NOTICE: Level = Level(2);
    pub const WARN: Level = Level(4);
    pub const ERROR: Level = Level(8);
    /// Events that cause more severe problems or brief outages.
    pub const CRITICAL: Level = Level(12);
    /// A person must take an action immediately.
    pub const ALERT: Level = Level(16);
    /// One or more systems are unusable.
    pub const EMERGENCY: Level = Level(20);

    const NAMED: [(Level, &'static str); 8] = [
        (Level::EMERGENCY, "EMERGENCY"),
        (Level::ALERT, "ALERT"),
        (Level::CRITICAL, "CRITICAL"),
        (Level::ERROR, "ERROR"),
        (Level::WARN, "WARN"),
        (Level::NOTICE, "NOTICE"),
        (Level::INFO, "INFO"),
        (Level::DEBUG, "DEBUG"),
    ];

    pub const fn new(level: i32) -> Self {
        Level(level)
    }

    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// The closest named level at or below this one, with the distance to it
    fn nearest_named(self) -> (&'static str, i32) {
        for (named, name) in Self::NAMED {
            if self >= named {
                return (name, self.0 - named.0);
            }
        }
        ("DEBUG", self.0 - Level::DEBUG.0)
    }

    fn named(name: &str) -> Option<Level> {
        match name {
            "DEBUG" => Some(Level::DEBUG),
            "INFO" => Some(Level::INFO),
            "NOTICE" => Some(Level::NOTICE),
            "WARN" | "WARNING" => Some(Level::WARN),
            "ERROR" => Some(Level::ERROR),
            "CRITICAL" => Some(Level::CRITICAL),
            "ALERT" => Some(Level::ALERT),
            "EMERGENCY" => Some(Level::EMERGENCY),
            _ => None,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.nearest_named() {
            (name, 0) => write!(f, "{}", name),
            (name, offset) => write!(f, "{}{:+}", name, offset),
        }
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(level) = trimmed.parse::<i32>() {
            return Ok(Level(level));
        }

        let upper = trimmed.to_ascii_uppercase();
        let (name, offset) = match upper.find(|c| c == '+' || c == '-') {
            Some(idx) => {
                let offset = upper[idx..]
                    .parse::<i32>()
                    .map_err(|_| format!("Invalid log level: '{}'", s))?;
                (&upper[..idx], offset)
            }
            None => (upper.as_str(), 0),
        };

        match Level::named(name) {
            Some(level) => level
                .0
                .checked_add(offset)
                .map(Level)
                .ok_or_else(|| format!("Invalid log level: '{}'", s)),
            None => Err(format!("Invalid log level: '{}'", s)),
        }
    }
}

impl From<i32> for Level {
    fn from(level: i32) -> Self {
        Level(level)
    }
}

/// Source of the minimum level a handler accepts
///
/// A handler asks its leveler on every call, so implementations may change
/// their answer over time.
pub trait Leveler: Send + Sync {
    fn level(&self) -> Level;
}

impl Leveler for Level {
    fn level(&self) -> Level {
        *self
    }
}

impl<L: Leveler + ?Sized> Leveler for std::sync::Arc<L> {
    fn level(&self) -> Level {
        (**self).level()
    }
}

/// Atomically adjustable level
///
/// # Example
///
/// ```
/// use gcloud_log_handler::{Level, LevelVar, Leveler};
///
/// let var = LevelVar::new(Level::INFO);
/// var.set(Level::DEBUG);
/// assert_eq!(var.level(), Level::DEBUG);
/// ```
#[derive(Debug, Default)]
pub struct LevelVar {
    level: AtomicI32,
}

impl LevelVar {
    pub const fn new(level: Level) -> Self {
        Self {
            level: AtomicI32::new(level.0),
        }
    }

    pub fn set(&self, level: Level) {
        self.level.store(level.0, Ordering::Relaxed);
    }
}

impl Leveler for LevelVar {
    fn level(&self) -> Level {
        Level(self.level.load(Ordering::Relaxed))
    }
}
