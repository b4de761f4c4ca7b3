//! Cloud Logging severities and the level-to-severity mapping

use super::log_level::Level;
use serde::{Serialize, Serializer};
use std::fmt;

const SEVERITY_INTERCEPT: i64 = 8;
const SEVERITY_SLOPE: i64 = 4;
const SEVERITY_INCREMENT: i64 = 100;

/// Severity of an entry as understood by the logging backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Severity(i32);

impl Severity {
    pub const DEFAULT: Severity = Severity(0);
    pub const DEBUG: Severity = Severity(100);
    pub const INFO: Severity = Severity(200);
    pub const NOTICE: Severity = Severity(300);
    pub const WARNING: Severity = Severity(400);
    pub const ERROR: Severity = Severity(500);
    pub const CRITICAL: Severity = Severity(600);
    pub const ALERT: Severity = Severity(700);
    pub const EMERGENCY: Severity = Severity(800);

    /// Map a record level onto a severity tier.
    ///
    /// `((level + 8) / 4) * 100`, truncating toward zero, plus one more tier
    /// for anything strictly above [`Level::INFO`].
    pub fn from_level(level: Level) -> Self {
        let tier = (i64::from(level.0) + SEVERITY_INTERCEPT) / SEVERITY_SLOPE * SEVERITY_INCREMENT;
        let severity = if level > Level::INFO {
            tier + SEVERITY_INCREMENT
        } else {
            tier
        };
        Severity(severity.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32)
    }

    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Backend name of a tier, `None` for values between tiers
    pub fn name(self) -> Option<&'static str> {
        match self {
            Severity::DEFAULT => Some("DEFAULT"),
            Severity::DEBUG => Some("DEBUG"),
            Severity::INFO => Some("INFO"),
            Severity::NOTICE => Some("NOTICE"),
            Severity::WARNING => Some("WARNING"),
            Severity::ERROR => Some("ERROR"),
            Severity::CRITICAL => Some("CRITICAL"),
            Severity::ALERT => Some("ALERT"),
            Severity::EMERGENCY => Some("EMERGENCY"),
            _ => None,
        }
    }
}

impl From<Level> for Severity {
    fn from(level: Level) -> Self {
        Severity::from_level(level)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "{}", self.0),
        }
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.name() {
            Some(name) => serializer.serialize_str(name),
            None => serializer.serialize_i32(self.0),
        }
    }
}
