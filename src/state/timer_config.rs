//! Timer settings and their sanitisation

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_FOCUS_MINUTES: u32 = 25;
pub const DEFAULT_SHORT_BREAK_MINUTES: u32 = 5;
pub const DEFAULT_LONG_BREAK_MINUTES: u32 = 15;
pub const DEFAULT_CYCLES_PER_LONG_BREAK: u32 = 4;

/// Sanitised timer settings. Every field is a positive integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerConfig {
    pub focus_minutes: u32,
    pub short_break_minutes: u32,
    pub long_break_minutes: u32,
    pub cycles_per_long_break: u32,
}

impl TimerConfig {
    pub fn focus_seconds(&self) -> u64 {
        u64::from(self.focus_minutes) * 60
    }

    pub fn short_break_seconds(&self) -> u64 {
        u64::from(self.short_break_minutes) * 60
    }

    pub fn long_break_seconds(&self) -> u64 {
        u64::from(self.long_break_minutes) * 60
    }

    /// Parse a persisted settings document. Invalid fields take their
    /// defaults; a document that is not a JSON object is an error.
    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        let input: TimerConfigInput = serde_json::from_str(raw)?;
        Ok(input.sanitize())
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            focus_minutes: DEFAULT_FOCUS_MINUTES,
            short_break_minutes: DEFAULT_SHORT_BREAK_MINUTES,
            long_break_minutes: DEFAULT_LONG_BREAK_MINUTES,
            cycles_per_long_break: DEFAULT_CYCLES_PER_LONG_BREAK,
        }
    }
}

/// Unvalidated settings as they arrive from a client or from storage.
///
/// Fields are kept as raw JSON so that strings from form inputs, negative
/// numbers and garbage all go through the same sanitisation path. Only a
/// JSON object is accepted. The key names older clients stored are read
/// when the current name is absent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct TimerConfigInput {
    pub focus_minutes: Option<Value>,
    pub short_break_minutes: Option<Value>,
    pub long_break_minutes: Option<Value>,
    pub cycles_per_long_break: Option<Value>,
}

impl From<Map<String, Value>> for TimerConfigInput {
    fn from(mut fields: Map<String, Value>) -> Self {
        let mut take = |key: &str, legacy: Option<&str>| {
            fields
                .remove(key)
                .or_else(|| legacy.and_then(|legacy| fields.remove(legacy)))
        };
        Self {
            focus_minutes: take("focusMinutes", Some("pomodoroMinutes")),
            short_break_minutes: take("shortBreakMinutes", None),
            long_break_minutes: take("longBreakMinutes", None),
            cycles_per_long_break: take("cyclesPerLongBreak", Some("totalSessions")),
        }
    }
}

impl TimerConfigInput {
    pub fn sanitize(&self) -> TimerConfig {
        TimerConfig {
            focus_minutes: positive_or(self.focus_minutes.as_ref(), DEFAULT_FOCUS_MINUTES),
            short_break_minutes: positive_or(
                self.short_break_minutes.as_ref(),
                DEFAULT_SHORT_BREAK_MINUTES,
            ),
            long_break_minutes: positive_or(
                self.long_break_minutes.as_ref(),
                DEFAULT_LONG_BREAK_MINUTES,
            ),
            cycles_per_long_break: positive_or(
                self.cycles_per_long_break.as_ref(),
                DEFAULT_CYCLES_PER_LONG_BREAK,
            ),
        }
    }
}

impl From<TimerConfig> for TimerConfigInput {
    fn from(config: TimerConfig) -> Self {
        Self {
            focus_minutes: Some(config.focus_minutes.into()),
            short_break_minutes: Some(config.short_break_minutes.into()),
            long_break_minutes: Some(config.long_break_minutes.into()),
            cycles_per_long_break: Some(config.cycles_per_long_break.into()),
        }
    }
}

fn positive_or(value: Option<&Value>, default: u32) -> u32 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    };

    parsed
        .filter(|&n| n > 0)
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(default)
}
