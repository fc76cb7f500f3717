use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub(crate) const STAT_MIN: i32 = 0;
pub(crate) const STAT_MAX: i32 = 100;

pub(crate) const DEFAULT_HEALTH: u8 = 100;
pub(crate) const DEFAULT_HUNGER: u8 = 0;
pub(crate) const DEFAULT_ENERGY: u8 = 80;
pub(crate) const DEFAULT_CLEAN: u8 = 80;

/// Applies a signed delta to a vital and clamps the result into [0,100].
pub(crate) fn bump(value: u8, delta: i32) -> u8 {
    (value as i32 + delta).clamp(STAT_MIN, STAT_MAX) as u8
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Mood {
    Happy,
    Okay,
    Hungry,
    Sleepy,
    Sick,
}

impl Mood {
    pub(crate) fn label(self) -> &'static str {
        match self {
            Mood::Happy => "Happy",
            Mood::Okay => "Okay",
            Mood::Hungry => "Hungry",
            Mood::Sleepy => "Sleepy",
            Mood::Sick => "Sick",
        }
    }
}

/// The pet's state. `hunger` is inverted: higher is worse.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Vitals {
    pub(crate) health: u8,
    pub(crate) hunger: u8,
    pub(crate) energy: u8,
    pub(crate) clean: u8,
    pub(crate) is_sleeping: bool,
    pub(crate) paused: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub(crate) created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub(crate) last_tick_at: DateTime<Utc>,
}

impl Vitals {
    pub(crate) fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            health: DEFAULT_HEALTH,
            hunger: DEFAULT_HUNGER,
            energy: DEFAULT_ENERGY,
            clean: DEFAULT_CLEAN,
            is_sleeping: false,
            paused: false,
            created_at: now,
            last_tick_at: now,
        }
    }

    /// Health at zero latches the "needs reset" condition.
    pub(crate) fn is_terminal(&self) -> bool {
        self.health == 0
    }

    /// Moves `last_tick_at` forward to `now`, never backwards.
    pub(crate) fn stamp(&mut self, now: DateTime<Utc>) {
        if now > self.last_tick_at {
            self.last_tick_at = now;
        }
    }

    pub(crate) fn age_minutes(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_minutes().max(0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Emphasis {
    Positive,
    Negative,
}

/// Short status line for the player, optionally with a flash cue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Notice {
    pub(crate) text: String,
    pub(crate) emphasis: Option<Emphasis>,
}

impl Notice {
    pub(crate) fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            emphasis: None,
        }
    }

    pub(crate) fn positive(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            emphasis: Some(Emphasis::Positive),
        }
    }

    pub(crate) fn negative(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            emphasis: Some(Emphasis::Negative),
        }
    }
}

/// Everything the renderer needs for one frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct StatusView {
    pub(crate) health: u8,
    pub(crate) hunger: u8,
    pub(crate) energy: u8,
    pub(crate) clean: u8,
    pub(crate) is_sleeping: bool,
    pub(crate) paused: bool,
    pub(crate) needs_reset: bool,
    pub(crate) mood: Mood,
    pub(crate) condition: &'static str,
    pub(crate) age_minutes: i64,
}
