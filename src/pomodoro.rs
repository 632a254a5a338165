use serde::Serialize;

use crate::error::ValidationError;

pub const DEFAULT_DURATION_MINUTES: u32 = 25;
/// Session lengths offered by the duration picker, in minutes.
pub const DURATION_OPTIONS: [u32; 6] = [15, 20, 25, 30, 45, 60];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerStatus {
    Idle,
    Running,
    Paused,
    /// Idle after the countdown reached zero; the elapsed time stays at the full duration.
    Completed,
}

/// Snapshot handed to the UI. Not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PomodoroSession {
    pub duration: u32,
    pub elapsed: u32,
    pub is_active: bool,
    pub is_paused: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The session was not running; nothing changed.
    Ignored,
    Advanced,
    Completed,
}

/// Countdown state machine. Time only moves through [`PomodoroTimer::tick`].
#[derive(Debug, Clone)]
pub struct PomodoroTimer {
    duration: u32,
    elapsed: u32,
    status: TimerStatus,
}

impl Default for PomodoroTimer {
    fn default() -> Self {
        Self {
            duration: DEFAULT_DURATION_MINUTES * 60,
            elapsed: 0,
            status: TimerStatus::Idle,
        }
    }
}

impl PomodoroTimer {
    pub fn with_duration_secs(duration: u32) -> Result<Self, ValidationError> {
        if duration == 0 {
            return Err(ValidationError::InvalidDuration);
        }
        Ok(Self {
            duration,
            ..Self::default()
        })
    }

    pub fn duration(&self) -> u32 {
        self.duration
    }

    pub fn elapsed(&self) -> u32 {
        self.elapsed
    }

    pub fn status(&self) -> TimerStatus {
        self.status
    }

    pub fn is_completed(&self) -> bool {
        self.status == TimerStatus::Completed
    }

    pub fn session(&self) -> PomodoroSession {
        PomodoroSession {
            duration: self.duration,
            elapsed: self.elapsed,
            is_active: matches!(self.status, TimerStatus::Running | TimerStatus::Paused),
            is_paused: self.status == TimerStatus::Paused,
        }
    }

    /// Returns true when the session switched to running. A completed session starts over.
    pub fn start(&mut self) -> bool {
        match self.status {
            TimerStatus::Idle => {}
            TimerStatus::Completed => self.elapsed = 0,
            TimerStatus::Running | TimerStatus::Paused => return false,
        }
        self.status = TimerStatus::Running;
        true
    }

    pub fn pause(&mut self) -> bool {
        if self.status != TimerStatus::Running {
            return false;
        }
        self.status = TimerStatus::Paused;
        true
    }

    pub fn resume(&mut self) -> bool {
        if self.status != TimerStatus::Paused {
            return false;
        }
        self.status = TimerStatus::Running;
        true
    }

    pub fn reset(&mut self) {
        self.status = TimerStatus::Idle;
        self.elapsed = 0;
    }

    pub fn set_duration_minutes(&mut self, minutes: u32) -> Result<(), ValidationError> {
        if minutes == 0 {
            return Err(ValidationError::InvalidDuration);
        }
        self.duration = minutes.saturating_mul(60);
        self.reset();
        Ok(())
    }

    pub fn tick(&mut self) -> TickOutcome {
        if self.status != TimerStatus::Running {
            return TickOutcome::Ignored;
        }
        self.elapsed = (self.elapsed + 1).min(self.duration);
        if self.elapsed >= self.duration {
            self.status = TimerStatus::Completed;
            return TickOutcome::Completed;
        }
        TickOutcome::Advanced
    }

    pub fn remaining(&self) -> u32 {
        self.duration.saturating_sub(self.elapsed)
    }

    pub fn progress(&self) -> f64 {
        if self.duration == 0 {
            return 0.0;
        }
        (f64::from(self.elapsed) / f64::from(self.duration)).clamp(0.0, 1.0)
    }

    pub fn status_label(&self) -> &'static str {
        match self.status {
            TimerStatus::Idle => "Ready",
            TimerStatus::Running => "Focus Time",
            TimerStatus::Paused => "Paused",
            TimerStatus::Completed => "Complete!",
        }
    }
}

/// Renders seconds as zero-padded `MM:SS`.
pub fn format_time(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
