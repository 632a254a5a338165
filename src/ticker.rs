use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use crate::error::ValidationError;
use crate::pomodoro::{format_time, PomodoroSession, PomodoroTimer, TickOutcome, TimerStatus};

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Completion side effect of a focus session (sound, haptics, banner).
pub trait SessionAlert: Send + Sync {
    fn session_completed(&self, duration_secs: u32);
}

/// Discrete tick events, one per period. The first tick arrives one full period after
/// creation.
pub struct Ticker {
    interval: Interval,
    seq: u64,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval, seq: 0 }
    }

    pub async fn next(&mut self) -> u64 {
        self.interval.tick().await;
        self.seq += 1;
        self.seq
    }
}

/// A spawned ticking task. Dropping the handle cancels the task.
struct TickerHandle {
    task: JoinHandle<()>,
}

impl TickerHandle {
    fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for TickerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn spawn_ticker(
    timer: Arc<Mutex<PomodoroTimer>>,
    alert: Arc<dyn SessionAlert>,
    period: Duration,
) -> TickerHandle {
    let task = tokio::spawn(async move {
        let mut ticker = Ticker::new(period);
        loop {
            let seq = ticker.next().await;
            let (outcome, duration) = {
                let mut guard = timer.lock().expect("timer poisoned");
                (guard.tick(), guard.duration())
            };
            match outcome {
                TickOutcome::Advanced => {}
                TickOutcome::Completed => {
                    log::info!("focus session completed duration_secs={duration} ticks={seq}");
                    alert.session_completed(duration);
                    break;
                }
                // A cancel raced with this tick; the session is no longer running.
                TickOutcome::Ignored => break,
            }
        }
    });
    TickerHandle { task }
}

/// Focus timer controller: the countdown state plus the task that drives it.
///
/// Every path that stops or restarts a session (pause, reset, duration change,
/// completion, drop) leaves at most one ticking task alive. Must be used inside a tokio
/// runtime.
pub struct FocusTimer {
    timer: Arc<Mutex<PomodoroTimer>>,
    alert: Arc<dyn SessionAlert>,
    ticker: Option<TickerHandle>,
    period: Duration,
}

impl FocusTimer {
    pub fn new(alert: Arc<dyn SessionAlert>) -> Self {
        Self::with_timer(PomodoroTimer::default(), alert)
    }

    pub fn with_timer(timer: PomodoroTimer, alert: Arc<dyn SessionAlert>) -> Self {
        Self {
            timer: Arc::new(Mutex::new(timer)),
            alert,
            ticker: None,
            period: TICK_PERIOD,
        }
    }

    pub fn start(&mut self) -> bool {
        let started = self.lock().start();
        if started {
            log::debug!("focus session started");
            self.restart_ticker();
        }
        started
    }

    pub fn pause(&mut self) -> bool {
        self.cancel_ticker();
        self.lock().pause()
    }

    pub fn resume(&mut self) -> bool {
        let resumed = self.lock().resume();
        if resumed {
            self.restart_ticker();
        }
        resumed
    }

    /// Play/pause button: start when idle, otherwise pause or resume.
    pub fn toggle(&mut self) -> TimerStatus {
        match self.status() {
            TimerStatus::Idle | TimerStatus::Completed => {
                self.start();
            }
            TimerStatus::Running => {
                self.pause();
            }
            TimerStatus::Paused => {
                self.resume();
            }
        }
        self.status()
    }

    pub fn reset(&mut self) {
        self.cancel_ticker();
        self.lock().reset();
    }

    /// A rejected duration leaves the running session and its task untouched.
    pub fn set_duration_minutes(&mut self, minutes: u32) -> Result<(), ValidationError> {
        self.lock().set_duration_minutes(minutes)?;
        self.cancel_ticker();
        Ok(())
    }

    pub fn session(&self) -> PomodoroSession {
        self.lock().session()
    }

    pub fn status(&self) -> TimerStatus {
        self.lock().status()
    }

    pub fn progress(&self) -> f64 {
        self.lock().progress()
    }

    pub fn remaining(&self) -> u32 {
        self.lock().remaining()
    }

    pub fn formatted_remaining(&self) -> String {
        format_time(self.remaining())
    }

    pub fn status_label(&self) -> &'static str {
        self.lock().status_label()
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker.as_ref().is_some_and(TickerHandle::is_running)
    }

    fn restart_ticker(&mut self) {
        self.cancel_ticker();
        self.ticker = Some(spawn_ticker(
            Arc::clone(&self.timer),
            Arc::clone(&self.alert),
            self.period,
        ));
    }

    fn cancel_ticker(&mut self) {
        // Dropping the handle aborts the task.
        self.ticker = None;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PomodoroTimer> {
        self.timer.lock().expect("timer poisoned")
    }
}
