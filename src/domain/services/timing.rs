use std::sync::atomic::{AtomicI64, Ordering};

/// Minimum gap between two score increments on the same matchup
pub const SCORE_COOLDOWN_MS: i64 = 120_000;

/// Delay between arming a reset/delete and being allowed to confirm it
pub const ARM_WINDOW_MS: i64 = 600_000;

/// Milliseconds left before `window_ms` has elapsed since `reference`.
///
/// A missing reference means the window is already satisfied. The result is
/// clamped to `[0, window_ms]`, so a reference stamped in the future (clock
/// skew between store and reader) never reports more than one full window.
pub fn remaining(reference: Option<i64>, window_ms: i64, now: i64) -> i64 {
    match reference {
        None => 0,
        Some(at) => {
            let elapsed = now.saturating_sub(at);
            window_ms.saturating_sub(elapsed).clamp(0, window_ms)
        }
    }
}

/// Cooldown left before the next score increment is accepted
pub fn score_cooldown_remaining(last_score_at: Option<i64>, now: i64) -> i64 {
    remaining(last_score_at, SCORE_COOLDOWN_MS, now)
}

/// Wait left before an armed reset/delete can be confirmed
pub fn arm_remaining(armed_at: Option<i64>, now: i64) -> i64 {
    remaining(armed_at, ARM_WINDOW_MS, now)
}

/// Format a duration for notices and badges ("1m 5s", "42s")
pub fn human(ms: i64) -> String {
    let seconds = (ms.max(0) + 999) / 1000;
    let minutes = seconds / 60;
    let rest = seconds % 60;
    if minutes > 0 {
        format!("{}m {}s", minutes, rest)
    } else {
        format!("{}s", rest)
    }
}

/// Source of "now" for the document store.
///
/// Every timestamp written by the engine comes from the store's clock, never
/// from the caller.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Wall clock (UTC milliseconds)
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start: i64) -> Self {
        Self {
            now: AtomicI64::new(start),
        }
    }

    pub fn set(&self, millis: i64) {
        self.now.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}
