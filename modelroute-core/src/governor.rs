//! Budget governance over daily and monthly spend
//!
//! Each billing period runs an independent state machine:
//! `Normal -> Warned -> Degraded`. Transitions are evaluated lazily at
//! `check_budget` time and never revert mid-period; the start of the
//! next UTC day or calendar month (or disabling cost limits) resets the
//! tracker. When both periods are degraded, the daily period wins
//! because it is the tighter constraint.
//!
//! Callers must deduplicate retried usage events; the governor does not.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;
use tracing::{debug, warn};

/// Billing period granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodKind {
    Daily,
    Monthly,
}

impl fmt::Display for PeriodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daily => write!(f, "daily"),
            Self::Monthly => write!(f, "monthly"),
        }
    }
}

/// Budget state within a period
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetState {
    Normal,
    Warned,
    Degraded,
}

/// Cost-limit side of the auto-scaling policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostLimitPolicy {
    /// Master switch; disabling resets both trackers to `Normal`
    pub enabled: bool,

    /// Daily spend limit; zero or negative disables the daily tracker
    pub daily_limit: f64,

    /// Monthly spend limit; zero or negative disables the monthly tracker
    pub monthly_limit: f64,

    /// Provider substituted for degraded routes
    pub fallback_provider: Option<String>,

    /// Percentage of a limit at which observers are warned
    pub warn_at_percentage: f64,

    /// Percentage of a limit past which routes degrade
    pub downgrade_at_percentage: f64,
}

impl Default for CostLimitPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            daily_limit: 0.0,
            monthly_limit: 0.0,
            fallback_provider: None,
            warn_at_percentage: 80.0,
            downgrade_at_percentage: 90.0,
        }
    }
}

/// Spend recorded for one period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostUsageSnapshot {
    pub period_start: DateTime<Utc>,
    pub period_kind: PeriodKind,
    pub amount_spent: f64,
}

/// Result of a budget check
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetReport {
    /// Worst state across both periods
    pub state: BudgetState,

    /// Fallback provider to substitute when degraded
    pub recommended_provider: Option<String>,

    /// Period driving the state; daily first when both qualify
    pub period: Option<PeriodKind>,
}

impl BudgetReport {
    fn normal() -> Self {
        Self {
            state: BudgetState::Normal,
            recommended_provider: None,
            period: None,
        }
    }
}

/// Warning observer callback: `(period, percent_spent)`
pub type WarningObserver = Box<dyn Fn(PeriodKind, f64) + Send + Sync>;

#[derive(Debug)]
struct PeriodTracker {
    kind: PeriodKind,
    period_start: DateTime<Utc>,
    amount_spent: f64,
    state: BudgetState,
}

impl PeriodTracker {
    fn new(kind: PeriodKind, now: DateTime<Utc>) -> Self {
        Self {
            kind,
            period_start: period_start(kind, now),
            amount_spent: 0.0,
            state: BudgetState::Normal,
        }
    }

    /// Reset on period rollover
    fn roll_over_if_needed(&mut self, now: DateTime<Utc>) {
        let current_start = period_start(self.kind, now);
        if current_start != self.period_start {
            debug!(period = %self.kind, "billing period rolled over");
            self.period_start = current_start;
            self.amount_spent = 0.0;
            self.state = BudgetState::Normal;
        }
    }

    /// Evaluate thresholds, moving the state forward only. Returns the
    /// spend percentage when the tracker just entered `Warned`.
    fn evaluate(&mut self, limit: f64, policy: &CostLimitPolicy) -> Option<f64> {
        if !policy.enabled || limit <= 0.0 {
            self.state = BudgetState::Normal;
            return None;
        }

        let pct = self.amount_spent / limit * 100.0;

        // Threshold comparisons multiply through by the limit so exact
        // boundary spends stay exact. Downgrade fires past the
        // threshold (exactly at it stays warned), or at the full limit.
        let scaled = self.amount_spent * 100.0;
        let next = if scaled > policy.downgrade_at_percentage * limit || self.amount_spent >= limit
        {
            BudgetState::Degraded
        } else if scaled >= policy.warn_at_percentage * limit {
            BudgetState::Warned
        } else {
            BudgetState::Normal
        };

        // States only move forward within a period.
        if next > self.state {
            let entered_warned = self.state < BudgetState::Warned && next >= BudgetState::Warned;
            self.state = next;
            if next == BudgetState::Degraded {
                warn!(period = %self.kind, pct, "budget degraded; routes will use the cost fallback");
            } else {
                warn!(period = %self.kind, pct, "budget warning threshold crossed");
            }
            if entered_warned {
                return Some(pct);
            }
        }
        None
    }

    fn snapshot(&self) -> CostUsageSnapshot {
        CostUsageSnapshot {
            period_start: self.period_start,
            period_kind: self.kind,
            amount_spent: self.amount_spent,
        }
    }
}

/// Start of the period containing `now`
fn period_start(kind: PeriodKind, now: DateTime<Utc>) -> DateTime<Utc> {
    let date = now.date_naive();
    let start = match kind {
        PeriodKind::Daily => date,
        PeriodKind::Monthly => date.with_day(1).unwrap_or(date),
    };
    Utc.from_utc_datetime(&start.and_hms_opt(0, 0, 0).unwrap_or_default())
}

/// Tracks cumulative spend against configured limits
pub struct CostGovernor {
    daily: Mutex<PeriodTracker>,
    monthly: Mutex<PeriodTracker>,
    observers: Mutex<Vec<WarningObserver>>,
}

impl CostGovernor {
    /// Create a governor with fresh periods
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            daily: Mutex::new(PeriodTracker::new(PeriodKind::Daily, now)),
            monthly: Mutex::new(PeriodTracker::new(PeriodKind::Monthly, now)),
            observers: Mutex::new(Vec::new()),
        }
    }

    /// Register a warning observer, fired once per period on the
    /// `Normal -> Warned` edge
    pub fn on_warning(&self, observer: WarningObserver) {
        self.observers
            .lock()
            .expect("governor lock poisoned")
            .push(observer);
    }

    /// Record spend into both period trackers
    pub fn record_usage(&self, amount: f64) {
        self.record_usage_at(amount, Utc::now());
    }

    /// Explicit-timestamp variant of [`record_usage`](Self::record_usage)
    pub fn record_usage_at(&self, amount: f64, now: DateTime<Utc>) {
        if amount < 0.0 {
            // Snapshots are monotonically non-decreasing within a period.
            warn!(amount, "ignoring negative usage amount");
            return;
        }

        for tracker in [&self.daily, &self.monthly] {
            let mut tracker = tracker.lock().expect("governor lock poisoned");
            tracker.roll_over_if_needed(now);
            tracker.amount_spent += amount;
        }
    }

    /// Evaluate both period state machines against the policy
    pub fn check_budget(&self, policy: &CostLimitPolicy) -> BudgetReport {
        self.check_budget_at(policy, Utc::now())
    }

    /// Explicit-timestamp variant of [`check_budget`](Self::check_budget)
    pub fn check_budget_at(&self, policy: &CostLimitPolicy, now: DateTime<Utc>) -> BudgetReport {
        let mut warned_periods: Vec<(PeriodKind, f64)> = Vec::new();
        let mut states = [(PeriodKind::Daily, BudgetState::Normal); 2];

        for (i, (tracker, limit)) in [
            (&self.daily, policy.daily_limit),
            (&self.monthly, policy.monthly_limit),
        ]
        .into_iter()
        .enumerate()
        {
            let mut tracker = tracker.lock().expect("governor lock poisoned");
            tracker.roll_over_if_needed(now);
            if let Some(pct) = tracker.evaluate(limit, policy) {
                warned_periods.push((tracker.kind, pct));
            }
            states[i] = (tracker.kind, tracker.state);
        }

        // Observers run outside the tracker locks.
        if !warned_periods.is_empty() {
            let observers = self.observers.lock().expect("governor lock poisoned");
            for (period, pct) in &warned_periods {
                for observer in observers.iter() {
                    observer(*period, *pct);
                }
            }
        }

        // Daily first: the tighter constraint takes precedence.
        let mut report = BudgetReport::normal();
        for (kind, state) in states {
            if state > report.state {
                report.state = state;
                report.period = Some(kind);
            }
        }
        if report.state == BudgetState::Degraded {
            report.recommended_provider = policy.fallback_provider.clone();
        }
        report
    }

    /// Current usage snapshots `(daily, monthly)`
    pub fn usage(&self) -> (CostUsageSnapshot, CostUsageSnapshot) {
        (
            self.daily
                .lock()
                .expect("governor lock poisoned")
                .snapshot(),
            self.monthly
                .lock()
                .expect("governor lock poisoned")
                .snapshot(),
        )
    }
}

impl Default for CostGovernor {
    fn default() -> Self {
        Self::new()
    }
}
