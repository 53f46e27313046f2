use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::activity::ActivityLog;
use crate::catalog;
use crate::countdown::Countdown;
use crate::errors::{SessionError, ValidationError};
use crate::types::{AccrualPeriod, Activity, MiningStatus, UpgradeKind};

pub const MINING_REWARD_TITLE: &str = "Mining Reward";

/// Persisted form of a session. Decimal fields serialize as strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub balance: Decimal,
    pub hash_rate: Decimal,
    pub accrual_rate: Decimal,
    #[serde(default)]
    pub is_mining: bool,
    /// Milliseconds since the unix epoch
    #[serde(default)]
    pub last_updated: u64,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            balance: Decimal::new(125075, 2), // 1250.75 points to start
            hash_rate: Decimal::new(1255, 1),
            accrual_rate: Decimal::new(425, 1),
            is_mining: false,
            last_updated: 0,
        }
    }
}

/// In-memory mining state for one authenticated user.
///
/// Every balance mutation records exactly one activity entry, and the
/// balance never drops below zero.
#[derive(Debug, Clone)]
pub struct SessionState {
    balance: Decimal,
    hash_rate: Decimal,
    /// Points per hour
    accrual_rate: Decimal,
    status: MiningStatus,
    countdown: Countdown,
    period: AccrualPeriod,
    activity: ActivityLog,
}

impl SessionState {
    /// Creates a session with default starting values
    pub fn new(period: AccrualPeriod) -> Self {
        Self::from_snapshot(SessionSnapshot::default(), ActivityLog::new(), period)
    }

    /// Restores a session from persisted fields. A negative persisted
    /// balance is clamped to zero.
    pub fn from_snapshot(
        snapshot: SessionSnapshot,
        activity: ActivityLog,
        period: AccrualPeriod,
    ) -> Self {
        SessionState {
            balance: snapshot.balance.max(Decimal::ZERO),
            hash_rate: snapshot.hash_rate,
            accrual_rate: snapshot.accrual_rate,
            status: if snapshot.is_mining {
                MiningStatus::Mining
            } else {
                MiningStatus::Idle
            },
            countdown: Countdown::new(),
            period,
            activity,
        }
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn hash_rate(&self) -> Decimal {
        self.hash_rate
    }

    pub fn accrual_rate(&self) -> Decimal {
        self.accrual_rate
    }

    pub fn status(&self) -> MiningStatus {
        self.status
    }

    pub fn is_mining(&self) -> bool {
        self.status.is_mining()
    }

    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    pub fn period(&self) -> AccrualPeriod {
        self.period
    }

    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }

    /// Flips between `Idle` and `Mining`. Entering `Mining` arms a fresh
    /// countdown cycle.
    pub fn toggle_mining(&mut self) -> MiningStatus {
        self.status = match self.status {
            MiningStatus::Idle => {
                self.countdown.reset();
                MiningStatus::Mining
            }
            MiningStatus::Mining => MiningStatus::Idle,
        };
        self.status
    }

    /// Advances the countdown by one second and accrues if a period
    /// boundary was crossed. The countdown is frozen while idle.
    pub fn tick(&mut self, now: u64) -> Option<Activity> {
        if !self.is_mining() {
            return None;
        }

        let wrapped = self.countdown.tick();
        let due = match self.period {
            AccrualPeriod::Cycle => wrapped,
            AccrualPeriod::Minute => self.countdown.remaining_secs() % 60 == 0,
        };

        if due { self.accrue(now) } else { None }
    }

    /// Credits one period of reward. No-op unless mining.
    pub(crate) fn accrue(&mut self, now: u64) -> Option<Activity> {
        if !self.is_mining() {
            return None;
        }

        let reward = self.period.reward(self.accrual_rate);
        self.balance += reward;

        let entry = Activity::income(
            MINING_REWARD_TITLE,
            format!("Mined at {} points/hour", self.accrual_rate),
            reward,
            now,
        );
        self.record_activity(entry.clone());
        Some(entry)
    }

    /// Buys one catalog upgrade. The cost deduction, rate increases and
    /// activity entry are applied together or not at all.
    pub fn purchase_upgrade(
        &mut self,
        kind: UpgradeKind,
        quoted_cost: Decimal,
        now: u64,
    ) -> Result<Activity, SessionError> {
        let upgrade = catalog::lookup(kind);

        if quoted_cost <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveCost.into());
        }
        if quoted_cost != upgrade.cost {
            return Err(ValidationError::PriceMismatch {
                quoted: quoted_cost,
                price: upgrade.cost,
            }
            .into());
        }
        if self.balance < upgrade.cost {
            return Err(SessionError::InsufficientBalance {
                balance: self.balance,
                cost: upgrade.cost,
            });
        }

        self.balance -= upgrade.cost;
        self.accrual_rate += upgrade.accrual_rate_delta;
        self.hash_rate += upgrade.hash_rate_delta;

        let entry = Activity::expense(
            upgrade.name,
            format!("Accrual rate +{} points/hour", upgrade.accrual_rate_delta),
            upgrade.cost,
            now,
        );
        self.record_activity(entry.clone());
        Ok(entry)
    }

    /// Prepends `entry` to the bounded activity log. In-memory only.
    pub fn record_activity(&mut self, entry: Activity) {
        self.activity.record(entry);
    }

    pub fn snapshot(&self, now: u64) -> SessionSnapshot {
        SessionSnapshot {
            balance: self.balance,
            hash_rate: self.hash_rate,
            accrual_rate: self.accrual_rate,
            is_mining: self.is_mining(),
            last_updated: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::ACTIVITY_LOG_CAPACITY;
    use crate::countdown::CYCLE_SECS;
    use crate::types::ActivityKind;
    use rust_decimal_macros::dec;

    fn setup_state(balance: Decimal, accrual_rate: Decimal, period: AccrualPeriod) -> SessionState {
        let snapshot = SessionSnapshot {
            balance,
            accrual_rate,
            ..SessionSnapshot::default()
        };
        SessionState::from_snapshot(snapshot, ActivityLog::new(), period)
    }

    #[test]
    fn test_new_state_defaults() {
        let state = SessionState::new(AccrualPeriod::Cycle);
        assert_eq!(state.balance(), dec!(1250.75));
        assert_eq!(state.accrual_rate(), dec!(42.5));
        assert_eq!(state.hash_rate(), dec!(125.5));
        assert_eq!(state.status(), MiningStatus::Idle);
        assert!(state.activity().is_empty());
        assert_eq!(state.countdown().to_string(), "15:00");
    }

    #[test]
    fn test_software_upgrade_scenario() {
        let mut state = setup_state(dec!(1250.75), dec!(42.5), AccrualPeriod::Cycle);
        let hash_rate = state.hash_rate();

        let entry = state
            .purchase_upgrade(UpgradeKind::Software, dec!(200), 7)
            .unwrap();

        assert_eq!(state.balance(), dec!(1050.75));
        assert_eq!(state.accrual_rate(), dec!(52.5));
        assert_eq!(state.hash_rate(), hash_rate);
        assert_eq!(entry.kind, ActivityKind::Expense);
        assert_eq!(entry.amount, dec!(-200));
        assert_eq!(state.activity().len(), 1);
        assert_eq!(state.activity().latest(), Some(&entry));
    }

    #[test]
    fn test_equipment_upgrade_raises_hash_rate() {
        let mut state = setup_state(dec!(600), dec!(42.5), AccrualPeriod::Cycle);
        let hash_rate = state.hash_rate();

        state
            .purchase_upgrade(UpgradeKind::Equipment, dec!(500), 1)
            .unwrap();

        assert_eq!(state.balance(), dec!(100));
        assert_eq!(state.accrual_rate(), dec!(57.5));
        assert_eq!(state.hash_rate(), hash_rate + dec!(25));
    }

    #[test]
    fn test_insufficient_balance_leaves_state_unchanged() {
        let mut state = setup_state(dec!(100), dec!(42.5), AccrualPeriod::Cycle);
        let hash_rate = state.hash_rate();

        let result = state.purchase_upgrade(UpgradeKind::Equipment, dec!(500), 1);

        assert_eq!(
            result,
            Err(SessionError::InsufficientBalance {
                balance: dec!(100),
                cost: dec!(500),
            })
        );
        assert_eq!(state.balance(), dec!(100));
        assert_eq!(state.accrual_rate(), dec!(42.5));
        assert_eq!(state.hash_rate(), hash_rate);
        assert!(state.activity().is_empty());
    }

    #[test]
    fn test_exact_balance_upgrade_reaches_zero() {
        let mut state = setup_state(dec!(300), dec!(42.5), AccrualPeriod::Cycle);
        state
            .purchase_upgrade(UpgradeKind::Cooling, dec!(300), 1)
            .unwrap();
        assert_eq!(state.balance(), Decimal::ZERO);
    }

    #[test]
    fn test_quoted_cost_must_match_catalog() {
        let mut state = setup_state(dec!(1000), dec!(42.5), AccrualPeriod::Cycle);

        let result = state.purchase_upgrade(UpgradeKind::Cooling, dec!(1), 1);
        assert_eq!(
            result,
            Err(SessionError::Validation(ValidationError::PriceMismatch {
                quoted: dec!(1),
                price: dec!(300),
            }))
        );

        let result = state.purchase_upgrade(UpgradeKind::Cooling, dec!(-300), 1);
        assert_eq!(
            result,
            Err(SessionError::Validation(ValidationError::NonPositiveCost))
        );
        assert_eq!(state.balance(), dec!(1000));
        assert!(state.activity().is_empty());
    }

    #[test]
    fn test_per_minute_accrual_scenario() {
        let mut state = setup_state(dec!(0), dec!(42.5), AccrualPeriod::Minute);
        state.toggle_mining();

        let entry = state.accrue(60).unwrap();

        assert_eq!(entry.amount, dec!(42.5) / dec!(60));
        assert_eq!(state.balance(), dec!(42.5) / dec!(60));
        assert_eq!(state.balance().round_dp(4), dec!(0.7083));
        assert_eq!(entry.kind, ActivityKind::Income);
        assert_eq!(entry.title, MINING_REWARD_TITLE);
        assert_eq!(state.activity().len(), 1);
    }

    #[test]
    fn test_accrue_is_noop_while_idle() {
        let mut state = setup_state(dec!(10), dec!(42.5), AccrualPeriod::Minute);
        assert!(state.accrue(1).is_none());
        assert_eq!(state.balance(), dec!(10));
        assert!(state.activity().is_empty());
    }

    #[test]
    fn test_idle_ticks_never_accrue() {
        let mut state = setup_state(dec!(10), dec!(42.5), AccrualPeriod::Cycle);
        for now in 0..(CYCLE_SECS as u64 * 2) {
            assert!(state.tick(now).is_none());
        }
        assert_eq!(state.balance(), dec!(10));
        assert_eq!(state.countdown().to_string(), "15:00");
    }

    #[test]
    fn test_cycle_accrues_once_per_wrap() {
        let mut state = setup_state(dec!(0), dec!(42.5), AccrualPeriod::Cycle);
        state.toggle_mining();

        let mut rewards = 0;
        for now in 1..=(CYCLE_SECS as u64 * 2) {
            if let Some(entry) = state.tick(now) {
                rewards += 1;
                assert_eq!(now % CYCLE_SECS as u64, 0);
                assert_eq!(entry.amount, dec!(42.5) / dec!(4));
            }
        }

        assert_eq!(rewards, 2);
        assert_eq!(state.balance(), dec!(21.25));
    }

    #[test]
    fn test_minute_period_accrues_every_sixty_ticks() {
        let mut state = setup_state(dec!(0), dec!(60), AccrualPeriod::Minute);
        state.toggle_mining();

        let rewards = (1..=CYCLE_SECS as u64)
            .filter_map(|now| state.tick(now))
            .count();

        assert_eq!(rewards, 15);
        assert_eq!(state.balance(), dec!(15));
    }

    #[test]
    fn test_toggle_rearms_countdown() {
        let mut state = setup_state(dec!(0), dec!(42.5), AccrualPeriod::Cycle);
        assert_eq!(state.toggle_mining(), MiningStatus::Mining);
        for now in 0..30 {
            state.tick(now);
        }
        assert_eq!(state.countdown().to_string(), "14:30");

        assert_eq!(state.toggle_mining(), MiningStatus::Idle);
        assert_eq!(state.countdown().to_string(), "14:30");

        assert_eq!(state.toggle_mining(), MiningStatus::Mining);
        assert_eq!(state.countdown().to_string(), "15:00");
    }

    #[test]
    fn test_activity_log_stays_bounded() {
        let mut state = setup_state(dec!(0), dec!(42.5), AccrualPeriod::Minute);
        state.toggle_mining();
        for now in 0..(ACTIVITY_LOG_CAPACITY as u64 + 5) {
            state.accrue(now);
        }
        assert_eq!(state.activity().len(), ACTIVITY_LOG_CAPACITY);
        assert_eq!(state.activity().latest().unwrap().timestamp, 14);
    }

    #[test]
    fn test_snapshot_round_trip_through_json() {
        let mut state = setup_state(dec!(1250.75), dec!(42.5), AccrualPeriod::Cycle);
        state.toggle_mining();
        let snapshot = state.snapshot(99);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["balance"], "1250.75");
        assert_eq!(json["accrualRate"], "42.5");
        assert_eq!(json["isMining"], true);
        assert_eq!(json["lastUpdated"], 99);

        let restored: SessionSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(restored, snapshot);
    }

    #[test]
    fn test_negative_persisted_balance_is_clamped() {
        let state = setup_state(dec!(-5), dec!(42.5), AccrualPeriod::Cycle);
        assert_eq!(state.balance(), Decimal::ZERO);
    }
}
