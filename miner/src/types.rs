use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Upgrade categories offered by the catalog.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpgradeKind {
    Equipment,
    Cooling,
    Software,
}

impl UpgradeKind {
    pub const ALL: [UpgradeKind; 3] = [
        UpgradeKind::Equipment,
        UpgradeKind::Cooling,
        UpgradeKind::Software,
    ];
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MiningStatus {
    #[default]
    Idle,
    Mining,
}

impl MiningStatus {
    pub fn is_mining(self) -> bool {
        self == MiningStatus::Mining
    }
}

/// How often accrued reward is credited.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccrualPeriod {
    /// Credit on every whole minute of the countdown
    Minute,
    /// Credit once per completed 15 minute countdown cycle
    #[default]
    Cycle,
}

impl AccrualPeriod {
    pub fn periods_per_hour(self) -> u32 {
        match self {
            AccrualPeriod::Minute => 60,
            AccrualPeriod::Cycle => 4,
        }
    }

    pub fn seconds(self) -> u32 {
        3600 / self.periods_per_hour()
    }

    /// Reward credited for one period at `accrual_rate` points per hour.
    pub fn reward(self, accrual_rate: Decimal) -> Decimal {
        accrual_rate / Decimal::from(self.periods_per_hour())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Income,
    Expense,
}

/// One balance-affecting event in the activity log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub title: String,
    pub description: String,
    /// Signed: positive for income, negative for expense
    pub amount: Decimal,
    pub kind: ActivityKind,
    /// Milliseconds since the unix epoch
    pub timestamp: u64,
}

impl Activity {
    pub fn income(title: &str, description: String, amount: Decimal, timestamp: u64) -> Self {
        Self {
            title: title.to_string(),
            description,
            amount,
            kind: ActivityKind::Income,
            timestamp,
        }
    }

    pub fn expense(title: &str, description: String, cost: Decimal, timestamp: u64) -> Self {
        Self {
            title: title.to_string(),
            description,
            amount: -cost,
            kind: ActivityKind::Expense,
            timestamp,
        }
    }
}

/// Account handed back by the authentication service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub uid: String,
    pub email: String,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}
