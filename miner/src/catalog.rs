use rust_decimal::Decimal;
use serde::Serialize;

use crate::types::UpgradeKind;

/// Price and effect of one catalog upgrade
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Upgrade {
    pub kind: UpgradeKind,
    pub name: &'static str,
    pub cost: Decimal,
    pub accrual_rate_delta: Decimal,
    pub hash_rate_delta: Decimal,
}

const EQUIPMENT: Upgrade = Upgrade {
    kind: UpgradeKind::Equipment,
    name: "Equipment Upgrade",
    cost: Decimal::from_parts(500, 0, 0, false, 0),
    accrual_rate_delta: Decimal::from_parts(15, 0, 0, false, 0),
    hash_rate_delta: Decimal::from_parts(25, 0, 0, false, 0),
};

const COOLING: Upgrade = Upgrade {
    kind: UpgradeKind::Cooling,
    name: "Cooling Upgrade",
    cost: Decimal::from_parts(300, 0, 0, false, 0),
    accrual_rate_delta: Decimal::from_parts(5, 0, 0, false, 0),
    hash_rate_delta: Decimal::ZERO,
};

const SOFTWARE: Upgrade = Upgrade {
    kind: UpgradeKind::Software,
    name: "Software Upgrade",
    cost: Decimal::from_parts(200, 0, 0, false, 0),
    accrual_rate_delta: Decimal::from_parts(10, 0, 0, false, 0),
    hash_rate_delta: Decimal::ZERO,
};

/// Catalog entry for `kind`.
pub fn lookup(kind: UpgradeKind) -> &'static Upgrade {
    match kind {
        UpgradeKind::Equipment => &EQUIPMENT,
        UpgradeKind::Cooling => &COOLING,
        UpgradeKind::Software => &SOFTWARE,
    }
}

pub fn all() -> [&'static Upgrade; 3] {
    UpgradeKind::ALL.map(lookup)
}
