use serde::{Deserialize, Serialize};

/// Catalog entry for a bookable service. Read-only from the ledger's
/// point of view; only `duration_minutes` feeds the slot math.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSpec {
    pub id: String,
    pub name: String,
    pub duration_minutes: i32,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Barber {
    pub id: String,
    pub name: String,
    pub status: BarberStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BarberStatus {
    Active,
    Inactive,
}

impl BarberStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BarberStatus::Active => "active",
            BarberStatus::Inactive => "inactive",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "inactive" => BarberStatus::Inactive,
            _ => BarberStatus::Active,
        }
    }
}
