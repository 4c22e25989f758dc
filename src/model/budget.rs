use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A monthly spending limit. There is at most one budget per category per tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    pub id: i64,
    pub category: String,
    pub monthly_limit: Decimal,
}
