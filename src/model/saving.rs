use chrono::NaiveDate;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A single persisted saving entry. `source` is always one of the vocabulary's saving sources as
/// of the time the row was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Saving {
    pub id: i64,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub source: String,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSaving {
    pub date: NaiveDate,
    pub amount: Decimal,
    pub source: String,
    pub note: String,
}

impl NewSaving {
    pub(crate) fn into_saving(self, id: i64) -> Saving {
        Saving {
            id,
            date: self.date,
            amount: self.amount,
            source: self.source,
            note: self.note,
        }
    }
}

/// The fields that can be changed on a saving entry. Fields that are `None` are left untouched.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SavingUpdates {
    /// New date, formatted as YYYY-MM-DD.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    /// New amount. Must be greater than zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<f64>")]
    pub amount: Option<Decimal>,

    /// New source. Unknown sources are replaced with `other` (or the first known source).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// New free-form note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl SavingUpdates {
    pub fn is_empty(&self) -> bool {
        self.date.is_none() && self.amount.is_none() && self.source.is_none() && self.note.is_none()
    }
}
