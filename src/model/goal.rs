use chrono::NaiveDate;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A savings target. A goal without an `end_date` is open-ended: its progress can be queried but
/// it has no pacing insight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavingGoal {
    pub id: i64,
    pub name: String,
    pub target_amount: Decimal,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSavingGoal {
    pub name: String,
    pub target_amount: Decimal,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub note: String,
}

impl NewSavingGoal {
    pub(crate) fn into_goal(self, id: i64) -> SavingGoal {
        SavingGoal {
            id,
            name: self.name,
            target_amount: self.target_amount,
            start_date: self.start_date,
            end_date: self.end_date,
            note: self.note,
        }
    }
}

/// The fields that can be changed on a saving goal. Fields that are `None` are left untouched.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SavingGoalUpdates {
    /// New name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// New target amount. Must be greater than zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<f64>")]
    pub target_amount: Option<Decimal>,

    /// New start date, formatted as YYYY-MM-DD.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,

    /// New end date, formatted as YYYY-MM-DD.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,

    /// New free-form note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl SavingGoalUpdates {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.target_amount.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
            && self.note.is_none()
    }
}
