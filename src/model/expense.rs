use chrono::NaiveDate;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A single persisted expense.
///
/// `category` is always a key of the vocabulary and `subcategory` is always one of that key's
/// subcategories, as of the time the row was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub category: String,
    pub subcategory: String,
    pub note: String,
}

/// An expense that has been validated and normalized but not yet assigned an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewExpense {
    pub date: NaiveDate,
    pub amount: Decimal,
    pub category: String,
    pub subcategory: String,
    pub note: String,
}

impl NewExpense {
    pub(crate) fn into_expense(self, id: i64) -> Expense {
        Expense {
            id,
            date: self.date,
            amount: self.amount,
            category: self.category,
            subcategory: self.subcategory,
            note: self.note,
        }
    }
}

/// The fields that can be changed on an expense. Fields that are `None` are left untouched.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ExpenseUpdates {
    /// New date, formatted as YYYY-MM-DD.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    /// New amount. Must be greater than zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<f64>")]
    pub amount: Option<Decimal>,

    /// New category. Unknown categories are replaced with `misc`. When given without a
    /// subcategory, the existing subcategory is re-checked against the new category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// New subcategory. Unknown subcategories are replaced with `other` (or the category's first
    /// subcategory).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,

    /// New free-form note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ExpenseUpdates {
    /// Returns `true` if no field has been supplied.
    pub fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.amount.is_none()
            && self.category.is_none()
            && self.subcategory.is_none()
            && self.note.is_none()
    }
}
