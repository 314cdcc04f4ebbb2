use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::sponsors;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sponsor {
    pub id: i32,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl From<sponsors::Model> for Sponsor {
    fn from(model: sponsors::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            phone: model.phone,
            email: model.email,
            date: model.date,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewSponsor {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub date: NaiveDate,
}

/// Number of sponsors whose date falls in one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthCount {
    /// `YYYY-MM`
    pub month: String,
    pub count: u64,
}
