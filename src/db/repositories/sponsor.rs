use chrono::{NaiveDate, Utc};
use sea_orm::sea_query::{Expr, Func, LikeExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use std::collections::BTreeMap;

use crate::db::StoreResult;
use crate::entities::{prelude::*, sponsors};
use crate::models::{MonthCount, NewSponsor, Sponsor};

pub struct SponsorRepository {
    conn: DatabaseConnection,
}

impl SponsorRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn add(&self, sponsor: NewSponsor) -> StoreResult<Sponsor> {
        let active = sponsors::ActiveModel {
            name: Set(sponsor.name),
            phone: Set(sponsor.phone),
            email: Set(sponsor.email),
            date: Set(sponsor.date),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        let model = active.insert(&self.conn).await?;
        Ok(Sponsor::from(model))
    }

    /// Sponsors dated within `start..=end`.
    pub async fn in_range(&self, start: NaiveDate, end: NaiveDate) -> StoreResult<Vec<Sponsor>> {
        let rows = Sponsors::find()
            .filter(sponsors::Column::Date.gte(start))
            .filter(sponsors::Column::Date.lte(end))
            .order_by_asc(sponsors::Column::Date)
            .order_by_asc(sponsors::Column::Id)
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(Sponsor::from).collect())
    }

    /// Case-insensitive substring match over name, email and phone.
    ///
    /// SQLite's `lower()` and `LIKE` only fold ASCII, so queries with other
    /// characters are matched here with Unicode lowercasing.
    pub async fn search(&self, query: &str) -> StoreResult<Vec<Sponsor>> {
        let needle = query.to_lowercase();

        if !query.is_ascii() {
            let rows = Sponsors::find()
                .order_by_asc(sponsors::Column::Date)
                .order_by_asc(sponsors::Column::Id)
                .all(&self.conn)
                .await?;

            return Ok(rows
                .into_iter()
                .map(Sponsor::from)
                .filter(|s| sponsor_matches(s, &needle))
                .collect());
        }

        let pattern = format!("%{}%", escape_like(&needle));

        let matches = |column: sponsors::Column| {
            Expr::expr(Func::lower(Expr::col(column)))
                .like(LikeExpr::new(pattern.clone()).escape('\\'))
        };

        let rows = Sponsors::find()
            .filter(
                Condition::any()
                    .add(matches(sponsors::Column::Name))
                    .add(matches(sponsors::Column::Email))
                    .add(matches(sponsors::Column::Phone)),
            )
            .order_by_asc(sponsors::Column::Date)
            .order_by_asc(sponsors::Column::Id)
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(Sponsor::from).collect())
    }

    pub async fn count(&self) -> StoreResult<u64> {
        Ok(Sponsors::find().count(&self.conn).await?)
    }

    pub async fn counts_by_month(&self) -> StoreResult<Vec<MonthCount>> {
        let dates: Vec<NaiveDate> = Sponsors::find()
            .select_only()
            .column(sponsors::Column::Date)
            .into_tuple()
            .all(&self.conn)
            .await?;

        let mut months: BTreeMap<String, u64> = BTreeMap::new();
        for date in dates {
            *months.entry(date.format("%Y-%m").to_string()).or_default() += 1;
        }

        Ok(months
            .into_iter()
            .map(|(month, count)| MonthCount { month, count })
            .collect())
    }

    pub async fn recent(&self, limit: u64) -> StoreResult<Vec<Sponsor>> {
        let rows = Sponsors::find()
            .order_by_desc(sponsors::Column::CreatedAt)
            .order_by_desc(sponsors::Column::Id)
            .limit(limit)
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(Sponsor::from).collect())
    }

    pub async fn upcoming(&self, from: NaiveDate, limit: u64) -> StoreResult<Vec<Sponsor>> {
        let rows = Sponsors::find()
            .filter(sponsors::Column::Date.gte(from))
            .order_by_asc(sponsors::Column::Date)
            .order_by_asc(sponsors::Column::Id)
            .limit(limit)
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(Sponsor::from).collect())
    }
}

/// `needle` must already be lowercased.
fn sponsor_matches(sponsor: &Sponsor, needle: &str) -> bool {
    [&sponsor.name, &sponsor.email, &sponsor.phone]
        .iter()
        .any(|field| field.to_lowercase().contains(needle))
}

fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::{escape_like, sponsor_matches};
    use crate::models::Sponsor;
    use chrono::{NaiveDate, Utc};

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like("plain"), "plain");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
    }

    #[test]
    fn unicode_match_folds_case_on_every_field() {
        let sponsor = Sponsor {
            id: 1,
            name: "Émile Durand".to_string(),
            phone: "555-0100".to_string(),
            email: "EMILE@Example.org".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 11, 5).unwrap(),
            created_at: Utc::now(),
        };

        assert!(sponsor_matches(&sponsor, "émile"));
        assert!(sponsor_matches(&sponsor, "emile@example"));
        assert!(sponsor_matches(&sponsor, "0100"));
        assert!(!sponsor_matches(&sponsor, "élise"));
    }
}
