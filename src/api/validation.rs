use chrono::NaiveDate;

use super::ApiError;
use crate::models::NewSponsor;
use crate::services::auth_service_impl::validate_email;

use super::types::SponsorForm;

pub fn require_field<'a>(field: &str, value: &'a str) -> Result<&'a str, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation(format!("{field} is required")));
    }
    Ok(trimmed)
}

/// Parses a `YYYY-MM-DD` date.
pub fn validate_date(field: &str, value: &str) -> Result<NaiveDate, ApiError> {
    let value = require_field(field, value)?;
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        ApiError::validation(format!(
            "Invalid {field}: '{value}'. Expected a date in YYYY-MM-DD format"
        ))
    })
}

/// Calendar widgets send ISO timestamps (`2026-10-01T00:00:00+05:30`); only
/// the leading date is used.
pub fn validate_range_bound(field: &str, value: Option<&str>) -> Result<NaiveDate, ApiError> {
    let value = value.unwrap_or_default().trim();
    let date_part = value.get(..10).unwrap_or(value);
    validate_date(field, date_part)
}

pub fn validate_search_query(query: Option<&str>) -> Result<&str, ApiError> {
    let trimmed = query.unwrap_or_default().trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("Search query cannot be empty"));
    }
    if trimmed.chars().count() > 100 {
        return Err(ApiError::validation(
            "Search query must be 100 characters or less",
        ));
    }
    Ok(trimmed)
}

pub fn validate_sponsor_form(form: &SponsorForm) -> Result<NewSponsor, ApiError> {
    let name = require_field("name", &form.name)?;
    let phone = require_field("phone", &form.phone)?;
    let email = require_field("email", &form.email)?;
    validate_email(email).map_err(ApiError::from)?;
    let date = validate_date("date", &form.date)?;

    Ok(NewSponsor {
        name: name.to_string(),
        phone: phone.to_string(),
        email: email.to_string(),
        date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(date: &str) -> SponsorForm {
        SponsorForm {
            name: " Ravi Shankar ".to_string(),
            phone: "555-0199".to_string(),
            email: "ravi@example.org".to_string(),
            date: date.to_string(),
        }
    }

    #[test]
    fn test_validate_date() {
        assert_eq!(
            validate_date("date", "2026-10-20").unwrap(),
            NaiveDate::from_ymd_opt(2026, 10, 20).unwrap()
        );
        assert!(validate_date("date", "").is_err());
        assert!(validate_date("date", "20-10-2026").is_err());
        assert!(validate_date("date", "2026-02-30").is_err());
    }

    #[test]
    fn test_range_bound_accepts_timestamps() {
        let expected = NaiveDate::from_ymd_opt(2026, 9, 28).unwrap();
        assert_eq!(
            validate_range_bound("start", Some("2026-09-28T00:00:00+05:30")).unwrap(),
            expected
        );
        assert_eq!(validate_range_bound("start", Some("2026-09-28")).unwrap(), expected);
        assert!(validate_range_bound("start", None).is_err());
    }

    #[test]
    fn test_sponsor_form() {
        let sponsor = validate_sponsor_form(&form("2019-01-01")).unwrap();
        assert_eq!(sponsor.name, "Ravi Shankar");
        assert_eq!(sponsor.date, NaiveDate::from_ymd_opt(2019, 1, 1).unwrap());

        assert!(validate_sponsor_form(&form("tomorrow")).is_err());

        let mut missing = form("2026-10-20");
        missing.phone = "  ".to_string();
        assert!(validate_sponsor_form(&missing).is_err());
    }

    #[test]
    fn test_validate_search_query() {
        assert_eq!(validate_search_query(Some("  asha ")).unwrap(), "asha");
        assert!(validate_search_query(Some("   ")).is_err());
        assert!(validate_search_query(None).is_err());
    }
}
