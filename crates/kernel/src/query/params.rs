//! Listing parameter parsing and validation.
//!
//! Raw query-string values become a validated `ListParams` before any SQL
//! is assembled. Filters arrive as typed predicates so the conjunction the
//! builder folds them into is statically inspectable.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use crate::error::AppError;
use crate::models::Mood;
use crate::query::cursor::PageCursor;

/// Page size when the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Hard upper bound on a single page; larger requests silently clamp.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Which slice of the store a listing draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisibilityScope {
    /// Everything the caller owns, regardless of tier.
    #[default]
    All,
    /// The caller's private entries.
    Private,
    /// The caller's shared entries.
    Shared,
    /// All public entries, the caller's and everyone else's.
    Public,
}

impl std::str::FromStr for VisibilityScope {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(VisibilityScope::All),
            "private" => Ok(VisibilityScope::Private),
            "shared" => Ok(VisibilityScope::Shared),
            "public" => Ok(VisibilityScope::Public),
            _ => Err(()),
        }
    }
}

/// One filter clause. All predicates AND together; there is no OR between
/// filters (free text spans title/body/tags internally, which is the one
/// disjunction the design allows).
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Entry's tag set contains this tag exactly.
    TagContains(String),
    /// Entry's mood equals this value.
    MoodEquals(Mood),
    /// Entry's creation timestamp falls within the inclusive bounds.
    DateRange {
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    },
    /// Title, body, or a tag contains this substring (case-sensitive).
    TextContains(String),
}

/// Raw listing inputs as they arrive on the query string.
///
/// Aliases keep the wire names older clients send working.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct RawListParams {
    pub scope: Option<String>,
    pub tag: Option<String>,
    pub mood: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub q: Option<String>,
    #[serde(alias = "pageSize")]
    pub page_size: Option<i64>,
    #[serde(alias = "nextToken")]
    pub token: Option<String>,
}

/// Validated listing parameters.
#[derive(Debug, Clone)]
pub struct ListParams {
    pub scope: VisibilityScope,
    pub page_size: u32,
    pub cursor: Option<PageCursor>,
    pub predicates: Vec<Predicate>,
}

impl RawListParams {
    /// Validate and convert into typed parameters.
    pub fn validate(self) -> Result<ListParams, AppError> {
        let scope = match non_empty(self.scope) {
            None => VisibilityScope::default(),
            Some(raw) => raw
                .parse()
                .map_err(|()| AppError::BadRequest(format!("unknown scope: {raw}")))?,
        };

        // Values outside [1, MAX] clamp silently; absence means the default.
        let page_size = self
            .page_size
            .unwrap_or(i64::from(DEFAULT_PAGE_SIZE))
            .clamp(1, i64::from(MAX_PAGE_SIZE)) as u32;

        let cursor = match non_empty(self.token) {
            None => None,
            Some(token) => Some(
                PageCursor::decode(&token).map_err(|e| AppError::BadRequest(e.to_string()))?,
            ),
        };

        let mut predicates = Vec::new();

        if let Some(tag) = non_empty(self.tag) {
            predicates.push(Predicate::TagContains(tag));
        }

        if let Some(raw) = non_empty(self.mood) {
            let mood: Mood = raw
                .parse()
                .map_err(|e: crate::models::entry::UnknownVariant| {
                    AppError::BadRequest(e.to_string())
                })?;
            predicates.push(Predicate::MoodEquals(mood));
        }

        let from = non_empty(self.from)
            .map(|raw| parse_bound(&raw, false))
            .transpose()?;
        let to = non_empty(self.to)
            .map(|raw| parse_bound(&raw, true))
            .transpose()?;

        if let (Some(from), Some(to)) = (from, to)
            && from > to
        {
            return Err(AppError::BadRequest(
                "invalid date range: start is after end".to_string(),
            ));
        }

        if from.is_some() || to.is_some() {
            predicates.push(Predicate::DateRange { from, to });
        }

        if let Some(text) = non_empty(self.q) {
            predicates.push(Predicate::TextContains(text));
        }

        Ok(ListParams {
            scope,
            page_size,
            cursor,
            predicates,
        })
    }
}

impl ListParams {
    /// Whether a free-text predicate was supplied. The dedicated search
    /// path requires one.
    pub fn has_text_filter(&self) -> bool {
        self.predicates
            .iter()
            .any(|p| matches!(p, Predicate::TextContains(_)))
    }
}

/// Empty and whitespace-only strings count as "not supplied".
fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a date bound: RFC 3339, or a bare date which expands to the start
/// (for `from`) or end (for `to`) of that day in UTC.
fn parse_bound(raw: &str, end_of_day: bool) -> Result<DateTime<Utc>, AppError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        let time = if end_of_day {
            date.and_hms_micro_opt(23, 59, 59, 999_999)
        } else {
            date.and_hms_opt(0, 0, 0)
        };
        if let Some(naive) = time {
            return Ok(naive.and_utc());
        }
    }

    Err(AppError::BadRequest(format!("invalid date: {raw}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_with_no_input() {
        let params = RawListParams::default().validate().unwrap();
        assert_eq!(params.scope, VisibilityScope::All);
        assert_eq!(params.page_size, DEFAULT_PAGE_SIZE);
        assert!(params.cursor.is_none());
        assert!(params.predicates.is_empty());
    }

    #[test]
    fn page_size_clamps_never_errors() {
        let over = RawListParams {
            page_size: Some(5000),
            ..Default::default()
        };
        assert_eq!(over.validate().unwrap().page_size, MAX_PAGE_SIZE);

        let under = RawListParams {
            page_size: Some(-3),
            ..Default::default()
        };
        assert_eq!(under.validate().unwrap().page_size, 1);
    }

    #[test]
    fn empty_strings_mean_absent() {
        let raw = RawListParams {
            tag: Some("".to_string()),
            mood: Some("   ".to_string()),
            q: Some("".to_string()),
            scope: Some("".to_string()),
            ..Default::default()
        };
        let params = raw.validate().unwrap();
        assert_eq!(params.scope, VisibilityScope::All);
        assert!(params.predicates.is_empty());
    }

    #[test]
    fn unknown_scope_rejected() {
        let raw = RawListParams {
            scope: Some("friends".to_string()),
            ..Default::default()
        };
        assert!(matches!(raw.validate(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn unknown_mood_rejected() {
        let raw = RawListParams {
            mood: Some("melancholy".to_string()),
            ..Default::default()
        };
        assert!(matches!(raw.validate(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn filters_become_typed_predicates() {
        let raw = RawListParams {
            tag: Some("travel".to_string()),
            mood: Some("happy".to_string()),
            q: Some("rome".to_string()),
            ..Default::default()
        };
        let params = raw.validate().unwrap();
        assert_eq!(params.predicates.len(), 3);
        assert!(params.predicates.contains(&Predicate::TagContains("travel".to_string())));
        assert!(params.predicates.contains(&Predicate::MoodEquals(Mood::Happy)));
        assert!(params.has_text_filter());
    }

    #[test]
    fn bare_dates_expand_to_day_bounds() {
        let raw = RawListParams {
            from: Some("2024-01-01".to_string()),
            to: Some("2024-01-31".to_string()),
            ..Default::default()
        };
        let params = raw.validate().unwrap();
        let Some(Predicate::DateRange { from, to }) = params.predicates.first() else {
            panic!("expected a date range predicate");
        };
        assert_eq!(from.unwrap().to_rfc3339(), "2024-01-01T00:00:00+00:00");
        assert!(to.unwrap().to_rfc3339().starts_with("2024-01-31T23:59:59"));
    }

    #[test]
    fn rfc3339_bounds_accepted() {
        let raw = RawListParams {
            from: Some("2024-01-01T12:00:00Z".to_string()),
            ..Default::default()
        };
        let params = raw.validate().unwrap();
        assert_eq!(params.predicates.len(), 1);
    }

    #[test]
    fn inverted_range_is_an_error() {
        let raw = RawListParams {
            from: Some("2024-02-01".to_string()),
            to: Some("2024-01-01".to_string()),
            ..Default::default()
        };
        assert!(matches!(raw.validate(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn unparseable_date_is_an_error() {
        let raw = RawListParams {
            from: Some("January 1st".to_string()),
            ..Default::default()
        };
        assert!(matches!(raw.validate(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn malformed_token_is_an_error() {
        let raw = RawListParams {
            token: Some("!!not-a-token!!".to_string()),
            ..Default::default()
        };
        assert!(matches!(raw.validate(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn valid_token_decodes() {
        let cursor = PageCursor::new(Utc::now(), uuid::Uuid::now_v7());
        let raw = RawListParams {
            token: Some(cursor.encode()),
            ..Default::default()
        };
        assert_eq!(raw.validate().unwrap().cursor, Some(cursor));
    }
}
