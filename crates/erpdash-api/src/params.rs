//! Query-string parsing shared by the list endpoints and pages

use chrono::NaiveDate;
use erpdash_config::Config;
use erpdash_core::table::validate_page_size;
use erpdash_core::{CoreError, FilterSet, Predicate, SortDescriptor, SortDirection, TableQuery};
use std::collections::HashMap;

use crate::error::{ApiError, ApiResult};

pub type Params = HashMap<String, String>;

/// Which query parameters a table understands and the record fields they filter
#[derive(Debug, Clone, Copy)]
pub struct TableParams {
    /// Fields searched by `q`
    pub search_fields: &'static [&'static str],
    /// `(parameter, field)` pairs of categorical filters
    pub categories: &'static [(&'static str, &'static str)],
    /// Field filtered by `date_from` / `date_to`
    pub date_field: Option<&'static str>,
    /// `(min parameter, max parameter, field)` of a numeric range
    pub range: Option<(&'static str, &'static str, &'static str)>,
    /// Sort applied when the request names none
    pub default_sort: Option<(&'static str, SortDirection)>,
}

fn invalid(param: &str, reason: impl Into<String>) -> ApiError {
    ApiError::Core(CoreError::InvalidQuery {
        param: param.to_string(),
        reason: reason.into(),
    })
}

/// Non-empty, trimmed parameter value
pub fn value<'a>(params: &'a Params, name: &str) -> Option<&'a str> {
    params.get(name).map(|v| v.trim()).filter(|v| !v.is_empty())
}

pub fn date(params: &Params, name: &str) -> ApiResult<Option<NaiveDate>> {
    match value(params, name) {
        None => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| invalid(name, "expected a date as YYYY-MM-DD")),
    }
}

pub fn number(params: &Params, name: &str) -> ApiResult<Option<f64>> {
    match value(params, name) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| invalid(name, "expected a number")),
    }
}

pub fn integer<T: std::str::FromStr>(params: &Params, name: &str) -> ApiResult<Option<T>> {
    match value(params, name) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| invalid(name, "expected a whole number")),
    }
}

pub fn flag(params: &Params, name: &str) -> bool {
    matches!(value(params, name), Some("true") | Some("1") | Some("yes") | Some("on"))
}

/// Destructive actions need `confirm=true`
pub fn require_confirmation(params: &Params, action: &str) -> ApiResult<()> {
    if flag(params, "confirm") {
        Ok(())
    } else {
        Err(ApiError::ConfirmationRequired {
            action: action.to_string(),
        })
    }
}

/// Build the table controls from the query string.
///
/// `page` is one-based in URLs. `page_size` must be one of the configured
/// sizes. `sort` names a field, `dir` is `asc` or `desc`.
pub fn table_query(params: &Params, table: &TableParams, config: &Config) -> ApiResult<TableQuery> {
    let mut filters = FilterSet::new();

    if let Some(term) = value(params, "q") {
        filters.set("search", Predicate::text(table.search_fields, term));
    }
    for (param, field) in table.categories {
        if let Some(v) = value(params, param) {
            filters.set(param, Predicate::category(field, v));
        }
    }
    if let Some(field) = table.date_field {
        let from = date(params, "date_from")?;
        let to = date(params, "date_to")?;
        if let (Some(f), Some(t)) = (from, to) {
            if f > t {
                return Err(invalid("date_from", "must not be after date_to"));
            }
        }
        filters.set("dates", Predicate::date_range(field, from, to));
    }
    if let Some((min_param, max_param, field)) = table.range {
        let min = number(params, min_param)?;
        let max = number(params, max_param)?;
        if let (Some(lo), Some(hi)) = (min, max) {
            if lo > hi {
                return Err(invalid(min_param, format!("must not exceed {}", max_param)));
            }
        }
        filters.set("range", Predicate::numeric_range(field, min, max));
    }

    let sort = match value(params, "sort") {
        Some(key) => {
            let direction = match value(params, "dir") {
                Some(dir) => dir.parse::<SortDirection>().map_err(|e| invalid("dir", e))?,
                None => SortDirection::Ascending,
            };
            Some(SortDescriptor {
                key: key.to_string(),
                direction,
            })
        }
        None => table.default_sort.map(|(key, direction)| SortDescriptor {
            key: key.to_string(),
            direction,
        }),
    };

    let page_size = match integer::<usize>(params, "page_size")? {
        Some(size) => validate_page_size(size, &config.pagination.page_sizes)?,
        None => config.pagination.default_page_size,
    };
    let page = integer::<usize>(params, "page")?.unwrap_or(1).saturating_sub(1);

    Ok(TableQuery {
        filters,
        sort,
        page,
        page_size,
    })
}

/// Query string with some parameters replaced, for page and sort links
pub fn with_params(params: &Params, overrides: &[(&str, String)]) -> String {
    let mut merged: Vec<(String, String)> = params
        .iter()
        .filter(|(k, v)| !v.is_empty() && !overrides.iter().any(|(o, _)| o == k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    merged.extend(overrides.iter().map(|(k, v)| (k.to_string(), v.clone())));
    merged.sort();
    merged
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;

    const JOURNALS: TableParams = TableParams {
        search_fields: &["journal_number", "description"],
        categories: &[("status", "status")],
        date_field: Some("date"),
        range: Some(("min_amount", "max_amount", "total_debit")),
        default_sort: Some(("date", SortDirection::Descending)),
    };

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_defaults() {
        let query = table_query(&Params::new(), &JOURNALS, &Config::default()).unwrap();
        assert_eq!(query.page, 0);
        assert_eq!(query.page_size, 15);
        assert_eq!(query.sort, Some(SortDescriptor::descending("date")));
        assert_eq!(query.filters.active_count(), 0);
    }

    #[test]
    fn test_full_query() {
        let query = table_query(
            &params(&[
                ("q", "rent"),
                ("status", "draft"),
                ("date_from", "2024-01-01"),
                ("min_amount", "10"),
                ("sort", "total_debit"),
                ("dir", "desc"),
                ("page", "2"),
                ("page_size", "30"),
            ]),
            &JOURNALS,
            &Config::default(),
        )
        .unwrap();
        assert_eq!(query.filters.active_count(), 4);
        assert_eq!(query.sort, Some(SortDescriptor::descending("total_debit")));
        assert_eq!(query.page, 1);
        assert_eq!(query.page_size, 30);
    }

    #[test]
    fn test_invalid_values() {
        let config = Config::default();
        assert!(table_query(&params(&[("page_size", "25")]), &JOURNALS, &config).is_err());
        assert!(table_query(&params(&[("date_from", "01/02/2024")]), &JOURNALS, &config).is_err());
        assert!(table_query(&params(&[("min_amount", "lots")]), &JOURNALS, &config).is_err());
        assert!(table_query(&params(&[("min_amount", "5"), ("max_amount", "1")]), &JOURNALS, &config).is_err());
        assert!(table_query(&params(&[("sort", "date"), ("dir", "up")]), &JOURNALS, &config).is_err());
    }

    #[test]
    fn test_confirmation() {
        assert!(require_confirmation(&params(&[("confirm", "true")]), "delete").is_ok());
        let err = require_confirmation(&Params::new(), "delete journal 4").unwrap_err();
        assert!(matches!(err, ApiError::ConfirmationRequired { .. }));
    }

    #[test]
    fn test_with_params() {
        let link = with_params(&params(&[("q", "a b"), ("page", "3")]), &[("page", "4".to_string())]);
        assert_eq!(link, "page=4&q=a%20b");
    }
}
