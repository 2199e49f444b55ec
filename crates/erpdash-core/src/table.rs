//! Derived table pipeline: filter, then sort, then paginate
//!
//! Every list page (journals, products, stock movements, payment advices)
//! recomputes its visible rows from the fetched records and the current
//! controls with [`derive_table`]. Nothing is memoized; the whole pipeline
//! reruns on every change.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::error::{CoreError, CoreResult};
use crate::record::Record;

/// Categorical filter value meaning "no filter"
pub const ALL: &str = "all";

// ==================== Predicates ====================

/// One filter control
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    /// Case-insensitive substring over several fields
    Text { fields: Vec<String>, term: String },
    /// Exact match unless the value is [`ALL`] or empty
    Category { field: String, value: String },
    /// Inclusive numeric bounds
    NumericRange {
        field: String,
        min: Option<f64>,
        max: Option<f64>,
    },
    /// Inclusive date bounds
    DateRange {
        field: String,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    },
}

impl Predicate {
    pub fn text(fields: &[&str], term: impl Into<String>) -> Self {
        Predicate::Text {
            fields: fields.iter().map(|f| f.to_string()).collect(),
            term: term.into(),
        }
    }

    pub fn category(field: &str, value: impl Into<String>) -> Self {
        Predicate::Category {
            field: field.to_string(),
            value: value.into(),
        }
    }

    pub fn numeric_range(field: &str, min: Option<f64>, max: Option<f64>) -> Self {
        Predicate::NumericRange {
            field: field.to_string(),
            min,
            max,
        }
    }

    pub fn date_range(field: &str, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Predicate::DateRange {
            field: field.to_string(),
            from,
            to,
        }
    }

    /// Whether the predicate filters anything at all
    pub fn is_active(&self) -> bool {
        match self {
            Predicate::Text { term, .. } => !term.trim().is_empty(),
            Predicate::Category { value, .. } => {
                let v = value.trim();
                !v.is_empty() && !v.eq_ignore_ascii_case(ALL)
            }
            Predicate::NumericRange { min, max, .. } => min.is_some() || max.is_some(),
            Predicate::DateRange { from, to, .. } => from.is_some() || to.is_some(),
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        if !self.is_active() {
            return true;
        }
        match self {
            Predicate::Text { fields, term } => {
                let needle = term.trim().to_lowercase();
                fields.iter().any(|field| {
                    record
                        .text(field)
                        .map(|v| v.to_lowercase().contains(&needle))
                        .unwrap_or(false)
                })
            }
            Predicate::Category { field, value } => {
                record.text(field).as_deref() == Some(value.trim())
            }
            Predicate::NumericRange { field, min, max } => match record.number(field) {
                Some(n) => min.map_or(true, |lo| n >= lo) && max.map_or(true, |hi| n <= hi),
                None => false,
            },
            Predicate::DateRange { field, from, to } => match record.date(field) {
                Some(d) => from.map_or(true, |lo| d >= lo) && to.map_or(true, |hi| d <= hi),
                None => false,
            },
        }
    }
}

/// Named filter controls of one table. All predicates must match.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterSet {
    predicates: BTreeMap<String, Predicate>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`FilterSet::set`]
    pub fn with(mut self, name: &str, predicate: Predicate) -> Self {
        self.set(name, predicate);
        self
    }

    /// Set or replace the named control
    pub fn set(&mut self, name: &str, predicate: Predicate) {
        self.predicates.insert(name.to_string(), predicate);
    }

    pub fn clear(&mut self, name: &str) {
        self.predicates.remove(name);
    }

    /// Back to defaults: no filtering
    pub fn reset(&mut self) {
        self.predicates.clear();
    }

    pub fn get(&self, name: &str) -> Option<&Predicate> {
        self.predicates.get(name)
    }

    /// Number of controls currently filtering
    pub fn active_count(&self) -> usize {
        self.predicates.values().filter(|p| p.is_active()).count()
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.predicates.values().all(|p| p.matches(record))
    }

    /// Records matching every control, in input order
    pub fn apply(&self, records: &[Record]) -> Vec<Record> {
        records.iter().filter(|r| self.matches(r)).cloned().collect()
    }
}

// ==================== Sorting ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggle(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

impl std::str::FromStr for SortDirection {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Ascending),
            "desc" | "descending" => Ok(SortDirection::Descending),
            _ => Err(format!("Invalid sort direction: {}", s)),
        }
    }
}

impl std::fmt::Display for SortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortDirection::Ascending => write!(f, "asc"),
            SortDirection::Descending => write!(f, "desc"),
        }
    }
}

/// The single active sort of a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortDescriptor {
    pub key: String,
    pub direction: SortDirection,
}

impl SortDescriptor {
    pub fn ascending(key: &str) -> Self {
        Self {
            key: key.to_string(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(key: &str) -> Self {
        Self {
            key: key.to_string(),
            direction: SortDirection::Descending,
        }
    }

    /// Sort after the user picks `key`: the active key flips direction,
    /// any other key starts ascending.
    pub fn select(current: Option<&SortDescriptor>, key: &str) -> SortDescriptor {
        match current {
            Some(active) if active.key == key => SortDescriptor {
                key: key.to_string(),
                direction: active.direction.toggle(),
            },
            _ => SortDescriptor::ascending(key),
        }
    }
}

/// Order two field values. Values are ranked by class first (missing or
/// null, then numeric, then booleans, then text) and compared within the
/// class: numbers and numeric strings numerically, other strings
/// case-folded with case as tie-break.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let (a, b) = (SortKey::of(a), SortKey::of(b));
    match a.rank().cmp(&b.rank()) {
        Ordering::Equal => {}
        other => return other,
    }
    match (a, b) {
        (SortKey::Number(x), SortKey::Number(y)) => x.total_cmp(&y),
        (SortKey::Bool(x), SortKey::Bool(y)) => x.cmp(&y),
        (SortKey::Text(x), SortKey::Text(y)) => compare_text(&x, &y),
        _ => Ordering::Equal,
    }
}

enum SortKey {
    Missing,
    Number(f64),
    Bool(bool),
    Text(String),
}

impl SortKey {
    fn of(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => SortKey::Missing,
            Some(Value::Bool(b)) => SortKey::Bool(*b),
            Some(v) => match numeric(v) {
                Some(n) => SortKey::Number(n),
                None => SortKey::Text(scalar_text(v)),
            },
        }
    }

    fn rank(&self) -> u8 {
        match self {
            SortKey::Missing => 0,
            SortKey::Number(_) => 1,
            SortKey::Bool(_) => 2,
            SortKey::Text(_) => 3,
        }
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Locale-style text ordering: case-insensitive first, lowercase before
/// uppercase on ties
pub fn compare_text(a: &str, b: &str) -> Ordering {
    let folded = a.to_lowercase().cmp(&b.to_lowercase());
    if folded != Ordering::Equal {
        return folded;
    }
    // 'a' (0x61) sorts after 'A' (0x41) in code points; flip for lowercase-first
    b.cmp(a)
}

/// Stable sort by the descriptor; records with equal keys keep input order
pub fn sort_records(records: &mut [Record], sort: &SortDescriptor) {
    records.sort_by(|a, b| {
        let ord = compare_values(a.get(&sort.key), b.get(&sort.key));
        match sort.direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    });
}

// ==================== Pagination ====================

/// One page of a derived table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Zero-based page index after clamping
    pub page: usize,
    pub page_size: usize,
    /// Rows after filtering, across all pages
    pub total_count: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    pub fn has_previous(&self) -> bool {
        self.page > 0
    }

    pub fn has_next(&self) -> bool {
        self.page + 1 < self.total_pages
    }

    /// One-based index of the first row on this page (0 when empty)
    pub fn first_row(&self) -> usize {
        if self.items.is_empty() {
            0
        } else {
            self.page * self.page_size + 1
        }
    }

    pub fn last_row(&self) -> usize {
        if self.items.is_empty() {
            0
        } else {
            self.page * self.page_size + self.items.len()
        }
    }
}

/// Number of pages needed for `count` rows
pub fn page_count(count: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    count.div_ceil(page_size)
}

/// Slice one page out of `items`. The page index is clamped into range;
/// an empty input yields page 0 of 0.
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let total_count = items.len();
    let total_pages = page_count(total_count, page_size);
    let page = page.min(total_pages.saturating_sub(1));
    let start = page * page_size;
    let end = (start + page_size).min(total_count);
    let items = if start < end {
        items[start..end].to_vec()
    } else {
        Vec::new()
    };

    Page {
        items,
        page,
        page_size,
        total_count,
        total_pages,
    }
}

/// Check a requested page size against the allowed choices
pub fn validate_page_size(page_size: usize, allowed: &[usize]) -> CoreResult<usize> {
    if allowed.contains(&page_size) {
        Ok(page_size)
    } else {
        Err(CoreError::InvalidQuery {
            param: "page_size".to_string(),
            reason: format!("must be one of {:?}", allowed),
        })
    }
}

// ==================== Pipeline ====================

/// All controls of one table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableQuery {
    pub filters: FilterSet,
    pub sort: Option<SortDescriptor>,
    pub page: usize,
    pub page_size: usize,
}

impl Default for TableQuery {
    fn default() -> Self {
        Self {
            filters: FilterSet::default(),
            sort: None,
            page: 0,
            page_size: erpdash_config::DEFAULT_PAGE_SIZES[0],
        }
    }
}

impl TableQuery {
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            page_size,
            ..Self::default()
        }
    }

    /// Filtered and sorted rows, before pagination
    pub fn filter_and_sort(&self, source: &[Record]) -> Vec<Record> {
        let mut rows = self.filters.apply(source);
        if let Some(ref sort) = self.sort {
            sort_records(&mut rows, sort);
        }
        rows
    }
}

/// Recompute the visible page from the source records and the controls
pub fn derive_table(source: &[Record], query: &TableQuery) -> Page<Record> {
    let rows = query.filter_and_sort(source);
    paginate(&rows, query.page, query.page_size)
}
