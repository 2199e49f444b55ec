//! Page view models
//!
//! Each dashboard page owns a [`PageState`] (the fetched records plus load
//! status) and a [`TableQuery`] (its filter, sort and pagination controls).
//! Both are plain values advanced by pure `reduce` functions so that the
//! server and the tests drive them the same way.

use serde::Serialize;

use crate::record::Record;
use crate::table::{derive_table, Page, Predicate, SortDescriptor, SortDirection, TableQuery};

/// Fetch lifecycle events, tagged with the request sequence number
#[derive(Debug, Clone, PartialEq)]
pub enum PageEvent {
    FetchStarted { seq: u64 },
    FetchSucceeded { seq: u64, records: Vec<Record> },
    FetchFailed { seq: u64, message: String },
}

/// Snapshot of one page's data
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PageState {
    pub records: Vec<Record>,
    /// Sequence of the response currently shown (0 before the first load)
    pub applied_seq: u64,
    /// Highest sequence started so far
    pub latest_started: u64,
    pub loading: bool,
    pub error: Option<String>,
}

impl PageState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the state by one event.
    ///
    /// Responses older than the one already applied are discarded. The
    /// loading flag clears once the latest started fetch settles, whether
    /// it succeeded or failed. A failure keeps the previous records.
    pub fn reduce(self, event: PageEvent) -> PageState {
        match event {
            PageEvent::FetchStarted { seq } => PageState {
                latest_started: self.latest_started.max(seq),
                loading: true,
                ..self
            },
            PageEvent::FetchSucceeded { seq, records } => {
                if seq <= self.applied_seq {
                    log::debug!(
                        target: "erpdash::session",
                        "Discarding stale response {} (applied {})",
                        seq,
                        self.applied_seq
                    );
                    return self.settle(seq);
                }
                let settled = self.settle(seq);
                PageState {
                    records,
                    applied_seq: seq,
                    error: None,
                    ..settled
                }
            }
            PageEvent::FetchFailed { seq, message } => {
                if seq <= self.applied_seq {
                    log::debug!(
                        target: "erpdash::session",
                        "Discarding stale failure {} (applied {})",
                        seq,
                        self.applied_seq
                    );
                    return self.settle(seq);
                }
                let settled = self.settle(seq);
                PageState {
                    error: Some(message),
                    ..settled
                }
            }
        }
    }

    fn settle(self, seq: u64) -> PageState {
        let loading = self.loading && seq < self.latest_started;
        PageState { loading, ..self }
    }

    pub fn has_loaded(&self) -> bool {
        self.applied_seq > 0
    }
}

/// User interactions with a table's controls
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    /// Set or replace a named filter control
    Filter { name: String, predicate: Predicate },
    ClearFilter { name: String },
    ResetFilters,
    /// Click on a column header
    ToggleSort { key: String },
    SetSort(Option<SortDescriptor>),
    GoToPage(usize),
    SetPageSize(usize),
}

impl TableQuery {
    /// Advance the controls by one event. Filter and page size changes go
    /// back to the first page; sorting keeps the current page.
    pub fn reduce(self, event: ControlEvent) -> TableQuery {
        let mut next = self;
        match event {
            ControlEvent::Filter { name, predicate } => {
                next.filters.set(&name, predicate);
                next.page = 0;
            }
            ControlEvent::ClearFilter { name } => {
                next.filters.clear(&name);
                next.page = 0;
            }
            ControlEvent::ResetFilters => {
                next.filters.reset();
                next.page = 0;
            }
            ControlEvent::ToggleSort { key } => {
                next.sort = Some(SortDescriptor::select(next.sort.as_ref(), &key));
            }
            ControlEvent::SetSort(sort) => {
                next.sort = sort;
            }
            ControlEvent::GoToPage(page) => {
                next.page = page;
            }
            ControlEvent::SetPageSize(page_size) => {
                next.page_size = page_size.max(1);
                next.page = 0;
            }
        }
        next
    }

    /// Direction of `key` if it is the active sort
    pub fn sort_direction(&self, key: &str) -> Option<SortDirection> {
        self.sort
            .as_ref()
            .filter(|s| s.key == key)
            .map(|s| s.direction)
    }
}

/// Everything a list page renders
#[derive(Debug, Clone, Serialize)]
pub struct TableView {
    pub page: Page<Record>,
    pub loading: bool,
    pub error: Option<String>,
    /// Rows fetched before filtering
    pub source_count: usize,
}

impl TableView {
    pub fn derive(state: &PageState, query: &TableQuery) -> Self {
        Self {
            page: derive_table(&state.records, query),
            loading: state.loading,
            error: state.error.clone(),
            source_count: state.records.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(ids: &[i64]) -> Vec<Record> {
        ids.iter()
            .map(|id| Record::from_value(json!({"id": id})).unwrap())
            .collect()
    }

    #[test]
    fn test_stale_response_discarded() {
        let state = PageState::new()
            .reduce(PageEvent::FetchStarted { seq: 1 })
            .reduce(PageEvent::FetchStarted { seq: 2 })
            .reduce(PageEvent::FetchSucceeded { seq: 2, records: rows(&[20]) })
            .reduce(PageEvent::FetchSucceeded { seq: 1, records: rows(&[10]) });

        assert_eq!(state.records, rows(&[20]));
        assert_eq!(state.applied_seq, 2);
        assert!(!state.loading);
    }

    #[test]
    fn test_loading_held_until_latest_settles() {
        let state = PageState::new()
            .reduce(PageEvent::FetchStarted { seq: 1 })
            .reduce(PageEvent::FetchStarted { seq: 2 })
            .reduce(PageEvent::FetchSucceeded { seq: 1, records: rows(&[10]) });

        assert_eq!(state.records, rows(&[10]));
        assert!(state.loading);

        let state = state.reduce(PageEvent::FetchSucceeded { seq: 2, records: rows(&[20]) });
        assert!(!state.loading);
        assert_eq!(state.records, rows(&[20]));
    }

    #[test]
    fn test_failure_keeps_previous_snapshot() {
        let state = PageState::new()
            .reduce(PageEvent::FetchStarted { seq: 1 })
            .reduce(PageEvent::FetchSucceeded { seq: 1, records: rows(&[1, 2]) })
            .reduce(PageEvent::FetchStarted { seq: 2 })
            .reduce(PageEvent::FetchFailed { seq: 2, message: "Network error".to_string() });

        assert_eq!(state.records, rows(&[1, 2]));
        assert_eq!(state.error.as_deref(), Some("Network error"));
        assert!(!state.loading);

        let state = state
            .reduce(PageEvent::FetchStarted { seq: 3 })
            .reduce(PageEvent::FetchSucceeded { seq: 3, records: rows(&[3]) });
        assert!(state.error.is_none());
    }

    #[test]
    fn test_filter_change_resets_page() {
        let query = TableQuery::with_page_size(15)
            .reduce(ControlEvent::GoToPage(3))
            .reduce(ControlEvent::Filter {
                name: "status".to_string(),
                predicate: Predicate::category("status", "draft"),
            });
        assert_eq!(query.page, 0);
        assert!(query.filters.get("status").is_some());
    }

    #[test]
    fn test_toggle_sort_through_reducer() {
        let query = TableQuery::default()
            .reduce(ControlEvent::ToggleSort { key: "date".to_string() })
            .reduce(ControlEvent::ToggleSort { key: "date".to_string() });
        assert_eq!(query.sort_direction("date"), Some(SortDirection::Descending));
        assert_eq!(query.sort_direction("amount"), None);
    }

    #[test]
    fn test_table_view_derives_page() {
        let state = PageState::new()
            .reduce(PageEvent::FetchStarted { seq: 1 })
            .reduce(PageEvent::FetchSucceeded { seq: 1, records: rows(&[1, 2, 3, 4]) });
        let query = TableQuery::with_page_size(3).reduce(ControlEvent::GoToPage(1));

        let view = TableView::derive(&state, &query);
        assert_eq!(view.source_count, 4);
        assert_eq!(view.page.items, rows(&[4]));
        assert_eq!(view.page.total_pages, 2);
    }
}
