//! Data-shaping core for the ERP dashboard
//!
//! Records fetched from the upstream API are shaped here: parent links into
//! account trees, list pages through the filter/sort/paginate pipeline, and
//! summaries through the aggregation helpers. The upstream itself sits
//! behind the [`ErpSource`] trait.

pub mod aggregate;
pub mod dashboard;
pub mod error;
pub mod models;
pub mod record;
pub mod service;
pub mod session;
pub mod source;
pub mod table;
pub mod tree;
pub mod view;

pub use error::{CoreError, CoreResult, ErrorCode, ErrorSeverity};
pub use record::{Record, RecordKey};
pub use service::ErpService;
pub use session::{PageSession, TrackedPage};
pub use source::{DocumentUpload, ErpSource, Method, Resource};
pub use table::{derive_table, FilterSet, Page, Predicate, SortDescriptor, SortDirection, TableQuery};
pub use tree::{OrphanPolicy, TreeBuilder, TreeNode};
pub use view::{ControlEvent, PageEvent, PageState, TableView};
