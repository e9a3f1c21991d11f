//! `issue-core` - issue workflow state machine and query engine.
//!
//! Provides the issue aggregate, its guarded workflow, a closed
//! predicate/selector algebra, order-by parsing, paging validation and a
//! repository seam with an in-memory, JSONL-backed implementation.
//!
//! # Quick Start
//!
//! ```no_run
//! use chrono::Utc;
//! use issue_core::{
//!     CancellationToken, CommandKind, InMemoryStore, IssueBuilder, IssueRepository,
//!     PagingOptions, Predicate, Priority, Selector, SortingOptions,
//! };
//!
//! let mut store = InMemoryStore::open("path/to/.issues/issues.jsonl").unwrap();
//!
//! // Create
//! let id = store.next_identifier("APP").unwrap();
//! let issue = IssueBuilder::new().id(id.clone()).title("Crash on save").build().unwrap();
//! store.add(issue).unwrap();
//!
//! // Transition
//! store.transition(&id, CommandKind::Open, Utc::now()).unwrap();
//!
//! // Query
//! let (total, rows) = store
//!     .query(
//!         &[Predicate::project_equals("APP").unwrap(), Predicate::priority_equals(Priority::High)],
//!         &Selector::issue_summary().unwrap(),
//!         &SortingOptions::parse(Some("Priority, Title DESC")).unwrap(),
//!         PagingOptions::new(1, 20).unwrap(),
//!         &CancellationToken::new(),
//!     )
//!     .unwrap();
//!
//! // Save back
//! store.commit().unwrap();
//! ```

pub mod error;
pub mod fields;
pub mod jsonl;
pub mod model;
pub mod paging;
pub mod patch;
pub mod repository;
pub mod sorting;
pub mod specification;
pub mod store;
pub mod util;
pub mod workflow;

pub use error::{ErrorKind, IssueError, Result, ValidationError};
pub use fields::{IssueField, QueryField, Queryable, Value, ValueKind, verify_field_tables};
pub use model::{
    Comment, ConcurrencyToken, Issue, IssueBuilder, IssueIdentifier, IssueLink, IssueType, LinkDirection,
    LinkType, Priority, User,
};
pub use paging::{MAX_PAGE_SIZE, Page, PagingOptions};
pub use patch::{PatchField, PatchValue};
pub use repository::{CancellationToken, IssueRepository, IssueStream};
pub use sorting::{SortDirection, SortKey, SortingOptions};
pub use specification::{CompareOp, IssueSummary, Predicate, Selector};
pub use store::InMemoryStore;
pub use workflow::{CommandKind, IssueCommand, IssueState, StateChangeCommand};
