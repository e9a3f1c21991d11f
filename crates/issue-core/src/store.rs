//! In-memory issue repository backed by `HashMap`.
//!
//! Implements [`IssueRepository`] without any database dependency. Writes
//! are tracked as a unit of work and flushed to a JSONL file on
//! [`IssueRepository::commit`].

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::error::{IssueError, Result};
use crate::fields::verify_field_tables;
use crate::jsonl;
use crate::model::{Issue, IssueIdentifier, validate_project_code};
use crate::paging::PagingOptions;
use crate::repository::{CancellationToken, IssueRepository, IssueStream};
use crate::sorting::SortingOptions;
use crate::specification::{Predicate, Selector};

/// In-memory issue store.
///
/// All data lives in memory. Use `open()` to load from a JSONL file and
/// `commit()` to persist back.
#[derive(Debug)]
pub struct InMemoryStore {
    issues: HashMap<IssueIdentifier, Issue>,
    dirty_ids: HashSet<IssueIdentifier>,
    jsonl_path: Option<PathBuf>,
}

impl InMemoryStore {
    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Create a new empty store with no backing file.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSpecification` if the field tables are inconsistent.
    pub fn new() -> Result<Self> {
        Self::build(None)
    }

    /// Create an empty store that commits to `path`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSpecification` if the field tables are inconsistent.
    pub fn with_path(path: impl Into<PathBuf>) -> Result<Self> {
        Self::build(Some(path.into()))
    }

    fn build(jsonl_path: Option<PathBuf>) -> Result<Self> {
        verify_field_tables()?;
        Ok(Self {
            issues: HashMap::new(),
            dirty_ids: HashSet::new(),
            jsonl_path,
        })
    }

    /// Open and load from a JSONL file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if two
    /// records share an identifier.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut store = Self::with_path(path)?;

        for issue in jsonl::load(path)? {
            let id = issue.id().clone();
            if store.issues.insert(id.clone(), issue).is_some() {
                return Err(IssueError::IdCollision { id: id.to_string() });
            }
        }

        tracing::debug!(path = %path.display(), count = store.len(), "opened store");
        Ok(store)
    }

    /// The file `commit()` writes to, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.jsonl_path.as_deref()
    }

    /// Iterate over all issues in no particular order.
    pub fn issues(&self) -> impl Iterator<Item = &Issue> {
        self.issues.values()
    }

    /// All issues sorted by identifier, for deterministic output.
    #[must_use]
    pub fn all_issues_sorted(&self) -> Vec<&Issue> {
        let mut issues: Vec<&Issue> = self.issues.values().collect();
        issues.sort_by(|a, b| a.id().cmp(b.id()));
        issues
    }

    // ========================================================================
    // Dirty Tracking
    // ========================================================================

    /// Check if any issues have been modified since the last commit.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        !self.dirty_ids.is_empty()
    }

    /// Get the number of modified issues.
    #[must_use]
    pub fn dirty_count(&self) -> usize {
        self.dirty_ids.len()
    }

    /// Get the total number of issues.
    #[must_use]
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// Check if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    fn stored(&self, id: &IssueIdentifier) -> Result<&Issue> {
        self.issues
            .get(id)
            .ok_or_else(|| IssueError::IssueNotFound { id: id.to_string() })
    }
}

impl IssueRepository for InMemoryStore {
    fn add(&mut self, mut issue: Issue) -> Result<Issue> {
        issue
            .check_invariants()
            .map_err(IssueError::from_validation_errors)?;
        let id = issue.id().clone();
        if self.issues.contains_key(&id) {
            return Err(IssueError::IdCollision { id: id.to_string() });
        }

        issue.rotate_concurrency_token();
        self.issues.insert(id.clone(), issue.clone());
        tracing::info!(%id, title = issue.title(), "issue added");
        self.dirty_ids.insert(id);
        Ok(issue)
    }

    fn get_by_id(&self, id: &IssueIdentifier) -> Result<Issue> {
        self.stored(id).cloned()
    }

    fn exists(&self, id: &IssueIdentifier) -> bool {
        self.issues.contains_key(id)
    }

    fn save(&mut self, mut issue: Issue) -> Result<Issue> {
        let id = issue.id().clone();
        let stored = self.stored(&id)?;
        if stored.concurrency_token() != issue.concurrency_token() {
            tracing::warn!(%id, "concurrency conflict on save");
            return Err(IssueError::ConcurrencyConflict { id: id.to_string() });
        }

        issue.rotate_concurrency_token();
        self.issues.insert(id.clone(), issue.clone());
        tracing::debug!(%id, revision = issue.revision(), "issue saved");
        self.dirty_ids.insert(id);
        Ok(issue)
    }

    fn delete_by_id(&mut self, id: &IssueIdentifier) -> Result<Issue> {
        let removed = self
            .issues
            .remove(id)
            .ok_or_else(|| IssueError::IssueNotFound { id: id.to_string() })?;

        for other in self.issues.values_mut() {
            if other.forget_links_to(id) {
                other.rotate_concurrency_token();
                self.dirty_ids.insert(other.id().clone());
            }
        }

        tracing::info!(%id, "issue deleted");
        self.dirty_ids.insert(id.clone());
        Ok(removed)
    }

    fn max_issue_number(&self, project: &str) -> Result<u32> {
        let project = validate_project_code(project)?;
        Ok(self
            .issues
            .keys()
            .filter(|id| id.project() == project)
            .map(IssueIdentifier::issue_number)
            .max()
            .unwrap_or(0))
    }

    fn find_first(&self, predicate: &Predicate<Issue>) -> Option<Issue> {
        self.issues
            .values()
            .filter(|issue| predicate.evaluate(issue))
            .min_by(|a, b| a.id().cmp(b.id()))
            .cloned()
    }

    fn count(&self, predicate: &Predicate<Issue>) -> usize {
        self.issues
            .values()
            .filter(|issue| predicate.evaluate(issue))
            .count()
    }

    fn query<R: 'static>(
        &self,
        predicates: &[Predicate<Issue>],
        selector: &Selector<Issue, R>,
        sorting: &SortingOptions,
        paging: PagingOptions,
        cancel: &CancellationToken,
    ) -> Result<(usize, IssueStream<R>)> {
        if cancel.is_cancelled() {
            return Err(IssueError::Cancelled);
        }

        let filter = Predicate::all(predicates.iter().cloned());
        let mut matched: Vec<&Issue> = self
            .issues
            .values()
            .filter(|issue| filter.evaluate(issue))
            .collect();
        let total = matched.len();
        matched.sort_by(|a, b| sorting.compare(*a, *b));

        let page: Vec<Issue> = matched
            .into_iter()
            .skip(paging.skip())
            .take(paging.take())
            .cloned()
            .collect();

        tracing::debug!(
            filter = %filter,
            sort = %sorting,
            page = paging.page_number(),
            total,
            returned = page.len(),
            "query"
        );
        Ok((
            total,
            IssueStream::new(page.into_iter(), selector.clone(), cancel.clone()),
        ))
    }

    fn commit(&mut self) -> Result<usize> {
        let changed = self.dirty_ids.len();
        if changed == 0 {
            return Ok(0);
        }
        if let Some(path) = &self.jsonl_path {
            jsonl::save(path, self.all_issues_sorted())?;
        }
        self.dirty_ids.clear();
        tracing::info!(changed, "committed");
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IssueBuilder, LinkType, Priority, User};
    use crate::patch::{PatchField, PatchValue};
    use crate::workflow::{CommandKind, IssueCommand, IssueState, StateChangeCommand};
    use chrono::Utc;

    fn make_issue(project: &str, number: u32, title: &str) -> Issue {
        IssueBuilder::new()
            .project(project)
            .issue_number(number)
            .title(title)
            .build()
            .unwrap()
    }

    fn id(s: &str) -> IssueIdentifier {
        s.parse().unwrap()
    }

    fn seeded() -> InMemoryStore {
        let mut store = InMemoryStore::new().unwrap();
        for (n, title, priority) in [
            (1, "Login fails", Priority::High),
            (2, "Typo in footer", Priority::Low),
            (3, "Crash on export", Priority::High),
            (4, "Slow search", Priority::Medium),
            (5, "Crash on import", Priority::Medium),
        ] {
            let issue = IssueBuilder::new()
                .project("APP")
                .issue_number(n)
                .title(title)
                .priority(priority)
                .build()
                .unwrap();
            store.add(issue).unwrap();
        }
        store.add(make_issue("OPS", 1, "Disk alert")).unwrap();
        store
    }

    #[test]
    fn test_add_and_get() {
        let mut store = InMemoryStore::new().unwrap();
        let added = store.add(make_issue("APP", 1, "Test issue")).unwrap();
        let fetched = store.get_by_id(&id("APP-1")).unwrap();
        assert_eq!(fetched.title(), "Test issue");
        assert_eq!(fetched.concurrency_token(), added.concurrency_token());
        assert!(store.exists(&id("APP-1")));
        assert!(!store.exists(&id("APP-2")));
    }

    #[test]
    fn test_new_store_runs_field_table_check() {
        assert!(verify_field_tables().is_ok());
        let store = InMemoryStore::new().unwrap();
        assert!(store.is_empty());
        assert_eq!(store.path(), None);
    }

    #[test]
    fn test_add_id_collision() {
        let mut store = InMemoryStore::new().unwrap();
        store.add(make_issue("APP", 1, "First")).unwrap();
        let result = store.add(make_issue("APP", 1, "Duplicate"));
        assert!(matches!(result, Err(IssueError::IdCollision { .. })));
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let store = InMemoryStore::new().unwrap();
        let err = store.get_by_id(&id("APP-9")).unwrap_err();
        assert!(matches!(err, IssueError::IssueNotFound { .. }));
    }

    #[test]
    fn test_save_detects_lost_update() {
        let mut store = InMemoryStore::new().unwrap();
        store.add(make_issue("APP", 1, "Original")).unwrap();

        let mut first = store.get_by_id(&id("APP-1")).unwrap();
        let mut second = store.get_by_id(&id("APP-1")).unwrap();

        first.set_title("First writer").unwrap();
        store.save(first).unwrap();

        second.set_title("Second writer").unwrap();
        let err = store.save(second).unwrap_err();
        assert!(matches!(err, IssueError::ConcurrencyConflict { .. }));
        assert_eq!(store.get_by_id(&id("APP-1")).unwrap().title(), "First writer");
    }

    #[test]
    fn test_save_rotates_token() {
        let mut store = InMemoryStore::new().unwrap();
        let added = store.add(make_issue("APP", 1, "Tokens")).unwrap();
        let saved = store.save(added.clone()).unwrap();
        assert_ne!(saved.concurrency_token(), added.concurrency_token());
        assert_eq!(saved.revision(), added.revision() + 1);
        // The stale copy can no longer be saved.
        assert!(store.save(added).is_err());
    }

    #[test]
    fn test_execute_command_persists_transition() {
        let mut store = seeded();
        let now = Utc::now();
        let cmd = IssueCommand::new(id("APP-1"), StateChangeCommand::Open { start_time: now });
        let opened = store.execute_command(&cmd).unwrap();
        assert_eq!(opened.state(), IssueState::Open);
        assert_eq!(store.get_by_id(&id("APP-1")).unwrap().start_time(), Some(now));
    }

    #[test]
    fn test_execute_command_conflict_leaves_store_untouched() {
        let mut store = seeded();
        let before = store.get_by_id(&id("APP-2")).unwrap();
        let err = store
            .transition(&id("APP-2"), CommandKind::ReadyForTest, Utc::now())
            .unwrap_err();
        assert!(matches!(
            err,
            IssueError::StateConflict { command: CommandKind::ReadyForTest, .. }
        ));
        assert_eq!(store.get_by_id(&id("APP-2")).unwrap(), before);
    }

    #[test]
    fn test_link_records_both_ends() {
        let mut store = seeded();
        assert!(store.link(&id("APP-1"), &id("APP-2"), LinkType::Blocking).unwrap());
        assert!(!store.link(&id("APP-1"), &id("APP-2"), LinkType::Blocking).unwrap());

        let source = store.get_by_id(&id("APP-1")).unwrap();
        let target = store.get_by_id(&id("APP-2")).unwrap();
        assert_eq!(source.outgoing_links().count(), 1);
        assert_eq!(target.incoming_links().count(), 1);
    }

    #[test]
    fn test_link_rejects_self_and_missing() {
        let mut store = seeded();
        let err = store
            .link(&id("APP-1"), &id("APP-1"), LinkType::Related)
            .unwrap_err();
        assert!(matches!(err, IssueError::Validation { .. }));
        let err = store
            .link(&id("APP-1"), &id("APP-99"), LinkType::Related)
            .unwrap_err();
        assert!(matches!(err, IssueError::IssueNotFound { .. }));
        assert_eq!(store.get_by_id(&id("APP-1")).unwrap().outgoing_links().count(), 0);
    }

    #[test]
    fn test_unlink() {
        let mut store = seeded();
        store.link(&id("APP-1"), &id("APP-2"), LinkType::Related).unwrap();
        assert!(store.unlink(&id("APP-1"), &id("APP-2"), LinkType::Related).unwrap());
        assert!(!store.unlink(&id("APP-1"), &id("APP-2"), LinkType::Related).unwrap());
        assert_eq!(store.get_by_id(&id("APP-2")).unwrap().incoming_links().count(), 0);
    }

    #[test]
    fn test_delete_removes_dangling_links() {
        let mut store = seeded();
        store.link(&id("APP-1"), &id("APP-2"), LinkType::Duplicate).unwrap();
        store.delete_by_id(&id("APP-2")).unwrap();
        assert!(!store.exists(&id("APP-2")));
        assert_eq!(store.get_by_id(&id("APP-1")).unwrap().outgoing_links().count(), 0);
        assert!(store.delete_by_id(&id("APP-2")).is_err());
    }

    #[test]
    fn test_max_issue_number_and_next_identifier() {
        let store = seeded();
        assert_eq!(store.max_issue_number("app").unwrap(), 5);
        assert_eq!(store.max_issue_number("NEW").unwrap(), 0);
        assert_eq!(store.next_identifier("ops").unwrap(), id("OPS-2"));
        assert!(store.max_issue_number("1").is_err());
    }

    #[test]
    fn test_find_first_and_count() {
        let store = seeded();
        let high = Predicate::priority_equals(Priority::High);
        assert_eq!(store.count(&high), 2);
        assert_eq!(store.find_first(&high).unwrap().id(), &id("APP-1"));
        let none = Predicate::title_contains("nothing like this").unwrap();
        assert!(store.find_first(&none).is_none());
    }

    #[test]
    fn test_query_filters_sorts_and_pages() {
        let store = seeded();
        let predicates = [
            Predicate::project_equals("APP").unwrap(),
            Predicate::title_contains("crash").unwrap(),
        ];
        let sorting = SortingOptions::parse(Some("Priority, Title DESC")).unwrap();
        let selector = Selector::identifier().unwrap();

        let (total, stream) = store
            .query(
                &predicates,
                &selector,
                &sorting,
                PagingOptions::new(1, 10).unwrap(),
                &CancellationToken::new(),
            )
            .unwrap();
        let ids: Vec<_> = stream.map(Result::unwrap).collect();
        assert_eq!(total, 2);
        assert_eq!(ids, vec![id("APP-3"), id("APP-5")]);
    }

    #[test]
    fn test_query_paging_is_stable() {
        let store = seeded();
        let selector = Selector::identifier().unwrap();
        let sorting = SortingOptions::parse(Some("Priority")).unwrap();
        let cancel = CancellationToken::new();

        let mut seen = Vec::new();
        for page_number in 1..=3 {
            let paging = PagingOptions::new(page_number, 2).unwrap();
            let (total, stream) = store
                .query(&[], &selector, &sorting, paging, &cancel)
                .unwrap();
            assert_eq!(total, 6);
            seen.extend(stream.map(Result::unwrap));
        }
        assert_eq!(
            seen,
            vec![
                id("APP-1"),
                id("APP-3"),
                id("APP-4"),
                id("APP-5"),
                id("APP-2"),
                id("OPS-1"),
            ]
        );
    }

    #[test]
    fn test_query_past_last_page_is_empty() {
        let store = seeded();
        let selector = Selector::identifier().unwrap();
        let (total, stream) = store
            .query(
                &[],
                &selector,
                &SortingOptions::default(),
                PagingOptions::new(9, 10).unwrap(),
                &CancellationToken::new(),
            )
            .unwrap();
        assert_eq!(total, 6);
        assert_eq!(stream.count(), 0);
    }

    #[test]
    fn test_query_respects_cancelled_token() {
        let store = seeded();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = store.query(
            &[],
            &Selector::identifier().unwrap(),
            &SortingOptions::default(),
            PagingOptions::default(),
            &cancel,
        );
        assert!(matches!(result, Err(IssueError::Cancelled)));
    }

    #[test]
    fn test_children_and_parents() {
        let mut store = seeded();
        store.link(&id("APP-1"), &id("APP-3"), LinkType::ParentChild).unwrap();
        store.link(&id("APP-1"), &id("APP-4"), LinkType::ParentChild).unwrap();
        store.link(&id("APP-1"), &id("APP-5"), LinkType::Related).unwrap();

        let cancel = CancellationToken::new();
        let sorting = SortingOptions::default();
        let page = store
            .children(&id("APP-1"), &sorting, PagingOptions::new(1, 1).unwrap(), &cancel)
            .unwrap();
        assert_eq!(page.total_count, 2);
        assert_eq!(page.items[0].id, id("APP-3"));
        assert!(page.has_next());

        let parents = store
            .parents(&id("APP-4"), &sorting, PagingOptions::default(), &cancel)
            .unwrap();
        assert_eq!(parents.items.len(), 1);
        assert_eq!(parents.items[0].id, id("APP-1"));

        let none = store
            .children(&id("APP-2"), &sorting, PagingOptions::default(), &cancel)
            .unwrap();
        assert_eq!(none.total_count, 0);
    }

    #[test]
    fn test_patch_through_repository() {
        let mut store = seeded();
        let patched = store
            .patch(&id("APP-2"), PatchField::Priority, PatchValue::Priority(Priority::High))
            .unwrap();
        assert_eq!(patched.priority(), Priority::High);
        assert_eq!(store.count(&Predicate::priority_equals(Priority::High)), 3);
    }

    #[test]
    fn test_comment_through_repository() {
        let mut store = seeded();
        let before = store.get_by_id(&id("APP-2")).unwrap();
        let ada = User::new("ada", "Ada Lovelace");
        let updated = store
            .comment(&id("APP-2"), ada.clone(), "Seen on staging", Utc::now())
            .unwrap();
        assert_eq!(updated.comments().len(), 1);
        assert_eq!(updated.comments()[0].author, ada);
        assert_ne!(updated.concurrency_token(), before.concurrency_token());

        let err = store.comment(&id("APP-2"), ada.clone(), "", Utc::now()).unwrap_err();
        assert!(matches!(err, IssueError::Validation { ref field, .. } if field == "content"));
        let err = store.comment(&id("APP-99"), ada, "Hello", Utc::now()).unwrap_err();
        assert!(matches!(err, IssueError::IssueNotFound { .. }));
        assert_eq!(store.get_by_id(&id("APP-2")).unwrap().comments().len(), 1);
    }

    #[test]
    fn test_dirty_tracking() {
        let mut store = InMemoryStore::new().unwrap();
        assert!(!store.is_dirty());
        store.add(make_issue("APP", 1, "Dirty")).unwrap();
        assert!(store.is_dirty());
        assert_eq!(store.dirty_count(), 1);
        assert_eq!(store.commit().unwrap(), 1);
        assert!(!store.is_dirty());
        assert_eq!(store.commit().unwrap(), 0);
    }

    #[test]
    fn test_commit_then_open_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("issues.jsonl");

        let mut store = InMemoryStore::with_path(&path).unwrap();
        store.add(make_issue("APP", 1, "Roundtrip")).unwrap();
        store.add(make_issue("APP", 2, "Linked")).unwrap();
        store.link(&id("APP-1"), &id("APP-2"), LinkType::Clone).unwrap();
        store
            .comment(&id("APP-1"), User::new("ada", "Ada Lovelace"), "Persisted", Utc::now())
            .unwrap();
        store.commit().unwrap();

        let loaded = InMemoryStore::open(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        let first = loaded.get_by_id(&id("APP-1")).unwrap();
        assert_eq!(first.title(), "Roundtrip");
        assert_eq!(first.comments()[0].content, "Persisted");
        assert_eq!(first, store.get_by_id(&id("APP-1")).unwrap());
        assert_eq!(loaded.path(), Some(path.as_path()));
    }

    #[test]
    fn test_open_rejects_duplicate_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("issues.jsonl");
        let issue = make_issue("APP", 1, "Twice");
        jsonl::save(&path, [&issue, &issue]).unwrap();
        let err = InMemoryStore::open(&path).unwrap_err();
        assert!(matches!(err, IssueError::IdCollision { .. }));
    }
}
