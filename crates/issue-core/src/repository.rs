//! Repository seam.
//!
//! [`IssueRepository`] is what persistence adapters implement. Required
//! methods are the storage primitives; provided methods build the workflow,
//! linking, patching and navigation operations on top of them, so every
//! adapter gets the same rules.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};

use crate::error::{IssueError, Result};
use crate::model::{Issue, IssueIdentifier, LinkDirection, LinkType, User};
use crate::paging::{Page, PagingOptions};
use crate::patch::{PatchField, PatchValue};
use crate::sorting::SortingOptions;
use crate::specification::{IssueSummary, Predicate, Selector};
use crate::workflow::{CommandKind, IssueCommand, StateChangeCommand};

/// Shared flag a caller flips to abort a running query.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Lazy, finite, single-pass query result.
///
/// Each item is projected when it is pulled. The cancellation token is
/// checked before every item; after cancellation the stream yields one
/// `Err(Cancelled)` and then ends.
pub struct IssueStream<R> {
    source: Box<dyn Iterator<Item = Issue> + Send>,
    selector: Selector<Issue, R>,
    cancel: CancellationToken,
    finished: bool,
}

impl<R> IssueStream<R> {
    pub fn new(
        source: impl Iterator<Item = Issue> + Send + 'static,
        selector: Selector<Issue, R>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            source: Box::new(source),
            selector,
            cancel,
            finished: false,
        }
    }

    /// Drain into a page envelope.
    ///
    /// # Errors
    ///
    /// Returns `Cancelled` or a projection error from the first failing item.
    pub fn into_page(self, paging: PagingOptions, total_count: usize) -> Result<Page<R>> {
        let items = self.collect::<Result<Vec<R>>>()?;
        Ok(Page::new(items, paging, total_count))
    }
}

impl<R> Iterator for IssueStream<R> {
    type Item = Result<R>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if self.cancel.is_cancelled() {
            self.finished = true;
            tracing::debug!(selector = self.selector.name(), "query stream cancelled");
            return Some(Err(IssueError::Cancelled));
        }
        match self.source.next() {
            Some(issue) => Some(self.selector.apply(&issue)),
            None => {
                self.finished = true;
                None
            }
        }
    }
}

impl<R> std::iter::FusedIterator for IssueStream<R> {}

impl<R> fmt::Debug for IssueStream<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssueStream")
            .field("selector", &self.selector)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

/// Persistence contract for issue aggregates.
pub trait IssueRepository {
    /// Insert a new issue.
    ///
    /// # Errors
    ///
    /// Returns `IdCollision` if the identifier is taken.
    fn add(&mut self, issue: Issue) -> Result<Issue>;

    /// # Errors
    ///
    /// Returns `IssueNotFound` if no issue has this identifier.
    fn get_by_id(&self, id: &IssueIdentifier) -> Result<Issue>;

    fn exists(&self, id: &IssueIdentifier) -> bool;

    /// Store an updated aggregate if nobody else changed it since it was read.
    ///
    /// Returns the stored aggregate carrying its fresh concurrency token.
    ///
    /// # Errors
    ///
    /// Returns `IssueNotFound` or `ConcurrencyConflict`.
    fn save(&mut self, issue: Issue) -> Result<Issue>;

    /// Remove an issue and every link pointing at it.
    ///
    /// # Errors
    ///
    /// Returns `IssueNotFound` if no issue has this identifier.
    fn delete_by_id(&mut self, id: &IssueIdentifier) -> Result<Issue>;

    /// Highest sequence number used in `project`, or 0.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a malformed project code.
    fn max_issue_number(&self, project: &str) -> Result<u32>;

    fn find_first(&self, predicate: &Predicate<Issue>) -> Option<Issue>;

    fn count(&self, predicate: &Predicate<Issue>) -> usize;

    /// Filter (all predicates must hold), sort, page and project.
    ///
    /// Returns the total match count and a stream over the requested page.
    ///
    /// # Errors
    ///
    /// Returns `Cancelled` if the token is already cancelled.
    fn query<R: 'static>(
        &self,
        predicates: &[Predicate<Issue>],
        selector: &Selector<Issue, R>,
        sorting: &SortingOptions,
        paging: PagingOptions,
        cancel: &CancellationToken,
    ) -> Result<(usize, IssueStream<R>)>;

    /// Flush the unit of work. Returns the number of issues written.
    ///
    /// # Errors
    ///
    /// Returns persistence errors from the backing store.
    fn commit(&mut self) -> Result<usize>;

    // ========================================================================
    // Provided operations
    // ========================================================================

    /// Next free identifier in `project`.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a malformed project code or an exhausted sequence.
    fn next_identifier(&self, project: &str) -> Result<IssueIdentifier> {
        let next = self
            .max_issue_number(project)?
            .checked_add(1)
            .ok_or_else(|| IssueError::validation("issueNumber", "sequence exhausted"))?;
        IssueIdentifier::new(project, next)
    }

    /// Load, execute and save.
    ///
    /// # Errors
    ///
    /// Returns `IssueNotFound`, `StateConflict` or `ConcurrencyConflict`.
    fn execute_command(&mut self, command: &IssueCommand) -> Result<Issue> {
        let mut issue = self.get_by_id(&command.target)?;
        if let Err(err) = issue.try_execute(&command.command) {
            tracing::warn!(id = %command.target, error = %err, "state change rejected");
            return Err(err);
        }
        self.save(issue)
    }

    /// Convenience wrapper building the command from its kind.
    ///
    /// # Errors
    ///
    /// Same as [`IssueRepository::execute_command`].
    fn transition(
        &mut self,
        id: &IssueIdentifier,
        kind: CommandKind,
        at: DateTime<Utc>,
    ) -> Result<Issue> {
        self.execute_command(&IssueCommand::new(
            id.clone(),
            StateChangeCommand::new(kind, at),
        ))
    }

    /// Record `source -[link_type]-> target` on both aggregates.
    ///
    /// Returns `false` when the edge already existed.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a self-link, `IssueNotFound` for either end.
    fn link(
        &mut self,
        source: &IssueIdentifier,
        target: &IssueIdentifier,
        link_type: LinkType,
    ) -> Result<bool> {
        let mut from = self.get_by_id(source)?;
        let mut to = self.get_by_id(target)?;
        let added_out = from.add_link(LinkDirection::Outgoing, link_type, target)?;
        let added_in = to.add_link(LinkDirection::Incoming, link_type, source)?;
        if added_out {
            self.save(from)?;
        }
        if added_in {
            self.save(to)?;
        }
        tracing::debug!(%source, %target, %link_type, added = added_out || added_in, "link");
        Ok(added_out || added_in)
    }

    /// Remove `source -[link_type]-> target` from both aggregates.
    ///
    /// # Errors
    ///
    /// Returns `IssueNotFound` for either end.
    fn unlink(
        &mut self,
        source: &IssueIdentifier,
        target: &IssueIdentifier,
        link_type: LinkType,
    ) -> Result<bool> {
        let mut from = self.get_by_id(source)?;
        let mut to = self.get_by_id(target)?;
        let removed_out = from.remove_link(LinkDirection::Outgoing, link_type, target);
        let removed_in = to.remove_link(LinkDirection::Incoming, link_type, source);
        if removed_out {
            self.save(from)?;
        }
        if removed_in {
            self.save(to)?;
        }
        Ok(removed_out || removed_in)
    }

    /// Load, patch one field and save.
    ///
    /// # Errors
    ///
    /// Returns `IssueNotFound`, `Validation` or `ConcurrencyConflict`.
    fn patch(&mut self, id: &IssueIdentifier, field: PatchField, value: PatchValue) -> Result<Issue> {
        let mut issue = self.get_by_id(id)?;
        issue.patch(field, value)?;
        self.save(issue)
    }

    /// Load, append a comment and save.
    ///
    /// # Errors
    ///
    /// Returns `IssueNotFound`, `Validation` on field `content`, or
    /// `ConcurrencyConflict`.
    fn comment(
        &mut self,
        id: &IssueIdentifier,
        author: User,
        content: &str,
        at: DateTime<Utc>,
    ) -> Result<Issue> {
        let mut issue = self.get_by_id(id)?;
        let comment_id = issue.add_comment(author, content, at)?;
        tracing::debug!(%id, comment_id, "comment added");
        self.save(issue)
    }

    /// Child issues (`ParentChild` targets) of `id`, paged.
    ///
    /// # Errors
    ///
    /// Returns `IssueNotFound` for `id`, or query errors.
    fn children(
        &self,
        id: &IssueIdentifier,
        sorting: &SortingOptions,
        paging: PagingOptions,
        cancel: &CancellationToken,
    ) -> Result<Page<IssueSummary>> {
        let issue = self.get_by_id(id)?;
        let ids: Vec<IssueIdentifier> = issue.child_ids().cloned().collect();
        self.summaries_of(ids, sorting, paging, cancel)
    }

    /// Parent issues (`ParentChild` sources) of `id`, paged.
    ///
    /// # Errors
    ///
    /// Returns `IssueNotFound` for `id`, or query errors.
    fn parents(
        &self,
        id: &IssueIdentifier,
        sorting: &SortingOptions,
        paging: PagingOptions,
        cancel: &CancellationToken,
    ) -> Result<Page<IssueSummary>> {
        let issue = self.get_by_id(id)?;
        let ids: Vec<IssueIdentifier> = issue.parent_ids().cloned().collect();
        self.summaries_of(ids, sorting, paging, cancel)
    }

    #[doc(hidden)]
    fn summaries_of(
        &self,
        ids: Vec<IssueIdentifier>,
        sorting: &SortingOptions,
        paging: PagingOptions,
        cancel: &CancellationToken,
    ) -> Result<Page<IssueSummary>> {
        if ids.is_empty() {
            return Ok(Page::new(Vec::new(), paging, 0));
        }
        let any_of = ids
            .into_iter()
            .map(Predicate::issue_number)
            .reduce(Predicate::or)
            .unwrap_or(Predicate::Always);
        let selector = Selector::issue_summary()?;
        let (total, stream) = self.query(&[any_of], &selector, sorting, paging, cancel)?;
        stream.into_page(paging, total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::IssueBuilder;

    fn issues(n: u32) -> Vec<Issue> {
        (1..=n)
            .map(|i| {
                IssueBuilder::new()
                    .project("APP")
                    .issue_number(i)
                    .title(format!("Issue {i}"))
                    .build()
                    .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_stream_is_lazy_and_finite() {
        let selector = Selector::issue_number().unwrap();
        let mut stream = IssueStream::new(issues(3).into_iter(), selector, CancellationToken::new());
        assert_eq!(stream.next().unwrap().unwrap(), 1);
        assert_eq!(stream.next().unwrap().unwrap(), 2);
        assert_eq!(stream.next().unwrap().unwrap(), 3);
        assert!(stream.next().is_none());
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_stream_stops_after_cancel() {
        let cancel = CancellationToken::new();
        let selector = Selector::issue_number().unwrap();
        let mut stream = IssueStream::new(issues(5).into_iter(), selector, cancel.clone());
        assert_eq!(stream.next().unwrap().unwrap(), 1);
        cancel.cancel();
        assert!(matches!(stream.next(), Some(Err(IssueError::Cancelled))));
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_into_page_propagates_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let selector = Selector::identifier().unwrap();
        let stream = IssueStream::new(issues(2).into_iter(), selector, cancel);
        let err = stream.into_page(PagingOptions::default(), 2).unwrap_err();
        assert!(matches!(err, IssueError::Cancelled));
    }
}
