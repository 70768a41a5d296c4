//! Comment thread manager: fetch, submit, like, delete, and reply expansion.
//!
//! A [`CommentThread`] owns the forest for one target. All operations take
//! `&self` and run on a single task; the `loading` and `submitting` flags are
//! checked and set before the backend call and cleared by a guard on every
//! exit path, so overlapping calls are rejected rather than interleaved. The
//! state is never borrowed across an `.await`.

pub mod events;
pub mod state;

pub use self::events::{Operation, ThreadEvent};
pub use self::state::{DEFAULT_PAGE_SIZE, ThreadState};

use crate::domain::{Comment, CommentId, CommentPath, ReplyTarget, Target, UserSummary};
use crate::session::{Identity, Session};
use crate::source::{CommentSource, NewComment, SourceError};
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

/// Default number of replies requested per expansion.
pub const DEFAULT_REPLY_BATCH: u32 = 10;

/// Result type for thread operations.
pub type Result<T> = std::result::Result<T, ThreadError>;

/// Why a thread operation did not apply.
#[derive(Debug, Error)]
pub enum ThreadError {
    #[error("comment {0} is no longer part of this thread")]
    StaleReference(CommentId),
    #[error("sign in to continue")]
    Unauthenticated,
    #[error("another {0} is still in progress")]
    Busy(Operation),
    #[error("comment cannot be empty")]
    EmptyContent,
    #[error("replies nest at most three levels; got a chain of {0} ancestors")]
    ChainTooDeep(usize),
    #[error("{operation} failed: {source}")]
    Source {
        operation: Operation,
        #[source]
        source: SourceError,
    },
}

impl ThreadError {
    fn from_source(operation: Operation) -> impl FnOnce(SourceError) -> Self {
        move |source| Self::Source { operation, source }
    }

    /// Text for a transient notice.
    pub fn user_message(&self) -> String {
        match self {
            Self::Source { source, .. } => source.user_message(),
            other => other.to_string(),
        }
    }
}

/// Tunables for a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadOptions {
    pub page_size: u32,
    pub reply_batch: u32,
}

impl Default for ThreadOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            reply_batch: DEFAULT_REPLY_BATCH,
        }
    }
}

/// The discussion attached to one post or note.
pub struct CommentThread<S, I = Rc<Session>> {
    source: S,
    identity: I,
    state: RefCell<ThreadState>,
    reply_batch: u32,
    events: Option<UnboundedSender<ThreadEvent>>,
}

#[derive(Debug, Clone, Copy)]
enum Flag {
    Loading,
    Submitting,
}

/// Holds a busy flag for the duration of one operation.
struct FlagGuard<'a> {
    state: &'a RefCell<ThreadState>,
    flag: Flag,
}

impl<'a> FlagGuard<'a> {
    fn acquire(state: &'a RefCell<ThreadState>, flag: Flag, operation: Operation) -> Result<Self> {
        let mut current = state.borrow_mut();
        let slot = match flag {
            Flag::Loading => &mut current.loading,
            Flag::Submitting => &mut current.submitting,
        };
        if *slot {
            return Err(ThreadError::Busy(operation));
        }
        *slot = true;
        Ok(Self { state, flag })
    }
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        let mut current = self.state.borrow_mut();
        match self.flag {
            Flag::Loading => current.loading = false,
            Flag::Submitting => current.submitting = false,
        }
    }
}

impl<S, I> CommentThread<S, I>
where
    S: CommentSource,
    I: Identity,
{
    pub fn new(target: Target, source: S, identity: I) -> Self {
        Self::with_options(target, source, identity, ThreadOptions::default())
    }

    pub fn with_options(target: Target, source: S, identity: I, options: ThreadOptions) -> Self {
        Self {
            source,
            identity,
            state: RefCell::new(ThreadState::new(target, options.page_size)),
            reply_batch: options.reply_batch.max(1),
            events: None,
        }
    }

    /// Routes outcome notifications to `tx`.
    pub fn with_events(mut self, tx: UnboundedSender<ThreadEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn target(&self) -> Target {
        self.state.borrow().target.clone()
    }

    /// Returns a copy of the current state.
    pub fn snapshot(&self) -> ThreadState {
        self.state.borrow().clone()
    }

    /// Reads the current state without copying it.
    pub fn with_state<R>(&self, read: impl FnOnce(&ThreadState) -> R) -> R {
        read(&self.state.borrow())
    }

    /// Looks up a comment by path and clones it.
    pub fn comment(&self, path: &CommentPath) -> Option<Comment> {
        self.state.borrow().find(path).cloned()
    }

    pub fn can_comment(&self) -> bool {
        self.identity.is_signed_in()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn is_submitting(&self) -> bool {
        self.state.borrow().submitting
    }

    /// Fetches the next page, or the first page again when `refresh` is set.
    ///
    /// Returns how many comments were added. State is untouched on failure.
    pub async fn fetch_page(&self, refresh: bool) -> Result<usize> {
        let operation = Operation::FetchComments;
        let _guard = FlagGuard::acquire(&self.state, Flag::Loading, operation)?;

        let (target, page, page_size) = {
            let state = self.state.borrow();
            let page = if refresh { 1 } else { state.page };
            (state.target.clone(), page, state.page_size)
        };
        debug!(%target, page, refresh, "fetching top-level comments");

        let fetched = self
            .source
            .fetch_comments(&target, page, page_size)
            .await
            .map_err(ThreadError::from_source(operation));
        let fetched = self.settle(operation, fetched)?;

        let (added, total) = {
            let mut state = self.state.borrow_mut();
            let added = state.apply_page(fetched, refresh);
            (added, state.total_count)
        };

        self.emit(ThreadEvent::PageLoaded {
            target,
            refresh,
            added,
            total,
        });
        Ok(added)
    }

    pub async fn refresh(&self) -> Result<usize> {
        self.fetch_page(true).await
    }

    /// Fetches the next page when one exists and nothing else is loading.
    pub async fn load_more(&self) -> Result<usize> {
        let ready = self.with_state(|state| state.has_more && !state.loading);
        if !ready {
            return Ok(0);
        }
        self.fetch_page(false).await
    }

    /// Posts a new comment at `target` and returns where it landed.
    pub async fn submit(&self, content: &str, target: ReplyTarget) -> Result<CommentPath> {
        self.submit_with_reply_to(content, target, None).await
    }

    /// Posts a comment under the ancestor chain `chain` (at most two ids).
    pub async fn submit_chain(&self, content: &str, chain: &[CommentId]) -> Result<CommentPath> {
        let target = ReplyTarget::from_chain(chain).map_err(ThreadError::ChainTooDeep)?;
        self.submit(content, target).await
    }

    /// Answers the comment at `path`, addressing its author.
    ///
    /// Answers to a sub-reply become siblings of it.
    pub async fn reply_to(&self, content: &str, path: &CommentPath) -> Result<CommentPath> {
        let addressee = self
            .comment(path)
            .map(|comment| comment.author)
            .ok_or_else(|| ThreadError::StaleReference(path.id().clone()))?;
        self.submit_with_reply_to(content, ReplyTarget::for_reply_to(path), Some(addressee))
            .await
    }

    async fn submit_with_reply_to(
        &self,
        content: &str,
        target: ReplyTarget,
        reply_to: Option<UserSummary>,
    ) -> Result<CommentPath> {
        let operation = Operation::Submit;
        if self.is_submitting() {
            return Err(ThreadError::Busy(operation));
        }

        let result = self.try_submit(content, &target, reply_to).await;
        self.settle(operation, result)
    }

    async fn try_submit(
        &self,
        content: &str,
        target: &ReplyTarget,
        reply_to: Option<UserSummary>,
    ) -> Result<CommentPath> {
        let operation = Operation::Submit;
        let content = content.trim();
        if content.is_empty() {
            return Err(ThreadError::EmptyContent);
        }
        let author = self.identity.viewer().ok_or(ThreadError::Unauthenticated)?;
        if let Some(missing) = self.state.borrow().missing_ancestor(target) {
            return Err(ThreadError::StaleReference(missing));
        }

        let _guard = FlagGuard::acquire(&self.state, Flag::Submitting, operation)?;
        let thread_target = self.target();
        let request = NewComment {
            content: content.to_owned(),
            root_id: match target {
                ReplyTarget::Thread => None,
                ReplyTarget::Comment(main) | ReplyTarget::Reply(main, _) => Some(main.clone()),
            },
            parent_id: target.parent_id().cloned(),
            reply_to_user_id: reply_to.as_ref().map(|user| user.id.clone()),
        };
        debug!(target = %thread_target, depth = target.depth(), "submitting comment");

        let receipt = self
            .source
            .create_comment(&thread_target, &request)
            .await
            .map_err(ThreadError::from_source(operation))?;

        let comment = Comment::fresh(
            receipt.id,
            author,
            request.content,
            receipt.created_at,
            reply_to,
        );
        let path = self
            .state
            .borrow_mut()
            .insert(comment, target)
            .map_err(ThreadError::StaleReference)?;

        self.emit(ThreadEvent::CommentAdded {
            target: thread_target,
            path: path.clone(),
        });
        Ok(path)
    }

    /// Flips the viewer's like on the comment at `path`; returns the new state.
    pub async fn toggle_like(&self, path: &CommentPath) -> Result<bool> {
        let result = self.try_toggle_like(path).await;
        self.settle(Operation::Like, result)
    }

    async fn try_toggle_like(&self, path: &CommentPath) -> Result<bool> {
        if !self.identity.is_signed_in() {
            return Err(ThreadError::Unauthenticated);
        }
        let liked = !self
            .comment(path)
            .map(|comment| comment.is_liked)
            .ok_or_else(|| ThreadError::StaleReference(path.id().clone()))?;

        let target = self.target();
        self.source
            .set_liked(&target, path.id(), liked)
            .await
            .map_err(ThreadError::from_source(Operation::Like))?;

        let like_count = self
            .state
            .borrow_mut()
            .set_liked(path, liked)
            .ok_or_else(|| ThreadError::StaleReference(path.id().clone()))?;

        self.emit(ThreadEvent::LikeToggled {
            target,
            path: path.clone(),
            liked,
            like_count,
        });
        Ok(liked)
    }

    /// Deletes the comment at `path` and everything under it.
    ///
    /// Resolves to `false` without contacting the backend when the comment is
    /// already gone.
    pub async fn delete(&self, path: &CommentPath) -> Result<bool> {
        if self.state.borrow().find(path).is_none() {
            debug!(id = %path.id(), "delete skipped; comment not present");
            return Ok(false);
        }

        let target = self.target();
        let deleted = self
            .source
            .delete_comment(&target, path.id())
            .await
            .map_err(ThreadError::from_source(Operation::Delete));
        self.settle(Operation::Delete, deleted)?;

        let removed = self.state.borrow_mut().remove(path).is_some();
        if removed {
            self.emit(ThreadEvent::CommentDeleted {
                target,
                path: path.clone(),
            });
        }
        Ok(removed)
    }

    /// Fetches further direct replies under a top-level comment.
    pub async fn load_more_replies(&self, top: &CommentId) -> Result<usize> {
        let result = self.try_load_more_replies(top).await;
        self.settle(Operation::LoadReplies, result)
    }

    async fn try_load_more_replies(&self, top: &CommentId) -> Result<usize> {
        let operation = Operation::LoadReplies;
        let _guard = FlagGuard::acquire(&self.state, Flag::Loading, operation)?;

        let offset = self
            .state
            .borrow()
            .top(top)
            .map(|comment| comment.replies.len())
            .ok_or_else(|| ThreadError::StaleReference(top.clone()))?;

        let target = self.target();
        let replies = self
            .source
            .fetch_replies(&target, top, offset, self.reply_batch)
            .await
            .map_err(ThreadError::from_source(operation))?;

        let (added, has_more) = self
            .state
            .borrow_mut()
            .append_replies(top, replies)
            .ok_or_else(|| ThreadError::StaleReference(top.clone()))?;

        self.emit(ThreadEvent::RepliesLoaded {
            target,
            top: top.clone(),
            added,
            has_more,
        });
        Ok(added)
    }

    /// Reports failures to the log and the notification surface.
    ///
    /// Guard rejections are silent.
    fn settle<T>(&self, operation: Operation, result: Result<T>) -> Result<T> {
        if let Err(error) = &result {
            if matches!(error, ThreadError::Busy(_)) {
                debug!(%operation, "rejected; operation already running");
            } else {
                warn!(%operation, error = %error, "comment operation failed");
                self.emit(ThreadEvent::OperationFailed {
                    target: self.target(),
                    operation,
                    message: error.user_message(),
                });
            }
        }
        result
    }

    fn emit(&self, event: ThreadEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}
