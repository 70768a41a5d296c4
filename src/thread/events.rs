//! Outcome notifications emitted by a comment thread.

use crate::domain::{CommentId, CommentPath, Target};
use std::fmt;

/// Operation kinds, used for guard errors and failure notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    FetchComments,
    LoadReplies,
    Submit,
    Like,
    Delete,
}

impl Operation {
    pub fn label(self) -> &'static str {
        match self {
            Self::FetchComments => "comment fetch",
            Self::LoadReplies => "reply fetch",
            Self::Submit => "comment submission",
            Self::Like => "like",
            Self::Delete => "deletion",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Message sent to the notification surface after each operation settles.
#[derive(Debug, Clone, PartialEq)]
pub enum ThreadEvent {
    PageLoaded {
        target: Target,
        refresh: bool,
        added: usize,
        total: u32,
    },
    CommentAdded {
        target: Target,
        path: CommentPath,
    },
    LikeToggled {
        target: Target,
        path: CommentPath,
        liked: bool,
        like_count: u32,
    },
    CommentDeleted {
        target: Target,
        path: CommentPath,
    },
    RepliesLoaded {
        target: Target,
        top: CommentId,
        added: usize,
        has_more: bool,
    },
    OperationFailed {
        target: Target,
        operation: Operation,
        message: String,
    },
}

impl ThreadEvent {
    /// Short user-facing line for a transient notice.
    pub fn notice(&self) -> String {
        match self {
            Self::PageLoaded { added, total, .. } => format!("loaded {added} of {total} comments"),
            Self::CommentAdded { .. } => "comment posted".to_owned(),
            Self::LikeToggled { liked: true, .. } => "liked".to_owned(),
            Self::LikeToggled { liked: false, .. } => "like removed".to_owned(),
            Self::CommentDeleted { .. } => "comment deleted".to_owned(),
            Self::RepliesLoaded { added, .. } => format!("loaded {added} more replies"),
            Self::OperationFailed {
                operation, message, ..
            } => format!("{operation} failed: {message}"),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::OperationFailed { .. })
    }
}
