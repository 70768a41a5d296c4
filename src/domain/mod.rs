//! Domain models shared across the thread manager, data sources, and rendering.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque comment identifier assigned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommentId(pub String);

impl CommentId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CommentId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// A user as shown next to a comment. Held by value; comments never own users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    #[serde(alias = "nickname")]
    pub display_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl UserSummary {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            avatar_url: None,
        }
    }
}

/// Kind of entity a discussion hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Post,
    Note,
}

impl TargetKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Note => "note",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The post or note a comment thread belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    pub kind: TargetKind,
    pub id: String,
}

impl Target {
    pub fn new(kind: TargetKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// A node in the three-level comment forest.
///
/// Only top-level comments and their direct replies carry `replies`; a
/// sub-reply's list is always empty. `total_replies_count` is only maintained
/// on top-level comments and counts every descendant, including ones the
/// client has not fetched yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub author: UserSummary,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub like_count: u32,
    #[serde(default)]
    pub is_liked: bool,
    #[serde(default)]
    pub replies: Vec<Comment>,
    #[serde(default)]
    pub total_replies_count: u32,
    #[serde(default)]
    pub has_more_replies: bool,
    #[serde(default)]
    pub reply_to: Option<UserSummary>,
}

impl Comment {
    /// Builds a freshly submitted comment: no likes, no children.
    pub fn fresh(
        id: CommentId,
        author: UserSummary,
        content: String,
        created_at: DateTime<Utc>,
        reply_to: Option<UserSummary>,
    ) -> Self {
        Self {
            id,
            author,
            content,
            created_at,
            like_count: 0,
            is_liked: false,
            replies: Vec::new(),
            total_replies_count: 0,
            has_more_replies: false,
            reply_to,
        }
    }

    /// Number of descendants currently held in memory.
    pub fn materialized_replies(&self) -> usize {
        self.replies.len()
            + self
                .replies
                .iter()
                .map(|reply| reply.replies.len())
                .sum::<usize>()
    }

    /// Re-derives `has_more_replies` from the aggregate and materialized counts.
    pub fn refresh_has_more_replies(&mut self) {
        self.has_more_replies = (self.total_replies_count as usize) > self.materialized_replies();
    }
}

/// One page of top-level comments as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentPage {
    #[serde(rename = "list")]
    pub comments: Vec<Comment>,
    pub total: u32,
    pub page: u32,
    pub page_size: u32,
}

/// Locates a live comment at any depth of a thread.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CommentPath {
    Top {
        id: CommentId,
    },
    Reply {
        top: CommentId,
        id: CommentId,
    },
    SubReply {
        top: CommentId,
        reply: CommentId,
        id: CommentId,
    },
}

impl CommentPath {
    pub fn top(id: impl Into<CommentId>) -> Self {
        Self::Top { id: id.into() }
    }

    pub fn reply(top: impl Into<CommentId>, id: impl Into<CommentId>) -> Self {
        Self::Reply {
            top: top.into(),
            id: id.into(),
        }
    }

    pub fn sub_reply(
        top: impl Into<CommentId>,
        reply: impl Into<CommentId>,
        id: impl Into<CommentId>,
    ) -> Self {
        Self::SubReply {
            top: top.into(),
            reply: reply.into(),
            id: id.into(),
        }
    }

    /// The identifier of the comment this path points at.
    pub fn id(&self) -> &CommentId {
        match self {
            Self::Top { id } | Self::Reply { id, .. } | Self::SubReply { id, .. } => id,
        }
    }

    /// The top-level ancestor (or the comment itself at depth 0).
    pub fn root(&self) -> &CommentId {
        match self {
            Self::Top { id } => id,
            Self::Reply { top, .. } | Self::SubReply { top, .. } => top,
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            Self::Top { .. } => 0,
            Self::Reply { .. } => 1,
            Self::SubReply { .. } => 2,
        }
    }
}

impl From<String> for CommentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Where a newly submitted comment attaches.
///
/// There is no variant for replying below a sub-reply: those replies become
/// siblings in the same sub-reply list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyTarget {
    Thread,
    Comment(CommentId),
    Reply(CommentId, CommentId),
}

impl ReplyTarget {
    /// Builds a target from an ordered ancestor chain of at most two ids.
    ///
    /// Returns the chain length back when it is deeper than two.
    pub fn from_chain(chain: &[CommentId]) -> Result<Self, usize> {
        match chain {
            [] => Ok(Self::Thread),
            [main] => Ok(Self::Comment(main.clone())),
            [main, second] => Ok(Self::Reply(main.clone(), second.clone())),
            deeper => Err(deeper.len()),
        }
    }

    /// Target for answering the comment at `path`.
    ///
    /// Answering a sub-reply lands in its parent reply's list.
    pub fn for_reply_to(path: &CommentPath) -> Self {
        match path {
            CommentPath::Top { id } => Self::Comment(id.clone()),
            CommentPath::Reply { top, id } => Self::Reply(top.clone(), id.clone()),
            CommentPath::SubReply { top, reply, .. } => Self::Reply(top.clone(), reply.clone()),
        }
    }

    /// Identifier of the comment the new one is nested directly under.
    pub fn parent_id(&self) -> Option<&CommentId> {
        match self {
            Self::Thread => None,
            Self::Comment(main) => Some(main),
            Self::Reply(_, second) => Some(second),
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            Self::Thread => 0,
            Self::Comment(_) => 1,
            Self::Reply(..) => 2,
        }
    }
}
