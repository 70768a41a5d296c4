//! Per-session list of blocked users.
//!
//! Constructed explicitly and handed to whoever needs it; there is no global
//! instance.

use crate::domain::UserSummary;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BlockError {
    #[error("user details are incomplete")]
    MissingUser,
    #[error("{0} is already blocked")]
    AlreadyBlocked(String),
}

/// Where a block was issued from; selects the confirmation wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockContext {
    Note,
    Post,
    #[default]
    User,
}

impl BlockContext {
    pub fn consequence(self) -> &'static str {
        match self {
            Self::Note => "You will no longer see this user's notes.",
            Self::Post => "You will no longer see this user's posts.",
            Self::User => "You will no longer see any content from this user.",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BlockList {
    blocked: BTreeSet<String>,
}

impl BlockList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_blocked(&self, user_id: &str) -> bool {
        self.blocked.contains(user_id)
    }

    /// Text to show before confirming a block.
    pub fn confirmation_prompt(user: &UserSummary, context: BlockContext) -> String {
        let name = if user.display_name.trim().is_empty() {
            "this user"
        } else {
            user.display_name.as_str()
        };
        format!("Block \"{name}\"?\n\n{}", context.consequence())
    }

    pub fn block(&mut self, user: &UserSummary) -> Result<(), BlockError> {
        if user.id.trim().is_empty() {
            return Err(BlockError::MissingUser);
        }
        if !self.blocked.insert(user.id.clone()) {
            return Err(BlockError::AlreadyBlocked(user.display_name.clone()));
        }
        info!(user_id = %user.id, "user blocked");
        Ok(())
    }

    /// Blocks every id in `user_ids`; returns how many were newly blocked.
    pub fn block_many<'a>(&mut self, user_ids: impl IntoIterator<Item = &'a str>) -> usize {
        user_ids
            .into_iter()
            .filter(|id| !id.trim().is_empty())
            .filter(|id| self.blocked.insert((*id).to_owned()))
            .count()
    }

    /// Returns whether the user was blocked.
    pub fn unblock(&mut self, user_id: &str) -> bool {
        self.blocked.remove(user_id)
    }

    pub fn blocked_users(&self) -> impl Iterator<Item = &str> {
        self.blocked.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.blocked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocked.is_empty()
    }

    pub fn clear(&mut self) {
        self.blocked.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::{BlockContext, BlockError, BlockList};
    use crate::domain::UserSummary;

    #[test]
    fn blocking_twice_is_an_error() {
        let mut list = BlockList::new();
        let user = UserSummary::new("user3", "Xiaoming");

        assert_eq!(list.block(&user), Ok(()));
        assert_eq!(
            list.block(&user),
            Err(BlockError::AlreadyBlocked("Xiaoming".to_owned()))
        );
        assert!(list.is_blocked("user3"));
        assert!(list.unblock("user3"));
        assert!(!list.unblock("user3"));
    }

    #[test]
    fn block_many_counts_only_new_ids() {
        let mut list = BlockList::new();
        list.block(&UserSummary::new("a", "A")).expect("block a");

        let added = list.block_many(["a", "b", "", "c"]);

        assert_eq!(added, 2);
        assert_eq!(list.blocked_users().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn prompt_falls_back_for_unnamed_users() {
        let prompt =
            BlockList::confirmation_prompt(&UserSummary::new("x", " "), BlockContext::Note);
        assert!(prompt.starts_with("Block \"this user\"?"));
        assert!(prompt.ends_with("notes."));
    }
}
