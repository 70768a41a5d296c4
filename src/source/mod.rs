//! Backend data sources for comment threads.

pub mod errors;
pub mod http;

pub use self::errors::{Result, SourceError};
pub use self::http::HttpCommentSource;

use crate::domain::{Comment, CommentId, CommentPage, Target};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Request body for creating a comment at any depth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_id: Option<CommentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CommentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_user_id: Option<String>,
}

/// What the backend hands back after persisting a new comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentReceipt {
    pub id: CommentId,
    pub created_at: DateTime<Utc>,
}

/// Backend operations the thread manager depends on.
///
/// Every call is a single round trip; implementations must not touch any
/// client-side thread state.
#[allow(async_fn_in_trait)]
pub trait CommentSource {
    /// Returns one page of top-level comments, 1-indexed.
    async fn fetch_comments(
        &self,
        target: &Target,
        page: u32,
        page_size: u32,
    ) -> Result<CommentPage>;

    /// Returns up to `limit` direct replies of `top`, skipping the first `offset`.
    async fn fetch_replies(
        &self,
        target: &Target,
        top: &CommentId,
        offset: usize,
        limit: u32,
    ) -> Result<Vec<Comment>>;

    async fn create_comment(
        &self,
        target: &Target,
        request: &NewComment,
    ) -> Result<CommentReceipt>;

    async fn set_liked(&self, target: &Target, comment: &CommentId, liked: bool) -> Result<()>;

    async fn delete_comment(&self, target: &Target, comment: &CommentId) -> Result<()>;
}

impl<S: CommentSource + ?Sized> CommentSource for &S {
    async fn fetch_comments(
        &self,
        target: &Target,
        page: u32,
        page_size: u32,
    ) -> Result<CommentPage> {
        (**self).fetch_comments(target, page, page_size).await
    }

    async fn fetch_replies(
        &self,
        target: &Target,
        top: &CommentId,
        offset: usize,
        limit: u32,
    ) -> Result<Vec<Comment>> {
        (**self).fetch_replies(target, top, offset, limit).await
    }

    async fn create_comment(
        &self,
        target: &Target,
        request: &NewComment,
    ) -> Result<CommentReceipt> {
        (**self).create_comment(target, request).await
    }

    async fn set_liked(&self, target: &Target, comment: &CommentId, liked: bool) -> Result<()> {
        (**self).set_liked(target, comment, liked).await
    }

    async fn delete_comment(&self, target: &Target, comment: &CommentId) -> Result<()> {
        (**self).delete_comment(target, comment).await
    }
}

impl<S: CommentSource + ?Sized> CommentSource for Rc<S> {
    async fn fetch_comments(
        &self,
        target: &Target,
        page: u32,
        page_size: u32,
    ) -> Result<CommentPage> {
        (**self).fetch_comments(target, page, page_size).await
    }

    async fn fetch_replies(
        &self,
        target: &Target,
        top: &CommentId,
        offset: usize,
        limit: u32,
    ) -> Result<Vec<Comment>> {
        (**self).fetch_replies(target, top, offset, limit).await
    }

    async fn create_comment(
        &self,
        target: &Target,
        request: &NewComment,
    ) -> Result<CommentReceipt> {
        (**self).create_comment(target, request).await
    }

    async fn set_liked(&self, target: &Target, comment: &CommentId, liked: bool) -> Result<()> {
        (**self).set_liked(target, comment, liked).await
    }

    async fn delete_comment(&self, target: &Target, comment: &CommentId) -> Result<()> {
        (**self).delete_comment(target, comment).await
    }
}
