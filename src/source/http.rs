//! JSON REST adapter for the comment backend.
//!
//! Every response is wrapped in a `{ code, message, data }` envelope where
//! `code == 200` means success and `code == 401` means the session expired.

use super::{CommentReceipt, CommentSource, NewComment, Result, SourceError};
use crate::domain::{Comment, CommentId, CommentPage, Target};
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

const ENVELOPE_OK: i64 = 200;
const ENVELOPE_UNAUTHORIZED: i64 = 401;
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Comment backend reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpCommentSource {
    client: Client,
    base_url: String,
    token: Option<SecretString>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

impl HttpCommentSource {
    /// Builds a source rooted at `base_url`, e.g. `https://example.com/api`.
    pub fn new(
        base_url: impl Into<String>,
        token: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            token,
        })
    }

    fn comments_endpoint(&self, target: &Target) -> String {
        format!(
            "{}/{}s/{}/comments",
            self.base_url,
            target.kind.label(),
            target.id
        )
    }

    fn comment_endpoint(&self, target: &Target, comment: &CommentId) -> String {
        format!("{}/{}", self.comments_endpoint(target), comment)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token.expose_secret()),
            None => req,
        }
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<Option<T>> {
        let response = self.authorize(req).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status == StatusCode::UNAUTHORIZED {
            return Err(SourceError::Unauthorized);
        }
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                message: text.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        decode_envelope(&text)
    }
}

impl CommentSource for HttpCommentSource {
    async fn fetch_comments(
        &self,
        target: &Target,
        page: u32,
        page_size: u32,
    ) -> Result<CommentPage> {
        debug!(%target, page, page_size, "fetching comment page");
        let req = self
            .client
            .get(self.comments_endpoint(target))
            .query(&[("page", page), ("pageSize", page_size)]);
        self.send(req).await?.ok_or(SourceError::MissingData)
    }

    async fn fetch_replies(
        &self,
        target: &Target,
        top: &CommentId,
        offset: usize,
        limit: u32,
    ) -> Result<Vec<Comment>> {
        debug!(%target, %top, offset, limit, "fetching replies");
        let req = self
            .client
            .get(format!("{}/replies", self.comment_endpoint(target, top)))
            .query(&[("offset", offset as u64), ("limit", u64::from(limit))]);
        Ok(self.send(req).await?.unwrap_or_default())
    }

    async fn create_comment(
        &self,
        target: &Target,
        request: &NewComment,
    ) -> Result<CommentReceipt> {
        let req = self
            .client
            .post(self.comments_endpoint(target))
            .json(request);
        self.send(req).await?.ok_or(SourceError::MissingData)
    }

    async fn set_liked(&self, target: &Target, comment: &CommentId, liked: bool) -> Result<()> {
        let url = format!("{}/like", self.comment_endpoint(target, comment));
        let req = if liked {
            self.client.post(url)
        } else {
            self.client.delete(url)
        };
        self.send::<serde_json::Value>(req).await?;
        Ok(())
    }

    async fn delete_comment(&self, target: &Target, comment: &CommentId) -> Result<()> {
        let req = self.client.delete(self.comment_endpoint(target, comment));
        self.send::<serde_json::Value>(req).await?;
        Ok(())
    }
}

fn decode_envelope<T: DeserializeOwned>(body: &str) -> Result<Option<T>> {
    let envelope: ApiResponse<T> = serde_json::from_str(body)?;
    match envelope.code {
        ENVELOPE_OK => Ok(envelope.data),
        ENVELOPE_UNAUTHORIZED => Err(SourceError::Unauthorized),
        code => Err(SourceError::Api {
            code,
            message: envelope.message,
        }),
    }
}
