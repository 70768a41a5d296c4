//! Deterministic in-memory backend for demo mode and tests.

use crate::domain::{Comment, CommentId, CommentPage, Target, TargetKind, UserSummary};
use crate::source::{CommentReceipt, CommentSource, NewComment, Result, SourceError};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::time::Duration;

const DEMO_AVATAR: &str = "https://img.example.invalid/avatar/cat.jpeg";
/// Replies embedded in each top-level comment of a fetched page.
const PREVIEW_REPLIES: usize = 2;
const SEED_EPOCH_SECS: i64 = 1_770_975_720;

const DEMO_USERS: [(&str, &str); 5] = [
    ("user1", "Halifax"),
    ("user2", "Wanderer826"),
    ("user3", "Xiaoming"),
    ("user4", "Xiaohong"),
    ("user5", "TechGuru"),
];

const DEMO_CONTENTS: [&str; 8] = [
    "Server capacity is tight right now, so API top-ups are paused. Existing balances still work.",
    "Can't use it, and can't top up either.",
    "Yep, it went down under load.",
    "Keeps telling me: The server is busy. Please try again later.",
    "Really useful, thanks for sharing!",
    "Is there a more detailed walkthrough?",
    "Same problem here.",
    "Solved, thanks!",
];

const DEMO_REPLIES: [&str; 6] = [
    "Yep, it went down under load.",
    "I want to go too!",
    "Same.",
    "Thanks for sharing.",
    "Fair point.",
    "Learned something.",
];

/// Server-side view of one thread: top-level comments newest first, each
/// holding every reply.
#[derive(Debug, Default)]
struct DemoThread {
    comments: Vec<Comment>,
}

impl DemoThread {
    /// Looks up an author by id, falling back to a bare summary.
    fn known_user(&self, user_id: &str) -> UserSummary {
        self.comments
            .iter()
            .flat_map(|top| {
                std::iter::once(top).chain(top.replies.iter().flat_map(|reply| {
                    std::iter::once(reply).chain(reply.replies.iter())
                }))
            })
            .map(|comment| &comment.author)
            .find(|author| author.id == user_id)
            .cloned()
            .unwrap_or_else(|| UserSummary::new(user_id, user_id))
    }
}

/// A comment backend that keeps everything in memory.
///
/// Ids are sequential, timestamps derive from a fixed epoch, and a failure can
/// be injected for the next call. New comments are stored as written by
/// `viewer`, which defaults to the first demo user.
#[derive(Debug)]
pub struct DemoCommentSource {
    threads: RefCell<HashMap<Target, DemoThread>>,
    viewer: UserSummary,
    next_id: Cell<u64>,
    latency: Duration,
    fail_next: RefCell<Option<String>>,
    calls: Cell<u64>,
}

impl Default for DemoCommentSource {
    fn default() -> Self {
        Self::with_viewer(demo_user(0))
    }
}

pub fn demo_user(index: usize) -> UserSummary {
    let (id, name) = DEMO_USERS[index % DEMO_USERS.len()];
    UserSummary {
        id: id.to_owned(),
        display_name: name.to_owned(),
        avatar_url: Some(DEMO_AVATAR.to_owned()),
    }
}

/// The target used by the CLI demo.
pub fn demo_target() -> Target {
    Target::new(TargetKind::Note, "note_2208")
}

fn seed_time(minutes_ago: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(SEED_EPOCH_SECS, 0).unwrap_or_default()
        - ChronoDuration::minutes(minutes_ago)
}

impl DemoCommentSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend that records new comments as authored by `viewer`.
    pub fn with_viewer(viewer: UserSummary) -> Self {
        Self {
            threads: RefCell::default(),
            viewer,
            next_id: Cell::new(0),
            latency: Duration::ZERO,
            fail_next: RefCell::new(None),
            calls: Cell::new(0),
        }
    }

    /// Sleeps this long inside every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Seeds `target` with `count` top-level comments and a spread of replies.
    pub fn seeded(self, target: &Target, count: usize) -> Self {
        let comments = (0..count)
            .map(|index| self.seed_comment(index))
            .collect::<Vec<_>>();
        self.threads
            .borrow_mut()
            .insert(target.clone(), DemoThread { comments });
        self
    }

    /// Makes the next call fail with `message`.
    pub fn fail_next(&self, message: impl Into<String>) {
        self.fail_next.replace(Some(message.into()));
    }

    /// Number of calls served so far.
    pub fn calls(&self) -> u64 {
        self.calls.get()
    }

    /// Server-side count of top-level comments for `target`.
    pub fn stored_count(&self, target: &Target) -> usize {
        self.threads
            .borrow()
            .get(target)
            .map(|thread| thread.comments.len())
            .unwrap_or_default()
    }

    fn allocate_id(&self, prefix: &str) -> CommentId {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        CommentId::new(format!("{prefix}_{id}"))
    }

    fn seed_comment(&self, index: usize) -> Comment {
        let mut comment = Comment::fresh(
            self.allocate_id("comment"),
            demo_user(index),
            DEMO_CONTENTS[index % DEMO_CONTENTS.len()].to_owned(),
            seed_time(index as i64 * 37),
            None,
        );
        comment.like_count = (index as u32 * 7) % 20;
        comment.is_liked = index % 4 == 3;

        if index % 3 == 0 {
            let reply_count = index % 5 + 1;
            comment.replies = (0..reply_count)
                .map(|offset| self.seed_reply(index, offset))
                .collect();
        }
        comment.total_replies_count = comment.materialized_replies() as u32;
        comment
    }

    fn seed_reply(&self, parent: usize, offset: usize) -> Comment {
        let author = demo_user(parent + offset + 1);
        let mut reply = Comment::fresh(
            self.allocate_id("reply"),
            author.clone(),
            DEMO_REPLIES[(parent + offset) % DEMO_REPLIES.len()].to_owned(),
            seed_time(parent as i64 * 37 - offset as i64 * 5 - 1),
            (offset % 2 == 1).then(|| demo_user(parent)),
        );
        reply.like_count = (offset as u32 * 3) % 10;

        if offset % 2 == 1 {
            reply.replies.push(Comment::fresh(
                self.allocate_id("subreply"),
                demo_user(parent + offset + 2),
                DEMO_REPLIES[offset % DEMO_REPLIES.len()].to_owned(),
                seed_time(parent as i64 * 37 - offset as i64 * 5 - 2),
                Some(author),
            ));
        }
        reply
    }

    async fn begin_call(&self) -> Result<()> {
        self.calls.set(self.calls.get() + 1);
        if self.latency.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.latency).await;
        }
        match self.fail_next.take() {
            Some(message) => Err(SourceError::Unavailable(message)),
            None => Ok(()),
        }
    }

    fn not_found(id: &CommentId) -> SourceError {
        SourceError::Api {
            code: 404,
            message: format!("comment {id} not found"),
        }
    }
}

impl CommentSource for DemoCommentSource {
    async fn fetch_comments(
        &self,
        target: &Target,
        page: u32,
        page_size: u32,
    ) -> Result<CommentPage> {
        self.begin_call().await?;
        let threads = self.threads.borrow();
        let all = threads
            .get(target)
            .map(|thread| thread.comments.as_slice())
            .unwrap_or_default();

        let start = (page.max(1) as usize - 1) * page_size as usize;
        let comments = all
            .iter()
            .skip(start)
            .take(page_size as usize)
            .map(|comment| {
                let mut preview = comment.clone();
                preview.replies.truncate(PREVIEW_REPLIES);
                preview
            })
            .collect();

        Ok(CommentPage {
            comments,
            total: all.len() as u32,
            page,
            page_size,
        })
    }

    async fn fetch_replies(
        &self,
        target: &Target,
        top: &CommentId,
        offset: usize,
        limit: u32,
    ) -> Result<Vec<Comment>> {
        self.begin_call().await?;
        let threads = self.threads.borrow();
        let comment = threads
            .get(target)
            .and_then(|thread| thread.comments.iter().find(|comment| &comment.id == top))
            .ok_or_else(|| Self::not_found(top))?;

        Ok(comment
            .replies
            .iter()
            .skip(offset)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn create_comment(
        &self,
        target: &Target,
        request: &NewComment,
    ) -> Result<CommentReceipt> {
        self.begin_call().await?;
        let receipt = CommentReceipt {
            id: self.allocate_id("comment"),
            created_at: Utc::now(),
        };
        let mut threads = self.threads.borrow_mut();
        let thread = threads.entry(target.clone()).or_default();
        let reply_to = request
            .reply_to_user_id
            .as_deref()
            .map(|user_id| thread.known_user(user_id));
        let comment = Comment::fresh(
            receipt.id.clone(),
            self.viewer.clone(),
            request.content.clone(),
            receipt.created_at,
            reply_to,
        );

        match (&request.root_id, &request.parent_id) {
            (None, _) => thread.comments.insert(0, comment),
            (Some(root), parent) => {
                let top = thread
                    .comments
                    .iter_mut()
                    .find(|comment| &comment.id == root)
                    .ok_or_else(|| Self::not_found(root))?;
                match parent.as_ref().filter(|parent| *parent != root) {
                    Some(parent) => top
                        .replies
                        .iter_mut()
                        .find(|reply| &reply.id == parent)
                        .ok_or_else(|| Self::not_found(parent))?
                        .replies
                        .push(comment),
                    None => top.replies.push(comment),
                }
                top.total_replies_count += 1;
            }
        }

        Ok(receipt)
    }

    async fn set_liked(&self, target: &Target, comment: &CommentId, liked: bool) -> Result<()> {
        self.begin_call().await?;
        let mut threads = self.threads.borrow_mut();
        let node = threads
            .get_mut(target)
            .and_then(|thread| find_anywhere(&mut thread.comments, comment))
            .ok_or_else(|| Self::not_found(comment))?;
        if node.is_liked != liked {
            node.is_liked = liked;
            node.like_count = if liked {
                node.like_count + 1
            } else {
                node.like_count.saturating_sub(1)
            };
        }
        Ok(())
    }

    async fn delete_comment(&self, target: &Target, comment: &CommentId) -> Result<()> {
        self.begin_call().await?;
        let mut threads = self.threads.borrow_mut();
        let thread = threads
            .get_mut(target)
            .ok_or_else(|| Self::not_found(comment))?;

        if let Some(index) = thread.comments.iter().position(|c| &c.id == comment) {
            thread.comments.remove(index);
            return Ok(());
        }
        for top in &mut thread.comments {
            if let Some(index) = top.replies.iter().position(|r| &r.id == comment) {
                top.replies.remove(index);
                top.total_replies_count = top.total_replies_count.saturating_sub(1);
                return Ok(());
            }
            for reply in &mut top.replies {
                if let Some(index) = reply.replies.iter().position(|s| &s.id == comment) {
                    reply.replies.remove(index);
                    top.total_replies_count = top.total_replies_count.saturating_sub(1);
                    return Ok(());
                }
            }
        }
        Err(Self::not_found(comment))
    }
}

fn find_anywhere<'a>(comments: &'a mut [Comment], id: &CommentId) -> Option<&'a mut Comment> {
    for comment in comments {
        if &comment.id == id {
            return Some(comment);
        }
        if let Some(found) = find_anywhere(&mut comment.replies, id) {
            return Some(found);
        }
    }
    None
}
