//! In-memory comment forest for one target and its mutation rules.

use crate::domain::{Comment, CommentId, CommentPage, CommentPath, ReplyTarget, Target};

/// Default number of top-level comments requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Everything known locally about one target's discussion.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadState {
    pub target: Target,
    /// Top-level comments, most recently submitted first.
    pub comments: Vec<Comment>,
    /// Server-reported number of top-level comments.
    pub total_count: u32,
    /// Next page to request, 1-indexed.
    pub page: u32,
    pub page_size: u32,
    pub has_more: bool,
    pub loading: bool,
    pub submitting: bool,
}

impl ThreadState {
    pub fn new(target: Target, page_size: u32) -> Self {
        Self {
            target,
            comments: Vec::new(),
            total_count: 0,
            page: 1,
            page_size: page_size.max(1),
            has_more: true,
            loading: false,
            submitting: false,
        }
    }

    pub fn top(&self, id: &CommentId) -> Option<&Comment> {
        self.comments.iter().find(|comment| &comment.id == id)
    }

    fn top_mut(&mut self, id: &CommentId) -> Option<&mut Comment> {
        self.comments.iter_mut().find(|comment| &comment.id == id)
    }

    /// Resolves a path to the comment it names.
    pub fn find(&self, path: &CommentPath) -> Option<&Comment> {
        match path {
            CommentPath::Top { id } => self.top(id),
            CommentPath::Reply { top, id } => find_child(self.top(top)?, id),
            CommentPath::SubReply { top, reply, id } => {
                find_child(find_child(self.top(top)?, reply)?, id)
            }
        }
    }

    fn find_mut(&mut self, path: &CommentPath) -> Option<&mut Comment> {
        match path {
            CommentPath::Top { id } => self.top_mut(id),
            CommentPath::Reply { top, id } => find_child_mut(self.top_mut(top)?, id),
            CommentPath::SubReply { top, reply, id } => {
                find_child_mut(find_child_mut(self.top_mut(top)?, reply)?, id)
            }
        }
    }

    /// Returns the first ancestor named by `target` that is not present.
    pub fn missing_ancestor(&self, target: &ReplyTarget) -> Option<CommentId> {
        match target {
            ReplyTarget::Thread => None,
            ReplyTarget::Comment(main) => self.top(main).is_none().then(|| main.clone()),
            ReplyTarget::Reply(main, second) => match self.top(main) {
                None => Some(main.clone()),
                Some(top) => find_child(top, second)
                    .is_none()
                    .then(|| second.clone()),
            },
        }
    }

    /// Folds a fetched page into the forest.
    ///
    /// A refresh replaces the list and restarts pagination; otherwise the page
    /// is appended, skipping comments already held locally. Returns how many
    /// comments were added.
    pub fn apply_page(&mut self, page: CommentPage, refresh: bool) -> usize {
        let incoming = page.comments.into_iter().map(normalize_top_level);

        let appended = if refresh {
            self.comments = incoming.collect();
            self.page = 2;
            self.comments.len()
        } else {
            let before = self.comments.len();
            for comment in incoming {
                if self.top(&comment.id).is_none() {
                    self.comments.push(comment);
                }
            }
            self.page += 1;
            self.comments.len() - before
        };

        self.total_count = page.total;
        self.recompute_has_more();
        appended
    }

    /// Inserts a new comment where `target` says.
    ///
    /// Top-level comments go to the front and bump `total_count`; nested ones go
    /// to the back of their parent's list and bump the top-level ancestor's
    /// `total_replies_count`. On a missing ancestor nothing changes and its id
    /// is returned.
    pub fn insert(
        &mut self,
        comment: Comment,
        target: &ReplyTarget,
    ) -> Result<CommentPath, CommentId> {
        if let Some(missing) = self.missing_ancestor(target) {
            return Err(missing);
        }

        let id = comment.id.clone();
        let path = match target {
            ReplyTarget::Thread => {
                self.comments.insert(0, comment);
                self.total_count += 1;
                self.recompute_has_more();
                return Ok(CommentPath::Top { id });
            }
            ReplyTarget::Comment(main) => CommentPath::Reply {
                top: main.clone(),
                id,
            },
            ReplyTarget::Reply(main, second) => CommentPath::SubReply {
                top: main.clone(),
                reply: second.clone(),
                id,
            },
        };

        let top = self.top_mut(path.root()).ok_or_else(|| path.root().clone())?;
        match target {
            ReplyTarget::Reply(_, second) => {
                let reply = find_child_mut(top, second).ok_or_else(|| second.clone())?;
                reply.replies.push(comment);
            }
            _ => top.replies.push(comment),
        }
        top.total_replies_count += 1;
        top.refresh_has_more_replies();

        Ok(path)
    }

    /// Splices out the comment at `path` together with its replies.
    ///
    /// Only the owning top-level comment's counter moves, by exactly one per
    /// deletion. Returns `None` when the comment is already gone.
    pub fn remove(&mut self, path: &CommentPath) -> Option<Comment> {
        match path {
            CommentPath::Top { id } => {
                let index = self.comments.iter().position(|c| &c.id == id)?;
                let removed = self.comments.remove(index);
                self.total_count = self.total_count.saturating_sub(1);
                self.recompute_has_more();
                Some(removed)
            }
            CommentPath::Reply { top, id } => {
                let top = self.top_mut(top)?;
                let removed = remove_child(&mut top.replies, id)?;
                top.total_replies_count = top.total_replies_count.saturating_sub(1);
                top.refresh_has_more_replies();
                Some(removed)
            }
            CommentPath::SubReply { top, reply, id } => {
                let top = self.top_mut(top)?;
                let parent = find_child_mut(top, reply)?;
                let removed = remove_child(&mut parent.replies, id)?;
                top.total_replies_count = top.total_replies_count.saturating_sub(1);
                top.refresh_has_more_replies();
                Some(removed)
            }
        }
    }

    /// Sets the viewer's like on a comment, adjusting its counter.
    ///
    /// Returns the new like count, or `None` when the comment is gone.
    pub fn set_liked(&mut self, path: &CommentPath, liked: bool) -> Option<u32> {
        let comment = self.find_mut(path)?;
        if comment.is_liked != liked {
            comment.is_liked = liked;
            comment.like_count = if liked {
                comment.like_count.saturating_add(1)
            } else {
                comment.like_count.saturating_sub(1)
            };
        }
        Some(comment.like_count)
    }

    /// Appends fetched direct replies under a top-level comment.
    ///
    /// Returns `(added, has_more_replies)` or `None` when the comment is gone.
    pub fn append_replies(
        &mut self,
        top: &CommentId,
        replies: Vec<Comment>,
    ) -> Option<(usize, bool)> {
        let top = self.top_mut(top)?;
        let before = top.replies.len();
        for reply in replies.into_iter().map(normalize_reply) {
            if find_child(top, &reply.id).is_none() {
                top.replies.push(reply);
            }
        }
        let added = top.replies.len() - before;
        if (top.total_replies_count as usize) < top.materialized_replies() {
            top.total_replies_count = top.materialized_replies() as u32;
        }
        top.refresh_has_more_replies();
        Some((added, top.has_more_replies))
    }

    fn recompute_has_more(&mut self) {
        self.has_more = self.comments.len() < self.total_count as usize;
    }
}

fn find_child<'a>(parent: &'a Comment, id: &CommentId) -> Option<&'a Comment> {
    parent.replies.iter().find(|reply| &reply.id == id)
}

fn find_child_mut<'a>(parent: &'a mut Comment, id: &CommentId) -> Option<&'a mut Comment> {
    parent.replies.iter_mut().find(|reply| &reply.id == id)
}

fn remove_child(list: &mut Vec<Comment>, id: &CommentId) -> Option<Comment> {
    let index = list.iter().position(|reply| &reply.id == id)?;
    Some(list.remove(index))
}

/// Trims anything below depth 2 and re-derives the reply flags.
fn normalize_top_level(mut comment: Comment) -> Comment {
    comment.replies = comment.replies.into_iter().map(normalize_reply).collect();
    if (comment.total_replies_count as usize) < comment.materialized_replies() {
        comment.total_replies_count = comment.materialized_replies() as u32;
    }
    comment.refresh_has_more_replies();
    comment
}

fn normalize_reply(mut reply: Comment) -> Comment {
    for sub in &mut reply.replies {
        sub.replies.clear();
        sub.total_replies_count = 0;
        sub.has_more_replies = false;
    }
    reply.total_replies_count = 0;
    reply.has_more_replies = false;
    reply
}

#[cfg(test)]
mod tests {
    use super::ThreadState;
    use crate::domain::{
        Comment, CommentId, CommentPage, CommentPath, ReplyTarget, Target, TargetKind,
        UserSummary,
    };
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn comment(id: &str) -> Comment {
        Comment::fresh(
            CommentId::from(id),
            UserSummary::new("user1", "Halifax"),
            format!("content of {id}"),
            Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap(),
            None,
        )
    }

    fn state_with(comments: Vec<Comment>) -> ThreadState {
        let mut state = ThreadState::new(Target::new(TargetKind::Post, "p1"), 20);
        let total = comments.len() as u32;
        state.apply_page(
            CommentPage {
                comments,
                total,
                page: 1,
                page_size: 20,
            },
            true,
        );
        state
    }

    fn ids(comments: &[Comment]) -> Vec<&str> {
        comments.iter().map(|comment| comment.id.as_str()).collect()
    }

    #[test]
    fn top_level_insert_goes_to_front() {
        let mut state = state_with(vec![comment("a"), comment("b")]);

        let path = state
            .insert(comment("new"), &ReplyTarget::Thread)
            .expect("top-level insert");

        assert_eq!(path, CommentPath::top("new"));
        assert_eq!(ids(&state.comments), vec!["new", "a", "b"]);
        assert_eq!(state.total_count, 3);
    }

    #[test]
    fn nested_inserts_append_and_bump_root_counter() {
        let mut state = state_with(vec![comment("a")]);

        state
            .insert(comment("r1"), &ReplyTarget::Comment("a".into()))
            .expect("reply insert");
        state
            .insert(comment("r2"), &ReplyTarget::Comment("a".into()))
            .expect("reply insert");
        let path = state
            .insert(comment("s1"), &ReplyTarget::Reply("a".into(), "r1".into()))
            .expect("sub-reply insert");

        assert_eq!(path, CommentPath::sub_reply("a", "r1", "s1"));
        let top = state.top(&"a".into()).expect("top exists");
        assert_eq!(ids(&top.replies), vec!["r1", "r2"]);
        assert_eq!(ids(&top.replies[0].replies), vec!["s1"]);
        assert_eq!(top.total_replies_count, 3);
        assert_eq!(top.replies[0].total_replies_count, 0);
        assert!(!top.has_more_replies);
    }

    #[test]
    fn insert_under_missing_ancestor_changes_nothing() {
        let mut state = state_with(vec![comment("a")]);
        let before = state.clone();

        let missing_top = state.insert(comment("x"), &ReplyTarget::Comment("gone".into()));
        let missing_reply =
            state.insert(comment("y"), &ReplyTarget::Reply("a".into(), "gone".into()));

        assert_eq!(missing_top, Err(CommentId::from("gone")));
        assert_eq!(missing_reply, Err(CommentId::from("gone")));
        assert_eq!(state, before);
    }

    #[test]
    fn removing_unknown_ids_is_a_no_op() {
        let mut state = state_with(vec![comment("a")]);
        state
            .insert(comment("r1"), &ReplyTarget::Comment("a".into()))
            .expect("reply insert");
        let before = state.clone();

        assert!(state.remove(&CommentPath::top("nope")).is_none());
        assert!(state.remove(&CommentPath::reply("a", "nope")).is_none());
        assert!(state.remove(&CommentPath::sub_reply("a", "r1", "nope")).is_none());
        assert!(state.remove(&CommentPath::sub_reply("nope", "r1", "x")).is_none());
        assert_eq!(state, before);
    }

    #[test]
    fn removing_reply_decrements_counter_once() {
        let mut state = state_with(vec![comment("a")]);
        state
            .insert(comment("r1"), &ReplyTarget::Comment("a".into()))
            .expect("reply insert");
        state
            .insert(comment("s1"), &ReplyTarget::Reply("a".into(), "r1".into()))
            .expect("sub-reply insert");
        state
            .insert(comment("s2"), &ReplyTarget::Reply("a".into(), "r1".into()))
            .expect("sub-reply insert");

        let removed = state
            .remove(&CommentPath::reply("a", "r1"))
            .expect("reply removed");

        assert_eq!(removed.replies.len(), 2);
        let top = state.top(&"a".into()).expect("top exists");
        assert!(top.replies.is_empty());
        // Three inserts, one delete.
        assert_eq!(top.total_replies_count, 2);
    }

    #[test]
    fn sub_reply_removal_never_underflows_counter() {
        let mut parent = comment("r1");
        parent.replies.push(comment("s1"));
        let mut top = comment("a");
        top.replies.push(parent);
        let mut state = state_with(vec![top]);
        state.comments[0].total_replies_count = 0;

        state
            .remove(&CommentPath::sub_reply("a", "r1", "s1"))
            .expect("sub-reply removed");

        assert_eq!(state.comments[0].total_replies_count, 0);
    }

    #[test]
    fn like_toggle_floors_at_zero() {
        let mut state = state_with(vec![comment("a")]);
        state.comments[0].is_liked = true;
        state.comments[0].like_count = 0;

        assert_eq!(state.set_liked(&CommentPath::top("a"), false), Some(0));
        assert_eq!(state.set_liked(&CommentPath::top("a"), true), Some(1));
        assert_eq!(state.set_liked(&CommentPath::top("a"), true), Some(1));
        assert_eq!(state.set_liked(&CommentPath::top("gone"), true), None);
    }

    #[test]
    fn appended_page_skips_known_comments_and_tracks_has_more() {
        let mut state = state_with(vec![comment("a"), comment("b")]);
        state.total_count = 4;

        let added = state.apply_page(
            CommentPage {
                comments: vec![comment("b"), comment("c")],
                total: 4,
                page: 2,
                page_size: 2,
            },
            false,
        );

        assert_eq!(added, 1);
        assert_eq!(ids(&state.comments), vec!["a", "b", "c"]);
        assert_eq!(state.page, 3);
        assert!(state.has_more);
    }

    #[test]
    fn fetched_comments_are_capped_at_three_levels() {
        let mut deep = comment("s1");
        deep.replies.push(comment("too-deep"));
        let mut reply = comment("r1");
        reply.replies.push(deep);
        let mut top = comment("a");
        top.replies.push(reply);
        top.total_replies_count = 1;

        let state = state_with(vec![top]);

        let top = &state.comments[0];
        assert!(top.replies[0].replies[0].replies.is_empty());
        assert_eq!(top.total_replies_count, 2);
        assert!(!top.has_more_replies);
    }

    #[test]
    fn appending_replies_updates_has_more_replies() {
        let mut top = comment("a");
        top.replies.push(comment("r1"));
        top.total_replies_count = 3;
        let mut state = state_with(vec![top]);
        assert!(state.comments[0].has_more_replies);

        let result = state.append_replies(&"a".into(), vec![comment("r1"), comment("r2")]);
        assert_eq!(result, Some((1, true)));

        let result = state.append_replies(&"a".into(), vec![comment("r3")]);
        assert_eq!(result, Some((1, false)));
        assert_eq!(ids(&state.comments[0].replies), vec!["r1", "r2", "r3"]);
    }
}
