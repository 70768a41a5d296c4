//! Plain-text thread rendering for the CLI.

use crate::block::BlockList;
use crate::domain::Comment;
use crate::thread::ThreadState;
use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use std::time::Duration;

const INDENT: &str = "    ";
const BLOCKED_PLACEHOLDER: &str = "[content from a blocked user]";

/// Rendering knobs; `now` is pinned in tests.
#[derive(Debug, Clone)]
pub struct RenderOptions<'a> {
    pub now: DateTime<Utc>,
    pub blocked: Option<&'a BlockList>,
    pub max_content_chars: usize,
}

impl Default for RenderOptions<'_> {
    fn default() -> Self {
        Self {
            now: Utc::now(),
            blocked: None,
            max_content_chars: 280,
        }
    }
}

/// Renders the whole forest with a header line.
pub fn render_thread(state: &ThreadState, options: &RenderOptions<'_>) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} · {} comments ({} loaded)",
        state.target,
        state.total_count,
        state.comments.len()
    );

    if state.comments.is_empty() {
        out.push_str("  (no comments yet)\n");
        return out;
    }

    for comment in &state.comments {
        out.push('\n');
        render_comment(&mut out, comment, 0, options);
    }

    if state.has_more {
        out.push_str("\n  … more comments available\n");
    }
    out
}

fn render_comment(out: &mut String, comment: &Comment, depth: usize, options: &RenderOptions<'_>) {
    let indent = INDENT.repeat(depth);
    let blocked = options
        .blocked
        .is_some_and(|list| list.is_blocked(&comment.author.id));

    let mut header = format!("{indent}{}", comment.author.display_name);
    if let Some(addressee) = &comment.reply_to {
        let _ = write!(header, " ▸ {}", addressee.display_name);
    }
    let _ = write!(
        header,
        "  {}  ♥ {}{}",
        relative_age(comment.created_at, options.now),
        comment.like_count,
        if comment.is_liked { " (liked)" } else { "" }
    );
    let _ = writeln!(out, "{header}  #{}", comment.id);

    let body = if blocked {
        BLOCKED_PLACEHOLDER.to_owned()
    } else {
        short_preview(&comment.content, options.max_content_chars)
    };
    let _ = writeln!(out, "{indent}  {body}");

    for reply in &comment.replies {
        render_comment(out, reply, depth + 1, options);
    }

    if depth == 0 && comment.has_more_replies {
        let remaining =
            (comment.total_replies_count as usize).saturating_sub(comment.materialized_replies());
        let _ = writeln!(out, "{indent}{INDENT}↳ {remaining} more replies");
    }
}

/// Collapses whitespace and truncates to `max_chars`, ending in "..." when cut.
pub fn short_preview(text: &str, max_chars: usize) -> String {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.chars().count() <= max_chars {
        return normalized;
    }

    if max_chars <= 3 {
        return normalized.chars().take(max_chars).collect();
    }

    let mut out: String = normalized.chars().take(max_chars - 3).collect();
    out.push_str("...");
    out
}

/// Compact age like "3days ago"; timestamps in the future read as "just now".
pub fn relative_age(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let Ok(age) = (now - at).to_std() else {
        return "just now".to_owned();
    };
    if age < Duration::from_secs(60) {
        return "just now".to_owned();
    }

    // Whole seconds only, then keep the most significant unit.
    let formatted = humantime::format_duration(Duration::from_secs(age.as_secs())).to_string();
    let unit = formatted.split_whitespace().next().unwrap_or("?");
    format!("{unit} ago")
}

#[cfg(test)]
mod tests {
    use super::{RenderOptions, relative_age, render_thread, short_preview};
    use crate::block::BlockList;
    use crate::domain::{Comment, CommentId, CommentPage, Target, TargetKind, UserSummary};
    use crate::thread::ThreadState;
    use chrono::{Duration, TimeZone, Utc};

    fn comment(id: &str, author: &str, content: &str) -> Comment {
        Comment::fresh(
            CommentId::from(id),
            UserSummary::new(author, author),
            content.to_owned(),
            Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap(),
            None,
        )
    }

    #[test]
    fn preview_collapses_whitespace_and_truncates() {
        assert_eq!(short_preview("a  b\n c", 10), "a b c");
        assert_eq!(short_preview("abcdefghij", 6), "abc...");
        assert_eq!(short_preview("abcdef", 2), "ab");
    }

    #[test]
    fn relative_age_keeps_most_significant_unit() {
        let now = Utc.with_ymd_and_hms(2026, 2, 4, 3, 0, 0).unwrap();
        let then = now - Duration::days(3) - Duration::hours(3);
        assert_eq!(relative_age(then, now), "3days ago");
        assert_eq!(relative_age(now + Duration::minutes(1), now), "just now");
    }

    #[test]
    fn blocked_authors_are_masked_and_more_replies_noted() {
        let mut top = comment("c1", "halifax", "Great note");
        top.replies.push(comment("r1", "troll", "spam spam"));
        top.total_replies_count = 3;
        top.refresh_has_more_replies();

        let mut state = ThreadState::new(Target::new(TargetKind::Note, "n1"), 20);
        state.apply_page(
            CommentPage {
                comments: vec![top],
                total: 1,
                page: 1,
                page_size: 20,
            },
            true,
        );

        let mut blocked = BlockList::new();
        blocked.block_many(["troll"]);
        let options = RenderOptions {
            now: Utc.with_ymd_and_hms(2026, 2, 1, 2, 0, 0).unwrap(),
            blocked: Some(&blocked),
            max_content_chars: 80,
        };

        let rendered = render_thread(&state, &options);

        assert!(rendered.starts_with("note:n1 · 1 comments (1 loaded)"));
        assert!(rendered.contains("Great note"));
        assert!(!rendered.contains("spam"));
        assert!(rendered.contains("[content from a blocked user]"));
        assert!(rendered.contains("↳ 2 more replies"));
        assert!(rendered.contains("2h ago"));
    }
}
