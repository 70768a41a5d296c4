//! Content reports filed by the viewer.
//!
//! A [`ReportDesk`] is constructed explicitly, like the block list. Filing is
//! two-step: pick a subject, then submit it with a category and optional
//! details. Submitted reports are kept so the same subject is not reported
//! twice in one session.

use crate::domain::{CommentId, CommentPath, Target, UserSummary};
use crate::thread::ThreadState;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportError {
    #[error("choose something to report first")]
    NoSubject,
    #[error("comment {0} is no longer part of this thread")]
    UnknownComment(CommentId),
    #[error("{0} has already been reported")]
    AlreadyReported(ReportSubject),
}

/// Report categories, in the order they are offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Spam,
    Illegal,
    Vulgar,
    Attack,
    Fake,
    Copyright,
    Other,
}

impl ReportKind {
    pub const ALL: [Self; 7] = [
        Self::Spam,
        Self::Illegal,
        Self::Vulgar,
        Self::Attack,
        Self::Fake,
        Self::Copyright,
        Self::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Spam => "Spam or advertising",
            Self::Illegal => "Illegal content",
            Self::Vulgar => "Sexual or vulgar content",
            Self::Attack => "Harassment",
            Self::Fake => "False information",
            Self::Copyright => "Copyright infringement",
            Self::Other => "Other",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Spam => "Promotion, marketing, or other junk",
            Self::Illegal => "Content that breaks laws or regulations",
            Self::Vulgar => "Pornographic, crude, or indecent content",
            Self::Attack => "Personal attacks or malicious smears",
            Self::Fake => "False or misleading information",
            Self::Copyright => "Infringes someone's copyright or intellectual property",
            Self::Other => "Other inappropriate content",
        }
    }
}

/// What is being reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReportSubject {
    Post { id: String },
    User { id: String },
    Comment { target: Target, id: CommentId },
}

impl fmt::Display for ReportSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Post { id } => write!(f, "post {id}"),
            Self::User { id } => write!(f, "user {id}"),
            Self::Comment { target, id } => write!(f, "comment {id} on {target}"),
        }
    }
}

/// A filed report, as it would be sent to moderation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub subject: ReportSubject,
    pub kind: ReportKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub reported_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct ReportDesk {
    pending: Option<ReportSubject>,
    submitted: Vec<Report>,
}

impl ReportDesk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects `subject` for the next [`submit`](Self::submit).
    pub fn begin(&mut self, subject: ReportSubject) {
        self.pending = Some(subject);
    }

    pub fn report_post(&mut self, post_id: impl Into<String>) {
        self.begin(ReportSubject::Post { id: post_id.into() });
    }

    pub fn report_user(&mut self, user: &UserSummary) {
        self.begin(ReportSubject::User {
            id: user.id.clone(),
        });
    }

    /// Selects the comment at `path`, which must still be in `state`.
    pub fn report_comment(
        &mut self,
        state: &ThreadState,
        path: &CommentPath,
    ) -> Result<(), ReportError> {
        if state.find(path).is_none() {
            return Err(ReportError::UnknownComment(path.id().clone()));
        }
        self.begin(ReportSubject::Comment {
            target: state.target.clone(),
            id: path.id().clone(),
        });
        Ok(())
    }

    pub fn pending(&self) -> Option<&ReportSubject> {
        self.pending.as_ref()
    }

    /// Drops the pending selection.
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn submit(
        &mut self,
        kind: ReportKind,
        reason: Option<String>,
        description: Option<String>,
    ) -> Result<&Report, ReportError> {
        self.submit_at(kind, reason, description, Utc::now())
    }

    /// Files the pending subject. The selection is cleared on success and
    /// kept on error.
    pub fn submit_at(
        &mut self,
        kind: ReportKind,
        reason: Option<String>,
        description: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<&Report, ReportError> {
        let subject = self.pending.clone().ok_or(ReportError::NoSubject)?;
        if self.has_reported(&subject) {
            return Err(ReportError::AlreadyReported(subject));
        }

        info!(subject = %subject, kind = ?kind, "report filed");
        self.pending = None;
        let index = self.submitted.len();
        self.submitted.push(Report {
            subject,
            kind,
            reason: non_blank(reason),
            description: non_blank(description),
            reported_at: now,
        });
        Ok(&self.submitted[index])
    }

    /// Selects and files `subject` in one step.
    pub fn quick_report(
        &mut self,
        subject: ReportSubject,
        kind: ReportKind,
    ) -> Result<&Report, ReportError> {
        self.begin(subject);
        self.submit(kind, None, None)
    }

    pub fn has_reported(&self, subject: &ReportSubject) -> bool {
        self.submitted.iter().any(|report| &report.subject == subject)
    }

    pub fn submitted(&self) -> &[Report] {
        &self.submitted
    }
}

fn non_blank(text: Option<String>) -> Option<String> {
    text.map(|text| text.trim().to_owned())
        .filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::{ReportDesk, ReportError, ReportKind, ReportSubject};
    use crate::domain::{
        Comment, CommentId, CommentPage, CommentPath, Target, TargetKind, UserSummary,
    };
    use crate::thread::ThreadState;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn thread_with_comment(id: &str) -> ThreadState {
        let mut state = ThreadState::new(Target::new(TargetKind::Post, "p1"), 20);
        state.apply_page(
            CommentPage {
                comments: vec![Comment::fresh(
                    CommentId::from(id),
                    UserSummary::new("user2", "Wanderer826"),
                    "buy cheap watches".to_owned(),
                    Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap(),
                    None,
                )],
                total: 1,
                page: 1,
                page_size: 20,
            },
            true,
        );
        state
    }

    #[test]
    fn comment_report_records_subject_and_details() {
        let state = thread_with_comment("c1");
        let mut desk = ReportDesk::new();
        let now = Utc.with_ymd_and_hms(2026, 2, 2, 8, 0, 0).unwrap();

        desk.report_comment(&state, &CommentPath::top("c1"))
            .expect("comment exists");
        let report = desk
            .submit_at(
                ReportKind::Spam,
                Some("advertising".to_owned()),
                Some("  ".to_owned()),
                now,
            )
            .expect("filed")
            .clone();

        assert_eq!(
            report.subject,
            ReportSubject::Comment {
                target: Target::new(TargetKind::Post, "p1"),
                id: CommentId::from("c1"),
            }
        );
        assert_eq!(report.reason.as_deref(), Some("advertising"));
        assert_eq!(report.description, None);
        assert_eq!(report.reported_at, now);
        assert!(desk.pending().is_none());
    }

    #[test]
    fn stale_comment_and_missing_subject_are_rejected() {
        let state = thread_with_comment("c1");
        let mut desk = ReportDesk::new();

        assert_eq!(
            desk.report_comment(&state, &CommentPath::reply("c1", "gone")),
            Err(ReportError::UnknownComment(CommentId::from("gone")))
        );
        assert_eq!(
            desk.submit(ReportKind::Other, None, None).map(|r| r.kind),
            Err(ReportError::NoSubject)
        );
    }

    #[test]
    fn same_subject_is_reported_once() {
        let mut desk = ReportDesk::new();
        let user = UserSummary::new("user5", "TechGuru");
        let subject = ReportSubject::User {
            id: user.id.clone(),
        };

        desk.quick_report(subject.clone(), ReportKind::Attack)
            .expect("first report");
        desk.report_user(&user);
        let again = desk.submit(ReportKind::Fake, None, None).map(|r| r.kind);

        assert_eq!(again, Err(ReportError::AlreadyReported(subject.clone())));
        assert_eq!(desk.pending(), Some(&subject));
        assert_eq!(desk.submitted().len(), 1);
        desk.cancel();
        assert!(desk.pending().is_none());
    }

    #[test]
    fn catalogue_serializes_as_snake_case_values() {
        let values: Vec<String> = ReportKind::ALL
            .iter()
            .map(|kind| serde_json::to_value(kind).expect("serialize").to_string())
            .collect();
        assert_eq!(
            values,
            vec![
                "\"spam\"",
                "\"illegal\"",
                "\"vulgar\"",
                "\"attack\"",
                "\"fake\"",
                "\"copyright\"",
                "\"other\""
            ]
        );
        assert!(ReportKind::ALL.iter().all(|kind| !kind.description().is_empty()));
    }
}
