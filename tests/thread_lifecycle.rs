use pretty_assertions::assert_eq;
use std::rc::Rc;
use threadline::domain::{Comment, CommentPath, ReplyTarget};
use threadline::fixtures::{self, DemoCommentSource};
use threadline::session::Session;
use threadline::thread::{CommentThread, ThreadError, ThreadEvent, ThreadOptions, ThreadState};
use tokio::sync::mpsc;

fn signed_in() -> Rc<Session> {
    Rc::new(Session::signed_in(fixtures::demo_user(0)))
}

fn demo_thread(seed: usize, page_size: u32) -> CommentThread<DemoCommentSource> {
    let target = fixtures::demo_target();
    let source = DemoCommentSource::new().seeded(&target, seed);
    CommentThread::with_options(
        target,
        source,
        signed_in(),
        ThreadOptions {
            page_size,
            reply_batch: 10,
        },
    )
}

/// Nothing sits below depth 2 and every aggregate covers what is held locally.
fn assert_forest_invariants(state: &ThreadState) {
    for top in &state.comments {
        for reply in &top.replies {
            for sub in &reply.replies {
                assert!(sub.replies.is_empty(), "sub-reply {} has children", sub.id);
            }
        }
        assert!(
            top.total_replies_count as usize >= top.materialized_replies(),
            "counter of {} below materialized replies",
            top.id
        );
        assert_eq!(
            top.has_more_replies,
            top.total_replies_count as usize > top.materialized_replies()
        );
    }
}

#[tokio::test]
async fn hello_then_hi_then_delete_round_trips_counters() {
    let thread = demo_thread(0, 20);
    thread.refresh().await.expect("empty thread loads");
    assert_eq!(thread.snapshot().total_count, 0);

    let top = thread
        .submit("hello", ReplyTarget::Thread)
        .await
        .expect("top-level comment");

    let state = thread.snapshot();
    assert_eq!(state.comments.len(), 1);
    assert_eq!(state.total_count, 1);
    let hello: &Comment = &state.comments[0];
    assert_eq!(hello.content, "hello");
    assert_eq!(hello.like_count, 0);
    assert!(!hello.is_liked);
    assert!(hello.replies.is_empty());

    let reply = thread
        .submit_chain("hi", &[top.id().clone()])
        .await
        .expect("reply");

    let hello = thread.comment(&top).expect("top-level comment");
    assert_eq!(reply.depth(), 1);
    assert_eq!(hello.replies.len(), 1);
    assert_eq!(hello.replies[0].content, "hi");
    assert_eq!(hello.total_replies_count, 1);
    assert!(!hello.has_more_replies);

    assert!(thread.delete(&reply).await.expect("delete reply"));

    let hello = thread.comment(&top).expect("top-level comment");
    assert_eq!(hello.replies.len(), 0);
    assert_eq!(hello.total_replies_count, 0);
    assert!(!hello.has_more_replies);
    assert_eq!(thread.snapshot().total_count, 1);
    assert_eq!(thread.source().stored_count(&fixtures::demo_target()), 1);
}

#[tokio::test]
async fn paging_through_seeded_thread_reaches_the_end() {
    let thread = demo_thread(5, 2);

    assert_eq!(thread.refresh().await.expect("page 1"), 2);
    assert_eq!(thread.load_more().await.expect("page 2"), 2);
    assert_eq!(thread.load_more().await.expect("page 3"), 1);

    let state = thread.snapshot();
    assert_eq!(state.comments.len(), 5);
    assert_eq!(state.total_count, 5);
    assert!(!state.has_more);
    let calls = thread.source().calls();

    assert_eq!(thread.load_more().await.expect("nothing left"), 0);
    assert_eq!(thread.source().calls(), calls);
    assert_forest_invariants(&thread.snapshot());
}

#[tokio::test]
async fn expanding_replies_settles_has_more_flag() {
    let thread = demo_thread(6, 20);
    thread.refresh().await.expect("initial load");
    assert_forest_invariants(&thread.snapshot());

    let expandable: Vec<_> = thread.with_state(|state| {
        state
            .comments
            .iter()
            .filter(|comment| comment.has_more_replies)
            .map(|comment| comment.id.clone())
            .collect()
    });
    assert!(!expandable.is_empty(), "seed data should truncate some replies");

    for id in &expandable {
        thread.load_more_replies(id).await.expect("expand");
    }

    let state = thread.snapshot();
    assert!(state.comments.iter().all(|comment| !comment.has_more_replies));
    assert_forest_invariants(&state);
}

#[tokio::test]
async fn reply_counter_tracks_inserts_minus_deletes() {
    let thread = demo_thread(0, 20);
    thread.refresh().await.expect("initial load");
    let top = thread.submit("root", ReplyTarget::Thread).await.expect("top");
    let first = thread
        .submit("first", ReplyTarget::Comment(top.id().clone()))
        .await
        .expect("first reply");
    thread
        .submit("second", ReplyTarget::Comment(top.id().clone()))
        .await
        .expect("second reply");
    thread.reply_to("nested", &first).await.expect("sub-reply");
    assert_eq!(thread.comment(&top).expect("top").total_replies_count, 3);

    assert!(thread.delete(&first).await.expect("delete reply"));

    // Three inserts and one delete, even though the reply carried a sub-reply.
    let root = thread.comment(&top).expect("top survives");
    assert_eq!(root.total_replies_count, 2);
    assert_eq!(root.replies.len(), 1);
    assert_eq!(root.replies[0].content, "second");

    assert!(!thread.delete(&first).await.expect("second delete is a no-op"));
    assert_eq!(thread.comment(&top).expect("top").total_replies_count, 2);
    assert_forest_invariants(&thread.snapshot());
}

#[tokio::test]
async fn backend_failure_is_reported_and_state_kept() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let thread = demo_thread(3, 20).with_events(tx);
    thread.refresh().await.expect("initial load");
    let before = thread.snapshot();
    let first = CommentPath::top(before.comments[0].id.clone());

    thread.source().fail_next("The server is busy. Please try again later.");
    let result = thread.toggle_like(&first).await;

    assert!(matches!(result, Err(ThreadError::Source { .. })));
    assert_eq!(thread.snapshot(), before);
    let events: Vec<ThreadEvent> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
    assert_eq!(events.len(), 2);
    assert!(events[1].is_failure());
    assert!(events[1].notice().contains("server is busy"));
}

#[tokio::test]
async fn signing_out_blocks_further_writes() {
    let session = signed_in();
    let target = fixtures::demo_target();
    let thread = CommentThread::new(
        target.clone(),
        DemoCommentSource::new().seeded(&target, 1),
        Rc::clone(&session),
    );
    thread.refresh().await.expect("initial load");
    assert!(thread.can_comment());

    session.sign_out();

    assert!(!thread.can_comment());
    let result = thread.submit("still here?", ReplyTarget::Thread).await;
    assert!(matches!(result, Err(ThreadError::Unauthenticated)));
    assert_eq!(thread.source().stored_count(&target), 1);
}
