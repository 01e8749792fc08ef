//! QA tests for the generation flow using scripted responses.
//!
//! These run without network access: `MockService` stands in for the
//! completion API and `MemorySnapshot` for the snapshot file.

use std::sync::Arc;
use std::time::Duration;

use chat::Role;
use story_core::context::PREAMBLE_LEN;
use story_core::{
    LoadState, MemorySnapshot, MockResponse, MockService, Prompt, SessionError, StoreError,
    StorySession, StoryStore,
};

fn open(service: &MockService) -> (StorySession, MemorySnapshot) {
    let backend = MemorySnapshot::new();
    let (store, state) = StoryStore::load(backend.clone()).expect("load should succeed");
    assert_eq!(state, LoadState::Empty);
    (StorySession::new(store, Arc::new(service.clone())), backend)
}

// =============================================================================
// CONTEXT REPLAY
// =============================================================================

#[tokio::test]
async fn test_generate_then_elaborate_replays_history() {
    let service = MockService::new(vec![
        MockResponse::text("A rusted iron door."),
        MockResponse::text("The door bears the crest of House Varn."),
    ]);
    let (session, _) = open(&service);
    let story = session
        .create_story("Ruins", "Gothic", "D&D5e")
        .await
        .expect("create should succeed");

    session
        .generate(story.id, Prompt::generate("ancient door"))
        .await
        .expect("first generation should succeed");
    session
        .generate(story.id, Prompt::elaborate("ancient door"))
        .await
        .expect("elaboration should succeed");

    let calls = service.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].len(), 5);
    assert_eq!(calls[0][4].content, "Generate a \"ancient door\".");

    let second = &calls[1];
    assert_eq!(second.len(), PREAMBLE_LEN + 2 + 1);
    assert_eq!(second[4].role, Role::User);
    assert_eq!(second[4].content, "Generate a \"ancient door\".");
    assert_eq!(second[5].role, Role::System);
    assert_eq!(second[5].content, "A rusted iron door.");
    assert_eq!(second[6].role, Role::User);
    assert_eq!(second[6].content, "Elaborate briefly on \"ancient door\".");

    let log = session.story(story.id).await.unwrap().log;
    assert_eq!(log.len(), 2);
    assert!(log[1].prompt.is_elaboration());
}

#[tokio::test]
async fn test_deleted_entry_is_not_replayed() {
    let service = MockService::new(vec![
        MockResponse::text("A crypt."),
        MockResponse::text("A lich."),
        MockResponse::text("A phylactery."),
    ]);
    let (session, _) = open(&service);
    let story = session.create_story("Ruins", "Gothic", "D&D5e").await.unwrap();

    let crypt = session.generate(story.id, Prompt::generate("crypt")).await.unwrap();
    session
        .generate(story.id, Prompt::generate_with_keywords("lich", "sorrowful"))
        .await
        .unwrap();
    session.remove_entry(story.id, crypt.id).await.unwrap();
    session.generate(story.id, Prompt::generate("treasure")).await.unwrap();

    let last = service.calls().pop().unwrap();
    assert_eq!(last.len(), PREAMBLE_LEN + 2 + 1);
    assert_eq!(
        last[PREAMBLE_LEN].content,
        "Generate a \"lich\" using the following keywords: sorrowful."
    );
    assert_eq!(last[PREAMBLE_LEN + 1].content, "A lich.");
}

// =============================================================================
// CONCURRENCY
// =============================================================================

#[tokio::test]
async fn test_concurrent_requests_on_one_story_are_serialized() {
    let service = MockService::new(vec![MockResponse::text("first"), MockResponse::text("second")])
        .with_delay(Duration::from_millis(50));
    let (session, backend) = open(&service);
    let story = session.create_story("Ruins", "Gothic", "D&D5e").await.unwrap();

    let (a, b) = tokio::join!(
        session.generate(story.id, Prompt::generate("gate")),
        session.generate(story.id, Prompt::generate("bridge")),
    );
    let a = a.expect("first request should succeed");
    let b = b.expect("second request should succeed");

    let calls = service.calls();
    assert_eq!(calls[0].len(), PREAMBLE_LEN + 1);
    // The second context was built after the first entry landed.
    assert_eq!(calls[1].len(), PREAMBLE_LEN + 2 + 1);
    assert_eq!(calls[1][PREAMBLE_LEN + 1].content, "first");

    let log = backend.stored().unwrap().stories[0].log.clone();
    assert_eq!(log, vec![a, b]);
}

#[tokio::test]
async fn test_story_deleted_while_in_flight() {
    let service =
        MockService::new(vec![MockResponse::text("too late")]).with_delay(Duration::from_millis(50));
    let (session, _) = open(&service);
    let keep = session.create_story("Harbor", "Pirates", "Pathfinder").await.unwrap();
    let doomed = session.create_story("Ruins", "Gothic", "D&D5e").await.unwrap();

    let (generated, deleted) = tokio::join!(
        session.generate(doomed.id, Prompt::generate("door")),
        async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            session.delete_story(doomed.id).await
        },
    );

    deleted.expect("delete should succeed");
    let err = generated.unwrap_err();
    assert!(matches!(err, SessionError::Store(StoreError::StoryNotFound(_))));

    let stories = session.stories().await;
    assert_eq!(stories.len(), 1);
    assert_eq!(stories[0].id, keep.id);
    assert!(stories[0].log.is_empty());
    assert_eq!(session.active_story().await.map(|s| s.id), Some(keep.id));
}

// =============================================================================
// FAILURE HANDLING
// =============================================================================

#[tokio::test]
async fn test_failed_persist_discards_generated_entry() {
    let service = MockService::new(vec![MockResponse::text("A door.")]);
    let (session, backend) = open(&service);
    let story = session.create_story("Ruins", "Gothic", "D&D5e").await.unwrap();

    backend.fail_writes(true);
    let err = session
        .generate(story.id, Prompt::generate("door"))
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::Store(StoreError::Persist(_))));
    assert!(session.story(story.id).await.unwrap().log.is_empty());
    assert!(backend.stored().unwrap().stories[0].log.is_empty());
}

#[tokio::test]
async fn test_service_failure_then_recovery() {
    let service = MockService::new(vec![MockResponse::error(chat::Error::Api {
        status: 429,
        message: "rate limited".to_string(),
    })]);
    let (session, _) = open(&service);
    let story = session.create_story("Ruins", "Gothic", "D&D5e").await.unwrap();

    assert!(session
        .generate(story.id, Prompt::generate("shrine"))
        .await
        .is_err());

    service.queue_response(MockResponse::text("A quiet shrine."));
    let entry = session
        .generate(story.id, Prompt::generate("shrine"))
        .await
        .expect("retry by caller should succeed");

    assert_eq!(entry.response, "A quiet shrine.");
    assert_eq!(session.story(story.id).await.unwrap().log, vec![entry]);
    // Nothing from the failed attempt leaks into the next context.
    assert_eq!(service.calls()[1].len(), PREAMBLE_LEN + 1);
}
