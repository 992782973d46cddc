use focusmode_core::repo::LocalRepository;
use focusmode_core::{
    Book, BookDraft, BookStatus, EntityRepository, LocalStore, Session, SessionContext,
    SessionDraft, SessionRepository, SessionStatus, SourceError, StoreError,
};
use serde_json::json;

fn object(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
    value.as_object().cloned().unwrap()
}

#[test]
fn documents_survive_reopening_the_store_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("focusmode.sqlite3");

    let stored = {
        let store = LocalStore::open(&path).unwrap();
        store
            .set("notes", object(json!({ "title": "Recap", "content": "Limits" })))
            .unwrap()
    };

    let store = LocalStore::open(&path).unwrap();
    let id = stored["id"].as_str().unwrap();
    let loaded = store.get("notes", id).unwrap().expect("note should persist");
    assert_eq!(loaded["title"], "Recap");
    assert_eq!(loaded["created_at"], stored["created_at"]);
}

#[test]
fn collections_are_isolated() {
    let store = LocalStore::open_in_memory().unwrap();
    store.set("notes", object(json!({ "title": "A" }))).unwrap();
    store.set("books", object(json!({ "title": "B" }))).unwrap();

    assert_eq!(store.get_all("notes").unwrap().len(), 1);
    assert_eq!(store.get_all("books").unwrap().len(), 1);
    assert!(store.get_all("timers").unwrap().is_empty());
}

#[test]
fn repository_update_merges_draft_and_keeps_identity() {
    let store = LocalStore::open_in_memory().unwrap();
    let repo = LocalRepository::<Book>::new(&store);

    let id = repo.create(&BookDraft::new("Dune")).unwrap();
    let created = repo.get(&id).unwrap().unwrap();

    let draft = BookDraft {
        author: Some("Frank Herbert".to_string()),
        status: BookStatus::Reading,
        ..BookDraft::new("Dune")
    };
    repo.update(&id, &draft).unwrap();

    let updated = repo.get(&id).unwrap().unwrap();
    assert_eq!(updated.id, id);
    assert_eq!(updated.created_at, created.created_at);
    assert_eq!(updated.author.as_deref(), Some("Frank Herbert"));
    assert_eq!(updated.status, BookStatus::Reading);
}

#[test]
fn repository_rechecks_lifecycle_against_stored_state() {
    let store = LocalStore::open_in_memory().unwrap();
    let repo = LocalRepository::<Session>::new(&store);
    let id = repo
        .create(&SessionDraft::planned("Math", "Algebra", 25))
        .unwrap();

    let err = repo.complete(&id, 20).unwrap_err();
    assert!(matches!(err, SourceError::Transition(_)));

    repo.start(&id).unwrap();
    repo.complete(&id, 20).unwrap();
    let session = repo.get(&id).unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.actual_duration, Some(20));

    let mut reverted = SessionDraft::from_session(&session);
    reverted.status = Some(SessionStatus::InProgress);
    assert!(matches!(
        repo.update(&id, &reverted),
        Err(SourceError::Transition(_))
    ));
}

#[test]
fn repository_reports_missing_ids() {
    let store = LocalStore::open_in_memory().unwrap();
    let repo = LocalRepository::<Session>::new(&store);
    let missing = focusmode_core::EntityId::new_local();

    assert!(matches!(
        repo.delete(&missing),
        Err(SourceError::Local(StoreError::NotFound { .. }))
    ));
    assert!(matches!(
        repo.start(&missing),
        Err(SourceError::Local(StoreError::NotFound { .. }))
    ));
}

#[test]
fn anonymous_context_restores_from_fresh_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::open(dir.path().join("focusmode.sqlite3")).unwrap();

    let context = SessionContext::restore(&store).unwrap();
    assert!(!context.is_logged_in());
    assert!(context.token().is_none());
}
