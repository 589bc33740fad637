use azalea::policy::Mode;
use azalea::session::{SessionManager, SessionStore, Turn};
use tempfile::TempDir;

#[tokio::test]
async fn test_snapshot_survives_restart() {
    let temp_dir = TempDir::new().unwrap();

    let manager = SessionManager::open(SessionStore::in_dir(temp_dir.path()))
        .await
        .unwrap();
    manager
        .update("42", |session| {
            session.mode = Mode::Confession;
            session.message_count = 4;
            session.push_turn(Turn::new("привет", "hello"));
        })
        .await
        .unwrap();
    drop(manager);

    let restarted = SessionManager::open(SessionStore::in_dir(temp_dir.path()))
        .await
        .unwrap();
    let session = restarted.get("42").await.unwrap();
    assert_eq!(session.mode, Mode::Confession);
    assert_eq!(session.message_count, 4);
    assert_eq!(session.history.back().unwrap().question(), "привет");
}

#[tokio::test]
async fn test_legacy_snapshot_is_readable() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(
        temp_dir.path().join("users.json"),
        r#"{
            "100": {"count": 2, "mode": ["God"], "is_pro": false, "history": [["a", "b"]]},
            "200": {"count": 1},
            "300": {"count": 0, "mode": "Pirate", "is_pro": true, "history": []}
        }"#,
    )
    .unwrap();

    let sessions = SessionStore::in_dir(temp_dir.path()).load().await.unwrap();
    assert_eq!(sessions.len(), 3);

    assert_eq!(sessions["100"].mode, Mode::Therapist);
    assert_eq!(sessions["100"].history.len(), 1);

    assert_eq!(sessions["200"].message_count, 1);
    assert!(!sessions["200"].is_pro);
    assert!(sessions["200"].history.is_empty());

    assert_eq!(sessions["300"].mode, Mode::Therapist);
    assert!(sessions["300"].is_pro);
}
