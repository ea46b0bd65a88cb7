use super::*;

use crate::state::test_helpers;

fn channel() -> (mpsc::Sender<ServerMessage>, mpsc::Receiver<ServerMessage>) {
    mpsc::channel(8)
}

#[tokio::test]
async fn invalid_json_yields_a_bad_message_error() {
    let state = test_helpers::test_app_state();
    let (tx, _rx) = channel();
    let mut current_note = None;

    let reply = process_text(
        &state,
        &mut current_note,
        Uuid::new_v4(),
        Uuid::new_v4(),
        &tx,
        "{not json",
    )
    .await;

    match reply {
        Some(ServerMessage::Error { code, retryable, .. }) => {
            assert_eq!(code, "E_BAD_MESSAGE");
            assert!(!retryable);
        }
        other => panic!("expected error reply, got {other:?}"),
    }
    assert!(current_note.is_none());
}

#[tokio::test]
async fn unknown_message_type_yields_a_bad_message_error() {
    let state = test_helpers::test_app_state();
    let (tx, _rx) = channel();
    let mut current_note = None;

    let reply = process_text(
        &state,
        &mut current_note,
        Uuid::new_v4(),
        Uuid::new_v4(),
        &tx,
        r#"{"type":"uploadFile","payload":"zzz"}"#,
    )
    .await;

    assert!(matches!(reply, Some(ServerMessage::Error { .. })));
}

#[tokio::test]
async fn save_before_join_is_an_invalid_reference() {
    let state = test_helpers::test_app_state();
    let (tx, _rx) = channel();
    let mut current_note = None;

    let save = serde_json::to_string(&ClientMessage::SaveChangeSet {
        note_id: Uuid::new_v4(),
        change_set: ChangeSet::new(),
        thumbnail: None,
    })
    .unwrap();
    let reply = process_text(
        &state,
        &mut current_note,
        Uuid::new_v4(),
        Uuid::new_v4(),
        &tx,
        &save,
    )
    .await;

    match reply {
        Some(ServerMessage::Error { code, retryable, .. }) => {
            assert_eq!(code, "E_INVALID_REFERENCE");
            assert!(!retryable);
        }
        other => panic!("expected error reply, got {other:?}"),
    }
}

#[tokio::test]
async fn save_for_a_note_other_than_the_joined_one_is_rejected() {
    let state = test_helpers::test_app_state();
    let (tx, _rx) = channel();
    let mut current_note = Some(Uuid::new_v4());

    let save = serde_json::to_string(&ClientMessage::SaveChangeSet {
        note_id: Uuid::new_v4(),
        change_set: ChangeSet::new(),
        thumbnail: None,
    })
    .unwrap();
    let reply = process_text(
        &state,
        &mut current_note,
        Uuid::new_v4(),
        Uuid::new_v4(),
        &tx,
        &save,
    )
    .await;

    match reply {
        Some(ServerMessage::Error { code, .. }) => assert_eq!(code, "E_INVALID_REFERENCE"),
        other => panic!("expected error reply, got {other:?}"),
    }
}

#[cfg(feature = "live-db-tests")]
mod live {
    use super::*;
    use crate::services::session;
    use tokio::time::{Duration, timeout};
    use wire::{Sample, Stroke};

    async fn live_state() -> AppState {
        let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL required");
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect(&url)
            .await
            .expect("connect");
        AppState::new(pool)
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL/live Postgres"]
    async fn join_save_ack_and_broadcast_flow() {
        let state = live_state().await;
        let user_id = session::create_user(&state.pool, "ws-test").await.unwrap();
        let meta = note::create_note(&state.pool, user_id, "shared").await.unwrap();
        let note_id = meta.id;

        let sender = Uuid::new_v4();
        let peer = Uuid::new_v4();
        let (sender_tx, mut sender_rx) = channel();
        let (peer_tx, mut peer_rx) = channel();

        let join = serde_json::to_string(&ClientMessage::JoinNote { note_id }).unwrap();
        let mut sender_note = None;
        assert!(
            process_text(&state, &mut sender_note, sender, user_id, &sender_tx, &join)
                .await
                .is_none()
        );
        let mut peer_note = None;
        assert!(
            process_text(&state, &mut peer_note, peer, user_id, &peer_tx, &join)
                .await
                .is_none()
        );

        let mut change_set = ChangeSet::new();
        change_set.stage_stroke(Stroke::new(
            "#d94b4b",
            vec![Sample::new(1.0, 2.0, 0.5)],
            4.0,
        ));
        let save = serde_json::to_string(&ClientMessage::SaveChangeSet {
            note_id,
            change_set: change_set.clone(),
            thumbnail: Some("data:image/png;base64,AAAA".into()),
        })
        .unwrap();

        let reply =
            process_text(&state, &mut sender_note, sender, user_id, &sender_tx, &save).await;
        assert!(matches!(reply, Some(ServerMessage::ChangeSetApplied {})));

        // The peer receives the unmodified change-set; the sender does not.
        let relayed = timeout(Duration::from_millis(200), peer_rx.recv())
            .await
            .expect("broadcast timed out")
            .expect("channel closed");
        assert_eq!(relayed, ServerMessage::ChangeSetBroadcast { change_set });
        assert!(timeout(Duration::from_millis(80), sender_rx.recv()).await.is_err());

        let snapshot = note::load_snapshot(&state.pool, note_id).await.unwrap();
        assert_eq!(snapshot.strokes.len(), 1);
        assert_eq!(snapshot.thumbnail.as_deref(), Some("data:image/png;base64,AAAA"));
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL/live Postgres"]
    async fn joining_someone_elses_note_is_not_owned() {
        let state = live_state().await;
        let owner = session::create_user(&state.pool, "owner").await.unwrap();
        let intruder = session::create_user(&state.pool, "intruder").await.unwrap();
        let meta = note::create_note(&state.pool, owner, "private").await.unwrap();

        let (tx, _rx) = channel();
        let mut current_note = None;
        let join = serde_json::to_string(&ClientMessage::JoinNote { note_id: meta.id }).unwrap();
        let reply =
            process_text(&state, &mut current_note, Uuid::new_v4(), intruder, &tx, &join).await;

        match reply {
            Some(ServerMessage::Error { code, .. }) => assert_eq!(code, "E_NOT_OWNED"),
            other => panic!("expected error reply, got {other:?}"),
        }
        assert!(current_note.is_none());
    }
}
