//! Exercises `HttpRemote` against an in-process key-value server that mimics
//! the third-party slot service: `POST /{key}` stores an envelope, `GET
//! /{key}` returns it or 404.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Duration, Utc};
use lockstep::{HttpRemote, RemoteSync, SyncDocument, SyncEnvelope, UploadError};

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
struct TestDoc {
    label: String,
    notes: Vec<String>,
}

#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
struct TestDocPatch {
    label: Option<String>,
    notes: Option<Vec<String>>,
}

impl SyncDocument for TestDoc {
    type Patch = TestDocPatch;

    fn prepare_for_sync(&self, _now: DateTime<Utc>) -> TestDocPatch {
        TestDocPatch {
            label: Some(self.label.clone()),
            notes: Some(self.notes.clone()),
        }
    }

    fn apply_patch(&mut self, patch: TestDocPatch) {
        if let Some(label) = patch.label {
            self.label = label;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
    }
}

type Slots = Arc<Mutex<HashMap<String, SyncEnvelope>>>;

async fn put_slot(
    Path(key): Path<String>,
    State(slots): State<Slots>,
    Json(envelope): Json<SyncEnvelope>,
) -> StatusCode {
    if key.starts_with("REJECT") {
        return StatusCode::INSUFFICIENT_STORAGE;
    }
    slots.lock().unwrap().insert(key, envelope);
    StatusCode::OK
}

async fn get_slot(
    Path(key): Path<String>,
    State(slots): State<Slots>,
) -> Result<Json<SyncEnvelope>, StatusCode> {
    slots
        .lock()
        .unwrap()
        .get(&key)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn spawn_slot_server() -> String {
    let slots: Slots = Arc::default();
    let app = Router::new()
        .route("/{key}", post(put_slot).get(get_slot))
        .with_state(slots);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

#[tokio::test]
async fn test_upload_then_download_round_trips() {
    let base_url = spawn_slot_server().await;
    let remote = HttpRemote::new(base_url);
    let now = Utc::now();

    let doc = TestDoc {
        label: "Ateliê São João".to_string(),
        notes: vec!["embalagem reforçada ✓".to_string()],
    };

    let timestamp = RemoteSync::<TestDoc>::upload(&remote, "ABC123XYZ0", &doc, now)
        .await
        .unwrap();
    assert_eq!(timestamp, now.timestamp_millis());

    let fetched = RemoteSync::<TestDoc>::download(&remote, "ABC123XYZ0", now)
        .await
        .unwrap();
    assert_eq!(fetched.timestamp, timestamp);
    assert_eq!(fetched.patch.label.as_deref(), Some("Ateliê São João"));
    assert_eq!(
        fetched.patch.notes,
        Some(vec!["embalagem reforçada ✓".to_string()])
    );
}

#[tokio::test]
async fn test_last_writer_wins_across_uploads() {
    let base_url = spawn_slot_server().await;
    let remote = HttpRemote::new(base_url);
    let t1 = Utc::now();
    let t2 = t1 + Duration::seconds(20);

    let first = TestDoc {
        label: "first".to_string(),
        notes: vec![],
    };
    let second = TestDoc {
        label: "second".to_string(),
        notes: vec![],
    };

    RemoteSync::<TestDoc>::upload(&remote, "ABC123XYZ0", &first, t1)
        .await
        .unwrap();
    RemoteSync::<TestDoc>::upload(&remote, "ABC123XYZ0", &second, t2)
        .await
        .unwrap();

    let fetched = RemoteSync::<TestDoc>::download(&remote, "ABC123XYZ0", t2)
        .await
        .unwrap();
    assert_eq!(fetched.timestamp, t2.timestamp_millis());
    assert_eq!(fetched.patch.label.as_deref(), Some("second"));
}

#[tokio::test]
async fn test_download_of_never_written_key_is_none() {
    let base_url = spawn_slot_server().await;
    let remote = HttpRemote::new(base_url);

    let fetched = RemoteSync::<TestDoc>::download(&remote, "NEVERWRIT0", Utc::now()).await;
    assert!(fetched.is_none());
}

#[tokio::test]
async fn test_server_rejection_surfaces_status() {
    let base_url = spawn_slot_server().await;
    let remote = HttpRemote::new(base_url);

    let doc = TestDoc::default();
    let result = RemoteSync::<TestDoc>::upload(&remote, "REJECT0000", &doc, Utc::now()).await;

    match result {
        Err(UploadError::Server { status }) => assert_eq!(status, 507),
        other => panic!("expected Server error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unreachable_server_is_a_network_error() {
    // nothing listens here
    let remote = HttpRemote::new("http://127.0.0.1:9");

    let doc = TestDoc::default();
    let result = RemoteSync::<TestDoc>::upload(&remote, "ABC123XYZ0", &doc, Utc::now()).await;
    assert!(matches!(result, Err(UploadError::Network { .. })));

    let fetched = RemoteSync::<TestDoc>::download(&remote, "ABC123XYZ0", Utc::now()).await;
    assert!(fetched.is_none());
}

#[tokio::test]
async fn test_oversized_payload_never_reaches_the_server() {
    let base_url = spawn_slot_server().await;
    let remote = HttpRemote::new(base_url);

    let doc = TestDoc {
        label: "x".repeat(90_000),
        notes: vec![],
    };
    let result = RemoteSync::<TestDoc>::upload(&remote, "ABC123XYZ0", &doc, Utc::now()).await;
    assert!(matches!(result, Err(UploadError::PayloadTooLarge { .. })));

    // the slot was never written
    let fetched = RemoteSync::<TestDoc>::download(&remote, "ABC123XYZ0", Utc::now()).await;
    assert!(fetched.is_none());
}

#[tokio::test]
async fn test_malformed_slot_payload_reads_as_no_update() {
    let base_url = spawn_slot_server().await;
    let remote = HttpRemote::new(base_url.clone());

    // another client wrote an envelope whose data is not valid encoding
    let envelope = SyncEnvelope {
        timestamp: Utc::now().timestamp_millis(),
        data: "!!! not base64 !!!".to_string(),
        version: "1".to_string(),
    };
    let client = reqwest::Client::new();
    let response = client
        .post(format!("{base_url}/ABC123XYZ0"))
        .json(&envelope)
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let fetched = RemoteSync::<TestDoc>::download(&remote, "ABC123XYZ0", Utc::now()).await;
    assert!(fetched.is_none());
}
