//! The remote sync transport: envelope shape, payload encoding, key
//! generation, and the HTTP client against the shared key-value slot.
//!
//! Uploads are gated on a size ceiling *before* any network call, and they
//! distinguish payload-too-large, server rejection, and no-response failures.
//! Downloads never error: any failure (network, non-2xx, malformed payload)
//! is indistinguishable from "this key has never been written" and comes back
//! as `None`.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use base64::Engine as _;
use chrono::{DateTime, Utc};

use crate::SyncDocument;

/// Hard ceiling on the encoded payload, chosen under the backend's limit.
pub const MAX_PAYLOAD_CHARS: usize = 80_000;

/// Wire protocol version carried in every envelope.
pub const SYNC_VERSION: &str = "1";

pub const SYNC_KEY_LEN: usize = 10;

const SYNC_KEY_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// What actually sits in the remote slot. `timestamp` is the producer's
/// wall-clock time at upload and is the sole ordering signal.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct SyncEnvelope {
    pub timestamp: i64,
    pub data: String,
    #[serde(default)]
    pub version: String,
}

/// A downloaded envelope, already decoded.
#[derive(Clone, Debug)]
pub struct RemoteDocument<P> {
    pub patch: P,
    pub timestamp: i64,
}

#[derive(Clone, Debug, thiserror::Error)]
pub enum UploadError {
    #[error("sync payload is too large ({chars} chars, limit {limit})")]
    PayloadTooLarge { chars: usize, limit: usize },
    #[error("sync server rejected the upload (status {status})")]
    Server { status: u16 },
    #[error("could not reach the sync server: {reason}")]
    Network { reason: String },
    #[error("document could not be serialized: {reason}")]
    Encode { reason: String },
}

/// Produce a short, human-transcribable sync key (uppercase alphanumeric).
///
/// There is no uniqueness check against the server; the collision risk is
/// accepted. Anyone holding the key can read and overwrite the slot.
pub fn generate_key() -> String {
    let mut entropy = uuid::Uuid::new_v4().as_u128();
    let mut key = String::with_capacity(SYNC_KEY_LEN);
    for _ in 0..SYNC_KEY_LEN {
        let index = (entropy % SYNC_KEY_ALPHABET.len() as u128) as usize;
        key.push(SYNC_KEY_ALPHABET[index] as char);
        entropy /= SYNC_KEY_ALPHABET.len() as u128;
    }
    key
}

/// Serialize a patch to transport-safe text. JSON first, then base64 over the
/// UTF-8 bytes, so accented text in addresses and descriptions round-trips
/// exactly.
pub fn encode<P: serde::Serialize>(patch: &P) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(patch)?;
    Ok(base64::engine::general_purpose::STANDARD.encode(json.as_bytes()))
}

/// Inverse of [`encode`]. Returns `None` on any malformed input.
pub fn decode<P: serde::de::DeserializeOwned>(data: &str) -> Option<P> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(data.trim())
        .ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Shrink, encode, and size-gate a document into an envelope. This runs
/// before any network call, so an oversized payload is rejected locally with
/// a reason the UI can show.
pub(crate) fn build_envelope<D: SyncDocument>(
    document: &D,
    now: DateTime<Utc>,
) -> Result<SyncEnvelope, UploadError> {
    let patch = document.prepare_for_sync(now);
    let data = encode(&patch).map_err(|e| UploadError::Encode {
        reason: e.to_string(),
    })?;

    if data.len() > MAX_PAYLOAD_CHARS {
        return Err(UploadError::PayloadTooLarge {
            chars: data.len(),
            limit: MAX_PAYLOAD_CHARS,
        });
    }

    Ok(SyncEnvelope {
        timestamp: now.timestamp_millis(),
        data,
        version: SYNC_VERSION.to_string(),
    })
}

#[allow(async_fn_in_trait)]
pub trait RemoteSync<D: SyncDocument> {
    /// Upload the document into the slot named by `key`. Returns the envelope
    /// timestamp the server accepted.
    async fn upload(&self, key: &str, document: &D, now: DateTime<Utc>)
    -> Result<i64, UploadError>;

    /// Fetch the slot, bypassing caches. `None` means "no update available",
    /// never an error to surface.
    async fn download(&self, key: &str, now: DateTime<Utc>) -> Option<RemoteDocument<D::Patch>>;
}

/// The production transport: a third-party key-value HTTP service where the
/// key itself is the capability token.
///
/// `POST /{key}` writes the envelope; `GET /{key}?t={cachebust}` reads it.
#[derive(Clone, Debug)]
pub struct HttpRemote {
    base_url: String,
    client: reqwest::Client,
}

impl HttpRemote {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }
}

impl<D: SyncDocument> RemoteSync<D> for HttpRemote {
    async fn upload(
        &self,
        key: &str,
        document: &D,
        now: DateTime<Utc>,
    ) -> Result<i64, UploadError> {
        let envelope = build_envelope(document, now)?;

        let url = format!("{}/{key}", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&envelope)
            .send()
            .await
            .map_err(|e| UploadError::Network {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::Server {
                status: status.as_u16(),
            });
        }

        Ok(envelope.timestamp)
    }

    async fn download(&self, key: &str, now: DateTime<Utc>) -> Option<RemoteDocument<D::Patch>> {
        let url = format!("{}/{key}?t={}", self.base_url, now.timestamp_millis());
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .send()
            .await
            .inspect_err(|e| log::debug!("sync download failed: {e:?}"))
            .ok()?;

        if !response.status().is_success() {
            return None;
        }

        let body = response.text().await.ok()?;
        let envelope: SyncEnvelope = serde_json::from_str(&body).ok()?;
        let patch = decode(&envelope.data)?;
        Some(RemoteDocument {
            patch,
            timestamp: envelope.timestamp,
        })
    }
}

/// An in-memory slot, used by engine tests and demos. Goes through the same
/// envelope building and size gate as [`HttpRemote`]; an `offline` switch
/// simulates no-response network failures.
#[derive(Clone, Debug, Default)]
pub struct MemoryRemote {
    slots: Rc<RefCell<HashMap<String, SyncEnvelope>>>,
    offline: Rc<Cell<bool>>,
    uploads: Rc<Cell<usize>>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.set(offline);
    }

    /// How many uploads actually reached the slot.
    pub fn upload_count(&self) -> usize {
        self.uploads.get()
    }

    pub fn envelope(&self, key: &str) -> Option<SyncEnvelope> {
        self.slots.borrow().get(key).cloned()
    }

    /// Seed the slot, as if another device had uploaded.
    pub fn put_envelope(&self, key: &str, envelope: SyncEnvelope) {
        self.slots.borrow_mut().insert(key.to_string(), envelope);
    }
}

impl<D: SyncDocument> RemoteSync<D> for MemoryRemote {
    async fn upload(
        &self,
        key: &str,
        document: &D,
        now: DateTime<Utc>,
    ) -> Result<i64, UploadError> {
        if self.offline.get() {
            return Err(UploadError::Network {
                reason: "offline".to_string(),
            });
        }

        let envelope = build_envelope(document, now)?;
        let timestamp = envelope.timestamp;
        self.slots.borrow_mut().insert(key.to_string(), envelope);
        self.uploads.set(self.uploads.get() + 1);
        Ok(timestamp)
    }

    async fn download(&self, key: &str, _now: DateTime<Utc>) -> Option<RemoteDocument<D::Patch>> {
        if self.offline.get() {
            return None;
        }

        let envelope = self.slots.borrow().get(key).cloned()?;
        let patch = decode(&envelope.data)?;
        Some(RemoteDocument {
            patch,
            timestamp: envelope.timestamp,
        })
    }
}
