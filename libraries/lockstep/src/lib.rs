//! This is a library for keeping one mutable document alive across devices.
//! It was created for Pressdesk, so it doesn't include much that was not needed for that project.
//!
//! Syncing strategy:
//! 1. The whole application state is a single document. Every device keeps its own copy in a durable local slot.
//! 2. Edits mark the document dirty; a debounce window coalesces rapid edits into one local save.
//! 3. After each local save, if a sync key is configured, the document is shrunk, encoded, and uploaded to a shared key-value slot together with the producer's wall-clock timestamp.
//! 4. On a fixed interval each device downloads the slot. If the remote timestamp is strictly newer than the last one this device applied or produced, the remote document replaces the local one wholesale (last-writer-wins).
//! 5. While a downloaded or imported document is being adopted, an import guard suppresses uploads so the device doesn't immediately echo back what it just received.
//!
//! Sounds simple, but the feedback-loop suppression and the timing rules are
//! where the bugs live, so every deadline in this library is computed against
//! an injectable [`Clock`] and the engine is driven by an explicit
//! [`Engine::tick`] rather than ambient timers.
//!
//! Known limitations, on purpose: there is no field-level merge (two devices
//! editing inside the same polling window silently lose the older writer's
//! changes), and generated sync keys are never checked for uniqueness against
//! the server.

pub mod clock;
pub mod debounce;
pub mod engine;
pub mod store;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;

pub use clock::{Clock, ManualClock, SystemClock};
pub use debounce::{Cooldown, Debounce};
pub use engine::{Engine, EngineConfig, EnginePhase};
pub use store::{MemoryStore, SqliteStore, StateStore, StorageError};
pub use transport::{
    HttpRemote, MemoryRemote, RemoteDocument, RemoteSync, SyncEnvelope, UploadError, decode,
    encode, generate_key,
};

use chrono::{DateTime, Utc};

/// The document type an application syncs through this library.
///
/// The full document is what gets saved locally; the [`Patch`] is the shape
/// that travels (and loads from older local records): every field is optional,
/// and applying a patch replaces exactly the fields the payload defines,
/// leaving the rest untouched.
///
/// [`Patch`]: SyncDocument::Patch
pub trait SyncDocument: Clone + serde::Serialize {
    type Patch: Clone + serde::Serialize + serde::de::DeserializeOwned;

    /// Shrink the document for the size-constrained sync backend.
    /// Anything purely local (UI state, large blobs) should come back as
    /// absent; anything financially relevant must survive.
    fn prepare_for_sync(&self, now: DateTime<Utc>) -> Self::Patch;

    /// Adopt an incoming partial document, replacing only the fields it defines.
    fn apply_patch(&mut self, patch: Self::Patch);
}
