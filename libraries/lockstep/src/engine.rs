//! The reconciliation engine: decides when to persist locally, when to push
//! to the remote slot, when to pull from it, and how to keep a just-downloaded
//! document from being echoed straight back upstream.
//!
//! The engine never owns a second copy of the document. It holds timestamps
//! and deadlines only; the document itself lives in the application state
//! store and is passed in by reference. The host event loop drives the engine
//! by calling [`Engine::tick`]; there are no ambient timers, so every timing
//! rule is testable with a [`ManualClock`](crate::ManualClock).

use std::marker::PhantomData;
use std::rc::Rc;

use chrono::{DateTime, Duration, Utc};

use crate::clock::Clock;
use crate::debounce::{Cooldown, Debounce};
use crate::store::StateStore;
use crate::transport::{RemoteSync, UploadError};
use crate::SyncDocument;

#[derive(Clone, Copy, Debug)]
pub struct EngineConfig {
    /// Quiet period that coalesces rapid edits into one local save.
    pub debounce_window: Duration,
    /// How long uploads stay suppressed after a document is adopted from an
    /// external source. Must exceed the debounce window, so a save scheduled
    /// by the import's own mutations always lands inside the guard.
    pub guard_cooldown: Duration,
    /// How often to check the remote slot for a newer document.
    pub poll_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_window: Duration::seconds(2),
            guard_cooldown: Duration::seconds(3),
            poll_interval: Duration::seconds(30),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnginePhase {
    Uninitialized,
    Loading,
    Idle,
    Saving,
    Importing,
}

pub struct Engine<D, S, R> {
    store: S,
    remote: R,
    clock: Rc<dyn Clock>,
    config: EngineConfig,
    phase: EnginePhase,
    debounce: Debounce,
    guard: Cooldown,
    sync_key: Option<String>,
    /// Watermark: the newest remote timestamp this device has applied or
    /// produced. A downloaded envelope is adopted only if strictly newer.
    last_cloud_sync: i64,
    last_saved_at: Option<DateTime<Utc>>,
    last_upload_error: Option<UploadError>,
    next_poll_at: DateTime<Utc>,
    marker: PhantomData<D>,
}

impl<D, S, R> Engine<D, S, R>
where
    D: SyncDocument,
    S: StateStore<D>,
    R: RemoteSync<D>,
{
    pub fn new(store: S, remote: R, clock: Rc<dyn Clock>, config: EngineConfig) -> Self {
        let next_poll_at = clock.now() + config.poll_interval;
        Self {
            store,
            remote,
            clock,
            config,
            phase: EnginePhase::Uninitialized,
            debounce: Debounce::new(config.debounce_window),
            guard: Cooldown::new(config.guard_cooldown),
            sync_key: None,
            last_cloud_sync: 0,
            last_saved_at: None,
            last_upload_error: None,
            next_poll_at,
            marker: PhantomData,
        }
    }

    /// One-time cold start: try the local slot once. A stored document goes
    /// through the same import path as a cloud download or a manual restore;
    /// an empty or unreadable slot leaves the seed document in place.
    pub fn start(&mut self, document: &mut D) {
        self.phase = EnginePhase::Loading;
        match self.store.load() {
            Ok(Some(patch)) => {
                log::info!("adopting locally stored document");
                self.import(document, patch);
                // the loaded snapshot is already durable, no save needed
                self.debounce.cancel();
            }
            Ok(None) => {
                self.phase = EnginePhase::Idle;
            }
            Err(e) => {
                log::error!("local load failed, starting from seed data: {e}");
                self.phase = EnginePhase::Idle;
            }
        }
    }

    /// Note a user edit. Arms (or re-arms) the debounced save.
    pub fn mark_dirty(&mut self) {
        let now = self.clock.now();
        self.debounce.poke(now);
    }

    /// Adopt a full or partial document from an external source: the initial
    /// local load, a manual restore, or an applied remote download. Engages
    /// the import guard first, so the state changes this causes are not
    /// treated as user edits that should trigger an upload.
    pub fn import(&mut self, document: &mut D, patch: D::Patch) {
        let now = self.clock.now();
        self.phase = EnginePhase::Importing;
        self.guard.engage(now);
        document.apply_patch(patch);
        // the adopted snapshot still has to reach the local slot; the guard
        // keeps the resulting save from uploading
        self.debounce.poke(now);
    }

    /// Advance the state machine: clear an expired guard, fire a due save,
    /// and run a due poll. Call this from the host event loop, frequently
    /// relative to the debounce window.
    pub async fn tick(&mut self, document: &mut D) {
        let now = self.clock.now();

        if self.phase == EnginePhase::Importing && !self.guard.is_active(now) {
            self.phase = EnginePhase::Idle;
        }

        if self.debounce.fire_if_due(now) {
            self.run_save(document, now).await;
        }

        if now >= self.next_poll_at {
            self.next_poll_at = now + self.config.poll_interval;
            self.poll(document, now).await;
        }
    }

    async fn run_save(&mut self, document: &D, now: DateTime<Utc>) {
        let guarded = self.guard.is_active(now);
        let resume = if guarded {
            EnginePhase::Importing
        } else {
            EnginePhase::Idle
        };
        self.phase = EnginePhase::Saving;

        match self.store.save(document) {
            Ok(()) => {
                self.last_saved_at = Some(now);
            }
            Err(e) => {
                // non-fatal: the in-memory document stays authoritative and
                // the next edit re-arms the debounce
                log::error!("local save failed: {e}");
            }
        }

        if let Some(key) = self.sync_key.clone() {
            if guarded {
                log::debug!("skipping upload: import guard active");
            } else {
                match self.remote.upload(&key, document, now).await {
                    Ok(timestamp) => {
                        log::info!("uploaded document to slot {key} at {timestamp}");
                        self.last_cloud_sync = timestamp;
                        self.last_upload_error = None;
                    }
                    Err(e) => {
                        // transient by policy; the next debounced save retries
                        log::warn!("upload failed: {e}");
                        self.last_upload_error = Some(e);
                    }
                }
            }
        }

        self.phase = resume;
    }

    async fn poll(&mut self, document: &mut D, now: DateTime<Utc>) {
        let Some(key) = self.sync_key.clone() else {
            return;
        };

        if self.guard.is_active(now) {
            log::debug!("skipping poll: import guard active");
            return;
        }

        let Some(remote_doc) = self.remote.download(&key, now).await else {
            return;
        };

        // the guard can engage while the download is in flight
        if self.guard.is_active(self.clock.now()) {
            log::warn!("discarding downloaded document: import in progress");
            return;
        }

        if remote_doc.timestamp > self.last_cloud_sync {
            log::info!(
                "adopting remote document at {} (watermark was {})",
                remote_doc.timestamp,
                self.last_cloud_sync
            );
            self.import(document, remote_doc.patch);
            self.last_cloud_sync = remote_doc.timestamp;
        }
    }

    /// Start mirroring to `key`. Resets the watermark and schedules an
    /// immediate poll so an existing slot is pulled right away.
    pub fn set_sync_key(&mut self, key: impl Into<String>) {
        self.sync_key = Some(key.into());
        self.last_cloud_sync = 0;
        self.next_poll_at = self.clock.now();
    }

    pub fn disconnect_sync(&mut self) {
        self.sync_key = None;
        self.last_cloud_sync = 0;
        self.last_upload_error = None;
    }

    pub fn sync_key(&self) -> Option<&str> {
        self.sync_key.as_deref()
    }

    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    pub fn last_cloud_sync(&self) -> i64 {
        self.last_cloud_sync
    }

    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        self.last_saved_at
    }

    /// Whether an edit is still waiting out the debounce window.
    pub fn has_pending_save(&self) -> bool {
        self.debounce.is_pending()
    }

    pub fn last_upload_error(&self) -> Option<&UploadError> {
        self.last_upload_error.as_ref()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }
}
