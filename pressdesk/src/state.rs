//! The application state store: owns the one [`Document`] and the sync
//! engine, and funnels every mutation through setters that mark the engine
//! dirty. The engine never holds a second copy of the document; UI code reads
//! whatever snapshot [`Dashboard::document`] returns.

use std::rc::Rc;

use chrono::{DateTime, Utc};
use im::Vector;
use lockstep::{
    Clock, Engine, EngineConfig, EnginePhase, HttpRemote, RemoteSync, SqliteStore, StateStore,
    StorageError, SystemClock, UploadError,
};

use crate::backup::{self, BackupError};
use crate::document::{DateRange, Document};
use crate::entities::{
    BankAccount, Carrier, CompanySettings, Customer, Expense, Order, Product, Record, Supply,
};

fn upsert<T: Record + Clone>(slice: &mut Vector<T>, record: T) {
    if let Some(index) = slice
        .iter()
        .position(|existing| existing.id() == record.id())
    {
        slice.set(index, record);
    } else {
        slice.push_back(record);
    }
}

fn remove<T: Record + Clone>(slice: &mut Vector<T>, id: &str) -> bool {
    let before = slice.len();
    slice.retain(|record| record.id() != id);
    slice.len() != before
}

pub struct Dashboard<S, R> {
    document: Document,
    engine: Engine<Document, S, R>,
}

impl Dashboard<SqliteStore, HttpRemote> {
    /// Production wiring: SQLite on disk, the shared slot service over HTTP,
    /// the real clock.
    pub fn open(
        db_path: impl AsRef<std::path::Path>,
        sync_base_url: &str,
    ) -> Result<Self, StorageError> {
        Ok(Self::new(
            SqliteStore::open(db_path)?,
            HttpRemote::new(sync_base_url),
            Rc::new(SystemClock),
        ))
    }
}

impl<S, R> Dashboard<S, R>
where
    S: StateStore<Document>,
    R: RemoteSync<Document>,
{
    pub fn new(store: S, remote: R, clock: Rc<dyn Clock>) -> Self {
        Self {
            document: Document::seed(),
            engine: Engine::new(store, remote, clock, EngineConfig::default()),
        }
    }

    /// Cold start: load whatever the local slot holds, or keep the seed.
    pub fn start(&mut self) {
        self.engine.start(&mut self.document);
    }

    /// Drive the persistence/sync state machine. Call from the host event
    /// loop.
    pub async fn tick(&mut self) {
        self.engine.tick(&mut self.document).await;
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn engine(&self) -> &Engine<Document, S, R> {
        &self.engine
    }

    // --- entity slices ---------------------------------------------------

    pub fn upsert_order(&mut self, order: Order) {
        upsert(&mut self.document.orders, order);
        self.engine.mark_dirty();
    }

    pub fn remove_order(&mut self, id: &str) -> bool {
        let removed = remove(&mut self.document.orders, id);
        if removed {
            self.engine.mark_dirty();
        }
        removed
    }

    pub fn upsert_product(&mut self, product: Product) {
        upsert(&mut self.document.products, product);
        self.engine.mark_dirty();
    }

    pub fn remove_product(&mut self, id: &str) -> bool {
        let removed = remove(&mut self.document.products, id);
        if removed {
            self.engine.mark_dirty();
        }
        removed
    }

    pub fn upsert_customer(&mut self, customer: Customer) {
        upsert(&mut self.document.customers, customer);
        self.engine.mark_dirty();
    }

    pub fn remove_customer(&mut self, id: &str) -> bool {
        let removed = remove(&mut self.document.customers, id);
        if removed {
            self.engine.mark_dirty();
        }
        removed
    }

    pub fn upsert_supply(&mut self, supply: Supply) {
        upsert(&mut self.document.supplies, supply);
        self.engine.mark_dirty();
    }

    pub fn remove_supply(&mut self, id: &str) -> bool {
        let removed = remove(&mut self.document.supplies, id);
        if removed {
            self.engine.mark_dirty();
        }
        removed
    }

    pub fn upsert_expense(&mut self, expense: Expense) {
        upsert(&mut self.document.expenses, expense);
        self.engine.mark_dirty();
    }

    pub fn remove_expense(&mut self, id: &str) -> bool {
        let removed = remove(&mut self.document.expenses, id);
        if removed {
            self.engine.mark_dirty();
        }
        removed
    }

    pub fn upsert_account(&mut self, account: BankAccount) {
        upsert(&mut self.document.accounts, account);
        self.engine.mark_dirty();
    }

    pub fn remove_account(&mut self, id: &str) -> bool {
        let removed = remove(&mut self.document.accounts, id);
        if removed {
            self.engine.mark_dirty();
        }
        removed
    }

    pub fn upsert_carrier(&mut self, carrier: Carrier) {
        upsert(&mut self.document.carriers, carrier);
        self.engine.mark_dirty();
    }

    pub fn remove_carrier(&mut self, id: &str) -> bool {
        let removed = remove(&mut self.document.carriers, id);
        if removed {
            self.engine.mark_dirty();
        }
        removed
    }

    pub fn update_settings(&mut self, settings: CompanySettings) {
        self.document.settings = settings;
        self.engine.mark_dirty();
    }

    // --- UI state (persisted locally, never synced) ----------------------

    pub fn set_active_view(&mut self, view: impl Into<String>) {
        self.document.active_view = view.into();
        self.engine.mark_dirty();
    }

    pub fn set_date_range(&mut self, range: DateRange) {
        self.document.date_range = range;
        self.engine.mark_dirty();
    }

    pub fn set_hide_values(&mut self, hide: bool) {
        self.document.hide_values = hide;
        self.engine.mark_dirty();
    }

    // --- manual backup ---------------------------------------------------

    pub fn export_backup(&self) -> Result<String, BackupError> {
        backup::export_json(&self.document)
    }

    /// Restore from an exported file. Goes through the engine's import path,
    /// so the import guard applies exactly as for a cloud download.
    pub fn import_backup(&mut self, json: &str) -> Result<(), BackupError> {
        let patch = backup::parse_backup(json)
            .inspect_err(|e| log::warn!("backup import rejected: {e}"))?;
        self.engine.import(&mut self.document, patch);
        Ok(())
    }

    // --- sync key lifecycle ----------------------------------------------

    /// Mint a fresh key and start mirroring under it.
    pub fn generate_sync_key(&mut self) -> String {
        let key = lockstep::generate_key();
        self.engine.set_sync_key(&key);
        key
    }

    /// Join an existing key typed in by the user. Returns the normalized key,
    /// or `None` if the input was blank.
    pub fn adopt_sync_key(&mut self, raw: &str) -> Option<String> {
        let key = raw.trim().to_uppercase();
        if key.is_empty() {
            return None;
        }
        self.engine.set_sync_key(&key);
        Some(key)
    }

    pub fn disconnect_sync(&mut self) {
        self.engine.disconnect_sync();
    }

    // --- status for the UI -----------------------------------------------

    pub fn phase(&self) -> EnginePhase {
        self.engine.phase()
    }

    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        self.engine.last_saved_at()
    }

    /// Whether an edit is still waiting out the debounce window, for an
    /// "unsaved changes" indicator.
    pub fn has_pending_save(&self) -> bool {
        self.engine.has_pending_save()
    }

    pub fn last_cloud_sync(&self) -> i64 {
        self.engine.last_cloud_sync()
    }

    pub fn sync_key(&self) -> Option<&str> {
        self.engine.sync_key()
    }

    /// User-facing description of the last upload failure, if any. The
    /// payload-too-large case gets actionable guidance; everything else is
    /// transient and reported as-is.
    pub fn sync_error_message(&self) -> Option<String> {
        self.engine.last_upload_error().map(|error| match error {
            UploadError::PayloadTooLarge { .. } => {
                "Sync copy is too large for the cloud slot; prune old delivered orders to shrink it."
                    .to_string()
            }
            other => other.to_string(),
        })
    }
}
