//! File-backed local state store.
//!
//! All cached entities live in a single JSON document. Every save rewrites
//! the whole document into a temporary file in the same directory and
//! renames it over the original, so a crash mid-write leaves either the old
//! or the new document, never a mix.
//!
//! # Example
//!
//! ```no_run
//! use grocer_sync_engine::{FileStateStore, LocalStateStore};
//!
//! let store = FileStateStore::open("/data/grocer/state.json").unwrap();
//! let cart = store.get_cart_state().unwrap();
//! println!("{} items, updated {}", cart.data.len(), cart.updated_at);
//! ```

use crate::error::{SyncError, SyncResult};
use crate::store::{LocalState, LocalStateStore};
use grocer_sync_protocol::{CartItems, OrderList, ProfileData, StateSnapshot, Timestamp};
use parking_lot::Mutex;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// A local store persisted as one JSON file.
#[derive(Debug)]
pub struct FileStateStore {
    /// Path of the JSON document.
    path: PathBuf,
    /// Serializes read-modify-write cycles.
    write_lock: Mutex<()>,
}

impl FileStateStore {
    /// Opens a store at `path`, creating parent directories if needed.
    ///
    /// The file itself is created on the first save; until then every
    /// entity reads as never written.
    pub fn open(path: impl AsRef<Path>) -> SyncResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(SyncError::local_store)?;
        }
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// Returns the path of the JSON document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the whole document.
    pub fn load(&self) -> SyncResult<LocalState> {
        match fs::read_to_string(&self.path) {
            Ok(json) => LocalState::from_json(&json),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(LocalState::default()),
            Err(e) => Err(SyncError::local_store(e)),
        }
    }

    /// Replaces the whole document atomically.
    pub fn store(&self, state: &LocalState) -> SyncResult<()> {
        let _guard = self.write_lock.lock();
        self.write(state)
    }

    fn write(&self, state: &LocalState) -> SyncResult<()> {
        let json = state.to_json_pretty()?;
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut tmp = NamedTempFile::new_in(dir).map_err(SyncError::local_store)?;
        tmp.write_all(json.as_bytes())
            .map_err(SyncError::local_store)?;
        tmp.as_file().sync_all().map_err(SyncError::local_store)?;
        tmp.persist(&self.path)
            .map_err(|e| SyncError::local_store(e.error))?;

        debug!(path = %self.path.display(), "local state persisted");
        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut LocalState)) -> SyncResult<()> {
        let _guard = self.write_lock.lock();
        let mut state = self.load()?;
        apply(&mut state);
        self.write(&state)
    }
}

impl LocalStateStore for FileStateStore {
    fn get_cart_state(&self) -> SyncResult<StateSnapshot<CartItems>> {
        Ok(self.load()?.cart_snapshot())
    }

    fn get_orders_state(&self) -> SyncResult<StateSnapshot<OrderList>> {
        Ok(self.load()?.orders_snapshot())
    }

    fn get_profile_state(&self) -> SyncResult<Option<StateSnapshot<ProfileData>>> {
        Ok(self.load()?.profile)
    }

    fn save_cart_state(&self, items: CartItems, updated_at: Timestamp) -> SyncResult<()> {
        let snapshot = StateSnapshot::new(items, updated_at)?;
        self.update(|state| state.cart = Some(snapshot))
    }

    fn save_orders_state(&self, orders: OrderList, updated_at: Timestamp) -> SyncResult<()> {
        let snapshot = StateSnapshot::new(orders, updated_at)?;
        self.update(|state| state.orders = Some(snapshot))
    }

    fn save_profile_state(&self, profile: ProfileData, updated_at: Timestamp) -> SyncResult<()> {
        let snapshot = StateSnapshot::new(profile, updated_at)?;
        self.update(|state| state.profile = Some(snapshot))
    }
}
