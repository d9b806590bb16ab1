pub mod data;
pub mod error;
mod ident;
mod standup;
mod stats;

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::info;

pub use data::{Data, Locator};
pub use error::{Error, Result};

/// Process-wide workspace store: all state behind one mutex, optionally
/// backed by a JSON snapshot file. Request handlers and timer tasks both go
/// through the closure accessors, which keeps standup flushes and scheduled
/// sends serialized with ordinary requests.
pub struct Store {
    data: Mutex<Data>,
    snapshot_path: Option<PathBuf>,
}

impl Store {
    /// A store with no snapshot backing, mainly for tests.
    pub fn in_memory() -> Self {
        Self { data: Mutex::new(Data::default()), snapshot_path: None }
    }

    /// Open a store backed by `path`, loading the previous snapshot when one
    /// exists. A missing file starts a fresh workspace.
    pub fn open(path: PathBuf) -> anyhow::Result<Self> {
        let data = if path.exists() {
            let bytes = fs::read(&path)?;
            let data: Data = serde_json::from_slice(&bytes)?;
            info!("loaded snapshot from {}", path.display());
            data
        } else {
            info!("no snapshot at {}, starting empty", path.display());
            Data::default()
        };
        Ok(Self { data: Mutex::new(data), snapshot_path: Some(path) })
    }

    pub fn with_data<T>(&self, f: impl FnOnce(&Data) -> Result<T>) -> Result<T> {
        let data = self
            .data
            .lock()
            .map_err(|e| Error::Internal(format!("store lock poisoned: {e}")))?;
        f(&data)
    }

    pub fn with_data_mut<T>(&self, f: impl FnOnce(&mut Data) -> Result<T>) -> Result<T> {
        let mut data = self
            .data
            .lock()
            .map_err(|e| Error::Internal(format!("store lock poisoned: {e}")))?;
        f(&mut data)
    }

    /// Serialize the whole workspace to the snapshot file. Best effort
    /// durability: state between snapshots is lost on crash by design.
    pub fn snapshot(&self) -> anyhow::Result<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        let bytes = {
            let data = self
                .data
                .lock()
                .map_err(|e| anyhow::anyhow!("store lock poisoned: {e}"))?;
            serde_json::to_vec(&*data)?
        };
        fs::write(path, bytes)?;
        Ok(())
    }

    /// Reset the workspace to its pristine state.
    pub fn clear(&self) -> Result<()> {
        self.with_data_mut(|data| {
            *data = Data::default();
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use roost_types::models::{User, UserStats};

    use super::*;

    #[test]
    fn snapshot_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roost.json");

        let store = Store::open(path.clone()).unwrap();
        store
            .with_data_mut(|data| {
                data.users.push(User {
                    user_id: 0,
                    email: "a@b.co".into(),
                    password_hash: "h".into(),
                    name_first: "A".into(),
                    name_last: "B".into(),
                    handle: "ab".into(),
                    perm: 1,
                    notifications: vec![],
                });
                data.user_stats.push(UserStats::seeded(0, 1));
                Ok(())
            })
            .unwrap();
        store.snapshot().unwrap();

        let reloaded = Store::open(path).unwrap();
        let count = reloaded.with_data(|data| Ok(data.users.len())).unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn clear_resets_everything() {
        let store = Store::in_memory();
        store
            .with_data_mut(|data| {
                data.user_stats.push(UserStats::seeded(0, 1));
                Ok(())
            })
            .unwrap();
        store.clear().unwrap();
        let empty = store.with_data(|data| Ok(data.user_stats.is_empty())).unwrap();
        assert!(empty);
    }
}
