//! In-process dense value table persisted as MessagePack.
//!
//! The whole table lives in one `Vec<f32>` guarded by a mutex. Persisting
//! writes a versioned MessagePack document next to the target file and
//! renames it into place, so a crash mid-write never leaves a truncated
//! table behind.

use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, ErrorKind, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    Result,
    error::Error,
    ports::{
        UNVISITED, ValueTable, ValueTableStore,
        value_table::cell_count,
    },
};

const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct SavedTableRef<'a> {
    version: u32,
    num_states: u64,
    num_actions: usize,
    values: &'a [f32],
}

#[derive(Deserialize)]
struct SavedTable {
    version: u32,
    num_states: u64,
    num_actions: usize,
    values: Vec<f32>,
}

/// Value table held entirely in process memory.
pub struct DenseValueTable {
    name: String,
    path: Option<PathBuf>,
    num_states: u64,
    num_actions: usize,
    cells: Mutex<Vec<f32>>,
}

impl DenseValueTable {
    /// Allocate a table that persists to `path`.
    pub fn create(
        name: &str,
        path: Option<PathBuf>,
        num_states: u64,
        num_actions: usize,
    ) -> Result<Self> {
        let out_of_resources = || Error::OutOfResources {
            name: name.to_string(),
            states: num_states,
            actions: num_actions,
        };

        let len = cell_count(num_states, num_actions).ok_or_else(out_of_resources)?;
        let mut cells = Vec::new();
        cells
            .try_reserve_exact(len)
            .map_err(|_| out_of_resources())?;
        cells.resize(len, UNVISITED);

        Ok(Self {
            name: name.to_string(),
            path,
            num_states,
            num_actions,
            cells: Mutex::new(cells),
        })
    }

    /// Allocate a table with no durable copy; `persist` is a no-op.
    pub fn in_memory(name: &str, num_states: u64, num_actions: usize) -> Result<Self> {
        Self::create(name, None, num_states, num_actions)
    }

    /// Load a table written by [`ValueTable::persist`].
    pub fn load(name: &str, path: &Path, num_states: u64, num_actions: usize) -> Result<Self> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(source) if source.kind() == ErrorKind::NotFound => {
                return Err(Error::TableNotFound {
                    name: name.to_string(),
                });
            }
            Err(source) => {
                return Err(Error::Io {
                    operation: format!("open value table {path:?}"),
                    source,
                });
            }
        };

        let saved: SavedTable = rmp_serde::decode::from_read(BufReader::new(file)).map_err(
            |e| Error::MalformedTable {
                name: name.to_string(),
                reason: e.to_string(),
            },
        )?;

        if saved.version != FORMAT_VERSION {
            return Err(Error::MalformedTable {
                name: name.to_string(),
                reason: format!(
                    "unsupported format version {} (expected {FORMAT_VERSION})",
                    saved.version
                ),
            });
        }

        if saved.num_states != num_states || saved.num_actions != num_actions {
            return Err(Error::DimensionMismatch {
                name: name.to_string(),
                expected_states: num_states,
                expected_actions: num_actions,
                found_states: saved.num_states,
                found_actions: saved.num_actions,
            });
        }

        if Some(saved.values.len()) != cell_count(num_states, num_actions) {
            return Err(Error::MalformedTable {
                name: name.to_string(),
                reason: format!("expected {num_states}x{num_actions} values, found {}", saved.values.len()),
            });
        }

        Ok(Self {
            name: name.to_string(),
            path: Some(path.to_path_buf()),
            num_states,
            num_actions,
            cells: Mutex::new(saved.values),
        })
    }

    /// Copy of every cell, row-major by state.
    pub fn snapshot(&self) -> Vec<f32> {
        self.cells().clone()
    }

    fn cells(&self) -> MutexGuard<'_, Vec<f32>> {
        self.cells.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn index(&self, state: u64, action: usize) -> usize {
        assert!(
            state < self.num_states && action < self.num_actions,
            "cell ({state}, {action}) outside {}x{} table '{}'",
            self.num_states,
            self.num_actions,
            self.name
        );
        state as usize * self.num_actions + action
    }

    fn write_to(&self, path: &Path) -> Result<()> {
        let staging = path.with_extension("partial");
        let file = File::create(&staging).map_err(|source| Error::Io {
            operation: format!("create file {staging:?}"),
            source,
        })?;
        let mut writer = BufWriter::new(file);

        {
            let cells = self.cells();
            let saved = SavedTableRef {
                version: FORMAT_VERSION,
                num_states: self.num_states,
                num_actions: self.num_actions,
                values: &cells,
            };
            rmp_serde::encode::write(&mut writer, &saved).map_err(|e| {
                Error::SerializationContext {
                    operation: format!("serialize value table '{}' to MessagePack", self.name),
                    message: e.to_string(),
                }
            })?;
        }

        writer.flush().map_err(|source| Error::Io {
            operation: format!("flush file {staging:?}"),
            source,
        })?;
        drop(writer);

        fs::rename(&staging, path).map_err(|source| Error::Io {
            operation: format!("move {staging:?} to {path:?}"),
            source,
        })
    }
}

impl ValueTable for DenseValueTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn num_states(&self) -> u64 {
        self.num_states
    }

    fn num_actions(&self) -> usize {
        self.num_actions
    }

    fn value(&self, state: u64, action: usize) -> f32 {
        let index = self.index(state, action);
        self.cells()[index]
    }

    fn set_value(&self, state: u64, action: usize, value: f32) {
        let index = self.index(state, action);
        self.cells()[index] = value;
    }

    fn update(&self, state: u64, action: usize, op: &mut dyn FnMut(f32) -> f32) -> f32 {
        let index = self.index(state, action);
        let mut cells = self.cells();
        let value = op(cells[index]);
        cells[index] = value;
        value
    }

    fn max_value(&self, state: u64) -> f32 {
        let start = self.index(state, 0);
        self.cells()[start..start + self.num_actions]
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max)
    }

    fn persist(&self) -> Result<()> {
        match &self.path {
            Some(path) => self.write_to(path),
            None => {
                debug!(table = %self.name, "in-memory table, nothing to persist");
                Ok(())
            }
        }
    }
}

/// Store that keeps tables in memory and persists them as MessagePack files.
///
/// Table names are file names, resolved against an optional root directory.
#[derive(Debug, Clone, Default)]
pub struct DenseTableStore {
    root: Option<PathBuf>,
}

impl DenseTableStore {
    /// Resolve table names against the working directory.
    pub fn new() -> Self {
        Self { root: None }
    }

    /// Resolve table names against `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        match &self.root {
            Some(root) => root.join(name),
            None => PathBuf::from(name),
        }
    }
}

impl ValueTableStore for DenseTableStore {
    fn create(
        &self,
        name: &str,
        num_states: u64,
        num_actions: usize,
    ) -> Result<Arc<dyn ValueTable>> {
        let table = DenseValueTable::create(name, Some(self.path_for(name)), num_states, num_actions)?;
        Ok(Arc::new(table))
    }

    fn load(&self, name: &str, num_states: u64, num_actions: usize) -> Result<Arc<dyn ValueTable>> {
        let table = DenseValueTable::load(name, &self.path_for(name), num_states, num_actions)?;
        Ok(Arc::new(table))
    }

    fn kind(&self) -> &'static str {
        "dense"
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_fresh_table_is_unvisited() {
        let table = DenseValueTable::in_memory("fresh", 16, 4).unwrap();
        for state in 0..16 {
            for action in 0..4 {
                assert_eq!(table.value(state, action), UNVISITED);
            }
            assert_eq!(table.max_value(state), UNVISITED);
        }
    }

    #[test]
    fn test_set_value_touches_one_cell() {
        let table = DenseValueTable::in_memory("cells", 16, 4).unwrap();
        table.set_value(5, 2, 3.5);

        for state in 0..16 {
            for action in 0..4 {
                let expected = if (state, action) == (5, 2) { 3.5 } else { UNVISITED };
                assert_eq!(table.value(state, action), expected);
            }
        }
        assert_eq!(table.max_value(5), 3.5);
    }

    #[test]
    fn test_update_returns_written_value() {
        let table = DenseValueTable::in_memory("update", 4, 4).unwrap();
        let written = table.update(1, 1, &mut |old| old + 0.5);
        assert_eq!(written, -0.5);
        assert_eq!(table.value(1, 1), -0.5);
    }

    #[test]
    #[should_panic]
    fn test_action_out_of_range_panics() {
        let table = DenseValueTable::in_memory("oob", 4, 4).unwrap();
        table.value(0, 4);
    }

    #[test]
    fn test_oversized_table_is_out_of_resources() {
        let result = DenseValueTable::in_memory("huge", u64::MAX, 63);
        assert!(matches!(result, Err(Error::OutOfResources { .. })));
    }

    #[test]
    fn test_persist_and_load_roundtrip() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = DenseTableStore::with_root(temp_dir.path());

        let table = store.create("q1.dat", 64, 6).unwrap();
        table.set_value(0, 0, 10.0);
        table.set_value(63, 5, -7.25);
        table.set_value(17, 3, 0.125);
        table.persist().unwrap();

        let loaded = store.load("q1.dat", 64, 6).unwrap();
        for state in 0..64 {
            for action in 0..6 {
                assert_eq!(loaded.value(state, action), table.value(state, action));
            }
        }
        assert!(!temp_dir.path().join("q1.partial").exists());
    }

    #[test]
    fn test_load_dimension_mismatch() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = DenseTableStore::with_root(temp_dir.path());
        store.create("q.dat", 16, 4).unwrap().persist().unwrap();

        let result = store.load("q.dat", 16, 5);
        assert!(matches!(
            result,
            Err(Error::DimensionMismatch {
                expected_actions: 5,
                found_actions: 4,
                ..
            })
        ));
    }

    #[test]
    fn test_load_missing_is_not_found() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = DenseTableStore::with_root(temp_dir.path());
        let result = store.load("missing.dat", 16, 4);
        assert!(matches!(result, Err(Error::TableNotFound { .. })));
    }

    #[test]
    fn test_load_garbage_is_malformed() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        fs::write(temp_dir.path().join("junk.dat"), b"not a table").unwrap();
        let store = DenseTableStore::with_root(temp_dir.path());
        let result = store.load("junk.dat", 16, 4);
        assert!(matches!(result, Err(Error::MalformedTable { .. })));
    }

    #[test]
    fn test_persist_to_invalid_path_returns_error() {
        let table = DenseValueTable::create(
            "bad",
            Some(PathBuf::from("/invalid_dir_12345/q.dat")),
            4,
            4,
        )
        .unwrap();
        assert!(table.persist().is_err());
    }
}
