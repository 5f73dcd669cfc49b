//! Value table backed by a memory map, saved in a flat binary file.
//!
//! Layout, all little-endian:
//!
//! ```text
//! [0..8)    magic "DNBQTBL1"
//! [8..12)   format version (u32)
//! [12..16)  actions per state (u32)
//! [16..24)  number of states (u64)
//! [24..)    num_states * num_actions f32 cells, row-major by state
//! ```
//!
//! A loaded table maps its file copy-on-write and a created table maps
//! anonymous memory, so nothing reaches the file until `persist`. Pages are
//! only read in when touched. `persist` writes the mapping to a staging
//! file and renames it over the table file.

use std::{
    fs::{self, File},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use memmap2::{MmapMut, MmapOptions};
use tracing::debug;

use crate::{
    Result,
    error::Error,
    ports::{UNVISITED, ValueTable, ValueTableStore, value_table::cell_count},
};

const MAGIC: &[u8; 8] = b"DNBQTBL1";
const VERSION: u32 = 1;
const HEADER_LEN: usize = 24;
const CELL_LEN: usize = std::mem::size_of::<f32>();

/// Value table whose cells live in a memory map.
pub struct MappedValueTable {
    name: String,
    path: PathBuf,
    num_states: u64,
    num_actions: usize,
    map: Mutex<MmapMut>,
}

/// Bytes of a table file, header included.
fn file_len(num_states: u64, num_actions: usize) -> Option<usize> {
    cell_count(num_states, num_actions)
        .and_then(|cells| cells.checked_mul(CELL_LEN))
        .and_then(|bytes| bytes.checked_add(HEADER_LEN))
}

impl MappedValueTable {
    /// Map a fresh table filled with [`UNVISITED`].
    ///
    /// The file at `path` is left alone until the table is persisted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfResources`] if the mapping cannot be reserved.
    pub fn create(name: &str, path: &Path, num_states: u64, num_actions: usize) -> Result<Self> {
        let out_of_resources = || Error::OutOfResources {
            name: name.to_string(),
            states: num_states,
            actions: num_actions,
        };
        let actions = u32::try_from(num_actions).map_err(|_| out_of_resources())?;
        let len = file_len(num_states, num_actions).ok_or_else(out_of_resources)?;

        let mut map = MmapMut::map_anon(len).map_err(|_| out_of_resources())?;
        map[0..8].copy_from_slice(MAGIC);
        map[8..12].copy_from_slice(&VERSION.to_le_bytes());
        map[12..16].copy_from_slice(&actions.to_le_bytes());
        map[16..24].copy_from_slice(&num_states.to_le_bytes());
        let fill = UNVISITED.to_le_bytes();
        for cell in map[HEADER_LEN..].chunks_exact_mut(CELL_LEN) {
            cell.copy_from_slice(&fill);
        }

        debug!(table = name, path = ?path, bytes = len, "created mapped value table");
        Ok(Self {
            name: name.to_string(),
            path: path.to_path_buf(),
            num_states,
            num_actions,
            map: Mutex::new(map),
        })
    }

    /// Map an existing table file and check its header.
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
                    operation: format!("open value table file {path:?}"),
                    source,
                });
            }
        };

        let malformed = |reason: &str| Error::MalformedTable {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        let map = map_private(&file, path)?;
        if map.len() < HEADER_LEN {
            return Err(malformed("file shorter than header"));
        }
        if &map[0..8] != MAGIC {
            return Err(malformed("bad magic"));
        }
        if read_u32(&map[8..12]) != VERSION {
            return Err(malformed("unsupported format version"));
        }

        let found_actions = read_u32(&map[12..16]) as usize;
        let found_states = u64::from_le_bytes([
            map[16], map[17], map[18], map[19], map[20], map[21], map[22], map[23],
        ]);
        if found_states != num_states || found_actions != num_actions {
            return Err(Error::DimensionMismatch {
                name: name.to_string(),
                expected_states: num_states,
                expected_actions: num_actions,
                found_states,
                found_actions,
            });
        }

        if file_len(num_states, num_actions) != Some(map.len()) {
            return Err(malformed("file length does not match header"));
        }

        Ok(Self {
            name: name.to_string(),
            path: path.to_path_buf(),
            num_states,
            num_actions,
            map: Mutex::new(map),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn map(&self) -> MutexGuard<'_, MmapMut> {
        self.map.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn offset(&self, state: u64, action: usize) -> usize {
        assert!(
            state < self.num_states && action < self.num_actions,
            "cell ({state}, {action}) outside {}x{} table '{}'",
            self.num_states,
            self.num_actions,
            self.name
        );
        HEADER_LEN + (state as usize * self.num_actions + action) * CELL_LEN
    }

    fn write_to(&self, path: &Path) -> Result<()> {
        let staging = path.with_extension("partial");
        let mut file = File::create(&staging).map_err(|source| Error::Io {
            operation: format!("create file {staging:?}"),
            source,
        })?;

        {
            let map = self.map();
            file.write_all(&map[..])
                .and_then(|()| file.sync_all())
                .map_err(|source| Error::Io {
                    operation: format!("write value table '{}' to {staging:?}", self.name),
                    source,
                })?;
        }
        drop(file);

        fs::rename(&staging, path).map_err(|source| Error::Io {
            operation: format!("move {staging:?} to {path:?}"),
            source,
        })
    }
}

fn map_private(file: &File, path: &Path) -> Result<MmapMut> {
    // Copy-on-write: writes stay in this process and the file is only
    // replaced by a rename, never modified in place.
    unsafe { MmapOptions::new().map_copy(file) }.map_err(|source| Error::Io {
        operation: format!("map value table file {path:?}"),
        source,
    })
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn read_f32(bytes: &[u8]) -> f32 {
    f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

impl ValueTable for MappedValueTable {
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
        let at = self.offset(state, action);
        read_f32(&self.map()[at..at + CELL_LEN])
    }

    fn set_value(&self, state: u64, action: usize, value: f32) {
        let at = self.offset(state, action);
        self.map()[at..at + CELL_LEN].copy_from_slice(&value.to_le_bytes());
    }

    fn update(&self, state: u64, action: usize, op: &mut dyn FnMut(f32) -> f32) -> f32 {
        let at = self.offset(state, action);
        let mut map = self.map();
        let value = op(read_f32(&map[at..at + CELL_LEN]));
        map[at..at + CELL_LEN].copy_from_slice(&value.to_le_bytes());
        value
    }

    fn max_value(&self, state: u64) -> f32 {
        let start = self.offset(state, 0);
        let end = start + self.num_actions * CELL_LEN;
        self.map()[start..end]
            .chunks_exact(CELL_LEN)
            .map(read_f32)
            .fold(f32::NEG_INFINITY, f32::max)
    }

    fn persist(&self) -> Result<()> {
        self.write_to(&self.path)
    }
}

/// Store that maps each table name to a file.
#[derive(Debug, Clone, Default)]
pub struct MappedTableStore {
    root: Option<PathBuf>,
}

impl MappedTableStore {
    pub fn new() -> Self {
        Self { root: None }
    }

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

impl ValueTableStore for MappedTableStore {
    fn create(
        &self,
        name: &str,
        num_states: u64,
        num_actions: usize,
    ) -> Result<Arc<dyn ValueTable>> {
        let table = MappedValueTable::create(name, &self.path_for(name), num_states, num_actions)?;
        Ok(Arc::new(table))
    }

    fn load(&self, name: &str, num_states: u64, num_actions: usize) -> Result<Arc<dyn ValueTable>> {
        let table = MappedValueTable::load(name, &self.path_for(name), num_states, num_actions)?;
        Ok(Arc::new(table))
    }

    fn kind(&self) -> &'static str {
        "mapped"
    }
}
