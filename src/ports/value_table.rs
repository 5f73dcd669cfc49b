//! Value table ports for state-action value storage.
//!
//! This module defines the trait boundary between the learning policy and
//! whatever holds its values: an in-process array, a memory-mapped file, or
//! any other backing that honours the same contract.

use std::sync::Arc;

use crate::Result;

/// Value of a (state, action) pair that has never been written.
pub const UNVISITED: f32 = -1.0;

/// Dense mapping from (state identifier, action index) to a value.
///
/// Tables may be shared between matches running on different threads, so
/// every operation takes `&self` and implementations synchronise
/// internally. Indices outside `num_states` x `num_actions` are a caller
/// bug; implementations panic on them.
pub trait ValueTable: Send + Sync {
    /// Name the table was opened under.
    fn name(&self) -> &str;

    fn num_states(&self) -> u64;

    fn num_actions(&self) -> usize;

    fn value(&self, state: u64, action: usize) -> f32;

    fn set_value(&self, state: u64, action: usize, value: f32);

    /// Read-modify-write a single cell without losing concurrent updates.
    ///
    /// Returns the value written.
    fn update(&self, state: u64, action: usize, op: &mut dyn FnMut(f32) -> f32) -> f32;

    /// Maximum value over every action of `state`, claimed or not.
    fn max_value(&self, state: u64) -> f32;

    /// Write the whole table to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the durable copy could not be written. The
    /// in-memory values are unaffected.
    fn persist(&self) -> Result<()>;
}

/// Port for creating and loading value tables by name.
///
/// # Examples
///
/// ```no_run
/// use dotsnboxes::adapters::DenseTableStore;
/// use dotsnboxes::ports::ValueTableStore;
///
/// let store = DenseTableStore::new();
/// let table = match store.load("q1.dat", 4096, 12) {
///     Ok(table) => table,
///     Err(err) if err.is_recoverable_storage() => store.create("q1.dat", 4096, 12)?,
///     Err(err) => return Err(err),
/// };
/// table.persist()?;
/// # Ok::<(), dotsnboxes::Error>(())
/// ```
pub trait ValueTableStore: Send + Sync {
    /// Allocate a table filled with [`UNVISITED`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfResources`] if the table cannot be
    /// allocated.
    fn create(&self, name: &str, num_states: u64, num_actions: usize)
    -> Result<Arc<dyn ValueTable>>;

    /// Reopen a previously persisted table.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::TableNotFound`] if nothing was persisted under
    /// `name`, and [`crate::Error::DimensionMismatch`] if the stored
    /// dimensions differ from the requested ones.
    fn load(&self, name: &str, num_states: u64, num_actions: usize) -> Result<Arc<dyn ValueTable>>;

    /// Short label for logs and summaries.
    fn kind(&self) -> &'static str;
}

/// Total cell count, or `None` if it does not fit in memory addressing.
pub(crate) fn cell_count(num_states: u64, num_actions: usize) -> Option<usize> {
    usize::try_from(num_states)
        .ok()
        .and_then(|states| states.checked_mul(num_actions))
}
