//! Adapters implementing domain ports.
//!
//! This module contains the value table backends behind
//! [`crate::ports::ValueTableStore`]. Following hexagonal architecture,
//! adapters depend on domain ports, not the other way around.

pub mod dense_table;
pub mod mapped_table;

pub use dense_table::{DenseTableStore, DenseValueTable};
pub use mapped_table::{MappedTableStore, MappedValueTable};
