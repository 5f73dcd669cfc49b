//! Subcommands of the `dots` binary

pub mod inspect;
pub mod play;
