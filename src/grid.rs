//! Dots and boxes grid implementation

pub mod board;
pub mod render;

pub use board::{BoardSnapshot, BoardState, MAX_LINES, Orientation};
pub use render::{render_board, render_with_legend};
