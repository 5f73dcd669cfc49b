//! Inspect command - Summarise a saved value table

use std::cmp::Ordering;

use anyhow::{Context, Result};
use clap::Parser;

use crate::{
    adapters::{DenseTableStore, MappedTableStore},
    app::Backend,
    cli::output::{format_number, print_kv, print_section},
    grid::BoardState,
    ports::{UNVISITED, ValueTable, ValueTableStore},
};

#[derive(Parser, Debug)]
#[command(about = "Summarise a saved value table")]
pub struct InspectArgs {
    /// Value table file
    pub table: String,

    /// Dots per row of the grid the table was trained on
    #[arg(long, default_value_t = 3)]
    pub width: usize,

    /// Dots per column of the grid the table was trained on
    #[arg(long, default_value_t = 3)]
    pub height: usize,

    /// Value table backend (dense or mapped)
    #[arg(long, default_value = "dense")]
    pub backend: Backend,

    /// Number of opening lines to list
    #[arg(long, default_value_t = 5)]
    pub top: usize,
}

/// Cells that hold something other than the unvisited sentinel.
pub fn visited_cells(table: &dyn ValueTable) -> u64 {
    let mut visited = 0;
    for state in 0..table.num_states() {
        for action in 0..table.num_actions() {
            if table.value(state, action) != UNVISITED {
                visited += 1;
            }
        }
    }
    visited
}

/// Lines of the empty board ordered by value, best first.
pub fn best_openings(table: &dyn ValueTable, top: usize) -> Vec<(usize, f32)> {
    let mut openings: Vec<(usize, f32)> = (0..table.num_actions())
        .map(|line| (line, table.value(0, line)))
        .collect();
    openings.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    openings.truncate(top);
    openings
}

pub fn execute(args: InspectArgs) -> Result<()> {
    let board = BoardState::new(args.width, args.height).context("Invalid grid dimensions")?;
    let store: Box<dyn ValueTableStore> = match args.backend {
        Backend::Dense => Box::new(DenseTableStore::new()),
        Backend::Mapped => Box::new(MappedTableStore::new()),
    };

    let table = store
        .load(&args.table, board.num_states(), board.num_lines())
        .with_context(|| format!("Failed to load value table {}", args.table))?;

    let total = table.num_states() * table.num_actions() as u64;
    let visited = visited_cells(table.as_ref());

    print_section(&format!("Value table {}", args.table));
    print_kv("Backend", store.kind());
    print_kv("Grid", &format!("{}x{}", args.width, args.height));
    print_kv("States", &format_number(table.num_states()));
    print_kv("Actions", &table.num_actions().to_string());
    print_kv(
        "Visited cells",
        &format!(
            "{} of {} ({:.2}%)",
            format_number(visited),
            format_number(total),
            100.0 * visited as f64 / total as f64
        ),
    );

    println!("\nBest opening lines:");
    for (line, value) in best_openings(table.as_ref(), args.top) {
        let orientation = board.orientation(line);
        println!("  line {line:>2} ({orientation}): {value:.4}");
    }

    Ok(())
}
