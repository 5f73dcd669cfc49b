//! Plain-text drawing of a grid

use super::board::BoardState;

/// Render claimed lines as `---` and `|`, dots as `+`.
///
/// ```
/// use dotsnboxes::grid::{BoardState, render_board};
///
/// let mut board = BoardState::new(2, 2)?;
/// board.apply_action(0)?;
/// board.apply_action(1)?;
/// assert_eq!(render_board(&board), "+---+\n|    \n+   +\n");
/// # Ok::<(), dotsnboxes::Error>(())
/// ```
pub fn render_board(board: &BoardState) -> String {
    let mut out = String::new();

    for row in 0..board.height() {
        for col in 0..board.width() {
            out.push('+');
            if col + 1 < board.width() {
                let claimed = board.is_claimed(board.horizontal_line(row, col));
                out.push_str(if claimed { "---" } else { "   " });
            }
        }
        out.push('\n');

        if row + 1 == board.height() {
            break;
        }

        for col in 0..board.width() {
            let claimed = board.is_claimed(board.vertical_line(row, col));
            out.push(if claimed { '|' } else { ' ' });
            if col + 1 < board.width() {
                out.push_str("   ");
            }
        }
        out.push('\n');
    }

    out
}

/// Render the board followed by the list of unclaimed lines.
pub fn render_with_legend(board: &BoardState) -> String {
    let available: Vec<String> = board
        .available_lines()
        .iter()
        .map(|line| line.to_string())
        .collect();
    format!(
        "{}available lines: {}\n",
        render_board(board),
        available.join(" ")
    )
}
