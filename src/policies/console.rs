//! Human player on a text console
//!
//! The board and the legal lines are written to `output`, then a line
//! number is read from `input`. `q`, `quit` or end of input abort the
//! match. Numbers that are not legal are passed on as-is; the match engine
//! answers them with a penalty and asks again.

use std::io::{self, BufRead, BufReader, Stdin, Stdout, Write};

use tracing::debug;

use crate::{
    Error, Result,
    grid::{BoardState, render_with_legend},
    ports::{Action, Policy},
};

/// Policy driven by a person typing line numbers
pub struct ConsolePolicy<R, W> {
    width: usize,
    height: usize,
    input: R,
    output: W,
    points: f32,
}

impl ConsolePolicy<BufReader<Stdin>, Stdout> {
    /// Console policy on the process's standard input and output.
    pub fn stdio(width: usize, height: usize) -> Self {
        Self::new(width, height, BufReader::new(io::stdin()), io::stdout())
    }
}

impl<R: BufRead + Send, W: Write + Send> ConsolePolicy<R, W> {
    pub fn new(width: usize, height: usize, input: R, output: W) -> Self {
        Self {
            width,
            height,
            input,
            output,
            points: 0.0,
        }
    }

    /// Consume the policy, returning whatever was written to the output.
    pub fn into_output(self) -> W {
        self.output
    }

    fn io_error(operation: &str) -> impl FnOnce(io::Error) -> Error + '_ {
        move |source| Error::Io {
            operation: operation.to_string(),
            source,
        }
    }

    fn prompt(&mut self, state: u64) -> Result<()> {
        let board = BoardState::from_identifier(self.width, self.height, state)?;
        write!(
            self.output,
            "{}Your points: {}\nline> ",
            render_with_legend(&board),
            self.points
        )
        .and_then(|_| self.output.flush())
        .map_err(Self::io_error("write console prompt"))
    }
}

impl<R: BufRead + Send, W: Write + Send> Policy for ConsolePolicy<R, W> {
    fn select_action(&mut self, state: u64, _available: &[usize]) -> Result<Action> {
        loop {
            self.prompt(state)?;

            let mut line = String::new();
            let read = self
                .input
                .read_line(&mut line)
                .map_err(Self::io_error("read console input"))?;
            if read == 0 {
                debug!("console input closed");
                return Ok(Action::Abort);
            }

            let answer = line.trim();
            if answer.eq_ignore_ascii_case("q") || answer.eq_ignore_ascii_case("quit") {
                return Ok(Action::Abort);
            }
            match answer.parse::<usize>() {
                Ok(line) => {
                    debug!(line, "got console input");
                    return Ok(Action::Line(line));
                }
                Err(_) => {
                    writeln!(self.output, "'{answer}' is not a line number")
                        .map_err(Self::io_error("write console prompt"))?;
                }
            }
        }
    }

    fn observe_feedback(
        &mut self,
        reward: f32,
        _new_state: u64,
        _available: Option<&[usize]>,
    ) -> Result<()> {
        self.points += reward;
        Ok(())
    }

    fn name(&self) -> &str {
        "ConsoleAgent"
    }
}
