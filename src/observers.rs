//! Match observers
//!
//! Subscribers that turn [`MatchEvent`]s into something a person can look
//! at: a redrawn board, a JSON Lines log or a progress bar.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    Error, Result,
    grid::render_board,
    ports::{MatchEvent, MatchObserver},
};

/// Redraws the board after every placed line
pub struct BoardPrinter<W> {
    out: W,
    names: Vec<String>,
}

impl<W: Write + Send> BoardPrinter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            names: Vec::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn name(&self, seat: usize) -> &str {
        self.names.get(seat).map_or("?", String::as_str)
    }
}

impl<W: Write + Send> MatchObserver for BoardPrinter<W> {
    fn publish(&mut self, event: &MatchEvent) -> Result<()> {
        match event {
            MatchEvent::MatchStarted { policies, .. } => {
                self.names = policies.clone();
            }
            MatchEvent::RoundStarted { round, starter } => {
                let name = self.name(*starter).to_string();
                writeln!(self.out, "== round {} ({name} starts)", round + 1)?;
            }
            MatchEvent::LinePlaced {
                policy,
                line,
                boxes,
                board,
                ..
            } => {
                let drawn = render_board(&board.to_board()?);
                let name = self.name(*policy).to_string();
                writeln!(self.out, "{name} claims line {line}")?;
                if *boxes > 0 {
                    writeln!(self.out, "and completes {boxes} box(es)")?;
                }
                write!(self.out, "{drawn}")?;
            }
            MatchEvent::ScoresChanged { boxes, .. } => {
                let scores: Vec<String> = boxes
                    .iter()
                    .enumerate()
                    .map(|(seat, b)| format!("{}: {b}", self.name(seat)))
                    .collect();
                writeln!(self.out, "score {}", scores.join(", "))?;
            }
            MatchEvent::RoundFinished { credited, tied, .. } => {
                let how = if *tied { " on a tie" } else { "" };
                let name = self.name(*credited).to_string();
                writeln!(self.out, "{name} takes the round{how}")?;
            }
            MatchEvent::Standings { .. } | MatchEvent::MatchFinished { .. } => {}
        }
        self.out.flush()?;
        Ok(())
    }
}

/// Writes every event as one JSON object per line
pub struct JsonlObserver<W = BufWriter<File>> {
    writer: W,
}

impl JsonlObserver {
    /// Create (or truncate) the log file at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| Error::Io {
            operation: format!("create event log {path:?}"),
            source,
        })?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl<W: Write + Send> JsonlObserver<W> {
    pub fn from_writer(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> MatchObserver for JsonlObserver<W> {
    fn publish(&mut self, event: &MatchEvent) -> Result<()> {
        serde_json::to_writer(&mut self.writer, event)?;
        writeln!(&mut self.writer)?;
        if matches!(event, MatchEvent::MatchFinished { .. }) {
            self.writer.flush()?;
        }
        Ok(())
    }
}

/// Progress bar over the rounds of one match
pub struct ProgressObserver {
    progress_bar: Option<ProgressBar>,
    label: String,
}

impl ProgressObserver {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            progress_bar: None,
            label: label.into(),
        }
    }
}

impl MatchObserver for ProgressObserver {
    fn publish(&mut self, event: &MatchEvent) -> Result<()> {
        match event {
            MatchEvent::MatchStarted { rounds, .. } => {
                let pb = ProgressBar::new(*rounds as u64);
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template("[{elapsed_precise}] {prefix} {bar:40.cyan/blue} {pos}/{len} rounds {msg}")
                        .map_err(|e| Error::ProgressBarTemplate {
                            message: e.to_string(),
                        })?
                        .progress_chars("=>-"),
                );
                pb.set_prefix(self.label.clone());
                self.progress_bar = Some(pb);
            }
            MatchEvent::RoundFinished { .. } => {
                if let Some(pb) = &self.progress_bar {
                    pb.inc(1);
                }
            }
            MatchEvent::Standings { standings, .. } => {
                if let Some(pb) = &self.progress_bar {
                    let wins: Vec<String> = standings.iter().map(|s| s.wins.to_string()).collect();
                    pb.set_message(format!("(W {})", wins.join(":")));
                }
            }
            MatchEvent::MatchFinished { aborted, .. } => {
                if let Some(pb) = self.progress_bar.take() {
                    if *aborted {
                        pb.abandon_with_message("aborted");
                    } else {
                        pb.finish();
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }
}
