//! Application layer: configuration and the context that wires matches.
//!
//! [`AppContext`] owns the value table store, the registry of open tables
//! and the cancellation token shared by all matches. It replaces any
//! process-wide state: everything a match needs is built through it, and
//! everything that must be saved on exit is saved by
//! [`AppContext::shutdown`].
//!
//! # Usage
//!
//! ```
//! use dotsnboxes::app::{AppContext, PolicySpec, SimulationConfig};
//!
//! let config = SimulationConfig {
//!     rounds: 10,
//!     width: 2,
//!     height: 2,
//!     seed: Some(1),
//!     policies: vec![PolicySpec::Simple, PolicySpec::Random],
//!     ..SimulationConfig::default()
//! };
//! config.validate()?;
//!
//! let app = AppContext::from_config(&config);
//! let game = app.build_match(&config, 0)?;
//! let results = app.run_matches(vec![game]);
//! assert_eq!(results[0].as_ref().unwrap().rounds_played, 10);
//! # Ok::<(), dotsnboxes::Error>(())
//! ```

pub mod config;
pub mod context;

pub use config::{Backend, PolicySpec, SimulationConfig};
pub use context::{AppContext, AppContextBuilder, ShutdownReport};
