//! Application context owning shared tables and match lifecycles.
//!
//! The context is the single owner of every value table opened during a
//! run. Policies receive shared handles; persisting happens once, in
//! [`AppContext::shutdown`].

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    thread,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::config::{Backend, PolicySpec, SimulationConfig};
use crate::{
    Error, Result,
    adapters::{DenseTableStore, MappedTableStore},
    engine::{CancelToken, Match, MatchResult},
    grid::BoardState,
    policies::{ConsolePolicy, OrderedPolicy, RandomPolicy},
    ports::{Policy, ValueTable, ValueTableStore},
    q_learning::QLearningPolicy,
};

/// Outcome of persisting every open table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShutdownReport {
    pub persisted: Vec<String>,
    /// Table name and error message for each table that failed to persist.
    pub failed: Vec<(String, String)>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Application context with dependency injection.
///
/// # Examples
///
/// ```
/// use dotsnboxes::adapters::DenseTableStore;
/// use dotsnboxes::app::AppContext;
///
/// let temp = tempfile::tempdir()?;
/// let app = AppContext::builder()
///     .with_store(DenseTableStore::with_root(temp.path()))
///     .with_default_seed(42)
///     .build();
///
/// let first = app.open_table("q1.dat", 16, 4)?;
/// let second = app.open_table("q1.dat", 16, 4)?;
/// first.set_value(0, 0, 1.0);
/// assert_eq!(second.value(0, 0), 1.0);
///
/// assert!(app.shutdown().is_clean());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct AppContext {
    store: Arc<dyn ValueTableStore>,
    tables: Mutex<BTreeMap<String, Arc<dyn ValueTable>>>,
    cancel: CancelToken,
    default_seed: Option<u64>,
}

impl AppContext {
    /// Create a context storing dense tables in the working directory.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> AppContextBuilder {
        AppContextBuilder::new()
    }

    /// Create a context with the store and seed a configuration asks for.
    pub fn from_config(config: &SimulationConfig) -> Self {
        let store: Arc<dyn ValueTableStore> = match (config.backend, &config.table_dir) {
            (Backend::Dense, Some(dir)) => Arc::new(DenseTableStore::with_root(dir)),
            (Backend::Dense, None) => Arc::new(DenseTableStore::new()),
            (Backend::Mapped, Some(dir)) => Arc::new(MappedTableStore::with_root(dir)),
            (Backend::Mapped, None) => Arc::new(MappedTableStore::new()),
        };
        let builder = Self::builder().with_shared_store(store);
        match config.seed {
            Some(seed) => builder.with_default_seed(seed).build(),
            None => builder.build(),
        }
    }

    pub fn store(&self) -> Arc<dyn ValueTableStore> {
        Arc::clone(&self.store)
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Ask every running match to stop after the current turn.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Names of the tables opened so far.
    pub fn open_tables(&self) -> Vec<String> {
        self.tables().keys().cloned().collect()
    }

    fn tables(&self) -> MutexGuard<'_, BTreeMap<String, Arc<dyn ValueTable>>> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open a value table, sharing it if `name` is already open.
    ///
    /// A table that cannot be loaded because it is missing, has other
    /// dimensions or is unreadable is replaced by a fresh one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if `name` is already open with
    /// other dimensions, and any non-recoverable storage error.
    pub fn open_table(
        &self,
        name: &str,
        num_states: u64,
        num_actions: usize,
    ) -> Result<Arc<dyn ValueTable>> {
        let mut tables = self.tables();

        if let Some(table) = tables.get(name) {
            if table.num_states() != num_states || table.num_actions() != num_actions {
                return Err(Error::DimensionMismatch {
                    name: name.to_string(),
                    expected_states: num_states,
                    expected_actions: num_actions,
                    found_states: table.num_states(),
                    found_actions: table.num_actions(),
                });
            }
            debug!(table = name, "sharing open value table");
            return Ok(Arc::clone(table));
        }

        let table = match self.store.load(name, num_states, num_actions) {
            Ok(table) => {
                info!(table = name, backend = self.store.kind(), "loaded value table");
                table
            }
            Err(err) if err.is_recoverable_storage() => {
                debug!(table = name, %err, "creating fresh value table");
                self.store.create(name, num_states, num_actions)?
            }
            Err(err) => return Err(err),
        };

        tables.insert(name.to_string(), Arc::clone(&table));
        Ok(table)
    }

    /// Build a policy for a match on `board`.
    pub fn build_policy(&self, spec: &PolicySpec, board: &BoardState) -> Result<Box<dyn Policy>> {
        let policy: Box<dyn Policy> = match spec {
            PolicySpec::QLearning { table, params } => {
                let table = self.open_table(table, board.num_states(), board.num_lines())?;
                Box::new(QLearningPolicy::new(table, *params))
            }
            PolicySpec::Simple => Box::new(OrderedPolicy::lowest()),
            PolicySpec::Reverse => Box::new(OrderedPolicy::highest()),
            PolicySpec::Random => Box::new(RandomPolicy::new()),
            PolicySpec::Console => Box::new(ConsolePolicy::stdio(board.width(), board.height())),
        };
        Ok(policy)
    }

    /// Build the `index`-th match of a simulation.
    ///
    /// Learning policies take the configured successor value; every policy
    /// and the match itself are seeded when a seed is known.
    pub fn build_match(&self, config: &SimulationConfig, index: usize) -> Result<Match> {
        let board = BoardState::new(config.width, config.height)?;
        let specs = config
            .pairings()
            .nth(index)
            .ok_or_else(|| Error::InvalidConfiguration {
                message: format!("no policies for match {index}"),
            })?;

        let seed = config.seed.or(self.default_seed);
        let mut policies = Vec::with_capacity(specs.len());
        for (seat, spec) in specs.iter().enumerate() {
            let spec = match spec {
                PolicySpec::QLearning { table, params } => PolicySpec::QLearning {
                    table: table.clone(),
                    params: params.with_successor(config.successor),
                },
                other => other.clone(),
            };
            let mut policy = self.build_policy(&spec, &board)?;
            if let Some(seed) = seed {
                policy.set_rng_seed(policy_seed(seed, index, seat));
            }
            policies.push(policy);
        }

        let mut match_config = config.match_config(index);
        if match_config.seed.is_none() {
            match_config.seed = seed.map(|s| s.wrapping_add(index as u64));
        }

        Ok(Match::new(board, policies, match_config)?.with_cancel_token(self.cancel_token()))
    }

    /// Run matches side by side, one thread each.
    ///
    /// Results are returned in the order the matches were given.
    pub fn run_matches(&self, matches: Vec<Match>) -> Vec<Result<MatchResult>> {
        thread::scope(|scope| {
            let handles: Vec<_> = matches
                .into_iter()
                .map(|mut game| {
                    let label = game.label().to_string();
                    (label, scope.spawn(move || game.run()))
                })
                .collect();

            handles
                .into_iter()
                .map(|(label, handle)| {
                    handle
                        .join()
                        .unwrap_or(Err(Error::MatchPanicked { label }))
                })
                .collect()
        })
    }

    /// Persist every open table.
    ///
    /// Failures are logged and reported, never retried, and do not keep the
    /// remaining tables from being persisted.
    pub fn shutdown(&self) -> ShutdownReport {
        let tables = self.tables();
        let mut report = ShutdownReport::default();

        for (name, table) in tables.iter() {
            match table.persist() {
                Ok(()) => {
                    debug!(table = %name, "persisted value table");
                    report.persisted.push(name.clone());
                }
                Err(err) => {
                    warn!(table = %name, %err, "failed to persist value table");
                    report.failed.push((name.clone(), err.to_string()));
                }
            }
        }

        report
    }
}

impl Default for AppContext {
    fn default() -> Self {
        Self::new()
    }
}

fn policy_seed(seed: u64, match_index: usize, seat: usize) -> u64 {
    seed.wrapping_mul(31)
        .wrapping_add((match_index as u64) << 8)
        .wrapping_add(seat as u64 + 1)
}

/// Builder for [`AppContext`]
pub struct AppContextBuilder {
    store: Option<Arc<dyn ValueTableStore>>,
    cancel: Option<CancelToken>,
    default_seed: Option<u64>,
}

impl AppContextBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            cancel: None,
            default_seed: None,
        }
    }

    pub fn with_store<S: ValueTableStore + 'static>(mut self, store: S) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    /// Use a store chosen at runtime.
    pub fn with_shared_store(mut self, store: Arc<dyn ValueTableStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Seed used for policies and matches when the configuration has none.
    pub fn with_default_seed(mut self, seed: u64) -> Self {
        self.default_seed = Some(seed);
        self
    }

    /// If no store was specified, uses a [`DenseTableStore`] on the working
    /// directory.
    pub fn build(self) -> AppContext {
        AppContext {
            store: self
                .store
                .unwrap_or_else(|| Arc::new(DenseTableStore::new())),
            tables: Mutex::new(BTreeMap::new()),
            cancel: self.cancel.unwrap_or_default(),
            default_seed: self.default_seed,
        }
    }
}

impl Default for AppContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}
