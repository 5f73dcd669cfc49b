//! Integration tests for the application context.
//!
//! These tests cover:
//! - Sharing one value table between concurrent matches
//! - Persisting tables on shutdown and resuming them in a new context
//! - Both table backends behind the same contract
//! - Concurrent writers to one cell

use std::{path::Path, sync::Arc, thread};

use tempfile::TempDir;

use dotsnboxes::{
    adapters::{DenseTableStore, DenseValueTable, MappedTableStore, MappedValueTable},
    app::{AppContext, Backend, PolicySpec, SimulationConfig},
    engine::CancelToken,
    ports::{MatchEvent, MatchObserver, UNVISITED, ValueTable, ValueTableStore},
};

/// Cancels every match of the context once a round has finished
struct CancelAfterRound {
    round: usize,
    cancel: CancelToken,
}

impl MatchObserver for CancelAfterRound {
    fn publish(&mut self, event: &MatchEvent) -> dotsnboxes::Result<()> {
        if let MatchEvent::RoundFinished { round, .. } = event {
            if *round == self.round {
                self.cancel.cancel();
            }
        }
        Ok(())
    }
}

fn store_for(backend: Backend, root: &Path) -> Arc<dyn ValueTableStore> {
    match backend {
        Backend::Dense => Arc::new(DenseTableStore::with_root(root)),
        Backend::Mapped => Arc::new(MappedTableStore::with_root(root)),
    }
}

fn config(dir: &TempDir, backend: Backend, policies: &[&str]) -> SimulationConfig {
    SimulationConfig {
        rounds: 30,
        width: 3,
        height: 2,
        seed: Some(9),
        backend,
        table_dir: Some(dir.path().to_path_buf()),
        policies: policies.iter().map(|s| s.parse().unwrap()).collect(),
        ..SimulationConfig::default()
    }
}

#[test]
fn test_concurrent_matches_share_one_table() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = config(
        &temp_dir,
        Backend::Dense,
        &[
            "QLearningAgent:true:shared.dat",
            "SimpleAgent",
            "QLearningAgent:true:shared.dat",
            "RandomAgent",
            "ReverseAgent",
            "QLearningAgent:false:frozen.dat",
        ],
    );
    config.validate().unwrap();

    let app = AppContext::from_config(&config);
    let matches = (0..3)
        .map(|index| app.build_match(&config, index).unwrap())
        .collect();
    let results = app.run_matches(matches);

    assert_eq!(results.len(), 3);
    for result in &results {
        let result = result.as_ref().unwrap();
        assert_eq!(result.rounds_played, 30);
        assert!(!result.aborted);
    }
    assert_eq!(results[0].as_ref().unwrap().standings[1].name, "SimpleAgent");
    assert_eq!(results[1].as_ref().unwrap().standings[1].name, "RandomAgent");
    assert_eq!(results[2].as_ref().unwrap().standings[0].name, "ReverseAgent");

    assert_eq!(
        app.open_tables(),
        vec!["frozen.dat".to_string(), "shared.dat".to_string()]
    );

    let report = app.shutdown();
    assert!(report.is_clean());
    assert_eq!(report.persisted.len(), 2);
    assert!(temp_dir.path().join("shared.dat").exists());
}

#[test]
fn test_tables_resume_after_shutdown() {
    for backend in [Backend::Dense, Backend::Mapped] {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config = config(&temp_dir, backend, &["QLearningAgent:true:q1.dat", "ReverseAgent"]);

        let snapshot: Vec<f32> = {
            let app = AppContext::from_config(&config);
            let game = app.build_match(&config, 0).unwrap();
            app.run_matches(vec![game]).remove(0).unwrap();

            let table = app.open_table("q1.dat", 128, 7).unwrap();
            let values = (0..128)
                .flat_map(|state| (0..7).map(move |action| (state, action)))
                .map(|(state, action)| table.value(state, action))
                .collect();
            assert!(app.shutdown().is_clean());
            values
        };
        assert!(snapshot.iter().any(|&v| v != UNVISITED));

        let store = store_for(backend, temp_dir.path());
        let reloaded = store.load("q1.dat", 128, 7).unwrap();
        for state in 0..128u64 {
            for action in 0..7 {
                assert_eq!(
                    reloaded.value(state, action),
                    snapshot[state as usize * 7 + action],
                    "{backend:?} cell ({state}, {action})"
                );
            }
        }
    }
}

#[test]
fn test_frozen_policy_leaves_table_untouched() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = config(
        &temp_dir,
        Backend::Dense,
        &["QLearningAgent:false:frozen.dat:0.5:0.8:0.3", "RandomAgent"],
    );

    let app = AppContext::from_config(&config);
    let game = app.build_match(&config, 0).unwrap();
    app.run_matches(vec![game]).remove(0).unwrap();

    let table = app.open_table("frozen.dat", 128, 7).unwrap();
    for state in 0..128 {
        for action in 0..7 {
            assert_eq!(table.value(state, action), UNVISITED);
        }
    }
}

#[test]
fn test_policies_round_trip_through_config_json() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = config(&temp_dir, Backend::Mapped, &["q:true:a.dat:0.25:0.5:0.1", "simple"]);

    let json = serde_json::to_string(&config).unwrap();
    let parsed: SimulationConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.policies, config.policies);
    assert_eq!(parsed.backend, Backend::Mapped);
    assert_eq!(parsed.policies[1], PolicySpec::Simple);
}

#[test]
fn test_other_dimensions_do_not_clobber_stored_table() {
    for backend in [Backend::Dense, Backend::Mapped] {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let build = || {
            AppContext::builder()
                .with_shared_store(store_for(backend, temp_dir.path()))
                .build()
        };

        {
            let app = build();
            app.open_table("q.dat", 16, 4).unwrap().set_value(2, 3, 8.0);
            assert!(app.shutdown().is_clean());
        }

        // Opened with other dimensions, written to, never shut down.
        {
            let app = build();
            let table = app.open_table("q.dat", 64, 6).unwrap();
            assert_eq!(table.value(2, 3), UNVISITED);
            table.set_value(2, 3, -1.5);
        }

        let reloaded = store_for(backend, temp_dir.path()).load("q.dat", 16, 4).unwrap();
        assert_eq!(reloaded.value(2, 3), 8.0, "{backend:?}");
    }
}

#[test]
fn test_concurrent_updates_to_one_cell_are_not_lost() {
    const THREADS: usize = 8;
    const UPDATES: usize = 1000;

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let tables: Vec<Arc<dyn ValueTable>> = vec![
        Arc::new(DenseValueTable::in_memory("dense", 16, 4).unwrap()),
        Arc::new(MappedValueTable::create("mapped", &temp_dir.path().join("m.dat"), 16, 4).unwrap()),
    ];

    for table in tables {
        thread::scope(|scope| {
            for _ in 0..THREADS {
                let table = Arc::clone(&table);
                scope.spawn(move || {
                    for _ in 0..UPDATES {
                        table.update(5, 2, &mut |value| value + 1.0);
                    }
                });
            }
        });

        let expected = UNVISITED + (THREADS * UPDATES) as f32;
        assert_eq!(table.value(5, 2), expected, "table {}", table.name());
        assert_eq!(table.value(5, 1), UNVISITED);
    }
}

#[test]
fn test_cancelled_run_still_persists_tables() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut config = config(&temp_dir, Backend::Dense, &["QLearningAgent:true:q1.dat", "SimpleAgent"]);
    config.rounds = 1000;

    let app = AppContext::from_config(&config);
    let game = app.build_match(&config, 0).unwrap().with_observer(Box::new(CancelAfterRound {
        round: 4,
        cancel: app.cancel_token(),
    }));
    let result = app.run_matches(vec![game]).remove(0).unwrap();
    assert!(result.aborted);
    assert_eq!(result.rounds_played, 5);

    assert!(app.shutdown().is_clean());
    let reloaded = DenseTableStore::with_root(temp_dir.path())
        .load("q1.dat", 128, 7)
        .unwrap();
    let visited = (0..128u64)
        .flat_map(|state| (0..7).map(move |line| (state, line)))
        .any(|(state, line)| reloaded.value(state, line) != UNVISITED);
    assert!(visited);
}
