//! End-to-end matches between deterministic policies.

use std::sync::{Arc, Mutex};

use dotsnboxes::{
    BoardState, Match, MatchConfig, Result,
    policies::OrderedPolicy,
    ports::{MatchEvent, MatchObserver, Policy},
};

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<MatchEvent>>>);

impl MatchObserver for Recorder {
    fn publish(&mut self, event: &MatchEvent) -> Result<()> {
        self.0.lock().unwrap().push(event.clone());
        Ok(())
    }
}

fn lowest_pair() -> Vec<Box<dyn Policy>> {
    vec![
        Box::new(OrderedPolicy::lowest()),
        Box::new(OrderedPolicy::lowest()),
    ]
}

#[test]
fn test_smallest_grid_single_round() {
    for seed in 0..8 {
        let recorder = Recorder::default();
        let board = BoardState::new(2, 2).unwrap();
        let config = MatchConfig::default().with_rounds(1).with_seed(seed);
        let mut game = Match::new(board, lowest_pair(), config)
            .unwrap()
            .with_observer(Box::new(recorder.clone()));

        let result = game.run().unwrap();
        assert_eq!(result.rounds_played, 1);

        let events = recorder.0.lock().unwrap();
        let placed: Vec<(usize, usize, u32)> = events
            .iter()
            .filter_map(|event| match event {
                MatchEvent::LinePlaced {
                    policy, line, boxes, ..
                } => Some((*policy, *line, *boxes)),
                _ => None,
            })
            .collect();

        assert_eq!(placed.len(), 4);
        assert_eq!(
            placed.iter().map(|(_, line, _)| *line).collect::<Vec<_>>(),
            vec![0, 1, 2, 3]
        );
        assert_eq!(placed.iter().map(|(_, _, boxes)| boxes).sum::<u32>(), 1);

        let (last_placer, _, last_boxes) = placed[3];
        assert_eq!(last_boxes, 1);
        assert_eq!(result.wins(last_placer), 1);
        assert_eq!(result.wins(1 - last_placer), 0);

        let finished = events.iter().find_map(|event| match event {
            MatchEvent::RoundFinished { credited, tied, .. } => Some((*credited, *tied)),
            _ => None,
        });
        assert_eq!(finished, Some((last_placer, false)));
    }
}

#[test]
fn test_every_line_claimed_every_round() {
    let recorder = Recorder::default();
    let board = BoardState::new(4, 3).unwrap();
    let lines = board.num_lines();
    let boxes = board.num_boxes() as u32;
    let config = MatchConfig::default().with_rounds(5).with_seed(3);
    let mut game = Match::new(
        board,
        vec![
            Box::new(OrderedPolicy::lowest()),
            Box::new(OrderedPolicy::highest()),
        ],
        config,
    )
    .unwrap()
    .with_observer(Box::new(recorder.clone()));

    let result = game.run().unwrap();
    assert_eq!(result.rounds_played, 5);

    let events = recorder.0.lock().unwrap();
    let placed = events
        .iter()
        .filter(|e| matches!(e, MatchEvent::LinePlaced { .. }))
        .count();
    assert_eq!(placed, 5 * lines);

    let completed: u32 = events
        .iter()
        .filter_map(|event| match event {
            MatchEvent::LinePlaced { boxes, .. } => Some(*boxes),
            _ => None,
        })
        .sum();
    assert_eq!(completed, 5 * boxes);
}

#[test]
fn test_tie_goes_to_seat_before_starter() {
    // A 3x2 grid has two boxes, so rounds can tie 1-1.
    let recorder = Recorder::default();
    let board = BoardState::new(3, 2).unwrap();
    let config = MatchConfig::default().with_rounds(40).with_seed(17);
    let mut game = Match::new(
        board,
        vec![
            Box::new(OrderedPolicy::lowest()),
            Box::new(OrderedPolicy::highest()),
        ],
        config,
    )
    .unwrap()
    .with_observer(Box::new(recorder.clone()));
    game.run().unwrap();

    let events = recorder.0.lock().unwrap();
    let mut starter = None;
    for event in events.iter() {
        match event {
            MatchEvent::RoundStarted { starter: s, .. } => starter = Some(*s),
            MatchEvent::RoundFinished {
                winners,
                credited,
                tied,
                ..
            } => {
                let starter = starter.expect("round started");
                if *tied {
                    assert_eq!(winners.len(), 2);
                    assert_eq!(*credited, (starter + 1) % 2);
                } else {
                    assert_eq!(winners, &vec![*credited]);
                }
            }
            _ => {}
        }
    }
}
