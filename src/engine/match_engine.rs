//! One match: a fixed number of rounds between policies sharing a board

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, trace, warn};

use super::{
    cancel::CancelToken,
    rewards::RewardSchedule,
    scoreboard::{Scoreboard, Standing},
};
use crate::{
    Error, Result,
    grid::BoardState,
    ports::{Action, MatchEvent, MatchObserver, Policy},
};

/// Match configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchConfig {
    pub rounds: usize,

    /// Log standings every this many rounds; `None` reports only at the end.
    pub report_interval: Option<usize>,

    /// Seed for the choice of starting policy.
    pub seed: Option<u64>,

    pub rewards: RewardSchedule,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            rounds: 1,
            report_interval: None,
            seed: None,
            rewards: RewardSchedule::default(),
        }
    }
}

impl MatchConfig {
    pub fn with_rounds(mut self, rounds: usize) -> Self {
        self.rounds = rounds;
        self
    }

    pub fn with_report_interval(mut self, interval: usize) -> Self {
        self.report_interval = Some(interval).filter(|&i| i > 0);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_rewards(mut self, rewards: RewardSchedule) -> Self {
        self.rewards = rewards;
        self
    }
}

/// How a single round ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundOutcome {
    pub starter: usize,
    pub boxes: Vec<u32>,
    pub winners: Vec<usize>,
    /// Seat that received the win.
    pub credited: usize,
    pub tied: bool,
}

/// Final tally of a match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub rounds_played: usize,
    /// True if a policy aborted or the match was cancelled.
    pub aborted: bool,
    pub standings: Vec<Standing>,
}

impl MatchResult {
    pub fn wins(&self, seat: usize) -> usize {
        self.standings.get(seat).map_or(0, |s| s.wins)
    }
}

fn build_rng(seed: Option<u64>) -> StdRng {
    if let Some(seed) = seed {
        StdRng::seed_from_u64(seed)
    } else {
        StdRng::from_rng(&mut rand::rng())
    }
}

/// Drives rounds between policies in round-robin turn order
///
/// A policy that completes a box moves again. After every turn the policy
/// receives feedback for its previous decision just before it decides
/// again; the last decision of a round is judged by the end-of-round
/// reward.
pub struct Match {
    label: String,
    board: BoardState,
    policies: Vec<Box<dyn Policy>>,
    scoreboard: Scoreboard,
    config: MatchConfig,
    observers: Vec<Box<dyn MatchObserver>>,
    cancel: CancelToken,
    rng: StdRng,
    rounds_played: usize,
}

impl Match {
    /// Create a match on `board`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] with fewer than two policies.
    pub fn new(board: BoardState, policies: Vec<Box<dyn Policy>>, config: MatchConfig) -> Result<Self> {
        if policies.len() < 2 {
            return Err(Error::InvalidConfiguration {
                message: format!("a match needs at least two policies, got {}", policies.len()),
            });
        }

        let scoreboard = Scoreboard::new(policies.iter().map(|p| p.name().to_string()));
        let label = policies
            .iter()
            .map(|p| p.name())
            .collect::<Vec<_>>()
            .join(" vs ");

        Ok(Self {
            label,
            board,
            policies,
            scoreboard,
            rng: build_rng(config.seed),
            config,
            observers: Vec::new(),
            cancel: CancelToken::new(),
            rounds_played: 0,
        })
    }

    pub fn with_observer(mut self, observer: Box<dyn MatchObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn board(&self) -> &BoardState {
        &self.board
    }

    pub fn scoreboard(&self) -> &Scoreboard {
        &self.scoreboard
    }

    pub fn rounds_played(&self) -> usize {
        self.rounds_played
    }

    /// Play every configured round, then shut the policies down.
    ///
    /// An abort from a policy or a cancelled token ends the match early
    /// with `aborted` set; the rounds finished so far still count.
    ///
    /// # Errors
    ///
    /// Returns any other error raised by a policy or the board. Policies
    /// are shut down in that case too.
    pub fn run(&mut self) -> Result<MatchResult> {
        let span = info_span!("match", label = %self.label);
        let _entered = span.enter();

        self.publish(MatchEvent::MatchStarted {
            rounds: self.config.rounds,
            policies: self.policies.iter().map(|p| p.name().to_string()).collect(),
            width: self.board.width(),
            height: self.board.height(),
        });

        let mut aborted = false;
        let mut failure = None;

        for round in 0..self.config.rounds {
            let report_due = self
                .config
                .report_interval
                .is_some_and(|interval| round > 0 && round.is_multiple_of(interval));
            if report_due {
                self.report(round);
            }

            trace!(round, "playing new round");
            match self.play_round(round) {
                Ok(_) => self.rounds_played += 1,
                Err(err) if err.is_interruption() => {
                    debug!(%err, "exiting match");
                    aborted = true;
                    break;
                }
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }

        self.report(self.rounds_played);

        for policy in &mut self.policies {
            policy.shutdown();
        }

        self.publish(MatchEvent::MatchFinished {
            rounds_played: self.rounds_played,
            aborted,
        });

        if let Some(err) = failure {
            return Err(err);
        }

        Ok(MatchResult {
            rounds_played: self.rounds_played,
            aborted,
            standings: self.scoreboard.standings(self.rounds_played),
        })
    }

    /// Play one round from an empty board.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Aborted`] when a policy answers with the abort
    /// action, [`Error::Cancelled`] when the cancel token is set between
    /// turns, and propagates policy errors.
    pub fn play_round(&mut self, round: usize) -> Result<RoundOutcome> {
        let seats = self.policies.len();
        let rewards = self.config.rewards;

        self.board.reset();
        self.scoreboard.reset_boxes();

        let starter = self.rng.random_range(0..seats);
        self.publish(MatchEvent::RoundStarted { round, starter });

        // Boxes completed by each seat's most recent turn, not yet judged.
        let mut pending: Vec<Option<u32>> = vec![None; seats];
        let mut seat = starter;

        while !self.board.is_terminal() {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let state = self.board.identifier();
            let available = self.board.available_lines();
            let policy = &mut self.policies[seat];

            if let Some(boxes) = pending[seat] {
                policy.observe_feedback(rewards.turn_reward(boxes), state, Some(&available))?;
            }

            let mut action = policy.select_action(state, &available)?;
            let line = loop {
                match action {
                    Action::Line(line) if available.binary_search(&line).is_ok() => break line,
                    Action::Abort => {
                        return Err(Error::Aborted {
                            policy: policy.name().to_string(),
                        });
                    }
                    Action::Line(line) => {
                        debug!(policy = policy.name(), line, "illegal line, penalising");
                        policy.observe_feedback(rewards.illegal, state, Some(&available))?;
                        action = policy.select_action(state, &available)?;
                    }
                }
            };

            let boxes = self.board.apply_action(line)?;
            pending[seat] = Some(boxes);

            self.publish(MatchEvent::LinePlaced {
                round,
                policy: seat,
                line,
                boxes,
                board: self.board.snapshot(),
            });

            if boxes > 0 {
                self.scoreboard.add_boxes(seat, boxes);
                self.publish(MatchEvent::ScoresChanged {
                    round,
                    boxes: self.scoreboard.boxes(),
                });
            } else {
                seat = (seat + 1) % seats;
            }
        }

        let winners = self.scoreboard.round_winners();
        let tied = winners.len() != 1;
        // On a tie the seat that would move last in turn order takes the round.
        let credited = if tied {
            (starter + seats - 1) % seats
        } else {
            winners[0]
        };
        self.scoreboard.record_win(credited);

        let terminal = self.board.identifier();
        for (index, policy) in self.policies.iter_mut().enumerate() {
            let last_turn = pending[index].map_or(0.0, |boxes| rewards.turn_reward(boxes));
            let reward = rewards.end_reward(index == credited) + last_turn;
            policy.observe_feedback(reward, terminal, None)?;
        }

        debug!(
            round,
            winner = self.policies[credited].name(),
            boxes = ?self.scoreboard.boxes(),
            tied,
            "round finished"
        );
        self.publish(MatchEvent::RoundFinished {
            round,
            winners: winners.clone(),
            credited,
            tied,
        });

        Ok(RoundOutcome {
            starter,
            boxes: self.scoreboard.boxes(),
            winners,
            credited,
            tied,
        })
    }

    fn report(&mut self, rounds_played: usize) {
        let standings = self.scoreboard.standings(rounds_played);
        for standing in &standings {
            info!("{standing}");
        }
        self.publish(MatchEvent::Standings {
            rounds_played,
            standings,
        });
    }

    fn publish(&mut self, event: MatchEvent) {
        for observer in &mut self.observers {
            if let Err(err) = observer.publish(&event) {
                warn!(%err, "observer failed, continuing match");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::policies::OrderedPolicy;

    /// Records every line and every reward it receives
    struct Scripted {
        lines: Vec<Action>,
        rewards: Arc<Mutex<Vec<(f32, bool)>>>,
    }

    impl Policy for Scripted {
        fn select_action(&mut self, _state: u64, available: &[usize]) -> Result<Action> {
            if self.lines.is_empty() {
                return Ok(Action::Line(available[0]));
            }
            Ok(self.lines.remove(0))
        }

        fn observe_feedback(
            &mut self,
            reward: f32,
            _new_state: u64,
            available: Option<&[usize]>,
        ) -> Result<()> {
            self.rewards
                .lock()
                .unwrap()
                .push((reward, available.is_none()));
            Ok(())
        }

        fn name(&self) -> &str {
            "Scripted"
        }
    }

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
    fn test_requires_two_policies() {
        let board = BoardState::new(2, 2).unwrap();
        let policies: Vec<Box<dyn Policy>> = vec![Box::new(OrderedPolicy::lowest())];
        assert!(Match::new(board, policies, MatchConfig::default()).is_err());
    }

    #[test]
    fn test_smallest_grid_credits_last_placer() {
        let board = BoardState::new(2, 2).unwrap();
        let mut game = Match::new(board, lowest_pair(), MatchConfig::default().with_seed(5)).unwrap();

        let outcome = game.play_round(0).unwrap();

        // Lines alternate seats and the fourth closes the only box.
        let last = (outcome.starter + 1) % 2;
        assert_eq!(outcome.winners, vec![last]);
        assert_eq!(outcome.credited, last);
        assert!(!outcome.tied);
        assert_eq!(outcome.boxes.iter().sum::<u32>(), 1);
        assert!(game.board().is_terminal());
    }

    #[test]
    fn test_illegal_line_is_penalised_then_retried() {
        let rewards = Arc::new(Mutex::new(Vec::new()));
        let scripted = Scripted {
            lines: vec![Action::Line(99), Action::Line(0)],
            rewards: rewards.clone(),
        };
        let policies: Vec<Box<dyn Policy>> = vec![Box::new(scripted), Box::new(OrderedPolicy::lowest())];
        let board = BoardState::new(2, 2).unwrap();
        let mut game = Match::new(board, policies, MatchConfig::default()).unwrap();

        game.play_round(0).unwrap();

        let rewards = rewards.lock().unwrap();
        // The illegal line was the first decision, whoever started.
        assert!(rewards.contains(&(-100.0, false)));
        assert_eq!(rewards.iter().filter(|(_, end)| *end).count(), 1);
        assert!(game.board().is_terminal());
    }

    #[test]
    fn test_abort_stops_match_and_keeps_finished_rounds() {
        let scripted = Scripted {
            lines: vec![Action::Abort],
            rewards: Arc::default(),
        };
        let policies: Vec<Box<dyn Policy>> = vec![Box::new(scripted), Box::new(OrderedPolicy::lowest())];
        let board = BoardState::new(3, 3).unwrap();
        let mut game = Match::new(board, policies, MatchConfig::default().with_rounds(10)).unwrap();

        let result = game.run().unwrap();
        assert!(result.aborted);
        assert_eq!(result.rounds_played, 0);
        assert_eq!(result.standings.len(), 2);
    }

    #[test]
    fn test_cancelled_token_stops_before_first_turn() {
        let token = CancelToken::new();
        token.cancel();
        let board = BoardState::new(3, 3).unwrap();
        let mut game = Match::new(board, lowest_pair(), MatchConfig::default().with_rounds(3))
            .unwrap()
            .with_cancel_token(token);

        let result = game.run().unwrap();
        assert!(result.aborted);
        assert_eq!(result.rounds_played, 0);
    }

    #[test]
    fn test_every_round_is_credited_once() {
        let board = BoardState::new(3, 3).unwrap();
        let config = MatchConfig::default().with_rounds(25).with_seed(11);
        let mut game = Match::new(board, lowest_pair(), config).unwrap();

        let result = game.run().unwrap();
        assert!(!result.aborted);
        assert_eq!(result.rounds_played, 25);
        assert_eq!(result.wins(0) + result.wins(1), 25);
        for standing in &result.standings {
            assert_eq!(standing.wins + standing.losses, 25);
        }
    }

    #[test]
    fn test_events_follow_play() {
        let recorder = Recorder::default();
        let board = BoardState::new(2, 2).unwrap();
        let config = MatchConfig::default().with_rounds(2).with_report_interval(1);
        let mut game = Match::new(board, lowest_pair(), config)
            .unwrap()
            .with_observer(Box::new(recorder.clone()));

        game.run().unwrap();

        let events = recorder.0.lock().unwrap();
        let placed = events
            .iter()
            .filter(|e| matches!(e, MatchEvent::LinePlaced { .. }))
            .count();
        let standings = events
            .iter()
            .filter(|e| matches!(e, MatchEvent::Standings { .. }))
            .count();
        assert_eq!(placed, 8);
        // One periodic report after the first round, one final.
        assert_eq!(standings, 2);
        assert!(matches!(events.first(), Some(MatchEvent::MatchStarted { .. })));
        assert!(matches!(
            events.last(),
            Some(MatchEvent::MatchFinished {
                rounds_played: 2,
                aborted: false
            })
        ));
    }
}
