//! Simulation configuration and policy specs.

use std::{
    fmt,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::{
    Error, Result,
    engine::{MatchConfig, RewardSchedule},
    grid::BoardState,
    q_learning::{DEFAULT_DISCOUNT_FACTOR, DEFAULT_LEARNING_RATE, LearningParams, SuccessorValue},
};

/// Which [`crate::ports::ValueTableStore`] holds the value tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// In-process array, saved as MessagePack on shutdown.
    #[default]
    Dense,
    /// Memory-mapped file, updated in place.
    Mapped,
}

impl FromStr for Backend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "dense" | "array" => Ok(Backend::Dense),
            "mapped" | "native" | "mmap" => Ok(Backend::Mapped),
            other => Err(Error::InvalidConfiguration {
                message: format!("unknown table backend '{other}'"),
            }),
        }
    }
}

/// Description of one policy, as written on the command line
///
/// The text form is colon separated, for example
/// `QLearningAgent:true:q1.dat:0.5:0.8:0.1` or `SimpleAgent`.
///
/// ```
/// use dotsnboxes::app::PolicySpec;
///
/// let spec: PolicySpec = "QLearningAgent:true:q1.dat".parse()?;
/// assert_eq!(spec.table(), Some("q1.dat"));
///
/// let spec: PolicySpec = "RandomAgent:false:ignored.dat".parse()?;
/// assert_eq!(spec, PolicySpec::Random);
/// # Ok::<(), dotsnboxes::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PolicySpec {
    QLearning {
        table: String,
        params: LearningParams,
    },
    /// Lowest-numbered legal line.
    Simple,
    /// Highest-numbered legal line.
    Reverse,
    Random,
    Console,
}

impl PolicySpec {
    /// Value table name, for learning policies.
    pub fn table(&self) -> Option<&str> {
        match self {
            PolicySpec::QLearning { table, .. } => Some(table),
            _ => None,
        }
    }

    fn invalid(spec: &str, reason: impl Into<String>) -> Error {
        Error::InvalidPolicySpec {
            spec: spec.to_string(),
            reason: reason.into(),
        }
    }

    fn parse_q_learning(spec: &str, fields: &[&str]) -> Result<Self> {
        if fields.len() < 2 {
            return Err(Self::invalid(spec, "expected <training>:<table>"));
        }
        if fields.len() > 5 {
            return Err(Self::invalid(spec, "too many fields"));
        }

        let training = match fields[0] {
            "true" => true,
            "false" => false,
            other => {
                return Err(Self::invalid(
                    spec,
                    format!("training must be 'true' or 'false', got '{other}'"),
                ));
            }
        };

        let table = fields[1].trim();
        if table.is_empty() {
            return Err(Self::invalid(spec, "table name is empty"));
        }

        let number = |index: usize, default: f32, what: &str| -> Result<f32> {
            match fields.get(index) {
                Some(text) => text
                    .trim()
                    .parse::<f32>()
                    .map_err(|_| Self::invalid(spec, format!("{what} '{text}' is not a number"))),
                None => Ok(default),
            }
        };

        let params = LearningParams::default()
            .with_training(training)
            .with_discount_factor(number(2, DEFAULT_DISCOUNT_FACTOR, "discount factor")?)
            .with_learning_rate(number(3, DEFAULT_LEARNING_RATE, "learning rate")?)
            .with_exploration(number(4, 0.0, "exploration quotient")?);
        params.validate().map_err(|err| match err {
            Error::InvalidConfiguration { message } => Self::invalid(spec, message),
            other => other,
        })?;

        Ok(PolicySpec::QLearning {
            table: table.to_string(),
            params,
        })
    }
}

impl FromStr for PolicySpec {
    type Err = Error;

    fn from_str(spec: &str) -> Result<Self> {
        let fields: Vec<&str> = spec.trim().split(':').collect();
        let kind = fields[0].to_ascii_lowercase();

        match kind.as_str() {
            "qlearningagent" | "qlearning" | "q" => Self::parse_q_learning(spec, &fields[1..]),
            "simpleagent" | "simple" => Ok(PolicySpec::Simple),
            "reverseagent" | "reverse" => Ok(PolicySpec::Reverse),
            "randomagent" | "random" => Ok(PolicySpec::Random),
            "consoleagent" | "console" | "human" | "guiagent" => Ok(PolicySpec::Console),
            "" => Err(Self::invalid(spec, "empty policy spec")),
            other => Err(Self::invalid(spec, format!("unknown policy kind '{other}'"))),
        }
    }
}

impl TryFrom<String> for PolicySpec {
    type Error = Error;

    fn try_from(spec: String) -> Result<Self> {
        spec.parse()
    }
}

impl From<PolicySpec> for String {
    fn from(spec: PolicySpec) -> Self {
        spec.to_string()
    }
}

impl fmt::Display for PolicySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicySpec::QLearning { table, params } => write!(
                f,
                "QLearningAgent:{}:{}:{}:{}:{}",
                params.training,
                table,
                params.discount_factor,
                params.learning_rate,
                params.exploration
            ),
            PolicySpec::Simple => write!(f, "SimpleAgent"),
            PolicySpec::Reverse => write!(f, "ReverseAgent"),
            PolicySpec::Random => write!(f, "RandomAgent"),
            PolicySpec::Console => write!(f, "ConsoleAgent"),
        }
    }
}

/// Everything needed to set up and run a simulation
///
/// Policies are paired in order; each pair plays one match and all matches
/// run at the same time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub rounds: usize,
    pub report_interval: Option<usize>,
    pub width: usize,
    pub height: usize,
    pub seed: Option<u64>,
    pub backend: Backend,
    /// Directory value table names are resolved against.
    pub table_dir: Option<PathBuf>,
    pub box_reward: f32,
    pub successor: SuccessorValue,
    pub policies: Vec<PolicySpec>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            rounds: 1,
            report_interval: None,
            width: 3,
            height: 3,
            seed: None,
            backend: Backend::Dense,
            table_dir: None,
            box_reward: 0.0,
            successor: SuccessorValue::TableMax,
            policies: Vec::new(),
        }
    }
}

impl SimulationConfig {
    /// Read a configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| Error::Io {
            operation: format!("open config file {path:?}"),
            source,
        })?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// Check the configuration before anything is built from it.
    pub fn validate(&self) -> Result<()> {
        BoardState::line_count(self.width, self.height)?;

        if self.rounds == 0 {
            return Err(Error::InvalidConfiguration {
                message: "at least one round must be played".to_string(),
            });
        }
        if self.policies.len() < 2 || self.policies.len() % 2 != 0 {
            return Err(Error::InvalidConfiguration {
                message: format!(
                    "policies are paired into matches, got {} (need an even number, at least 2)",
                    self.policies.len()
                ),
            });
        }
        if !self.box_reward.is_finite() {
            return Err(Error::InvalidConfiguration {
                message: format!("box reward {} is not finite", self.box_reward),
            });
        }
        for spec in &self.policies {
            if let PolicySpec::QLearning { params, .. } = spec {
                params.validate()?;
            }
        }
        Ok(())
    }

    /// Policy specs of each match, two per match.
    pub fn pairings(&self) -> impl Iterator<Item = &[PolicySpec]> {
        self.policies.chunks(2)
    }

    pub fn rewards(&self) -> RewardSchedule {
        RewardSchedule::default().with_box_reward(self.box_reward)
    }

    /// Configuration of the `index`-th match.
    ///
    /// Each match draws its starting policies from its own seed.
    pub fn match_config(&self, index: usize) -> MatchConfig {
        let mut config = MatchConfig::default()
            .with_rounds(self.rounds)
            .with_rewards(self.rewards());
        if let Some(interval) = self.report_interval {
            config = config.with_report_interval(interval);
        }
        if let Some(seed) = self.seed {
            config = config.with_seed(seed.wrapping_add(index as u64));
        }
        config
    }
}
