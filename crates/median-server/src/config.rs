use serde::Deserialize;
use thiserror::Error;

const ENV_PREFIX: &str = "MEDIAN_";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unable to read the configuration `{0}`")]
    Env(#[from] envy::Error),
    #[error("`{0}` must be greater than zero")]
    MustBePositive(&'static str),
}

/// Where the numbers come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Whitespace separated integers on standard input.
    Stdin,
    /// `random_count` uniformly drawn integers.
    Random,
}

/// Server settings, read from `MEDIAN_*` environment variables (and `.env`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    #[serde(default)]
    pub deadline_secs: Option<u64>,
    #[serde(default = "default_emit_medians")]
    pub emit_medians: bool,
    #[serde(default = "default_source")]
    pub source: Source,
    #[serde(default = "default_random_count")]
    pub random_count: u64,
    #[serde(default)]
    pub random_seed: Option<u64>,
    #[serde(default = "default_report_interval_secs")]
    pub report_interval_secs: u64,
}

fn default_channel_capacity() -> usize {
    64
}

fn default_emit_medians() -> bool {
    true
}

fn default_source() -> Source {
    Source::Stdin
}

fn default_random_count() -> u64 {
    1000
}

fn default_report_interval_secs() -> u64 {
    5
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is fine.
        dotenv::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config: Config = envy::prefixed(ENV_PREFIX).from_iter(vars)?;
        config.validate()
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.channel_capacity == 0 {
            return Err(ConfigError::MustBePositive("channel_capacity"));
        }
        if self.report_interval_secs == 0 {
            return Err(ConfigError::MustBePositive("report_interval_secs"));
        }
        Ok(self)
    }
}
