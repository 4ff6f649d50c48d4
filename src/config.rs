//! Simulation configuration and its environment-based loader.

use crate::{ConfigError, Uint};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Token bucket capacity variable.
pub const TOKEN_BUCKET_CAPACITY: &str = "TOKEN_BUCKET_CAPACITY";
/// Token bucket refill rate variable.
pub const TOKEN_BUCKET_REFILL_RATE: &str = "TOKEN_BUCKET_REFILL_RATE";
/// Leaky bucket capacity variable.
pub const LEAKY_BUCKET_CAPACITY: &str = "LEAKY_BUCKET_CAPACITY";
/// Leaky bucket outflow rate variable.
pub const LEAKY_BUCKET_OUTFLOW_RATE: &str = "LEAKY_BUCKET_OUTFLOW_RATE";

/// Default simulation horizon, in replenishment ticks.
pub const DEFAULT_TICKS: Uint = 10;
/// Default number of synthetic requests.
pub const DEFAULT_REQUESTS: Uint = 50;
/// Default time between two replenishment ticks.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(1);
/// Default time between two request arrivals.
pub const DEFAULT_ARRIVAL_PERIOD: Duration = Duration::from_millis(200);

/// Which rate limiting algorithm to simulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    TokenBucket,
    LeakyBucket,
}

impl Algorithm {
    /// Selector string accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::TokenBucket => "token_bucket",
            Algorithm::LeakyBucket => "leaky_bucket",
        }
    }

    /// Environment variables holding capacity and rate for this algorithm.
    pub fn env_keys(&self) -> (&'static str, &'static str) {
        match self {
            Algorithm::TokenBucket => (TOKEN_BUCKET_CAPACITY, TOKEN_BUCKET_REFILL_RATE),
            Algorithm::LeakyBucket => (LEAKY_BUCKET_CAPACITY, LEAKY_BUCKET_OUTFLOW_RATE),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "token_bucket" => Ok(Algorithm::TokenBucket),
            "leaky_bucket" => Ok(Algorithm::LeakyBucket),
            other => Err(ConfigError::UnknownAlgorithm(other.to_string())),
        }
    }
}

/// Parameters of one simulation run.
///
/// `rate` is the refill rate for a token bucket and the outflow rate for a
/// leaky bucket, both per replenishment tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationConfig {
    pub algorithm: Algorithm,
    /// Maximum tokens held, or maximum requests queued.
    pub capacity: Uint,
    /// Tokens added, or requests drained, per tick.
    pub rate: Uint,
    /// Number of replenishment ticks before the replenishment actor stops.
    pub ticks: Uint,
    /// Number of synthetic requests the arrival actor generates.
    pub requests: Uint,
    /// Suspension between two replenishment ticks.
    pub tick_period: Duration,
    /// Suspension before each request arrival.
    pub arrival_period: Duration,
}

impl SimulationConfig {
    /// Creates a configuration with the default horizon and cadence.
    pub fn new(algorithm: Algorithm, capacity: Uint, rate: Uint) -> Self {
        SimulationConfig {
            algorithm,
            capacity,
            rate,
            ticks: DEFAULT_TICKS,
            requests: DEFAULT_REQUESTS,
            tick_period: DEFAULT_TICK_PERIOD,
            arrival_period: DEFAULT_ARRIVAL_PERIOD,
        }
    }

    pub fn with_ticks(mut self, ticks: Uint) -> Self {
        self.ticks = ticks;
        self
    }

    pub fn with_requests(mut self, requests: Uint) -> Self {
        self.requests = requests;
        self
    }

    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period;
        self
    }

    pub fn with_arrival_period(mut self, period: Duration) -> Self {
        self.arrival_period = period;
        self
    }

    /// Checks that every count is positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::NonPositive("capacity"));
        }
        if self.rate == 0 {
            return Err(ConfigError::NonPositive("rate"));
        }
        if self.ticks == 0 {
            return Err(ConfigError::NonPositive("ticks"));
        }
        if self.requests == 0 {
            return Err(ConfigError::NonPositive("requests"));
        }
        Ok(())
    }

    /// Loads capacity and rate for `selector` from the process environment.
    ///
    /// See [`from_lookup`](Self::from_lookup) for the variables read.
    pub fn from_env(selector: &str) -> Result<Self, ConfigError> {
        Self::from_lookup(selector, |key| std::env::var(key).ok())
    }

    /// Loads capacity and rate for `selector` through `lookup`.
    ///
    /// `token_bucket` reads `TOKEN_BUCKET_CAPACITY` and `TOKEN_BUCKET_REFILL_RATE`;
    /// `leaky_bucket` reads `LEAKY_BUCKET_CAPACITY` and `LEAKY_BUCKET_OUTFLOW_RATE`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use rate_guard_sim::{Algorithm, SimulationConfig};
    ///
    /// let config = SimulationConfig::from_lookup("leaky_bucket", |key| match key {
    ///     "LEAKY_BUCKET_CAPACITY" => Some("3".to_string()),
    ///     "LEAKY_BUCKET_OUTFLOW_RATE" => Some("1".to_string()),
    ///     _ => None,
    /// })
    /// .unwrap();
    ///
    /// assert_eq!(config.algorithm, Algorithm::LeakyBucket);
    /// assert_eq!((config.capacity, config.rate), (3, 1));
    /// ```
    pub fn from_lookup<F>(selector: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let algorithm: Algorithm = selector.parse()?;
        let (capacity_key, rate_key) = algorithm.env_keys();
        let capacity = parse_parameter(capacity_key, lookup(capacity_key))?;
        let rate = parse_parameter(rate_key, lookup(rate_key))?;

        let config = SimulationConfig::new(algorithm, capacity, rate);
        config.validate()?;
        Ok(config)
    }
}

fn parse_parameter(name: &str, value: Option<String>) -> Result<Uint, ConfigError> {
    let value = value.ok_or_else(|| ConfigError::MissingParameter(name.to_string()))?;
    value.trim().parse::<Uint>().map_err(|_| ConfigError::NotNumeric {
        name: name.to_string(),
        value,
    })
}
