use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

/// How a vote that arrives after the interview has already been decided is
/// treated by the vote aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecisionPolicy {
    /// Every vote recomputes the outcome and may move the interview between
    /// `succeeded` and `failed` until no further votes arrive.
    #[default]
    Reevaluate,
    /// The first decisive vote settles the outcome; later votes are only tallied.
    Freeze,
}

impl FromStr for DecisionPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reevaluate" => Ok(Self::Reevaluate),
            "freeze" => Ok(Self::Freeze),
            other => Err(format!("unknown decision policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub api_rps: u32,
    pub piston_api_url: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub adapter_timeout: Duration,
    pub decision_policy: DecisionPolicy,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

const DEFAULT_PISTON_API_URL: &str = "https://emkc.org/api/v2/piston/execute";
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-pro-exp-03-25";

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env_opt("DATABASE_URL"),
            jwt_secret: get_env("JWT_SECRET")?,
            api_rps: get_env_parse_or("API_RPS", 50)?,
            piston_api_url: get_env_opt("PISTON_API_URL")
                .unwrap_or_else(|| DEFAULT_PISTON_API_URL.to_string()),
            gemini_api_key: get_env_opt("GEMINI_API_KEY"),
            gemini_model: get_env_opt("GEMINI_MODEL")
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            adapter_timeout: Duration::from_secs(get_env_parse_or("ADAPTER_TIMEOUT_SECS", 30)?),
            decision_policy: get_env_parse_or("DECISION_POLICY", DecisionPolicy::default())?,
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get_env_opt(name) {
        Some(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        None => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> Result<&'static Config> {
    CONFIG
        .get()
        .ok_or_else(|| Error::Config("Configuration has not been initialized".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_policy_parses_case_insensitively() {
        assert_eq!("Freeze".parse::<DecisionPolicy>(), Ok(DecisionPolicy::Freeze));
        assert_eq!(
            " reevaluate ".parse::<DecisionPolicy>(),
            Ok(DecisionPolicy::Reevaluate)
        );
        assert!("quorum".parse::<DecisionPolicy>().is_err());
    }
}
