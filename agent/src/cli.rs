//! CLI argument parsing for the surf agent.
//!
//! Every setting can come from a flag or from its environment variable. The
//! key=value store named by `--env-file` is loaded into the environment and
//! the arguments are parsed again, so the file is the lowest-priority source.

use crate::questions::{DEFAULT_LLM_BASE_URL, DEFAULT_LLM_MODEL};
use chrono_tz::Tz;
use clap::{Args, Parser, Subcommand, ValueHint};
use cron::Schedule;
use rand::Rng;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use surf_chat::{SessionType, DEFAULT_SURF_HOST};

pub const DEFAULT_ENV_FILE: &str = ".env";
pub const DEFAULT_SCHEDULE_CRON: &str = "0 0 8 * * *";
pub const DEFAULT_SCHEDULE_TIMEZONE: &str = "Asia/Shanghai";

/// Surf agent - daily crypto questions for Surf AI
///
/// Gathers the day's crypto news, turns it into questions with an LLM and asks
/// each one to Surf over a streaming chat session, once or on a schedule.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct AgentArgs {
    /// Key=value file holding credentials and settings
    #[arg(
        long = "env-file",
        env = "APP_ENV_FILE",
        default_value = DEFAULT_ENV_FILE,
        value_hint = ValueHint::FilePath,
        global = true
    )]
    pub env_file: PathBuf,

    /// Also write logs to a timestamped file in this directory
    #[arg(long = "log-dir", env = "LOG_DIR", value_hint = ValueHint::DirPath, global = true)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub settings: Settings,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Run once now, then exit
    Run,
    /// Run on the configured cron schedule until interrupted (default)
    Schedule,
    /// Write a configuration template and store credentials
    Init,
}

#[derive(Args, Debug, Clone)]
pub struct Settings {
    /// Access token for the chat service
    #[arg(long = "access-token", env = "ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Refresh token used to renew the access token
    #[arg(long = "refresh-token", env = "REFRESH_TOKEN", hide_env_values = true)]
    pub refresh_token: Option<String>,

    /// Device id sent alongside token refreshes
    #[arg(long = "device-id", env = "DEVICE_ID")]
    pub device_id: Option<String>,

    /// Chat mode: V2, V2_INSTANT or V2_THINKING
    #[arg(
        long = "session-type",
        env = "SESSION_TYPE",
        value_parser = parse_session_type,
        default_value = "V2"
    )]
    pub session_type: SessionType,

    /// Questions per run, "min,max" or a single number
    #[arg(
        long = "question-count",
        env = "QUESTION_COUNT_RANGE",
        value_parser = parse_question_count,
        default_value = "1,1"
    )]
    pub question_count: InclusiveRange,

    /// Minutes to wait between questions, "min,max" or a single number
    #[arg(long = "question-interval", env = "QUESTION_INTERVAL_RANGE")]
    pub question_interval: Option<InclusiveRange>,

    /// API key for the question-writing model
    #[arg(long = "llm-api-key", env = "LLM_API_KEY", hide_env_values = true)]
    pub llm_api_key: Option<String>,

    /// OpenAI-compatible API base URL
    #[arg(
        long = "llm-api-base-url",
        env = "LLM_API_BASE_URL",
        default_value = DEFAULT_LLM_BASE_URL,
        value_hint = ValueHint::Url
    )]
    pub llm_api_base_url: String,

    /// Model used to write questions
    #[arg(long = "llm-model", env = "LLM_MODEL", default_value = DEFAULT_LLM_MODEL)]
    pub llm_model: String,

    /// Cron expression with a seconds field
    #[arg(
        long = "schedule-cron",
        env = "SCHEDULE_CRON",
        value_parser = parse_cron,
        default_value = DEFAULT_SCHEDULE_CRON
    )]
    pub schedule_cron: Schedule,

    /// IANA timezone the cron expression is evaluated in
    #[arg(
        long = "schedule-timezone",
        env = "SCHEDULE_TIMEZONE",
        value_parser = parse_timezone,
        default_value = DEFAULT_SCHEDULE_TIMEZONE
    )]
    pub schedule_timezone: Tz,

    /// Host serving the chat service
    #[arg(
        long = "surf-host",
        env = "SURF_API_HOST",
        default_value = DEFAULT_SURF_HOST,
        value_hint = ValueHint::Hostname
    )]
    pub surf_host: String,

    /// Optional CryptoCompare API key
    #[arg(long = "cryptocompare-api-key", env = "CRYPTOCOMPARE_API_KEY", hide_env_values = true)]
    pub cryptocompare_api_key: Option<String>,
}

/// Inclusive integer range written as `min,max` (or `n` for `n,n`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InclusiveRange {
    pub(crate) min: usize,
    pub(crate) max: usize,
}

impl InclusiveRange {
    pub fn new(min: usize, max: usize) -> Result<Self, String> {
        if min > max {
            return Err(format!("range minimum {min} exceeds maximum {max}"));
        }
        Ok(Self { min, max })
    }

    pub const fn exactly(n: usize) -> Self {
        Self { min: n, max: n }
    }

    /// Uniform over `min..=max`.
    pub fn sample(&self) -> usize {
        rand::rng().random_range(self.min..=self.max)
    }
}

impl FromStr for InclusiveRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |part: &str| {
            part.trim()
                .parse::<usize>()
                .map_err(|_| format!("invalid range bound '{}'; expected a non-negative integer", part.trim()))
        };
        match s.split_once(',') {
            Some((min, max)) => Self::new(parse(min)?, parse(max)?),
            None => parse(s).map(Self::exactly),
        }
    }
}

impl fmt::Display for InclusiveRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.min, self.max)
    }
}

fn parse_question_count(s: &str) -> Result<InclusiveRange, String> {
    let range = InclusiveRange::from_str(s)?;
    if range.min == 0 {
        return Err(format!("invalid QUESTION_COUNT_RANGE '{s}'; at least one question per run"));
    }
    Ok(range)
}

fn parse_session_type(s: &str) -> Result<SessionType, String> {
    SessionType::from_str(s.trim()).map_err(|_| {
        format!(
            "invalid SESSION_TYPE '{}'; expected one of: V2, V2_INSTANT, V2_THINKING",
            s
        )
    })
}

fn parse_cron(s: &str) -> Result<Schedule, String> {
    Schedule::from_str(s.trim()).map_err(|e| format!("invalid SCHEDULE_CRON '{s}': {e}"))
}

fn parse_timezone(s: &str) -> Result<Tz, String> {
    s.trim()
        .parse::<Tz>()
        .map_err(|e| format!("invalid SCHEDULE_TIMEZONE '{s}': {e}"))
}
