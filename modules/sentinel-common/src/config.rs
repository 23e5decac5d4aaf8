use std::env;
use std::time::Duration;

use alloy_primitives::Address;
use tracing::info;

use crate::error::SentinelError;

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";
const DEFAULT_POLLING_DELAY_MS: u64 = 10_000;
const DEFAULT_ERROR_RETRIES_TIMEOUT_MS: u64 = 1_000;

/// Log line format selected by `LOG_FORMAT`. The binary installs its
/// subscriber from this value once the configuration has loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Bot configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Chain
    pub rpc_url: String,
    pub contract_address: Address,
    pub account: Address,
    pub starting_block: u64,

    // Loop
    pub polling_delay: Duration,
    pub error_retries: u32,
    pub error_retries_timeout: Duration,

    // Collaborators
    pub price_feed_config: serde_json::Value,
    pub engine_config: Option<serde_json::Value>,

    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, SentinelError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key/value source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SentinelError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let price_feed_config = parse_json("PRICE_FEED_CONFIG", &required(&get, "PRICE_FEED_CONFIG")?)?;
        if !price_feed_config.is_object() {
            return Err(SentinelError::Config(
                "PRICE_FEED_CONFIG must be a JSON object".to_string(),
            ));
        }

        let engine_config = match get("LIQUIDATOR_CONFIG") {
            Some(raw) => match parse_json("LIQUIDATOR_CONFIG", &raw)? {
                serde_json::Value::Null => None,
                value => Some(value),
            },
            None => None,
        };

        let log_format = match get("LOG_FORMAT").as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(SentinelError::Config(format!(
                    "LOG_FORMAT must be 'text' or 'json', got '{other}'"
                )))
            }
        };

        Ok(Self {
            rpc_url: get("RPC_URL").unwrap_or_else(|| DEFAULT_RPC_URL.to_string()),
            contract_address: parse_address("EMP_ADDRESS", &required(&get, "EMP_ADDRESS")?)?,
            account: parse_address("BOT_ACCOUNT", &required(&get, "BOT_ACCOUNT")?)?,
            starting_block: parse_number(&get, "STARTING_BLOCK", 0)?,
            polling_delay: Duration::from_millis(parse_number(
                &get,
                "POLLING_DELAY",
                DEFAULT_POLLING_DELAY_MS,
            )?),
            error_retries: parse_number(&get, "ERROR_RETRIES", 0)?,
            error_retries_timeout: Duration::from_millis(parse_number(
                &get,
                "ERROR_RETRIES_TIMEOUT",
                DEFAULT_ERROR_RETRIES_TIMEOUT_MS,
            )?),
            price_feed_config,
            engine_config,
            log_format,
        })
    }

    /// A polling delay of zero means "run one iteration and exit".
    pub fn single_shot(&self) -> bool {
        self.polling_delay.is_zero()
    }

    /// Log the loaded configuration without leaking the RPC URL's credentials.
    pub fn log_redacted(&self) {
        info!(
            rpc_url = redact_url(&self.rpc_url).as_str(),
            contract = %self.contract_address,
            account = %self.account,
            starting_block = self.starting_block,
            polling_delay_ms = self.polling_delay.as_millis() as u64,
            single_shot = self.single_shot(),
            error_retries = self.error_retries,
            error_retries_timeout_ms = self.error_retries_timeout.as_millis() as u64,
            price_feed = %self.price_feed_config,
            engine_configured = self.engine_config.is_some(),
            log_format = ?self.log_format,
            "Loaded configuration"
        );
    }
}

fn required<F>(get: &F, key: &str) -> Result<String, SentinelError>
where
    F: Fn(&str) -> Option<String>,
{
    get(key).ok_or_else(|| SentinelError::Config(format!("{key} environment variable is required")))
}

fn parse_number<F, T>(get: &F, key: &str, default: T) -> Result<T, SentinelError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| SentinelError::Config(format!("{key} must be a number: {e}"))),
        None => Ok(default),
    }
}

fn parse_address(key: &str, raw: &str) -> Result<Address, SentinelError> {
    raw.trim()
        .parse()
        .map_err(|e| SentinelError::Config(format!("{key} is not a valid address: {e}")))
}

fn parse_json(key: &str, raw: &str) -> Result<serde_json::Value, SentinelError> {
    serde_json::from_str(raw).map_err(|e| SentinelError::Config(format!("{key} is not valid JSON: {e}")))
}

/// Keep scheme and host; drop userinfo, path and query (API keys live there).
fn redact_url(url: &str) -> String {
    let (scheme, rest) = match url.split_once("://") {
        Some((scheme, rest)) => (scheme, rest),
        None => return "<redacted>".to_string(),
    };
    let authority = rest.split('/').next().unwrap_or_default();
    let host = authority.rsplit('@').next().unwrap_or_default();
    let has_secret = authority.contains('@') || rest.len() > authority.len();
    if has_secret {
        format!("{scheme}://{host}/<redacted>")
    } else {
        format!("{scheme}://{host}")
    }
}
