//! Acceptance suite configuration.
//!
//! Configuration is loaded from environment variables. Fallback passwords
//! are redacted in Debug output.

use secrecy::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default alias collection endpoint.
pub const DEFAULT_API_URL: &str = "https://goermis.cern.ch/api/v1/aliases";

/// Default CA bundle used to verify the ermis certificate.
pub const DEFAULT_CA_BUNDLE: &str = "/etc/ssl/certs/CERN-bundle.pem";

/// Alias created, mutated and deleted by the scenarios.
pub const DEFAULT_TEST_ALIAS: &str = "test-alias-behave05.cern.ch";

/// Node added to and removed from the test alias.
pub const DEFAULT_TEST_NODE: &str = "test1.cern.ch";

/// Default recipient of the test alarm.
pub const DEFAULT_ALARM_RECIPIENT: &str = "lb-experts@cern.ch";

/// Default threshold of the test alarm.
pub const DEFAULT_ALARM_PARAMETER: u32 = 2;

/// Secrets store CLI used to look up the test account passwords.
pub const DEFAULT_SECRETS_COMMAND: &str = "tbag";

/// Hostgroup under which the secrets store keeps the test accounts.
pub const DEFAULT_SECRETS_HOSTGROUP: &str = "ailbd";

/// Where the saved Kerberos ticket copy lives between scenarios.
pub const DEFAULT_TOKEN_STASH: &str = "/tmp/behave_token";

/// AFS token refresh helper, run after a ticket restore when present.
pub const DEFAULT_AKLOG_PATH: &str = "/usr/bin/aklog";

/// Prefix of the per-user fallback password variables.
const PASSWORD_VAR_PREFIX: &str = "ERMIS_PASSWORD_";

/// Acceptance suite configuration.
#[derive(Clone)]
pub struct Config {
    /// Alias collection URL (e.g. `https://host/api/v1/aliases`).
    pub api_url: String,

    /// PEM bundle trusted for TLS. `None` keeps the built-in roots.
    pub ca_bundle: Option<PathBuf>,

    /// Name of the alias the scenarios operate on.
    pub test_alias: String,

    /// Node used by the node scenarios.
    pub test_node: String,

    pub alarm_recipient: String,

    pub alarm_parameter: u32,

    /// Secrets store CLI, invoked as `<command> show --hg <hostgroup> <user>`.
    pub secrets_command: PathBuf,

    /// Hostgroup passed to `show --hg`.
    pub secrets_hostgroup: String,

    /// Path of the saved ticket copy.
    pub token_stash: PathBuf,

    pub aklog_path: PathBuf,

    /// Per-request timeout. `None` waits indefinitely.
    pub request_timeout: Option<Duration>,

    /// Fallback passwords keyed by lower-case user name.
    pub fallback_passwords: HashMap<String, SecretString>,
}

/// Custom Debug implementation that redacts fallback passwords.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut users: Vec<&String> = self.fallback_passwords.keys().collect();
        users.sort();

        f.debug_struct("Config")
            .field("api_url", &self.api_url)
            .field("ca_bundle", &self.ca_bundle)
            .field("test_alias", &self.test_alias)
            .field("test_node", &self.test_node)
            .field("alarm_recipient", &self.alarm_recipient)
            .field("alarm_parameter", &self.alarm_parameter)
            .field("secrets_command", &self.secrets_command)
            .field("secrets_hostgroup", &self.secrets_hostgroup)
            .field("token_stash", &self.token_stash)
            .field("aklog_path", &self.aklog_path)
            .field("request_timeout", &self.request_timeout)
            .field("fallback_passwords", &users)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid alarm parameter: {0}")]
    InvalidAlarmParameter(String),

    #[error("Invalid request timeout: {0}")]
    InvalidTimeout(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let api_url = vars
            .get("ERMIS_API_URL")
            .cloned()
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        if !api_url.starts_with("https://") && !api_url.starts_with("http://") {
            return Err(ConfigError::InvalidUrl(format!(
                "ERMIS_API_URL must be an http(s) URL, got '{}'",
                api_url
            )));
        }
        let api_url = api_url.trim_end_matches('/').to_string();

        // An explicitly empty value opts out of the custom bundle
        let ca_bundle = match vars.get("ERMIS_CA_BUNDLE") {
            Some(value) if value.is_empty() => None,
            Some(value) => Some(PathBuf::from(value)),
            None => Some(PathBuf::from(DEFAULT_CA_BUNDLE)),
        };

        let alarm_parameter = if let Some(value_str) = vars.get("ERMIS_ALARM_PARAMETER") {
            value_str.parse::<u32>().map_err(|e| {
                ConfigError::InvalidAlarmParameter(format!(
                    "ERMIS_ALARM_PARAMETER must be a non-negative integer, got '{}': {}",
                    value_str, e
                ))
            })?
        } else {
            DEFAULT_ALARM_PARAMETER
        };

        let request_timeout = match vars.get("ERMIS_REQUEST_TIMEOUT_SECONDS") {
            Some(value_str) => {
                let value: u64 = value_str.parse().map_err(|e| {
                    ConfigError::InvalidTimeout(format!(
                        "ERMIS_REQUEST_TIMEOUT_SECONDS must be a valid positive integer, got '{}': {}",
                        value_str, e
                    ))
                })?;

                if value == 0 {
                    return Err(ConfigError::InvalidTimeout(
                        "ERMIS_REQUEST_TIMEOUT_SECONDS must be greater than 0".to_string(),
                    ));
                }

                Some(Duration::from_secs(value))
            }
            None => None,
        };

        let fallback_passwords = vars
            .iter()
            .filter_map(|(key, value)| {
                let user = key.strip_prefix(PASSWORD_VAR_PREFIX)?;
                if user.is_empty() {
                    return None;
                }
                Some((password_key(user), SecretString::from(value.clone())))
            })
            .collect();

        Ok(Self {
            api_url,
            ca_bundle,
            test_alias: string_or(vars, "ERMIS_TEST_ALIAS", DEFAULT_TEST_ALIAS),
            test_node: string_or(vars, "ERMIS_TEST_NODE", DEFAULT_TEST_NODE),
            alarm_recipient: string_or(vars, "ERMIS_ALARM_RECIPIENT", DEFAULT_ALARM_RECIPIENT),
            alarm_parameter,
            secrets_command: PathBuf::from(string_or(
                vars,
                "ERMIS_SECRETS_COMMAND",
                DEFAULT_SECRETS_COMMAND,
            )),
            secrets_hostgroup: string_or(
                vars,
                "ERMIS_SECRETS_HOSTGROUP",
                DEFAULT_SECRETS_HOSTGROUP,
            ),
            token_stash: PathBuf::from(string_or(vars, "ERMIS_TOKEN_STASH", DEFAULT_TOKEN_STASH)),
            aklog_path: PathBuf::from(string_or(vars, "ERMIS_AKLOG_PATH", DEFAULT_AKLOG_PATH)),
            request_timeout,
            fallback_passwords,
        })
    }

    /// Fallback password for `user`, if one was configured.
    pub fn fallback_password(&self, user: &str) -> Option<&SecretString> {
        self.fallback_passwords.get(&password_key(user))
    }

    /// The alarm the alarm scenarios add, as the API expects it on input.
    pub fn test_alarm(&self) -> String {
        format!("minimum:{}:{}", self.alarm_recipient, self.alarm_parameter)
    }
}

/// `ERMIS_PASSWORD_LB_ADMIN`, `lb-admin` and `lb_admin` all name the same user.
fn password_key(user: &str) -> String {
    user.to_lowercase().replace('_', "-")
}

fn string_or(vars: &HashMap<String, String>, key: &str, default: &str) -> String {
    vars.get(key)
        .cloned()
        .unwrap_or_else(|| default.to_string())
}
