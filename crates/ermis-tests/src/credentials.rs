//! Kerberos credential fixtures.
//!
//! Scenarios switch between test accounts with `kinit`, drop credentials
//! with `kdestroy`, and save the operator's own ticket before all that so it
//! can be put back at the end of the run.

use crate::config::Config;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::str::FromStr;
use std::sync::{LazyLock, Mutex, PoisonError};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{info, warn};

/// Ticket and stash files are private to the user.
const TICKET_FILE_MODE: u32 = 0o600;

/// `klist` line naming a file-backed credential cache.
static TICKET_CACHE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^Ticket cache: FILE:(\S+)\s*$").unwrap());

/// Ticket cache found by an earlier scenario, needed again by the restore.
static REMEMBERED_TICKET_CACHE: Mutex<Option<PathBuf>> = Mutex::new(None);

/// Credential fixture errors.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} failed ({status}): {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("No password available for {0}: secrets store lookup failed and no fallback is configured")]
    PasswordUnavailable(String),

    #[error("No file-backed ticket cache in klist output")]
    TicketCacheNotFound,

    #[error("Malformed secret: {0}")]
    SecretFormat(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl CredentialError {
    fn io(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| CredentialError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Egroup whose member the scenario authenticates as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Egroup {
    /// `ermis-lbaas-admins`, superusers of the service.
    LbaasAdmins,
    /// Any account outside the admin egroup.
    Other,
}

impl Egroup {
    /// Test account that belongs to this egroup.
    pub fn principal(&self) -> &'static str {
        match self {
            Egroup::LbaasAdmins => "ermistst",
            Egroup::Other => "ermists",
        }
    }
}

impl FromStr for Egroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ermis-lbaas-admins" => Ok(Egroup::LbaasAdmins),
            "other" => Ok(Egroup::Other),
            other => Err(format!("unknown egroup '{}'", other)),
        }
    }
}

/// Run a command to completion, failing on a non-zero exit.
async fn run(command: &Path, args: &[&str]) -> Result<Output, CredentialError> {
    let name = command.display().to_string();

    let output = Command::new(command)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|source| CredentialError::Spawn {
            command: name.clone(),
            source,
        })?;

    if !output.status.success() {
        return Err(CredentialError::CommandFailed {
            command: name,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(output)
}

/// Decode the secrets store answer, `{"secret": "<base64 password>"}`.
pub fn parse_secret_output(stdout: &[u8]) -> Result<SecretString, CredentialError> {
    #[derive(Deserialize)]
    struct StoredSecret {
        secret: SecretString,
    }

    let stored: StoredSecret = serde_json::from_slice(stdout)
        .map_err(|e| CredentialError::SecretFormat(format!("not a secret record: {}", e)))?;

    let decoded = STANDARD
        .decode(stored.secret.expose_secret().trim())
        .map_err(|e| CredentialError::SecretFormat(format!("secret is not base64: {}", e)))?;

    let password = String::from_utf8(decoded)
        .map_err(|_| CredentialError::SecretFormat("secret is not UTF-8".to_string()))?;

    Ok(SecretString::from(password))
}

async fn lookup_secret(config: &Config, user: &str) -> Result<SecretString, CredentialError> {
    let output = run(
        &config.secrets_command,
        &["show", "--hg", &config.secrets_hostgroup, user],
    )
    .await?;

    // Anything on stderr means the lookup did not go through cleanly
    if !output.stderr.is_empty() {
        return Err(CredentialError::CommandFailed {
            command: config.secrets_command.display().to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    parse_secret_output(&output.stdout)
}

/// Password of a test account.
///
/// Asks the secrets store first and falls back to the configured
/// `ERMIS_PASSWORD_<USER>` value.
pub async fn fetch_password(config: &Config, user: &str) -> Result<SecretString, CredentialError> {
    match lookup_secret(config, user).await {
        Ok(password) => {
            info!(user = %user, "Got the password from the secrets store");
            Ok(password)
        }
        Err(e) => {
            warn!(user = %user, error = %e, "Secrets store lookup failed, trying configured password");
            config
                .fallback_password(user)
                .cloned()
                .ok_or_else(|| CredentialError::PasswordUnavailable(user.to_string()))
        }
    }
}

/// Obtain a ticket for `principal`, feeding the password on stdin.
pub async fn kinit(principal: &str, password: &SecretString) -> Result<(), CredentialError> {
    let mut child = Command::new("kinit")
        .arg(principal)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| CredentialError::Spawn {
            command: "kinit".to_string(),
            source,
        })?;

    if let Some(mut stdin) = child.stdin.take() {
        let stdin_path = Path::new("kinit stdin");
        stdin
            .write_all(password.expose_secret().as_bytes())
            .await
            .map_err(CredentialError::io(stdin_path))?;
        stdin
            .write_all(b"\n")
            .await
            .map_err(CredentialError::io(stdin_path))?;
        // Dropping stdin closes the pipe so kinit stops waiting
    }

    let output = child
        .wait_with_output()
        .await
        .map_err(|source| CredentialError::Spawn {
            command: "kinit".to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(CredentialError::CommandFailed {
            command: format!("kinit {}", principal),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    info!(principal = %principal, "Obtained Kerberos ticket");
    Ok(())
}

/// Log in as the test account of `egroup`.
pub async fn login_as(config: &Config, egroup: Egroup) -> Result<(), CredentialError> {
    let principal = egroup.principal();
    let password = fetch_password(config, principal).await?;
    kinit(principal, &password).await
}

/// Drop every ticket in the default cache.
///
/// A failing `kdestroy` (nothing to destroy) is not an error.
pub async fn kdestroy() -> Result<(), CredentialError> {
    match run(Path::new("kdestroy"), &[]).await {
        Ok(_) => {
            info!("Destroyed Kerberos tickets");
            Ok(())
        }
        Err(CredentialError::CommandFailed { status, stderr, .. }) => {
            warn!(status = %status, stderr = %stderr, "kdestroy reported a failure");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Extract the file-backed cache path from `klist` output.
pub fn parse_ticket_cache(klist_output: &str) -> Option<PathBuf> {
    TICKET_CACHE_PATTERN
        .captures(klist_output)
        .and_then(|captures| captures.get(1))
        .map(|path| PathBuf::from(path.as_str()))
}

/// Locate the active ticket cache file via `klist`.
pub async fn ticket_cache_path() -> Result<PathBuf, CredentialError> {
    let output = run(Path::new("klist"), &[]).await?;
    let stdout = String::from_utf8_lossy(&output.stdout);

    parse_ticket_cache(&stdout).ok_or(CredentialError::TicketCacheNotFound)
}

/// Keep the cache path for a later scenario.
pub fn remember_ticket_cache(path: &Path) {
    let mut slot = REMEMBERED_TICKET_CACHE
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    *slot = Some(path.to_path_buf());
}

/// The cache path kept by [`remember_ticket_cache`], if any.
pub fn remembered_ticket_cache() -> Option<PathBuf> {
    REMEMBERED_TICKET_CACHE
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

async fn restrict_permissions(path: &Path) -> Result<(), CredentialError> {
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(TICKET_FILE_MODE))
        .await
        .map_err(CredentialError::io(path))
}

/// Copy `from` to `to`, blaming whichever side failed.
async fn copy_file(from: &Path, to: &Path) -> Result<(), CredentialError> {
    let contents = tokio::fs::read(from)
        .await
        .map_err(CredentialError::io(from))?;
    tokio::fs::write(to, contents)
        .await
        .map_err(CredentialError::io(to))
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|metadata| metadata.is_file())
        .unwrap_or(false)
}

/// Saved copy of a ticket cache.
#[derive(Debug, Clone)]
pub struct TokenStash {
    path: PathBuf,
    aklog: PathBuf,
}

impl TokenStash {
    pub fn new(path: impl Into<PathBuf>, aklog: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            aklog: aklog.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.token_stash, &config.aklog_path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn exists(&self) -> bool {
        is_file(&self.path).await
    }

    /// Copy `cache` aside.
    pub async fn save(&self, cache: &Path) -> Result<(), CredentialError> {
        copy_file(cache, &self.path).await?;
        restrict_permissions(&self.path).await?;

        info!(cache = %cache.display(), stash = %self.path.display(), "Saved Kerberos ticket");
        Ok(())
    }

    /// Put the saved copy back at `cache` and remove the stash.
    ///
    /// Refreshes AFS tokens afterwards when the refresh helper is installed.
    pub async fn restore(&self, cache: &Path) -> Result<(), CredentialError> {
        copy_file(&self.path, cache).await?;
        tokio::fs::remove_file(&self.path)
            .await
            .map_err(CredentialError::io(&self.path))?;
        restrict_permissions(cache).await?;

        info!(cache = %cache.display(), "Restored Kerberos ticket");

        if is_file(&self.aklog).await {
            run(&self.aklog, &[]).await?;
            info!("Refreshed AFS tokens");
        }

        Ok(())
    }
}

/// True when the ticket cache file is present.
pub async fn has_ticket_cache(cache: &Path) -> bool {
    is_file(cache).await
}
