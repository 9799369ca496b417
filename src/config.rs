use anyhow::{Context, Result, bail};
use edgeapi::{Auth, HttpGateway};
use reconcile::ExecuteOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Environment variable overriding the server URL
pub const ENV_SERVER: &str = "EDGECTL_SERVER";

/// Environment variable carrying a pre-issued bearer token
pub const ENV_TOKEN: &str = "EDGECTL_TOKEN";

pub const DEFAULT_SERVER: &str = "https://console.redhat.com";

// ============================================================================
// Config File
// ============================================================================

/// `config.toml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: String,
    pub token: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Records per page when listing
    pub page_size: usize,
    pub timeout_secs: u64,
    pub verify: VerifyConfig,
}

/// Read-back after mutations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VerifyConfig {
    pub attempts: u32,
    pub interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            token: None,
            username: None,
            password: None,
            page_size: edgeapi::DEFAULT_STEP,
            timeout_secs: 30,
            verify: VerifyConfig::default(),
        }
    }
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            interval_ms: 2000,
        }
    }
}

impl Config {
    /// Load a config file; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid config in {}", path.display()))
    }

    /// Apply `EDGECTL_SERVER` / `EDGECTL_TOKEN` from an environment lookup
    pub fn with_env(mut self, env: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(server) = env(ENV_SERVER).filter(|s| !s.is_empty()) {
            self.server = server;
        }
        if let Some(token) = env(ENV_TOKEN).filter(|t| !t.is_empty()) {
            self.token = Some(token);
            self.username = None;
            self.password = None;
        }
        self
    }

    /// Apply command-line overrides
    pub fn with_server(mut self, server: Option<&str>) -> Self {
        if let Some(server) = server {
            self.server = server.to_string();
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            bail!("page_size must be at least 1");
        }
        let url = Url::parse(&self.server)
            .with_context(|| format!("Invalid server URL: {}", self.server))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("Server URL must be http or https: {}", self.server);
        }
        if self.token.is_some() && self.username.is_some() {
            bail!("Set either token or username/password, not both");
        }
        if self.username.is_some() != self.password.is_some() {
            bail!("username and password must be set together");
        }
        Ok(())
    }

    /// Authorization for every request
    pub fn auth(&self) -> Auth {
        match (&self.token, &self.username, &self.password) {
            (Some(token), _, _) => Auth::Bearer(token.clone()),
            (None, Some(username), Some(password)) => Auth::Basic {
                username: username.clone(),
                password: password.clone(),
            },
            _ => Auth::None,
        }
    }

    pub fn gateway(&self) -> HttpGateway {
        HttpGateway::new(
            &self.server,
            self.auth(),
            Duration::from_secs(self.timeout_secs),
        )
    }

    pub fn execute_options(&self, dry_run: bool) -> ExecuteOptions {
        ExecuteOptions {
            dry_run,
            verify_attempts: self.verify.attempts,
            verify_interval: Duration::from_millis(self.verify.interval_ms),
        }
    }
}
