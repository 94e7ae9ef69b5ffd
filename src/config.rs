//! Environment-driven configuration for the bridge.

use std::env;
use std::path::PathBuf;

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Runtime configuration for the bridge service.
///
/// Everything comes from the environment; defaults are suitable for
/// local development against test doubles, not production.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Listen address in `host:port` form.
    pub listen_addr: String,
    /// When set, suppress all outbound side effects and correlation
    /// writes while preserving the normal success/failure reporting.
    pub dry_run: bool,
    /// OAuth token for the issue tracker API.
    pub tracker_token: String,
    /// Tracked repository in `owner/name` form.
    pub tracker_repo: String,
    /// Email provider domain, e.g. `mg.example.org`.
    pub mail_domain: String,
    /// Email provider API key.
    pub mail_api_key: String,
    /// Mailbox outbound mails are sent from.
    pub mail_sender: String,
    /// Path of the correlation store snapshot.
    pub store_path: PathBuf,
}

impl BridgeConfig {
    pub fn from_env() -> Self {
        let mail_domain = env_string("BRIDGE_MAIL_DOMAIN", "example.test");
        let default_sender = format!("bugs@{mail_domain}");

        Self {
            listen_addr: env_string("BRIDGE_LISTEN_ADDR", "127.0.0.1:5000"),
            dry_run: env_bool("BRIDGE_DRY_RUN", false),
            tracker_token: env_string("BRIDGE_TRACKER_TOKEN", ""),
            tracker_repo: env_string("BRIDGE_TRACKER_REPO", ""),
            mail_api_key: env_string("BRIDGE_MAIL_API_KEY", ""),
            mail_sender: env_string("BRIDGE_MAIL_SENDER", &default_sender),
            store_path: PathBuf::from(env_string("BRIDGE_STORE_PATH", "./correlations.bin")),
            mail_domain,
        }
    }

    /// Split the tracked repository into `(owner, name)`.
    pub fn tracker_repo_parts(&self) -> Option<(&str, &str)> {
        self.tracker_repo.split_once('/')
    }

    /// Split the listen address into `(host, port)` for the HTTP layer.
    /// IPv6 hosts use the usual bracketed form, e.g. `[::1]:5000`.
    pub fn listen_parts(&self) -> Option<(&str, u16)> {
        let (host, port) = self.listen_addr.rsplit_once(':')?;
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);
        Some((host, port.parse().ok()?))
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
