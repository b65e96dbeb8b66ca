//! Harness configuration read from the environment
//!
//! Values come from the process environment after `.env.test` has been
//! loaded into it. Nothing here is mandatory at load time; scenarios that
//! need credentials ask for them through [`E2eConfig::credentials`], which
//! fails fast with [`E2eError::PreconditionMissing`].

use std::path::Path;
use std::time::Duration;
use reqwest::Url;
use tracing::debug;

use crate::error::{E2eError, E2eResult};
use crate::wait::WaitPolicy;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8081";
pub const DEFAULT_ENV_FILE: &str = ".env.test";

/// Test account used by authenticated scenarios
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Admin access to the hosted data plane, used only for teardown
#[derive(Debug, Clone)]
pub struct DataPlaneConfig {
    pub url: String,
    pub service_key: String,
    pub user_id: String,
}

/// Wait budgets used by page objects and the runner
#[derive(Debug, Clone)]
pub struct Timeouts {
    /// Auto-wait before clicks and fills
    pub action: Duration,

    /// URL redirects after login/logout
    pub navigation: Duration,

    /// Feed status badge polling
    pub feed_status: Duration,
    pub feed_status_interval: Duration,

    /// Client-side validation errors
    pub field_error: Duration,

    /// Summary generation
    pub summary: Duration,

    /// Whole-scenario budget unless the scenario overrides it
    pub scenario: Duration,
}

impl Timeouts {
    pub fn feed_status_policy(&self) -> WaitPolicy {
        WaitPolicy::status(self.feed_status, self.feed_status_interval)
    }

    pub fn field_error_policy(&self) -> WaitPolicy {
        WaitPolicy::field(self.field_error)
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            action: Duration::from_secs(10),
            navigation: Duration::from_secs(5),
            feed_status: Duration::from_secs(30),
            feed_status_interval: Duration::from_secs(2),
            field_error: Duration::from_secs(5),
            summary: Duration::from_secs(30),
            scenario: Duration::from_secs(30),
        }
    }
}

/// Everything the scenarios consume from outside
#[derive(Debug, Clone)]
pub struct E2eConfig {
    pub base_url: Url,
    pub credentials: Option<Credentials>,
    pub data_plane: Option<DataPlaneConfig>,
    pub github_token: Option<String>,
    pub ci: bool,
    pub timeouts: Timeouts,
}

impl E2eConfig {
    /// Load `.env.test` (if present) and read the process environment.
    pub fn from_env() -> E2eResult<Self> {
        Self::load_env_file(Path::new(DEFAULT_ENV_FILE));
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Merge an env file into the process environment without overriding
    /// variables that are already set.
    pub fn load_env_file(path: &Path) {
        match dotenvy::from_path(path) {
            Ok(()) => debug!("Loaded environment from {}", path.display()),
            Err(e) => debug!("No env file at {}: {}", path.display(), e),
        }
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> E2eResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let base_url = get("BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = parse_base_url(&base_url)?;

        let credentials = match (get("E2E_USERNAME"), get("E2E_PASSWORD")) {
            (Some(email), Some(password)) => Some(Credentials { email, password }),
            _ => None,
        };

        let data_plane = match (get("SUPABASE_URL"), get("SUPABASE_KEY"), get("E2E_USERNAME_ID")) {
            (Some(url), Some(service_key), Some(user_id)) => Some(DataPlaneConfig {
                url,
                service_key,
                user_id,
            }),
            _ => None,
        };

        Ok(Self {
            base_url,
            credentials,
            data_plane,
            github_token: get("GITHUB_ACCESS_TOKEN"),
            ci: get("CI").is_some_and(|v| v != "0" && !v.eq_ignore_ascii_case("false")),
            timeouts: Timeouts::default(),
        })
    }

    /// Test account credentials, or a precondition failure naming them.
    pub fn credentials(&self) -> E2eResult<&Credentials> {
        self.credentials.as_ref().ok_or_else(|| {
            E2eError::PreconditionMissing(
                "E2E test credentials not configured. Please set E2E_USERNAME and E2E_PASSWORD in .env.test file"
                    .to_string(),
            )
        })
    }

    pub fn set_base_url(&mut self, raw: &str) -> E2eResult<()> {
        self.base_url = parse_base_url(raw)?;
        Ok(())
    }
}

fn parse_base_url(raw: &str) -> E2eResult<Url> {
    Url::parse(raw).map_err(|e| E2eError::InvalidConfig(format!("BASE_URL {:?}: {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> E2eResult<E2eConfig> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        E2eConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.base_url.as_str(), "http://localhost:8081/");
        assert!(cfg.credentials.is_none());
        assert!(cfg.data_plane.is_none());
        assert!(!cfg.ci);
        assert_eq!(cfg.timeouts.feed_status, Duration::from_secs(30));
    }

    #[test]
    fn missing_credentials_is_a_precondition_failure() {
        let cfg = config(&[("E2E_USERNAME", "e2e@example.com"), ("E2E_PASSWORD", "  ")]).unwrap();
        match cfg.credentials() {
            Err(E2eError::PreconditionMissing(msg)) => {
                assert!(msg.contains("E2E_USERNAME"));
                assert!(msg.contains("E2E_PASSWORD"));
            }
            other => panic!("expected precondition failure, got {other:?}"),
        }
    }

    #[test]
    fn reads_credentials_and_data_plane() {
        let cfg = config(&[
            ("BASE_URL", "http://127.0.0.1:9000"),
            ("E2E_USERNAME", "e2e@example.com"),
            ("E2E_PASSWORD", "secret"),
            ("SUPABASE_URL", "https://db.example.co"),
            ("SUPABASE_KEY", "service-key"),
            ("E2E_USERNAME_ID", "user-1"),
            ("CI", "true"),
        ])
        .unwrap();

        assert_eq!(cfg.base_url.port(), Some(9000));
        assert_eq!(cfg.credentials().unwrap().email, "e2e@example.com");
        assert_eq!(cfg.data_plane.as_ref().unwrap().user_id, "user-1");
        assert!(cfg.ci);
    }

    #[test]
    fn partial_data_plane_config_is_ignored() {
        let cfg = config(&[("SUPABASE_URL", "https://db.example.co")]).unwrap();
        assert!(cfg.data_plane.is_none());
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(matches!(config(&[("BASE_URL", "not a url")]), Err(E2eError::InvalidConfig(_))));
    }

    #[test]
    fn ci_false_values() {
        assert!(!config(&[("CI", "0")]).unwrap().ci);
        assert!(!config(&[("CI", "false")]).unwrap().ci);
    }
}
