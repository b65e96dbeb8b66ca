//! Scenario preconditions and remote feed fixtures

use std::sync::Arc;
use tracing::debug;

use crate::config::E2eConfig;
use crate::driver::Driver;
use crate::ensure;
use crate::error::E2eResult;
use crate::pages::AuthPage;

const FIXTURE_PATH: &str = "tjanas94/vibefeeder/master/tests/e2e/fixtures";

/// Public RSS/Atom documents the backend can actually fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedFixtures {
    /// RSS 2.0, three plain items
    pub basic: String,

    /// Atom 1.0, two entries
    pub atom: String,

    /// RSS 2.0 with CDATA, special characters and long titles
    pub edge_cases: String,
}

impl FeedFixtures {
    /// With a token, requests are authenticated to dodge rate limits.
    pub fn new(github_token: Option<&str>) -> Self {
        let host = match github_token {
            Some(token) => format!("https://{}@raw.githubusercontent.com", token),
            None => "https://raw.githubusercontent.com".to_string(),
        };
        let url = |name: &str| format!("{}/{}/test-feed-{}.xml", host, FIXTURE_PATH, name);
        Self {
            basic: url("basic"),
            atom: url("atom"),
            edge_cases: url("edge-cases"),
        }
    }
}

/// Browser state a scenario starts from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fixture {
    /// Blank page, no session
    Anonymous,

    /// Login page loaded, no session
    LoginPage,

    /// Logged in with the configured test account, on the dashboard
    Authenticated,
}

impl Fixture {
    pub async fn prepare(&self, driver: Arc<dyn Driver>, config: &E2eConfig) -> E2eResult<()> {
        match self {
            Fixture::Anonymous => Ok(()),
            Fixture::LoginPage => AuthPage::new(driver, config).goto_login().await,
            Fixture::Authenticated => authenticate(driver, config).await,
        }
    }
}

/// Log in through the UI. Fails before touching the browser when no
/// credentials are configured.
pub async fn authenticate(driver: Arc<dyn Driver>, config: &E2eConfig) -> E2eResult<()> {
    let credentials = config.credentials()?;
    let auth = AuthPage::new(driver, config);
    auth.goto_login().await?;
    auth.login(&credentials.email, &credentials.password).await?;
    ensure!(
        auth.is_redirected_to_dashboard().await?,
        "login as {} did not reach the dashboard",
        credentials.email
    );
    debug!("Authenticated as {}", credentials.email);
    Ok(())
}
