//! Login, validation and access control

use std::time::Duration;

use super::{ensure_matches, Outcome, Scenario, ScenarioContext};
use crate::ensure;
use crate::error::E2eResult;
use crate::fixtures::Fixture;

pub fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "login-page-renders",
            suite: "auth",
            tags: &["smoke"],
            fixture: Fixture::LoginPage,
            timeout: None,
            body: |cx| Box::pin(login_page_renders(cx)),
        },
        Scenario {
            name: "invalid-credentials-error",
            suite: "auth",
            tags: &[],
            fixture: Fixture::LoginPage,
            timeout: None,
            body: |cx| Box::pin(invalid_credentials_error(cx)),
        },
        Scenario {
            name: "empty-email-invalid",
            suite: "auth",
            tags: &["validation"],
            fixture: Fixture::LoginPage,
            timeout: None,
            body: |cx| Box::pin(empty_email_invalid(cx)),
        },
        Scenario {
            name: "empty-password-invalid",
            suite: "auth",
            tags: &["validation"],
            fixture: Fixture::LoginPage,
            timeout: None,
            body: |cx| Box::pin(empty_password_invalid(cx)),
        },
        Scenario {
            name: "navigate-to-register",
            suite: "auth",
            tags: &[],
            fixture: Fixture::LoginPage,
            timeout: None,
            body: |cx| Box::pin(navigate_to_register(cx)),
        },
        Scenario {
            name: "successful-login",
            suite: "auth",
            tags: &["smoke"],
            fixture: Fixture::LoginPage,
            timeout: None,
            body: |cx| Box::pin(successful_login(cx)),
        },
        Scenario {
            name: "dashboard-requires-login",
            suite: "auth",
            tags: &["smoke"],
            fixture: Fixture::Anonymous,
            timeout: None,
            body: |cx| Box::pin(dashboard_requires_login(cx)),
        },
    ]
}

async fn login_page_renders(cx: ScenarioContext) -> E2eResult<Outcome> {
    let auth = cx.auth();

    let title = auth.base.title().await?;
    ensure_matches("page title", &title, "login")?;

    auth.email_input.wait_visible().await?;
    auth.password_input.wait_visible().await?;
    auth.login_button.wait_visible().await?;
    Ok(Outcome::Passed)
}

async fn invalid_credentials_error(cx: ScenarioContext) -> E2eResult<Outcome> {
    let auth = cx.auth();
    auth.login("invalid@example.com", "wrongpassword").await?;

    let message = auth.error_message().await?;
    ensure!(
        message.to_lowercase().contains("invalid"),
        "error message {:?} does not mention invalid credentials",
        message
    );
    Ok(Outcome::Passed)
}

async fn empty_email_invalid(cx: ScenarioContext) -> E2eResult<Outcome> {
    let auth = cx.auth();
    auth.password_input.fill("somepassword").await?;
    auth.login_button.click().await?;

    ensure!(!auth.email_is_valid().await?, "empty email passed constraint validation");
    Ok(Outcome::Passed)
}

async fn empty_password_invalid(cx: ScenarioContext) -> E2eResult<Outcome> {
    let auth = cx.auth();
    auth.email_input.fill("test@example.com").await?;
    auth.login_button.click().await?;

    ensure!(!auth.password_is_valid().await?, "empty password passed constraint validation");
    Ok(Outcome::Passed)
}

async fn navigate_to_register(cx: ScenarioContext) -> E2eResult<Outcome> {
    let auth = cx.auth();
    if auth.register_link_count().await? == 0 {
        return Ok(Outcome::Skipped("login page has no register link".to_string()));
    }

    auth.register_link.click().await?;
    auth.base
        .wait_for_url("**/register", auth.base.timeouts().navigation)
        .await?;
    Ok(Outcome::Passed)
}

async fn successful_login(cx: ScenarioContext) -> E2eResult<Outcome> {
    let credentials = cx.config.credentials()?;
    let auth = cx.auth();
    auth.login(&credentials.email, &credentials.password).await?;

    ensure!(auth.is_redirected_to_dashboard().await?, "not redirected to dashboard");
    ensure!(cx.dashboard().is_logged_in().await?, "dashboard not accessible after login");
    Ok(Outcome::Passed)
}

async fn dashboard_requires_login(cx: ScenarioContext) -> E2eResult<Outcome> {
    let base = cx.base();
    base.goto("/dashboard").await?;

    let url = base.wait_for_url("**/login", Duration::from_secs(5)).await?;
    ensure!(url.contains("/login"), "expected login redirect, landed on {}", url);
    Ok(Outcome::Passed)
}
