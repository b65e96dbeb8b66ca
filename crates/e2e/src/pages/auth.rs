//! Login and registration pages

use std::sync::Arc;

use super::BasePage;
use crate::config::E2eConfig;
use crate::driver::{Driver, Locator};
use crate::error::E2eResult;

pub struct AuthPage {
    pub base: BasePage,
    pub email_input: Locator,
    pub password_input: Locator,
    pub login_button: Locator,
    pub register_link: Locator,
    pub error_message: Locator,
    pub success_message: Locator,
}

impl AuthPage {
    pub fn new(driver: Arc<dyn Driver>, config: &E2eConfig) -> Self {
        let base = BasePage::new(driver, config);
        Self {
            email_input: base.locator("input[name=\"email\"]"),
            password_input: base.locator("input[name=\"password\"]"),
            login_button: base.locator("button[type=\"submit\"]"),
            register_link: base.locator("a[href*=\"register\"]"),
            error_message: base.locator(".alert-error"),
            success_message: base.locator(".alert-success"),
            base,
        }
    }

    pub async fn goto_login(&self) -> E2eResult<()> {
        self.base.goto("/login").await
    }

    pub async fn goto_register(&self) -> E2eResult<()> {
        self.base.goto("/register").await
    }

    pub async fn login(&self, email: &str, password: &str) -> E2eResult<()> {
        self.email_input.fill(email).await?;
        self.password_input.fill(password).await?;
        self.login_button.click().await
    }

    pub async fn has_error_message(&self) -> E2eResult<bool> {
        self.error_message.is_visible().await
    }

    /// Waits for the error alert, then returns its text.
    pub async fn error_message(&self) -> E2eResult<String> {
        self.error_message.wait_visible().await?;
        Ok(self.error_message.text_content().await?.unwrap_or_default())
    }

    pub async fn has_success_message(&self) -> E2eResult<bool> {
        self.success_message.is_visible().await
    }

    /// `false` when the redirect does not happen within the navigation timeout.
    pub async fn is_redirected_to_dashboard(&self) -> E2eResult<bool> {
        match self
            .base
            .wait_for_url("**/dashboard", self.base.timeouts().navigation)
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.is_deadline() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Browser constraint validation state of the email input.
    pub async fn email_is_valid(&self) -> E2eResult<bool> {
        Ok(self.email_input.first_snapshot().await?.map_or(true, |e| e.valid))
    }

    pub async fn password_is_valid(&self) -> E2eResult<bool> {
        Ok(self.password_input.first_snapshot().await?.map_or(true, |e| e.valid))
    }

    pub async fn register_link_count(&self) -> E2eResult<usize> {
        self.register_link.count().await
    }
}
