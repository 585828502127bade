//! Session lifecycle
//!
//! Every scenario starts from a fresh, authenticated session: client state
//! is cleared, then the login form is filled and submitted, and the reset
//! only succeeds once the browser lands on the post-login location.

use async_trait::async_trait;
use regex::Regex;

use crate::browser::{wait, Browser};
use crate::common::config::AuthConfig;
use crate::common::{Error, Result};
use crate::scenario::PlannedScenario;

use super::ScenarioHooks;

pub struct SessionManager {
    auth: AuthConfig,
    post_login: Regex,
}

impl SessionManager {
    pub fn new(auth: AuthConfig) -> Result<Self> {
        let post_login = Regex::new(&auth.post_login_pattern).map_err(|e| {
            Error::Config(format!(
                "invalid post_login_pattern '{}': {}",
                auth.post_login_pattern, e
            ))
        })?;
        Ok(Self { auth, post_login })
    }

    /// Clear client state and log in again
    ///
    /// Any failure along the way is an authentication setup failure: the
    /// scenario that triggered the reset does not run.
    #[tracing::instrument(skip_all)]
    pub async fn reset(&self, browser: &mut dyn Browser) -> Result<()> {
        self.login(browser)
            .await
            .map_err(|e| Error::AuthenticationSetup(e.to_string()))
    }

    async fn login(&self, browser: &mut dyn Browser) -> Result<()> {
        let auth = &self.auth;
        let timeout = auth.timeout();

        // storage is per-origin, so the origin has to be loaded before clearing
        browser.navigate(&auth.login_path).await?;
        browser.clear_session_state().await?;
        browser.navigate(&auth.login_path).await?;

        let username = wait::visible_element(browser, &auth.username_selector, timeout).await?;
        browser.send_keys(&username, &auth.username).await?;

        let password = wait::visible_element(browser, &auth.password_selector, timeout).await?;
        browser.send_keys(&password, auth.password.expose()).await?;

        let submit = wait::visible_element(browser, &auth.submit_selector, timeout).await?;
        browser.click(&submit).await?;

        let description = format!("match /{}/", self.post_login.as_str());
        let landed = wait::location(browser, &description, timeout, |url| {
            self.post_login.is_match(url)
        })
        .await?;
        tracing::debug!(user = %auth.username, url = %landed, "Logged in");
        Ok(())
    }
}

#[async_trait]
impl ScenarioHooks for SessionManager {
    async fn before_scenario(&self, browser: &mut dyn Browser, _scenario: &PlannedScenario) -> Result<()> {
        self.reset(browser).await
    }
}
