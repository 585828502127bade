//! Bounded polling on top of the non-waiting browser primitives
//!
//! A timeout is always the maximum wait, never a fixed delay: every helper
//! returns as soon as its condition holds and re-checks every
//! [`POLL_INTERVAL`] until the deadline passes.

use std::time::Duration;

use tokio::time::Instant;

use crate::common::{Error, Result};

use super::{Browser, ElementId};

/// Delay between two checks of the same condition
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Deadline tracker for one bounded wait
#[derive(Debug)]
pub struct Waiter {
    deadline: Instant,
}

impl Waiter {
    pub fn start(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now() + timeout,
        }
    }

    /// Time left before the deadline, zero once it has passed
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Sleep until the next check. Returns `false` once the deadline has passed.
    pub async fn next(&mut self) -> bool {
        let now = Instant::now();
        if now >= self.deadline {
            return false;
        }
        let remaining = self.deadline - now;
        tokio::time::sleep(remaining.min(POLL_INTERVAL)).await;
        true
    }
}

/// Treat a stale element as "not there yet" instead of a hard failure
pub fn transient<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(Error::StaleElement(reason)) => {
            tracing::trace!(%reason, "Element went stale while polling");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Wait until at least one element matches `selector`
pub async fn element(
    browser: &mut dyn Browser,
    selector: &str,
    timeout: Duration,
) -> Result<ElementId> {
    let mut waiter = Waiter::start(timeout);
    loop {
        if let Some(found) = transient(browser.find_all(selector).await)? {
            if let Some(first) = found.into_iter().next() {
                return Ok(first);
            }
        }
        if !waiter.next().await {
            return Err(Error::timeout(format!("element '{}'", selector), timeout));
        }
    }
}

/// Wait until an element matching `selector` is displayed
pub async fn visible_element(
    browser: &mut dyn Browser,
    selector: &str,
    timeout: Duration,
) -> Result<ElementId> {
    let mut waiter = Waiter::start(timeout);
    loop {
        let candidates = transient(browser.find_all(selector).await)?;
        if let Some(found) = first_displayed(browser, candidates).await? {
            return Ok(found);
        }
        if !waiter.next().await {
            return Err(Error::timeout(format!("element '{}' to be visible", selector), timeout));
        }
    }
}

/// Wait until an element containing `text` is displayed
pub async fn visible_text(
    browser: &mut dyn Browser,
    text: &str,
    timeout: Duration,
) -> Result<ElementId> {
    let mut waiter = Waiter::start(timeout);
    loop {
        let candidates = transient(browser.find_by_text(text).await)?;
        if let Some(found) = first_displayed(browser, candidates).await? {
            return Ok(found);
        }
        if !waiter.next().await {
            return Err(Error::timeout(format!("text '{}' to be visible", text), timeout));
        }
    }
}

/// Wait until the current location satisfies `accept`
///
/// `description` names the expectation in the timeout error.
pub async fn location<F>(
    browser: &mut dyn Browser,
    description: &str,
    timeout: Duration,
    accept: F,
) -> Result<String>
where
    F: Fn(&str) -> bool,
{
    let mut waiter = Waiter::start(timeout);
    loop {
        let last = browser.current_url().await?;
        if accept(&last) {
            return Ok(last);
        }
        if !waiter.next().await {
            return Err(Error::timeout(
                format!("location to {} (last: '{}')", description, last),
                timeout,
            ));
        }
    }
}

async fn first_displayed(
    browser: &mut dyn Browser,
    candidates: Option<Vec<ElementId>>,
) -> Result<Option<ElementId>> {
    let Some(candidates) = candidates else {
        return Ok(None);
    };
    for candidate in candidates {
        if transient(browser.is_displayed(&candidate).await)? == Some(true) {
            return Ok(Some(candidate));
        }
    }
    Ok(None)
}
