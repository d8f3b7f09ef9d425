//! Page driver capability seam
//!
//! The scenario runner only ever talks to [`PageDriver`]; the concrete
//! Playwright-backed implementation lives in [`crate::playwright`]. Keeping
//! the seam narrow makes the interaction protocol testable against an
//! in-memory page.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::E2eResult;
use crate::fixtures::CookieSpec;

/// How long a navigation is allowed to settle.
///
/// The entry site finalizes client-side redirects only after background
/// requests go quiet, so scenarios use `NetworkIdle` there; `Immediate`
/// returns as soon as the load event fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitPolicy {
    Immediate,
    NetworkIdle,
}

impl WaitPolicy {
    pub(crate) fn as_playwright(self) -> &'static str {
        match self {
            WaitPolicy::Immediate => "load",
            WaitPolicy::NetworkIdle => "networkidle",
        }
    }
}

/// Desktop viewport or a named Playwright mobile emulation profile.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceProfile {
    #[default]
    Desktop,
    /// Device descriptor name from Playwright's registry, e.g. "Pixel 5".
    Mobile(String),
}

impl DeviceProfile {
    pub fn is_mobile(&self) -> bool {
        matches!(self, DeviceProfile::Mobile(_))
    }
}

impl std::fmt::Display for DeviceProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceProfile::Desktop => write!(f, "desktop"),
            DeviceProfile::Mobile(name) => write!(f, "mobile:{name}"),
        }
    }
}

/// Per-operation-class timeouts. Navigation is given far more slack than
/// element interaction, matching what browser automation tooling defaults to.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    pub navigation: Duration,
    pub action: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            navigation: Duration::from_secs(30),
            action: Duration::from_secs(7),
        }
    }
}

/// Narrow capability interface over one browser page/session.
///
/// Every operation may suspend until the browser confirms completion or the
/// configured timeout for its operation class elapses. Implementations own
/// exactly one session; dropping or closing the driver tears it down.
#[async_trait]
pub trait PageDriver: Send {
    async fn navigate(&mut self, url: &str, wait: WaitPolicy) -> E2eResult<()>;

    /// Idempotent; must run before the first navigation of a session so the
    /// consent interstitial never appears.
    async fn set_cookies(&mut self, cookies: &[CookieSpec]) -> E2eResult<()>;

    async fn click(&mut self, selector: &str) -> E2eResult<()>;

    async fn fill(&mut self, selector: &str, text: &str) -> E2eResult<()>;

    async fn press(&mut self, selector: &str, key: &str) -> E2eResult<()>;

    /// Blocks until the page address matches `pattern`. This is the
    /// observable contract of "search happened".
    async fn wait_for_url(&mut self, pattern: &str) -> E2eResult<()>;

    async fn current_url(&mut self) -> E2eResult<String>;

    /// Number of matching elements; 0 when nothing matches, never an error.
    async fn count(&mut self, selector: &str) -> E2eResult<usize>;

    /// Number of matching elements that are actually rendered visible.
    async fn count_visible(&mut self, selector: &str) -> E2eResult<usize>;

    /// Inner text of every match; empty when nothing matches.
    async fn text_of_all(&mut self, selector: &str) -> E2eResult<Vec<String>>;

    async fn is_visible(&mut self, selector: &str) -> E2eResult<bool>;

    /// Full-page capture for failure diagnostics.
    async fn screenshot(&mut self, path: &Path) -> E2eResult<()>;

    async fn close(&mut self) -> E2eResult<()>;

    /// A match is non-empty when it renders some text or has child elements.
    async fn is_nonempty(&mut self, selector: &str) -> E2eResult<bool> {
        let texts = self.text_of_all(selector).await?;
        if texts.iter().any(|t| !t.trim().is_empty()) {
            return Ok(true);
        }
        Ok(self.count(&format!("{selector} > *")).await? > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_policy_maps_to_playwright_wait_until() {
        assert_eq!(WaitPolicy::Immediate.as_playwright(), "load");
        assert_eq!(WaitPolicy::NetworkIdle.as_playwright(), "networkidle");
    }

    #[test]
    fn navigation_timeout_dominates_action_timeout() {
        let t = Timeouts::default();
        assert!(t.navigation > t.action);
        assert_eq!(t.navigation, Duration::from_secs(30));
    }

    #[test]
    fn device_profile_routing() {
        assert!(!DeviceProfile::Desktop.is_mobile());
        assert!(DeviceProfile::Mobile("Pixel 5".into()).is_mobile());
        assert_eq!(DeviceProfile::Mobile("Pixel 5".into()).to_string(), "mobile:Pixel 5");
    }
}
