//! Stream.cz Search E2E Harness
//!
//! A Rust-controlled end-to-end harness for the Stream.cz search feature
//! that:
//! - Drives Playwright through a per-session Node.js command loop
//! - Preempts the consent interstitial with pre-built cookies
//! - Runs declarative, parametrized search scenarios
//! - Reports per-assertion outcomes plus a JSON suite report
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Scenario Runner (Rust)                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ScenarioRunner                                             │
//! │    ├── run_scenario(spec) -> ScenarioReport                 │
//! │    │     Start → CookiesSet → Navigated → SearchTriggered   │
//! │    │           → Redirected → Verified(pass|fail)           │
//! │    └── run_all(specs) -> SuiteReport (JSON)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  PageDriver (capability seam)                               │
//! │    navigate / set_cookies / click / fill / press            │
//! │    wait_for_url / count / text_of_all / is_visible / …      │
//! │      └── PlaywrightPage: node subprocess, JSON per line     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Fixtures                                                   │
//! │    SelectorRegistry: logical name → Playwright selector     │
//! │    consent_cookies(): the three CMP-suppressing cookies     │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod driver;
pub mod error;
pub mod fixtures;
pub mod playwright;
pub mod runner;
pub mod scenario;

pub use driver::{DeviceProfile, PageDriver, Timeouts, WaitPolicy};
pub use error::{E2eError, E2eResult};
pub use fixtures::{consent_cookies, CookieSpec, SelectorRegistry};
pub use runner::{RunnerConfig, ScenarioReport, ScenarioRunner, SuiteReport};
pub use scenario::{builtin_scenarios, ScenarioCheck, ScenarioSpec};
