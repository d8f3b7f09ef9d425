//! Scenario runner
//!
//! Drives a [`PageDriver`] through the fixed interaction sequence every
//! search scenario follows and evaluates the scenario's check policy:
//!
//! `Start → CookiesSet → Navigated → SearchTriggered → Redirected → Verified`
//!
//! Setup and step failures abort a scenario; verification failures are
//! collected so one run reports every broken assertion. A scenario may be
//! retried once on a fresh session when a step fails for environmental
//! reasons — never when assertions produced a verdict.

use std::future::Future;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::driver::{PageDriver, WaitPolicy};
use crate::error::{E2eError, E2eResult};
use crate::fixtures::{consent_cookies, SelectorRegistry, CONSENT_COOKIE_TTL};
use crate::playwright::{PlaywrightConfig, PlaywrightPage};
use crate::scenario::{
    parse_duration_seconds, results_url, ResultSection, ScenarioCheck, ScenarioSpec, SearchTrigger,
};

/// How far a scenario got before it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioState {
    Start,
    CookiesSet,
    Navigated,
    SearchTriggered,
    Redirected,
    Verified,
}

/// One evaluated assertion, with enough context to diagnose without rerunning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssertionOutcome {
    pub label: String,
    pub selector: String,
    pub expected: String,
    pub observed: String,
    pub passed: bool,
}

/// Result of running a single scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub name: String,
    pub passed: bool,
    pub state_reached: ScenarioState,
    pub search_term: Option<String>,
    pub device: String,
    pub duration_ms: u64,
    pub attempts: u32,
    pub assertions: Vec<AssertionOutcome>,
    pub error: Option<String>,
    pub screenshot: Option<PathBuf>,
}

/// Result of running the whole suite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub finished_at: DateTime<Utc>,
    pub results: Vec<ScenarioReport>,
}

/// Configuration for the scenario runner.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub base_url: String,
    pub cookie_domain: String,
    /// Automatic whole-scenario retries on step failure, each on a fresh
    /// session.
    pub retries: u32,
    pub output_dir: PathBuf,
    pub playwright: PlaywrightConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.stream.cz/".to_string(),
            cookie_domain: ".stream.cz".to_string(),
            retries: 1,
            output_dir: PathBuf::from("test-results"),
            playwright: PlaywrightConfig::default(),
        }
    }
}

pub struct ScenarioRunner {
    config: RunnerConfig,
    registry: SelectorRegistry,
}

impl ScenarioRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self::with_registry(config, SelectorRegistry::stream_cz())
    }

    pub fn with_registry(config: RunnerConfig, registry: SelectorRegistry) -> Self {
        Self { config, registry }
    }

    /// Probe the target site before spending browser sessions on it.
    pub async fn check_site_reachable(&self) -> E2eResult<()> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;

        let max_attempts = 3;
        let mut attempts = 0;
        while attempts < max_attempts {
            attempts += 1;
            match client.get(&self.config.base_url).send().await {
                Ok(resp) if resp.status().is_success() || resp.status().is_redirection() => {
                    return Ok(());
                }
                Ok(resp) => warn!("Reachability probe returned {}", resp.status()),
                Err(e) => warn!("Reachability probe failed: {e}"),
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        Err(E2eError::SiteUnreachable { url: self.config.base_url.clone(), attempts })
    }

    /// Run every scenario sequentially, one fresh browser session each.
    pub async fn run_all(&self, specs: &[ScenarioSpec]) -> SuiteReport {
        let start = Instant::now();
        let mut results = Vec::new();
        let mut passed = 0;
        let mut failed = 0;

        info!("Running {} scenario(s) against {}", specs.len(), self.config.base_url);

        for spec in specs {
            let report = self.run_scenario(spec).await;
            if report.passed {
                passed += 1;
                info!("✓ {} ({} ms)", report.name, report.duration_ms);
            } else {
                failed += 1;
                error!(
                    "✗ {} [term={:?} device={}] - {}",
                    report.name,
                    report.search_term,
                    report.device,
                    report
                        .error
                        .clone()
                        .unwrap_or_else(|| summarize_failures(&report.assertions)),
                );
            }
            results.push(report);
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!("");
        info!("Scenario results: {} passed, {} failed ({} ms)", passed, failed, duration_ms);

        SuiteReport {
            total: specs.len(),
            passed,
            failed,
            duration_ms,
            finished_at: Utc::now(),
            results,
        }
    }

    /// Run one scenario end to end on Playwright sessions.
    pub async fn run_scenario(&self, spec: &ScenarioSpec) -> ScenarioReport {
        let mut config = self.config.playwright.clone();
        config.device = spec.device.clone();

        self.run_scenario_with(spec, move || {
            let config = config.clone();
            async move { PlaywrightPage::launch(&config).await }
        })
        .await
    }

    /// Run one scenario using `new_session` to open each attempt's driver.
    ///
    /// Generic over the driver so the interaction protocol can be exercised
    /// against an in-memory page. Every session is closed before the report
    /// is returned, whatever the outcome.
    pub async fn run_scenario_with<D, F, Fut>(
        &self,
        spec: &ScenarioSpec,
        mut new_session: F,
    ) -> ScenarioReport
    where
        D: PageDriver,
        F: FnMut() -> Fut,
        Fut: Future<Output = E2eResult<D>>,
    {
        let mut attempts = 1;
        let mut report = self.attempt(spec, &mut new_session).await;

        while !report.passed && report.error.is_some() && attempts <= self.config.retries {
            attempts += 1;
            warn!(
                "Retrying '{}' on a fresh session after: {}",
                spec.name,
                report.error.as_deref().unwrap_or("unknown error")
            );
            report = self.attempt(spec, &mut new_session).await;
        }

        report.attempts = attempts;
        report
    }

    async fn attempt<D, F, Fut>(&self, spec: &ScenarioSpec, new_session: &mut F) -> ScenarioReport
    where
        D: PageDriver,
        F: FnMut() -> Fut,
        Fut: Future<Output = E2eResult<D>>,
    {
        match new_session().await {
            Ok(mut driver) => {
                let report = self.drive(&mut driver, spec).await;
                if let Err(e) = driver.close().await {
                    warn!("Session teardown for '{}': {}", spec.name, e);
                }
                report
            }
            Err(e) => ScenarioReport {
                name: spec.name.clone(),
                passed: false,
                state_reached: ScenarioState::Start,
                search_term: spec.search_term.clone(),
                device: spec.device.to_string(),
                duration_ms: 0,
                attempts: 1,
                assertions: Vec::new(),
                error: Some(format!("session setup: {e}")),
                screenshot: None,
            },
        }
    }

    /// Drive one already-open session through the scenario.
    pub async fn drive<D: PageDriver>(&self, driver: &mut D, spec: &ScenarioSpec) -> ScenarioReport {
        let start = Instant::now();
        debug!("Running scenario: {}", spec.name);

        let mut state = ScenarioState::Start;
        let mut assertions = Vec::new();
        let error = match self
            .drive_inner(driver, spec, &mut state, &mut assertions)
            .await
        {
            Ok(()) => None,
            Err(e) => Some(e.to_string()),
        };

        let passed = error.is_none() && assertions.iter().all(|a| a.passed);

        let mut screenshot = None;
        if !passed {
            if let Ok(url) = driver.current_url().await {
                if !url.is_empty() {
                    debug!("Address at failure: {url}");
                }
            }
            let dir = self.config.output_dir.join("artifacts");
            let path = dir.join(format!("{}.png", spec.name));
            if let Err(e) = std::fs::create_dir_all(&dir) {
                debug!("Could not create artifact dir: {e}");
            } else {
                match driver.screenshot(&path).await {
                    Ok(()) => screenshot = Some(path),
                    Err(e) => debug!("Failure screenshot not captured: {e}"),
                }
            }
        }

        ScenarioReport {
            name: spec.name.clone(),
            passed,
            state_reached: state,
            search_term: spec.search_term.clone(),
            device: spec.device.to_string(),
            duration_ms: start.elapsed().as_millis() as u64,
            attempts: 1,
            assertions,
            error,
            screenshot,
        }
    }

    async fn drive_inner<D: PageDriver>(
        &self,
        driver: &mut D,
        spec: &ScenarioSpec,
        state: &mut ScenarioState,
        assertions: &mut Vec<AssertionOutcome>,
    ) -> E2eResult<()> {
        let base = Url::parse(&self.config.base_url)?;

        // Start -> CookiesSet. Nothing works with the consent dialog up.
        let cookies = consent_cookies(&self.config.cookie_domain, CONSENT_COOKIE_TTL);
        driver
            .set_cookies(&cookies)
            .await
            .map_err(|e| E2eError::Setup(e.to_string()))?;
        *state = ScenarioState::CookiesSet;

        // CookiesSet -> Navigated. The entry site finalizes client-side
        // redirects only once background requests settle.
        let entry = base.join(&spec.entry_path)?;
        info!("Opening '{}'", entry);
        driver.navigate(entry.as_str(), WaitPolicy::NetworkIdle).await?;
        if spec.device.is_mobile() && spec.search_term.is_some() {
            // the collapsed search control must be revealed first
            driver.click(self.registry.get("search.opener")?).await?;
        }
        *state = ScenarioState::Navigated;

        if let Some(term) = &spec.search_term {
            // Navigated -> SearchTriggered
            let field = self.registry.get("search.input")?;
            info!("Searching for '{}'", term);
            driver.click(field).await?;
            driver.fill(field, term).await?;
            match spec.trigger {
                SearchTrigger::Button => {
                    driver.click(self.registry.get("search.submit")?).await?
                }
                SearchTrigger::EnterKey => driver.press(field, "Enter").await?,
            }
            *state = ScenarioState::SearchTriggered;

            // SearchTriggered -> Redirected
            let expected = results_url(&base, term)?;
            info!("Waiting for redirection to '{}'", expected);
            driver.wait_for_url(expected.as_str()).await?;
            *state = ScenarioState::Redirected;
        }

        // -> Verified
        self.verify(driver, spec, assertions).await?;
        *state = ScenarioState::Verified;
        Ok(())
    }

    async fn verify<D: PageDriver>(
        &self,
        driver: &mut D,
        spec: &ScenarioSpec,
        out: &mut Vec<AssertionOutcome>,
    ) -> E2eResult<()> {
        match &spec.check {
            ScenarioCheck::Results { sections } => {
                for section in sections {
                    out.push(check_section(driver, section).await?);
                }
            }
            ScenarioCheck::NoResults { message_selector, forbidden_sections } => {
                out.push(check_exactly_once(driver, "no-results message", message_selector).await?);
                for section in forbidden_sections {
                    out.push(check_absent(driver, section).await?);
                }
            }
            ScenarioCheck::BlankQuery { prompt_selector, forbidden_sections } => {
                out.push(check_exactly_once(driver, "blank-query prompt", prompt_selector).await?);
                for section in forbidden_sections {
                    out.push(check_absent(driver, section).await?);
                }
            }
            ScenarioCheck::Pagination { item_selector, load_more_selector } => {
                self.verify_pagination(driver, item_selector, load_more_selector, out)
                    .await?;
            }
            ScenarioCheck::DurationFilter {
                open_selector,
                option_selector,
                badge_selector,
                max_seconds,
            } => {
                self.verify_duration_filter(
                    driver,
                    open_selector,
                    option_selector,
                    badge_selector,
                    *max_seconds,
                    out,
                )
                .await?;
            }
        }
        Ok(())
    }

    async fn verify_pagination<D: PageDriver>(
        &self,
        driver: &mut D,
        item_selector: &str,
        load_more_selector: &str,
        out: &mut Vec<AssertionOutcome>,
    ) -> E2eResult<()> {
        let before = driver.count(item_selector).await?;
        out.push(AssertionOutcome {
            label: "initial video list".to_string(),
            selector: item_selector.to_string(),
            expected: "at least one item".to_string(),
            observed: format!("count={before}"),
            passed: before > 0,
        });

        driver.click(load_more_selector).await?;

        // new cards attach asynchronously; poll until the list grows or the
        // action budget runs out
        let deadline = Instant::now() + self.config.playwright.timeouts.action;
        let mut after = driver.count(item_selector).await?;
        while after <= before && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(250)).await;
            after = driver.count(item_selector).await?;
        }

        out.push(AssertionOutcome {
            label: "list grows after load more".to_string(),
            selector: item_selector.to_string(),
            expected: format!("count > {before}"),
            observed: format!("count={after}"),
            passed: after > before,
        });

        // catches silent DOM bloat: elements attached but never rendered
        let visible = driver.count_visible(item_selector).await?;
        out.push(AssertionOutcome {
            label: "every reported item is visible".to_string(),
            selector: item_selector.to_string(),
            expected: format!("visible_count == {after}"),
            observed: format!("visible_count={visible}"),
            passed: visible == after,
        });

        Ok(())
    }

    async fn verify_duration_filter<D: PageDriver>(
        &self,
        driver: &mut D,
        open_selector: &str,
        option_selector: &str,
        badge_selector: &str,
        max_seconds: u32,
        out: &mut Vec<AssertionOutcome>,
    ) -> E2eResult<()> {
        driver.click(open_selector).await?;
        driver.click(option_selector).await?;

        // the filtered list re-renders; wait for badges to come back
        let deadline = Instant::now() + self.config.playwright.timeouts.action;
        let mut labels = driver.text_of_all(badge_selector).await?;
        while labels.is_empty() && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(250)).await;
            labels = driver.text_of_all(badge_selector).await?;
        }

        out.push(AssertionOutcome {
            label: "filtered list is not empty".to_string(),
            selector: badge_selector.to_string(),
            expected: "at least one duration badge".to_string(),
            observed: format!("count={}", labels.len()),
            passed: !labels.is_empty(),
        });

        for label in &labels {
            let outcome = match parse_duration_seconds(label) {
                Ok(seconds) => AssertionOutcome {
                    label: format!("duration '{}'", label.trim()),
                    selector: badge_selector.to_string(),
                    expected: format!("<= {max_seconds} s"),
                    observed: format!("{seconds} s"),
                    passed: seconds <= max_seconds,
                },
                Err(_) => AssertionOutcome {
                    label: format!("duration '{}'", label.trim()),
                    selector: badge_selector.to_string(),
                    expected: "MM:SS or H:MM:SS".to_string(),
                    observed: label.clone(),
                    passed: false,
                },
            };
            out.push(outcome);
        }

        Ok(())
    }

    /// Write the suite report as pretty JSON into the output directory.
    pub fn write_report(&self, report: &SuiteReport) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.output_dir.join("suite-report.json");
        let json = serde_json::to_string_pretty(report)?;
        std::fs::write(&path, json)?;

        info!("Report written to: {}", path.display());
        Ok(path)
    }
}

async fn check_section<D: PageDriver>(
    driver: &mut D,
    section: &ResultSection,
) -> E2eResult<AssertionOutcome> {
    let visible = driver.is_visible(&section.content_selector).await?;
    let non_empty = visible && driver.is_nonempty(&section.content_selector).await?;
    Ok(AssertionOutcome {
        label: section.label.clone(),
        selector: section.content_selector.clone(),
        expected: "visible and non-empty".to_string(),
        observed: format!("visible={visible}, non_empty={non_empty}"),
        passed: visible && non_empty,
    })
}

async fn check_exactly_once<D: PageDriver>(
    driver: &mut D,
    label: &str,
    selector: &str,
) -> E2eResult<AssertionOutcome> {
    let count = driver.count(selector).await?;
    Ok(AssertionOutcome {
        label: label.to_string(),
        selector: selector.to_string(),
        expected: "exactly one match".to_string(),
        observed: format!("count={count}"),
        passed: count == 1,
    })
}

async fn check_absent<D: PageDriver>(
    driver: &mut D,
    section: &ResultSection,
) -> E2eResult<AssertionOutcome> {
    let visible = driver.is_visible(&section.content_selector).await?;
    Ok(AssertionOutcome {
        label: format!("{} absent", section.label),
        selector: section.content_selector.clone(),
        expected: "not visible".to_string(),
        observed: format!("visible={visible}"),
        passed: !visible,
    })
}

fn summarize_failures(assertions: &[AssertionOutcome]) -> String {
    let failed: Vec<String> = assertions
        .iter()
        .filter(|a| !a.passed)
        .map(|a| format!("{} (expected {}, observed {})", a.label, a.expected, a.observed))
        .collect();
    match failed.len() {
        0 => "unknown failure".to_string(),
        _ => failed.join("; "),
    }
}
