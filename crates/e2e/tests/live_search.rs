//! Live-site smoke tests
//!
//! These hit the real site through a real browser, so they are opt-in:
//!
//!   cargo test --package streamcz-e2e --test live_search -- --ignored

use std::process::Command;

use streamcz_e2e::runner::RunnerConfig;
use streamcz_e2e::scenario::builtin_scenarios;
use streamcz_e2e::{ScenarioRunner, SelectorRegistry};

fn in_path(bin: &str) -> bool {
    Command::new("sh")
        .arg("-lc")
        .arg(format!("command -v {bin} >/dev/null 2>&1"))
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

fn live_runner() -> (ScenarioRunner, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = RunnerConfig {
        output_dir: dir.path().to_path_buf(),
        ..RunnerConfig::default()
    };
    (ScenarioRunner::new(config), dir)
}

/// Basic search against the live site.
///
/// Marked ignored because it needs Node.js with Playwright browsers
/// installed and an internet connection.
#[tokio::test]
#[ignore]
async fn live_basic_search_shows_three_sections() {
    if !in_path("node") {
        eprintln!("Skipping: node not available in PATH");
        return;
    }

    let (runner, _dir) = live_runner();
    runner.check_site_reachable().await.expect("site reachable");

    let specs = builtin_scenarios(&SelectorRegistry::stream_cz()).unwrap();
    let spec = specs.iter().find(|s| s.name == "search-basic").unwrap();

    let report = runner.run_scenario(spec).await;
    assert!(report.passed, "scenario failed: {report:#?}");
}

/// The nothing-found message for a term with no plausible matches.
#[tokio::test]
#[ignore]
async fn live_nonsense_term_shows_the_empty_message() {
    if !in_path("node") {
        eprintln!("Skipping: node not available in PATH");
        return;
    }

    let (runner, _dir) = live_runner();
    runner.check_site_reachable().await.expect("site reachable");

    let specs = builtin_scenarios(&SelectorRegistry::stream_cz()).unwrap();
    let spec = specs.iter().find(|s| s.name == "search-no-results").unwrap();

    let report = runner.run_scenario(spec).await;
    assert!(report.passed, "scenario failed: {report:#?}");
}
