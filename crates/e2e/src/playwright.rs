//! Playwright-backed page driver
//!
//! Drives Playwright through a small Node.js command loop spawned per
//! session: the Rust side writes one JSON command per stdin line and reads
//! one JSON result per stdout line, so cookies, navigation and assertions
//! all share a single browser context. Playwright's own per-operation
//! timeouts apply inside the loop; the Rust side adds an outer deadline so
//! a wedged driver process cannot hang a scenario forever.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, warn};

use crate::driver::{DeviceProfile, PageDriver, Timeouts, WaitPolicy};
use crate::error::{E2eError, E2eResult};
use crate::fixtures::CookieSpec;

use async_trait::async_trait;

/// Extra slack on top of the in-driver Playwright timeout before the Rust
/// side declares the driver unresponsive.
const DEADLINE_GRACE: Duration = Duration::from_secs(5);

/// Browser launch can pull a cold profile; give it its own budget.
const LAUNCH_TIMEOUT: Duration = Duration::from_secs(60);

const SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    fn as_str(self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

/// Configuration for one Playwright session.
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub browser: Browser,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub device: DeviceProfile,
    pub timeouts: Timeouts,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            browser: Browser::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            device: DeviceProfile::Desktop,
            timeouts: Timeouts::default(),
        }
    }
}

/// One live browser session behind the [`PageDriver`] seam.
pub struct PlaywrightPage {
    child: Child,
    stdin: ChildStdin,
    lines: Lines<BufReader<ChildStdout>>,
    timeouts: Timeouts,
    next_id: u64,
    // keeps the bootstrap script alive for the life of the session
    _workdir: tempfile::TempDir,
}

impl PlaywrightPage {
    /// Spawn the driver process and open a browser context.
    pub async fn launch(config: &PlaywrightConfig) -> E2eResult<Self> {
        check_node_installed()?;

        let workdir = tempfile::tempdir()?;
        let script_path = workdir.path().join("driver.js");
        std::fs::write(&script_path, DRIVER_JS)?;

        debug!("Spawning Playwright driver: node {}", script_path.display());

        let mut child = Command::new("node")
            .arg(&script_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Driver("driver stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Driver("driver stdout unavailable".to_string()))?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(target: "playwright", "{line}");
                }
            });
        }

        let mut page = Self {
            child,
            stdin,
            lines: BufReader::new(stdout).lines(),
            timeouts: config.timeouts,
            next_id: 0,
            _workdir: workdir,
        };

        let device = match &config.device {
            DeviceProfile::Desktop => Value::Null,
            DeviceProfile::Mobile(name) => Value::String(name.clone()),
        };
        page.command(
            "launch",
            json!({
                "browser": config.browser.as_str(),
                "headless": config.headless,
                "width": config.viewport_width,
                "height": config.viewport_height,
                "device": device,
                "navTimeoutMs": config.timeouts.navigation.as_millis() as u64,
                "actionTimeoutMs": config.timeouts.action.as_millis() as u64,
            }),
            LAUNCH_TIMEOUT,
        )
        .await
        .map_err(|e| E2eError::Setup(e.to_string()))?;

        Ok(page)
    }

    async fn command(&mut self, cmd: &str, params: Value, budget: Duration) -> E2eResult<Value> {
        self.next_id += 1;
        let id = self.next_id;
        let envelope = json!({ "id": id, "cmd": cmd, "params": params });
        let mut line = serde_json::to_string(&envelope)?;
        line.push('\n');
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;

        let read = async {
            loop {
                let Some(line) = self.lines.next_line().await? else {
                    return Err(E2eError::Driver("driver process closed its stdout".to_string()));
                };
                if line.trim().is_empty() {
                    continue;
                }
                let resp: DriverResponse = serde_json::from_str(&line)?;
                if resp.id != id {
                    // stale reply from an operation a previous deadline gave up on
                    continue;
                }
                if resp.ok {
                    return Ok(resp.value.unwrap_or(Value::Null));
                }
                return Err(map_driver_error(cmd, &envelope["params"], resp.error.unwrap_or_default()));
            }
        };

        match tokio::time::timeout(budget + DEADLINE_GRACE, read).await {
            Ok(result) => result,
            Err(_) => Err(E2eError::Driver(format!(
                "driver unresponsive: no reply to '{cmd}' within {} ms",
                (budget + DEADLINE_GRACE).as_millis()
            ))),
        }
    }

    async fn action(&mut self, cmd: &str, params: Value) -> E2eResult<Value> {
        let budget = self.timeouts.action;
        self.command(cmd, params, budget).await
    }

    async fn shutdown(&mut self) -> E2eResult<()> {
        // ask nicely first; the loop exits after replying
        let _ = self.command("close", json!({}), SHUTDOWN_GRACE).await;

        if tokio::time::timeout(SHUTDOWN_GRACE, self.child.wait())
            .await
            .is_err()
        {
            #[cfg(unix)]
            if let Some(pid) = self.child.id() {
                use nix::sys::signal::{kill, Signal};
                use nix::unistd::Pid;

                if kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok() {
                    tokio::time::sleep(Duration::from_millis(500)).await;
                }
            }
            let _ = self.child.start_kill();
            let _ = self.child.wait().await;
            warn!("Playwright driver did not exit cleanly, killed");
        }
        Ok(())
    }
}

impl Drop for PlaywrightPage {
    fn drop(&mut self) {
        // kill_on_drop covers the process; this is only the fast path
        let _ = self.child.start_kill();
    }
}

#[async_trait]
impl PageDriver for PlaywrightPage {
    async fn navigate(&mut self, url: &str, wait: WaitPolicy) -> E2eResult<()> {
        let budget = self.timeouts.navigation;
        self.command(
            "goto",
            json!({ "url": url, "waitUntil": wait.as_playwright() }),
            budget,
        )
        .await?;
        Ok(())
    }

    async fn set_cookies(&mut self, cookies: &[CookieSpec]) -> E2eResult<()> {
        let cookies = serde_json::to_value(cookies)?;
        self.action("addCookies", json!({ "cookies": cookies })).await?;
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> E2eResult<()> {
        self.action("click", json!({ "selector": selector })).await?;
        Ok(())
    }

    async fn fill(&mut self, selector: &str, text: &str) -> E2eResult<()> {
        self.action("fill", json!({ "selector": selector, "text": text })).await?;
        Ok(())
    }

    async fn press(&mut self, selector: &str, key: &str) -> E2eResult<()> {
        self.action("press", json!({ "selector": selector, "key": key })).await?;
        Ok(())
    }

    async fn wait_for_url(&mut self, pattern: &str) -> E2eResult<()> {
        let budget = self.timeouts.navigation;
        self.command("waitForUrl", json!({ "pattern": pattern }), budget).await?;
        Ok(())
    }

    async fn current_url(&mut self) -> E2eResult<String> {
        let value = self.action("url", json!({})).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn count(&mut self, selector: &str) -> E2eResult<usize> {
        let value = self.action("count", json!({ "selector": selector })).await?;
        Ok(value.as_u64().unwrap_or(0) as usize)
    }

    async fn count_visible(&mut self, selector: &str) -> E2eResult<usize> {
        let value = self.action("countVisible", json!({ "selector": selector })).await?;
        Ok(value.as_u64().unwrap_or(0) as usize)
    }

    async fn text_of_all(&mut self, selector: &str) -> E2eResult<Vec<String>> {
        let value = self.action("texts", json!({ "selector": selector })).await?;
        let texts = value
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        Ok(texts)
    }

    async fn is_visible(&mut self, selector: &str) -> E2eResult<bool> {
        let value = self.action("isVisible", json!({ "selector": selector })).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn screenshot(&mut self, path: &Path) -> E2eResult<()> {
        self.action("screenshot", json!({ "path": path.to_string_lossy() })).await?;
        Ok(())
    }

    async fn close(&mut self) -> E2eResult<()> {
        self.shutdown().await
    }
}

/// Check Node.js is available before trying to spawn the driver.
fn check_node_installed() -> E2eResult<()> {
    let status = std::process::Command::new("node")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match status {
        Ok(status) if status.success() => Ok(()),
        _ => Err(E2eError::NodeNotFound),
    }
}

#[derive(Debug, Deserialize)]
struct DriverResponse {
    id: u64,
    ok: bool,
    #[serde(default)]
    value: Option<Value>,
    #[serde(default)]
    error: Option<DriverError>,
}

#[derive(Debug, Default, Deserialize)]
struct DriverError {
    #[serde(default)]
    kind: String,
    #[serde(default)]
    message: String,
    #[serde(default, rename = "elapsedMs")]
    elapsed_ms: Option<u64>,
}

fn map_driver_error(cmd: &str, params: &Value, err: DriverError) -> E2eError {
    let str_param = |key: &str| {
        params
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    let elapsed_ms = err.elapsed_ms.unwrap_or(0);

    match (err.kind.as_str(), cmd) {
        ("timeout", "goto") => E2eError::NavigationTimeout { url: str_param("url"), elapsed_ms },
        ("timeout", "waitForUrl") => E2eError::RedirectTimeout {
            pattern: str_param("pattern"),
            elapsed_ms,
        },
        ("timeout", _) => E2eError::ElementNotFound {
            selector: str_param("selector"),
            timeout_ms: elapsed_ms,
        },
        ("not_interactable", _) => E2eError::ElementNotInteractable {
            selector: str_param("selector"),
            reason: err.message,
        },
        (_, "goto") => E2eError::Navigation { url: str_param("url"), reason: err.message },
        _ => E2eError::Driver(err.message),
    }
}

/// The Node.js side of the protocol. One JSON command per stdin line, one
/// JSON result per stdout line; commands run strictly in order.
const DRIVER_JS: &str = r#"
// Line-oriented Playwright driver for the Rust harness.
const readline = require('readline');
const { chromium, firefox, webkit, devices } = require('playwright');

let browser = null;
let context = null;
let page = null;

function reply(id, value) {
  process.stdout.write(JSON.stringify({ id, ok: true, value }) + '\n');
}

function fail(id, kind, message, elapsedMs) {
  process.stdout.write(JSON.stringify({ id, ok: false, error: { kind, message, elapsedMs } }) + '\n');
}

function classify(err) {
  const m = String((err && err.message) || err);
  if (m.includes('not visible') || m.includes('disabled') || m.includes('intercepts pointer events')) {
    return 'not_interactable';
  }
  if (err && err.name === 'TimeoutError') return 'timeout';
  return 'driver';
}

async function handle(cmd, p) {
  switch (cmd) {
    case 'launch': {
      const engines = { chromium, firefox, webkit };
      browser = await engines[p.browser || 'chromium'].launch({ headless: p.headless !== false });
      const opts = p.device && devices[p.device]
        ? { ...devices[p.device] }
        : { viewport: { width: p.width || 1280, height: p.height || 720 } };
      context = await browser.newContext(opts);
      context.setDefaultTimeout(p.actionTimeoutMs || 7000);
      context.setDefaultNavigationTimeout(p.navTimeoutMs || 30000);
      page = await context.newPage();
      return null;
    }
    case 'addCookies':
      await context.addCookies(p.cookies);
      return null;
    case 'goto':
      await page.goto(p.url, { waitUntil: p.waitUntil });
      return null;
    case 'click':
      await page.locator(p.selector).first().click();
      return null;
    case 'fill':
      await page.locator(p.selector).first().fill(p.text);
      return null;
    case 'press':
      await page.locator(p.selector).first().press(p.key);
      return null;
    case 'waitForUrl':
      await page.waitForURL(p.pattern);
      return null;
    case 'url':
      return page.url();
    case 'count':
      return await page.locator(p.selector).count();
    case 'countVisible': {
      const all = await page.locator(p.selector).all();
      let visible = 0;
      for (const el of all) {
        if (await el.isVisible()) visible += 1;
      }
      return visible;
    }
    case 'texts':
      return await page.locator(p.selector).allInnerTexts();
    case 'isVisible':
      return await page.locator(p.selector).first().isVisible();
    case 'screenshot':
      await page.screenshot({ path: p.path, fullPage: true });
      return null;
    case 'close':
      if (browser) await browser.close();
      return null;
    default:
      throw new Error('unknown command: ' + cmd);
  }
}

const rl = readline.createInterface({ input: process.stdin });
let queue = Promise.resolve();

rl.on('line', (line) => {
  if (!line.trim()) return;
  let req;
  try {
    req = JSON.parse(line);
  } catch (err) {
    return;
  }
  queue = queue.then(async () => {
    const started = Date.now();
    try {
      const value = await handle(req.cmd, req.params || {});
      reply(req.id, value);
      if (req.cmd === 'close') process.exit(0);
    } catch (err) {
      fail(req.id, classify(err), String((err && err.message) || err), Date.now() - started);
    }
  });
});

rl.on('close', () => {
  const cleanup = browser ? browser.close().catch(() => {}) : Promise.resolve();
  cleanup.then(() => process.exit(0));
});
"#;
