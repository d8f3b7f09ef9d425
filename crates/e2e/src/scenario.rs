//! Declarative search scenarios
//!
//! A [`ScenarioSpec`] describes one complete run of the search interaction
//! protocol: where to start, what to type, how to trigger the search and
//! which check policy decides the verdict. Specs come from the builtin
//! table or from YAML files on disk.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::driver::DeviceProfile;
use crate::error::{E2eError, E2eResult};
use crate::fixtures::SelectorRegistry;

/// One named block of the results page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSection {
    pub label: String,
    pub content_selector: String,
}

/// Both triggers are equivalent transitions; a scenario picks one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchTrigger {
    #[default]
    Button,
    EnterKey,
}

/// What the Verified stage asserts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScenarioCheck {
    /// Every section visible and non-empty.
    Results { sections: Vec<ResultSection> },
    /// The "nothing found" message exactly once, and no result sections.
    NoResults {
        message_selector: String,
        forbidden_sections: Vec<ResultSection>,
    },
    /// Landing on the results path with no query shows only the prompt.
    BlankQuery {
        prompt_selector: String,
        forbidden_sections: Vec<ResultSection>,
    },
    /// Loading more strictly grows the list and every item stays visible.
    Pagination {
        item_selector: String,
        load_more_selector: String,
    },
    /// Every remaining item's duration stays under the bound, compared
    /// numerically in seconds.
    DurationFilter {
        open_selector: String,
        option_selector: String,
        badge_selector: String,
        max_seconds: u32,
    },
}

/// A complete parametrized scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSpec {
    /// Unique name for this scenario
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering scenarios
    #[serde(default)]
    pub tags: Vec<String>,

    /// Path under the base URL where the scenario starts
    #[serde(default = "default_entry_path")]
    pub entry_path: String,

    /// None for scenarios that never type a query
    #[serde(default)]
    pub search_term: Option<String>,

    #[serde(default)]
    pub trigger: SearchTrigger,

    #[serde(default)]
    pub device: DeviceProfile,

    pub check: ScenarioCheck,
}

fn default_entry_path() -> String {
    "/".to_string()
}

impl ScenarioSpec {
    /// Parse a scenario from YAML
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        serde_yaml::from_str(yaml).map_err(E2eError::from)
    }

    /// Parse a scenario from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load all scenarios from a directory
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        let mut specs = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            specs.push(Self::from_file(entry.path())?);
        }

        Ok(specs)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// The results page address the browser must land on after a search.
///
/// The same construction feeds both `wait_for_url` and the tests, so the
/// percent-encoding of the term is consistent by definition.
pub fn results_url(base: &Url, term: &str) -> E2eResult<Url> {
    let mut url = base.join("hledani")?;
    url.query_pairs_mut().append_pair("dotaz", term);
    Ok(url)
}

static DURATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:(\d{1,2}):)?(\d{1,3}):(\d{2})$").expect("valid duration pattern"));

/// Parse a duration badge (`MM:SS` or `H:MM:SS`) to total seconds.
///
/// Comparison of duration labels must be numeric: lexicographically,
/// `"30:00" < "5:00"`, which silently inverts any bound once minute counts
/// span different digit widths. Minutes may exceed two digits when no hour
/// field is present.
pub fn parse_duration_seconds(label: &str) -> E2eResult<u32> {
    let caps = DURATION_RE
        .captures(label.trim())
        .ok_or_else(|| E2eError::DurationLabel(label.to_string()))?;

    let field = |i: usize| caps.get(i).map_or(0u32, |m| m.as_str().parse().unwrap_or(0));
    let (hours, minutes, seconds) = (field(1), field(2), field(3));

    if seconds >= 60 || (hours > 0 && minutes >= 60) {
        return Err(E2eError::DurationLabel(label.to_string()));
    }

    Ok(hours * 3600 + minutes * 60 + seconds)
}

/// The builtin scenario table for the Stream.cz search surface.
///
/// Every selector is resolved through the registry up front, so a renamed
/// logical name fails here rather than mid-scenario.
pub fn builtin_scenarios(registry: &SelectorRegistry) -> E2eResult<Vec<ScenarioSpec>> {
    let positive_sections = |reg: &SelectorRegistry| -> E2eResult<Vec<ResultSection>> {
        Ok(vec![
            ResultSection {
                label: "Nejlepší výsledek".to_string(),
                content_selector: reg.get("results.top")?.to_string(),
            },
            ResultSection {
                label: "Pořady".to_string(),
                content_selector: reg.get("results.shows")?.to_string(),
            },
            ResultSection {
                label: "Videa".to_string(),
                content_selector: reg.get("results.videos")?.to_string(),
            },
        ])
    };

    Ok(vec![
        ScenarioSpec {
            name: "search-basic".to_string(),
            description: "Search from the main page, triggered with Enter".to_string(),
            tags: vec!["search".to_string(), "smoke".to_string()],
            entry_path: "/".to_string(),
            search_term: Some("Kazma".to_string()),
            trigger: SearchTrigger::EnterKey,
            device: DeviceProfile::Desktop,
            check: ScenarioCheck::Results { sections: positive_sections(registry)? },
        },
        ScenarioSpec {
            name: "search-via-button".to_string(),
            description: "Search triggered by clicking the magnifier control".to_string(),
            tags: vec!["search".to_string()],
            entry_path: "/".to_string(),
            search_term: Some("Seznam".to_string()),
            trigger: SearchTrigger::Button,
            device: DeviceProfile::Desktop,
            check: ScenarioCheck::Results { sections: positive_sections(registry)? },
        },
        ScenarioSpec {
            name: "search-mobile".to_string(),
            description: "Search on a mobile profile behind the collapsed opener".to_string(),
            tags: vec!["search".to_string(), "mobile".to_string()],
            entry_path: "/".to_string(),
            search_term: Some("Kazma".to_string()),
            trigger: SearchTrigger::EnterKey,
            device: DeviceProfile::Mobile("Pixel 5".to_string()),
            check: ScenarioCheck::Results { sections: positive_sections(registry)? },
        },
        ScenarioSpec {
            name: "search-no-results".to_string(),
            description: "A term with no plausible matches shows the empty message".to_string(),
            tags: vec!["search".to_string()],
            entry_path: "/".to_string(),
            search_term: Some("foobarterm".to_string()),
            trigger: SearchTrigger::EnterKey,
            device: DeviceProfile::Desktop,
            check: ScenarioCheck::NoResults {
                message_selector: registry.get("results.none")?.to_string(),
                forbidden_sections: positive_sections(registry)?,
            },
        },
        ScenarioSpec {
            name: "search-blank-query".to_string(),
            description: "Landing on the results path without a query shows the prompt".to_string(),
            tags: vec!["search".to_string()],
            entry_path: "/hledani".to_string(),
            search_term: None,
            trigger: SearchTrigger::EnterKey,
            device: DeviceProfile::Desktop,
            check: ScenarioCheck::BlankQuery {
                prompt_selector: registry.get("results.prompt")?.to_string(),
                forbidden_sections: positive_sections(registry)?,
            },
        },
        ScenarioSpec {
            name: "videos-load-more".to_string(),
            description: "Loading more videos strictly grows the visible list".to_string(),
            tags: vec!["videos".to_string()],
            entry_path: "/".to_string(),
            search_term: Some("Kazma".to_string()),
            trigger: SearchTrigger::EnterKey,
            device: DeviceProfile::Desktop,
            check: ScenarioCheck::Pagination {
                item_selector: registry.get("videos.item")?.to_string(),
                load_more_selector: registry.get("videos.load-more")?.to_string(),
            },
        },
        ScenarioSpec {
            name: "videos-duration-filter".to_string(),
            description: "The 30-minute duration bucket bounds every remaining video".to_string(),
            tags: vec!["videos".to_string(), "filters".to_string()],
            entry_path: "/".to_string(),
            search_term: Some("Kazma".to_string()),
            trigger: SearchTrigger::EnterKey,
            device: DeviceProfile::Desktop,
            check: ScenarioCheck::DurationFilter {
                open_selector: registry.get("filters.open")?.to_string(),
                option_selector: registry.get("filters.duration-30")?.to_string(),
                badge_selector: registry.get("videos.duration")?.to_string(),
                max_seconds: 30 * 60,
            },
        },
    ])
}
