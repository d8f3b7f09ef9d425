//! Named selectors and consent-cookie fixtures
//!
//! Every locator the scenarios touch lives here under a logical name, so a
//! markup change on the site is a one-file edit. Selector strings use
//! Playwright syntax and are configuration data, not logic.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{E2eError, E2eResult};

/// TCF consent string v2 accepted by the site's CMP.
const EUCONSENT_V2: &str = "CPWQiJUPWQiJUD3ACBCSCHCsAP_AAEPAAATIIDoBhCokBSFCAGpYIIMAAAAHxxAAYCACABAAoAABABIAIAQAAAAQAAAgBAAAABQAIAIAAAAACEAAAAAAAAAAAQAAAAAAAAAAIQIAAAAAACBAAAAAAABAAAAAAABAQAAAggAAAAIAAAAAAAEAgAAAAAAAAAAAAAAAAAgAAAAAAAAAAAgd1AmAAWABUAC4AGQAQAAyABoADmAIgAigBMACeAFUAMQAfgBCQCIAIkARwAnABSgCxAGWAM0AdwA_QCEAEWALQAXUAwIBrAD5AJBATaAtQBeYDSgGpgO6AAAA.YAAAAAAAAAAA";

/// Cookie lifetime used for a test session.
pub const CONSENT_COOKIE_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

/// One cookie in the shape Playwright's `context.addCookies` expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieSpec {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    /// Absolute expiry as unix seconds. Must be in the future at build time.
    pub expires: f64,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSite,
}

/// Build the three cookies that keep the CMP dialog from blocking every
/// interaction. Must be applied before the first navigation of a session.
pub fn consent_cookies(domain: &str, ttl: Duration) -> Vec<CookieSpec> {
    let expires = Utc::now().timestamp() as f64 + ttl.as_secs_f64();
    let cookie = |name: &str, value: &str| CookieSpec {
        name: name.to_string(),
        value: value.to_string(),
        domain: domain.to_string(),
        path: "/".to_string(),
        expires,
        http_only: false,
        secure: true,
        same_site: SameSite::None,
    };

    vec![
        cookie("euconsent-v2", EUCONSENT_V2),
        // unix timestamp of first visit, any nonzero value works
        cookie("cmppersisttestcookie", "1"),
        // purpose1 consent helper
        cookie("szncmpone", "1"),
    ]
}

/// Central lookup of logical locator names.
#[derive(Debug, Clone, Default)]
pub struct SelectorRegistry {
    selectors: HashMap<String, String>,
}

impl SelectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, selector: impl Into<String>) {
        self.selectors.insert(name.into(), selector.into());
    }

    /// Resolve a logical name, failing fast on a typo instead of deep inside
    /// a running scenario.
    pub fn get(&self, name: &str) -> E2eResult<&str> {
        self.selectors
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| E2eError::UnknownSelector(name.to_string()))
    }

    /// The locator set for the Stream.cz search surface.
    pub fn stream_cz() -> Self {
        let mut reg = Self::new();

        reg.register("search.input", r#"[placeholder="Zadejte, co chcete hledat"]"#);
        reg.register("search.submit", r#"[aria-label="Vyhledat"]"#);
        // mobile header collapses the field behind an opener button
        reg.register("search.opener", r#"[aria-label="Otevřít vyhledávání"]"#);

        reg.register("results.top", r#"[data-dot="search-best-result"]"#);
        reg.register("results.shows", r#"[data-dot="search-shows"]"#);
        reg.register("results.videos", r#"[data-dot="search-videos"]"#);
        reg.register("results.none", r#"main :text("Bohužel jsme nic nenašli")"#);
        reg.register("results.prompt", r#"main :text("Zadejte, co chcete hledat")"#);

        reg.register("videos.item", r#"[data-dot="search-videos"] li"#);
        reg.register("videos.load-more", r#"button:has-text("Načíst další")"#);
        reg.register("videos.duration", r#"[data-dot="search-videos"] [data-dot="duration"]"#);

        reg.register("filters.open", r#"button:has-text("Filtry")"#);
        reg.register("filters.duration-30", r#"label:has-text("Do 30 minut")"#);

        reg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consent_cookies_cover_the_cmp_triple() {
        let cookies = consent_cookies(".stream.cz", CONSENT_COOKIE_TTL);
        let names: Vec<&str> = cookies.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["euconsent-v2", "cmppersisttestcookie", "szncmpone"]);
        for c in &cookies {
            assert_eq!(c.domain, ".stream.cz");
            assert_eq!(c.path, "/");
            assert!(c.secure);
            assert!(!c.http_only);
            assert_eq!(c.same_site, SameSite::None);
        }
    }

    #[test]
    fn consent_cookie_expiry_is_in_the_future() {
        let cookies = consent_cookies(".stream.cz", CONSENT_COOKIE_TTL);
        let now = Utc::now().timestamp() as f64;
        assert!(cookies.iter().all(|c| c.expires > now));
    }

    #[test]
    fn cookies_serialize_with_playwright_field_names() {
        let cookie = &consent_cookies(".stream.cz", CONSENT_COOKIE_TTL)[0];
        let json = serde_json::to_value(cookie).unwrap();
        assert!(json.get("httpOnly").is_some());
        assert!(json.get("sameSite").is_some());
        assert_eq!(json["sameSite"], "None");
    }

    #[test]
    fn registry_resolves_registered_names() {
        let reg = SelectorRegistry::stream_cz();
        assert_eq!(reg.get("search.submit").unwrap(), r#"[aria-label="Vyhledat"]"#);
    }

    #[test]
    fn registry_fails_fast_on_unknown_names() {
        let reg = SelectorRegistry::stream_cz();
        match reg.get("search.doesnotexist") {
            Err(E2eError::UnknownSelector(name)) => assert_eq!(name, "search.doesnotexist"),
            other => panic!("expected UnknownSelector, got {other:?}"),
        }
    }
}
