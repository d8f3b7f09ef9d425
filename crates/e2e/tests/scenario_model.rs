//! Scenario model tests: duration parsing, YAML loading, fixtures

use test_case::test_case;

use streamcz_e2e::fixtures::{consent_cookies, SelectorRegistry, CONSENT_COOKIE_TTL};
use streamcz_e2e::scenario::{builtin_scenarios, parse_duration_seconds, ScenarioSpec, SearchTrigger};

#[test_case("5:00", 300; "five minutes")]
#[test_case("30:00", 1800; "thirty minutes")]
#[test_case("0:59", 59; "under a minute")]
#[test_case("1:02:03", 3723; "with an hour field")]
#[test_case("135:00", 8100; "minutes beyond two digits")]
#[test_case("  12:30  ", 750; "surrounding whitespace")]
fn duration_labels_parse_to_seconds(label: &str, expected: u32) {
    assert_eq!(parse_duration_seconds(label).unwrap(), expected);
}

#[test_case(""; "empty")]
#[test_case("ŽIVĚ"; "live badge")]
#[test_case("12:60"; "seconds overflow")]
#[test_case("1:75:00"; "minutes overflow with hours")]
#[test_case("12"; "no separator")]
fn unusable_duration_labels_are_rejected(label: &str) {
    assert!(parse_duration_seconds(label).is_err());
}

#[test]
fn duration_bounds_hold_where_string_comparison_lies() {
    // lexicographically "30:00" sorts below "5:00"; the numeric parse must
    // not inherit that
    assert!("30:00" < "5:00");
    assert!(parse_duration_seconds("30:00").unwrap() > parse_duration_seconds("5:00").unwrap());
}

#[test]
fn scenario_trigger_defaults_to_the_button() {
    let yaml = r#"
name: minimal
search_term: Kazma
check:
  kind: results
  sections: []
"#;
    let spec = ScenarioSpec::from_yaml(yaml).unwrap();
    assert_eq!(spec.trigger, SearchTrigger::Button);
    assert!(spec.tags.is_empty());
}

#[test]
fn scenario_files_load_from_a_directory_tree() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("mobile");
    std::fs::create_dir_all(&nested).unwrap();

    let scenario = |name: &str| {
        format!(
            r#"
name: {name}
search_term: Kazma
check:
  kind: results
  sections:
    - label: Videa
      content_selector: '[data-dot="search-videos"]'
"#
        )
    };
    std::fs::write(dir.path().join("basic.yaml"), scenario("basic")).unwrap();
    std::fs::write(nested.join("mobile.yml"), scenario("mobile")).unwrap();
    std::fs::write(dir.path().join("notes.txt"), "not a scenario").unwrap();

    let specs = ScenarioSpec::load_all(dir.path()).unwrap();
    assert_eq!(specs.len(), 2);
}

#[test]
fn builtin_sections_carry_the_three_expected_labels() {
    let specs = builtin_scenarios(&SelectorRegistry::stream_cz()).unwrap();
    let basic = specs.iter().find(|s| s.name == "search-basic").unwrap();
    match &basic.check {
        streamcz_e2e::ScenarioCheck::Results { sections } => {
            let labels: Vec<&str> = sections.iter().map(|s| s.label.as_str()).collect();
            assert_eq!(labels, ["Nejlepší výsledek", "Pořady", "Videa"]);
        }
        other => panic!("expected a results check, got {other:?}"),
    }
}

#[test]
fn consent_cookies_are_reproducible_within_a_session() {
    let first = consent_cookies(".stream.cz", CONSENT_COOKIE_TTL);
    let second = consent_cookies(".stream.cz", CONSENT_COOKIE_TTL);
    let names = |cookies: &[streamcz_e2e::CookieSpec]| -> Vec<String> {
        cookies.iter().map(|c| c.name.clone()).collect()
    };
    assert_eq!(names(&first), names(&second));
    assert!(first.iter().zip(&second).all(|(a, b)| a.value == b.value));
}
