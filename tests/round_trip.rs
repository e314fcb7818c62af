use std::fs;
use std::path::Path;

use gtdd::parse::{parse_document, serialize_document};
use gtdd::title::TitleResolver;
use pretty_assertions::assert_eq;

fn load_fixture(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("could not read fixture {}: {}", name, e))
}

/// Helper: a canonical fixture must serialize back byte-for-byte.
fn assert_byte_stable(fixture_name: &str) {
    let source = load_fixture(fixture_name);
    let (doc, dropped) = parse_document(&source, &TitleResolver::offline());
    assert!(dropped.is_empty(), "canonical fixture dropped lines: {:?}", dropped);

    let output = serialize_document(&doc);
    assert_eq!(output, source, "round-trip failed for fixture: {}", fixture_name);
}

/// Helper: any input must be stable after one canonicalization pass.
fn assert_semantically_stable(source: &str) {
    let resolver = TitleResolver::offline();
    let (first, _) = parse_document(source, &resolver);
    let canonical = serialize_document(&first);
    let (second, dropped) = parse_document(&canonical, &resolver);

    assert!(dropped.is_empty(), "canonical output should reparse cleanly");
    assert_eq!(first, second);
    assert_eq!(canonical, serialize_document(&second));
}

// ============================================================================
// Byte-stable round trips (canonical fixtures)
// ============================================================================

#[test]
fn round_trip_simple() {
    assert_byte_stable("simple.md");
}

#[test]
fn round_trip_comments() {
    assert_byte_stable("comments.md");
}

#[test]
fn round_trip_empty() {
    assert_byte_stable("empty.md");
}

// ============================================================================
// Semantic round trips (messy input)
// ============================================================================

#[test]
fn round_trip_messy_fixture() {
    // legacy comment spellings, stray prose, an unknown heading, upper-case X
    let source = load_fixture("messy.md");
    assert_semantically_stable(&source);

    let (doc, dropped) = parse_document(&source, &TitleResolver::offline());
    assert_eq!(doc.projects.len(), 1);
    assert!(doc.projects[0].completed);
    assert_eq!(
        doc.projects[0].comments,
        vec!["verified in prod", "close ticket"]
    );
    assert_eq!(doc.next_actions[0].comments, vec!["ask about invoice"]);
    // the unknown heading and its task were dropped, along with the prose
    assert!(dropped.contains(&"# Shopping List".to_string()));
    assert!(dropped.contains(&"- [ ] milk".to_string()));
    assert!(dropped.contains(&"stray prose line".to_string()));
}

#[test]
fn round_trip_empty_string() {
    assert_semantically_stable("");
}

#[test]
fn round_trip_headings_only() {
    assert_semantically_stable("# Someday/Maybe\n# Projects\n");
}

// ============================================================================
// URL tasks
// ============================================================================

#[test]
fn url_task_round_trips_to_its_title() {
    let resolver = TitleResolver::offline();
    let source = "# Projects\n- [ ] https://example.com/spring-cleaning\n";
    let (first, _) = parse_document(source, &resolver);
    assert_eq!(first.projects[0].text, "Spring Cleaning");
    assert_eq!(
        first.projects[0].url.as_deref(),
        Some("https://example.com/spring-cleaning")
    );

    // the serialized form carries the title, not the raw URL, so the
    // reparse keeps the text but no longer knows the source link
    let canonical = serialize_document(&first);
    assert!(canonical.contains("- [ ] Spring Cleaning\n"));
    assert!(!canonical.contains("example.com"));

    let (second, _) = parse_document(&canonical, &resolver);
    assert_eq!(second.projects[0].text, "Spring Cleaning");
    assert_eq!(second.projects[0].url, None);
}
