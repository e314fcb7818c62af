use std::sync::Arc;
use std::thread;

use gtdd::server::Daemon;
use gtdd::store::TaskStore;
use gtdd::title::TitleResolver;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

/// Bind a daemon on an ephemeral port with an offline title resolver.
/// The accept loop runs on a background thread for the life of the test
/// process.
fn spawn_daemon() -> (TempDir, String) {
    let tmp = TempDir::new().unwrap();
    let store = Arc::new(TaskStore::new(
        tmp.path().join("tasks.md"),
        TitleResolver::offline(),
    ));
    let daemon = Daemon::bind("127.0.0.1:0", store).unwrap();
    let base = format!("http://127.0.0.1:{}", daemon.port());
    thread::spawn(move || daemon.run());
    (tmp, base)
}

#[test]
fn get_tasks_defaults_to_markdown() {
    let (_tmp, base) = spawn_daemon();
    let response = ureq::get(&format!("{}/api/gtd/tasks", base)).call().unwrap();
    assert_eq!(response.status(), 200);
    assert!(response.content_type().starts_with("text/markdown"));
    let body = response.into_string().unwrap();
    assert_eq!(
        body,
        "# Projects\n\n# Next Actions\n\n# Waiting For\n\n# Someday/Maybe\n"
    );
}

#[test]
fn get_tasks_as_json_has_all_categories() {
    let (_tmp, base) = spawn_daemon();
    let response = ureq::get(&format!("{}/api/gtd/tasks", base))
        .set("Accept", "application/json")
        .call()
        .unwrap();
    assert_eq!(response.content_type(), "application/json");
    let doc: serde_json::Value = response.into_json().unwrap();
    for key in ["projects", "next_actions", "waiting_for", "someday_maybe"] {
        assert!(doc[key].as_array().unwrap().is_empty());
    }
}

#[test]
fn accept_header_is_matched_case_insensitively() {
    let (_tmp, base) = spawn_daemon();
    let response = ureq::get(&format!("{}/api/gtd/tasks", base))
        .set("accept", "application/json")
        .call()
        .unwrap();
    assert_eq!(response.content_type(), "application/json");
}

#[test]
fn unreadable_body_leaves_tasks_untouched() {
    let (_tmp, base) = spawn_daemon();
    ureq::put(&format!("{}/api/gtd/tasks", base))
        .set("Content-Type", "text/markdown")
        .send_string("# Projects\n- [ ] precious task\n")
        .unwrap();

    // `# ` followed by bytes that are not UTF-8
    let result = ureq::put(&format!("{}/api/gtd/tasks", base))
        .set("Content-Type", "text/markdown")
        .send_bytes(&[0x23, 0x20, 0xff, 0xfe, 0xfd]);
    match result {
        Err(ureq::Error::Status(code, _)) => assert_eq!(code, 400),
        other => panic!("expected 400, got {:?}", other.map(|r| r.status())),
    }

    let markdown = ureq::get(&format!("{}/api/gtd/tasks", base))
        .call()
        .unwrap()
        .into_string()
        .unwrap();
    assert!(markdown.contains("- [ ] precious task\n"));
}

#[test]
fn put_markdown_then_read_back() {
    let (_tmp, base) = spawn_daemon();
    let response = ureq::put(&format!("{}/api/gtd/tasks", base))
        .set("Content-Type", "text/markdown")
        .send_string("# Projects\n- [ ] Write spec\n  note: draft only\n")
        .unwrap();
    assert_eq!(response.status(), 200);

    let doc: serde_json::Value = ureq::get(&format!("{}/api/gtd/tasks", base))
        .set("Accept", "application/json")
        .call()
        .unwrap()
        .into_json()
        .unwrap();
    assert_eq!(doc["projects"][0]["text"], "Write spec");
    assert_eq!(doc["projects"][0]["completed"], false);
    assert_eq!(doc["projects"][0]["comments"][0], "note: draft only");
}

#[test]
fn put_json_document_body() {
    let (_tmp, base) = spawn_daemon();
    let response = ureq::put(&format!("{}/api/gtd/tasks", base))
        .set("Content-Type", "application/json")
        .send_string(r#"{"waiting_for":[{"text":"invoice from plumber"}]}"#)
        .unwrap();
    assert_eq!(response.status(), 200);

    let markdown = ureq::get(&format!("{}/api/gtd/tasks", base))
        .call()
        .unwrap()
        .into_string()
        .unwrap();
    assert!(markdown.contains("# Waiting For\n- [ ] invoice from plumber\n"));
}

#[test]
fn put_malformed_json_is_rejected() {
    let (_tmp, base) = spawn_daemon();
    let result = ureq::put(&format!("{}/api/gtd/tasks", base))
        .set("Content-Type", "application/json")
        .send_string("not json {{{");
    match result {
        Err(ureq::Error::Status(code, response)) => {
            assert_eq!(code, 400);
            let body: serde_json::Value = response.into_json().unwrap();
            assert!(body["error"].as_str().unwrap().starts_with("invalid document"));
        }
        other => panic!("expected 400, got {:?}", other.map(|r| r.status())),
    }
}

#[test]
fn delete_clears_all_tasks() {
    let (_tmp, base) = spawn_daemon();
    ureq::put(&format!("{}/api/gtd/tasks", base))
        .send_string("# Projects\n- [ ] gone soon\n")
        .unwrap();

    let response = ureq::delete(&format!("{}/api/gtd/tasks", base)).call().unwrap();
    assert_eq!(response.status(), 200);

    let doc: serde_json::Value = ureq::get(&format!("{}/api/gtd/tasks", base))
        .set("Accept", "application/json")
        .call()
        .unwrap()
        .into_json()
        .unwrap();
    for key in ["projects", "next_actions", "waiting_for", "someday_maybe"] {
        assert!(doc[key].as_array().unwrap().is_empty());
    }
}

#[test]
fn title_endpoint_resolves_from_path_segment() {
    let (_tmp, base) = spawn_daemon();
    // offline resolver: the fetch strategy fails, the path segment wins
    let doc: serde_json::Value =
        ureq::get(&format!("{}/api/gtd/title", base))
            .query("url", "https://example.com/deep-work")
            .call()
            .unwrap()
            .into_json()
            .unwrap();
    assert_eq!(doc["title"], "Deep Work");
}

#[test]
fn title_endpoint_requires_url_parameter() {
    let (_tmp, base) = spawn_daemon();
    let result = ureq::get(&format!("{}/api/gtd/title", base)).call();
    match result {
        Err(ureq::Error::Status(code, _)) => assert_eq!(code, 400),
        other => panic!("expected 400, got {:?}", other.map(|r| r.status())),
    }
}

#[test]
fn unknown_route_is_404() {
    let (_tmp, base) = spawn_daemon();
    let result = ureq::get(&format!("{}/api/nope", base)).call();
    match result {
        Err(ureq::Error::Status(code, _)) => assert_eq!(code, 404),
        other => panic!("expected 404, got {:?}", other.map(|r| r.status())),
    }
}
