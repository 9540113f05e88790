use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::TempDir;

fn ng_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("ng");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"default_project = "main"

[db]
path = "{root}/data/ng.sqlite"

[projects.main]
home = "{root}/notes"

[projects.side]
home = "{root}/side"

[context]
depth = 1
timeframe = "7d"
page_size = 10
max_related = 10
"#,
        root = root.display()
    );

    let config_path = config_dir.join("ng.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_ng(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = ng_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run ng binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn run_ng_with_stdin(config_path: &Path, args: &[&str], input: &str) -> (String, String, bool) {
    let mut child = Command::new(ng_binary())
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();
    let output = child.wait_with_output().unwrap();

    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.success(),
    )
}

fn write_note(config_path: &Path, title: &str, folder: &str, content: &str) -> String {
    let (stdout, stderr, success) = run_ng(
        config_path,
        &["write-note", "--title", title, "--folder", folder, "--content", content],
    );
    assert!(success, "write-note failed: stdout={}, stderr={}", stdout, stderr);
    stdout
}

fn json(stdout: &str) -> serde_json::Value {
    serde_json::from_str(stdout).unwrap_or_else(|e| panic!("not JSON ({}): {}", e, stdout))
}

#[test]
fn test_init_creates_database_and_home() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_ng(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/ng.sqlite").exists());
    assert!(tmp.path().join("notes").is_dir());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_ng(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_ng(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_write_note_creates_then_updates() {
    let (tmp, config_path) = setup_test_env();
    run_ng(&config_path, &["init"]);

    let first = write_note(&config_path, "Alpha", "notes", "# Alpha\n\nRust programming.");
    assert!(first.contains("# Created: notes/Alpha.md"), "{}", first);
    assert!(first.contains("id: 1"));

    let second = write_note(&config_path, "Alpha", "notes", "# Alpha\n\nUpdated text.");
    assert!(second.contains("# Updated: notes/Alpha.md"), "{}", second);
    assert!(second.contains("id: 1"));

    let on_disk = fs::read_to_string(tmp.path().join("notes/notes/Alpha.md")).unwrap();
    assert!(on_disk.starts_with("---\ntitle: \"Alpha\"\ntype: note\n---\n"));
    assert!(on_disk.contains("Updated text."));
}

#[test]
fn test_write_note_from_stdin() {
    let (_tmp, config_path) = setup_test_env();
    run_ng(&config_path, &["init"]);

    let (stdout, stderr, success) = run_ng_with_stdin(
        &config_path,
        &["write-note", "--title", "Piped", "--folder", "inbox"],
        "# Piped\n\nFrom a pipe.\n",
    );
    assert!(success, "stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("# Created: inbox/Piped.md"));

    let (body, _, success) = run_ng(&config_path, &["read-note", "inbox/Piped.md"]);
    assert!(success);
    assert!(body.contains("From a pipe."));
}

#[test]
fn test_write_note_rejects_empty_content() {
    let (_tmp, config_path) = setup_test_env();
    run_ng(&config_path, &["init"]);

    let (_, stderr, success) = run_ng_with_stdin(
        &config_path,
        &["write-note", "--title", "Empty", "--folder", "notes"],
        "   \n",
    );
    assert!(!success);
    assert!(stderr.contains("Empty content"), "stderr={}", stderr);
}

#[test]
fn test_write_note_rejects_escaping_folder() {
    let (tmp, config_path) = setup_test_env();
    run_ng(&config_path, &["init"]);

    let (_, stderr, success) = run_ng(
        &config_path,
        &["write-note", "--title", "Evil", "--folder", "../../outside", "--content", "x"],
    );
    assert!(!success);
    assert!(stderr.contains("outside the project root"), "stderr={}", stderr);
    assert!(!tmp.path().join("outside").exists());
}

#[test]
fn test_read_note_by_title_and_url() {
    let (_tmp, config_path) = setup_test_env();
    run_ng(&config_path, &["init"]);
    write_note(&config_path, "Beta", "docs", "Beta body text");

    for identifier in ["Beta", "memory://docs/Beta.md", "Beta.md"] {
        let (stdout, stderr, success) = run_ng(&config_path, &["read-note", identifier]);
        assert!(success, "{}: {}", identifier, stderr);
        assert!(stdout.contains("Beta body text"), "{}: {}", identifier, stdout);
    }
}

#[test]
fn test_read_note_suggests_on_miss() {
    let (_tmp, config_path) = setup_test_env();
    run_ng(&config_path, &["init"]);
    write_note(&config_path, "Gamma", "docs", "kubernetes deployment notes");

    let (stdout, _, success) = run_ng(&config_path, &["read-note", "kubernetes"]);
    assert!(success);
    assert!(stdout.contains("Note not found"));
    assert!(stdout.contains("docs/Gamma.md"));

    let (_, stderr, success) = run_ng(&config_path, &["read-note", "nothing-like-this"]);
    assert!(!success);
    assert!(stderr.contains("Note not found"));
}

#[test]
fn test_canvas_create_and_update() {
    let (tmp, config_path) = setup_test_env();
    run_ng(&config_path, &["init"]);

    let nodes = r#"[{"id":"n1","type":"text","text":"Hello","x":0,"y":0,"width":200,"height":80}]"#;
    let args = [
        "canvas", "--nodes", nodes, "--edges", "[]", "--title", "Flow", "--folder", "diagrams",
    ];

    let (stdout, stderr, success) = run_ng(&config_path, &args);
    assert!(success, "stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("# Created: diagrams/Flow.canvas"));

    let (stdout, _, success) = run_ng(&config_path, &args);
    assert!(success);
    assert!(stdout.contains("# Updated: diagrams/Flow.canvas"));

    let written = fs::read_to_string(tmp.path().join("notes/diagrams/Flow.canvas")).unwrap();
    let parsed = json(&written);
    assert_eq!(parsed["nodes"][0]["id"], "n1");
}

#[test]
fn test_canvas_rejects_invalid_json() {
    let (_tmp, config_path) = setup_test_env();
    run_ng(&config_path, &["init"]);

    let (_, stderr, success) = run_ng(
        &config_path,
        &["canvas", "--nodes", "{not json", "--edges", "[]", "--title", "Bad", "--folder", "d"],
    );
    assert!(!success);
    assert!(stderr.contains("Invalid JSON"), "stderr={}", stderr);
}

#[test]
fn test_build_context_follows_relations() {
    let (_tmp, config_path) = setup_test_env();
    run_ng(&config_path, &["init"]);
    write_note(&config_path, "X", "notes", "x");
    write_note(&config_path, "Y", "notes", "y");
    write_note(&config_path, "Z", "notes", "z");

    let (_, stderr, success) = run_ng(&config_path, &["relate", "X", "Y"]);
    assert!(success, "{}", stderr);
    let (_, stderr, success) = run_ng(&config_path, &["relate", "Y", "Z"]);
    assert!(success, "{}", stderr);

    let (stdout, stderr, success) =
        run_ng(&config_path, &["build-context", "memory://notes/X.md"]);
    assert!(success, "{}", stderr);
    let ctx = json(&stdout);
    assert_eq!(ctx["primary_results"][0]["title"], "X");
    let related = ctx["related_results"].as_array().unwrap();
    assert_eq!(related.len(), 1);
    assert_eq!(related[0]["entity"]["title"], "Y");
    assert_eq!(related[0]["hop_distance"], 1);

    let (stdout, _, success) = run_ng(
        &config_path,
        &["build-context", "memory://notes/X.md", "--depth", "2"],
    );
    assert!(success);
    let ctx = json(&stdout);
    assert_eq!(ctx["related_results"].as_array().unwrap().len(), 2);
    assert_eq!(ctx["metadata"]["depth"], 2);
}

#[test]
fn test_build_context_depth_zero_and_empty() {
    let (_tmp, config_path) = setup_test_env();
    run_ng(&config_path, &["init"]);
    write_note(&config_path, "a", "notes", "# A");
    write_note(&config_path, "a", "notes", "# A updated");

    let (stdout, _, success) = run_ng(&config_path, &["build-context", "a.md", "--depth", "0"]);
    assert!(success);
    let ctx = json(&stdout);
    let primaries = ctx["primary_results"].as_array().unwrap();
    assert_eq!(primaries.len(), 1);
    assert_eq!(primaries[0]["id"], 1);
    assert!(ctx.get("related_results").is_none());

    let (stdout, _, success) = run_ng(&config_path, &["build-context", "missing/none.md"]);
    assert!(success);
    let ctx = json(&stdout);
    assert!(ctx["primary_results"].as_array().unwrap().is_empty());
}

#[test]
fn test_build_context_rejects_bad_reference() {
    let (_tmp, config_path) = setup_test_env();
    run_ng(&config_path, &["init"]);

    let (_, stderr, success) = run_ng(&config_path, &["build-context", "memory://../etc"]);
    assert!(!success);
    assert!(stderr.contains("invalid reference"), "stderr={}", stderr);
}

#[test]
fn test_relate_forward_reference_resolves_on_create() {
    let (_tmp, config_path) = setup_test_env();
    run_ng(&config_path, &["init"]);
    write_note(&config_path, "Now", "notes", "now");

    let (stdout, stderr, success) = run_ng(&config_path, &["relate", "Now", "Later", "--type", "leads_to"]);
    assert!(success, "{}", stderr);
    let relation = json(&stdout);
    assert_eq!(relation["target"]["unresolved"], "Later");

    write_note(&config_path, "Later", "notes", "later");

    let (stdout, _, success) = run_ng(&config_path, &["build-context", "Now"]);
    assert!(success);
    let ctx = json(&stdout);
    assert_eq!(ctx["related_results"][0]["entity"]["title"], "Later");
    assert_eq!(
        ctx["related_results"][0]["relation_path"][0]["relation_type"],
        "leads_to"
    );
}

#[test]
fn test_recent_activity_filters_by_type() {
    let (_tmp, config_path) = setup_test_env();
    run_ng(&config_path, &["init"]);
    write_note(&config_path, "Recent", "notes", "fresh");
    run_ng(
        &config_path,
        &["canvas", "--nodes", "[]", "--edges", "[]", "--title", "Board", "--folder", "b"],
    );

    let (stdout, _, success) = run_ng(&config_path, &["recent-activity", "--type", "canvas"]);
    assert!(success);
    let ctx = json(&stdout);
    let primaries = ctx["primary_results"].as_array().unwrap();
    assert_eq!(primaries.len(), 1);
    assert_eq!(primaries[0]["entity_type"], "canvas");
    assert_eq!(ctx["metadata"]["types"][0], "canvas");

    let (stdout, _, success) = run_ng(&config_path, &["recent-activity"]);
    assert!(success);
    assert_eq!(json(&stdout)["primary_results"].as_array().unwrap().len(), 2);
}

#[test]
fn test_continue_with_topic() {
    let (_tmp, config_path) = setup_test_env();
    run_ng(&config_path, &["init"]);
    write_note(&config_path, "Deploy", "ops", "kubernetes rollout plan");
    write_note(&config_path, "Lunch", "misc", "sandwiches");

    let (stdout, stderr, success) = run_ng(&config_path, &["continue", "--topic", "kubernetes"]);
    assert!(success, "{}", stderr);
    let ctx = json(&stdout);
    let primaries = ctx["primary_results"].as_array().unwrap();
    assert_eq!(primaries.len(), 1);
    assert_eq!(primaries[0]["title"], "Deploy");
}

#[test]
fn test_search_text_and_title() {
    let (_tmp, config_path) = setup_test_env();
    run_ng(&config_path, &["init"]);
    write_note(&config_path, "Cargo Guide", "docs", "crates and workspaces");
    write_note(&config_path, "Python", "docs", "mentions cargo once");

    let (stdout, _, success) = run_ng(&config_path, &["search", "cargo"]);
    assert!(success);
    assert_eq!(json(&stdout)["results"].as_array().unwrap().len(), 2);

    let (stdout, _, success) = run_ng(&config_path, &["search", "cargo", "--title"]);
    assert!(success);
    let results = json(&stdout)["results"].as_array().unwrap().clone();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["title"], "Cargo Guide");

    let (stdout, _, success) = run_ng(&config_path, &["search", "cargo", "--after-date", "1d"]);
    assert!(success);
    assert_eq!(json(&stdout)["results"].as_array().unwrap().len(), 2);
}

#[test]
fn test_search_paging_and_errors() {
    let (_tmp, config_path) = setup_test_env();
    run_ng(&config_path, &["init"]);
    for title in ["One", "Two", "Three"] {
        write_note(&config_path, title, "p", "shared keyword");
    }

    let (stdout, _, success) = run_ng(
        &config_path,
        &["search", "shared", "--page", "2", "--page-size", "2"],
    );
    assert!(success);
    assert_eq!(json(&stdout)["results"].as_array().unwrap().len(), 1);

    let (_, _, success) = run_ng(&config_path, &["search", "shared", "--page", "0"]);
    assert!(!success);

    let (_, stderr, success) = run_ng(&config_path, &["search", "shared", "--after-date", "someday"]);
    assert!(!success);
    assert!(stderr.contains("invalid timeframe"), "stderr={}", stderr);
}

#[test]
fn test_scan_imports_external_edits() {
    let (tmp, config_path) = setup_test_env();
    run_ng(&config_path, &["init"]);

    let home = tmp.path().join("notes");
    fs::create_dir_all(home.join("ext")).unwrap();
    fs::write(home.join("ext/Outside.md"), "# Outside\n\nwritten by an editor").unwrap();
    fs::write(home.join("ext/ignored.txt"), "not included").unwrap();

    let (stdout, stderr, success) = run_ng(&config_path, &["scan"]);
    assert!(success, "{}", stderr);
    assert!(stdout.contains("created=1"), "{}", stdout);

    let (stdout, _, success) = run_ng(&config_path, &["scan"]);
    assert!(success);
    assert!(stdout.contains("created=0 updated=0 unchanged=1"), "{}", stdout);

    fs::write(home.join("ext/Outside.md"), "# Outside\n\nedited again").unwrap();
    let (stdout, _, success) = run_ng(&config_path, &["scan"]);
    assert!(success);
    assert!(stdout.contains("updated=1"), "{}", stdout);

    let (stdout, _, success) = run_ng(&config_path, &["search", "edited"]);
    assert!(success);
    assert_eq!(json(&stdout)["results"][0]["title"], "Outside");
}

#[test]
fn test_scan_keeps_canvas_title() {
    let (tmp, config_path) = setup_test_env();
    run_ng(&config_path, &["init"]);

    let args = [
        "canvas", "--nodes", "[]", "--edges", "[]", "--title", "Flow", "--folder", "diagrams",
    ];
    let (_, stderr, success) = run_ng(&config_path, &args);
    assert!(success, "{}", stderr);

    let edited = r#"{"nodes":[{"id":"n2","type":"text","text":"Edited"}],"edges":[]}"#;
    fs::write(tmp.path().join("notes/diagrams/Flow.canvas"), edited).unwrap();
    let (stdout, stderr, success) = run_ng(&config_path, &["scan"]);
    assert!(success, "{}", stderr);
    assert!(stdout.contains("updated=1"), "{}", stdout);

    let (stdout, _, success) = run_ng(&config_path, &["search", "Flow", "--title"]);
    assert!(success);
    assert_eq!(json(&stdout)["results"][0]["title"], "Flow.canvas");
}

#[test]
fn test_page_overflow_is_rejected() {
    let (_tmp, config_path) = setup_test_env();
    run_ng(&config_path, &["init"]);
    write_note(&config_path, "One", "p", "shared keyword");

    let huge = usize::MAX.to_string();
    let huge = huge.as_str();
    let commands: [&[&str]; 3] = [
        &["search", "shared", "--page", huge, "--page-size", "2"],
        &["build-context", "memory://p/*", "--page", huge, "--page-size", "2"],
        &["read-note", "no-such-note", "--page", huge, "--page-size", "2"],
    ];
    for args in commands {
        let (_, stderr, success) = run_ng(&config_path, args);
        assert!(!success, "{:?} should fail", args);
        assert!(stderr.contains("out of range"), "{:?}: {}", args, stderr);
        assert!(!stderr.contains("panicked"), "{:?}: {}", args, stderr);
    }
}

#[test]
fn test_reindex() {
    let (_tmp, config_path) = setup_test_env();
    run_ng(&config_path, &["init"]);
    write_note(&config_path, "R", "notes", "reindexable");

    let (stdout, stderr, success) = run_ng(&config_path, &["reindex"]);
    assert!(success, "{}", stderr);
    assert!(stdout.contains("indexed=1"));
}

#[test]
fn test_projects_are_isolated() {
    let (_tmp, config_path) = setup_test_env();
    run_ng(&config_path, &["init"]);
    write_note(&config_path, "Shared", "notes", "main project");

    let (stdout, stderr, success) = run_ng(
        &config_path,
        &["--project", "side", "write-note", "--title", "Shared", "--folder", "notes", "--content", "side project"],
    );
    assert!(success, "{}", stderr);
    assert!(stdout.contains("# Created"));

    let (stdout, _, success) = run_ng(&config_path, &["--project", "side", "read-note", "Shared"]);
    assert!(success);
    assert!(stdout.contains("side project"));

    let (_, stderr, success) = run_ng(&config_path, &["--project", "nope", "scan"]);
    assert!(!success);
    assert!(stderr.contains("Unknown project"));
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_ng(&tmp.path().join("nope.toml"), &["init"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}
