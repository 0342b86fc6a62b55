use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::TempDir;

fn catalog_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("catalog");
    path
}

const PRODUCTS_CSV: &str = "\
Name,Slug,Post Summary,Main Image,More images,Featured?,Categories
Blue Mug,Blue Mug,A sturdy mug,http://127.0.0.1:1/mug.jpg?w=800,\"http://127.0.0.1:1/a.jpg|http://127.0.0.1:1/b.jpg\",TRUE,Kitchen
,orphan,No name,,,,
Green Plate,green-plate,\"Plate, green\",,,no,Dining
";

fn setup_test_env(backend: &str) -> (TempDir, PathBuf, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let csv_path = root.join("products.csv");
    fs::write(&csv_path, PRODUCTS_CSV).unwrap();

    let config_content = format!(
        r#"[store]
backend = "{}"
project_id = "abc123"

[import]
rate_limit = "none"

[server]
bind = "127.0.0.1:7341"
"#,
        backend
    );
    let config_path = config_dir.join("catalog.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path, csv_path)
}

fn run_catalog(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = catalog_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("SANITY_API_TOKEN")
        .env("RUST_LOG", "warn")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run catalog binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_import_memory_backend() {
    let (_tmp, config, csv) = setup_test_env("memory");
    let (stdout, stderr, success) = run_catalog(
        &config,
        &["import", "--file", csv.to_str().unwrap(), "--progress", "off"],
    );
    assert!(success, "import failed: {}", stderr);
    assert!(stdout.contains("import products.csv"));
    assert!(stdout.contains("imported: 2"));
    assert!(stdout.contains("skipped: 1"));
    assert!(stdout.contains("failed: 0"));
    assert!(stdout.contains("Successfully imported 2 products"));
}

#[test]
fn test_import_json_progress() {
    let (_tmp, config, csv) = setup_test_env("memory");
    let (_, stderr, success) = run_catalog(
        &config,
        &["import", "--file", csv.to_str().unwrap(), "--progress", "json"],
    );
    assert!(success, "import failed: {}", stderr);

    let events: Vec<Value> = stderr
        .lines()
        .filter_map(|line| serde_json::from_str::<Value>(line).ok())
        .filter(|v| v["event"] == "progress")
        .collect();
    assert_eq!(events[0]["phase"], "parsed");
    assert_eq!(events[0]["total"], 3);
    let statuses: Vec<&str> = events[1..]
        .iter()
        .map(|e| e["status"].as_str().unwrap())
        .collect();
    assert_eq!(statuses, ["imported", "skipped", "imported"]);
}

#[test]
fn test_import_rejects_unknown_progress_mode() {
    let (_tmp, config, csv) = setup_test_env("memory");
    let (_, stderr, success) = run_catalog(
        &config,
        &["import", "--file", csv.to_str().unwrap(), "--progress", "loud"],
    );
    assert!(!success);
    assert!(stderr.contains("loud"));
}

#[test]
fn test_import_dry_run() {
    let (_tmp, config, csv) = setup_test_env("sanity");
    let (stdout, stderr, success) =
        run_catalog(&config, &["import", "--file", csv.to_str().unwrap(), "--dry-run"]);
    assert!(success, "dry run failed: {}", stderr);
    assert!(stdout.contains("(dry-run)"));
    assert!(stdout.contains("rows found: 3"));
    assert!(stdout.contains("importable: 2"));
    assert!(stdout.contains("skipped: 1"));
    assert!(stdout.contains("image urls: 3"));
}

#[test]
fn test_import_requires_input() {
    let (_tmp, config, _csv) = setup_test_env("memory");
    let (_, _, success) = run_catalog(&config, &["import"]);
    assert!(!success);
}

#[test]
fn test_import_missing_file() {
    let (_tmp, config, _csv) = setup_test_env("memory");
    let (_, stderr, success) = run_catalog(&config, &["import", "--file", "/no/such/file.csv"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read CSV file"));
}

#[test]
fn test_import_sanity_requires_token() {
    let (_tmp, config, csv) = setup_test_env("sanity");
    let (_, stderr, success) = run_catalog(
        &config,
        &["import", "--file", csv.to_str().unwrap(), "--progress", "off"],
    );
    assert!(!success);
    assert!(stderr.contains("SANITY_API_TOKEN"));
}

#[test]
fn test_preview_prints_documents() {
    let (_tmp, config, csv) = setup_test_env("memory");
    let (stdout, stderr, success) = run_catalog(&config, &["preview", csv.to_str().unwrap()]);
    assert!(success, "preview failed: {}", stderr);

    let docs: Vec<Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(docs.len(), 2);

    assert_eq!(docs[0]["type"], "product");
    assert_eq!(docs[0]["slug"], "blue-mug");
    assert_eq!(docs[0]["featured"], true);
    assert_eq!(docs[0]["image"], "http://127.0.0.1:1/mug.jpg?w=800");
    assert_eq!(docs[0]["moreImages"].as_array().unwrap().len(), 2);

    assert_eq!(docs[1]["description"], "Plate, green");
    assert!(docs[1].get("image").is_none());
    assert!(stderr.contains("1 rows skipped"));
}

#[test]
fn test_preview_without_config_file() {
    let (tmp, _config, csv) = setup_test_env("memory");
    let missing = tmp.path().join("nope.toml");
    let (stdout, _, success) = run_catalog(&missing, &["preview", csv.to_str().unwrap()]);
    assert!(success);
    assert_eq!(stdout.lines().count(), 2);
}

#[test]
fn test_check_memory_backend() {
    let (_tmp, config, _csv) = setup_test_env("memory");
    let (stdout, stderr, success) = run_catalog(&config, &["check"]);
    assert!(success, "check failed: {}", stderr);
    assert!(stdout.contains("store memory"));
    assert!(stdout.contains("ok"));
}

#[test]
fn test_invalid_config_rejected() {
    let (tmp, _config, _csv) = setup_test_env("memory");
    let bad = tmp.path().join("bad.toml");
    fs::write(&bad, "[import]\nconcurrency = 0\n[store]\nbackend = \"memory\"\n").unwrap();
    let (_, stderr, success) = run_catalog(&bad, &["check"]);
    assert!(!success);
    assert!(stderr.contains("concurrency"));
}

fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn wait_for_server(port: u16) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
    }
    panic!("Server did not become ready within 5 seconds");
}

#[tokio::test]
async fn test_serve_accepts_import() {
    let (tmp, _config, _csv) = setup_test_env("memory");
    let port = find_free_port();
    let config = tmp.path().join("serve.toml");
    fs::write(
        &config,
        format!(
            "[store]\nbackend = \"memory\"\n[import]\nrate_limit = \"none\"\n[server]\nbind = \"127.0.0.1:{}\"\n",
            port
        ),
    )
    .unwrap();

    let mut child = Command::new(catalog_binary())
        .arg("--config")
        .arg(&config)
        .arg("serve")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    wait_for_server(port).await;

    let resp = reqwest::Client::new()
        .post(format!("http://127.0.0.1:{}/api/import-csv", port))
        .json(&serde_json::json!({ "csvData": PRODUCTS_CSV }))
        .send()
        .await
        .unwrap();
    let status = resp.status();
    let body: Value = resp.json().await.unwrap();

    child.kill().ok();
    child.wait().ok();

    assert_eq!(status, 200);
    assert_eq!(body["count"], 2);
    assert_eq!(body["errors"], 0);
}
