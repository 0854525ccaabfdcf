use assert_cmd::prelude::*;
use chrono::{Duration, Utc};
use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn podash_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("podash"))
}

fn days_ago(days: i64) -> String {
    (Utc::now().date_naive() - Duration::days(days)).to_string()
}

fn order_row(
    id: u32,
    number: &str,
    vendor: &str,
    project: &str,
    amount: f64,
    age: i64,
    approved: bool,
) -> Value {
    let approval_date = if approved {
        Value::String(format!("{}T09:00:00Z", days_ago(age)))
    } else {
        Value::Null
    };
    json!({
        "id": id,
        "po_number": number,
        "po_date": days_ago(age),
        "vendor_name": vendor,
        "project_code": project,
        "total_amount": amount,
        "status": if approved { "approved" } else { "pending_approval" },
        "approval_status": approved,
        "approval_date": approval_date,
        "line_items": [{"item_name": "Steel", "quantity": 1, "unit_price": amount}]
    })
}

/// Initialized config dir plus a snapshot with six orders:
/// five approved (one of them 400 days old) and one unapproved.
struct Fixture {
    _temp: TempDir,
    config: PathBuf,
    snapshot: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("podash-config");
        let snapshot = temp.path().join("snapshot.json");

        podash_cmd()
            .args(["-C", config.to_str().unwrap(), "init"])
            .assert()
            .success();

        let data = json!({
            "purchase_orders": [
                order_row(1, "PO-1", "Acme Supplies", "BRIDGE", 100.0, 2, true),
                order_row(2, "PO-2", "Acme Supplies", "BRIDGE", 200.0, 5, true),
                order_row(3, "PO-3", "Bolt Bros", "TOWER", 50.0, 10, true),
                order_row(4, "PO-4", "Acme Supplies", "TOWER", 999.0, 3, false),
                order_row(5, "PO-5", "Comma, Inc", "PLAZA", 10.5, 1, true),
                order_row(6, "PO-6", "Bolt Bros", "TOWER", 70.0, 400, true)
            ],
            "inward_status": {
                "PO-1": "completed",
                "PO-3": "partially_inwarded",
                "PO-4": "completed",
                "PO-5": "open",
                "PO-6": "completed"
            },
            "history": [
                {"batch_id": "B-1", "field_name": "quantity", "old_value": 5, "new_value": 8,
                 "changed_by": "priya", "changed_at": "2024-01-01T10:00:30Z"},
                {"batch_id": "B-1", "field_name": "unit_price",
                 "old_value": "2.50", "new_value": "2.75",
                 "changed_by": "priya", "changed_at": "2024-01-01T10:00:45Z"},
                {"batch_id": "B-1", "field_name": "vendor_name",
                 "old_value": null, "new_value": "Bolt Bros",
                 "changed_by": "priya", "changed_at": "2024-01-01T10:01:05Z"},
                {"batch_id": "B-2", "field_name": "quantity", "old_value": 1, "new_value": 2,
                 "changed_by": "omar", "changed_at": "2024-02-01T08:00:00Z"}
            ]
        });
        fs::write(&snapshot, serde_json::to_string_pretty(&data).unwrap()).unwrap();

        Self {
            _temp: temp,
            config,
            snapshot,
        }
    }

    fn cmd(&self, args: &[&str]) -> Command {
        let mut cmd = podash_cmd();
        cmd.args([
            "-C",
            self.config.to_str().unwrap(),
            "--from-file",
            self.snapshot.to_str().unwrap(),
        ]);
        cmd.args(args);
        cmd
    }

    fn json(&self, args: &[&str]) -> Value {
        let output = self.cmd(args).output().unwrap();
        assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
        serde_json::from_slice(&output.stdout).unwrap()
    }
}

fn config_arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_help() {
    podash_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Purchase-order analytics dashboard"));
}

#[test]
fn test_version() {
    podash_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("podash"));
}

#[test]
fn test_init_creates_config() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("podash-config");

    podash_cmd()
        .args(["-C", config_arg(&config_path), "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized podash config"));

    assert!(config_path.join("config.toml").exists());
}

#[test]
fn test_config_dir_from_env() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("from-env");

    podash_cmd()
        .env("PODASH_CONFIG_DIR", &config_path)
        .arg("init")
        .assert()
        .success();

    assert!(config_path.join("config.toml").exists());
}

#[test]
fn test_init_fails_if_exists() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("podash-config");

    podash_cmd()
        .args(["-C", config_arg(&config_path), "init"])
        .assert()
        .success();

    podash_cmd()
        .args(["-C", config_arg(&config_path), "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_status_without_init() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("nonexistent");

    podash_cmd()
        .args(["-C", config_arg(&config_path), "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_status_shows_source() {
    let fixture = Fixture::new();
    fixture
        .cmd(&["status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("podash Status"))
        .stdout(predicate::str::contains("snapshot"))
        .stdout(predicate::str::contains("Top vendors:      10"))
        .stdout(predicate::str::contains("Lookups:          16 parallel"));
}

#[test]
fn test_dashboard_requires_source() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("podash-config");

    podash_cmd()
        .args(["-C", config_arg(&config_path), "init"])
        .assert()
        .success();

    podash_cmd()
        .args(["-C", config_arg(&config_path), "dashboard"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No API source configured"));
}

#[test]
fn test_dashboard_text() {
    let fixture = Fixture::new();
    fixture
        .cmd(&["dashboard"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Purchase Order Dashboard (all)"))
        .stdout(predicate::str::contains("Total POs:"))
        .stdout(predicate::str::contains("$430.50"))
        .stdout(predicate::str::contains("Acme Supplies"))
        .stdout(predicate::str::contains("Monthly trend"))
        .stdout(predicate::str::contains("$999.00").not());
}

#[test]
fn test_dashboard_json_partition() {
    let fixture = Fixture::new();
    let summary = fixture.json(&["dashboard", "--json"]);

    let totals = &summary["status_totals"];
    assert_eq!(totals["total_pos"], 5);
    assert_eq!(totals["completed_pos"], 2);
    assert_eq!(totals["partially_inwarded_pos"], 1);
    // PO-2 has no inward status in the snapshot and falls back to open
    assert_eq!(totals["open_pos"], 2);

    let distribution = summary["status_distribution"].as_array().unwrap();
    let counted: u64 = distribution.iter().map(|b| b["count"].as_u64().unwrap()).sum();
    assert_eq!(counted, 5);

    assert_eq!(summary["monthly_trend"].as_array().unwrap().len(), 12);
}

#[test]
fn test_dashboard_timeframe_filters_old_orders() {
    let fixture = Fixture::new();
    let summary = fixture.json(&["dashboard", "--json", "--timeframe", "1year"]);
    assert_eq!(summary["status_totals"]["total_pos"], 4);

    fixture
        .cmd(&["dashboard", "--timeframe", "fortnight"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid time frame"));
}

#[test]
fn test_vendors_rollup() {
    let fixture = Fixture::new();
    let vendors = fixture.json(&["vendors", "--json"]);
    let vendors = vendors.as_array().unwrap();

    assert_eq!(vendors.len(), 3);
    assert_eq!(vendors[0]["vendor_name"], "Acme Supplies");
    assert_eq!(vendors[0]["total_pos"], 2);
    assert_eq!(vendors[0]["total_value"], 300.0);
    assert_eq!(vendors[0]["completion_rate"], 50.0);
    assert_eq!(vendors[1]["vendor_name"], "Bolt Bros");

    let top = fixture.json(&["vendors", "--json", "--top", "1"]);
    assert_eq!(top.as_array().unwrap().len(), 1);
}

#[test]
fn test_projects_table() {
    let fixture = Fixture::new();
    fixture
        .cmd(&["projects"])
        .assert()
        .success()
        .stdout(predicate::str::contains("PROJECT"))
        .stdout(predicate::str::contains("BRIDGE"))
        .stdout(predicate::str::contains("$150.00"));
}

#[test]
fn test_trend_window() {
    let fixture = Fixture::new();

    let trend = fixture.json(&["trend", "--json"]);
    let trend = trend.as_array().unwrap();
    assert_eq!(trend.len(), 12);
    let bucketed: u64 = trend.iter().map(|m| m["total_pos"].as_u64().unwrap()).sum();
    assert_eq!(bucketed, 4);

    let wide = fixture.json(&["trend", "--json", "--months", "24"]);
    let wide = wide.as_array().unwrap();
    assert_eq!(wide.len(), 24);
    let bucketed: u64 = wide.iter().map(|m| m["total_pos"].as_u64().unwrap()).sum();
    assert_eq!(bucketed, 5);
}

#[test]
fn test_list_search() {
    let fixture = Fixture::new();
    fixture
        .cmd(&["list", "--search", "acme"])
        .assert()
        .success()
        .stdout(predicate::str::contains("PO-1"))
        .stdout(predicate::str::contains("PO-4"))
        .stdout(predicate::str::contains("PO-3").not())
        .stdout(predicate::str::contains("Showing 3 of 6 purchase orders"));
}

#[test]
fn test_list_inward_filter() {
    let fixture = Fixture::new();
    fixture
        .cmd(&["list", "--inward", "completed", "--approved-only"])
        .assert()
        .success()
        .stdout(predicate::str::contains("PO-1"))
        .stdout(predicate::str::contains("PO-6"))
        .stdout(predicate::str::contains("PO-2").not())
        .stdout(predicate::str::contains("PO-4").not());
}

#[test]
fn test_list_invalid_status() {
    let fixture = Fixture::new();
    fixture
        .cmd(&["list", "--status", "teleported"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid status"));
}

#[test]
fn test_history_groups_by_minute_and_actor() {
    let fixture = Fixture::new();
    fixture
        .cmd(&["history", "B-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("page 1/1, 2 revisions"))
        .stdout(predicate::str::contains("Revision #2 by priya at 2024-01-01 10:01 UTC"))
        .stdout(predicate::str::contains("Revision #1 by priya at 2024-01-01 10:00 UTC"))
        .stdout(predicate::str::contains("unit_price"));
}

#[test]
fn test_history_empty_and_out_of_range() {
    let fixture = Fixture::new();
    fixture
        .cmd(&["history", "B-404"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No history recorded for batch B-404"));

    fixture
        .cmd(&["history", "B-1", "--page", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of range"));
}

#[test]
fn test_export_stdout() {
    let fixture = Fixture::new();
    fixture
        .cmd(&["export"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(concat!(
            "po_number,po_date,vendor_name,project_code,",
            "total_amount,status,approval_status,approval_date\n",
        )))
        .stdout(predicate::str::contains("\"Comma, Inc\""))
        .stdout(predicate::str::contains("line_items").not());
}

#[test]
fn test_export_file_with_filter() {
    let fixture = Fixture::new();
    let output = fixture.config.join("approved.csv");

    fixture
        .cmd(&["export", "--approved-only", "--output", output.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 5 purchase orders"));

    let csv = fs::read_to_string(&output).unwrap();
    assert_eq!(csv.lines().count(), 6);
    assert!(!csv.contains("PO-4"));
}
