use assert_cmd::Command;
use predicates::prelude::*;

fn fixture(name: &str) -> String {
    format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"))
}

fn almanac() -> Command {
    Command::cargo_bin("almanac").unwrap()
}

#[test]
fn test_today_lists_standup() {
    almanac()
        .args(["--today", "2024-01-01", "today", &fixture("business.json")])
        .assert()
        .success()
        .stdout(predicate::str::contains("Today's Events:"))
        .stdout(predicate::str::contains("Standup: 09:00"));
}

#[test]
fn test_today_skips_removed_instance() {
    almanac()
        .args(["--today", "2024-01-03", "today", &fixture("business.json")])
        .assert()
        .success()
        .stdout(predicate::str::contains("Standup").not())
        .stdout(predicate::str::contains("(none)"));
}

#[test]
fn test_upcoming_starts_tomorrow() {
    almanac()
        .args(["--today", "2024-01-01", "upcoming", &fixture("business.json")])
        .assert()
        .success()
        .stdout(predicate::str::contains("Upcoming Events:"))
        .stdout(predicate::str::contains("Standup: 2024-01-01").not())
        .stdout(predicate::str::contains("Standup: 2024-01-02 09:00"))
        .stdout(predicate::str::contains("Standup: 2024-01-03").not())
        .stdout(predicate::str::contains("Standup: 2024-01-05 09:00"))
        .stdout(predicate::str::contains("File report: 2024-01-02 16:00"));
}

#[test]
fn test_upcoming_rejects_short_horizon() {
    almanac()
        .args(["--today", "2024-01-01", "upcoming", "--days", "1", &fixture("business.json")])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--days"));
}

#[test]
fn test_upcoming_rejects_horizon_past_last_date() {
    almanac()
        .args(["--today", "2024-01-01", "upcoming", "--days", "4000000000", &fixture("business.json")])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--days 4000000000"))
        .stderr(predicate::str::contains("panicked").not());
}

#[test]
fn test_range_json_rows() {
    let output = almanac()
        .args([
            "--json",
            "--kind",
            "event",
            "range",
            "--from",
            "2024-01-01",
            "--to",
            "2024-01-10",
            &fixture("business.json"),
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let rows: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0]["summary"], "Standup");
    assert_eq!(rows[0]["start"], "2024-01-01T09:00:00");
    assert_eq!(rows[0]["start_utc"], "2024-01-01T09:00:00+00:00");
    assert_eq!(rows[0]["calendar"], "business");
    assert_eq!(rows[2]["start"], "2024-01-04T09:00:00");
    assert!(rows.iter().all(|row| row["kind"] == "event" && row["all_day"] == false));
}

#[test]
fn test_kind_filter_todo() {
    almanac()
        .args([
            "--kind",
            "todo",
            "range",
            "--from",
            "2024-01-01",
            "--to",
            "2024-01-10",
            &fixture("business.json"),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("File report: 2024-01-02 16:00"))
        .stdout(predicate::str::contains("Standup").not());
}

#[test]
fn test_directory_of_snapshots_keeps_duplicates() {
    let output = almanac()
        .args(["--today", "2024-06-01", "today", &fixture("shared")])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.matches("Festival: All Day").count(), 2);
}

#[test]
fn test_inverted_range_fails() {
    almanac()
        .args([
            "range",
            "--from",
            "2024-01-10",
            "--to",
            "2024-01-01",
            &fixture("business.json"),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid window"));
}

#[test]
fn test_bad_range_bound_fails() {
    almanac()
        .args(["range", "--from", "soon", "--to", "2024-01-01", &fixture("business.json")])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid --from"));
}

#[test]
fn test_missing_file_fails() {
    almanac()
        .args(["today", &fixture("absent.json")])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read"));
}

#[test]
fn test_iana_zone_needs_system_zones() {
    almanac()
        .args(["--today", "2024-07-01", "today", &fixture("berlin.json")])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown time zone"));

    almanac()
        .args(["--system-zones", "--today", "2024-07-01", "today", &fixture("berlin.json")])
        .assert()
        .success()
        .stdout(predicate::str::contains("Call: 07:00"));
}

#[test]
fn test_default_zone_shifts_displayed_time() {
    almanac()
        .args([
            "--zone",
            "+02:00",
            "--system-zones",
            "--today",
            "2024-07-01",
            "today",
            &fixture("berlin.json"),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Call: 09:00"));
}

#[test]
fn test_invalid_zone_flag_is_rejected() {
    almanac()
        .args(["--zone", "+25:00", "today", &fixture("business.json")])
        .assert()
        .failure();
}
