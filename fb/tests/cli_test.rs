//! End-to-end tests for the fb binary

use assert_cmd::Command;
use predicates::prelude::*;

fn fb() -> Command {
    Command::cargo_bin("fb").expect("fb binary")
}

#[test]
fn test_dump_empty_store() {
    let temp = tempfile::tempdir().unwrap();
    let db = temp.path().join("codeleap.db");

    fb().arg("--db")
        .arg(&db)
        .arg("dump")
        .assert()
        .success()
        .stdout(predicate::str::contains("Feedback entries found: 0"))
        .stdout(predicate::str::contains("No feedback entries found."));
}

#[test]
fn test_store_then_get() {
    let temp = tempfile::tempdir().unwrap();
    let db = temp.path().join("codeleap.db");

    fb().arg("--db")
        .arg(&db)
        .args(["store", "--plan", "Intro", "--step", "1", "--rating", "up"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Stored feedback entry 1"));

    fb().arg("--db")
        .arg(&db)
        .args(["get", "Intro"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Feedback entries found: 1"))
        .stdout(predicate::str::contains("thumbs_up"))
        .stdout(predicate::str::contains("Plan ID: Intro"));
}

#[test]
fn test_store_rejects_unknown_rating() {
    let temp = tempfile::tempdir().unwrap();
    let db = temp.path().join("codeleap.db");

    fb().arg("--db")
        .arg(&db)
        .args(["store", "--plan", "Intro", "--rating", "sideways"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid rating"));
}

#[test]
fn test_dump_newest_first() {
    let temp = tempfile::tempdir().unwrap();
    let db = temp.path().join("codeleap.db");

    for (plan, rating) in [("First", "up"), ("Second", "down")] {
        fb().arg("--db")
            .arg(&db)
            .args(["store", "--plan", plan, "--rating", rating])
            .assert()
            .success();
    }

    let output = fb().arg("--db").arg(&db).arg("dump").output().unwrap();
    let stdout = String::from_utf8(output.stdout).unwrap();
    let first = stdout.find("Second").expect("newest plan in dump");
    let second = stdout.find("First").expect("oldest plan in dump");
    assert!(first < second, "newest entry should be printed first");
}
