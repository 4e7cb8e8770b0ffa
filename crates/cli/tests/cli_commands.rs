use assert_cmd::Command;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use serde_json::Value;
use std::fs;
use tempfile::tempdir;

#[allow(deprecated)]
fn faultloc() -> Command {
    let mut cmd = Command::cargo_bin("faultloc").expect("binary");
    cmd.env_remove("OPENAI_API_KEY").arg("--quiet");
    cmd
}

fn setup_repo() -> tempfile::TempDir {
    let temp = tempdir().unwrap();
    let root = temp.path();
    fs::create_dir_all(root.join("shop")).unwrap();
    fs::write(root.join("shop/__init__.py"), "").unwrap();
    fs::write(
        root.join("shop/cart.py"),
        "from shop import pricing\n\n\nclass Cart:\n    def total(self):\n        return pricing.sum_items(self.items)\n",
    )
    .unwrap();
    fs::write(
        root.join("shop/pricing.py"),
        "def sum_items(items):\n    return sum(i.price for i in items)\n",
    )
    .unwrap();
    fs::write(root.join("shop/broken.py"), "def oops(:\n    pass\n").unwrap();
    temp
}

#[test]
fn index_prints_stats() {
    let repo = setup_repo();

    let output = faultloc()
        .arg("index")
        .arg(repo.path())
        .output()
        .expect("command run");
    assert!(output.status.success());

    let stats: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(stats["scanned"], 4);
    assert_eq!(stats["files"], 3);
    assert_eq!(stats["skipped"], 1);
    assert_eq!(stats["modules"], 3);
    assert_eq!(stats["saved_to"], Value::Null);
    assert!(stats["import_edges"].as_u64().unwrap() >= 1);
}

#[test]
fn index_out_persists_a_loadable_document() {
    let repo = setup_repo();
    let out_dir = tempdir().unwrap();
    let out = out_dir.path().join("nested/index.json");

    faultloc()
        .arg("index")
        .arg(repo.path())
        .arg("--out")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"saved_to\""));

    let stored: Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(stored["schema_version"], 1);
    assert!(stored["symbols"].to_string().contains("sum_items"));
}

#[test]
fn index_rejects_missing_directory() {
    let temp = tempdir().unwrap();
    faultloc()
        .arg("index")
        .arg(temp.path().join("absent"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid repository path"));
}

#[test]
fn run_requires_credentials_before_reading_the_dataset() {
    let temp = tempdir().unwrap();
    faultloc()
        .arg("run")
        .arg("--dataset")
        .arg(temp.path().join("missing.json"))
        .arg("--repos-root")
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("OPENAI_API_KEY"));
}
