use assert_cmd::Command;
use git_autoupdate::test_utils::UpdateFixture;
use mockito::Server;
use predicates::prelude::*;

use crate::serve_manifest;

fn git_autoupdate() -> Command {
    let mut cmd = Command::cargo_bin("git-autoupdate").unwrap();
    cmd.env_remove("GIT_AUTOUPDATE_CONFIG").env_remove("GIT_AUTOUPDATE_TOKEN");
    cmd
}

fn write_config(fixture: &UpdateFixture, raw_base_url: &str) -> std::path::PathBuf {
    let path = fixture.root().join("updater.toml");
    let content = format!(
        r#"repository = "https://github.com/owner/app"
temp_location = "{}"
app_dir = "{}"
raw_base_url = "{raw_base_url}"
install_command = ""
"#,
        fixture.temp_location().display(),
        fixture.app_dir().display(),
    );
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_help() {
    git_autoupdate()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--check"))
        .stdout(predicate::str::contains("--rollback"));
}

#[test]
fn test_missing_config_file() {
    let fixture = UpdateFixture::new("1.0.0", "2.0.0").unwrap();
    git_autoupdate()
        .arg("--config")
        .arg(fixture.root().join("missing.toml"))
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("configuration file not found"));
}

#[test]
fn test_invalid_config_file() {
    let fixture = UpdateFixture::new("1.0.0", "2.0.0").unwrap();
    let path = fixture.root().join("broken.toml");
    std::fs::write(&path, "repository = [").unwrap();

    git_autoupdate()
        .arg("--config")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("TOML"));
}

#[test]
fn test_conflicting_modes() {
    git_autoupdate().args(["--check", "--force"]).assert().failure();
}

#[tokio::test]
async fn test_check_json() {
    let mut server = Server::new_async().await;
    let _mock = serve_manifest(&mut server, "master", "2.0.0").await;
    let fixture = UpdateFixture::new("1.0.0", "2.0.0").unwrap();
    let config = write_config(&fixture, &server.url());

    let output = tokio::task::spawn_blocking(move || {
        git_autoupdate().arg("-q").arg("-c").arg(&config).args(["--check", "--json"]).output()
    })
    .await
    .unwrap()
    .unwrap();

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["up_to_date"], false);
    assert_eq!(json["current_version"], "1.0.0");
    assert_eq!(json["remote_version"], "2.0.0");
    assert!(fixture.read_app_file("package.json").unwrap().contains("1.0.0"));
}

#[tokio::test]
async fn test_check_uses_latest_release() {
    let mut server = Server::new_async().await;
    let _release = server
        .mock("GET", "/repos/owner/app/releases/latest")
        .with_status(200)
        .with_body(r#"{"tag_name":"v2.0.0"}"#)
        .create_async()
        .await;
    let _tagged = serve_manifest(&mut server, "v2.0.0", "2.0.0").await;
    let _branch = serve_manifest(&mut server, "master", "1.0.0").await;

    let fixture = UpdateFixture::new("1.0.0", "2.0.0").unwrap();
    let config = write_config(&fixture, &server.url());
    let mut content = std::fs::read_to_string(&config).unwrap();
    content.push_str(&format!("from_releases = true\napi_base_url = \"{}\"\n", server.url()));
    std::fs::write(&config, content).unwrap();

    let output = tokio::task::spawn_blocking(move || {
        git_autoupdate().arg("-q").arg("-c").arg(&config).args(["--check", "--json"]).output()
    })
    .await
    .unwrap()
    .unwrap();

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["remote_version"], "2.0.0");
    assert_eq!(json["up_to_date"], false);
}

#[test]
fn test_rollback_without_backup() {
    let fixture = UpdateFixture::new("1.0.0", "2.0.0").unwrap();
    let config = write_config(&fixture, "http://127.0.0.1:1");

    git_autoupdate()
        .arg("-c")
        .arg(&config)
        .arg("--rollback")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no backup"));
}
