use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use git_autoupdate::core::UpdateError;
use git_autoupdate::test_utils::{FailingCloner, FixtureCloner, UpdateFixture};
use git_autoupdate::update::{AutoUpdater, Severity, Stage};

fn updater(fixture: &UpdateFixture, config: git_autoupdate::config::UpdaterConfig) -> AutoUpdater {
    let cloner = FixtureCloner::new(fixture.source_dir());
    AutoUpdater::with_cloner(config, Arc::new(cloner)).unwrap()
}

#[tokio::test]
async fn test_backup_precedes_install() {
    let fixture = UpdateFixture::new("1.0.0", "2.0.0").unwrap();
    fixture.write_app_file("node_modules/dep/index.js", "module.exports = 1;").unwrap();
    let updater = updater(&fixture, fixture.config());

    let report = updater.try_force_update().await.unwrap();
    let backup = report.stages.iter().position(|s| *s == Stage::Backup).unwrap();
    let install = report.stages.iter().position(|s| *s == Stage::Install).unwrap();
    assert!(backup < install);

    let backup_dir = fixture.temp_location().join("git-autoupdate/backup");
    let saved = std::fs::read_to_string(backup_dir.join("package.json")).unwrap();
    assert!(saved.contains("1.0.0"));
    assert!(backup_dir.join("node_modules/dep/index.js").exists());
}

#[tokio::test]
async fn test_download_failure_keeps_previous_backup() {
    let fixture = UpdateFixture::new("1.0.0", "2.0.0").unwrap();
    let first = updater(&fixture, fixture.config());
    assert!(first.force_update().await);

    let failing = AutoUpdater::with_cloner(fixture.config(), Arc::new(FailingCloner)).unwrap();
    let err = failing.try_force_update().await.unwrap_err();
    assert!(matches!(err, UpdateError::Clone { .. }));

    // App keeps the first update, backup keeps the original install
    assert!(fixture.read_app_file("package.json").unwrap().contains("2.0.0"));
    let backup = fixture.temp_location().join("git-autoupdate/backup/package.json");
    assert!(std::fs::read_to_string(backup).unwrap().contains("1.0.0"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_backup_failure_leaves_app_untouched() {
    let fixture = UpdateFixture::new("1.0.0", "2.0.0").unwrap();
    // The backup dereferences links, so a dangling one cannot be copied
    std::os::unix::fs::symlink(fixture.root().join("gone"), fixture.app_dir().join("dangling"))
        .unwrap();

    let err = updater(&fixture, fixture.config()).try_force_update().await.unwrap_err();

    assert!(matches!(err, UpdateError::Backup { .. }));
    assert!(fixture.read_app_file("package.json").unwrap().contains("1.0.0"));
    assert!(fixture.read_app_file("index.js").unwrap().contains("v1"));
    assert!(!fixture.app_dir().join("README.md").exists());
}

#[tokio::test]
async fn test_ignored_config_survives_update() {
    let fixture = UpdateFixture::new("1.0.0", "2.0.0").unwrap();
    fixture.write_app_file("config.json", r#"{"port":8080}"#).unwrap();
    fixture.write_app_file("local-only.txt", "keep me").unwrap();
    fixture.write_source_file("config.json", r#"{"port":3000}"#).unwrap();
    let config = fixture.config().with_ignore_files(["config.json"]);

    assert!(updater(&fixture, config).force_update().await);

    assert_eq!(fixture.read_app_file("config.json").unwrap(), r#"{"port":8080}"#);
    assert_eq!(fixture.read_app_file("local-only.txt").unwrap(), "keep me");
    assert!(fixture.read_app_file("package.json").unwrap().contains("2.0.0"));
    assert!(fixture.read_app_file("index.js").unwrap().contains("v2"));
    assert_eq!(fixture.read_app_file("README.md").unwrap(), "# app\n");
}

#[tokio::test]
async fn test_missing_ignore_path() {
    let fixture = UpdateFixture::new("1.0.0", "2.0.0").unwrap();
    let lenient = fixture.config().with_ignore_files(["does-not-exist.json"]);
    assert!(updater(&fixture, lenient).force_update().await);

    let strict = fixture
        .config()
        .with_ignore_files(["does-not-exist.json"])
        .strict_ignore_files(true);
    let err = updater(&fixture, strict).try_force_update().await.unwrap_err();
    assert!(matches!(err, UpdateError::Purge { .. }));
}

#[cfg(unix)]
#[tokio::test]
async fn test_dependency_error_line_fails_update() {
    let fixture = UpdateFixture::new("1.0.0", "2.0.0").unwrap();
    let config = fixture
        .config()
        .with_install_command(Some("echo 'npm Error: ENOENT package.json' >&2"));

    assert!(!updater(&fixture, config.clone()).force_update().await);
    let err = updater(&fixture, config).try_force_update().await.unwrap_err();
    assert!(matches!(err, UpdateError::DependencyInstall { .. }));
}

#[cfg(unix)]
#[tokio::test]
async fn test_dependency_warning_line_passes() {
    let fixture = UpdateFixture::new("1.0.0", "2.0.0").unwrap();
    let config = fixture
        .config()
        .with_install_command(Some("echo 'npm warning deprecated left-pad' >&2; echo installed"));

    let report = updater(&fixture, config).try_force_update().await.unwrap();
    assert!(report.stages.contains(&Stage::Dependencies));
}

#[cfg(unix)]
#[tokio::test]
async fn test_dependency_command_runs_in_app_dir() {
    let fixture = UpdateFixture::new("1.0.0", "2.0.0").unwrap();
    let config = fixture.config().with_install_command(Some("touch installed.marker"));

    assert!(updater(&fixture, config).force_update().await);
    assert!(fixture.app_dir().join("installed.marker").exists());
}

#[cfg(unix)]
#[tokio::test]
async fn test_custom_classifier() {
    let fixture = UpdateFixture::new("1.0.0", "2.0.0").unwrap();
    let config = fixture.config().with_install_command(Some("echo 'error: 0 errors' >&2"));
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);

    let updater = updater(&fixture, config).with_classifier(Arc::new(move |_line: &str| {
        counter.fetch_add(1, Ordering::SeqCst);
        Severity::Warning
    }));

    assert!(updater.force_update().await);
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}

#[cfg(unix)]
#[tokio::test]
async fn test_completion_command_is_launched() {
    let fixture = UpdateFixture::new("1.0.0", "2.0.0").unwrap();
    let marker = fixture.root().join("restarted");
    let config = fixture
        .config()
        .with_execute_on_complete(format!("touch {}", marker.display()))
        .with_post_command_grace(std::time::Duration::from_millis(500));
    let exits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&exits);

    let updater = updater(&fixture, config.exit_on_complete(true)).with_exit_hook(Arc::new(
        move |code| {
            assert_eq!(code, 1);
            counter.fetch_add(1, Ordering::SeqCst);
        },
    ));

    let report = updater.try_force_update().await.unwrap();
    assert_eq!(report.stages.last(), Some(&Stage::PostActions));
    assert_eq!(exits.load(Ordering::SeqCst), 1);

    for _ in 0..20 {
        if marker.exists() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }
    assert!(marker.exists());
}
