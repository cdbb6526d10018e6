use std::sync::Arc;
use std::time::Duration;

use git_autoupdate::core::UpdateError;
use git_autoupdate::test_utils::{FailingCloner, FixtureCloner, UpdateFixture, init_test_logging};
use git_autoupdate::update::{AutoUpdater, ReferenceState, UpdateOutcome};
use mockito::Server;

use crate::serve_manifest;

#[tokio::test]
async fn test_equal_versions_do_not_touch_filesystem() {
    init_test_logging(None);
    let mut server = Server::new_async().await;
    let _mock = serve_manifest(&mut server, "master", "1.0.0").await;

    let fixture = UpdateFixture::new("1.0.0", "2.0.0").unwrap();
    let cloner = FixtureCloner::new(fixture.source_dir());
    let config = fixture.config().with_raw_base_url(server.url());
    let updater = AutoUpdater::with_cloner(config, Arc::new(cloner.clone())).unwrap();

    let comparison = updater.compare_versions().await;
    assert!(comparison.up_to_date);
    assert_eq!(comparison.current_version, "1.0.0");
    assert_eq!(comparison.remote_version, "1.0.0");

    let outcome = updater.try_auto_update().await.unwrap();
    assert!(!outcome.updated());
    assert!(cloner.calls().is_empty());
    assert!(!fixture.temp_location().join("git-autoupdate").exists());
    assert!(fixture.read_app_file("index.js").unwrap().contains("v1"));
}

#[tokio::test]
async fn test_distinct_versions_are_reported_verbatim() {
    let mut server = Server::new_async().await;
    let _mock = serve_manifest(&mut server, "master", "1.0.0-beta.1").await;

    let fixture = UpdateFixture::new("1.0.0", "2.0.0").unwrap();
    let config = fixture.config().with_raw_base_url(server.url());
    let updater =
        AutoUpdater::with_cloner(config, Arc::new(FixtureCloner::new(fixture.source_dir())))
            .unwrap();

    let comparison = updater.compare_versions().await;
    assert!(!comparison.up_to_date);
    assert_eq!(comparison.current_version, "1.0.0");
    assert_eq!(comparison.remote_version, "1.0.0-beta.1");
}

#[tokio::test]
async fn test_remote_failure_gives_error_sentinel() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/owner/app/master/package.json")
        .with_status(404)
        .create_async()
        .await;

    let fixture = UpdateFixture::new("1.0.0", "2.0.0").unwrap();
    let config = fixture.config().with_raw_base_url(server.url());
    let updater =
        AutoUpdater::with_cloner(config, Arc::new(FixtureCloner::new(fixture.source_dir())))
            .unwrap();

    let comparison = updater.compare_versions().await;
    assert!(!comparison.up_to_date);
    assert_eq!(comparison.current_version, "Error");
    assert_eq!(comparison.remote_version, "Error");

    let err = updater.try_compare_versions().await.unwrap_err();
    assert!(matches!(err, UpdateError::NotFoundOrPrivate { .. }));
}

#[tokio::test]
async fn test_auto_update_installs_newer_version() {
    let mut server = Server::new_async().await;
    let _mock = serve_manifest(&mut server, "master", "2.0.0").await;

    let fixture = UpdateFixture::new("1.0.0", "2.0.0").unwrap();
    let cloner = FixtureCloner::new(fixture.source_dir());
    let config = fixture.config().with_raw_base_url(server.url());
    let updater = AutoUpdater::with_cloner(config, Arc::new(cloner.clone())).unwrap();

    match updater.try_auto_update().await.unwrap() {
        UpdateOutcome::Updated {
            comparison,
            report,
        } => {
            assert_eq!(comparison.remote_version, "2.0.0");
            assert_eq!(report.reference, "master");
        }
        other => panic!("expected an update, got {other:?}"),
    }
    assert!(fixture.read_app_file("package.json").unwrap().contains("2.0.0"));
    assert_eq!(cloner.references(), vec!["master"]);
}

#[tokio::test]
async fn test_auto_update_waits_for_latest_release() {
    let mut server = Server::new_async().await;
    let release = server
        .mock("GET", "/repos/owner/app/releases/latest")
        .match_header("user-agent", mockito::Matcher::Regex("^git-autoupdate/".to_string()))
        .with_status(200)
        .with_body(r#"{"tag_name":"v2.0.0"}"#)
        .create_async()
        .await;
    let tagged = serve_manifest(&mut server, "v2.0.0", "2.0.0").await;
    let branch = server
        .mock("GET", "/owner/app/master/package.json")
        .expect(0)
        .create_async()
        .await;

    let fixture = UpdateFixture::new("1.0.0", "2.0.0").unwrap();
    let cloner = FixtureCloner::new(fixture.source_dir());
    let config = fixture
        .config()
        .from_releases(true)
        .with_api_base_url(server.url())
        .with_raw_base_url(server.url());
    let updater = AutoUpdater::with_cloner(config, Arc::new(cloner.clone())).unwrap();

    assert!(!updater.is_ready());
    assert!(updater.auto_update().await);

    assert_eq!(updater.reference_state(), ReferenceState::Resolved("v2.0.0".to_string()));
    assert_eq!(updater.reference(), "v2.0.0");
    assert_eq!(updater.config().branch, "master");
    assert_eq!(cloner.references(), vec!["v2.0.0"]);
    release.assert_async().await;
    tagged.assert_async().await;
    branch.assert_async().await;
}

#[tokio::test]
async fn test_sub_second_ready_timeout_lets_resolution_finish() {
    let mut server = Server::new_async().await;
    let _release = server
        .mock("GET", "/repos/owner/app/releases/latest")
        .with_status(200)
        .with_body(r#"{"tag_name":"v2.0.0"}"#)
        .create_async()
        .await;
    let _tagged = serve_manifest(&mut server, "v2.0.0", "2.0.0").await;

    let fixture = UpdateFixture::new("1.0.0", "2.0.0").unwrap();
    let cloner = FixtureCloner::new(fixture.source_dir());
    let config = fixture
        .config()
        .from_releases(true)
        .with_ready_timeout(Duration::from_millis(900))
        .with_api_base_url(server.url())
        .with_raw_base_url(server.url());
    let updater = AutoUpdater::with_cloner(config, Arc::new(cloner.clone())).unwrap();

    assert!(updater.try_auto_update().await.unwrap().updated());
    assert_eq!(cloner.references(), vec!["v2.0.0"]);
}

#[tokio::test]
async fn test_failed_release_resolution_fails_auto_update() {
    let mut server = Server::new_async().await;
    let _release = server
        .mock("GET", "/repos/owner/app/releases/latest")
        .with_status(404)
        .create_async()
        .await;

    let fixture = UpdateFixture::new("1.0.0", "2.0.0").unwrap();
    let cloner = FixtureCloner::new(fixture.source_dir());
    let config = fixture.config().from_releases(true).with_api_base_url(server.url());
    let updater = AutoUpdater::with_cloner(config, Arc::new(cloner.clone())).unwrap();

    let err = updater.try_auto_update().await.unwrap_err();
    assert!(matches!(err, UpdateError::ReleaseResolution { .. }));
    assert!(!updater.auto_update().await);
    assert!(cloner.calls().is_empty());
}

#[tokio::test]
async fn test_releases_on_unsupported_host() {
    let fixture = UpdateFixture::new("1.0.0", "2.0.0").unwrap();
    let mut config = fixture.config().from_releases(true);
    config.repository = "https://gitlab.com/owner/app".to_string();
    let updater =
        AutoUpdater::with_cloner(config, Arc::new(FixtureCloner::new(fixture.source_dir())))
            .unwrap();

    let err = updater.try_auto_update().await.unwrap_err();
    assert!(err.to_string().contains("gitlab.com/owner/app"));
    assert!(matches!(
        updater.reference_state(),
        ReferenceState::Failed(UpdateError::UnsupportedHost { .. })
    ));
}

#[tokio::test]
async fn test_force_update_ignores_comparison() {
    let fixture = UpdateFixture::new("2.0.0", "2.0.0").unwrap();
    let cloner = FixtureCloner::new(fixture.source_dir());
    let config = fixture.config().with_raw_base_url("http://127.0.0.1:1");
    let updater = AutoUpdater::with_cloner(config, Arc::new(cloner.clone())).unwrap();

    assert!(updater.force_update().await);
    assert_eq!(cloner.references(), vec!["master"]);
    assert!(fixture.read_app_file("index.js").unwrap().contains("v2"));
}

#[tokio::test]
async fn test_force_update_reports_clone_failure() {
    let fixture = UpdateFixture::new("1.0.0", "2.0.0").unwrap();
    let updater = AutoUpdater::with_cloner(fixture.config(), Arc::new(FailingCloner)).unwrap();

    assert!(!updater.force_update().await);
    let err = updater.try_force_update().await.unwrap_err();
    assert!(matches!(err, UpdateError::Clone { .. }));
}

#[test]
fn test_missing_required_fields_fail_synchronously() {
    let fixture = UpdateFixture::new("1.0.0", "2.0.0").unwrap();

    let mut config = fixture.config();
    config.repository.clear();
    let err = AutoUpdater::with_cloner(config, Arc::new(FailingCloner)).unwrap_err();
    assert!(err.is_config());

    let mut config = fixture.config();
    config.temp_location = Default::default();
    let err = AutoUpdater::with_cloner(config, Arc::new(FailingCloner)).unwrap_err();
    assert!(err.is_config());

    assert!(!fixture.temp_location().join("git-autoupdate").exists());
}
