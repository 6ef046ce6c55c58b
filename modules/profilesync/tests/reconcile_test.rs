//! End-to-end reconciliation runs with fake adapters, a fake image probe and
//! a real snapshot file in a temp directory. No network.

use std::path::Path;
use std::sync::Arc;

use profilesync::adapters::SourceAdapter;
use profilesync::images::ImageChoice;
use profilesync::testing::{profile, FakeAdapter, FakeDownloader, FakeProbe};
use profilesync::{Cascade, NetworkStatus, Reconciler, SnapshotStore};
use profilesync_common::{Config, Network, ProfileSyncError};
use serde_json::{json, Value};

const FALLBACK: &str = "img/default_profile.png";

fn write_snapshot(path: &Path, value: Value) {
    std::fs::write(path, serde_json::to_string_pretty(&value).unwrap()).unwrap();
}

fn read_snapshot(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

fn cascade(network: Network, adapters: Vec<FakeAdapter>) -> Cascade {
    Cascade::new(
        network,
        adapters
            .into_iter()
            .map(|a| Box::new(a) as Box<dyn SourceAdapter>)
            .collect(),
    )
}

#[tokio::test]
async fn failed_network_is_carried_forward_and_fresh_one_is_merged() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("social_data.json");
    write_snapshot(
        &path,
        json!({
            "twitter": {"username": "devacct", "followers": 100, "image": "old.jpg"},
            "instagram": {"username": "photos", "followers": 50},
        }),
    );

    let reconciler = Reconciler::new(
        SnapshotStore::new(&path),
        vec![
            cascade(
                Network::Twitter,
                vec![
                    FakeAdapter::failing("twitter.v2.by_id", "HTTP 429"),
                    FakeAdapter::failing("twitter.v2.by_username", "timeout"),
                    FakeAdapter::failing("twitter.v1.users_show", "HTTP 403"),
                ],
            ),
            cascade(
                Network::Instagram,
                vec![FakeAdapter::succeeding(
                    "instagram.graph_me",
                    profile("photos", 60, Some("new_insta.jpg")),
                )],
            ),
        ],
        Arc::new(FakeProbe::live(&["old.jpg"])),
        FALLBACK,
    );

    let report = reconciler.run().await.unwrap();
    assert!(report.saved);
    assert_eq!(
        report.network(Network::Twitter).unwrap().status,
        NetworkStatus::CarriedForward { failed_attempts: 3 }
    );
    assert_eq!(
        report.network(Network::Instagram).unwrap().image,
        Some(ImageChoice::Fresh("new_insta.jpg".into()))
    );

    let saved = read_snapshot(&path);
    assert_eq!(saved["twitter"]["followers"], 100);
    assert_eq!(saved["twitter"]["image"], "old.jpg");
    assert_eq!(saved["instagram"]["followers"], 60);
    assert_eq!(saved["instagram"]["image"], "new_insta.jpg");
    assert!(saved["last_updated"].is_string());
}

#[tokio::test]
async fn networks_without_credentials_keep_their_entry_byte_for_byte() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("social_data.json");
    let twitter = json!({
        "username": "devacct",
        "name": "Dev Account",
        "description": "hi",
        "followers": 100,
        "following": 5,
        "tweets": 42,
        "profile_image_url": "https://pbs.twimg.com/profile_images/1/a_400x400.jpg",
        "profile_image_path": "img/twitter_profile.jpg",
        "pinned": {"id": "99"}
    });
    let instagram = json!({"followers": 0});
    write_snapshot(
        &path,
        json!({
            "twitter": twitter.clone(),
            "instagram": instagram.clone(),
            "last_updated": "2025-03-01T12:30:00.123456",
        }),
    );

    let config = Config {
        output_path: path.clone(),
        save_profile_images: false,
        ..Config::default()
    };
    let http = reqwest::Client::new();
    let reconciler = Reconciler::new(
        SnapshotStore::new(&path),
        Network::ALL
            .iter()
            .map(|n| Cascade::from_config(*n, &config, &http))
            .collect(),
        Arc::new(FakeProbe::live(&[])),
        FALLBACK,
    );

    let report = reconciler.run().await.unwrap();
    assert_eq!(report.refreshed(), 0);

    let after = read_snapshot(&path);
    for (network, before) in [("twitter", &twitter), ("instagram", &instagram)] {
        assert_eq!(
            serde_json::to_string_pretty(before).unwrap(),
            serde_json::to_string_pretty(&after[network]).unwrap(),
            "{network} entry changed"
        );
    }
    assert_ne!(after["last_updated"], "2025-03-01T12:30:00.123456");
}

#[tokio::test]
async fn refreshed_network_replaces_stale_source_fields() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("social_data.json");
    write_snapshot(
        &path,
        json!({
            "instagram": {
                "username": "photos",
                "id": "1",
                "account_type": "PERSONAL",
                "profile_image_url": "https://cdn.example/old.jpg",
                "biography": "old bio",
                "pinned": true
            }
        }),
    );

    let mut fresh = profile("photos", 60, None);
    fresh.bio = "new bio".into();
    fresh.extra.insert("id".into(), json!("2"));
    fresh.extra.insert("account_type".into(), json!("BUSINESS"));

    let reconciler = Reconciler::new(
        SnapshotStore::new(&path),
        vec![cascade(
            Network::Instagram,
            vec![FakeAdapter::succeeding("instagram.graph_me", fresh)],
        )],
        Arc::new(FakeProbe::live(&[])),
        FALLBACK,
    );
    reconciler.run().await.unwrap();

    let saved = read_snapshot(&path);
    let entry = &saved["instagram"];
    assert_eq!(entry["followers"], 60);
    assert_eq!(entry["bio"], "new bio");
    assert_eq!(entry["id"], "2");
    assert_eq!(entry["account_type"], "BUSINESS");
    assert!(entry.get("profile_image_url").is_none());
    assert!(entry.get("biography").is_none());
    assert_eq!(entry["pinned"], true);
}

#[tokio::test]
async fn every_fetch_failing_still_writes_a_complete_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out").join("social_data.json");

    let reconciler = Reconciler::new(
        SnapshotStore::new(&path),
        vec![
            cascade(Network::Twitter, vec![FakeAdapter::failing("t", "down")]),
            cascade(Network::Instagram, vec![FakeAdapter::failing("i", "down")]),
        ],
        Arc::new(FakeProbe::live(&[])),
        FALLBACK,
    );

    let report = reconciler.run().await.unwrap();
    assert!(report.saved);

    let saved = read_snapshot(&path);
    for network in ["twitter", "instagram"] {
        assert_eq!(saved[network]["followers"], 0);
        assert_eq!(saved[network]["following"], 0);
        assert_eq!(saved[network]["posts"], 0);
    }
}

#[tokio::test]
async fn negative_or_null_counts_are_repaired_in_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("social_data.json");
    write_snapshot(
        &path,
        json!({"twitter": {"followers": -20, "following": null}, "instagram": {}}),
    );

    let reconciler = Reconciler::new(
        SnapshotStore::new(&path),
        Vec::new(),
        Arc::new(FakeProbe::live(&[])),
        FALLBACK,
    );
    reconciler.run().await.unwrap();

    let saved = read_snapshot(&path);
    assert_eq!(saved["twitter"], json!({"followers": 0, "following": 0}));
    // Absent counts are not invalid; the entry stays as it was.
    assert_eq!(saved["instagram"], json!({}));
}

#[tokio::test]
async fn dead_prior_and_no_fresh_image_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("social_data.json");
    write_snapshot(
        &path,
        json!({"twitter": {"followers": 1, "image": "https://gone.example/a.jpg"}}),
    );

    let reconciler = Reconciler::new(
        SnapshotStore::new(&path),
        vec![cascade(
            Network::Twitter,
            vec![FakeAdapter::succeeding("t", profile("devacct", 2, None))],
        )],
        Arc::new(FakeProbe::live(&[])),
        FALLBACK,
    );
    reconciler.run().await.unwrap();

    let saved = read_snapshot(&path);
    assert_eq!(saved["twitter"]["followers"], 2);
    assert_eq!(saved["twitter"]["image"], FALLBACK);
}

#[tokio::test]
async fn fresh_remote_image_is_stored_locally_when_downloads_succeed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("social_data.json");
    let remote = "https://pbs.twimg.com/profile_images/1/a_400x400.jpg";

    let downloader = Arc::new(FakeDownloader::new().on(remote, "img/twitter_profile.jpg"));
    let reconciler = Reconciler::new(
        SnapshotStore::new(&path),
        vec![
            cascade(
                Network::Twitter,
                vec![FakeAdapter::succeeding("t", profile("devacct", 9, Some(remote)))],
            ),
            cascade(
                Network::Instagram,
                vec![FakeAdapter::succeeding(
                    "i",
                    profile("photos", 3, Some("https://cdn.example/broken.jpg")),
                )],
            ),
        ],
        Arc::new(FakeProbe::live(&[])),
        FALLBACK,
    )
    .with_downloader(downloader.clone());

    reconciler.run().await.unwrap();

    let saved = read_snapshot(&path);
    assert_eq!(saved["twitter"]["image"], "img/twitter_profile.jpg");
    // Download failed: the remote reference is kept.
    assert_eq!(saved["instagram"]["image"], "https://cdn.example/broken.jpg");

    let mut requested: Vec<_> = downloader.requests().into_iter().map(|(n, _)| n).collect();
    requested.sort();
    assert_eq!(requested, vec![Network::Twitter, Network::Instagram]);
}

#[tokio::test]
async fn live_prior_image_is_not_downloaded_again() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("social_data.json");
    write_snapshot(
        &path,
        json!({"twitter": {"followers": 1, "image": "img/twitter_profile.jpg"}}),
    );

    let downloader = Arc::new(FakeDownloader::new());
    let reconciler = Reconciler::new(
        SnapshotStore::new(&path),
        vec![cascade(
            Network::Twitter,
            vec![FakeAdapter::succeeding(
                "t",
                profile("devacct", 2, Some("https://pbs.twimg.com/new.jpg")),
            )],
        )],
        Arc::new(FakeProbe::live(&["img/twitter_profile.jpg"])),
        FALLBACK,
    )
    .with_downloader(downloader.clone());

    reconciler.run().await.unwrap();

    assert!(downloader.requests().is_empty());
    assert_eq!(read_snapshot(&path)["twitter"]["image"], "img/twitter_profile.jpg");
}

#[tokio::test]
async fn dry_run_leaves_the_file_alone() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("social_data.json");

    let reconciler = Reconciler::new(
        SnapshotStore::new(&path),
        vec![cascade(
            Network::Instagram,
            vec![FakeAdapter::succeeding("i", profile("photos", 60, None))],
        )],
        Arc::new(FakeProbe::live(&[])),
        FALLBACK,
    )
    .dry_run(true);

    let report = reconciler.run().await.unwrap();
    assert!(!report.saved);
    assert!(!path.exists());
    assert_eq!(
        report
            .snapshot
            .profile(Network::Instagram)
            .unwrap()
            .follower_count,
        60
    );
}

#[tokio::test]
async fn save_failure_is_the_only_error() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not_a_dir");
    std::fs::write(&blocker, "file").unwrap();

    let reconciler = Reconciler::new(
        SnapshotStore::new(blocker.join("social_data.json")),
        vec![cascade(Network::Twitter, vec![FakeAdapter::failing("t", "down")])],
        Arc::new(FakeProbe::live(&[])),
        FALLBACK,
    );

    let err = reconciler.run().await.unwrap_err();
    assert!(matches!(err, ProfileSyncError::PersistenceWrite { .. }));
}
