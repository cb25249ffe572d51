use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use crate::drive::entry::CleanupReason;
use crate::drive::{DriveConfig, TeamDrive, DEFAULT_FOLDERS};
use crate::error::DriveError;
use crate::storage::memory::MemoryBlobStore;
use crate::storage::{BlobStore, ChildList};

fn test_config() -> DriveConfig {
    DriveConfig {
        call_timeout: Duration::from_secs(5),
        propagation_delay: Duration::ZERO,
    }
}

fn drive_with_store() -> (TeamDrive, Arc<MemoryBlobStore>) {
    let store = Arc::new(MemoryBlobStore::new());
    let drive = TeamDrive::new(store.clone(), test_config());
    (drive, store)
}

async fn put(store: &MemoryBlobStore, key: &str, body: &str) {
    store
        .put(key, Bytes::from(body.to_string()), "application/pdf")
        .await
        .unwrap();
}

#[tokio::test]
async fn listing_filters_marker_files() {
    let (drive, store) = drive_with_store();
    put(&store, "teams/T1/docs/.keep", "marker").await;
    put(&store, "teams/T1/docs/.placeholder", "marker").await;
    put(&store, "teams/T1/docs/a.pdf", "content").await;

    let listing = drive.list_children("T1", "docs").await.unwrap();
    assert_eq!(listing.files.len(), 1);
    assert_eq!(listing.files[0].name, "a.pdf");
    assert_eq!(listing.files[0].relative_path, "docs/a.pdf");
    assert_eq!(listing.files[0].size, Some(7));
    assert!(listing.files[0].download_url.is_some());

    let root = drive.list_children("T1", "").await.unwrap();
    assert_eq!(root.folders.len(), 1);
    assert_eq!(root.folders[0].name, "docs");
    assert!(root.folders[0].is_folder);
}

#[tokio::test]
async fn metadata_failure_degrades_single_entry() {
    let (drive, store) = drive_with_store();
    put(&store, "teams/T1/docs/ok.pdf", "fine").await;
    put(&store, "teams/T1/docs/bad.pdf", "broken").await;
    store.fail_metadata_for("teams/T1/docs/bad.pdf");

    let listing = drive.list_children("T1", "docs").await.unwrap();
    assert_eq!(listing.files.len(), 2);
    let bad = listing.files.iter().find(|f| f.name == "bad.pdf").unwrap();
    assert!(bad.has_error);
    assert_eq!(bad.size, None);
    assert_eq!(bad.mime_type, "application/octet-stream");
    assert!(bad.download_url.is_none());
    let ok = listing.files.iter().find(|f| f.name == "ok.pdf").unwrap();
    assert!(!ok.has_error);
}

#[tokio::test]
async fn denied_root_is_tenant_unavailable() {
    let (drive, store) = drive_with_store();
    store.deny_prefix("teams/T1");
    let err = drive.list_children("T1", "").await.unwrap_err();
    assert!(matches!(err, DriveError::TenantUnavailable { .. }));
}

#[tokio::test]
async fn missing_team_is_rejected_everywhere() {
    let (drive, _store) = drive_with_store();
    assert!(matches!(
        drive.list_children("", "").await,
        Err(DriveError::MissingTenant)
    ));
    assert!(matches!(
        drive
            .upload("", "docs", "a.pdf", Bytes::from_static(b"x"), "application/pdf")
            .await,
        Err(DriveError::MissingTenant)
    ));
    assert!(matches!(
        drive.storage_exists("").await,
        Err(DriveError::MissingTenant)
    ));
}

#[tokio::test]
async fn walk_emits_folders_before_their_contents() {
    let (drive, store) = drive_with_store();
    put(&store, "teams/T1/root.txt", "r").await;
    put(&store, "teams/T1/a/one.txt", "1").await;
    put(&store, "teams/T1/a/b/two.txt", "22").await;

    let entries = drive.walk("T1", "").await.unwrap();
    let rels: Vec<&str> = entries.iter().map(|e| e.relative_path.as_str()).collect();
    assert_eq!(rels, vec!["root.txt", "a", "a/one.txt", "a/b", "a/b/two.txt"]);
    let a = entries.iter().find(|e| e.relative_path == "a").unwrap();
    assert!(a.is_folder);
}

#[tokio::test]
async fn recursive_delete_reports_per_item_outcomes() {
    let (drive, store) = drive_with_store();
    put(&store, "teams/T1/old/a.pdf", "a").await;
    put(&store, "teams/T1/old/b.pdf", "b").await;
    put(&store, "teams/T1/old/sub/c.pdf", "c").await;
    store.fail_delete_for("teams/T1/old/b.pdf");

    let out = drive.delete_folder("T1", "old").await.unwrap();
    assert_eq!(out.total, 3);
    assert_eq!(out.deleted + out.failed, out.total);
    assert_eq!(out.deleted, 2);
    assert_eq!(out.failed, 1);
    // One individual delete call per object, no batching.
    assert_eq!(store.delete_calls(), 3);
    // Failed object is left in place for a follow-up attempt.
    assert!(store.data_of("teams/T1/old/b.pdf").is_some());
    assert!(store.data_of("teams/T1/old/a.pdf").is_none());
}

#[tokio::test]
async fn delete_folder_with_nothing_under_it_reports_zero() {
    let (drive, _store) = drive_with_store();
    let out = drive.delete_folder("T1", "ghost").await.unwrap();
    assert_eq!(out.total, 0);
    assert_eq!(out.deleted, 0);
    assert_eq!(out.failed, 0);
}

#[tokio::test]
async fn cleanup_classifies_marker_only_and_phantom_folders() {
    let (drive, store) = drive_with_store();
    put(&store, "teams/T1/empty-ish/.keep", "marker").await;
    put(&store, "teams/T1/real/.keep", "marker").await;
    put(&store, "teams/T1/real/doc.pdf", "content").await;
    store.insert_phantom_prefix("teams/T1/ghost");

    let mut found = drive.cleanup_candidates("T1").await.unwrap();
    found.sort_by(|a, b| a.folder.cmp(&b.folder));
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].folder, "empty-ish");
    assert_eq!(found[0].kind, CleanupReason::OnlyMarkers);
    assert_eq!(found[0].items, 1);
    assert_eq!(found[1].folder, "ghost");
    assert_eq!(found[1].kind, CleanupReason::Empty);
    assert!(!found.iter().any(|c| c.folder == "real"));
}

#[tokio::test]
async fn depth_capped_folder_is_never_a_cleanup_candidate() {
    let (drive, store) = drive_with_store();
    // One object 51 folders deep; the walk stops observing at depth 50, so
    // the boundary folder's contents are unknown, not absent.
    let segments: Vec<String> = (0..51).map(|i| format!("d{i}")).collect();
    let key = format!("teams/T1/{}/contract.pdf", segments.join("/"));
    put(&store, &key, "content").await;

    let found = drive.cleanup_candidates("T1").await.unwrap();
    assert!(found.is_empty(), "proposed {found:?} for a populated tree");
}

#[tokio::test]
async fn folder_with_populated_subfolder_is_not_a_candidate() {
    let (drive, store) = drive_with_store();
    put(&store, "teams/T1/parent/.keep", "marker").await;
    put(&store, "teams/T1/parent/child/doc.pdf", "content").await;

    let found = drive.cleanup_candidates("T1").await.unwrap();
    assert!(!found.iter().any(|c| c.folder == "parent"));
}

#[tokio::test]
async fn second_upload_of_same_name_overwrites_silently() {
    let (drive, store) = drive_with_store();
    drive
        .upload("T1", "docs", "a.pdf", Bytes::from_static(b"first"), "application/pdf")
        .await
        .unwrap();
    drive
        .upload("T1", "docs", "a.pdf", Bytes::from_static(b"second"), "application/pdf")
        .await
        .unwrap();

    let listing = drive.list_children("T1", "docs").await.unwrap();
    assert_eq!(listing.files.len(), 1);
    assert_eq!(
        store.data_of("teams/T1/docs/a.pdf").unwrap(),
        Bytes::from_static(b"second")
    );
}

#[tokio::test]
async fn upload_rejects_invalid_file_names() {
    let (drive, store) = drive_with_store();
    for name in ["", "/", "a/b.pdf"] {
        let err = drive
            .upload("T1", "docs", name, Bytes::from_static(b"x"), "application/pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, DriveError::InvalidName(_)), "name {name:?}");
    }
    assert_eq!(store.key_count(), 0);
}

#[tokio::test]
async fn rename_always_fails_unsupported() {
    let (drive, store) = drive_with_store();
    put(&store, "teams/T1/docs/a.pdf", "x").await;
    let err = drive.rename("T1", "docs/a.pdf", "docs/b.pdf", false).unwrap_err();
    assert!(matches!(err, DriveError::Unsupported(_)));
    let err = drive.rename("T1", "docs", "papers", true).unwrap_err();
    assert!(matches!(err, DriveError::Unsupported(_)));
    // Nothing was touched.
    assert!(store.data_of("teams/T1/docs/a.pdf").is_some());
    assert_eq!(store.key_count(), 1);
}

#[tokio::test]
async fn delete_missing_file_is_not_found() {
    let (drive, _store) = drive_with_store();
    let err = drive.delete_file("T1", "docs/nope.pdf").await.unwrap_err();
    assert!(matches!(err, DriveError::NotFound(_)));
}

#[tokio::test]
async fn delete_file_accepts_full_and_relative_paths() {
    let (drive, store) = drive_with_store();
    put(&store, "teams/T1/docs/a.pdf", "x").await;
    put(&store, "teams/T1/docs/b.pdf", "y").await;
    drive.delete_file("T1", "docs/a.pdf").await.unwrap();
    drive.delete_file("T1", "teams/T1/docs/b.pdf").await.unwrap();
    assert_eq!(store.key_count(), 0);
}

#[tokio::test]
async fn provisioning_creates_default_folders_and_descriptor() {
    let (drive, store) = drive_with_store();
    let out = drive
        .create_team_structure("T1", "Equipo Uno")
        .await
        .unwrap();
    assert_eq!(out.folders.len(), DEFAULT_FOLDERS.len());
    assert_eq!(out.base_path, "teams/T1");

    for folder in DEFAULT_FOLDERS {
        assert!(store.data_of(&format!("teams/T1/{folder}/.keep")).is_some());
    }
    let info_raw = store.data_of("teams/T1/team-info.json").unwrap();
    let info: crate::drive::entry::TeamInfo = serde_json::from_slice(&info_raw).unwrap();
    assert_eq!(info.team_id, "T1");
    assert_eq!(info.team_name, "Equipo Uno");
    assert_eq!(info.version, "1.0");
    assert_eq!(info.folders.len(), DEFAULT_FOLDERS.len());

    // Default folders appear in the root listing, markers stay hidden.
    let root = drive.list_children("T1", "").await.unwrap();
    assert_eq!(root.folders.len(), DEFAULT_FOLDERS.len());
    assert!(root.files.iter().all(|f| f.name != ".keep"));
}

#[tokio::test]
async fn stats_counts_everything_and_caches() {
    let (drive, store) = drive_with_store();
    put(&store, "teams/T1/docs/a.pdf", "12345").await;
    put(&store, "teams/T1/docs/sub/b.pdf", "123").await;

    let stats = drive.stats("T1", false).await.unwrap();
    assert_eq!(stats.files, 2);
    assert_eq!(stats.folders, 2);
    assert_eq!(stats.total_items, 4);
    assert_eq!(stats.total_size, 8);

    // A cached read does not rescan even after the data changed.
    put(&store, "teams/T1/docs/c.pdf", "zz").await;
    let cached = drive.stats("T1", false).await.unwrap();
    assert_eq!(cached.files, 2);
    let fresh = drive.stats("T1", true).await.unwrap();
    assert_eq!(fresh.files, 3);
}

#[tokio::test]
async fn quick_stats_and_existence_probe() {
    let (drive, store) = drive_with_store();
    assert!(!drive.storage_exists("T1").await.unwrap().exists);

    put(&store, "teams/T1/team-info.json", "{}").await;
    put(&store, "teams/T1/docs/a.pdf", "x").await;
    let quick = drive.quick_stats("T1").await.unwrap();
    assert_eq!(quick.root_folders, 1);
    assert_eq!(quick.root_files, 1);
    assert!(quick.has_content);

    let exists = drive.storage_exists("T1").await.unwrap();
    assert!(exists.exists);
}

#[tokio::test]
async fn listing_is_cached_until_a_write_invalidates() {
    let (drive, store) = drive_with_store();
    put(&store, "teams/T1/docs/a.pdf", "x").await;

    let first = drive.list_children("T1", "docs").await.unwrap();
    assert_eq!(first.files.len(), 1);

    // A write that bypasses the drive is invisible through the cache.
    put(&store, "teams/T1/docs/b.pdf", "y").await;
    let cached = drive.list_children("T1", "docs").await.unwrap();
    assert_eq!(cached.files.len(), 1);

    // A write through the drive drops the team's cached listings.
    drive
        .upload("T1", "docs", "c.pdf", Bytes::from_static(b"z"), "application/pdf")
        .await
        .unwrap();
    let fresh = drive.list_children("T1", "docs").await.unwrap();
    assert_eq!(fresh.files.len(), 3);
}

#[tokio::test]
async fn connection_test_reports_failure_without_erroring() {
    let (drive, store) = drive_with_store();
    put(&store, "teams/T1/docs/a.pdf", "x").await;
    let report = drive.test_connection("T1").await.unwrap();
    assert!(report.ok);
    assert_eq!(report.folders, 1);

    store.deny_prefix("teams/T2");
    let report = drive.test_connection("T2").await.unwrap();
    assert!(!report.ok);
    assert!(report.message.contains("unreachable"));
}

#[tokio::test]
async fn download_url_is_lazy_and_checks_existence() {
    let (drive, store) = drive_with_store();
    put(&store, "teams/T1/docs/a.pdf", "x").await;

    let basic = drive.list_files_basic("T1", "docs").await.unwrap();
    assert_eq!(basic.len(), 1);
    assert!(basic[0].download_url.is_none());
    assert_eq!(basic[0].size, Some(1));

    let url = drive.download_url("T1", "docs/a.pdf").await.unwrap();
    assert_eq!(url, "memory://teams/T1/docs/a.pdf");
    assert!(matches!(
        drive.download_url("T1", "docs/missing.pdf").await,
        Err(DriveError::NotFound(_))
    ));
}

#[tokio::test]
async fn end_to_end_team_scenario() {
    let (drive, _store) = drive_with_store();
    drive.create_team_structure("T1", "Equipo Uno").await.unwrap();
    drive
        .upload(
            "T1",
            "2024/q1",
            "invoice.pdf",
            Bytes::from_static(b"%PDF-1.4"),
            "application/pdf",
        )
        .await
        .unwrap();

    let listing = drive.list_children("T1", "2024/q1").await.unwrap();
    assert_eq!(listing.files.len(), 1);
    assert_eq!(listing.files[0].name, "invoice.pdf");
    assert!(listing.files.iter().all(|f| !f.name.starts_with('.')));

    let root = drive.list_children("T1", "").await.unwrap();
    assert!(root.folders.iter().any(|f| f.name == "2024"));

    let trail = drive.diagnostics();
    assert!(trail.iter().any(|line| line.contains("invoice.pdf")));
}

struct StallStore;

#[async_trait::async_trait]
impl BlobStore for StallStore {
    async fn list_children(&self, _prefix: &str) -> anyhow::Result<ChildList> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(ChildList::default())
    }
    async fn get_metadata(&self, _key: &str) -> anyhow::Result<crate::storage::BlobMeta> {
        anyhow::bail!("unused")
    }
    async fn download_url(&self, _key: &str) -> anyhow::Result<String> {
        anyhow::bail!("unused")
    }
    async fn put(&self, _key: &str, _data: Bytes, _ct: &str) -> anyhow::Result<()> {
        anyhow::bail!("unused")
    }
    async fn delete(&self, _key: &str) -> anyhow::Result<()> {
        anyhow::bail!("unused")
    }
    async fn exists(&self, _key: &str) -> anyhow::Result<bool> {
        anyhow::bail!("unused")
    }
}

#[tokio::test]
async fn hung_backend_surfaces_timeout() {
    let config = DriveConfig {
        call_timeout: Duration::from_millis(100),
        propagation_delay: Duration::ZERO,
    };
    let drive = TeamDrive::new(Arc::new(StallStore), config);
    let err = drive.list_children("T1", "").await.unwrap_err();
    assert!(matches!(err, DriveError::Timeout("list_children")));
}
