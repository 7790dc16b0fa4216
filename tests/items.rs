//! Library Item Integration Tests
//!
//! Tests for the publish lifecycle, tag filters, file handling and
//! metadata merges.

use std::sync::Arc;

use marinelib::adapters::{BlobStore, MemoryBlobStore};
use marinelib::domain::{CategoryDraft, FilePayload, ItemDraft, ItemType, Metadata};
use marinelib::{CatalogEngine, CatalogError, MemoryStore};
use serde_json::json;

fn engine_with_blobs() -> (CatalogEngine, Arc<MemoryBlobStore>) {
    let blobs = Arc::new(MemoryBlobStore::new());
    let engine = CatalogEngine::from_store(Arc::new(MemoryStore::new()), blobs.clone());
    (engine, blobs)
}

#[tokio::test]
async fn test_publish_and_unpublish_lifecycle() {
    let engine = CatalogEngine::in_memory();
    let item = engine
        .create_item_from_text(ItemDraft::new("Bleaching primer", ItemType::Guide), "ana")
        .await
        .unwrap();
    assert!(item.publish_date.is_none());

    let published = engine.publish(item.id, "reviewer-7").await.unwrap();
    assert!(published.is_published);
    assert!(published.publish_date.is_some());
    assert_eq!(published.reviewed_by.as_deref(), Some("reviewer-7"));
    assert!(published.reviewed_at.is_some());

    let hidden = engine.unpublish(item.id, "ana").await.unwrap();
    assert!(!hidden.is_published);
    assert_eq!(hidden.publish_date, published.publish_date);
    assert_eq!(hidden.reviewed_by.as_deref(), Some("reviewer-7"));

    // Republishing re-stamps
    let again = engine.publish(item.id, "reviewer-9").await.unwrap();
    assert_eq!(again.reviewed_by.as_deref(), Some("reviewer-9"));
    assert!(again.publish_date >= published.publish_date);
}

#[tokio::test]
async fn test_filter_by_tags_uses_and_semantics() {
    let engine = CatalogEngine::in_memory();
    let both = engine
        .create_item_from_text(
            ItemDraft::new("Both", ItemType::Article).with_tags(["coral", "bleaching"]),
            "ana",
        )
        .await
        .unwrap();
    let coral_only = engine
        .create_item_from_text(ItemDraft::new("Coral", ItemType::Article).with_tag("coral"), "ana")
        .await
        .unwrap();
    engine
        .create_item_from_text(ItemDraft::new("Kelp", ItemType::Article).with_tag("kelp"), "ana")
        .await
        .unwrap();

    let tags = vec!["coral".to_string(), "bleaching".to_string()];
    let matched = engine.filter_by_tags(&tags).await.unwrap();
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].id, both.id);

    let mut coral: Vec<_> = engine
        .filter_by_tags(&["coral".to_string()])
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.id)
        .collect();
    coral.sort();
    let mut expected = vec![both.id, coral_only.id];
    expected.sort();
    assert_eq!(coral, expected);

    assert!(engine.filter_by_tags(&[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_other_filters() {
    let engine = CatalogEngine::in_memory();
    let reef = engine.create_category(CategoryDraft::new("Reef"), "ana").await.unwrap();
    engine
        .create_item_from_text(
            ItemDraft::new("Easy", ItemType::Video)
                .in_category(reef.id)
                .with_difficulty(1)
                .with_language("es")
                .with_author("Mar"),
            "ana",
        )
        .await
        .unwrap();
    engine
        .create_item_from_text(ItemDraft::new("Hard", ItemType::Faq).with_difficulty(3), "ana")
        .await
        .unwrap();

    assert_eq!(engine.filter_by_category(reef.id).await.unwrap().len(), 1);
    assert_eq!(engine.filter_by_type(ItemType::Video).await.unwrap().len(), 1);
    assert_eq!(engine.filter_by_difficulty(3).await.unwrap().len(), 1);
    assert_eq!(engine.filter_by_language("es").await.unwrap().len(), 1);
    assert_eq!(engine.filter_by_language("en").await.unwrap().len(), 1);
    assert_eq!(engine.items_by_author("Mar").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_file_upload_sets_refs_and_delete_releases_blob() {
    let (engine, blobs) = engine_with_blobs();

    let item = engine
        .create_item(
            ItemDraft::new("Survey scan", ItemType::ImageGallery),
            Some(FilePayload::new("survey.png", b"\x89PNG".to_vec())),
            "ana",
        )
        .await
        .unwrap();

    let file_ref = item.file_ref.clone().unwrap();
    assert!(file_ref.ends_with(".png"));
    assert_eq!(item.thumbnail_ref.as_deref(), Some(file_ref.replace(".png", "_thumb.png").as_str()));
    assert!(blobs.exists(&file_ref).await.unwrap());
    assert_eq!(engine.load_item_file(item.id).await.unwrap(), b"\x89PNG");

    engine.delete_item(item.id, "ana").await.unwrap();
    assert!(blobs.is_empty());
    assert!(engine.get_item(item.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_update_with_new_file_replaces_blob() {
    let (engine, blobs) = engine_with_blobs();
    let item = engine
        .create_item(
            ItemDraft::new("Report", ItemType::Pdf),
            Some(FilePayload::new("v1.pdf", b"one".to_vec())),
            "ana",
        )
        .await
        .unwrap();
    let old_ref = item.file_ref.clone().unwrap();
    engine.record_view(item.id).await.unwrap();

    let updated = engine
        .update_item(
            item.id,
            ItemDraft::new("Report v2", ItemType::Pdf),
            Some(FilePayload::new("v2.pdf", b"two".to_vec())),
            "ben",
        )
        .await
        .unwrap();

    assert_eq!(updated.title, "Report v2");
    assert_eq!(updated.view_count, 1);
    assert_eq!(updated.updated_by, "ben");
    assert_ne!(updated.file_ref.as_deref(), Some(old_ref.as_str()));
    assert!(!blobs.exists(&old_ref).await.unwrap());
    assert_eq!(blobs.len(), 1);
    assert_eq!(engine.load_item_file(item.id).await.unwrap(), b"two");
}

#[tokio::test]
async fn test_update_keeps_content_unless_supplied() {
    let engine = CatalogEngine::in_memory();
    let item = engine
        .create_item_from_text(
            ItemDraft::new("Notes", ItemType::Article).with_content("Original body"),
            "ana",
        )
        .await
        .unwrap();

    let updated = engine
        .update_item(item.id, ItemDraft::new("Notes", ItemType::Article), None, "ana")
        .await
        .unwrap();
    assert_eq!(updated.content.as_deref(), Some("Original body"));

    let err = engine
        .update_item(uuid::Uuid::new_v4(), ItemDraft::new("Ghost", ItemType::Article), None, "ana")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_rejected_upload_stores_nothing() {
    let (engine, blobs) = engine_with_blobs();

    let err = engine
        .create_item(
            ItemDraft::new("Payload", ItemType::Pdf),
            Some(FilePayload::new("install.exe", b"MZ".to_vec())),
            "ana",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Validation(_)));
    assert!(blobs.is_empty());
    assert!(engine.all_items().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_metadata_merge() {
    let engine = CatalogEngine::in_memory();
    let item = engine
        .create_item_from_text(
            ItemDraft::new("Sensor data", ItemType::ResearchPaper)
                .with_metadata("region", json!("Pacific"))
                .with_metadata("year", json!(2023)),
            "ana",
        )
        .await
        .unwrap();

    let mut partial = Metadata::new();
    partial.insert("year".to_string(), json!(2024));
    partial.insert("station".to_string(), json!("B-12"));

    let merged = engine.update_metadata(item.id, partial, "ben").await.unwrap();
    assert_eq!(merged.metadata.get("region"), Some(&json!("Pacific")));
    assert_eq!(merged.metadata.get("year"), Some(&json!(2024)));
    assert_eq!(merged.metadata.get("station"), Some(&json!("B-12")));
    assert_eq!(merged.updated_by, "ben");
}

#[tokio::test]
async fn test_featured_listing_and_bulk_publish() {
    let engine = CatalogEngine::in_memory();
    let mut ids = Vec::new();
    for title in ["One", "Two", "Three"] {
        let item = engine
            .create_item_from_text(ItemDraft::new(title, ItemType::Article), "ana")
            .await
            .unwrap();
        ids.push(item.id);
    }
    let ghost = uuid::Uuid::new_v4();
    ids.push(ghost);

    let outcome = engine.bulk_publish(&ids, "rev").await;
    assert_eq!(outcome.success_count(), 3);
    assert_eq!(outcome.failed().next().map(|(id, _)| *id), Some(ghost));
    assert_eq!(engine.published_items().await.unwrap().len(), 3);

    engine.set_featured(ids[0], true, "ana").await.unwrap();
    let featured = engine.featured_items().await.unwrap();
    assert_eq!(featured.len(), 1);
    assert_eq!(featured[0].id, ids[0]);

    let outcome = engine.bulk_delete_items(&ids, "ana").await;
    assert_eq!(outcome.success_count(), 3);
    assert!(engine.all_items().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_item_statistics_snapshot() {
    let engine = CatalogEngine::in_memory();
    let item = engine
        .create_item_from_text(ItemDraft::new("Counted", ItemType::Infographic), "ana")
        .await
        .unwrap();

    engine.record_view(item.id).await.unwrap();
    engine.record_like(item.id).await.unwrap();
    engine.record_like(item.id).await.unwrap();

    let stats = engine.item_statistics(item.id).await.unwrap();
    assert_eq!(stats.views, 1);
    assert_eq!(stats.likes, 2);
    assert_eq!(stats.downloads, 0);
    assert_eq!(stats.shares, 0);
}
