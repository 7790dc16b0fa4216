//! Category writes.
//!
//! Every create and update re-validates the complete candidate against a
//! fresh snapshot of the category table. Deletes go through the dependents
//! guard, which inspects both stores.

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::{Category, CategoryDraft};
use crate::error::{CatalogError, CatalogResult};
use crate::store::{CategoryFilter, ItemFilter};

use super::engine::{BulkOutcome, CatalogEngine};
use super::validator::{next_display_order, HierarchyValidator};

impl CatalogEngine {
    /// Validate and persist a new category.
    ///
    /// The record starts active; display order is assigned when absent.
    #[instrument(skip(self, draft), fields(name = %draft.name))]
    pub async fn create_category(&self, draft: CategoryDraft, actor: &str) -> CatalogResult<Category> {
        let snapshot = self.category_snapshot().await?;
        let display_order = draft
            .display_order
            .unwrap_or_else(|| next_display_order(&snapshot));

        let candidate = Category::from_draft(draft, display_order, actor);
        HierarchyValidator::new(&snapshot).validate(&candidate)?;

        let stored = self.categories.put(candidate).await?;
        info!(id = %stored.id, display_order = stored.display_order, %actor, "Created category");
        Ok(stored)
    }

    /// Merge a draft into an existing category and re-validate the result
    #[instrument(skip(self, draft), fields(id = %id))]
    pub async fn update_category(
        &self,
        id: Uuid,
        draft: CategoryDraft,
        actor: &str,
    ) -> CatalogResult<Category> {
        let snapshot = self.category_snapshot().await?;
        let actor_owned = actor.to_string();

        // Merge and validate against the live record so concurrent status
        // changes are not overwritten
        let stored = self
            .categories
            .modify(
                id,
                Box::new(move |category: &mut Category| {
                    category.apply_draft(draft);
                    HierarchyValidator::new(&snapshot).validate(category)?;
                    category.touch(&actor_owned);
                    Ok(())
                }),
            )
            .await?
            .ok_or_else(|| CatalogError::category_not_found(id))?;

        info!(name = %stored.name, %actor, "Updated category");
        Ok(stored)
    }

    /// Remove a category that has no subcategories and no items
    #[instrument(skip(self), fields(id = %id))]
    pub async fn delete_category(&self, id: Uuid, actor: &str) -> CatalogResult<()> {
        let category = self.require_category(id).await?;
        self.check_no_dependents(id).await?;

        self.categories.delete(id).await?;
        info!(name = %category.name, %actor, "Deleted category");
        Ok(())
    }

    /// Fails with the first dependent kind found: subcategories, then items
    async fn check_no_dependents(&self, id: Uuid) -> CatalogResult<()> {
        let children = self.categories.count(&CategoryFilter::Parent(id)).await?;
        if children > 0 {
            return Err(CatalogError::HasSubcategories { id, count: children });
        }

        let items = self.items.count(&ItemFilter::Category(id)).await?;
        if items > 0 {
            return Err(CatalogError::HasItems { id, count: items });
        }

        Ok(())
    }

    /// Set the active flag. Name and parent are untouched so no re-validation.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn toggle_active(&self, id: Uuid, active: bool, actor: &str) -> CatalogResult<Category> {
        let actor_owned = actor.to_string();
        let stored = self
            .categories
            .modify(
                id,
                Box::new(move |category: &mut Category| {
                    category.is_active = active;
                    category.touch(&actor_owned);
                    Ok(())
                }),
            )
            .await?
            .ok_or_else(|| CatalogError::category_not_found(id))?;

        info!(active, %actor, "Changed category status");
        Ok(stored)
    }

    /// Next automatic display order for a new category
    pub async fn next_display_order(&self) -> CatalogResult<i64> {
        Ok(next_display_order(&self.category_snapshot().await?))
    }

    // ========== Bulk ==========

    /// Create each draft in turn. Later drafts see the earlier ones, so
    /// duplicate names within one batch are rejected too.
    #[instrument(skip(self, drafts), fields(count = drafts.len()))]
    pub async fn bulk_create_categories(
        &self,
        drafts: Vec<CategoryDraft>,
        actor: &str,
    ) -> BulkOutcome<usize, Category> {
        let mut outcome = BulkOutcome::new();
        for (index, draft) in drafts.into_iter().enumerate() {
            let result = self.create_category(draft, actor).await;
            if let Err(e) = &result {
                warn!(index, error = %e, "Bulk create rejected category");
            }
            outcome.push(index, result);
        }
        debug!(
            succeeded = outcome.success_count(),
            failed = outcome.failure_count(),
            "Bulk create finished"
        );
        outcome
    }

    #[instrument(skip(self, updates), fields(count = updates.len()))]
    pub async fn bulk_update_categories(
        &self,
        updates: Vec<(Uuid, CategoryDraft)>,
        actor: &str,
    ) -> BulkOutcome<Uuid, Category> {
        let mut outcome = BulkOutcome::new();
        for (id, draft) in updates {
            let result = self.update_category(id, draft, actor).await;
            if let Err(e) = &result {
                warn!(%id, error = %e, "Bulk update rejected category");
            }
            outcome.push(id, result);
        }
        outcome
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn bulk_update_status(
        &self,
        ids: &[Uuid],
        active: bool,
        actor: &str,
    ) -> BulkOutcome<Uuid, Category> {
        let mut outcome = BulkOutcome::new();
        for &id in ids {
            outcome.push(id, self.toggle_active(id, active, actor).await);
        }
        outcome
    }

    /// Delete each id under the dependents guard, independently
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn bulk_delete_categories(&self, ids: &[Uuid], actor: &str) -> BulkOutcome<Uuid, ()> {
        let mut outcome = BulkOutcome::new();
        for &id in ids {
            let result = self.delete_category(id, actor).await;
            if let Err(e) = &result {
                warn!(%id, error = %e, "Bulk delete skipped category");
            }
            outcome.push(id, result);
        }
        info!(
            deleted = outcome.success_count(),
            skipped = outcome.failure_count(),
            "Bulk delete finished"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::adapters::MemoryBlobStore;
    use crate::domain::{ItemDraft, ItemType};
    use crate::store::{CategoryOrder, MemoryStore, Mutation, RecordStore};

    #[tokio::test]
    async fn test_create_assigns_display_order() {
        let engine = CatalogEngine::in_memory();

        let first = engine.create_category(CategoryDraft::new("Reef"), "ana").await.unwrap();
        assert_eq!(first.display_order, 1);
        assert!(first.is_active);
        assert_eq!(first.created_by, "ana");

        let pinned = engine
            .create_category(CategoryDraft::new("Mangroves").with_display_order(10), "ana")
            .await
            .unwrap();
        assert_eq!(pinned.display_order, 10);

        let next = engine.create_category(CategoryDraft::new("Kelp"), "ana").await.unwrap();
        assert_eq!(next.display_order, 11);
    }

    #[tokio::test]
    async fn test_update_keeps_order_and_status_unless_given() {
        let engine = CatalogEngine::in_memory();
        let reef = engine
            .create_category(CategoryDraft::new("Reef").with_display_order(4), "ana")
            .await
            .unwrap();
        engine.toggle_active(reef.id, false, "ana").await.unwrap();

        let updated = engine
            .update_category(reef.id, CategoryDraft::new("Coral Reef"), "ben")
            .await
            .unwrap();
        assert_eq!(updated.name, "Coral Reef");
        assert_eq!(updated.display_order, 4);
        assert!(!updated.is_active);
        assert_eq!(updated.updated_by, "ben");
        assert_eq!(updated.created_by, "ana");
    }

    #[tokio::test]
    async fn test_update_unknown_is_not_found() {
        let engine = CatalogEngine::in_memory();
        let err = engine
            .update_category(Uuid::new_v4(), CategoryDraft::new("Ghost"), "ana")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_guard_checks_items() {
        let engine = CatalogEngine::in_memory();
        let reef = engine.create_category(CategoryDraft::new("Reef"), "ana").await.unwrap();
        engine
            .create_item_from_text(ItemDraft::new("Survey", ItemType::Article).in_category(reef.id), "ana")
            .await
            .unwrap();

        let err = engine.delete_category(reef.id, "ana").await.unwrap_err();
        assert!(matches!(err, CatalogError::HasItems { count: 1, .. }));
    }

    #[tokio::test]
    async fn test_bulk_create_rejects_duplicate_within_batch() {
        let engine = CatalogEngine::in_memory();
        let outcome = engine
            .bulk_create_categories(
                vec![
                    CategoryDraft::new("Reef"),
                    CategoryDraft::new("REEF"),
                    CategoryDraft::new("Kelp"),
                ],
                "ana",
            )
            .await;

        assert_eq!(outcome.success_count(), 2);
        let (index, err) = outcome.failed().next().unwrap();
        assert_eq!(*index, 1);
        assert!(matches!(err, CatalogError::DuplicateName(_)));
    }

    #[tokio::test]
    async fn test_bulk_update_status_reports_unknown_ids() {
        let engine = CatalogEngine::in_memory();
        let reef = engine.create_category(CategoryDraft::new("Reef"), "ana").await.unwrap();
        let ghost = Uuid::new_v4();

        let outcome = engine.bulk_update_status(&[reef.id, ghost], false, "ana").await;
        assert_eq!(outcome.success_count(), 1);
        assert_eq!(outcome.failed().next().map(|(id, _)| *id), Some(ghost));
        assert!(!engine.require_category(reef.id).await.unwrap().is_active);
    }

    /// Category table whose full scans stall, widening the window between
    /// an update's snapshot and its write
    struct SlowScans {
        inner: MemoryStore,
    }

    #[async_trait]
    impl RecordStore<Category> for SlowScans {
        async fn get(&self, id: Uuid) -> CatalogResult<Option<Category>> {
            RecordStore::<Category>::get(&self.inner, id).await
        }

        async fn put(&self, record: Category) -> CatalogResult<Category> {
            RecordStore::<Category>::put(&self.inner, record).await
        }

        async fn delete(&self, id: Uuid) -> CatalogResult<bool> {
            RecordStore::<Category>::delete(&self.inner, id).await
        }

        async fn scan(&self, filter: &CategoryFilter) -> CatalogResult<Vec<Category>> {
            RecordStore::<Category>::scan(&self.inner, filter).await
        }

        async fn scan_all(&self, order: CategoryOrder) -> CatalogResult<Vec<Category>> {
            tokio::time::sleep(Duration::from_millis(100)).await;
            RecordStore::<Category>::scan_all(&self.inner, order).await
        }

        async fn batch_put(&self, records: Vec<Category>) -> CatalogResult<Vec<Category>> {
            RecordStore::<Category>::batch_put(&self.inner, records).await
        }

        async fn batch_delete(&self, ids: &[Uuid]) -> CatalogResult<usize> {
            RecordStore::<Category>::batch_delete(&self.inner, ids).await
        }

        async fn modify(&self, id: Uuid, mutation: Mutation<Category>) -> CatalogResult<Option<Category>> {
            RecordStore::<Category>::modify(&self.inner, id, mutation).await
        }
    }

    #[tokio::test]
    async fn test_update_keeps_concurrent_status_change() {
        let items = Arc::new(MemoryStore::new());
        let engine = Arc::new(CatalogEngine::new(
            Arc::new(SlowScans { inner: MemoryStore::new() }),
            items.clone(),
            items,
            Arc::new(MemoryBlobStore::new()),
        ));
        let reef = engine.create_category(CategoryDraft::new("Reef"), "ana").await.unwrap();

        let updater = {
            let engine = engine.clone();
            tokio::spawn(async move {
                engine
                    .update_category(
                        reef.id,
                        CategoryDraft::new("Reef").with_description("Shallow water"),
                        "ben",
                    )
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        engine.toggle_active(reef.id, false, "cara").await.unwrap();

        let updated = updater.await.unwrap().unwrap();
        assert!(!updated.is_active);
        assert_eq!(updated.description.as_deref(), Some("Shallow water"));

        let stored = engine.require_category(reef.id).await.unwrap();
        assert!(!stored.is_active);
        assert_eq!(stored.updated_by, "ben");
    }

    #[tokio::test]
    async fn test_rejected_update_leaves_record_unchanged() {
        let engine = CatalogEngine::in_memory();
        let reef = engine.create_category(CategoryDraft::new("Reef"), "ana").await.unwrap();
        engine.create_category(CategoryDraft::new("Kelp"), "ana").await.unwrap();

        let err = engine
            .update_category(reef.id, CategoryDraft::new("kelp").with_description("x"), "ben")
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateName(_)));

        let stored = engine.require_category(reef.id).await.unwrap();
        assert_eq!(stored.name, "Reef");
        assert_eq!(stored.description, None);
        assert_eq!(stored.updated_by, "ana");
    }
}
