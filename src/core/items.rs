//! Library item writes: CRUD, publishing, engagement and uploads.
//!
//! Any write that touches an existing record goes through
//! [`RecordStore::modify`](crate::store::RecordStore::modify) so it cannot
//! clobber a concurrent engagement increment.

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::{
    EngagementCounter, FilePayload, ItemDraft, LibraryItem, Metadata, UploadDefaults,
};
use crate::error::{CatalogError, CatalogResult};

use super::engine::{BulkOutcome, CatalogEngine};
use super::uploads::thumbnail_ref_for;

const MIN_DIFFICULTY: u8 = 1;
const MAX_DIFFICULTY: u8 = 3;

impl CatalogEngine {
    /// Persist a new unpublished item, storing the file payload first if given
    #[instrument(skip(self, draft, file), fields(title = %draft.title))]
    pub async fn create_item(
        &self,
        draft: ItemDraft,
        file: Option<FilePayload>,
        actor: &str,
    ) -> CatalogResult<LibraryItem> {
        self.validate_item_draft(&draft).await?;

        let mut item = LibraryItem::from_draft(draft, actor);
        if let Some(file) = file {
            let reference = self.store_file(&file).await?;
            if item.thumbnail_ref.is_none() {
                item.thumbnail_ref = Some(thumbnail_ref_for(&reference));
            }
            item.file_ref = Some(reference);
        }

        let file_ref = item.file_ref.clone();
        match self.items.put(item).await {
            Ok(stored) => {
                info!(id = %stored.id, item_type = %stored.item_type, %actor, "Created library item");
                Ok(stored)
            }
            Err(e) => {
                if let Some(reference) = file_ref {
                    self.release_blob(&reference).await;
                }
                Err(e)
            }
        }
    }

    /// `create_item` without a file payload
    pub async fn create_item_from_text(&self, draft: ItemDraft, actor: &str) -> CatalogResult<LibraryItem> {
        self.create_item(draft, None, actor).await
    }

    /// Replace the descriptive fields of an item.
    ///
    /// A new file payload releases the previous blob before the new one is
    /// stored. Counters and publish state are never touched.
    #[instrument(skip(self, draft, file), fields(id = %id))]
    pub async fn update_item(
        &self,
        id: Uuid,
        draft: ItemDraft,
        file: Option<FilePayload>,
        actor: &str,
    ) -> CatalogResult<LibraryItem> {
        let existing = self.require_item(id).await?;
        self.validate_item_draft(&draft).await?;

        let new_file_ref = match file {
            Some(file) => {
                self.uploads.validate(&file)?;
                if let Some(old) = &existing.file_ref {
                    self.release_blob(old).await;
                }
                match self.store_file(&file).await {
                    Ok(reference) => Some(reference),
                    Err(e) => {
                        if let Some(old) = &existing.file_ref {
                            warn!(error = %e, released = %old, "Replacement file not stored");
                            self.clear_file_ref(id, old, actor).await;
                        }
                        return Err(e);
                    }
                }
            }
            None => None,
        };

        let actor_owned = actor.to_string();
        let replacement = new_file_ref.clone();
        let result = self
            .items
            .modify(
                id,
                Box::new(move |item: &mut LibraryItem| {
                    let thumbnail = draft.thumbnail_ref.clone();
                    item.apply_draft(draft);
                    if let Some(reference) = replacement {
                        item.thumbnail_ref = Some(thumbnail_ref_for(&reference));
                        item.file_ref = Some(reference);
                    }
                    if thumbnail.is_some() {
                        item.thumbnail_ref = thumbnail;
                    }
                    item.touch(&actor_owned);
                    Ok(())
                }),
            )
            .await;

        let stored = match result {
            Ok(Some(stored)) => stored,
            other => {
                if let Some(reference) = &new_file_ref {
                    self.release_blob(reference).await;
                }
                return other?.ok_or_else(|| CatalogError::item_not_found(id));
            }
        };

        info!(%actor, "Updated library item");
        Ok(stored)
    }

    /// Merge keys into the item's metadata; unmentioned keys are kept
    #[instrument(skip(self, partial), fields(id = %id, keys = partial.len()))]
    pub async fn update_metadata(
        &self,
        id: Uuid,
        partial: Metadata,
        actor: &str,
    ) -> CatalogResult<LibraryItem> {
        let actor_owned = actor.to_string();
        self.items
            .modify(
                id,
                Box::new(move |item: &mut LibraryItem| {
                    item.metadata.extend(partial);
                    item.touch(&actor_owned);
                    Ok(())
                }),
            )
            .await?
            .ok_or_else(|| CatalogError::item_not_found(id))
    }

    /// Remove an item, releasing its stored file first
    #[instrument(skip(self), fields(id = %id))]
    pub async fn delete_item(&self, id: Uuid, actor: &str) -> CatalogResult<()> {
        let item = self.require_item(id).await?;
        if let Some(reference) = &item.file_ref {
            self.release_blob(reference).await;
        }

        self.items.delete(id).await?;
        info!(title = %item.title, %actor, "Deleted library item");
        Ok(())
    }

    // ========== Publishing ==========

    /// Publish an item, re-stamping publish date and reviewer
    #[instrument(skip(self), fields(id = %id))]
    pub async fn publish(&self, id: Uuid, reviewer: &str) -> CatalogResult<LibraryItem> {
        let reviewer_owned = reviewer.to_string();
        let stored = self
            .items
            .modify(
                id,
                Box::new(move |item: &mut LibraryItem| {
                    item.publish(&reviewer_owned);
                    item.touch(&reviewer_owned);
                    Ok(())
                }),
            )
            .await?
            .ok_or_else(|| CatalogError::item_not_found(id))?;

        info!(%reviewer, "Published library item");
        Ok(stored)
    }

    /// Hide an item. Review history stays; the featured flag is cleared.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn unpublish(&self, id: Uuid, actor: &str) -> CatalogResult<LibraryItem> {
        let actor_owned = actor.to_string();
        let stored = self
            .items
            .modify(
                id,
                Box::new(move |item: &mut LibraryItem| {
                    item.unpublish();
                    item.touch(&actor_owned);
                    Ok(())
                }),
            )
            .await?
            .ok_or_else(|| CatalogError::item_not_found(id))?;

        info!(%actor, "Unpublished library item");
        Ok(stored)
    }

    /// Only published items can be featured
    #[instrument(skip(self), fields(id = %id))]
    pub async fn set_featured(&self, id: Uuid, featured: bool, actor: &str) -> CatalogResult<LibraryItem> {
        let actor_owned = actor.to_string();
        self.items
            .modify(
                id,
                Box::new(move |item: &mut LibraryItem| {
                    if featured && !item.is_published {
                        return Err(CatalogError::Validation(format!(
                            "item {} must be published before it can be featured",
                            item.id
                        )));
                    }
                    item.is_featured = featured;
                    item.touch(&actor_owned);
                    Ok(())
                }),
            )
            .await?
            .ok_or_else(|| CatalogError::item_not_found(id))
    }

    // ========== Engagement ==========

    pub async fn record_view(&self, id: Uuid) -> CatalogResult<u64> {
        self.record_engagement(id, EngagementCounter::View).await
    }

    pub async fn record_download(&self, id: Uuid) -> CatalogResult<u64> {
        self.record_engagement(id, EngagementCounter::Download).await
    }

    pub async fn record_like(&self, id: Uuid) -> CatalogResult<u64> {
        self.record_engagement(id, EngagementCounter::Like).await
    }

    pub async fn record_share(&self, id: Uuid) -> CatalogResult<u64> {
        self.record_engagement(id, EngagementCounter::Share).await
    }

    /// Atomically bump one counter and return its new value
    #[instrument(skip(self), level = "debug")]
    pub async fn record_engagement(&self, id: Uuid, counter: EngagementCounter) -> CatalogResult<u64> {
        let item = self
            .items
            .modify(
                id,
                Box::new(move |item: &mut LibraryItem| {
                    item.increment(counter);
                    Ok(())
                }),
            )
            .await?
            .ok_or_else(|| CatalogError::item_not_found(id))?;

        let stats = item.statistics();
        Ok(match counter {
            EngagementCounter::View => stats.views,
            EngagementCounter::Download => stats.downloads,
            EngagementCounter::Like => stats.likes,
            EngagementCounter::Share => stats.shares,
        })
    }

    /// Public read path: returns the item with its view already counted
    pub async fn view_item(&self, id: Uuid) -> CatalogResult<LibraryItem> {
        self.items
            .modify(
                id,
                Box::new(|item: &mut LibraryItem| {
                    item.increment(EngagementCounter::View);
                    Ok(())
                }),
            )
            .await?
            .ok_or_else(|| CatalogError::item_not_found(id))
    }

    /// Bytes of the item's stored file
    pub async fn load_item_file(&self, id: Uuid) -> CatalogResult<Vec<u8>> {
        let item = self.require_item(id).await?;
        let reference = item.file_ref.ok_or_else(|| CatalogError::NotFound {
            kind: "item file",
            id: id.to_string(),
        })?;
        self.blobs.load(&reference).await
    }

    // ========== Bulk ==========

    /// Create one item per file from shared defaults.
    ///
    /// An unknown default category is dropped rather than failing the batch.
    #[instrument(skip(self, files, defaults), fields(count = files.len()))]
    pub async fn bulk_upload(
        &self,
        files: Vec<FilePayload>,
        defaults: UploadDefaults,
        actor: &str,
    ) -> CatalogResult<BulkOutcome<String, LibraryItem>> {
        let category_id = match defaults.category_id {
            Some(id) if self.categories.get(id).await?.is_some() => Some(id),
            Some(id) => {
                warn!(category_id = %id, "Bulk upload category not found, items left uncategorized");
                None
            }
            None => None,
        };

        let mut outcome = BulkOutcome::new();
        for file in files {
            let name = file.original_name.clone();
            let mut draft = ItemDraft::new(
                defaults.title.clone().unwrap_or_else(|| name.clone()),
                defaults.item_type.unwrap_or_default(),
            );
            draft.description = defaults.description.clone();
            draft.category_id = category_id;
            draft.tags = defaults.tags.clone();

            let result = self.create_item(draft, Some(file), actor).await;
            if let Err(e) = &result {
                warn!(file = %name, error = %e, "Bulk upload rejected file");
            }
            outcome.push(name, result);
        }

        info!(
            created = outcome.success_count(),
            rejected = outcome.failure_count(),
            "Bulk upload finished"
        );
        Ok(outcome)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn bulk_delete_items(&self, ids: &[Uuid], actor: &str) -> BulkOutcome<Uuid, ()> {
        let mut outcome = BulkOutcome::new();
        for &id in ids {
            outcome.push(id, self.delete_item(id, actor).await);
        }
        outcome
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn bulk_publish(&self, ids: &[Uuid], reviewer: &str) -> BulkOutcome<Uuid, LibraryItem> {
        let mut outcome = BulkOutcome::new();
        for &id in ids {
            outcome.push(id, self.publish(id, reviewer).await);
        }
        outcome
    }

    // ========== Helpers ==========

    async fn validate_item_draft(&self, draft: &ItemDraft) -> CatalogResult<()> {
        if draft.title.trim().is_empty() {
            return Err(CatalogError::Validation("item title must not be blank".to_string()));
        }

        if let Some(difficulty) = draft.difficulty {
            if !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&difficulty) {
                return Err(CatalogError::Validation(format!(
                    "difficulty must be between {} and {}, got {}",
                    MIN_DIFFICULTY, MAX_DIFFICULTY, difficulty
                )));
            }
        }

        if let Some(category_id) = draft.category_id {
            self.require_category(category_id).await?;
        }

        Ok(())
    }

    async fn store_file(&self, file: &FilePayload) -> CatalogResult<String> {
        self.uploads.validate(file)?;
        let reference = self.blobs.store(&file.bytes, Some(&file.original_name)).await?;
        debug!(%reference, size = file.len(), "Stored file");
        Ok(reference)
    }

    /// Drop a released file reference (and its derived thumbnail) from the
    /// record so it does not point at a deleted blob
    async fn clear_file_ref(&self, id: Uuid, released: &str, actor: &str) {
        let released = released.to_string();
        let actor_owned = actor.to_string();
        let result = self
            .items
            .modify(
                id,
                Box::new(move |item: &mut LibraryItem| {
                    if item.file_ref.as_deref() == Some(released.as_str()) {
                        if item.thumbnail_ref.as_deref() == Some(thumbnail_ref_for(&released).as_str()) {
                            item.thumbnail_ref = None;
                        }
                        item.file_ref = None;
                        item.touch(&actor_owned);
                    }
                    Ok(())
                }),
            )
            .await;
        if let Err(e) = result {
            warn!(%id, error = %e, "Failed to clear released file reference");
        }
    }

    /// Best-effort blob deletion; failures are logged, never returned
    async fn release_blob(&self, reference: &str) {
        match self.blobs.delete(reference).await {
            Ok(true) => debug!(%reference, "Released blob"),
            Ok(false) => debug!(%reference, "Blob already gone"),
            Err(e) => warn!(%reference, error = %e, "Failed to release blob"),
        }
    }
}
