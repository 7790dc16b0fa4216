//! Library items: published educational and reference content.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default content language
pub const DEFAULT_LANGUAGE: &str = "en";

/// Free-form metadata attached to an item
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Kind of library content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemType {
    Pdf,
    Article,
    Video,
    ImageGallery,
    Infographic,
    Guide,
    ResearchPaper,
    Faq,
}

impl ItemType {
    pub const ALL: [ItemType; 8] = [
        ItemType::Pdf,
        ItemType::Article,
        ItemType::Video,
        ItemType::ImageGallery,
        ItemType::Infographic,
        ItemType::Guide,
        ItemType::ResearchPaper,
        ItemType::Faq,
    ];

    /// Human-readable label
    pub fn display_name(&self) -> &'static str {
        match self {
            ItemType::Pdf => "PDF Document",
            ItemType::Article => "Article",
            ItemType::Video => "Video",
            ItemType::ImageGallery => "Image Gallery",
            ItemType::Infographic => "Infographic",
            ItemType::Guide => "Guide",
            ItemType::ResearchPaper => "Research Paper",
            ItemType::Faq => "Frequently Asked Questions",
        }
    }

    /// Stable storage key
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Pdf => "PDF",
            ItemType::Article => "ARTICLE",
            ItemType::Video => "VIDEO",
            ItemType::ImageGallery => "IMAGE_GALLERY",
            ItemType::Infographic => "INFOGRAPHIC",
            ItemType::Guide => "GUIDE",
            ItemType::ResearchPaper => "RESEARCH_PAPER",
            ItemType::Faq => "FAQ",
        }
    }
}

impl Default for ItemType {
    fn default() -> Self {
        Self::Pdf
    }
}

impl std::fmt::Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ItemType {
    type Err = crate::error::CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_uppercase().replace(['-', ' '], "_");
        ItemType::ALL
            .into_iter()
            .find(|t| t.as_str() == key)
            .ok_or_else(|| {
                crate::error::CatalogError::Validation(format!("unknown item type: {}", s))
            })
    }
}

/// One of the four per-item engagement counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementCounter {
    View,
    Download,
    Like,
    Share,
}

/// Snapshot of an item's engagement counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStatistics {
    pub views: u64,
    pub downloads: u64,
    pub likes: u64,
    pub shares: u64,
}

/// A stored library item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryItem {
    pub id: Uuid,
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    pub item_type: ItemType,

    /// Inline text (articles, FAQs)
    #[serde(default)]
    pub content: Option<String>,

    /// Reference into the blob store
    #[serde(default)]
    pub file_ref: Option<String>,

    #[serde(default)]
    pub thumbnail_ref: Option<String>,

    /// Owning category (weak reference)
    #[serde(default)]
    pub category_id: Option<Uuid>,

    #[serde(default)]
    pub tags: BTreeSet<String>,

    #[serde(default)]
    pub author: Option<String>,

    /// Originating organisation (e.g. "NOAA")
    #[serde(default)]
    pub source: Option<String>,

    #[serde(default)]
    pub read_time_minutes: Option<u32>,

    pub language: String,

    /// 1 = beginner, 2 = intermediate, 3 = advanced
    #[serde(default)]
    pub difficulty: Option<u8>,

    #[serde(default)]
    pub metadata: Metadata,

    pub view_count: u64,
    pub download_count: u64,
    pub like_count: u64,
    pub share_count: u64,

    pub is_published: bool,
    pub is_featured: bool,

    #[serde(default)]
    pub publish_date: Option<DateTime<Utc>>,

    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_by: String,
    pub updated_at: DateTime<Utc>,

    #[serde(default)]
    pub reviewed_by: Option<String>,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl LibraryItem {
    /// Build a fresh, unpublished record with zeroed counters
    pub fn from_draft(draft: ItemDraft, actor: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: draft.title,
            description: draft.description,
            item_type: draft.item_type,
            content: draft.content,
            file_ref: None,
            thumbnail_ref: draft.thumbnail_ref,
            category_id: draft.category_id,
            tags: draft.tags,
            author: draft.author,
            source: draft.source,
            read_time_minutes: draft.read_time_minutes,
            language: draft
                .language
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            difficulty: draft.difficulty,
            metadata: draft.metadata.unwrap_or_default(),
            view_count: 0,
            download_count: 0,
            like_count: 0,
            share_count: 0,
            is_published: false,
            is_featured: false,
            publish_date: None,
            created_by: actor.to_string(),
            created_at: now,
            updated_by: actor.to_string(),
            updated_at: now,
            reviewed_by: None,
            reviewed_at: None,
        }
    }

    /// Replace the descriptive fields from a draft.
    ///
    /// Content is only replaced when supplied; metadata is replaced
    /// wholesale when supplied.
    pub fn apply_draft(&mut self, draft: ItemDraft) {
        self.title = draft.title;
        self.description = draft.description;
        self.item_type = draft.item_type;
        self.category_id = draft.category_id;
        self.tags = draft.tags;
        self.author = draft.author;
        self.source = draft.source;
        self.difficulty = draft.difficulty;
        self.language = draft
            .language
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
        self.read_time_minutes = draft.read_time_minutes;
        if let Some(content) = draft.content {
            self.content = Some(content);
        }
        if let Some(metadata) = draft.metadata {
            self.metadata = metadata;
        }
    }

    pub fn touch(&mut self, actor: &str) {
        self.updated_by = actor.to_string();
        self.updated_at = Utc::now();
    }

    /// Mark as published; publish fields are re-stamped every time
    pub fn publish(&mut self, reviewer: &str) {
        let now = Utc::now();
        self.is_published = true;
        self.publish_date = Some(now);
        self.reviewed_by = Some(reviewer.to_string());
        self.reviewed_at = Some(now);
    }

    /// Hide from the public catalog; review history is kept
    pub fn unpublish(&mut self) {
        self.is_published = false;
        self.is_featured = false;
    }

    /// Bump one counter by one and return its new value
    pub fn increment(&mut self, counter: EngagementCounter) -> u64 {
        let slot = match counter {
            EngagementCounter::View => &mut self.view_count,
            EngagementCounter::Download => &mut self.download_count,
            EngagementCounter::Like => &mut self.like_count,
            EngagementCounter::Share => &mut self.share_count,
        };
        *slot = slot.saturating_add(1);
        *slot
    }

    pub fn statistics(&self) -> ItemStatistics {
        ItemStatistics {
            views: self.view_count,
            downloads: self.download_count,
            likes: self.like_count,
            shares: self.share_count,
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Case-insensitive substring match over title, description, author and tags.
    /// `needle` must already be lowercased.
    pub fn matches_keyword(&self, needle: &str) -> bool {
        let contains = |s: &Option<String>| {
            s.as_deref()
                .map(|v| v.to_lowercase().contains(needle))
                .unwrap_or(false)
        };

        self.title.to_lowercase().contains(needle)
            || contains(&self.description)
            || contains(&self.author)
            || self.tags.iter().any(|t| t.to_lowercase().contains(needle))
    }
}

/// Caller-supplied data for creating or updating an item
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemDraft {
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub item_type: ItemType,

    #[serde(default)]
    pub content: Option<String>,

    #[serde(default)]
    pub thumbnail_ref: Option<String>,

    #[serde(default)]
    pub category_id: Option<Uuid>,

    #[serde(default)]
    pub tags: BTreeSet<String>,

    #[serde(default)]
    pub author: Option<String>,

    #[serde(default)]
    pub source: Option<String>,

    #[serde(default)]
    pub read_time_minutes: Option<u32>,

    #[serde(default)]
    pub language: Option<String>,

    #[serde(default)]
    pub difficulty: Option<u8>,

    #[serde(default)]
    pub metadata: Option<Metadata>,
}

impl ItemDraft {
    pub fn new(title: impl Into<String>, item_type: ItemType) -> Self {
        Self {
            title: title.into(),
            item_type,
            ..Default::default()
        }
    }

    pub fn in_category(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_difficulty(mut self, difficulty: u8) -> Self {
        self.difficulty = Some(difficulty);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata
            .get_or_insert_with(Metadata::new)
            .insert(key.into(), value);
        self
    }
}

impl From<&LibraryItem> for ItemDraft {
    fn from(item: &LibraryItem) -> Self {
        Self {
            title: item.title.clone(),
            description: item.description.clone(),
            item_type: item.item_type,
            content: item.content.clone(),
            thumbnail_ref: item.thumbnail_ref.clone(),
            category_id: item.category_id,
            tags: item.tags.clone(),
            author: item.author.clone(),
            source: item.source.clone(),
            read_time_minutes: item.read_time_minutes,
            language: Some(item.language.clone()),
            difficulty: item.difficulty,
            metadata: Some(item.metadata.clone()),
        }
    }
}

/// An uploaded file to be placed in the blob store
#[derive(Debug, Clone)]
pub struct FilePayload {
    /// Name the file had on the uploader's side
    pub original_name: String,
    pub bytes: Vec<u8>,
}

impl FilePayload {
    pub fn new(original_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            original_name: original_name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Shared defaults applied to every file of a bulk upload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadDefaults {
    /// Falls back to each file's original name
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// Falls back to `PDF`
    #[serde(default)]
    pub item_type: Option<ItemType>,

    #[serde(default)]
    pub category_id: Option<Uuid>,

    #[serde(default)]
    pub tags: BTreeSet<String>,
}
