//! Categories: nodes of the topic taxonomy.
//!
//! The parent relation is a weak reference by id. Categories never embed
//! their parent or children, so records stay flat and serializable.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored category record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// Unique identifier
    pub id: Uuid,

    /// Display name, unique across the catalog (case-insensitive)
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Reference to an icon image
    #[serde(default)]
    pub icon_ref: Option<String>,

    /// Parent category id (None for top-level categories)
    #[serde(default)]
    pub parent_id: Option<Uuid>,

    /// Related search tags
    #[serde(default)]
    pub tags: BTreeSet<String>,

    /// Position among siblings; ties are broken by name
    pub display_order: i64,

    pub is_active: bool,

    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_by: String,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    /// Build a fresh record from caller-supplied data
    pub fn from_draft(draft: CategoryDraft, display_order: i64, actor: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: draft.name,
            description: draft.description,
            icon_ref: draft.icon_ref,
            parent_id: draft.parent_id,
            tags: draft.tags,
            display_order,
            is_active: true,
            created_by: actor.to_string(),
            created_at: now,
            updated_by: actor.to_string(),
            updated_at: now,
        }
    }

    /// Merge the mutable fields of a draft into this record.
    ///
    /// Name, description, icon, parent and tags are replaced wholesale.
    /// Display order and the active flag are only touched when supplied.
    pub fn apply_draft(&mut self, draft: CategoryDraft) {
        self.name = draft.name;
        self.description = draft.description;
        self.icon_ref = draft.icon_ref;
        self.parent_id = draft.parent_id;
        self.tags = draft.tags;
        if let Some(order) = draft.display_order {
            self.display_order = order;
        }
        if let Some(active) = draft.is_active {
            self.is_active = active;
        }
    }

    /// Re-stamp the update audit fields
    pub fn touch(&mut self, actor: &str) {
        self.updated_by = actor.to_string();
        self.updated_at = Utc::now();
    }

    /// Lowercased name used for uniqueness checks
    pub fn name_key(&self) -> String {
        normalize_name(&self.name)
    }

    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Case-folding applied to category names before comparison
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Caller-supplied data for creating or updating a category
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryDraft {
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub icon_ref: Option<String>,

    #[serde(default)]
    pub parent_id: Option<Uuid>,

    #[serde(default)]
    pub tags: BTreeSet<String>,

    /// Assigned automatically (max existing + 1) when absent on create
    #[serde(default)]
    pub display_order: Option<i64>,

    #[serde(default)]
    pub is_active: Option<bool>,
}

impl CategoryDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_icon(mut self, icon_ref: impl Into<String>) -> Self {
        self.icon_ref = Some(icon_ref.into());
        self
    }

    pub fn with_parent(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
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

    pub fn with_display_order(mut self, order: i64) -> Self {
        self.display_order = Some(order);
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.is_active = Some(active);
        self
    }
}

impl From<&Category> for CategoryDraft {
    fn from(category: &Category) -> Self {
        Self {
            name: category.name.clone(),
            description: category.description.clone(),
            icon_ref: category.icon_ref.clone(),
            parent_id: category.parent_id,
            tags: category.tags.clone(),
            display_order: Some(category.display_order),
            is_active: Some(category.is_active),
        }
    }
}

/// A category with its subtree, as returned by the tree view
#[derive(Debug, Clone, Serialize)]
pub struct CategoryNode {
    pub category: Category,

    /// Items assigned directly to this category
    pub item_count: usize,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<CategoryNode>,
}

impl CategoryNode {
    /// Number of nodes in this subtree, including self
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(CategoryNode::size).sum::<usize>()
    }
}
