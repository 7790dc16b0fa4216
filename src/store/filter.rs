//! Typed filters and sort orders for the two record kinds.

use std::cmp::Ordering;

use uuid::Uuid;

use super::Record;
use crate::domain::{normalize_name, Category, ItemType, LibraryItem};

/// Predicates over categories
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryFilter {
    /// Active flag equals
    Active(bool),

    /// Direct children of a category
    Parent(Uuid),

    /// Categories without a parent
    TopLevel,

    /// Exact name, case-insensitive
    NameEquals(String),

    /// Name contains the fragment, case-insensitive
    NameContains(String),

    Tag(String),
}

/// Sort orders over categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryOrder {
    /// `(display_order, name)` ascending
    DisplayOrder,

    /// Store iteration order
    Insertion,
}

impl Record for Category {
    type Filter = CategoryFilter;
    type Order = CategoryOrder;

    const KIND: &'static str = "category";

    fn id(&self) -> Uuid {
        self.id
    }

    fn matches(&self, filter: &CategoryFilter) -> bool {
        match filter {
            CategoryFilter::Active(active) => self.is_active == *active,
            CategoryFilter::Parent(parent) => self.parent_id == Some(*parent),
            CategoryFilter::TopLevel => self.parent_id.is_none(),
            CategoryFilter::NameEquals(name) => self.name_key() == normalize_name(name),
            CategoryFilter::NameContains(fragment) => {
                self.name_key().contains(&normalize_name(fragment))
            }
            CategoryFilter::Tag(tag) => self.tags.contains(tag),
        }
    }

    fn compare(a: &Self, b: &Self, order: CategoryOrder) -> Ordering {
        match order {
            CategoryOrder::DisplayOrder => a
                .display_order
                .cmp(&b.display_order)
                .then_with(|| a.name.cmp(&b.name)),
            CategoryOrder::Insertion => Ordering::Equal,
        }
    }
}

/// Predicates over library items
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemFilter {
    Category(Uuid),
    Type(ItemType),

    /// Item carries this tag
    Tag(String),

    /// Item carries every one of these tags
    AllTags(Vec<String>),

    Language(String),
    Difficulty(u8),
    Published(bool),

    /// Published and featured
    Featured,

    Author(String),
    CreatedBy(String),
}

/// Sort orders over library items
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOrder {
    /// Newest first
    CreatedDesc,

    /// Most viewed first
    ViewsDesc,

    /// Store iteration order
    Insertion,
}

impl Record for LibraryItem {
    type Filter = ItemFilter;
    type Order = ItemOrder;

    const KIND: &'static str = "library item";

    fn id(&self) -> Uuid {
        self.id
    }

    fn matches(&self, filter: &ItemFilter) -> bool {
        match filter {
            ItemFilter::Category(id) => self.category_id == Some(*id),
            ItemFilter::Type(t) => self.item_type == *t,
            ItemFilter::Tag(tag) => self.has_tag(tag),
            ItemFilter::AllTags(tags) => tags.iter().all(|t| self.has_tag(t)),
            ItemFilter::Language(lang) => self.language == *lang,
            ItemFilter::Difficulty(d) => self.difficulty == Some(*d),
            ItemFilter::Published(p) => self.is_published == *p,
            ItemFilter::Featured => self.is_published && self.is_featured,
            ItemFilter::Author(author) => self.author.as_deref() == Some(author.as_str()),
            ItemFilter::CreatedBy(actor) => self.created_by == *actor,
        }
    }

    fn compare(a: &Self, b: &Self, order: ItemOrder) -> Ordering {
        match order {
            ItemOrder::CreatedDesc => b.created_at.cmp(&a.created_at),
            ItemOrder::ViewsDesc => b.view_count.cmp(&a.view_count),
            ItemOrder::Insertion => Ordering::Equal,
        }
    }
}
