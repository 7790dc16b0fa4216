//! Read-only views over the catalog.
//!
//! Nothing here writes or runs the validator. Walks over the parent chain
//! carry a visited set so a corrupt table cannot loop them.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use serde::Serialize;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::domain::{Category, CategoryNode, ItemStatistics, ItemType, LibraryItem};
use crate::error::{CatalogError, CatalogResult};
use crate::store::{CategoryFilter, CategoryOrder, ItemFilter, ItemOrder, Record};

use super::engine::CatalogEngine;

/// Aggregate counts over the category table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategoryStatistics {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
    pub top_level: usize,
    pub subcategories: usize,

    /// Direct item count per category name
    pub items_per_category: BTreeMap<String, usize>,

    /// Active category with the most direct items
    pub most_popular: Option<String>,
}

fn sorted_categories(mut categories: Vec<Category>) -> Vec<Category> {
    categories.sort_by(|a, b| Category::compare(a, b, CategoryOrder::DisplayOrder));
    categories
}

fn sorted_items(mut items: Vec<LibraryItem>, order: ItemOrder, limit: usize) -> Vec<LibraryItem> {
    items.sort_by(|a, b| LibraryItem::compare(a, b, order));
    items.truncate(limit);
    items
}

impl CatalogEngine {
    // ========== Category listings ==========

    pub async fn get_category(&self, id: Uuid) -> CatalogResult<Option<Category>> {
        self.categories.get(id).await
    }

    /// Every category, ordered by `(display_order, name)`
    pub async fn list_categories(&self) -> CatalogResult<Vec<Category>> {
        self.categories.scan_all(CategoryOrder::DisplayOrder).await
    }

    pub async fn active_categories(&self) -> CatalogResult<Vec<Category>> {
        let active = self.categories.scan(&CategoryFilter::Active(true)).await?;
        Ok(sorted_categories(active))
    }

    pub async fn top_level_categories(&self) -> CatalogResult<Vec<Category>> {
        let roots = self.categories.scan(&CategoryFilter::TopLevel).await?;
        Ok(sorted_categories(roots))
    }

    /// Direct children of a category
    pub async fn subcategories(&self, parent_id: Uuid) -> CatalogResult<Vec<Category>> {
        let children = self.categories.scan(&CategoryFilter::Parent(parent_id)).await?;
        Ok(sorted_categories(children))
    }

    /// Exact name lookup, case-insensitive
    pub async fn find_category_by_name(&self, name: &str) -> CatalogResult<Option<Category>> {
        let mut found = self
            .categories
            .scan(&CategoryFilter::NameEquals(name.to_string()))
            .await?;
        Ok(if found.is_empty() { None } else { Some(found.swap_remove(0)) })
    }

    pub async fn search_categories_by_name(&self, fragment: &str) -> CatalogResult<Vec<Category>> {
        let found = self
            .categories
            .scan(&CategoryFilter::NameContains(fragment.to_string()))
            .await?;
        Ok(sorted_categories(found))
    }

    pub async fn categories_with_tag(&self, tag: &str) -> CatalogResult<Vec<Category>> {
        let found = self.categories.scan(&CategoryFilter::Tag(tag.to_string())).await?;
        Ok(sorted_categories(found))
    }

    // ========== Hierarchy ==========

    /// Ancestors from the root down to `id`. Empty for an unknown id.
    #[instrument(skip(self))]
    pub async fn hierarchy_path(&self, id: Uuid) -> CatalogResult<Vec<Category>> {
        let mut path = Vec::new();
        let mut visited = HashSet::new();
        let mut current = self.categories.get(id).await?;

        while let Some(category) = current {
            if !visited.insert(category.id) {
                break;
            }
            current = match category.parent_id {
                Some(parent_id) => self.categories.get(parent_id).await?,
                None => None,
            };
            path.push(category);
        }

        path.reverse();
        Ok(path)
    }

    /// Transitive children of `id`, breadth first
    #[instrument(skip(self))]
    pub async fn descendants(&self, id: Uuid) -> CatalogResult<Vec<Category>> {
        let mut found = Vec::new();
        let mut visited = HashSet::from([id]);
        let mut queue = VecDeque::from([id]);

        while let Some(parent_id) = queue.pop_front() {
            for child in self.subcategories(parent_id).await? {
                if visited.insert(child.id) {
                    queue.push_back(child.id);
                    found.push(child);
                }
            }
        }

        debug!(count = found.len(), "Collected descendants");
        Ok(found)
    }

    /// Items assigned to `id` or to any of its descendants
    pub async fn total_items_in_subtree(&self, id: Uuid) -> CatalogResult<usize> {
        let mut total = self.items.count(&ItemFilter::Category(id)).await?;
        for descendant in self.descendants(id).await? {
            total += self.items.count(&ItemFilter::Category(descendant.id)).await?;
        }
        Ok(total)
    }

    /// Nested view of the hierarchy.
    ///
    /// Starts from the top-level categories, or from `root` alone when
    /// given. Each node carries its direct item count; siblings are ordered
    /// by `(display_order, name)`.
    #[instrument(skip(self))]
    pub async fn category_tree(&self, root: Option<Uuid>) -> CatalogResult<Vec<CategoryNode>> {
        let categories = self.list_categories().await?;
        let counts = self.direct_item_counts().await?;

        let mut children: HashMap<Uuid, Vec<Category>> = HashMap::new();
        let mut roots = Vec::new();
        for category in &categories {
            match category.parent_id {
                Some(parent_id) => children.entry(parent_id).or_default().push(category.clone()),
                None => roots.push(category.clone()),
            }
        }

        let starts = match root {
            Some(id) => {
                let start = categories
                    .iter()
                    .find(|c| c.id == id)
                    .cloned()
                    .ok_or_else(|| CatalogError::category_not_found(id))?;
                vec![start]
            }
            None => roots,
        };

        let mut visited = HashSet::new();
        Ok(starts
            .into_iter()
            .map(|category| build_node(category, &children, &counts, &mut visited))
            .collect())
    }

    // ========== Category statistics ==========

    #[instrument(skip(self))]
    pub async fn category_statistics(&self) -> CatalogResult<CategoryStatistics> {
        let categories = self.category_snapshot().await?;
        let counts = self.direct_item_counts().await?;

        let mut stats = CategoryStatistics {
            total: categories.len(),
            ..Default::default()
        };
        let mut best: Option<(usize, &Category)> = None;

        for category in &categories {
            if category.is_active {
                stats.active += 1;
            } else {
                stats.inactive += 1;
            }
            if category.is_top_level() {
                stats.top_level += 1;
            } else {
                stats.subcategories += 1;
            }

            let count = counts.get(&category.id).copied().unwrap_or(0);
            stats.items_per_category.insert(category.name.clone(), count);

            // Strictly greater: the first category in store order keeps a tie
            if category.is_active && best.map_or(true, |(top, _)| count > top) {
                best = Some((count, category));
            }
        }

        stats.most_popular = best.map(|(_, c)| c.name.clone());
        Ok(stats)
    }

    /// Active categories by direct item count, highest first
    pub async fn popular_categories(&self, limit: usize) -> CatalogResult<Vec<(Category, usize)>> {
        let counts = self.direct_item_counts().await?;
        let mut ranked: Vec<_> = self
            .active_categories()
            .await?
            .into_iter()
            .map(|c| {
                let count = counts.get(&c.id).copied().unwrap_or(0);
                (c, count)
            })
            .collect();

        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(limit);
        Ok(ranked)
    }

    async fn direct_item_counts(&self) -> CatalogResult<HashMap<Uuid, usize>> {
        let mut counts = HashMap::new();
        for item in self.items.scan_all(ItemOrder::Insertion).await? {
            if let Some(category_id) = item.category_id {
                *counts.entry(category_id).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    // ========== Item reads ==========

    /// Plain read; does not count as a view
    pub async fn get_item(&self, id: Uuid) -> CatalogResult<Option<LibraryItem>> {
        self.items.get(id).await
    }

    /// Keyword search through the search primitive; order is unspecified
    #[instrument(skip(self))]
    pub async fn search(&self, keyword: &str) -> CatalogResult<Vec<LibraryItem>> {
        let ids = self.search.search_by_keyword(keyword).await?;
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(item) = self.items.get(id).await? {
                found.push(item);
            }
        }
        debug!(count = found.len(), "Keyword search finished");
        Ok(found)
    }

    pub async fn filter_by_category(&self, category_id: Uuid) -> CatalogResult<Vec<LibraryItem>> {
        self.items.scan(&ItemFilter::Category(category_id)).await
    }

    pub async fn filter_by_type(&self, item_type: ItemType) -> CatalogResult<Vec<LibraryItem>> {
        self.items.scan(&ItemFilter::Type(item_type)).await
    }

    /// One tag is a membership test; several tags must all be present
    pub async fn filter_by_tags(&self, tags: &[String]) -> CatalogResult<Vec<LibraryItem>> {
        match tags {
            [] => Ok(Vec::new()),
            [tag] => self.items.scan(&ItemFilter::Tag(tag.clone())).await,
            _ => self.items.scan(&ItemFilter::AllTags(tags.to_vec())).await,
        }
    }

    pub async fn filter_by_difficulty(&self, difficulty: u8) -> CatalogResult<Vec<LibraryItem>> {
        self.items.scan(&ItemFilter::Difficulty(difficulty)).await
    }

    pub async fn filter_by_language(&self, language: &str) -> CatalogResult<Vec<LibraryItem>> {
        self.items.scan(&ItemFilter::Language(language.to_string())).await
    }

    /// Published items, most viewed first
    pub async fn popular_items(&self, limit: usize) -> CatalogResult<Vec<LibraryItem>> {
        let published = self.published_items().await?;
        Ok(sorted_items(published, ItemOrder::ViewsDesc, limit))
    }

    /// Published items, newest first
    pub async fn recent_items(&self, limit: usize) -> CatalogResult<Vec<LibraryItem>> {
        let published = self.published_items().await?;
        Ok(sorted_items(published, ItemOrder::CreatedDesc, limit))
    }

    /// Published items in the same category or sharing a tag.
    ///
    /// Empty for an unknown id.
    pub async fn related_items(&self, id: Uuid, limit: usize) -> CatalogResult<Vec<LibraryItem>> {
        let Some(anchor) = self.items.get(id).await? else {
            return Ok(Vec::new());
        };

        let related = self
            .published_items()
            .await?
            .into_iter()
            .filter(|other| other.id != anchor.id)
            .filter(|other| {
                let same_category = anchor.category_id.is_some() && other.category_id == anchor.category_id;
                same_category || other.tags.iter().any(|t| anchor.tags.contains(t))
            })
            .take(limit)
            .collect();
        Ok(related)
    }

    pub async fn published_items(&self) -> CatalogResult<Vec<LibraryItem>> {
        self.items.scan(&ItemFilter::Published(true)).await
    }

    /// Published and featured
    pub async fn featured_items(&self) -> CatalogResult<Vec<LibraryItem>> {
        self.items.scan(&ItemFilter::Featured).await
    }

    /// Every item, newest first
    pub async fn all_items(&self) -> CatalogResult<Vec<LibraryItem>> {
        self.items.scan_all(ItemOrder::CreatedDesc).await
    }

    pub async fn items_by_author(&self, author: &str) -> CatalogResult<Vec<LibraryItem>> {
        self.items.scan(&ItemFilter::Author(author.to_string())).await
    }

    pub async fn item_statistics(&self, id: Uuid) -> CatalogResult<ItemStatistics> {
        Ok(self.require_item(id).await?.statistics())
    }
}

fn build_node(
    category: Category,
    children: &HashMap<Uuid, Vec<Category>>,
    counts: &HashMap<Uuid, usize>,
    visited: &mut HashSet<Uuid>,
) -> CategoryNode {
    visited.insert(category.id);
    let item_count = counts.get(&category.id).copied().unwrap_or(0);

    let mut nodes = Vec::new();
    if let Some(kids) = children.get(&category.id) {
        for child in kids {
            if !visited.contains(&child.id) {
                nodes.push(build_node(child.clone(), children, counts, visited));
            }
        }
    }

    CategoryNode {
        category,
        item_count,
        children: nodes,
    }
}
