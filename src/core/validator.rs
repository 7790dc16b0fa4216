//! Hierarchy integrity checks.
//!
//! Pure logic over a snapshot of the category table. Every create and update
//! runs the full check set against the complete candidate record:
//! 1. name is unique (case-insensitive) among other ids
//! 2. declared parent exists
//! 3. declared parent is not the category itself
//! 4. following the parent chain never revisits an id

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::domain::Category;
use crate::error::{CatalogError, CatalogResult};

/// Snapshot view used to validate one candidate
pub struct HierarchyValidator<'a> {
    by_id: HashMap<Uuid, &'a Category>,
}

impl<'a> HierarchyValidator<'a> {
    pub fn new(snapshot: &'a [Category]) -> Self {
        Self {
            by_id: snapshot.iter().map(|c| (c.id, c)).collect(),
        }
    }

    /// Run every check against a candidate that is about to be persisted
    pub fn validate(&self, candidate: &Category) -> CatalogResult<()> {
        Self::validate_fields(candidate)?;
        self.check_unique_name(candidate)?;

        if let Some(parent_id) = candidate.parent_id {
            if !self.by_id.contains_key(&parent_id) {
                return Err(CatalogError::InvalidParent {
                    id: candidate.id,
                    parent_id,
                    reason: "parent category does not exist",
                });
            }
            if parent_id == candidate.id {
                return Err(CatalogError::InvalidParent {
                    id: candidate.id,
                    parent_id,
                    reason: "category cannot be its own parent",
                });
            }
            self.check_acyclic(candidate.id, parent_id)?;
        }

        Ok(())
    }

    fn validate_fields(candidate: &Category) -> CatalogResult<()> {
        if candidate.name.trim().is_empty() {
            return Err(CatalogError::Validation(
                "category name must not be blank".to_string(),
            ));
        }
        Ok(())
    }

    fn check_unique_name(&self, candidate: &Category) -> CatalogResult<()> {
        let key = candidate.name_key();
        let taken = self
            .by_id
            .values()
            .any(|other| other.id != candidate.id && other.name_key() == key);

        if taken {
            return Err(CatalogError::DuplicateName(candidate.name.clone()));
        }
        Ok(())
    }

    /// Walk upward from `parent_id`. The candidate's stored parent is never
    /// followed: reaching the candidate id is itself the cycle.
    fn check_acyclic(&self, id: Uuid, parent_id: Uuid) -> CatalogResult<()> {
        let mut visited = HashSet::new();
        let mut current = Some(parent_id);

        while let Some(step) = current {
            if step == id || !visited.insert(step) {
                return Err(CatalogError::CircularReference { id, parent_id });
            }
            current = self.by_id.get(&step).and_then(|c| c.parent_id);
        }

        Ok(())
    }

    /// Ancestors of `id` from the root down to `id` itself.
    ///
    /// Empty for an unknown id. Stops early if the stored chain is corrupt.
    pub fn path_to(&self, id: Uuid) -> Vec<Category> {
        let mut path = Vec::new();
        let mut visited = HashSet::new();
        let mut current = self.by_id.get(&id).copied();

        while let Some(category) = current {
            if !visited.insert(category.id) {
                break;
            }
            path.push(category.clone());
            current = category.parent_id.and_then(|p| self.by_id.get(&p).copied());
        }

        path.reverse();
        path
    }

    /// Whether the parent chain of `id` reaches a root within
    /// `snapshot.len()` steps
    pub fn terminates(&self, id: Uuid) -> bool {
        let mut current = self.by_id.get(&id).and_then(|c| c.parent_id);
        for _ in 0..self.by_id.len() {
            match current {
                None => return true,
                Some(step) => current = self.by_id.get(&step).and_then(|c| c.parent_id),
            }
        }
        current.is_none()
    }
}

/// Next automatic display order: 1 when empty, otherwise max + 1
pub fn next_display_order(snapshot: &[Category]) -> i64 {
    snapshot
        .iter()
        .map(|c| c.display_order)
        .max()
        .map(|max| max + 1)
        .unwrap_or(1)
}
