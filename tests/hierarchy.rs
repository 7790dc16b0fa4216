//! Hierarchy Integration Tests
//!
//! Tests for name uniqueness, parent validation, cycle rejection, the
//! delete guard and the derived tree.

use marinelib::domain::{CategoryDraft, ItemDraft, ItemType};
use marinelib::{CatalogEngine, CatalogError};
use uuid::Uuid;

#[tokio::test]
async fn test_duplicate_name_any_case() {
    let engine = CatalogEngine::in_memory();
    engine
        .create_category(CategoryDraft::new("Reef"), "ana")
        .await
        .unwrap();

    for name in ["reef", "REEF", "  Reef  "] {
        let err = engine
            .create_category(CategoryDraft::new(name), "ana")
            .await
            .unwrap_err();
        assert!(
            matches!(err, CatalogError::DuplicateName(_)),
            "{} should collide, got {:?}",
            name,
            err
        );
    }
}

#[tokio::test]
async fn test_renaming_onto_existing_name_fails() {
    let engine = CatalogEngine::in_memory();
    engine.create_category(CategoryDraft::new("Reef"), "ana").await.unwrap();
    let kelp = engine.create_category(CategoryDraft::new("Kelp"), "ana").await.unwrap();

    let err = engine
        .update_category(kelp.id, CategoryDraft::new("reef"), "ana")
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::DuplicateName(_)));
}

#[tokio::test]
async fn test_invalid_parents() {
    let engine = CatalogEngine::in_memory();

    let err = engine
        .create_category(CategoryDraft::new("Orphan").with_parent(Uuid::new_v4()), "ana")
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::InvalidParent { .. }));

    let reef = engine.create_category(CategoryDraft::new("Reef"), "ana").await.unwrap();
    let err = engine
        .update_category(reef.id, CategoryDraft::new("Reef").with_parent(reef.id), "ana")
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::InvalidParent { .. }));
}

#[tokio::test]
async fn test_cycle_rejected_and_store_unchanged() {
    let engine = CatalogEngine::in_memory();
    let a = engine.create_category(CategoryDraft::new("A"), "ana").await.unwrap();
    let b = engine
        .create_category(CategoryDraft::new("B").with_parent(a.id), "ana")
        .await
        .unwrap();
    let c = engine
        .create_category(CategoryDraft::new("C").with_parent(b.id), "ana")
        .await
        .unwrap();

    // Parent change smuggled in alongside an unrelated edit
    let draft = CategoryDraft::new("A")
        .with_description("renamed description")
        .with_parent(c.id);
    let err = engine.update_category(a.id, draft, "ben").await.unwrap_err();
    assert!(matches!(err, CatalogError::CircularReference { .. }));

    let stored = engine.get_category(a.id).await.unwrap().unwrap();
    assert_eq!(stored.parent_id, None);
    assert_eq!(stored.description, None);
    assert_eq!(stored.updated_by, "ana");
}

#[tokio::test]
async fn test_every_chain_terminates() {
    let engine = CatalogEngine::in_memory();
    let mut parent = None;
    for name in ["L0", "L1", "L2", "L3", "L4"] {
        let mut draft = CategoryDraft::new(name);
        draft.parent_id = parent;
        parent = Some(engine.create_category(draft, "ana").await.unwrap().id);
    }

    let all = engine.list_categories().await.unwrap();
    for category in &all {
        let mut steps = 0;
        let mut current = category.parent_id;
        while let Some(id) = current {
            steps += 1;
            assert!(steps <= all.len(), "chain from {} does not terminate", category.name);
            current = engine.get_category(id).await.unwrap().unwrap().parent_id;
        }
    }
}

#[tokio::test]
async fn test_delete_guard_subcategories_then_success() {
    let engine = CatalogEngine::in_memory();
    let parent = engine.create_category(CategoryDraft::new("Ocean"), "ana").await.unwrap();
    let child = engine
        .create_category(CategoryDraft::new("Reef").with_parent(parent.id), "ana")
        .await
        .unwrap();

    let err = engine.delete_category(parent.id, "ana").await.unwrap_err();
    assert!(matches!(err, CatalogError::HasSubcategories { count: 1, .. }));

    engine.delete_category(child.id, "ana").await.unwrap();
    engine.delete_category(parent.id, "ana").await.unwrap();
    assert!(engine.list_categories().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_guard_items() {
    let engine = CatalogEngine::in_memory();
    let reef = engine.create_category(CategoryDraft::new("Reef"), "ana").await.unwrap();
    engine
        .create_item_from_text(ItemDraft::new("Reef survey", ItemType::Pdf).in_category(reef.id), "ana")
        .await
        .unwrap();

    let err = engine.delete_category(reef.id, "ana").await.unwrap_err();
    assert!(matches!(err, CatalogError::HasItems { .. }));
    assert!(engine.get_category(reef.id).await.unwrap().is_some());

    let err = engine.delete_category(Uuid::new_v4(), "ana").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_bulk_delete_reports_per_id() {
    let engine = CatalogEngine::in_memory();
    let parent = engine.create_category(CategoryDraft::new("Ocean"), "ana").await.unwrap();
    engine
        .create_category(CategoryDraft::new("Reef").with_parent(parent.id), "ana")
        .await
        .unwrap();
    let lone = engine.create_category(CategoryDraft::new("Kelp"), "ana").await.unwrap();

    let outcome = engine
        .bulk_delete_categories(&[parent.id, lone.id], "ana")
        .await;
    assert_eq!(outcome.len(), 2);
    assert_eq!(outcome.success_count(), 1);
    assert_eq!(outcome.succeeded().next().map(|(id, _)| *id), Some(lone.id));

    let (failed_id, err) = outcome.failed().next().unwrap();
    assert_eq!(*failed_id, parent.id);
    assert!(matches!(err, CatalogError::HasSubcategories { .. }));
}

#[tokio::test]
async fn test_next_display_order() {
    let engine = CatalogEngine::in_memory();
    assert_eq!(engine.next_display_order().await.unwrap(), 1);

    for (name, order) in [("One", 1), ("Three", 3), ("Seven", 7)] {
        engine
            .create_category(CategoryDraft::new(name).with_display_order(order), "ana")
            .await
            .unwrap();
    }
    assert_eq!(engine.next_display_order().await.unwrap(), 8);
}

#[tokio::test]
async fn test_category_tree_nesting_and_order() {
    let engine = CatalogEngine::in_memory();
    let a = engine.create_category(CategoryDraft::new("A"), "ana").await.unwrap();
    let b = engine
        .create_category(CategoryDraft::new("B").with_parent(a.id), "ana")
        .await
        .unwrap();
    let c = engine
        .create_category(CategoryDraft::new("C").with_parent(b.id), "ana")
        .await
        .unwrap();

    // Same display order as B: name breaks the tie
    engine
        .create_category(
            CategoryDraft::new("Aa").with_parent(a.id).with_display_order(b.display_order),
            "ana",
        )
        .await
        .unwrap();
    engine
        .create_item_from_text(ItemDraft::new("In C", ItemType::Faq).in_category(c.id), "ana")
        .await
        .unwrap();

    let tree = engine.category_tree(None).await.unwrap();
    assert_eq!(tree.len(), 1);
    let root = &tree[0];
    assert_eq!(root.category.id, a.id);
    assert_eq!(root.item_count, 0);

    let child_names: Vec<_> = root.children.iter().map(|n| n.category.name.as_str()).collect();
    assert_eq!(child_names, ["Aa", "B"]);

    let b_node = &root.children[1];
    assert_eq!(b_node.children.len(), 1);
    assert_eq!(b_node.children[0].category.id, c.id);
    assert_eq!(b_node.children[0].item_count, 1);
    assert_eq!(root.size(), 4);

    let subtree = engine.category_tree(Some(b.id)).await.unwrap();
    assert_eq!(subtree.len(), 1);
    assert_eq!(subtree[0].children[0].category.name, "C");

    let err = engine.category_tree(Some(Uuid::new_v4())).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_category_listings() {
    let engine = CatalogEngine::in_memory();
    let ocean = engine
        .create_category(CategoryDraft::new("Ocean").with_tag("water"), "ana")
        .await
        .unwrap();
    engine
        .create_category(CategoryDraft::new("Coral Reef").with_parent(ocean.id), "ana")
        .await
        .unwrap();
    let archive = engine.create_category(CategoryDraft::new("Archive"), "ana").await.unwrap();
    engine.toggle_active(archive.id, false, "ana").await.unwrap();

    assert_eq!(engine.active_categories().await.unwrap().len(), 2);
    assert_eq!(engine.top_level_categories().await.unwrap().len(), 2);
    assert_eq!(engine.subcategories(ocean.id).await.unwrap().len(), 1);
    assert_eq!(engine.categories_with_tag("water").await.unwrap().len(), 1);
    assert_eq!(engine.search_categories_by_name("reef").await.unwrap().len(), 1);

    let found = engine.find_category_by_name("OCEAN").await.unwrap().unwrap();
    assert_eq!(found.id, ocean.id);
    assert!(engine.find_category_by_name("Kelp").await.unwrap().is_none());
}

#[tokio::test]
async fn test_bulk_update_reports_per_record() {
    let engine = CatalogEngine::in_memory();
    let ocean = engine.create_category(CategoryDraft::new("Ocean"), "ana").await.unwrap();
    let reef = engine
        .create_category(CategoryDraft::new("Reef").with_parent(ocean.id), "ana")
        .await
        .unwrap();
    let kelp = engine.create_category(CategoryDraft::new("Kelp"), "ana").await.unwrap();
    let ghost = Uuid::new_v4();

    let outcome = engine
        .bulk_update_categories(
            vec![
                (kelp.id, CategoryDraft::new("Kelp Forest")),
                (ghost, CategoryDraft::new("Ghost")),
                (ocean.id, CategoryDraft::new("Ocean").with_parent(reef.id)),
            ],
            "ben",
        )
        .await;

    assert_eq!(outcome.len(), 3);
    assert_eq!(outcome.success_count(), 1);
    let (renamed_id, renamed) = outcome.succeeded().next().unwrap();
    assert_eq!(*renamed_id, kelp.id);
    assert_eq!(renamed.name, "Kelp Forest");

    let failures: Vec<_> = outcome.failed().collect();
    assert_eq!(failures.len(), 2);
    assert_eq!(*failures[0].0, ghost);
    assert!(failures[0].1.is_not_found());
    assert_eq!(*failures[1].0, ocean.id);
    assert!(matches!(failures[1].1, CatalogError::CircularReference { .. }));

    let stored_ocean = engine.get_category(ocean.id).await.unwrap().unwrap();
    assert_eq!(stored_ocean.parent_id, None);
    assert_eq!(stored_ocean.updated_by, "ana");
    assert!(engine.get_category(ghost).await.unwrap().is_none());
    assert_eq!(engine.get_category(kelp.id).await.unwrap().unwrap().updated_by, "ben");
}
