use quotedraft_core::{
    change::PartialChange,
    checksum::committed_checksum,
    fields::{MainOptionFlag, PriceChangeSource},
    ids::*,
    resolve::{NumericResolution, ResolutionPolicy},
};
use quotedraft_engine::{DraftChange, EngineConfig, EngineError, ProjectSettings};
use quotedraft_harness::{
    TestProject,
    fixtures::{bulk_changes, full_change, gutter, quantity, temp_db, tile},
};

// ============================================================================
// Promotion basics
// ============================================================================

#[test]
fn promote_discounted_tile() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestProject::new()?;
    assert_eq!(t.project_id, ProjectId::new(1));
    t.stage(
        &tile(),
        vec![DraftChange::new(
            10,
            PartialChange {
                retail_price: Some(100.0),
                discount_percent: Some(10.0),
                selling_price: Some(90.0),
                ..Default::default()
            },
        )],
    )?;

    let receipt = t.engine.promote(t.project_id, None)?;
    assert_eq!(receipt.staged_rows, 1);
    assert_eq!(receipt.committed_rows, 1);
    assert_eq!(receipt.cleared_rows, 0);

    let committed = t.engine.committed_items(t.project_id)?;
    assert_eq!(committed.len(), 1);
    assert_eq!(committed[0].product_id, ProductId::new(10));
    assert_eq!(committed[0].selling_price, 90.0);
    assert_eq!(committed[0].retail_price, 100.0);
    assert_eq!(committed[0].discount_percent, 10.0);
    // Never staged: resolved by the default policy.
    assert_eq!(committed[0].quantity, 0.0);
    assert_eq!(committed[0].purchase_price, 0.0);
    assert_eq!(committed[0].main_option_flag, MainOptionFlag::None);
    assert_eq!(committed[0].price_change_source, PriceChangeSource::Manual);

    assert!(t.engine.staged_changes(t.project_id, None)?.is_empty());
    Ok(())
}

#[test]
fn promotion_is_complete() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestProject::new()?;
    t.stage(&tile(), bulk_changes(100, 40))?;
    t.stage(&gutter(), bulk_changes(500, 10))?;

    let receipt = t.engine.promote(t.project_id, None)?;
    assert_eq!(receipt.staged_rows, 50);
    assert_eq!(receipt.committed_rows, 50);

    let committed = t.engine.committed_items(t.project_id)?;
    assert_eq!(committed.len(), 50);
    for item in &committed {
        let expected = full_change(item.product_id.get());
        assert_eq!(Some(item.retail_price), expected.retail_price);
        assert_eq!(Some(item.quantity), expected.quantity);
        assert_eq!(Some(item.main_option_flag), expected.main_option_flag);
    }
    assert_eq!(t.engine.pending_count(t.project_id)?, 0);
    Ok(())
}

#[test]
fn promotion_replaces_prior_committed_row() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestProject::new()?;
    t.stage(&tile(), vec![DraftChange::new(10, full_change(10)), DraftChange::new(11, full_change(11))])?;
    t.engine.promote(t.project_id, None)?;

    t.stage(&tile(), vec![DraftChange::new(10, quantity(25.0))])?;
    t.engine.promote(t.project_id, None)?;

    let committed = t.engine.committed_items(t.project_id)?;
    assert_eq!(committed.len(), 2);
    assert_eq!(committed[0].quantity, 25.0);
    // Zero policy: fields not staged in the second round resolve to zero.
    assert_eq!(committed[0].retail_price, 0.0);
    // Product 11 was not staged again and keeps its committed row.
    assert_eq!(Some(committed[1].retail_price), full_change(11).retail_price);
    Ok(())
}

#[test]
fn keep_committed_policy_carries_values_forward() -> Result<(), Box<dyn std::error::Error>> {
    let config = EngineConfig {
        resolution: ResolutionPolicy {
            numeric: NumericResolution::KeepCommitted,
            ..Default::default()
        },
        ..Default::default()
    };
    let mut t = TestProject::with_config(config)?;
    t.stage(&tile(), vec![DraftChange::new(10, full_change(10))])?;
    t.engine.promote(t.project_id, None)?;

    t.stage(&tile(), vec![DraftChange::new(10, quantity(25.0))])?;
    t.engine.promote(t.project_id, None)?;

    let committed = t.engine.committed_items(t.project_id)?;
    assert_eq!(committed[0].quantity, 25.0);
    assert_eq!(Some(committed[0].retail_price), full_change(10).retail_price);
    assert_eq!(Some(committed[0].selling_price), full_change(10).selling_price);
    Ok(())
}

// ============================================================================
// Empty staging
// ============================================================================

#[test]
fn empty_staging_clears_committed() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestProject::new()?;
    t.stage(&tile(), bulk_changes(1, 5))?;
    t.engine.promote(t.project_id, None)?;
    assert_eq!(t.engine.committed_items(t.project_id)?.len(), 5);

    let receipt = t.engine.promote(t.project_id, None)?;
    assert_eq!(receipt.staged_rows, 0);
    assert_eq!(receipt.cleared_rows, 5);
    assert!(t.engine.committed_items(t.project_id)?.is_empty());
    Ok(())
}

#[test]
fn empty_category_scope_keeps_committed() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestProject::new()?;
    t.stage(&tile(), bulk_changes(1, 5))?;
    t.engine.promote(t.project_id, None)?;
    let logged = t.engine.promotions(t.project_id)?.len();

    let receipt = t.engine.promote(t.project_id, Some(&gutter()))?;
    assert_eq!(receipt.cleared_rows, 0);
    assert_eq!(receipt.staged_rows, 0);
    assert_eq!(t.engine.committed_items(t.project_id)?.len(), 5);

    let promotions = t.engine.promotions(t.project_id)?;
    assert_eq!(promotions.len(), logged + 1);
    assert!(promotions.iter().any(|p| p.promotion_id == receipt.promotion_id
        && p.category.as_ref() == Some(&gutter())));
    Ok(())
}

#[test]
fn empty_project_clear_does_not_touch_other_projects() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestProject::new()?;
    let other = t.engine.create_project("Other")?;
    t.engine
        .save_draft_changes(other, &tile(), bulk_changes(1, 3), None, None)?;
    t.engine.promote(other, None)?;

    t.engine.promote(t.project_id, None)?;
    assert_eq!(t.engine.committed_items(other)?.len(), 3);
    Ok(())
}

// ============================================================================
// Category scope
// ============================================================================

#[test]
fn category_scoped_promotion_leaves_other_categories_staged() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestProject::new()?;
    t.stage(&tile(), bulk_changes(1, 3))?;
    t.stage(&gutter(), bulk_changes(100, 2))?;

    let receipt = t.engine.promote(t.project_id, Some(&tile()))?;
    assert_eq!(receipt.category, Some(tile()));
    assert_eq!(receipt.committed_rows, 3);

    let committed = t.engine.committed_items(t.project_id)?;
    assert_eq!(committed.len(), 3);
    assert!(committed.iter().all(|item| item.category == tile()));

    let remaining = t.engine.staged_changes(t.project_id, None)?;
    assert_eq!(remaining.len(), 2);
    assert!(remaining.iter().all(|row| row.key.category == gutter()));
    Ok(())
}

#[test]
fn product_in_two_categories_commits_once() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestProject::new()?;
    t.stage(&tile(), vec![DraftChange::new(10, quantity(1.0))])?;
    t.stage(&gutter(), vec![DraftChange::new(10, quantity(2.0))])?;

    let receipt = t.engine.promote(t.project_id, None)?;
    assert_eq!(receipt.staged_rows, 2);
    assert_eq!(receipt.committed_rows, 1);

    // Rows are read in (product, category) order, so TILE is applied last.
    let committed = t.engine.committed_items(t.project_id)?;
    assert_eq!(committed.len(), 1);
    assert_eq!(committed[0].category, tile());
    assert_eq!(committed[0].quantity, 1.0);
    assert_eq!(t.engine.pending_count(t.project_id)?, 0);
    Ok(())
}

// ============================================================================
// Atomicity, receipts, settings
// ============================================================================

#[test]
fn failed_promotion_leaves_both_stores_untouched() -> Result<(), Box<dyn std::error::Error>> {
    let config = EngineConfig {
        chunk_size: 10,
        ..Default::default()
    };
    let mut t = TestProject::with_config(config)?;
    t.stage(&tile(), bulk_changes(1, 5))?;
    t.engine.promote(t.project_id, None)?;
    let before = t.engine.committed_items(t.project_id)?;

    t.stage(&tile(), bulk_changes(1, 60))?;
    // Product 55 sits in the sixth committed chunk.
    t.fail_inserts_of("committed_line_items", ProductId::new(55))?;

    let result = t.engine.promote(t.project_id, None);
    assert!(matches!(result, Err(EngineError::Storage(_))));
    assert_eq!(t.engine.committed_items(t.project_id)?, before);
    assert_eq!(t.engine.pending_count(t.project_id)?, 60);
    assert_eq!(t.engine.promotions(t.project_id)?.len(), 1);

    t.clear_failures("committed_line_items", ProductId::new(55))?;
    t.engine.promote(t.project_id, None)?;
    assert_eq!(t.engine.committed_items(t.project_id)?.len(), 60);
    Ok(())
}

#[test]
fn receipts_are_logged_with_checksum() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestProject::new()?;
    t.stage(&tile(), bulk_changes(1, 4))?;
    let first = t.engine.promote(t.project_id, None)?;
    let committed = t.engine.committed_items(t.project_id)?;
    assert_eq!(first.checksum, committed_checksum(&committed)?);

    let second = t.engine.promote(t.project_id, None)?;
    assert_eq!(second.checksum, committed_checksum(&[])?);

    let log = t.engine.promotions(t.project_id)?;
    assert_eq!(log.len(), 2);
    assert!(log.iter().any(|r| r.promotion_id == first.promotion_id));
    assert!(log.iter().any(|r| r.promotion_id == second.promotion_id && r.cleared_rows == 4));
    Ok(())
}

#[test]
fn save_project_data_promotes() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestProject::new()?;
    t.stage(&tile(), bulk_changes(1, 3))?;
    t.stage(&gutter(), bulk_changes(10, 2))?;

    let settings = ProjectSettings {
        category: Some(gutter()),
        category_margin: Some(15.0),
        ..Default::default()
    };
    let receipt = t.engine.save_project_data(t.project_id, &settings)?;
    assert_eq!(receipt.committed_rows, 2);
    assert_eq!(t.engine.pending_count(t.project_id)?, 3);

    let receipt = t.engine.save_project_data(t.project_id, &ProjectSettings::default())?;
    assert_eq!(receipt.committed_rows, 3);
    assert_eq!(t.engine.committed_items(t.project_id)?.len(), 5);

    let bad = ProjectSettings {
        category_discount: Some(f64::INFINITY),
        ..Default::default()
    };
    assert!(matches!(
        t.engine.save_project_data(t.project_id, &bad),
        Err(EngineError::Validation(_))
    ));
    Ok(())
}

#[test]
fn promote_unknown_project_is_not_found() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestProject::new()?;
    let result = t.engine.promote(ProjectId::new(77), None);
    assert!(matches!(result, Err(EngineError::ProjectNotFound(_))));
    Ok(())
}

#[test]
fn committed_state_survives_reopen() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, path) = temp_db()?;
    let project_id = {
        let mut t = TestProject::on_disk(&path)?;
        t.stage(&tile(), bulk_changes(1, 20))?;
        t.engine.promote(t.project_id, None)?;
        t.stage(&tile(), vec![DraftChange::new(1, quantity(99.0))])?;
        t.project_id
    };

    let storage = quotedraft_storage::SqliteStorage::open(path.to_str().ok_or("non-utf8 path")?)?;
    let engine = quotedraft_engine::Engine::new(storage);
    assert_eq!(engine.committed_items(project_id)?.len(), 20);
    let staged = engine.staged_changes(project_id, None)?;
    assert_eq!(staged.len(), 1);
    assert_eq!(staged[0].change.quantity, Some(99.0));
    Ok(())
}

#[test]
fn delete_project_removes_everything() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestProject::new()?;
    t.stage(&tile(), bulk_changes(1, 3))?;
    t.engine.promote(t.project_id, None)?;
    t.stage(&tile(), bulk_changes(1, 2))?;

    t.engine.delete_project(t.project_id)?;
    assert!(t.engine.committed_items(t.project_id)?.is_empty());
    assert_eq!(t.engine.pending_count(t.project_id)?, 0);
    assert!(t.engine.promotions(t.project_id)?.is_empty());
    assert!(matches!(
        t.engine.delete_project(t.project_id),
        Err(EngineError::ProjectNotFound(_))
    ));
    Ok(())
}
