use std::time::Instant;

use quotedraft_core::{change::StagedChange, ids::*};
use quotedraft_engine::{EngineConfig, EngineError};
use quotedraft_harness::{
    TestProject,
    fixtures::{bulk_changes, full_change, quantity, tile},
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn project_with_chunk_size(chunk_size: usize) -> Result<TestProject, EngineError> {
    TestProject::with_config(EngineConfig {
        chunk_size,
        ..Default::default()
    })
}

/// Each test database holds a single project, so ids line up across runs.
fn staged_snapshot(t: &TestProject) -> Result<Vec<StagedChange>, EngineError> {
    t.engine.staged_changes(t.project_id, None)
}

// ============================================================================
// Chunking transparency
// ============================================================================

#[test]
fn chunk_size_does_not_change_results() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    for count in [50, 2_500, 8_685] {
        let mut reference = project_with_chunk_size(quotedraft_engine::config::MAX_CHUNK_SIZE)?;
        let mut chunked = project_with_chunk_size(1_000)?;
        let mut tiny = project_with_chunk_size(7)?;

        let mut committed = Vec::new();
        for t in [&mut reference, &mut chunked, &mut tiny] {
            t.stage(&tile(), bulk_changes(1, count))?;
            // Overlay a quantity edit on every third product.
            let edits = (1..=count as i64)
                .step_by(3)
                .map(|p| quotedraft_engine::DraftChange::new(p, quantity(1_000.0)))
                .collect();
            t.stage(&tile(), edits)?;
            assert_eq!(t.engine.pending_count(t.project_id)?, count as u64);

            let staged = staged_snapshot(t)?;
            t.engine.promote(t.project_id, None)?;
            committed.push((staged, t.engine.committed_items(t.project_id)?));
        }

        let (ref_staged, ref_committed) = &committed[0];
        for (staged, items) in &committed[1..] {
            assert_eq!(staged, ref_staged, "staged rows differ for n={count}");
            assert_eq!(items, ref_committed, "committed rows differ for n={count}");
        }
        assert_eq!(ref_committed.len(), count);
        assert_eq!(ref_committed[0].quantity, 1_000.0);
        assert_eq!(Some(ref_committed[1].quantity), full_change(2).quantity);
    }
    Ok(())
}

#[test]
fn chunk_count_follows_chunk_size() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = TestProject::new()?;
    let report = t.stage(&tile(), bulk_changes(1, 8_685))?;
    assert_eq!(report.rows, 8_685);
    assert_eq!(report.chunks, 9);

    let report = t.stage(&tile(), bulk_changes(1, 1_000))?;
    assert_eq!(report.chunks, 1);
    Ok(())
}

#[test]
fn production_sized_save_and_promote() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let mut t = TestProject::new()?;

    let started = Instant::now();
    t.stage(&tile(), bulk_changes(1, 8_685))?;
    let receipt = t.engine.promote(t.project_id, None)?;
    let elapsed = started.elapsed();

    assert_eq!(receipt.committed_rows, 8_685);
    assert_eq!(t.engine.pending_count(t.project_id)?, 0);
    // Generous bound so unoptimised builds pass; release builds finish well
    // under a second.
    assert!(elapsed.as_secs() < 30, "save + promote took {elapsed:?}");
    Ok(())
}

// ============================================================================
// All-or-nothing batches
// ============================================================================

#[test]
fn failing_chunk_rolls_back_whole_call() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = project_with_chunk_size(100)?;
    t.stage(&tile(), vec![quotedraft_engine::DraftChange::new(1, full_change(1))])?;
    let before = staged_snapshot(&t)?;

    // Product 950 lives in the tenth chunk; nine chunks apply before it fails.
    t.fail_inserts_of("staged_changes", ProductId::new(950))?;
    let result = t.stage(&tile(), bulk_changes(1, 1_200));
    assert!(matches!(result, Err(EngineError::Storage(_))));

    assert_eq!(staged_snapshot(&t)?, before);
    assert_eq!(t.engine.pending_count(t.project_id)?, 1);

    t.clear_failures("staged_changes", ProductId::new(950))?;
    t.stage(&tile(), bulk_changes(1, 1_200))?;
    assert_eq!(t.engine.pending_count(t.project_id)?, 1_200);
    Ok(())
}

#[test]
fn failing_single_field_batch_rolls_back() -> Result<(), Box<dyn std::error::Error>> {
    let mut t = project_with_chunk_size(50)?;
    t.fail_inserts_of("staged_changes", ProductId::new(180))?;

    let products: Vec<ProductId> = (1..=200).map(ProductId::new).collect();
    let result = t.engine.update_group_option_batch(
        t.project_id,
        &tile(),
        &products,
        quotedraft_core::fields::MainOptionFlag::Optional,
    );
    assert!(matches!(result, Err(EngineError::Storage(_))));
    assert_eq!(t.engine.pending_count(t.project_id)?, 0);
    Ok(())
}

#[test]
fn oversized_chunk_config_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let accepted = project_with_chunk_size(7)?;
    assert_eq!(accepted.engine.config().chunk_size, 7);

    assert!(matches!(project_with_chunk_size(0), Err(EngineError::Config(_))));
    assert!(matches!(
        project_with_chunk_size(quotedraft_engine::config::MAX_CHUNK_SIZE + 1),
        Err(EngineError::Config(_))
    ));
    Ok(())
}
