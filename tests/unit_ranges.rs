use anyhow::Result;
use assert_matches::assert_matches;
use workbook_kit::{CellRange, MergeOutcome, RangeManager, WorkbookError};

fn range(row_start: u32, row_end: u32, col_start: u32, col_end: u32) -> CellRange {
    CellRange::new(row_start, row_end, col_start, col_end).expect("valid fixture range")
}

#[test]
fn rejects_invalid_rectangles() {
    assert_matches!(
        CellRange::new(0, 3, 1, 2),
        Err(WorkbookError::InvalidRange(_))
    );
    assert_matches!(
        CellRange::new(1, 3, 0, 2),
        Err(WorkbookError::InvalidRange(_))
    );
    assert_matches!(
        CellRange::new(5, 3, 1, 2),
        Err(WorkbookError::InvalidRange(_))
    );
    assert_matches!(
        CellRange::new(1, 3, 4, 2),
        Err(WorkbookError::InvalidRange(_))
    );
    assert_matches!(
        CellRange::from_span(2, 2, 0, 3),
        Err(WorkbookError::InvalidRange(_))
    );
}

#[test]
fn span_and_corner_constructors_agree() -> Result<()> {
    let by_span = CellRange::from_span(3, 11, 2, 2)?;
    let by_corners = CellRange::new(3, 4, 11, 12)?;
    assert_eq!(by_span, by_corners);
    assert_eq!(by_span.to_a1(), "K3:L4");
    Ok(())
}

#[test]
fn newer_merge_displaces_overlapping_range() -> Result<()> {
    // Merge J2:N11, then a 2x2 block inside it. Only the newer block survives.
    let mut manager = RangeManager::new();
    manager.merge(range(2, 11, 10, 14));
    let outcome = manager.merge(CellRange::from_span(3, 11, 2, 2)?);

    assert_eq!(outcome, MergeOutcome::Merged);
    assert_eq!(manager.ranges(), &[range(3, 4, 11, 12)]);
    Ok(())
}

#[test]
fn partial_overlap_displaces_only_touched_ranges() {
    let mut manager = RangeManager::new();
    manager.merge(range(1, 2, 1, 2));
    manager.merge(range(1, 2, 5, 6));
    manager.merge(range(10, 12, 1, 3));

    // Overlaps the first two but not the third.
    manager.merge(range(2, 4, 2, 5));

    assert_eq!(manager.ranges(), &[range(10, 12, 1, 3), range(2, 4, 2, 5)]);
}

#[test]
fn identical_remerge_is_a_noop() {
    let mut manager = RangeManager::new();
    manager.merge(range(2, 4, 2, 4));
    let outcome = manager.merge(range(2, 4, 2, 4));

    assert_eq!(outcome, MergeOutcome::AlreadyMerged);
    assert_eq!(manager.ranges().len(), 1);
}

#[test]
fn anchor_resolves_merged_cells_to_top_left() {
    let mut manager = RangeManager::new();
    manager.merge(range(2, 4, 2, 4));

    assert_eq!(manager.anchor_of(3, 3), (2, 2));
    assert_eq!(manager.anchor_of(4, 4), (2, 2));
    // Unmerged cells resolve to themselves.
    assert_eq!(manager.anchor_of(5, 5), (5, 5));
}

#[test]
fn row_insert_shifts_ranges_at_or_after_the_index() -> Result<()> {
    let mut manager = RangeManager::new();
    manager.merge(range(5, 8, 1, 2));
    manager.shift_rows(2, 3)?;

    assert_eq!(manager.ranges(), &[range(8, 11, 1, 2)]);
    Ok(())
}

#[test]
fn row_insert_inside_a_range_grows_it() -> Result<()> {
    let mut manager = RangeManager::new();
    manager.merge(range(5, 8, 1, 2));
    manager.shift_rows(6, 2)?;

    // Inserted rows fall inside the merge: start stays, end grows.
    assert_eq!(manager.ranges(), &[range(5, 10, 1, 2)]);
    Ok(())
}

#[test]
fn row_delete_shifts_clips_and_destroys() -> Result<()> {
    let mut manager = RangeManager::new();
    manager.merge(range(20, 22, 1, 2)); // entirely after the block
    manager.merge(range(9, 10, 4, 5)); // entirely inside the block
    manager.merge(range(5, 10, 7, 8)); // straddles the block from above
    manager.merge(range(10, 15, 10, 11)); // straddles the block from below

    // Delete rows 8..=12.
    manager.shift_rows(8, -5)?;

    assert_eq!(
        manager.ranges(),
        &[
            range(15, 17, 1, 2),  // shifted down by 5
            range(5, 7, 7, 8),    // clipped to the surviving top part
            range(8, 10, 10, 11), // surviving bottom rows renumbered
        ]
    );
    Ok(())
}

#[test]
fn row_delete_covering_a_whole_range_destroys_it() -> Result<()> {
    let mut manager = RangeManager::new();
    manager.merge(range(3, 4, 1, 1));
    manager.shift_rows(3, -2)?;

    assert!(manager.ranges().is_empty());
    Ok(())
}

#[test]
fn delete_then_insert_restores_ranges_outside_the_block() -> Result<()> {
    let mut manager = RangeManager::new();
    manager.merge(range(10, 12, 2, 4));
    manager.merge(range(1, 1, 1, 6));

    manager.shift_rows(2, -3)?;
    manager.shift_rows(2, 3)?;

    assert_eq!(manager.ranges(), &[range(10, 12, 2, 4), range(1, 1, 1, 6)]);
    Ok(())
}

#[test]
fn column_shifts_mirror_row_shifts() -> Result<()> {
    let mut manager = RangeManager::new();
    manager.merge(range(1, 2, 5, 8));

    manager.shift_cols(3, 2)?;
    assert_eq!(manager.ranges(), &[range(1, 2, 7, 10)]);

    manager.shift_cols(1, -4)?;
    assert_eq!(manager.ranges(), &[range(1, 2, 3, 6)]);
    Ok(())
}

#[test]
fn shift_index_zero_is_rejected_without_mutation() {
    let mut manager = RangeManager::new();
    manager.merge(range(2, 3, 2, 3));

    assert_matches!(
        manager.shift_rows(0, 1),
        Err(WorkbookError::IndexOutOfRange(_))
    );
    assert_matches!(
        manager.shift_cols(0, -1),
        Err(WorkbookError::IndexOutOfRange(_))
    );
    assert_eq!(manager.ranges(), &[range(2, 3, 2, 3)]);
}

#[test]
fn hidden_flags_do_not_touch_ranges() -> Result<()> {
    let mut manager = RangeManager::new();
    manager.merge(range(2, 5, 1, 3));

    manager.set_row_hidden(3, true)?;
    manager.set_col_hidden(2, true)?;

    assert!(manager.is_row_hidden(3));
    assert!(manager.is_col_hidden(2));
    assert_eq!(manager.ranges(), &[range(2, 5, 1, 3)]);

    manager.set_row_hidden(3, false)?;
    assert!(!manager.is_row_hidden(3));
    Ok(())
}

#[test]
fn hidden_flags_follow_structural_shifts() -> Result<()> {
    let mut manager = RangeManager::new();
    manager.set_row_hidden(5, true)?;
    manager.set_row_hidden(9, true)?;

    manager.shift_rows(2, 3)?;
    assert!(manager.is_row_hidden(8));
    assert!(manager.is_row_hidden(12));

    // Deleting the block that holds row 8 drops its flag; row 12 renumbers.
    manager.shift_rows(7, -2)?;
    assert!(!manager.is_row_hidden(8));
    assert!(manager.is_row_hidden(10));
    Ok(())
}
