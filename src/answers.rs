use tracing::instrument;

use crate::{
    classify::Mark,
    grid::{
        best_mark, block_separation, cluster_1d, estimated_diameter, grid_index, positions,
        segment_blocks, tolerance, Block,
    },
    Answer,
};

/// Option letters in column order.
pub const OPTIONS: &[char] = &['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K'];
/// Column step assumed for a block with a single column line.
pub const SINGLE_COLUMN_STEP: f64 = 100.0;

/// Reads every answer row, block by block from left to right and each block
/// top to bottom.
#[instrument(level = "debug", skip(marks))]
pub fn decode_answers(marks: &[Mark]) -> Vec<Answer> {
    if marks.is_empty() {
        return Vec::new();
    }

    let tol = tolerance(marks);
    let diameter = estimated_diameter(marks);
    let columns = positions(&cluster_1d(
        &marks.iter().map(|m| m.x).collect::<Vec<_>>(),
        tol,
    ));
    let separation = block_separation(&columns, diameter);
    let blocks = segment_blocks(&columns, separation);
    log::debug!(
        "Answer grid: {} columns in {} blocks, tolerance {tol:.1}, block separation {separation:.1}",
        columns.len(),
        blocks.len()
    );

    blocks
        .iter()
        .flat_map(|block| decode_block(block, marks, tol))
        .collect()
}

fn decode_block(block: &Block, marks: &[Mark], tol: f64) -> Vec<Answer> {
    let block_marks = marks
        .iter()
        .filter(|m| block.contains(m.x, tol))
        .collect::<Vec<_>>();
    if block_marks.is_empty() {
        return Vec::new();
    }

    let rows = cluster_1d(&block_marks.iter().map(|m| m.y).collect::<Vec<_>>(), tol);
    let step = block.column_step(SINGLE_COLUMN_STEP);
    log::trace!(
        "Block at x {:.1}..{:.1}: {} rows, column step {step:.1}",
        block.start(),
        block.end(),
        rows.len()
    );

    rows.iter()
        .map(|row| {
            let in_row = block_marks
                .iter()
                .copied()
                .filter(|m| (m.y - row.position).abs() < tol);
            match best_mark(in_row) {
                Some(mark) => option_for(grid_index(mark.x, block.start(), step)),
                None => Answer::Blank,
            }
        })
        .collect()
}

fn option_for(index: i64) -> Answer {
    usize::try_from(index)
        .ok()
        .and_then(|index| OPTIONS.get(index))
        .map_or(Answer::Unresolved, |&option| Answer::Choice(option))
}
