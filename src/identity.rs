use tracing::instrument;

use crate::{
    classify::Mark,
    grid::{best_mark, cluster_1d, estimated_diameter, grid_index, positions, tolerance},
    stats::median_gap,
};

/// Character emitted for a column without a readable mark.
pub const UNRESOLVED: char = '?';
/// Check character for marks on the row after digit 9.
pub const CHECK_CHARACTER: char = 'K';

/// Reads one character per identity column, left to right.
///
/// Rows are indexed from the topmost detected row line, so row 0 must be
/// present on the form for the digits to line up.
#[instrument(level = "debug", skip(marks))]
pub fn decode_identity(marks: &[Mark]) -> String {
    if marks.is_empty() {
        return String::new();
    }

    let tol = tolerance(marks);
    let columns = cluster_1d(&marks.iter().map(|m| m.x).collect::<Vec<_>>(), tol);
    let rows = positions(&cluster_1d(
        &marks.iter().map(|m| m.y).collect::<Vec<_>>(),
        tol,
    ));

    let row_step = match median_gap(&rows) {
        Some(step) if step < tol => tol * 2.0,
        Some(step) => step,
        None => estimated_diameter(marks) * 1.5,
    };
    let row_origin = rows.first().copied().unwrap_or(0.0);
    log::debug!(
        "Identity grid: {} columns, {} rows, tolerance {tol:.1}, row step {row_step:.1}",
        columns.len(),
        rows.len()
    );

    columns
        .iter()
        .map(|column| {
            let in_column = marks.iter().filter(|m| (m.x - column.position).abs() < tol);
            match best_mark(in_column) {
                Some(mark) => identity_char(grid_index(mark.y, row_origin, row_step)),
                None => UNRESOLVED,
            }
        })
        .collect()
}

fn identity_char(row: i64) -> char {
    match row {
        0..=9 => char::from(b'0' + row as u8),
        10.. => CHECK_CHARACTER,
        // above the first row line
        _ => UNRESOLVED,
    }
}

/// Keeps digits and the check character, uppercased.
pub fn normalize_identity(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii_digit() || c.eq_ignore_ascii_case(&CHECK_CHARACTER))
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Formats an identity as `12.345.678-K`: the last character is the check
/// character, the body is grouped in threes from the right.
pub fn format_identity(text: &str) -> String {
    let raw = normalize_identity(text);
    if raw.len() <= 1 {
        return raw;
    }
    let (body, check) = raw.split_at(raw.len() - 1);
    let leading = body.len() % 3;
    let mut groups = Vec::new();
    if leading > 0 {
        groups.push(&body[..leading]);
    }
    groups.extend(
        body.as_bytes()[leading..]
            .chunks(3)
            .filter_map(|chunk| std::str::from_utf8(chunk).ok()),
    );
    format!("{}-{check}", groups.join("."))
}
