use serde::{Deserialize, Serialize};

/// Fixed fan-out for range splitting.
pub const RANGE_SPLIT_COUNT: i64 = 10;

/// An independently executable unit of work covering a disjoint subset of
/// a table's rows.
///
/// Created once by the planner, serialized to the scheduler, and consumed
/// exactly once by one record stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitDescriptor {
    /// A contiguous row-count window over the base query.
    Offset { limit: i64, offset: i64 },
    /// A half-open value range `[lower, upper)` on one column. The planner
    /// pushes the last split's `upper` one past the true maximum so the
    /// final window is inclusive of it.
    Range {
        column: String,
        column_type: String,
        lower: i64,
        upper: i64,
        /// Expected row count; a size hint only, ranges may be sparse.
        size_hint: i64,
    },
}

impl SplitDescriptor {
    /// Rows this split is expected to produce, for scheduling hints.
    pub fn size_hint(&self) -> i64 {
        match self {
            SplitDescriptor::Offset { limit, .. } => *limit,
            SplitDescriptor::Range { size_hint, .. } => *size_hint,
        }
    }
}

/// Compute offset windows covering `total_rows` rows in `requested` splits.
///
/// The split count is clamped to the row count, and forced to one when the
/// clamp leaves nothing. The first `total_rows % n` splits carry one extra
/// row; offsets accumulate from zero, so the windows are contiguous and
/// cover the row count exactly.
pub fn offset_splits(total_rows: i64, requested: i64) -> Vec<SplitDescriptor> {
    let mut n = requested;
    if total_rows < n {
        n = total_rows;
    }
    if n <= 0 {
        n = 1;
    }

    let base = total_rows / n;
    let remainder = total_rows % n;

    let mut splits = Vec::with_capacity(n as usize);
    let mut offset = 0;
    for i in 0..n {
        let limit = if i < remainder { base + 1 } else { base };
        splits.push(SplitDescriptor::Offset { limit, offset });
        offset += limit;
    }
    splits
}

/// Compute range windows over `[min, max]` for an integer split column.
///
/// `step` is integer division, so the remainder of the range is absorbed
/// by the last split, whose upper bound is one past the true maximum.
pub fn range_splits(
    column: &str,
    column_type: &str,
    min: i64,
    max: i64,
    partitions: i64,
) -> Vec<SplitDescriptor> {
    let step = (max - min) / partitions;
    (0..partitions)
        .map(|i| {
            let lower = min + i * step;
            let upper = if i == partitions - 1 { max + 1 } else { lower + step + 1 };
            SplitDescriptor::Range {
                column: column.to_string(),
                column_type: column_type.to_string(),
                lower,
                upper,
                size_hint: (upper - lower) + 1,
            }
        })
        .collect()
}
