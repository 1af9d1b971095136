use super::model::{AnomalyRecord, Table};
use super::threshold::Threshold;
use crate::error::{PipelineError, Result, TableShape};

// ---------------------------------------------------------------------------
// Acceptance band around a ratio of 1
// ---------------------------------------------------------------------------

/// `[1 - t, 1 + t]`. Only ratios strictly inside are normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcceptanceBand {
    pub lower: f64,
    pub upper: f64,
}

impl AcceptanceBand {
    pub fn around_one(threshold: Threshold) -> Self {
        AcceptanceBand {
            lower: 1.0 - threshold.value(),
            upper: 1.0 + threshold.value(),
        }
    }

    /// Whether `ratio` is flagged.
    ///
    /// The bounds themselves are anomalous, and so is any non-finite ratio
    /// (a zero control cell), `NaN` included.
    pub fn is_anomalous(&self, ratio: f64) -> bool {
        !ratio.is_finite() || ratio <= self.lower || ratio >= self.upper
    }
}

// ---------------------------------------------------------------------------
// Cell filter
// ---------------------------------------------------------------------------

/// Return every cell whose ratio falls outside the band, row by row.
///
/// Each record carries the experimental value of the cell, not the ratio.
pub fn find_anomalies(
    ratio: &Table,
    experimental: &Table,
    threshold: Threshold,
) -> Result<Vec<AnomalyRecord>> {
    if ratio.shape() != experimental.shape() {
        return Err(PipelineError::ShapeMismatch {
            left: TableShape::new("ratio", ratio.shape()),
            right: TableShape::new("experimental", experimental.shape()),
        });
    }

    let band = AcceptanceBand::around_one(threshold);
    let anomalies = ratio
        .iter()
        .zip(experimental.cells())
        .filter(|((_, r), _)| band.is_anomalous(*r))
        .map(|((cell, _), &value)| AnomalyRecord { value, cell })
        .collect();
    Ok(anomalies)
}
