use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Context, Result};

// ---------------------------------------------------------------------------
// Table – a rectangular grid of measurements
// ---------------------------------------------------------------------------

/// A rectangular numeric grid stored row-major.
///
/// Missing cells are represented as `NaN`, the same way a blank spreadsheet
/// cell reads as missing.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    rows: usize,
    cols: usize,
    cells: Vec<f64>,
}

impl Table {
    /// Build a table from row vectors. All rows must have the same length.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let n_rows = rows.len();
        let n_cols = rows.first().map_or(0, Vec::len);
        let mut cells = Vec::with_capacity(n_rows * n_cols);

        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != n_cols {
                bail!(
                    "row {} has {} cells but row 1 has {n_cols}",
                    i + 1,
                    row.len()
                );
            }
            cells.extend(row);
        }

        Ok(Table {
            rows: n_rows,
            cols: n_cols,
            cells,
        })
    }

    /// Build a table directly from row-major cells.
    pub fn from_cells(rows: usize, cols: usize, cells: Vec<f64>) -> Result<Self> {
        if rows * cols != cells.len() {
            bail!("{rows}x{cols} table needs {} cells, got {}", rows * cols, cells.len());
        }
        Ok(Table { rows, cols, cells })
    }

    /// Build a table of the given shape by evaluating `f(row, col)`.
    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> f64) -> Self {
        let mut cells = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                cells.push(f(r, c));
            }
        }
        Table { rows, cols, cells }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the table has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.rows && col < self.cols {
            Some(self.cells[row * self.cols + col])
        } else {
            None
        }
    }

    /// Row-major view of every cell.
    pub fn cells(&self) -> &[f64] {
        &self.cells
    }

    /// Iterate `(CellRef, value)` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (CellRef, f64)> + '_ {
        let cols = self.cols;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, &v)| (CellRef::new(i / cols, i % cols), v))
    }
}

// ---------------------------------------------------------------------------
// CellRef – spreadsheet-style coordinate
// ---------------------------------------------------------------------------

/// A 0-indexed cell position, displayed spreadsheet-style (`A1`, `AB12`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellRef {
    pub row: usize,
    pub col: usize,
}

impl CellRef {
    pub fn new(row: usize, col: usize) -> Self {
        CellRef { row, col }
    }
}

/// Bijective base-26 column label: 0 → `A`, 25 → `Z`, 26 → `AA`.
pub fn column_letters(col: usize) -> String {
    let mut n = col + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letters(self.col), self.row + 1)
    }
}

impl FromStr for CellRef {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let split = s
            .find(|ch: char| !ch.is_ascii_uppercase())
            .unwrap_or(s.len());
        let (letters, digits) = s.split_at(split);
        if letters.is_empty() || digits.is_empty() {
            bail!("'{s}' is not a cell reference");
        }

        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            bail!("'{s}' has an invalid row number");
        }

        let col = letters
            .bytes()
            .try_fold(0usize, |acc, b| {
                acc.checked_mul(26)?.checked_add(usize::from(b - b'A' + 1))
            })
            .with_context(|| format!("'{s}': column is out of range"))?;
        let row: usize = digits
            .parse()
            .with_context(|| format!("'{s}': row is out of range"))?;
        if row == 0 {
            bail!("'{s}': rows are numbered from 1");
        }

        Ok(CellRef::new(row - 1, col - 1))
    }
}

// ---------------------------------------------------------------------------
// SampleSet – (experimental, ratio) pairs used for threshold fitting
// ---------------------------------------------------------------------------

/// Paired samples flattened from an experimental table and its ratio table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleSet {
    /// Experimental values (regressor).
    pub x: Vec<f64>,
    /// Ratio values (target) – same length as `x`.
    pub y: Vec<f64>,
}

impl SampleSet {
    /// Pair every cell of `experimental` with the same cell of `ratio`,
    /// keeping only pairs where both values are finite.
    ///
    /// Returns the sample set and the number of cells left out.
    pub fn from_tables(experimental: &Table, ratio: &Table) -> (Self, usize) {
        let mut samples = SampleSet::default();
        let mut excluded = 0;
        for (&x, &y) in experimental.cells().iter().zip(ratio.cells()) {
            if x.is_finite() && y.is_finite() {
                samples.push(x, y);
            } else {
                excluded += 1;
            }
        }
        (samples, excluded)
    }

    pub fn push(&mut self, x: f64, y: f64) {
        self.x.push(x);
        self.y.push(y);
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Whether the sample set is empty.
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

// ---------------------------------------------------------------------------
// AnomalyRecord – one flagged cell
// ---------------------------------------------------------------------------

/// A flagged cell: the raw experimental value and where it came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyRecord {
    pub value: f64,
    pub cell: CellRef,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letters(0), "A");
        assert_eq!(column_letters(25), "Z");
        assert_eq!(column_letters(26), "AA");
        assert_eq!(column_letters(27), "AB");
        assert_eq!(column_letters(51), "AZ");
        assert_eq!(column_letters(52), "BA");
        assert_eq!(column_letters(701), "ZZ");
        assert_eq!(column_letters(702), "AAA");
    }

    #[test]
    fn test_single_letter_columns() {
        for c in 0..26 {
            let label = column_letters(c);
            assert_eq!(label.len(), 1);
            assert_eq!(label.as_bytes()[0], b'A' + c as u8);
        }
    }

    #[test]
    fn test_cell_ref_display_and_parse() {
        assert_eq!(CellRef::new(6, 2).to_string(), "C7");
        assert_eq!(CellRef::new(0, 26).to_string(), "AA1");

        for (row, col) in [(0, 0), (9, 25), (99, 26), (3, 701), (0, 702)] {
            let cell = CellRef::new(row, col);
            let parsed: CellRef = cell.to_string().parse().unwrap();
            assert_eq!(parsed, cell);
        }
    }

    #[test]
    fn test_cell_ref_rejects_garbage() {
        assert!("".parse::<CellRef>().is_err());
        assert!("A".parse::<CellRef>().is_err());
        assert!("12".parse::<CellRef>().is_err());
        assert!("A0".parse::<CellRef>().is_err());
        assert!("a1".parse::<CellRef>().is_err());
        assert!("A1B".parse::<CellRef>().is_err());
        assert!("A+1".parse::<CellRef>().is_err());
        assert!("A 1".parse::<CellRef>().is_err());
    }

    #[test]
    fn test_cell_ref_out_of_range_is_an_error() {
        assert!("ZZZZZZZZZZZZZZZZ1".parse::<CellRef>().is_err());
        assert!("A99999999999999999999999".parse::<CellRef>().is_err());
    }

    #[test]
    fn test_from_rows_rejects_ragged() {
        let err = Table::from_rows(vec![vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert!(err.to_string().contains("row 2"));
    }

    #[test]
    fn test_table_accessors() {
        let t = Table::from_rows(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
        assert_eq!(t.shape(), (2, 3));
        assert_eq!(t.get(1, 2), Some(6.0));
        assert_eq!(t.get(2, 0), None);

        let labels: Vec<String> = t.iter().map(|(cell, _)| cell.to_string()).collect();
        assert_eq!(labels, ["A1", "B1", "C1", "A2", "B2", "C2"]);
    }

    #[test]
    fn test_empty_table() {
        let t = Table::from_rows(Vec::new()).unwrap();
        assert!(t.is_empty());
        assert_eq!(t.shape(), (0, 0));
        assert_eq!(t.iter().count(), 0);
    }

    #[test]
    fn test_sample_set_skips_non_finite() {
        let exp = Table::from_rows(vec![vec![1.0, 2.0, f64::NAN]]).unwrap();
        let ratio = Table::from_rows(vec![vec![1.0, f64::INFINITY, 3.0]]).unwrap();
        let (samples, excluded) = SampleSet::from_tables(&exp, &ratio);
        assert_eq!(samples.x, vec![1.0]);
        assert_eq!(samples.y, vec![1.0]);
        assert_eq!(excluded, 2);
    }
}
