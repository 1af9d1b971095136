use super::model::Table;
use crate::error::{PipelineError, Result, TableShape};

/// Elementwise `experimental / control`.
///
/// A zero control cell gives `±inf` (or `NaN` for `0 / 0`); those values are
/// passed through untouched for the filter to deal with.
pub fn normalize(control: &Table, experimental: &Table) -> Result<Table> {
    if control.shape() != experimental.shape() {
        return Err(PipelineError::ShapeMismatch {
            left: TableShape::new("control", control.shape()),
            right: TableShape::new("experimental", experimental.shape()),
        });
    }

    let (rows, cols) = control.shape();
    let ratio = Table::from_fn(rows, cols, |r, c| {
        let i = r * cols + c;
        experimental.cells()[i] / control.cells()[i]
    });
    Ok(ratio)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn table(rows: Vec<Vec<f64>>) -> Table {
        Table::from_rows(rows).unwrap()
    }

    #[test]
    fn test_identical_tables_give_unit_ratio() {
        let t = table(vec![vec![2.0, 4.0], vec![5.0, 10.0]]);
        let ratio = normalize(&t, &t).unwrap();
        assert!(ratio.cells().iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_shape_mismatch() {
        let control = table(vec![vec![1.0, 2.0]]);
        let experimental = table(vec![vec![1.0], vec![2.0]]);
        let err = normalize(&control, &experimental).unwrap_err();
        match &err {
            PipelineError::ShapeMismatch { left, right } => {
                assert_eq!(*left, TableShape::new("control", (1, 2)));
                assert_eq!(*right, TableShape::new("experimental", (2, 1)));
            }
            other => panic!("expected ShapeMismatch, got {other:?}"),
        }
        assert_eq!(
            err.to_string(),
            "shape mismatch: control is 1x2 but experimental is 2x1"
        );
    }

    #[test]
    fn test_zero_control_passes_through() {
        let control = table(vec![vec![0.0, 0.0, 0.0]]);
        let experimental = table(vec![vec![3.0, -3.0, 0.0]]);
        let ratio = normalize(&control, &experimental).unwrap();
        assert_eq!(ratio.get(0, 0), Some(f64::INFINITY));
        assert_eq!(ratio.get(0, 1), Some(f64::NEG_INFINITY));
        assert!(ratio.get(0, 2).unwrap().is_nan());
    }

    proptest! {
        #[test]
        fn prop_ratio_is_cellwise_division(
            rows in 1usize..6,
            cols in 1usize..6,
            seed in prop::collection::vec((0.1f64..1e3, -1e3f64..1e3), 36),
        ) {
            let control = Table::from_fn(rows, cols, |r, c| seed[r * cols + c].0);
            let experimental = Table::from_fn(rows, cols, |r, c| seed[r * cols + c].1);
            let ratio = normalize(&control, &experimental).unwrap();
            prop_assert_eq!(ratio.shape(), (rows, cols));
            for r in 0..rows {
                for c in 0..cols {
                    let expected = experimental.get(r, c).unwrap() / control.get(r, c).unwrap();
                    prop_assert_eq!(ratio.get(r, c).unwrap(), expected);
                }
            }
        }

        #[test]
        fn prop_mismatched_shapes_always_fail(
            a in (1usize..5, 1usize..5),
            b in (1usize..5, 1usize..5),
        ) {
            prop_assume!(a != b);
            let control = Table::from_fn(a.0, a.1, |_, _| 1.0);
            let experimental = Table::from_fn(b.0, b.1, |_, _| 1.0);
            let is_mismatch = matches!(
                normalize(&control, &experimental),
                Err(PipelineError::ShapeMismatch { .. })
            );
            prop_assert!(is_mismatch);
        }
    }
}
