use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use anomaly_scan::data::model::{column_letters, Table};

const ROWS: usize = 24;
const COLS: usize = 12;

/// Box-Muller transform for normal distribution
fn gauss(rng: &mut impl Rng, mean: f64, std_dev: f64) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(1e-15);
    let u2: f64 = rng.gen();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + std_dev * z
}

/// Plate-like control readings: a smooth gradient plus measurement noise.
fn control_table(rng: &mut impl Rng) -> Table {
    Table::from_fn(ROWS, COLS, |r, c| {
        let gradient = 100.0 + 4.0 * r as f64 + 2.5 * c as f64;
        gradient + gauss(rng, 0.0, 1.5)
    })
}

/// Experimental readings: control × (1 ± small noise), with a few cells
/// pushed far off to act as anomalies.
fn experimental_table(control: &Table, rng: &mut impl Rng, planted: &[(usize, usize, f64)]) -> Table {
    Table::from_fn(ROWS, COLS, |r, c| {
        let base = control.get(r, c).unwrap_or(f64::NAN);
        match planted.iter().find(|&&(pr, pc, _)| pr == r && pc == c) {
            Some(&(_, _, factor)) => base * factor,
            None => base * gauss(rng, 1.0, 0.02),
        }
    })
}

fn write_csv(table: &Table, path: &Path) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    for r in 0..table.rows() {
        let row: Vec<String> = (0..table.cols())
            .map(|c| format!("{:.4}", table.get(r, c).unwrap_or(f64::NAN)))
            .collect();
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(table: &Table, path: &Path) -> Result<()> {
    let fields: Vec<Field> = (0..table.cols())
        .map(|c| Field::new(column_letters(c), DataType::Float64, true))
        .collect();
    let schema = Arc::new(Schema::new(fields));

    let columns: Vec<ArrayRef> = (0..table.cols())
        .map(|c| {
            let values: Vec<f64> = (0..table.rows())
                .map(|r| table.get(r, c).unwrap_or(f64::NAN))
                .collect();
            Arc::new(Float64Array::from(values)) as ArrayRef
        })
        .collect();

    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;
    let file = std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = ChaCha8Rng::seed_from_u64(42);

    let control = control_table(&mut rng);
    let planted = [(2, 3, 1.8), (10, 0, 0.3), (17, 11, 2.5), (23, 6, 0.55)];
    let experimental = experimental_table(&control, &mut rng, &planted);

    write_csv(&control, Path::new("sample_control.csv"))?;
    write_csv(&experimental, Path::new("sample_experimental.csv"))?;
    write_parquet(&control, Path::new("sample_control.parquet"))?;
    write_parquet(&experimental, Path::new("sample_experimental.parquet"))?;

    let manifest = r#"multiplier = 3.0
folds = 5

[[jobs]]
control = "sample_control.csv"
experimental = "sample_experimental.csv"
output = "sample_anomalies_csv.csv"

[[jobs]]
control = "sample_control.parquet"
experimental = "sample_experimental.parquet"
output = "sample_anomalies_parquet.csv"
"#;
    std::fs::write("sample_batch.toml", manifest).context("writing sample_batch.toml")?;

    println!(
        "Wrote {ROWS}x{COLS} control/experimental tables (CSV + Parquet) and sample_batch.toml"
    );
    let labels: Vec<String> = planted
        .iter()
        .map(|&(r, c, f)| format!("{}{} x{f}", column_letters(c), r + 1))
        .collect();
    println!("Planted anomalies: {}", labels.join(", "));
    Ok(())
}
