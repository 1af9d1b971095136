use std::path::Path;

use tempfile::NamedTempFile;

use super::model::AnomalyRecord;
use crate::error::{PipelineError, Result};

/// Write anomalies as CSV with a `Value,Cell` header, in the order given.
///
/// The file is staged next to `path` and renamed into place, so a failed or
/// interrupted write never leaves a partial file behind.
pub fn write_anomalies(records: &[AnomalyRecord], path: &Path) -> Result<()> {
    let write_err = |cause: std::io::Error| PipelineError::Write {
        path: path.to_path_buf(),
        cause,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staged = NamedTempFile::new_in(dir).map_err(write_err)?;

    {
        let mut writer = csv::Writer::from_writer(staged.as_file_mut());
        writer
            .write_record(["Value", "Cell"])
            .map_err(|e| write_err(e.into()))?;
        for record in records {
            writer
                .write_record([record.value.to_string(), record.cell.to_string()])
                .map_err(|e| write_err(e.into()))?;
        }
        writer.flush().map_err(write_err)?;
    }
    staged.as_file().sync_all().map_err(write_err)?;

    staged.persist(path).map_err(|e| write_err(e.error))?;
    log::info!("Wrote {} anomalies to {}", records.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::CellRef;
    use tempfile::tempdir;

    fn records() -> Vec<AnomalyRecord> {
        vec![
            AnomalyRecord {
                value: 100.0,
                cell: CellRef::new(0, 0),
            },
            AnomalyRecord {
                value: 2.5,
                cell: CellRef::new(6, 2),
            },
        ]
    }

    #[test]
    fn test_write_csv() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("anomalies.csv");
        write_anomalies(&records(), &path)?;

        let text = std::fs::read_to_string(&path)?;
        assert_eq!(text, "Value,Cell\n100,A1\n2.5,C7\n");
        Ok(())
    }

    #[test]
    fn test_write_empty_keeps_header() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("none.csv");
        write_anomalies(&[], &path)?;
        assert_eq!(std::fs::read_to_string(&path)?, "Value,Cell\n");
        Ok(())
    }

    #[test]
    fn test_overwrite_replaces_previous_output() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("out.csv");
        std::fs::write(&path, "stale contents that are longer than the new file\n")?;
        write_anomalies(&records()[..1], &path)?;
        assert_eq!(std::fs::read_to_string(&path)?, "Value,Cell\n100,A1\n");
        Ok(())
    }

    #[test]
    fn test_unwritable_destination() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("missing-dir").join("out.csv");
        let err = write_anomalies(&records(), &path).unwrap_err();
        assert!(matches!(err, PipelineError::Write { .. }));
        assert!(!path.exists());
        // No stray staging files either.
        assert_eq!(std::fs::read_dir(dir.path())?.count(), 0);
        Ok(())
    }
}
