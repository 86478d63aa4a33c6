/// Flattening the sample log into rows and writing them as CSV
use log::{info, warn};
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

use crate::error::ExportError;
use crate::models::{Channel, Sample};
use crate::processing::DetectionStrategy;
use crate::sample_log::SampleLog;
use crate::utils::export_file_stamp;

const FLAG_COLUMN: &str = "Inhalation";
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// One sample position of one log entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    /// Indexed like `Channel::ALL`; None where the channel ran out of samples.
    pub values: [Option<Sample>; Channel::COUNT],
    /// Set when flags are requested and the entry has a pressure sample here.
    pub inhalation: Option<bool>,
}

/// Flatten the log into rows
///
/// Each entry contributes as many rows as its longest channel; shorter
/// channels are padded with None. With `flags`, the entry's pressure samples
/// are run through that detector on their own and every row carries whether
/// its pressure sample was flagged.
pub fn export_rows(log: &SampleLog, flags: Option<DetectionStrategy>) -> Vec<ExportRow> {
    let mut rows = Vec::new();

    for entry in log.entries() {
        let columns: Vec<Vec<Sample>> = Channel::ALL.iter().map(|&c| entry.samples(c)).collect();
        let pressure = &columns[Channel::Pressure.index()];
        let detected = flags.map(|strategy| strategy.detect(pressure));

        for i in 0..entry.max_len() {
            let values = Channel::ALL.map(|c| columns[c.index()].get(i).copied());
            let inhalation = match &detected {
                Some(result) if i < pressure.len() => Some(result.contains(i)),
                _ => None,
            };
            rows.push(ExportRow { values, inhalation });
        }
    }

    rows
}

/// Write the whole log to a new CSV file in `dir`
///
/// The file name embeds the export time; an existing file is never
/// overwritten.
///
/// # Returns
/// Path of the written file, `ExportError::Empty` if the log holds no rows
/// (nothing is created), or the I/O / encoding error.
pub fn export_csv(
    log: &SampleLog,
    dir: &Path,
    flags: Option<DetectionStrategy>,
) -> Result<PathBuf, ExportError> {
    let rows = export_rows(log, flags);
    if rows.is_empty() {
        return Err(ExportError::Empty);
    }

    let (path, file) = create_unique(dir, OffsetDateTime::now_utc())?;
    let mut writer = csv::Writer::from_writer(file);

    let mut header: Vec<&str> = Channel::ALL.iter().map(|c| c.label()).collect();
    if flags.is_some() {
        header.push(FLAG_COLUMN);
    }
    writer.write_record(&header)?;

    for row in &rows {
        let mut record: Vec<String> = row
            .values
            .iter()
            .map(|value| value.map(|v| v.to_string()).unwrap_or_default())
            .collect();
        if flags.is_some() {
            record.push(match row.inhalation {
                Some(true) => "1".to_string(),
                Some(false) => "0".to_string(),
                None => String::new(),
            });
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;

    info!("Exported {} rows to {}", rows.len(), path.display());
    Ok(path)
}

fn create_unique(dir: &Path, now: OffsetDateTime) -> Result<(PathBuf, File), ExportError> {
    let stem = format!("sensor_data_{}", export_file_stamp(&now));

    for attempt in 0..MAX_NAME_ATTEMPTS {
        let name = if attempt == 0 {
            format!("{}.csv", stem)
        } else {
            format!("{}_{}.csv", stem, attempt)
        };
        let path = dir.join(name);

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                warn!("{} already exists, trying another name", path.display());
            }
            Err(e) => return Err(e.into()),
        }
    }

    let exhausted = io::Error::new(io::ErrorKind::AlreadyExists, "no free export file name");
    Err(exhausted.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SampleBatch;
    use std::fs;
    use tempfile::tempdir;

    fn push(log: &mut SampleLog, channel: Channel, samples: &[Sample]) {
        log.append(SampleBatch {
            channel,
            sequence: 0,
            samples: samples.to_vec(),
            fallbacks: 0,
        });
    }

    fn diff_flags() -> Option<DetectionStrategy> {
        Some(DetectionStrategy::FirstDifference { threshold: 2.0 })
    }

    #[test]
    fn empty_log_has_no_rows_and_writes_nothing() {
        let dir = tempdir().expect("tempdir must be created");
        let log = SampleLog::new();

        assert!(export_rows(&log, None).is_empty());
        assert!(matches!(
            export_csv(&log, dir.path(), None),
            Err(ExportError::Empty)
        ));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn pads_shorter_channels_with_none() {
        let mut log = SampleLog::new();
        push(&mut log, Channel::Temperature, &[20.0, 20.5, 21.0]);
        push(&mut log, Channel::Pressure, &[1000.0]);
        log.flush_entry();
        push(&mut log, Channel::Humidity, &[40.0]);
        log.flush_entry();

        let rows = export_rows(&log, None);

        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].values, [Some(20.0), None, Some(1000.0), None]);
        assert_eq!(rows[2].values, [Some(21.0), None, None, None]);
        assert_eq!(rows[3].values, [None, Some(40.0), None, None]);
        assert!(rows.iter().all(|row| row.inhalation.is_none()));
    }

    #[test]
    fn flags_come_from_each_entry_pressure_alone() {
        let mut log = SampleLog::new();
        push(&mut log, Channel::Pressure, &[1.0, 1.0, 5.0]);
        push(&mut log, Channel::Temperature, &[0.0, 0.0, 0.0, 0.0]);
        log.flush_entry();
        // 5.0 -> 9.0 across entries is not a jump inside either entry
        push(&mut log, Channel::Pressure, &[9.0, 9.0]);
        log.flush_entry();

        let flags: Vec<Option<bool>> = export_rows(&log, diff_flags())
            .iter()
            .map(|row| row.inhalation)
            .collect();

        assert_eq!(flags[..4], [Some(false), Some(false), Some(true), None]);
        assert_eq!(flags[4..], [Some(false), Some(false)]);
    }

    #[test]
    fn writes_header_and_rows() {
        let dir = tempdir().expect("tempdir must be created");
        let mut log = SampleLog::new();
        push(&mut log, Channel::Pressure, &[1.0, 5.0]);
        push(&mut log, Channel::Humidity, &[40.5]);
        log.flush_entry();

        let path = export_csv(&log, dir.path(), diff_flags()).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        let name = path.file_name().unwrap().to_string_lossy();
        assert!(name.starts_with("sensor_data_"));
        assert_eq!(
            lines,
            vec![
                "Temperature (°C),Humidity (%),Pressure,Microphone,Inhalation",
                ",40.5,1,,0",
                ",,5,,1",
            ]
        );
    }

    #[test]
    fn repeated_exports_get_distinct_files() {
        let dir = tempdir().expect("tempdir must be created");
        let mut log = SampleLog::new();
        push(&mut log, Channel::Temperature, &[21.0]);
        log.flush_entry();

        let first = export_csv(&log, dir.path(), None).unwrap();
        let second = export_csv(&log, dir.path(), None).unwrap();

        assert_ne!(first, second);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
        assert_eq!(
            fs::read_to_string(&second).unwrap().lines().next(),
            Some("Temperature (°C),Humidity (%),Pressure,Microphone")
        );
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let dir = tempdir().expect("tempdir must be created");
        let mut log = SampleLog::new();
        push(&mut log, Channel::Temperature, &[21.0]);
        log.flush_entry();

        let result = export_csv(&log, &dir.path().join("missing"), None);

        assert!(matches!(result, Err(ExportError::Io(_))));
        assert_eq!(log.entries().len(), 1);
    }
}
