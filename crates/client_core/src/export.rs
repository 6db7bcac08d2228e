//! Vendor order files for registered primers.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use shared::protocol::Row;

use crate::{
    error::{AlignerError, AlignerResult},
    render::cell_text,
};

pub const IDT_COLUMNS: [&str; 4] = ["Name", "Sequence", "Scale", "Purification"];
pub const IDT_SCALE: &str = "25nm";
pub const IDT_PURIFICATION: &str = "STD";
pub const EUROFINS_FILENAME: &str = "bacta_eurofins_registered_primers.xlsx";

const NAME_KEY: &str = "Oligo Name";
const SEQUENCE_KEY: &str = "Sequence";
const CSV_CONTENT_TYPE: &str = "text/csv;charset=utf-8";
const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// A file produced for the user to save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Download {
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    pub async fn save_as(&self, path: &Path) -> AlignerResult<()> {
        tokio::fs::write(path, &self.bytes)
            .await
            .map_err(|source| AlignerError::Io {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Writes the file under `dir` using its own filename and returns the full path.
    pub async fn save_into(&self, dir: &Path) -> AlignerResult<PathBuf> {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| AlignerError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        let path = dir.join(&self.filename);
        self.save_as(&path).await?;
        Ok(path)
    }
}

/// IDT order rows: name and sequence from the registration result, fixed scale and purification.
pub fn idt_records(rows: &[Row]) -> Vec<[String; 4]> {
    rows.iter()
        .map(|row| {
            [
                cell_text(row.get(NAME_KEY)),
                cell_text(row.get(SEQUENCE_KEY)),
                IDT_SCALE.to_string(),
                IDT_PURIFICATION.to_string(),
            ]
        })
        .collect()
}

/// Every field quoted, quotes doubled, `\n` between records and none after the last.
pub fn idt_csv(rows: &[Row]) -> AlignerResult<String> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(IDT_COLUMNS)?;
    for record in idt_records(rows) {
        writer.write_record(&record)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| {
            csv::Error::from(std::io::Error::new(err.error().kind(), err.error().to_string()))
        })?;
    let mut csv = String::from_utf8_lossy(&bytes).into_owned();
    if csv.ends_with('\n') {
        csv.pop();
    }
    Ok(csv)
}

pub fn idt_filename(date: NaiveDate) -> String {
    format!("bacta_idt_registered_primers_{}.csv", date.format("%Y-%m-%d"))
}

pub fn idt_download(rows: &[Row], date: NaiveDate) -> AlignerResult<Download> {
    Ok(Download::new(
        idt_filename(date),
        CSV_CONTENT_TYPE,
        idt_csv(rows)?.into_bytes(),
    ))
}

pub fn eurofins_download(bytes: Vec<u8>) -> Download {
    Download::new(EUROFINS_FILENAME, XLSX_CONTENT_TYPE, bytes)
}
