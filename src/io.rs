//! CSV ingestion.
//!
//! The first record is the header; every cell below it must parse as `f64`.

use crate::table::{Dataset, TableError};
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, instrument};

pub fn read_csv<R: Read>(reader: R, target: &str) -> Result<Dataset, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let names = reader
        .headers()?
        .iter()
        .map(str::to_owned)
        .collect::<Vec<_>>();
    let mut columns = vec![Vec::new(); names.len()];

    for (row, record) in reader.records().enumerate() {
        let record = record?;
        for ((column, name), cell) in columns.iter_mut().zip(&names).zip(record.iter()) {
            let value = cell.parse::<f64>().map_err(|_| LoadError::InvalidNumber {
                row,
                column: name.clone(),
                value: cell.to_owned(),
            })?;
            column.push(value);
        }
    }
    debug!(columns = names.len(), rows = columns.first().map_or(0, Vec::len), "read csv");

    Ok(Dataset::new(names, columns, target)?)
}

#[instrument(skip(path), fields(path = %path.as_ref().display()))]
pub fn read_csv_path<P: AsRef<Path>>(path: P, target: &str) -> Result<Dataset, LoadError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_csv(file, target)
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot open {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed csv")]
    Csv(#[from] csv::Error),

    #[error("row {row}, column `{column}`: {value:?} is not a number")]
    InvalidNumber {
        row: usize,
        column: String,
        value: String,
    },

    #[error("invalid dataset")]
    Table(#[from] TableError),
}
