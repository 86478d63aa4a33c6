use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid payload length {actual}: expected {expected}")]
    InvalidLength {
        actual: usize,
        expected: &'static str,
    },
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("sample log is empty, nothing to export")]
    Empty,
    #[error("failed to write export file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode export row: {0}")]
    Csv(#[from] csv::Error),
}
