use thiserror::Error;

#[derive(Error, Debug)]
pub enum CmdError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Degenerate reddening vector: {0}")]
    DegenerateVector(String),

    #[error("Binning range yields no bin: {0}")]
    EmptyRange(String),

    #[error("Unknown filter: {0}")]
    UnknownFilter(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Missing column in table: {0}")]
    MissingColumn(String),

    #[error("Invalid value in column {column}, row {row}: {value:?}")]
    InvalidValue {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

impl PartialEq for CmdError {
    fn eq(&self, other: &Self) -> bool {
        use CmdError::*;
        match (self, other) {
            (InsufficientData(a), InsufficientData(b)) => a == b,
            (DegenerateVector(a), DegenerateVector(b)) => a == b,
            (EmptyRange(a), EmptyRange(b)) => a == b,
            (UnknownFilter(a), UnknownFilter(b)) => a == b,
            (InvalidParameter(a), InvalidParameter(b)) => a == b,
            (MissingColumn(a), MissingColumn(b)) => a == b,
            (
                InvalidValue {
                    column: c1,
                    row: r1,
                    value: v1,
                },
                InvalidValue {
                    column: c2,
                    row: r2,
                    value: v2,
                },
            ) => c1 == c2 && r1 == r2 && v1 == v2,

            // not comparable, same variant is enough
            (IoError(_), IoError(_)) => true,
            (CsvError(_), CsvError(_)) => true,

            _ => false,
        }
    }
}
