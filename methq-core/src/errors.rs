use thiserror::Error;

#[derive(Error, Debug)]
pub enum IntervalError {
    #[error("Can't read intervals file: {0}")]
    FileReadError(String),

    #[error("Error parsing interval: {0}")]
    IntervalParseError(String),

    #[error("Corrupted file. 0 intervals found in the file: {0}")]
    EmptyIntervalSet(String),

    #[error("Interval start must be less than stop: {0}")]
    BackwardsInterval(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
