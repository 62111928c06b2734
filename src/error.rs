use thiserror::Error;

#[derive(Error, Debug)]
pub enum MapError {
    #[error("Unable to clone request")]
    Clone,
    #[error("Invalid request uri: {0}")]
    Uri(String),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DownloadError {
    #[error("No objects found for prefix: {0}")]
    NotFound(String),
    #[error("No match for pattern {pattern} in key: {key}")]
    NoImageName { key: String, pattern: String },
    #[error("Row {0} has no S3Path")]
    MissingS3Path(usize),
}
