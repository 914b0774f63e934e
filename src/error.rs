use thiserror::Error;

#[derive(Error, Debug)]
pub enum FileError {
    #[error("file extension is not supported")]
    ExtensionNotSupported,

    #[error("could not perform api actions due to exceeding content-length")]
    InvalidContentLength,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP client error: {message}")]
    Client { message: String },
}

pub type FileResult<T> = Result<T, FileError>;
