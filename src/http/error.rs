use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO Error: {0}")]
    IO(#[from] std::io::Error),
    #[error("Invalid header name '{0}'")]
    InvalidHeaderName(String),
    #[error("Invalid request method '{0}'")]
    InvalidMethod(String),
    #[error("Invalid cookie: '{0}'")]
    InvalidCookie(String),
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("Cannot detect MIME type of {}: {source}", .path.display())]
    MimeDetection {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid URL: '{0}'")]
    InvalidUrl(String),
    #[error("Error sending request: #{code} {message} at {url} -H 'HOST: {}'", .host.as_deref().unwrap_or_default())]
    Transport {
        code: u16,
        message: String,
        url: String,
        host: Option<String>,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
