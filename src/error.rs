use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Missing context value '{0}'. Provide it with -c {0}=<value>, in the [context] table of your config file, or in your .env file")]
    MissingContext(String),

    #[error("Invalid context value for '{key}': {reason}")]
    InvalidContext { key: String, reason: String },

    #[error("Invalid configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Failed to read .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),

    #[error("Validation failed on resource '{resource}'\n{reason}")]
    Validation { resource: String, reason: String },

    #[error("Invalid stack name {name}\n{reason}")]
    InvalidStackName { name: String, reason: String },

    #[error("Invalid bucket name {name:?}\n{reason}")]
    InvalidBucketName { name: String, reason: String },

    #[error("Invalid region code {0:?}")]
    InvalidRegion(String),

    #[error("Invalid certificate domain {name:?}\n{reason}")]
    InvalidCertificateDomain { name: String, reason: String },

    #[error("No public hosted zone found for {0}")]
    HostedZoneNotFound(String),

    #[error("{operation} failed\n{message}")]
    Aws { operation: String, message: String },

    #[error("Stack {stack} failed: {reason}")]
    StackFailed { stack: String, reason: String },

    #[error("Stack {stack} is missing output {output}")]
    MissingOutput { stack: String, output: String },

    #[error("Invalid site content directory {0}")]
    InvalidSourceDir(String),

    #[error("Failed to read {path}: {reason}")]
    ReadAsset { path: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to walk site content: {0}")]
    Walk(#[from] walkdir::Error),
}

impl Error {
    /// wraps an sdk error. The sdk errors are only useful
    /// in their debug form, so that is what we keep.
    pub fn aws<E: std::fmt::Debug>(operation: &str, err: E) -> Self {
        Error::Aws {
            operation: operation.to_string(),
            message: format!("{:#?}", err),
        }
    }
}
