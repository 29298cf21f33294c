use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to list s3://{bucket}/{prefix}: {message}")]
    List {
        bucket: String,
        prefix: String,
        message: String,
    },
}
