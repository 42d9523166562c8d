use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("store error: {0}")]
    Backend(String),
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("notifications are not configured (SNS_TOPIC_ARN is empty)")]
    NotConfigured,

    #[error("invalid {channel} destination: {destination}")]
    InvalidDestination {
        channel: &'static str,
        destination: String,
    },

    #[error("SNS error: {0}")]
    Sns(String),
}
