use thiserror::Error;

/// Errors coming from handlers
pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// Errors while publishing a message
#[derive(Error, Debug)]
pub enum PublishError {
    /// A handler failed, the remaining handlers were skipped
    #[error("Handler '{subscriber}' failed on channel '{channel}' - error: {source}")]
    HandlerFailed {
        subscriber: String,
        channel: String,
        #[source]
        source: DynError,
    },
}
