/// Errors when reading, writing or decoding a [`Bag`](crate::bag::Bag)
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The path is empty or does not address a value
    #[error("Invalid bag path: '{0}'")]
    InvalidPath(String),
    /// A JSON document used as a bag source has no object at its root
    #[error("A bag can only be built from a JSON object")]
    NotAnObject,
    /// The JSON source could not be parsed
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// A subtree could not be decoded into the requested type
    #[error("Failed to decode '{path}' - error: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
