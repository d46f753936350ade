use thiserror::Error;
use wrapp_config::Bag;

use crate::types::DynError;

/// Errors of a [`Factory`](crate::factory::Factory)
///
/// `resource` is the type name of the resources the factory produces.
/// Errors of validators, creators and release hooks are kept as the
/// [`source`](std::error::Error::source) of the returned error.
#[derive(Error, Debug)]
pub enum FactoryError {
    /// A required argument was not supplied
    #[error("Nil reference: '{0}'")]
    NilReference(&'static str),
    /// Neither configured nor added
    #[error("Unknown resource: {resource}({id})")]
    UnknownResource { resource: &'static str, id: String },
    /// Configured, but no creator accepts the configuration
    #[error("Invalid resource config: {resource}({id}) <= {config:?}")]
    InvalidResourceConfig {
        resource: &'static str,
        id: String,
        config: Bag,
    },
    /// The id is already configured or added
    #[error("Duplicate resource: '{0}'")]
    DuplicateResource(String),
    /// The validator rejected the configuration
    #[error("Configuration of {resource}({id}) was rejected - error: {source}")]
    Validation {
        resource: &'static str,
        id: String,
        #[source]
        source: DynError,
    },
    /// The accepting creator failed to build
    #[error("Creator for {resource}({id}) failed - error: {source}")]
    Creation {
        resource: &'static str,
        id: String,
        #[source]
        source: DynError,
    },
    /// A resource failed to release on close
    #[error("Releasing '{id}' failed - error: {source}")]
    Release {
        id: String,
        #[source]
        source: DynError,
    },
}
