//! Wrapp Config provides the hierarchical configuration store that the other
//! Wrapp features read their settings from.
//!
//! Wrapp Config is split into two major parts:
//! 1. Bag: a tree of string keys addressed by dotted paths (`"databases.primary.port"`)
//! 2. Value: the scalars, sequences and nested bags stored in the tree
//!
//! # Examples
//!
//! ```rust
//! use std::time::Duration;
//!
//! use wrapp_config::{bag, Bag};
//!
//! let mut config = Bag::from_json_str(
//!     r#"{ "databases": { "primary": { "driver": "postgres", "port": 5432 } } }"#,
//! )
//! .unwrap();
//!
//! config.set("databases.primary.timeout", Duration::from_secs(5)).unwrap();
//! config.merge(&bag! {
//!     "databases" => bag! { "replica" => bag! { "driver" => "postgres" } },
//! });
//!
//! assert_eq!(config.str("databases.primary.driver"), Some("postgres"));
//! assert_eq!(config.i64("databases.primary.port"), 5432);
//! assert_eq!(config.duration("databases.primary.timeout"), Duration::from_secs(5));
//! assert!(config.has("databases.replica"));
//!
//! // Accessors never convert between types, a mismatch yields the default
//! assert_eq!(config.i32_or("databases.primary.port", -1), -1);
//! ```
//!
//! Wrapp Config consists of the following components:
//!
//! 1. Bag - path lookup, typed accessors, set, merge and clone
//! 2. Value - the entries of a bag
//! 3. Json - loading bags from JSON and decoding subtrees with serde
//! 4. Errors - for config errors

pub mod bag;
pub mod errors;
mod json;
pub mod value;

pub use bag::Bag;
pub use errors::ConfigError;
pub use value::Value;
