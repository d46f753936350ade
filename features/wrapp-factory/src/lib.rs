//! Wrapp Factory lazily builds shared resources (database pools, caches,
//! clients, ...) from the configuration held in a [`wrapp_config::Bag`].
//!
//! A factory is put together from three parts.
//! 1. The [`FactoryBuilder`] where one registers creators, the config source and a validator
//! 2. The [`ResourceCreator`]s which decide whether they understand a configuration and build from it
//! 3. The [`Factory`] which builds resources on request and caches them by id
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use wrapp_config::Bag;
//! use wrapp_factory::{creator, Factory, Resource};
//!
//! struct Pool {
//!     url: String,
//! }
//! impl Resource for Pool {}
//!
//! let config = Bag::from_json_str(
//!     r#"{ "pools": { "primary": { "driver": "postgres", "url": "postgres://db/app" } } }"#,
//! )
//! .unwrap();
//!
//! let pools = Factory::<Pool>::builder()
//!     .add_creator(creator(
//!         |config| config.str("driver") == Some("postgres"),
//!         |config| Ok(Arc::new(Pool { url: config.string("url") })),
//!     ))
//!     .config_path("pools")
//!     .config(config)
//!     .build()
//!     .unwrap();
//!
//! let primary = pools.get("primary").unwrap();
//! assert_eq!(primary.url, "postgres://db/app");
//! assert!(Arc::ptr_eq(&primary, &pools.get("primary").unwrap()));
//! assert_eq!(pools.list(), vec!["primary"]);
//! ```

pub mod builder;
pub mod creator;
pub mod errors;
pub mod factory;
pub mod types;

pub use builder::FactoryBuilder;
pub use creator::{creator, FnCreator, ResourceCreator};
pub use errors::FactoryError;
pub use factory::Factory;
pub use types::{DynError, FactoryConfig, Release, Resource, Validator};
