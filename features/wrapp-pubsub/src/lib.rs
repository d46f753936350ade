//! Wrapp PubSub dispatches messages to named handlers grouped by channel.
//!
//! Every subscriber registers at most one handler per channel, subscribing
//! again under the same id replaces the previous handler.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::{
//!     atomic::{AtomicUsize, Ordering},
//!     Arc,
//! };
//!
//! use wrapp_pubsub::PubSub;
//!
//! let received = Arc::new(AtomicUsize::new(0));
//! let counter = received.clone();
//!
//! let bus: PubSub<&str, &str, usize> = PubSub::new();
//! bus.subscribe("audit", "orders", move |_, _, amount| {
//!     counter.fetch_add(*amount, Ordering::SeqCst);
//!     Ok(())
//! })
//! .subscribe("mailer", "orders", |_, _, _| Ok(()));
//!
//! bus.publish(&"orders", &3).unwrap();
//! assert_eq!(received.load(Ordering::SeqCst), 3);
//! ```

pub mod errors;
pub mod pubsub;

pub use errors::{DynError, PublishError};
pub use pubsub::{Handler, PubSub};
