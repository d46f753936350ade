use std::sync::Arc;

use wrapp_config::Bag;

use crate::types::DynError;

/// Builds resources of type `R` out of configuration fragments
///
/// A factory asks its creators in registration order, the first one whose
/// [`accept`](ResourceCreator::accept) returns true builds the resource.
/// The fragment always contains the resource id under the key `"id"`.
pub trait ResourceCreator<R: ?Sized>: Send + Sync {
    /// Returns whether this creator understands the fragment
    fn accept(&self, config: &Bag) -> bool;

    /// Constructs the resource described by the fragment
    fn create(&self, config: &Bag) -> Result<Arc<R>, DynError>;
}

/// A [`ResourceCreator`] made of two closures, see [`creator`]
pub struct FnCreator<AcceptFn, CreateFn> {
    accept: AcceptFn,
    create: CreateFn,
}

/// Builds a creator out of an accept and a create function
///
/// ```
/// use std::sync::Arc;
///
/// use wrapp_config::bag;
/// use wrapp_factory::{creator, Factory, Resource};
///
/// struct Cache {
///     name: String,
/// }
/// impl Resource for Cache {}
///
/// let factory = Factory::<Cache>::builder()
///     .add_creator(creator(
///         |config| config.str("driver") == Some("memory"),
///         |config| Ok(Arc::new(Cache { name: config.string("id") })),
///     ))
///     .config_path("caches")
///     .config(bag! { "caches" => bag! { "session" => bag! { "driver" => "memory" } } })
///     .build()
///     .unwrap();
///
/// assert_eq!(factory.get("session").unwrap().name, "session");
/// ```
pub fn creator<R, AcceptFn, CreateFn>(
    accept: AcceptFn,
    create: CreateFn,
) -> FnCreator<AcceptFn, CreateFn>
where
    R: ?Sized,
    AcceptFn: Fn(&Bag) -> bool + Send + Sync,
    CreateFn: Fn(&Bag) -> Result<Arc<R>, DynError> + Send + Sync,
{
    FnCreator { accept, create }
}

impl<R, AcceptFn, CreateFn> ResourceCreator<R> for FnCreator<AcceptFn, CreateFn>
where
    R: ?Sized,
    AcceptFn: Fn(&Bag) -> bool + Send + Sync,
    CreateFn: Fn(&Bag) -> Result<Arc<R>, DynError> + Send + Sync,
{
    fn accept(&self, config: &Bag) -> bool {
        (self.accept)(config)
    }

    fn create(&self, config: &Bag) -> Result<Arc<R>, DynError> {
        (self.create)(config)
    }
}
