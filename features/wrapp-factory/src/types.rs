use std::sync::Arc;

use parking_lot::RwLock;
use wrapp_config::Bag;

/// Errors coming from creators, validators and release hooks
pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// Checks a configuration fragment before any creator sees it
pub type Validator = Box<dyn Fn(&Bag) -> Result<(), DynError> + Send + Sync>;

/// Anything a [`Factory`](crate::factory::Factory) can hold.
///
/// Built resources are shared with every caller of the factory, so they must
/// be usable from any thread.
///
/// A resource owning something that has to be shut down overrides
/// [`Resource::releaser`], the factory calls it on close.
pub trait Resource: Send + Sync + 'static {
    fn releaser(&self) -> Option<&dyn Release> {
        None
    }
}

/// Shutdown hook of a [`Resource`]
pub trait Release {
    fn release(&self) -> Result<(), DynError>;
}

/// Where a factory reads its resource configurations from
///
/// Implemented for a plain [`Bag`] (a fixed snapshot) and for a bag behind a
/// lock, which the application may keep changing while the factory runs.
pub trait FactoryConfig: Send + Sync {
    /// Returns a copy of the bag at `path`, if the path addresses one
    fn fragment(&self, path: &str) -> Option<Bag>;

    /// Returns the keys of the bag at `path`
    fn entries(&self, path: &str) -> Vec<String> {
        self.fragment(path)
            .map(|bag| bag.entries())
            .unwrap_or_default()
    }
}

impl FactoryConfig for Bag {
    fn fragment(&self, path: &str) -> Option<Bag> {
        self.bag(path).cloned()
    }

    fn entries(&self, path: &str) -> Vec<String> {
        self.bag(path).map(Bag::entries).unwrap_or_default()
    }
}

impl FactoryConfig for RwLock<Bag> {
    fn fragment(&self, path: &str) -> Option<Bag> {
        self.read().bag(path).cloned()
    }

    fn entries(&self, path: &str) -> Vec<String> {
        self.read().bag(path).map(Bag::entries).unwrap_or_default()
    }
}

impl<T: FactoryConfig + ?Sized> FactoryConfig for Arc<T> {
    fn fragment(&self, path: &str) -> Option<Bag> {
        (**self).fragment(path)
    }

    fn entries(&self, path: &str) -> Vec<String> {
        (**self).entries(path)
    }
}
