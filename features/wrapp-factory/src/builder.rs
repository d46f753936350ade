use std::{any::type_name, sync::Arc};

use wrapp_config::Bag;

use crate::{
    creator::ResourceCreator,
    errors::FactoryError,
    factory::Factory,
    types::{DynError, FactoryConfig, Resource, Validator},
};

/// Collects the parts of a [`Factory`]
///
/// A config source is required, everything else is optional. Without a config
/// path the factory reads its resource ids from the root of the config.
pub struct FactoryBuilder<R: Resource + ?Sized> {
    /// Registered creators, asked in registration order
    pub(crate) creators: Vec<Box<dyn ResourceCreator<R>>>,
    pub(crate) config_path: String,
    pub(crate) config: Option<Arc<dyn FactoryConfig>>,
    pub(crate) validator: Option<Validator>,
}
impl<R: Resource + ?Sized> Default for FactoryBuilder<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Resource + ?Sized> FactoryBuilder<R> {
    pub fn new() -> Self {
        FactoryBuilder {
            creators: Vec::new(),
            config_path: String::new(),
            config: None,
            validator: None,
        }
    }
}
impl<R: Resource + ?Sized> FactoryBuilder<R> {
    pub fn add_creator<Creator: ResourceCreator<R> + 'static>(mut self, creator: Creator) -> Self {
        self.creators.push(Box::new(creator));
        self
    }

    /// Path of the bag whose children are the resource configurations
    pub fn config_path(mut self, path: impl Into<String>) -> Self {
        self.config_path = path.into();
        self
    }

    pub fn config<Config: FactoryConfig + 'static>(mut self, config: Config) -> Self {
        self.config = Some(Arc::new(config));
        self
    }

    /// Runs before every creation, an error aborts it
    pub fn validator<ValidatorFn>(mut self, validator: ValidatorFn) -> Self
    where
        ValidatorFn: Fn(&Bag) -> Result<(), DynError> + Send + Sync + 'static,
    {
        self.validator = Some(Box::new(validator));
        self
    }

    pub fn build(self) -> Result<Factory<R>, FactoryError> {
        let FactoryBuilder {
            creators,
            config_path,
            config,
            validator,
        } = self;

        let config = config.ok_or(FactoryError::NilReference("config"))?;

        tracing::debug!(
            "Building factory for {} at '{}' with {} creators",
            type_name::<R>(),
            config_path,
            creators.len()
        );

        Ok(Factory::new(creators, config_path, config, validator))
    }
}
