use std::{any::type_name, collections::HashMap, fmt::Debug, sync::Arc};

use parking_lot::Mutex;
use wrapp_config::Bag;

use crate::{
    builder::FactoryBuilder,
    creator::ResourceCreator,
    errors::FactoryError,
    types::{FactoryConfig, Resource, Validator},
};

/// Lazily builds and caches resources described by a config subtree.
///
/// Every child of the bag at the config path describes one resource, keyed by
/// its id. [`Factory::get`] builds a resource on first request and hands out
/// the cached instance afterwards. Resources built elsewhere can be
/// registered with [`Factory::add`].
///
/// All operations are serialized by one lock, held for the whole operation.
/// A resource is therefore built at most once per id, and creators and
/// validators must not call back into the factory that invoked them.
pub struct Factory<R: Resource + ?Sized> {
    entries: Mutex<HashMap<String, Arc<R>>>,
    creators: Vec<Box<dyn ResourceCreator<R>>>,
    config_path: String,
    config: Arc<dyn FactoryConfig>,
    validator: Option<Validator>,
}
impl<R: Resource + ?Sized> Debug for Factory<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.lock();
        let mut cached: Vec<&String> = entries.keys().collect();
        cached.sort();

        f.debug_struct("Factory")
            .field("resource", &type_name::<R>())
            .field("config_path", &self.config_path)
            .field("creators", &self.creators.len())
            .field("cached", &cached)
            .finish()
    }
}

impl<R: Resource + ?Sized> Factory<R> {
    pub fn builder() -> FactoryBuilder<R> {
        FactoryBuilder::new()
    }

    pub(crate) fn new(
        creators: Vec<Box<dyn ResourceCreator<R>>>,
        config_path: String,
        config: Arc<dyn FactoryConfig>,
        validator: Option<Validator>,
    ) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            creators,
            config_path,
            config,
            validator,
        }
    }

    /// Ids of all configured and cached resources, sorted and without duplicates
    pub fn list(&self) -> Vec<String> {
        let entries = self.entries.lock();

        let mut ids = self.config.entries(&self.config_path);
        ids.extend(entries.keys().cloned());
        ids.sort();
        ids.dedup();

        ids
    }

    /// True if the resource is cached or configured
    pub fn has(&self, id: &str) -> bool {
        let entries = self.entries.lock();
        self.is_known(&entries, id)
    }

    /// Returns the cached resource, building and caching it on first request
    pub fn get(&self, id: &str) -> Result<Arc<R>, FactoryError> {
        let mut entries = self.entries.lock();
        if let Some(resource) = entries.get(id) {
            return Ok(resource.clone());
        }

        let resource = self.build(id)?;
        entries.insert(id.to_owned(), resource.clone());
        tracing::debug!("Cached {}({})", type_name::<R>(), id);

        Ok(resource)
    }

    /// Builds a new instance from the configuration, bypassing the cache
    pub fn generate(&self, id: &str) -> Result<Arc<R>, FactoryError> {
        let _entries = self.entries.lock();
        self.build(id)
    }

    /// Registers a resource built elsewhere
    ///
    /// Fails if the id is already cached or configured.
    pub fn add(&self, id: &str, resource: Arc<R>) -> Result<(), FactoryError> {
        let mut entries = self.entries.lock();
        if self.is_known(&entries, id) {
            return Err(FactoryError::DuplicateResource(id.to_owned()));
        }

        entries.insert(id.to_owned(), resource);
        tracing::debug!("Added {}({})", type_name::<R>(), id);

        Ok(())
    }

    /// Releases every cached resource exposing a [`Release`](crate::types::Release) hook.
    ///
    /// A failing release does not stop the others, the last failure is returned.
    /// Resources stay cached.
    pub fn close(&self) -> Result<(), FactoryError> {
        let entries = self.entries.lock();

        let mut result = Ok(());
        for (id, resource) in entries.iter() {
            let Some(releaser) = resource.releaser() else {
                continue;
            };

            match releaser.release() {
                Ok(()) => tracing::debug!("Released {}({})", type_name::<R>(), id),
                Err(source) => {
                    tracing::error!("Failed to release {}({}): {}", type_name::<R>(), id, source);
                    result = Err(FactoryError::Release {
                        id: id.clone(),
                        source,
                    });
                }
            }
        }

        result
    }

    fn is_known(&self, entries: &HashMap<String, Arc<R>>, id: &str) -> bool {
        entries.contains_key(id) || self.fragment(id).is_some()
    }

    /// Configuration bag of one resource
    fn fragment(&self, id: &str) -> Option<Bag> {
        // An id without segments would address the config path itself
        if id.split('.').all(str::is_empty) {
            return None;
        }

        self.config
            .fragment(&format!("{}.{}", self.config_path, id))
    }

    /// Builds a resource, the caller holds the entries lock
    fn build(&self, id: &str) -> Result<Arc<R>, FactoryError> {
        let resource = type_name::<R>();

        let Some(mut config) = self.fragment(id) else {
            tracing::error!("Tried to generate an unknown resource: {}({})", resource, id);
            return Err(FactoryError::UnknownResource {
                resource,
                id: id.to_owned(),
            });
        };
        config.insert("id", id);

        if let Some(validator) = &self.validator {
            validator(&config).map_err(|source| FactoryError::Validation {
                resource,
                id: id.to_owned(),
                source,
            })?;
        }

        let Some((index, creator)) = self
            .creators
            .iter()
            .enumerate()
            .find(|(_, creator)| creator.accept(&config))
        else {
            return Err(FactoryError::InvalidResourceConfig {
                resource,
                id: id.to_owned(),
                config,
            });
        };

        tracing::debug!("Creator #{} builds {}({})", index, resource, id);
        creator
            .create(&config)
            .map_err(|source| FactoryError::Creation {
                resource,
                id: id.to_owned(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use std::{
        error::Error,
        sync::atomic::{AtomicBool, AtomicUsize, Ordering},
        thread,
    };

    use parking_lot::RwLock;
    use wrapp_config::bag;

    use super::*;
    use crate::{
        creator::creator,
        types::{DynError, Release},
    };

    #[derive(Debug, Default)]
    struct Connection {
        name: String,
        released: AtomicBool,
        fail_release: bool,
    }
    impl Resource for Connection {
        fn releaser(&self) -> Option<&dyn Release> {
            Some(self)
        }
    }
    impl Release for Connection {
        fn release(&self) -> Result<(), DynError> {
            self.released.store(true, Ordering::SeqCst);
            match self.fail_release {
                true => Err(format!("{} refused to close", self.name).into()),
                false => Ok(()),
            }
        }
    }

    /// Builds connections for `driver = "test"` and counts its calls
    struct CountingCreator {
        created: Arc<AtomicUsize>,
    }
    impl ResourceCreator<Connection> for CountingCreator {
        fn accept(&self, config: &Bag) -> bool {
            config.str("driver") == Some("test")
        }

        fn create(&self, config: &Bag) -> Result<Arc<Connection>, DynError> {
            self.created.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Connection {
                name: config.string("id"),
                ..Default::default()
            }))
        }
    }

    #[derive(Debug, thiserror::Error)]
    #[error("driver is down")]
    struct DriverDown;

    fn config() -> Bag {
        bag! {
            "connections" => bag! {
                "primary" => bag! { "driver" => "test" },
                "legacy" => bag! { "driver" => "unsupported" },
                "scalar" => 5_i64,
            },
        }
    }

    fn counting_factory() -> (Factory<Connection>, Arc<AtomicUsize>) {
        let created = Arc::new(AtomicUsize::new(0));
        let factory = Factory::<Connection>::builder()
            .add_creator(CountingCreator {
                created: created.clone(),
            })
            .config_path("connections")
            .config(config())
            .build()
            .unwrap();

        (factory, created)
    }

    #[test]
    fn build_requires_config() {
        let result = Factory::<Connection>::builder()
            .config_path("connections")
            .build();

        assert!(matches!(result, Err(FactoryError::NilReference("config"))));
    }

    #[test]
    fn get_memoizes() {
        let (factory, created) = counting_factory();

        let first = factory.get("primary").unwrap();
        let second = factory.get("primary").unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.name, "primary");
        assert_eq!(created.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn concurrent_get_builds_once() {
        let (factory, created) = counting_factory();

        let built: Vec<Arc<Connection>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| factory.get("primary").unwrap()))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .collect()
        });

        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert!(built.iter().all(|resource| Arc::ptr_eq(resource, &built[0])));
    }

    #[test]
    fn generate_bypasses_the_cache() {
        let (factory, created) = counting_factory();

        let first = factory.generate("primary").unwrap();
        let second = factory.generate("primary").unwrap();
        assert!(!Arc::ptr_eq(&first, &second));

        let cached = factory.get("primary").unwrap();
        assert!(!Arc::ptr_eq(&cached, &first));
        assert_eq!(created.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn unknown_ids_fail() {
        let factory = Factory::<Connection>::builder()
            .config(Bag::new())
            .build()
            .unwrap();

        assert!(matches!(
            factory.generate("missing"),
            Err(FactoryError::UnknownResource { id, .. }) if id == "missing"
        ));
        assert!(matches!(
            factory.get("missing"),
            Err(FactoryError::UnknownResource { .. })
        ));
    }

    #[test]
    fn non_bag_entries_and_empty_ids_are_unknown() {
        let (factory, _) = counting_factory();

        assert!(matches!(
            factory.get("scalar"),
            Err(FactoryError::UnknownResource { .. })
        ));
        assert!(matches!(
            factory.get(""),
            Err(FactoryError::UnknownResource { .. })
        ));
        assert!(!factory.has(""));
    }

    #[test]
    fn no_accepting_creator_fails() {
        let (factory, created) = counting_factory();

        match factory.generate("legacy") {
            Err(FactoryError::InvalidResourceConfig { id, config, .. }) => {
                assert_eq!(id, "legacy");
                assert_eq!(config.str("driver"), Some("unsupported"));
                assert_eq!(config.str("id"), Some("legacy"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(created.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn creators_are_asked_in_order() {
        let factory = Factory::<Connection>::builder()
            .add_creator(creator(
                |_| false,
                |_| Ok(Arc::new(Connection::default())),
            ))
            .add_creator(creator(
                |config| config.has("driver"),
                |_| {
                    Ok(Arc::new(Connection {
                        name: "second".to_owned(),
                        ..Default::default()
                    }))
                },
            ))
            .add_creator(creator(
                |_| true,
                |_| {
                    Ok(Arc::new(Connection {
                        name: "third".to_owned(),
                        ..Default::default()
                    }))
                },
            ))
            .config_path("connections")
            .config(config())
            .build()
            .unwrap();

        assert_eq!(factory.get("primary").unwrap().name, "second");
    }

    #[test]
    fn creator_errors_keep_their_source() {
        let factory = Factory::<Connection>::builder()
            .add_creator(creator(|_| true, |_| Err(DriverDown.into())))
            .config_path("connections")
            .config(config())
            .build()
            .unwrap();

        let error = factory.get("primary").unwrap_err();
        assert!(matches!(error, FactoryError::Creation { .. }));
        assert!(error.source().unwrap().downcast_ref::<DriverDown>().is_some());
        assert!(!factory.list().is_empty());
    }

    #[test]
    fn validator_sees_the_injected_id() {
        let validated = Arc::new(Mutex::new(Vec::new()));
        let seen = validated.clone();

        let factory = Factory::<Connection>::builder()
            .add_creator(CountingCreator {
                created: Arc::new(AtomicUsize::new(0)),
            })
            .config_path("connections")
            .config(config())
            .validator(move |config: &Bag| {
                seen.lock().push(config.string("id"));
                Ok(())
            })
            .build()
            .unwrap();

        factory.get("primary").unwrap();
        assert_eq!(*validated.lock(), vec!["primary".to_owned()]);
    }

    #[test]
    fn validator_errors_abort_creation() {
        let created = Arc::new(AtomicUsize::new(0));
        let factory = Factory::<Connection>::builder()
            .add_creator(CountingCreator {
                created: created.clone(),
            })
            .config_path("connections")
            .config(config())
            .validator(|_: &Bag| Err(DriverDown.into()))
            .build()
            .unwrap();

        let error = factory.get("primary").unwrap_err();
        assert!(matches!(error, FactoryError::Validation { .. }));
        assert!(error.source().unwrap().downcast_ref::<DriverDown>().is_some());
        assert_eq!(created.load(Ordering::SeqCst), 0);
        assert!(!factory.list().is_empty());
    }

    #[test]
    fn generate_does_not_touch_the_shared_config() {
        let shared = Arc::new(RwLock::new(config()));
        let factory = Factory::<Connection>::builder()
            .add_creator(CountingCreator {
                created: Arc::new(AtomicUsize::new(0)),
            })
            .config_path("connections")
            .config(shared.clone())
            .build()
            .unwrap();

        factory.generate("primary").unwrap();
        assert!(!shared.read().has("connections.primary.id"));
    }

    #[test]
    fn shared_config_changes_are_visible() {
        let shared = Arc::new(RwLock::new(config()));
        let created = Arc::new(AtomicUsize::new(0));
        let factory = Factory::<Connection>::builder()
            .add_creator(CountingCreator {
                created: created.clone(),
            })
            .config_path("connections")
            .config(shared.clone())
            .build()
            .unwrap();

        assert!(!factory.has("late"));
        shared
            .write()
            .set("connections.late", bag! { "driver" => "test" })
            .unwrap();

        assert!(factory.has("late"));
        assert_eq!(factory.get("late").unwrap().name, "late");
    }

    #[test]
    fn add_registers_resources() {
        let (factory, created) = counting_factory();
        let manual = Arc::new(Connection {
            name: "manual".to_owned(),
            ..Default::default()
        });

        factory.add("manual", manual.clone()).unwrap();

        assert!(factory.has("manual"));
        assert!(Arc::ptr_eq(&factory.get("manual").unwrap(), &manual));
        assert_eq!(created.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn add_rejects_known_ids() {
        let (factory, _) = counting_factory();
        let first = Arc::new(Connection::default());

        factory.add("x", first.clone()).unwrap();
        assert!(matches!(
            factory.add("x", Arc::new(Connection::default())),
            Err(FactoryError::DuplicateResource(id)) if id == "x"
        ));
        assert!(Arc::ptr_eq(&factory.get("x").unwrap(), &first));

        // Configured but never built
        assert!(matches!(
            factory.add("primary", Arc::new(Connection::default())),
            Err(FactoryError::DuplicateResource(_))
        ));
    }

    #[test]
    fn has_covers_config_and_cache() {
        let (factory, _) = counting_factory();
        factory.add("manual", Arc::new(Connection::default())).unwrap();

        assert!(factory.has("primary"));
        assert!(factory.has("manual"));
        assert!(!factory.has("nonexistent"));
    }

    #[test]
    fn list_is_sorted_and_deduplicated() {
        let factory = Factory::<Connection>::builder()
            .config_path("path")
            .config(bag! { "path" => bag! { "zulu" => Bag::new(), "alpha" => Bag::new() } })
            .build()
            .unwrap();

        factory.add("charlie", Arc::new(Connection::default())).unwrap();
        assert_eq!(factory.list(), vec!["alpha", "charlie", "zulu"]);
    }

    #[test]
    fn list_includes_built_entries_once() {
        let (factory, _) = counting_factory();
        factory.get("primary").unwrap();

        assert_eq!(factory.list(), vec!["legacy", "primary", "scalar"]);
    }

    #[test]
    fn list_is_empty_without_entries() {
        let factory = Factory::<Connection>::builder()
            .config_path("path")
            .config(Bag::new())
            .build()
            .unwrap();

        assert!(factory.list().is_empty());
    }

    #[test]
    fn empty_config_path_reads_the_root() {
        let factory = Factory::<Connection>::builder()
            .add_creator(CountingCreator {
                created: Arc::new(AtomicUsize::new(0)),
            })
            .config(bag! { "root" => bag! { "driver" => "test" } })
            .build()
            .unwrap();

        assert_eq!(factory.list(), vec!["root"]);
        assert_eq!(factory.get("root").unwrap().name, "root");
    }

    #[test]
    fn close_releases_every_releasable_entry() {
        let (factory, _) = counting_factory();
        let primary = factory.get("primary").unwrap();
        let manual = Arc::new(Connection::default());
        factory.add("manual", manual.clone()).unwrap();

        factory.close().unwrap();

        assert!(primary.released.load(Ordering::SeqCst));
        assert!(manual.released.load(Ordering::SeqCst));
        assert!(factory.has("primary"));
    }

    #[test]
    fn close_continues_past_failures() {
        let (factory, _) = counting_factory();
        let failing = Arc::new(Connection {
            name: "failing".to_owned(),
            fail_release: true,
            ..Default::default()
        });
        let healthy = Arc::new(Connection::default());
        factory.add("failing", failing.clone()).unwrap();
        factory.add("healthy", healthy.clone()).unwrap();

        let error = factory.close().unwrap_err();

        assert!(matches!(error, FactoryError::Release { ref id, .. } if id == "failing"));
        assert!(failing.released.load(Ordering::SeqCst));
        assert!(healthy.released.load(Ordering::SeqCst));
    }

    /// Appends its id to a shared log when released
    struct Logged {
        id: &'static str,
        fail: bool,
        log: Arc<Mutex<Vec<&'static str>>>,
    }
    impl Resource for Logged {
        fn releaser(&self) -> Option<&dyn Release> {
            Some(self)
        }
    }
    impl Release for Logged {
        fn release(&self) -> Result<(), DynError> {
            self.log.lock().push(self.id);
            match self.fail {
                true => Err(format!("{} refused to close", self.id).into()),
                false => Ok(()),
            }
        }
    }

    #[test]
    fn close_returns_the_last_release_failure() {
        let log: Arc<Mutex<Vec<&'static str>>> = Arc::default();
        let factory = Factory::<Logged>::builder()
            .config(Bag::new())
            .build()
            .unwrap();

        let resources = [("a", true), ("b", false), ("c", true), ("d", true), ("e", false)];
        for (id, fail) in resources {
            let resource = Logged {
                id,
                fail,
                log: log.clone(),
            };
            factory.add(id, Arc::new(resource)).unwrap();
        }

        let error = factory.close().unwrap_err();

        let released = log.lock().clone();
        let mut all = released.clone();
        all.sort();
        assert_eq!(all, vec!["a", "b", "c", "d", "e"]);

        let last_failure = released
            .iter()
            .rev()
            .find(|id| ["a", "c", "d"].contains(*id))
            .unwrap();
        match error {
            FactoryError::Release { ref id, ref source } => {
                assert_eq!(id, last_failure);
                assert_eq!(source.to_string(), format!("{last_failure} refused to close"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn close_skips_resources_without_release() {
        struct Plain;
        impl Resource for Plain {}

        let factory = Factory::<Plain>::builder()
            .config(Bag::new())
            .build()
            .unwrap();
        factory.add("plain", Arc::new(Plain)).unwrap();

        assert!(factory.close().is_ok());
    }

    trait Store: Resource {
        fn backend(&self) -> &'static str;
    }

    struct MemoryStore;
    impl Resource for MemoryStore {}
    impl Store for MemoryStore {
        fn backend(&self) -> &'static str {
            "memory"
        }
    }

    #[test]
    fn factories_hold_trait_objects() {
        let factory = Factory::<dyn Store>::builder()
            .add_creator(creator(
                |config| config.str("backend") == Some("memory"),
                |_| {
                    let store: Arc<dyn Store> = Arc::new(MemoryStore);
                    Ok(store)
                },
            ))
            .config_path("stores")
            .config(bag! { "stores" => bag! { "sessions" => bag! { "backend" => "memory" } } })
            .build()
            .unwrap();

        assert_eq!(factory.get("sessions").unwrap().backend(), "memory");
        assert!(format!("{factory:?}").contains("sessions"));
    }
}
