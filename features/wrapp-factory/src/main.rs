use std::{
    error::Error,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use wrapp_config::{bag, Bag};
use wrapp_factory::{DynError, Factory, Release, Resource, ResourceCreator};

fn main() -> Result<(), Box<dyn Error>> {
    let mut config = Bag::from_json_str(
        r#"{
            "caches": {
                "sessions": { "driver": "memory", "capacity": 128 },
                "pages": { "driver": "memory", "ttl": 30000 }
            }
        }"#,
    )?;
    config.merge(&bag! { "caches" => bag! { "pages" => bag! { "capacity" => 16_i64 } } });

    let caches = Factory::<Cache>::builder()
        .add_creator(MemoryCacheCreator)
        .config_path("caches")
        .config(config)
        .validator(|config: &Bag| match config.i64("capacity") {
            0 => Err(format!("cache '{}' has no capacity", config.string("id")).into()),
            _ => Ok(()),
        })
        .build()?;

    caches.add("static", Arc::new(Cache::new("static", 1, Duration::ZERO)))?;

    let mut opened = Vec::new();
    for id in caches.list() {
        let cache = caches.get(&id)?;
        println!(
            "{}: capacity {}, ttl {:?}",
            cache.name, cache.capacity, cache.ttl
        );
        opened.push(cache);
    }

    caches.close()?;
    for cache in &opened {
        println!("{} open: {}", cache.name, cache.open.load(Ordering::SeqCst));
    }
    println!("{:?}", caches);

    Ok(())
}

struct Cache {
    name: String,
    capacity: i64,
    ttl: Duration,
    open: AtomicBool,
}
impl Cache {
    fn new(name: &str, capacity: i64, ttl: Duration) -> Self {
        Cache {
            name: name.to_owned(),
            capacity,
            ttl,
            open: AtomicBool::new(true),
        }
    }
}
impl Resource for Cache {
    fn releaser(&self) -> Option<&dyn Release> {
        Some(self)
    }
}
impl Release for Cache {
    fn release(&self) -> Result<(), DynError> {
        self.open.store(false, Ordering::SeqCst);
        Ok(())
    }
}

struct MemoryCacheCreator;
impl ResourceCreator<Cache> for MemoryCacheCreator {
    fn accept(&self, config: &Bag) -> bool {
        config.str("driver") == Some("memory")
    }

    fn create(&self, config: &Bag) -> Result<Arc<Cache>, DynError> {
        Ok(Arc::new(Cache::new(
            &config.string("id"),
            config.i64("capacity"),
            config.duration("ttl"),
        )))
    }
}
