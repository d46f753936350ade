use serde::de::DeserializeOwned;
use serde_json::{json, Map, Number};

use crate::{bag::Bag, errors::ConfigError, value::Value};

impl Bag {
    /// Builds a bag from a JSON object.
    ///
    /// Integers become [`Value::I64`] ([`Value::U64`] above `i64::MAX`), other
    /// numbers [`Value::F64`]. `null` entries are dropped.
    pub fn from_json(source: serde_json::Value) -> Result<Bag, ConfigError> {
        match source {
            serde_json::Value::Object(map) => Ok(bag_from_map(map)),
            _ => Err(ConfigError::NotAnObject),
        }
    }

    pub fn from_json_str(source: &str) -> Result<Bag, ConfigError> {
        Self::from_json(serde_json::from_str(source)?)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.iter()
                .map(|(key, value)| (key.to_owned(), value.to_json()))
                .collect(),
        )
    }

    /// Decodes the subtree at `path` into `T`. An empty path decodes the whole bag.
    ///
    /// Durations are exposed as `{ "secs", "nanos" }`, the shape serde uses for
    /// [`std::time::Duration`].
    pub fn populate<T: DeserializeOwned>(&self, path: &str) -> Result<T, ConfigError> {
        let source = match (self.bag(path), self.get(path)) {
            (Some(bag), _) => bag.to_json(),
            (None, Some(value)) => value.to_json(),
            (None, None) => return Err(ConfigError::InvalidPath(path.to_owned())),
        };

        serde_json::from_value(source).map_err(|source| ConfigError::Decode {
            path: path.to_owned(),
            source,
        })
    }
}

fn bag_from_map(map: Map<String, serde_json::Value>) -> Bag {
    map.into_iter()
        .filter_map(|(key, value)| Some((key, value_from_json(value)?)))
        .collect()
}

fn value_from_json(source: serde_json::Value) -> Option<Value> {
    let value = match source {
        serde_json::Value::Null => return None,
        serde_json::Value::Bool(value) => Value::Bool(value),
        serde_json::Value::Number(number) => {
            if let Some(value) = number.as_i64() {
                Value::I64(value)
            } else if let Some(value) = number.as_u64() {
                Value::U64(value)
            } else {
                Value::F64(number.as_f64()?)
            }
        }
        serde_json::Value::String(value) => Value::String(value),
        serde_json::Value::Array(items) => {
            Value::Sequence(items.into_iter().filter_map(value_from_json).collect())
        }
        serde_json::Value::Object(map) => Value::Bag(bag_from_map(map)),
    };

    Some(value)
}

fn float(value: f64) -> serde_json::Value {
    Number::from_f64(value).map_or(serde_json::Value::Null, serde_json::Value::Number)
}

impl Value {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Bool(value) => serde_json::Value::from(*value),
            Value::I8(value) => serde_json::Value::from(*value),
            Value::I16(value) => serde_json::Value::from(*value),
            Value::I32(value) => serde_json::Value::from(*value),
            Value::I64(value) => serde_json::Value::from(*value),
            Value::Isize(value) => serde_json::Value::from(*value),
            Value::U8(value) => serde_json::Value::from(*value),
            Value::U16(value) => serde_json::Value::from(*value),
            Value::U32(value) => serde_json::Value::from(*value),
            Value::U64(value) => serde_json::Value::from(*value),
            Value::Usize(value) => serde_json::Value::from(*value),
            Value::F32(value) => float(f64::from(*value)),
            Value::F64(value) => float(*value),
            Value::String(value) => serde_json::Value::from(value.as_str()),
            Value::Duration(duration) => json!({
                "secs": duration.as_secs(),
                "nanos": duration.subsec_nanos(),
            }),
            Value::Sequence(values) => {
                serde_json::Value::Array(values.iter().map(Value::to_json).collect())
            }
            Value::Bag(bag) => bag.to_json(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde::Deserialize;

    use super::*;
    use crate::bag;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Pool {
        size: u32,
        timeout: Duration,
        hosts: Vec<String>,
    }

    #[test]
    fn from_json_str_builds_nested_bags() {
        let config = Bag::from_json_str(
            r#"{
                "databases": {
                    "primary": { "driver": "postgres", "port": 5432, "ratio": 0.5 },
                    "replica": { "driver": "postgres", "hosts": ["a", null, "b"] }
                },
                "debug": true,
                "removed": null
            }"#,
        )
        .unwrap();

        assert_eq!(config.str("databases.primary.driver"), Some("postgres"));
        assert_eq!(config.i64("databases.primary.port"), 5432);
        assert_eq!(config.f64("databases.primary.ratio"), 0.5);
        assert_eq!(config.string_sequence("databases.replica.hosts"), vec!["a", "b"]);
        assert!(config.bool("debug"));
        assert!(!config.has("removed"));
    }

    #[test]
    fn from_json_rejects_non_objects() {
        assert!(matches!(
            Bag::from_json(json!([1, 2])),
            Err(ConfigError::NotAnObject)
        ));
        assert!(matches!(
            Bag::from_json_str("{ not json"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn populate_decodes_subtree() {
        let config = bag! {
            "pool" => bag! {
                "size" => 8_u32,
                "timeout" => Duration::from_millis(1500),
                "hosts" => vec!["a", "b"],
            },
        };

        let pool: Pool = config.populate("pool").unwrap();
        assert_eq!(
            pool,
            Pool {
                size: 8,
                timeout: Duration::from_millis(1500),
                hosts: vec!["a".to_owned(), "b".to_owned()],
            }
        );

        let size: u32 = config.populate("pool.size").unwrap();
        assert_eq!(size, 8);
    }

    #[test]
    fn populate_reports_missing_and_malformed_paths() {
        let config = bag! { "pool" => bag! { "size" => "large" } };

        assert!(matches!(
            config.populate::<Pool>("missing"),
            Err(ConfigError::InvalidPath(path)) if path == "missing"
        ));
        assert!(matches!(
            config.populate::<Pool>("pool"),
            Err(ConfigError::Decode { path, .. }) if path == "pool"
        ));
    }
}
