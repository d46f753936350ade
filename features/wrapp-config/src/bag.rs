use std::{collections::HashMap, time::Duration};

use crate::{errors::ConfigError, value::Value};

/// Hierarchical key/value store addressed by dotted paths.
///
/// `"a.b.c"` descends through the nested bags stored at `a` and `b` and
/// addresses `c`. Empty segments (`"a..b"`, `".a"`, `"a."`) are skipped.
/// A path made only of empty segments addresses the bag itself.
///
/// The bag does no locking of its own. Share it behind a lock when it is
/// mutated while other threads read it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bag {
    entries: HashMap<String, Value>,
}

/// What a path resolved to
enum Resolved<'a> {
    Root(&'a Bag),
    Value(&'a Value),
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('.').filter(|segment| !segment.is_empty())
}

impl Bag {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Top level keys, in no particular order
    pub fn entries(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Inserts a value directly under a top level key, without path parsing.
    ///
    /// Returns the value previously stored under the key
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    /// True if [`Bag::get`] finds a value at the path.
    ///
    /// A path without segments addresses the bag itself, which is not a
    /// [`Value`] but counts as present.
    pub fn has(&self, path: &str) -> bool {
        self.get(path).is_some() || segments(path).next().is_none()
    }

    /// Returns the value stored at the path.
    ///
    /// `None` if a segment is missing, if an intermediate value is not a bag,
    /// or if the path addresses the root bag.
    pub fn get(&self, path: &str) -> Option<&Value> {
        match self.resolve(path)? {
            Resolved::Value(value) => Some(value),
            Resolved::Root(_) => None,
        }
    }

    /// Returns a copy of the value at the path, or the default
    pub fn get_or(&self, path: &str, default: impl Into<Value>) -> Value {
        match self.get(path) {
            Some(value) => value.clone(),
            None => default.into(),
        }
    }

    /// Returns the nested bag at the path. An empty path yields this bag
    pub fn bag(&self, path: &str) -> Option<&Bag> {
        match self.resolve(path)? {
            Resolved::Root(bag) => Some(bag),
            Resolved::Value(value) => value.as_bag(),
        }
    }

    pub fn bag_or(&self, path: &str, default: Bag) -> Bag {
        self.bag(path).cloned().unwrap_or(default)
    }

    /// Borrows the string stored at the path
    pub fn str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    pub fn string(&self, path: &str) -> String {
        self.string_or(path, "")
    }

    pub fn string_or(&self, path: &str, default: &str) -> String {
        self.str(path).unwrap_or(default).to_owned()
    }

    pub fn duration(&self, path: &str) -> Duration {
        self.duration_or(path, Duration::ZERO)
    }

    /// Reads a duration.
    ///
    /// Plain integers (`isize`, `i64`, `usize`, `u64`) are read as milliseconds.
    /// Negative integers fall back to the default.
    pub fn duration_or(&self, path: &str, default: Duration) -> Duration {
        let millis = match self.get(path) {
            Some(Value::Duration(duration)) => return *duration,
            Some(Value::Isize(millis)) => u64::try_from(*millis).ok(),
            Some(Value::I64(millis)) => u64::try_from(*millis).ok(),
            Some(Value::Usize(millis)) => u64::try_from(*millis).ok(),
            Some(Value::U64(millis)) => Some(*millis),
            _ => None,
        };

        millis.map_or(default, Duration::from_millis)
    }

    pub fn sequence(&self, path: &str) -> Vec<Value> {
        self.sequence_or(path, Vec::new())
    }

    pub fn sequence_or(&self, path: &str, default: Vec<Value>) -> Vec<Value> {
        match self.get(path) {
            Some(Value::Sequence(values)) => values.clone(),
            _ => default,
        }
    }

    pub fn string_sequence(&self, path: &str) -> Vec<String> {
        self.string_sequence_or(path, Vec::new())
    }

    /// Reads a sequence where every element is a string
    pub fn string_sequence_or(&self, path: &str, default: Vec<String>) -> Vec<String> {
        let Some(Value::Sequence(values)) = self.get(path) else {
            return default;
        };

        values
            .iter()
            .map(|value| value.as_str().map(str::to_owned))
            .collect::<Option<Vec<_>>>()
            .unwrap_or(default)
    }

    pub fn string_map(&self, path: &str) -> HashMap<String, String> {
        self.string_map_or(path, HashMap::new())
    }

    /// Reads a nested bag where every value is a string
    pub fn string_map_or(
        &self,
        path: &str,
        default: HashMap<String, String>,
    ) -> HashMap<String, String> {
        let Some(bag) = self.bag(path) else {
            return default;
        };

        bag.iter()
            .map(|(key, value)| Some((key.to_owned(), value.as_str()?.to_owned())))
            .collect::<Option<HashMap<_, _>>>()
            .unwrap_or(default)
    }

    /// Stores a value at the path.
    ///
    /// Missing intermediate segments, and intermediate segments holding
    /// anything other than a bag, are replaced by empty bags.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) -> Result<(), ConfigError> {
        let parts: Vec<&str> = segments(path).collect();
        if parts.is_empty() {
            return Err(ConfigError::InvalidPath(path.to_owned()));
        }
        self.assign(&parts, value.into());

        Ok(())
    }

    /// Deep merges `src` into this bag.
    ///
    /// Keys holding a bag on both sides are merged recursively, every other
    /// value of `src` replaces the local one. Sequences are replaced, never
    /// merged element-wise.
    pub fn merge(&mut self, src: &Bag) -> &mut Self {
        for (key, value) in &src.entries {
            if let (Some(Value::Bag(local)), Value::Bag(incoming)) =
                (self.entries.get_mut(key), value)
            {
                local.merge(incoming);
                continue;
            }

            self.entries.insert(key.clone(), value.clone());
        }

        self
    }

    fn resolve(&self, path: &str) -> Option<Resolved<'_>> {
        let mut current = Resolved::Root(self);
        for segment in segments(path) {
            let bag = match current {
                Resolved::Root(bag) => bag,
                Resolved::Value(value) => value.as_bag()?,
            };
            current = Resolved::Value(bag.entries.get(segment)?);
        }

        Some(current)
    }

    /// Stores `value` under `parts`, creating or replacing intermediate bags
    fn assign(&mut self, parts: &[&str], value: Value) {
        let Some((&key, rest)) = parts.split_first() else {
            return;
        };
        if rest.is_empty() {
            self.entries.insert(key.to_owned(), value);
            return;
        }

        if let Some(Value::Bag(child)) = self.entries.get_mut(key) {
            child.assign(rest, value);
            return;
        }
        if self.entries.contains_key(key) {
            tracing::trace!("Replacing the value at '{}' with an empty bag", key);
        }

        let mut child = Bag::new();
        child.assign(rest, value);
        self.entries.insert(key.to_owned(), Value::Bag(child));
    }
}

macro_rules! scalar_accessors {
    ($($name:ident, $name_or:ident => $variant:ident($ty:ty);)*) => {
        impl Bag {
            $(
                #[doc = concat!("Reads a `", stringify!($ty), "`, or its zero value")]
                pub fn $name(&self, path: &str) -> $ty {
                    self.$name_or(path, <$ty>::default())
                }

                #[doc = concat!("Reads a `", stringify!($ty), "`, or the default on absence or type mismatch")]
                pub fn $name_or(&self, path: &str, default: $ty) -> $ty {
                    match self.get(path) {
                        Some(Value::$variant(value)) => *value,
                        _ => default,
                    }
                }
            )*
        }
    };
}

scalar_accessors! {
    bool, bool_or => Bool(bool);
    i8, i8_or => I8(i8);
    i16, i16_or => I16(i16);
    i32, i32_or => I32(i32);
    i64, i64_or => I64(i64);
    isize, isize_or => Isize(isize);
    u8, u8_or => U8(u8);
    u16, u16_or => U16(u16);
    u32, u32_or => U32(u32);
    u64, u64_or => U64(u64);
    usize, usize_or => Usize(usize);
    f32, f32_or => F32(f32);
    f64, f64_or => F64(f64);
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Bag {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

impl<K: Into<String>, V: Into<Value>, const N: usize> From<[(K, V); N]> for Bag {
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

/// Builds a [`Bag`] from `key => value` pairs
///
/// ```
/// use wrapp_config::bag;
///
/// let config = bag! {
///     "driver" => "sqlite",
///     "pool" => bag! { "size" => 4_i64 },
/// };
/// assert_eq!(config.i64("pool.size"), 4);
/// ```
#[macro_export]
macro_rules! bag {
    () => {
        $crate::Bag::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut bag = $crate::Bag::new();
        $( bag.insert($key, $value); )+
        bag
    }};
}
