//! Sparse encoding of partial records.
//!
//! A record opts in by implementing [`PartialCodable`], which declares which
//! external key each field is written under. Encoding a [`PartialRecord`] only
//! emits the keys of fields that currently have a value; decoding only sets
//! the fields whose keys appear in the input. Each field's value goes through
//! its own serde implementation, so a field whose type is itself a
//! `PartialRecord<U>` (with `U: PartialCodable`) is encoded sparsely too.
//!
//! Leaf errors are `serde_json::Error`s and are passed through as they are.


use alloc::string::{String, ToString};
use alloc::vec::Vec;

use log::trace;
use serde::de::DeserializeOwned;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::{FieldId, FieldKey, FieldValue, PartialRecord, Record};

/// A record whose partials can be encoded and decoded field by field.
pub trait PartialCodable: Record {
    /// The external key of each field, in the order keys should be written.
    ///
    /// Fields left out of the table are never encoded nor decoded.
    fn coding_keys() -> CodingKeys<Self>;
}

type EncodeFn<R> = fn(&PartialRecord<R>, usize) -> Option<Result<Value, serde_json::Error>>;
type DecodeFn<R> = fn(&mut PartialRecord<R>, usize, &Value) -> Result<(), serde_json::Error>;

struct CodingKey<R> {
    field: FieldId,
    key: &'static str,
    encode: EncodeFn<R>,
    decode: DecodeFn<R>,
}

/// Ordered table of `(field, external key)` pairs for record `R`.
///
/// ```rust
/// # use partwise_core::{CodingKeys, PartialCodable, record};
/// record! {
///     #[derive(Debug, Clone, PartialEq)]
///     pub struct Point {
///         required X => pub x: i64,
///         required Y => pub y: i64,
///     }
/// }
///
/// impl PartialCodable for Point {
///     fn coding_keys() -> CodingKeys<Self> {
///         CodingKeys::new().key(Point::X, "x").key(Point::Y, "y")
///     }
/// }
/// ```
pub struct CodingKeys<R> {
    entries: Vec<CodingKey<R>>,
}

impl<R: Record> CodingKeys<R> {
    /// Creates an empty table
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Writes the field behind `field` under `key`.
    ///
    /// # Panics
    ///
    /// Panics if the field or the key already appear in the table.
    pub fn key<V>(mut self, field: FieldKey<R, V>, key: &'static str) -> Self
    where
        V: FieldValue + Serialize + DeserializeOwned,
    {
        let id = field.id();
        assert!(
            self.field_for(key).is_none(),
            "{}: external key `{key}` is declared twice",
            R::SHAPE
        );
        assert!(
            self.key_for(id).is_none(),
            "{id} is given two external keys"
        );
        self.entries.push(CodingKey {
            field: id,
            key,
            encode: encode_field::<R, V>,
            decode: decode_field::<R, V>,
        });
        self
    }

    /// `(field, external key)` pairs, in declared order
    pub fn iter(&self) -> impl Iterator<Item = (FieldId, &'static str)> + '_ {
        self.entries.iter().map(|entry| (entry.field, entry.key))
    }

    /// Number of fields in the table
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the table has no fields
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The external key `field` is written under
    pub fn key_for(&self, field: FieldId) -> Option<&'static str> {
        self.iter()
            .find(|(id, _)| *id == field)
            .map(|(_, key)| key)
    }

    /// The field written under the external key `key`
    pub fn field_for(&self, key: &str) -> Option<FieldId> {
        self.iter().find(|(_, k)| *k == key).map(|(id, _)| id)
    }

    /// Encodes every present field, in table order.
    ///
    /// Fields without a value produce no entry at all.
    pub fn encode_entries(
        &self,
        partial: &PartialRecord<R>,
    ) -> Result<Vec<(&'static str, Value)>, serde_json::Error> {
        let mut entries = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            if let Some(encoded) = (entry.encode)(partial, entry.field.index()) {
                entries.push((entry.key, encoded?));
            }
        }
        Ok(entries)
    }

    /// Encodes every present field into a keyed map.
    pub fn encode(&self, partial: &PartialRecord<R>) -> Result<Map<String, Value>, serde_json::Error> {
        Ok(self
            .encode_entries(partial)?
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect())
    }

    /// Decodes a partial from a keyed map.
    ///
    /// A key that is absent leaves its field unset. A key holding `null`
    /// sets an optional field to `None`, and leaves a required field unset.
    /// Keys that are not in the table are ignored.
    pub fn decode(&self, map: &Map<String, Value>) -> Result<PartialRecord<R>, serde_json::Error> {
        let mut partial = PartialRecord::new();
        for entry in &self.entries {
            if let Some(value) = map.get(entry.key) {
                (entry.decode)(&mut partial, entry.field.index(), value)?;
            }
        }
        Ok(partial)
    }
}

impl<R: Record> Default for CodingKeys<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> core::fmt::Debug for CodingKeys<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|entry| (entry.field, entry.key)))
            .finish()
    }
}

fn encode_field<R, V>(
    partial: &PartialRecord<R>,
    index: usize,
) -> Option<Result<Value, serde_json::Error>>
where
    R: Record,
    V: FieldValue + Serialize,
{
    let value = partial.value(FieldKey::<R, V>::new(index)).ok()?;
    Some(serde_json::to_value(value))
}

fn decode_field<R, V>(
    partial: &mut PartialRecord<R>,
    index: usize,
    value: &Value,
) -> Result<(), serde_json::Error>
where
    R: Record,
    V: FieldValue + DeserializeOwned,
{
    let key = FieldKey::<R, V>::new(index);
    if value.is_null() && !key.field().is_optional() {
        trace!("{:?}: null for a required field, leaving it unset", key);
        return Ok(());
    }
    let decoded = V::deserialize(value)?;
    partial.set(key, decoded);
    Ok(())
}

impl<R: PartialCodable> Serialize for PartialRecord<R> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let entries = R::coding_keys()
            .encode_entries(self)
            .map_err(serde::ser::Error::custom)?;
        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (key, value) in &entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de, R: PartialCodable> Deserialize<'de> for PartialRecord<R> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        R::coding_keys()
            .decode(&map)
            .map_err(serde::de::Error::custom)
    }
}
