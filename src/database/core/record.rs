//! Ordered records
//!
//! A [`Record`] is an ordered set of named values. The order of the first record
//! written to a table decides the order of its columns.

use anyhow::{anyhow, Result};
use serde::ser::{Serialize, SerializeMap, Serializer};

use super::value::Value;

/// One row of named values, in insertion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named value (builder style)
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Set a named value, replacing an existing field of the same name in place
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|(n, _)| n == name)
    }

    /// Column names in order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Build records from a JSON object or an array of JSON objects
    pub fn from_json(json: serde_json::Value) -> Result<Vec<Record>> {
        match json {
            serde_json::Value::Object(map) => Ok(vec![map.into_iter().collect()]),
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    serde_json::Value::Object(map) => Ok(map.into_iter().collect()),
                    other => Err(anyhow!("Expected a JSON object, got: {}", other)),
                })
                .collect(),
            other => Err(anyhow!(
                "Expected a JSON object or array of objects, got: {}",
                other
            )),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Data accepted by a save: a single record or a batch of them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Records(pub Vec<Record>);

impl From<Record> for Records {
    fn from(record: Record) -> Self {
        Records(vec![record])
    }
}

impl From<Vec<Record>> for Records {
    fn from(records: Vec<Record>) -> Self {
        Records(records)
    }
}

impl From<&[Record]> for Records {
    fn from(records: &[Record]) -> Self {
        Records(records.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_replaces_in_place() {
        let mut record = Record::new().with("a", 1).with("b", "x");
        record.insert("a", 2);
        assert_eq!(record.columns().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(record.get("a"), Some(&Value::Integer(2)));
    }

    #[test]
    fn test_from_json_object_and_array() {
        let one = Record::from_json(serde_json::json!({"id": 1, "name": "x"})).unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].get("id"), Some(&Value::Integer(1)));

        let many = Record::from_json(serde_json::json!([{"id": 1}, {"id": 2}])).unwrap();
        assert_eq!(many.len(), 2);

        assert!(Record::from_json(serde_json::json!([1, 2])).is_err());
        assert!(Record::from_json(serde_json::json!("x")).is_err());
    }

    #[test]
    fn test_serialize_keeps_order() {
        let record = Record::new().with("z", 1).with("a", Value::Null);
        assert_eq!(serde_json::to_string(&record).unwrap(), r#"{"z":1,"a":null}"#);
    }
}
