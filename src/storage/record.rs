use std::collections::HashMap;
use serde::{Deserialize, Serialize};

pub const FIELD_TEMPERATURE: &str = "temperature";
pub const FIELD_HUMIDITY: &str = "humidity";
pub const FIELD_LUMINOSITY: &str = "luminosity";
pub const FIELD_TIMESTAMP: &str = "timestamp";

/// Fields every ingest payload must carry, in the order they are checked.
pub const REQUIRED_FIELDS: [&str; 4] = [
    FIELD_TEMPERATURE,
    FIELD_HUMIDITY,
    FIELD_LUMINOSITY,
    FIELD_TIMESTAMP,
];

/// A validated sensor reading that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    pub temperature: String,
    pub humidity: String,
    pub luminosity: String,
    pub timestamp: String,
}

/// A stored sensor reading. `id` doubles as the store key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub temperature: String,
    pub humidity: String,
    pub luminosity: String,
    pub timestamp: String,
}

impl Reading {
    pub fn into_record(self, id: String) -> Record {
        Record {
            id,
            temperature: self.temperature,
            humidity: self.humidity,
            luminosity: self.luminosity,
            timestamp: self.timestamp,
        }
    }
}

impl Record {
    /// Build a record from a stored field map. Absent fields read as empty.
    pub fn from_fields(key: &str, mut fields: HashMap<String, String>) -> Self {
        let mut take = |name: &str| fields.remove(name).unwrap_or_default();
        Self {
            id: key.to_string(),
            temperature: take(FIELD_TEMPERATURE),
            humidity: take(FIELD_HUMIDITY),
            luminosity: take(FIELD_LUMINOSITY),
            timestamp: take(FIELD_TIMESTAMP),
        }
    }

    /// The field/value pairs written to the store. The id is the key, not a field.
    pub fn fields(&self) -> [(&'static str, &str); 4] {
        [
            (FIELD_TEMPERATURE, self.temperature.as_str()),
            (FIELD_HUMIDITY, self.humidity.as_str()),
            (FIELD_LUMINOSITY, self.luminosity.as_str()),
            (FIELD_TIMESTAMP, self.timestamp.as_str()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_read_as_empty() {
        let mut fields = HashMap::new();
        fields.insert("temperature".to_string(), "21.5".to_string());
        fields.insert("unrelated".to_string(), "x".to_string());

        let record = Record::from_fields("7", fields);
        assert_eq!(record.id, "7");
        assert_eq!(record.temperature, "21.5");
        assert_eq!(record.humidity, "");
        assert_eq!(record.timestamp, "");
    }

    #[test]
    fn fields_exclude_id() {
        let record = Reading {
            temperature: "1".into(),
            humidity: "2".into(),
            luminosity: "3".into(),
            timestamp: "01-01-2024 00:00:00".into(),
        }
        .into_record("42".into());

        let names: Vec<&str> = record.fields().iter().map(|(k, _)| *k).collect();
        assert_eq!(names, REQUIRED_FIELDS.to_vec());
        assert!(record.fields().iter().all(|(_, v)| *v != "42"));
    }
}
