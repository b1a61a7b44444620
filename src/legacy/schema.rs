//! Serde schema of `legacy.json`.
//!
//! Only the parts the chart needs are modelled. Entities inside a snapshot
//! are stored by the game as flat `[id, key1, value1, key2, value2, ...]`
//! lists; [`entity_to_map`] turns one into a JSON object.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Entity component marking a snapshot entity as a hero.
pub const INDIVIDUAL_COMPONENT: &str = "individual";

/// Entry type of heroes; other types (monsters, companions, ...) are skipped.
pub const INDIVIDUAL_ENTRY: &str = "INDIVIDUAL";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyFile {
    #[serde(default)]
    pub entries: Vec<LegacyEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdValue {
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyEntry {
    pub id: IdValue,
    #[serde(rename = "type")]
    pub entry_type: String,
    #[serde(default)]
    pub snapshots: Vec<Snapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub date: i64,
    #[serde(default)]
    pub entities: Vec<Vec<Value>>,
}

impl Snapshot {
    /// The flat entity list describing the hero, if the snapshot has one.
    pub fn individual_entity(&self) -> Option<&[Value]> {
        self.entities
            .iter()
            .find(|entity| entity.iter().any(|part| part.as_str() == Some(INDIVIDUAL_COMPONENT)))
            .map(Vec::as_slice)
    }
}

/// Raw aspect entry: `[aspect]`, `[aspect, value]` or
/// `[aspect, {"aspect": ..., "value": ...}]`. Parsed by
/// [`CharacterAspect::from_aspect_data`](crate::CharacterAspect::from_aspect_data).
pub type RawAspect = Vec<Value>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AspectEntries {
    #[serde(default)]
    pub entries: Vec<RawAspect>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndividualStatus {
    pub name: String,
    #[serde(default)]
    pub aspects: AspectEntries,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndividualHistory {
    #[serde(default, rename = "legacyAspects")]
    pub legacy_aspects: Option<AspectEntries>,
}

/// One hero as recorded in one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndividualSnapshot {
    pub id: IdValue,
    pub status: IndividualStatus,
    #[serde(default)]
    pub history: IndividualHistory,
}

impl IndividualSnapshot {
    pub fn from_entity(entity: &[Value]) -> Result<Self> {
        Ok(serde_json::from_value(Value::Object(entity_to_map(entity)?))?)
    }
}

/// `[id, key1, value1, ...]` → `{"id": id, key1: value1, ...}`. Every value
/// must be an object and every key a string.
pub fn entity_to_map(entity: &[Value]) -> Result<Map<String, Value>> {
    let mut res = Map::new();
    for idx in (0..entity.len()).step_by(2) {
        let key = match idx {
            0 => "id",
            _ => entity[idx - 1]
                .as_str()
                .ok_or_else(|| Error::InvalidData(format!("entity key at position {} is not a string", idx - 1)))?,
        };
        let value = &entity[idx];
        if !value.is_object() {
            return Err(Error::InvalidData(format!("entity component '{key}' is not an object")));
        }
        res.insert(key.to_string(), value.clone());
    }
    Ok(res)
}
