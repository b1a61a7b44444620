//! Consolidated character records and their aspects.
//!
//! An aspect is a tagged fact about a character as the game stores it:
//! `"parentOf|<id>"`, `"lockedRelationship|rival|<id>"`, `"male"`, ... The part
//! before the first `|` is the title, the rest are positional payload fields.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Positional payload of an aspect. Nearly always one or two fields.
pub type AspectData = SmallVec<[String; 2]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharacterGender {
    Male,
    Female,
    Nonbinary,
    Unknown,
}

impl CharacterGender {
    fn from_title(title: &str) -> Option<Self> {
        match title {
            "male" => Some(CharacterGender::Male),
            "female" => Some(CharacterGender::Female),
            "nonbinary" => Some(CharacterGender::Nonbinary),
            _ => None,
        }
    }
}

/// A single aspect of a character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterAspect {
    pub title: String,
    pub data: AspectData,
    pub value: f64,
    /// Came from the character's legacy history rather than current status.
    pub is_legacy: bool,
    /// Only present in an older snapshot.
    pub is_past: bool,
    /// 0 for the latest snapshot, counting up into the past.
    pub snapshot_id: Option<usize>,
}

impl CharacterAspect {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            data: AspectData::new(),
            value: 0.0,
            is_legacy: false,
            is_past: false,
            snapshot_id: None,
        }
    }

    /// Split a raw `title|field|field` aspect string.
    pub fn parse(aspect: &str, value: Option<f64>) -> Self {
        let mut parts = aspect.split('|');
        let mut res = Self::new(parts.next().unwrap_or_default());
        res.data = parts.map(str::to_string).collect();
        if let Some(value) = value {
            res.value = value;
        }
        res
    }

    pub fn with_data(mut self, data: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.data = data.into_iter().map(Into::into).collect();
        self
    }

    pub fn field(&self, idx: usize) -> Option<&str> {
        self.data.get(idx).map(String::as_str)
    }

    /// Same title and payload, ignoring value and provenance.
    pub fn same_fact(&self, other: &CharacterAspect) -> bool {
        self.title == other.title && self.data == other.data
    }
}

/// Consolidated information about a single character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterData {
    pub id: String,
    pub name: String,
    pub aspects: Vec<CharacterAspect>,
}

impl CharacterData {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into(), aspects: Vec::new() }
    }

    pub fn with_aspect(mut self, aspect: CharacterAspect) -> Self {
        self.aspects.push(aspect);
        self
    }

    /// First `-`-separated segment of the id, as shown in game logs.
    pub fn short_id(&self) -> &str {
        self.id.split('-').next().unwrap_or(&self.id)
    }

    pub fn gender(&self) -> CharacterGender {
        self.iter_aspects(None, Some(true))
            .find_map(|aspect| CharacterGender::from_title(&aspect.title))
            .unwrap_or(CharacterGender::Unknown)
    }

    /// Aspects filtered by provenance. `None` disables a filter; `present`
    /// selects aspects whose `is_past` is the opposite.
    pub fn iter_aspects(
        &self,
        legacy: Option<bool>,
        present: Option<bool>,
    ) -> impl Iterator<Item = &CharacterAspect> {
        self.aspects.iter().filter(move |aspect| {
            legacy.is_none_or(|legacy| legacy == aspect.is_legacy)
                && present.is_none_or(|present| present != aspect.is_past)
        })
    }
}
