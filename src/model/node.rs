//! Node in the relationship chart.

use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use super::{CharacterData, RelationshipKey};

/// Label shared by every phantom node.
pub const PHANTOM_LABEL: &str = "unknown parent";

/// Process-wide sequence for phantom identifiers.
static NEXT_PHANTOM_ID: AtomicU64 = AtomicU64::new(1);

/// Node identifier. Real nodes reuse the entity id from the dataset.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh phantom identifier, never handed out twice in this process.
    pub fn next_phantom() -> Self {
        Self(format!("phantom_{}", NEXT_PHANTOM_ID.fetch_add(1, Ordering::Relaxed)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A character (or an unknown parent standing in for one) in the chart.
///
/// Real nodes borrow their [`CharacterData`] from the builder input, which ties
/// the chart's lifetime to that input.
#[derive(Debug, Clone)]
pub struct CharacterNode<'a> {
    pub id: NodeId,
    pub label: String,
    pub is_phantom: bool,
    pub parent_ids: BTreeSet<NodeId>,
    pub child_ids: BTreeSet<NodeId>,
    /// (status, kind) → targets.
    pub relationships: BTreeMap<RelationshipKey, BTreeSet<NodeId>>,
    pub character_data: Option<&'a CharacterData>,
}

impl<'a> CharacterNode<'a> {
    pub fn new(id: impl Into<NodeId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            is_phantom: false,
            parent_ids: BTreeSet::new(),
            child_ids: BTreeSet::new(),
            relationships: BTreeMap::new(),
            character_data: None,
        }
    }

    /// A node for a consolidated entity record.
    pub fn from_character(data: &'a CharacterData) -> Self {
        let mut node = Self::new(data.id.clone(), data.name.clone());
        node.character_data = Some(data);
        node
    }

    /// A placeholder parent with a freshly generated id.
    pub fn phantom() -> Self {
        let mut node = Self::new(NodeId::next_phantom(), PHANTOM_LABEL);
        node.is_phantom = true;
        node
    }

    pub fn with_child(mut self, id: impl Into<NodeId>) -> Self {
        self.child_ids.insert(id.into());
        self
    }

    pub fn with_parent(mut self, id: impl Into<NodeId>) -> Self {
        self.parent_ids.insert(id.into());
        self
    }

    pub fn with_relationship(mut self, key: RelationshipKey, target: impl Into<NodeId>) -> Self {
        self.relationships.entry(key).or_default().insert(target.into());
        self
    }

    /// Targets recorded under `key`, if any.
    pub fn relationship_targets(&self, key: &RelationshipKey) -> Option<&BTreeSet<NodeId>> {
        self.relationships.get(key).filter(|targets| !targets.is_empty())
    }

    /// Whether any relationship of `key` points at `target`.
    pub fn has_relationship(&self, key: &RelationshipKey, target: &str) -> bool {
        self.relationships.get(key).is_some_and(|targets| targets.contains(target))
    }

    /// Every id this node references through any edge.
    pub fn referenced_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.parent_ids
            .iter()
            .chain(self.child_ids.iter())
            .chain(self.relationships.values().flatten())
    }
}

impl PartialEq for CharacterNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CharacterNode<'_> {}
