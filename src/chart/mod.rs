//! # Relationship Chart
//!
//! The in-memory graph of characters: node store plus the primitive edge
//! mutators. Graph-wide passes live in submodules:
//!
//! | Module | Provides |
//! |--------|----------|
//! | `normalize` | `remove_redundant_phantoms`, `remove_dead_edges`, `ensure_everything_mutual`, `postprocess` |
//! | `resolve` | `clean_relationships` |
//! | `filter` | `filter_relationships`, `trim`, `apply_filter_params` |
//! | `build` | `RelationshipChart::build` from character records |
//!
//! ## Consistency
//!
//! Every mutator here validates its arguments before touching any node, so a
//! failed call leaves the chart as it was. Edges are kept mutual by the
//! mutators; bulk edits that bypass them are repaired by `postprocess`.
//!
//! A chart is a single-writer structure: all mutation goes through `&mut self`.

pub mod normalize;
pub mod resolve;
pub mod filter;
pub mod build;

use std::collections::{BTreeMap, BTreeSet};

use hashbrown::HashMap;
use tracing::debug;

use crate::model::*;
use crate::{Error, Result};

pub use build::{AttributeRules, EdgeAction, EdgeRule, KindSource, TagPattern};
pub use filter::RelationshipFilter;

// ============================================================================
// RelationshipChart
// ============================================================================

/// A set of characters and the family and relationship edges between them.
///
/// Nodes are kept sorted by id, so every pass visits them in the same order.
#[derive(Debug, Clone, Default)]
pub struct RelationshipChart<'a> {
    nodes: BTreeMap<NodeId, CharacterNode<'a>>,
}

/// A relationship edge as seen from `source`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationshipEdge<'c> {
    pub source: &'c NodeId,
    pub target: &'c NodeId,
    pub key: &'c RelationshipKey,
}

/// Optional constraints for [`RelationshipChart::iter_relationships`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RelationshipQuery<'q> {
    pub source: Option<&'q str>,
    pub target: Option<&'q str>,
    pub status: Option<RelationshipStatus>,
    pub kind: Option<&'q str>,
}

impl<'q> RelationshipQuery<'q> {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn from_source(source: &'q str) -> Self {
        Self { source: Some(source), ..Self::default() }
    }

    pub fn to_target(target: &'q str) -> Self {
        Self { target: Some(target), ..Self::default() }
    }

    fn matches_key(&self, key: &RelationshipKey) -> bool {
        self.status.is_none_or(|status| status == key.status)
            && self.kind.is_none_or(|kind| kind == key.kind)
    }
}

impl<'a> RelationshipChart<'a> {
    pub fn new() -> Self {
        Self { nodes: BTreeMap::new() }
    }

    /// Build a chart from ready-made nodes. Edges are taken as given; run
    /// [`postprocess`](Self::postprocess) if they may be one-sided.
    pub fn from_nodes(nodes: impl IntoIterator<Item = CharacterNode<'a>>) -> Result<Self> {
        let mut chart = Self::new();
        for node in nodes {
            chart.add_node(node)?;
        }
        Ok(chart)
    }

    // ========================================================================
    // Node store
    // ========================================================================

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// All nodes, in id order.
    pub fn iter(&self) -> impl Iterator<Item = &CharacterNode<'a>> {
        self.nodes.values()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.keys()
    }

    pub fn phantom_count(&self) -> usize {
        self.nodes.values().filter(|node| node.is_phantom).count()
    }

    pub fn get_node(&self, id: &str) -> Result<&CharacterNode<'a>> {
        self.nodes.get(id).ok_or_else(|| Error::MissingNode(id.into()))
    }

    pub fn get_node_mut(&mut self, id: &str) -> Result<&mut CharacterNode<'a>> {
        self.nodes.get_mut(id).ok_or_else(|| Error::MissingNode(id.into()))
    }

    pub fn add_node(&mut self, node: CharacterNode<'a>) -> Result<()> {
        if self.nodes.contains_key(&node.id) {
            return Err(Error::DuplicateId(node.id));
        }
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    /// Insert a new phantom node and return its id.
    ///
    /// Ids already taken by a node in the chart (a dataset entity may be
    /// named like a phantom) are skipped.
    pub fn create_phantom_node(&mut self) -> Result<NodeId> {
        let mut node = CharacterNode::phantom();
        while self.nodes.contains_key(&node.id) {
            node.id = NodeId::next_phantom();
        }
        let id = node.id.clone();
        self.add_node(node)?;
        debug!(phantom = %id, "created phantom parent");
        Ok(id)
    }

    /// Remove a node and return it.
    ///
    /// With `clear_relations` every reference to it is removed from the other
    /// nodes right away. Without it the references are left dangling for a
    /// later [`remove_dead_edges`](Self::remove_dead_edges) sweep.
    pub fn remove_node(&mut self, id: &str, clear_relations: bool) -> Result<CharacterNode<'a>> {
        let node = self.nodes.remove(id).ok_or_else(|| Error::MissingNode(id.into()))?;

        if clear_relations {
            for child_id in &node.child_ids {
                if let Some(child) = self.nodes.get_mut(child_id) {
                    child.parent_ids.remove(id);
                }
            }
            for parent_id in &node.parent_ids {
                if let Some(parent) = self.nodes.get_mut(parent_id) {
                    parent.child_ids.remove(id);
                }
            }
            // Relationship edges may still be one-sided here, so scan every
            // node rather than only the removed node's targets.
            for other in self.nodes.values_mut() {
                other.relationships.retain(|_, targets| {
                    targets.remove(id);
                    !targets.is_empty()
                });
            }
        }

        Ok(node)
    }

    // ========================================================================
    // Derived lookups
    // ========================================================================

    /// Children of `node` that are present in the chart.
    pub fn children<'s>(&'s self, node: &'s CharacterNode<'a>) -> impl Iterator<Item = &'s CharacterNode<'a>> {
        node.child_ids.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Parents of `node` that are present in the chart.
    pub fn parents<'s>(&'s self, node: &'s CharacterNode<'a>) -> impl Iterator<Item = &'s CharacterNode<'a>> {
        node.parent_ids.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Every other child of any of `node`'s parents, each once.
    pub fn siblings<'s>(&'s self, node: &'s CharacterNode<'a>) -> Vec<&'s CharacterNode<'a>> {
        let mut seen = BTreeSet::new();
        let mut res = Vec::new();
        for parent in self.parents(node) {
            for sibling in self.children(parent) {
                if sibling.id != node.id && seen.insert(&sibling.id) {
                    res.push(sibling);
                }
            }
        }
        res
    }

    /// Relationship edges matching `query`, one per (source, key, target).
    pub fn iter_relationships<'s>(
        &'s self,
        query: RelationshipQuery<'s>,
    ) -> impl Iterator<Item = RelationshipEdge<'s>> {
        self.nodes
            .values()
            .filter(move |node| query.source.is_none_or(|source| node.id.as_str() == source))
            .flat_map(move |node| {
                node.relationships
                    .iter()
                    .filter(move |(key, _)| query.matches_key(key))
                    .flat_map(move |(key, targets)| {
                        targets
                            .iter()
                            .filter(move |target| query.target.is_none_or(|want| target.as_str() == want))
                            .map(move |target| RelationshipEdge { source: &node.id, target, key })
                    })
            })
    }

    /// Label → every node carrying it. Labels are not unique.
    pub fn label_lookup(&self) -> HashMap<&str, Vec<&CharacterNode<'a>>> {
        let mut res: HashMap<&str, Vec<&CharacterNode<'a>>> = HashMap::new();
        for node in self.nodes.values() {
            res.entry(node.label.as_str()).or_default().push(node);
        }
        res
    }

    /// Short entity id → node, for real nodes only.
    pub fn short_id_lookup(&self) -> HashMap<&str, &CharacterNode<'a>> {
        self.nodes
            .values()
            .filter_map(|node| node.character_data.map(|data| (data.short_id(), node)))
            .collect()
    }

    // ========================================================================
    // Edge operations
    // ========================================================================

    /// Add a mutual parent → child edge.
    ///
    /// With `handle_phantoms`, phantom parents of the child whose children are
    /// all already children of `parent_id` are removed: the real parent now
    /// accounts for them.
    pub fn add_child(&mut self, parent_id: &str, child_id: &str, handle_phantoms: bool) -> Result<()> {
        ensure_distinct(parent_id, child_id)?;
        self.get_node(parent_id)?;
        self.get_node(child_id)?;

        self.link_child(parent_id, child_id);

        if handle_phantoms {
            let redundant: Vec<NodeId> = {
                let parent = self.get_node(parent_id)?;
                let child = self.get_node(child_id)?;
                self.parents(child)
                    .filter(|other| {
                        other.is_phantom
                            && other.id != parent.id
                            && other.child_ids.is_subset(&parent.child_ids)
                    })
                    .map(|other| other.id.clone())
                    .collect()
            };
            for phantom_id in redundant {
                debug!(phantom = %phantom_id, parent = parent_id, "phantom parent subsumed");
                self.remove_node(phantom_id.as_str(), true)?;
            }
        }
        Ok(())
    }

    /// Remove the parent → child edge from both ends.
    pub fn remove_child(&mut self, parent_id: &str, child_id: &str) -> Result<()> {
        ensure_distinct(parent_id, child_id)?;
        self.get_node(parent_id)?;
        self.get_node(child_id)?;

        if let Some(parent) = self.nodes.get_mut(parent_id) {
            parent.child_ids.remove(child_id);
        }
        if let Some(child) = self.nodes.get_mut(child_id) {
            child.parent_ids.remove(parent_id);
        }
        Ok(())
    }

    /// Record `first` and `second` as siblings.
    ///
    /// No-op if they already share a parent. Otherwise a phantom parent is
    /// created for both and its id returned.
    pub fn add_sibling(&mut self, first_id: &str, second_id: &str) -> Result<Option<NodeId>> {
        ensure_distinct(first_id, second_id)?;
        let first = self.get_node(first_id)?;
        let second = self.get_node(second_id)?;

        if !first.parent_ids.is_disjoint(&second.parent_ids) {
            return Ok(None);
        }

        let phantom_id = self.create_phantom_node()?;
        self.add_child(phantom_id.as_str(), first_id, false)?;
        self.add_child(phantom_id.as_str(), second_id, false)?;
        Ok(Some(phantom_id))
    }

    pub fn add_relationship(
        &mut self,
        first_id: &str,
        second_id: &str,
        status: RelationshipStatus,
        kind: &str,
    ) -> Result<()> {
        ensure_distinct(first_id, second_id)?;
        if kind == WILDCARD_KIND {
            return Err(Error::InvalidData(format!(
                "wildcard kind cannot be stored between {first_id} and {second_id}"
            )));
        }
        self.get_node(first_id)?;
        self.get_node(second_id)?;

        let key = RelationshipKey::new(status, kind);
        self.link_relationship(first_id, &key, second_id);
        self.link_relationship(second_id, &key, first_id);
        Ok(())
    }

    pub fn remove_relationship(
        &mut self,
        first_id: &str,
        second_id: &str,
        status: RelationshipStatus,
        kind: &str,
    ) -> Result<()> {
        ensure_distinct(first_id, second_id)?;
        self.get_node(first_id)?;
        self.get_node(second_id)?;

        let key = RelationshipKey::new(status, kind);
        self.unlink_relationship(first_id, &key, second_id);
        self.unlink_relationship(second_id, &key, first_id);
        Ok(())
    }

    // ========================================================================
    // One-sided primitives (callers guarantee existence)
    // ========================================================================

    fn link_child(&mut self, parent_id: &str, child_id: &str) {
        if let Some(parent) = self.nodes.get_mut(parent_id) {
            parent.child_ids.insert(child_id.into());
        }
        if let Some(child) = self.nodes.get_mut(child_id) {
            child.parent_ids.insert(parent_id.into());
        }
    }

    fn link_relationship(&mut self, owner_id: &str, key: &RelationshipKey, target_id: &str) {
        if let Some(owner) = self.nodes.get_mut(owner_id) {
            owner.relationships.entry(key.clone()).or_default().insert(target_id.into());
        }
    }

    fn unlink_relationship(&mut self, owner_id: &str, key: &RelationshipKey, target_id: &str) {
        if let Some(owner) = self.nodes.get_mut(owner_id) {
            if let Some(targets) = owner.relationships.get_mut(key) {
                targets.remove(target_id);
                if targets.is_empty() {
                    owner.relationships.remove(key);
                }
            }
        }
    }
}

impl<'c, 'a> IntoIterator for &'c RelationshipChart<'a> {
    type Item = &'c CharacterNode<'a>;
    type IntoIter = std::collections::btree_map::Values<'c, NodeId, CharacterNode<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.values()
    }
}

fn ensure_distinct(first_id: &str, second_id: &str) -> Result<()> {
    if first_id == second_id {
        return Err(Error::SelfReference(first_id.into()));
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
