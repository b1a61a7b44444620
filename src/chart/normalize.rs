//! Structural normalization passes.
//!
//! Run in the order of [`RelationshipChart::postprocess`]: a repair of
//! one-sided input, phantom reduction (leaving dangling references behind),
//! then the dead-edge sweep, then mutuality repair.

use std::collections::BTreeSet;

use tracing::debug;

use crate::model::*;
use crate::Result;
use super::RelationshipChart;

impl<'a> RelationshipChart<'a> {
    /// Canonical cleanup after construction or manual edits.
    ///
    /// Edges recorded on one side only are made mutual before phantom
    /// reduction, so a real parent listed only in its own `child_ids` still
    /// subsumes a phantom. A second call changes nothing.
    pub fn postprocess(&mut self) -> Result<()> {
        let mut dead = self.remove_dead_edges();
        let mut repaired = self.ensure_everything_mutual();
        let phantoms = self.remove_redundant_phantoms(false)?;
        dead += self.remove_dead_edges();
        repaired += self.ensure_everything_mutual();
        debug!(phantoms, dead, repaired, nodes = self.len(), "chart postprocessed");
        Ok(())
    }

    /// Remove phantom parents made redundant by other parents and merge
    /// sibling groups that were linked through several phantoms.
    ///
    /// For each phantom, in id order:
    /// - no children: removed;
    /// - another parent of its first child already has all of its children:
    ///   removed (a phantom already marked for removal does not count);
    /// - otherwise the ids common to every child's other phantom parents are
    ///   attached to it, so all of them converge on this phantom.
    ///
    /// Only children still present in the chart are considered, which keeps
    /// the pass correct between a deferred trim and the dead-edge sweep.
    /// Passes repeat until one neither removes nor merges anything. Returns
    /// the number of phantoms removed.
    pub fn remove_redundant_phantoms(&mut self, clear_relations: bool) -> Result<usize> {
        let mut removed = 0;
        loop {
            let (pass_removed, merged) = self.reduce_phantoms_once(clear_relations)?;
            removed += pass_removed;
            if pass_removed == 0 && merged == 0 {
                return Ok(removed);
            }
        }
    }

    /// One reduction pass. Returns (phantoms removed, child links merged).
    fn reduce_phantoms_once(&mut self, clear_relations: bool) -> Result<(usize, usize)> {
        let phantom_ids: Vec<NodeId> = self
            .iter()
            .filter(|node| node.is_phantom)
            .map(|node| node.id.clone())
            .collect();

        let mut marked: BTreeSet<NodeId> = BTreeSet::new();
        let mut merged = 0;
        for phantom_id in &phantom_ids {
            let merge: Vec<NodeId> = {
                let phantom = self.get_node(phantom_id.as_str())?;
                let children: BTreeSet<&NodeId> = self.children(phantom).map(|child| &child.id).collect();

                let Some(first_child) = children.first() else {
                    marked.insert(phantom_id.clone());
                    continue;
                };

                let subsumed = self.parents(self.get_node(first_child.as_str())?).any(|other| {
                    other.id != *phantom_id
                        && !marked.contains(&other.id)
                        && children.iter().all(|id| other.child_ids.contains(*id))
                });
                if subsumed {
                    marked.insert(phantom_id.clone());
                    continue;
                }

                let mut common: Option<BTreeSet<&NodeId>> = None;
                for child_id in &children {
                    let child = self.get_node(child_id.as_str())?;
                    let phantom_siblings: BTreeSet<&NodeId> = self
                        .parents(child)
                        .filter(|other| other.is_phantom && other.id != *phantom_id)
                        .flat_map(|other| other.child_ids.iter())
                        .collect();
                    let narrowed = match common {
                        None => phantom_siblings,
                        Some(prev) => prev.intersection(&phantom_siblings).copied().collect(),
                    };
                    let done = narrowed.is_empty();
                    common = Some(narrowed);
                    if done {
                        break;
                    }
                }

                common
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|id| *id != phantom_id && !children.contains(id) && self.contains(id.as_str()))
                    .cloned()
                    .collect()
            };

            for sibling_id in merge {
                debug!(phantom = %phantom_id, sibling = %sibling_id, "merged sibling into phantom");
                self.link_child(phantom_id.as_str(), sibling_id.as_str());
                merged += 1;
            }
        }

        for phantom_id in &marked {
            self.remove_node(phantom_id.as_str(), clear_relations)?;
        }
        Ok((marked.len(), merged))
    }

    /// Drop every parent, child and relationship reference to a node that is
    /// not in the chart, along with self-references. Returns the number of
    /// references dropped.
    pub fn remove_dead_edges(&mut self) -> usize {
        let universe: BTreeSet<NodeId> = self.node_ids().cloned().collect();
        let mut dropped = 0;

        for node in self.nodes.values_mut() {
            let own_id = node.id.clone();
            let alive = |id: &NodeId| *id != own_id && universe.contains(id);

            let before = node.referenced_ids().count();
            node.parent_ids.retain(alive);
            node.child_ids.retain(alive);
            node.relationships.retain(|_, targets| {
                targets.retain(alive);
                !targets.is_empty()
            });
            dropped += before - node.referenced_ids().count();
        }
        dropped
    }

    /// Add the reverse of every edge that is only recorded on one side.
    /// Returns the number of reverse edges added.
    pub fn ensure_everything_mutual(&mut self) -> usize {
        let mut child_links: Vec<(NodeId, NodeId)> = Vec::new();
        let mut reverse_relationships: Vec<(NodeId, RelationshipKey, NodeId)> = Vec::new();

        for node in self.iter() {
            for child in self.children(node) {
                if !child.parent_ids.contains(&node.id) {
                    child_links.push((node.id.clone(), child.id.clone()));
                }
            }
            for parent in self.parents(node) {
                if !parent.child_ids.contains(&node.id) {
                    child_links.push((parent.id.clone(), node.id.clone()));
                }
            }
            for (key, targets) in &node.relationships {
                for target in targets.iter().filter_map(|id| self.nodes.get(id)) {
                    if !target.has_relationship(key, node.id.as_str()) {
                        reverse_relationships.push((target.id.clone(), key.clone(), node.id.clone()));
                    }
                }
            }
        }

        let repaired = child_links.len() + reverse_relationships.len();
        for (parent_id, child_id) in child_links {
            self.link_child(parent_id.as_str(), child_id.as_str());
        }
        for (owner_id, key, target_id) in reverse_relationships {
            self.link_relationship(owner_id.as_str(), &key, target_id.as_str());
        }
        repaired
    }
}
