//! Relationship filtering and reachability trimming.
//!
//! Every entry point has an in-place form and a copying form; the copying form
//! clones the chart and runs the in-place one on the clone.

use std::collections::{BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::*;
use crate::params::FilterParams;
use crate::Result;
use super::RelationshipChart;

// ============================================================================
// RelationshipFilter
// ============================================================================

/// Allow/deny lists of relationship keys. A key with kind `*` matches every
/// kind under its status. Deny always wins over allow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipFilter {
    pub allow: Option<BTreeSet<RelationshipKey>>,
    pub deny: Option<BTreeSet<RelationshipKey>>,
}

impl RelationshipFilter {
    pub fn new(
        allow: Option<impl IntoIterator<Item = RelationshipKey>>,
        deny: Option<impl IntoIterator<Item = RelationshipKey>>,
    ) -> Self {
        Self {
            allow: allow.map(|keys| keys.into_iter().collect()),
            deny: deny.map(|keys| keys.into_iter().collect()),
        }
    }

    pub fn allowing(keys: impl IntoIterator<Item = RelationshipKey>) -> Self {
        Self { allow: Some(keys.into_iter().collect()), deny: None }
    }

    pub fn denying(keys: impl IntoIterator<Item = RelationshipKey>) -> Self {
        Self { allow: None, deny: Some(keys.into_iter().collect()) }
    }

    /// True when neither list is set; such a filter keeps everything.
    pub fn is_empty(&self) -> bool {
        self.allow.is_none() && self.deny.is_none()
    }

    pub fn keeps(&self, key: &RelationshipKey) -> bool {
        if self.deny.as_ref().is_some_and(|deny| matches_any(deny, key)) {
            return false;
        }
        self.allow.as_ref().is_none_or(|allow| matches_any(allow, key))
    }
}

fn matches_any(keys: &BTreeSet<RelationshipKey>, key: &RelationshipKey) -> bool {
    keys.contains(key) || keys.contains(&key.as_wildcard())
}

// ============================================================================
// Filtering passes
// ============================================================================

impl<'a> RelationshipChart<'a> {
    /// Drop relationship entries the filter does not keep. Returns the number
    /// of (node, key) entries dropped.
    pub fn filter_relationships(&mut self, filter: &RelationshipFilter) -> usize {
        let mut dropped = 0;
        for node in self.nodes.values_mut() {
            let before = node.relationships.len();
            node.relationships.retain(|key, _| filter.keeps(key));
            dropped += before - node.relationships.len();
        }
        debug!(dropped, "filtered relationships");
        dropped
    }

    pub fn filtered_relationships(&self, filter: &RelationshipFilter) -> Self {
        let mut chart = self.clone();
        chart.filter_relationships(filter);
        chart
    }

    /// Keep only the family of `anchor_ids` plus the anchors' direct
    /// relationship targets, never passing through `exclude_ids`.
    ///
    /// `None` anchors means every node. Excluded nodes are removed even when
    /// listed as anchors. Unknown anchors fail with `MissingNode` before
    /// anything is removed; unknown excluded ids are ignored.
    ///
    /// Without `clear_relations` the surviving nodes keep references to
    /// removed ones and phantoms are not reduced; use that only when a
    /// cleanup pass follows. Returns the number of nodes removed.
    pub fn trim(
        &mut self,
        anchor_ids: Option<&[NodeId]>,
        exclude_ids: Option<&[NodeId]>,
        clear_relations: bool,
    ) -> Result<usize> {
        let exclude: BTreeSet<&NodeId> = exclude_ids.unwrap_or_default().iter().collect();
        let anchors: Vec<NodeId> = match anchor_ids {
            Some(ids) => {
                for id in ids {
                    self.get_node(id.as_str())?;
                }
                ids.iter().filter(|id| !exclude.contains(id)).cloned().collect()
            }
            None => self.node_ids().filter(|id| !exclude.contains(id)).cloned().collect(),
        };

        let keep = self.related_nodes(&anchors, &exclude);
        let before = self.len();
        self.nodes.retain(|id, _| keep.contains(id));
        let removed = before - self.len();
        debug!(anchors = anchors.len(), excluded = exclude.len(), removed, "trimmed chart");

        if clear_relations {
            self.remove_redundant_phantoms(false)?;
            self.remove_dead_edges();
        }
        Ok(removed)
    }

    pub fn trimmed(&self, anchor_ids: Option<&[NodeId]>, exclude_ids: Option<&[NodeId]>) -> Result<Self> {
        let mut chart = self.clone();
        chart.trim(anchor_ids, exclude_ids, true)?;
        Ok(chart)
    }

    /// Family closure of `anchors` over parent/child edges plus the anchors'
    /// relationship targets. Worklist based; `exclude` is never entered.
    fn related_nodes(&self, anchors: &[NodeId], exclude: &BTreeSet<&NodeId>) -> BTreeSet<NodeId> {
        let mut visited: BTreeSet<&NodeId> = anchors.iter().collect();
        let mut queue: VecDeque<&NodeId> = visited.iter().copied().collect();

        while let Some(id) = queue.pop_front() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            for next in node.parent_ids.iter().chain(&node.child_ids) {
                if !exclude.contains(next) && visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        for anchor in anchors.iter().filter_map(|id| self.nodes.get(id)) {
            for target in anchor.relationships.values().flatten() {
                if !exclude.contains(target) {
                    visited.insert(target);
                }
            }
        }

        visited.into_iter().cloned().collect()
    }

    /// Apply both filter kinds from `params`, then reduce phantoms and sweep
    /// dangling edges.
    pub fn apply_filter_params(&mut self, params: &FilterParams) -> Result<()> {
        let filter = params.relationship_filter();
        if !filter.is_empty() {
            self.filter_relationships(&filter);
        }

        if params.include_heroes.is_some() || params.exclude_heroes.is_some() {
            self.trim(params.include_heroes.as_deref(), params.exclude_heroes.as_deref(), false)?;
        }

        self.remove_redundant_phantoms(true)?;
        self.remove_dead_edges();
        Ok(())
    }

    pub fn with_filter_params(&self, params: &FilterParams) -> Result<Self> {
        let mut chart = self.clone();
        chart.apply_filter_params(params)?;
        Ok(chart)
    }
}

// ============================================================================
// Tests
// ============================================================================
