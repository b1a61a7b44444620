//! Chart export: a serializable view of a chart plus JSON and DOT writers.
//!
//! ```text
//! RelationshipChart → ChartView::from_chart() → export_json() / export_dot()
//!   → feed to a renderer, or `dot -Tpng`
//! ```
//!
//! Children are grouped into *families* keyed by their full parent set, the
//! way a family tree joins both parents before fanning out to the children.
//! Relationships are mutual, so each one is listed once per pair.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;

use serde::Serialize;

use crate::chart::{RelationshipChart, RelationshipQuery};
use crate::model::*;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeView {
    pub id: NodeId,
    pub label: String,
    pub is_phantom: bool,
    pub gender: CharacterGender,
}

/// Children sharing exactly the same parents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FamilyView {
    pub id: String,
    /// Visible parents; hidden phantoms are left out.
    pub parents: Vec<NodeId>,
    pub children: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationshipView {
    pub source: NodeId,
    pub target: NodeId,
    pub status: RelationshipStatus,
    pub kind: String,
}

/// Everything needed to draw a chart.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartView {
    pub nodes: Vec<NodeView>,
    pub families: Vec<FamilyView>,
    pub relationships: Vec<RelationshipView>,
}

impl ChartView {
    /// Snapshot `chart`. With `hide_phantoms`, phantom nodes and their edges
    /// are left out; their children still form a family.
    pub fn from_chart(chart: &RelationshipChart<'_>, hide_phantoms: bool) -> Self {
        let visible = |id: &NodeId| {
            chart
                .get_node(id.as_str())
                .is_ok_and(|node| !(hide_phantoms && node.is_phantom))
        };

        let nodes = chart
            .iter()
            .filter(|node| visible(&node.id))
            .map(|node| NodeView {
                id: node.id.clone(),
                label: node.label.clone(),
                is_phantom: node.is_phantom,
                gender: node.character_data.map_or(CharacterGender::Unknown, CharacterData::gender),
            })
            .collect();

        let mut grouped: BTreeMap<&BTreeSet<NodeId>, Vec<NodeId>> = BTreeMap::new();
        for node in chart.iter().filter(|node| !node.parent_ids.is_empty() && visible(&node.id)) {
            grouped.entry(&node.parent_ids).or_default().push(node.id.clone());
        }
        let families = grouped
            .into_iter()
            .map(|(parents, children)| FamilyView {
                id: family_id(parents),
                parents: parents.iter().filter(|id| visible(id)).cloned().collect(),
                children,
            })
            .collect();

        let relationships = chart
            .iter_relationships(RelationshipQuery::all())
            .filter(|edge| edge.source < edge.target && visible(edge.source) && visible(edge.target))
            .map(|edge| RelationshipView {
                source: edge.source.clone(),
                target: edge.target.clone(),
                status: edge.key.status,
                kind: edge.key.kind.clone(),
            })
            .collect();

        Self { nodes, families, relationships }
    }

    pub fn export_json(&self, writer: &mut dyn Write) -> Result<()> {
        serde_json::to_writer_pretty(&mut *writer, self)?;
        writeln!(writer)?;
        Ok(())
    }

    /// Write the chart as a Graphviz digraph. No styling is applied beyond
    /// drawing family junctions as points.
    pub fn export_dot(&self, writer: &mut dyn Write) -> Result<()> {
        writeln!(writer, "// legacy-chart export")?;
        writeln!(writer, "// Nodes: {}", self.nodes.len())?;
        writeln!(writer, "// Relationships: {}", self.relationships.len())?;
        writeln!(writer, "digraph legacy {{")?;

        for node in &self.nodes {
            writeln!(writer, "    {} [label={}];", quote(node.id.as_str()), quote(&node.label))?;
        }

        if !self.families.is_empty() {
            writeln!(writer)?;
        }
        for family in &self.families {
            let junction = quote(&family.id);
            writeln!(writer, "    {junction} [shape=point];")?;
            for parent in &family.parents {
                writeln!(writer, "    {} -> {junction};", quote(parent.as_str()))?;
            }
            for child in &family.children {
                writeln!(writer, "    {junction} -> {};", quote(child.as_str()))?;
            }
        }

        if !self.relationships.is_empty() {
            writeln!(writer)?;
        }
        for rel in &self.relationships {
            writeln!(
                writer,
                "    {} -> {} [dir=none, label={}];",
                quote(rel.source.as_str()),
                quote(rel.target.as_str()),
                quote(&format!("{}_{}", rel.status, rel.kind)),
            )?;
        }

        writeln!(writer, "}}")?;
        Ok(())
    }
}

fn family_id(parents: &BTreeSet<NodeId>) -> String {
    let joined: Vec<&str> = parents.iter().map(NodeId::as_str).collect();
    format!("children_{}", joined.join("_"))
}

/// DOT double-quoted string.
fn quote(s: &str) -> String {
    let mut res = String::with_capacity(s.len() + 2);
    res.push('"');
    for c in s.chars() {
        match c {
            '"' | '\\' => {
                res.push('\\');
                res.push(c);
            }
            '\n' => res.push_str("\\n"),
            _ => res.push(c),
        }
    }
    res.push('"');
    res
}
