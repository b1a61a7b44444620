//! Relationship conflict resolution.

use hashbrown::HashMap;
use tracing::debug;

use crate::model::*;
use crate::Result;
use super::{RelationshipChart, RelationshipQuery};

impl<'a> RelationshipChart<'a> {
    /// Keep only the strongest status per relationship kind for every pair.
    ///
    /// A character can have been a past rival of someone and later become a
    /// locked rival again; only the locked entry is kept. Returns the number of
    /// (symmetric) relationships removed.
    pub fn clean_relationships(&mut self) -> Result<usize> {
        // (sorted pair, kind) → (weakest, strongest) status seen
        let mut seen: HashMap<(&NodeId, &NodeId, &str), (RelationshipStatus, RelationshipStatus)> = HashMap::new();
        for edge in self.iter_relationships(RelationshipQuery::all()) {
            let (first, second) = if edge.source <= edge.target {
                (edge.source, edge.target)
            } else {
                (edge.target, edge.source)
            };
            let status = edge.key.status;
            seen.entry((first, second, edge.key.kind.as_str()))
                .and_modify(|(weakest, strongest)| {
                    *weakest = (*weakest).min(status);
                    *strongest = (*strongest).max(status);
                })
                .or_insert((status, status));
        }

        let weaker: Vec<(NodeId, NodeId, RelationshipKey)> = seen
            .into_iter()
            .filter(|(_, (weakest, strongest))| weakest < strongest)
            .map(|((first, second, kind), (weakest, _))| {
                (first.clone(), second.clone(), RelationshipKey::new(weakest, kind))
            })
            .collect();

        for (first, second, key) in &weaker {
            debug!(%first, %second, kind = %key.kind, "dropped weaker relationship status");
            self.remove_relationship(first.as_str(), second.as_str(), key.status, &key.kind)?;
        }
        Ok(weaker.len())
    }

    /// [`clean_relationships`](Self::clean_relationships) on a copy.
    pub fn cleaned_relationships(&self) -> Result<Self> {
        let mut chart = self.clone();
        chart.clean_relationships()?;
        Ok(chart)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart(ids: &[&str]) -> RelationshipChart<'static> {
        RelationshipChart::from_nodes(ids.iter().map(|id| CharacterNode::new(*id, *id))).unwrap()
    }

    #[test]
    fn test_locked_wins_over_past() {
        let mut chart = chart(&["a", "b"]);
        chart.add_relationship("a", "b", RelationshipStatus::Locked, "rival").unwrap();
        chart.add_relationship("b", "a", RelationshipStatus::Past, "rival").unwrap();

        assert_eq!(chart.clean_relationships().unwrap(), 1);
        for (id, other) in [("a", "b"), ("b", "a")] {
            let node = chart.get_node(id).unwrap();
            assert!(node.has_relationship(&RelationshipKey::locked("rival"), other));
            assert!(!node.has_relationship(&RelationshipKey::past("rival"), other));
        }
    }

    #[test]
    fn test_different_kinds_are_independent() {
        let mut chart = chart(&["a", "b"]);
        chart.add_relationship("a", "b", RelationshipStatus::Locked, "rival").unwrap();
        chart.add_relationship("a", "b", RelationshipStatus::Past, "lover").unwrap();

        assert_eq!(chart.clean_relationships().unwrap(), 0);
        assert_eq!(chart.get_node("a").unwrap().relationships.len(), 2);
    }

    #[test]
    fn test_copy_leaves_original() {
        let mut chart = chart(&["a", "b"]);
        chart.add_relationship("a", "b", RelationshipStatus::Locked, "lover").unwrap();
        chart.add_relationship("a", "b", RelationshipStatus::Past, "lover").unwrap();

        let cleaned = chart.cleaned_relationships().unwrap();
        assert_eq!(chart.get_node("a").unwrap().relationships.len(), 2);
        assert_eq!(cleaned.get_node("a").unwrap().relationships.len(), 1);
    }
}
