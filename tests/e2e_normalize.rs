//! End-to-end tests for the normalization pipeline and relationship
//! resolution, including property tests over randomly built charts.

use std::collections::BTreeSet;

use legacy_chart::{
    AttributeRules, CharacterAspect, CharacterData, CharacterNode, NodeId, RelationshipChart, RelationshipKey,
    RelationshipStatus,
};
use proptest::prelude::*;

// ============================================================================
// Helpers
// ============================================================================

const HEROES: usize = 6;
const KINDS: [&str; 3] = ["rival", "lover", "friend"];

type NodeShape = (String, bool, Vec<String>, Vec<String>, Vec<(String, Vec<String>)>);

/// Full structural description of a chart, for before/after comparisons.
fn shape(chart: &RelationshipChart<'_>) -> Vec<NodeShape> {
    let strings = |set: &BTreeSet<NodeId>| set.iter().map(ToString::to_string).collect::<Vec<_>>();
    chart
        .iter()
        .map(|node| {
            (
                node.id.to_string(),
                node.is_phantom,
                strings(&node.parent_ids),
                strings(&node.child_ids),
                node.relationships.iter().map(|(key, targets)| (key.to_string(), strings(targets))).collect(),
            )
        })
        .collect()
}

fn assert_invariants(chart: &RelationshipChart<'_>) {
    for node in chart.iter() {
        for id in node.referenced_ids() {
            assert!(chart.contains(id.as_str()), "{} references missing {}", node.id, id);
            assert_ne!(id, &node.id, "{} references itself", node.id);
        }
        for child in chart.children(node) {
            assert!(child.parent_ids.contains(&node.id), "{} -> {} is one-sided", node.id, child.id);
        }
        for parent in chart.parents(node) {
            assert!(parent.child_ids.contains(&node.id), "{} <- {} is one-sided", node.id, parent.id);
        }
        for (key, targets) in &node.relationships {
            for target in targets {
                let other = chart.get_node(target.as_str()).unwrap();
                assert!(other.has_relationship(key, node.id.as_str()), "{key} {} -> {target} is one-sided", node.id);
            }
        }
        if node.is_phantom {
            assert!(!node.child_ids.is_empty(), "phantom {} has no children", node.id);
            for other in chart.iter().filter(|other| other.id != node.id) {
                assert!(
                    !node.child_ids.is_subset(&other.child_ids),
                    "phantom {} is subsumed by {}",
                    node.id,
                    other.id
                );
            }
        }
    }
}

fn assert_single_status(chart: &RelationshipChart<'_>) {
    for node in chart.iter() {
        for kind in KINDS {
            let past = node.relationship_targets(&RelationshipKey::past(kind));
            let locked = node.relationship_targets(&RelationshipKey::locked(kind));
            if let (Some(past), Some(locked)) = (past, locked) {
                assert!(past.is_disjoint(locked), "{} has both statuses of {kind}", node.id);
            }
        }
    }
}

fn hero_id(idx: usize) -> String {
    format!("hero-{idx}")
}

/// (owner, rule, target, kind) → aspect on the owner; self references are
/// left out since the builder rejects them.
fn characters(aspects: &[(usize, usize, usize, usize)]) -> Vec<CharacterData> {
    let mut res: Vec<CharacterData> = (0..HEROES).map(|idx| CharacterData::new(hero_id(idx), format!("Hero {idx}"))).collect();
    for &(owner, rule, target, kind) in aspects.iter().filter(|(owner, _, target, _)| owner != target) {
        let target = hero_id(target);
        let kind = KINDS[kind];
        let aspect = match rule {
            0 => format!("parentOf|{target}"),
            1 => format!("childOf|{target}"),
            2 => format!("siblingOf|{target}"),
            3 => format!("lockedRelationship|{kind}|{target}"),
            _ => format!("relationship_{kind}_1|{target}"),
        };
        res[owner].aspects.push(CharacterAspect::parse(&aspect, None));
    }
    res
}

fn aspect_strategy() -> impl Strategy<Value = Vec<(usize, usize, usize, usize)>> {
    prop::collection::vec((0..HEROES, 0..5usize, 0..HEROES, 0..KINDS.len()), 0..24)
}

const PHANTOMS: usize = 3;

/// (owner, edge, target, kind) recorded on the owner only; owners and
/// targets past `HEROES` are phantoms.
fn one_sided_nodes(edges: &[(usize, usize, usize, usize)]) -> Vec<CharacterNode<'static>> {
    let id = |idx: usize| if idx < HEROES { hero_id(idx) } else { format!("p{}", idx - HEROES) };
    let mut nodes: Vec<CharacterNode<'static>> = (0..HEROES + PHANTOMS)
        .map(|idx| {
            let mut node = CharacterNode::new(id(idx), id(idx));
            node.is_phantom = idx >= HEROES;
            node
        })
        .collect();
    for &(owner, edge, target, kind) in edges {
        let target = id(target);
        let node = &mut nodes[owner];
        match edge {
            0 => {
                node.child_ids.insert(target.into());
            }
            1 => {
                node.parent_ids.insert(target.into());
            }
            _ => {
                node.relationships.entry(RelationshipKey::locked(KINDS[kind])).or_default().insert(target.into());
            }
        }
    }
    nodes
}

fn one_sided_strategy() -> impl Strategy<Value = Vec<(usize, usize, usize, usize)>> {
    prop::collection::vec((0..HEROES + PHANTOMS, 0..3usize, 0..HEROES + PHANTOMS, 0..KINDS.len()), 0..24)
}

// ============================================================================
// 1. Property tests
// ============================================================================

proptest! {
    #[test]
    fn proptest_postprocess_restores_invariants(
        aspects in aspect_strategy(),
        removed in prop::collection::vec((0..HEROES, any::<bool>()), 0..3),
    ) {
        let characters = characters(&aspects);
        let mut chart = RelationshipChart::build(&characters, &AttributeRules::default(), false).unwrap();
        for (idx, clear) in removed {
            let _ = chart.remove_node(&hero_id(idx), clear);
        }

        chart.postprocess().unwrap();
        assert_invariants(&chart);

        let once = shape(&chart);
        chart.postprocess().unwrap();
        prop_assert_eq!(once, shape(&chart));
    }

    #[test]
    fn proptest_postprocess_repairs_one_sided_input(edges in one_sided_strategy()) {
        let mut chart = RelationshipChart::from_nodes(one_sided_nodes(&edges)).unwrap();

        chart.postprocess().unwrap();
        assert_invariants(&chart);

        let once = shape(&chart);
        chart.postprocess().unwrap();
        prop_assert_eq!(once, shape(&chart));
    }

    #[test]
    fn proptest_clean_relationships_is_idempotent(aspects in aspect_strategy()) {
        let characters = characters(&aspects);
        let mut chart = RelationshipChart::from_character_data(&characters).unwrap();

        chart.clean_relationships().unwrap();
        assert_single_status(&chart);
        assert_invariants(&chart);

        let once = shape(&chart);
        prop_assert_eq!(chart.clean_relationships().unwrap(), 0);
        prop_assert_eq!(once, shape(&chart));
    }

    #[test]
    fn proptest_trim_never_keeps_excluded(
        aspects in aspect_strategy(),
        anchor in 0..HEROES,
        excluded in prop::collection::btree_set(0..HEROES, 0..3),
    ) {
        let characters = characters(&aspects);
        let chart = RelationshipChart::from_character_data(&characters).unwrap();
        let anchors = vec![NodeId::new(hero_id(anchor))];
        let exclude: Vec<NodeId> = excluded.iter().map(|idx| NodeId::new(hero_id(*idx))).collect();

        let trimmed = chart.trimmed(Some(anchors.as_slice()), Some(exclude.as_slice())).unwrap();
        for id in &exclude {
            prop_assert!(!trimmed.contains(id.as_str()));
        }
        prop_assert_eq!(trimmed.contains(&hero_id(anchor)), !excluded.contains(&anchor));
        prop_assert!(trimmed.iter().flat_map(|node| node.referenced_ids()).all(|id| trimmed.contains(id.as_str())));
    }
}

// ============================================================================
// 2. One-sided bulk edits are repaired
// ============================================================================

#[test]
fn test_postprocess_repairs_bulk_nodes() {
    let key = RelationshipKey::new(RelationshipStatus::Locked, "lover");
    let mut chart = RelationshipChart::from_nodes([
        CharacterNode::new("a", "A").with_child("b").with_relationship(key.clone(), "c"),
        CharacterNode::new("b", "B").with_parent("ghost"),
        CharacterNode::new("c", "C"),
    ])
    .unwrap();

    chart.postprocess().unwrap();
    assert_invariants(&chart);
    assert!(chart.get_node("b").unwrap().parent_ids.contains("a"));
    assert!(!chart.get_node("b").unwrap().parent_ids.contains("ghost"));
    assert!(chart.get_node("c").unwrap().has_relationship(&key, "a"));
}

#[test]
fn test_postprocess_one_sided_parent_is_idempotent() {
    let mut phantom = CharacterNode::new("p0", "p0").with_child("a").with_child("b");
    phantom.is_phantom = true;
    let mut chart = RelationshipChart::from_nodes([
        phantom,
        CharacterNode::new("m", "M").with_child("a").with_child("b"),
        CharacterNode::new("a", "A").with_parent("p0"),
        CharacterNode::new("b", "B").with_parent("p0"),
    ])
    .unwrap();

    chart.postprocess().unwrap();
    assert!(!chart.contains("p0"), "Real parent should subsume the phantom on the first run");
    assert_invariants(&chart);

    let once = shape(&chart);
    chart.postprocess().unwrap();
    assert_eq!(once, shape(&chart));
}

// ============================================================================
// 3. Deferred removal leaves dangling edges until the sweep
// ============================================================================

#[test]
fn test_deferred_removal_then_sweep() {
    let characters = vec![
        CharacterData::new("a", "A").with_aspect(CharacterAspect::parse("parentOf|b", None)),
        CharacterData::new("b", "B"),
    ];
    let mut chart = RelationshipChart::from_character_data(&characters).unwrap();

    chart.remove_node("b", false).unwrap();
    assert!(chart.get_node("a").unwrap().child_ids.contains("b"));

    assert_eq!(chart.remove_dead_edges(), 1);
    assert!(chart.get_node("a").unwrap().child_ids.is_empty());
}
