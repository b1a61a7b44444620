//! Chart construction from consolidated character records.
//!
//! Which aspects become edges is a data table ([`AttributeRules`]) mapping an
//! aspect tag to an [`EdgeAction`]. Supporting a new tag means adding a rule,
//! not a branch.

use hashbrown::HashMap;
use tracing::{debug, info, warn};

use crate::model::*;
use crate::{Error, Result};
use super::RelationshipChart;

// ============================================================================
// Rule table
// ============================================================================

/// How an aspect title is recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagPattern {
    /// Title equals the string.
    Exact(String),
    /// `<prefix><kind>_<digits>`, e.g. `relationship_rival_2`. The kind part
    /// is captured and can be used as the relationship kind.
    Numbered { prefix: String },
}

impl TagPattern {
    pub fn exact(title: impl Into<String>) -> Self {
        TagPattern::Exact(title.into())
    }

    pub fn numbered(prefix: impl Into<String>) -> Self {
        TagPattern::Numbered { prefix: prefix.into() }
    }

    /// `None` if the title does not match, otherwise the captured kind (if
    /// the pattern captures one).
    pub fn capture<'t>(&self, title: &'t str) -> Option<Option<&'t str>> {
        match self {
            TagPattern::Exact(expected) => (expected == title).then_some(None),
            TagPattern::Numbered { prefix } => {
                let (kind, counter) = title.strip_prefix(prefix.as_str())?.rsplit_once('_')?;
                let numbered = !counter.is_empty() && counter.bytes().all(|b| b.is_ascii_digit());
                (numbered && !kind.is_empty()).then_some(Some(kind))
            }
        }
    }
}

/// Where a relationship rule takes its kind from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindSource {
    /// Positional payload field.
    Field(usize),
    /// The part captured by a [`TagPattern::Numbered`] title.
    Captured,
}

/// Edge synthesized for a matching aspect. `target` indexes the payload field
/// holding the other character's id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeAction {
    /// The owner is a parent of the target.
    ParentOf { target: usize },
    /// The owner is a child of the target.
    ChildOf { target: usize },
    /// Owner and target share a parent, possibly unknown.
    SiblingOf { target: usize },
    Relationship { status: RelationshipStatus, kind: KindSource, target: usize },
}

/// An [`EdgeAction`] applied to one aspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResolvedEdge<'t> {
    Child { parent: &'t str, child: &'t str },
    Sibling { first: &'t str, second: &'t str },
    Relationship { first: &'t str, second: &'t str, status: RelationshipStatus, kind: &'t str },
}

impl EdgeAction {
    fn resolve<'t>(
        &self,
        owner: &'t str,
        aspect: &'t CharacterAspect,
        captured: Option<&'t str>,
    ) -> Option<ResolvedEdge<'t>> {
        match *self {
            EdgeAction::ParentOf { target } => Some(ResolvedEdge::Child { parent: owner, child: aspect.field(target)? }),
            EdgeAction::ChildOf { target } => Some(ResolvedEdge::Child { parent: aspect.field(target)?, child: owner }),
            EdgeAction::SiblingOf { target } => Some(ResolvedEdge::Sibling { first: owner, second: aspect.field(target)? }),
            EdgeAction::Relationship { status, kind, target } => {
                let kind = match kind {
                    KindSource::Field(idx) => aspect.field(idx)?,
                    KindSource::Captured => captured?,
                };
                Some(ResolvedEdge::Relationship { first: owner, second: aspect.field(target)?, status, kind })
            }
        }
    }
}

/// One table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeRule {
    pub pattern: TagPattern,
    pub action: EdgeAction,
}

/// Aspect title → edge action table. The default is
/// [`AttributeRules::wildermyth`].
#[derive(Debug, Clone)]
pub struct AttributeRules {
    exact: HashMap<String, EdgeAction>,
    patterns: Vec<(TagPattern, EdgeAction)>,
}

impl AttributeRules {
    /// A table with no rules; building with it yields a chart without edges.
    pub fn empty() -> Self {
        Self { exact: HashMap::new(), patterns: Vec::new() }
    }

    /// The rules for Wildermyth legacy aspects:
    ///
    /// | Aspect | Edge |
    /// |--------|------|
    /// | `parentOf\|X` | self → X |
    /// | `childOf\|X` | X → self |
    /// | `siblingOf\|X` | shared (phantom) parent |
    /// | `lockedRelationship\|K\|X` | LOCKED K |
    /// | `relationship_K_N\|X` | PAST K |
    pub fn wildermyth() -> Self {
        Self::empty()
            .with_rule(TagPattern::exact("parentOf"), EdgeAction::ParentOf { target: 0 })
            .with_rule(TagPattern::exact("childOf"), EdgeAction::ChildOf { target: 0 })
            .with_rule(TagPattern::exact("siblingOf"), EdgeAction::SiblingOf { target: 0 })
            .with_rule(
                TagPattern::exact("lockedRelationship"),
                EdgeAction::Relationship { status: RelationshipStatus::Locked, kind: KindSource::Field(0), target: 1 },
            )
            .with_rule(
                TagPattern::numbered("relationship_"),
                EdgeAction::Relationship { status: RelationshipStatus::Past, kind: KindSource::Captured, target: 0 },
            )
    }

    pub fn with_rule(mut self, pattern: TagPattern, action: EdgeAction) -> Self {
        self.insert(EdgeRule { pattern, action });
        self
    }

    /// Add a rule. An exact rule replaces an earlier one for the same title.
    pub fn insert(&mut self, rule: EdgeRule) {
        match rule.pattern {
            TagPattern::Exact(title) => {
                self.exact.insert(title, rule.action);
            }
            pattern => self.patterns.push((pattern, rule.action)),
        }
    }

    pub fn len(&self) -> usize {
        self.exact.len() + self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The action for `title` and the kind it captured, if any rule matches.
    /// Exact rules win over numbered ones.
    pub fn resolve<'t>(&self, title: &'t str) -> Option<(EdgeAction, Option<&'t str>)> {
        if let Some(action) = self.exact.get(title) {
            return Some((*action, None));
        }
        self.patterns
            .iter()
            .find_map(|(pattern, action)| pattern.capture(title).map(|captured| (*action, captured)))
    }
}

impl Default for AttributeRules {
    fn default() -> Self {
        Self::wildermyth()
    }
}

// ============================================================================
// Builder
// ============================================================================

impl<'a> RelationshipChart<'a> {
    /// Build a chart with one node per character and the edges `rules` derive
    /// from their aspects.
    ///
    /// Edges to characters missing from `characters` are skipped, as are
    /// aspects lacking a payload field their rule needs. With `postprocess`
    /// the chart is normalized before it is returned.
    pub fn build(characters: &'a [CharacterData], rules: &AttributeRules, postprocess: bool) -> Result<Self> {
        let mut chart = Self::from_nodes(characters.iter().map(CharacterNode::from_character))?;

        let mut skipped = 0usize;
        for character in characters {
            for aspect in &character.aspects {
                let Some((action, captured)) = rules.resolve(&aspect.title) else {
                    continue;
                };
                let Some(edge) = action.resolve(&character.id, aspect, captured) else {
                    warn!(character = %character.id, aspect = %aspect.title, "aspect payload too short, skipping");
                    continue;
                };
                match chart.apply_edge(edge) {
                    Ok(()) => {}
                    Err(Error::MissingNode(missing)) => {
                        debug!(character = %character.id, aspect = %aspect.title, %missing, "edge target not in chart");
                        skipped += 1;
                    }
                    Err(err) => return Err(err),
                }
            }
        }

        if postprocess {
            chart.postprocess()?;
        }
        info!(nodes = chart.len(), phantoms = chart.phantom_count(), skipped, "built relationship chart");
        Ok(chart)
    }

    /// [`build`](Self::build) with [`AttributeRules::wildermyth`], postprocessed.
    pub fn from_character_data(characters: &'a [CharacterData]) -> Result<Self> {
        Self::build(characters, &AttributeRules::wildermyth(), true)
    }

    fn apply_edge(&mut self, edge: ResolvedEdge<'_>) -> Result<()> {
        match edge {
            ResolvedEdge::Child { parent, child } => self.add_child(parent, child, true),
            ResolvedEdge::Sibling { first, second } => self.add_sibling(first, second).map(drop),
            ResolvedEdge::Relationship { first, second, status, kind } => {
                self.add_relationship(first, second, status, kind)
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
