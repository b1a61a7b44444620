//! Filtering parameters and the parsing of user-facing filter strings.
//!
//! Relationship entries are written `status[_kind]`: `locked`, `past_rival`,
//! `locked_lover`. Hero entries are a full id, a short id or a display name.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chart::{RelationshipChart, RelationshipFilter};
use crate::model::*;
use crate::{Error, Result};

/// What to keep of a chart. Every field is optional; an all-`None` value
/// leaves the chart untouched apart from phantom cleanup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterParams {
    pub include_relationships: Option<Vec<RelationshipKey>>,
    pub exclude_relationships: Option<Vec<RelationshipKey>>,
    pub include_heroes: Option<Vec<NodeId>>,
    pub exclude_heroes: Option<Vec<NodeId>>,
}

impl FilterParams {
    /// Read parameters from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }

    pub fn relationship_filter(&self) -> RelationshipFilter {
        RelationshipFilter {
            allow: self.include_relationships.as_ref().map(|keys| keys.iter().cloned().collect()),
            deny: self.exclude_relationships.as_ref().map(|keys| keys.iter().cloned().collect()),
        }
    }
}

/// Parse one `status[_kind]` entry.
///
/// `legacy` is accepted for `locked`. Kinds are singular in game data, so
/// `lovers`, `rivals` and `friends` lose their trailing `s`; `soulmate(s)` is
/// the in-game name of a locked lover. A missing kind matches every kind.
pub fn parse_relationship_spec(spec: &str) -> Result<RelationshipKey> {
    let (status, kind) = match spec.split_once('_') {
        Some((status, kind)) => (status, Some(kind)),
        None => (spec, None),
    };

    let status = match status.to_ascii_lowercase().as_str() {
        "legacy" => RelationshipStatus::Locked,
        other => other.parse()?,
    };

    let kind = match kind {
        None => WILDCARD_KIND,
        Some("soulmate" | "soulmates") => "lover",
        Some(plural @ ("lovers" | "rivals" | "friends")) => &plural[..plural.len() - 1],
        Some("") => return Err(Error::InvalidFilter(format!("empty relationship kind in {spec:?}"))),
        Some(kind) => kind,
    };
    Ok(RelationshipKey::new(status, kind))
}

/// Parse a list of entries; `None` stays `None`.
pub fn parse_relationship_list<S: AsRef<str>>(specs: Option<&[S]>) -> Result<Option<Vec<RelationshipKey>>> {
    specs
        .map(|specs| specs.iter().map(|spec| parse_relationship_spec(spec.as_ref())).collect())
        .transpose()
}

/// Map hero identifiers to node ids.
///
/// Each identifier is tried as a full id, then as a short id, then as a
/// display name. A name may match several nodes; all of them are returned.
pub fn resolve_heroes<S: AsRef<str>>(heroes: &[S], chart: &RelationshipChart<'_>) -> Result<Vec<NodeId>> {
    let labels = chart.label_lookup();
    let short_ids = chart.short_id_lookup();

    let mut res = Vec::with_capacity(heroes.len());
    for hero in heroes.iter().map(AsRef::as_ref) {
        if let Ok(node) = chart.get_node(hero) {
            res.push(node.id.clone());
        } else if let Some(node) = short_ids.get(hero) {
            debug!(hero, id = %node.id, "hero matched by short id");
            res.push(node.id.clone());
        } else if let Some(nodes) = labels.get(hero) {
            debug!(hero, matches = nodes.len(), "hero matched by name");
            res.extend(nodes.iter().map(|node| node.id.clone()));
        } else {
            return Err(Error::UnknownHero(hero.to_string()));
        }
    }
    Ok(res)
}
