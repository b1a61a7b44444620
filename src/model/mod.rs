//! # Chart Model
//!
//! Plain data that every other module passes around: node identifiers,
//! relationship keys, chart nodes and the consolidated character records
//! they point at.
//!
//! Design rule: no graph algorithms here. This module is pure data.

pub mod node;
pub mod relationship;
pub mod character;

pub use node::{CharacterNode, NodeId, PHANTOM_LABEL};
pub use relationship::{RelationshipKey, RelationshipStatus, WILDCARD_KIND};
pub use character::{AspectData, CharacterAspect, CharacterData, CharacterGender};
