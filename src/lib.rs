//! # legacy-chart: Wildermyth legacy relationship charts
//!
//! Builds the family and relationship graph of a Wildermyth legacy: who is
//! whose parent, who are siblings, who were rivals, lovers or friends.
//!
//! ## Pipeline
//!
//! ```text
//! legacy.json → legacy::extract_individual_entities → CharacterData
//!   → RelationshipChart::build → apply_filter_params → clean_relationships
//!   → export::ChartView (JSON / DOT)
//! ```
//!
//! Siblings whose parents are not in the legacy get a shared *phantom* parent
//! so the family structure stays a plain parent/child graph.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use legacy_chart::{legacy, CharacterData, FilterParams, RelationshipChart};
//!
//! # fn example() -> legacy_chart::Result<()> {
//! let file = legacy::load_legacy_json("legacy.json")?;
//! let characters: Vec<CharacterData> = legacy::extract_individual_entities(&file)?
//!     .iter()
//!     .map(|snapshots| CharacterData::from_snapshots(snapshots))
//!     .collect::<legacy_chart::Result<_>>()?;
//!
//! let mut chart = RelationshipChart::from_character_data(&characters)?;
//! chart.apply_filter_params(&FilterParams::default())?;
//! chart.clean_relationships()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod chart;
pub mod params;
pub mod legacy;
pub mod export;

// ============================================================================
// Re-exports
// ============================================================================

pub use model::{
    CharacterAspect, CharacterData, CharacterGender, CharacterNode,
    NodeId, RelationshipKey, RelationshipStatus,
};

pub use chart::{
    AttributeRules, RelationshipChart, RelationshipEdge, RelationshipFilter, RelationshipQuery,
};

pub use params::FilterParams;
pub use export::ChartView;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Node not found: {0}")]
    MissingNode(NodeId),

    #[error("Duplicate node id: {0}")]
    DuplicateId(NodeId),

    #[error("Node cannot reference itself: {0}")]
    SelfReference(NodeId),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Hero identifier not found: {0}")]
    UnknownHero(String),

    #[error("Unsupported legacy file format: {0}")]
    UnsupportedFormat(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

pub type Result<T> = std::result::Result<T, Error>;
