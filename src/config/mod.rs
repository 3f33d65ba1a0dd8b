//! Content configuration
//!
//! Schema types, YAML loading, and validation for lab catalogs and
//! scenario knowledge bases.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{ContentLimits, ContentLoader, LoadResult, LoaderOptions};
pub use schema::{ContentPack, Difficulty, Lab, LabType, RankTier, Scenario, ScenarioDefinition, Step};
pub use validation::{ValidationResult, Validator};
