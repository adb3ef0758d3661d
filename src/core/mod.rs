pub mod compile;
pub mod component;
pub mod error;
pub mod party;
pub mod pipeline;
pub mod stage;

/// The alias for `serde_json::Value` since parameters are schemaless JSON.
pub type ParamValue = serde_json::Value;
