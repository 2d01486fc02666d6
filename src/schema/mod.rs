//! Read-only configuration consulted by the extraction engine: per-model variant
//! schemas and the fixed table of attachable sub-devices.

pub mod boxes;
pub mod variant;

pub use boxes::{BoxKind, BoxMode, BoxSchema, BOX_SCHEMAS};
pub use variant::{
    Aggregate, ReportSpec, SensorSpec, Variant, VariantRegistry, VariantSchema, DEFAULT_REPORT,
};
