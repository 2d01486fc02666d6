//! Extraction of PowerOcean cloud telemetry into flat, de-duplicated measurement
//! endpoints.

pub mod decode;
pub mod diff;
pub mod endpoint;
pub mod error;
pub mod extract;
pub mod model;
pub mod schema;

pub use error::{Diagnostic, Error};
pub use extract::Engine;
pub use model::{EndpointMap, Extraction, MeasurementEndpoint};
pub use schema::{VariantRegistry, VariantSchema};
