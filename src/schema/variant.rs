use crate::error::Error;
use num_derive::FromPrimitive;
use serde::Deserialize;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Report name of the top-level scalar fields of `data`
pub const DEFAULT_REPORT: &str = "data";

/// Device models with a schema shipped in the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive)]
pub enum Variant {
    PowerOcean = 83,
    PowerOceanDcFit = 85,
    PowerOceanPlus = 87,
}

impl Variant {
    pub fn parse(id: &str) -> Option<Variant> {
        id.trim()
            .parse::<u64>()
            .ok()
            .and_then(num::FromPrimitive::from_u64)
    }

    pub fn id(&self) -> u64 {
        *self as u64
    }

    fn builtin_schema(&self) -> &'static str {
        match self {
            Variant::PowerOcean => include_str!("../../variants/83.json"),
            Variant::PowerOceanDcFit => include_str!("../../variants/85.json"),
            Variant::PowerOceanPlus => include_str!("../../variants/87.json"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregate {
    Sum,
}

/* A sensor is either a bare field name or a full descriptor */
#[derive(Deserialize)]
#[serde(untagged)]
enum RawSensor {
    Field(String),
    Descriptor {
        field: String,
        #[serde(default)]
        label: Option<String>,
        #[serde(default)]
        per_instance: bool,
        #[serde(default)]
        instance_name: Option<String>,
        #[serde(default)]
        aggregate: Option<Aggregate>,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawSensor")]
pub struct SensorSpec {
    pub field: String,
    pub label: Option<String>,
    pub per_instance: bool,
    pub instance_name: Option<String>,
    pub aggregate: Option<Aggregate>,
}

impl From<RawSensor> for SensorSpec {
    fn from(raw: RawSensor) -> Self {
        match raw {
            RawSensor::Field(field) => SensorSpec::field(&field),
            RawSensor::Descriptor {
                field,
                label,
                per_instance,
                instance_name,
                aggregate,
            } => SensorSpec {
                field,
                label,
                per_instance,
                instance_name,
                aggregate,
            },
        }
    }
}

impl SensorSpec {
    pub fn field(field: &str) -> Self {
        SensorSpec {
            field: field.to_string(),
            label: None,
            per_instance: false,
            instance_name: None,
            aggregate: None,
        }
    }

    /// Whether this sensor needs the field path extractor instead of a plain key lookup.
    pub fn is_path(&self) -> bool {
        self.per_instance
            || self.aggregate.is_some()
            || self.field.contains(|c: char| c == '.' || c == '[' || c == '*')
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReportSpec {
    pub report: String,
    #[serde(default)]
    pub sensors: Vec<SensorSpec>,
}

impl ReportSpec {
    pub fn is_default(&self) -> bool {
        self.report == DEFAULT_REPORT
    }

    /// Whether the plain field `key` is selected by this report.
    pub fn selects(&self, key: &str) -> bool {
        self.sensors
            .iter()
            .any(|sensor| !sensor.is_path() && sensor.field == key)
    }

    pub fn path_sensors(&self) -> impl Iterator<Item = &SensorSpec> {
        self.sensors.iter().filter(|sensor| sensor.is_path())
    }

    pub fn has_paths(&self) -> bool {
        self.path_sensors().next().is_some()
    }
}

/// Which reports and fields of a device model become endpoints.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VariantSchema {
    pub reports: Vec<ReportSpec>,
}

impl VariantSchema {
    pub fn from_str(name: &str, text: &str) -> Result<VariantSchema, Error> {
        serde_json::from_str(text).map_err(|e| Error::InvalidSchema(name.to_string(), e.to_string()))
    }

    pub fn from_path(path: &Path) -> Result<VariantSchema, Error> {
        let text = fs::read_to_string(path)
            .map_err(|e| Error::Io(format!("{}: {}", path.display(), e)))?;
        VariantSchema::from_str(&path.display().to_string(), &text)
    }

    pub fn report(&self, name: &str) -> Option<&ReportSpec> {
        self.reports.iter().find(|r| r.report == name)
    }
}

/// Loads variant schemas on first use and keeps them for the registry's lifetime.
///
/// Files in the optional directory (`<dir>/<id>.json`) take precedence over the schemas
/// shipped with the crate, and may define variants the crate does not know.
#[derive(Debug, Default)]
pub struct VariantRegistry {
    dir: Option<PathBuf>,
    cache: Mutex<HashMap<String, Arc<VariantSchema>>>,
}

impl VariantRegistry {
    pub fn builtin() -> Self {
        VariantRegistry::default()
    }

    pub fn with_dir<P: Into<PathBuf>>(dir: P) -> Self {
        VariantRegistry {
            dir: Some(dir.into()),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, variant_id: &str) -> Result<Arc<VariantSchema>, Error> {
        let id = variant_id.trim();
        let mut cache = self
            .cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(schema) = cache.get(id) {
            return Ok(Arc::clone(schema));
        }

        let schema = Arc::new(self.load(id)?);
        log::debug!(
            "loaded variant schema {} ({} reports)",
            id,
            schema.reports.len()
        );
        cache.insert(id.to_string(), Arc::clone(&schema));
        Ok(schema)
    }

    fn load(&self, id: &str) -> Result<VariantSchema, Error> {
        if let Some(dir) = &self.dir {
            let path = dir.join(format!("{}.json", id));
            if path.is_file() {
                return VariantSchema::from_path(&path);
            }
        }

        match Variant::parse(id) {
            Some(variant) => VariantSchema::from_str(id, variant.builtin_schema()),
            None => Err(Error::UnknownVariant(id.to_string())),
        }
    }
}
