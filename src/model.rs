use crate::error::Diagnostic;
use serde::Serialize;
use serde_json::{Map, Value};

use std::collections::btree_map::{self, Entry};
use std::collections::BTreeMap;

pub type Unit = &'static str;
pub type Icon = &'static str;

/// Role of an inverter within the installation. Only feeds display names, never ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceRole {
    Master,
    Slave,
    /// Parallel stream record not attributable to one inverter
    All,
    Unassigned,
}

impl DeviceRole {
    pub fn suffix(&self) -> &'static str {
        match self {
            DeviceRole::Master => "_master",
            DeviceRole::Slave => "_slave",
            DeviceRole::All => "_all",
            DeviceRole::Unassigned => "",
        }
    }
}

/// Physical device an endpoint should be grouped under by the host platform, when it
/// is not the installation itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceRef {
    pub serial: String,
    pub model: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Temperature,
    Battery,
    Energy,
    Power,
    Voltage,
    Current,
}

impl DeviceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceClass::Temperature => "temperature",
            DeviceClass::Battery => "battery",
            DeviceClass::Energy => "energy",
            DeviceClass::Power => "power",
            DeviceClass::Voltage => "voltage",
            DeviceClass::Current => "current",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StateClass {
    Measurement,
    TotalIncreasing,
}

/// One named, typed measurement extracted from a telemetry document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementEndpoint {
    pub unique_id: String,
    pub serial: String,
    pub name: String,
    pub friendly_name: String,
    pub value: Value,
    pub unit: Option<Unit>,
    pub description: String,
    pub icon: Option<Icon>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_ref: Option<DeviceRef>,
}

impl MeasurementEndpoint {
    pub fn device_class(&self) -> Option<DeviceClass> {
        match self.unit? {
            "°C" => Some(DeviceClass::Temperature),
            "%" => Some(DeviceClass::Battery),
            "Wh" | "kWh" => Some(DeviceClass::Energy),
            "W" => Some(DeviceClass::Power),
            "V" => Some(DeviceClass::Voltage),
            "A" => Some(DeviceClass::Current),
            _ => None,
        }
    }

    pub fn state_class(&self) -> Option<StateClass> {
        match self.unit? {
            "°C" | "h" | "W" | "V" | "A" => Some(StateClass::Measurement),
            "Wh" | "kWh" => Some(StateClass::TotalIncreasing),
            _ => None,
        }
    }

    /// Endpoints without a unit are shown as diagnostic entities.
    pub fn is_diagnostic(&self) -> bool {
        self.unit.is_none()
    }
}

/// Output of one extraction pass, keyed by unique id. Insertion is first-write-wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EndpointMap(BTreeMap<String, MeasurementEndpoint>);

impl EndpointMap {
    pub fn new() -> Self {
        EndpointMap(BTreeMap::new())
    }

    /// Inserts `endpoint` unless its id is already taken. Returns whether it was kept.
    pub fn insert(&mut self, endpoint: MeasurementEndpoint) -> bool {
        match self.0.entry(endpoint.unique_id.clone()) {
            Entry::Vacant(entry) => {
                entry.insert(endpoint);
                true
            }
            Entry::Occupied(entry) => {
                log::trace!(
                    "dropping duplicate endpoint {} (kept value {})",
                    entry.key(),
                    entry.get().value
                );
                false
            }
        }
    }

    pub fn get(&self, unique_id: &str) -> Option<&MeasurementEndpoint> {
        self.0.get(unique_id)
    }

    pub fn contains_key(&self, unique_id: &str) -> bool {
        self.0.contains_key(unique_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, MeasurementEndpoint> {
        self.0.iter()
    }

    pub fn values(&self) -> btree_map::Values<'_, String, MeasurementEndpoint> {
        self.0.values()
    }
}

impl IntoIterator for EndpointMap {
    type Item = (String, MeasurementEndpoint);
    type IntoIter = btree_map::IntoIter<String, MeasurementEndpoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Endpoints of one pass plus everything that was skipped on the way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub endpoints: EndpointMap,
    pub diagnostics: Vec<Diagnostic>,
}

impl Extraction {
    pub fn new() -> Self {
        Extraction::default()
    }

    pub(crate) fn diagnose(&mut self, diagnostic: Diagnostic) {
        match diagnostic {
            /* devices without battery/wallbox legitimately lack these */
            Diagnostic::UndecodablePayload { .. } | Diagnostic::ReportMissing { .. } => {
                log::debug!("{}", diagnostic)
            }
            _ => log::warn!("{}", diagnostic),
        }
        self.diagnostics.push(diagnostic);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopologyMode {
    Single,
    Parallel,
}

/// Reports of one inverter, borrowed from the input document.
#[derive(Debug, Clone)]
pub struct InverterTree<'a> {
    pub serial: String,
    pub role: DeviceRole,
    pub reports: &'a Map<String, Value>,
}

#[derive(Debug, Clone)]
pub struct Topology<'a> {
    pub mode: TopologyMode,
    pub inverters: Vec<InverterTree<'a>>,
}
