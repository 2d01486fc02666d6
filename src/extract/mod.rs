//! Report dispatch: finds each report of the variant schema in every inverter tree and
//! hands it to the extraction strategy it needs.

pub mod boxed;
pub mod ems;
pub mod field;
pub mod parallel;
pub mod topology;

use crate::endpoint::EndpointBuilder;
use crate::error::{Diagnostic, Error};
use crate::model::{Extraction, InverterTree};
use crate::schema::{ReportSpec, VariantSchema, DEFAULT_REPORT};
use lazy_static::lazy_static;
use serde_json::{Map, Value};

use std::collections::HashMap;
use std::sync::Arc;

pub const ENERGY_STREAM_REPORT: &str = "ENERGY_STREAM_REPORT";

lazy_static! {
    /// Firmware families prefix report names; known prefixes per canonical report,
    /// tried in this order before any other prefix.
    static ref REPORT_ALIASES: HashMap<&'static str, &'static [&'static str]> = {
        const FAMILIES: &[&str] = &["JTS1", "RE307"];
        let mut aliases = HashMap::new();
        for report in &[
            "BP_STA_REPORT",
            "EDEV_PARAM_REPORT",
            "EVCHARGING_REPORT",
            "EMS_HEARTBEAT",
            "PARALLEL_ENERGY_STREAM_REPORT",
            "EMS_CHANGE_REPORT",
            ENERGY_STREAM_REPORT,
        ] {
            aliases.insert(*report, FAMILIES);
        }
        aliases
    };
}

/// Reports with dedicated handling, by canonical name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportMode {
    Default,
    Battery,
    Wallbox,
    ChargeBox,
    Ems,
    Parallel,
    EmsChange,
    EnergyStream,
    Other,
}

impl ReportMode {
    pub fn from_name(report: &str) -> Self {
        match report {
            DEFAULT_REPORT => ReportMode::Default,
            "BP_STA_REPORT" => ReportMode::Battery,
            "EDEV_PARAM_REPORT" => ReportMode::Wallbox,
            "EVCHARGING_REPORT" => ReportMode::ChargeBox,
            "EMS_HEARTBEAT" => ReportMode::Ems,
            "PARALLEL_ENERGY_STREAM_REPORT" => ReportMode::Parallel,
            "EMS_CHANGE_REPORT" => ReportMode::EmsChange,
            ENERGY_STREAM_REPORT => ReportMode::EnergyStream,
            _ => ReportMode::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Boxed,
    Ems,
    Parallel,
    FieldPath,
    Plain,
}

impl Strategy {
    pub fn route(spec: &ReportSpec) -> Self {
        match ReportMode::from_name(&spec.report) {
            ReportMode::Battery | ReportMode::Wallbox | ReportMode::ChargeBox => Strategy::Boxed,
            ReportMode::Ems => Strategy::Ems,
            ReportMode::Parallel => Strategy::Parallel,
            _ if spec.has_paths() => Strategy::FieldPath,
            _ => Strategy::Plain,
        }
    }
}

/// Whether report key `candidate` is the report `target`, possibly under a firmware
/// prefix (`JTS1_EMS_HEARTBEAT` for `EMS_HEARTBEAT`).
///
/// After the first `_` the rest has to end with the target. The energy stream report
/// has to match the rest exactly, since other reports end with its name as well.
pub fn is_matching_report(candidate: &str, target: &str) -> bool {
    if candidate == target {
        return true;
    }

    match candidate.split_once('_') {
        Some((_, rest)) if target == ENERGY_STREAM_REPORT => rest == target,
        Some((_, rest)) => rest.ends_with(target),
        None => false,
    }
}

/// Locate report `target` in an inverter's reports: exact name, then known aliases,
/// then any matching key in document order.
pub fn find_report<'a>(
    reports: &'a Map<String, Value>,
    target: &str,
) -> Option<(&'a str, &'a Value)> {
    let entry = |key: &str| {
        reports
            .iter()
            .find(|(candidate, _)| candidate.as_str() == key)
            .map(|(k, v)| (k.as_str(), v))
    };

    if let Some(found) = entry(target) {
        return Some(found);
    }

    let aliased = REPORT_ALIASES.get(target).and_then(|families| {
        families
            .iter()
            .find_map(|family| entry(&format!("{}_{}", family, target)))
    });
    if aliased.is_some() {
        return aliased;
    }

    reports
        .iter()
        .find(|(candidate, _)| is_matching_report(candidate, target))
        .map(|(k, v)| (k.as_str(), v))
}

fn is_empty(block: &Value) -> bool {
    match block {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn is_mppt_code(key: &str) -> bool {
    key.starts_with("mppt") && key.ends_with("Code")
}

/// Extraction engine bound to one installation and one variant schema.
///
/// Immutable once built; `extract` may be called from any thread.
#[derive(Debug, Clone)]
pub struct Engine {
    serial: String,
    schema: Arc<VariantSchema>,
}

impl Engine {
    pub fn new(serial: &str, schema: Arc<VariantSchema>) -> Self {
        Engine {
            serial: serial.to_string(),
            schema,
        }
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    pub fn schema(&self) -> &VariantSchema {
        &self.schema
    }

    /// Turn one vendor document into endpoints.
    ///
    /// Fails only if the document has no usable `data` or topology. Everything else is
    /// skipped and recorded in the diagnostics of the result.
    pub fn extract(&self, document: &Value) -> Result<Extraction, Error> {
        log::trace!("extracting {}", document);

        let data = topology::data(document)?;
        let mut out = Extraction::new();
        let topology = topology::resolve(data, &self.serial, &mut out)?;

        if let Some(spec) = self.schema.report(DEFAULT_REPORT) {
            let builder = EndpointBuilder::new(&self.serial, None);
            field::extract_plain(data, |key| spec.selects(key), &builder, &mut out);
            field::extract_paths(
                &document["data"],
                spec.path_sensors(),
                DEFAULT_REPORT,
                &builder,
                &mut out,
            );
        }

        for inverter in &topology.inverters {
            for spec in self.schema.reports.iter().filter(|spec| !spec.is_default()) {
                self.dispatch(inverter, spec, &mut out);
            }
        }

        log::debug!(
            "{}: {} endpoints from {} inverter(s), {} diagnostics",
            self.serial,
            out.endpoints.len(),
            topology.inverters.len(),
            out.diagnostics.len()
        );

        Ok(out)
    }

    fn dispatch(&self, inverter: &InverterTree, spec: &ReportSpec, out: &mut Extraction) {
        let report = spec.report.as_str();

        let (key, block) = match find_report(inverter.reports, report) {
            Some(found) => found,
            None => {
                out.diagnose(Diagnostic::ReportMissing {
                    serial: inverter.serial.clone(),
                    report: report.to_string(),
                });
                return;
            }
        };

        if is_empty(block) {
            out.diagnose(Diagnostic::ReportEmpty {
                serial: inverter.serial.clone(),
                report: report.to_string(),
            });
            return;
        }

        let strategy = Strategy::route(spec);
        log::trace!("{}: {} as {:?}", inverter.serial, key, strategy);

        let builder = EndpointBuilder::new(&inverter.serial, Some(report)).role(inverter.role);

        match (strategy, block) {
            (Strategy::Boxed, Value::Object(map)) => {
                boxed::extract(map, report, inverter.role, out);
            }
            (Strategy::Ems, Value::Object(map)) => {
                ems::extract(map, spec, &builder, out);
            }
            (Strategy::Parallel, _) => {
                parallel::extract(block, report, &self.serial, out);
            }
            (Strategy::FieldPath, Value::Object(map)) | (Strategy::Plain, Value::Object(map)) => {
                let mppt_codes = ReportMode::from_name(report) == ReportMode::EmsChange;
                field::extract_plain(
                    map,
                    |name| spec.selects(name) || (mppt_codes && is_mppt_code(name)),
                    &builder,
                    out,
                );
            }
            /* a path may still reach into an array report */
            (Strategy::FieldPath, _) => {}
            _ => {
                out.diagnose(Diagnostic::UndecodablePayload {
                    report: report.to_string(),
                    key: key.to_string(),
                });
                return;
            }
        }

        /* after the strategy, so its values win on shared ids */
        if spec.has_paths() {
            field::extract_paths(block, spec.path_sensors(), report, &builder, out);
        }
    }
}
