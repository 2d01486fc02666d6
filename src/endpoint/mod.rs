pub mod meta;

use crate::decode;
use crate::model::{DeviceRef, DeviceRole, EndpointMap, MeasurementEndpoint};
use serde_json::Value;

const SEPARATOR: &str = "_";

/// Builds endpoints which share owner, report and display context.
///
/// The unique id is `owner_report[_group]_key[_instance]` (report left out for the
/// top-level `data` report). Group, role and display prefix never show up in names
/// except where noted below.
#[derive(Debug, Clone)]
pub struct EndpointBuilder {
    owner: String,
    report: Option<String>,
    group: Option<String>,
    role: DeviceRole,
    display_prefix: Option<String>,
    device: Option<DeviceRef>,
}

impl EndpointBuilder {
    pub fn new(owner: &str, report: Option<&str>) -> Self {
        EndpointBuilder {
            owner: owner.to_string(),
            report: report.map(String::from),
            group: None,
            role: DeviceRole::Unassigned,
            display_prefix: None,
            device: None,
        }
    }

    /// Nested structure the keys come from; part of the id only.
    pub fn group(mut self, group: &str) -> Self {
        self.group = Some(group.to_string());
        self
    }

    pub fn role(mut self, role: DeviceRole) -> Self {
        self.role = role;
        self
    }

    pub fn display_prefix(mut self, prefix: &str) -> Self {
        self.display_prefix = Some(prefix.to_string());
        self
    }

    pub fn device(mut self, device: DeviceRef) -> Self {
        self.device = Some(device);
        self
    }

    pub fn unique_id(&self, key: &str, instance: Option<&str>) -> String {
        let mut parts = vec![self.owner.as_str()];
        if let Some(report) = &self.report {
            parts.push(report);
        }
        if let Some(group) = &self.group {
            parts.push(group);
        }
        parts.push(key);
        if let Some(instance) = instance {
            parts.push(instance);
        }
        parts.join(SEPARATOR)
    }

    pub fn build(&self, key: &str, value: Value) -> MeasurementEndpoint {
        self.build_instance(key, None, value)
    }

    pub fn build_instance(
        &self,
        key: &str,
        instance: Option<&str>,
        value: Value,
    ) -> MeasurementEndpoint {
        let role_suffix = self.role.suffix();
        /* an instance named after the role is shown once */
        let display_key = match instance {
            Some(instance) if role_suffix.strip_prefix(SEPARATOR) != Some(instance) => {
                format!("{}{}{}", key, SEPARATOR, instance)
            }
            _ => key.to_string(),
        };

        let (friendly_name, description) = match &self.display_prefix {
            Some(prefix) => (
                format!("{}{}{}{}", prefix, SEPARATOR, display_key, role_suffix),
                format!("{} {}", prefix, meta::description(key)),
            ),
            None => (
                format!("{}{}", display_key, role_suffix),
                meta::description(key),
            ),
        };

        MeasurementEndpoint {
            unique_id: self.unique_id(key, instance),
            serial: self.owner.clone(),
            name: format!("{}{}{}", self.owner, SEPARATOR, friendly_name),
            friendly_name,
            value: decode_value(key, value),
            unit: meta::unit(key),
            description,
            icon: meta::icon(key),
            device_ref: self.device.clone(),
        }
    }

    /// Build and store an endpoint. An id already present keeps its first value.
    pub fn emit(&self, endpoints: &mut EndpointMap, key: &str, value: Value) -> bool {
        endpoints.insert(self.build(key, value))
    }
}

fn decode_value(key: &str, value: Value) -> Value {
    match value {
        Value::String(s) if decode::is_serial_key(key) => decode::decode_sn(&s)
            .map(Value::String)
            .unwrap_or(Value::String(s)),
        Value::String(s) => decode::decode_embedded(&s).unwrap_or(Value::String(s)),
        other => other,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn unique_id_components() {
        let default = EndpointBuilder::new("SN1", None);
        assert_eq!("SN1_sysLoadPwr", default.unique_id("sysLoadPwr", None));

        let report = EndpointBuilder::new("SN1", Some("EMS_HEARTBEAT"));
        assert_eq!("SN1_EMS_HEARTBEAT_bpSoc", report.unique_id("bpSoc", None));
        assert_eq!(
            "SN1_EMS_HEARTBEAT_bpSoc_pack2",
            report.unique_id("bpSoc", Some("pack2"))
        );
    }

    #[test]
    fn group_changes_ids_not_names() {
        let endpoint = EndpointBuilder::new("SN1", Some("EMS_HEARTBEAT"))
            .group("mpptHeartBeat")
            .build("mpptPv1_pwr", json!(120));
        assert_eq!("SN1_EMS_HEARTBEAT_mpptHeartBeat_mpptPv1_pwr", endpoint.unique_id);
        assert_eq!("mpptPv1_pwr", endpoint.friendly_name);
        assert_eq!("SN1_mpptPv1_pwr", endpoint.name);
    }

    #[test]
    fn role_changes_names_not_ids() {
        let master = EndpointBuilder::new("SN1", Some("ENERGY_STREAM_REPORT"))
            .role(DeviceRole::Master)
            .build("sysLoadPwr", json!(420));
        let plain = EndpointBuilder::new("SN1", Some("ENERGY_STREAM_REPORT"))
            .build("sysLoadPwr", json!(420));

        assert_eq!(master.unique_id, plain.unique_id);
        assert_eq!("sysLoadPwr_master", master.friendly_name);
        assert_eq!("SN1_sysLoadPwr_master", master.name);
        assert_eq!("sysLoadPwr", plain.friendly_name);

        let all = EndpointBuilder::new("SN1", Some("PARALLEL_ENERGY_STREAM_REPORT"))
            .role(DeviceRole::All)
            .build_instance("sysLoadPwr", Some("all"), json!(1));
        assert_eq!("SN1_PARALLEL_ENERGY_STREAM_REPORT_sysLoadPwr_all", all.unique_id);
        assert_eq!("sysLoadPwr_all", all.friendly_name);
    }

    #[test]
    fn metadata_is_inferred() {
        let endpoint = EndpointBuilder::new("SN1", None).build("sysGridPwr", json!(-35.5));
        assert_eq!(Some("W"), endpoint.unit);
        assert_eq!("Grid power", endpoint.description);
        assert_eq!(Some("mdi:transmission-tower-import"), endpoint.icon);

        let unknown = EndpointBuilder::new("SN1", None).build("fooBar", json!(1));
        assert_eq!(None, unknown.unit);
        assert_eq!("fooBar", unknown.description);
        assert_eq!(None, unknown.icon);
        assert!(unknown.is_diagnostic());

        let started = EndpointBuilder::new("EV01", Some("EVCHARGING_REPORT"))
            .build("orderStartTimestamp", json!(1700000000));
        assert_eq!(None, started.unit);
        assert_eq!(None, started.device_class());
    }

    #[test]
    fn display_prefix() {
        let endpoint = EndpointBuilder::new("BAT01", Some("BP_STA_REPORT"))
            .display_prefix("Battery1")
            .build("bpSoc", json!(80));
        assert_eq!("BAT01_BP_STA_REPORT_bpSoc", endpoint.unique_id);
        assert_eq!("Battery1_bpSoc", endpoint.friendly_name);
        assert_eq!("Battery1 Battery state of charge", endpoint.description);
    }

    #[test]
    fn values_are_decoded() {
        let builder = EndpointBuilder::new("SN1", Some("BP_STA_REPORT"));
        assert_eq!(json!("SN_TEST"), builder.build("bpSn", json!("U05fVEVTVA==")).value);
        assert_eq!(json!("SN_PLAIN"), builder.build("bpSn", json!("SN_PLAIN")).value);
        assert_eq!(json!({"a": 1}), builder.build("payload", json!("{\"a\": 1}")).value);
        assert_eq!(json!("U05fVEVTVA=="), builder.build("label", json!("U05fVEVTVA==")).value);
    }

    #[test]
    fn first_write_wins() {
        let builder = EndpointBuilder::new("SN1", Some("EMS_HEARTBEAT"));
        let mut endpoints = EndpointMap::new();

        assert!(builder.emit(&mut endpoints, "bpSoc", json!(50)));
        assert!(!builder.emit(&mut endpoints, "bpSoc", json!(99)));
        assert_eq!(
            json!(50),
            endpoints.get("SN1_EMS_HEARTBEAT_bpSoc").unwrap().value
        );
        assert_eq!(1, endpoints.len());
    }
}
