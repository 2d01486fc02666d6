//! Energy stream of a parallel installation, one record per inverter.

use super::field;
use crate::decode;
use crate::endpoint::EndpointBuilder;
use crate::model::{DeviceRef, DeviceRole, Extraction};
use serde_json::{Map, Value};

/// Shorter serials are placeholders, not inverters
pub const MIN_SERIAL_LEN: usize = 12;

const SERIAL_KEYS: [&str; 2] = ["devSn", "sn"];
const MODEL: &str = "PowerOcean";
const ALL_INSTANCE: &str = "all";

pub fn extract(block: &Value, report: &str, installation: &str, out: &mut Extraction) {
    let records = match records(block) {
        Some(records) => records,
        None => {
            log::debug!("{}: no inverter records", report);
            return;
        }
    };

    for record in records.iter().filter_map(Value::as_object) {
        let serial = record_serial(record);

        let (owner, role) = match serial {
            Some(sn) if sn == installation => (sn, DeviceRole::Master),
            Some(sn) => (sn, DeviceRole::Slave),
            None => (installation.to_string(), DeviceRole::All),
        };
        let instance = match role {
            DeviceRole::All => Some(ALL_INSTANCE),
            _ => None,
        };

        let builder = EndpointBuilder::new(&owner, Some(report))
            .role(role)
            .device(DeviceRef {
                serial: owner.clone(),
                model: MODEL.to_string(),
                name: format!("{}{}", MODEL, role.suffix()),
            });

        for (key, value) in record {
            if SERIAL_KEYS.contains(&key.as_str()) || !field::is_scalar(value) {
                continue;
            }
            out.endpoints
                .insert(builder.build_instance(key, instance, value.clone()));
        }
    }
}

/// The block itself when it is an array, else its first array of objects.
fn records(block: &Value) -> Option<&Vec<Value>> {
    match block {
        Value::Array(records) => Some(records),
        Value::Object(map) => map.values().find_map(|value| match value {
            Value::Array(items) if items.first().map_or(false, Value::is_object) => Some(items),
            _ => None,
        }),
        _ => None,
    }
}

fn record_serial(record: &Map<String, Value>) -> Option<String> {
    SERIAL_KEYS
        .iter()
        .find_map(|key| record.get(*key))
        .and_then(Value::as_str)
        .and_then(decode::decode_sn)
        .filter(|sn| sn.len() >= MIN_SERIAL_LEN)
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    const REPORT: &str = "PARALLEL_ENERGY_STREAM_REPORT";
    const MASTER: &str = "HJ31ZDH4ZF730042";

    fn run(block: Value) -> Extraction {
        let mut out = Extraction::new();
        extract(&block, REPORT, MASTER, &mut out);
        out
    }

    #[test]
    fn roles_from_record_serials() {
        let out = run(json!({"paraEnergyStream": [
            {"devSn": "HJ31ZDH4ZF730042", "sysLoadPwr": 420},
            {"devSn": "SEozMlpESDRaRjczMDA0Mw==", "sysLoadPwr": 180},
            {"devSn": "", "sysLoadPwr": 600},
        ]}));

        let master = out
            .endpoints
            .get("HJ31ZDH4ZF730042_PARALLEL_ENERGY_STREAM_REPORT_sysLoadPwr")
            .unwrap();
        assert_eq!(json!(420), master.value);
        assert_eq!("sysLoadPwr_master", master.friendly_name);
        assert_eq!(
            Some(DeviceRef {
                serial: MASTER.to_string(),
                model: "PowerOcean".to_string(),
                name: "PowerOcean_master".to_string(),
            }),
            master.device_ref
        );

        let slave = out
            .endpoints
            .get("HJ32ZDH4ZF730043_PARALLEL_ENERGY_STREAM_REPORT_sysLoadPwr")
            .unwrap();
        assert_eq!(json!(180), slave.value);
        assert_eq!("sysLoadPwr_slave", slave.friendly_name);
        assert_eq!("HJ32ZDH4ZF730043", slave.serial);

        let all = out
            .endpoints
            .get("HJ31ZDH4ZF730042_PARALLEL_ENERGY_STREAM_REPORT_sysLoadPwr_all")
            .unwrap();
        assert_eq!(json!(600), all.value);
        assert_eq!("sysLoadPwr_all", all.friendly_name);

        assert_eq!(3, out.endpoints.len());
    }

    #[test]
    fn short_serial_counts_as_all() {
        let out = run(json!([{"sn": "SHORT", "bpSoc": 50}]));
        assert!(out
            .endpoints
            .contains_key("HJ31ZDH4ZF730042_PARALLEL_ENERGY_STREAM_REPORT_bpSoc_all"));
    }

    #[test]
    fn composite_fields_are_skipped() {
        let out = run(json!([{"devSn": MASTER, "nested": {"a": 1}, "list": [1], "bpSoc": 50}]));
        assert_eq!(1, out.endpoints.len());
    }

    #[test]
    fn no_records() {
        assert!(run(json!({"updateTime": 1})).endpoints.is_empty());
        assert!(run(json!("text")).endpoints.is_empty());
    }
}
