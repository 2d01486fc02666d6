//! Sub-devices (battery packs, wallboxes, chargers) embedded in an inverter report.

use super::field;
use crate::decode;
use crate::endpoint::EndpointBuilder;
use crate::error::Diagnostic;
use crate::model::{DeviceRef, DeviceRole, Extraction};
use crate::schema::boxes::{self, BoxKind, BoxMode, BoxSchema, Payload};
use serde_json::{Map, Value};

use std::collections::HashMap;

/// Report keys which never hold a sub-device
const SKIPPED_KEYS: &[&str] = &["", "updateTime"];

pub fn extract(
    block: &Map<String, Value>,
    report: &str,
    role: DeviceRole,
    out: &mut Extraction,
) {
    let mut seen: HashMap<BoxKind, usize> = HashMap::new();

    for (key, raw) in block {
        if SKIPPED_KEYS.contains(&key.as_str()) {
            continue;
        }

        let decoded;
        let payload = match raw {
            Value::Object(map) => map,
            Value::String(s) => match decode::decode_embedded(s) {
                Some(Value::Object(map)) => {
                    decoded = map;
                    &decoded
                }
                _ => {
                    out.diagnose(Diagnostic::UndecodablePayload {
                        report: report.to_string(),
                        key: key.clone(),
                    });
                    continue;
                }
            },
            _ => {
                log::trace!("{}: skipping scalar `{}`", report, key);
                continue;
            }
        };

        let schema = match boxes::detect(payload) {
            Some(schema) => schema,
            None => {
                out.diagnose(Diagnostic::UnknownBox {
                    report: report.to_string(),
                    key: key.clone(),
                });
                continue;
            }
        };

        let serial = match extract_box_sn(payload, schema, key) {
            Some(serial) => serial,
            None => {
                out.diagnose(Diagnostic::BoxWithoutSerial {
                    report: report.to_string(),
                    key: key.clone(),
                    model: schema.model.to_string(),
                });
                continue;
            }
        };

        let prefix = match schema.mode {
            BoxMode::Boxed => {
                let n = seen.entry(schema.kind).or_insert(0);
                *n += 1;
                format!("{}{}", schema.name_prefix, n)
            }
            BoxMode::Single => schema.name_prefix.to_string(),
        };

        log::debug!("{}: {} {} as {}", report, schema.model, serial, prefix);

        let builder = EndpointBuilder::new(&serial, Some(report))
            .role(role)
            .display_prefix(&prefix)
            .device(DeviceRef {
                serial: serial.clone(),
                model: schema.model.to_string(),
                name: prefix.clone(),
            });

        for sensor in schema.sensors {
            let value = match schema.path(sensor) {
                Some(path) => lookup(payload, path),
                None => payload.get(*sensor),
            };
            match value {
                Some(value) if !value.is_null() => {
                    builder.emit(&mut out.endpoints, sensor, value.clone());
                }
                _ => log::trace!("{}: {} has no `{}`", report, serial, sensor),
            }
        }

        for sensor in schema.averages {
            if let Some(value) = payload.get(*sensor).and_then(mean) {
                builder.emit(&mut out.endpoints, sensor, value);
            }
        }
    }
}

/// Serial of a sub-device payload, `fallback` (the report key) for schemas without
/// a serial path.
pub fn extract_box_sn(payload: &Payload, schema: &BoxSchema, fallback: &str) -> Option<String> {
    match schema.sn_path {
        Some(path) => lookup(payload, path)?.as_str().and_then(decode::decode_sn),
        None => decode::decode_sn(fallback),
    }
}

fn lookup<'p>(payload: &'p Payload, path: &[&str]) -> Option<&'p Value> {
    let (first, rest) = path.split_first()?;
    field::get_nested(payload.get(*first)?, rest)
}

fn mean(value: &Value) -> Option<Value> {
    let numbers: Vec<f64> = value.as_array()?.iter().filter_map(Value::as_f64).collect();
    if numbers.is_empty() {
        return None;
    }
    Some(Value::from(
        numbers.iter().sum::<f64>() / numbers.len() as f64,
    ))
}
