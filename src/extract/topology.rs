use crate::error::{Diagnostic, Error};
use crate::model::{DeviceRole, Extraction, InverterTree, Topology, TopologyMode};
use serde_json::{Map, Value};

/// The `data` object of a vendor document.
pub fn data(document: &Value) -> Result<&Map<String, Value>, Error> {
    match document.get("data") {
        Some(Value::Object(data)) => Ok(data),
        Some(other) => Err(Error::InvalidDocument(format!(
            "`data` is not an object: {}",
            other
        ))),
        None => Err(Error::MissingData),
    }
}

/// Split the installation into one report tree per inverter.
///
/// `parallel` wins over `quota` when both are present. In parallel mode the tree keyed
/// by `serial` is the master and comes first, the others follow as slaves in document
/// order. Non-object entries are skipped and recorded in `out`.
pub fn resolve<'a>(
    data: &'a Map<String, Value>,
    serial: &str,
    out: &mut Extraction,
) -> Result<Topology<'a>, Error> {
    if let Some(parallel) = data.get("parallel").and_then(Value::as_object) {
        let mut inverters = Vec::with_capacity(parallel.len());

        for (sn, tree) in parallel {
            let reports = match tree.as_object() {
                Some(reports) => reports,
                None => {
                    out.diagnose(Diagnostic::InvalidTree { serial: sn.clone() });
                    continue;
                }
            };
            let role = if sn == serial {
                DeviceRole::Master
            } else {
                DeviceRole::Slave
            };
            inverters.push(InverterTree {
                serial: sn.clone(),
                role,
                reports,
            });
        }

        /* stable: slaves keep their document order */
        inverters.sort_by_key(|inverter| inverter.role != DeviceRole::Master);

        if !inverters.iter().any(|i| i.role == DeviceRole::Master) {
            log::warn!(
                "parallel installation without a tree for own serial {}",
                serial
            );
        }

        return Ok(Topology {
            mode: TopologyMode::Parallel,
            inverters,
        });
    }

    if let Some(quota) = data.get("quota").and_then(Value::as_object) {
        return Ok(Topology {
            mode: TopologyMode::Single,
            inverters: vec![InverterTree {
                serial: serial.to_string(),
                role: DeviceRole::Unassigned,
                reports: quota,
            }],
        });
    }

    Err(Error::UnknownTopology)
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn roles(topology: &Topology) -> Vec<(String, DeviceRole)> {
        topology
            .inverters
            .iter()
            .map(|i| (i.serial.clone(), i.role))
            .collect()
    }

    #[test]
    fn missing_data() {
        assert_eq!(Err(Error::MissingData), data(&json!({"code": "0"})));
        assert!(matches!(
            data(&json!({"data": [1, 2]})),
            Err(Error::InvalidDocument(_))
        ));
        assert!(data(&json!({"data": {}})).is_ok());
    }

    #[test]
    fn single_inverter() {
        let document = json!({"quota": {"JTS1_EMS_HEARTBEAT": {"a": 1}}});
        let mut out = Extraction::new();
        let topology = resolve(document.as_object().unwrap(), "SN1", &mut out).unwrap();

        assert_eq!(TopologyMode::Single, topology.mode);
        assert_eq!(
            vec![("SN1".to_string(), DeviceRole::Unassigned)],
            roles(&topology)
        );
        assert!(topology.inverters[0].reports.contains_key("JTS1_EMS_HEARTBEAT"));
    }

    #[test]
    fn parallel_roles() {
        let document = json!({"parallel": {
            "SLAVE0000000001": {},
            "MASTER000000001": {},
        }});
        let mut out = Extraction::new();
        let topology =
            resolve(document.as_object().unwrap(), "MASTER000000001", &mut out).unwrap();

        assert_eq!(TopologyMode::Parallel, topology.mode);
        assert_eq!(
            vec![
                ("MASTER000000001".to_string(), DeviceRole::Master),
                ("SLAVE0000000001".to_string(), DeviceRole::Slave),
            ],
            roles(&topology)
        );
    }

    #[test]
    fn parallel_takes_precedence() {
        let document = json!({"quota": {}, "parallel": {"SN1": {}}});
        let mut out = Extraction::new();
        let topology = resolve(document.as_object().unwrap(), "SN1", &mut out).unwrap();
        assert_eq!(TopologyMode::Parallel, topology.mode);
    }

    #[test]
    fn invalid_parallel_entry() {
        let document = json!({"parallel": {"SN1": {}, "SN2": "garbage"}});
        let mut out = Extraction::new();
        let topology = resolve(document.as_object().unwrap(), "SN1", &mut out).unwrap();

        assert_eq!(1, topology.inverters.len());
        assert_eq!(
            vec![Diagnostic::InvalidTree {
                serial: "SN2".to_string()
            }],
            out.diagnostics
        );
    }

    #[test]
    fn unknown_topology() {
        let document = json!({"sysLoadPwr": 1});
        let mut out = Extraction::new();
        assert!(matches!(
            resolve(document.as_object().unwrap(), "SN1", &mut out),
            Err(Error::UnknownTopology)
        ));
    }
}
