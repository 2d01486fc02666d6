use serde_json::{Map, Value};

use std::fmt;

pub type Payload = Map<String, Value>;
pub type KeyPath = &'static [&'static str];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoxKind {
    Battery,
    Wallbox,
    Charger,
}

/// `Boxed` sub-devices come in numbers and get a numbered display prefix,
/// `Single` ones exist at most once per inverter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxMode {
    Boxed,
    Single,
}

/// Attachable sub-device whose payload is embedded in an inverter report.
pub struct BoxSchema {
    pub kind: BoxKind,
    pub mode: BoxMode,
    pub detect: fn(&Payload) -> bool,
    /// Where the sub-device serial lives; `None` means the outer report key is the serial
    pub sn_path: Option<KeyPath>,
    pub model: &'static str,
    pub name_prefix: &'static str,
    /// Sensors not found at the top level of the payload
    pub paths: &'static [(&'static str, KeyPath)],
    pub sensors: &'static [&'static str],
    /// Array fields reported as the mean of their numeric entries
    pub averages: &'static [&'static str],
}

impl BoxSchema {
    pub fn path(&self, sensor: &str) -> Option<KeyPath> {
        self.paths
            .iter()
            .find(|(name, _)| *name == sensor)
            .map(|(_, path)| *path)
    }
}

impl fmt::Debug for BoxSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxSchema")
            .field("kind", &self.kind)
            .field("mode", &self.mode)
            .field("model", &self.model)
            .finish()
    }
}

const BATTERY_SN: KeyPath = &["bpSn"];
const CHARGER_SN: KeyPath = &["evSn"];
const WALLBOX_SN: KeyPath = &["devInfo", "devSn"];
const WALLBOX_WORK_MODE: KeyPath = &["pileChargingParamReport", "paramSet", "workMode"];
const WALLBOX_CURRENT_SET: KeyPath = &["pileChargingParamReport", "paramSet", "userCurrentSet"];
const WALLBOX_CHARGING_PWR: KeyPath = &["pileChargingParamReport", "chargingPwr"];

fn is_battery(payload: &Payload) -> bool {
    payload.contains_key("bpSn")
}

fn is_wallbox(payload: &Payload) -> bool {
    payload.contains_key("pileChargingParamReport")
}

fn is_charger(payload: &Payload) -> bool {
    payload.contains_key("evPlugAndPlay")
}

/// Evaluated in order, first match wins. Each detector keys on a field no other
/// sub-device carries.
pub static BOX_SCHEMAS: &[BoxSchema] = &[
    BoxSchema {
        kind: BoxKind::Battery,
        mode: BoxMode::Boxed,
        detect: is_battery,
        sn_path: Some(BATTERY_SN),
        model: "PowerOcean Battery",
        name_prefix: "Battery",
        paths: &[],
        sensors: &[
            "bpSn",
            "bpPwr",
            "bpSoc",
            "bpSoh",
            "bpVol",
            "bpAmp",
            "bpCycles",
            "bpSysState",
            "bpRemainWatth",
            "bmsRunSta",
            "bpEnvTemp",
            "bpMinCellTemp",
            "bpMaxCellTemp",
        ],
        averages: &["bpTemp"],
    },
    BoxSchema {
        kind: BoxKind::Wallbox,
        mode: BoxMode::Boxed,
        detect: is_wallbox,
        sn_path: Some(WALLBOX_SN),
        model: "PowerOcean Wallbox",
        name_prefix: "Wallbox",
        paths: &[
            ("devSn", WALLBOX_SN),
            ("workMode", WALLBOX_WORK_MODE),
            ("userCurrentSet", WALLBOX_CURRENT_SET),
            ("chargingPwr", WALLBOX_CHARGING_PWR),
        ],
        sensors: &["devSn", "workMode", "userCurrentSet", "chargingPwr"],
        averages: &[],
    },
    BoxSchema {
        kind: BoxKind::Charger,
        mode: BoxMode::Single,
        detect: is_charger,
        sn_path: Some(CHARGER_SN),
        model: "PowerOcean Charger",
        name_prefix: "Charger",
        paths: &[],
        sensors: &[
            "evSn",
            "workMode",
            "useGridFirst",
            "evOnoffSet",
            "orderStartTimestamp",
            "onlineBits",
            "errorCode",
            "evUserManual",
            "evChargingEnergy",
            "evCurrSet",
            "chargeVehicleId",
            "chargingStatus",
            "evPwr",
        ],
        averages: &[],
    },
];

/// First sub-device schema whose detector accepts `payload`.
pub fn detect(payload: &Payload) -> Option<&'static BoxSchema> {
    BOX_SCHEMAS.iter().find(|schema| (schema.detect)(payload))
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Payload {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn detect_battery() {
        let p = payload(json!({"bpSn": "X", "bpSoc": 50}));
        assert_eq!(Some(BoxKind::Battery), detect(&p).map(|s| s.kind));
    }

    #[test]
    fn detect_wallbox() {
        let p = payload(json!({"devInfo": {"devSn": "W"}, "pileChargingParamReport": {}}));
        assert_eq!(Some(BoxKind::Wallbox), detect(&p).map(|s| s.kind));
    }

    #[test]
    fn detect_charger() {
        let p = payload(json!({"evSn": "E", "evPlugAndPlay": 1}));
        let schema = detect(&p).unwrap();
        assert_eq!(BoxKind::Charger, schema.kind);
        assert_eq!(BoxMode::Single, schema.mode);
    }

    #[test]
    fn detect_nothing() {
        assert!(detect(&payload(json!({"foo": 1}))).is_none());
        assert!(detect(&Payload::new()).is_none());
    }

    #[test]
    fn detectors_are_mutually_exclusive_on_schema_sensors() {
        /* a payload carrying every sensor of one schema must not trigger another */
        for schema in BOX_SCHEMAS {
            let mut p = Payload::new();
            for sensor in schema.sensors {
                p.insert(sensor.to_string(), json!(1));
            }
            let matches: Vec<_> = BOX_SCHEMAS
                .iter()
                .filter(|other| other.kind != schema.kind && (other.detect)(&p))
                .collect();
            assert!(matches.is_empty(), "{:?} overlaps {:?}", schema, matches);
        }
    }

    #[test]
    fn wallbox_paths() {
        let wallbox = &BOX_SCHEMAS[1];
        assert_eq!(
            Some(&["pileChargingParamReport", "chargingPwr"][..]),
            wallbox.path("chargingPwr")
        );
        assert_eq!(None, wallbox.path("unknown"));
    }
}
