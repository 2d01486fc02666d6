//! Unit, description and icon inference from vendor field keys. None of these fail:
//! an unknown key has no unit, describes itself and has no icon.

use crate::model::{Icon, Unit};
use lazy_static::lazy_static;

use std::collections::HashMap;

/* Points in time; `orderStartTimestamp` must not read as a current */
const UNITLESS_SUFFIXES: &[&str] = &["timestamp", "time"];

/* Checked in order against the lowercased key */
const UNIT_SUFFIXES: &[(&str, Unit)] = &[
    ("pwr", "W"),
    ("power", "W"),
    ("amp", "A"),
    ("current", "A"),
    ("vol", "V"),
    ("voltage", "V"),
    ("watth", "Wh"),
    ("energy", "Wh"),
    ("soc", "%"),
    ("soh", "%"),
    ("percent", "%"),
    ("temp", "°C"),
    ("temperature", "°C"),
];

const UNIT_KEYWORDS: &[(&str, Unit)] = &[
    ("capacity", "Ah"),
    ("generation", "kWh"),
    ("volume", "L"),
];

lazy_static! {
    static ref DESCRIPTIONS: HashMap<&'static str, &'static str> = HashMap::from([
        ("sysLoadPwr", "House load"),
        ("sysGridPwr", "Grid power"),
        ("mpptPwr", "Solar yield"),
        ("mpptPv_pwrTotal", "Solar yield of all strings"),
        ("bpPwr", "Battery power"),
        ("bpSoc", "Battery state of charge"),
        ("bpSoh", "Battery state of health"),
        ("online", "Online"),
        ("systemName", "System name"),
        ("createTime", "Installation date"),
        ("bpVol", "Battery voltage"),
        ("bpAmp", "Battery current"),
        ("bpCycles", "Charge cycles"),
        ("bpTemp", "Battery cell temperature"),
        ("bpRemainWatth", "Remaining battery energy"),
        ("chargingPwr", "Wallbox charging power"),
        ("evPwr", "Charger power"),
    ]);
    static ref ICONS: HashMap<&'static str, Icon> = HashMap::from([
        ("mpptPwr", "mdi:solar-power"),
        ("mpptPv_pwrTotal", "mdi:solar-power"),
        ("online", "mdi:cloud-check"),
        ("sysGridPwr", "mdi:transmission-tower-import"),
        ("sysLoadPwr", "mdi:home-import-outline"),
        ("bpAmp", "mdi:current-dc"),
    ]);
}

pub fn unit(key: &str) -> Option<Unit> {
    let key = key.to_lowercase();
    if UNITLESS_SUFFIXES.iter().any(|suffix| key.ends_with(suffix)) {
        return None;
    }

    UNIT_SUFFIXES
        .iter()
        .find(|(suffix, _)| key.ends_with(suffix))
        .or_else(|| {
            UNIT_KEYWORDS
                .iter()
                .find(|(keyword, _)| key.contains(keyword))
        })
        .map(|(_, unit)| *unit)
}

pub fn description(key: &str) -> String {
    DESCRIPTIONS
        .get(key)
        .map(|d| d.to_string())
        .unwrap_or_else(|| key.to_string())
}

pub fn icon(key: &str) -> Option<Icon> {
    if let Some(icon) = ICONS.get(key) {
        return Some(*icon);
    }

    if let Some(rest) = key.strip_prefix("mpptPv") {
        if !starts_with_digit(rest) {
            return None;
        }
        let rest = rest.to_lowercase();
        return if rest.ends_with("amp") {
            Some("mdi:current-dc")
        } else if rest.ends_with("pwr") {
            Some("mdi:solar-power")
        } else {
            None
        };
    }

    key.strip_prefix("pv")
        .filter(|rest| starts_with_digit(rest))
        .map(|_| "mdi:solar-power")
}

fn starts_with_digit(s: &str) -> bool {
    s.chars().next().map_or(false, |c| c.is_ascii_digit())
}
