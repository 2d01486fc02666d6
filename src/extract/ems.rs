//! EMS heartbeat: flat scalars, three phase objects and the per-string PV array.

use super::field;
use crate::endpoint::EndpointBuilder;
use crate::model::Extraction;
use crate::schema::ReportSpec;
use serde_json::{Map, Value};

const PHASES: [&str; 3] = ["pcsAPhase", "pcsBPhase", "pcsCPhase"];

const STRING_GROUP: &str = "mpptHeartBeat";
const STRING_PREFIX: &str = "mpptPv";
const STRING_POWER: &str = "pwr";
const TOTAL_KEY: &str = "mpptPv_pwrTotal";

pub fn extract(
    block: &Map<String, Value>,
    spec: &ReportSpec,
    builder: &EndpointBuilder,
    out: &mut Extraction,
) {
    field::extract_plain(block, |key| spec.selects(key), builder, out);

    let phases: Option<Vec<&Map<String, Value>>> = PHASES
        .iter()
        .map(|phase| block.get(*phase).and_then(Value::as_object))
        .collect();

    match phases {
        Some(phases) => {
            for (name, phase) in PHASES.iter().zip(phases) {
                emit_prefixed(phase, name, builder, out);
            }
        }
        None => log::trace!("no three phase data in EMS heartbeat"),
    }

    if let Some(strings) = pv_strings(block) {
        let string_builder = builder.clone().group(STRING_GROUP);
        for (i, string) in strings.iter().enumerate() {
            if let Some(fields) = string.as_object() {
                let prefix = format!("{}{}", STRING_PREFIX, i + 1);
                emit_prefixed(fields, &prefix, &string_builder, out);
            }
        }

        let powers = strings.iter().filter_map(|string| string.get(STRING_POWER));
        if let Some(total) = field::sum(powers) {
            let mut endpoint = string_builder.build(TOTAL_KEY, total);
            endpoint.unit = Some("W");
            endpoint.icon = Some("mdi:solar-power");
            out.endpoints.insert(endpoint);
        }
    }
}

/// `mpptHeartBeat[0].mpptPv`, one object per PV string.
fn pv_strings(block: &Map<String, Value>) -> Option<&Vec<Value>> {
    block
        .get("mpptHeartBeat")?
        .as_array()?
        .first()?
        .get("mpptPv")?
        .as_array()
}

fn emit_prefixed(
    fields: &Map<String, Value>,
    prefix: &str,
    builder: &EndpointBuilder,
    out: &mut Extraction,
) {
    for (key, value) in fields {
        if field::is_scalar(value) {
            builder.emit(
                &mut out.endpoints,
                &format!("{}_{}", prefix, key),
                value.clone(),
            );
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::schema::SensorSpec;
    use serde_json::json;

    fn spec() -> ReportSpec {
        ReportSpec {
            report: "EMS_HEARTBEAT".to_string(),
            sensors: vec![SensorSpec::field("bpRemainWatth")],
        }
    }

    fn run(block: Value) -> Extraction {
        let builder = EndpointBuilder::new("SN1", Some("EMS_HEARTBEAT"));
        let mut out = Extraction::new();
        extract(block.as_object().unwrap(), &spec(), &builder, &mut out);
        out
    }

    fn value(out: &Extraction, id: &str) -> Option<Value> {
        out.endpoints.get(id).map(|e| e.value.clone())
    }

    #[test]
    fn selected_scalars() {
        let out = run(json!({"bpRemainWatth": 5120, "emsSysSelfCheck": 1}));
        assert_eq!(Some(json!(5120)), value(&out, "SN1_EMS_HEARTBEAT_bpRemainWatth"));
        assert_eq!(1, out.endpoints.len());
    }

    #[test]
    fn phases() {
        let out = run(json!({
            "pcsAPhase": {"vol": 230.1, "amp": 1.2},
            "pcsBPhase": {"vol": 229.8, "amp": 1.1},
            "pcsCPhase": {"vol": 231.0, "amp": 1.3},
        }));

        assert_eq!(6, out.endpoints.len());
        let voltage = out.endpoints.get("SN1_EMS_HEARTBEAT_pcsBPhase_vol").unwrap();
        assert_eq!(json!(229.8), voltage.value);
        assert_eq!(Some("V"), voltage.unit);
    }

    #[test]
    fn incomplete_phases_are_ignored() {
        let out = run(json!({
            "pcsAPhase": {"vol": 230.1},
            "pcsBPhase": {"vol": 229.8},
        }));
        assert!(out.endpoints.is_empty());
    }

    #[test]
    fn pv_strings_and_total() {
        let out = run(json!({"mpptHeartBeat": [{"mpptPv": [
            {"pwr": 120, "vol": 310.5, "amp": 0.4},
            {"pwr": 80, "vol": 305.0, "amp": 0.3},
            {"pwr": 0, "vol": 0.0, "amp": 0.0},
        ]}]}));

        assert_eq!(
            Some(json!(80)),
            value(&out, "SN1_EMS_HEARTBEAT_mpptHeartBeat_mpptPv2_pwr")
        );
        assert_eq!(
            Some(json!(0.0)),
            value(&out, "SN1_EMS_HEARTBEAT_mpptHeartBeat_mpptPv3_vol")
        );

        let total = out
            .endpoints
            .get("SN1_EMS_HEARTBEAT_mpptHeartBeat_mpptPv_pwrTotal")
            .unwrap();
        assert_eq!(json!(200), total.value);
        assert_eq!("mpptPv_pwrTotal", total.friendly_name);
        assert_eq!(Some("W"), total.unit);
        assert_eq!(Some("mdi:solar-power"), total.icon);
        assert_eq!("Solar yield of all strings", total.description);

        assert_eq!(10, out.endpoints.len());
    }

    #[test]
    fn string_count_follows_payload() {
        let out = run(json!({"mpptHeartBeat": [{"mpptPv": [{"pwr": 10}]}]}));
        assert!(out
            .endpoints
            .contains_key("SN1_EMS_HEARTBEAT_mpptHeartBeat_mpptPv1_pwr"));
        assert!(!out
            .endpoints
            .contains_key("SN1_EMS_HEARTBEAT_mpptHeartBeat_mpptPv2_pwr"));
        assert_eq!(
            Some(json!(10)),
            value(&out, "SN1_EMS_HEARTBEAT_mpptHeartBeat_mpptPv_pwrTotal")
        );
    }
}
