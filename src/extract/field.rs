//! Field path resolution and the two schema-driven strategies built on it: generic
//! field-path extraction and plain key/value selection.

use crate::decode;
use crate::endpoint::EndpointBuilder;
use crate::error::Diagnostic;
use crate::model::Extraction;
use crate::schema::{Aggregate, SensorSpec};
use serde_json::{Map, Value};

use std::borrow::Cow;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Key(String),
    Index(usize),
    Wildcard,
}

/// Parsed `a.b[0].c[*]` style path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    steps: Vec<Step>,
}

impl FieldPath {
    pub fn parse(path: &str) -> Result<FieldPath, String> {
        let mut steps = Vec::new();

        for segment in path.split('.').filter(|s| !s.is_empty()) {
            let (name, mut rest) = match segment.find('[') {
                Some(i) => segment.split_at(i),
                None => (segment, ""),
            };

            match name {
                "" => {}
                "*" => steps.push(Step::Wildcard),
                name => steps.push(Step::Key(name.to_string())),
            }

            while let Some(open) = rest.strip_prefix('[') {
                let close = open
                    .find(']')
                    .ok_or_else(|| format!("unclosed `[` in `{}`", segment))?;
                let index = &open[..close];
                steps.push(match index {
                    "*" => Step::Wildcard,
                    index => Step::Index(
                        index
                            .parse()
                            .map_err(|_| format!("bad index `{}` in `{}`", index, segment))?,
                    ),
                });
                rest = &open[close + 1..];
            }

            if !rest.is_empty() {
                return Err(format!("trailing `{}` in `{}`", rest, segment));
            }
        }

        if steps.is_empty() {
            return Err("empty path".to_string());
        }
        Ok(FieldPath { steps })
    }

    /// Last named segment, used as endpoint key when a sensor has no label.
    pub fn leaf(&self) -> Option<&str> {
        self.steps.iter().rev().find_map(|step| match step {
            Step::Key(key) => Some(key.as_str()),
            _ => None,
        })
    }

    /// All non-null values at this path, in discovery order. Strings holding embedded
    /// JSON are decoded when the path continues below them.
    pub fn resolve<'a>(&self, root: &'a Value) -> Vec<Cow<'a, Value>> {
        let mut current = vec![Cow::Borrowed(root)];

        for step in &self.steps {
            current = current
                .into_iter()
                .flat_map(|value| descend(value, step))
                .collect();
            if current.is_empty() {
                break;
            }
        }

        current.retain(|value| !value.is_null());
        current
    }
}

fn descend<'a>(value: Cow<'a, Value>, step: &Step) -> Vec<Cow<'a, Value>> {
    let decoded = match &*value {
        Value::String(s) => decode::decode_embedded(s),
        _ => None,
    };

    match decoded {
        Some(inner) => children(&inner, step)
            .into_iter()
            .cloned()
            .map(Cow::Owned)
            .collect(),
        None => match value {
            Cow::Borrowed(v) => children(v, step).into_iter().map(Cow::Borrowed).collect(),
            Cow::Owned(v) => children(&v, step)
                .into_iter()
                .cloned()
                .map(Cow::Owned)
                .collect(),
        },
    }
}

fn children<'v>(value: &'v Value, step: &Step) -> Vec<&'v Value> {
    match (step, value) {
        (Step::Key(key), Value::Object(map)) => map.get(key).into_iter().collect(),
        (Step::Index(i), Value::Array(items)) => items.get(*i).into_iter().collect(),
        (Step::Wildcard, Value::Object(map)) => map.values().collect(),
        (Step::Wildcard, Value::Array(items)) => items.iter().collect(),
        _ => Vec::new(),
    }
}

/// Follow plain object keys, `None` as soon as a key is missing or a value is not an object.
pub fn get_nested<'v>(value: &'v Value, path: &[&str]) -> Option<&'v Value> {
    path.iter()
        .try_fold(value, |current, key| current.as_object()?.get(*key))
}

/// Sum of the numeric values; integers stay integers unless a float is involved.
pub fn sum<'v, I>(values: I) -> Option<Value>
where
    I: IntoIterator<Item = &'v Value>,
{
    let mut int_total: Option<i64> = Some(0);
    let mut float_total = 0.0;
    let mut any = false;

    for value in values {
        if let Some(n) = value.as_i64() {
            int_total = int_total.and_then(|total| total.checked_add(n));
            float_total += n as f64;
        } else if let Some(f) = value.as_f64() {
            int_total = None;
            float_total += f;
        } else {
            continue;
        }
        any = true;
    }

    match (any, int_total) {
        (false, _) => None,
        (true, Some(total)) => Some(Value::from(total)),
        (true, None) => Some(Value::from(float_total)),
    }
}

/// Resolve every sensor spec against `block` and emit the results.
pub fn extract_paths<'s, I>(
    block: &Value,
    sensors: I,
    report: &str,
    builder: &EndpointBuilder,
    out: &mut Extraction,
) where
    I: IntoIterator<Item = &'s SensorSpec>,
{
    for spec in sensors {
        let no_matches = || Diagnostic::NoMatches {
            report: report.to_string(),
            field: spec.field.clone(),
        };

        let path = match FieldPath::parse(&spec.field) {
            Ok(path) => path,
            Err(e) => {
                log::warn!("{}: invalid field path `{}`: {}", report, spec.field, e);
                out.diagnose(no_matches());
                continue;
            }
        };

        let matches = path.resolve(block);
        if matches.is_empty() {
            out.diagnose(no_matches());
            continue;
        }

        let key = spec
            .label
            .as_deref()
            .or_else(|| path.leaf())
            .unwrap_or(&spec.field);

        if spec.aggregate == Some(Aggregate::Sum) {
            match sum(matches.iter().map(|v| &**v)) {
                Some(total) => {
                    builder.emit(&mut out.endpoints, key, total);
                }
                None => out.diagnose(no_matches()),
            }
        } else if spec.per_instance {
            let instance_name = spec.instance_name.as_deref().unwrap_or("");
            /* payloads list the newest unit first, users count from the oldest */
            for (i, value) in matches.into_iter().rev().enumerate() {
                let instance = format!("{}{}", instance_name, i + 1);
                out.endpoints
                    .insert(builder.build_instance(key, Some(&instance), value.into_owned()));
            }
        } else {
            if matches.len() > 1 {
                log::debug!(
                    "{}: `{}` matched {} values, using the first",
                    report,
                    spec.field,
                    matches.len()
                );
            }
            if let Some(first) = matches.into_iter().next() {
                builder.emit(&mut out.endpoints, key, first.into_owned());
            }
        }
    }
}

/// Emit every non-null scalar field of `block` accepted by `select`.
pub fn extract_plain<F>(
    block: &Map<String, Value>,
    select: F,
    builder: &EndpointBuilder,
    out: &mut Extraction,
) where
    F: Fn(&str) -> bool,
{
    for (key, value) in block {
        if is_scalar(value) && select(key) {
            builder.emit(&mut out.endpoints, key, value.clone());
        }
    }
}

pub fn is_scalar(value: &Value) -> bool {
    !(value.is_object() || value.is_array() || value.is_null())
}
