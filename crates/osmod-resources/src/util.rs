//! Small helpers shared by the resource modules

use osmod_core::Params;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Copy parameters into a request body under cloud field names
///
/// Each pair is `(parameter, field)`. Unset parameters are skipped.
pub(crate) fn copy_params(params: &Params, pairs: &[(&str, &str)], body: &mut Map<String, Value>) {
    for (param, field) in pairs {
        if let Some(value) = params.get(param) {
            body.insert((*field).to_string(), value.clone());
        }
    }
}

/// Bool that some services return as the strings "true"/"false"
pub(crate) fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(flag)) => Ok(Some(flag)),
        Some(Value::String(s)) => match s.to_ascii_lowercase().as_str() {
            "true" => Ok(Some(true)),
            "false" | "" => Ok(Some(false)),
            other => Err(serde::de::Error::custom(format!("invalid bool: {}", other))),
        },
        Some(other) => Err(serde::de::Error::custom(format!("invalid bool: {}", other))),
    }
}
