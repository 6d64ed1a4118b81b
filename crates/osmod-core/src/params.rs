//! Argument specification and normalization
//!
//! Every module declares an [`ArgumentSpec`]. The engine normalizes the raw
//! arguments handed over by the automation host against it before anything
//! touches the cloud: aliases are folded, values are coerced the way the
//! host coerces them, defaults are filled in and cross-parameter rules are
//! checked. Any violation is an [`Error::Validation`].
//!
//! ```rust
//! use osmod_core::params::{ArgumentSpec, ParamSpec};
//! use serde_json::json;
//!
//! let spec = ArgumentSpec::cloud_module()
//!     .state()
//!     .param(ParamSpec::str("name").required())
//!     .param(ParamSpec::int("ttl"));
//!
//! let raw = json!({"name": "example.net.", "ttl": "7200"});
//! let params = spec.normalize(raw.as_object().unwrap()).unwrap();
//! assert_eq!(params.int("ttl"), Some(7200));
//! assert_eq!(params.str("state"), Some("present"));
//! assert!(!params.is_supplied("state"));
//! ```

use serde_json::{Map, Number, Value};
use std::collections::BTreeSet;
use std::fmt;

use crate::error::{Error, Result};

/// Prefix of host-internal arguments (check mode flag, verbosity, ...)
pub const INTERNAL_PREFIX: &str = "_ansible_";

/// Replacement for `no_log` values in logs
pub const REDACTED: &str = "********";

/// Default wait timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: i64 = 180;

/// Parameter type
#[derive(Debug, Clone, PartialEq)]
pub enum ParamType {
    Str,
    Int,
    Float,
    Bool,
    /// List with the given element type
    List(Box<ParamType>),
    Dict,
    /// Passed through untouched
    Raw,
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Str => f.write_str("str"),
            ParamType::Int => f.write_str("int"),
            ParamType::Float => f.write_str("float"),
            ParamType::Bool => f.write_str("bool"),
            ParamType::List(element) => write!(f, "list of {}", element),
            ParamType::Dict => f.write_str("dict"),
            ParamType::Raw => f.write_str("raw"),
        }
    }
}

/// Declaration of a single parameter
#[derive(Debug, Clone)]
pub struct ParamSpec {
    name: &'static str,
    ty: ParamType,
    required: bool,
    default: Option<Value>,
    choices: Vec<Value>,
    aliases: Vec<&'static str>,
    no_log: bool,
    options: Option<ArgumentSpec>,
}

impl ParamSpec {
    pub fn new(name: &'static str, ty: ParamType) -> Self {
        Self {
            name,
            ty,
            required: false,
            default: None,
            choices: Vec::new(),
            aliases: Vec::new(),
            no_log: false,
            options: None,
        }
    }

    pub fn str(name: &'static str) -> Self {
        Self::new(name, ParamType::Str)
    }

    pub fn int(name: &'static str) -> Self {
        Self::new(name, ParamType::Int)
    }

    pub fn float(name: &'static str) -> Self {
        Self::new(name, ParamType::Float)
    }

    pub fn bool(name: &'static str) -> Self {
        Self::new(name, ParamType::Bool)
    }

    pub fn dict(name: &'static str) -> Self {
        Self::new(name, ParamType::Dict)
    }

    pub fn list(name: &'static str, element: ParamType) -> Self {
        Self::new(name, ParamType::List(Box::new(element)))
    }

    pub fn raw(name: &'static str) -> Self {
        Self::new(name, ParamType::Raw)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn choices(mut self, choices: &[&str]) -> Self {
        self.choices = choices.iter().map(|c| Value::from(*c)).collect();
        self
    }

    pub fn alias(mut self, alias: &'static str) -> Self {
        self.aliases.push(alias);
        self
    }

    /// Mask the value whenever parameters are logged
    pub fn no_log(mut self) -> Self {
        self.no_log = true;
        self
    }

    /// Nested options for a dict or a list of dicts
    pub fn options(mut self, options: ArgumentSpec) -> Self {
        self.options = Some(options);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn param_type(&self) -> &ParamType {
        &self.ty
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    fn answers_to(&self, key: &str) -> bool {
        self.name == key || self.aliases.contains(&key)
    }

    fn coerce(&self, value: &Value, path: &str) -> Result<Value> {
        let coerced = coerce_to(&self.ty, self.name, value, self.options.as_ref(), path)?;

        if !self.choices.is_empty() {
            let candidates: Vec<&Value> = match &coerced {
                Value::Array(items) => items.iter().collect(),
                other => vec![other],
            };
            if let Some(bad) = candidates.iter().find(|v| !self.choices.contains(v)) {
                let allowed: Vec<String> = self.choices.iter().map(render).collect();
                return Err(Error::validation(format!(
                    "value of {} must be one of: {}, got: {}{}",
                    self.name,
                    allowed.join(", "),
                    render(bad),
                    found_in(path)
                )));
            }
        }

        Ok(coerced)
    }
}

#[derive(Debug, Clone)]
struct RequiredIf {
    param: &'static str,
    value: Value,
    requires: Vec<&'static str>,
    any: bool,
}

/// Schema of a module's parameters plus cross-parameter rules
#[derive(Debug, Clone, Default)]
pub struct ArgumentSpec {
    params: Vec<ParamSpec>,
    mutually_exclusive: Vec<Vec<&'static str>>,
    required_one_of: Vec<Vec<&'static str>>,
    required_together: Vec<Vec<&'static str>>,
    required_if: Vec<RequiredIf>,
}

impl ArgumentSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spec seeded with the arguments shared by every cloud module
    pub fn cloud_module() -> Self {
        Self::new()
            .param(ParamSpec::bool("wait").default(true))
            .param(ParamSpec::int("timeout").default(DEFAULT_TIMEOUT_SECS))
    }

    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    /// Add the usual `state: present|absent` parameter
    pub fn state(self) -> Self {
        self.param(
            ParamSpec::str("state")
                .choices(&["present", "absent"])
                .default("present"),
        )
    }

    pub fn mutually_exclusive(mut self, group: &[&'static str]) -> Self {
        self.mutually_exclusive.push(group.to_vec());
        self
    }

    pub fn required_one_of(mut self, group: &[&'static str]) -> Self {
        self.required_one_of.push(group.to_vec());
        self
    }

    pub fn required_together(mut self, group: &[&'static str]) -> Self {
        self.required_together.push(group.to_vec());
        self
    }

    /// When `param == value`, all of `requires` must be set
    pub fn required_if(
        mut self,
        param: &'static str,
        value: impl Into<Value>,
        requires: &[&'static str],
    ) -> Self {
        self.required_if.push(RequiredIf {
            param,
            value: value.into(),
            requires: requires.to_vec(),
            any: false,
        });
        self
    }

    /// When `param == value`, at least one of `requires` must be set
    pub fn required_if_any(
        mut self,
        param: &'static str,
        value: impl Into<Value>,
        requires: &[&'static str],
    ) -> Self {
        self.required_if.push(RequiredIf {
            param,
            value: value.into(),
            requires: requires.to_vec(),
            any: true,
        });
        self
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    pub fn get(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    fn lookup(&self, key: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.answers_to(key))
    }

    /// Validate and normalize raw arguments
    pub fn normalize(&self, raw: &Map<String, Value>) -> Result<Params> {
        self.normalize_at(raw, "")
    }

    fn normalize_at(&self, raw: &Map<String, Value>, path: &str) -> Result<Params> {
        let mut values = Map::new();
        let mut supplied = BTreeSet::new();
        let mut unknown = Vec::new();

        for (key, value) in raw {
            if key.starts_with(INTERNAL_PREFIX) {
                continue;
            }
            let Some(spec) = self.lookup(key) else {
                unknown.push(key.as_str());
                continue;
            };
            if value.is_null() {
                continue;
            }
            if supplied.contains(spec.name) {
                return Err(Error::validation(format!(
                    "both option {} and its alias {} are set{}",
                    spec.name,
                    key,
                    found_in(path)
                )));
            }
            values.insert(spec.name.to_string(), spec.coerce(value, path)?);
            supplied.insert(spec.name.to_string());
        }

        if !unknown.is_empty() {
            unknown.sort_unstable();
            let mut known: Vec<&str> = self
                .params
                .iter()
                .flat_map(|p| std::iter::once(p.name).chain(p.aliases.iter().copied()))
                .collect();
            known.sort_unstable();
            return Err(Error::validation(format!(
                "Unsupported parameters: {}{}. Supported parameters include: {}",
                unknown.join(", "),
                found_in(path),
                known.join(", ")
            )));
        }

        for group in &self.mutually_exclusive {
            let set: Vec<&str> = group
                .iter()
                .copied()
                .filter(|name| supplied.contains(*name))
                .collect();
            if set.len() > 1 {
                return Err(Error::validation(format!(
                    "parameters are mutually exclusive: {}{}",
                    group.join("|"),
                    found_in(path)
                )));
            }
        }

        for spec in &self.params {
            if values.contains_key(spec.name) {
                continue;
            }
            if let Some(default) = &spec.default {
                values.insert(spec.name.to_string(), default.clone());
            }
        }

        let missing: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required && !values.contains_key(p.name))
            .map(|p| p.name)
            .collect();
        if !missing.is_empty() {
            return Err(Error::validation(format!(
                "missing required arguments: {}{}",
                missing.join(", "),
                found_in(path)
            )));
        }

        for group in &self.required_one_of {
            if !group.iter().any(|name| values.contains_key(*name)) {
                return Err(Error::validation(format!(
                    "one of the following is required: {}{}",
                    group.join(", "),
                    found_in(path)
                )));
            }
        }

        for group in &self.required_together {
            let present = group.iter().filter(|n| values.contains_key(**n)).count();
            if present != 0 && present != group.len() {
                return Err(Error::validation(format!(
                    "parameters are required together: {}{}",
                    group.join(", "),
                    found_in(path)
                )));
            }
        }

        for rule in &self.required_if {
            if values.get(rule.param) != Some(&rule.value) {
                continue;
            }
            let missing: Vec<&str> = rule
                .requires
                .iter()
                .copied()
                .filter(|name| !values.contains_key(*name))
                .collect();
            let violated = if rule.any {
                missing.len() == rule.requires.len()
            } else {
                !missing.is_empty()
            };
            if violated {
                return Err(Error::validation(format!(
                    "{} is {} but {} of the following are missing: {}{}",
                    rule.param,
                    render(&rule.value),
                    if rule.any { "any" } else { "all" },
                    missing.join(", "),
                    found_in(path)
                )));
            }
        }

        Ok(Params { values, supplied })
    }

    /// Parameters as a JSON object with `no_log` values masked
    pub fn redact(&self, params: &Params) -> Value {
        let mut out = params.values.clone();
        for spec in &self.params {
            if spec.no_log && out.contains_key(spec.name) {
                out.insert(spec.name.to_string(), Value::from(REDACTED));
            }
        }
        Value::Object(out)
    }
}

fn coerce_to(
    ty: &ParamType,
    name: &str,
    value: &Value,
    options: Option<&ArgumentSpec>,
    path: &str,
) -> Result<Value> {
    let fail = || {
        Error::validation(format!(
            "argument '{}' is of type {} and we were unable to convert to {}{}",
            name,
            json_type(value),
            ty,
            found_in(path)
        ))
    };

    match ty {
        ParamType::Raw => Ok(value.clone()),
        ParamType::Str => match value {
            Value::String(_) => Ok(value.clone()),
            Value::Number(n) => Ok(Value::from(n.to_string())),
            Value::Bool(b) => Ok(Value::from(b.to_string())),
            _ => Err(fail()),
        },
        ParamType::Int => match value {
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
            Value::Number(n) => match n.as_f64() {
                Some(f) if f.fract() == 0.0 => Ok(Value::from(f as i64)),
                _ => Err(fail()),
            },
            Value::String(s) => s.trim().parse::<i64>().map(Value::from).map_err(|_| fail()),
            _ => Err(fail()),
        },
        ParamType::Float => match value {
            Value::Number(n) => n
                .as_f64()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(fail),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(fail),
            _ => Err(fail()),
        },
        ParamType::Bool => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::String(s) => parse_bool(s).map(Value::from).ok_or_else(fail),
            Value::Number(n) => match n.as_i64() {
                Some(1) => Ok(Value::from(true)),
                Some(0) => Ok(Value::from(false)),
                _ => Err(fail()),
            },
            _ => Err(fail()),
        },
        ParamType::Dict => {
            let object = match value {
                Value::Object(map) => map.clone(),
                Value::String(s) => match serde_json::from_str::<Value>(s) {
                    Ok(Value::Object(map)) => map,
                    _ => return Err(fail()),
                },
                _ => return Err(fail()),
            };
            match options {
                Some(spec) => {
                    let nested = spec.normalize_at(&object, &nested_path(path, name))?;
                    Ok(Value::Object(nested.values))
                }
                None => Ok(Value::Object(object)),
            }
        }
        ParamType::List(element) => {
            let items: Vec<Value> = match value {
                Value::Array(items) => items.clone(),
                Value::String(s) => s
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(Value::from)
                    .collect(),
                Value::Object(_) => return Err(fail()),
                other => vec![other.clone()],
            };
            items
                .iter()
                .map(|item| coerce_to(element, name, item, options, path))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array)
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "y" | "t" | "1" => Some(true),
        "false" | "no" | "off" | "n" | "f" | "0" => Some(false),
        _ => None,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn nested_path(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{} -> {}", path, name)
    }
}

fn found_in(path: &str) -> String {
    if path.is_empty() {
        String::new()
    } else {
        format!(" found in {}", path)
    }
}

/// Normalized module parameters
///
/// Holds every value after defaults were applied, and remembers which names
/// the caller actually supplied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    values: Map<String, Value>,
    supplied: BTreeSet<String>,
}

impl Params {
    /// Build params where every value counts as supplied
    pub fn from_values(values: Map<String, Value>) -> Self {
        let supplied = values.keys().cloned().collect();
        Self { values, supplied }
    }

    /// Only the explicitly supplied values
    ///
    /// Diffs use this view: a parameter the caller left out means
    /// "leave as configured", even if it has a default.
    pub fn explicit(&self) -> Params {
        let values = self
            .values
            .iter()
            .filter(|(k, _)| self.supplied.contains(*k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Params {
            values,
            supplied: self.supplied.clone(),
        }
    }

    pub fn is_supplied(&self, name: &str) -> bool {
        self.supplied.contains(name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.values.get(name).and_then(Value::as_i64)
    }

    pub fn float(&self, name: &str) -> Option<f64> {
        self.values.get(name).and_then(Value::as_f64)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.values.get(name).and_then(Value::as_bool)
    }

    pub fn dict(&self, name: &str) -> Option<&Map<String, Value>> {
        self.values.get(name).and_then(Value::as_object)
    }

    pub fn list_str(&self, name: &str) -> Option<Vec<String>> {
        self.values.get(name).and_then(Value::as_array).map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }
}
