//! Argument model - typed command-line arguments and argv rendering

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::is_false;

/// Required arguments that could not be resolved from runtime overrides,
/// stored values or defaults. This is the configuration-required gate, not a
/// lifecycle failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("missing required arguments: {}", missing.join(", "))]
pub struct IncompleteConfiguration {
    pub missing: Vec<String>,
}

/// Stored value of an argument; multi-valued arguments hold a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    One(String),
    Many(Vec<String>),
}

impl ArgValue {
    fn to_vec(&self) -> Vec<String> {
        match self {
            ArgValue::One(v) => vec![v.clone()],
            ArgValue::Many(vs) => vs.clone(),
        }
    }
}

impl From<&str> for ArgValue {
    fn from(v: &str) -> Self {
        ArgValue::One(v.to_string())
    }
}

/// Interpreted form of the `type` tag carried by an [`Argument`].
#[derive(Debug, Clone, PartialEq)]
pub enum ArgKind {
    Text,
    Password,
    Path,
    File,
    Bool,
    Int { min: Option<i64>, max: Option<i64> },
    Float { min: Option<f64>, max: Option<f64> },
    Selection(Vec<String>),
}

fn parse_range<T: std::str::FromStr>(body: &str) -> (Option<T>, Option<T>) {
    match body.split_once("..") {
        Some((lo, hi)) => (lo.parse().ok(), hi.parse().ok()),
        None => (None, None),
    }
}

impl ArgKind {
    /// Parse a type tag such as `bool`, `int[0..6]`, `float[0.0..1.0]` or
    /// `selection[lidarts,nakka,dartboards]`. Unknown tags fall back to text.
    pub fn parse(tag: &str) -> Self {
        let (head, body) = match tag.split_once('[') {
            Some((head, rest)) => (head, rest.strip_suffix(']').unwrap_or(rest)),
            None => (tag, ""),
        };
        match head {
            "password" => ArgKind::Password,
            "path" => ArgKind::Path,
            "file" => ArgKind::File,
            "bool" => ArgKind::Bool,
            "int" => {
                let (min, max) = parse_range(body);
                ArgKind::Int { min, max }
            }
            "float" => {
                let (min, max) = parse_range(body);
                ArgKind::Float { min, max }
            }
            "selection" => {
                ArgKind::Selection(body.split(',').map(|s| s.trim().to_string()).collect())
            }
            _ => ArgKind::Text,
        }
    }

    /// Check a candidate value against the type
    pub fn validate(&self, value: &str) -> Result<(), String> {
        match self {
            ArgKind::Text | ArgKind::Password | ArgKind::Path | ArgKind::File => Ok(()),
            ArgKind::Bool => match value {
                "True" | "False" | "true" | "false" | "1" | "0" => Ok(()),
                _ => Err(format!("'{value}' is not a boolean")),
            },
            ArgKind::Int { min, max } => {
                let n: i64 = value
                    .parse()
                    .map_err(|_| format!("'{value}' is not an integer"))?;
                if min.map_or(false, |lo| n < lo) || max.map_or(false, |hi| n > hi) {
                    return Err(format!("{n} is outside the allowed range"));
                }
                Ok(())
            }
            ArgKind::Float { min, max } => {
                let n: f64 = value
                    .parse()
                    .map_err(|_| format!("'{value}' is not a number"))?;
                if min.map_or(false, |lo| n < lo) || max.map_or(false, |hi| n > hi) {
                    return Err(format!("{n} is outside the allowed range"));
                }
                Ok(())
            }
            ArgKind::Selection(options) => {
                if options.iter().any(|o| o == value) {
                    Ok(())
                } else {
                    Err(format!("'{value}' is not one of {options:?}"))
                }
            }
        }
    }
}

/// One command-line argument an app accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    pub name: String,
    /// Type tag, e.g. `string`, `bool`, `int[0..6]`, `selection[a,b]`
    #[serde(rename = "type")]
    pub arg_type: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,
    /// Display name for the configuration surface
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name_human: String,
    /// Display grouping
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub section: String,
    /// User-chosen value, persisted unless the argument is runtime-only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<ArgValue>,
    /// Fallback when no value is set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Logical-to-wire value translation, e.g. {"True": "1", "False": "0"}
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_mapping: Option<HashMap<String, String>>,
    /// `other=value` - required only while `other` currently holds `value`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_on_argument: Option<String>,
    /// Supplied at launch time, never persisted
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_runtime_argument: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_multi: bool,
}

impl Argument {
    pub fn new(name: impl Into<String>, arg_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arg_type: arg_type.into(),
            required: false,
            name_human: String::new(),
            section: String::new(),
            value: None,
            default: None,
            value_mapping: None,
            required_on_argument: None,
            is_runtime_argument: false,
            is_multi: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn human(mut self, name: impl Into<String>) -> Self {
        self.name_human = name.into();
        self
    }

    pub fn section(mut self, section: impl Into<String>) -> Self {
        self.section = section.into();
        self
    }

    pub fn value(mut self, value: impl Into<ArgValue>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn bool_mapped(mut self) -> Self {
        self.value_mapping = Some(HashMap::from([
            ("True".to_string(), "1".to_string()),
            ("False".to_string(), "0".to_string()),
        ]));
        self
    }

    pub fn required_on(mut self, condition: impl Into<String>) -> Self {
        self.required_on_argument = Some(condition.into());
        self
    }

    pub fn runtime(mut self) -> Self {
        self.is_runtime_argument = true;
        self
    }

    pub fn multi(mut self) -> Self {
        self.is_multi = true;
        self
    }

    pub fn kind(&self) -> ArgKind {
        ArgKind::parse(&self.arg_type)
    }
}

/// Ordered argument set of one app, plus how the flags are spelled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// Flag prefix, e.g. `-` or `--`
    pub prefix: String,
    /// Between flag and value; a space splits them into two argv entries
    pub delimiter: String,
    pub arguments: Vec<Argument>,
}

impl Configuration {
    pub fn new(prefix: impl Into<String>, delimiter: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            delimiter: delimiter.into(),
            arguments: Vec::new(),
        }
    }

    pub fn with_arguments(mut self, arguments: Vec<Argument>) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn argument(&self, name: &str) -> Option<&Argument> {
        self.arguments.iter().find(|a| a.name == name)
    }

    /// Validate and store a user-chosen value. Runtime-only arguments are
    /// rejected here; they are passed at launch time instead.
    pub fn set_value(&mut self, name: &str, value: ArgValue) -> crate::Result<()> {
        let argument = self
            .arguments
            .iter_mut()
            .find(|a| a.name == name)
            .ok_or_else(|| crate::Error::InvalidArgument(format!("unknown argument '{name}'")))?;
        if argument.is_runtime_argument {
            return Err(crate::Error::InvalidArgument(format!(
                "'{name}' is runtime-only and cannot be stored"
            )));
        }
        let kind = argument.kind();
        match &value {
            ArgValue::One(v) => kind.validate(v),
            ArgValue::Many(vs) => vs.iter().try_for_each(|v| kind.validate(v)),
        }
        .map_err(crate::Error::InvalidArgument)?;
        argument.value = Some(value);
        Ok(())
    }

    pub fn clear_value(&mut self, name: &str) {
        if let Some(argument) = self.arguments.iter_mut().find(|a| a.name == name) {
            argument.value = None;
        }
    }

    /// Current effective values of one argument: runtime override, then
    /// stored value, then default.
    fn resolved_values(&self, argument: &Argument, runtime: &HashMap<String, String>) -> Vec<String> {
        if let Some(v) = runtime.get(&argument.name) {
            return vec![v.clone()];
        }
        if let Some(v) = &argument.value {
            return v.to_vec();
        }
        if let Some(d) = &argument.default {
            return vec![d.clone()];
        }
        Vec::new()
    }

    /// Whether an argument is required right now, taking conditional
    /// requirements against current runtime/override values into account.
    fn is_required_now(&self, argument: &Argument, runtime: &HashMap<String, String>) -> bool {
        if argument.required {
            return true;
        }
        let Some(condition) = &argument.required_on_argument else {
            return false;
        };
        let Some((other, trigger)) = condition.split_once('=') else {
            return false;
        };
        let Some(other_argument) = self.argument(other) else {
            return false;
        };
        self.resolved_values(other_argument, runtime)
            .first()
            .is_some_and(|current| current.as_str() == trigger)
    }

    /// Render the process argument vector in declaration order. Multi-valued
    /// arguments repeat the flag once per value; value mappings translate
    /// logical values to their wire form. Unresolved required arguments are
    /// reported instead of silently omitted.
    pub fn render_args(
        &self,
        runtime: &HashMap<String, String>,
    ) -> Result<Vec<String>, IncompleteConfiguration> {
        let mut argv = Vec::new();
        let mut missing = Vec::new();

        for argument in &self.arguments {
            let values = self.resolved_values(argument, runtime);
            if values.is_empty() {
                if self.is_required_now(argument, runtime) {
                    missing.push(argument.name.clone());
                }
                continue;
            }
            for value in values {
                let wire = argument
                    .value_mapping
                    .as_ref()
                    .and_then(|m| m.get(&value))
                    .cloned()
                    .unwrap_or(value);
                let flag = format!("{}{}", self.prefix, argument.name);
                if self.delimiter == " " {
                    argv.push(flag);
                    argv.push(wire);
                } else {
                    argv.push(format!("{}{}{}", flag, self.delimiter, wire));
                }
            }
        }

        if missing.is_empty() {
            Ok(argv)
        } else {
            Err(IncompleteConfiguration { missing })
        }
    }
}
