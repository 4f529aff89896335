use std::fmt;
use std::str::FromStr;

use serde_json::{Number, Value};

use crate::ident::check_identifier;
use crate::value::{kind_name, length_of};
use crate::{Constraint, DefinitionError, Params, ValidationError};

// strings accepted for boolean parameters (compared trimmed and lowercased):
const TRUTHY: [&str; 5] = ["true", "t", "1", "yes", "y"];
const FALSY: [&str; 5] = ["false", "f", "0", "no", "n"];

/// The declared type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    String,
    Integer,
    Float,
    Boolean,
    Object,
    List,
    Any,
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown parameter type \"{0}\" (expected one of string, integer, float, boolean, object, list, any)")]
pub struct UnknownParamType(pub String);

impl ParamType {
    pub fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::List => "list",
            Self::Any => "any",
        }
    }

    /// Convert `value` into this type, or fail naming `param`.
    pub fn coerce(self, param: &str, value: &Value) -> Result<Value, ValidationError> {
        let coerced = match self {
            Self::String => coerce_string(value),
            Self::Integer => coerce_integer(value),
            Self::Float => coerce_float(value),
            Self::Boolean => coerce_boolean(value),
            Self::Object | Self::List => {
                let matches = match self {
                    Self::Object => value.is_object(),
                    _ => value.is_array(),
                };
                if matches {
                    return Ok(value.clone());
                }
                return Err(ValidationError::TypeMismatch {
                    param: param.to_owned(),
                    expected: self,
                    value: value.clone(),
                });
            }
            Self::Any => Some(value.clone()),
        };
        coerced.ok_or_else(|| ValidationError::TypeCoercion {
            param: param.to_owned(),
            expected: self,
            value: value.clone(),
        })
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ParamType {
    type Err = UnknownParamType;
    #[rustfmt::skip]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string"                => Ok(Self::String),
            "integer" | "int"       => Ok(Self::Integer),
            "float"                 => Ok(Self::Float),
            "boolean" | "bool"      => Ok(Self::Boolean),
            "object"                => Ok(Self::Object),
            "list"                  => Ok(Self::List),
            "any"                   => Ok(Self::Any),
            _ => Err(UnknownParamType(s.to_owned())),
        }
    }
}

fn coerce_string(value: &Value) -> Option<Value> {
    match value {
        Value::String(_) => Some(value.clone()),
        Value::Number(n) => Some(Value::String(n.to_string())),
        Value::Bool(b) => Some(Value::String(b.to_string())),
        // collections become their JSON text:
        Value::Array(_) | Value::Object(_) => Some(Value::String(value.to_string())),
        Value::Null => None,
    }
}

fn coerce_integer(value: &Value) -> Option<Value> {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(value.clone()),
        Value::Number(n) => n.as_f64().and_then(integral).map(Value::from),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral))
                .map(Value::from)
        }
        _ => None,
    }
}

/// `f` as an i64, if it has no fractional part and fits.
fn integral(f: f64) -> Option<i64> {
    let fits = f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64;
    fits.then_some(f as i64)
}

fn coerce_float(value: &Value) -> Option<Value> {
    let f = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    // NaN and infinities have no JSON representation:
    Number::from_f64(f).map(Value::Number)
}

fn coerce_boolean(value: &Value) -> Option<Value> {
    match value {
        Value::Bool(_) => Some(value.clone()),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(Value::Bool(false)),
            Some(1) => Some(Value::Bool(true)),
            _ => None,
        },
        Value::String(s) => {
            let s = s.trim().to_ascii_lowercase();
            if TRUTHY.contains(&s.as_str()) {
                Some(Value::Bool(true))
            } else if FALSY.contains(&s.as_str()) {
                Some(Value::Bool(false))
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Checks applied to a value after it has been coerced to its declared type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints {
    /// Applies to numbers.
    pub min_value: Option<f64>,
    /// Applies to numbers.
    pub max_value: Option<f64>,
    /// Applies to strings (in chars), lists and objects.
    pub min_length: Option<usize>,
    /// Applies to strings (in chars), lists and objects.
    pub max_length: Option<usize>,
    /// Exact-match membership.
    pub allowed_values: Option<Vec<Value>>,
}

impl Constraints {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Fail on the first constraint that `value` violates.
    pub fn check(&self, param: &str, value: &Value) -> Result<(), ValidationError> {
        let violation = |constraint: Constraint| ValidationError::ConstraintViolation {
            param: param.to_owned(),
            constraint,
            value: value.clone(),
        };

        if let Some(n) = value.as_f64() {
            if let Some(min) = self.min_value.filter(|&min| n < min) {
                return Err(violation(Constraint::MinValue(min)));
            }
            if let Some(max) = self.max_value.filter(|&max| n > max) {
                return Err(violation(Constraint::MaxValue(max)));
            }
        }

        if let Some(len) = length_of(value) {
            if let Some(min) = self.min_length.filter(|&min| len < min) {
                return Err(violation(Constraint::MinLength(min)));
            }
            if let Some(max) = self.max_length.filter(|&max| len > max) {
                return Err(violation(Constraint::MaxLength(max)));
            }
        }

        if let Some(allowed) = &self.allowed_values {
            if !allowed.contains(value) {
                return Err(violation(Constraint::AllowedValues(allowed.clone())));
            }
        }

        Ok(())
    }
}

impl fmt::Display for Constraints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::with_capacity(5);
        if let Some(v) = self.min_value {
            parts.push(Constraint::MinValue(v));
        }
        if let Some(v) = self.max_value {
            parts.push(Constraint::MaxValue(v));
        }
        if let Some(v) = self.min_length {
            parts.push(Constraint::MinLength(v));
        }
        if let Some(v) = self.max_length {
            parts.push(Constraint::MaxLength(v));
        }
        if let Some(vs) = &self.allowed_values {
            parts.push(Constraint::AllowedValues(vs.clone()));
        }
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{part}")?;
        }
        Ok(())
    }
}

/// One named, typed parameter, with an optional default and constraints.
/// Immutable once built; see [`ParameterSpec::builder`].
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    name: String,
    ty: ParamType,
    required: bool,
    default: Option<Value>,
    description: String,
    constraints: Constraints,
}

impl ParameterSpec {
    /// Start building a parameter with the given name and type.
    pub fn builder(name: impl Into<String>, ty: ParamType) -> ParameterSpecBuilder {
        ParameterSpecBuilder {
            spec: Self {
                name: name.into(),
                ty,
                required: false,
                default: None,
                description: String::new(),
                constraints: Constraints::default(),
            },
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn ty(&self) -> ParamType {
        self.ty
    }

    #[inline]
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// The default, already coerced to this parameter's type.
    #[inline]
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[inline]
    pub fn constraints(&self) -> &Constraints {
        &self.constraints
    }

    /// Coerce and check a raw value. `None` (or JSON null) means the caller
    /// didn't supply one; the result is then the default, if there is one.
    pub fn validate(&self, raw: Option<&Value>) -> Result<Option<Value>, ValidationError> {
        let raw = match raw {
            None | Some(Value::Null) => {
                return match &self.default {
                    Some(default) => Ok(Some(default.clone())),
                    None if self.required => Err(ValidationError::MissingRequired(self.name.clone())),
                    None => Ok(None),
                };
            }
            Some(raw) => raw,
        };

        let value = self.ty.coerce(&self.name, raw).map_err(|e| {
            log::trace!("rejected {} for \"{}\": {e}", kind_name(raw), self.name);
            e
        })?;
        self.constraints.check(&self.name, &value)?;
        log::trace!("\"{}\": {raw} -> {value}", self.name);
        Ok(Some(value))
    }

    // normalizes allowed values and the default to the declared type.
    fn check(mut self) -> Result<Self, DefinitionError> {
        check_identifier("parameter name", &self.name)?;

        let c = &self.constraints;
        if let (Some(min), Some(max)) = (c.min_value, c.max_value) {
            if min > max {
                return Err(self.invalid_range("value", min, max));
            }
        }
        if let (Some(min), Some(max)) = (c.min_length, c.max_length) {
            if min > max {
                return Err(self.invalid_range("length", min as f64, max as f64));
            }
        }

        if let Some(allowed) = self.constraints.allowed_values.take() {
            let allowed = allowed
                .iter()
                .map(|v| self.ty.coerce(&self.name, v))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|source| DefinitionError::InvalidAllowedValue {
                    param: self.name.clone(),
                    source,
                })?;
            self.constraints.allowed_values = Some(allowed);
        }

        if let Some(default) = self.default.take() {
            let default = self
                .ty
                .coerce(&self.name, &default)
                .and_then(|v| self.constraints.check(&self.name, &v).map(|()| v))
                .map_err(|source| DefinitionError::InvalidDefault {
                    param: self.name.clone(),
                    source,
                })?;
            self.default = Some(default);
        }

        Ok(self)
    }

    fn invalid_range(&self, field: &'static str, min: f64, max: f64) -> DefinitionError {
        DefinitionError::InvalidRange {
            param: self.name.clone(),
            field,
            min,
            max,
        }
    }
}

impl fmt::Display for ParameterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.ty)?;
        if self.required {
            f.write_str("!")?;
        }
        if let Some(default) = &self.default {
            write!(f, " = {default}")?;
        }
        if !self.constraints.is_empty() {
            write!(f, " [{}]", self.constraints)?;
        }
        if !self.description.is_empty() {
            write!(f, " \"{}\"", self.description)?;
        }
        Ok(())
    }
}

/// Builder for [`ParameterSpec`]; all checks happen in [`ParameterSpecBuilder::build`].
#[derive(Debug, Clone)]
pub struct ParameterSpecBuilder {
    spec: ParameterSpec,
}

impl ParameterSpecBuilder {
    pub fn required(mut self, required: bool) -> Self {
        self.spec.required = required;
        self
    }

    pub fn default_value(mut self, default: impl Into<Value>) -> Self {
        self.spec.default = Some(default.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.spec.description = description.into();
        self
    }

    pub fn min_value(mut self, min: f64) -> Self {
        self.spec.constraints.min_value = Some(min);
        self
    }

    pub fn max_value(mut self, max: f64) -> Self {
        self.spec.constraints.max_value = Some(max);
        self
    }

    pub fn min_length(mut self, min: usize) -> Self {
        self.spec.constraints.min_length = Some(min);
        self
    }

    pub fn max_length(mut self, max: usize) -> Self {
        self.spec.constraints.max_length = Some(max);
        self
    }

    pub fn allowed_values(mut self, values: Vec<Value>) -> Self {
        self.spec.constraints.allowed_values = Some(values);
        self
    }

    /// Replace all constraints at once.
    pub fn constraints(mut self, constraints: Constraints) -> Self {
        self.spec.constraints = constraints;
        self
    }

    pub fn build(self) -> Result<ParameterSpec, DefinitionError> {
        self.spec.check()
    }
}

/// Run every spec over `raw`; undeclared keys pass through unchanged.
/// Every declared parameter gets a key, set to null if it has no value.
pub(crate) fn validate_all(
    specs: &[ParameterSpec],
    raw: &Params,
) -> Result<Params, ValidationError> {
    let mut validated = Params::new();
    for spec in specs {
        let value = spec.validate(raw.get(spec.name()))?;
        validated.insert(spec.name().to_owned(), value.unwrap_or(Value::Null));
    }
    for (k, v) in raw {
        if !specs.iter().any(|spec| spec.name() == k) {
            validated.insert(k.clone(), v.clone());
        }
    }
    Ok(validated)
}

/// Fail if two specs in the same scope share a name.
pub(crate) fn check_unique(scope: &str, specs: &[ParameterSpec]) -> Result<(), DefinitionError> {
    for (i, spec) in specs.iter().enumerate() {
        if specs[..i].iter().any(|earlier| earlier.name == spec.name) {
            return Err(DefinitionError::DuplicateParameter {
                scope: scope.to_owned(),
                param: spec.name.clone(),
            });
        }
    }
    Ok(())
}
