use std::fmt;

use colored::Colorize;
use serde_json::Value;

use crate::ParamType;

/// Problems with a workflow definition itself.
/// These are bugs in a catalogue, and are only produced while building specs.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DefinitionError {
    #[error("Invalid {kind} \"{name}\": expected lowercase letters, digits, '_' or '-', starting and ending with a letter or digit")]
    InvalidIdentifier { kind: &'static str, name: String },
    #[error("Parameter \"{param}\" is declared more than once in {scope}")]
    DuplicateParameter { scope: String, param: String },
    #[error("Default value for parameter \"{param}\" is invalid")]
    InvalidDefault {
        param: String,
        #[source]
        source: ValidationError,
    },
    #[error("Allowed value for parameter \"{param}\" is invalid")]
    InvalidAllowedValue {
        param: String,
        #[source]
        source: ValidationError,
    },
    #[error("Parameter \"{param}\" has {field} minimum {min} greater than maximum {max}")]
    InvalidRange {
        param: String,
        field: &'static str,
        min: f64,
        max: f64,
    },
    #[error("Stage number {0} is out of range (1-100)")]
    StageNumberOutOfRange(u32),
    #[error("{scope}: {field} {value} is out of range ({min}-{max})")]
    PolicyOutOfRange {
        scope: String,
        field: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },
    #[error("Stage {0} depends on itself")]
    SelfDependency(u8),
    #[error("Stage {stage} depends on later stage {dependency}")]
    ForwardDependency { stage: u8, dependency: u8 },
    #[error("Workflow \"{job_type}\" has stage numbers {found:?}; expected 1 to {}", .found.len())]
    NonContiguousStageNumbering { job_type: String, found: Vec<u8> },
    #[error("Workflow \"{job_type}\" has {count} final stages; exactly one is required")]
    InvalidFinalStageCount { job_type: String, count: usize },
    #[error("Stage {stage} of workflow \"{job_type}\" depends on nonexistent stage {dependency}")]
    DanglingDependency {
        job_type: String,
        stage: u8,
        dependency: u8,
    },
    #[error("A workflow is already registered for job type \"{0}\"")]
    DuplicateRegistration(String),
}

/// Rejection of a specific set of caller-supplied parameters.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing required parameter \"{0}\"")]
    MissingRequired(String),
    #[error("Parameter \"{param}\" cannot be converted to {expected}: got {value}")]
    TypeCoercion {
        param: String,
        expected: ParamType,
        value: Value,
    },
    #[error("Parameter \"{param}\" must already be {expected}: got {value}")]
    TypeMismatch {
        param: String,
        expected: ParamType,
        value: Value,
    },
    #[error("Parameter \"{param}\" violates {constraint}: got {value}")]
    ConstraintViolation {
        param: String,
        constraint: Constraint,
        value: Value,
    },
    #[error("Unknown job type \"{job_type}\" (known job types: {})", .known.join(", "))]
    UnknownJobType { job_type: String, known: Vec<String> },
    #[error("Workflow \"{job_type}\" has no stage {stage}")]
    UnknownStage { job_type: String, stage: u8 },
}

impl ValidationError {
    /// Name of the offending parameter, if the error is about one.
    pub fn param(&self) -> Option<&str> {
        match self {
            Self::MissingRequired(param)
            | Self::TypeCoercion { param, .. }
            | Self::TypeMismatch { param, .. }
            | Self::ConstraintViolation { param, .. } => Some(param),
            Self::UnknownJobType { .. } | Self::UnknownStage { .. } => None,
        }
    }
}

/// A single constraint on a parameter value, as reported in a [`ValidationError`].
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    MinValue(f64),
    MaxValue(f64),
    MinLength(usize),
    MaxLength(usize),
    AllowedValues(Vec<Value>),
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MinValue(v) => write!(f, "min_value={v}"),
            Self::MaxValue(v) => write!(f, "max_value={v}"),
            Self::MinLength(v) => write!(f, "min_length={v}"),
            Self::MaxLength(v) => write!(f, "max_length={v}"),
            Self::AllowedValues(vs) => write!(f, "allowed_values={}", Value::Array(vs.clone())),
        }
    }
}

/// For re-throwing after we've printed a list of errors to the user.
#[derive(Debug, thiserror::Error)]
#[error("{0} failed due to {1} errors")]
pub struct AggregatedErrors(pub String, pub usize);

/// Collects errors so that a whole catalogue can be checked in one pass.
// in future we can add a `warnings` field, too.
pub struct Errors {
    errors: Vec<anyhow::Error>,
}

impl Default for Errors {
    fn default() -> Self {
        Self {
            // ideally we won't have any,
            // and we don't mind reallocating if we're already in an error state:
            errors: Vec::with_capacity(0),
        }
    }
}

impl Errors {
    pub fn add_context(&mut self, e: anyhow::Error, msg: String) {
        log::trace!("{msg}: {e:?}");
        self.errors.push(e.context(msg));
    }

    pub fn add(&mut self, e: anyhow::Error) {
        log::trace!("error: {e:?}");
        self.errors.push(e);
    }

    /// Print full list of errors to stderr, fail w/ an aggregated error
    /// if there were one or more errors.
    pub fn print_recap(&self, label: &str) -> Result<(), AggregatedErrors> {
        if self.errors.is_empty() {
            return Ok(());
        }
        eprintln!("\n{} {}:\n", "Encountered errors while".red(), label.red());
        for e in &self.errors {
            eprint!("{}: {e}", "ERROR".red());
            for cause in e.chain().skip(1) {
                eprint!("\nCaused by:\n\t{cause}");
            }
            eprintln!("\n");
        }
        Err(AggregatedErrors(label.to_owned(), self.errors.len()))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_constraint_display() {
        assert_eq!("max_value=100", Constraint::MaxValue(100.0).to_string());
        assert_eq!("min_value=0.5", Constraint::MinValue(0.5).to_string());
        assert_eq!(
            "allowed_values=[\"a\",\"b\"]",
            Constraint::AllowedValues(vec![json!("a"), json!("b")]).to_string()
        );
    }

    #[test]
    fn test_violation_names_param_constraint_and_value() {
        let e = ValidationError::ConstraintViolation {
            param: "n".to_owned(),
            constraint: Constraint::MaxValue(100.0),
            value: json!(500),
        };
        assert_eq!("Parameter \"n\" violates max_value=100: got 500", e.to_string());
        assert_eq!(Some("n"), e.param());
    }

    #[test]
    fn test_unknown_job_type_lists_known() {
        let e = ValidationError::UnknownJobType {
            job_type: "nope".to_owned(),
            known: vec!["a".to_owned(), "b".to_owned()],
        };
        assert_eq!("Unknown job type \"nope\" (known job types: a, b)", e.to_string());
        assert_eq!(None, e.param());
    }

    #[test]
    fn test_errors_recap() {
        let mut errors = Errors::default();
        assert!(errors.print_recap("checking").is_ok());
        errors.add(DefinitionError::SelfDependency(3).into());
        errors.add_context(
            DefinitionError::DuplicateRegistration("x".to_owned()).into(),
            "while registering".to_owned(),
        );
        let err = errors.print_recap("checking").unwrap_err();
        assert_eq!("checking failed due to 2 errors", err.to_string());
    }
}
