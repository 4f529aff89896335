use std::ops::RangeInclusive;

use crate::ident::check_identifier;
use crate::param::{check_unique, validate_all};
use crate::{DefinitionError, ParameterSpec, Params, ValidationError};

pub const MAX_STAGE_NUMBER: u32 = 100;

const TIMEOUT_MINUTES: RangeInclusive<u64> = 1..=1440;
const MAX_RETRIES: RangeInclusive<u64> = 0..=10;
const RETRY_DELAY_SECONDS: RangeInclusive<u64> = 1..=3600;

/// One ordered step of a workflow, bound to a single task type.
///
/// Timeout and retry fields are policy data for whatever executes the stage;
/// nothing in this crate acts on them.
#[derive(Debug, Clone, PartialEq)]
pub struct StageSpec {
    number: u8,
    name: String,
    task_type: String,
    is_final: bool,
    depends_on: Vec<u8>,
    allow_parallel_tasks: bool,
    max_parallel_tasks: Option<u32>,
    timeout_minutes: u32,
    max_retries: u32,
    retry_delay_seconds: u32,
    params: Vec<ParameterSpec>,
}

impl StageSpec {
    /// Start building stage `number`, which runs tasks of type `task_type`.
    pub fn builder(number: u8, task_type: impl Into<String>) -> StageSpecBuilder {
        StageSpecBuilder {
            name: None,
            spec: Self {
                number,
                name: String::new(),
                task_type: task_type.into(),
                is_final: false,
                depends_on: Vec::new(),
                allow_parallel_tasks: true,
                max_parallel_tasks: None,
                timeout_minutes: 60,
                max_retries: 3,
                retry_delay_seconds: 60,
                params: Vec::new(),
            },
        }
    }

    #[inline]
    pub fn number(&self) -> u8 {
        self.number
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn task_type(&self) -> &str {
        &self.task_type
    }

    #[inline]
    pub fn is_final(&self) -> bool {
        self.is_final
    }

    /// Sorted, without duplicates; every entry is lower than [`Self::number`].
    #[inline]
    pub fn depends_on(&self) -> &[u8] {
        &self.depends_on
    }

    #[inline]
    pub fn allow_parallel_tasks(&self) -> bool {
        self.allow_parallel_tasks
    }

    #[inline]
    pub fn max_parallel_tasks(&self) -> Option<u32> {
        self.max_parallel_tasks
    }

    #[inline]
    pub fn timeout_minutes(&self) -> u32 {
        self.timeout_minutes
    }

    #[inline]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    #[inline]
    pub fn retry_delay_seconds(&self) -> u32 {
        self.retry_delay_seconds
    }

    #[inline]
    pub fn params(&self) -> &[ParameterSpec] {
        &self.params
    }

    /// Validate `raw` against this stage's own parameters.
    /// Keys the stage doesn't declare are kept as-is.
    pub fn validate_parameters(&self, raw: &Params) -> Result<Params, ValidationError> {
        validate_all(&self.params, raw)
    }

    fn scope(&self) -> String {
        format!("stage {}", self.number)
    }

    fn check_policy(
        &self,
        field: &'static str,
        value: u64,
        range: RangeInclusive<u64>,
    ) -> Result<(), DefinitionError> {
        if range.contains(&value) {
            Ok(())
        } else {
            Err(DefinitionError::PolicyOutOfRange {
                scope: self.scope(),
                field,
                value,
                min: *range.start(),
                max: *range.end(),
            })
        }
    }
}

/// Builder for [`StageSpec`]. Checks happen in [`StageSpecBuilder::build`].
#[derive(Debug, Clone)]
pub struct StageSpecBuilder {
    // stage name falls back to the task type:
    name: Option<String>,
    spec: StageSpec,
}

impl StageSpecBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn final_stage(mut self, is_final: bool) -> Self {
        self.spec.is_final = is_final;
        self
    }

    pub fn depends_on(mut self, stages: impl IntoIterator<Item = u8>) -> Self {
        self.spec.depends_on.extend(stages);
        self
    }

    /// Allow parallel tasks, optionally capped at `max`.
    pub fn parallel(mut self, max: Option<u32>) -> Self {
        self.spec.allow_parallel_tasks = true;
        self.spec.max_parallel_tasks = max;
        self
    }

    pub fn sequential(mut self) -> Self {
        self.spec.allow_parallel_tasks = false;
        self.spec.max_parallel_tasks = None;
        self
    }

    pub fn timeout_minutes(mut self, minutes: u32) -> Self {
        self.spec.timeout_minutes = minutes;
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.spec.max_retries = retries;
        self
    }

    pub fn retry_delay_seconds(mut self, seconds: u32) -> Self {
        self.spec.retry_delay_seconds = seconds;
        self
    }

    pub fn param(mut self, param: ParameterSpec) -> Self {
        self.spec.params.push(param);
        self
    }

    pub fn build(self) -> Result<StageSpec, DefinitionError> {
        let mut spec = self.spec;
        spec.name = self.name.unwrap_or_else(|| spec.task_type.clone());

        check_identifier("task type", &spec.task_type)?;

        if spec.number == 0 || u32::from(spec.number) > MAX_STAGE_NUMBER {
            return Err(DefinitionError::StageNumberOutOfRange(spec.number.into()));
        }

        spec.depends_on.sort_unstable();
        spec.depends_on.dedup();
        if spec.depends_on.contains(&spec.number) {
            return Err(DefinitionError::SelfDependency(spec.number));
        }
        // sorted, so the last entry is the only one that can be too high:
        if let Some(&dependency) = spec.depends_on.last() {
            if dependency > spec.number {
                return Err(DefinitionError::ForwardDependency {
                    stage: spec.number,
                    dependency,
                });
            }
        }

        spec.check_policy("timeout_minutes", spec.timeout_minutes.into(), TIMEOUT_MINUTES)?;
        spec.check_policy("max_retries", spec.max_retries.into(), MAX_RETRIES)?;
        spec.check_policy(
            "retry_delay_seconds",
            spec.retry_delay_seconds.into(),
            RETRY_DELAY_SECONDS,
        )?;
        if let Some(max) = spec.max_parallel_tasks {
            spec.check_policy("max_parallel_tasks", max.into(), 1..=u64::from(u32::MAX))?;
        }

        check_unique(&spec.scope(), &spec.params)?;

        log::trace!("built stage {} ({})", spec.number, spec.task_type);
        Ok(spec)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ParamType;
    use anyhow::Result;
    use serde_json::{json, Value};

    #[test]
    fn test_defaults() -> Result<()> {
        let stage = StageSpec::builder(1, "greeting").build()?;
        assert_eq!("greeting", stage.name());
        assert!(!stage.is_final());
        assert!(stage.depends_on().is_empty());
        assert!(stage.allow_parallel_tasks());
        assert_eq!(None, stage.max_parallel_tasks());
        assert_eq!(60, stage.timeout_minutes());
        assert_eq!(3, stage.max_retries());
        assert_eq!(60, stage.retry_delay_seconds());
        Ok(())
    }

    #[test]
    fn test_dependencies() -> Result<()> {
        assert_eq!(
            Err(DefinitionError::SelfDependency(3)),
            StageSpec::builder(3, "x").depends_on([3]).build()
        );
        assert_eq!(
            Err(DefinitionError::ForwardDependency {
                stage: 2,
                dependency: 3
            }),
            StageSpec::builder(2, "x").depends_on([3]).build()
        );
        let stage = StageSpec::builder(3, "x").depends_on([2, 1, 2]).build()?;
        assert_eq!(&[1, 2], stage.depends_on());
        Ok(())
    }

    #[test]
    fn test_number_and_identifier() {
        assert_eq!(
            Err(DefinitionError::StageNumberOutOfRange(0)),
            StageSpec::builder(0, "x").build()
        );
        assert_eq!(
            Err(DefinitionError::StageNumberOutOfRange(101)),
            StageSpec::builder(101, "x").build()
        );
        assert!(matches!(
            StageSpec::builder(1, "Greeting").build(),
            Err(DefinitionError::InvalidIdentifier {
                kind: "task type",
                ..
            })
        ));
    }

    #[test]
    fn test_policy_bounds() {
        assert_eq!(
            Err(DefinitionError::PolicyOutOfRange {
                scope: "stage 1".to_owned(),
                field: "timeout_minutes",
                value: 0,
                min: 1,
                max: 1440
            }),
            StageSpec::builder(1, "x").timeout_minutes(0).build()
        );
        assert!(StageSpec::builder(1, "x").timeout_minutes(1440).build().is_ok());
        assert!(StageSpec::builder(1, "x").max_retries(11).build().is_err());
        assert!(StageSpec::builder(1, "x").max_retries(0).build().is_ok());
        assert!(StageSpec::builder(1, "x").retry_delay_seconds(3601).build().is_err());
        assert!(StageSpec::builder(1, "x").parallel(Some(0)).build().is_err());
        assert!(StageSpec::builder(1, "x").parallel(Some(8)).build().is_ok());
    }

    #[test]
    fn test_sequential_clears_cap() -> Result<()> {
        let stage = StageSpec::builder(1, "x").parallel(Some(4)).sequential().build()?;
        assert!(!stage.allow_parallel_tasks());
        assert_eq!(None, stage.max_parallel_tasks());
        Ok(())
    }

    #[test]
    fn test_duplicate_params() -> Result<()> {
        let p = ParameterSpec::builder("a", ParamType::Any).build()?;
        assert_eq!(
            Err(DefinitionError::DuplicateParameter {
                scope: "stage 2".to_owned(),
                param: "a".to_owned()
            }),
            StageSpec::builder(2, "x").param(p.clone()).param(p).build()
        );
        Ok(())
    }

    #[test]
    fn test_validate_parameters() -> Result<()> {
        let stage = StageSpec::builder(1, "greeting")
            .param(
                ParameterSpec::builder("message", ParamType::String)
                    .default_value("hello")
                    .build()?,
            )
            .param(
                ParameterSpec::builder("loud", ParamType::Boolean)
                    .required(true)
                    .build()?,
            )
            .build()?;

        let raw = json!({"loud": "yes", "extra": 123});
        let validated = stage.validate_parameters(raw.as_object().unwrap())?;
        assert_eq!(
            json!({"message": "hello", "loud": true, "extra": 123}),
            Value::Object(validated)
        );

        let err = stage.validate_parameters(&Params::new()).unwrap_err();
        assert_eq!(ValidationError::MissingRequired("loud".to_owned()), err);
        Ok(())
    }
}
