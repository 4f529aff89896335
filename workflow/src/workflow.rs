use util::HashSet;

use crate::ident::check_identifier;
use crate::param::{check_unique, validate_all};
use crate::{DefinitionError, ParameterSpec, Params, StageSpec, ValidationError};

/// The complete, checked definition of one job type:
/// its stages in number order, plus parameters shared by every stage.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowSpec {
    job_type: String,
    name: String,
    description: String,
    version: String,
    stages: Vec<StageSpec>,
    final_index: usize,
    params: Vec<ParameterSpec>,
    max_total_duration_minutes: u32,
    allow_partial_failure: bool,
}

impl WorkflowSpec {
    /// Start building the workflow for `job_type`.
    pub fn builder(job_type: impl Into<String>) -> WorkflowSpecBuilder {
        WorkflowSpecBuilder {
            name: None,
            spec: Self {
                job_type: job_type.into(),
                name: String::new(),
                description: String::new(),
                version: "1.0".to_owned(),
                stages: Vec::with_capacity(4),
                final_index: 0,
                params: Vec::new(),
                max_total_duration_minutes: 1440,
                allow_partial_failure: false,
            },
        }
    }

    #[inline]
    pub fn job_type(&self) -> &str {
        &self.job_type
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[inline]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// All stages, ordered by stage number.
    #[inline]
    pub fn stages(&self) -> &[StageSpec] {
        &self.stages
    }

    /// Global parameters.
    #[inline]
    pub fn params(&self) -> &[ParameterSpec] {
        &self.params
    }

    #[inline]
    pub fn max_total_duration_minutes(&self) -> u32 {
        self.max_total_duration_minutes
    }

    #[inline]
    pub fn allow_partial_failure(&self) -> bool {
        self.allow_partial_failure
    }

    /// Get stage number `n`, if there is one.
    pub fn get_stage(&self, n: u8) -> Option<&StageSpec> {
        // stages are numbered 1..=len and sorted, so this is a plain index:
        let i = usize::from(n).checked_sub(1)?;
        self.stages.get(i)
    }

    /// The stage numbered one past `n`. Purely numeric; dependencies are not consulted.
    pub fn get_next_stage(&self, n: u8) -> Option<&StageSpec> {
        self.get_stage(n.checked_add(1)?)
    }

    /// The single stage whose completion completes the job.
    pub fn final_stage(&self) -> &StageSpec {
        &self.stages[self.final_index]
    }

    /// Validate `raw` against the global parameters.
    /// Undeclared keys are passed through unchanged.
    pub fn validate_job_parameters(&self, raw: &Params) -> Result<Params, ValidationError> {
        validate_all(&self.params, raw)
    }

    /// Validate `raw` for stage `n`: global parameters first,
    /// then the stage's own parameters over that result.
    pub fn validate_stage_parameters(&self, n: u8, raw: &Params) -> Result<Params, ValidationError> {
        let stage = self.get_stage(n).ok_or_else(|| ValidationError::UnknownStage {
            job_type: self.job_type.clone(),
            stage: n,
        })?;
        let global = self.validate_job_parameters(raw)?;
        stage.validate_parameters(&global)
    }
}

/// Builder for [`WorkflowSpec`]. The whole stage graph is checked in [`WorkflowSpecBuilder::build`].
#[derive(Debug, Clone)]
pub struct WorkflowSpecBuilder {
    // defaults to the job type:
    name: Option<String>,
    spec: WorkflowSpec,
}

impl WorkflowSpecBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.spec.description = description.into();
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.spec.version = version.into();
        self
    }

    /// Add a stage. Stages may be added in any order.
    pub fn stage(mut self, stage: StageSpec) -> Self {
        self.spec.stages.push(stage);
        self
    }

    /// Add a global parameter.
    pub fn param(mut self, param: ParameterSpec) -> Self {
        self.spec.params.push(param);
        self
    }

    pub fn max_total_duration_minutes(mut self, minutes: u32) -> Self {
        self.spec.max_total_duration_minutes = minutes;
        self
    }

    pub fn allow_partial_failure(mut self, allow: bool) -> Self {
        self.spec.allow_partial_failure = allow;
        self
    }

    pub fn build(self) -> Result<WorkflowSpec, DefinitionError> {
        let mut spec = self.spec;
        spec.name = self.name.unwrap_or_else(|| spec.job_type.clone());

        check_identifier("job type", &spec.job_type)?;
        if spec.max_total_duration_minutes == 0 {
            return Err(DefinitionError::PolicyOutOfRange {
                scope: format!("workflow \"{}\"", spec.job_type),
                field: "max_total_duration_minutes",
                value: 0,
                min: 1,
                max: u32::MAX.into(),
            });
        }
        check_unique(&format!("workflow \"{}\"", spec.job_type), &spec.params)?;

        // stage numbers must be exactly 1..=N, in any order:
        spec.stages.sort_by_key(StageSpec::number);
        let found: Vec<u8> = spec.stages.iter().map(StageSpec::number).collect();
        let contiguous = !found.is_empty()
            && found.iter().enumerate().all(|(i, &n)| usize::from(n) == i + 1);
        if !contiguous {
            return Err(DefinitionError::NonContiguousStageNumbering {
                job_type: spec.job_type,
                found,
            });
        }

        let finals: Vec<usize> = spec
            .stages
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.is_final().then_some(i))
            .collect();
        match finals[..] {
            [i] => spec.final_index = i,
            _ => {
                return Err(DefinitionError::InvalidFinalStageCount {
                    job_type: spec.job_type,
                    count: finals.len(),
                })
            }
        }

        let numbers: HashSet<u8> = found.iter().copied().collect();
        for stage in &spec.stages {
            if let Some(&dependency) = stage.depends_on().iter().find(|d| !numbers.contains(*d)) {
                return Err(DefinitionError::DanglingDependency {
                    job_type: spec.job_type.clone(),
                    stage: stage.number(),
                    dependency,
                });
            }
        }

        log::debug!(
            "built workflow \"{}\" v{} with {} stages",
            spec.job_type,
            spec.version,
            spec.stages.len()
        );
        Ok(spec)
    }
}
