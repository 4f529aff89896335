use std::sync::Arc;

use util::{HashMap, Hasher};

use crate::{DefinitionError, Params, ValidationError, WorkflowSpec};

/// Job type -> workflow lookup table.
///
/// Filled in once at start-up, then shared read-only (e.g. behind an `Arc`)
/// by everything that needs to resolve job types. Registration is add-only.
#[derive(Debug, Clone)]
pub struct Registry {
    workflows: HashMap<String, Arc<WorkflowSpec>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            workflows: HashMap::with_capacity_and_hasher(16, Hasher::default()),
        }
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `spec` under its own job type.
    pub fn register(&mut self, spec: WorkflowSpec) -> Result<(), DefinitionError> {
        if self.workflows.contains_key(spec.job_type()) {
            return Err(DefinitionError::DuplicateRegistration(spec.job_type().to_owned()));
        }
        log::debug!("registering workflow \"{}\"", spec.job_type());
        self.workflows.insert(spec.job_type().to_owned(), Arc::new(spec));
        Ok(())
    }

    /// Build a spec with `factory` and register it.
    /// The factory runs exactly once, here, so a broken definition fails now.
    pub fn register_with<F>(&mut self, factory: F) -> Result<(), DefinitionError>
    where
        F: FnOnce() -> Result<WorkflowSpec, DefinitionError>,
    {
        self.register(factory()?)
    }

    /// Look up the workflow for `job_type`.
    pub fn get(&self, job_type: &str) -> Result<Arc<WorkflowSpec>, ValidationError> {
        self.workflows.get(job_type).cloned().ok_or_else(|| {
            ValidationError::UnknownJobType {
                job_type: job_type.to_owned(),
                known: self.job_types().into_iter().map(str::to_owned).collect(),
            }
        })
    }

    pub fn contains(&self, job_type: &str) -> bool {
        self.workflows.contains_key(job_type)
    }

    /// Registered job types, sorted.
    pub fn job_types(&self) -> Vec<&str> {
        let mut job_types: Vec<&str> = self.workflows.keys().map(String::as_str).collect();
        job_types.sort_unstable();
        job_types
    }

    pub fn len(&self) -> usize {
        self.workflows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }

    /// Resolve `job_type` and validate its global parameters.
    pub fn validate_job_parameters(
        &self,
        job_type: &str,
        raw: &Params,
    ) -> Result<Params, ValidationError> {
        self.get(job_type)?.validate_job_parameters(raw)
    }

    /// Resolve `job_type` and validate parameters for one of its stages.
    pub fn validate_stage_parameters(
        &self,
        job_type: &str,
        stage: u8,
        raw: &Params,
    ) -> Result<Params, ValidationError> {
        self.get(job_type)?.validate_stage_parameters(stage, raw)
    }
}
