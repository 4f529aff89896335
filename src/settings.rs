use std::path::PathBuf;

use serde_json::Value;
use workflow::Params;

use crate::args::Args;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid param flag '{0}' (should be formatted 'key=value')")]
    InvalidParamFlag(String),
    #[error("--stage requires a job type (--job)")]
    StageWithoutJob,
    #[error("--param requires a job type (--job)")]
    ParamsWithoutJob,
}

/// What the user asked us to do.
#[derive(Debug, PartialEq)]
pub enum Action {
    /// Print every registered job type.
    List,
    /// Load the catalogue and report any errors, nothing else.
    Check,
    /// Print the stages and parameters of one job type.
    Describe(String),
    /// Validate params for a job, or for one of its stages.
    Validate {
        job: String,
        stage: Option<u8>,
        params: Params,
    },
}

/// Settings are like Args, except all the logic has
/// been applied so e.g. the action is decided.
#[derive(Debug)]
pub struct Settings {
    pub catalogue: PathBuf,
    pub verbose: u8,
    pub action: Action,
}

impl TryFrom<Args> for Settings {
    type Error = anyhow::Error;
    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let params = parse_params(&args.params)?;

        // --list and --check win over everything else;
        // otherwise a job alone is described, and a job with params or a stage is validated.
        let action = if args.list {
            Action::List
        } else if args.check {
            Action::Check
        } else {
            match args.job {
                Some(job) if params.is_empty() && args.stage.is_none() => Action::Describe(job),
                Some(job) => Action::Validate {
                    job,
                    stage: args.stage,
                    params,
                },
                None if args.stage.is_some() => return Err(Error::StageWithoutJob.into()),
                None if !params.is_empty() => return Err(Error::ParamsWithoutJob.into()),
                None => Action::List,
            }
        };

        Ok(Self {
            catalogue: PathBuf::from(&args.catalogue),
            verbose: args.verbose,
            action,
        })
    }
}

/// Split each `key=value` flag; values that parse as JSON are used as such,
/// anything else becomes a string.
fn parse_params(flags: &[String]) -> Result<Params, Error> {
    let mut params = Params::new();
    for flag in flags {
        let (k, v) = flag
            .split_once('=')
            .filter(|(k, _)| !k.is_empty())
            .ok_or_else(|| Error::InvalidParamFlag(flag.to_owned()))?;
        let value = serde_json::from_str(v).unwrap_or_else(|_| Value::String(v.to_owned()));
        params.insert(k.to_owned(), value);
    }
    Ok(params)
}
