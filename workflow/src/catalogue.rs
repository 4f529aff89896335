use anyhow::{Context, Result};
use serde_json::Value;
use syntax::ast::{self, Entry, Literal, Property};

use crate::error::Errors;
use crate::stage::StageSpecBuilder;
use crate::workflow::WorkflowSpecBuilder;
use crate::{
    Constraints, DefinitionError, ParamType, ParameterSpec, Registry, StageSpec, WorkflowSpec,
};

/// Problems with the shape of a catalogue, before any spec is built.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Unknown {0} property \"{1}\"")]
    UnknownProperty(&'static str, String),
    #[error("Property \"{0}\" expects {1}")]
    BadPropertyValue(String, &'static str),
    #[error("Unknown constraint \"{0}\" (expected min_value, max_value, min_length, max_length or allowed_values)")]
    UnknownConstraint(String),
    #[error("Constraint \"{0}\" expects {1}")]
    BadConstraintValue(String, &'static str),
    #[error("Stage {0} is nested inside another stage")]
    NestedStage(u32),
}

/// Parse the text of a catalogue file and load it into a new [`Registry`].
pub fn load_str(text: &str) -> Result<Registry> {
    let blocks = syntax::parse(text)?;
    load(blocks)
}

/// Build and register every workflow in `blocks`.
/// All errors are collected and printed before failing,
/// and nothing is returned unless every workflow was valid.
pub fn load(blocks: Vec<ast::WorkflowBlock<'_>>) -> Result<Registry> {
    let mut registry = Registry::new();
    let mut errors = Errors::default();

    for block in blocks {
        let job_type = block.job_type;
        match build_workflow(block) {
            Ok(spec) => {
                if let Err(e) = registry.register(spec) {
                    errors.add(e.into());
                }
            }
            Err(e) => errors.add_context(e, format!("while loading workflow \"{job_type}\"")),
        }
    }

    errors.print_recap("loading catalogue")?;
    log::debug!("loaded {} workflows", registry.len());
    Ok(registry)
}

fn build_workflow(block: ast::WorkflowBlock<'_>) -> Result<WorkflowSpec> {
    let mut builder = WorkflowSpec::builder(block.job_type);
    for entry in block.entries {
        builder = match entry {
            Entry::Property(prop) => workflow_property(builder, prop)?,
            Entry::Param(param) => builder.param(build_param(param)?),
            Entry::Stage(stage) => {
                let n = stage.number;
                builder.stage(build_stage(stage).with_context(|| format!("in stage {n}"))?)
            }
        };
    }
    Ok(builder.build()?)
}

#[rustfmt::skip]
fn workflow_property(b: WorkflowSpecBuilder, prop: Property<'_>) -> Result<WorkflowSpecBuilder> {
    Ok(match prop.key {
        "name"              => b.name(string_value(&prop)?),
        "description"       => b.description(string_value(&prop)?),
        "version"           => b.version(string_value(&prop)?),
        "max_duration"      => b.max_total_duration_minutes(u32_value(&prop)?),
        "partial_failure"   => b.allow_partial_failure(bool_value(&prop)?),
        key => return Err(Error::UnknownProperty("workflow", key.to_owned()).into()),
    })
}

fn build_stage(stage: ast::StageBlock<'_>) -> Result<StageSpec> {
    let number = u8::try_from(stage.number)
        .map_err(|_| DefinitionError::StageNumberOutOfRange(stage.number))?;
    let mut builder = StageSpec::builder(number, stage.task_type);
    for entry in stage.entries {
        builder = match entry {
            Entry::Property(prop) => stage_property(builder, prop)?,
            Entry::Param(param) => builder.param(build_param(param)?),
            Entry::Stage(nested) => return Err(Error::NestedStage(nested.number).into()),
        };
    }
    Ok(builder.build()?)
}

#[rustfmt::skip]
fn stage_property(b: StageSpecBuilder, prop: Property<'_>) -> Result<StageSpecBuilder> {
    Ok(match prop.key {
        "name"          => b.name(string_value(&prop)?),
        "final"         => b.final_stage(bool_value(&prop)?),
        "depends"       => b.depends_on(stage_numbers(&prop)?),
        "parallel"      => b.parallel(optional_u32_value(&prop)?),
        "sequential"    => flag(&prop).map(|()| b.sequential())?,
        "timeout"       => b.timeout_minutes(u32_value(&prop)?),
        "retries"       => b.max_retries(u32_value(&prop)?),
        "retry_delay"   => b.retry_delay_seconds(u32_value(&prop)?),
        key => return Err(Error::UnknownProperty("stage", key.to_owned()).into()),
    })
}

fn build_param(param: ast::Param<'_>) -> Result<ParameterSpec> {
    let name = param.name;
    let ty: ParamType = param
        .ty
        .parse()
        .with_context(|| format!("in parameter \"{name}\""))?;

    let mut builder = ParameterSpec::builder(name, ty)
        .required(param.required)
        .constraints(constraints(param.constraints)?);
    if let Some(default) = param.default {
        builder = builder.default_value(to_value(default));
    }
    if let Some(doc) = param.doc {
        builder = builder.description(doc);
    }
    Ok(builder.build()?)
}

fn constraints(pairs: Vec<(ast::Ident<'_>, Literal<'_>)>) -> Result<Constraints> {
    let mut c = Constraints::default();
    for (key, value) in pairs {
        match key {
            "min_value" => c.min_value = Some(number(key, &value)?),
            "max_value" => c.max_value = Some(number(key, &value)?),
            "min_length" => c.min_length = Some(length(key, &value)?),
            "max_length" => c.max_length = Some(length(key, &value)?),
            "allowed_values" => match value {
                Literal::List(values) => {
                    c.allowed_values = Some(values.into_iter().map(to_value).collect());
                }
                _ => return Err(Error::BadConstraintValue(key.to_owned(), "a list").into()),
            },
            _ => return Err(Error::UnknownConstraint(key.to_owned()).into()),
        }
    }
    Ok(c)
}

fn number(key: &str, value: &Literal<'_>) -> Result<f64, Error> {
    match *value {
        Literal::Int(i) => Ok(i as f64),
        Literal::Float(f) => Ok(f),
        _ => Err(Error::BadConstraintValue(key.to_owned(), "a number")),
    }
}

fn length(key: &str, value: &Literal<'_>) -> Result<usize, Error> {
    match *value {
        Literal::Int(i) => usize::try_from(i).ok(),
        _ => None,
    }
    .ok_or_else(|| Error::BadConstraintValue(key.to_owned(), "a non-negative integer"))
}

/// Convert a literal to the value it stands for.
/// Bare `true` and `false` are booleans; other bare words are strings.
fn to_value(literal: Literal<'_>) -> Value {
    match literal {
        Literal::Str(s) => Value::String(s.to_owned()),
        Literal::Word("true") => Value::Bool(true),
        Literal::Word("false") => Value::Bool(false),
        Literal::Word(w) => Value::String(w.to_owned()),
        Literal::Int(i) => Value::from(i),
        Literal::Float(f) => Value::from(f),
        Literal::List(items) => Value::Array(items.into_iter().map(to_value).collect()),
    }
}

// property value helpers //

fn bad_value(prop: &Property<'_>, expected: &'static str) -> Error {
    Error::BadPropertyValue(prop.key.to_owned(), expected)
}

fn flag(prop: &Property<'_>) -> Result<(), Error> {
    match prop.values[..] {
        [] => Ok(()),
        _ => Err(bad_value(prop, "no value")),
    }
}

fn string_value(prop: &Property<'_>) -> Result<String, Error> {
    match prop.values[..] {
        [Literal::Str(s)] | [Literal::Word(s)] => Ok(s.to_owned()),
        _ => Err(bad_value(prop, "a single string")),
    }
}

fn u32_value(prop: &Property<'_>) -> Result<u32, Error> {
    match prop.values[..] {
        [Literal::Int(i)] => u32::try_from(i).map_err(|_| bad_value(prop, "a non-negative integer")),
        _ => Err(bad_value(prop, "a single non-negative integer")),
    }
}

fn optional_u32_value(prop: &Property<'_>) -> Result<Option<u32>, Error> {
    match prop.values[..] {
        [] => Ok(None),
        _ => u32_value(prop).map(Some),
    }
}

// a bare flag means true:
fn bool_value(prop: &Property<'_>) -> Result<bool, Error> {
    match prop.values[..] {
        [] | [Literal::Word("true")] => Ok(true),
        [Literal::Word("false")] => Ok(false),
        _ => Err(bad_value(prop, "true or false")),
    }
}

fn stage_numbers(prop: &Property<'_>) -> Result<Vec<u8>, Error> {
    if prop.values.is_empty() {
        return Err(bad_value(prop, "one or more stage numbers"));
    }
    prop.values
        .iter()
        .map(|v| match *v {
            Literal::Int(i) => u8::try_from(i).ok(),
            _ => None,
        })
        .collect::<Option<Vec<u8>>>()
        .ok_or_else(|| bad_value(prop, "stage numbers"))
}
