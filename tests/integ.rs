use anyhow::Result;
use serde_json::{json, Value};
use stagewise::{App, Args, Settings};
use std::path::Path;
use tempfile::tempdir;
use workflow::{AggregatedErrors, ValidationError};

const HELLO: &str = "demos/hello_world.sw";
const PIPELINES: &str = "demos/pipelines.sw";

fn basic_args(catalogue: &str) -> Args {
    Args {
        catalogue: catalogue.to_owned(),
        list: false,
        job: None,
        stage: None,
        params: Vec::with_capacity(0),
        check: false,
        verbose: 1,
    }
}

fn run_to_string(args: Args) -> Result<String> {
    simple_logging::log_to_stderr(log::LevelFilter::Trace);
    let settings: Settings = args.try_into()?;
    let mut out = Vec::new();
    App::new(settings).run_with_output(&mut out)?;
    Ok(String::from_utf8(out)?)
}

fn validate(catalogue: &str, job: &str, stage: Option<u8>, params: &[&str]) -> Result<Value> {
    let mut args = basic_args(catalogue);
    args.job = Some(job.to_owned());
    args.stage = stage;
    args.params = params.iter().map(|p| p.to_string()).collect();
    let out = run_to_string(args)?;
    Ok(serde_json::from_str(&out)?)
}

fn write_catalogue(dir: &Path, text: &str) -> Result<String> {
    let path = dir.join("catalogue.sw");
    std::fs::write(&path, text)?;
    Ok(path.to_str().unwrap().to_owned())
}

#[test]
fn test_validate_job_params() -> Result<()> {
    let out = validate(HELLO, "hello_world", None, &["n=\"5\""])?;
    assert_eq!(json!({"n": 5}), out);
    Ok(())
}

#[test]
fn test_validate_stage_params() -> Result<()> {
    let out = validate(HELLO, "hello_world", Some(2), &["n=5"])?;
    assert_eq!(json!({"n": 5, "tone": "friendly"}), out);

    let out = validate(HELLO, "hello_world", Some(1), &["message=hi", "extra=123"])?;
    assert_eq!(json!({"n": 1, "message": "hi", "extra": 123}), out);
    Ok(())
}

#[test]
fn test_constraint_violation() -> Result<()> {
    let err = validate(HELLO, "hello_world", None, &["n=500"]).unwrap_err();
    let cause = err
        .downcast_ref::<ValidationError>()
        .expect("error should be a ValidationError");
    assert!(matches!(cause, ValidationError::ConstraintViolation { .. }));
    assert_eq!(Some("n"), cause.param());

    let err = validate(HELLO, "hello_world", Some(2), &["tone=rude"]).unwrap_err();
    assert!(err.downcast_ref::<ValidationError>().is_some());
    Ok(())
}

#[test]
fn test_unknown_job_and_stage() -> Result<()> {
    let err = validate(HELLO, "nonexistent_type", None, &["n=1"]).unwrap_err();
    assert_eq!(
        Some(&ValidationError::UnknownJobType {
            job_type: "nonexistent_type".to_owned(),
            known: vec!["hello_world".to_owned()],
        }),
        err.downcast_ref::<ValidationError>()
    );

    let err = validate(HELLO, "hello_world", Some(3), &[]).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ValidationError>(),
        Some(ValidationError::UnknownStage { stage: 3, .. })
    ));
    Ok(())
}

#[test]
fn test_pipelines() -> Result<()> {
    let out = validate(
        PIPELINES,
        "document_ingest",
        Some(2),
        &["source_url=https://example.com/docs", "batch_size=\"20\"", "dry_run=yes"],
    )?;
    assert_eq!(
        json!({
            "source_url": "https://example.com/docs",
            "batch_size": 20,
            "dry_run": true,
            "chunk_size": 1000,
            "overlap": 0.1,
        }),
        out
    );

    // optional param with no default still gets a key:
    let out = validate(PIPELINES, "document_ingest", Some(4), &["source_url=https://example.com/docs"])?;
    assert_eq!(
        json!({
            "source_url": "https://example.com/docs",
            "batch_size": 50,
            "dry_run": false,
            "tags": [],
            "metadata": null,
        }),
        out
    );

    // required global param is missing:
    let err = validate(PIPELINES, "document_ingest", Some(1), &[]).unwrap_err();
    assert_eq!(
        Some(&ValidationError::MissingRequired("source_url".to_owned())),
        err.downcast_ref::<ValidationError>()
    );

    // list params must really be lists:
    let err = validate(PIPELINES, "report", None, &["recipients=\"ops@example.com\""]).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ValidationError>(),
        Some(ValidationError::TypeMismatch { .. })
    ));
    let out = validate(PIPELINES, "report", None, &["recipients=[\"ops@example.com\"]"])?;
    assert_eq!(json!({"recipients": ["ops@example.com"], "format": "pdf"}), out);
    Ok(())
}

#[test]
fn test_list() -> Result<()> {
    let mut args = basic_args(PIPELINES);
    args.list = true;
    let out = run_to_string(args)?;
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(
        vec![
            "document_ingest\tDocument ingest v2.1 (4 stages)",
            "report\tNightly report v1.0 (3 stages)",
        ],
        lines
    );
    Ok(())
}

#[test]
fn test_describe() -> Result<()> {
    let mut args = basic_args(HELLO);
    args.job = Some("hello_world".to_owned());
    let out = run_to_string(args)?;
    assert!(out.starts_with("hello_world: Hello World v1.0\n"));
    assert!(out.contains("  param n: integer = 1 [min_value=1, max_value=100] \"How many greetings\"\n"));
    assert!(out.contains("  stage 2 reply (final)\n    depends on 1\n"));
    assert!(out.contains("    parallel (max 4), timeout 30 min, 2 retries 10s apart\n"));
    Ok(())
}

#[test]
fn test_check() -> Result<()> {
    let mut args = basic_args(PIPELINES);
    args.check = true;
    let out = run_to_string(args)?;
    assert!(out.ends_with(": 2 workflows OK\n"));
    Ok(())
}

#[test]
fn test_broken_catalogue() -> Result<()> {
    let dir = tempdir()?;
    let catalogue = write_catalogue(
        dir.path(),
        "
workflow gappy {
  stage 1 a {}
  stage 3 c { final }
}

workflow forward {
  stage 1 a { depends 2 }
  stage 2 b { final }
}

workflow fine {
  stage 1 a { final }
}
",
    )?;
    let mut args = basic_args(&catalogue);
    args.check = true;
    let err = run_to_string(args).unwrap_err();
    let aggregated = err
        .downcast_ref::<AggregatedErrors>()
        .expect("error should be aggregated");
    assert_eq!(2, aggregated.1);

    dir.close()?;
    Ok(())
}

#[test]
fn test_unparseable_catalogue() -> Result<()> {
    let dir = tempdir()?;
    let catalogue = write_catalogue(dir.path(), "workflow w {\n  stage one a {}\n}\n")?;
    let mut args = basic_args(&catalogue);
    args.check = true;
    let err = run_to_string(args).unwrap_err();
    assert!(err.downcast_ref::<syntax::Error>().is_some());
    assert!(format!("{err:#}").contains("while parsing catalogue file"));

    dir.close()?;
    Ok(())
}

#[test]
fn test_missing_catalogue() {
    let mut args = basic_args("demos/does_not_exist.sw");
    args.check = true;
    let err = run_to_string(args).unwrap_err();
    assert!(format!("{err:#}").contains("while reading catalogue file"));
}
