use std::io::Write;

use anyhow::{Context, Result};
use colored::Colorize;

use workflow::{catalogue, Params, Registry, StageSpec, WorkflowSpec};

use crate::settings::{Action, Settings};
use crate::ui::Ui;

/// This struct actually runs the command-line app.
pub struct App {
    /// Interpreted command line settings
    settings: Settings,
    /// User interface
    ui: Ui,
}

impl App {
    /// Create a new `App`.
    pub fn new(settings: Settings) -> Self {
        let ui = Ui::new(&settings);
        Self { settings, ui }
    }

    /// Run the app, writing results to stdout.
    pub fn run(self) -> Result<()> {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        self.run_with_output(&mut out)
    }

    /// Run the app, writing results to `out`. Progress and errors still go to stderr.
    pub fn run_with_output<W: Write>(mut self, out: &mut W) -> Result<()> {
        let text = self.read_catalogue()?;
        let registry = self.load_catalogue(&text)?;

        match &self.settings.action {
            Action::List => list(&registry, out)?,
            Action::Check => {
                writeln!(
                    out,
                    "{:?}: {} workflows OK",
                    self.settings.catalogue,
                    registry.len()
                )?;
            }
            Action::Describe(job) => {
                let wf = registry.get(job)?;
                describe(&wf, out)?;
            }
            Action::Validate { job, stage, params } => {
                let validated = self
                    .validate(&registry, job, *stage, params)
                    .with_context(|| format!("while validating parameters for job \"{job}\""))?;
                serde_json::to_writer_pretty(&mut *out, &validated)?;
                writeln!(out)?;
            }
        }

        Ok(())
    }

    fn validate(
        &self,
        registry: &Registry,
        job: &str,
        stage: Option<u8>,
        params: &Params,
    ) -> Result<Params> {
        let wf = registry.get(job)?;
        let validated = match stage {
            Some(n) => {
                log::info!("validating {} params for {job} stage {n}", params.len());
                wf.validate_stage_parameters(n, params)?
            }
            None => {
                log::info!("validating {} params for {job}", params.len());
                wf.validate_job_parameters(params)?
            }
        };
        self.ui.verbose_msg(&format!("{}", "Parameters are valid.".green()));
        Ok(validated)
    }
}

// LOADING //////////////////
impl App {
    fn read_catalogue(&mut self) -> Result<String> {
        self.ui.verbose_progress_debug("Reading catalogue file", &self.settings.catalogue);
        let text = std::fs::read_to_string(&self.settings.catalogue).with_context(|| {
            format!("while reading catalogue file {:?}", self.settings.catalogue)
        })?;
        self.ui.done();
        Ok(text)
    }

    fn load_catalogue(&mut self, text: &str) -> Result<Registry> {
        self.ui.verbose_progress("Parsing catalogue file");
        self.ui.start_timer();
        let blocks = syntax::parse(text).with_context(|| {
            format!("while parsing catalogue file {:?}", self.settings.catalogue)
        })?;
        self.ui.done();
        self.ui.print_elapsed("Parsing catalogue file");

        self.ui.verbose_progress("Building workflows");
        self.ui.start_timer();
        let registry = catalogue::load(blocks)?;
        self.ui.done();
        self.ui.print_elapsed("Building workflows");

        if self.ui.verbose {
            eprintln!("Loaded {} workflows.", registry.len());
        }
        Ok(registry)
    }
}

// PRINTING /////////////////

fn list<W: Write>(registry: &Registry, out: &mut W) -> Result<()> {
    for job_type in registry.job_types() {
        let wf = registry.get(job_type)?;
        writeln!(
            out,
            "{job_type}\t{} v{} ({} stages)",
            wf.name(),
            wf.version(),
            wf.stages().len()
        )?;
    }
    Ok(())
}

fn describe<W: Write>(wf: &WorkflowSpec, out: &mut W) -> std::io::Result<()> {
    writeln!(out, "{}: {} v{}", wf.job_type(), wf.name(), wf.version())?;
    if !wf.description().is_empty() {
        writeln!(out, "  {}", wf.description())?;
    }
    writeln!(
        out,
        "  max duration {} min, partial failure {}",
        wf.max_total_duration_minutes(),
        if wf.allow_partial_failure() { "allowed" } else { "not allowed" }
    )?;
    for param in wf.params() {
        writeln!(out, "  param {param}")?;
    }
    for stage in wf.stages() {
        describe_stage(stage, out)?;
    }
    Ok(())
}

fn describe_stage<W: Write>(stage: &StageSpec, out: &mut W) -> std::io::Result<()> {
    write!(out, "  stage {} {}", stage.number(), stage.task_type())?;
    if stage.name() != stage.task_type() {
        write!(out, " \"{}\"", stage.name())?;
    }
    if stage.is_final() {
        write!(out, " (final)")?;
    }
    writeln!(out)?;

    if !stage.depends_on().is_empty() {
        let deps: Vec<String> = stage.depends_on().iter().map(u8::to_string).collect();
        writeln!(out, "    depends on {}", deps.join(", "))?;
    }
    let parallel = match (stage.allow_parallel_tasks(), stage.max_parallel_tasks()) {
        (false, _) => "sequential".to_owned(),
        (true, None) => "parallel".to_owned(),
        (true, Some(max)) => format!("parallel (max {max})"),
    };
    writeln!(
        out,
        "    {parallel}, timeout {} min, {} retries {}s apart",
        stage.timeout_minutes(),
        stage.max_retries(),
        stage.retry_delay_seconds()
    )?;
    for param in stage.params() {
        writeln!(out, "    param {param}")?;
    }
    Ok(())
}
