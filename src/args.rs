use clap::{ArgAction, Parser};

const CMD_NAME: &str = "sw";
const DEFAULT_CATALOGUE: &str = "catalogue.sw";

/// Stores our command-line args format.
#[derive(Parser, Debug)]
#[command(name = CMD_NAME, version, about = None, long_about = None)]
pub struct Args {
    /// Workflow catalogue file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CATALOGUE)]
    #[arg(env = "STAGEWISE_CATALOGUE")]
    pub catalogue: String,

    /// List registered job types
    #[arg(short, long)]
    pub list: bool,

    /// Target job type
    #[arg(short, long, value_name = "JOB")]
    pub job: Option<String>,

    /// Validate parameters for this stage of the job
    #[arg(short, long, value_name = "N")]
    pub stage: Option<u8>,

    /// Parameter to validate; VALUE is read as JSON if possible, otherwise as a string
    #[arg(short, long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,

    /// Only load and check the catalogue
    #[arg(short = 'n', long)]
    pub check: bool,

    /// Print additional debugging info (repeat for more)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}
