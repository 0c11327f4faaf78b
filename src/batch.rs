//! Batch processing. Instead of specifying options on the command line,
//! YAML files can describe a list of jobs, each with its own output,
//! package, include arguments, and pointer-expansion rules.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use serde::Deserialize;

use crate::error::{ProcessingError, Result};
use crate::expansion::ExpansionConfig;
use crate::processor::{self, Output, ProcessOptions};

/// One job from a batch file.
#[derive(Debug, Deserialize)]
pub struct BatchJob {
    /// Headers to process, in order, into the same output.
    pub files: Vec<PathBuf>,
    /// Output path, or `":stdout"` / `":stderr"`.
    #[serde(default = "default_output")]
    pub output: String,
    #[serde(default)]
    pub package: Option<String>,
    /// Extra arguments in the compiler's `-I` style.
    #[serde(default)]
    pub arguments: Vec<String>,
    #[serde(default, rename = "pointer-expansion")]
    pub pointer_expansion: ExpansionConfig,
}

fn default_output() -> String {
    ":stdout".to_string()
}

/// Run every job described in the batch file at `path`.
pub fn process_batch_file(path: &Path) -> Result<()> {
    let text = fs::read_to_string(path)?;
    let jobs: Vec<BatchJob> =
        serde_yaml::from_str(&text).map_err(|source| ProcessingError::Batch {
            path: path.to_path_buf(),
            source,
        })?;
    info!("processing batch file: {} ({} jobs)", path.display(), jobs.len());
    for job in &jobs {
        run_job(job)?;
    }
    Ok(())
}

fn run_job(job: &BatchJob) -> Result<()> {
    let mut options = ProcessOptions::default();
    options.package = job.package.clone();
    options.include_dirs = include_dirs_from_arguments(&job.arguments);
    options.expansion = job.pointer_expansion.clone();

    let mut writer = Output::parse(&job.output).open()?;
    if let Some(package) = &options.package {
        processor::write_package_form(&mut writer, package)?;
    }
    for file in &job.files {
        processor::process_file(file, &options, &mut writer)?;
    }
    writer.flush()?;
    Ok(())
}

/// Pull include directories out of compiler-style argument lists, accepting
/// both `-I dir` and `-Idir`.
pub fn include_dirs_from_arguments(arguments: &[String]) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    let mut iter = arguments.iter();
    while let Some(arg) = iter.next() {
        if arg == "-I" {
            if let Some(dir) = iter.next() {
                dirs.push(PathBuf::from(dir));
            }
        } else if let Some(dir) = arg.strip_prefix("-I") {
            dirs.push(PathBuf::from(dir));
        }
    }
    dirs
}
