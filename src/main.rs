use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use c2cffi::batch;
use c2cffi::processor::{self, Output, ProcessOptions};

#[derive(Parser, Debug)]
#[command(name = "c2cffi", version, about = "Generate Common Lisp CFFI bindings from C header files")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Specify options and files on the command line
    #[command(visible_alias = "f")]
    Files {
        /// The input headers to process
        #[arg(required = true, value_name = "HEADER")]
        inputs: Vec<PathBuf>,
        /// Where to place the generated output
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<String>,
        /// Include directories for resolving quoted includes
        #[arg(short = 'I', value_name = "DIR")]
        include: Vec<PathBuf>,
        /// Output an in-package form with the given package at the top
        #[arg(short, long, value_name = "PACKAGE")]
        package: Option<String>,
        /// Emit include-guard macros instead of dropping them
        #[arg(long)]
        keep_guards: bool,
    },
    /// Process files using batch specification files
    #[command(visible_alias = "b")]
    Batch {
        /// The batch files to process
        #[arg(required = true, value_name = "BATCH_FILE")]
        inputs: Vec<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Files {
            inputs,
            output,
            include,
            package,
            keep_guards,
        } => {
            let mut options = ProcessOptions::default();
            options.include_dirs = include;
            options.package = package;
            options.skip_header_guards = !keep_guards;

            let target = Output::parse(output.as_deref().unwrap_or(":stdout"));
            let mut writer = target
                .open()
                .with_context(|| format!("opening output {:?}", target))?;
            if let Some(package) = &options.package {
                processor::write_package_form(&mut writer, package)?;
            }
            for input in &inputs {
                processor::process_file(input, &options, &mut writer)
                    .with_context(|| format!("processing {}", input.display()))?;
            }
            writer.flush()?;
        }
        Command::Batch { inputs } => {
            for input in &inputs {
                batch::process_batch_file(input)
                    .with_context(|| format!("processing batch file {}", input.display()))?;
            }
        }
    }
    Ok(())
}
