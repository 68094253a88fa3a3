//! Command-line interface for `portfmt`.
//!
//! Grounded on the teacher's `largo` CLI: a [`clap`]-derive `Cli`/`Commands`
//! tree, each variant dispatched to a small `cmd_*` handler function.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser as ClapParser, Subcommand};
use portfmt_core::{emit, OutputMode, Parser};
use portfmt_edit::{merge, optional, pipeline, MergeBehavior, PipelineOptions};

use crate::config;

/// Command-line interface for the port Makefile formatter.
#[derive(ClapParser)]
#[command(name = "portfmt")]
#[command(about = "Formatter, linter, and programmatic editor for port Makefiles")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reformat a file (column-aligned, sorted, wrapped).
    Fmt {
        /// Path to the Makefile. Reads stdin if omitted.
        file: Option<PathBuf>,
        /// Write the result back to `file` instead of printing it.
        #[arg(long)]
        inplace: bool,
        /// Soft wrap column for variable value lines.
        #[arg(long)]
        wrapcol: Option<usize>,
        /// Keep trailing comments inline instead of hoisting them.
        #[arg(long)]
        keep_eol_comments: bool,
        /// Leave unsortable-by-default variables unsorted.
        #[arg(long)]
        unsorted_variables: bool,
        #[arg(long)]
        no_color: bool,
    },

    /// Show a unified diff between the original file and its reformatted
    /// output. Exits 1 if the diff is non-empty.
    Diff {
        file: Option<PathBuf>,
        #[arg(long)]
        wrapcol: Option<usize>,
        #[arg(long)]
        diff_context: Option<usize>,
        #[arg(long)]
        no_color: bool,
    },

    /// Dump one line per token, for debugging.
    Dump { file: Option<PathBuf> },

    /// Check variable/target ordering and report duplicate declarations.
    /// Exits 1 if any issue is found.
    Lint {
        file: Option<PathBuf>,
        #[arg(long)]
        no_color: bool,
    },

    /// Increment `PORTREVISION` (or `PORTEPOCH`) and write the result.
    BumpRevision {
        file: PathBuf,
        /// Bump `PORTEPOCH` instead of `PORTREVISION`.
        #[arg(long)]
        epoch: bool,
        #[arg(long)]
        inplace: bool,
    },

    /// Set `DISTVERSION`/`PORTVERSION` and zero any revision/epoch.
    SetVersion {
        file: PathBuf,
        newver: String,
        #[arg(long)]
        inplace: bool,
    },

    /// Print the values of variables matching a name regex, one per line.
    Get { file: Option<PathBuf>, pattern: String },

    /// Merge a second Makefile's assignments into the first.
    Merge {
        primary: PathBuf,
        sub: PathBuf,
        #[arg(long)]
        inplace: bool,
        #[arg(long)]
        shell_is_delete: bool,
        #[arg(long)]
        optional_like_assign: bool,
        #[arg(long)]
        ignore_variables_in_conditionals: bool,
        #[arg(long)]
        after_last_in_group: bool,
    },
}

/// Parses CLI arguments and executes the corresponding command.
pub fn run_cli() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Fmt {
            file,
            inplace,
            wrapcol,
            keep_eol_comments,
            unsorted_variables,
            no_color,
        } => cmd_fmt(file.as_deref(), inplace, wrapcol, keep_eol_comments, unsorted_variables, no_color),
        Commands::Diff {
            file,
            wrapcol,
            diff_context,
            no_color,
        } => cmd_diff(file.as_deref(), wrapcol, diff_context, no_color),
        Commands::Dump { file } => cmd_dump(file.as_deref()),
        Commands::Lint { file, no_color } => cmd_lint(file.as_deref(), no_color),
        Commands::BumpRevision { file, epoch, inplace } => cmd_bump_revision(&file, epoch, inplace),
        Commands::SetVersion { file, newver, inplace } => cmd_set_version(&file, &newver, inplace),
        Commands::Get { file, pattern } => cmd_get(file.as_deref(), &pattern),
        Commands::Merge {
            primary,
            sub,
            inplace,
            shell_is_delete,
            optional_like_assign,
            ignore_variables_in_conditionals,
            after_last_in_group,
        } => cmd_merge(
            &primary,
            &sub,
            inplace,
            MergeBehavior {
                shell_is_delete,
                optional_like_assign,
                ignore_variables_in_conditionals,
                after_last_in_group,
                comments: false,
            },
        ),
    }
}

fn read_input(file: Option<&Path>) -> Result<String, Box<dyn std::error::Error>> {
    match file {
        Some(path) => Ok(fs::read_to_string(path)?),
        None => {
            use std::io::Read;
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

fn parsed_and_edited(
    file: Option<&Path>,
    keep_eol_comments: bool,
) -> Result<Parser, Box<dyn std::error::Error>> {
    let text = read_input(file)?;
    let mut parser = Parser::parse(&text)?;
    pipeline::run_mandatory_passes(&mut parser, &PipelineOptions { keep_eol_comments })?;
    Ok(parser)
}

fn cmd_fmt(
    file: Option<&Path>,
    inplace: bool,
    wrapcol: Option<usize>,
    keep_eol_comments: bool,
    unsorted_variables: bool,
    no_color: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let cwd = config::default_config_search_dir();
    let mut settings = config::resolve_settings(&cwd, wrapcol, None, None, unsorted_variables, keep_eol_comments, no_color)?;
    settings.behavior.output_reformat = true;
    let parser = parsed_and_edited(file, settings.behavior.keep_eol_comments)?;
    let output = emit(&parser, OutputMode::Reformat, &settings)?;

    if inplace {
        let path = file.ok_or("--inplace requires a file argument")?;
        fs::write(path, output)?;
    } else {
        print!("{output}");
    }
    Ok(())
}

fn cmd_diff(
    file: Option<&Path>,
    wrapcol: Option<usize>,
    diff_context: Option<usize>,
    no_color: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let cwd = config::default_config_search_dir();
    let mut settings = config::resolve_settings(&cwd, wrapcol, diff_context, None, false, false, no_color)?;
    settings.behavior.diff_mode = true;
    let parser = parsed_and_edited(file, settings.behavior.keep_eol_comments)?;
    match emit(&parser, OutputMode::Diff, &settings) {
        Ok(patch) => {
            print!("{patch}");
            Ok(())
        }
        Err(portfmt_base::Error::DifferencesFound) => {
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

fn cmd_dump(file: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let text = read_input(file)?;
    let parser = Parser::parse(&text)?;
    let settings = portfmt_core::Settings::default();
    print!("{}", emit(&parser, OutputMode::Dump, &settings)?);
    Ok(())
}

fn cmd_lint(file: Option<&Path>, no_color: bool) -> Result<(), Box<dyn std::error::Error>> {
    let parser = parsed_and_edited(file, false)?;
    let (status, report) = optional::lint_order(&parser, no_color);
    if !report.is_empty() {
        print!("{report}");
    }
    let clones = optional::lint_clones(&parser);
    for name in &clones {
        println!("duplicate declaration: {name}");
    }
    if status == optional::LintStatus::DiffsFound || !clones.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_bump_revision(file: &Path, epoch: bool, inplace: bool) -> Result<(), Box<dyn std::error::Error>> {
    let text = fs::read_to_string(file)?;
    let mut parser = Parser::parse(&text)?;
    let target = if epoch { optional::BumpTarget::PortEpoch } else { optional::BumpTarget::PortRevision };
    optional::bump_revision(&mut parser, target)?;
    pipeline::run_mandatory_passes(&mut parser, &PipelineOptions::default())?;
    let settings = portfmt_core::Settings::default();
    let output = emit(&parser, OutputMode::Reformat, &settings)?;
    if inplace {
        fs::write(file, output)?;
    } else {
        print!("{output}");
    }
    Ok(())
}

fn cmd_set_version(file: &Path, newver: &str, inplace: bool) -> Result<(), Box<dyn std::error::Error>> {
    let text = fs::read_to_string(file)?;
    let mut parser = Parser::parse(&text)?;
    optional::set_version(&mut parser, newver)?;
    pipeline::run_mandatory_passes(&mut parser, &PipelineOptions::default())?;
    let settings = portfmt_core::Settings::default();
    let output = emit(&parser, OutputMode::Reformat, &settings)?;
    if inplace {
        fs::write(file, output)?;
    } else {
        print!("{output}");
    }
    Ok(())
}

fn cmd_get(file: Option<&Path>, pattern: &str) -> Result<(), Box<dyn std::error::Error>> {
    let text = read_input(file)?;
    let parser = Parser::parse(&text)?;
    print!("{}", optional::output_variable_value(&parser, pattern)?);
    Ok(())
}

fn cmd_merge(
    primary_path: &Path,
    sub_path: &Path,
    inplace: bool,
    behavior: MergeBehavior,
) -> Result<(), Box<dyn std::error::Error>> {
    let primary_text = fs::read_to_string(primary_path)?;
    let sub_text = fs::read_to_string(sub_path)?;
    let mut primary = Parser::parse(&primary_text)?;
    let sub = Parser::parse(&sub_text)?;
    merge::merge(&mut primary, &sub, behavior)?;
    pipeline::run_mandatory_passes(&mut primary, &PipelineOptions::default())?;
    let settings = portfmt_core::Settings::default();
    let output = emit(&primary, OutputMode::Reformat, &settings)?;
    if inplace {
        fs::write(primary_path, output)?;
    } else {
        print!("{output}");
    }
    Ok(())
}
