//! Command line front end: builds one slide per image folder of a ZIP archive.
//!
//! ```sh
//! slide-sync --template deck.pptx --archive photos.zip --mismatch repeat
//! ```

use clap::{Parser, ValueEnum};
use dialoguer::Select;
use log::warn;
use slide_sync::{
    default_output_path, ImageOrdering, Mismatch, MismatchPolicy, MismatchResolver, ReplaceMode, RunConfig,
    SlideSource, SlideSync, UseConfigured,
};
use std::path::PathBuf;

/// Create one slide per image folder, using the first slide of a template as the pattern
#[derive(Parser, Debug)]
#[command(name = "slide-sync", version)]
struct Args {
    /// Template presentation; its first slide defines the picture slots
    #[arg(short, long, value_name = "PPTX")]
    template: PathBuf,

    /// ZIP archive with one folder of images per slide
    #[arg(short, long, value_name = "ZIP")]
    archive: PathBuf,

    /// Output file, `<template>_Modified.pptx` next to the template by default
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Order in which a folder's images fill the slots
    #[arg(long, value_enum, default_value = "sequential")]
    ordering: OrderingArg,

    /// Seed for `--ordering random`, for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// What to do when a folder's image count differs from the slot count
    #[arg(long, value_enum, default_value = "truncate")]
    mismatch: MismatchArg,

    /// Keep the template's slides or replace them with the new ones
    #[arg(long, value_enum, default_value = "append")]
    replace_mode: ReplaceModeArg,

    /// Base new slides on the template slide's layout or on a copy of the slide itself
    #[arg(long, value_enum, default_value = "layout")]
    slide_source: SlideSourceArg,

    /// Ask for the mismatch policy when a mismatch is found
    #[arg(short, long)]
    interactive: bool,

    /// Log per-slot details
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OrderingArg {
    Sequential,
    Random,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MismatchArg {
    Truncate,
    Repeat,
    SkipGroup,
    Abort,
}

impl From<MismatchArg> for MismatchPolicy {
    fn from(arg: MismatchArg) -> Self {
        match arg {
            MismatchArg::Truncate => MismatchPolicy::Truncate,
            MismatchArg::Repeat => MismatchPolicy::Repeat,
            MismatchArg::SkipGroup => MismatchPolicy::SkipGroup,
            MismatchArg::Abort => MismatchPolicy::Abort,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ReplaceModeArg {
    Append,
    ReplaceAll,
}

impl From<ReplaceModeArg> for ReplaceMode {
    fn from(arg: ReplaceModeArg) -> Self {
        match arg {
            ReplaceModeArg::Append => ReplaceMode::Append,
            ReplaceModeArg::ReplaceAll => ReplaceMode::ReplaceAll,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SlideSourceArg {
    Layout,
    Clone,
}

impl From<SlideSourceArg> for SlideSource {
    fn from(arg: SlideSourceArg) -> Self {
        match arg {
            SlideSourceArg::Layout => SlideSource::Layout,
            SlideSourceArg::Clone => SlideSource::CloneTemplate,
        }
    }
}

/// Lets the operator pick the policy on the terminal.
struct PromptResolver;

impl MismatchResolver for PromptResolver {
    fn resolve(&mut self, mismatches: &[Mismatch], default: MismatchPolicy) -> MismatchPolicy {
        eprintln!("{} folders do not match the template:", mismatches.len());
        for mismatch in mismatches {
            eprintln!("  {}", mismatch);
        }

        let items: Vec<&str> = MismatchPolicy::ALL.iter().map(|p| p.description()).collect();
        let selected = MismatchPolicy::ALL.iter().position(|p| *p == default).unwrap_or(0);
        match Select::new()
            .with_prompt("How should mismatching folders be handled?")
            .items(&items)
            .default(selected)
            .interact()
        {
            Ok(index) => MismatchPolicy::ALL[index],
            Err(e) => {
                warn!("No answer ({}), using {}", e, default);
                default
            }
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    if !args.template.is_file() {
        eprintln!("Error: Template does not exist: {}", args.template.display());
        std::process::exit(1);
    }
    if !args.archive.is_file() {
        eprintln!("Error: Archive does not exist: {}", args.archive.display());
        std::process::exit(1);
    }

    let ordering = match args.ordering {
        OrderingArg::Sequential => ImageOrdering::Sequential,
        OrderingArg::Random => ImageOrdering::Random { seed: args.seed },
    };
    let config = RunConfig::builder()
        .ordering(ordering)
        .mismatch_policy(args.mismatch.into())
        .replace_mode(args.replace_mode.into())
        .slide_source(args.slide_source.into())
        .build();

    let output = args.output.unwrap_or_else(|| default_output_path(&args.template));
    let sync = SlideSync::new(config);
    let report = if args.interactive {
        sync.run_files(&args.template, &args.archive, &output, &mut PromptResolver)?
    } else {
        sync.run_files(&args.template, &args.archive, &output, &mut UseConfigured)?
    };

    println!("{}", report.summary());
    if report.slides_created == 0 {
        for entry in report.problems() {
            eprintln!("{}", entry);
        }
        eprintln!("Error: No slides were created. Check logs/details for issues.");
        std::process::exit(1);
    }
    println!("Saved {}", output.display());
    Ok(())
}
