use anyhow::{Context, Result};
use clap::builder::NonEmptyStringValueParser;
use clap::Parser;
use colored::Colorize;
use fataar_attrs::policy::parse_exclusion;
use fataar_attrs::{
    exploded_aar_dir, hook_resource_process, logging, ExclusionPolicy, Outcome, ResolveOptions,
    ResolveReport, StepGraph, VariantTasks, WriteMode,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Strip conflicting declare-styleable attr formats from exploded Android library archives",
    long_about = None
)]
struct Args {
    /// Build variant to process (repeatable, e.g. --variant debug --variant release)
    #[arg(long = "variant", required = true, value_parser = NonEmptyStringValueParser::new())]
    variants: Vec<String>,

    /// Build directory of the library module; archives are read from intermediates/exploded-aar
    #[arg(long, default_value = "build")]
    build_dir: PathBuf,

    /// Exploded archive directory to scan directly (overrides --build-dir)
    #[arg(long)]
    exploded_dir: Option<PathBuf>,

    /// Policy file (TOML)
    #[arg(long, short)]
    policy: Option<PathBuf>,

    /// Drop the format of ATTR inside styleable STYLEABLE (repeatable)
    #[arg(long = "exclude", short = 'e', value_name = "STYLEABLE=ATTR", value_parser = parse_exclusion)]
    excludes: Vec<(String, String)>,

    /// Only process archives owned by this group:artifact (repeatable)
    #[arg(long = "owner", short = 'o', value_name = "GROUP:ARTIFACT", value_parser = NonEmptyStringValueParser::new())]
    owners: Vec<String>,

    /// Rewrite every parsed values.xml, even when nothing was removed
    #[arg(long)]
    always_write: bool,

    /// Report what would change without writing any file
    #[arg(long)]
    dry_run: bool,

    /// Show debug logging
    #[arg(long, short)]
    verbose: bool,
}

/// Policy file entries first, command-line entries on top
fn build_policy(args: &Args) -> Result<ExclusionPolicy> {
    let mut policy = match &args.policy {
        Some(path) => ExclusionPolicy::load(path)
            .with_context(|| format!("Failed to load policy from {}", path.display()))?,
        None => ExclusionPolicy::new(),
    };

    for (styleable, attr) in &args.excludes {
        policy = policy.with_exclusion(styleable.clone(), attr.clone());
    }
    for owner in &args.owners {
        policy = policy.with_owner(owner.clone());
    }

    Ok(policy)
}

fn print_report(tasks: &VariantTasks, report: &ResolveReport, dry_run: bool) {
    println!(
        "{}",
        format!(
            "Variant {} ({}): {} candidate roots",
            tasks.variant,
            tasks.rebundle,
            report.roots.len()
        )
        .bold()
    );

    for entry in &report.roots {
        match &entry.outcome {
            Outcome::Modified(removed) => {
                let verb = if dry_run { "Would rewrite" } else { "Rewrote" };
                println!(
                    "  {}: {} ({} formats removed)",
                    verb,
                    entry.root.display(),
                    removed
                );
            }
            Outcome::Failed(err) => {
                println!("  {}: {}", "Failed".red(), err);
            }
            Outcome::FilteredOut | Outcome::NoFile | Outcome::Unchanged => {}
        }
    }

    println!(
        "  {}",
        format!(
            "Summary: {} processed, {} modified, {} formats removed, {} failed, {} filtered out",
            report.processed(),
            report.modified(),
            report.removed(),
            report.failures(),
            report.filtered_out()
        )
        .green()
    );
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    let policy = build_policy(&args)?;
    if policy.is_empty() {
        warn!("policy lists no styleables, nothing will be removed");
    }

    let exploded_dir = args
        .exploded_dir
        .clone()
        .unwrap_or_else(|| exploded_aar_dir(&args.build_dir));

    let options = ResolveOptions {
        write_mode: if args.always_write {
            WriteMode::Always
        } else {
            WriteMode::OnChange
        },
        dry_run: args.dry_run,
    };

    let mut graph = StepGraph::new();
    let tasks = hook_resource_process(&mut graph, &exploded_dir, &args.variants, &policy, options);

    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .context("Invalid progress template")?,
    );
    progress.enable_steady_tick(Duration::from_millis(100));

    // No host build here: treat each variant's resource generation as already finished
    let mut results = Vec::new();
    for variant_tasks in &tasks {
        progress.set_message(format!("Resolving {}...", variant_tasks.variant));
        for (_, report) in graph.finish_task(&variant_tasks.generate) {
            results.push((variant_tasks, report));
        }
    }
    progress.finish_and_clear();

    for (variant_tasks, report) in &results {
        print_report(variant_tasks, report, args.dry_run);
        println!();
    }

    if args.dry_run {
        println!("Dry run mode: no files were written.");
    }

    Ok(())
}
