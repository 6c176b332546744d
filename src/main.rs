//! Vantage CLI - render policy recommendation manifests

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use kube::CustomResourceExt;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vantage::{format_object_set, parse_image_override, render_file, OutputFormat};
use vantage_common::crd::{Installation, PolicyRecommendation, Tenant};

/// Vantage - render the create and delete sets of a component
#[derive(Parser, Debug)]
#[command(name = "vantage", version, about, long_about = None)]
struct Cli {
    /// Print CRD manifests and exit
    #[arg(long)]
    crd: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a snapshot file and print the resulting manifests
    Render(RenderArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Path to the render file
    #[arg(short = 'f', long = "config")]
    config_file: PathBuf,

    /// Image override as <path>/<name>=<digest or reference>, repeatable
    #[arg(long = "image-override", value_parser = parse_image_override)]
    image_overrides: Vec<(String, String)>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
    output: OutputFormat,
}

fn print_crds() -> anyhow::Result<()> {
    for crd in [Installation::crd(), Tenant::crd(), PolicyRecommendation::crd()] {
        let yaml = serde_yaml::to_string(&crd)
            .map_err(|e| anyhow::anyhow!("Failed to serialize CRD: {}", e))?;
        println!("---\n{yaml}");
    }
    Ok(())
}

fn run_render(args: RenderArgs) -> anyhow::Result<()> {
    let overrides: BTreeMap<String, String> = args.image_overrides.into_iter().collect();
    let set = render_file(&args.config_file, &overrides)?;
    print!("{}", format_object_set(&set, args.output)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if cli.crd {
        return print_crds();
    }

    match cli.command {
        Some(Commands::Render(args)) => run_render(args),
        None => anyhow::bail!("no command given, see --help"),
    }
}
