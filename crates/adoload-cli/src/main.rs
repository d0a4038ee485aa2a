use adoload_core::backlog::Backlog;
use adoload_core::client::{AdoClient, WorkItemClient};
use adoload_core::config::{masked_token, Parameters};
use adoload_core::format::TextFormatter;
use adoload_core::loader::Loader;
use adoload_core::patch::PatchBuilder;
use adoload_core::template::Templates;
use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "adoload",
    about = "Load a YAML backlog (Features → User Stories → Tasks) into Azure DevOps",
    version
)]
struct Cli {
    /// Parameters file with Azure DevOps settings, input paths, and
    /// formatting options
    #[arg(long = "params", default_value = "parameters.yaml", env = "ADOLOAD_PARAMS")]
    params: PathBuf,

    /// Log every request and field mapping
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    if let Err(e) = run(&cli) {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let parameters = Parameters::load(&cli.params)
        .with_context(|| format!("failed to load '{}'", cli.params.display()))?;

    // Relative input paths resolve against the parameters file's directory.
    let base_dir = cli.params.parent().unwrap_or(Path::new("."));
    let settings = parameters.resolve(base_dir)?;

    info!(
        organization = %settings.organization_url,
        project = %settings.project,
        backlog = %settings.backlog_path.display(),
        template = %settings
            .template_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "none (using defaults)".to_string()),
        markdown = settings.enable_markdown,
        token = %masked_token(&settings.token),
        "configuration loaded"
    );

    let formatter = TextFormatter::new(settings.enable_markdown);
    let templates = match &settings.template_path {
        Some(path) => Templates::load(path)?,
        None => {
            info!("no template file specified — using default field mappings only");
            Templates::default()
        }
    };

    let client = AdoClient::new(
        settings.organization_url.as_str(),
        settings.project.as_str(),
        settings.token.as_str(),
    );
    client
        .get_project()
        .with_context(|| format!("access test failed for project '{}'", settings.project))?;

    let backlog = Backlog::load(&settings.backlog_path)?;

    let loader = Loader::new(
        &client,
        templates,
        PatchBuilder::new(settings.area_path, settings.iteration_path, formatter),
        settings.organization_url.as_str(),
        settings.project.as_str(),
    );
    loader.run(&backlog)?;

    info!("all work items processed");
    Ok(())
}
