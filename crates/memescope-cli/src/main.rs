mod run;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use memescope_pipeline::LiveOrchestrator;

#[derive(Debug, Parser)]
#[command(name = "memescope")]
#[command(about = "Meme-trend research pipeline: plan, collect, extract, analyze, write")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the full five-stage pipeline and write a Markdown report
    Run {
        /// Research request; prompted for interactively when omitted
        request: Option<String>,
        /// Print the beginning of the report after a successful run
        #[arg(long)]
        preview: bool,
    },
    /// Print the execution plan for a request without collecting anything
    Plan { request: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = memescope_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let settings = memescope_core::load_pipeline_settings(config.stages_path.as_deref())?;
    let orchestrator = LiveOrchestrator::live(&config, &settings)?;

    match cli.command {
        Some(Commands::Plan { request }) => {
            let plan = orchestrator.plan(&request).await?;
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        Some(Commands::Run { request, preview }) => {
            run::execute(&orchestrator, request, preview).await?;
        }
        None => run::execute(&orchestrator, None, false).await?,
    }

    Ok(())
}
