use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "warmgrid",
    about = "Warmgrid: keep serverless functions warm",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a warmup config and preview its iteration plan.
    Check {
        /// Path to the warmup config (TOML)
        #[arg(short, long)]
        config: String,
        /// Remaining time budget of a run, in milliseconds
        #[arg(short, long, default_value = "10000")]
        deadline_millis: u64,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Print the default warmup config.
    Defaults,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,warmgrid=debug".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check {
            config,
            deadline_millis,
            format,
        } => commands::check::check(&config, deadline_millis, &format),
        Commands::Defaults => commands::check::defaults(),
    }
}
