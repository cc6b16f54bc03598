use clap::{Parser, Subcommand, ValueEnum};

mod commands;

#[derive(Parser)]
#[command(
    name = "capgrid",
    about = "CapGrid — capacity-aware pod placement engine",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Schedule a pod claim against a set of candidate nodes
    SchedulePod {
        /// Nodes document (YAML or JSON list of nodes)
        #[arg(long)]
        nodes: String,

        /// Claim document (YAML or JSON pod capacity claim)
        #[arg(long)]
        claim: String,

        /// Output format for the winning allocation
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
        output: OutputFormat,

        /// Print the per-node diagnostic summary for every candidate
        #[arg(short, long)]
        verbose: bool,
    },
    /// Emit a synthetic nodes document for one of the example shapes
    GenExample {
        /// Shape number: 0 (compute), 1 (foozer-1000), 2 (foozer-4000),
        /// 3 (mixed)
        shape: u8,

        /// How many nodes to generate
        #[arg(long, default_value_t = 1)]
        count: usize,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub(crate) enum OutputFormat {
    Yaml,
    Json,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("capgrid=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::SchedulePod {
            nodes,
            claim,
            output,
            verbose,
        } => commands::schedule::run(&nodes, &claim, output, verbose),
        Commands::GenExample { shape, count } => commands::gen::run(shape, count),
    }
}
