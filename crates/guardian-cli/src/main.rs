use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "guardian-cli", version, about = "Guardian Angel CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive safety session (commands on stdin, events as JSON lines)
    Run(commands::session::RunArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Ask the danger assessor about a situation
    Assess {
        /// Free-text description of what is happening
        text: String,
    },
    /// Get tactical safety tips
    Guidance {
        /// How the user feels or what is happening
        situation: String,
        /// Where the user is
        #[arg(long, default_value = "Current Location")]
        location: String,
    },
    /// Search for safe havens near a position
    Havens {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run(args) => commands::session::run(args),
        Commands::Config { action } => commands::config::run(action),
        Commands::Assess { text } => commands::oracle::assess(&text),
        Commands::Guidance {
            situation,
            location,
        } => commands::oracle::guidance(&situation, &location),
        Commands::Havens { lat, lng } => commands::oracle::havens(lat, lng),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
