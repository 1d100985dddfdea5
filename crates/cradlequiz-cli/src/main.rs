//! cradlequiz CLI — validate corpora, draw quizzes and play them in a terminal.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

use commands::SelectionArgs;

#[derive(Parser)]
#[command(name = "cradlequiz", version, about = "Newborn-care trivia quiz engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a corpus file or directory
    Validate {
        /// Path to corpus file or directory
        #[arg(long)]
        corpus: PathBuf,
    },

    /// List the categories of a corpus with question counts
    Categories {
        /// Path to corpus file or directory (default: from config)
        #[arg(long)]
        corpus: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Draw a quiz and print it
    Sample {
        #[command(flatten)]
        selection: SelectionArgs,

        /// Print the drawn quiz as JSON
        #[arg(long)]
        json: bool,
    },

    /// Play a quiz interactively
    Play {
        #[command(flatten)]
        selection: SelectionArgs,

        /// Directory to save the results report in
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Create starter config and example corpus
    Init,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("cradlequiz=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { corpus } => commands::validate::execute(corpus),
        Commands::Categories { corpus, config } => commands::categories::execute(corpus, config),
        Commands::Sample { selection, json } => commands::sample::execute(selection, json),
        Commands::Play { selection, output } => commands::play::execute(selection, output),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
