mod commands;
mod config;
mod server;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process;
use tracing_subscriber::EnvFilter;

use crate::commands::{
    cmd_analyze, cmd_foods, cmd_learn, cmd_profile, cmd_recommend, cmd_shell, cmd_suggest,
};
use crate::config::Config;

#[derive(Parser)]
#[command(
    name = "caltrack",
    version,
    about = "A personal nutrition and fitness tracker",
    long_about = "\n\n   ┏━╸┏━┓╻  ╺┳╸┏━┓┏━┓┏━╸╻┏
   ┃  ┣━┫┃   ┃ ┣┳┛┣━┫┃  ┣┻┓
   ┗━╸╹ ╹┗━╸ ╹ ╹┗╸╹ ╹┗━╸╹ ╹
     plan it, log it, move it.
"
)]
struct Cli {
    /// Verbose logging (debug level) on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate BMR and TDEE for a profile
    Profile {
        #[arg(long, default_value_t = 30)]
        age: u32,
        /// male, female or other
        #[arg(long, default_value = "male")]
        gender: String,
        /// Weight in kg
        #[arg(long, default_value_t = 70.0)]
        weight: f64,
        /// Height in cm
        #[arg(long, default_value_t = 170.0)]
        height: f64,
        /// sedentary, light, moderate, very or extra (full labels accepted)
        #[arg(long, default_value = "sedentary")]
        activity: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the food database
    Foods {
        /// Filter by name
        #[arg(short, long)]
        search: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Nutrient analysis for an amount of food
    Analyze {
        /// Food name
        food: String,
        /// Amount (e.g. "150", "150g", "0.5kg", "5 oz"; default 100g)
        amount: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Suggest meals for a daily calorie goal
    Suggest {
        /// Daily calorie goal (default 2000)
        #[arg(short, long)]
        calories: Option<u32>,
        /// Seed for reproducible suggestions
        #[arg(long)]
        seed: Option<u64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Recommend meals for a diet type
    Recommend {
        /// balanced, low-carb, high-protein, vegetarian or vegan
        #[arg(short, long, default_value = "balanced")]
        diet: String,
        /// Daily calorie target (default 2000)
        #[arg(short, long)]
        calories: Option<u32>,
        /// Seed for reproducible recommendations
        #[arg(long)]
        seed: Option<u64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Nutrition education topics
    Learn {
        /// Topic number or title (lists topics when omitted)
        topic: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Interactive session: meal plan, progress, goals and tracker
    Shell {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
        /// Disable API key authentication (for development/testing)
        #[arg(long)]
        no_auth: bool,
    },
}

fn init_tracing(cli: &Cli) {
    let fallback = if cli.verbose {
        "debug"
    } else if matches!(cli.command, Commands::Serve { .. }) {
        "info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Profile {
            age,
            gender,
            weight,
            height,
            activity,
            json,
        } => cmd_profile(age, &gender, weight, height, &activity, json),
        Commands::Foods { search, json } => cmd_foods(search.as_deref(), json),
        Commands::Analyze { food, amount, json } => cmd_analyze(&food, amount.as_deref(), json),
        Commands::Suggest {
            calories,
            seed,
            json,
        } => cmd_suggest(calories, seed, json),
        Commands::Recommend {
            diet,
            calories,
            seed,
            json,
        } => cmd_recommend(&diet, calories, seed, json),
        Commands::Learn { topic, json } => cmd_learn(topic.as_deref(), json),
        Commands::Shell { json } => cmd_shell(json),
        Commands::Serve {
            port,
            bind,
            no_auth,
        } => {
            let (api_key, new_api_key) = if no_auth {
                (None, false)
            } else {
                let config = Config::load()?;
                let (key, new) = config.load_or_create_api_key()?;
                (Some(key), new)
            };
            server::start_server(port, &bind, api_key, new_api_key).await
        }
    }
}
