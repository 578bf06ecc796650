mod commands;
mod config;
mod server;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::process;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use healthlog_core::appwrite::AppwriteClient;
use healthlog_core::auth::AuthService;
use healthlog_core::forms::{ExerciseForm, FoodForm, SleepForm, WeightForm};

use crate::commands::{
    cmd_add, cmd_dashboard, cmd_delete, cmd_login, cmd_logout, cmd_records, cmd_recover,
    cmd_register, cmd_verify, cmd_whoami, form_date, load_tracker,
};
use crate::config::Config;

#[derive(Parser)]
#[command(
    name = "healthlog",
    version,
    about = "Track exercise, food, sleep, and weight",
    long_about = "Track exercise, food, sleep, and weight.\n\n\
        Records are stored per user in an Appwrite database. Sign in with\n\
        `healthlog auth login <email>` before logging anything."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Log backend requests to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Register, sign in, and manage the account
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Log exercise sessions
    Exercise {
        #[command(subcommand)]
        command: ExerciseCommands,
    },
    /// Log meals and snacks
    Food {
        #[command(subcommand)]
        command: FoodCommands,
    },
    /// Log a night of sleep
    Sleep {
        #[command(subcommand)]
        command: SleepCommands,
    },
    /// Log body weight and composition
    Weight {
        #[command(subcommand)]
        command: WeightCommands,
    },
    /// Delete a record by kind and ID
    Delete {
        /// Record kind: exercise, food, sleep, weight
        kind: String,
        /// Record ID (see `healthlog records`)
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List records, newest first
    Records {
        /// Category: all, exercise, food, sleep, weight
        #[arg(short, long, default_value = "all")]
        category: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show today's totals, the last 7 days, and the weight trend
    Dashboard {
        /// Date to show (YYYY-MM-DD, today, yesterday; default: today)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Serve the signed-in user's records as a local JSON API
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

#[derive(Subcommand)]
enum AuthCommands {
    /// Create an account and sign in
    Register {
        email: String,
        /// Display name (default: the part of the email before '@')
        #[arg(long)]
        name: Option<String>,
        /// Password (prompted for when omitted)
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Sign in with email and password
    Login {
        email: String,
        /// Password (prompted for when omitted)
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Sign out and forget the stored session
    Logout {
        #[arg(long)]
        json: bool,
    },
    /// Show the signed-in user
    Whoami {
        #[arg(long)]
        json: bool,
    },
    /// Send a verification email to the signed-in user
    Verify {
        #[arg(long)]
        json: bool,
    },
    /// Send a password recovery email
    Recover {
        email: String,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ExerciseCommands {
    /// Log an exercise session
    Add {
        /// Exercise type (e.g. running, cycling, swimming, gym, yoga, walking)
        exercise_type: String,
        /// Duration in minutes
        duration: String,
        /// Calories burned
        calories: String,
        /// Date (YYYY-MM-DD, today, yesterday; default: today)
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum FoodCommands {
    /// Log a food item
    Add {
        /// Food name
        name: String,
        /// Calories
        calories: String,
        /// Meal type: breakfast, lunch, dinner, snack
        #[arg(short, long, default_value = "breakfast")]
        meal: String,
        /// Portion weight in grams
        #[arg(short, long)]
        weight: Option<String>,
        /// Date (YYYY-MM-DD, today, yesterday; default: today)
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum SleepCommands {
    /// Log a night of sleep
    Add {
        /// Bedtime (HH:MM)
        #[arg(long, default_value = "22:00")]
        bedtime: String,
        /// Wake time (HH:MM)
        #[arg(long, default_value = "07:00")]
        wake: String,
        /// Quality from 1 (very poor) to 5 (very good)
        #[arg(short, long, default_value = "3")]
        quality: String,
        /// Date (YYYY-MM-DD, today, yesterday; default: today)
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum WeightCommands {
    /// Log a weigh-in
    Add {
        /// Weight in kg
        weight: String,
        /// Body fat percentage
        #[arg(long)]
        body_fat: Option<String>,
        /// Muscle mass percentage
        #[arg(long)]
        muscle: Option<String>,
        /// Date (YYYY-MM-DD, today, yesterday; default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "healthlog=debug,healthlog_core=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let client =
        AppwriteClient::new(config.backend.clone()).context("Failed to create backend client")?;
    client.set_session(config.load_session()?);
    let auth = AuthService::new(client, config.auth.clone());

    match cli.command {
        Commands::Auth { command } => match command {
            AuthCommands::Register {
                email,
                name,
                password,
                json,
            } => cmd_register(&config, &auth, &email, name, password, json).await,
            AuthCommands::Login {
                email,
                password,
                json,
            } => cmd_login(&config, &auth, &email, password, json).await,
            AuthCommands::Logout { json } => cmd_logout(&config, &auth, json).await,
            AuthCommands::Whoami { json } => cmd_whoami(&auth, json).await,
            AuthCommands::Verify { json } => cmd_verify(&auth, json).await,
            AuthCommands::Recover { email, json } => cmd_recover(&auth, &email, json).await,
        },
        Commands::Exercise { command } => match command {
            ExerciseCommands::Add {
                exercise_type,
                duration,
                calories,
                date,
                notes,
                json,
            } => {
                let form = ExerciseForm {
                    date: form_date(date)?,
                    exercise_type,
                    duration,
                    calories,
                    notes,
                };
                cmd_add(&auth, form, json).await
            }
        },
        Commands::Food { command } => match command {
            FoodCommands::Add {
                name,
                calories,
                meal,
                weight,
                date,
                notes,
                json,
            } => {
                let form = FoodForm {
                    date: form_date(date)?,
                    meal: Some(meal),
                    name,
                    calories,
                    weight,
                    notes,
                };
                cmd_add(&auth, form, json).await
            }
        },
        Commands::Sleep { command } => match command {
            SleepCommands::Add {
                bedtime,
                wake,
                quality,
                date,
                notes,
                json,
            } => {
                let form = SleepForm {
                    date: form_date(date)?,
                    bedtime: Some(bedtime),
                    wake_time: Some(wake),
                    quality: Some(quality),
                    notes,
                };
                cmd_add(&auth, form, json).await
            }
        },
        Commands::Weight { command } => match command {
            WeightCommands::Add {
                weight,
                body_fat,
                muscle,
                date,
                json,
            } => {
                let form = WeightForm {
                    date: form_date(date)?,
                    weight,
                    body_fat,
                    muscle,
                };
                cmd_add(&auth, form, json).await
            }
        },
        Commands::Delete { kind, id, json } => cmd_delete(&auth, &kind, &id, json).await,
        Commands::Records { category, json } => cmd_records(&auth, &category, json).await,
        Commands::Dashboard { date, json } => cmd_dashboard(&auth, date, json).await,
        Commands::Serve {
            port,
            bind,
            no_auth,
        } => {
            let tracker = load_tracker(&auth).await?;
            let api_key = if no_auth {
                None
            } else {
                let (key, created) = config.load_or_create_api_key()?;
                tracing::debug!(created, "API key ready");
                Some(key)
            };
            server::start_server(tracker, port, &bind, api_key).await
        }
    }
}
