//! Sealen CLI - Command-line front end for the Sealen service.
//!
//! # Usage
//!
//! ```bash
//! # Log in (password is read from stdin when --password is omitted)
//! sealen login -e operator@sealen.id
//!
//! # Try everything against the in-memory backend
//! sealen --backend mock login -e admin@sealen.id -p Admin123
//!
//! # Quote and book a 90-day rental
//! sealen quote --days 90
//! sealen rent --robot 2 --start 2025-06-01 --days 90 --location "Teluk Jakarta"
//!
//! # Drive a robot
//! sealen robot start 2
//! sealen robot drive 2 forward --speed 40
//! ```
//!
//! # Commands
//!
//! - `login`, `register`, `logout`, `whoami`, `renew` - Session management
//! - `open` - Check and show a page
//! - `quote`, `products`, `buy`, `rent`, `bookings`, `robots` - Shopping
//! - `certification` - Operator course
//! - `robot` - Robot control (admins and operators)
//! - `dashboard` - Fleet metrics (admins)
//! - `demo` - Scripted walkthrough on the simulated backend

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{Layer, layer::SubscriberExt, util::SubscriberInitExt};

use sealen_client::config::{Backend, LogFormat};
use sealen_client::{ClientConfig, ConfigError};

mod commands;
mod output;

use commands::{CliError, Context};

#[derive(Parser)]
#[command(name = "sealen")]
#[command(author, version, about = "Sealen marine robotics client")]
struct Cli {
    /// Backend to talk to (`http` or `mock`); overrides `SEALEN_BACKEND`
    #[arg(long, global = true)]
    backend: Option<Backend>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and remember the session
    Login {
        #[arg(short, long)]
        email: String,
        /// Read from stdin when omitted
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Create an account and log in
    Register {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        email: String,
        /// `admin`, `operator` or `customer`
        #[arg(short, long, default_value = "customer")]
        role: String,
        /// Read from stdin when omitted
        #[arg(short, long)]
        password: Option<String>,
        /// Defaults to the password
        #[arg(long)]
        confirm_password: Option<String>,
    },
    /// End the session
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Exchange the refresh token for a new access token
    Renew,
    /// Open a page, as the navigation bar would
    Open {
        /// home, products, rent, certification, technology, control,
        /// dashboard, login or register
        page: String,
    },
    /// Quote a rental
    Quote {
        #[arg(short, long)]
        days: u32,
    },
    /// List catalogue products
    Products {
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Buy a product (certified users only)
    Buy {
        product: i64,
        /// `credit-card`, `e-wallet` or `bank-transfer`
        #[arg(short, long, default_value = "credit-card")]
        method: String,
    },
    /// Rent a robot
    Rent {
        #[arg(long)]
        robot: String,
        /// YYYY-MM-DD
        #[arg(long)]
        start: String,
        #[arg(long)]
        days: String,
        #[arg(long)]
        location: String,
        #[arg(short, long, default_value = "credit-card")]
        method: String,
    },
    /// List your bookings
    Bookings {
        /// Only bookings in this status
        #[arg(short, long)]
        status: Option<String>,
    },
    /// List robots available for rent
    Robots,
    /// Operator certification course
    Certification {
        #[command(subcommand)]
        action: CertificationAction,
    },
    /// Control a robot (admins and operators)
    Robot {
        #[command(subcommand)]
        action: RobotAction,
    },
    /// Show fleet metrics (admins)
    Dashboard,
    /// Walk through every flow against the simulated backend
    Demo,
}

#[derive(Subcommand)]
enum CertificationAction {
    /// List course modules
    Modules,
    /// Show your progress
    Progress,
    /// Mark a module as completed
    CompleteModule { module: i64 },
    /// Finish the course and receive the certificate
    Complete,
}

#[derive(Subcommand)]
enum RobotAction {
    /// Live telemetry
    Status { robot: i64 },
    /// Power on
    Start { robot: i64 },
    /// Power off
    Stop { robot: i64 },
    /// Send a manual drive command
    Drive {
        robot: i64,
        /// forward, backward, left or right
        direction: String,
        /// Percent of full speed, clamped to 0-100
        #[arg(short, long, default_value_t = 50)]
        speed: u32,
    },
    /// Switch between manual and auto mode
    Mode { robot: i64, mode: String },
    /// Stop immediately, whatever the mode
    EmergencyStop { robot: i64 },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

/// Initialize tracing with `EnvFilter` and Sentry integration.
fn init_tracing(format: LogFormat) {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sealen_cli=info,sealen_client=info".into());

    // Logs go to stderr so command output on stdout stays clean
    let fmt_layer = match format {
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

fn load_config(backend: Option<Backend>) -> Result<ClientConfig, ConfigError> {
    let config = ClientConfig::from_env();
    match (config, backend) {
        (Ok(config), Some(backend)) => config.with_backend(backend),
        (Ok(config), None) => Ok(config),
        // `--backend mock` needs no API URL even when the environment lacks one
        (Err(ConfigError::MissingEnvVar(_)), Some(Backend::Mock)) => {
            ClientConfig::from_lookup(|key| {
                if key == "SEALEN_BACKEND" {
                    Some(Backend::Mock.to_string())
                } else {
                    std::env::var(key).ok()
                }
            })
        }
        (Err(e), _) => Err(e),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.backend) {
        Ok(config) => config,
        Err(e) => {
            // Tracing is not set up yet; fall back to the default subscriber
            tracing_subscriber::fmt().with_writer(std::io::stderr).init();
            tracing::error!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);
    init_tracing(config.log_format);

    let result = run(cli.command, config).await;

    if let Err(e) = result {
        if let CliError::Client(err) = &e {
            err.report();
            output::notice(&err.notice());
        }
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: ClientConfig) -> Result<(), CliError> {
    if matches!(command, Commands::Demo) {
        return commands::demo::run(config).await;
    }

    let mut ctx = Context::connect(config).await?;

    match command {
        Commands::Login { email, password } => {
            commands::auth::login(&mut ctx, &email, password).await?;
        }
        Commands::Register {
            name,
            email,
            role,
            password,
            confirm_password,
        } => {
            commands::auth::register(&mut ctx, name, email, role, password, confirm_password)
                .await?;
        }
        Commands::Logout => commands::auth::logout(&mut ctx).await,
        Commands::Whoami => commands::auth::whoami(&ctx),
        Commands::Renew => commands::auth::renew(&mut ctx).await?,
        Commands::Open { page } => commands::pages::open(&mut ctx, &page).await?,
        Commands::Quote { days } => commands::shop::quote(&ctx, days)?,
        Commands::Products { category } => {
            commands::shop::products(&ctx, category.as_deref()).await?;
        }
        Commands::Buy { product, method } => commands::shop::buy(&mut ctx, product, &method).await?,
        Commands::Rent {
            robot,
            start,
            days,
            location,
            method,
        } => commands::shop::rent(&mut ctx, robot, start, days, location, &method).await?,
        Commands::Bookings { status } => {
            commands::shop::bookings(&ctx, status.as_deref()).await?;
        }
        Commands::Robots => commands::shop::robots(&ctx).await?,
        Commands::Certification { action } => match action {
            CertificationAction::Modules => commands::certification::modules(&ctx).await?,
            CertificationAction::Progress => commands::certification::progress(&ctx).await?,
            CertificationAction::CompleteModule { module } => {
                commands::certification::complete_module(&mut ctx, module).await?;
            }
            CertificationAction::Complete => {
                commands::certification::complete(&mut ctx).await?;
            }
        },
        Commands::Robot { action } => match action {
            RobotAction::Status { robot } => commands::robot::status(&ctx, robot).await?,
            RobotAction::Start { robot } => commands::robot::start(&ctx, robot).await?,
            RobotAction::Stop { robot } => commands::robot::stop(&ctx, robot).await?,
            RobotAction::Drive {
                robot,
                direction,
                speed,
            } => commands::robot::drive(&ctx, robot, &direction, speed).await?,
            RobotAction::Mode { robot, mode } => {
                commands::robot::mode(&ctx, robot, &mode).await?;
            }
            RobotAction::EmergencyStop { robot } => {
                commands::robot::emergency_stop(&ctx, robot).await?;
            }
        },
        Commands::Dashboard => commands::pages::dashboard(&ctx).await?,
        // Runs on its own backend, see above
        Commands::Demo => {}
    }
    Ok(())
}
