use agency_cms::auth::hash_password;
use agency_cms::config::Config;
use agency_cms::domain::{Role, UserInput};
use agency_cms::logging;
use agency_cms::metrics::init_metrics;
use agency_cms::seed;
use agency_cms::server::{start_server, AppState};
use agency_cms::storage::Database;
use clap::{Parser, Subcommand};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "agency_cms")]
#[command(about = "Marketing site, JSON API and back-office for a content agency")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the web server (default)
    Serve,
    /// Apply database migrations and exit
    Migrate,
    /// Replace stored content with the defaults
    Seed {
        /// Seed a single target: `<page>.<section>` or a resource such as `blog`
        #[arg(long)]
        only: Option<String>,
    },
    /// Create an administrator account
    CreateAdmin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load()?;
    let _guard = logging::init_logging(&config.log_dir);

    let db = Database::open(&config.database_path)?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            config.ensure_session_secret();
            let state = AppState::new(db, config)?.with_metrics(init_metrics());
            if let Err(e) = start_server(state).await {
                error!("Server stopped: {}", e);
                return Err(e);
            }
        }
        Commands::Migrate => {
            // Database::open already migrated.
            info!("Database at {} is up to date", config.database_path);
            println!("✅ Migrations applied to {}", config.database_path);
        }
        Commands::Seed { only } => {
            let report = seed::seed(&db, only.as_deref())?;
            println!("🌱 Seeded {} rows", report.total());
            for (target, count) in &report.seeded {
                println!("   {}: {}", target, count);
            }
        }
        Commands::CreateAdmin { email, name, password } => {
            let input = UserInput {
                name: Some(name),
                email: Some(email),
                password: Some(password),
                role: Some(Role::Admin.as_str().to_string()),
                is_active: Some(true),
            };
            let (mut user, password) = input.into_user()?;
            user.password_hash = hash_password(&password)?;
            db.create_user(&mut user)?;
            info!("Created administrator {}", user.email);
            println!("👤 Created administrator {} (id {})", user.email, user.id);
        }
    }
    Ok(())
}
