//! tropactl - scout group portal server and administration CLI
//!
//! Subcommands:
//! - `serve`: run the HTTP API server
//! - `init`: create the database file and schema
//! - `admin`: user administration (create-user, set-password)
//! - `config`: manage the tropactl configuration file

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use tropa_core::AppConfig;
use tropa_server::auth::hash_password;
use tropa_server::db::repos::{NewUser, UserRepo};
use tropa_server::db::{init_schema, open_pool};
use tropa_server::models::{Email, Role};

mod tracing_setup;

#[derive(Parser, Debug)]
#[command(
    name = "tropactl",
    author,
    version,
    about = "Scout group portal: API server, database, and user administration"
)]
struct Cli {
    /// Path to the config file (default: ~/.config/tropa/tropactl.toml)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API server
    Serve(ServeArgs),
    /// Create the database file and schema
    Init,
    /// User administration
    Admin(AdminArgs),
    /// Manage the configuration file (show, init)
    Config(ConfigArgs),
}

#[derive(Parser, Debug)]
struct ServeArgs {
    /// Override the bind address (host:port)
    #[arg(long)]
    bind: Option<String>,

    /// Override the database path
    #[arg(long)]
    db: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct AdminArgs {
    #[command(subcommand)]
    command: AdminCommands,
}

#[derive(Subcommand, Debug)]
enum AdminCommands {
    /// Create a user account
    CreateUser(CreateUserArgs),
    /// Reset a user's password
    SetPassword(SetPasswordArgs),
}

#[derive(Parser, Debug)]
struct CreateUserArgs {
    /// Email address (login identifier)
    email: String,

    /// Display name
    #[arg(long)]
    nombre: String,

    /// Role: admin, comite, scouter, familia, educando
    #[arg(long, default_value = "familia")]
    rol: String,

    /// Section id to attach the user to
    #[arg(long)]
    seccion: Option<i64>,

    /// Password (prompted on stdin when omitted)
    #[arg(long)]
    password: Option<String>,
}

#[derive(Parser, Debug)]
struct SetPasswordArgs {
    /// Email address of the account
    email: String,

    /// New password (prompted on stdin when omitted)
    #[arg(long)]
    password: Option<String>,
}

#[derive(Parser, Debug)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Write a default config file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_setup::init_tracing(cli.debug).ok();

    let config = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Commands::Serve(args) => run_serve(config, args).await,
        Commands::Init => run_init(config).await,
        Commands::Admin(args) => run_admin(config, args.command).await,
        Commands::Config(args) => run_config(cli.config, config, args.command),
    }
}

async fn run_serve(mut config: AppConfig, args: ServeArgs) -> Result<()> {
    if let Some(bind) = args.bind {
        config.bind_addr = bind.parse().context("invalid --bind address")?;
    }
    if let Some(db) = args.db {
        config.database_path = db;
    }

    let pool = open_pool(&config.database_path)
        .await
        .context("opening database")?;
    init_schema(&pool).await.context("initializing schema")?;

    tropa_server::run_server(pool, config)
        .await
        .context("running server")?;
    Ok(())
}

async fn run_init(config: AppConfig) -> Result<()> {
    let pool = open_pool(&config.database_path)
        .await
        .context("opening database")?;
    init_schema(&pool).await.context("initializing schema")?;

    println!("Database ready at {}", config.database_path.display());
    Ok(())
}

async fn run_admin(config: AppConfig, command: AdminCommands) -> Result<()> {
    let pool = open_pool(&config.database_path)
        .await
        .context("opening database")?;
    init_schema(&pool).await.context("initializing schema")?;
    let repo = UserRepo::new(&pool);

    match command {
        AdminCommands::CreateUser(args) => {
            let email = Email::new(&args.email).map_err(|e| anyhow::anyhow!("{e}"))?;
            let rol = Role::parse(&args.rol).map_err(|e| anyhow::anyhow!("{e}"))?;
            let password = match args.password {
                Some(p) => p,
                None => prompt_password()?,
            };
            if password.len() < 8 {
                bail!("password must be at least 8 characters");
            }

            let user = repo
                .create(NewUser {
                    email,
                    nombre: args.nombre,
                    rol,
                    seccion_id: args.seccion,
                    password_hash: hash_password(&password),
                })
                .await
                .context("creating user")?;

            println!("Created {} ({}) with id {}", user.nombre, user.email, user.id);
        }
        AdminCommands::SetPassword(args) => {
            let email = Email::new(&args.email).map_err(|e| anyhow::anyhow!("{e}"))?;
            let (user, _) = repo
                .get_auth_by_email(&email)
                .await
                .context("looking up user")?
                .with_context(|| format!("no active user with email {}", email.as_str()))?;

            let password = match args.password {
                Some(p) => p,
                None => prompt_password()?,
            };
            if password.len() < 8 {
                bail!("password must be at least 8 characters");
            }

            repo.set_password(user.id, &hash_password(&password))
                .await
                .context("updating password")?;
            println!("Password updated for {}", user.email);
        }
    }

    Ok(())
}

fn run_config(
    path: Option<PathBuf>,
    config: AppConfig,
    command: ConfigCommands,
) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            println!("{}", toml_pretty(&config)?);
        }
        ConfigCommands::Init => {
            let path = path.unwrap_or_else(AppConfig::default_path);
            if path.exists() {
                bail!("config file already exists at {}", path.display());
            }
            config.save(&path).context("writing config file")?;
            println!("Wrote {}", path.display());
        }
    }
    Ok(())
}

fn toml_pretty(config: &AppConfig) -> Result<String> {
    toml::to_string_pretty(config).context("serializing config")
}

fn prompt_password() -> Result<String> {
    print!("Password: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("reading password from stdin")?;
    let password = line.trim_end_matches(['\n', '\r']).to_owned();
    if password.is_empty() {
        bail!("empty password");
    }
    Ok(password)
}
