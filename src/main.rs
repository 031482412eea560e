//! Reviewhub CLI - administrative access to the persistence and session engine

use clap::{Parser, Subcommand};
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::sync::Arc;

use reviewhub::config::{self, ReviewhubConfig};
use reviewhub::storage::SqliteStore;
use reviewhub::{Accounts, EntityMapper, SessionManager, ui};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "reviewhub")]
#[command(version)]
#[command(about = "Persistence and session engine for topics and reviews")]
#[command(long_about = r#"
Manage the reviewhub database: users, sessions and reviews.

Passwords are read from the terminal without echo, or from stdin when piped.

Example usage:
  reviewhub init
  reviewhub register --username martha --email martha@example.com
  reviewhub login --username martha
  reviewhub sessions --user martha
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the database file (overrides the config file)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config file and create the database schema
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Register a new user
    Register {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        email: String,
    },

    /// Log a user in and print the session id
    Login {
        #[arg(short, long)]
        username: String,
    },

    /// Deactivate a session
    Logout {
        /// Session id
        #[arg(short, long)]
        session: String,
    },

    /// List every stored session of a user
    Sessions {
        /// Username
        #[arg(short, long)]
        user: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Search reviews by author username or topic name
    Search {
        #[arg(short, long)]
        query: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show row counts per table
    Stats,

    /// Delete all data
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
}

struct Context {
    database: PathBuf,
    store: Arc<SqliteStore>,
    accounts: Accounts,
}

impl Context {
    fn open(config: &ReviewhubConfig, database: PathBuf) -> anyhow::Result<Self> {
        config::ensure_db_dir(&database)?;
        let store = Arc::new(SqliteStore::open(&database)?);
        let mapper = EntityMapper::new(store.clone());
        let sessions = SessionManager::with_ttl(mapper.clone(), config.session_ttl()?);
        let accounts = Accounts::new(mapper, sessions, config.credentials()?);
        Ok(Self {
            database,
            store,
            accounts,
        })
    }
}

fn resolve_database(cli_db: Option<PathBuf>, config: &ReviewhubConfig) -> anyhow::Result<PathBuf> {
    if let Some(db) = cli_db {
        return Ok(db);
    }
    let cwd = std::env::current_dir()?;
    Ok(config.database_path_in(&cwd))
}

fn read_password(prompt: &str) -> anyhow::Result<String> {
    let password = if io::stdin().is_terminal() {
        rpassword::prompt_password(prompt)?
    } else {
        let mut input = String::new();
        io::stdin().read_to_string(&mut input)?;
        input.trim_end_matches(['\r', '\n']).to_string()
    };
    if password.is_empty() {
        anyhow::bail!("password must not be empty");
    }
    Ok(password)
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();

    if let Err(e) = run(cli) {
        ui::error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let config = config::load_config(Some(&config_path))?.unwrap_or_default();
    let database = resolve_database(cli.database.clone(), &config)?;

    match cli.command {
        Commands::Init { force } => {
            let written = ReviewhubConfig {
                database: Some(database.display().to_string()),
                ..config.clone()
            };
            config::write_config(&config_path, &written, force)?;
            let ctx = Context::open(&written, database)?;
            ui::success(&format!("Wrote {}", config_path.display()));
            ui::info("Database", &ctx.database.display().to_string());
        }

        Commands::Register { username, email } => {
            let ctx = Context::open(&config, database)?;
            let password = read_password("Password: ")?;
            match ctx.accounts.register(&username, &email, &password) {
                Ok(user) => ui::success(&format!("Registered {} ({})", user.username, user.id)),
                Err(e) if e.is_constraint_violation() => {
                    anyhow::bail!("username or email already taken");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Commands::Login { username } => {
            let ctx = Context::open(&config, database)?;
            let password = read_password("Password: ")?;
            match ctx.accounts.login(&username, &password)? {
                Some(session) => {
                    ui::info("Expires", &session.expires_at.to_rfc3339());
                    println!("{}", session.id);
                }
                None => anyhow::bail!("invalid username or password"),
            }
        }

        Commands::Logout { session } => {
            let ctx = Context::open(&config, database)?;
            if ctx.accounts.logout(&session)? {
                ui::success(&format!("Session {} deactivated", session));
            } else {
                ui::warn(&format!("No session {}", session));
            }
        }

        Commands::Sessions { user, format } => {
            let ctx = Context::open(&config, database)?;
            let Some(found) = ctx.accounts.find_user(&user)? else {
                anyhow::bail!("no user named {}", user);
            };
            let sessions = ctx.accounts.sessions().sessions_for_user(&found.id)?;

            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&sessions)?);
            } else if sessions.is_empty() {
                println!("∅ No sessions for {}.", user);
            } else {
                println!("{}", ui::sessions_table(&sessions));
            }
        }

        Commands::Search { query, format } => {
            let ctx = Context::open(&config, database)?;
            let reviews = ctx.accounts.search_reviews(&query)?;

            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&reviews)?);
            } else if reviews.is_empty() {
                println!("∅ No reviews match '{}'.", query);
            } else {
                println!("{}", ui::reviews_table(&reviews));
            }
        }

        Commands::Stats => {
            let ctx = Context::open(&config, database)?;
            let stats = ctx.store.stats()?;
            ui::header(&format!("Reviewhub Statistics ({})", ctx.database.display()));
            println!("{}", ui::stats_table(&stats));
        }

        Commands::Reset { yes } => {
            if !yes {
                anyhow::bail!("refusing to delete all data without --yes");
            }
            let ctx = Context::open(&config, database)?;
            ctx.store.clear_all()?;
            tracing::info!("cleared all tables in {}", ctx.database.display());
            ui::success("All tables cleared");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reviewhub::Topic;

    fn cli(dir: &std::path::Path, args: &[&str]) -> Cli {
        let db = dir.join("data").join("app.db");
        let cfg = dir.join("reviewhub.toml");
        let mut argv = vec![
            "reviewhub".to_string(),
            "--database".to_string(),
            db.display().to_string(),
            "--config".to_string(),
            cfg.display().to_string(),
        ];
        argv.extend(args.iter().map(|a| a.to_string()));
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_stats_then_reset_clears_database() {
        let dir = tempfile::tempdir().unwrap();
        run(cli(dir.path(), &["stats"])).unwrap();

        let db = dir.path().join("data").join("app.db");
        let store = Arc::new(SqliteStore::open(&db).unwrap());
        let mapper = EntityMapper::new(store.clone());
        let accounts = Accounts::new(
            mapper.clone(),
            SessionManager::new(mapper.clone()),
            reviewhub::CredentialService::with_rounds(1_000),
        );
        let user = accounts.register("martha", "martha@example.com", "pw").unwrap();
        mapper.add(&Topic::new("Stocks", "up", &user.id)).unwrap();
        assert_eq!(store.stats().unwrap().topics, 1);

        assert!(run(cli(dir.path(), &["reset"])).is_err());
        assert_eq!(store.stats().unwrap().users, 1);

        run(cli(dir.path(), &["reset", "--yes"])).unwrap();
        let stats = store.stats().unwrap();
        assert_eq!((stats.users, stats.topics, stats.sessions), (0, 0, 0));
    }

    #[test]
    fn test_init_writes_config_once() {
        let dir = tempfile::tempdir().unwrap();
        run(cli(dir.path(), &["init"])).unwrap();
        assert!(dir.path().join("reviewhub.toml").is_file());
        assert!(dir.path().join("data").join("app.db").is_file());
        assert!(run(cli(dir.path(), &["init"])).is_err());
        run(cli(dir.path(), &["init", "--force"])).unwrap();
    }
}
