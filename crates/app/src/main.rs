use std::fmt;

use api::ServerConfig;
use services::{AppServices, Clock, seed_catalog};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidPort { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidPort { raw } => write!(f, "invalid --port value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- serve [--db <sqlite_url>] [--port <n>]");
    eprintln!("  cargo run -p app -- seed  [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://aware.sqlite3");
    eprintln!("  --port 8080");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  AWARE_DB_URL, AWARE_HOST, AWARE_PORT, AWARE_JWT_SECRET, AWARE_TOKEN_TTL_HOURS,");
    eprintln!("  AWARE_PASSING_SCORE, AWARE_LEADERBOARD_LIMIT, AWARE_ADMIN_PASSWORD, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Serve,
    Seed,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "serve" => Some(Self::Serve),
            "seed" => Some(Self::Seed),
            _ => None,
        }
    }
}

/// Command-line overrides; anything left unset comes from `ServerConfig`.
#[derive(Debug, Default, PartialEq, Eq)]
struct Args {
    db_url: Option<String>,
    port: Option<u16>,
}

impl Args {
    fn parse(cmd: Command, args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self::default();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    parsed.db_url = Some(value);
                }
                "--port" if cmd == Command::Serve => {
                    let value = require_value(args, "--port")?;
                    let port = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidPort { raw: value.clone() })?;
                    parsed.port = Some(port);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(parsed)
    }

    fn apply(self, config: &mut ServerConfig) {
        if let Some(db_url) = self.db_url {
            config.db_url = db_url;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        config.db_url = normalize_sqlite_url(std::mem::take(&mut config.db_url));
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") || raw.starts_with("sqlite:file:") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" || db_url.starts_with("sqlite:file:") {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn admin_password() -> Option<String> {
    std::env::var("AWARE_ADMIN_PASSWORD")
        .ok()
        .filter(|password| !password.trim().is_empty())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug,sqlx=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // Serving is the default when no subcommand is given.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Serve,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Serve,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let args = Args::parse(cmd, &mut argv.into_iter()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    init_tracing();

    let mut config = ServerConfig::load()?;
    args.apply(&mut config);

    // Open + migrate SQLite at startup. Keep this in the binary glue so services stay storage-agnostic.
    prepare_sqlite_file(&config.db_url)?;
    let settings = config.service_settings()?;
    let services = AppServices::new_sqlite(&config.db_url, Clock::system(), &settings).await?;
    info!(db = %config.db_url, "storage ready");

    match cmd {
        Command::Serve => api::serve(&config, services).await?,
        Command::Seed => {
            let password = admin_password();
            let report =
                seed_catalog(&services, config.passing_score, password.as_deref()).await?;
            if let Some(generated) = &report.generated_admin_password {
                warn!("AWARE_ADMIN_PASSWORD not set, generated a one-off admin password");
                // Printed once so the operator can log in.
                eprintln!("admin password: {generated}");
            }
            info!(
                modules = report.modules,
                assessments = report.assessments,
                badges = report.badges,
                admin_created = report.admin_created,
                "seed finished"
            );
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(items: &[&str]) -> impl Iterator<Item = String> {
        items
            .iter()
            .map(|s| (*s).to_string())
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn parses_serve_overrides() {
        let args = Args::parse(Command::Serve, &mut argv(&["--db", "sqlite::memory:", "--port", "9000"]))
            .unwrap();
        assert_eq!(args.db_url.as_deref(), Some("sqlite::memory:"));
        assert_eq!(args.port, Some(9000));
    }

    #[test]
    fn seed_rejects_port_flag() {
        let err = Args::parse(Command::Seed, &mut argv(&["--port", "9000"])).unwrap_err();
        assert!(matches!(err, ArgsError::UnknownArg(arg) if arg == "--port"));
    }

    #[test]
    fn rejects_bad_port_and_missing_values() {
        assert!(matches!(
            Args::parse(Command::Serve, &mut argv(&["--port", "http"])),
            Err(ArgsError::InvalidPort { .. })
        ));
        assert!(matches!(
            Args::parse(Command::Serve, &mut argv(&["--db"])),
            Err(ArgsError::MissingValue { flag: "--db" })
        ));
    }

    #[test]
    fn relative_paths_become_absolute_sqlite_urls() {
        let url = normalize_sqlite_url("data/aware.sqlite3".into());
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("data/aware.sqlite3"));
        assert_eq!(normalize_sqlite_url("sqlite::memory:".into()), "sqlite::memory:");
    }
}
