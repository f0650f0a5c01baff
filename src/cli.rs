use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use time::Duration;

const DEFAULT_AUTH_COOKIE_NAME: &str = "eventboard_auth";

pub(crate) enum RunOutcome {
    Serve {
        addr: SocketAddr,
        config: eventboard::config::AppConfig,
    },
    Exit(i32),
}

pub(crate) fn run() -> RunOutcome {
    let cli = Cli::parse();
    if let Some(Command::AuthKey) = cli.command {
        let code = run_auth_key();
        return RunOutcome::Exit(code);
    }

    if let Some(seed) = cli.seed.as_ref()
        && !seed.is_file()
    {
        eprintln!("error: seed file not found: {}", seed.display());
        return RunOutcome::Exit(2);
    }

    let auth = match resolve_auth_config(&cli) {
        Ok(auth) => auth,
        Err(err) => {
            eprintln!("error: {err}");
            return RunOutcome::Exit(2);
        }
    };

    RunOutcome::Serve {
        addr: cli.bind,
        config: eventboard::config::AppConfig {
            app_name: cli.app_name,
            seed: cli.seed,
            auth,
        },
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "eventboard",
    version,
    about = "Event RSVP, item claims and chat on a live document store"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
    #[arg(long, env = "EVENTBOARD_BIND", default_value = "127.0.0.1:3000")]
    bind: SocketAddr,
    #[arg(long, env = "EVENTBOARD_APP_NAME", default_value = "Eventboard")]
    app_name: String,
    /// TOML file with the event details, accounts and items to start from.
    #[arg(long, env = "EVENTBOARD_SEED")]
    seed: Option<PathBuf>,
    #[arg(long, env = "EVENTBOARD_AUTH_KEY")]
    auth_key: Option<String>,
    #[arg(long, env = "EVENTBOARD_AUTH_TOKEN_TTL")]
    auth_token_ttl: Option<String>,
    #[arg(long, env = "EVENTBOARD_AUTH_COOKIE_NAME")]
    auth_cookie_name: Option<String>,
    #[arg(long, env = "EVENTBOARD_AUTH_COOKIE_SECURE")]
    auth_cookie_secure: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a fresh signing key for session cookies.
    AuthKey,
}

fn run_auth_key() -> i32 {
    let secret = match eventboard::auth::generate_auth_key() {
        Ok(secret) => secret,
        Err(err) => {
            eprintln!("failed to generate auth key: {err}");
            return 1;
        }
    };
    println!("{secret}");
    0
}

fn resolve_auth_config(cli: &Cli) -> Result<eventboard::config::AuthConfig, String> {
    let key = match cli.auth_key.as_deref().map(str::trim) {
        Some("") => return Err("auth key cannot be empty".to_string()),
        Some(key) => key.to_string(),
        None => {
            tracing::warn!(
                "no auth key configured; sessions will not survive a restart (see `eventboard auth-key`)"
            );
            eventboard::auth::generate_auth_key().map_err(|err| err.to_string())?
        }
    };

    if let Some(name) = cli.auth_cookie_name.as_deref()
        && name.trim().is_empty()
    {
        return Err("auth cookie name cannot be empty".to_string());
    }

    let token_ttl = match cli.auth_token_ttl.as_deref() {
        Some(raw) => parse_auth_token_ttl(raw)?,
        None => default_auth_token_ttl(),
    };
    let cookie_name = cli
        .auth_cookie_name
        .as_deref()
        .map(|name| name.trim().to_string())
        .unwrap_or_else(|| DEFAULT_AUTH_COOKIE_NAME.to_string());

    Ok(eventboard::config::AuthConfig {
        key,
        token_ttl,
        cookie_name,
        cookie_secure: cli.auth_cookie_secure,
    })
}

fn default_auth_token_ttl() -> Duration {
    Duration::days(14)
}

fn parse_auth_token_ttl(raw: &str) -> Result<Duration, String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err("auth token ttl cannot be empty".to_string());
    }

    let (amount, unit) = match value.chars().last() {
        Some(ch) if ch.is_ascii_alphabetic() => {
            (&value[..value.len() - 1], ch.to_ascii_lowercase())
        }
        _ => (value, 's'),
    };

    let amount: i64 = amount
        .parse()
        .map_err(|_| format!("invalid auth token ttl '{value}'; expected <number>[s|m|h|d]"))?;

    if amount <= 0 {
        return Err("auth token ttl must be greater than 0".to_string());
    }

    match unit {
        's' => Ok(Duration::seconds(amount)),
        'm' => Ok(Duration::minutes(amount)),
        'h' => Ok(Duration::hours(amount)),
        'd' => Ok(Duration::days(amount)),
        _ => Err(format!(
            "invalid auth token ttl '{value}'; expected <number>[s|m|h|d]"
        )),
    }
}
