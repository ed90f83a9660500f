//! Schoolbook CLI - run and inspect the school records API
//!
//! `serve` starts the HTTP server, `check-config` shows how configuration
//! resolved without starting anything, and `generate-secret` prints a
//! signing secret strong enough for a given environment.

use clap::{Parser, Subcommand};
use serde_json::json;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use schoolbook::app_config::DEFAULT_ADMIN_PASSWORD;
use schoolbook::jwt_secret::{entropy_bits, generate_secret, random_secret};
use schoolbook::{observability, server, AppConfig, Environment, SecretPolicy};

mod error;
mod output;

use error::{CliError, Result};

/// How many random candidates `generate-secret --length` tries before giving up.
const SECRET_ATTEMPTS: usize = 16;

/// Schoolbook - school records API
#[derive(Parser)]
#[command(name = "schoolbook")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Optional TOML configuration file; environment variables override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the API server
    Serve {
        /// Address to listen on, overriding LISTEN_ADDR and the config file
        #[arg(short, long)]
        listen: Option<SocketAddr>,
    },

    /// Resolve configuration and report it without starting the server
    CheckConfig {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a random JWT signing secret
    GenerateSecret {
        /// Secret length in characters (defaults to what the environment needs)
        #[arg(short, long)]
        length: Option<usize>,

        /// Environment whose policy the secret must satisfy
        #[arg(short, long, default_value = "production")]
        environment: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve { listen } => cmd_serve(cli.config.as_deref(), listen),
        Commands::CheckConfig { json } => cmd_check_config(cli.config.as_deref(), json),
        Commands::GenerateSecret {
            length,
            environment,
        } => cmd_generate_secret(length, &environment),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Command Implementations
// =============================================================================

fn cmd_serve(config_path: Option<&Path>, listen: Option<SocketAddr>) -> Result<()> {
    let mut config = AppConfig::load(config_path)?;
    if let Some(addr) = listen {
        config.listen_addr = addr;
    }

    observability::init(&config.observability)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    runtime.block_on(server::serve(config))?;
    Ok(())
}

fn cmd_check_config(config_path: Option<&Path>, json: bool) -> Result<()> {
    let config = AppConfig::load(config_path)?;
    let warnings = config_warnings(&config);

    if json {
        let mut report = config_report(&config);
        report["warnings"] = json!(warnings);
        output::print_json(&report)?;
        return Ok(());
    }

    output::print_banner();
    output::header("Resolved configuration");
    output::field("environment", config.environment);
    output::field("listen", config.listen_addr);
    output::field("database", &config.database.database_url);
    output::field(
        "pool",
        format!(
            "{}..{} connections",
            config.database.min_connections, config.database.max_connections
        ),
    );
    output::field("signing secret", secret_summary(&config));
    output::field(
        "token lifetime",
        config
            .auth
            .token_lifetime
            .map(|d| format!("{}s", d.as_secs()))
            .unwrap_or_else(|| "none (tokens do not expire)".to_string()),
    );
    output::field("admin account", &config.auth.admin.username);
    output::field("max request size", config.security.max_request_size);
    output::field(
        "request timeout",
        format!("{}s", config.security.request_timeout.as_secs()),
    );
    output::field("log format", config.observability.log_format);

    println!();
    if warnings.is_empty() {
        output::success("Configuration is valid");
    } else {
        for warning in &warnings {
            output::warning(warning);
        }
    }

    Ok(())
}

fn cmd_generate_secret(length: Option<usize>, environment: &str) -> Result<()> {
    let environment: Environment = environment.parse().map_err(|_| {
        CliError::invalid(
            "environment",
            format!("unknown environment '{environment}' (development, testing, staging, production)"),
        )
    })?;

    let secret = match length {
        None => generate_secret(environment),
        Some(length) => secret_of_length(length, environment)?,
    };

    println!("{secret}");
    Ok(())
}

// =============================================================================
// Helpers
// =============================================================================

fn secret_of_length(length: usize, environment: Environment) -> Result<String> {
    let policy = SecretPolicy::for_environment(environment);
    let mut last_error = None;
    for _ in 0..SECRET_ATTEMPTS {
        let candidate = random_secret(length);
        match policy.validate(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) => last_error = Some(e),
        }
    }
    match last_error {
        Some(e) => Err(e.into()),
        None => Err(CliError::invalid("length", "no candidate generated")),
    }
}

fn secret_summary(config: &AppConfig) -> String {
    if config.auth.secret_generated {
        "generated for this process".to_string()
    } else {
        format!(
            "provided ({} chars, ~{:.0} bits)",
            config.auth.jwt_secret.len(),
            entropy_bits(&config.auth.jwt_secret)
        )
    }
}

/// Machine-readable view of the resolved configuration. Never includes the
/// signing secret or the admin password.
fn config_report(config: &AppConfig) -> serde_json::Value {
    json!({
        "environment": config.environment.as_str(),
        "listen_addr": config.listen_addr.to_string(),
        "database": {
            "url": config.database.database_url,
            "max_connections": config.database.max_connections,
            "min_connections": config.database.min_connections,
            "acquire_timeout_secs": config.database.acquire_timeout.as_secs(),
            "busy_timeout_secs": config.database.busy_timeout.as_secs(),
        },
        "auth": {
            "secret": secret_summary(config),
            "secret_generated": config.auth.secret_generated,
            "token_lifetime_secs": config.auth.token_lifetime.map(|d| d.as_secs()),
            "admin_username": config.auth.admin.username,
        },
        "http": {
            "max_request_size": config.security.max_request_size,
            "request_timeout_secs": config.security.request_timeout.as_secs(),
            "cors_allowed_origins": config.security.cors_origins,
            "security_headers": config.security.security_headers_enabled,
            "tracing": config.security.tracing_enabled,
        },
        "logging": {
            "filter": config.observability.log_filter,
            "format": config.observability.log_format.to_string(),
        },
    })
}

fn config_warnings(config: &AppConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    let deployed = config.environment.requires_explicit_secret();

    if config.auth.secret_generated {
        warnings.push("JWT_SECRET is not set; issued tokens stop working on restart".to_string());
    }
    if deployed && config.auth.admin.password == DEFAULT_ADMIN_PASSWORD {
        warnings.push("ADMIN_PASSWORD is still the built-in default".to_string());
    }
    if deployed && config.security.cors_is_permissive() {
        warnings.push("CORS allows any origin".to_string());
    }
    if config.is_production() && config.auth.token_lifetime.is_none() {
        warnings.push("TOKEN_LIFETIME is not set; tokens never expire".to_string());
    }

    warnings
}
