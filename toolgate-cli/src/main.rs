// toolgate-cli/src/main.rs
// ============================================================================
// Module: Toolgate CLI Entry Point
// Description: Command dispatcher for serving and validating configurations.
// Purpose: Wire environment settings, logging, signals, and the server.
// Dependencies: clap, tokio, toolgate-mcp, tracing-subscriber
// ============================================================================

//! ## Overview
//! The binary reads its environment settings (`YAML_MCP_CONFIG`,
//! `YAML_MCP_LOG_LEVEL`, `YAML_MCP_LANG`, `YAML_MCP_SHUTDOWN_TIMEOUT`),
//! renders and validates the configuration document, and either serves it
//! or just reports validity. Any startup failure exits with code 1;
//! invocation-time failures never abort the process.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use tokio_util::sync::CancellationToken;
use toolgate_core::messages::Lang;
use toolgate_core::runtime::context::InvocationContext;
use toolgate_mcp::GatewayConfig;
use toolgate_mcp::McpServer;
use toolgate_mcp::ToolRegistry;
use toolgate_mcp::TracingAuditSink;
use toolgate_mcp::config::MAX_CONFIG_BYTES;
use toolgate_mcp::config::parse_duration;
use toolgate_mcp::embedded;
use toolgate_mcp::render_config;
use toolgate_mcp::run_startup_hooks;
use tracing_subscriber::EnvFilter;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "toolgate", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand; defaults to `serve`.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the gateway.
    Serve(ServeCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Options for the `serve` command.
#[derive(Args, Debug, Default)]
struct ServeCommand {
    /// Config file path; overrides YAML_MCP_CONFIG.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Serve one of the embedded configurations instead of a file.
    #[arg(long = "embedded-config", value_name = "NAME")]
    embedded_config: Option<String>,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Render, parse, and validate the configuration, then exit.
    Validate {
        /// Config file path; overrides YAML_MCP_CONFIG.
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },
}

// ============================================================================
// SECTION: Environment Settings
// ============================================================================

/// Settings consumed from the process environment at startup.
#[derive(Debug, Clone)]
struct EnvSettings {
    /// Path to the configuration document.
    config_path: PathBuf,
    /// Log level label (debug/info/warn/error).
    log_level: String,
    /// Message language for localized denials.
    lang: Lang,
    /// Graceful shutdown budget.
    shutdown_timeout: Duration,
}

impl EnvSettings {
    /// Loads settings from the environment, applying documented defaults.
    fn load() -> Result<Self, String> {
        let config_path = std::env::var("YAML_MCP_CONFIG")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map_or_else(|| PathBuf::from("config.yaml"), PathBuf::from);
        let log_level = std::env::var("YAML_MCP_LOG_LEVEL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| "info".to_string());
        let lang = Lang::parse(&std::env::var("YAML_MCP_LANG").unwrap_or_default());
        let shutdown_timeout = match std::env::var("YAML_MCP_SHUTDOWN_TIMEOUT") {
            Ok(raw) if !raw.trim().is_empty() => parse_duration(&raw)
                .map_err(|err| format!("YAML_MCP_SHUTDOWN_TIMEOUT: {err}"))?,
            _ => Duration::from_secs(10),
        };
        Ok(Self {
            config_path,
            log_level,
            lang,
            shutdown_timeout,
        })
    }
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let settings = match EnvSettings::load() {
        Ok(settings) => settings,
        Err(message) => {
            eprintln!("config error: {message}");
            return ExitCode::FAILURE;
        }
    };
    init_logging(&settings.log_level);

    match cli.command {
        None => serve(settings, ServeCommand::default()).await,
        Some(Commands::Serve(command)) => serve(settings, command).await,
        Some(Commands::Config {
            command: ConfigCommand::Validate {
                config,
            },
        }) => validate(settings, config),
    }
}

/// Initializes the tracing subscriber from the configured level.
fn init_logging(level: &str) {
    let level = match level.trim().to_ascii_lowercase().as_str() {
        "debug" => "debug",
        "warn" | "warning" => "warn",
        "error" => "error",
        _ => "info",
    };
    let filter = EnvFilter::new(level);
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Runs the gateway until shutdown.
async fn serve(settings: EnvSettings, command: ServeCommand) -> ExitCode {
    let config = match load_config(&settings, command.config, command.embedded_config.as_deref()) {
        Ok(config) => config,
        Err(message) => {
            tracing::error!(error = %message, "startup failed");
            return ExitCode::FAILURE;
        }
    };

    let shutdown_timeout = match config.shutdown_timeout() {
        Ok(Some(timeout)) => timeout,
        Ok(None) => settings.shutdown_timeout,
        Err(err) => {
            tracing::error!(error = %err, "startup failed");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());

    let root_ctx = InvocationContext::new(shutdown.clone());
    if let Err(err) = run_startup_hooks(&root_ctx, &config.server.startup_hooks).await {
        tracing::error!(error = %err, "startup hooks failed");
        return ExitCode::FAILURE;
    }

    let registry =
        match ToolRegistry::from_config(&config, settings.lang, Arc::new(TracingAuditSink)) {
            Ok(registry) => Arc::new(registry),
            Err(err) => {
                tracing::error!(error = %err, "build server failed");
                return ExitCode::FAILURE;
            }
        };

    let server = McpServer::new(config, registry, shutdown, shutdown_timeout);
    match server.serve().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "runtime error");
            ExitCode::FAILURE
        }
    }
}

/// Validates the configuration and reports the outcome.
fn validate(settings: EnvSettings, config_path: Option<PathBuf>) -> ExitCode {
    match load_config(&settings, config_path, None) {
        Ok(_) => {
            println!("config valid");
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("config invalid: {message}");
            ExitCode::FAILURE
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads, renders, and parses the configuration document.
fn load_config(
    settings: &EnvSettings,
    override_path: Option<PathBuf>,
    embedded_name: Option<&str>,
) -> Result<GatewayConfig, String> {
    let raw = match embedded_name {
        Some(name) => embedded::load(name)
            .map(str::to_string)
            .ok_or_else(|| format!("unknown embedded config: {name}"))?,
        None => {
            let path = override_path.as_ref().unwrap_or(&settings.config_path);
            let bytes =
                std::fs::read(path).map_err(|err| format!("read {}: {err}", path.display()))?;
            if bytes.len() > MAX_CONFIG_BYTES {
                return Err(format!("config file {} exceeds size limit", path.display()));
            }
            String::from_utf8(bytes)
                .map_err(|_| format!("config file {} must be utf-8", path.display()))?
        }
    };
    let rendered = render_config(&raw).map_err(|err| err.to_string())?;
    GatewayConfig::from_yaml(&rendered).map_err(|err| err.to_string())
}

/// Cancels the shutdown token on SIGINT/SIGTERM/SIGQUIT/SIGHUP.
fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        use tokio::signal::unix::SignalKind;
        use tokio::signal::unix::signal;

        let mut interrupt = match signal(SignalKind::interrupt()) {
            Ok(stream) => stream,
            Err(err) => {
                tracing::error!(error = %err, "signal handler setup failed");
                return;
            }
        };
        let mut terminate = match signal(SignalKind::terminate()) {
            Ok(stream) => stream,
            Err(err) => {
                tracing::error!(error = %err, "signal handler setup failed");
                return;
            }
        };
        let mut quit = match signal(SignalKind::quit()) {
            Ok(stream) => stream,
            Err(err) => {
                tracing::error!(error = %err, "signal handler setup failed");
                return;
            }
        };
        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(stream) => stream,
            Err(err) => {
                tracing::error!(error = %err, "signal handler setup failed");
                return;
            }
        };

        let name = tokio::select! {
            _ = interrupt.recv() => "SIGINT",
            _ = terminate.recv() => "SIGTERM",
            _ = quit.recv() => "SIGQUIT",
            _ = hangup.recv() => "SIGHUP",
        };
        tracing::warn!(signal = name, "shutdown requested");
        shutdown.cancel();
    });
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        reason = "Test-only assertions use unwrap/expect for clarity."
    )]

    use std::io::Write;
    use std::time::Duration;

    use super::EnvSettings;
    use super::load_config;

    fn settings() -> EnvSettings {
        EnvSettings {
            config_path: "config.yaml".into(),
            log_level: "info".to_string(),
            lang: toolgate_core::messages::Lang::En,
            shutdown_timeout: Duration::from_secs(10),
        }
    }

    #[test]
    fn embedded_configs_load_by_name() {
        let config = load_config(&settings(), None, Some("echo.yaml")).expect("embedded config");
        assert_eq!(config.server.name, "toolgate-echo");
    }

    #[test]
    fn unknown_embedded_names_fail() {
        let err = load_config(&settings(), None, Some("nope.yaml")).expect_err("unknown name");
        assert!(err.contains("unknown embedded config"));
    }

    #[test]
    fn files_are_read_rendered_and_validated() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            "server:\n  name: demo\n  version: \"1.0\"\n  http:\n    host: 127.0.0.1\n"
        )
        .expect("write config");
        let config =
            load_config(&settings(), Some(file.path().to_path_buf()), None).expect("config");
        assert_eq!(config.server.name, "demo");
    }

    #[test]
    fn missing_files_fail() {
        let err = load_config(&settings(), Some("/nonexistent/toolgate.yaml".into()), None)
            .expect_err("missing file");
        assert!(err.contains("read"));
    }
}
