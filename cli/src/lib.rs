//! `qtube`: answers questions about a YouTube video from its transcript and
//! seeks the player to the moments the answer cites.

mod ask;
mod cli;
mod render;
mod terminal;
mod watch;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use anyhow::anyhow;
pub use cli::Cli;
pub use cli::Command;
use qtube_core::config::CONFIG_TOML_FILE;
use qtube_core::config::Config;
use qtube_core::config::ConfigOverrides;
use qtube_core::gemini::AnswerEngine;
use qtube_core::gemini::GeminiClient;
use supports_color::Stream;
use tokio::io::AsyncReadExt;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::render::Palette;

const VERBOSE_FILTER: &str =
    "warn,qtube_cli=debug,qtube_core=debug,qtube_browser=debug,qtube_gemini=debug";

pub async fn run_main(cli: Cli) -> anyhow::Result<()> {
    let Cli {
        command,
        model,
        config_file,
        color,
        verbose,
    } = cli;

    let (stdout_with_ansi, stderr_with_ansi) = match color {
        cli::Color::Always => (true, true),
        cli::Color::Never => (false, false),
        cli::Color::Auto => (
            supports_color::on_cached(Stream::Stdout).is_some(),
            supports_color::on_cached(Stream::Stderr).is_some(),
        ),
    };

    let default_level = if verbose { VERBOSE_FILTER } else { "error" };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(stderr_with_ansi)
        .with_writer(std::io::stderr)
        .try_init();

    let mut overrides = ConfigOverrides {
        model,
        ..ConfigOverrides::default()
    };
    if let Command::Watch(args) = &command {
        overrides.connect_port = args.connect_port;
        overrides.connect_ws = args.connect_ws.clone();
        overrides.analysis_route = args.route.map(Into::into);
    }
    let config = Config::load(config_file.as_deref(), overrides)
        .context("failed to load configuration")?;
    debug!(model = %config.gemini.model, home = %config.qtube_home.display(), "configuration loaded");

    let palette = Palette::new(stdout_with_ansi);
    match command {
        Command::Ask(args) => ask::run_ask(&config, args, palette).await,
        Command::Watch(args) => watch::run_watch(config, args, palette).await,
    }
}

fn answer_engine(config: &Config) -> anyhow::Result<Arc<dyn AnswerEngine>> {
    let settings = config.gemini.settings().ok_or_else(|| {
        anyhow!(
            "no Gemini API key configured; set {} or gemini.api_key in {}",
            config.gemini.api_key_env,
            config.qtube_home.join(CONFIG_TOML_FILE).display()
        )
    })?;
    let client = GeminiClient::new(settings).context("failed to build Gemini client")?;
    Ok(Arc::new(client))
}

/// Reads the transcript from `path`, or from stdin when `path` is `-`.
async fn read_transcript(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        tokio::io::stdin()
            .read_to_string(&mut text)
            .await
            .context("failed to read transcript from stdin")?;
        return Ok(text);
    }
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read transcript {}", path.display()))
}
