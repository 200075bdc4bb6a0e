use std::path::PathBuf;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use qtube_core::overlay::AnalysisRoute;

#[derive(Parser, Debug)]
#[command(version, about = "Ask questions about a YouTube video and jump to the answer.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Model used to answer questions.
    #[arg(long, short = 'm', global = true)]
    pub model: Option<String>,

    /// Path to a config.toml; defaults to $QTUBE_HOME/config.toml.
    #[arg(long = "config", short = 'c', value_name = "FILE", global = true)]
    pub config_file: Option<PathBuf>,

    /// Specifies color settings for use in the output.
    #[arg(long = "color", value_enum, default_value_t = Color::Auto, global = true)]
    pub color: Color,

    /// Log debug output to stderr. `RUST_LOG` takes precedence.
    #[arg(long, short = 'v', default_value_t = false, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Answer one question from a transcript file without a browser.
    Ask(AskArgs),

    /// Open a video in a running Chrome, answer a question about it, and
    /// seek the player to cited moments.
    Watch(WatchArgs),
}

#[derive(Debug, Args)]
pub struct TranscriptArgs {
    /// The question to ask about the video.
    #[arg(long, short = 'q')]
    pub question: String,

    /// Transcript text to ground the answer in. Use `-` to read stdin.
    #[arg(long, short = 't', value_name = "FILE")]
    pub transcript: PathBuf,
}

#[derive(Debug, Args)]
pub struct AskArgs {
    #[command(flatten)]
    pub transcript: TranscriptArgs,

    /// Video title to include in the prompt.
    #[arg(long)]
    pub title: Option<String>,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// YouTube watch page to open.
    #[arg(long, short = 'u')]
    pub url: String,

    #[command(flatten)]
    pub transcript: TranscriptArgs,

    /// Chrome remote debugging port.
    #[arg(long = "connect-port", value_name = "PORT", conflicts_with = "connect_ws")]
    pub connect_port: Option<u16>,

    /// Chrome browser WebSocket URL.
    #[arg(long = "connect-ws", value_name = "URL")]
    pub connect_ws: Option<String>,

    /// Who calls the model when analyze is pressed.
    #[arg(long = "route", value_enum)]
    pub route: Option<RouteArg>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum Color {
    Always,
    Never,
    #[default]
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum RouteArg {
    Direct,
    Coordinator,
}

impl From<RouteArg> for AnalysisRoute {
    fn from(route: RouteArg) -> Self {
        match route {
            RouteArg::Direct => AnalysisRoute::Direct,
            RouteArg::Coordinator => AnalysisRoute::Coordinator,
        }
    }
}
