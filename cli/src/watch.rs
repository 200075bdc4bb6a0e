use std::sync::Arc;

use anyhow::Context;
use anyhow::bail;
use qtube_browser::BrowserConfig;
use qtube_browser::BrowserManager;
use qtube_browser::WatchPage;
use qtube_core::PageContext;
use qtube_core::PageMetadata;
use qtube_core::TabsApi;
use qtube_core::config::Config;
use qtube_core::coordinator::PopupSurface;
use qtube_core::coordinator::SessionCoordinator;
use qtube_core::gemini::AnswerEngine;
use qtube_core::host::ExtensionHost;
use qtube_core::overlay::EMPTY_TRANSCRIPT_ALERT;
use qtube_core::overlay::OverlayEvent;
use qtube_core::overlay::OverlayEvents;
use qtube_core::overlay::OverlayLauncher;
use qtube_core::overlay::OverlaySurfaceFactory;
use qtube_core::overlay::ResponsePanel;
use qtube_core::player_bridge::NativePlayer;
use qtube_core::protocol::ParsedAnswer;
use tokio::io::AsyncBufReadExt;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing::info;

use crate::answer_engine;
use crate::cli::WatchArgs;
use crate::read_transcript;
use crate::render::Palette;
use crate::terminal::OverlayUpdate;
use crate::terminal::TerminalPopup;
use crate::terminal::TerminalSurfaces;

/// A line typed while the answer is on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SeekInput {
    Quit,
    /// Zero-based index into the answer's citations.
    Citation(usize),
    Invalid,
}

fn parse_seek_input(line: &str, citations: usize) -> SeekInput {
    let line = line.trim();
    if line.eq_ignore_ascii_case("q") || line.eq_ignore_ascii_case("quit") {
        return SeekInput::Quit;
    }
    match line.parse::<usize>() {
        Ok(number) if (1..=citations).contains(&number) => SeekInput::Citation(number - 1),
        _ => SeekInput::Invalid,
    }
}

pub(crate) async fn run_watch(config: Config, args: WatchArgs, palette: Palette) -> anyhow::Result<()> {
    let transcript = read_transcript(&args.transcript.transcript).await?;
    if transcript.trim().is_empty() {
        bail!(EMPTY_TRANSCRIPT_ALERT);
    }
    let engine = answer_engine(&config)?;

    let manager = BrowserManager::new(BrowserConfig::from(&config.browser));
    let page = manager
        .open_watch_page(&args.url)
        .await
        .with_context(|| format!("failed to open {} in Chrome", args.url))?;

    let result = run_session(&config, &args, transcript, engine, page, palette).await;
    manager.stop().await;
    result
}

async fn run_session(
    config: &Config,
    args: &WatchArgs,
    transcript: String,
    engine: Arc<dyn AnswerEngine>,
    page: Arc<WatchPage>,
    palette: Palette,
) -> anyhow::Result<()> {
    let (surfaces, mut updates) = TerminalSurfaces::new(palette);
    let launcher = OverlayLauncher::new(
        Arc::clone(&surfaces) as Arc<dyn OverlaySurfaceFactory>,
        Arc::clone(&engine),
        config.overlay.clone(),
    );
    let (host, runtime) = ExtensionHost::new(Arc::new(launcher));
    let coordinator = SessionCoordinator::new(
        Arc::clone(&host) as Arc<dyn TabsApi>,
        Arc::new(TerminalPopup::new(palette)) as Arc<dyn PopupSurface>,
        engine,
        config.coordinator.clone(),
    );
    let listener = coordinator.spawn_runtime_listener(runtime);

    let context = PageContext::new(
        Arc::clone(&page) as Arc<dyn NativePlayer>,
        page as Arc<dyn PageMetadata>,
        config.player.clone(),
    );
    let tab = host.open_tab(args.url.clone(), context).await;

    let result = async {
        coordinator
            .submit_question(&args.transcript.question)
            .await
            .context("could not open the overlay")?;
        let events = surfaces
            .events(tab)
            .context("overlay was not created for the video tab")?;
        events.emit(OverlayEvent::TranscriptInput(transcript));
        events.emit(OverlayEvent::AnalyzeClicked);

        let parsed = wait_for_answer(&mut updates).await?;
        if !parsed.timestamps.is_empty() {
            seek_on_input(&events, &parsed).await?;
        }
        events.emit(OverlayEvent::CloseClicked);
        Ok::<_, anyhow::Error>(())
    }
    .await;

    host.close_tab(tab).await;
    listener.abort();
    result
}

async fn wait_for_answer(
    updates: &mut mpsc::UnboundedReceiver<OverlayUpdate>,
) -> anyhow::Result<ParsedAnswer> {
    while let Some(update) = updates.recv().await {
        match update {
            OverlayUpdate::Panel(ResponsePanel::Answered(parsed)) => return Ok(parsed),
            OverlayUpdate::Panel(ResponsePanel::Errored(message)) | OverlayUpdate::Alert(message) => {
                bail!(message)
            }
            OverlayUpdate::Removed => bail!("overlay closed before an answer arrived"),
            OverlayUpdate::Shown { .. } | OverlayUpdate::Panel(_) => {}
        }
    }
    bail!("overlay stopped before an answer arrived")
}

/// Seeks to citations by number until the user quits or stdin closes.
async fn seek_on_input(events: &OverlayEvents, parsed: &ParsedAnswer) -> anyhow::Result<()> {
    let count = parsed.timestamps.len();
    eprintln!("Enter a timestamp number (1-{count}) to seek, or q to quit.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        match parse_seek_input(&line, count) {
            SeekInput::Quit => break,
            SeekInput::Citation(index) => {
                let Some(citation) = parsed.timestamps.get(index) else {
                    continue;
                };
                info!(label = %citation.label, "seeking");
                if !events.emit(OverlayEvent::TimestampClicked {
                    time: f64::from(citation.time),
                }) {
                    bail!("the video page went away");
                }
            }
            SeekInput::Invalid => eprintln!("Enter a number between 1 and {count}, or q."),
        }
    }
    Ok(())
}
