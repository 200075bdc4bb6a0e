use anyhow::Context;
use qtube_core::config::Config;
use qtube_core::coordinator::validate_question;
use qtube_core::gemini::MANUAL_TRANSCRIPT_DESCRIPTION;
use qtube_core::gemini::compose_grounding_prompt;
use qtube_core::overlay::EMPTY_TRANSCRIPT_ALERT;
use qtube_core::protocol::VideoData;
use tracing::info;

use crate::answer_engine;
use crate::cli::AskArgs;
use crate::read_transcript;
use crate::render::Palette;
use crate::render::format_answer;

/// One question against a transcript, answered straight from the model.
pub(crate) async fn run_ask(config: &Config, args: AskArgs, palette: Palette) -> anyhow::Result<()> {
    let AskArgs { transcript, title } = args;
    let settings = &config.coordinator;
    let question = validate_question(
        &transcript.question,
        &settings.placeholder,
        settings.max_question_chars,
    )?;
    let text = read_transcript(&transcript.transcript).await?;
    if text.trim().is_empty() {
        anyhow::bail!(EMPTY_TRANSCRIPT_ALERT);
    }

    let engine = answer_engine(config)?;
    let video = VideoData {
        video_title: title.unwrap_or_default(),
        video_description: MANUAL_TRANSCRIPT_DESCRIPTION.to_string(),
        video_transcript: text,
    };
    let prompt = compose_grounding_prompt(&video, &question);
    info!(chars = prompt.len(), "asking model");
    let parsed = engine.ask(&prompt).await.context("failed to get an answer")?;
    print!("{}", format_answer(&parsed, &palette));
    Ok(())
}
