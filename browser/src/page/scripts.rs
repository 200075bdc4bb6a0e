use qtube_core::player_bridge::PlayerError;
use qtube_core::player_bridge::PlayerProbe;
use serde::Deserialize;
use serde_json::Value;

pub(super) const PLAYER_PROBE_JS: &str = include_str!("../../js/player_probe.js");
pub(super) const VIDEO_TITLE_JS: &str = include_str!("../../js/video_title.js");
const PLAYER_COMMAND_JS: &str = include_str!("../../js/player_command.js");

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum PlayerCommand {
    Seek(f64),
    Play,
}

impl PlayerCommand {
    fn action(self) -> &'static str {
        match self {
            PlayerCommand::Seek(_) => "seek",
            PlayerCommand::Play => "play",
        }
    }

    fn seconds(self) -> f64 {
        match self {
            PlayerCommand::Seek(seconds) => seconds,
            PlayerCommand::Play => 0.0,
        }
    }
}

/// Invocation of the player command function for `command`.
pub(super) fn player_command_script(command: PlayerCommand) -> String {
    let seconds = command.seconds();
    let seconds = if seconds.is_finite() { seconds } else { 0.0 };
    format!(
        "({})({}, {})",
        PLAYER_COMMAND_JS.trim(),
        Value::from(command.action()),
        Value::from(seconds)
    )
}

/// Scripts hand back JSON text so nested objects survive the by-value
/// transfer intact.
fn decode_json(value: Option<&Value>) -> Option<Value> {
    match value? {
        Value::String(text) => serde_json::from_str(text).ok(),
        other => Some(other.clone()),
    }
}

pub(super) fn parse_probe(value: Option<&Value>) -> Option<PlayerProbe> {
    let decoded = decode_json(value)?;
    if decoded.is_null() {
        return None;
    }
    serde_json::from_value(decoded).ok()
}

pub(super) fn parse_title(value: Option<&Value>) -> Option<String> {
    match decode_json(value)? {
        Value::String(title) if !title.trim().is_empty() => Some(title.trim().to_string()),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct CommandOutcome {
    ok: bool,
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    error: Option<String>,
}

pub(super) fn parse_command_outcome(value: Option<&Value>) -> Result<(), PlayerError> {
    let Some(decoded) = decode_json(value) else {
        return Err(PlayerError::Call("player script returned nothing".to_string()));
    };
    let outcome: CommandOutcome = serde_json::from_value(decoded)
        .map_err(|e| PlayerError::Call(format!("unexpected player script result: {e}")))?;
    match outcome {
        CommandOutcome { ok: true, .. } => Ok(()),
        CommandOutcome { missing: true, .. } => Err(PlayerError::Unavailable),
        CommandOutcome { error, .. } => Err(PlayerError::Call(
            error.unwrap_or_else(|| "unknown player error".to_string()),
        )),
    }
}
