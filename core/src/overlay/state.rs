use qtube_protocol::ParsedAnswer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponsePanel {
    Empty,
    Loading { message: Option<String> },
    Answered(ParsedAnswer),
    Errored(String),
}

/// Everything the overlay shows for one question. The question is fixed for
/// the lifetime of the state; a new question means a new state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayState {
    session: u64,
    question: String,
    pub(crate) transcript: String,
    pub(crate) panel: ResponsePanel,
    pub(crate) analyze_enabled: bool,
    pub(crate) transcript_visible: bool,
}

impl OverlayState {
    pub(crate) fn new(session: u64, question: String) -> Self {
        Self {
            session,
            question,
            transcript: String::new(),
            panel: ResponsePanel::Empty,
            analyze_enabled: true,
            transcript_visible: true,
        }
    }

    pub fn session(&self) -> u64 {
        self.session
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    pub fn panel(&self) -> &ResponsePanel {
        &self.panel
    }

    pub fn analyze_enabled(&self) -> bool {
        self.analyze_enabled
    }

    pub fn transcript_visible(&self) -> bool {
        self.transcript_visible
    }
}
