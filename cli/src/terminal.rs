//! Terminal renditions of the popup and the in-page overlay.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use qtube_core::coordinator::PopupSurface;
use qtube_core::coordinator::StatusKind;
use qtube_core::overlay::OverlayEvents;
use qtube_core::overlay::OverlayState;
use qtube_core::overlay::OverlaySurface;
use qtube_core::overlay::OverlaySurfaceFactory;
use qtube_core::overlay::ResponsePanel;
use qtube_core::protocol::TabId;
use tokio::sync::mpsc;

use crate::render::Palette;
use crate::render::format_answer;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Status lines from the popup go to stderr.
pub struct TerminalPopup {
    palette: Palette,
}

impl TerminalPopup {
    pub fn new(palette: Palette) -> Self {
        Self { palette }
    }
}

impl PopupSurface for TerminalPopup {
    fn show_status(&self, kind: StatusKind, message: &str) {
        match kind {
            StatusKind::Info => eprintln!("{}", self.palette.dim(message)),
            StatusKind::Error => eprintln!("{}", self.palette.error(message)),
        }
    }

    fn set_busy(&self, _busy: bool) {}

    fn close(&self) {
        tracing::debug!("popup closed");
    }
}

/// What the overlay currently shows, reported whenever the response panel
/// changes.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayUpdate {
    Shown { question: String },
    Panel(ResponsePanel),
    Removed,
    Alert(String),
}

struct TerminalOverlay {
    palette: Palette,
    last_panel: Mutex<Option<ResponsePanel>>,
    updates: mpsc::UnboundedSender<OverlayUpdate>,
}

impl TerminalOverlay {
    fn print_panel(&self, panel: &ResponsePanel) {
        match panel {
            ResponsePanel::Empty => {}
            ResponsePanel::Loading { message } => {
                println!("{}", self.palette.dim(message.as_deref().unwrap_or("Loading...")));
            }
            ResponsePanel::Answered(parsed) => print!("{}", format_answer(parsed, &self.palette)),
            ResponsePanel::Errored(message) => println!("{}", self.palette.error(message)),
        }
    }
}

impl OverlaySurface for TerminalOverlay {
    fn render(&self, state: &OverlayState) {
        let mut last = lock(&self.last_panel);
        if last.is_none() {
            println!("Question: {}", state.question());
            let _ = self.updates.send(OverlayUpdate::Shown {
                question: state.question().to_string(),
            });
        }
        if last.as_ref() == Some(state.panel()) {
            return;
        }
        *last = Some(state.panel().clone());
        drop(last);
        self.print_panel(state.panel());
        let _ = self.updates.send(OverlayUpdate::Panel(state.panel().clone()));
    }

    fn remove(&self) {
        *lock(&self.last_panel) = None;
        let _ = self.updates.send(OverlayUpdate::Removed);
    }

    fn alert(&self, message: &str) {
        eprintln!("{}", self.palette.error(message));
        let _ = self.updates.send(OverlayUpdate::Alert(message.to_string()));
    }
}

/// Creates one terminal overlay per content script and keeps the event
/// sender of the latest one so typed input can reach it.
pub struct TerminalSurfaces {
    palette: Palette,
    events: Mutex<Option<(TabId, OverlayEvents)>>,
    updates: mpsc::UnboundedSender<OverlayUpdate>,
}

impl TerminalSurfaces {
    pub fn new(palette: Palette) -> (Arc<Self>, mpsc::UnboundedReceiver<OverlayUpdate>) {
        let (updates, rx) = mpsc::unbounded_channel();
        let surfaces = Arc::new(Self {
            palette,
            events: Mutex::new(None),
            updates,
        });
        (surfaces, rx)
    }

    pub fn events(&self, tab: TabId) -> Option<OverlayEvents> {
        lock(&self.events)
            .as_ref()
            .filter(|(owner, _)| *owner == tab)
            .map(|(_, events)| events.clone())
    }
}

impl OverlaySurfaceFactory for TerminalSurfaces {
    fn create(&self, tab: TabId, events: OverlayEvents) -> Arc<dyn OverlaySurface> {
        *lock(&self.events) = Some((tab, events));
        Arc::new(TerminalOverlay {
            palette: self.palette,
            last_panel: Mutex::new(None),
            updates: self.updates.clone(),
        })
    }
}
