use std::collections::VecDeque;

/// Holds seek requests until the player becomes ready.
#[derive(Debug, Default)]
pub struct ReadinessGate {
    ready: bool,
    pending: VecDeque<f64>,
}

impl ReadinessGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Returns the time to execute now, or queues it and returns `None`.
    pub fn submit(&mut self, time: f64) -> Option<f64> {
        if self.ready {
            Some(time)
        } else {
            self.pending.push_back(time);
            None
        }
    }

    /// Records the latest readiness evaluation. The gate latches: once ready
    /// it stays ready, and the queued times are handed back in submission
    /// order on that single transition.
    pub fn observe(&mut self, ready: bool) -> Vec<f64> {
        if self.ready || !ready {
            return Vec::new();
        }
        self.ready = true;
        self.pending.drain(..).collect()
    }
}
