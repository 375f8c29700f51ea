use std::sync::atomic::{AtomicBool, Ordering};

/// Keeps at most one pose-inference request in flight.
///
/// The frame loop asks `should_dispatch` once per frame; while a request is
/// pending every answer is `false`, so newer frames are skipped rather than
/// queued. `on_settled` must run on success and failure alike, otherwise a
/// failed request would block dispatch forever.
#[derive(Debug, Default)]
pub struct InferenceGate {
    in_flight: AtomicBool,
}

impl InferenceGate {
    pub fn new() -> Self {
        Self {
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn should_dispatch(&self) -> bool {
        !self.in_flight.load(Ordering::Acquire)
    }

    pub fn on_dispatched(&self) {
        self.in_flight.store(true, Ordering::Release);
    }

    pub fn on_settled(&self) {
        self.in_flight.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_blocks_until_settled() {
        let gate = InferenceGate::new();
        assert!(gate.should_dispatch());

        gate.on_dispatched();
        assert!(!gate.should_dispatch());
        assert!(!gate.should_dispatch());

        gate.on_settled();
        assert!(gate.should_dispatch());
    }

    #[test]
    fn failed_settlement_reopens_gate() {
        let gate = InferenceGate::new();
        gate.on_dispatched();

        // The caller settles on the rejection path too.
        gate.on_settled();
        assert!(gate.should_dispatch());

        gate.on_dispatched();
        gate.on_settled();
        assert!(gate.should_dispatch());
    }
}
