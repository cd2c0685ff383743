//! Per-activation [`Context`] and flow-control state (§4.H).

use crate::wire::Wire;
use loom_core::Value;
use may::sync::mpmc;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// The sum type a shard may set to redirect iteration (§4.H, GLOSSARY).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Continue,
    Return,
    Restart,
    Stop,
    Rebase,
    Error,
}

/// Delivered from a wire's coroutine to the `Mesh` driver at every suspension
/// point. `Suspended` means the coroutine is parked awaiting `resume_tx`;
/// `Finished` means the coroutine's `run` loop has returned and will not
/// suspend again.
pub enum WireEvent {
    Suspended,
    Finished,
}

/// What the mesh driver hands back across `resume_rx` when it wakes a
/// parked coroutine: either "carry on" or "the mesh is tearing down."
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeSignal {
    Continue,
    Terminate,
}

/// The rendezvous channels linking a scheduled wire's coroutine to the mesh
/// that drives it. `suspend` blocks on `resume_rx`; the mesh blocks on
/// `event_rx` (held by the `Mesh`, not here) between ticks.
pub struct CoroutineLink {
    pub event_tx: mpmc::Sender<WireEvent>,
    pub resume_rx: mpmc::Receiver<ResumeSignal>,
}

/// Per-activation state: the live coroutine link, the wire call-chain
/// (innermost last), flow control, cancellation, and the value slot a
/// Stop/Restart stashes for the run loop to pick up.
pub struct Context {
    pub wire_stack: Vec<Arc<Wire>>,
    pub flow_state: FlowState,
    pub error_message: Option<String>,
    pub flow_storage: Value,
    /// The value the innermost wire's current `iterate` pass started from —
    /// what the `Input` shard restores regardless of what has run since.
    pub wire_input: Value,
    cancelled: bool,
    in_cleanup: bool,
    link: Option<CoroutineLink>,
}

impl Context {
    pub fn new() -> Self {
        Context {
            wire_stack: Vec::new(),
            flow_state: FlowState::Continue,
            error_message: None,
            flow_storage: Value::None,
            wire_input: Value::None,
            cancelled: false,
            in_cleanup: false,
            link: None,
        }
    }

    pub fn attach_coroutine(&mut self, link: CoroutineLink) {
        self.link = Some(link);
    }

    pub fn has_coroutine(&self) -> bool {
        self.link.is_some()
    }

    pub fn push_wire(&mut self, wire: Arc<Wire>) {
        self.wire_stack.push(wire);
    }

    pub fn pop_wire(&mut self) -> Option<Arc<Wire>> {
        self.wire_stack.pop()
    }

    /// The innermost wire currently running (top of the call chain).
    pub fn current_wire(&self) -> Option<&Arc<Wire>> {
        self.wire_stack.last()
    }

    /// The outermost (scheduled) wire — the one whose deadline the mesh
    /// checks on tick.
    pub fn main_wire(&self) -> Option<&Arc<Wire>> {
        self.wire_stack.first()
    }

    pub fn begin_cleanup(&mut self) {
        self.in_cleanup = true;
    }

    pub fn end_cleanup(&mut self) {
        self.in_cleanup = false;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// `cancelFlow(message)` — sets Error + message (§4.H).
    pub fn cancel_flow(&mut self, message: impl Into<String>) {
        self.cancelled = true;
        self.flow_state = FlowState::Error;
        self.error_message = Some(message.into());
    }

    /// `stopFlow(value)` — sets Stop + stashes `value` in flow storage.
    pub fn stop_flow(&mut self, value: Value) {
        self.flow_state = FlowState::Stop;
        self.flow_storage = value;
    }

    /// `restartFlow(value)` — sets Restart + stashes `value`, the analogous
    /// counterpart to `stopFlow` the iterate loop reads to rebase the next
    /// run's input (§4.G `iterate`).
    pub fn restart_flow(&mut self, value: Value) {
        self.flow_state = FlowState::Restart;
        self.flow_storage = value;
    }

    /// Resets to `Continue` at the top of each `iterate` call (§4.G).
    pub fn reset_flow(&mut self) {
        self.flow_state = FlowState::Continue;
    }

    /// `suspend(context, seconds)` (§4.H). Valid only when not cancelled, not
    /// mid-cleanup, and a coroutine is attached; records the wire's next
    /// resume deadline, yields to the mesh, and on resume returns whatever
    /// flow-control state was set while parked (e.g. a mesh-wide `terminate`
    /// calling `cancelFlow` before waking this coroutine).
    pub fn suspend(&mut self, seconds: f64) -> FlowState {
        assert!(!self.cancelled, "suspend on an already-cancelled context");
        assert!(!self.in_cleanup, "suspend during cleanup");
        let dur = if seconds <= 0.0 { Duration::ZERO } else { Duration::from_secs_f64(seconds) };
        if let Some(wire) = self.main_wire() {
            wire.set_next_deadline(Instant::now() + dur);
        }
        let link = self.link.as_ref().expect("suspend called without an attached coroutine");
        link.event_tx.send(WireEvent::Suspended).expect("mesh driver disconnected");
        match link.resume_rx.recv().expect("mesh driver disconnected") {
            ResumeSignal::Continue => {}
            ResumeSignal::Terminate => self.cancel_flow("mesh terminated"),
        }
        self.flow_state
    }

    /// Notifies the mesh this coroutine's run loop is finished and will not
    /// suspend again; called once, just before the coroutine function returns.
    pub fn notify_finished(&self) {
        if let Some(link) = &self.link {
            let _ = link.event_tx.send(WireEvent::Finished);
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_flow_sets_error_and_cancelled() {
        let mut ctx = Context::new();
        ctx.cancel_flow("boom");
        assert_eq!(ctx.flow_state, FlowState::Error);
        assert_eq!(ctx.error_message.as_deref(), Some("boom"));
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn stop_flow_stashes_value() {
        let mut ctx = Context::new();
        ctx.stop_flow(Value::Int(42));
        assert_eq!(ctx.flow_state, FlowState::Stop);
        assert_eq!(ctx.flow_storage, Value::Int(42));
    }

    #[test]
    fn reset_flow_returns_to_continue() {
        let mut ctx = Context::new();
        ctx.stop_flow(Value::Int(1));
        ctx.reset_flow();
        assert_eq!(ctx.flow_state, FlowState::Continue);
    }
}
