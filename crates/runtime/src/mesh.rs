//! [`Mesh`]: the scheduler that owns a set of concurrently-running wires and
//! the global variable scope they share (§4.I).

use crate::context::{Context, CoroutineLink, ResumeSignal, WireEvent};
use crate::variable::{Cell, ExternalCell};
use crate::wire::{VariableRef, Wire, WireState};
use indexmap::IndexMap;
use loom_core::Value;
use may::sync::mpmc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

struct ScheduledWire {
    wire: Arc<Wire>,
    resume_tx: mpmc::Sender<ResumeSignal>,
    event_rx: mpmc::Receiver<WireEvent>,
    finished: bool,
}

/// Owns the global (mesh-scoped) variable table plus every wire currently
/// scheduled on it. A `Mesh` drives its wires cooperatively: `tick` resumes
/// whichever scheduled wires have reached their deadline and blocks until
/// each reports back `Suspended` or `Finished` before moving to the next,
/// so wire bodies never interleave mid-iteration on one mesh.
pub struct Mesh {
    pub name: String,
    variables: Mutex<IndexMap<String, Cell>>,
    refs: Mutex<IndexMap<String, ExternalCell>>,
    wires: Mutex<Vec<ScheduledWire>>,
    terminated: AtomicBool,
}

impl Mesh {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Mesh {
            name: name.into(),
            variables: Mutex::new(IndexMap::new()),
            refs: Mutex::new(IndexMap::new()),
            wires: Mutex::new(Vec::new()),
            terminated: AtomicBool::new(false),
        })
    }

    /// Registers a borrowed cell in the mesh's `refs` table (`addRef` in
    /// §4.I) — visible to `referenceVariable` after a wire's own scope chain
    /// is exhausted, same as a wire's `external_variables`, but mesh-wide.
    pub fn add_ref(&self, name: impl Into<String>, cell: ExternalCell) {
        self.refs.lock().expect("refs mutex poisoned").insert(name.into(), cell);
    }

    pub fn get_global_variable(&self, name: &str) -> Option<Value> {
        self.variables.lock().expect("variables mutex poisoned").get(name).map(|c| c.value.clone())
    }

    pub fn set_global_variable(&self, name: &str, value: Value) {
        if let Some(cell) = self.variables.lock().expect("variables mutex poisoned").get_mut(name) {
            cell.value = value;
        }
    }

    /// The non-`Global` scope walk's last stop before falling back to
    /// `create_local` (§4.E step 3): a hit here means the name already lives
    /// in the mesh's own table, so bind to it in place rather than shadowing
    /// it with a fresh wire-local cell. Mirrors `reference_global` except it
    /// must not create the cell on a miss — a miss here means "keep walking",
    /// not "this name belongs to the mesh."
    pub(crate) fn try_reference_global_variable(self: &Arc<Self>, name: &str) -> Option<VariableRef> {
        let mut vars = self.variables.lock().expect("variables mutex poisoned");
        let cell = vars.get_mut(name)?;
        cell.refcount += 1;
        cell.flags |= crate::variable::REF_COUNTED;
        drop(vars);
        Some(VariableRef::Global { mesh: Arc::downgrade(self), name: name.to_string() })
    }

    /// `referenceGlobal(mesh, name)`: the explicit counterpart to
    /// `referenceVariable`'s scope walk, used when a shard is flagged
    /// `Global` and must bind to the mesh's own variable table regardless of
    /// what the wire stack holds under that name. Creates the cell on a miss,
    /// the same as a wire's local scope does.
    pub fn reference_global(self: &Arc<Self>, name: &str) -> VariableRef {
        let mut vars = self.variables.lock().expect("variables mutex poisoned");
        let cell = vars.entry(name.to_string()).or_insert_with(Cell::new_uninitialized);
        cell.refcount += 1;
        cell.flags |= crate::variable::REF_COUNTED;
        drop(vars);
        VariableRef::Global { mesh: Arc::downgrade(self), name: name.to_string() }
    }

    pub(crate) fn try_reference_global_ref(&self, name: &str) -> Option<VariableRef> {
        let refs = self.refs.lock().expect("refs mutex poisoned");
        refs.get(name).map(|cell| VariableRef::GlobalRef { cell: cell.clone() })
    }

    pub(crate) fn release_global_variable(&self, name: &str) {
        if let Some(cell) = self.variables.lock().expect("variables mutex poisoned").get_mut(name) {
            cell.refcount = cell.refcount.saturating_sub(1);
            if cell.refcount == 0 {
                cell.value = Value::None;
            }
        }
    }

    /// Spawns a stackful coroutine for `wire` and schedules it on this mesh.
    /// The coroutine runs `Wire::run` to completion on its own stack,
    /// reporting `Suspended`/`Finished` back through the rendezvous channel
    /// every time it parks.
    pub fn schedule(self: &Arc<Self>, wire: Arc<Wire>, input: Value) {
        wire.bind_to_mesh(self);
        let (event_tx, event_rx) = mpmc::channel::<WireEvent>();
        let (resume_tx, resume_rx) = mpmc::channel::<ResumeSignal>();

        let run_wire = Arc::clone(&wire);
        // May's stack size is a process-wide scheduler setting, not a
        // per-spawn parameter (see the teacher's own `parse_stack_size` /
        // `may::config().set_stack_size` pairing) — the largest wire on a
        // mesh sets the floor for every coroutine it schedules.
        may::config().set_stack_size(wire.stack_size);
        may::coroutine::spawn(move || {
            let mut ctx = Context::new();
            ctx.attach_coroutine(CoroutineLink { event_tx, resume_rx });
            run_wire.run(&mut ctx, input);
        });

        self.wires.lock().expect("wires mutex poisoned").push(ScheduledWire { wire, resume_tx, event_rx, finished: false });
    }

    /// One scheduling pass: resumes every non-finished wire whose deadline
    /// has elapsed and blocks until it reports back. Returns `true` while at
    /// least one wire remains unfinished.
    pub fn tick(&self) -> bool {
        let now = Instant::now();
        let mut wires = self.wires.lock().expect("wires mutex poisoned");
        for scheduled in wires.iter_mut() {
            if scheduled.finished {
                continue;
            }
            if scheduled.wire.next_deadline() > now {
                continue;
            }
            let signal = if self.terminated.load(Ordering::Acquire) { ResumeSignal::Terminate } else { ResumeSignal::Continue };
            if scheduled.resume_tx.send(signal).is_err() {
                scheduled.finished = true;
                continue;
            }
            match scheduled.event_rx.recv() {
                Ok(WireEvent::Suspended) => {}
                Ok(WireEvent::Finished) | Err(_) => scheduled.finished = true,
            }
        }
        wires.retain(|s| !s.finished || !matches!(s.wire.state(), WireState::Ended | WireState::Failed));
        !wires.is_empty()
    }

    /// Drives `tick` until every scheduled wire has reached a terminal state
    /// (or `max_ticks` is exhausted, as a runaway-loop backstop).
    pub fn run_until_idle(&self, max_ticks: usize) {
        for _ in 0..max_ticks {
            if !self.tick() {
                return;
            }
            may::coroutine::yield_now();
        }
        tracing::warn!(mesh = %self.name, max_ticks, "run_until_idle exhausted its tick budget");
    }

    /// Marks the mesh for teardown: subsequent ticks wake parked coroutines
    /// with `ResumeSignal::Terminate`, which `Context::suspend` turns into a
    /// cancelled flow so each wire's `run` loop unwinds through cleanup.
    pub fn terminate(&self) {
        self.terminated.store(true, Ordering::Release);
    }

    pub fn active_wire_count(&self) -> usize {
        self.wires.lock().expect("wires mutex poisoned").iter().filter(|s| !s.finished).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context as Ctx;
    use crate::error::ActivationError;
    use crate::shard::Shard;
    use loom_core::Type;

    struct Increment(i64);
    impl Shard for Increment {
        fn name(&self) -> &str {
            "Increment"
        }
        fn input_types(&self) -> Vec<Type> {
            vec![]
        }
        fn output_types(&self) -> Vec<Type> {
            vec![]
        }
        fn activate(&mut self, _ctx: &mut Ctx, input: &Value) -> Result<Value, ActivationError> {
            match input {
                Value::Int(n) => Ok(Value::Int(n + self.0)),
                other => Ok(other.clone()),
            }
        }
    }

    #[test]
    fn schedule_and_tick_runs_a_wire_to_completion() {
        let mesh = Mesh::new("main");
        let mut wire = Wire::new("adder");
        wire.add_shard(Box::new(Increment(5)));
        let wire = Arc::new(wire);
        mesh.schedule(Arc::clone(&wire), Value::Int(1));

        mesh.run_until_idle(1000);

        assert_eq!(wire.state(), WireState::Ended);
        assert_eq!(wire.finished_output(), Value::Int(6));
        assert_eq!(mesh.active_wire_count(), 0);
    }

    #[test]
    fn reference_global_creates_then_shares_across_handles() {
        let mesh = Mesh::new("main");
        let first = mesh.reference_global("q");
        first.set(Value::Int(1));
        let second = mesh.reference_global("q");
        assert_eq!(second.get(), Value::Int(1));
        second.set(Value::Int(2));
        assert_eq!(first.get(), Value::Int(2));
    }

    #[test]
    fn global_ref_resolves_through_reference_variable() {
        let mesh = Mesh::new("main");
        let cell = ExternalCell::new(Value::Int(42));
        mesh.add_ref("shared", cell.clone());

        let wire = Arc::new(Wire::new("reader"));
        wire.bind_to_mesh(&mesh);
        let mut ctx = Context::new();
        ctx.push_wire(Arc::clone(&wire));

        let handle = crate::wire::reference_variable(&ctx, Some(&mesh), "shared");
        assert_eq!(handle.get(), Value::Int(42));
        cell.set(Value::Int(7));
        assert_eq!(handle.get(), Value::Int(7));
    }
}
