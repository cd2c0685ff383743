//! [`Wire`]: an ordered shard sequence plus its own variable scope (§4.G).

use crate::context::{Context, FlowState};
use crate::error::WarmupError;
use crate::event::{EventDispatcher, WireEventKind};
use crate::mesh::Mesh;
use crate::shard::Shard;
use crate::variable::{Cell, ExternalCell, EXPOSED};
use indexmap::IndexMap;
use loom_core::{Type, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Instant;

/// Lifecycle state a wire walks through once scheduled (§4.G).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireState {
    Prepared,
    Iterating,
    IterationEnded,
    Ended,
    Failed,
}

pub struct Wire {
    pub name: String,
    shards: Mutex<Vec<Box<dyn Shard>>>,
    pub(crate) variables: Mutex<IndexMap<String, Cell>>,
    external_variables: Mutex<IndexMap<String, ExternalCell>>,
    pub input_type: Mutex<Option<Type>>,
    pub output_type: Mutex<Option<Type>>,
    pub looped: bool,
    pub unsafe_: bool,
    pub pure: bool,
    pub stack_size: usize,
    pub ignore_input_type_check: bool,
    pub flow_stopping: Mutex<bool>,
    state: Mutex<WireState>,
    current_input: Mutex<Value>,
    previous_output: Mutex<Value>,
    finished_output: Mutex<Value>,
    finished_error: Mutex<Option<String>>,
    mesh: Mutex<Option<Weak<Mesh>>>,
    pub dispatcher: EventDispatcher<WireEventKind>,
    warmed_up: AtomicBool,
    cleaned_up: AtomicBool,
    next_deadline: Mutex<Instant>,
}

impl Wire {
    pub fn new(name: impl Into<String>) -> Self {
        Wire {
            name: name.into(),
            shards: Mutex::new(Vec::new()),
            variables: Mutex::new(IndexMap::new()),
            external_variables: Mutex::new(IndexMap::new()),
            input_type: Mutex::new(None),
            output_type: Mutex::new(None),
            looped: false,
            unsafe_: false,
            pure: false,
            stack_size: crate::config::DEFAULT_STACK_SIZE,
            ignore_input_type_check: false,
            flow_stopping: Mutex::new(false),
            state: Mutex::new(WireState::Prepared),
            current_input: Mutex::new(Value::None),
            previous_output: Mutex::new(Value::None),
            finished_output: Mutex::new(Value::None),
            finished_error: Mutex::new(None),
            mesh: Mutex::new(None),
            dispatcher: EventDispatcher::new(),
            warmed_up: AtomicBool::new(false),
            cleaned_up: AtomicBool::new(false),
            next_deadline: Mutex::new(Instant::now()),
        }
    }

    pub fn set_looped(&mut self, v: bool) -> &mut Self {
        self.looped = v;
        self
    }
    pub fn set_unsafe(&mut self, v: bool) -> &mut Self {
        self.unsafe_ = v;
        self
    }
    pub fn set_pure(&mut self, v: bool) -> &mut Self {
        self.pure = v;
        self
    }
    pub fn set_stack_size(&mut self, v: usize) -> &mut Self {
        self.stack_size = v;
        self
    }

    pub fn add_shard(&mut self, shard: Box<dyn Shard>) -> &mut Self {
        self.shards.lock().expect("shards mutex poisoned").push(shard);
        self
    }

    pub fn remove_shard(&mut self, index: usize) -> Option<Box<dyn Shard>> {
        let mut shards = self.shards.lock().expect("shards mutex poisoned");
        if index < shards.len() {
            Some(shards.remove(index))
        } else {
            None
        }
    }

    pub fn shard_count(&self) -> usize {
        self.shards.lock().expect("shards mutex poisoned").len()
    }

    pub fn bind_to_mesh(&self, mesh: &Arc<Mesh>) {
        *self.mesh.lock().expect("mesh mutex poisoned") = Some(Arc::downgrade(mesh));
    }

    pub fn mesh(&self) -> Option<Arc<Mesh>> {
        self.mesh.lock().expect("mesh mutex poisoned").as_ref().and_then(Weak::upgrade)
    }

    pub fn state(&self) -> WireState {
        *self.state.lock().expect("state mutex poisoned")
    }

    pub fn finished_output(&self) -> Value {
        self.finished_output.lock().expect("finished_output mutex poisoned").clone()
    }

    pub fn finished_error(&self) -> Option<String> {
        self.finished_error.lock().expect("finished_error mutex poisoned").clone()
    }

    pub fn previous_output(&self) -> Value {
        self.previous_output.lock().expect("previous_output mutex poisoned").clone()
    }

    pub fn is_warmed_up(&self) -> bool {
        self.warmed_up.load(Ordering::Acquire)
    }

    pub fn set_next_deadline(&self, deadline: Instant) {
        *self.next_deadline.lock().expect("deadline mutex poisoned") = deadline;
    }

    pub fn next_deadline(&self) -> Instant {
        *self.next_deadline.lock().expect("deadline mutex poisoned")
    }

    pub fn mark_flow_stopping(&self) {
        *self.flow_stopping.lock().expect("flow_stopping mutex poisoned") = true;
    }

    pub fn is_flow_stopping(&self) -> bool {
        *self.flow_stopping.lock().expect("flow_stopping mutex poisoned")
    }

    /// Pushes `self`, runs every shard's `warmup` in order, pops on either
    /// path. A failure cancels the flow and is propagated to the caller
    /// (`run`), which marks the wire `Failed` without ever reaching
    /// `iterate` (§4.G).
    fn warmup(self: &Arc<Self>, ctx: &mut Context) -> Result<(), WarmupError> {
        if self.warmed_up.load(Ordering::Acquire) {
            return Ok(());
        }
        let mut shards = self.shards.lock().expect("shards mutex poisoned");
        for shard in shards.iter_mut() {
            if let Err(e) = shard.warmup(ctx) {
                ctx.cancel_flow(e.message.clone());
                return Err(e);
            }
        }
        drop(shards);
        self.warmed_up.store(true, Ordering::Release);
        Ok(())
    }

    /// Runs one pass over the shard sequence starting from `wire_input`,
    /// threading each shard's output into the next and reacting to whatever
    /// `FlowState` the shard left in `ctx` (§4.G, §4.H).
    fn iterate(self: &Arc<Self>, ctx: &mut Context, wire_input: Value) -> (Value, FlowState) {
        ctx.wire_input = wire_input.clone();
        let mut input = wire_input.clone();
        let mut shards = self.shards.lock().expect("shards mutex poisoned");
        let mut index = 0;
        while index < shards.len() {
            let shard = &mut shards[index];
            match shard.activate(ctx, &input) {
                Ok(output) => match ctx.flow_state {
                    FlowState::Continue => {
                        input = output;
                        index += 1;
                    }
                    FlowState::Rebase => {
                        input = wire_input.clone();
                        ctx.reset_flow();
                        index += 1;
                    }
                    FlowState::Return | FlowState::Stop | FlowState::Restart => {
                        return (output, ctx.flow_state);
                    }
                    FlowState::Error => {
                        tracing::error!(shard = shard.name(), line = shard.line(), column = shard.column(), "activation error");
                        return (output, FlowState::Error);
                    }
                },
                Err(e) => {
                    tracing::error!(shard = %e.shard, line = e.line, column = e.column, "{}", e.message);
                    ctx.cancel_flow(e.message.clone());
                    return (input, FlowState::Error);
                }
            }
        }
        (input, FlowState::Continue)
    }

    /// Drives the full lifecycle for one scheduling of this wire: warmup,
    /// then iterate until a terminal outcome, then cleanup. Runs on the
    /// coroutine the mesh spawned for this wire; every `suspend` call inside
    /// `iterate`/shard activation parks that coroutine and hands control back
    /// to the mesh driver (§4.H).
    pub fn run(self: &Arc<Self>, ctx: &mut Context, wire_input: Value) {
        ctx.push_wire(Arc::clone(self));
        *self.current_input.lock().expect("current_input mutex poisoned") = wire_input.clone();

        if let Err(e) = self.warmup(ctx) {
            *self.finished_error.lock().expect("finished_error mutex poisoned") = Some(e.to_string());
            *self.state.lock().expect("state mutex poisoned") = WireState::Failed;
            self.cleanup(ctx, true);
            ctx.pop_wire();
            ctx.notify_finished();
            return;
        }

        loop {
            ctx.reset_flow();
            *self.state.lock().expect("state mutex poisoned") = WireState::Iterating;
            let input = self.current_input.lock().expect("current_input mutex poisoned").clone();
            let (output, flow) = self.iterate(ctx, input);
            *self.previous_output.lock().expect("previous_output mutex poisoned") = output.clone();
            *self.state.lock().expect("state mutex poisoned") = WireState::IterationEnded;

            match flow {
                FlowState::Stop => {
                    *self.finished_output.lock().expect("finished_output mutex poisoned") = output;
                    *self.state.lock().expect("state mutex poisoned") = WireState::Ended;
                    break;
                }
                FlowState::Error => {
                    *self.finished_error.lock().expect("finished_error mutex poisoned") = ctx.error_message.clone();
                    *self.state.lock().expect("state mutex poisoned") = WireState::Failed;
                    break;
                }
                FlowState::Restart => {
                    *self.current_input.lock().expect("current_input mutex poisoned") = ctx.flow_storage.clone();
                }
                FlowState::Continue | FlowState::Return | FlowState::Rebase => {
                    if !self.looped {
                        *self.finished_output.lock().expect("finished_output mutex poisoned") = output;
                        *self.state.lock().expect("state mutex poisoned") = WireState::Ended;
                        break;
                    }
                    *self.current_input.lock().expect("current_input mutex poisoned") = wire_input.clone();
                }
            }

            // Looped, non-unsafe wires yield once per iteration even absent an
            // internal suspension, so a busy loop cannot starve its sibling
            // wires on the same mesh (§4.H cooperative fairness).
            if self.looped && !self.unsafe_ {
                if ctx.suspend(0.0) == FlowState::Error {
                    *self.finished_error.lock().expect("finished_error mutex poisoned") = ctx.error_message.clone();
                    *self.state.lock().expect("state mutex poisoned") = WireState::Failed;
                    break;
                }
            }
        }

        self.cleanup(ctx, true);
        ctx.pop_wire();
        ctx.notify_finished();
    }

    /// Idempotent teardown: fires `OnCleanup`, cleans shards in reverse
    /// order, logs (but does not destroy) dangling variables, and clears the
    /// local scope. `force` skips the "other users remain" check a shared
    /// wire would otherwise honor.
    pub fn cleanup(self: &Arc<Self>, ctx: &mut Context, force: bool) {
        if self.cleaned_up.swap(true, Ordering::AcqRel) {
            return;
        }
        if !force && Arc::strong_count(self) > 1 {
            self.cleaned_up.store(false, Ordering::Release);
            return;
        }

        ctx.begin_cleanup();
        self.dispatcher.fire(&WireEventKind::OnCleanup);

        let mut shards = self.shards.lock().expect("shards mutex poisoned");
        for shard in shards.iter_mut().rev() {
            shard.cleanup();
        }
        drop(shards);

        let vars = self.variables.lock().expect("variables mutex poisoned");
        for (name, cell) in vars.iter() {
            if cell.refcount > 0 {
                tracing::warn!(wire = %self.name, variable = %name, refcount = cell.refcount, "dangling variable at wire cleanup");
            }
        }
        drop(vars);
        self.variables.lock().expect("variables mutex poisoned").clear();
        *self.mesh.lock().expect("mesh mutex poisoned") = None;
        self.dispatcher.fire(&WireEventKind::OnStop);
        ctx.end_cleanup();
    }

    /// Re-arms the wire for another scheduling after a terminal state.
    pub fn reset(&self) {
        self.warmed_up.store(false, Ordering::Release);
        self.cleaned_up.store(false, Ordering::Release);
        *self.state.lock().expect("state mutex poisoned") = WireState::Prepared;
        *self.finished_error.lock().expect("finished_error mutex poisoned") = None;
    }
}

/// A live handle to a variable cell, obtained from [`reference_variable`] and
/// released with [`release_variable`] (§4.E).
pub enum VariableRef {
    Local { wire: Arc<Wire>, name: String },
    External { cell: ExternalCell },
    Global { mesh: Weak<Mesh>, name: String },
    GlobalRef { cell: ExternalCell },
}

impl VariableRef {
    pub fn get(&self) -> Value {
        match self {
            VariableRef::Local { wire, name } => wire
                .variables
                .lock()
                .expect("variables mutex poisoned")
                .get(name)
                .map(|c| c.value.clone())
                .unwrap_or(Value::None),
            VariableRef::External { cell } => cell.get(),
            VariableRef::Global { mesh, name } => mesh
                .upgrade()
                .and_then(|m| m.get_global_variable(name))
                .unwrap_or(Value::None),
            VariableRef::GlobalRef { cell } => cell.get(),
        }
    }

    pub fn set(&self, value: Value) {
        match self {
            VariableRef::Local { wire, name } => {
                let mut vars = wire.variables.lock().expect("variables mutex poisoned");
                let exposed = if let Some(cell) = vars.get_mut(name) {
                    cell.value = value;
                    cell.is_exposed()
                } else {
                    false
                };
                drop(vars);
                if exposed {
                    wire.dispatcher.fire(&WireEventKind::OnExposedVarSet { name: name.clone() });
                }
            }
            VariableRef::External { cell } => cell.set(value),
            VariableRef::Global { mesh, name } => {
                if let Some(mesh) = mesh.upgrade() {
                    mesh.set_global_variable(name, value);
                }
            }
            VariableRef::GlobalRef { cell } => cell.set(value),
        }
    }

    /// Marks the underlying local cell EXPOSED, so future `set` calls fire
    /// `OnExposedVarSet`. A no-op for external/global handles, which already
    /// live outside this wire's private scope.
    pub fn mark_exposed(&self) {
        if let VariableRef::Local { wire, name } = self {
            if let Some(cell) = wire.variables.lock().expect("variables mutex poisoned").get_mut(name) {
                cell.set_exposed();
            }
        }
    }
}

/// `referenceVariable(context, name)` (§4.E): walks the wire stack innermost
/// outward, checking each wire's local scope then its external scope; a pure
/// wire stops the outward walk right after its own check (so a pure wire
/// never resolves to an ancestor or the mesh). Past the stack, falls through
/// to the mesh's own variables and then its refs. On a total miss, creates a
/// fresh cell in the innermost wire.
pub fn reference_variable(ctx: &Context, mesh: Option<&Arc<Mesh>>, name: &str) -> VariableRef {
    for wire in ctx.wire_stack.iter().rev() {
        {
            let mut vars = wire.variables.lock().expect("variables mutex poisoned");
            if let Some(cell) = vars.get_mut(name) {
                cell.refcount += 1;
                cell.flags |= crate::variable::REF_COUNTED;
                return VariableRef::Local { wire: Arc::clone(wire), name: name.to_string() };
            }
        }
        {
            let ext = wire.external_variables.lock().expect("external_variables mutex poisoned");
            if let Some(cell) = ext.get(name) {
                return VariableRef::External { cell: cell.clone() };
            }
        }
        if wire.pure {
            return create_local(wire, name);
        }
    }

    if let Some(mesh) = mesh {
        if let Some(handle) = mesh.try_reference_global_variable(name) {
            return handle;
        }
        if let Some(handle) = mesh.try_reference_global_ref(name) {
            return handle;
        }
    }

    let innermost = ctx.wire_stack.last().expect("reference_variable called with an empty wire stack");
    create_local(innermost, name)
}

fn create_local(wire: &Arc<Wire>, name: &str) -> VariableRef {
    let mut vars = wire.variables.lock().expect("variables mutex poisoned");
    let cell = vars.entry(name.to_string()).or_insert_with(Cell::new_uninitialized);
    cell.refcount += 1;
    cell.flags |= crate::variable::REF_COUNTED;
    VariableRef::Local { wire: Arc::clone(wire), name: name.to_string() }
}

/// Resolves `name` the way a variable-operator shard's `Global` parameter
/// asks for it: straight to the mesh's own table when `global` is set,
/// bypassing the wire-stack walk entirely, or through the ordinary
/// [`reference_variable`] scope chain otherwise.
pub fn reference_named(ctx: &Context, mesh: Option<&Arc<Mesh>>, name: &str, global: bool) -> VariableRef {
    if global {
        if let Some(mesh) = mesh {
            return mesh.reference_global(name);
        }
    }
    reference_variable(ctx, mesh, name)
}

/// `releaseVariable(handle)` (§4.E): decrements the refcount and, at zero,
/// drops the stored value. External and borrowed-global handles are owned
/// elsewhere and are a no-op here.
pub fn release_variable(handle: VariableRef) {
    match handle {
        VariableRef::Local { wire, name } => {
            let mut vars = wire.variables.lock().expect("variables mutex poisoned");
            if let Some(cell) = vars.get_mut(&name) {
                cell.refcount = cell.refcount.saturating_sub(1);
                if cell.refcount == 0 {
                    cell.value = Value::None;
                }
            }
        }
        VariableRef::Global { mesh, name } => {
            if let Some(mesh) = mesh.upgrade() {
                mesh.release_global_variable(&name);
            }
        }
        VariableRef::External { .. } | VariableRef::GlobalRef { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ActivationError;
    use crate::mesh::Mesh;

    struct Echo;
    impl Shard for Echo {
        fn name(&self) -> &str {
            "Echo"
        }
        fn input_types(&self) -> Vec<Type> {
            vec![]
        }
        fn output_types(&self) -> Vec<Type> {
            vec![]
        }
        fn activate(&mut self, ctx: &mut Context, input: &Value) -> Result<Value, ActivationError> {
            let _ = ctx;
            Ok(input.clone())
        }
    }

    #[test]
    fn non_looped_wire_runs_once_and_ends() {
        let mut wire = Wire::new("main");
        wire.add_shard(Box::new(Echo));
        let wire = Arc::new(wire);
        let mut ctx = Context::new();
        wire.run(&mut ctx, Value::Int(7));
        assert_eq!(wire.state(), WireState::Ended);
        assert_eq!(wire.finished_output(), Value::Int(7));
    }

    #[test]
    fn reference_variable_creates_then_reuses_local_cell() {
        let wire = Arc::new(Wire::new("main"));
        let mut ctx = Context::new();
        ctx.push_wire(Arc::clone(&wire));

        let first = reference_variable(&ctx, None, "x");
        first.set(Value::Int(1));
        assert_eq!(wire.variables.lock().unwrap().get("x").unwrap().refcount, 1);

        let second = reference_variable(&ctx, None, "x");
        assert_eq!(wire.variables.lock().unwrap().get("x").unwrap().refcount, 2);
        assert_eq!(second.get(), Value::Int(1));

        release_variable(first);
        assert_eq!(wire.variables.lock().unwrap().get("x").unwrap().refcount, 1);
        release_variable(second);
        assert_eq!(wire.variables.lock().unwrap().get("x").unwrap().refcount, 0);
    }

    #[test]
    fn pure_wire_never_escapes_to_an_outer_scope() {
        let outer = Arc::new(Wire::new("outer"));
        outer.variables.lock().unwrap().insert("shared".into(), Cell { value: Value::Int(99), refcount: 0, flags: 0 });

        let mut pure_inner = Wire::new("inner");
        pure_inner.set_pure(true);
        let pure_inner = Arc::new(pure_inner);

        let mut ctx = Context::new();
        ctx.push_wire(Arc::clone(&outer));
        ctx.push_wire(Arc::clone(&pure_inner));

        let handle = reference_variable(&ctx, None, "shared");
        assert_eq!(handle.get(), Value::None);
        match handle {
            VariableRef::Local { ref wire, .. } => assert!(Arc::ptr_eq(wire, &pure_inner)),
            _ => panic!("expected a freshly created local cell in the pure wire"),
        }

        let _ = Mesh::new("unused");
    }
}
