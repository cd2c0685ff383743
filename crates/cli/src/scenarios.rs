//! Hardcoded wire/mesh demonstrations for the `loom run` subcommand, one per
//! named scenario. Each builds the wire(s) in Rust rather than from a parsed
//! program — there is no front-end syntax for wires in this crate, only the
//! in-process composition API `loom-runtime` exposes.

use loom_core::{Type, Value};
use loom_runtime::composer::compose_wire;
use loom_runtime::context::Context;
use loom_runtime::mesh::Mesh;
use loom_runtime::shard::Shard;
use loom_runtime::shards::*;
use loom_runtime::wire::Wire;
use std::sync::Arc;

pub struct ScenarioReport {
    pub name: &'static str,
    pub narrative: String,
    pub output: Value,
}

fn compose_then_build(mut shards: Vec<Box<dyn Shard>>, input_type: Type, inherited: indexmap::IndexMap<String, Type>) -> Result<Wire, String> {
    let result = compose_wire(&mut shards, input_type, &inherited);
    if result.failed {
        let messages: Vec<String> = result.diagnostics.iter().map(|d| format!("{d}")).collect();
        return Err(messages.join("; "));
    }
    let mut wire = Wire::new("anonymous");
    for shard in shards {
        wire.add_shard(shard);
    }
    *wire.input_type.lock().expect("input_type mutex poisoned") = Some(result.wire_input_type);
    *wire.output_type.lock().expect("output_type mutex poisoned") = Some(result.output_type);
    wire.ignore_input_type_check = result.ignore_input_type_check;
    if result.flow_stopping {
        wire.mark_flow_stopping();
    }
    Ok(wire)
}

/// S1: `[Const 21, Math.Multiply 2]` with no input, expecting `Int(42)`.
pub fn s1_arithmetic_pipeline() -> ScenarioReport {
    let mut const_shard = Const::default();
    const_shard.set_param(0, Value::Int(21)).unwrap();
    let mut mul = MathMultiply::default();
    mul.set_param(0, Value::Int(2)).unwrap();

    let wire = compose_then_build(vec![Box::new(const_shard), Box::new(mul)], Type::none(), indexmap::IndexMap::new()).expect("s1 composes");
    let wire = Arc::new(wire);
    let mut ctx = Context::new();
    wire.run(&mut ctx, Value::None);

    ScenarioReport {
        name: "s1-arithmetic-pipeline",
        narrative: format!("state={:?}", wire.state()),
        output: wire.finished_output(),
    }
}

/// S2: `[Const "hi", Set x, Get x]`, expecting `String("hi")` with `x`
/// released (not leaked) once the wire tears down.
pub fn s2_variable_roundtrip() -> ScenarioReport {
    let mut const_shard = Const::default();
    const_shard.set_param(0, Value::String("hi".to_string())).unwrap();
    let mut set = Set::default();
    set.set_param(0, Value::String("x".to_string())).unwrap();
    let mut get = Get::default();
    get.set_param(0, Value::String("x".to_string())).unwrap();

    let wire = compose_then_build(vec![Box::new(const_shard), Box::new(set), Box::new(get)], Type::none(), indexmap::IndexMap::new()).expect("s2 composes");
    let wire = Arc::new(wire);
    let mut ctx = Context::new();
    wire.run(&mut ctx, Value::None);

    ScenarioReport {
        name: "s2-variable-roundtrip",
        narrative: format!("state={:?}", wire.state()),
        output: wire.finished_output(),
    }
}

/// S3: `[Const 1, Stop]`, expecting `Int(1)` with the flow-stopping flag set.
pub fn s3_flow_stop() -> ScenarioReport {
    let mut const_shard = Const::default();
    const_shard.set_param(0, Value::Int(1)).unwrap();
    let stop = Stop::default();

    let wire = compose_then_build(vec![Box::new(const_shard), Box::new(stop)], Type::none(), indexmap::IndexMap::new()).expect("s3 composes");
    let wire = Arc::new(wire);
    let mut ctx = Context::new();
    wire.run(&mut ctx, Value::None);

    ScenarioReport {
        name: "s3-flow-stop",
        narrative: format!("state={:?}, flow_stopping={}", wire.state(), wire.is_flow_stopping()),
        output: wire.finished_output(),
    }
}

/// S4: a counter held in the mesh's global scope, incremented by a
/// `Get`/`Math.Add`/`Set` chain and driven around by `When Restart` until it
/// reaches 3 — the `Restart` mechanism loops regardless of the wire's own
/// `looped` flag (§4.G), so a three-shot counter needs no scheduler yielding.
pub fn s4_restart_loop() -> ScenarioReport {
    let mut get = Get::default();
    get.set_param(0, Value::String("i".to_string())).unwrap();
    get.set_param(1, Value::Bool(true)).unwrap();
    let mut add = MathAdd::default();
    add.set_param(0, Value::Int(1)).unwrap();
    let mut set = Set::default();
    set.set_param(0, Value::String("i".to_string())).unwrap();
    set.set_param(1, Value::Bool(true)).unwrap();
    let mut less = IsLess::default();
    less.set_param(0, Value::Int(3)).unwrap();
    let mut when = When::default();
    when.set_param(0, Value::String("Restart".to_string())).unwrap();

    let mut inherited: indexmap::IndexMap<String, Type> = indexmap::IndexMap::new();
    inherited.insert("i".to_string(), Type::any());
    let wire =
        compose_then_build(vec![Box::new(get), Box::new(add), Box::new(set), Box::new(less), Box::new(when)], Type::int(), inherited).expect("s4 composes");

    let mesh = Mesh::new("s4");
    let counter = mesh.reference_global("i");
    counter.set(Value::Int(0));

    let wire = Arc::new(wire);
    wire.bind_to_mesh(&mesh);
    let mut ctx = Context::new();
    wire.run(&mut ctx, Value::Int(0));

    ScenarioReport { name: "s4-restart-loop", narrative: format!("state={:?}, final i={:?}", wire.state(), counter.get()), output: counter.get() }
}

/// S6: two wires on one mesh, trading through the global queue `q`. Wire A
/// pushes three increasing counter values; wire B drains them with `Take`
/// (front-first, so push order and pop order agree) into `seen`. Both wires
/// use the same `Get`/`Math.Add`/`Set`/`When Restart` shape as S4 to repeat a
/// fixed number of times without needing the wire's own `looped` flag.
pub fn s6_cross_wire_scheduling() -> ScenarioReport {
    const N: i64 = 3;

    let make_counted = |var: &str, body: Vec<Box<dyn Shard>>| -> Vec<Box<dyn Shard>> {
        let mut get = Get::default();
        get.set_param(0, Value::String(var.to_string())).unwrap();
        get.set_param(1, Value::Bool(true)).unwrap();
        let mut add = MathAdd::default();
        add.set_param(0, Value::Int(1)).unwrap();
        let mut set = Set::default();
        set.set_param(0, Value::String(var.to_string())).unwrap();
        set.set_param(1, Value::Bool(true)).unwrap();
        let mut prefix: Vec<Box<dyn Shard>> = vec![Box::new(get), Box::new(add), Box::new(set)];
        prefix.extend(body);
        let mut less = IsLess::default();
        less.set_param(0, Value::Int(N)).unwrap();
        let mut when = When::default();
        when.set_param(0, Value::String("Restart".to_string())).unwrap();
        prefix.push(Box::new(less));
        prefix.push(Box::new(when));
        prefix
    };

    let mut push_q = Push::default();
    push_q.set_param(0, Value::String("q".to_string())).unwrap();
    push_q.set_param(1, Value::Bool(true)).unwrap();
    let wire_a_shards = make_counted("a", vec![Box::new(push_q)]);

    let mut take_q = Take::default();
    take_q.set_param(0, Value::String("q".to_string())).unwrap();
    take_q.set_param(1, Value::Bool(true)).unwrap();
    let mut push_seen = Push::default();
    push_seen.set_param(0, Value::String("seen".to_string())).unwrap();
    push_seen.set_param(1, Value::Bool(true)).unwrap();
    let wire_b_shards = make_counted("b", vec![Box::new(take_q), Box::new(push_seen)]);

    let mut inherited_a: indexmap::IndexMap<String, Type> = indexmap::IndexMap::new();
    inherited_a.insert("a".to_string(), Type::any());
    let mut inherited_b: indexmap::IndexMap<String, Type> = indexmap::IndexMap::new();
    inherited_b.insert("b".to_string(), Type::any());
    inherited_b.insert("q".to_string(), Type::any());

    let wire_a = compose_then_build(wire_a_shards, Type::int(), inherited_a).expect("s6 wire A composes");
    let wire_b = compose_then_build(wire_b_shards, Type::int(), inherited_b).expect("s6 wire B composes");

    let mesh = Mesh::new("s6");
    mesh.reference_global("a").set(Value::Int(0));
    mesh.reference_global("b").set(Value::Int(0));
    mesh.reference_global("q").set(Value::Sequence(Vec::new()));
    mesh.reference_global("seen").set(Value::Sequence(Vec::new()));

    mesh.schedule(Arc::new(wire_a), Value::Int(0));
    mesh.schedule(Arc::new(wire_b), Value::Int(0));
    mesh.run_until_idle(10_000);

    let pushed = mesh.get_global_variable("q").unwrap_or(Value::None);
    let seen = mesh.get_global_variable("seen").unwrap_or(Value::None);

    ScenarioReport {
        name: "s6-cross-wire-scheduling",
        narrative: format!("active_wires={}, q(drained)={pushed:?}", mesh.active_wire_count()),
        output: seen,
    }
}

/// S5 does not run — it demonstrates a compose-time rejection. Returned as
/// the diagnostic text itself rather than a `Value`.
pub fn s5_type_mismatch() -> Result<(), String> {
    let mut const_shard = Const::default();
    const_shard.set_param(0, Value::String("x".to_string())).unwrap();
    let add = MathAdd::default();

    let mut shards: Vec<Box<dyn Shard>> = vec![Box::new(const_shard), Box::new(add)];
    let exposed: indexmap::IndexMap<String, Type> = indexmap::IndexMap::new();
    let result = compose_wire(&mut shards, Type::none(), &exposed);
    if result.failed {
        let messages: Vec<String> = result.diagnostics.iter().map(|d| format!("{d}")).collect();
        Err(messages.join("; "))
    } else {
        Ok(())
    }
}
