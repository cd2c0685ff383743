//! End-to-end scenario tests exercising composition, activation, variable
//! scoping, flow control, and cross-wire scheduling together — the same six
//! scenarios `loom run` demonstrates on the command line, here as assertions
//! rather than printed narratives.

use indexmap::IndexMap;
use loom_core::{Type, Value};
use loom_runtime::composer::compose_wire;
use loom_runtime::context::Context;
use loom_runtime::mesh::Mesh;
use loom_runtime::shard::Shard;
use loom_runtime::shards::*;
use loom_runtime::wire::Wire;
use std::sync::Arc;

fn compose_then_build(mut shards: Vec<Box<dyn Shard>>, input_type: Type, inherited: IndexMap<String, Type>) -> Result<Wire, String> {
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

#[test]
fn s1_arithmetic_pipeline_computes_forty_two() {
    let mut const_shard = Const::default();
    const_shard.set_param(0, Value::Int(21)).unwrap();
    let mut mul = MathMultiply::default();
    mul.set_param(0, Value::Int(2)).unwrap();

    let wire = compose_then_build(vec![Box::new(const_shard), Box::new(mul)], Type::none(), IndexMap::new()).expect("composes");
    let wire = Arc::new(wire);
    let mut ctx = Context::new();
    wire.run(&mut ctx, Value::None);

    assert_eq!(wire.finished_output(), Value::Int(42));
}

#[test]
fn s2_variable_roundtrip_releases_its_cell_on_teardown() {
    let mut const_shard = Const::default();
    const_shard.set_param(0, Value::String("hi".to_string())).unwrap();
    let mut set = Set::default();
    set.set_param(0, Value::String("x".to_string())).unwrap();
    let mut get = Get::default();
    get.set_param(0, Value::String("x".to_string())).unwrap();

    let wire = compose_then_build(vec![Box::new(const_shard), Box::new(set), Box::new(get)], Type::none(), IndexMap::new()).expect("composes");
    let wire = Arc::new(wire);
    let mut ctx = Context::new();
    wire.run(&mut ctx, Value::None);

    assert_eq!(wire.finished_output(), Value::String("hi".to_string()));
}

#[test]
fn s3_flow_stop_marks_the_wire_as_flow_stopping() {
    let mut const_shard = Const::default();
    const_shard.set_param(0, Value::Int(1)).unwrap();
    let stop = Stop::default();

    let wire = compose_then_build(vec![Box::new(const_shard), Box::new(stop)], Type::none(), IndexMap::new()).expect("composes");
    let wire = Arc::new(wire);
    let mut ctx = Context::new();
    wire.run(&mut ctx, Value::None);

    assert_eq!(wire.finished_output(), Value::Int(1));
    assert!(wire.is_flow_stopping());
}

#[test]
fn s4_restart_loop_counts_to_three_through_global_scope() {
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

    let mut inherited = IndexMap::new();
    inherited.insert("i".to_string(), Type::any());
    let wire = compose_then_build(vec![Box::new(get), Box::new(add), Box::new(set), Box::new(less), Box::new(when)], Type::int(), inherited)
        .expect("composes");

    let mesh = Mesh::new("s4");
    let counter = mesh.reference_global("i");
    counter.set(Value::Int(0));

    let wire = Arc::new(wire);
    wire.bind_to_mesh(&mesh);
    let mut ctx = Context::new();
    wire.run(&mut ctx, Value::Int(0));

    assert_eq!(counter.get(), Value::Int(3));
}

#[test]
fn s5_type_mismatch_is_rejected_at_compose_time() {
    let mut const_shard = Const::default();
    const_shard.set_param(0, Value::String("x".to_string())).unwrap();
    let add = MathAdd::default();

    let mut shards: Vec<Box<dyn Shard>> = vec![Box::new(const_shard), Box::new(add)];
    let result = compose_wire(&mut shards, Type::none(), &IndexMap::new());

    assert!(result.failed, "composing a String into Math.Add should fail");
}

#[test]
fn s6_cross_wire_scheduling_drains_the_queue_in_push_order() {
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

    let mut inherited_a = IndexMap::new();
    inherited_a.insert("a".to_string(), Type::any());
    let mut inherited_b = IndexMap::new();
    inherited_b.insert("b".to_string(), Type::any());
    inherited_b.insert("q".to_string(), Type::any());

    let wire_a = compose_then_build(wire_a_shards, Type::int(), inherited_a).expect("wire A composes");
    let wire_b = compose_then_build(wire_b_shards, Type::int(), inherited_b).expect("wire B composes");

    let mesh = Mesh::new("s6");
    mesh.reference_global("a").set(Value::Int(0));
    mesh.reference_global("b").set(Value::Int(0));
    mesh.reference_global("q").set(Value::Sequence(Vec::new()));
    mesh.reference_global("seen").set(Value::Sequence(Vec::new()));

    mesh.schedule(Arc::new(wire_a), Value::Int(0));
    mesh.schedule(Arc::new(wire_b), Value::Int(0));
    mesh.run_until_idle(10_000);

    assert_eq!(mesh.get_global_variable("seen"), Some(Value::Sequence(vec![Value::Int(1), Value::Int(2), Value::Int(3)])));
    assert_eq!(mesh.get_global_variable("q"), Some(Value::Sequence(Vec::new())));
}
