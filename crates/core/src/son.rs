//! SON (Shard Object Notation): a stable, human-readable textual encoding
//! for [`Value`] and [`Type`] snapshots (§3 "Serialization (ambient...)").
//!
//! This is a one-way encoder: the surface syntax and its reader are out of
//! scope (§1), so there is no `from_son`. SON exists for diagnostics, the
//! CLI's `--dump` flag, and golden tests that want a stable textual
//! fingerprint of a single Value/Type — never for persisting *live* runtime
//! state, which remains a non-goal.

use crate::type_::{Kind, Type};
use crate::value::Value;

#[derive(Clone, Copy)]
pub struct SonConfig {
    pub pretty: bool,
    pub indent: usize,
}

impl Default for SonConfig {
    fn default() -> Self {
        SonConfig { pretty: false, indent: 2 }
    }
}

impl SonConfig {
    pub fn compact() -> Self {
        Self::default()
    }
    pub fn pretty() -> Self {
        SonConfig { pretty: true, indent: 2 }
    }
}

pub fn value_to_son(value: &Value, config: &SonConfig) -> String {
    let mut buf = String::new();
    format_value(value, config, 0, &mut buf);
    buf
}

fn push_indent(buf: &mut String, depth: usize, indent: usize) {
    for _ in 0..(depth * indent) {
        buf.push(' ');
    }
}

fn format_string(s: &str, buf: &mut String) {
    buf.push('"');
    for c in s.chars() {
        match c {
            '"' => buf.push_str("\\\""),
            '\\' => buf.push_str("\\\\"),
            '\n' => buf.push_str("\\n"),
            '\r' => buf.push_str("\\r"),
            '\t' => buf.push_str("\\t"),
            c if c.is_control() => buf.push_str(&format!("\\u{:04x}", c as u32)),
            c => buf.push(c),
        }
    }
    buf.push('"');
}

fn format_value(value: &Value, config: &SonConfig, depth: usize, buf: &mut String) {
    match value {
        Value::None => buf.push_str("none"),
        Value::Any => buf.push_str("any"),
        Value::Bool(b) => buf.push_str(if *b { "true" } else { "false" }),
        Value::Int(n) => buf.push_str(&n.to_string()),
        Value::IntVec(v) => format_vec_of(v.iter().map(|n| n.to_string()), "int", buf),
        Value::Float(f) => format_float(*f, buf),
        Value::FloatVec(v) => format_vec_of(v.iter().map(|f| float_str(*f)), "float", buf),
        Value::Color(c) => buf.push_str(&format!("color #{:02x}{:02x}{:02x}{:02x}", c.r, c.g, c.b, c.a)),
        Value::Bytes(b) => buf.push_str(&format!("bytes {}b", b.len())),
        Value::String(s) => format_string(s, buf),
        Value::Path(p) => buf.push_str(&format!("path {p:?}")),
        Value::ContextVar(name) => {
            buf.push('$');
            buf.push_str(name);
        }
        Value::Enum(e) => buf.push_str(&format!("enum({},{}) {}", e.vendor, e.type_id, e.value)),
        Value::Object(o) => buf.push_str(&format!("object({},{})", o.vendor, o.type_id)),
        Value::Image(img) => buf.push_str(&format!("image {}x{}x{}", img.width, img.height, img.channels)),
        Value::Audio(a) => buf.push_str(&format!("audio {}hz x{}ch {}samp", a.rate, a.channels, a.nsamples())),
        Value::Sequence(items) => format_seq(items, config, depth, buf),
        Value::Table(map) => format_table(map, config, depth, buf),
        Value::Set(items) => format_set(items, config, depth, buf),
        Value::WireRef(_) => buf.push_str("<wire>"),
        Value::ShardRef(_) => buf.push_str("<shard>"),
        Value::TypeRef(t) => {
            buf.push_str("type ");
            buf.push_str(&type_to_son(t));
        }
        Value::Array(arr) => format_vec_of(arr.elements.iter().map(|v| value_to_son(v, config)), "array", buf),
    }
}

fn float_str(f: f64) -> String {
    let s = f.to_string();
    if !s.contains('.') && f.is_finite() { format!("{s}.0") } else { s }
}

fn format_float(f: f64, buf: &mut String) {
    buf.push_str(&float_str(f));
}

fn format_vec_of(items: impl Iterator<Item = String>, kind: &str, buf: &mut String) {
    buf.push_str(kind);
    buf.push_str("-vec(");
    let mut first = true;
    for item in items {
        if !first {
            buf.push(' ');
        }
        first = false;
        buf.push_str(&item);
    }
    buf.push(')');
}

fn format_seq(items: &[Value], config: &SonConfig, depth: usize, buf: &mut String) {
    buf.push_str("seq-of");
    if items.is_empty() {
        return;
    }
    for item in items {
        if config.pretty {
            buf.push('\n');
            push_indent(buf, depth + 1, config.indent);
        } else {
            buf.push(' ');
        }
        format_value(item, config, depth + 1, buf);
        buf.push_str(" sv");
    }
}

fn format_table(map: &indexmap::IndexMap<Value, Value>, config: &SonConfig, depth: usize, buf: &mut String) {
    buf.push_str("table-of");
    if map.is_empty() {
        return;
    }
    // Insertion order, not sorted: SON mirrors the Table equality/hash rule
    // that iteration order is significant (§3, §4.A).
    for (k, v) in map {
        if config.pretty {
            buf.push('\n');
            push_indent(buf, depth + 1, config.indent);
        } else {
            buf.push(' ');
        }
        format_value(k, config, depth + 1, buf);
        buf.push(' ');
        format_value(v, config, depth + 1, buf);
        buf.push_str(" tv");
    }
}

fn format_set(items: &indexmap::IndexSet<Value>, config: &SonConfig, depth: usize, buf: &mut String) {
    buf.push_str("set-of");
    if items.is_empty() {
        return;
    }
    for item in items {
        if config.pretty {
            buf.push('\n');
            push_indent(buf, depth + 1, config.indent);
        } else {
            buf.push(' ');
        }
        format_value(item, config, depth + 1, buf);
        buf.push_str(" sv");
    }
}

/// Textual encoding for a [`Type`] descriptor, used alongside `value_to_son`
/// in diagnostics (e.g. a `ComposeError` can echo the receiver Type it
/// rejected).
pub fn type_to_son(ty: &Type) -> String {
    if ty.recursive_self {
        return "<recursive>".to_string();
    }
    match ty.kind {
        Kind::Object => format!("object({},{})", ty.vendor, ty.type_id),
        Kind::Enum => format!("enum({},{})", ty.vendor, ty.type_id),
        Kind::Sequence => {
            let elems: Vec<String> = ty.element_types.iter().map(type_to_son).collect();
            if ty.fixed_size > 0 {
                format!("seq[{}]<{}>", ty.fixed_size, elems.join("|"))
            } else {
                format!("seq<{}>", elems.join("|"))
            }
        }
        Kind::Set => {
            let elems: Vec<String> = ty.element_types.iter().map(type_to_son).collect();
            format!("set<{}>", elems.join("|"))
        }
        Kind::Table => {
            let pairs: Vec<String> = ty
                .table_keys
                .iter()
                .zip(ty.table_types.iter())
                .map(|(k, t)| format!("{}:{}", value_to_son(k, &SonConfig::compact()), type_to_son(t)))
                .collect();
            format!("table<{}>", pairs.join(","))
        }
        other => format!("{other:?}").to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Color, EnumValue};
    use indexmap::{IndexMap, IndexSet};

    #[test]
    fn scalars_round_trip_to_stable_text() {
        assert_eq!(value_to_son(&Value::Int(42), &SonConfig::compact()), "42");
        assert_eq!(value_to_son(&Value::Bool(true), &SonConfig::compact()), "true");
        assert_eq!(value_to_son(&Value::Float(1.0), &SonConfig::compact()), "1.0");
        assert_eq!(value_to_son(&Value::String("hi".into()), &SonConfig::compact()), "\"hi\"");
    }

    #[test]
    fn string_escaping_matches_json_style_escapes() {
        let v = Value::String("a\"b\nc".into());
        assert_eq!(value_to_son(&v, &SonConfig::compact()), "\"a\\\"b\\nc\"");
    }

    #[test]
    fn sequence_uses_seq_of_sv_suffix_notation() {
        let v = Value::Sequence(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(value_to_son(&v, &SonConfig::compact()), "seq-of 1 sv 2 sv");
    }

    #[test]
    fn table_preserves_insertion_order_not_sorted() {
        let mut m = IndexMap::new();
        m.insert(Value::String("b".into()), Value::Int(2));
        m.insert(Value::String("a".into()), Value::Int(1));
        let son = value_to_son(&Value::Table(m), &SonConfig::compact());
        assert_eq!(son, "table-of \"b\" 2 tv \"a\" 1 tv");
    }

    #[test]
    fn set_and_color_and_enum_render() {
        let mut s = IndexSet::new();
        s.insert(Value::Int(1));
        assert_eq!(value_to_son(&Value::Set(s), &SonConfig::compact()), "set-of 1 sv");
        assert_eq!(value_to_son(&Value::Color(Color { r: 255, g: 0, b: 0, a: 255 }), &SonConfig::compact()), "color #ff0000ff");
        assert_eq!(
            value_to_son(&Value::Enum(EnumValue { vendor: 1, type_id: 2, value: 3 }), &SonConfig::compact()),
            "enum(1,2) 3"
        );
    }

    #[test]
    fn type_to_son_renders_sequence_and_table_shapes() {
        assert_eq!(type_to_son(&Type::sequence_of(vec![Type::int()])), "seq<int>");
        let mut t = Type::of_kind(Kind::Table);
        t.table_keys = vec![Value::String("x".into())];
        t.table_types = vec![Type::int()];
        assert_eq!(type_to_son(&t), "table<\"x\":int>");
    }
}
