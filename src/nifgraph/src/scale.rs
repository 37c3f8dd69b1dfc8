//! Uniform rescaling of the geometry in a graph.
//!
//! Exporters and importers use this to correct for the unit mismatch
//! between a NIF file and the application that consumes it.

use crate::{
    graph::NifGraph,
    value::{Fields, Value},
};

fn set_float(slot: &mut Value, v: f32) {
    match slot {
        Value::F16(x) => *x = half::f16::from_f32(v),
        Value::F32(x) => *x = v,
        Value::F64(x) => *x = v.into(),
        _ => {}
    }
}

fn scale_float(value: &mut Value, factor: f32) -> usize {
    let changed = match value {
        Value::F16(x) => {
            *x = half::f16::from_f32(x.to_f32() * factor);
            true
        }
        Value::F32(x) => {
            *x *= factor;
            true
        }
        Value::F64(x) => {
            *x *= f64::from(factor);
            true
        }
        _ => false,
    };
    changed as usize
}

fn scale_vec3(value: &mut Value, factor: f32) -> usize {
    let scaled = match value.as_vec3() {
        Some(v) => v * factor,
        None => return 0,
    };

    let fields = match value.as_struct_mut() {
        Some(fields) => fields,
        None => return 0,
    };
    for (axis, component) in [("x", scaled.x), ("y", scaled.y), ("z", scaled.z)] {
        if let Some(slot) = fields.get_mut(axis) {
            set_float(slot, component);
        }
    }

    1
}

fn scale_nested(value: &mut Value, factor: f32) -> usize {
    match value {
        Value::Struct(fields) => scale_fields(fields, factor),
        Value::Array(values) => values.iter_mut().map(|v| scale_nested(v, factor)).sum(),
        _ => 0,
    }
}

fn scale_fields(fields: &mut Fields, factor: f32) -> usize {
    let mut count = 0;
    for (name, value) in fields.iter_mut() {
        count += match name.as_str() {
            "Translation" | "Center" => match value.as_vec3() {
                Some(_) => scale_vec3(value, factor),
                None => scale_nested(value, factor),
            },
            "Vertices" => match value.as_array_mut() {
                Some(vertices) => vertices.iter_mut().map(|v| scale_vec3(v, factor)).sum(),
                None => 0,
            },
            "Radius" => scale_float(value, factor),
            _ => scale_nested(value, factor),
        };
    }
    count
}

/// Multiplies all positional data in `graph` by `factor`.
///
/// This affects every `Translation` and `Center` vector, every element
/// of a `Vertices` array and every `Radius`, wherever they occur in a
/// block, including inside of nested structs. Returns the number of
/// values that were scaled.
pub fn apply_scale(graph: &mut NifGraph, factor: f32) -> usize {
    let mut count = 0;
    graph.rewrite_all(|_, block| count += scale_fields(block.fields_mut(), factor));

    tracing::debug!("scaled {count} values by {factor}");
    count
}

