//! Dynamically typed field values.

use std::fmt;

use ahash::RandomState;
use glam::Vec3;
use indexmap::IndexMap;

use crate::link::{Link, LinkKind};

/// An ordered mapping of field names to their values.
pub type Fields = IndexMap<String, Value, RandomState>;

/// The value of a single block or struct field.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    F16(half::f16),
    F32(f32),
    F64(f64),
    /// Text of any of the string field kinds.
    String(String),
    /// A strong reference to another block.
    Ref(Link),
    /// A weak pointer to another block.
    Ptr(Link),
    /// A nested compound value.
    Struct(Fields),
    /// A sequence of values of the same field type.
    Array(Vec<Value>),
}

impl Value {
    /// Interprets the value as an integer, if it is one.
    ///
    /// Booleans count as `0` and `1` so they can serve as conditions and
    /// array lengths.
    pub fn as_int(&self) -> Option<i64> {
        match *self {
            Self::Bool(v) => Some(v as i64),
            Self::U8(v) => Some(v.into()),
            Self::I8(v) => Some(v.into()),
            Self::U16(v) => Some(v.into()),
            Self::I16(v) => Some(v.into()),
            Self::U32(v) => Some(v.into()),
            Self::I32(v) => Some(v.into()),
            Self::U64(v) => i64::try_from(v).ok(),
            Self::I64(v) => Some(v),
            _ => None,
        }
    }

    /// Interprets the value as a float, if it is one.
    pub fn as_float(&self) -> Option<f64> {
        match *self {
            Self::F16(v) => Some(v.to_f64()),
            Self::F32(v) => Some(v.into()),
            Self::F64(v) => Some(v),
            _ => None,
        }
    }

    /// Gets the text of a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Gets the link and its flavour, if this is a link value.
    pub fn as_link(&self) -> Option<(LinkKind, Link)> {
        match *self {
            Self::Ref(link) => Some((LinkKind::Ref, link)),
            Self::Ptr(link) => Some((LinkKind::Ptr, link)),
            _ => None,
        }
    }

    /// Gets the fields of a struct value.
    pub fn as_struct(&self) -> Option<&Fields> {
        match self {
            Self::Struct(fields) => Some(fields),
            _ => None,
        }
    }

    /// Gets the fields of a struct value mutably.
    pub fn as_struct_mut(&mut self) -> Option<&mut Fields> {
        match self {
            Self::Struct(fields) => Some(fields),
            _ => None,
        }
    }

    /// Gets the elements of an array value.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(values) => Some(values),
            _ => None,
        }
    }

    /// Gets the elements of an array value mutably.
    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Self::Array(values) => Some(values),
            _ => None,
        }
    }

    /// Reads a struct with `x`, `y` and `z` float fields as a vector.
    pub fn as_vec3(&self) -> Option<Vec3> {
        let fields = self.as_struct()?;
        let axis = |name: &str| fields.get(name).and_then(Value::as_float).map(|v| v as f32);

        Some(Vec3::new(axis("x")?, axis("y")?, axis("z")?))
    }

    /// Builds a `Vector3` struct value from a vector.
    pub fn from_vec3(v: Vec3) -> Self {
        let mut fields = Fields::default();
        fields.insert("x".into(), Self::F32(v.x));
        fields.insert("y".into(), Self::F32(v.y));
        fields.insert("z".into(), Self::F32(v.z));

        Self::Struct(fields)
    }

    /// Calls `f` for every link nested in this value, in field order.
    pub fn visit_links<F: FnMut(LinkKind, Link)>(&self, f: &mut F) {
        match self {
            Self::Ref(link) => f(LinkKind::Ref, *link),
            Self::Ptr(link) => f(LinkKind::Ptr, *link),
            Self::Struct(fields) => fields.values().for_each(|v| v.visit_links(f)),
            Self::Array(values) => values.iter().for_each(|v| v.visit_links(f)),
            _ => {}
        }
    }

    /// Calls `f` for every link nested in this value, allowing it to be
    /// replaced.
    pub fn visit_links_mut<F: FnMut(LinkKind, &mut Link)>(&mut self, f: &mut F) {
        match self {
            Self::Ref(link) => f(LinkKind::Ref, link),
            Self::Ptr(link) => f(LinkKind::Ptr, link),
            Self::Struct(fields) => fields.values_mut().for_each(|v| v.visit_links_mut(f)),
            Self::Array(values) => values.iter_mut().for_each(|v| v.visit_links_mut(f)),
            _ => {}
        }
    }

    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::U8(_) => "u8",
            Self::I8(_) => "i8",
            Self::U16(_) => "u16",
            Self::I16(_) => "i16",
            Self::U32(_) => "u32",
            Self::I32(_) => "i32",
            Self::U64(_) => "u64",
            Self::I64(_) => "i64",
            Self::F16(_) => "f16",
            Self::F32(_) => "f32",
            Self::F64(_) => "f64",
            Self::String(_) => "string",
            Self::Ref(_) => "ref",
            Self::Ptr(_) => "ptr",
            Self::Struct(_) => "struct",
            Self::Array(_) => "array",
        }
    }
}

fn fmt_link(f: &mut fmt::Formatter<'_>, kind: &str, link: Link) -> fmt::Result {
    match link {
        Link::Null => write!(f, "{kind}(null)"),
        Link::Unresolved(idx) => write!(f, "{kind}(?{idx})"),
        Link::Block(id) => write!(f, "{kind}({id})"),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::U8(v) => write!(f, "{v}"),
            Self::I8(v) => write!(f, "{v}"),
            Self::U16(v) => write!(f, "{v}"),
            Self::I16(v) => write!(f, "{v}"),
            Self::U32(v) => write!(f, "{v}"),
            Self::I32(v) => write!(f, "{v}"),
            Self::U64(v) => write!(f, "{v}"),
            Self::I64(v) => write!(f, "{v}"),
            Self::F16(v) => write!(f, "{v}"),
            Self::F32(v) => write!(f, "{v}"),
            Self::F64(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v:?}"),
            Self::Ref(link) => fmt_link(f, "ref", *link),
            Self::Ptr(link) => fmt_link(f, "ptr", *link),
            Self::Struct(fields) => {
                f.write_str("{ ")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                f.write_str(" }")
            }
            Self::Array(values) => {
                f.write_str("[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str("]")
            }
        }
    }
}
