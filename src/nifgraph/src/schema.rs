//! Descriptions of block and struct layouts.

use crate::{
    condition::Condition,
    value::{Fields, Value},
    version::FileVersion,
};

/// A fixed-width primitive type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// One byte from 4.1.0.1 onward, 32 bits before.
    Bool,
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F16,
    F32,
    F64,
}

impl Primitive {
    /// Gets the encoded size in bytes for the given file version.
    pub const fn size(self, version: FileVersion) -> u64 {
        match self {
            Self::Bool => {
                if wide_bools(version) {
                    4
                } else {
                    1
                }
            }
            Self::U8 | Self::I8 => 1,
            Self::U16 | Self::I16 | Self::F16 => 2,
            Self::U32 | Self::I32 | Self::F32 => 4,
            Self::U64 | Self::I64 | Self::F64 => 8,
        }
    }

    /// Gets the zero value of the primitive.
    pub fn zero(self) -> Value {
        match self {
            Self::Bool => Value::Bool(false),
            Self::U8 => Value::U8(0),
            Self::I8 => Value::I8(0),
            Self::U16 => Value::U16(0),
            Self::I16 => Value::I16(0),
            Self::U32 => Value::U32(0),
            Self::I32 => Value::I32(0),
            Self::U64 => Value::U64(0),
            Self::I64 => Value::I64(0),
            Self::F16 => Value::F16(half::f16::ZERO),
            Self::F32 => Value::F32(0.0),
            Self::F64 => Value::F64(0.0),
        }
    }
}

/// Whether booleans take 32 bits in files of the given version.
pub(crate) const fn wide_bools(version: FileVersion) -> bool {
    version.to_u32() < FileVersion::V4_1_0_1.to_u32()
}

/// The number of elements in an array field.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Len {
    /// A constant number of elements.
    Fixed(usize),
    /// The value of an earlier integer field.
    ///
    /// For the inner dimension of a nested array this may also name an
    /// integer array field, in which case row `i` has as many elements as
    /// its `i`-th entry.
    Field(String),
    /// The value of an earlier integer field, masked with a constant.
    Masked(String, u64),
}

impl Len {
    /// Shorthand for [`Len::Field`].
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    /// Gets the name of the field this length reads, if any.
    pub fn field_ref(&self) -> Option<&str> {
        match self {
            Self::Fixed(_) => None,
            Self::Field(name) | Self::Masked(name, _) => Some(name),
        }
    }
}

/// The type of a block or struct field.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// A fixed-width primitive.
    Primitive(Primitive),
    /// Text that is stored inline before 20.1.0.1 and as an index into
    /// the header's string table from then on.
    String,
    /// Text prefixed by its 32-bit length.
    SizedString,
    /// Text prefixed by its 8-bit length, NUL-terminated.
    ShortString,
    /// Text of exactly the given number of bytes.
    FixedString(usize),
    /// A strong reference to another block.
    Ref,
    /// A weak pointer to another block.
    Ptr,
    /// A compound registered through
    /// [`Registry::register_struct`][crate::Registry::register_struct].
    Struct(String),
    /// A sequence of elements.
    Array(Box<FieldType>, Len),
}

impl FieldType {
    /// Shorthand for [`FieldType::Struct`].
    pub fn compound(name: impl Into<String>) -> Self {
        Self::Struct(name.into())
    }

    /// Creates an array of `self` with the given length.
    pub fn array(self, len: Len) -> Self {
        Self::Array(Box::new(self), len)
    }
}

impl From<Primitive> for FieldType {
    fn from(p: Primitive) -> Self {
        Self::Primitive(p)
    }
}

/// A named, optionally conditional field.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldDef {
    name: String,
    ty: FieldType,
    condition: Condition,
}

impl FieldDef {
    /// Creates an unconditional field.
    pub fn new(name: impl Into<String>, ty: impl Into<FieldType>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            condition: Condition::Always,
        }
    }

    /// Restricts the field to files of at least `version`.
    pub fn since(self, version: FileVersion) -> Self {
        self.when(Condition::Since(version))
    }

    /// Restricts the field to files of at most `version`.
    pub fn until(self, version: FileVersion) -> Self {
        self.when(Condition::Until(version))
    }

    /// Adds a condition that must hold for the field to be present.
    pub fn when(mut self, condition: Condition) -> Self {
        self.condition = std::mem::replace(&mut self.condition, Condition::Always).and(condition);
        self
    }

    /// Gets the name of the field.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the type of the field.
    #[inline]
    pub fn ty(&self) -> &FieldType {
        &self.ty
    }

    /// Gets the presence condition of the field.
    #[inline]
    pub fn condition(&self) -> &Condition {
        &self.condition
    }
}

/// A compound type that is embedded into fields by value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StructDef {
    pub(crate) name: String,
    pub(crate) fields: Vec<FieldDef>,
}

impl StructDef {
    /// Creates an empty struct definition.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Appends an unconditional field.
    pub fn field(self, name: impl Into<String>, ty: impl Into<FieldType>) -> Self {
        self.push(FieldDef::new(name, ty))
    }

    /// Appends a field definition.
    pub fn push(mut self, def: FieldDef) -> Self {
        self.fields.push(def);
        self
    }

    /// Gets the name of the struct.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the fields of the struct in declaration order.
    #[inline]
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }
}

/// The definition of a block type.
///
/// The fields of the parent type, if any, precede the block's own ones.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockType {
    pub(crate) name: String,
    pub(crate) parent: Option<String>,
    pub(crate) since: Option<FileVersion>,
    pub(crate) until: Option<FileVersion>,
    pub(crate) fields: Vec<FieldDef>,
}

impl BlockType {
    /// Creates a block type without any fields.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            since: None,
            until: None,
            fields: Vec::new(),
        }
    }

    /// Makes the type inherit the fields of a registered type.
    pub fn inherits(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Declares the type to exist from `version` onward.
    pub fn since(mut self, version: FileVersion) -> Self {
        self.since = Some(version);
        self
    }

    /// Declares the type to exist up to and including `version`.
    pub fn until(mut self, version: FileVersion) -> Self {
        self.until = Some(version);
        self
    }

    /// Appends an unconditional field.
    pub fn field(self, name: impl Into<String>, ty: impl Into<FieldType>) -> Self {
        self.push(FieldDef::new(name, ty))
    }

    /// Appends a field definition.
    pub fn push(mut self, def: FieldDef) -> Self {
        self.fields.push(def);
        self
    }

    /// Gets the name of the type.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the name of the parent type, if any.
    #[inline]
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Gets the type's own fields, without inherited ones.
    #[inline]
    pub fn own_fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Indicates whether the type exists in files of `version`.
    pub fn available_in(&self, version: FileVersion) -> bool {
        self.since.map_or(true, |v| version >= v) && self.until.map_or(true, |v| version <= v)
    }
}

/// Computes the number of elements of an array field from the fields
/// decoded before it.
///
/// `row` is the index of the enclosing row for the inner dimension of a
/// nested array. Returns [`None`] unless the referenced field holds a
/// non-negative integer.
pub(crate) fn array_len(len: &Len, scope: &Fields, row: Option<usize>) -> Option<usize> {
    let int = |v: &Value| v.as_int().and_then(|n| usize::try_from(n).ok());

    match len {
        Len::Fixed(n) => Some(*n),
        Len::Field(name) => match (scope.get(name)?, row) {
            (Value::Array(rows), Some(row)) => rows.get(row).and_then(int),
            (value, _) => int(value),
        },
        Len::Masked(name, mask) => scope
            .get(name)
            .and_then(Value::as_int)
            .and_then(|n| usize::try_from(n as u64 & mask).ok()),
    }
}
