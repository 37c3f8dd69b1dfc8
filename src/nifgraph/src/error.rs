//! Errors produced while reading and writing NIF data.

use thiserror::Error;

use crate::version::FileVersion;

/// A [`Result`][std::result::Result] produced by this crate's operations.
pub type Result<T> = std::result::Result<T, NifError>;

/// Errors that abort a read or write pass.
///
/// None of these are recovered from by the codec itself. Errors raised
/// while a block is being decoded or encoded are wrapped in
/// [`NifError::Context`]; use [`NifError::root`] to match on the
/// underlying cause.
#[derive(Debug, Error)]
pub enum NifError {
    /// Filesystem or stream failure.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// The header line is not a recognized NIF signature.
    #[error("unrecognized file signature {found:?}")]
    BadMagic {
        /// The (lossily decoded) start of the input.
        found: String,
    },

    /// The file version has no registered block layouts.
    #[error("unsupported file version {version}")]
    UnsupportedVersion {
        /// The offending version.
        version: FileVersion,
    },

    /// Fewer bytes remained than a primitive or array required.
    #[error("unexpected end of stream at offset {offset}: need {needed} bytes, {remaining} remaining")]
    Truncated {
        /// Byte offset where the read was attempted.
        offset: u64,
        /// Number of bytes requested.
        needed: u64,
        /// Number of bytes that were still available.
        remaining: u64,
    },

    /// A block type name is not present in the registry.
    #[error("unknown block type {name:?}")]
    UnknownBlockType {
        /// The unregistered type name.
        name: String,
        /// Index of the block in the file, when reading one.
        block: Option<usize>,
    },

    /// A block type index points outside of the header's type table.
    #[error("block {block} uses type index {index}, but only {count} types are declared")]
    BlockTypeIndexOutOfRange {
        /// Index of the block in the file.
        block: usize,
        /// The raw type index.
        index: u16,
        /// Number of entries in the type table.
        count: usize,
    },

    /// A link index is outside of the block table.
    #[error("link {index} in field `{field}` of {} is outside of [0, {count})", link_owner(.block))]
    DanglingLink {
        /// Index of the block holding the link, or `None` for the root list.
        block: Option<usize>,
        /// The field holding the link.
        field: String,
        /// The raw on-disk index.
        index: i32,
        /// Number of blocks in the file.
        count: usize,
    },

    /// A value cannot be represented in the declared field type.
    #[error("cannot encode: {reason}")]
    Encoding {
        /// Description of the problem.
        reason: String,
    },

    /// The input violates the format in a way not covered above.
    #[error("malformed data at offset {offset}: {reason}")]
    Malformed {
        /// Byte offset where the problem was detected.
        offset: u64,
        /// Description of the problem.
        reason: String,
    },

    /// A block or struct definition is inconsistent.
    #[error("invalid definition of `{type_name}`: {reason}")]
    Schema {
        /// The type being defined or looked up.
        type_name: String,
        /// Description of the problem.
        reason: String,
    },

    /// Nested structs exceeded the configured recursion limit.
    #[error("recursion limit exhausted while decoding nested structs")]
    RecursionLimit,

    /// Location of an error raised while handling a block field.
    #[error("block {block} ({type_name}), field `{field}`: {source}")]
    Context {
        /// Index of the block in the file.
        block: usize,
        /// Type name of the block.
        type_name: String,
        /// Name of the field being processed.
        field: String,
        /// The underlying error.
        #[source]
        source: Box<NifError>,
    },
}

impl NifError {
    pub(crate) fn encoding(reason: impl Into<String>) -> Self {
        Self::Encoding {
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(offset: u64, reason: impl Into<String>) -> Self {
        Self::Malformed {
            offset,
            reason: reason.into(),
        }
    }

    pub(crate) fn schema(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Schema {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }

    /// Strips any [`NifError::Context`] layers and returns the
    /// underlying error.
    pub fn root(&self) -> &NifError {
        let mut err = self;
        while let Self::Context { source, .. } = err {
            err = source;
        }
        err
    }

    /// Wraps `self` with the location of a block field.
    pub(crate) fn in_field(self, block: usize, type_name: &str, field: &str) -> Self {
        // Only the innermost location is interesting.
        if matches!(self, Self::Context { .. }) {
            return self;
        }

        Self::Context {
            block,
            type_name: type_name.to_string(),
            field: field.to_string(),
            source: Box::new(self),
        }
    }
}

fn link_owner(block: &Option<usize>) -> String {
    match block {
        Some(block) => format!("block {block}"),
        None => "the footer".to_string(),
    }
}
