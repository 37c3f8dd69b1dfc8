//! References between blocks.

use std::fmt;

/// A handle to a block owned by a [`NifGraph`][crate::NifGraph].
///
/// Handles are plain indices into the graph's block arena and are only
/// meaningful for the graph that issued them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(pub u32);

impl BlockId {
    /// Gets the arena index of the block.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The flavour of a link field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LinkKind {
    /// A strong reference, typically pointing down the scene graph.
    ///
    /// Blocks are discovered for writing by following these.
    Ref,
    /// A weak pointer, typically pointing back up the scene graph.
    ///
    /// Never makes its target reachable on its own.
    Ptr,
}

/// The target of a link field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Link {
    /// Points to nothing. Encoded as `-1`.
    #[default]
    Null,
    /// A raw index as found in the file.
    ///
    /// Only exists between decoding a block and the fixup pass of a
    /// read; graphs handed out by the reader never contain these.
    Unresolved(i32),
    /// Points to a block in the owning graph.
    Block(BlockId),
}

impl Link {
    /// The on-disk representation of [`Link::Null`].
    pub const NULL_INDEX: i32 = -1;

    /// Decodes a raw on-disk index.
    pub const fn from_raw(index: i32) -> Self {
        if index == Self::NULL_INDEX {
            Self::Null
        } else {
            Self::Unresolved(index)
        }
    }

    /// Gets the target block, if the link is resolved and not null.
    #[inline]
    pub const fn block(self) -> Option<BlockId> {
        match self {
            Self::Block(id) => Some(id),
            _ => None,
        }
    }

    /// Indicates whether the link points to nothing.
    #[inline]
    pub const fn is_null(self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<BlockId> for Link {
    fn from(id: BlockId) -> Self {
        Self::Block(id)
    }
}

impl From<Option<BlockId>> for Link {
    fn from(id: Option<BlockId>) -> Self {
        id.map_or(Self::Null, Self::Block)
    }
}
