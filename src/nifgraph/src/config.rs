//! Options that tune read and write passes.

bitflags::bitflags! {
    /// Behavioral toggles for reading a graph.
    pub struct ReadFlags: u32 {
        /// Checks that every block consumes exactly the number of bytes
        /// recorded for it in the header, when the file records sizes.
        const VERIFY_BLOCK_SIZES = 1 << 0;
    }
}

bitflags::bitflags! {
    /// Behavioral toggles for writing a graph.
    #[derive(Default)]
    pub struct WriteFlags: u32 {
        /// Fails on pointers into blocks that are not written instead of
        /// replacing them with null.
        const STRICT_LINKS = 1 << 0;
    }
}

/// Configuration for reading a graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReadConfig {
    /// The flags to apply.
    pub flags: ReadFlags,
    /// How deep structs may nest in a single field before decoding is
    /// aborted.
    pub recursion_limit: u8,
}

impl Default for ReadConfig {
    fn default() -> Self {
        Self {
            flags: ReadFlags::VERIFY_BLOCK_SIZES,
            recursion_limit: 64,
        }
    }
}

/// Configuration for writing a graph.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WriteConfig {
    /// The flags to apply.
    pub flags: WriteFlags,
}
