//! File version numbers and the context they are evaluated in.

use std::{fmt, str::FromStr};

use binrw::{
    io::{Read, Seek, Write},
    BinRead, BinResult, BinWrite, Endian,
};

/// A 32-bit integer that stores the version in hexadecimal format.
///
/// Versions compare as `(major, minor, patch, build)` tuples.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileVersion(pub u8, pub u8, pub u8, pub u8);

impl FileVersion {
    /// Morrowind.
    pub const V4_0_0_2: Self = Self(4, 0, 0, 2);
    /// First version storing booleans in a single byte.
    pub const V4_1_0_1: Self = Self(4, 1, 0, 1);
    /// Last version with bounding volumes on every object.
    pub const V4_2_2_0: Self = Self(4, 2, 2, 0);
    /// First version with a block type table.
    pub const V5_0_0_1: Self = Self(5, 0, 0, 1);
    /// First version with groups in the header.
    pub const V5_0_0_6: Self = Self(5, 0, 0, 6);
    /// First version with extra data lists and collision objects.
    pub const V10_0_1_0: Self = Self(10, 0, 1, 0);
    /// First version that may carry export information.
    pub const V10_0_1_2: Self = Self(10, 0, 1, 2);
    /// First version with a user version in the header.
    pub const V10_0_1_8: Self = Self(10, 0, 1, 8);
    /// Last version with a zero tag in front of every block.
    pub const V10_1_0_106: Self = Self(10, 1, 0, 106);
    /// Excluded from export information with user version 1.
    pub const V10_2_0_0: Self = Self(10, 2, 0, 0);
    /// First version with an endianness flag.
    pub const V20_0_0_3: Self = Self(20, 0, 0, 3);
    /// First version with a header string table.
    pub const V20_1_0_1: Self = Self(20, 1, 0, 1);
    /// First version with per-block sizes.
    pub const V20_2_0_5: Self = Self(20, 2, 0, 5);
    /// Fallout 3 and Oblivion remasters.
    pub const V20_2_0_7: Self = Self(20, 2, 0, 7);

    /// Oldest version whose header layout is understood.
    pub const MIN_SUPPORTED: Self = Self(3, 3, 0, 13);

    /// Decodes the packed `0xAABBCCDD` representation.
    pub const fn from_u32(value: u32) -> Self {
        let major = ((value >> 24) & 0xFF) as u8;
        let minor = ((value >> 16) & 0xFF) as u8;
        let patch = ((value >> 8) & 0xFF) as u8;
        let build = (value & 0xFF) as u8;

        Self(major, minor, patch, build)
    }

    /// Encodes the version into its packed `0xAABBCCDD` representation.
    pub const fn to_u32(self) -> u32 {
        (self.0 as u32) << 24 | (self.1 as u32) << 16 | (self.2 as u32) << 8 | self.3 as u32
    }
}

impl fmt::Display for FileVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}.{}", self.0, self.1, self.2, self.3)
    }
}

/// Error returned when a string is not a dotted version quad.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseVersionError;

impl fmt::Display for ParseVersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("version string must be in format 'a.b.c.d'")
    }
}

impl std::error::Error for ParseVersionError {}

impl FromStr for FileVersion {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('.').map(|p| p.parse::<u8>());
        match (parts.next(), parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(Ok(a)), Some(Ok(b)), Some(Ok(c)), Some(Ok(d)), None) => Ok(Self(a, b, c, d)),
            _ => Err(ParseVersionError),
        }
    }
}

impl BinRead for FileVersion {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: Endian,
        a: Self::Args<'_>,
    ) -> BinResult<Self> {
        u32::read_options(reader, endian, a).map(Self::from_u32)
    }
}

impl BinWrite for FileVersion {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        endian: Endian,
        a: Self::Args<'_>,
    ) -> BinResult<()> {
        self.to_u32().write_options(writer, endian, a)
    }
}

/// The version numbers that decide which fields exist in a file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct VersionContext {
    /// The main file version.
    pub version: FileVersion,
    /// Secondary version used by some exporters.
    pub user_version: u32,
    /// Tertiary version, stored alongside the export information.
    pub user_version_2: u32,
}

impl VersionContext {
    /// Creates a context for `version` with both user versions zeroed.
    pub const fn new(version: FileVersion) -> Self {
        Self {
            version,
            user_version: 0,
            user_version_2: 0,
        }
    }

    /// Sets the user version.
    pub const fn with_user_version(mut self, user_version: u32) -> Self {
        self.user_version = user_version;
        self
    }

    /// Sets the second user version.
    pub const fn with_user_version_2(mut self, user_version_2: u32) -> Self {
        self.user_version_2 = user_version_2;
        self
    }
}
