//! The file header, which negotiates versions and byte order and holds
//! the tables shared by all blocks.

use std::fmt;

use binrw::Endian;

use crate::{
    codec::{string, NifReader, NifWriter},
    error::{NifError, Result},
    registry::Registry,
    version::{FileVersion, VersionContext},
};

const MAX_SIGNATURE_LEN: usize = 128;

/// The product name in the first line of a file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Signature {
    /// `NetImmerse File Format`, used up to 10.0.1.2.
    NetImmerse,
    /// `Gamebryo File Format`, used by later versions.
    Gamebryo,
}

impl Signature {
    /// Gets the text that precedes the version in the first line.
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::NetImmerse => "NetImmerse File Format, Version ",
            Self::Gamebryo => "Gamebryo File Format, Version ",
        }
    }

    /// Gets the signature that exporters conventionally write for
    /// `version`.
    pub fn for_version(version: FileVersion) -> Self {
        if version <= FileVersion::V10_0_1_2 {
            Self::NetImmerse
        } else {
            Self::Gamebryo
        }
    }

    fn detect(start: &[u8]) -> Option<Self> {
        [Self::NetImmerse, Self::Gamebryo].into_iter().find(|s| {
            let prefix = s.prefix().as_bytes();
            let n = prefix.len().min(start.len());

            // An input cut short inside the prefix still counts.
            n > 0 && start[..n] == prefix[..n]
        })
    }
}

/// Free-form exporter information.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ExportInfo {
    pub author: String,
    pub process_script: String,
    pub export_script: String,
    /// Only stored when the second user version is 130.
    pub max_filepath: String,
}

/// Whether a file of the given versions carries export information and
/// the second user version.
pub fn has_export_info(version: FileVersion, user_version: u32) -> bool {
    version >= FileVersion::V10_0_1_2
        && (user_version >= 10 || (user_version == 1 && version != FileVersion::V10_2_0_0))
}

/// File-wide information that applications may inspect and modify.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileInfo {
    /// The product name written in front of the version.
    pub signature: Signature,
    /// The main file version.
    pub version: FileVersion,
    /// The byte order of everything after the version number.
    ///
    /// Files before 20.0.0.3 are always little-endian.
    pub endian: Endian,
    /// Secondary version used by some exporters.
    pub user_version: u32,
    /// Tertiary version, stored along with the export information.
    pub user_version_2: u32,
    /// Stored only when [`has_export_info`] holds.
    pub export_info: ExportInfo,
    /// Group identifiers, stored from 5.0.0.6 onward.
    pub groups: Vec<u32>,
}

impl FileInfo {
    /// Creates little-endian file information for `version` with both
    /// user versions zeroed.
    pub fn new(version: FileVersion) -> Self {
        Self {
            signature: Signature::for_version(version),
            version,
            endian: Endian::Little,
            user_version: 0,
            user_version_2: 0,
            export_info: ExportInfo::default(),
            groups: Vec::new(),
        }
    }

    /// Sets both user versions.
    pub fn with_user_versions(mut self, user_version: u32, user_version_2: u32) -> Self {
        self.user_version = user_version;
        self.user_version_2 = user_version_2;
        self
    }

    /// Sets the byte order.
    pub fn with_endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    /// Gets the version numbers that decide the layout of blocks.
    pub fn context(&self) -> VersionContext {
        VersionContext::new(self.version)
            .with_user_version(self.user_version)
            .with_user_version_2(self.user_version_2)
    }
}

impl Default for FileInfo {
    fn default() -> Self {
        Self::new(FileVersion::V4_0_0_2)
    }
}

impl fmt::Display for FileInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "header:  {}{}", self.signature.prefix(), self.version)?;
        writeln!(f, "version: 0x{:08X}", self.version.to_u32())?;
        writeln!(f, "endian:  {:?}", self.endian)?;
        writeln!(f, "user:    {} / {}", self.user_version, self.user_version_2)?;
        if has_export_info(self.version, self.user_version) {
            writeln!(f, "author:  {:?}", self.export_info.author)?;
        }
        Ok(())
    }
}

/// The decoded header of a file.
///
/// Only [`Header::info`] survives a read; the tables are rebuilt by every
/// write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    pub info: FileInfo,
    pub num_blocks: u32,
    /// Distinct block type names, from 5.0.0.1 onward.
    pub block_types: Vec<String>,
    /// An index into [`Header::block_types`] per block.
    pub block_type_index: Vec<u16>,
    /// The encoded size of each block, from 20.2.0.5 onward.
    pub block_sizes: Vec<u32>,
    /// The string table, from 20.1.0.1 onward.
    pub strings: Vec<String>,
    pub max_string_length: u32,
}

impl Header {
    /// Creates a header with empty tables.
    pub fn new(info: FileInfo) -> Self {
        Self {
            info,
            num_blocks: 0,
            block_types: Vec::new(),
            block_type_index: Vec::new(),
            block_sizes: Vec::new(),
            strings: Vec::new(),
            max_string_length: 0,
        }
    }

    /// Parses the header and switches `reader` to the file's byte order.
    ///
    /// Versions for which `registry` has no block types are rejected.
    pub fn parse(reader: &mut NifReader<'_>, registry: &Registry) -> Result<Self> {
        let signature = parse_signature(reader)?;
        let version = parse_version_line(reader, signature)?;

        if version < FileVersion::MIN_SUPPORTED || !registry.supports(version) {
            return Err(NifError::UnsupportedVersion { version });
        }

        let mut info = FileInfo::new(version);
        info.signature = signature;

        if version >= FileVersion::V20_0_0_3 {
            let offset = reader.position();
            info.endian = match reader.u8()? {
                0 => Endian::Big,
                1 => Endian::Little,
                b => return Err(NifError::malformed(offset, format!("invalid endian flag {b}"))),
            };
        }
        reader.set_endian(info.endian);

        if version >= FileVersion::V10_0_1_8 {
            info.user_version = reader.u32()?;
        }

        let num_blocks = reader.u32()?;

        if has_export_info(version, info.user_version) {
            info.user_version_2 = reader.u32()?;

            let export = &mut info.export_info;
            export.author = reader.short_string()?;
            export.process_script = reader.short_string()?;
            export.export_script = reader.short_string()?;
            if info.user_version_2 == 130 {
                export.max_filepath = reader.short_string()?;
            }
        }

        let mut header = Self::new(info);
        header.num_blocks = num_blocks;

        if version >= FileVersion::V5_0_0_1 {
            let count = reader.u16()? as usize;
            header.block_types = read_strings(reader, count)?;

            reader.ensure_array(num_blocks as usize, 2)?;
            header.block_type_index = (0..num_blocks)
                .map(|_| reader.u16())
                .collect::<Result<_>>()?;
        }

        if version >= FileVersion::V20_2_0_5 {
            reader.ensure_array(num_blocks as usize, 4)?;
            header.block_sizes = (0..num_blocks)
                .map(|_| reader.u32())
                .collect::<Result<_>>()?;
        }

        if version >= FileVersion::V20_1_0_1 {
            let count = reader.u32()? as usize;
            header.max_string_length = reader.u32()?;
            header.strings = read_strings(reader, count)?;
        }

        if version >= FileVersion::V5_0_0_6 {
            let count = reader.u32()? as usize;
            reader.ensure_array(count, 4)?;
            header.info.groups = (0..count).map(|_| reader.u32()).collect::<Result<_>>()?;
        }

        tracing::debug!(
            "parsed header: version {version}, {} blocks, {} block types, {} strings",
            header.num_blocks,
            header.block_types.len(),
            header.strings.len()
        );

        Ok(header)
    }

    /// Writes the header and switches `writer` to the file's byte order.
    pub fn write(&self, writer: &mut NifWriter) -> Result<()> {
        let info = &self.info;
        let version = info.version;

        writer.set_endian(Endian::Little);
        writer.line(&format!("{}{version}", info.signature.prefix()))?;
        writer.u32(version.to_u32())?;

        if version >= FileVersion::V20_0_0_3 {
            writer.u8((info.endian == Endian::Little) as u8)?;
        } else if info.endian != Endian::Little {
            return Err(NifError::encoding(format!(
                "version {version} cannot store big-endian data"
            )));
        }
        writer.set_endian(info.endian);

        if version >= FileVersion::V10_0_1_8 {
            writer.u32(info.user_version)?;
        }

        writer.u32(self.num_blocks)?;

        if has_export_info(version, info.user_version) {
            writer.u32(info.user_version_2)?;

            let export = &info.export_info;
            writer.short_string(&export.author)?;
            writer.short_string(&export.process_script)?;
            writer.short_string(&export.export_script)?;
            if info.user_version_2 == 130 {
                writer.short_string(&export.max_filepath)?;
            }
        }

        if version >= FileVersion::V5_0_0_1 {
            let count = u16::try_from(self.block_types.len())
                .map_err(|_| NifError::encoding("too many distinct block types"))?;
            writer.u16(count)?;
            for name in &self.block_types {
                writer.sized_string(name)?;
            }
            for &index in &self.block_type_index {
                writer.u16(index)?;
            }
        }

        if version >= FileVersion::V20_2_0_5 {
            for &size in &self.block_sizes {
                writer.u32(size)?;
            }
        }

        if version >= FileVersion::V20_1_0_1 {
            writer.u32(self.strings.len() as u32)?;
            writer.u32(self.max_string_length)?;
            for s in &self.strings {
                writer.sized_string(s)?;
            }
        }

        if version >= FileVersion::V5_0_0_6 {
            writer.u32(info.groups.len() as u32)?;
            for &group in &info.groups {
                writer.u32(group)?;
            }
        }

        Ok(())
    }
}

fn parse_signature(reader: &NifReader<'_>) -> Result<Signature> {
    let start = reader.peek(MAX_SIGNATURE_LEN);
    Signature::detect(start).ok_or_else(|| NifError::BadMagic {
        found: string::printable(&start[..start.len().min(40)]),
    })
}

fn parse_version_line(reader: &mut NifReader<'_>, signature: Signature) -> Result<FileVersion> {
    let offset = reader.position();
    let line = match reader.line(MAX_SIGNATURE_LEN) {
        Some(line) => line,
        None if reader.remaining() < MAX_SIGNATURE_LEN as u64 => {
            return Err(NifError::Truncated {
                offset,
                needed: reader.remaining() + 1,
                remaining: reader.remaining(),
            })
        }
        None => return Err(NifError::malformed(offset, "signature line is too long")),
    };

    let prefix = signature.prefix().as_bytes();
    let text = line.strip_prefix(prefix).ok_or_else(|| NifError::BadMagic {
        found: string::printable(line),
    })?;
    let text = string::decode(text);

    let declared: FileVersion = text.parse().map_err(|_| {
        NifError::malformed(offset, format!("invalid version {text:?} in signature"))
    })?;

    let offset = reader.position();
    let version = FileVersion::from_u32(reader.u32()?);
    if version != declared {
        return Err(NifError::malformed(
            offset,
            format!("version {version} disagrees with signature version {declared}"),
        ));
    }

    Ok(version)
}

fn read_strings(reader: &mut NifReader<'_>, count: usize) -> Result<Vec<String>> {
    // Every string has at least its length prefix.
    reader.ensure_array(count, 4)?;
    (0..count).map(|_| reader.sized_string()).collect()
}
