use crate::{
    block::Block,
    codec::NifReader,
    config::{ReadConfig, ReadFlags},
    error::{NifError, Result},
    header::Header,
    link::{BlockId, Link},
    registry::Registry,
    resolve,
    schema::{array_len, wide_bools, FieldDef, FieldType, Primitive},
    value::{Fields, Value},
    version::{FileVersion, VersionContext},
};

use super::NifGraph;

const NO_STRING: u32 = u32::MAX;

/// The progress of a [`GraphReader`]. Transitions strictly go forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum State {
    Init,
    HeaderParsed,
    BlockTypesCounted,
    BlocksAllocated,
    BlocksFieldsDecoded,
    LinksResolved,
    Done,
}

/// Decodes the fields of one block or struct.
struct FieldDecoder<'a, 'r> {
    reader: &'a mut NifReader<'r>,
    registry: &'a Registry,
    strings: &'a [String],
    ctx: VersionContext,
    recursion_limit: u8,
}

impl FieldDecoder<'_, '_> {
    fn fields<'d>(
        &mut self,
        defs: impl IntoIterator<Item = &'d FieldDef>,
        scope: &mut Fields,
        depth: u8,
    ) -> Result<()> {
        for def in defs {
            if def.condition().eval(&self.ctx, scope) {
                let value = self.value(def.ty(), scope, None, depth)?;
                scope.insert(def.name().to_string(), value);
            }
        }

        Ok(())
    }

    fn primitive(&mut self, p: Primitive) -> Result<Value> {
        let r = &mut *self.reader;
        Ok(match p {
            Primitive::Bool if wide_bools(self.ctx.version) => Value::Bool(r.bool32()?),
            Primitive::Bool => Value::Bool(r.bool8()?),
            Primitive::U8 => Value::U8(r.u8()?),
            Primitive::I8 => Value::I8(r.i8()?),
            Primitive::U16 => Value::U16(r.u16()?),
            Primitive::I16 => Value::I16(r.i16()?),
            Primitive::U32 => Value::U32(r.u32()?),
            Primitive::I32 => Value::I32(r.i32()?),
            Primitive::U64 => Value::U64(r.u64()?),
            Primitive::I64 => Value::I64(r.i64()?),
            Primitive::F16 => Value::F16(r.f16()?),
            Primitive::F32 => Value::F32(r.f32()?),
            Primitive::F64 => Value::F64(r.f64()?),
        })
    }

    fn string(&mut self) -> Result<String> {
        if self.ctx.version < FileVersion::V20_1_0_1 {
            return self.reader.sized_string();
        }

        let offset = self.reader.position();
        match self.reader.u32()? {
            NO_STRING => Ok(String::new()),
            index => self.strings.get(index as usize).cloned().ok_or_else(|| {
                NifError::malformed(
                    offset,
                    format!(
                        "string index {index} is outside of a table of {} entries",
                        self.strings.len()
                    ),
                )
            }),
        }
    }

    // Lower bound of the encoded size of one value, used to reject
    // absurd array lengths before allocating.
    fn min_size(&self, ty: &FieldType) -> u64 {
        match ty {
            FieldType::Primitive(p) => p.size(self.ctx.version),
            FieldType::String | FieldType::SizedString | FieldType::Ref | FieldType::Ptr => 4,
            FieldType::ShortString => 1,
            FieldType::FixedString(n) => *n as u64,
            FieldType::Struct(_) | FieldType::Array(..) => 0,
        }
    }

    fn value(
        &mut self,
        ty: &FieldType,
        scope: &Fields,
        row: Option<usize>,
        depth: u8,
    ) -> Result<Value> {
        Ok(match ty {
            FieldType::Primitive(p) => self.primitive(*p)?,
            FieldType::String => Value::String(self.string()?),
            FieldType::SizedString => Value::String(self.reader.sized_string()?),
            FieldType::ShortString => Value::String(self.reader.short_string()?),
            FieldType::FixedString(n) => Value::String(self.reader.fixed_string(*n)?),
            FieldType::Ref => Value::Ref(Link::from_raw(self.reader.i32()?)),
            FieldType::Ptr => Value::Ptr(Link::from_raw(self.reader.i32()?)),

            FieldType::Struct(name) => {
                if depth >= self.recursion_limit {
                    return Err(NifError::RecursionLimit);
                }

                let registry = self.registry;
                let def = registry.struct_def(name)?;
                let mut inner = Fields::default();
                self.fields(def.fields(), &mut inner, depth + 1)?;

                Value::Struct(inner)
            }

            FieldType::Array(elem, len) => {
                let count = array_len(len, scope, row).ok_or_else(|| {
                    NifError::malformed(
                        self.reader.position(),
                        format!("array length {len:?} does not resolve to a count"),
                    )
                })?;

                let size = self.min_size(elem);
                if size > 0 {
                    self.reader.ensure_array(count, size)?;
                }

                let mut values =
                    Vec::with_capacity(count.min(self.reader.remaining() as usize));
                for i in 0..count {
                    values.push(self.value(elem, scope, Some(i), depth)?);
                }

                Value::Array(values)
            }
        })
    }
}

/// A single pass that turns a byte buffer into a [`NifGraph`].
struct GraphReader<'r, 'a> {
    reader: NifReader<'a>,
    registry: &'r Registry,
    config: ReadConfig,
    state: State,

    header: Option<Header>,
    type_names: Vec<String>,
    blocks: Vec<Block>,
    raw_roots: Vec<i32>,
    roots: Vec<BlockId>,
}

impl<'r, 'a> GraphReader<'r, 'a> {
    fn new(data: &'a [u8], registry: &'r Registry, config: ReadConfig) -> Self {
        Self {
            reader: NifReader::new(data),
            registry,
            config,
            state: State::Init,
            header: None,
            type_names: Vec::new(),
            blocks: Vec::new(),
            raw_roots: Vec::new(),
            roots: Vec::new(),
        }
    }

    fn header(&self) -> Result<&Header> {
        self.header
            .as_ref()
            .ok_or_else(|| NifError::malformed(0, "header was not parsed"))
    }

    /// Performs the work of the current state and moves on to the next.
    fn advance(&mut self) -> Result<()> {
        self.state = match self.state {
            State::Init => {
                self.header = Some(Header::parse(&mut self.reader, self.registry)?);
                State::HeaderParsed
            }
            State::HeaderParsed => {
                self.count_block_types()?;
                State::BlockTypesCounted
            }
            State::BlockTypesCounted => {
                self.allocate_blocks()?;
                State::BlocksAllocated
            }
            State::BlocksAllocated => {
                self.decode_blocks()?;
                self.decode_roots()?;
                State::BlocksFieldsDecoded
            }
            State::BlocksFieldsDecoded => {
                self.roots = resolve::resolve_all(&mut self.blocks, &self.raw_roots)?;
                State::LinksResolved
            }
            State::LinksResolved | State::Done => State::Done,
        };

        Ok(())
    }

    // Looks up the type of every block in the header's table. Files
    // without a table name each type in front of its block instead.
    fn count_block_types(&mut self) -> Result<()> {
        let header = self.header()?;
        if header.info.version < FileVersion::V5_0_0_1 {
            return Ok(());
        }

        let mut names = Vec::with_capacity(header.block_type_index.len());
        for (block, &index) in header.block_type_index.iter().enumerate() {
            let name = header.block_types.get(index as usize).ok_or(
                NifError::BlockTypeIndexOutOfRange {
                    block,
                    index,
                    count: header.block_types.len(),
                },
            )?;

            if !self.registry.contains(name) {
                return Err(NifError::UnknownBlockType {
                    name: name.clone(),
                    block: Some(block),
                });
            }
            names.push(name.clone());
        }

        self.type_names = names;
        Ok(())
    }

    fn allocate_blocks(&mut self) -> Result<()> {
        let num_blocks = self.header()?.num_blocks as usize;

        let mut blocks = Vec::with_capacity(num_blocks.min(self.reader.remaining() as usize));
        for name in &self.type_names {
            blocks.push(self.registry.instantiate(name)?);
        }

        self.blocks = blocks;
        Ok(())
    }

    fn decode_blocks(&mut self) -> Result<()> {
        let header = self
            .header
            .as_ref()
            .ok_or_else(|| NifError::malformed(0, "header was not parsed"))?;
        let ctx = header.info.context();
        let version = ctx.version;

        let mut decoder = FieldDecoder {
            reader: &mut self.reader,
            registry: self.registry,
            strings: &header.strings,
            ctx,
            recursion_limit: self.config.recursion_limit,
        };

        for index in 0..header.num_blocks as usize {
            if version < FileVersion::V5_0_0_1 {
                let name = decoder.reader.sized_string()?;
                if !self.registry.contains(&name) {
                    return Err(NifError::UnknownBlockType {
                        name,
                        block: Some(index),
                    });
                }
                self.blocks.push(self.registry.instantiate(&name)?);
            } else if version <= FileVersion::V10_1_0_106 {
                let offset = decoder.reader.position();
                let tag = decoder.reader.u32()?;
                if tag != 0 {
                    return Err(NifError::malformed(
                        offset,
                        format!("block {index} is preceded by non-zero tag {tag}"),
                    ));
                }
            }

            let block = &mut self.blocks[index];
            let type_name = block.type_name().to_string();
            let start = decoder.reader.position();

            let layout = self.registry.layout_for(&type_name, &ctx)?;
            for def in layout.fields() {
                decoder
                    .fields(Some(*def), block.fields_mut(), 0)
                    .map_err(|e| e.in_field(index, &type_name, def.name()))?;
            }

            let consumed = decoder.reader.position() - start;
            if let Some(&size) = header.block_sizes.get(index) {
                if self.config.flags.contains(ReadFlags::VERIFY_BLOCK_SIZES)
                    && consumed != u64::from(size)
                {
                    return Err(NifError::malformed(
                        start,
                        format!(
                            "block {index} ({type_name}) is declared as {size} bytes, but {consumed} were decoded"
                        ),
                    ));
                }
            }

            tracing::trace!("decoded block {index} ({type_name}), {consumed} bytes at {start}");
        }

        Ok(())
    }

    fn decode_roots(&mut self) -> Result<()> {
        let count = self.reader.u32()? as usize;
        self.reader.ensure_array(count, 4)?;

        self.raw_roots = (0..count)
            .map(|_| self.reader.i32())
            .collect::<Result<_>>()?;

        if self.reader.remaining() > 0 {
            tracing::debug!("ignoring {} trailing bytes", self.reader.remaining());
        }

        Ok(())
    }

    fn finish(self) -> Result<NifGraph> {
        debug_assert_eq!(self.state, State::Done);

        let header = self
            .header
            .ok_or_else(|| NifError::malformed(0, "header was not parsed"))?;
        Ok(NifGraph::from_parts(header.info, self.blocks, self.roots))
    }
}

/// Decodes a complete graph from `data`.
///
/// Block types and struct layouts are taken from `registry`. Any error
/// aborts the read and no partial graph is returned.
pub fn read(data: &[u8], registry: &Registry, config: ReadConfig) -> Result<NifGraph> {
    let mut reader = GraphReader::new(data, registry, config);
    while reader.state != State::Done {
        reader.advance()?;
    }

    let graph = reader.finish()?;
    tracing::debug!(
        "read {} blocks with {} roots",
        graph.len(),
        graph.roots().len()
    );

    Ok(graph)
}
