use ahash::RandomState;
use indexmap::IndexSet;

use crate::{
    block::Block,
    codec::NifWriter,
    config::{WriteConfig, WriteFlags},
    error::{NifError, Result},
    header::Header,
    link::{BlockId, Link, LinkKind},
    registry::Registry,
    resolve,
    schema::{array_len, wide_bools, FieldDef, FieldType, Len, Primitive},
    value::{Fields, Value},
    version::{FileVersion, VersionContext},
};

use super::NifGraph;

const NO_STRING: u32 = u32::MAX;

/// Encodes block fields into the body of a file and collects the
/// strings they reference.
struct FieldEncoder<'a> {
    writer: NifWriter,
    registry: &'a Registry,
    ctx: VersionContext,
    config: WriteConfig,
    /// The file index of every arena slot, if the block is written.
    indices: Vec<Option<u32>>,
    strings: IndexSet<String, RandomState>,
}

fn mismatch(expected: &str, found: &Value) -> NifError {
    NifError::encoding(format!("expected {expected}, found {}", found.kind_name()))
}

impl FieldEncoder<'_> {
    fn fields<'d>(
        &mut self,
        defs: impl IntoIterator<Item = &'d FieldDef>,
        stored: &Fields,
    ) -> Result<()> {
        let mut written = Fields::default();
        for def in defs {
            self.field(def, stored, &mut written)?;
        }

        Ok(())
    }

    /// Writes the stored value of `def` if its condition holds.
    ///
    /// Conditions and array lengths only see the fields in `written`,
    /// which mirrors what a reader has decoded at the same position.
    fn field(&mut self, def: &FieldDef, stored: &Fields, written: &mut Fields) -> Result<()> {
        if !def.condition().eval(&self.ctx, written) {
            return Ok(());
        }

        let value = stored
            .get(def.name())
            .ok_or_else(|| NifError::encoding(format!("field `{}` is missing", def.name())))?;
        self.value(def.ty(), value, written, None)?;
        written.insert(def.name().to_string(), value.clone());

        Ok(())
    }

    fn primitive(&mut self, p: Primitive, value: &Value) -> Result<()> {
        let w = &mut self.writer;
        match (p, value) {
            (Primitive::Bool, &Value::Bool(v)) if wide_bools(self.ctx.version) => w.bool32(v),
            (Primitive::Bool, &Value::Bool(v)) => w.bool8(v),
            (Primitive::U8, &Value::U8(v)) => w.u8(v),
            (Primitive::I8, &Value::I8(v)) => w.i8(v),
            (Primitive::U16, &Value::U16(v)) => w.u16(v),
            (Primitive::I16, &Value::I16(v)) => w.i16(v),
            (Primitive::U32, &Value::U32(v)) => w.u32(v),
            (Primitive::I32, &Value::I32(v)) => w.i32(v),
            (Primitive::U64, &Value::U64(v)) => w.u64(v),
            (Primitive::I64, &Value::I64(v)) => w.i64(v),
            (Primitive::F16, &Value::F16(v)) => w.f16(v),
            (Primitive::F32, &Value::F32(v)) => w.f32(v),
            (Primitive::F64, &Value::F64(v)) => w.f64(v),
            (p, value) => Err(mismatch(&format!("{p:?}").to_lowercase(), value)),
        }
    }

    fn string(&mut self, s: &str) -> Result<()> {
        if self.ctx.version < FileVersion::V20_1_0_1 {
            return self.writer.sized_string(s);
        }

        if s.is_empty() {
            return self.writer.u32(NO_STRING);
        }

        // Validate before the string enters the table.
        crate::codec::string::encode(s)?;
        let (index, _) = self.strings.insert_full(s.to_string());
        self.writer.u32(index as u32)
    }

    fn link(&mut self, kind: LinkKind, link: Link) -> Result<()> {
        let index = match link {
            Link::Null => Link::NULL_INDEX,
            Link::Unresolved(raw) => {
                return Err(NifError::encoding(format!(
                    "link to raw index {raw} was never resolved"
                )))
            }
            Link::Block(id) => match self.indices.get(id.index()) {
                None => {
                    return Err(NifError::encoding(format!(
                        "link to {id} points outside of the graph"
                    )))
                }
                Some(Some(index)) => *index as i32,
                Some(None) if self.config.flags.contains(WriteFlags::STRICT_LINKS) => {
                    return Err(NifError::encoding(format!(
                        "{kind:?} to {id} points to a block that is not written"
                    )))
                }
                Some(None) => {
                    tracing::warn!("writing {kind:?} to unreachable block {id} as null");
                    Link::NULL_INDEX
                }
            },
        };

        self.writer.i32(index)
    }

    fn value(
        &mut self,
        ty: &FieldType,
        value: &Value,
        scope: &Fields,
        row: Option<usize>,
    ) -> Result<()> {
        match ty {
            FieldType::Primitive(p) => self.primitive(*p, value),
            FieldType::String => {
                let s = value.as_str().ok_or_else(|| mismatch("string", value))?;
                self.string(s)
            }
            FieldType::SizedString => {
                let s = value.as_str().ok_or_else(|| mismatch("string", value))?;
                self.writer.sized_string(s)
            }
            FieldType::ShortString => {
                let s = value.as_str().ok_or_else(|| mismatch("string", value))?;
                self.writer.short_string(s)
            }
            FieldType::FixedString(n) => {
                let s = value.as_str().ok_or_else(|| mismatch("string", value))?;
                self.writer.fixed_string(s, *n)
            }
            FieldType::Ref => match *value {
                Value::Ref(link) => self.link(LinkKind::Ref, link),
                _ => Err(mismatch("ref", value)),
            },
            FieldType::Ptr => match *value {
                Value::Ptr(link) => self.link(LinkKind::Ptr, link),
                _ => Err(mismatch("ptr", value)),
            },

            FieldType::Struct(name) => {
                let inner = value.as_struct().ok_or_else(|| mismatch(name, value))?;
                let registry = self.registry;
                let def = registry.struct_def(name)?;
                self.fields(def.fields(), inner)
            }

            FieldType::Array(elem, len) => {
                let values = value.as_array().ok_or_else(|| mismatch("array", value))?;

                let expected = array_len(len, scope, row).ok_or_else(|| {
                    NifError::encoding(format!("array length {len:?} does not resolve to a count"))
                })?;
                if values.len() != expected {
                    let source = match len {
                        Len::Fixed(_) => "its fixed size".to_string(),
                        Len::Field(f) | Len::Masked(f, _) => format!("field `{f}`"),
                    };
                    return Err(NifError::encoding(format!(
                        "array has {} elements, but {source} requires {expected}",
                        values.len()
                    )));
                }

                values
                    .iter()
                    .enumerate()
                    .try_for_each(|(i, v)| self.value(elem, v, scope, Some(i)))
            }
        }
    }
}

fn encode_block(
    encoder: &mut FieldEncoder<'_>,
    id: BlockId,
    block: &Block,
    ctx: &VersionContext,
) -> Result<()> {
    let registry = encoder.registry;
    let type_name = block.type_name();
    let layout = registry.layout_for(type_name, ctx)?;

    let mut written = Fields::default();
    for def in layout.fields() {
        encoder
            .field(def, block.fields(), &mut written)
            .map_err(|e| e.in_field(id.index(), type_name, def.name()))?;
    }

    Ok(())
}

/// Encodes the blocks reachable from the roots of `graph` into a
/// complete file.
///
/// Blocks that cannot be reached over strong references are not
/// written. Pointers into them are written as null, unless
/// [`WriteFlags::STRICT_LINKS`] is set.
pub fn write(graph: &NifGraph, registry: &Registry, config: WriteConfig) -> Result<Vec<u8>> {
    let info = graph.info();
    let ctx = info.context();
    let version = ctx.version;

    let order = resolve::assign_indices(graph);
    let pruned = graph.len() - order.len();
    if pruned > 0 {
        tracing::debug!("pruning {pruned} blocks that are unreachable from the roots");
    }

    let mut indices = vec![None; graph.len()];
    for (index, id) in order.iter().enumerate() {
        indices[id.index()] = Some(index as u32);
    }

    let mut encoder = FieldEncoder {
        writer: NifWriter::new(info.endian),
        registry,
        ctx,
        config,
        indices,
        strings: IndexSet::default(),
    };

    let mut header = Header::new(info.clone());
    header.num_blocks = order.len() as u32;

    let mut block_types: IndexSet<&str, RandomState> = IndexSet::default();
    for &id in &order {
        let block = graph
            .block(id)
            .ok_or_else(|| NifError::encoding(format!("{id} is outside of the graph")))?;

        if version < FileVersion::V5_0_0_1 {
            encoder.writer.sized_string(block.type_name())?;
        } else {
            let (index, _) = block_types.insert_full(block.type_name());
            let index = u16::try_from(index)
                .map_err(|_| NifError::encoding("too many distinct block types"))?;
            header.block_type_index.push(index);

            if version <= FileVersion::V10_1_0_106 {
                encoder.writer.u32(0)?;
            }
        }

        let start = encoder.writer.len();
        encode_block(&mut encoder, id, block, &ctx)?;

        let size = encoder.writer.len() - start;
        tracing::trace!("encoded {id} ({}), {size} bytes", block.type_name());
        if version >= FileVersion::V20_2_0_5 {
            header.block_sizes.push(size as u32);
        }
    }

    header.block_types = block_types.into_iter().map(str::to_string).collect();
    header.max_string_length = encoder
        .strings
        .iter()
        .map(|s| s.chars().count() as u32)
        .max()
        .unwrap_or(0);
    header.strings = encoder.strings.into_iter().collect();

    let mut out = NifWriter::default();
    header.write(&mut out)?;
    out.bytes(encoder.writer.view())?;

    // Every root is reachable, so each one has an index.
    out.u32(graph.roots().len() as u32)?;
    for &root in graph.roots() {
        match encoder.indices.get(root.index()) {
            Some(&Some(index)) => out.i32(index as i32)?,
            _ => {
                return Err(NifError::encoding(format!(
                    "root {root} is outside of the graph"
                )))
            }
        }
    }

    tracing::debug!(
        "wrote {} blocks, {} strings, {} bytes",
        header.num_blocks,
        header.strings.len(),
        out.len()
    );

    Ok(out.into_vec())
}
