//! Lookup of block and struct layouts by name.

use ahash::RandomState;
use indexmap::IndexMap;

use crate::{
    block::Block,
    error::{NifError, Result},
    schema::{array_len, BlockType, FieldDef, FieldType, StructDef},
    value::{Fields, Value},
    version::{FileVersion, VersionContext},
};

// Guards default construction of self-referential structs.
const DEFAULT_DEPTH_LIMIT: usize = 64;

/// The flattened field layout of a block type for one set of versions.
#[derive(Clone, Debug)]
pub struct Layout<'r> {
    type_name: &'r str,
    fields: Vec<&'r FieldDef>,
}

impl<'r> Layout<'r> {
    /// Gets the name of the block type.
    #[inline]
    pub fn type_name(&self) -> &'r str {
        self.type_name
    }

    /// Gets the fields in on-disk order, inherited ones first.
    ///
    /// Fields whose conditions depend on other field values are still
    /// included and must be checked per block.
    #[inline]
    pub fn fields(&self) -> &[&'r FieldDef] {
        &self.fields
    }
}

/// The set of block and struct types a codec understands.
///
/// A registry is filled once through `&mut` access and then shared
/// immutably between any number of read and write passes.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    types: IndexMap<String, BlockType, RandomState>,
    structs: IndexMap<String, StructDef, RandomState>,
}

fn collect_refs<'a>(def: &'a FieldDef, out: &mut Vec<&'a str>) {
    def.condition().field_refs(out);

    let mut ty = def.ty();
    while let FieldType::Array(elem, len) = ty {
        out.extend(len.field_ref());
        ty = &**elem;
    }
}

// Every field must only look at fields that are declared before it.
fn check_refs<'a>(
    type_name: &str,
    mut known: Vec<&'a str>,
    fields: impl IntoIterator<Item = &'a FieldDef>,
) -> Result<()> {
    let mut refs = Vec::new();
    for def in fields {
        refs.clear();
        collect_refs(def, &mut refs);

        if let Some(missing) = refs.iter().find(|r| !known.contains(*r)) {
            return Err(NifError::schema(
                type_name,
                format!(
                    "field `{}` refers to `{missing}`, which is not declared before it",
                    def.name()
                ),
            ));
        }

        known.push(def.name());
    }

    Ok(())
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a block type.
    ///
    /// The parent type, if any, must already be registered.
    pub fn register(&mut self, ty: BlockType) -> Result<()> {
        if self.types.contains_key(ty.name()) {
            return Err(NifError::schema(ty.name(), "block type is already registered"));
        }

        let mut inherited = Vec::new();
        if let Some(parent) = ty.parent() {
            if !self.types.contains_key(parent) {
                return Err(NifError::schema(
                    ty.name(),
                    format!("parent type `{parent}` is not registered"),
                ));
            }

            for base in self.ancestry(parent) {
                inherited.extend(base.own_fields().iter().map(FieldDef::name));
            }
        }

        check_refs(ty.name(), inherited, ty.own_fields())?;

        tracing::trace!("registered block type {}", ty.name());
        self.types.insert(ty.name().to_string(), ty);
        Ok(())
    }

    /// Adds a compound type.
    ///
    /// Structs named by [`FieldType::Struct`] fields are looked up when a
    /// block is decoded, so they may be registered in any order.
    pub fn register_struct(&mut self, def: StructDef) -> Result<()> {
        if self.structs.contains_key(def.name()) {
            return Err(NifError::schema(def.name(), "struct is already registered"));
        }

        check_refs(def.name(), Vec::new(), def.fields())?;

        self.structs.insert(def.name().to_string(), def);
        Ok(())
    }

    /// Gets a block type by its name.
    pub fn lookup(&self, name: &str) -> Result<&BlockType> {
        self.types.get(name).ok_or_else(|| NifError::UnknownBlockType {
            name: name.to_string(),
            block: None,
        })
    }

    /// Gets a struct definition by its name.
    pub fn struct_def(&self, name: &str) -> Result<&StructDef> {
        self.structs
            .get(name)
            .ok_or_else(|| NifError::schema(name, "struct is not registered"))
    }

    /// Indicates whether a block type of the given name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Iterates over all block types in registration order.
    pub fn types(&self) -> impl Iterator<Item = &BlockType> {
        self.types.values()
    }

    /// Iterates over a block type followed by all of its ancestors.
    pub fn ancestry<'r>(&'r self, name: &str) -> impl Iterator<Item = &'r BlockType> + 'r {
        std::iter::successors(self.types.get(name), move |ty| {
            ty.parent().and_then(|p| self.types.get(p))
        })
    }

    /// Indicates whether type `name` is `base` or derives from it.
    pub fn is_a(&self, name: &str, base: &str) -> bool {
        self.ancestry(name).any(|ty| ty.name() == base)
    }

    /// Indicates whether any registered block type exists in files of
    /// the given version.
    pub fn supports(&self, version: FileVersion) -> bool {
        self.types.values().any(|ty| ty.available_in(version))
    }

    /// Computes the field layout of a block type for the given versions.
    ///
    /// Fields whose version conditions cannot hold are left out.
    pub fn layout_for(&self, name: &str, ctx: &VersionContext) -> Result<Layout<'_>> {
        let ty = self.lookup(name)?;
        if !ty.available_in(ctx.version) {
            return Err(NifError::schema(
                name,
                format!("block type does not exist in version {}", ctx.version),
            ));
        }

        let mut chain: Vec<_> = self.ancestry(name).collect();
        chain.reverse();

        let fields = chain
            .into_iter()
            .flat_map(|ty| ty.own_fields())
            .filter(|def| def.condition().resolve(ctx) != Some(false))
            .collect();

        Ok(Layout {
            type_name: ty.name(),
            fields,
        })
    }

    /// Creates an empty block of a registered type.
    pub fn instantiate(&self, name: &str) -> Result<Block> {
        self.lookup(name).map(|ty| Block::new(ty.name()))
    }

    /// Creates a block of a registered type with every field present in
    /// the given versions set to a zero or empty value.
    ///
    /// Conditions on earlier field values are evaluated against the
    /// defaults, so optional fields guarded by flags end up absent.
    pub fn instantiate_default(&self, name: &str, ctx: &VersionContext) -> Result<Block> {
        let layout = self.layout_for(name, ctx)?;
        let mut block = Block::new(layout.type_name());

        let fields = self.default_fields(layout.fields().iter().copied(), ctx, 0)?;
        *block.fields_mut() = fields;

        Ok(block)
    }

    fn default_fields<'a>(
        &self,
        defs: impl IntoIterator<Item = &'a FieldDef>,
        ctx: &VersionContext,
        depth: usize,
    ) -> Result<Fields> {
        let mut fields = Fields::default();
        for def in defs {
            if def.condition().eval(ctx, &fields) {
                let value = self.default_value(def.ty(), ctx, &fields, None, depth)?;
                fields.insert(def.name().to_string(), value);
            }
        }

        Ok(fields)
    }

    fn default_value(
        &self,
        ty: &FieldType,
        ctx: &VersionContext,
        scope: &Fields,
        row: Option<usize>,
        depth: usize,
    ) -> Result<Value> {
        if depth > DEFAULT_DEPTH_LIMIT {
            return Err(NifError::RecursionLimit);
        }

        Ok(match ty {
            FieldType::Primitive(p) => p.zero(),
            FieldType::String | FieldType::SizedString | FieldType::ShortString => {
                Value::String(String::new())
            }
            FieldType::FixedString(n) => Value::String("\0".repeat(*n)),
            FieldType::Ref => Value::Ref(Default::default()),
            FieldType::Ptr => Value::Ptr(Default::default()),
            FieldType::Struct(name) => {
                let def = self.struct_def(name)?;
                Value::Struct(self.default_fields(def.fields(), ctx, depth + 1)?)
            }
            FieldType::Array(elem, len) => {
                let count = array_len(len, scope, row).unwrap_or(0);
                let values = (0..count)
                    .map(|i| self.default_value(elem, ctx, scope, Some(i), depth + 1))
                    .collect::<Result<_>>()?;
                Value::Array(values)
            }
        })
    }
}
