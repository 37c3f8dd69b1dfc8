use std::fmt;

use crate::{
    link::{Link, LinkKind},
    value::{Fields, Value},
};

/// A single object in a NIF scene graph.
///
/// Blocks carry their type name and an ordered set of fields whose
/// layout is described by a [`Registry`][crate::Registry].
#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    type_name: String,
    fields: Fields,
}

impl Block {
    /// Creates a new block of the given type without any fields.
    ///
    /// Prefer [`Registry::instantiate`][crate::Registry::instantiate],
    /// which validates the type name.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Fields::default(),
        }
    }

    /// Gets the name of the block's type.
    #[inline]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Gets all fields of the block in layout order.
    #[inline]
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Gets all fields of the block mutably.
    #[inline]
    pub fn fields_mut(&mut self) -> &mut Fields {
        &mut self.fields
    }

    /// Gets the value of a field by its name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Gets the value of a field by its name mutably.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields.get_mut(name)
    }

    /// Sets the value of a field, returning the previous one.
    ///
    /// New fields are appended to the end of the field order.
    pub fn set(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.fields.insert(name.into(), value)
    }

    /// Builder variant of [`Block::set`].
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.set(name, value);
        self
    }

    /// Gets the text of a string field.
    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Gets the target of a link field, if it is set.
    pub fn link(&self, name: &str) -> Option<Link> {
        self.get(name).and_then(Value::as_link).map(|(_, link)| link)
    }

    /// Calls `f` for every link held by the block, in field order.
    pub fn visit_links<F: FnMut(LinkKind, Link)>(&self, mut f: F) {
        self.fields.values().for_each(|v| v.visit_links(&mut f));
    }

    /// Calls `f` for every link held by the block together with the name
    /// of the top-level field containing it, allowing links to be
    /// replaced.
    pub fn visit_links_mut<F: FnMut(&str, LinkKind, &mut Link)>(&mut self, mut f: F) {
        for (name, value) in self.fields.iter_mut() {
            value.visit_links_mut(&mut |kind: LinkKind, link: &mut Link| f(name, kind, link));
        }
    }

    /// Collects the targets of all links of the given flavour.
    pub fn links_of(&self, kind: LinkKind) -> Vec<Link> {
        let mut links = Vec::new();
        self.visit_links(|k, link| {
            if k == kind {
                links.push(link);
            }
        });
        links
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.type_name)?;
        for (name, value) in &self.fields {
            writeln!(f, "  {name}: {value}")?;
        }
        Ok(())
    }
}
