//! Declarative predicates deciding whether a field is present.

use crate::{
    value::Fields,
    version::{FileVersion, VersionContext},
};

/// A comparison operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Cmp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Cmp {
    /// Applies the comparison to `lhs` and `rhs`.
    pub fn test<T: Ord>(self, lhs: T, rhs: T) -> bool {
        match self {
            Self::Eq => lhs == rhs,
            Self::Ne => lhs != rhs,
            Self::Lt => lhs < rhs,
            Self::Le => lhs <= rhs,
            Self::Gt => lhs > rhs,
            Self::Ge => lhs >= rhs,
        }
    }
}

/// A predicate over the file versions and the values of fields that
/// precede the guarded one.
///
/// Field predicates only see the fields of the enclosing block or struct.
/// A predicate against a field that is absent evaluates to `false`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Condition {
    /// Always holds.
    Always,
    /// The file version is at least the given one.
    Since(FileVersion),
    /// The file version is at most the given one.
    Until(FileVersion),
    /// Compares the user version against a constant.
    UserVersion(Cmp, u32),
    /// Compares the second user version against a constant.
    UserVersion2(Cmp, u32),
    /// Compares an integer field against a constant.
    Field(String, Cmp, i64),
    /// Any of the given bits are set in an integer field.
    FieldBits(String, u64),
    /// An integer or boolean field is non-zero.
    Truthy(String),
    /// All of the conditions hold.
    And(Vec<Condition>),
    /// Any of the conditions holds.
    Or(Vec<Condition>),
    /// The condition does not hold.
    Not(Box<Condition>),
}

impl Condition {
    /// Shorthand for [`Condition::Field`].
    pub fn field(name: impl Into<String>, cmp: Cmp, value: i64) -> Self {
        Self::Field(name.into(), cmp, value)
    }

    /// Shorthand for [`Condition::FieldBits`].
    pub fn bits(name: impl Into<String>, mask: u64) -> Self {
        Self::FieldBits(name.into(), mask)
    }

    /// Shorthand for [`Condition::Truthy`].
    pub fn truthy(name: impl Into<String>) -> Self {
        Self::Truthy(name.into())
    }

    /// Combines `self` and `other` so that both must hold.
    pub fn and(self, other: Condition) -> Self {
        match (self, other) {
            (Self::Always, c) | (c, Self::Always) => c,
            (Self::And(mut all), Self::And(more)) => {
                all.extend(more);
                Self::And(all)
            }
            (Self::And(mut all), c) => {
                all.push(c);
                Self::And(all)
            }
            (c, Self::And(mut all)) => {
                all.insert(0, c);
                Self::And(all)
            }
            (a, b) => Self::And(vec![a, b]),
        }
    }

    /// Evaluates the condition for the given versions and the fields that
    /// were decoded so far.
    pub fn eval(&self, ctx: &VersionContext, scope: &Fields) -> bool {
        let int = |name: &str| scope.get(name).and_then(|v| v.as_int());

        match self {
            Self::Always => true,
            Self::Since(v) => ctx.version >= *v,
            Self::Until(v) => ctx.version <= *v,
            Self::UserVersion(cmp, n) => cmp.test(ctx.user_version, *n),
            Self::UserVersion2(cmp, n) => cmp.test(ctx.user_version_2, *n),
            Self::Field(name, cmp, n) => int(name).map_or(false, |v| cmp.test(v, *n)),
            Self::FieldBits(name, mask) => int(name).map_or(false, |v| (v as u64) & mask != 0),
            Self::Truthy(name) => int(name).map_or(false, |v| v != 0),
            Self::And(all) => all.iter().all(|c| c.eval(ctx, scope)),
            Self::Or(any) => any.iter().any(|c| c.eval(ctx, scope)),
            Self::Not(c) => !c.eval(ctx, scope),
        }
    }

    /// Evaluates the parts of the condition that only depend on versions.
    ///
    /// Returns [`None`] when the outcome depends on field values.
    pub fn resolve(&self, ctx: &VersionContext) -> Option<bool> {
        match self {
            Self::Field(..) | Self::FieldBits(..) | Self::Truthy(..) => None,
            Self::And(all) => {
                let mut outcome = Some(true);
                for c in all {
                    match c.resolve(ctx) {
                        Some(false) => return Some(false),
                        Some(true) => {}
                        None => outcome = None,
                    }
                }
                outcome
            }
            Self::Or(any) => {
                let mut outcome = Some(false);
                for c in any {
                    match c.resolve(ctx) {
                        Some(true) => return Some(true),
                        Some(false) => {}
                        None => outcome = None,
                    }
                }
                outcome
            }
            Self::Not(c) => c.resolve(ctx).map(|b| !b),
            c => Some(c.eval(ctx, &Fields::default())),
        }
    }

    /// Collects the names of all fields the condition reads.
    pub(crate) fn field_refs<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Field(name, ..) | Self::FieldBits(name, _) | Self::Truthy(name) => out.push(name),
            Self::And(cs) | Self::Or(cs) => cs.iter().for_each(|c| c.field_refs(out)),
            Self::Not(c) => c.field_refs(out),
            _ => {}
        }
    }
}
