//! Value model - what a cached node can hold and how it maps onto a row
//!
//! Every node of the cached tree holds one `AttrValue`:
//! - `Attrs`: an attribute set; children live in their own rows
//! - `String`: a string together with its context annotations
//! - `Bool`: a boolean
//! - `Placeholder`: known to exist, value not determined yet
//! - `Missing`: looked up and confirmed absent
//! - `Misc`: evaluated to a type the cache does not store
//! - `Failed`: evaluation raised an error
//!
//! On disk a value is a `RawValue`: a type tag, an optional text payload and
//! the context list.

use crate::context::ContextCodec;
use crate::symbol::Symbol;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between encoded context elements in the `context` column
pub const CONTEXT_SEPARATOR: char = ';';

/// Store-assigned identifier of a persisted node.
///
/// `0` is never assigned by SQLite; it stands for "no parent" in the root's
/// key and is what writes return once the store is disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct AttrId(i64);

impl AttrId {
    /// The root's synthetic parent, also the result of writes on a disabled store
    pub const NONE: AttrId = AttrId(0);

    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> i64 {
        self.0
    }

    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for AttrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Row key of a node: the id of its parent and its own name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttrKey {
    pub parent: AttrId,
    pub name: Symbol,
}

impl AttrKey {
    pub fn new(parent: AttrId, name: Symbol) -> Self {
        Self { parent, name }
    }
}

/// Context annotations of a string: ordered `(path, string)` pairs
pub type StringContext = Vec<(String, String)>;

/// Type tag stored in the `type` column.
///
/// The discriminants are part of the on-disk format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttrType {
    Placeholder = 0,
    Attrs = 1,
    String = 2,
    Missing = 3,
    Misc = 4,
    Failed = 5,
    Bool = 6,
}

impl AttrType {
    /// Get the string representation of the type
    pub fn as_str(&self) -> &'static str {
        match self {
            AttrType::Placeholder => "placeholder",
            AttrType::Attrs => "attrs",
            AttrType::String => "string",
            AttrType::Missing => "missing",
            AttrType::Misc => "misc",
            AttrType::Failed => "failed",
            AttrType::Bool => "bool",
        }
    }

    /// Get all types, in tag order
    pub fn all() -> &'static [AttrType] {
        &[
            AttrType::Placeholder,
            AttrType::Attrs,
            AttrType::String,
            AttrType::Missing,
            AttrType::Misc,
            AttrType::Failed,
            AttrType::Bool,
        ]
    }

    /// Tag written to the `type` column
    pub fn tag(self) -> i64 {
        self as i64
    }
}

impl TryFrom<i64> for AttrType {
    type Error = Error;

    fn try_from(tag: i64) -> Result<Self> {
        AttrType::all()
            .iter()
            .copied()
            .find(|ty| ty.tag() == tag)
            .ok_or(Error::UnexpectedAttrType(tag))
    }
}

impl fmt::Display for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Value of one cached node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AttrValue {
    /// Attribute set marker; children are separate rows under this node's id
    Attrs,
    String {
        value: String,
        context: StringContext,
    },
    Bool {
        value: bool,
    },
    Placeholder,
    Missing,
    Misc,
    Failed,
}

impl AttrValue {
    /// Plain string without context
    pub fn string(value: impl Into<String>) -> Self {
        AttrValue::String {
            value: value.into(),
            context: Vec::new(),
        }
    }

    /// String carrying context annotations
    pub fn string_with_context(value: impl Into<String>, context: StringContext) -> Self {
        AttrValue::String {
            value: value.into(),
            context,
        }
    }

    pub fn bool(value: bool) -> Self {
        AttrValue::Bool { value }
    }

    pub fn attr_type(&self) -> AttrType {
        match self {
            AttrValue::Attrs => AttrType::Attrs,
            AttrValue::String { .. } => AttrType::String,
            AttrValue::Bool { .. } => AttrType::Bool,
            AttrValue::Placeholder => AttrType::Placeholder,
            AttrValue::Missing => AttrType::Missing,
            AttrValue::Misc => AttrType::Misc,
            AttrValue::Failed => AttrType::Failed,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, AttrValue::Placeholder)
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::String { value, context } if context.is_empty() => write!(f, "{:?}", value),
            AttrValue::String { value, context } => {
                write!(f, "{:?} (context: {} element(s))", value, context.len())
            }
            AttrValue::Bool { value } => write!(f, "{}", value),
            other => write!(f, "<{}>", other.attr_type()),
        }
    }
}

/// Row-level form of an `AttrValue`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawValue {
    pub ty: AttrType,
    pub value: Option<String>,
    pub context: StringContext,
}

impl RawValue {
    /// Project a value onto its row form. Total: every value has one.
    pub fn from_value(value: &AttrValue) -> Self {
        let ty = value.attr_type();
        match value {
            AttrValue::String { value, context } => Self {
                ty,
                value: Some(value.clone()),
                context: context.clone(),
            },
            AttrValue::Bool { value } => Self {
                ty,
                value: Some(if *value { "1" } else { "0" }.to_string()),
                context: Vec::new(),
            },
            _ => Self {
                ty,
                value: None,
                context: Vec::new(),
            },
        }
    }

    /// Rebuild the value from its row form
    pub fn into_value(self) -> Result<AttrValue> {
        match self.ty {
            AttrType::Attrs => Ok(AttrValue::Attrs),
            AttrType::Placeholder => Ok(AttrValue::Placeholder),
            AttrType::Missing => Ok(AttrValue::Missing),
            AttrType::Misc => Ok(AttrValue::Misc),
            AttrType::Failed => Ok(AttrValue::Failed),
            AttrType::String => Ok(AttrValue::String {
                value: self.value.unwrap_or_default(),
                context: self.context,
            }),
            AttrType::Bool => match self.value.as_deref() {
                Some("1") => Ok(AttrValue::bool(true)),
                Some("0") => Ok(AttrValue::bool(false)),
                _ => Err(Error::CorruptValue {
                    ty: AttrType::Bool,
                    value: self.value,
                }),
            },
        }
    }

    /// Build a raw value from the `type`, `value` and `context` columns
    pub fn from_columns(
        tag: i64,
        value: Option<String>,
        context: Option<&str>,
        codec: &dyn ContextCodec,
    ) -> Result<Self> {
        let ty = AttrType::try_from(tag)?;
        let context = match ty {
            AttrType::String => parse_context(context, codec)?,
            _ => Vec::new(),
        };
        Ok(Self { ty, value, context })
    }

    /// Encode the context list for the `context` column; `None` when empty
    pub fn serialize_context(&self, codec: &dyn ContextCodec) -> Option<String> {
        if self.context.is_empty() {
            return None;
        }
        let encoded: Vec<String> = self
            .context
            .iter()
            .map(|(path, name)| codec.encode(path, name))
            .collect();
        Some(encoded.join(&CONTEXT_SEPARATOR.to_string()))
    }
}

/// Decode a `context` column. NULL and the empty string both mean no context.
pub fn parse_context(column: Option<&str>, codec: &dyn ContextCodec) -> Result<StringContext> {
    match column {
        None | Some("") => Ok(Vec::new()),
        Some(s) => s.split(CONTEXT_SEPARATOR).map(|token| codec.decode(token)).collect(),
    }
}
