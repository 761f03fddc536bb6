//! Cursors - handles on nodes of the cached tree
//!
//! A `Cursor` is a snapshot: it holds the node's id and the value it had when
//! the cursor was made, and never re-reads storage on its own. It records its
//! parent by id only, so cursors can be cloned, dropped and recreated freely.

use std::fmt;
use std::sync::Arc;

use crate::cache::Cache;
use crate::storage::AttrDb;
use crate::symbol::Symbol;
use crate::value::{AttrId, AttrKey, AttrValue};
use crate::{Error, Result};

#[derive(Clone)]
pub struct Cursor {
    cache: Arc<Cache>,
    /// `None` for the root
    parent: Option<AttrId>,
    label: Symbol,
    id: AttrId,
    value: AttrValue,
}

impl Cursor {
    /// Cursor on `(parent, label)`, storing `value` there unless a row exists
    pub(crate) fn insert(cache: Arc<Cache>, parent: Option<AttrId>, label: Symbol, value: AttrValue) -> Self {
        let key = AttrKey::new(parent.unwrap_or(AttrId::NONE), label);
        let id = store_under(&cache, parent).map_or(AttrId::NONE, |db| db.set_if_absent(key, &value));
        Self {
            cache,
            parent,
            label,
            id,
            value,
        }
    }

    /// Cursor on a row read back from storage
    pub(crate) fn existing(cache: Arc<Cache>, parent: Option<AttrId>, label: Symbol, id: AttrId, value: AttrValue) -> Self {
        Self {
            cache,
            parent,
            label,
            id,
            value,
        }
    }

    /// Row key of this node
    pub fn key(&self) -> AttrKey {
        AttrKey::new(self.parent.unwrap_or(AttrId::NONE), self.label)
    }

    /// Id of this node; `AttrId::NONE` when nothing is being cached
    pub fn id(&self) -> AttrId {
        self.id
    }

    pub fn parent_id(&self) -> Option<AttrId> {
        self.parent
    }

    pub fn label(&self) -> Symbol {
        self.label
    }

    /// The node's own name, as text
    pub fn name(&self) -> Option<Arc<str>> {
        self.cache.symbols().resolve(self.label)
    }

    pub fn cache(&self) -> &Arc<Cache> {
        &self.cache
    }

    /// Value captured when this cursor was made
    pub fn cached_value(&self) -> &AttrValue {
        &self.value
    }

    /// Resolve this node to `value`, overwriting its row in place.
    ///
    /// Only a `Placeholder` may change type; setting any other node to the
    /// value it already has is a no-op. The stored row is checked as well as
    /// this snapshot, so a node resolved through another cursor stays put.
    pub fn set_value(&mut self, value: AttrValue) -> Result<()> {
        if self.value == value {
            return Ok(());
        }
        if !self.value.is_placeholder() {
            return Err(Error::IllegalTransition {
                name: self.name().map(|n| n.to_string()).unwrap_or_default(),
                from: self.value.attr_type(),
                to: value.attr_type(),
            });
        }

        tracing::debug!("Caching the attribute {}", self.name().as_deref().unwrap_or("?"));
        self.id = match store_under(&self.cache, self.parent) {
            Some(db) => db.replace_value(self.key(), &value)?,
            None => AttrId::NONE,
        };
        self.value = value;
        Ok(())
    }

    /// Child `name` of this node holding `value`.
    ///
    /// Stores `value` unless the child already has a row; the returned cursor
    /// carries `value` either way.
    pub fn add_child(&self, name: Symbol, value: AttrValue) -> Cursor {
        Cursor::insert(self.cache.clone(), Some(self.id), name, value)
    }

    /// Cached child `name`, or `None` on a cache miss
    pub fn maybe_get_attr(&self, name: Symbol) -> Result<Option<Cursor>> {
        let Some(db) = store_under(&self.cache, Some(self.id)) else {
            return Ok(None);
        };
        let found = db.get_value(AttrKey::new(self.id, name))?;
        Ok(found.map(|(id, value)| Cursor::existing(self.cache.clone(), Some(self.id), name, id, value)))
    }

    /// Follow `path` through cached children; `None` at the first miss.
    ///
    /// An empty path yields this cursor.
    pub fn find_along_attr_path(&self, path: &[Symbol]) -> Result<Option<Cursor>> {
        let mut current = self.clone();
        for name in path {
            match current.maybe_get_attr(*name)? {
                Some(next) => current = next,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    /// Names of the children cached under this node so far, sorted
    pub fn cached_children(&self) -> Vec<String> {
        store_under(&self.cache, Some(self.id))
            .map(|db| db.child_names(self.id))
            .unwrap_or_default()
    }
}

/// Store holding the children of `parent`.
///
/// `AttrId::NONE` as a parent means the parent was never stored; only the
/// root (parent `None`) lives under the synthetic id 0.
fn store_under(cache: &Cache, parent: Option<AttrId>) -> Option<&AttrDb> {
    if parent.is_some_and(AttrId::is_none) {
        return None;
    }
    cache.db()
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("parent", &self.parent)
            .field("label", &self.name())
            .field("id", &self.id)
            .field("value", &self.value)
            .finish()
    }
}
