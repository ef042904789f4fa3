// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Named indirection tables.
//!
//! Call sites resolve a name through a [`Namespace`] on every call instead
//! of holding the callable directly, which is what lets an injector swap
//! the binding for a bounded extent.

use crate::error::{ScopeError, ScopeResult};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Identity comparison on the allocation, ignoring vtables.
pub(crate) fn same_value<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

pub struct Namespace<T: ?Sized> {
    name: String,
    bindings: RwLock<BTreeMap<String, Arc<T>>>,
}

impl<T: ?Sized> fmt::Debug for Namespace<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace")
            .field("name", &self.name)
            .field("bindings", &self.names())
            .finish()
    }
}

impl<T: ?Sized> Namespace<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bindings: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bind `name`, returning the previous value.
    pub fn bind(&self, name: impl Into<String>, value: Arc<T>) -> Option<Arc<T>> {
        self.bindings.write().insert(name.into(), value)
    }

    pub fn unbind(&self, name: &str) -> Option<Arc<T>> {
        self.bindings.write().remove(name)
    }

    pub fn get(&self, name: &str) -> Option<Arc<T>> {
        self.bindings.read().get(name).cloned()
    }

    /// The value currently visible under `name`.
    pub fn resolve(&self, name: &str) -> ScopeResult<Arc<T>> {
        self.get(name).ok_or_else(|| ScopeError::NameNotBound {
            namespace: self.name.clone(),
            name: name.to_string(),
        })
    }

    pub fn names(&self) -> Vec<String> {
        self.bindings.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.bindings.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.read().is_empty()
    }

    /// Whether `name` currently refers to exactly `value`.
    pub fn refers_to(&self, name: &str, value: &Arc<T>) -> bool {
        self.bindings
            .read()
            .get(name)
            .map(|bound| same_value(bound, value))
            .unwrap_or(false)
    }

    /// Point every name bound to `original` at `replacement`. Returns the
    /// names that were rewritten.
    pub(crate) fn replace_matching(&self, original: &Arc<T>, replacement: &Arc<T>) -> Vec<String> {
        let mut bindings = self.bindings.write();
        let mut replaced = Vec::new();
        for (name, value) in bindings.iter_mut() {
            if same_value(value, original) {
                *value = replacement.clone();
                replaced.push(name.clone());
            }
        }
        replaced
    }

    /// Put `original` back under each of `names`.
    pub(crate) fn restore(&self, names: &[String], original: &Arc<T>) {
        let mut bindings = self.bindings.write();
        for name in names {
            bindings.insert(name.clone(), original.clone());
        }
    }
}
