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

//! Installing replacements into name-resolution scopes.
//!
//! An injector rewrites every binding that refers to an original value so
//! it refers to a replacement instead, and hands back a [`ScopeGuard`]. The
//! original bindings come back when the guard is dropped, including while
//! unwinding from a panic.

use crate::error::{ScopeError, ScopeResult};
use crate::namespace::Namespace;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

/// Something that can temporarily rebind names from `original` to a
/// replacement.
pub trait ScopeInjector<T: ?Sized>: Send + Sync {
    /// Rebind all names referring to `original`. Fails with
    /// [`ScopeError::BindingNotFound`] when nothing refers to it.
    fn install<'a>(&'a self, original: &Arc<T>, replacement: Arc<T>)
        -> ScopeResult<ScopeGuard<'a>>;
}

type RestoreFn<'a> = Box<dyn FnOnce() + Send + 'a>;

/// Restores the bindings replaced by an install when dropped.
#[must_use = "dropping the guard restores the original bindings immediately"]
pub struct ScopeGuard<'a> {
    restore: Option<RestoreFn<'a>>,
    bindings: usize,
}

impl fmt::Debug for ScopeGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeGuard")
            .field("bindings", &self.bindings)
            .field("active", &self.is_active())
            .finish()
    }
}

impl<'a> ScopeGuard<'a> {
    pub fn new(bindings: usize, restore: impl FnOnce() + Send + 'a) -> Self {
        Self {
            restore: Some(Box::new(restore)),
            bindings,
        }
    }

    /// Number of bindings this guard rewrote.
    pub fn bindings(&self) -> usize {
        self.bindings
    }

    pub fn is_active(&self) -> bool {
        self.restore.is_some()
    }

    /// Restore now instead of at end of scope.
    pub fn restore(mut self) {
        self.run_restore();
    }

    fn run_restore(&mut self) {
        if let Some(restore) = self.restore.take() {
            restore();
            debug!(bindings = self.bindings, "Restored scoped bindings");
        }
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.run_restore();
    }
}

impl<T> ScopeInjector<T> for Namespace<T>
where
    T: ?Sized + Send + Sync,
{
    fn install<'a>(
        &'a self,
        original: &Arc<T>,
        replacement: Arc<T>,
    ) -> ScopeResult<ScopeGuard<'a>> {
        let replaced = self.replace_matching(original, &replacement);
        if replaced.is_empty() {
            warn!(namespace = %self.name(), "No binding refers to the original");
            return Err(ScopeError::BindingNotFound);
        }
        debug!(namespace = %self.name(), names = ?replaced, "Installed replacement");

        let original = original.clone();
        Ok(ScopeGuard::new(replaced.len(), move || {
            self.restore(&replaced, &original);
        }))
    }
}

/// An ordered set of namespaces searched together, innermost first.
///
/// Installing through a stack is all-or-nothing: either every namespace
/// that refers to the original is rewritten, or none are.
pub struct ScopeStack<'s, T: ?Sized> {
    frames: Vec<&'s Namespace<T>>,
}

impl<T: ?Sized> fmt::Debug for ScopeStack<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.frames.iter().map(|ns| ns.name()))
            .finish()
    }
}

impl<T: ?Sized> Default for ScopeStack<'_, T> {
    fn default() -> Self {
        Self { frames: Vec::new() }
    }
}

impl<'s, T: ?Sized> ScopeStack<'s, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, namespace: &'s Namespace<T>) -> Self {
        self.frames.push(namespace);
        self
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Resolve `name` in the first frame that binds it.
    pub fn resolve(&self, name: &str) -> ScopeResult<Arc<T>> {
        self.frames
            .iter()
            .find_map(|ns| ns.get(name))
            .ok_or_else(|| ScopeError::NameNotBound {
                namespace: self
                    .frames
                    .iter()
                    .map(|ns| ns.name())
                    .collect::<Vec<_>>()
                    .join(","),
                name: name.to_string(),
            })
    }
}

impl<'s, T> ScopeInjector<T> for ScopeStack<'s, T>
where
    T: ?Sized + Send + Sync,
{
    fn install<'a>(
        &'a self,
        original: &Arc<T>,
        replacement: Arc<T>,
    ) -> ScopeResult<ScopeGuard<'a>> {
        let mut touched: Vec<(&'s Namespace<T>, Vec<String>)> = Vec::new();
        for ns in &self.frames {
            let replaced = ns.replace_matching(original, &replacement);
            if !replaced.is_empty() {
                touched.push((*ns, replaced));
            }
        }
        if touched.is_empty() {
            warn!(frames = self.frames.len(), "No binding in any frame refers to the original");
            return Err(ScopeError::BindingNotFound);
        }

        let count = touched.iter().map(|(_, names)| names.len()).sum();
        debug!(frames = touched.len(), bindings = count, "Installed replacement across scopes");

        let original = original.clone();
        Ok(ScopeGuard::new(count, move || {
            for (ns, names) in touched.iter().rev() {
                ns.restore(names, &original);
            }
        }))
    }
}

/// Run `body` with `replacement` installed over `original`.
pub fn with_installed<T, I, F, O>(
    injector: &I,
    original: &Arc<T>,
    replacement: Arc<T>,
    body: F,
) -> ScopeResult<O>
where
    T: ?Sized,
    I: ScopeInjector<T> + ?Sized,
    F: FnOnce() -> O,
{
    let _guard = injector.install(original, replacement)?;
    Ok(body())
}

/// Await `body` with `replacement` installed over `original`.
///
/// The bindings stay rewritten across every suspension point of `body`, so
/// other tasks resolving the same names observe the replacement too.
pub async fn with_installed_async<T, I, Fut>(
    injector: &I,
    original: &Arc<T>,
    replacement: Arc<T>,
    body: Fut,
) -> ScopeResult<Fut::Output>
where
    T: ?Sized,
    I: ScopeInjector<T> + ?Sized,
    Fut: Future,
{
    let _guard = injector.install(original, replacement)?;
    Ok(body.await)
}
