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

//! Scoped registration handles.

use crate::adapter::HookId;
use crate::error::HookKind;
use std::fmt;
use std::sync::Weak;

/// Something that owns hook lists and can drop an entry by identity.
pub(crate) trait HookOwner: Send + Sync {
    fn remove_hook(&self, kind: HookKind, id: HookId) -> bool;
    fn contains_hook(&self, kind: HookKind, id: HookId) -> bool;
}

/// Release token for one registration.
///
/// The hook is removed when the handle is released or dropped, so a handle
/// bound to a local removes its hook when the scope exits, including early
/// returns and unwinding. Call [`HookHandle::detach`] to keep the hook for
/// the lifetime of the chain instead.
#[must_use = "dropping a HookHandle removes its hook; call `detach()` to keep it registered"]
pub struct HookHandle {
    owner: Weak<dyn HookOwner>,
    kind: HookKind,
    id: HookId,
    armed: bool,
}

impl HookHandle {
    pub(crate) fn new(owner: Weak<dyn HookOwner>, kind: HookKind, id: HookId) -> Self {
        Self {
            owner,
            kind,
            id,
            armed: true,
        }
    }

    pub fn id(&self) -> HookId {
        self.id
    }

    pub fn kind(&self) -> HookKind {
        self.kind
    }

    /// Whether the hook is still present in its owning list.
    pub fn is_attached(&self) -> bool {
        self.owner
            .upgrade()
            .map(|owner| owner.contains_hook(self.kind, self.id))
            .unwrap_or(false)
    }

    /// Remove the hook now. Returns `false` if it was already gone.
    pub fn release(mut self) -> bool {
        self.disarm_and_remove()
    }

    /// Keep the hook registered and give up the ability to remove it.
    pub fn detach(mut self) -> HookId {
        self.armed = false;
        self.id
    }

    fn disarm_and_remove(&mut self) -> bool {
        if !std::mem::replace(&mut self.armed, false) {
            return false;
        }
        match self.owner.upgrade() {
            Some(owner) => owner.remove_hook(self.kind, self.id),
            None => false,
        }
    }
}

impl Drop for HookHandle {
    fn drop(&mut self) {
        self.disarm_and_remove();
    }
}

impl fmt::Debug for HookHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookHandle")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("armed", &self.armed)
            .finish()
    }
}
