// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Functional code for storage nodes: the semantic defaults the execution
//! stages apply to unset fields.

use crate::latest::storage::{Directory, File, Link};

impl File {
    /// The effective overwrite policy once defaults apply: a file with
    /// contents replaces whatever is on disk unless told otherwise, while a
    /// contentless file leaves an existing file in place.
    pub fn effective_overwrite(&self) -> bool {
        self.overwrite.unwrap_or_else(|| {
            self.contents.source.as_deref().is_some_and(|s| !s.is_empty())
        })
    }
}

impl Directory {
    /// Directories never clobber by default.
    pub fn effective_overwrite(&self) -> bool {
        self.overwrite.unwrap_or(false)
    }
}

impl Link {
    /// Links always have a target, so they overwrite by default.
    pub fn effective_overwrite(&self) -> bool {
        self.overwrite.unwrap_or(true)
    }
}
