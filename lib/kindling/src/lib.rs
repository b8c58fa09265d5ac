// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The Kindling configuration core.
//!
//! Kindling consumes a declarative first-boot configuration document and
//! prepares it for the execution stages that realize it on the host. This
//! crate is the purely functional heart of that process:
//!
//! - [`parse()`] sniffs a document's schema version and decodes it into
//!   the matching typed shape;
//! - [`validate()`] walks a typed document and produces an ordered
//!   [`Report`] of findings without ever short-circuiting;
//! - [`translate()`] lifts a document along the registered chain of
//!   single-hop version edges, inventing state (the [`FsMap`]) where the
//!   old schema kept it implicit;
//! - [`dedup`](dedup::dedup) canonicalizes duplicated entities within the
//!   latest schema;
//! - [`extensions`] expands platform knobs into synthesized fragments,
//!   refusing to merge anything that collides with user-authored content.
//!
//! Nothing in this crate touches the host: every operation consumes a
//! document and returns a new document plus a report. Fetching remote
//! resources, partitioning disks, and talking to the service manager are
//! the callers' business.

pub mod dedup;
pub mod error;
pub mod extensions;
pub mod parse;
pub mod pipeline;
pub mod report;
pub mod translate;
mod util;
pub mod validate;

pub use error::ConfigError;
pub use parse::parse;
pub use report::{Report, Severity};
pub use translate::{translate, FsMap};
pub use validate::validate;

pub use kindling_config_types as types;
pub use kindling_config_types::{ConfigVersion, VersionedConfig};
