// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cross-version types for the Kindling provisioning configuration.
//!
//! Each registered schema version gets its own module (`v2_4`, `v3_1`,
//! `v3_2`) containing the complete wire shapes for that version. A version
//! that leaves a section unchanged reuses the previous version's types
//! directly rather than redeclaring them; the `latest` module re-exports the
//! newest version of everything so that business logic never has to name a
//! versioned identifier.
//!
//! # Versioning and compatibility
//!
//! Changes to structs and enums in these modules must be backward-compatible
//! (i.e. new code must be able to deserialize documents written by old
//! versions of the module). Breaking changes to a document shape must be
//! turned into a new schema version with a registered translation edge.

pub mod impls;
pub mod latest;
pub mod v2_4;
pub mod v3_1;
pub mod v3_2;

mod version;

pub use version::ConfigVersion;

/// A parsed configuration document tagged with its schema version.
///
/// Every pipeline stage consumes one of these and produces a new one; no
/// stage mutates a document in place.
#[derive(Clone, Debug, PartialEq)]
pub enum VersionedConfig {
    V2_4(v2_4::Config),
    V3_1(v3_1::Config),
    V3_2(v3_2::Config),
}

impl VersionedConfig {
    /// Returns the schema version this document conforms to.
    pub fn version(&self) -> ConfigVersion {
        match self {
            VersionedConfig::V2_4(_) => ConfigVersion::V2_4,
            VersionedConfig::V3_1(_) => ConfigVersion::V3_1,
            VersionedConfig::V3_2(_) => ConfigVersion::V3_2,
        }
    }
}
