// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Version 2.4.0 of the provisioning schema.
//!
//! This is the legacy line of the format: nodes name the filesystem they
//! live on and give a path relative to its mountpoint, remote references are
//! split into several single-purpose record types, and a number of
//! deprecated constructs (`mount.create`, networkd units, the `user.create`
//! sub-object, the plain-bool unit `enable`) are still part of the shape.
//! All of these are re-expressed by the 2.4 → 3.1 translation edge.

pub mod ignition;
pub mod passwd;
pub mod storage;
pub mod systemd;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(
    Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub ignition: ignition::Ignition,
    #[serde(default, skip_serializing_if = "storage::Storage::is_empty")]
    pub storage: storage::Storage,
    #[serde(default, skip_serializing_if = "systemd::Systemd::is_empty")]
    pub systemd: systemd::Systemd,
    #[serde(default, skip_serializing_if = "systemd::Networkd::is_empty")]
    pub networkd: systemd::Networkd,
    #[serde(default, skip_serializing_if = "passwd::Passwd::is_empty")]
    pub passwd: passwd::Passwd,
}
