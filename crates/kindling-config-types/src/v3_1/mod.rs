// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Version 3.1.0 of the provisioning schema.
//!
//! The modern line of the format: every node carries an absolute path,
//! remote content of any kind is a uniform [`ignition::Resource`], file
//! appends are an ordered list of resources, and most scalars are optional
//! so that "unspecified" is distinguishable from an explicit value.

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
    #[serde(default, skip_serializing_if = "passwd::Passwd::is_empty")]
    pub passwd: passwd::Passwd,
}
