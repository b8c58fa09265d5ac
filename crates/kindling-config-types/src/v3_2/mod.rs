// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Version 3.2.0 of the provisioning schema.
//!
//! This version adds the `ignition.extensions` block holding the
//! per-platform knob sets; the storage, systemd, and passwd sections are
//! unchanged from 3.1 and reuse its types directly.

pub mod ignition;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::v3_1;

#[derive(
    Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub ignition: ignition::Ignition,
    #[serde(default, skip_serializing_if = "v3_1::storage::Storage::is_empty")]
    pub storage: v3_1::storage::Storage,
    #[serde(default, skip_serializing_if = "v3_1::systemd::Systemd::is_empty")]
    pub systemd: v3_1::systemd::Systemd,
    #[serde(default, skip_serializing_if = "v3_1::passwd::Passwd::is_empty")]
    pub passwd: v3_1::passwd::Passwd,
}

// Conversions from v3_1 Config to v3_2 Config. The lift is structural; the
// version tag is rewritten and the extensions block starts out empty.
impl From<v3_1::Config> for Config {
    fn from(old: v3_1::Config) -> Self {
        Self {
            ignition: old.ignition.into(),
            storage: old.storage,
            systemd: old.systemd,
            passwd: old.passwd,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    // Verifies the wire shape: camelCase keys, the MiB spellings, and
    // omission of everything unset.
    #[test]
    fn wire_format_roundtrip() {
        let doc = serde_json::json!({
            "ignition": {
                "version": "3.2.0",
                "extensions": {"azure": {"userEnabled": true}}
            },
            "storage": {
                "disks": [{
                    "device": "/dev/sda",
                    "wipeTable": true,
                    "partitions": [{
                        "number": 1,
                        "sizeMiB": 5000,
                        "startMiB": 2048,
                        "typeGuid": "9d6e42cd-dcef-4177-b4c6-2a0c979e3d82"
                    }]
                }],
                "files": [{
                    "path": "/etc/hostname",
                    "mode": 420,
                    "contents": {"source": "data:,shard-12"}
                }]
            }
        });

        let config: Config = serde_json::from_value(doc.clone()).unwrap();
        assert_eq!(config.ignition.extensions.azure.user_enabled, Some(true));
        assert_eq!(config.ignition.extensions.azure.sshd_drop_in_enabled, None);
        assert_eq!(config.storage.disks[0].partitions[0].size_mib, Some(5000));

        // Unset optionals do not reappear on the way out.
        let emitted = serde_json::to_value(&config).unwrap();
        assert_eq!(emitted, doc);
    }
}
