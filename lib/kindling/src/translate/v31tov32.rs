// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The 3.1.0 → 3.2.0 translation edge.
//!
//! A structural lift: 3.2 adds the extensions block and changes nothing
//! else, so the conversion is the `From` impl in the types crate and cannot
//! fail.

use kindling_config_types::{v3_1, v3_2};

/// Lifts a 3.1.0 document to 3.2.0 with an empty extensions block.
pub fn translate(config: v3_1::Config) -> v3_2::Config {
    config.into()
}

#[cfg(test)]
mod test {
    use kindling_config_types::ConfigVersion;

    use super::*;

    #[test]
    fn lift_rewrites_only_the_version() {
        let old = v3_1::Config {
            ignition: v3_1::ignition::Ignition {
                version: "3.1.0".to_owned(),
                proxy: v3_1::ignition::Proxy {
                    http_proxy: Some("https://proxy.example.net/".to_owned()),
                    ..Default::default()
                },
                ..Default::default()
            },
            storage: v3_1::storage::Storage {
                files: vec![v3_1::storage::File {
                    path: "/etc/motd".to_owned(),
                    ..Default::default()
                }],
                ..Default::default()
            },
            ..Default::default()
        };

        let new = translate(old.clone());
        assert_eq!(new.ignition.version, ConfigVersion::V3_2.as_str());
        assert!(new.ignition.extensions.is_empty());
        assert_eq!(new.ignition.proxy, old.ignition.proxy);
        assert_eq!(new.storage, old.storage);
        assert_eq!(new.systemd, old.systemd);
        assert_eq!(new.passwd, old.passwd);
    }
}
