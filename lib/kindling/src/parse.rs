// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Decoding of raw document bytes into a typed, versioned configuration.
//!
//! Parsing is two-pass: a light pass reads only `ignition.version` to select
//! a schema from the registry, then the full pass decodes the buffer into
//! that schema's shape. In strict mode any field the schema does not declare
//! is an error; in lenient mode unknown fields are dropped.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use kindling_config_types::{v2_4, v3_1, v3_2, ConfigVersion, VersionedConfig};

use crate::error::ConfigError;

#[derive(Debug, Default, Deserialize)]
struct VersionSniff {
    #[serde(default)]
    ignition: IgnitionSniff,
}

#[derive(Debug, Default, Deserialize)]
struct IgnitionSniff {
    #[serde(default)]
    version: Option<String>,
}

/// Decodes `bytes` into the schema named by its `ignition.version`.
pub fn parse(bytes: &[u8], strict: bool) -> Result<VersionedConfig, ConfigError> {
    if bytes.is_empty() {
        return Err(ConfigError::Empty);
    }

    let sniff: VersionSniff =
        serde_json::from_slice(bytes).map_err(ConfigError::Malformed)?;
    let tag = sniff.ignition.version.unwrap_or_default();
    let version: ConfigVersion =
        tag.parse().map_err(|_| ConfigError::UnknownVersion(tag))?;

    Ok(match version {
        ConfigVersion::V2_4 => {
            VersionedConfig::V2_4(decode::<v2_4::Config>(bytes, strict)?)
        }
        ConfigVersion::V3_1 => {
            VersionedConfig::V3_1(decode::<v3_1::Config>(bytes, strict)?)
        }
        ConfigVersion::V3_2 => {
            VersionedConfig::V3_2(decode::<v3_2::Config>(bytes, strict)?)
        }
    })
}

fn decode<T: DeserializeOwned>(
    bytes: &[u8],
    strict: bool,
) -> Result<T, ConfigError> {
    if !strict {
        return serde_json::from_slice(bytes).map_err(ConfigError::Malformed);
    }

    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    let mut unknown: Option<String> = None;
    let config = serde_ignored::deserialize(&mut deserializer, |path| {
        // Only the first unknown field is reported; one is enough to fail
        // the strict decode.
        if unknown.is_none() {
            unknown = Some(path.to_string());
        }
    })
    .map_err(ConfigError::Malformed)?;

    match unknown {
        Some(field) => Err(ConfigError::UnknownField(field)),
        None => Ok(config),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_buffer() {
        assert!(matches!(parse(b"", true), Err(ConfigError::Empty)));
    }

    #[test]
    fn malformed_json() {
        assert!(matches!(
            parse(b"{\"ignition\":", true),
            Err(ConfigError::Malformed(_))
        ));
    }

    #[test]
    fn missing_and_unknown_versions() {
        assert!(matches!(
            parse(b"{}", true),
            Err(ConfigError::UnknownVersion(v)) if v.is_empty()
        ));
        assert!(matches!(
            parse(br#"{"ignition": {"version": "9.9.9"}}"#, true),
            Err(ConfigError::UnknownVersion(v)) if v == "9.9.9"
        ));
        assert!(matches!(
            parse(br#"{"ignition": {"version": "bogus"}}"#, true),
            Err(ConfigError::UnknownVersion(v)) if v == "bogus"
        ));
    }

    #[test]
    fn version_selects_schema() {
        let parsed =
            parse(br#"{"ignition": {"version": "2.4.0"}}"#, true).unwrap();
        assert_eq!(parsed.version(), ConfigVersion::V2_4);

        let parsed = parse(
            br#"{"ignition": {"version": "3.2.0"},
                 "storage": {"files": [{"path": "/etc/motd"}]}}"#,
            true,
        )
        .unwrap();
        let VersionedConfig::V3_2(config) = parsed else {
            panic!("expected a 3.2 document");
        };
        assert_eq!(config.storage.files[0].path, "/etc/motd");
    }

    #[test]
    fn strict_mode_rejects_unknown_fields() {
        let doc = br#"{"ignition": {"version": "3.2.0", "flavor": "mild"}}"#;
        assert!(matches!(
            parse(doc, true),
            Err(ConfigError::UnknownField(field)) if field == "ignition.flavor"
        ));

        // The same document is fine in lenient mode.
        assert!(parse(doc, false).is_ok());
    }

    #[test]
    fn tristate_null_is_preserved() {
        let doc = br#"{
            "ignition": {
                "version": "3.2.0",
                "extensions": {"azure": {"userEnabled": false}}
            }
        }"#;
        let VersionedConfig::V3_2(config) = parse(doc, true).unwrap() else {
            panic!("expected a 3.2 document");
        };
        let azure = &config.ignition.extensions.azure;
        assert_eq!(azure.user_enabled, Some(false));
        assert_eq!(azure.sshd_drop_in_enabled, None);
    }
}
