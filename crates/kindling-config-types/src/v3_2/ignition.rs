// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Metadata section types for the 3.2.0 schema, including the platform
//! extension knobs.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::v3_1;
use crate::v3_1::ignition::{IgnitionConfig, Proxy, Security, Timeouts};
use crate::ConfigVersion;

#[derive(
    Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "camelCase")]
pub struct Ignition {
    /// Must be exactly `3.2.0` for documents of this schema.
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "IgnitionConfig::is_empty")]
    pub config: IgnitionConfig,
    #[serde(default, skip_serializing_if = "Timeouts::is_empty")]
    pub timeouts: Timeouts,
    #[serde(default, skip_serializing_if = "Security::is_empty")]
    pub security: Security,
    #[serde(default, skip_serializing_if = "Proxy::is_empty")]
    pub proxy: Proxy,
    #[serde(default, skip_serializing_if = "Extensions::is_empty")]
    pub extensions: Extensions,
}

/// Per-platform knob sets. Only the platforms that synthesize configuration
/// fragments appear here.
#[derive(
    Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "camelCase")]
pub struct Extensions {
    #[serde(default, skip_serializing_if = "AzureExtensions::is_empty")]
    pub azure: AzureExtensions,
}

impl Extensions {
    pub fn is_empty(&self) -> bool {
        self.azure.is_empty()
    }
}

/// Knobs gating the fragments the Azure expander may inject.
///
/// Each knob is tri-state: `None` (unspecified) and `Some(false)` both mean
/// the platform leaves the corresponding artifact alone, but the expander's
/// conflict rules only apply when a knob is `Some(true)`. Never collapse
/// `None` into `Some(false)`.
#[derive(
    Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "camelCase")]
pub struct AzureExtensions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sshd_drop_in_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sudoers_drop_in_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_disk_enabled: Option<bool>,
}

impl AzureExtensions {
    pub fn is_empty(&self) -> bool {
        self.user_enabled.is_none()
            && self.sshd_drop_in_enabled.is_none()
            && self.sudoers_drop_in_enabled.is_none()
            && self.resource_disk_enabled.is_none()
    }
}

impl From<v3_1::ignition::Ignition> for Ignition {
    fn from(old: v3_1::ignition::Ignition) -> Self {
        Self {
            version: ConfigVersion::V3_2.as_str().to_owned(),
            config: old.config,
            timeouts: old.timeouts,
            security: old.security,
            proxy: old.proxy,
            extensions: Extensions::default(),
        }
    }
}
