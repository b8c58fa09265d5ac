// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Metadata section types for the 2.4.0 schema.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(
    Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "camelCase")]
pub struct Ignition {
    /// Must be exactly `2.4.0` for documents of this schema.
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
}

/// Referenced documents to combine with this one. The combination itself is
/// performed by the caller; the core only carries the references.
#[derive(
    Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "camelCase")]
pub struct IgnitionConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub append: Vec<ConfigReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replace: Option<ConfigReference>,
}

impl IgnitionConfig {
    pub fn is_empty(&self) -> bool {
        self.append.is_empty() && self.replace.is_none()
    }
}

#[derive(
    Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "camelCase")]
pub struct ConfigReference {
    #[serde(default)]
    pub source: String,
    #[serde(default, skip_serializing_if = "Verification::is_unset")]
    pub verification: Verification,
}

/// A reference to a TLS certificate authority to trust while fetching.
#[derive(
    Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "camelCase")]
pub struct CaReference {
    #[serde(default)]
    pub source: String,
    #[serde(default, skip_serializing_if = "Verification::is_unset")]
    pub verification: Verification,
}

#[derive(
    Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    /// A `<function>-<hex digest>` string covering the referenced contents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl Verification {
    pub fn is_unset(&self) -> bool {
        self.hash.is_none()
    }
}

#[derive(
    Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "camelCase")]
pub struct Timeouts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_response_headers: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_total: Option<u32>,
}

impl Timeouts {
    pub fn is_empty(&self) -> bool {
        self.http_response_headers.is_none() && self.http_total.is_none()
    }
}

#[derive(
    Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "camelCase")]
pub struct Security {
    #[serde(default, skip_serializing_if = "Tls::is_empty")]
    pub tls: Tls,
}

impl Security {
    pub fn is_empty(&self) -> bool {
        self.tls.is_empty()
    }
}

#[derive(
    Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "camelCase")]
pub struct Tls {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub certificate_authorities: Vec<CaReference>,
}

impl Tls {
    pub fn is_empty(&self) -> bool {
        self.certificate_authorities.is_empty()
    }
}

#[derive(
    Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "camelCase")]
pub struct Proxy {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub http_proxy: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub https_proxy: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub no_proxy: Vec<String>,
}

impl Proxy {
    pub fn is_empty(&self) -> bool {
        self.http_proxy.is_empty()
            && self.https_proxy.is_empty()
            && self.no_proxy.is_empty()
    }
}
