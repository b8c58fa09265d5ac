// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Errors surfaced at the crate boundary.

use thiserror::Error;

use kindling_config_types::ConfigVersion;

use crate::extensions::ExpandError;
use crate::report::Report;
use crate::translate::TranslateError;
use crate::types::impls::resource::ResourceError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config is empty")]
    Empty,

    #[error("config is malformed")]
    Malformed(#[source] serde_json::Error),

    #[error("unsupported config version {0:?}")]
    UnknownVersion(String),

    #[error("unknown config field {0:?}")]
    UnknownField(String),

    #[error("no translation path from {from} to {to}")]
    UnreachableVersion { from: ConfigVersion, to: ConfigVersion },

    #[error("config failed validation")]
    Invalid(Report),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Translate(#[from] TranslateError),

    #[error(transparent)]
    Expand(#[from] ExpandError),
}
