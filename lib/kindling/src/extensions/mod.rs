// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Platform extension expansion.
//!
//! Each platform that synthesizes configuration fragments gets an expander
//! here. Expanders run on latest-version documents, gate every injection on
//! the knobs under `ignition.extensions.<platform>`, and refuse to merge
//! anything that collides with user-authored content; on conflict the
//! document comes through untouched.

pub mod azure;
pub mod crypt;

use thiserror::Error;

use kindling_config_types::latest;

use crate::report::Report;

/// Platforms with a registered expander.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Platform {
    Azure,
}

#[derive(Debug, Error)]
pub enum ExpandError {
    #[error("platform extensions conflict with user configuration")]
    Conflict(Report),

    #[error("no admin username available from platform metadata")]
    MissingAdminUsername,

    #[error("failed to parse instance metadata")]
    Metadata(#[source] serde_json::Error),

    #[error("failed to parse provisioning document")]
    Provisioning(#[source] quick_xml::DeError),

    #[error("provisioning document is empty")]
    EmptyProvisioning,

    #[error("custom data is not valid base64")]
    CustomData(#[source] base64::DecodeError),
}

/// Expands `platform`'s knobs over `config`.
pub fn expand(
    log: &slog::Logger,
    config: latest::Config,
    platform: Platform,
    inputs: &azure::AzureInputs<'_>,
) -> Result<latest::Config, ExpandError> {
    match platform {
        Platform::Azure => azure::apply_extensions(log, config, inputs),
    }
}
