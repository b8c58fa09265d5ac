// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The full preparation flow, wired together in the order the stages are
//! meant to run: parse, validate, translate to the latest version,
//! revalidate, dedup, expand platform extensions, and validate once more.
//!
//! Every stage either passes a complete document along or fails the run;
//! nothing partial ever escapes. The returned report carries the
//! non-fatal findings from the initial and final validations.

use slog::Logger;

use kindling_config_types::{latest, ConfigVersion, VersionedConfig};

use crate::error::ConfigError;
use crate::extensions::azure::AzureInputs;
use crate::report::Report;
use crate::translate::FsMap;
use crate::{dedup, extensions, parse, translate, validate};

#[derive(Clone, Copy, Debug, Default)]
pub struct Options<'a> {
    /// Reject fields the schema does not declare.
    pub strict: bool,
    /// Seed entries for the 2.x → 3.x filesystem map.
    pub fs_map: Option<&'a FsMap>,
    /// When present, run the Azure expander over the finished document.
    pub azure: Option<AzureInputs<'a>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Outcome {
    pub config: latest::Config,
    pub report: Report,
}

/// Runs the whole pipeline over raw document bytes.
pub fn run(
    log: &Logger,
    bytes: &[u8],
    options: &Options<'_>,
) -> Result<Outcome, ConfigError> {
    let doc = parse::parse(bytes, options.strict)?;

    let mut report = validate::validate(&doc);
    if report.is_fatal() {
        return Err(ConfigError::Invalid(report));
    }

    let doc = translate::translate(doc, ConfigVersion::LATEST, options.fs_map)?;
    let recheck = validate::validate(&doc);
    if recheck.is_fatal() {
        return Err(ConfigError::Invalid(recheck));
    }

    let VersionedConfig::V3_2(config) = doc else {
        // translate() was asked for the latest version.
        unreachable!("translation to the latest version yields a 3.2 doc")
    };
    let config = dedup::dedup(config);

    let config = match &options.azure {
        Some(inputs) => extensions::expand(
            log,
            config,
            extensions::Platform::Azure,
            inputs,
        )?,
        None => config,
    };

    let check = validate::validate(&VersionedConfig::V3_2(config.clone()));
    if check.is_fatal() {
        return Err(ConfigError::Invalid(check));
    }
    report.merge(check);

    Ok(Outcome { config, report })
}
