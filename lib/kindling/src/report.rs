// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Structured findings produced by validation and extension expansion.
//!
//! A [`Report`] is an ordered list of entries, each tagged with the path of
//! the document node it concerns. Reports never short-circuit: a validator
//! appends everything it finds and the caller decides whether the presence
//! of error-severity entries is fatal.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use thiserror::Error;

use kindling_config_types::ConfigVersion;

use crate::types::impls::resource::ResourceError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum Segment {
    Name(&'static str),
    Index(usize),
}

/// The location of a document node, built from field-name and index
/// segments as validation descends the tree.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ContextPath {
    segments: Vec<Segment>,
}

impl ContextPath {
    pub fn root() -> Self {
        Self::default()
    }

    /// Returns a copy of this path extended with a field name.
    pub fn field(&self, name: &'static str) -> Self {
        let mut next = self.clone();
        next.segments.push(Segment::Name(name));
        next
    }

    /// Returns a copy of this path extended with a collection index.
    pub fn index(&self, index: usize) -> Self {
        let mut next = self.clone();
        next.segments.push(Segment::Index(index));
        next
    }
}

impl std::fmt::Display for ContextPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("$")?;
        for segment in &self.segments {
            match segment {
                Segment::Name(name) => write!(f, ".{name}")?,
                Segment::Index(index) => write!(f, ".{index}")?,
            }
        }
        Ok(())
    }
}

/// Everything a validator or the extension expander can find wrong (or
/// noteworthy) about a document.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("version is {found:?}, expected {expected}")]
    VersionMismatch { expected: ConfigVersion, found: String },

    #[error("path {0:?} is not absolute")]
    PathNotAbsolute(String),

    #[error("path {0:?} is not in canonical form")]
    PathNotCanonical(String),

    #[error("the root directory cannot be a node")]
    PathIsRoot,

    #[error("path {0:?} appears more than once")]
    DuplicatePath(String),

    #[error("path {0:?} is claimed by nodes of different kinds")]
    PathConflict(String),

    #[error("link {0:?} targets its own path")]
    LinkTargetsSelf(String),

    #[error("hard link {path:?} targets {target:?} on another filesystem")]
    HardLinkCrossesFilesystems { path: String, target: String },

    #[error("filesystem device must not be empty")]
    EmptyDevice,

    #[error("unsupported filesystem format {0:?}")]
    UnknownFilesystemFormat(String),

    #[error("filesystem declares neither a mount nor a path")]
    FilesystemWithoutSource,

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error("{0:?} is not a valid GUID")]
    InvalidGuid(String),

    #[error("partition number {0} appears more than once on this disk")]
    DuplicatePartitionNumber(i64),

    #[error("partition label {0:?} appears more than once on this disk")]
    DuplicatePartitionLabel(String),

    #[error("partition {0} specifies geometry but shouldExist=false")]
    AbsentPartitionWithGeometry(i64),

    #[error("unsupported RAID level {0:?}")]
    UnknownRaidLevel(String),

    #[error("RAID level {0:?} does not support spares")]
    SparesUnsupportedForLevel(String),

    #[error("unit name {0:?} lacks a valid unit suffix")]
    InvalidUnitName(String),

    #[error("dropin name {0:?} must end in .conf")]
    InvalidDropinName(String),

    #[error("unit {0:?} is enabled or masked but defines no behavior")]
    EmptyUnit(String),

    #[error("mode {0:#o} is out of range")]
    ModeOutOfRange(u32),

    #[error("user {0:?} is defined more than once")]
    DuplicateUserName(String),

    #[error("group {0:?} is defined more than once")]
    DuplicateGroupName(String),

    #[error("{0} is deprecated and will be rewritten on translation")]
    Deprecated(&'static str),

    #[error("file or link collides with the platform-managed sshd drop-in")]
    SshdDropInConflict,

    #[error("file or link collides with the platform-managed sudoers drop-in")]
    SudoersDropInConflict,

    #[error("entity collides with the platform-managed resource disk mount")]
    ResourceDiskConflict,

    #[error("user {0:?} collides with the platform-managed admin user")]
    AdminUserConflict(String),
}

impl ValidationError {
    /// A stable machine-readable code for this finding.
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::VersionMismatch { .. } => "version-mismatch",
            ValidationError::PathNotAbsolute(_) => "path-not-absolute",
            ValidationError::PathNotCanonical(_) => "path-not-canonical",
            ValidationError::PathIsRoot => "path-is-root",
            ValidationError::DuplicatePath(_) => "duplicate-path",
            ValidationError::PathConflict(_) => "path-conflict",
            ValidationError::LinkTargetsSelf(_) => "link-targets-self",
            ValidationError::HardLinkCrossesFilesystems { .. } => {
                "hard-link-crosses-filesystems"
            }
            ValidationError::EmptyDevice => "empty-device",
            ValidationError::UnknownFilesystemFormat(_) => "unknown-format",
            ValidationError::FilesystemWithoutSource => {
                "filesystem-without-source"
            }
            ValidationError::Resource(_) => "bad-resource",
            ValidationError::InvalidGuid(_) => "invalid-guid",
            ValidationError::DuplicatePartitionNumber(_) => {
                "duplicate-partition-number"
            }
            ValidationError::DuplicatePartitionLabel(_) => {
                "duplicate-partition-label"
            }
            ValidationError::AbsentPartitionWithGeometry(_) => {
                "absent-partition-with-geometry"
            }
            ValidationError::UnknownRaidLevel(_) => "unknown-raid-level",
            ValidationError::SparesUnsupportedForLevel(_) => {
                "spares-unsupported"
            }
            ValidationError::InvalidUnitName(_) => "invalid-unit-name",
            ValidationError::InvalidDropinName(_) => "invalid-dropin-name",
            ValidationError::EmptyUnit(_) => "empty-unit",
            ValidationError::ModeOutOfRange(_) => "mode-out-of-range",
            ValidationError::DuplicateUserName(_) => "duplicate-user",
            ValidationError::DuplicateGroupName(_) => "duplicate-group",
            ValidationError::Deprecated(_) => "deprecated",
            ValidationError::SshdDropInConflict => "azure-sshd-conflict",
            ValidationError::SudoersDropInConflict => "azure-sudoers-conflict",
            ValidationError::ResourceDiskConflict => {
                "azure-resource-disk-conflict"
            }
            ValidationError::AdminUserConflict(_) => "azure-user-conflict",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Entry {
    pub path: ContextPath,
    pub severity: Severity,
    pub error: ValidationError,
}

impl Serialize for Entry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut entry = serializer.serialize_struct("Entry", 4)?;
        entry.serialize_field("path", &self.path.to_string())?;
        entry.serialize_field("severity", &self.severity)?;
        entry.serialize_field("code", self.error.code())?;
        entry.serialize_field("message", &self.error.to_string())?;
        entry.end()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Report {
    entries: Vec<Entry>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        path: ContextPath,
        severity: Severity,
        error: ValidationError,
    ) {
        self.entries.push(Entry { path, severity, error });
    }

    pub fn add_error(&mut self, path: ContextPath, error: ValidationError) {
        self.add(path, Severity::Error, error);
    }

    pub fn add_warning(&mut self, path: ContextPath, error: ValidationError) {
        self.add(path, Severity::Warning, error);
    }

    pub fn add_info(&mut self, path: ContextPath, error: ValidationError) {
        self.add(path, Severity::Info, error);
    }

    /// Appends all of `other`'s entries, preserving order.
    pub fn merge(&mut self, other: Report) {
        self.entries.extend(other.entries);
    }

    /// A report is fatal iff it contains at least one error-severity entry.
    pub fn is_fatal(&self) -> bool {
        self.entries.iter().any(|e| e.severity == Severity::Error)
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn paths_render_with_indices() {
        let path = ContextPath::root()
            .field("storage")
            .field("files")
            .index(3)
            .field("path");
        assert_eq!(path.to_string(), "$.storage.files.3.path");
        assert_eq!(ContextPath::root().to_string(), "$");
    }

    #[test]
    fn fatality_requires_an_error_entry() {
        let mut report = Report::new();
        assert!(!report.is_fatal());

        report.add_warning(
            ContextPath::root(),
            ValidationError::Deprecated("networkd units"),
        );
        assert!(!report.is_fatal());

        report.add_error(ContextPath::root(), ValidationError::PathIsRoot);
        assert!(report.is_fatal());
    }

    #[test]
    fn entries_serialize_with_code_and_message() {
        let mut report = Report::new();
        report.add_error(
            ContextPath::root().field("storage").field("files").index(0),
            ValidationError::DuplicatePath("/etc/hosts".into()),
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{
                "path": "$.storage.files.0",
                "severity": "error",
                "code": "duplicate-path",
                "message": "path \"/etc/hosts\" appears more than once",
            }])
        );
    }
}
