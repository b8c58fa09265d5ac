// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The validator for 3.2.0 documents (and, via the structural lift, for
//! 3.1.0 documents).

use std::collections::BTreeSet;

use kindling_config_types::latest::ignition::Resource;
use kindling_config_types::{v3_2, ConfigVersion};

use crate::report::{ContextPath, Report, ValidationError};

use super::{
    check_dropin_name, check_filesystem_format, check_guid, check_mode,
    check_node_path, check_raid, check_unit_name, NodeIndex, NodeKind,
};

pub(crate) fn validate(config: &v3_2::Config) -> Report {
    validate_lifted(config, ConfigVersion::V3_2, &config.ignition.version)
}

/// Validates `config`, checking the version tag of the document it was
/// lifted from against `expected`. Lifting rewrites the embedded tag, so
/// the original must be supplied separately.
pub(crate) fn validate_lifted(
    config: &v3_2::Config,
    expected: ConfigVersion,
    version_tag: &str,
) -> Report {
    let mut report = Report::new();
    let root = ContextPath::root();

    if version_tag != expected.as_str() {
        report.add_error(
            root.field("ignition").field("version"),
            ValidationError::VersionMismatch {
                expected,
                found: version_tag.to_owned(),
            },
        );
    }

    validate_ignition(&config.ignition, root.field("ignition"), &mut report);
    validate_storage(&config.storage, root.field("storage"), &mut report);
    validate_systemd(&config.systemd, root.field("systemd"), &mut report);
    validate_passwd(&config.passwd, root.field("passwd"), &mut report);

    report
}

fn check_resource(resource: &Resource, at: &ContextPath, report: &mut Report) {
    if let Err(err) = resource.check_source_scheme() {
        report.add_error(at.field("source"), err.into());
    }
    if let Some(Err(err)) = resource.verification.parsed_hash() {
        report.add_error(
            at.field("verification").field("hash"),
            err.into(),
        );
    }
}

fn validate_ignition(
    ignition: &v3_2::ignition::Ignition,
    at: ContextPath,
    report: &mut Report,
) {
    let config = at.field("config");
    for (i, merged) in ignition.config.merge.iter().enumerate() {
        check_resource(merged, &config.field("merge").index(i), report);
    }
    check_resource(&ignition.config.replace, &config.field("replace"), report);

    let authorities = at
        .field("security")
        .field("tls")
        .field("certificateAuthorities");
    for (i, authority) in
        ignition.security.tls.certificate_authorities.iter().enumerate()
    {
        check_resource(authority, &authorities.index(i), report);
    }
}

fn validate_storage(
    storage: &kindling_config_types::latest::storage::Storage,
    at: ContextPath,
    report: &mut Report,
) {
    for (i, disk) in storage.disks.iter().enumerate() {
        let disk_at = at.field("disks").index(i);
        if disk.device.is_empty() {
            report.add_error(
                disk_at.field("device"),
                ValidationError::EmptyDevice,
            );
        }

        let mut numbers = BTreeSet::new();
        let mut labels = BTreeSet::new();
        for (j, partition) in disk.partitions.iter().enumerate() {
            let partition_at = disk_at.field("partitions").index(j);
            if !numbers.insert(partition.number) {
                report.add_error(
                    partition_at.field("number"),
                    ValidationError::DuplicatePartitionNumber(
                        partition.number,
                    ),
                );
            }
            if let Some(label) = partition.label.as_deref() {
                if !label.is_empty() && !labels.insert(label.to_owned()) {
                    report.add_error(
                        partition_at.field("label"),
                        ValidationError::DuplicatePartitionLabel(
                            label.to_owned(),
                        ),
                    );
                }
            }
            if partition.should_exist == Some(false)
                && (partition.size_mib.is_some()
                    || partition.start_mib.is_some())
            {
                report.add_error(
                    partition_at.field("shouldExist"),
                    ValidationError::AbsentPartitionWithGeometry(
                        partition.number,
                    ),
                );
            }
            if let Some(guid) = partition.type_guid.as_deref() {
                check_guid(guid, partition_at.field("typeGuid"), report);
            }
            if let Some(guid) = partition.guid.as_deref() {
                check_guid(guid, partition_at.field("guid"), report);
            }
        }
    }

    for (i, raid) in storage.raid.iter().enumerate() {
        let raid_at = at.field("raid").index(i);
        check_raid(
            &raid.level,
            raid.spares.unwrap_or(0),
            &raid_at,
            report,
        );
    }

    let mut filesystem_paths: Vec<&str> = Vec::new();
    for (i, filesystem) in storage.filesystems.iter().enumerate() {
        let fs_at = at.field("filesystems").index(i);
        if filesystem.device.is_empty() {
            report
                .add_error(fs_at.field("device"), ValidationError::EmptyDevice);
        }
        if let Some(format) = filesystem.format.as_deref() {
            check_filesystem_format(format, fs_at.field("format"), report);
        }
        if let Some(path) = filesystem.path.as_deref() {
            if !path.starts_with('/') {
                report.add_error(
                    fs_at.field("path"),
                    ValidationError::PathNotAbsolute(path.to_owned()),
                );
            } else if !crate::util::is_clean_abs_path(path) {
                report.add_error(
                    fs_at.field("path"),
                    ValidationError::PathNotCanonical(path.to_owned()),
                );
            } else {
                filesystem_paths.push(path);
            }
        }
    }

    let mut nodes = NodeIndex::default();

    for (i, file) in storage.files.iter().enumerate() {
        let file_at = at.field("files").index(i);
        check_node_path(&file.path, file_at.field("path"), report);
        nodes.claim(&file.path, NodeKind::File, file_at.field("path"), report);
        check_mode(file.mode, file_at.field("mode"), report);
        check_resource(&file.contents, &file_at.field("contents"), report);
        for (j, appended) in file.append.iter().enumerate() {
            check_resource(appended, &file_at.field("append").index(j), report);
        }
    }

    for (i, directory) in storage.directories.iter().enumerate() {
        let dir_at = at.field("directories").index(i);
        check_node_path(&directory.path, dir_at.field("path"), report);
        nodes.claim(
            &directory.path,
            NodeKind::Directory,
            dir_at.field("path"),
            report,
        );
        check_mode(directory.mode, dir_at.field("mode"), report);
    }

    for (i, link) in storage.links.iter().enumerate() {
        let link_at = at.field("links").index(i);
        check_node_path(&link.path, link_at.field("path"), report);
        nodes.claim(&link.path, NodeKind::Link, link_at.field("path"), report);

        if link.target == link.path {
            report.add_error(
                link_at.field("target"),
                ValidationError::LinkTargetsSelf(link.path.clone()),
            );
        }

        // A hard link is an extra name for an inode, so its target must
        // live on the link's own filesystem. Relative targets resolve
        // within the link's directory and cannot escape it here.
        if link.hard == Some(true) && link.target.starts_with('/') {
            let link_fs = covering_filesystem(&link.path, &filesystem_paths);
            let target_fs =
                covering_filesystem(&link.target, &filesystem_paths);
            if link_fs != target_fs {
                report.add_error(
                    link_at.field("target"),
                    ValidationError::HardLinkCrossesFilesystems {
                        path: link.path.clone(),
                        target: link.target.clone(),
                    },
                );
            }
        }
    }
}

/// The declared filesystem whose mountpoint covers `path`; the implicit
/// root filesystem covers everything else.
fn covering_filesystem<'a>(path: &str, filesystem_paths: &[&'a str]) -> &'a str {
    let mut best = "/";
    for candidate in filesystem_paths {
        let covers = *candidate == "/"
            || path == *candidate
            || path.starts_with(&format!("{candidate}/"));
        if covers && candidate.len() > best.len() {
            best = candidate;
        }
    }
    best
}

fn validate_systemd(
    systemd: &kindling_config_types::latest::systemd::Systemd,
    at: ContextPath,
    report: &mut Report,
) {
    for (i, unit) in systemd.units.iter().enumerate() {
        let unit_at = at.field("units").index(i);
        check_unit_name(&unit.name, unit_at.field("name"), report);
        for (j, dropin) in unit.dropins.iter().enumerate() {
            check_dropin_name(
                &dropin.name,
                unit_at.field("dropins").index(j).field("name"),
                report,
            );
        }

        let inert = unit.contents.as_deref().unwrap_or_default().is_empty()
            && unit.dropins.is_empty();
        if inert && (unit.enabled.is_some() || unit.mask == Some(true)) {
            report.add_warning(
                unit_at,
                ValidationError::EmptyUnit(unit.name.clone()),
            );
        }
    }
}

fn validate_passwd(
    passwd: &kindling_config_types::latest::passwd::Passwd,
    at: ContextPath,
    report: &mut Report,
) {
    let mut user_names = BTreeSet::new();
    for (i, user) in passwd.users.iter().enumerate() {
        if !user_names.insert(user.name.clone()) {
            report.add_error(
                at.field("users").index(i).field("name"),
                ValidationError::DuplicateUserName(user.name.clone()),
            );
        }
    }

    let mut group_names = BTreeSet::new();
    for (i, group) in passwd.groups.iter().enumerate() {
        if !group_names.insert(group.name.clone()) {
            report.add_error(
                at.field("groups").index(i).field("name"),
                ValidationError::DuplicateGroupName(group.name.clone()),
            );
        }
    }
}
