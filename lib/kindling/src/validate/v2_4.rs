// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The validator for 2.4.0 documents.
//!
//! The legacy schema tolerates things 3.x rejects: duplicated files, units,
//! and users are allowed here because the translation edge collapses them.
//! Deprecated constructs are reported as warnings so callers can see what
//! translation is going to rewrite.

use std::collections::BTreeSet;

use kindling_config_types::impls::resource::{check_scheme, HashRef};
use kindling_config_types::{v2_4, ConfigVersion};

use crate::report::{ContextPath, Report, ValidationError};

use super::{
    check_dropin_name, check_filesystem_format, check_guid, check_mode,
    check_node_path, check_raid, check_unit_name,
};

pub(crate) fn validate(config: &v2_4::Config) -> Report {
    let mut report = Report::new();
    let root = ContextPath::root();

    if config.ignition.version != ConfigVersion::V2_4.as_str() {
        report.add_error(
            root.field("ignition").field("version"),
            ValidationError::VersionMismatch {
                expected: ConfigVersion::V2_4,
                found: config.ignition.version.clone(),
            },
        );
    }

    validate_ignition(&config.ignition, root.field("ignition"), &mut report);
    validate_storage(&config.storage, root.field("storage"), &mut report);
    validate_systemd(&config.systemd, root.field("systemd"), &mut report);
    validate_networkd(&config.networkd, root.field("networkd"), &mut report);
    validate_passwd(&config.passwd, root.field("passwd"), &mut report);

    report
}

fn check_reference(
    source: &str,
    hash: Option<&str>,
    at: &ContextPath,
    report: &mut Report,
) {
    if let Err(err) = check_scheme(source) {
        report.add_error(at.field("source"), err.into());
    }
    if let Some(hash) = hash {
        if let Err(err) = HashRef::parse(hash) {
            report.add_error(
                at.field("verification").field("hash"),
                err.into(),
            );
        }
    }
}

fn validate_ignition(
    ignition: &v2_4::ignition::Ignition,
    at: ContextPath,
    report: &mut Report,
) {
    let config = at.field("config");
    for (i, appended) in ignition.config.append.iter().enumerate() {
        check_reference(
            &appended.source,
            appended.verification.hash.as_deref(),
            &config.field("append").index(i),
            report,
        );
    }
    if let Some(replace) = &ignition.config.replace {
        check_reference(
            &replace.source,
            replace.verification.hash.as_deref(),
            &config.field("replace"),
            report,
        );
    }

    let authorities = at
        .field("security")
        .field("tls")
        .field("certificateAuthorities");
    for (i, authority) in
        ignition.security.tls.certificate_authorities.iter().enumerate()
    {
        check_reference(
            &authority.source,
            authority.verification.hash.as_deref(),
            &authorities.index(i),
            report,
        );
    }
}

fn validate_storage(
    storage: &v2_4::storage::Storage,
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
            if !partition.type_guid.is_empty() {
                check_guid(
                    &partition.type_guid,
                    partition_at.field("typeGuid"),
                    report,
                );
            }
            if !partition.guid.is_empty() {
                check_guid(&partition.guid, partition_at.field("guid"), report);
            }
        }
    }

    for (i, raid) in storage.raid.iter().enumerate() {
        check_raid(
            &raid.level,
            raid.spares,
            &at.field("raid").index(i),
            report,
        );
    }

    for (i, filesystem) in storage.filesystems.iter().enumerate() {
        let fs_at = at.field("filesystems").index(i);
        match (&filesystem.mount, &filesystem.path) {
            (None, None) => {
                report.add_error(
                    fs_at,
                    ValidationError::FilesystemWithoutSource,
                );
            }
            (Some(mount), _) => {
                if mount.device.is_empty() {
                    report.add_error(
                        fs_at.field("mount").field("device"),
                        ValidationError::EmptyDevice,
                    );
                }
                if !mount.format.is_empty() {
                    check_filesystem_format(
                        &mount.format,
                        fs_at.field("mount").field("format"),
                        report,
                    );
                }
                if mount.create.is_some() {
                    report.add_warning(
                        fs_at.field("mount").field("create"),
                        ValidationError::Deprecated("mount.create"),
                    );
                }
            }
            (None, Some(_)) => {}
        }
    }

    for (i, file) in storage.files.iter().enumerate() {
        let file_at = at.field("files").index(i);
        check_node_path(&file.path, file_at.field("path"), report);
        check_mode(file.mode, file_at.field("mode"), report);
        check_reference(
            &file.contents.source,
            file.contents.verification.hash.as_deref(),
            &file_at.field("contents"),
            report,
        );
    }

    for (i, directory) in storage.directories.iter().enumerate() {
        let dir_at = at.field("directories").index(i);
        check_node_path(&directory.path, dir_at.field("path"), report);
        check_mode(directory.mode, dir_at.field("mode"), report);
    }

    for (i, link) in storage.links.iter().enumerate() {
        let link_at = at.field("links").index(i);
        check_node_path(&link.path, link_at.field("path"), report);
        if !link.target.is_empty() && link.target == link.path {
            report.add_error(
                link_at.field("target"),
                ValidationError::LinkTargetsSelf(link.path.clone()),
            );
        }
    }
}

fn validate_systemd(
    systemd: &v2_4::systemd::Systemd,
    at: ContextPath,
    report: &mut Report,
) {
    for (i, unit) in systemd.units.iter().enumerate() {
        let unit_at = at.field("units").index(i);
        check_unit_name(&unit.name, unit_at.field("name"), report);
        if unit.enable {
            report.add_warning(
                unit_at.field("enable"),
                ValidationError::Deprecated("unit.enable"),
            );
        }
        for (j, dropin) in unit.dropins.iter().enumerate() {
            check_dropin_name(
                &dropin.name,
                unit_at.field("dropins").index(j).field("name"),
                report,
            );
        }
    }
}

fn validate_networkd(
    networkd: &v2_4::systemd::Networkd,
    at: ContextPath,
    report: &mut Report,
) {
    for (i, unit) in networkd.units.iter().enumerate() {
        let unit_at = at.field("units").index(i);
        report.add_warning(
            unit_at.clone(),
            ValidationError::Deprecated("networkd units"),
        );
        for (j, dropin) in unit.dropins.iter().enumerate() {
            check_dropin_name(
                &dropin.name,
                unit_at.field("dropins").index(j).field("name"),
                report,
            );
        }
    }
}

fn validate_passwd(
    passwd: &v2_4::passwd::Passwd,
    at: ContextPath,
    report: &mut Report,
) {
    for (i, user) in passwd.users.iter().enumerate() {
        if user.create.is_some() {
            report.add_warning(
                at.field("users").index(i).field("create"),
                ValidationError::Deprecated("user.create"),
            );
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn codes(report: &Report) -> Vec<&'static str> {
        report.entries().iter().map(|e| e.error.code()).collect()
    }

    fn minimal() -> v2_4::Config {
        v2_4::Config {
            ignition: v2_4::ignition::Ignition {
                version: "2.4.0".to_owned(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn minimal_document_is_clean() {
        assert!(validate(&minimal()).is_empty());
    }

    #[test]
    fn deprecated_constructs_warn_but_do_not_fail() {
        let mut config = minimal();
        config.networkd.units = vec![v2_4::systemd::NetworkdUnit {
            name: "00-eth.network".to_owned(),
            contents: "[Match]\nName=eth0".to_owned(),
            dropins: vec![],
        }];
        config.systemd.units = vec![v2_4::systemd::Unit {
            name: "etcd.service".to_owned(),
            enable: true,
            ..Default::default()
        }];
        config.passwd.users = vec![v2_4::passwd::PasswdUser {
            name: "core".to_owned(),
            create: Some(Default::default()),
            ..Default::default()
        }];

        let report = validate(&config);
        assert_eq!(codes(&report), ["deprecated", "deprecated", "deprecated"]);
        assert!(!report.is_fatal());
    }

    #[test]
    fn duplicate_files_are_tolerated_pre_translation() {
        let mut config = minimal();
        let file = v2_4::storage::File {
            filesystem: "root".to_owned(),
            path: "/etc/twice".to_owned(),
            ..Default::default()
        };
        config.storage.files = vec![file.clone(), file];
        assert!(!validate(&config).is_fatal());
    }

    #[test]
    fn filesystem_must_have_mount_or_path() {
        let mut config = minimal();
        config.storage.filesystems =
            vec![v2_4::storage::Filesystem::default()];
        let report = validate(&config);
        assert_eq!(codes(&report), ["filesystem-without-source"]);
    }

    #[test]
    fn bad_hash_reported_with_path() {
        let mut config = minimal();
        config.ignition.config.append =
            vec![v2_4::ignition::ConfigReference {
                source: "https://example.com".to_owned(),
                verification: v2_4::ignition::Verification {
                    hash: Some("sha1-abcd".to_owned()),
                },
            }];
        let report = validate(&config);
        assert_eq!(codes(&report), ["bad-resource"]);
        assert_eq!(
            report.entries()[0].path.to_string(),
            "$.ignition.config.append.0.verification.hash"
        );
    }
}
