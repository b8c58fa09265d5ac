// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The 2.4.0 → 3.1.0 translation edge.
//!
//! This is the only edge that crosses the legacy/modern boundary, and the
//! only one that needs invented state: a [`FsMap`] giving the mountpoint of
//! every filesystem name the document references. The edge proceeds in
//! three phases:
//!
//! 1. [`check`] verifies the preconditions 3.x cannot express its way
//!    around and completes the `FsMap`;
//! 2. [`remove_duplicates`] collapses duplicated files, units, users, and
//!    groups, since 3.x forbids duplicates outright;
//! 3. the shape translation rewrites every section into its 3.1 form,
//!    materializing networkd units as files and flattening the deprecated
//!    `user.create` sub-object.

use std::collections::BTreeMap;

use kindling_config_types::{v2_4, v3_1, ConfigVersion};

use super::{FsMap, TranslateError};
use crate::util::{data_url, join_paths};

/// Where materialized networkd units land.
const NETWORKD_PATH: &str = "/etc/systemd/network";

/// Verifies the preconditions of the edge and completes `fs_map` with an
/// entry for every filesystem in the document.
///
/// Caller-supplied entries always win. A filesystem that declares its own
/// mountpoint (via `path`) different from a caller entry of the same name
/// is a conflict. Filesystems with no declared mountpoint get `/mnt/<key>`,
/// where the key is the filesystem name, or a stand-in derived from the
/// device for nameless filesystems.
pub fn check(
    config: &v2_4::Config,
    fs_map: &mut FsMap,
) -> Result<(), TranslateError> {
    if config.ignition.version != ConfigVersion::V2_4.as_str() {
        return Err(TranslateError::SourceVersion {
            found: config.ignition.version.clone(),
            expected: ConfigVersion::V2_4,
        });
    }

    fs_map.canonicalize_root();

    for fs in &config.storage.filesystems {
        if let Some(mount) = &fs.mount {
            if let Some(create) = &mount.create {
                if !create.force {
                    return Err(TranslateError::UnforcedCreate {
                        device: mount.device.clone(),
                    });
                }
            }
        }

        let Some(key) = fs_key(fs) else {
            continue;
        };
        match fs_map.get(&key) {
            Some(existing) => {
                if let Some(declared) = &fs.path {
                    if declared != existing {
                        return Err(TranslateError::FsMapConflict {
                            name: key,
                            existing: existing.to_owned(),
                            declared: declared.clone(),
                        });
                    }
                }
            }
            None => {
                let path = fs
                    .path
                    .clone()
                    .unwrap_or_else(|| format!("/mnt/{key}"));
                fs_map.insert(key, path);
            }
        }
    }

    let references = config
        .storage
        .files
        .iter()
        .map(|f| f.filesystem.as_str())
        .chain(config.storage.directories.iter().map(|d| d.filesystem.as_str()))
        .chain(config.storage.links.iter().map(|l| l.filesystem.as_str()));
    for reference in references {
        if !reference.is_empty() && !fs_map.contains(reference) {
            return Err(TranslateError::UnknownFilesystem(
                reference.to_owned(),
            ));
        }
    }

    Ok(())
}

/// The `FsMap` key for a filesystem: its name, or for nameless filesystems
/// a stand-in derived from the device path.
fn fs_key(fs: &v2_4::storage::Filesystem) -> Option<String> {
    if !fs.name.is_empty() {
        return Some(fs.name.clone());
    }
    let mount = fs.mount.as_ref()?;
    let base = mount.device.trim_end_matches('/').rsplit('/').next()?;
    if base.is_empty() {
        None
    } else {
        Some(base.to_owned())
    }
}

/// Collapses duplicated files, units, users, and groups, which 3.x rejects
/// outright.
///
/// Collections are scanned newest-first: the last occurrence of an entity
/// is kept wholesale, and earlier occurrences contribute only what the kept
/// entity lacks (novel dropins and SSH keys, values for unset fields). The
/// returned collections are in newest-first order; the shape translation
/// restores document order.
pub fn remove_duplicates(config: v2_4::Config) -> v2_4::Config {
    let mut config = config;
    config.storage.files =
        collapse(config.storage.files, |f| f.path.clone(), |_, _| {});
    config.systemd.units =
        collapse(config.systemd.units, |u| u.name.clone(), merge_unit);
    config.passwd.users =
        collapse(config.passwd.users, |u| u.name.clone(), merge_user);
    config.passwd.groups =
        collapse(config.passwd.groups, |g| g.name.clone(), merge_group);
    config
}

fn collapse<T, F, M>(items: Vec<T>, key: F, mut merge: M) -> Vec<T>
where
    F: Fn(&T) -> String,
    M: FnMut(&mut T, T),
{
    let mut kept: Vec<T> = Vec::with_capacity(items.len());
    let mut index_by_key: BTreeMap<String, usize> = BTreeMap::new();
    for item in items.into_iter().rev() {
        match index_by_key.get(&key(&item)) {
            Some(&at) => merge(&mut kept[at], item),
            None => {
                index_by_key.insert(key(&item), kept.len());
                kept.push(item);
            }
        }
    }
    kept
}

fn merge_unit(kept: &mut v2_4::systemd::Unit, older: v2_4::systemd::Unit) {
    if kept.contents.is_empty() {
        kept.contents = older.contents;
    }
    if kept.enabled.is_none() {
        kept.enabled = older.enabled;
    }
    for dropin in older.dropins {
        match kept.dropins.iter_mut().find(|d| d.name == dropin.name) {
            Some(existing) => {
                if existing.contents.is_empty() {
                    existing.contents = dropin.contents;
                }
            }
            None => kept.dropins.push(dropin),
        }
    }
}

fn merge_user(
    kept: &mut v2_4::passwd::PasswdUser,
    older: v2_4::passwd::PasswdUser,
) {
    for key in older.ssh_authorized_keys {
        if !kept.ssh_authorized_keys.contains(&key) {
            kept.ssh_authorized_keys.push(key);
        }
    }
    kept.password_hash = kept.password_hash.take().or(older.password_hash);
    kept.uid = kept.uid.or(older.uid);
    if kept.gecos.is_empty() {
        kept.gecos = older.gecos;
    }
    if kept.home_dir.is_empty() {
        kept.home_dir = older.home_dir;
    }
    if kept.primary_group.is_empty() {
        kept.primary_group = older.primary_group;
    }
    if kept.groups.is_empty() {
        kept.groups = older.groups;
    }
    if kept.shell.is_empty() {
        kept.shell = older.shell;
    }
    if kept.create.is_none() {
        kept.create = older.create;
    }
}

fn merge_group(
    kept: &mut v2_4::passwd::PasswdGroup,
    older: v2_4::passwd::PasswdGroup,
) {
    kept.gid = kept.gid.or(older.gid);
    if kept.password_hash.is_empty() {
        kept.password_hash = older.password_hash;
    }
}

/// Lifts a 2.4.0 document to 3.1.0.
pub fn translate(
    config: v2_4::Config,
    fs_map: &mut FsMap,
) -> Result<v3_1::Config, TranslateError> {
    check(&config, fs_map)?;
    let config = remove_duplicates(config);

    Ok(v3_1::Config {
        ignition: translate_ignition(config.ignition),
        storage: translate_storage(config.storage, config.networkd, fs_map)?,
        systemd: translate_systemd(config.systemd),
        passwd: translate_passwd(config.passwd),
    })
}

fn opt_string(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn translate_ignition(
    old: v2_4::ignition::Ignition,
) -> v3_1::ignition::Ignition {
    v3_1::ignition::Ignition {
        version: ConfigVersion::V3_1.as_str().to_owned(),
        config: v3_1::ignition::IgnitionConfig {
            merge: old
                .config
                .append
                .into_iter()
                .map(translate_config_reference)
                .collect(),
            replace: old
                .config
                .replace
                .map(translate_config_reference)
                .unwrap_or_default(),
        },
        timeouts: v3_1::ignition::Timeouts {
            http_response_headers: old.timeouts.http_response_headers,
            http_total: old.timeouts.http_total,
        },
        security: v3_1::ignition::Security {
            tls: v3_1::ignition::Tls {
                certificate_authorities: old
                    .security
                    .tls
                    .certificate_authorities
                    .into_iter()
                    .map(translate_ca_reference)
                    .collect(),
            },
        },
        proxy: v3_1::ignition::Proxy {
            http_proxy: opt_string(old.proxy.http_proxy),
            https_proxy: opt_string(old.proxy.https_proxy),
            no_proxy: old.proxy.no_proxy,
        },
    }
}

fn translate_config_reference(
    old: v2_4::ignition::ConfigReference,
) -> v3_1::ignition::Resource {
    v3_1::ignition::Resource {
        source: opt_string(old.source),
        verification: translate_verification(old.verification),
        ..Default::default()
    }
}

fn translate_ca_reference(
    old: v2_4::ignition::CaReference,
) -> v3_1::ignition::Resource {
    v3_1::ignition::Resource {
        source: opt_string(old.source),
        verification: translate_verification(old.verification),
        ..Default::default()
    }
}

fn translate_verification(
    old: v2_4::ignition::Verification,
) -> v3_1::ignition::Verification {
    v3_1::ignition::Verification { hash: old.hash }
}

fn translate_storage(
    old: v2_4::storage::Storage,
    networkd: v2_4::systemd::Networkd,
    fs_map: &FsMap,
) -> Result<v3_1::storage::Storage, TranslateError> {
    let disks = old.disks.into_iter().map(translate_disk).collect();
    let raid = old.raid.into_iter().map(translate_raid).collect();

    let mut filesystems = Vec::new();
    for fs in old.filesystems {
        if let Some(translated) = translate_filesystem(fs, fs_map) {
            filesystems.push(translated);
        }
    }

    // Deduplication left the files newest-first; walking it backwards
    // restores document order.
    let mut files = Vec::with_capacity(old.files.len());
    for file in old.files.into_iter().rev() {
        files.push(translate_file(file, fs_map)?);
    }
    for unit in networkd.units {
        files.extend(materialize_networkd_unit(unit));
    }

    let mut directories = Vec::with_capacity(old.directories.len());
    for dir in old.directories {
        directories.push(translate_directory(dir, fs_map)?);
    }

    let mut links = Vec::with_capacity(old.links.len());
    for link in old.links {
        links.push(translate_link(link, fs_map)?);
    }

    Ok(v3_1::storage::Storage {
        disks,
        raid,
        filesystems,
        files,
        directories,
        links,
    })
}

fn translate_disk(old: v2_4::storage::Disk) -> v3_1::storage::Disk {
    v3_1::storage::Disk {
        device: old.device,
        wipe_table: Some(old.wipe_table),
        partitions: old
            .partitions
            .into_iter()
            .map(translate_partition)
            .collect(),
    }
}

fn translate_partition(
    old: v2_4::storage::Partition,
) -> v3_1::storage::Partition {
    v3_1::storage::Partition {
        label: old.label,
        number: old.number,
        size_mib: old.size_mib,
        start_mib: old.start_mib,
        type_guid: opt_string(old.type_guid),
        guid: opt_string(old.guid),
        wipe_partition_entry: Some(old.wipe_partition_entry),
        should_exist: old.should_exist,
        resize: None,
    }
}

fn translate_raid(old: v2_4::storage::Raid) -> v3_1::storage::Raid {
    v3_1::storage::Raid {
        name: old.name,
        level: old.level,
        devices: old.devices,
        spares: Some(old.spares),
        options: old.options,
    }
}

/// Translates one filesystem. Filesystems without a `mount` contribute
/// nothing to the 3.1 document: they exist only to give a name to an
/// already-mounted tree, and that name's mountpoint now lives in the
/// `FsMap`.
fn translate_filesystem(
    old: v2_4::storage::Filesystem,
    fs_map: &FsMap,
) -> Option<v3_1::storage::Filesystem> {
    let key = fs_key(&old);
    let path = key
        .as_deref()
        .and_then(|key| fs_map.get(key))
        .map(str::to_owned);
    let name = old.name;
    let mount = old.mount?;

    let mut wipe_filesystem = mount.wipe_filesystem;
    let mut label = mount.label;
    let options = match mount.create {
        Some(create) => {
            // `check` already rejected force=false; emulate the forced
            // format with a filesystem wipe. The 2.x runtime would have
            // formatted with the create options, so they are what carries
            // over; the separate label survives only when the options name
            // the same label.
            wipe_filesystem = true;
            let option_label = create
                .options
                .iter()
                .find_map(|option| option.strip_prefix("--label="));
            if option_label != label.as_deref() {
                label = None;
            }
            create.options
        }
        None => mount.options,
    };

    let mut format = mount.format;
    if name.eq_ignore_ascii_case("oem") && !wipe_filesystem {
        // The OEM partition's on-disk convention: unless the caller asked
        // for a wipe, the existing btrfs filesystem is what boots.
        format = "btrfs".to_owned();
    }

    Some(v3_1::storage::Filesystem {
        device: mount.device,
        format: opt_string(format),
        path,
        wipe_filesystem: Some(wipe_filesystem),
        label,
        uuid: mount.uuid,
        options,
        mount_options: vec![],
    })
}

fn resolve_node_path(
    filesystem: &str,
    path: &str,
    fs_map: &FsMap,
) -> Result<String, TranslateError> {
    let base = fs_map
        .resolve(filesystem)
        .ok_or_else(|| TranslateError::UnknownFilesystem(filesystem.to_owned()))?;
    Ok(join_paths(base, path))
}

fn translate_node_user(
    old: Option<v2_4::storage::NodeUser>,
) -> v3_1::storage::NodeUser {
    match old {
        Some(user) => v3_1::storage::NodeUser {
            id: user.id,
            name: opt_string(user.name),
        },
        None => v3_1::storage::NodeUser::default(),
    }
}

fn translate_node_group(
    old: Option<v2_4::storage::NodeGroup>,
) -> v3_1::storage::NodeGroup {
    match old {
        Some(group) => v3_1::storage::NodeGroup {
            id: group.id,
            name: opt_string(group.name),
        },
        None => v3_1::storage::NodeGroup::default(),
    }
}

fn translate_contents(
    old: v2_4::storage::FileContents,
) -> v3_1::ignition::Resource {
    v3_1::ignition::Resource {
        // An empty source stays an explicit empty string: "this file has no
        // contents" rather than "contents unspecified".
        source: Some(old.source),
        compression: opt_string(old.compression),
        verification: translate_verification(old.verification),
        http_headers: old
            .http_headers
            .into_iter()
            .map(|header| v3_1::ignition::HttpHeader {
                name: header.name,
                value: opt_string(header.value),
            })
            .collect(),
    }
}

fn translate_file(
    old: v2_4::storage::File,
    fs_map: &FsMap,
) -> Result<v3_1::storage::File, TranslateError> {
    let path = resolve_node_path(&old.filesystem, &old.path, fs_map)?;
    let contents = translate_contents(old.contents);
    let (contents, append) = if old.append {
        (v3_1::ignition::Resource::default(), vec![contents])
    } else {
        (contents, vec![])
    };

    Ok(v3_1::storage::File {
        path,
        overwrite: old.overwrite,
        user: translate_node_user(old.user),
        group: translate_node_group(old.group),
        contents,
        append,
        mode: old.mode,
    })
}

fn translate_directory(
    old: v2_4::storage::Directory,
    fs_map: &FsMap,
) -> Result<v3_1::storage::Directory, TranslateError> {
    Ok(v3_1::storage::Directory {
        path: resolve_node_path(&old.filesystem, &old.path, fs_map)?,
        overwrite: old.overwrite,
        user: translate_node_user(old.user),
        group: translate_node_group(old.group),
        mode: old.mode,
    })
}

fn translate_link(
    old: v2_4::storage::Link,
    fs_map: &FsMap,
) -> Result<v3_1::storage::Link, TranslateError> {
    Ok(v3_1::storage::Link {
        path: resolve_node_path(&old.filesystem, &old.path, fs_map)?,
        overwrite: old.overwrite,
        user: translate_node_user(old.user),
        group: translate_node_group(old.group),
        target: old.target,
        hard: Some(old.hard),
    })
}

/// Rewrites a networkd unit and its dropins as files under
/// `/etc/systemd/network`, with inline contents carried as data URLs.
fn materialize_networkd_unit(
    unit: v2_4::systemd::NetworkdUnit,
) -> Vec<v3_1::storage::File> {
    fn inline_file(path: String, contents: &str) -> v3_1::storage::File {
        v3_1::storage::File {
            path,
            overwrite: Some(true),
            contents: v3_1::ignition::Resource {
                source: Some(data_url(contents.as_bytes())),
                ..Default::default()
            },
            mode: Some(0o644),
            ..Default::default()
        }
    }

    let mut files = Vec::with_capacity(1 + unit.dropins.len());
    files.push(inline_file(
        format!("{NETWORKD_PATH}/{}", unit.name),
        &unit.contents,
    ));
    for dropin in unit.dropins {
        files.push(inline_file(
            format!("{NETWORKD_PATH}/{}.d/{}", unit.name, dropin.name),
            &dropin.contents,
        ));
    }
    files
}

fn translate_systemd(
    old: v2_4::systemd::Systemd,
) -> v3_1::systemd::Systemd {
    let mut units = Vec::with_capacity(old.units.len());
    for unit in old.units.into_iter().rev() {
        let mut dropins: Vec<v3_1::systemd::Dropin> = unit
            .dropins
            .into_iter()
            .map(|dropin| v3_1::systemd::Dropin {
                name: dropin.name,
                contents: opt_string(dropin.contents),
            })
            .collect();
        // systemd applies dropins in lexical filename order; emit them that
        // way so merged units come out deterministic.
        dropins.sort_by(|a, b| a.name.cmp(&b.name));

        // The deprecated plain-bool form wins when set.
        let enabled = if unit.enable { Some(true) } else { unit.enabled };
        units.push(v3_1::systemd::Unit {
            name: unit.name,
            enabled,
            mask: unit.mask.then_some(true),
            contents: opt_string(unit.contents),
            dropins,
        });
    }
    v3_1::systemd::Systemd { units }
}

fn translate_passwd(old: v2_4::passwd::Passwd) -> v3_1::passwd::Passwd {
    let mut users = Vec::with_capacity(old.users.len());
    for user in old.users.into_iter().rev() {
        users.push(translate_user(user));
    }
    let mut groups = Vec::with_capacity(old.groups.len());
    for group in old.groups.into_iter().rev() {
        groups.push(v3_1::passwd::PasswdGroup {
            name: group.name,
            gid: group.gid,
            password_hash: opt_string(group.password_hash),
            should_exist: None,
            system: group.system.then_some(true),
        });
    }
    v3_1::passwd::Passwd { users, groups }
}

fn translate_user(old: v2_4::passwd::PasswdUser) -> v3_1::passwd::PasswdUser {
    // The deprecated create sub-object, when present, is the authoritative
    // source for the account-creation fields.
    let fields = match old.create {
        Some(create) => (
            create.uid,
            create.gecos,
            create.home_dir,
            create.no_create_home,
            create.primary_group,
            create.groups,
            create.no_user_group,
            create.no_log_init,
            create.shell,
            create.system,
        ),
        None => (
            old.uid,
            old.gecos,
            old.home_dir,
            old.no_create_home,
            old.primary_group,
            old.groups,
            old.no_user_group,
            old.no_log_init,
            old.shell,
            old.system,
        ),
    };
    let (
        uid,
        gecos,
        home_dir,
        no_create_home,
        primary_group,
        groups,
        no_user_group,
        no_log_init,
        shell,
        system,
    ) = fields;

    v3_1::passwd::PasswdUser {
        name: old.name,
        password_hash: old.password_hash,
        ssh_authorized_keys: old.ssh_authorized_keys,
        uid,
        gecos: opt_string(gecos),
        home_dir: opt_string(home_dir),
        no_create_home: no_create_home.then_some(true),
        primary_group: opt_string(primary_group),
        groups,
        no_user_group: no_user_group.then_some(true),
        no_log_init: no_log_init.then_some(true),
        shell: opt_string(shell),
        should_exist: None,
        system: system.then_some(true),
    }
}
