// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Canonicalization of duplicated entities within a latest-version
//! document.
//!
//! Ignoring order, the rules match the legacy pre-translation pass: the
//! last occurrence of an entity wins, and mergeable collections (unit
//! dropins, user SSH keys) absorb novel items from earlier occurrences.
//! Unlike that pass, this one preserves document order: each entity lands
//! at the position of its last occurrence. That makes it idempotent and
//! safe to re-run after extension expansion.

use std::collections::BTreeMap;

use kindling_config_types::latest;
use kindling_config_types::latest::passwd::{PasswdGroup, PasswdUser};
use kindling_config_types::latest::storage::File;
use kindling_config_types::latest::systemd::Unit;

/// Returns a copy of `config` with duplicated files, units, users, and
/// groups collapsed.
pub fn dedup(config: latest::Config) -> latest::Config {
    let mut config = config;
    config.storage.files = dedup_files(config.storage.files);
    config.systemd.units = dedup_units(config.systemd.units);
    config.passwd.users = dedup_users(config.passwd.users);
    config.passwd.groups = dedup_groups(config.passwd.groups);
    config
}

/// Walks `items` newest-first, keeping the first occurrence of each key and
/// letting `merge` fold older duplicates into it, then restores document
/// order.
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
    kept.reverse();
    kept
}

fn dedup_files(files: Vec<File>) -> Vec<File> {
    // Last occurrence wins wholesale, embedded contents included.
    collapse(files, |f| f.path.clone(), |_, _| {})
}

fn dedup_units(units: Vec<Unit>) -> Vec<Unit> {
    collapse(units, |u| u.name.clone(), merge_unit)
}

fn merge_unit(kept: &mut Unit, older: Unit) {
    if kept.contents.is_none() {
        kept.contents = older.contents;
    }
    if kept.enabled.is_none() {
        kept.enabled = older.enabled;
    }
    if kept.mask.is_none() {
        kept.mask = older.mask;
    }
    for dropin in older.dropins {
        match kept.dropins.iter_mut().find(|d| d.name == dropin.name) {
            Some(existing) => {
                if existing.contents.is_none() {
                    existing.contents = dropin.contents;
                }
            }
            None => kept.dropins.push(dropin),
        }
    }
}

fn dedup_users(users: Vec<PasswdUser>) -> Vec<PasswdUser> {
    collapse(users, |u| u.name.clone(), merge_user)
}

fn merge_user(kept: &mut PasswdUser, older: PasswdUser) {
    for key in older.ssh_authorized_keys {
        if !kept.ssh_authorized_keys.contains(&key) {
            kept.ssh_authorized_keys.push(key);
        }
    }
    kept.password_hash = kept.password_hash.take().or(older.password_hash);
    kept.uid = kept.uid.or(older.uid);
    kept.gecos = kept.gecos.take().or(older.gecos);
    kept.home_dir = kept.home_dir.take().or(older.home_dir);
    kept.no_create_home = kept.no_create_home.or(older.no_create_home);
    kept.primary_group = kept.primary_group.take().or(older.primary_group);
    if kept.groups.is_empty() {
        kept.groups = older.groups;
    }
    kept.no_user_group = kept.no_user_group.or(older.no_user_group);
    kept.no_log_init = kept.no_log_init.or(older.no_log_init);
    kept.shell = kept.shell.take().or(older.shell);
    kept.should_exist = kept.should_exist.or(older.should_exist);
    kept.system = kept.system.or(older.system);
}

fn dedup_groups(groups: Vec<PasswdGroup>) -> Vec<PasswdGroup> {
    collapse(groups, |g| g.name.clone(), |kept, older| {
        kept.gid = kept.gid.or(older.gid);
        kept.password_hash = kept.password_hash.take().or(older.password_hash);
        kept.should_exist = kept.should_exist.or(older.should_exist);
        kept.system = kept.system.or(older.system);
    })
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use kindling_config_types::latest::ignition::Resource;
    use kindling_config_types::latest::systemd::{Dropin, Systemd};

    use super::*;

    fn file(path: &str, source: &str) -> File {
        File {
            path: path.to_owned(),
            contents: Resource {
                source: Some(source.to_owned()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn named_user(name: &str, keys: &[&str]) -> PasswdUser {
        PasswdUser {
            name: name.to_owned(),
            ssh_authorized_keys: keys.iter().map(|k| k.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn newest_file_wins_in_place() {
        let files = vec![
            file("/etc/a", "data:,a-old"),
            file("/etc/b", "data:,b"),
            file("/etc/a", "data:,a-new"),
        ];
        let deduped = dedup_files(files);
        assert_eq!(
            deduped,
            vec![file("/etc/b", "data:,b"), file("/etc/a", "data:,a-new")]
        );
    }

    #[test]
    fn unit_merge_unions_dropins() {
        let units = vec![
            Unit {
                name: "kubeadm.service".to_owned(),
                enabled: Some(true),
                dropins: vec![Dropin {
                    name: "10-kindling.conf".to_owned(),
                    contents: Some("[Service]\nExecStart=".to_owned()),
                }],
                ..Default::default()
            },
            Unit {
                name: "kubeadm.service".to_owned(),
                enabled: Some(true),
                dropins: vec![Dropin {
                    name: "20-kindling.conf".to_owned(),
                    contents: Some("[Service]\nExecStart=".to_owned()),
                }],
                ..Default::default()
            },
            Unit {
                name: "kubeadm.service".to_owned(),
                enabled: Some(true),
                ..Default::default()
            },
        ];

        let deduped = dedup_units(units);
        assert_eq!(deduped.len(), 1);
        let unit = &deduped[0];
        assert_eq!(unit.enabled, Some(true));
        let names: Vec<&str> =
            unit.dropins.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["20-kindling.conf", "10-kindling.conf"]);
    }

    #[test]
    fn user_merge_unions_keys_newest_first() {
        let users = vec![
            named_user("u", &["one", "two"]),
            named_user("u", &["three"]),
            named_user("v", &["four"]),
        ];
        let deduped = dedup_users(users);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].name, "u");
        assert_eq!(deduped[0].ssh_authorized_keys, ["three", "one", "two"]);
        assert_eq!(deduped[1].name, "v");
        assert_eq!(deduped[1].ssh_authorized_keys, ["four"]);
    }

    #[test]
    fn merge_fills_unset_fields_only() {
        let units = vec![
            Unit {
                name: "etcd.service".to_owned(),
                contents: Some("[Unit]\nDescription=old".to_owned()),
                mask: Some(true),
                ..Default::default()
            },
            Unit {
                name: "etcd.service".to_owned(),
                enabled: Some(false),
                ..Default::default()
            },
        ];
        let deduped = dedup_units(units);
        assert_eq!(deduped.len(), 1);
        // The newer occurrence left contents and mask unset, so the older
        // values show through; enabled came from the newer one.
        assert_eq!(
            deduped[0].contents.as_deref(),
            Some("[Unit]\nDescription=old")
        );
        assert_eq!(deduped[0].mask, Some(true));
        assert_eq!(deduped[0].enabled, Some(false));
    }

    fn pick(choices: &'static [&'static str]) -> impl Strategy<Value = String> {
        proptest::sample::select(choices).prop_map(str::to_owned)
    }

    fn unit_strategy() -> impl Strategy<Value = Unit> {
        (
            pick(&["a.service", "b.service", "c.service"]),
            proptest::option::of(pick(&["x", "y"])),
            proptest::option::of(any::<bool>()),
            proptest::collection::vec(
                (pick(&["10.conf", "20.conf"]), proptest::option::of(pick(&["z"])))
                    .prop_map(|(name, contents)| Dropin { name, contents }),
                0..3,
            ),
        )
            .prop_map(|(name, contents, enabled, dropins)| Unit {
                name,
                contents,
                enabled,
                mask: None,
                dropins,
            })
    }

    proptest! {
        #[test]
        fn dedup_is_idempotent(
            units in proptest::collection::vec(unit_strategy(), 0..8)
        ) {
            let config = latest::Config {
                systemd: Systemd { units },
                ..Default::default()
            };
            let once = dedup(config);
            let twice = dedup(once.clone());
            prop_assert_eq!(once, twice);
        }
    }
}
