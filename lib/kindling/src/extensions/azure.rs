// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The Azure expander.
//!
//! Azure hands a machine two things the config format has to absorb: the
//! instance metadata service's JSON (admin username, SSH public keys) and
//! the OVF provisioning document (fallback username and keys, plaintext or
//! pre-hashed password, sshd policy, CustomData blob). Each synthesized
//! fragment sits behind a knob in `ignition.extensions.azure`; a knob that
//! is unset or false leaves the corresponding artifact entirely to the
//! user, conflict checks included.

use base64::Engine;
use rand::Rng;
use serde::Deserialize;
use slog::Logger;

use kindling_config_types::latest;
use kindling_config_types::latest::ignition::Resource;
use kindling_config_types::latest::passwd::PasswdUser;
use kindling_config_types::latest::storage::File;
use kindling_config_types::latest::systemd::Unit;

use super::{crypt, ExpandError};
use crate::dedup;
use crate::report::{ContextPath, Report, ValidationError};
use crate::util::{data_url, is_true};

// Azure-managed artifact paths.
pub const SSHD_DROP_IN_PATH: &str =
    "/etc/ssh/sshd_config.d/50-azure-cloud-sshd.conf";
pub const SUDOERS_DROP_IN_PATH: &str = "/etc/sudoers.d/azure-cloud-sudoers.conf";
pub const RESOURCE_DISK_UNIT: &str = "mnt-resource.mount";
pub const CUSTOM_DATA_PATH: &str = "/var/lib/waagent/CustomData";

const RESOURCE_DISK_MOUNTPOINT: &str = "/mnt/resource";

const RESOURCE_DISK_UNIT_CONTENTS: &str = "\
[Unit]
Description=Mount the ephemeral resource disk

[Mount]
What=/dev/disk/cloud/azure_resource-part1
Where=/mnt/resource
Type=auto

[Install]
WantedBy=local-fs.target
";

/// Raw platform inputs, exactly as the provider fetched them.
#[derive(Clone, Copy, Debug, Default)]
pub struct AzureInputs<'a> {
    /// Instance metadata service response (JSON).
    pub imds: Option<&'a [u8]>,
    /// OVF environment provisioning section (XML).
    pub ovf: Option<&'a [u8]>,
}

#[derive(Debug, Default, Deserialize)]
pub struct InstanceMetadata {
    #[serde(default)]
    pub compute: InstanceComputeMetadata,
}

#[derive(Debug, Default, Deserialize)]
pub struct InstanceComputeMetadata {
    #[serde(default)]
    pub hostname: String,
    #[serde(default, rename = "osProfile")]
    pub os_profile: InstanceOsProfile,
    #[serde(default, rename = "publicKeys")]
    pub public_keys: Vec<InstancePublicKey>,
}

#[derive(Debug, Default, Deserialize)]
pub struct InstanceOsProfile {
    #[serde(default, rename = "adminUsername")]
    pub admin_username: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct InstancePublicKey {
    #[serde(default, rename = "keyData")]
    pub key_data: String,
}

pub fn parse_instance_metadata(
    raw: &[u8],
) -> Result<InstanceMetadata, ExpandError> {
    serde_json::from_slice(raw).map_err(ExpandError::Metadata)
}

#[derive(Debug, Default, Deserialize)]
struct ProvisioningSection {
    #[serde(default, rename = "LinuxProvisioningConfigurationSet")]
    linux_provisioning_configuration_set: LinuxProvisioningConfigurationSet,
}

#[derive(Debug, Default, Deserialize)]
pub struct LinuxProvisioningConfigurationSet {
    #[serde(default, rename = "HostName")]
    pub host_name: String,
    #[serde(default, rename = "UserName")]
    pub user_name: String,
    #[serde(default, rename = "UserPassword")]
    pub user_password: String,
    #[serde(default, rename = "DisableSshPasswordAuthentication")]
    pub disable_ssh_password_authentication: String,
    #[serde(default, rename = "CustomData")]
    pub custom_data: String,
    #[serde(default, rename = "SSH")]
    pub ssh: SshSection,
}

#[derive(Debug, Default, Deserialize)]
pub struct SshSection {
    #[serde(default, rename = "PublicKeys")]
    pub public_keys: SshPublicKeys,
}

#[derive(Debug, Default, Deserialize)]
pub struct SshPublicKeys {
    #[serde(default, rename = "PublicKey")]
    pub keys: Vec<SshPublicKey>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SshPublicKey {
    #[serde(default, rename = "Value")]
    pub value: String,
}

impl LinuxProvisioningConfigurationSet {
    /// The provisioning document spells booleans several ways.
    pub fn password_auth_disabled(&self) -> bool {
        matches!(
            self.disable_ssh_password_authentication
                .trim()
                .to_ascii_lowercase()
                .as_str(),
            "true" | "yes" | "1"
        )
    }

    fn ssh_keys(&self) -> impl Iterator<Item = &str> {
        self.ssh.public_keys.keys.iter().map(|key| key.value.as_str())
    }
}

pub fn parse_provisioning_config(
    raw: &[u8],
) -> Result<LinuxProvisioningConfigurationSet, ExpandError> {
    if raw.is_empty() {
        return Err(ExpandError::EmptyProvisioning);
    }
    let section: ProvisioningSection =
        quick_xml::de::from_reader(raw).map_err(ExpandError::Provisioning)?;
    Ok(section.linux_provisioning_configuration_set)
}

/// Expands the Azure knobs over `config` using ambient randomness for
/// password salting.
pub fn apply_extensions(
    log: &Logger,
    config: latest::Config,
    inputs: &AzureInputs<'_>,
) -> Result<latest::Config, ExpandError> {
    apply_extensions_with_rng(log, config, inputs, &mut rand::thread_rng())
}

/// Expands the Azure knobs over `config`. On any conflict with
/// user-authored entities the error carries a report pinpointing them and
/// nothing is injected.
pub fn apply_extensions_with_rng<R: Rng>(
    log: &Logger,
    config: latest::Config,
    inputs: &AzureInputs<'_>,
    rng: &mut R,
) -> Result<latest::Config, ExpandError> {
    let knobs = config.ignition.extensions.azure.clone();
    let any_enabled = is_true(knobs.user_enabled)
        || is_true(knobs.sshd_drop_in_enabled)
        || is_true(knobs.sudoers_drop_in_enabled)
        || is_true(knobs.resource_disk_enabled);
    if !any_enabled {
        // The user has opted out of platform management; the inputs are
        // not even parsed.
        return Ok(config);
    }

    let metadata = inputs.imds.map(parse_instance_metadata).transpose()?;
    let provisioning =
        inputs.ovf.map(parse_provisioning_config).transpose()?;
    let admin_username =
        admin_username(metadata.as_ref(), provisioning.as_ref());

    let conflicts = conflict_report(&config, admin_username.as_deref());
    if conflicts.is_fatal() {
        return Err(ExpandError::Conflict(conflicts));
    }

    let mut config = config;

    if is_true(knobs.user_enabled) {
        let name = admin_username
            .clone()
            .ok_or(ExpandError::MissingAdminUsername)?;
        let ssh_authorized_keys =
            collect_ssh_public_keys(metadata.as_ref(), provisioning.as_ref());
        let password_hash =
            hash_provisioned_password(provisioning.as_ref(), rng);
        slog::debug!(log, "injecting platform admin user";
            "user" => %name, "keys" => ssh_authorized_keys.len());
        config.passwd.users.push(PasswdUser {
            name,
            ssh_authorized_keys,
            password_hash,
            ..Default::default()
        });

        if let Some(custom_data) =
            provisioning.as_ref().map(|p| p.custom_data.trim())
        {
            if !custom_data.is_empty() {
                let blob = base64::engine::general_purpose::STANDARD
                    .decode(custom_data)
                    .map_err(ExpandError::CustomData)?;
                slog::debug!(log, "materializing provisioning custom data";
                    "path" => CUSTOM_DATA_PATH);
                config
                    .storage
                    .files
                    .push(inline_file(CUSTOM_DATA_PATH, &blob, 0o600));
            }
        }
    }

    if is_true(knobs.sshd_drop_in_enabled) {
        let disabled = provisioning
            .as_ref()
            .map(LinuxProvisioningConfigurationSet::password_auth_disabled)
            .unwrap_or(false);
        let policy = if disabled { "no" } else { "yes" };
        let contents = format!("PasswordAuthentication {policy}\n");
        config.storage.files.push(inline_file(
            SSHD_DROP_IN_PATH,
            contents.as_bytes(),
            0o644,
        ));
    }

    if is_true(knobs.sudoers_drop_in_enabled) {
        let name = admin_username
            .as_deref()
            .ok_or(ExpandError::MissingAdminUsername)?;
        let contents = format!("{name} ALL=(ALL) NOPASSWD:ALL\n");
        config.storage.files.push(inline_file(
            SUDOERS_DROP_IN_PATH,
            contents.as_bytes(),
            0o600,
        ));
    }

    if is_true(knobs.resource_disk_enabled) {
        config.systemd.units.push(Unit {
            name: RESOURCE_DISK_UNIT.to_owned(),
            enabled: Some(true),
            contents: Some(RESOURCE_DISK_UNIT_CONTENTS.to_owned()),
            ..Default::default()
        });
    }

    // Injected entities cohabit with user entities under the usual rules.
    Ok(dedup::dedup(config))
}

/// IMDS knows best; the OVF document is the fallback.
fn admin_username(
    metadata: Option<&InstanceMetadata>,
    provisioning: Option<&LinuxProvisioningConfigurationSet>,
) -> Option<String> {
    let from_imds = metadata
        .map(|m| m.compute.os_profile.admin_username.as_str())
        .filter(|name| !name.is_empty());
    let from_ovf = provisioning
        .map(|p| p.user_name.as_str())
        .filter(|name| !name.is_empty());
    from_imds.or(from_ovf).map(str::to_owned)
}

/// IMDS keys first, then OVF keys, first occurrence winning.
fn collect_ssh_public_keys(
    metadata: Option<&InstanceMetadata>,
    provisioning: Option<&LinuxProvisioningConfigurationSet>,
) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    let imds_keys = metadata
        .into_iter()
        .flat_map(|m| m.compute.public_keys.iter())
        .map(|key| key.key_data.as_str());
    let ovf_keys =
        provisioning.into_iter().flat_map(|p| p.ssh_keys());
    for key in imds_keys.chain(ovf_keys) {
        let key = key.trim();
        if !key.is_empty() && !keys.iter().any(|seen| seen == key) {
            keys.push(key.to_owned());
        }
    }
    keys
}

fn hash_provisioned_password<R: Rng>(
    provisioning: Option<&LinuxProvisioningConfigurationSet>,
    rng: &mut R,
) -> Option<String> {
    let password = provisioning?.user_password.as_str();
    if password.is_empty() {
        None
    } else if crypt::is_password_hashed(password) {
        Some(password.to_owned())
    } else {
        Some(crypt::sha512_crypt(password, &crypt::generate_salt(rng)))
    }
}

fn inline_file(path: &str, contents: &[u8], mode: u32) -> File {
    File {
        path: path.to_owned(),
        overwrite: Some(true),
        contents: Resource {
            source: Some(data_url(contents)),
            ..Default::default()
        },
        mode: Some(mode),
        ..Default::default()
    }
}

/// Checks every enabled knob's artifact against the user's document,
/// mirroring the rules the execution stages rely on: a knob that is null
/// or false performs no check at all.
fn conflict_report(
    config: &latest::Config,
    admin_username: Option<&str>,
) -> Report {
    let knobs = &config.ignition.extensions.azure;
    let mut report = Report::new();

    if is_true(knobs.sshd_drop_in_enabled) {
        check_node_conflict(
            config,
            SSHD_DROP_IN_PATH,
            ValidationError::SshdDropInConflict,
            &mut report,
        );
    }

    if is_true(knobs.sudoers_drop_in_enabled) {
        check_node_conflict(
            config,
            SUDOERS_DROP_IN_PATH,
            ValidationError::SudoersDropInConflict,
            &mut report,
        );
    }

    if is_true(knobs.resource_disk_enabled) {
        let root = ContextPath::root();
        for (i, unit) in config.systemd.units.iter().enumerate() {
            let has_contents =
                !unit.contents.as_deref().unwrap_or_default().is_empty();
            if unit.name == RESOURCE_DISK_UNIT && has_contents {
                report.add_error(
                    root.field("systemd").field("units").index(i).field("name"),
                    ValidationError::ResourceDiskConflict,
                );
            }
        }
        let unit_path = format!("/etc/systemd/system/{RESOURCE_DISK_UNIT}");
        check_node_conflict(
            config,
            &unit_path,
            ValidationError::ResourceDiskConflict,
            &mut report,
        );
        for (i, filesystem) in config.storage.filesystems.iter().enumerate() {
            if filesystem.path.as_deref() == Some(RESOURCE_DISK_MOUNTPOINT) {
                report.add_error(
                    root.field("storage")
                        .field("filesystems")
                        .index(i)
                        .field("path"),
                    ValidationError::ResourceDiskConflict,
                );
            }
        }
    }

    if is_true(knobs.user_enabled) {
        // Without a username from the platform there is nothing to check
        // against.
        if let Some(admin) = admin_username {
            let users = ContextPath::root().field("passwd").field("users");
            for (i, user) in config.passwd.users.iter().enumerate() {
                if user.name == admin {
                    report.add_error(
                        users.index(i).field("name"),
                        ValidationError::AdminUserConflict(admin.to_owned()),
                    );
                }
            }
        }
    }

    report
}

fn check_node_conflict(
    config: &latest::Config,
    path: &str,
    error: ValidationError,
    report: &mut Report,
) {
    let storage = ContextPath::root().field("storage");
    for (i, file) in config.storage.files.iter().enumerate() {
        if file.path == path {
            report.add_error(
                storage.field("files").index(i).field("path"),
                error.clone(),
            );
        }
    }
    for (i, link) in config.storage.links.iter().enumerate() {
        if link.path == path {
            report.add_error(
                storage.field("links").index(i).field("path"),
                error.clone(),
            );
        }
    }
}

#[cfg(test)]
mod test {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use kindling_config_types::latest::ignition::AzureExtensions;
    use kindling_config_types::latest::storage::Link;

    use super::*;
    use crate::util::decode_data_url;

    const PROVISIONING_XML: &[u8] = br#"
<wa:ProvisioningSection xmlns:wa="http://schemas.microsoft.com/windowsazure">
  <LinuxProvisioningConfigurationSet>
    <HostName>myhost</HostName>
    <UserName>ovf-user</UserName>
    <UserPassword>password</UserPassword>
    <DisableSshPasswordAuthentication>true</DisableSshPasswordAuthentication>
    <CustomData>ZWNobyBoZWxsbwo=</CustomData>
    <SSH>
      <PublicKeys>
        <PublicKey>
          <Value>ssh-ed25519 BBBB</Value>
        </PublicKey>
      </PublicKeys>
    </SSH>
  </LinuxProvisioningConfigurationSet>
</wa:ProvisioningSection>"#;

    const IMDS_JSON: &[u8] = br#"{
        "compute": {
            "osProfile": {"adminUsername": "imds-user"},
            "publicKeys": [{"keyData": "ssh-rsa AAAA"}]
        }
    }"#;

    fn logger() -> Logger {
        Logger::root(slog::Discard, slog::o!())
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0x6b696e)
    }

    fn all_knobs() -> AzureExtensions {
        AzureExtensions {
            user_enabled: Some(true),
            sshd_drop_in_enabled: Some(true),
            sudoers_drop_in_enabled: Some(true),
            resource_disk_enabled: Some(true),
        }
    }

    fn config_with_knobs(azure: AzureExtensions) -> latest::Config {
        latest::Config {
            ignition: latest::ignition::Ignition {
                version: "3.2.0".to_owned(),
                extensions: latest::ignition::Extensions { azure },
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn file_by_path<'a>(
        config: &'a latest::Config,
        path: &str,
    ) -> Option<&'a File> {
        config.storage.files.iter().find(|f| f.path == path)
    }

    #[test]
    fn parse_provisioning_document() {
        let provisioning =
            parse_provisioning_config(PROVISIONING_XML).unwrap();
        assert_eq!(provisioning.host_name, "myhost");
        assert_eq!(provisioning.user_name, "ovf-user");
        assert_eq!(provisioning.ssh.public_keys.keys.len(), 1);
        assert_eq!(
            provisioning.ssh.public_keys.keys[0].value,
            "ssh-ed25519 BBBB"
        );
    }

    #[test]
    fn parse_provisioning_document_errors() {
        let malformed = br#"
<wa:ProvisioningSection xmlns:wa="http://schemas.microsoft.com/windowsazure">
  <LinuxProvisioningConfigurationSet>
    <UserName>testuser
  </LinuxProvisioningConfigurationSet>
</wa:ProvisioningSection>"#;
        assert!(matches!(
            parse_provisioning_config(malformed),
            Err(ExpandError::Provisioning(_))
        ));
        assert!(matches!(
            parse_provisioning_config(b""),
            Err(ExpandError::EmptyProvisioning)
        ));
    }

    #[test]
    fn password_auth_parsing() {
        for truthy in ["true", "TRUE", "1", " yes ", "YES"] {
            let provisioning = LinuxProvisioningConfigurationSet {
                disable_ssh_password_authentication: truthy.to_owned(),
                ..Default::default()
            };
            assert!(provisioning.password_auth_disabled(), "{truthy:?}");
        }
        for falsy in ["false", "0", "no", "", "NO", "False"] {
            let provisioning = LinuxProvisioningConfigurationSet {
                disable_ssh_password_authentication: falsy.to_owned(),
                ..Default::default()
            };
            assert!(!provisioning.password_auth_disabled(), "{falsy:?}");
        }
    }

    #[test]
    fn imds_username_takes_priority() {
        let metadata = parse_instance_metadata(IMDS_JSON).unwrap();
        let provisioning =
            parse_provisioning_config(PROVISIONING_XML).unwrap();
        assert_eq!(
            admin_username(Some(&metadata), Some(&provisioning)).as_deref(),
            Some("imds-user")
        );
        assert_eq!(
            admin_username(None, Some(&provisioning)).as_deref(),
            Some("ovf-user")
        );
        assert_eq!(admin_username(None, None), None);
    }

    #[test]
    fn ssh_keys_merge_first_occurrence_wins() {
        let metadata = parse_instance_metadata(
            br#"{"compute": {"publicKeys": [
                {"keyData": "ssh-rsa AAAA"},
                {"keyData": "ssh-rsa AAAA"}
            ]}}"#,
        )
        .unwrap();
        let provisioning = LinuxProvisioningConfigurationSet {
            ssh: SshSection {
                public_keys: SshPublicKeys {
                    keys: vec![
                        SshPublicKey { value: "ssh-rsa BBBB".to_owned() },
                        SshPublicKey { value: "ssh-rsa AAAA".to_owned() },
                    ],
                },
            },
            ..Default::default()
        };
        assert_eq!(
            collect_ssh_public_keys(Some(&metadata), Some(&provisioning)),
            ["ssh-rsa AAAA", "ssh-rsa BBBB"]
        );
    }

    #[test]
    fn plaintext_password_is_hashed() {
        let provisioning = LinuxProvisioningConfigurationSet {
            user_password: "plaintext".to_owned(),
            ..Default::default()
        };
        let hash =
            hash_provisioned_password(Some(&provisioning), &mut rng())
                .expect("password should hash");
        assert!(hash.starts_with("$6$"), "{hash}");
    }

    #[test]
    fn prehashed_password_passes_through() {
        let prehashed = "$6$rounds=5000$saltsalt$hashedvalue";
        let provisioning = LinuxProvisioningConfigurationSet {
            user_password: prehashed.to_owned(),
            ..Default::default()
        };
        assert_eq!(
            hash_provisioned_password(Some(&provisioning), &mut rng())
                .as_deref(),
            Some(prehashed)
        );
    }

    #[test]
    fn absent_password_stays_absent() {
        let provisioning = LinuxProvisioningConfigurationSet::default();
        assert_eq!(
            hash_provisioned_password(Some(&provisioning), &mut rng()),
            None
        );
        assert_eq!(hash_provisioned_password(None, &mut rng()), None);
    }

    #[test]
    fn no_knobs_means_no_changes() {
        let config = config_with_knobs(AzureExtensions::default());
        let out = apply_extensions_with_rng(
            &logger(),
            config.clone(),
            // Garbage inputs prove the opt-out path never parses them.
            &AzureInputs { imds: Some(b"not json"), ovf: Some(b"not xml") },
            &mut rng(),
        )
        .unwrap();
        assert_eq!(config, out);
    }

    #[test]
    fn all_knobs_inject_everything() {
        let config = config_with_knobs(all_knobs());
        let inputs =
            AzureInputs { imds: Some(IMDS_JSON), ovf: Some(PROVISIONING_XML) };
        let out = apply_extensions_with_rng(
            &logger(),
            config,
            &inputs,
            &mut rng(),
        )
        .unwrap();

        assert_eq!(out.passwd.users.len(), 1);
        let user = &out.passwd.users[0];
        assert_eq!(user.name, "imds-user");
        assert_eq!(
            user.ssh_authorized_keys,
            ["ssh-rsa AAAA", "ssh-ed25519 BBBB"]
        );
        assert!(user
            .password_hash
            .as_deref()
            .is_some_and(|hash| hash.starts_with("$6$")));

        let sshd = file_by_path(&out, SSHD_DROP_IN_PATH)
            .expect("sshd drop-in should be injected");
        assert_eq!(sshd.mode, Some(0o644));
        let body =
            decode_data_url(sshd.contents.source.as_deref().unwrap()).unwrap();
        assert_eq!(body, b"PasswordAuthentication no\n");

        let sudoers = file_by_path(&out, SUDOERS_DROP_IN_PATH)
            .expect("sudoers drop-in should be injected");
        assert_eq!(sudoers.mode, Some(0o600));
        let body = decode_data_url(sudoers.contents.source.as_deref().unwrap())
            .unwrap();
        assert_eq!(body, b"imds-user ALL=(ALL) NOPASSWD:ALL\n");

        let custom_data = file_by_path(&out, CUSTOM_DATA_PATH)
            .expect("custom data should be materialized");
        assert_eq!(custom_data.mode, Some(0o600));
        let body =
            decode_data_url(custom_data.contents.source.as_deref().unwrap())
                .unwrap();
        assert_eq!(body, b"echo hello\n");

        let unit = out
            .systemd
            .units
            .iter()
            .find(|u| u.name == RESOURCE_DISK_UNIT)
            .expect("resource disk unit should be injected");
        assert_eq!(unit.enabled, Some(true));
        assert!(unit
            .contents
            .as_deref()
            .is_some_and(|c| c.contains("Where=/mnt/resource")));
    }

    #[test]
    fn missing_username_fails_user_knob() {
        let config = config_with_knobs(AzureExtensions {
            user_enabled: Some(true),
            ..Default::default()
        });
        assert!(matches!(
            apply_extensions_with_rng(
                &logger(),
                config,
                &AzureInputs::default(),
                &mut rng()
            ),
            Err(ExpandError::MissingAdminUsername)
        ));
    }

    #[test]
    fn sshd_conflict_refuses_to_inject() {
        let mut config = config_with_knobs(AzureExtensions {
            sshd_drop_in_enabled: Some(true),
            ..Default::default()
        });
        config.storage.files.push(File {
            path: SSHD_DROP_IN_PATH.to_owned(),
            ..Default::default()
        });

        let err = apply_extensions_with_rng(
            &logger(),
            config,
            &AzureInputs { imds: Some(IMDS_JSON), ovf: None },
            &mut rng(),
        )
        .unwrap_err();
        let ExpandError::Conflict(report) = err else {
            panic!("expected a conflict, got {err:?}");
        };
        assert_eq!(report.entries().len(), 1);
        assert_eq!(
            report.entries()[0].path.to_string(),
            "$.storage.files.0.path"
        );
    }

    #[test]
    fn resource_disk_conflicts() {
        let base = AzureExtensions {
            resource_disk_enabled: Some(true),
            ..Default::default()
        };

        let mut with_unit = config_with_knobs(base.clone());
        with_unit.systemd.units.push(Unit {
            name: RESOURCE_DISK_UNIT.to_owned(),
            contents: Some("[Mount]\nWhere=/elsewhere".to_owned()),
            ..Default::default()
        });
        assert!(matches!(
            apply_extensions_with_rng(
                &logger(),
                with_unit,
                &AzureInputs::default(),
                &mut rng()
            ),
            Err(ExpandError::Conflict(_))
        ));

        let mut with_filesystem = config_with_knobs(base.clone());
        with_filesystem.storage.filesystems.push(
            latest::storage::Filesystem {
                device: "/dev/sdb1".to_owned(),
                path: Some("/mnt/resource".to_owned()),
                ..Default::default()
            },
        );
        assert!(matches!(
            apply_extensions_with_rng(
                &logger(),
                with_filesystem,
                &AzureInputs::default(),
                &mut rng()
            ),
            Err(ExpandError::Conflict(_))
        ));

        let mut with_link = config_with_knobs(base);
        with_link.storage.links.push(Link {
            path: format!("/etc/systemd/system/{RESOURCE_DISK_UNIT}"),
            target: "/dev/null".to_owned(),
            ..Default::default()
        });
        assert!(matches!(
            apply_extensions_with_rng(
                &logger(),
                with_link,
                &AzureInputs::default(),
                &mut rng()
            ),
            Err(ExpandError::Conflict(_))
        ));
    }

    #[test]
    fn admin_user_conflict() {
        let mut config = config_with_knobs(AzureExtensions {
            user_enabled: Some(true),
            ..Default::default()
        });
        config.passwd.users.push(PasswdUser {
            name: "imds-user".to_owned(),
            ..Default::default()
        });
        assert!(matches!(
            apply_extensions_with_rng(
                &logger(),
                config,
                &AzureInputs { imds: Some(IMDS_JSON), ovf: None },
                &mut rng()
            ),
            Err(ExpandError::Conflict(_))
        ));
    }

    #[test]
    fn disabled_knob_skips_conflict_check() {
        // Explicit false and null both mean "hands off": a user-authored
        // file at the managed path is fine.
        for knob in [Some(false), None] {
            let mut config = config_with_knobs(AzureExtensions {
                sshd_drop_in_enabled: knob,
                resource_disk_enabled: Some(true),
                ..Default::default()
            });
            config.storage.files.push(File {
                path: SSHD_DROP_IN_PATH.to_owned(),
                ..Default::default()
            });

            let out = apply_extensions_with_rng(
                &logger(),
                config,
                &AzureInputs::default(),
                &mut rng(),
            )
            .unwrap();
            assert_eq!(out.storage.files.len(), 1);
            assert!(out
                .systemd
                .units
                .iter()
                .any(|u| u.name == RESOURCE_DISK_UNIT));
        }
    }
}
