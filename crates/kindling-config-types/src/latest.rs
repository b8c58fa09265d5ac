// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Re-exports of the latest versions of all published types.
//!
//! Business logic should use these re-exports rather than versioned
//! identifiers directly.

pub use crate::v3_2::Config;

pub mod ignition {
    pub use crate::v3_2::ignition::AzureExtensions;
    pub use crate::v3_2::ignition::Extensions;
    pub use crate::v3_2::ignition::Ignition;

    pub use crate::v3_1::ignition::HttpHeader;
    pub use crate::v3_1::ignition::IgnitionConfig;
    pub use crate::v3_1::ignition::Proxy;
    pub use crate::v3_1::ignition::Resource;
    pub use crate::v3_1::ignition::Security;
    pub use crate::v3_1::ignition::Timeouts;
    pub use crate::v3_1::ignition::Tls;
    pub use crate::v3_1::ignition::Verification;
}

pub mod storage {
    pub use crate::v3_1::storage::Directory;
    pub use crate::v3_1::storage::Disk;
    pub use crate::v3_1::storage::File;
    pub use crate::v3_1::storage::Filesystem;
    pub use crate::v3_1::storage::Link;
    pub use crate::v3_1::storage::NodeGroup;
    pub use crate::v3_1::storage::NodeUser;
    pub use crate::v3_1::storage::Partition;
    pub use crate::v3_1::storage::Raid;
    pub use crate::v3_1::storage::Storage;
}

pub mod systemd {
    pub use crate::v3_1::systemd::Dropin;
    pub use crate::v3_1::systemd::Systemd;
    pub use crate::v3_1::systemd::Unit;
}

pub mod passwd {
    pub use crate::v3_1::passwd::Passwd;
    pub use crate::v3_1::passwd::PasswdGroup;
    pub use crate::v3_1::passwd::PasswdUser;
}
