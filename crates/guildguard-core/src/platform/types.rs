//! Identifier newtypes and platform data types shared across the engine.

use std::fmt;
use std::ops::{BitAnd, BitOr, Not};

use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

id_type!(
    /// Opaque identifier of a protected guild.
    GuildId
);
id_type!(
    /// Identifier of an actor (human or bot) within a guild.
    ActorId
);
id_type!(
    /// Identifier of a channel or category.
    ChannelId
);
id_type!(
    /// Identifier of a role.
    RoleId
);

/// Permission bitset, wire-compatible with the platform's u64 encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permissions(pub u64);

impl Permissions {
    pub const ADMINISTRATOR: Permissions = Permissions(1 << 3);
    pub const MANAGE_CHANNELS: Permissions = Permissions(1 << 4);
    pub const MANAGE_GUILD: Permissions = Permissions(1 << 5);
    pub const MANAGE_ROLES: Permissions = Permissions(1 << 28);

    /// Permissions that let an actor destroy or take over guild structure.
    pub const DANGEROUS: Permissions = Permissions(
        Self::ADMINISTRATOR.0 | Self::MANAGE_CHANNELS.0 | Self::MANAGE_GUILD.0 | Self::MANAGE_ROLES.0,
    );

    pub const fn empty() -> Self {
        Permissions(0)
    }

    pub const fn contains(self, other: Permissions) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if any of the dangerous bits is set.
    pub const fn is_dangerous(self) -> bool {
        self.0 & Self::DANGEROUS.0 != 0
    }

    /// The subset of dangerous bits present in this set.
    pub const fn dangerous_bits(self) -> Permissions {
        Permissions(self.0 & Self::DANGEROUS.0)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Permissions {
    type Output = Permissions;

    fn bitor(self, rhs: Permissions) -> Permissions {
        Permissions(self.0 | rhs.0)
    }
}

impl BitAnd for Permissions {
    type Output = Permissions;

    fn bitand(self, rhs: Permissions) -> Permissions {
        Permissions(self.0 & rhs.0)
    }
}

impl Not for Permissions {
    type Output = Permissions;

    fn not(self) -> Permissions {
        Permissions(!self.0)
    }
}

/// The three structural channel kinds the snapshotter captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Category,
    Text,
    Voice,
}

/// Whether a permission overwrite targets a role or a single member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverwriteTarget {
    Role,
    Member,
}

/// A single allow/deny permission overwrite on a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionOverwrite {
    pub target_id: String,
    pub target_kind: OverwriteTarget,
    pub allow: Permissions,
    pub deny: Permissions,
}

/// Full description of a live channel, as read from the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub id: ChannelId,
    pub name: String,
    pub kind: ChannelKind,
    pub parent_id: Option<ChannelId>,
    pub position: i64,
    pub topic: Option<String>,
    pub nsfw: bool,
    pub rate_limit_per_user: u32,
    pub overwrites: Vec<PermissionOverwrite>,
}

/// Parameters for creating a channel. Parenting, positioning, and
/// overwrites are applied with separate calls after creation.
#[derive(Debug, Clone)]
pub struct ChannelSpec {
    pub name: String,
    pub kind: ChannelKind,
    pub topic: Option<String>,
    pub nsfw: bool,
    pub rate_limit_per_user: u32,
}

/// A role as seen on a member or in the guild role list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleInfo {
    pub id: RoleId,
    pub name: String,
    /// Position in the guild hierarchy; higher outranks lower.
    pub position: i64,
    pub permissions: Permissions,
    /// Managed roles (integration-owned) cannot be manually removed.
    pub managed: bool,
}

/// Audit-log action classes the engine queries for executor attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    ChannelDelete,
    MemberBan,
}
