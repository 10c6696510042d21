//! Typed inbound platform events.
//!
//! Events are the fundamental unit flowing into the engine: the platform
//! gateway translates its wire payloads into [`GuildEvent`] values and hands
//! them to the [`router`](crate::event::router), which owns the single
//! subscription per event type and fans out to the registered handlers.

pub mod router;

pub use router::{EventHandler, EventRouter};

use chrono::{DateTime, Utc};

use crate::platform::{ActorId, ChannelId, GuildId, Permissions, RoleId};

/// The event classes the engine consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuildEventKind {
    ChannelCreated {
        channel_id: ChannelId,
        /// Creator, when the platform delivers attribution inline.
        actor_id: Option<ActorId>,
    },
    ChannelDeleted {
        channel_id: ChannelId,
        /// Deleter; usually absent and resolved via the audit log.
        actor_id: Option<ActorId>,
    },
    /// Out-of-band report that an actor deleted a channel, used when the
    /// platform does not attribute the deletion event itself.
    ReportedDeletion { actor_id: ActorId },
    MemberRolesUpdated {
        member_id: ActorId,
        added: Vec<RoleId>,
        removed: Vec<RoleId>,
    },
    RoleUpdated {
        role_id: RoleId,
        old_permissions: Permissions,
        new_permissions: Permissions,
    },
    MemberBanned {
        member_id: ActorId,
        /// Banning moderator, when attributed inline.
        actor_id: Option<ActorId>,
    },
}

impl GuildEventKind {
    /// Stable snake_case name, used in logs and moderation records.
    pub fn name(&self) -> &'static str {
        match self {
            GuildEventKind::ChannelCreated { .. } => "channel_created",
            GuildEventKind::ChannelDeleted { .. } => "channel_deleted",
            GuildEventKind::ReportedDeletion { .. } => "reported_deletion",
            GuildEventKind::MemberRolesUpdated { .. } => "member_roles_updated",
            GuildEventKind::RoleUpdated { .. } => "role_updated",
            GuildEventKind::MemberBanned { .. } => "member_banned",
        }
    }
}

/// One inbound event scoped to a guild.
#[derive(Debug, Clone)]
pub struct GuildEvent {
    pub guild_id: GuildId,
    pub timestamp: DateTime<Utc>,
    pub kind: GuildEventKind,
}

impl GuildEvent {
    /// Construct an event stamped with the current time.
    pub fn now(guild_id: GuildId, kind: GuildEventKind) -> Self {
        Self {
            guild_id,
            timestamp: Utc::now(),
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_are_snake_case() {
        let kind = GuildEventKind::ReportedDeletion {
            actor_id: ActorId::from("a"),
        };
        assert_eq!(kind.name(), "reported_deletion");
    }
}
