//! The outbound command surface the engine requires from the platform client.
//!
//! Everything the engine does to a live guild goes through [`PlatformClient`].
//! The real implementation wraps the chat platform's HTTP/gateway client;
//! tests substitute an in-memory mock. Every method is fallible: command
//! rejections (missing rights, rate limits, entity already gone) surface as
//! errors and are handled at the call site, never propagated into the
//! event-dispatch loop.

pub mod types;

pub use types::{
    ActorId, AuditAction, ChannelId, ChannelInfo, ChannelKind, ChannelSpec, GuildId,
    OverwriteTarget, PermissionOverwrite, Permissions, RoleId, RoleInfo,
};

use anyhow::Result;
use async_trait::async_trait;

/// Commands and queries against the live platform.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// The engine's own acting identity.
    fn self_id(&self) -> ActorId;

    async fn guild_owner(&self, guild: &GuildId) -> Result<ActorId>;

    /// Roles currently held by a member.
    async fn member_roles(&self, guild: &GuildId, member: &ActorId) -> Result<Vec<RoleInfo>>;

    /// All members currently holding the given role.
    async fn members_with_role(&self, guild: &GuildId, role: &RoleId) -> Result<Vec<ActorId>>;

    async fn role_info(&self, guild: &GuildId, role: &RoleId) -> Result<RoleInfo>;

    async fn ban(&self, guild: &GuildId, actor: &ActorId, reason: &str) -> Result<()>;

    async fn kick(&self, guild: &GuildId, actor: &ActorId, reason: &str) -> Result<()>;

    async fn add_role(
        &self,
        guild: &GuildId,
        member: &ActorId,
        role: &RoleId,
        reason: &str,
    ) -> Result<()>;

    async fn remove_role(
        &self,
        guild: &GuildId,
        member: &ActorId,
        role: &RoleId,
        reason: &str,
    ) -> Result<()>;

    /// IDs of every channel and category in the guild.
    async fn channel_ids(&self, guild: &GuildId) -> Result<Vec<ChannelId>>;

    /// Detail for a single channel. Fetched per entry so a failing read
    /// degrades one snapshot record, not the whole capture.
    async fn channel_info(&self, guild: &GuildId, channel: &ChannelId) -> Result<ChannelInfo>;

    async fn create_channel(&self, guild: &GuildId, spec: &ChannelSpec) -> Result<ChannelId>;

    async fn delete_channel(&self, guild: &GuildId, channel: &ChannelId, reason: &str)
        -> Result<()>;

    async fn set_channel_parent(
        &self,
        guild: &GuildId,
        channel: &ChannelId,
        parent: &ChannelId,
    ) -> Result<()>;

    async fn set_channel_position(
        &self,
        guild: &GuildId,
        channel: &ChannelId,
        position: i64,
    ) -> Result<()>;

    async fn create_permission_overwrite(
        &self,
        guild: &GuildId,
        channel: &ChannelId,
        overwrite: &PermissionOverwrite,
    ) -> Result<()>;

    /// Best-effort executor attribution from the guild audit log, for events
    /// the platform delivers without an actor (channel deletions, bans).
    async fn fetch_audit_log_executor(
        &self,
        guild: &GuildId,
        action: AuditAction,
    ) -> Result<Option<ActorId>>;

    /// Highest role position held by a member; 0 when the member holds no
    /// roles (the everyone-level floor).
    async fn highest_role_position(&self, guild: &GuildId, member: &ActorId) -> Result<i64> {
        let roles = self.member_roles(guild, member).await?;
        Ok(roles.iter().map(|r| r.position).max().unwrap_or(0))
    }
}
