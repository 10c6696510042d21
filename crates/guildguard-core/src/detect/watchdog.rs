//! Permission escalation watchdog.
//!
//! Reacts to privilege-granting events before the actor's session can use
//! them: a member gaining a role that grants a dangerous permission, or a
//! role definition edited to add a dangerous permission it did not have.
//! The watchdog only removes roles -- it never bans or kicks. Escalation to
//! stronger mitigation is delegated through [`DangerSink`].

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::event::{EventHandler, GuildEvent, GuildEventKind};
use crate::platform::{ActorId, GuildId, Permissions, PlatformClient, RoleId};

/// Receiver of confirmed-danger signals, typically the mitigation engine.
#[async_trait]
pub trait DangerSink: Send + Sync {
    async fn on_danger(&self, guild: &GuildId, actor: &ActorId, trigger: &str);
}

/// Reactive revoker of dangerous permission grants.
pub struct EscalationWatchdog {
    platform: Arc<dyn PlatformClient>,
    whitelist: HashSet<ActorId>,
    danger: Arc<dyn DangerSink>,
}

impl EscalationWatchdog {
    pub fn new(
        platform: Arc<dyn PlatformClient>,
        whitelist: HashSet<ActorId>,
        danger: Arc<dyn DangerSink>,
    ) -> Self {
        Self {
            platform,
            whitelist,
            danger,
        }
    }

    /// A member gained roles. Strip whichever of them grant dangerous
    /// permissions. Grants of only benign roles are ignored, even for
    /// members who were already privileged before the update: effective
    /// permissions are a bitwise union, so a benign grant cannot make the
    /// set dangerous.
    pub async fn on_member_roles_updated(
        &self,
        guild: &GuildId,
        member: &ActorId,
        added: &[RoleId],
    ) -> Result<()> {
        if added.is_empty() {
            return Ok(());
        }
        if self.whitelist.contains(member) {
            debug!(guild = %guild, member = %member, "whitelisted member gained roles; ignoring");
            return Ok(());
        }

        let mut dangerous: Vec<&RoleId> = Vec::new();
        for role in added {
            let info = self.platform.role_info(guild, role).await?;
            if info.permissions.is_dangerous() {
                dangerous.push(role);
            }
        }

        if dangerous.is_empty() {
            return Ok(());
        }

        let mut stripped = 0usize;
        for role in dangerous {
            match self
                .platform
                .remove_role(guild, member, role, "dangerous permission grant revoked")
                .await
            {
                Ok(()) => {
                    info!(guild = %guild, member = %member, role = %role, "stripped dangerous role");
                    stripped += 1;
                }
                Err(e) => {
                    warn!(guild = %guild, member = %member, role = %role, error = %e, "failed to strip role");
                }
            }
        }

        if stripped > 0 {
            self.danger
                .on_danger(guild, member, "member_gained_dangerous_role")
                .await;
        }
        Ok(())
    }

    /// A role definition changed. If it gained a dangerous permission it
    /// did not have before, strip it from every non-whitelisted holder.
    pub async fn on_role_updated(
        &self,
        guild: &GuildId,
        role: &RoleId,
        old_permissions: Permissions,
        new_permissions: Permissions,
    ) -> Result<()> {
        let gained = new_permissions.dangerous_bits() & !old_permissions.dangerous_bits();
        if gained.is_empty() {
            return Ok(());
        }
        info!(guild = %guild, role = %role, gained = ?gained, "role gained dangerous permissions");

        let holders = self.platform.members_with_role(guild, role).await?;
        for member in holders {
            if self.whitelist.contains(&member) {
                continue;
            }
            match self
                .platform
                .remove_role(guild, &member, role, "role escalated to dangerous permissions")
                .await
            {
                Ok(()) => {
                    self.danger
                        .on_danger(guild, &member, "role_escalated_to_dangerous")
                        .await;
                }
                Err(e) => {
                    warn!(guild = %guild, member = %member, role = %role, error = %e, "failed to strip escalated role");
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl EventHandler for EscalationWatchdog {
    fn name(&self) -> &'static str {
        "escalation-watchdog"
    }

    async fn handle(&self, event: &GuildEvent) -> Result<()> {
        match &event.kind {
            GuildEventKind::MemberRolesUpdated {
                member_id, added, ..
            } => {
                self.on_member_roles_updated(&event.guild_id, member_id, added)
                    .await
            }
            GuildEventKind::RoleUpdated {
                role_id,
                old_permissions,
                new_permissions,
            } => {
                self.on_role_updated(&event.guild_id, role_id, *old_permissions, *new_permissions)
                    .await
            }
            _ => Ok(()),
        }
    }
}
