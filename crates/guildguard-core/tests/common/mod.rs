//! In-memory platform mock shared by the integration tests.
//!
//! Records every outbound command so tests can assert exactly which
//! mitigation and restore calls were issued, and lets individual commands
//! be forced to fail to exercise the graduated-response and best-effort
//! paths.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;

use guildguard_core::platform::{
    ActorId, AuditAction, ChannelId, ChannelInfo, ChannelSpec, GuildId, PermissionOverwrite,
    PlatformClient, RoleId, RoleInfo,
};

/// One outbound command observed by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ban { actor: ActorId },
    Kick { actor: ActorId },
    AddRole { member: ActorId, role: RoleId },
    RemoveRole { member: ActorId, role: RoleId },
    CreateChannel { name: String },
    DeleteChannel { channel: ChannelId },
    SetParent { channel: ChannelId, parent: ChannelId },
    SetPosition { channel: ChannelId, position: i64 },
    CreateOverwrite { channel: ChannelId, target: String },
}

#[derive(Default)]
pub struct MockPlatform {
    pub self_id: ActorId,
    pub owner: ActorId,
    pub commands: Mutex<Vec<Command>>,
    pub member_roles: Mutex<HashMap<ActorId, Vec<RoleInfo>>>,
    pub roles: Mutex<HashMap<RoleId, RoleInfo>>,
    pub role_holders: Mutex<HashMap<RoleId, Vec<ActorId>>>,
    pub channels: Mutex<HashMap<ChannelId, ChannelInfo>>,
    pub audit_executor: Mutex<Option<ActorId>>,
    /// Channel IDs whose detail fetch fails.
    pub unreadable_channels: Mutex<HashSet<ChannelId>>,
    pub fail_ban: AtomicBool,
    pub fail_role_removal: AtomicBool,
    /// Channel names whose creation fails.
    pub fail_create_names: Mutex<HashSet<String>>,
    next_channel: AtomicUsize,
}

impl MockPlatform {
    pub fn new(self_id: &str, owner: &str) -> Self {
        Self {
            self_id: ActorId::from(self_id),
            owner: ActorId::from(owner),
            ..Self::default()
        }
    }

    pub fn commands(&self) -> Vec<Command> {
        self.commands.lock().unwrap().clone()
    }

    pub fn clear_commands(&self) {
        self.commands.lock().unwrap().clear();
    }

    pub fn bans(&self) -> Vec<ActorId> {
        self.commands()
            .into_iter()
            .filter_map(|c| match c {
                Command::Ban { actor } => Some(actor),
                _ => None,
            })
            .collect()
    }

    pub fn removed_roles(&self) -> Vec<(ActorId, RoleId)> {
        self.commands()
            .into_iter()
            .filter_map(|c| match c {
                Command::RemoveRole { member, role } => Some((member, role)),
                _ => None,
            })
            .collect()
    }

    pub fn created_channels(&self) -> Vec<String> {
        self.commands()
            .into_iter()
            .filter_map(|c| match c {
                Command::CreateChannel { name } => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn deleted_channels(&self) -> Vec<ChannelId> {
        self.commands()
            .into_iter()
            .filter_map(|c| match c {
                Command::DeleteChannel { channel } => Some(channel),
                _ => None,
            })
            .collect()
    }

    /// Give a member a set of roles, registering each role definition too.
    pub fn set_member_roles(&self, member: &ActorId, roles: Vec<RoleInfo>) {
        for role in &roles {
            self.roles.lock().unwrap().insert(role.id.clone(), role.clone());
            self.role_holders
                .lock()
                .unwrap()
                .entry(role.id.clone())
                .or_default()
                .push(member.clone());
        }
        self.member_roles.lock().unwrap().insert(member.clone(), roles);
    }

    fn record(&self, command: Command) {
        self.commands.lock().unwrap().push(command);
    }
}

#[async_trait]
impl PlatformClient for MockPlatform {
    fn self_id(&self) -> ActorId {
        self.self_id.clone()
    }

    async fn guild_owner(&self, _guild: &GuildId) -> Result<ActorId> {
        Ok(self.owner.clone())
    }

    async fn member_roles(&self, _guild: &GuildId, member: &ActorId) -> Result<Vec<RoleInfo>> {
        Ok(self
            .member_roles
            .lock()
            .unwrap()
            .get(member)
            .cloned()
            .unwrap_or_default())
    }

    async fn members_with_role(&self, _guild: &GuildId, role: &RoleId) -> Result<Vec<ActorId>> {
        Ok(self
            .role_holders
            .lock()
            .unwrap()
            .get(role)
            .cloned()
            .unwrap_or_default())
    }

    async fn role_info(&self, _guild: &GuildId, role: &RoleId) -> Result<RoleInfo> {
        self.roles
            .lock()
            .unwrap()
            .get(role)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("unknown role {role}"))
    }

    async fn ban(&self, _guild: &GuildId, actor: &ActorId, _reason: &str) -> Result<()> {
        self.record(Command::Ban {
            actor: actor.clone(),
        });
        if self.fail_ban.load(Ordering::SeqCst) {
            bail!("missing ban permission");
        }
        Ok(())
    }

    async fn kick(&self, _guild: &GuildId, actor: &ActorId, _reason: &str) -> Result<()> {
        self.record(Command::Kick {
            actor: actor.clone(),
        });
        Ok(())
    }

    async fn add_role(
        &self,
        _guild: &GuildId,
        member: &ActorId,
        role: &RoleId,
        _reason: &str,
    ) -> Result<()> {
        self.record(Command::AddRole {
            member: member.clone(),
            role: role.clone(),
        });
        Ok(())
    }

    async fn remove_role(
        &self,
        _guild: &GuildId,
        member: &ActorId,
        role: &RoleId,
        _reason: &str,
    ) -> Result<()> {
        self.record(Command::RemoveRole {
            member: member.clone(),
            role: role.clone(),
        });
        if self.fail_role_removal.load(Ordering::SeqCst) {
            bail!("missing manage-roles permission");
        }
        Ok(())
    }

    async fn channel_ids(&self, _guild: &GuildId) -> Result<Vec<ChannelId>> {
        let mut ids: Vec<ChannelId> = self.channels.lock().unwrap().keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    async fn channel_info(&self, _guild: &GuildId, channel: &ChannelId) -> Result<ChannelInfo> {
        if self.unreadable_channels.lock().unwrap().contains(channel) {
            bail!("channel fetch failed");
        }
        self.channels
            .lock()
            .unwrap()
            .get(channel)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("unknown channel {channel}"))
    }

    async fn create_channel(&self, _guild: &GuildId, spec: &ChannelSpec) -> Result<ChannelId> {
        self.record(Command::CreateChannel {
            name: spec.name.clone(),
        });
        if self.fail_create_names.lock().unwrap().contains(&spec.name) {
            bail!("channel creation rejected");
        }
        let n = self.next_channel.fetch_add(1, Ordering::SeqCst);
        Ok(ChannelId::from(format!("new-{n}").as_str()))
    }

    async fn delete_channel(
        &self,
        _guild: &GuildId,
        channel: &ChannelId,
        _reason: &str,
    ) -> Result<()> {
        self.record(Command::DeleteChannel {
            channel: channel.clone(),
        });
        Ok(())
    }

    async fn set_channel_parent(
        &self,
        _guild: &GuildId,
        channel: &ChannelId,
        parent: &ChannelId,
    ) -> Result<()> {
        self.record(Command::SetParent {
            channel: channel.clone(),
            parent: parent.clone(),
        });
        Ok(())
    }

    async fn set_channel_position(
        &self,
        _guild: &GuildId,
        channel: &ChannelId,
        position: i64,
    ) -> Result<()> {
        self.record(Command::SetPosition {
            channel: channel.clone(),
            position,
        });
        Ok(())
    }

    async fn create_permission_overwrite(
        &self,
        _guild: &GuildId,
        channel: &ChannelId,
        overwrite: &PermissionOverwrite,
    ) -> Result<()> {
        self.record(Command::CreateOverwrite {
            channel: channel.clone(),
            target: overwrite.target_id.clone(),
        });
        Ok(())
    }

    async fn fetch_audit_log_executor(
        &self,
        _guild: &GuildId,
        _action: AuditAction,
    ) -> Result<Option<ActorId>> {
        Ok(self.audit_executor.lock().unwrap().clone())
    }
}

/// Convenience constructor for a role definition.
pub fn role(id: &str, position: i64, permissions: guildguard_core::platform::Permissions, managed: bool) -> RoleInfo {
    RoleInfo {
        id: RoleId::from(id),
        name: id.to_string(),
        position,
        permissions,
        managed,
    }
}
