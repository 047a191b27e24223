//! Command abstractions.

use uuid::Uuid;

use crate::member::{ChannelId, GuildId, Member};

/// Trait that all commands implement.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// The type name for this command (for logging/routing).
    fn command_type(&self) -> &'static str;

    /// Where and by whom the command was issued.
    fn context(&self) -> &CommandContext;

    /// Correlation ID to trace this command through the system.
    fn correlation_id(&self) -> Uuid {
        self.context().correlation_id
    }
}

/// Origin of a command on the host platform.
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// Session scope the command targets.
    pub guild_id: GuildId,
    /// Channel the command was typed in.
    pub channel_id: ChannelId,
    /// Member who issued the command.
    pub issuer: Member,
    /// Correlation ID for tracing.
    pub correlation_id: Uuid,
}

impl CommandContext {
    /// Builds a context with a fresh correlation ID.
    #[must_use]
    pub fn new(guild_id: GuildId, channel_id: ChannelId, issuer: Member) -> Self {
        Self {
            guild_id,
            channel_id,
            issuer,
            correlation_id: Uuid::new_v4(),
        }
    }
}
