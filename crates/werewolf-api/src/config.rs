//! Server configuration, read from the environment.
//!
//! A `.env` file in the working directory is loaded first if present;
//! variables already set in the environment win.

use std::net::SocketAddr;
use std::str::FromStr;

use werewolf_core::member::{ChannelId, GuildId};
use werewolf_game::application::command_handlers::CommandPolicy;

use crate::error::AppError;

/// Runtime configuration for the HTTP host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Interface to bind (`HOST`, default `0.0.0.0`).
    pub host: String,
    /// Port to bind (`PORT`, default `3000`).
    pub port: u16,
    /// Only guild commands are accepted from (`WEREWOLF_GUILD_ID`).
    pub guild_id: Option<GuildId>,
    /// Only channel narrator commands are accepted from
    /// (`WEREWOLF_CONTROL_CHANNEL_ID`).
    pub control_channel_id: Option<ChannelId>,
    /// Seed for reproducible role allocation (`WEREWOLF_RNG_SEED`).
    pub rng_seed: Option<u64>,
}

impl AppConfig {
    /// Loads `.env` if present, then reads the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable is set but malformed.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable is set but malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_owned()),
            port: parse(&lookup, "PORT")?.unwrap_or(3000),
            guild_id: parse(&lookup, "WEREWOLF_GUILD_ID")?.map(GuildId),
            control_channel_id: parse(&lookup, "WEREWOLF_CONTROL_CHANNEL_ID")?.map(ChannelId),
            rng_seed: parse(&lookup, "WEREWOLF_RNG_SEED")?,
        })
    }

    /// Socket address to listen on.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `HOST:PORT` is not a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))
    }

    /// Where game commands are accepted from.
    #[must_use]
    pub fn command_policy(&self) -> CommandPolicy {
        CommandPolicy {
            guild: self.guild_id,
            control_channel: self.control_channel_id,
        }
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key)
        .filter(|raw| !raw.trim().is_empty())
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| AppError::Config(format!("{key} is invalid: {e}")))
        })
        .transpose()
}
