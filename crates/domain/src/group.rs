use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

/// Normalized in-game group tag, e.g. `#2PQ8YLV`. Tags coming from user
/// input or the upstream API may differ in case and may omit the leading
/// `#`; normalizing here keeps cache keys and database rows consistent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupRef(String);

impl GroupRef {
    pub fn new(tag: &str) -> Self {
        let tag = tag.trim().to_uppercase();
        if tag.starts_with('#') {
            Self(tag)
        } else {
            Self(format!("#{}", tag))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for GroupRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Chat-platform guild identifier (opaque snowflake).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GuildId(String);

impl GuildId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for GuildId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Chat-platform channel identifier (opaque snowflake).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// In-game rank of a group member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GroupRole {
    Leader,
    CoLeader,
    Elder,
    Member,
}

impl Display for GroupRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GroupRole::Leader => "leader",
            GroupRole::CoLeader => "coLeader",
            GroupRole::Elder => "elder",
            GroupRole::Member => "member",
        };
        write!(f, "{}", s)
    }
}

#[derive(Error, Debug)]
pub enum InvalidGroupRoleError {
    #[error("Group role: {0} is not known")]
    Unknown(String),
}

impl FromStr for GroupRole {
    type Err = InvalidGroupRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "leader" => Ok(GroupRole::Leader),
            "coleader" | "co_leader" => Ok(GroupRole::CoLeader),
            "elder" | "admin" => Ok(GroupRole::Elder),
            "member" => Ok(GroupRole::Member),
            _ => Err(InvalidGroupRoleError::Unknown(s.to_string())),
        }
    }
}

/// A group the guild tracks. Reminders with an empty group list expand to
/// every linked group of their guild.
#[derive(Debug, Clone, PartialEq)]
pub struct GuildGroupLink {
    pub guild_id: GuildId,
    pub group_ref: GroupRef,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn group_refs_are_normalized() {
        assert_eq!(GroupRef::new("#2pq8ylv"), GroupRef::new("2PQ8YLV"));
        assert_eq!(GroupRef::new(" #2PQ8YLV ").as_str(), "#2PQ8YLV");
    }

    #[test]
    fn parses_upstream_role_strings() {
        assert_eq!("coLeader".parse::<GroupRole>().unwrap(), GroupRole::CoLeader);
        assert_eq!("admin".parse::<GroupRole>().unwrap(), GroupRole::Elder);
        assert!("king".parse::<GroupRole>().is_err());
    }
}
