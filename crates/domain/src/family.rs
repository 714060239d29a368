use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

/// The three recurring in-game event kinds the engine schedules reminders
/// for. Each family has its own cycle cadence and its own per-member
/// progress fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventFamily {
    War,
    Raid,
    PointsEvent,
}

impl Display for EventFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EventFamily::War => "war",
            EventFamily::Raid => "raid",
            EventFamily::PointsEvent => "points_event",
        };
        write!(f, "{}", s)
    }
}

#[derive(Error, Debug)]
pub enum InvalidEventFamilyError {
    #[error("Event family: {0} is not known")]
    Unknown(String),
}

impl FromStr for EventFamily {
    type Err = InvalidEventFamilyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "war" => Ok(EventFamily::War),
            "raid" => Ok(EventFamily::Raid),
            "points_event" => Ok(EventFamily::PointsEvent),
            _ => Err(InvalidEventFamilyError::Unknown(s.to_string())),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_wire_representation() {
        for family in [EventFamily::War, EventFamily::Raid, EventFamily::PointsEvent].iter() {
            assert_eq!(family.to_string().parse::<EventFamily>().unwrap(), *family);
        }
        assert!("clan_games".parse::<EventFamily>().is_err());
    }
}
