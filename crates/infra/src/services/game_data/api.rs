use super::{GameDataError, IGameDataClient};
use chrono::DateTime;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use warden_domain::{Cycle, CycleState, EventFamily, GroupRef, Member, MemberProgress};

/// HTTP client against the game data retrieval service.
pub struct GameApiClient {
    client: Client,
    base_url: String,
    api_token: Option<String>,
}

impl GameApiClient {
    pub fn new(base_url: String, api_token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_token,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiDateTime(String);

impl ApiDateTime {
    fn timestamp_millis(&self) -> anyhow::Result<i64> {
        let parsed = DateTime::parse_from_rfc3339(&self.0)?;
        Ok(parsed.timestamp_millis())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CycleSnapshotDto {
    state: String,
    start_time: ApiDateTime,
    end_time: ApiDateTime,
    #[serde(default)]
    members: Vec<MemberDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MemberDto {
    tag: String,
    name: String,
    role: String,
    #[serde(default)]
    participant: bool,
    #[serde(default)]
    attacks_used: Option<u32>,
    #[serde(default)]
    attacks_available: Option<u32>,
    #[serde(default)]
    points: Option<i64>,
}

impl MemberDto {
    fn into_domain(self, family: EventFamily) -> anyhow::Result<Member> {
        let progress = match family {
            EventFamily::War => MemberProgress::War {
                attacks_used: self.attacks_used.unwrap_or(0),
                attacks_available: self.attacks_available.unwrap_or(2),
            },
            EventFamily::Raid => MemberProgress::Raid {
                attacks_used: self.attacks_used.unwrap_or(0),
                attacks_available: self.attacks_available.unwrap_or(6),
            },
            EventFamily::PointsEvent => MemberProgress::Points {
                points: self.points.unwrap_or(0),
            },
        };
        Ok(Member {
            tag: self.tag,
            name: self.name,
            role: self.role.parse()?,
            participant: self.participant,
            progress,
        })
    }
}

impl CycleSnapshotDto {
    fn into_domain(self, family: EventFamily, group_ref: GroupRef) -> anyhow::Result<Cycle> {
        let state = match self.state.as_str() {
            "pending" | "preparation" => CycleState::Pending,
            "active" | "inProgress" => CycleState::Active,
            "ended" => CycleState::Ended,
            other => anyhow::bail!("Unknown cycle state: {}", other),
        };
        let start_ts = self.start_time.timestamp_millis()?;
        let end_ts = self.end_time.timestamp_millis()?;
        let members = self
            .members
            .into_iter()
            .map(|m| m.into_domain(family))
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Cycle::new(family, group_ref, start_ts, end_ts, state, members))
    }
}

#[async_trait::async_trait]
impl IGameDataClient for GameApiClient {
    async fn get_active_cycle(
        &self,
        family: EventFamily,
        group_ref: &GroupRef,
    ) -> Result<Option<Cycle>, GameDataError> {
        let url = format!(
            "{}/groups/{}/cycles/{}/current",
            self.base_url,
            group_ref.as_str().replace('#', "%23"),
            family
        );
        let mut req = self.client.get(&url);
        if let Some(token) = &self.api_token {
            req = req.bearer_auth(token);
        }

        let res = req
            .send()
            .await
            .map_err(|e| GameDataError::Unavailable(e.to_string()))?;

        match res.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let dto = res
                    .json::<CycleSnapshotDto>()
                    .await
                    .map_err(|e| GameDataError::Unavailable(e.to_string()))?;
                dto.into_domain(family, group_ref.clone())
                    .map(Some)
                    .map_err(|e| GameDataError::Unavailable(e.to_string()))
            }
            status => Err(GameDataError::Unavailable(format!(
                "Unexpected status code: {}",
                status
            ))),
        }
    }
}
