use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{info, warn};
use warden_domain::{CalendarException, CycleBounds, EventFamily, FamilySchedule, ScheduleSet};

#[derive(Debug, Clone)]
pub struct Config {
    /// Seconds between scheduler ticks
    pub tick_interval_secs: u64,
    /// Extra lookahead on top of one tick interval so that a missed tick
    /// does not skip reminders that became due in the gap
    pub lookahead_margin_secs: u64,
    /// TTL for resolved cycles; many reminders targeting the same group in
    /// one tick share a single upstream fetch
    pub cycle_cache_ttl_millis: i64,
    /// Upper bound on concurrent upstream cycle fetches per tick
    pub resolver_concurrency: usize,
    /// Upper bound on concurrent outbound deliveries per tick
    pub dispatch_concurrency: usize,
    /// Delivery attempts per channel batch before the claim is rolled back
    pub dispatch_max_retries: u32,
    pub dispatch_retry_base_millis: u64,
    pub dispatch_retry_cap_millis: u64,
    /// Claims older than this without a commit are treated as abandoned by
    /// a crashed instance and released for retry
    pub claim_grace_millis: i64,
    pub game_api_base_url: String,
    pub game_api_token: Option<String>,
    pub messenger_base_url: String,
    pub messenger_webhook_key: Option<String>,
    pub schedules: ScheduleSet,
    pub calendar_exceptions: HashMap<EventFamily, Vec<CalendarException>>,
}

impl Config {
    pub fn new() -> Self {
        let game_api_base_url = match std::env::var("GAME_API_BASE_URL") {
            Ok(url) => url,
            Err(_) => {
                let url = "http://localhost:8600/v1".to_string();
                info!(
                    "Did not find GAME_API_BASE_URL environment variable. Falling back to: {}",
                    url
                );
                url
            }
        };
        let messenger_base_url = match std::env::var("MESSENGER_BASE_URL") {
            Ok(url) => url,
            Err(_) => {
                let url = "http://localhost:8700/v1".to_string();
                info!(
                    "Did not find MESSENGER_BASE_URL environment variable. Falling back to: {}",
                    url
                );
                url
            }
        };

        Self {
            tick_interval_secs: env_parse("TICK_INTERVAL_SECS", 120),
            lookahead_margin_secs: env_parse("LOOKAHEAD_MARGIN_SECS", 60),
            cycle_cache_ttl_millis: env_parse("CYCLE_CACHE_TTL_SECS", 30) * 1000,
            resolver_concurrency: env_parse("RESOLVER_CONCURRENCY", 8),
            dispatch_concurrency: env_parse("DISPATCH_CONCURRENCY", 4),
            dispatch_max_retries: env_parse("DISPATCH_MAX_RETRIES", 3),
            dispatch_retry_base_millis: env_parse("DISPATCH_RETRY_BASE_MILLIS", 500),
            dispatch_retry_cap_millis: env_parse("DISPATCH_RETRY_CAP_MILLIS", 10_000),
            claim_grace_millis: env_parse("CLAIM_GRACE_SECS", 600) * 1000,
            game_api_base_url,
            game_api_token: std::env::var("GAME_API_TOKEN").ok(),
            messenger_base_url,
            messenger_webhook_key: std::env::var("MESSENGER_WEBHOOK_KEY").ok(),
            schedules: schedules_from_env(),
            calendar_exceptions: load_calendar_exceptions(),
        }
    }

    pub fn exceptions_for(&self, family: EventFamily) -> &[CalendarException] {
        self.calendar_exceptions
            .get(&family)
            .map(|e| e.as_slice())
            .unwrap_or(&[])
    }

    pub fn tick_interval_millis(&self) -> i64 {
        (self.tick_interval_secs * 1000) as i64
    }

    /// One tick interval plus the safety margin, in millis.
    pub fn lookahead_millis(&self) -> i64 {
        ((self.tick_interval_secs + self.lookahead_margin_secs) * 1000) as i64
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

fn env_parse<T: FromStr + Copy + std::fmt::Display>(var: &str, default: T) -> T {
    match std::env::var(var) {
        Ok(raw) => match raw.parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!(
                    "The given {}: {} is not valid, falling back to the default: {}.",
                    var, raw, default
                );
                default
            }
        },
        Err(_) => default,
    }
}

/// The in-game calendar defaults, overridable per deployment since the
/// publisher changes the cadence from time to time.
fn schedules_from_env() -> ScheduleSet {
    let defaults = ScheduleSet::default();

    let war = match defaults.war {
        FamilySchedule::Rolling {
            anchor_ts,
            period_millis,
            active_millis,
        } => FamilySchedule::Rolling {
            anchor_ts: env_parse("WAR_CYCLE_ANCHOR_TS", anchor_ts),
            period_millis: env_parse("WAR_CYCLE_PERIOD_HOURS", period_millis / HOUR) * HOUR,
            active_millis: env_parse("WAR_CYCLE_ACTIVE_HOURS", active_millis / HOUR) * HOUR,
        },
        other => other,
    };
    let raid = match defaults.raid {
        FamilySchedule::Weekly {
            weekday,
            start_hour,
            duration_millis,
        } => FamilySchedule::Weekly {
            weekday,
            start_hour: env_parse("RAID_START_HOUR", start_hour),
            duration_millis: env_parse("RAID_DURATION_HOURS", duration_millis / HOUR) * HOUR,
        },
        other => other,
    };
    let points_event = match defaults.points_event {
        FamilySchedule::MonthlyDay {
            day_of_month,
            start_hour,
            duration_millis,
        } => FamilySchedule::MonthlyDay {
            day_of_month: env_parse("POINTS_EVENT_DAY_OF_MONTH", day_of_month),
            start_hour: env_parse("POINTS_EVENT_START_HOUR", start_hour),
            duration_millis: env_parse("POINTS_EVENT_DURATION_DAYS", duration_millis / DAY) * DAY,
        },
        other => other,
    };

    ScheduleSet {
        war,
        raid,
        points_event,
    }
}

const HOUR: i64 = 1000 * 60 * 60;
const DAY: i64 = 24 * HOUR;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarExceptionEntry {
    family: EventFamily,
    nominal_start_ts: i64,
    replacement_start_ts: i64,
    replacement_end_ts: i64,
}

fn load_calendar_exceptions() -> HashMap<EventFamily, Vec<CalendarException>> {
    let path = match std::env::var("CALENDAR_EXCEPTIONS_FILE") {
        Ok(path) => path,
        Err(_) => return HashMap::new(),
    };
    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(
                "Unable to read CALENDAR_EXCEPTIONS_FILE at {}: {}. No exceptions loaded.",
                path, e
            );
            return HashMap::new();
        }
    };
    let entries: Vec<CalendarExceptionEntry> = match serde_json::from_str(&raw) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(
                "CALENDAR_EXCEPTIONS_FILE at {} is malformed: {}. No exceptions loaded.",
                path, e
            );
            return HashMap::new();
        }
    };

    let mut exceptions: HashMap<EventFamily, Vec<CalendarException>> = HashMap::new();
    for entry in entries {
        exceptions
            .entry(entry.family)
            .or_insert_with(Vec::new)
            .push(CalendarException {
                nominal_start_ts: entry.nominal_start_ts,
                replacement: CycleBounds {
                    start_ts: entry.replacement_start_ts,
                    end_ts: entry.replacement_end_ts,
                },
            });
    }
    exceptions
}
