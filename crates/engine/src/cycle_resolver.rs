use tracing::warn;
use warden_domain::{Cycle, EventFamily, GroupRef};
use warden_infra::{GameDataError, WardenContext};

#[derive(Debug, PartialEq)]
pub enum ResolveError {
    /// Upstream game data could not answer; retry on the next tick. Never
    /// conflated with "no live cycle".
    Unavailable,
}

/// Resolve the live cycle of a group through the process-wide cycle cache.
/// Found and not-found lookups are cached for the configured TTL so that
/// many reminders targeting the same group within one tick share a single
/// upstream fetch. Upstream errors are never cached.
pub async fn resolve_cycle(
    ctx: &WardenContext,
    family: EventFamily,
    group_ref: &GroupRef,
) -> Result<Option<Cycle>, ResolveError> {
    let now = ctx.sys.get_timestamp_millis();
    if let Some(cached) = ctx.cycle_cache.get(family, group_ref, now) {
        return Ok(cached);
    }

    match ctx.game_data.get_active_cycle(family, group_ref).await {
        Ok(cycle) => {
            ctx.cycle_cache
                .insert(family, group_ref.clone(), cycle.clone(), now);
            Ok(cycle)
        }
        Err(GameDataError::Unavailable(reason)) => {
            warn!(
                "Game data unavailable for {} cycle of group {}: {}",
                family, group_ref, reason
            );
            Err(ResolveError::Unavailable)
        }
    }
}
