use crate::cycle_resolver::{resolve_cycle, ResolveError};
use crate::dispatcher::{deliver_channel_batch, DispatchOutcome, PendingDispatch};
use crate::shared::usecase::UseCase;
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use tracing::{error, warn};
use warden_domain::eligibility::eligible_members;
use warden_domain::{windows, ChannelId, Cycle, EventFamily, GroupRef, Reminder, ID};
use warden_infra::{ClaimOutcome, WardenContext};

/// One scheduler tick: pulls reminders due within the lookahead window,
/// resolves live cycles per distinct (family, group) pair, filters
/// recipients, claims (reminder, cycle) pairs in the dispatch ledger and
/// hands won claims to the dispatcher, batched per destination channel.
///
/// Any number of instances may run this concurrently against the same
/// reminder population; the ledger's storage-level uniqueness makes the
/// duplicate evaluations converge on a single dispatch.
#[derive(Debug)]
pub struct EvaluateDueRemindersUseCase {
    pub lookahead_millis: i64,
}

#[derive(Debug, Default, PartialEq)]
pub struct TickSummary {
    /// (reminder, group) pairs walked through the state machine
    pub evaluated: usize,
    pub dispatched: usize,
    /// No live cycle, cycle over, or nobody eligible
    pub suppressed: usize,
    /// Live close instant further out than the scheduled estimate
    pub not_yet_due: usize,
    /// Lost the claim race to a concurrent evaluator
    pub already_claimed: usize,
    /// Upstream game data down; retried next tick
    pub unavailable: usize,
    /// Delivery retries exhausted; claim rolled back for next tick
    pub rolled_back: usize,
    /// Target channel permanently broken; claim kept committed
    pub undeliverable: usize,
}

#[derive(Debug)]
pub enum UseCaseError {
    /// The engine cannot read or write its own state. The whole tick is
    /// abandoned and retried on the next interval.
    StorageError,
}

fn propose(proposals: &mut HashMap<ID, i64>, reminder_id: &ID, instant: i64) {
    proposals
        .entry(reminder_id.clone())
        .and_modify(|v| {
            if instant < *v {
                *v = instant;
            }
        })
        .or_insert(instant);
}

#[async_trait::async_trait]
impl UseCase for EvaluateDueRemindersUseCase {
    type Response = TickSummary;

    type Error = UseCaseError;

    const NAME: &'static str = "EvaluateDueReminders";

    async fn execute(&mut self, ctx: &WardenContext) -> Result<Self::Response, Self::Error> {
        let now = ctx.sys.get_timestamp_millis();
        let mut summary = TickSummary::default();

        // Claims left over by an instance that died mid-dispatch
        let abandoned = ctx
            .repos
            .dispatch_records
            .release_abandoned_before(now - ctx.config.claim_grace_millis)
            .await
            .map_err(|_| UseCaseError::StorageError)?;
        if !abandoned.is_empty() {
            warn!(
                "Released {} abandoned dispatch claims from a previous run",
                abandoned.len()
            );
        }

        // Snapshot of due candidates; concurrent edits are picked up next tick
        let due = ctx
            .repos
            .reminders
            .find_due(now + self.lookahead_millis)
            .await
            .map_err(|_| UseCaseError::StorageError)?;
        if due.is_empty() {
            return Ok(summary);
        }

        // Reminders without explicit groups watch every group their guild tracks
        let mut targets: Vec<(Reminder, Vec<GroupRef>)> = Vec::with_capacity(due.len());
        for reminder in due {
            let groups = if reminder.group_refs.is_empty() {
                match ctx.repos.guild_groups.find_by_guild(&reminder.guild_id).await {
                    Ok(links) => links.into_iter().map(|l| l.group_ref).collect(),
                    Err(e) => {
                        error!(
                            "Unable to expand groups of reminder {}: {:?}. Skipping it this tick",
                            reminder.id, e
                        );
                        continue;
                    }
                }
            } else {
                reminder.group_refs.clone()
            };
            targets.push((reminder, groups));
        }

        // Resolve each distinct (family, group) once, with a bounded number
        // of upstream fetches in flight
        let keys: HashSet<(EventFamily, GroupRef)> = targets
            .iter()
            .flat_map(|(reminder, groups)| {
                let family = reminder.family();
                groups.iter().map(move |g| (family, g.clone()))
            })
            .collect();
        let cycles: HashMap<(EventFamily, GroupRef), Result<Option<Cycle>, ResolveError>> =
            stream::iter(keys)
                .map(|key| async move {
                    let res = resolve_cycle(ctx, key.0, &key.1).await;
                    (key, res)
                })
                .buffer_unordered(ctx.config.resolver_concurrency.max(1))
                .collect::<Vec<_>>()
                .await
                .into_iter()
                .collect();

        let tick_millis = ctx.config.tick_interval_millis();
        let mut proposals: HashMap<ID, i64> = HashMap::new();
        let mut pending: Vec<PendingDispatch> = Vec::new();

        for (reminder, groups) in &targets {
            let family = reminder.family();
            let schedule = ctx.config.schedules.for_family(family);
            let exceptions = ctx.config.exceptions_for(family);
            let after_cycle = |end_ts: i64| {
                windows::upcoming_fire_instant(end_ts.max(now), schedule, exceptions, reminder.lead_time)
            };

            for group_ref in groups {
                summary.evaluated += 1;
                match cycles.get(&(family, group_ref.clone())) {
                    None => {}
                    Some(Err(ResolveError::Unavailable)) => {
                        summary.unavailable += 1;
                        propose(&mut proposals, &reminder.id, now);
                    }
                    Some(Ok(None)) => {
                        // No live cycle for the group. Probe again next
                        // tick while the scheduled window is still open,
                        // then skip to the next window.
                        summary.suppressed += 1;
                        let bounds = windows::current_cycle_bounds(now, schedule, exceptions);
                        let next = if now + tick_millis < bounds.end_ts {
                            now + tick_millis
                        } else {
                            after_cycle(bounds.end_ts)
                        };
                        propose(&mut proposals, &reminder.id, next);
                    }
                    Some(Ok(Some(cycle))) => {
                        if cycle.has_ended(now) {
                            summary.suppressed += 1;
                            propose(&mut proposals, &reminder.id, after_cycle(cycle.end_ts));
                            continue;
                        }
                        let fire_at = cycle.fire_instant(reminder.lead_time);
                        if now < fire_at {
                            // The live close instant beats the scheduled
                            // estimate; come back exactly then
                            summary.not_yet_due += 1;
                            propose(&mut proposals, &reminder.id, fire_at);
                            continue;
                        }
                        let recipients = eligible_members(reminder, cycle);
                        if recipients.is_empty() {
                            summary.suppressed += 1;
                            propose(&mut proposals, &reminder.id, after_cycle(cycle.end_ts));
                            continue;
                        }
                        match ctx
                            .repos
                            .dispatch_records
                            .try_claim(&reminder.id, &cycle.id, now)
                            .await
                        {
                            Err(_) => return Err(UseCaseError::StorageError),
                            Ok(ClaimOutcome::AlreadyClaimed) => {
                                summary.already_claimed += 1;
                                propose(&mut proposals, &reminder.id, after_cycle(cycle.end_ts));
                            }
                            Ok(ClaimOutcome::Claimed) => {
                                pending.push(PendingDispatch {
                                    reminder: reminder.clone(),
                                    cycle: cycle.clone(),
                                    recipients,
                                });
                            }
                        }
                    }
                }
            }
        }

        // All dispatches aimed at one channel within this tick go out as a
        // single delivery
        let mut by_channel: HashMap<ChannelId, Vec<PendingDispatch>> = HashMap::new();
        for p in pending {
            by_channel
                .entry(p.reminder.channel_id.clone())
                .or_insert_with(Vec::new)
                .push(p);
        }

        let results: Vec<(DispatchOutcome, Vec<PendingDispatch>)> =
            stream::iter(by_channel.into_iter().map(|(_, batch)| async move {
                let outcome = deliver_channel_batch(ctx, &batch, now).await;
                (outcome, batch)
            }))
            .buffer_unordered(ctx.config.dispatch_concurrency.max(1))
            .collect()
            .await;

        for (outcome, batch) in results {
            for p in batch {
                let family = p.reminder.family();
                let schedule = ctx.config.schedules.for_family(family);
                let exceptions = ctx.config.exceptions_for(family);
                let advanced = windows::upcoming_fire_instant(
                    p.cycle.end_ts.max(now),
                    schedule,
                    exceptions,
                    p.reminder.lead_time,
                );
                match outcome {
                    DispatchOutcome::Delivered => {
                        summary.dispatched += 1;
                        if let Err(e) = ctx
                            .repos
                            .dispatch_records
                            .commit(&p.reminder.id, &p.cycle.id, now)
                            .await
                        {
                            // The claim stays held; the abandoned-claim
                            // sweep picks the pair up after the grace period
                            error!(
                                "Unable to commit dispatch of reminder {} for cycle {}: {:?}",
                                p.reminder.id, p.cycle.id, e
                            );
                        }
                        propose(&mut proposals, &p.reminder.id, advanced);
                    }
                    DispatchOutcome::PermissionDenied => {
                        // The pair has effectively fired: committing the
                        // claim makes sure a dead target is never retried
                        summary.undeliverable += 1;
                        if let Err(e) = ctx
                            .repos
                            .dispatch_records
                            .commit(&p.reminder.id, &p.cycle.id, now)
                            .await
                        {
                            error!(
                                "Unable to commit undeliverable reminder {} for cycle {}: {:?}",
                                p.reminder.id, p.cycle.id, e
                            );
                        }
                        propose(&mut proposals, &p.reminder.id, advanced);
                    }
                    DispatchOutcome::Failed => {
                        summary.rolled_back += 1;
                        if let Err(e) = ctx
                            .repos
                            .dispatch_records
                            .release(&p.reminder.id, &p.cycle.id)
                            .await
                        {
                            error!(
                                "Unable to roll back claim of reminder {} for cycle {}: {:?}",
                                p.reminder.id, p.cycle.id, e
                            );
                        }
                        propose(&mut proposals, &p.reminder.id, now);
                    }
                }
            }
        }

        // Advance fire instants; failures here only cost a redundant
        // evaluation next tick, the ledger keeps dispatch exactly-once
        for (reminder, _) in targets {
            if let Some(&next_fire_at) = proposals.get(&reminder.id) {
                if next_fire_at != reminder.next_fire_at {
                    let mut updated = reminder;
                    updated.next_fire_at = next_fire_at;
                    if let Err(e) = ctx.repos.reminders.save(&updated).await {
                        error!(
                            "Unable to advance fire instant of reminder {}: {:?}",
                            updated.id, e
                        );
                    }
                }
            }
        }

        Ok(summary)
    }
}
