use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, warn};
use warden_domain::{Cycle, Member, Reminder};
use warden_infra::{DeliveryError, WardenContext};
use warden_utils::backoff_with_jitter;

/// One claimed (reminder, cycle, recipients) triple awaiting delivery.
#[derive(Debug)]
pub struct PendingDispatch {
    pub reminder: Reminder,
    pub cycle: Cycle,
    pub recipients: Vec<Member>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Delivered,
    /// The target is gone for good. Claims stay committed so the pair is
    /// never retried.
    PermissionDenied,
    /// Retries exhausted within this tick. Claims roll back so the next
    /// tick retries cleanly.
    Failed,
}

/// Substitutions community managers can use in their message template:
/// `{members}`, `{group}`, `{event}` and `{minutes_left}`.
pub fn render_message(reminder: &Reminder, cycle: &Cycle, recipients: &[Member], now: i64) -> String {
    let members = recipients
        .iter()
        .map(|m| m.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let minutes_left = ((cycle.end_ts - now).max(0) / (1000 * 60)).to_string();
    reminder
        .message_template
        .replace("{members}", &members)
        .replace("{group}", cycle.group_ref.as_str())
        .replace("{event}", &cycle.family.to_string())
        .replace("{minutes_left}", &minutes_left)
}

/// Deliver every pending dispatch aimed at one channel as a single outbound
/// call. Transient failures and rate limits are retried with capped
/// exponential backoff, preferring the provider's retry-after hint when one
/// is supplied. A permission failure short-circuits immediately.
pub async fn deliver_channel_batch(
    ctx: &WardenContext,
    batch: &[PendingDispatch],
    now: i64,
) -> DispatchOutcome {
    let channel_id = &batch[0].reminder.channel_id;
    let content = batch
        .iter()
        .map(|p| render_message(&p.reminder, &p.cycle, &p.recipients, now))
        .collect::<Vec<_>>()
        .join("\n\n");

    let base = ctx.config.dispatch_retry_base_millis;
    let cap = ctx.config.dispatch_retry_cap_millis;
    let max_attempts = ctx.config.dispatch_max_retries.max(1);

    for attempt in 0..max_attempts {
        let is_last = attempt + 1 == max_attempts;
        match ctx.messenger.deliver(channel_id, &content).await {
            Ok(()) => return DispatchOutcome::Delivered,
            Err(DeliveryError::PermissionDenied(reason)) => {
                error!(
                    "Channel {} is permanently undeliverable: {}",
                    channel_id, reason
                );
                return DispatchOutcome::PermissionDenied;
            }
            Err(DeliveryError::RateLimited { retry_after_millis }) => {
                if is_last {
                    break;
                }
                let delay =
                    retry_after_millis.unwrap_or_else(|| backoff_with_jitter(attempt, base, cap));
                warn!(
                    "Rate limited on channel {}, backing off {} millis",
                    channel_id, delay
                );
                sleep(Duration::from_millis(delay)).await;
            }
            Err(DeliveryError::Transient(reason)) => {
                if is_last {
                    break;
                }
                let delay = backoff_with_jitter(attempt, base, cap);
                warn!(
                    "Transient delivery failure on channel {}: {}. Backing off {} millis",
                    channel_id, reason, delay
                );
                sleep(Duration::from_millis(delay)).await;
            }
        }
    }
    DispatchOutcome::Failed
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;
    use warden_domain::{
        ChannelId, CycleState, EventFamily, GroupRef, GroupRole, GuildId, MemberProgress,
        ParticipationScope, ReminderFilter,
    };
    use warden_infra::{
        Config, InMemoryGameDataClient, InMemoryMessenger, Repos, StaticSys, WardenContext,
    };

    fn test_context(messenger: Arc<InMemoryMessenger>) -> WardenContext {
        let mut config = Config::new();
        config.dispatch_max_retries = 3;
        config.dispatch_retry_base_millis = 0;
        WardenContext::new(
            Repos::create_inmemory(),
            config,
            Arc::new(StaticSys(0)),
            Arc::new(InMemoryGameDataClient::new()),
            messenger,
        )
    }

    fn member(name: &str) -> Member {
        Member {
            tag: format!("#{}", name),
            name: name.to_string(),
            role: GroupRole::Member,
            participant: true,
            progress: MemberProgress::War {
                attacks_used: 1,
                attacks_available: 2,
            },
        }
    }

    fn pending(template: &str) -> PendingDispatch {
        let group = GroupRef::new("#AAA");
        let cycle = Cycle::new(
            EventFamily::War,
            group,
            0,
            1000 * 60 * 90,
            CycleState::Active,
            vec![member("Ada"), member("Brin")],
        );
        let reminder = Reminder {
            id: Default::default(),
            guild_id: GuildId::new("g-1"),
            channel_id: ChannelId::new("c-1"),
            group_refs: vec![cycle.group_ref.clone()],
            lead_time: 1000 * 60 * 60,
            role_filter: Vec::new(),
            scope: ParticipationScope::ParticipantsOnly,
            message_template: template.to_string(),
            filter: ReminderFilter::War {
                remaining_attacks: Vec::new(),
            },
            next_fire_at: 0,
            created: 0,
            updated: 0,
        };
        let recipients = cycle.members.clone();
        PendingDispatch {
            reminder,
            cycle,
            recipients,
        }
    }

    #[test]
    fn renders_template_placeholders() {
        let p = pending("{event} of {group} closes in {minutes_left}m: {members} still owe hits");
        let rendered = render_message(&p.reminder, &p.cycle, &p.recipients, 1000 * 60 * 30);
        assert_eq!(
            rendered,
            "war of #AAA closes in 60m: Ada, Brin still owe hits"
        );
    }

    #[tokio::test]
    async fn delivers_after_a_transient_failure() {
        let messenger = Arc::new(InMemoryMessenger::new());
        messenger.push_failure(DeliveryError::Transient("connection reset".to_string()));
        let ctx = test_context(messenger.clone());

        let batch = vec![pending("closing soon")];
        let outcome = deliver_channel_batch(&ctx, &batch, 0).await;
        assert_eq!(outcome, DispatchOutcome::Delivered);
        assert_eq!(messenger.delivery_count(), 1);
    }

    #[tokio::test]
    async fn gives_up_after_exhausting_retries() {
        let messenger = Arc::new(InMemoryMessenger::new());
        for _ in 0..3 {
            messenger.push_failure(DeliveryError::Transient("boom".to_string()));
        }
        let ctx = test_context(messenger.clone());

        let batch = vec![pending("closing soon")];
        let outcome = deliver_channel_batch(&ctx, &batch, 0).await;
        assert_eq!(outcome, DispatchOutcome::Failed);
        assert_eq!(messenger.delivery_count(), 0);
    }

    #[tokio::test]
    async fn permission_denied_short_circuits_without_retry() {
        let messenger = Arc::new(InMemoryMessenger::new());
        messenger.push_failure(DeliveryError::PermissionDenied("channel deleted".to_string()));
        let ctx = test_context(messenger.clone());

        let batch = vec![pending("closing soon")];
        let outcome = deliver_channel_batch(&ctx, &batch, 0).await;
        assert_eq!(outcome, DispatchOutcome::PermissionDenied);
        assert_eq!(messenger.delivery_count(), 0);
    }

    #[tokio::test]
    async fn rate_limits_honor_the_retry_after_hint() {
        let messenger = Arc::new(InMemoryMessenger::new());
        messenger.push_failure(DeliveryError::RateLimited {
            retry_after_millis: Some(1),
        });
        let ctx = test_context(messenger.clone());

        let batch = vec![pending("closing soon")];
        let outcome = deliver_channel_batch(&ctx, &batch, 0).await;
        assert_eq!(outcome, DispatchOutcome::Delivered);
        assert_eq!(messenger.delivery_count(), 1);
    }
}
