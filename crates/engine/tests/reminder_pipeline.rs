use std::sync::Arc;
use warden_domain::{
    ChannelId, Cycle, CycleId, CycleState, DispatchStatus, EventFamily, GroupRef, GroupRole,
    GuildId, Member, MemberProgress, ParticipationScope, Reminder, ReminderFilter,
};
use warden_engine::{execute, EvaluateDueRemindersUseCase};
use warden_infra::{
    Config, DeliveryError, InMemoryGameDataClient, InMemoryMessenger, Repos, StaticSys,
    WardenContext,
};

const MINUTE: i64 = 1000 * 60;
const HOUR: i64 = 60 * MINUTE;

fn test_context(
    now: i64,
    repos: Repos,
    game_data: Arc<InMemoryGameDataClient>,
    messenger: Arc<InMemoryMessenger>,
) -> WardenContext {
    let mut config = Config::new();
    config.dispatch_max_retries = 3;
    config.dispatch_retry_base_millis = 0;
    WardenContext::new(repos, config, Arc::new(StaticSys(now)), game_data, messenger)
}

fn tick(lookahead_millis: i64) -> EvaluateDueRemindersUseCase {
    EvaluateDueRemindersUseCase { lookahead_millis }
}

fn war_member(name: &str, attacks_used: u32) -> Member {
    Member {
        tag: format!("#{}", name.to_uppercase()),
        name: name.to_string(),
        role: GroupRole::Member,
        participant: true,
        progress: MemberProgress::War {
            attacks_used,
            attacks_available: 2,
        },
    }
}

fn points_member(name: &str, points: i64) -> Member {
    Member {
        tag: format!("#{}", name.to_uppercase()),
        name: name.to_string(),
        role: GroupRole::Member,
        participant: true,
        progress: MemberProgress::Points { points },
    }
}

fn war_cycle(group: &GroupRef, close: i64, members: Vec<Member>) -> Cycle {
    Cycle::new(
        EventFamily::War,
        group.clone(),
        close - 47 * HOUR,
        close,
        CycleState::Active,
        members,
    )
}

fn reminder(group: &GroupRef, filter: ReminderFilter, lead_time: i64, next_fire_at: i64) -> Reminder {
    Reminder {
        id: Default::default(),
        guild_id: GuildId::new("g-1"),
        channel_id: ChannelId::new("c-1"),
        group_refs: vec![group.clone()],
        lead_time,
        role_filter: Vec::new(),
        scope: ParticipationScope::ParticipantsOnly,
        message_template: "{members}: {event} of {group} closes in {minutes_left} minutes"
            .to_string(),
        filter,
        next_fire_at,
        created: 0,
        updated: 0,
    }
}

fn war_filter(remaining_attacks: Vec<u32>) -> ReminderFilter {
    ReminderFilter::War { remaining_attacks }
}

#[tokio::test]
async fn war_reminder_fires_exactly_once_despite_three_racing_schedulers() {
    let close = 1_700_000_000_000;
    let group = GroupRef::new("#AAA");
    let repos = Repos::create_inmemory();
    let game_data = Arc::new(InMemoryGameDataClient::new());
    let messenger = Arc::new(InMemoryMessenger::new());
    game_data.put_cycle(war_cycle(
        &group,
        close,
        vec![
            war_member("ada", 1),  // 1 attack left
            war_member("brin", 0), // 2 attacks left
            war_member("cole", 2), // 0 attacks left
        ],
    ));

    let r = reminder(&group, war_filter(vec![1, 2]), 4 * HOUR, close - 4 * HOUR);
    repos.reminders.insert(&r).await.unwrap();

    // At close - 4h05m the fire instant is outside the lookahead window
    let early_ctx = test_context(
        close - 4 * HOUR - 5 * MINUTE,
        repos.clone(),
        game_data.clone(),
        messenger.clone(),
    );
    let summary = execute(tick(3 * MINUTE), &early_ctx).await.unwrap();
    assert_eq!(summary.evaluated, 0);
    assert_eq!(messenger.delivery_count(), 0);

    // At close - 3h58m it is due; three scheduler instances race on it.
    // Delivery latency keeps the winner's dispatch in flight while the
    // others evaluate the same pair.
    messenger.set_latency(std::time::Duration::from_millis(20));
    let now = close - 4 * HOUR + 2 * MINUTE;
    let ctx1 = test_context(now, repos.clone(), game_data.clone(), messenger.clone());
    let ctx2 = test_context(now, repos.clone(), game_data.clone(), messenger.clone());
    let ctx3 = test_context(now, repos.clone(), game_data.clone(), messenger.clone());
    let (s1, s2, s3) = tokio::join!(
        execute(tick(3 * MINUTE), &ctx1),
        execute(tick(3 * MINUTE), &ctx2),
        execute(tick(3 * MINUTE), &ctx3),
    );
    let summaries = vec![s1.unwrap(), s2.unwrap(), s3.unwrap()];

    let dispatched: usize = summaries.iter().map(|s| s.dispatched).sum();
    let lost_races: usize = summaries.iter().map(|s| s.already_claimed).sum();
    assert_eq!(dispatched, 1);
    assert!(lost_races >= 1);
    assert_eq!(messenger.delivery_count(), 1);

    // Only members with 1 or 2 attacks left are addressed
    let (channel, content) = messenger.deliveries().remove(0);
    assert_eq!(channel, ChannelId::new("c-1"));
    assert!(content.contains("ada"));
    assert!(content.contains("brin"));
    assert!(!content.contains("cole"));

    let cycle_id = CycleId::derive(EventFamily::War, &group, close - 47 * HOUR);
    let record = repos.dispatch_records.find(&r.id, &cycle_id).await.unwrap();
    assert_eq!(record.status, DispatchStatus::Dispatched);
}

#[tokio::test]
async fn exhausted_delivery_retries_roll_back_and_the_next_tick_redelivers() {
    let close = 1_700_000_000_000;
    let group = GroupRef::new("#AAA");
    let repos = Repos::create_inmemory();
    let game_data = Arc::new(InMemoryGameDataClient::new());
    let messenger = Arc::new(InMemoryMessenger::new());
    game_data.put_cycle(war_cycle(&group, close, vec![war_member("ada", 1)]));

    let r = reminder(&group, war_filter(Vec::new()), 4 * HOUR, close - 4 * HOUR);
    repos.reminders.insert(&r).await.unwrap();
    let cycle_id = CycleId::derive(EventFamily::War, &group, close - 47 * HOUR);

    for _ in 0..3 {
        messenger.push_failure(DeliveryError::Transient("socket closed".to_string()));
    }

    let now = close - 3 * HOUR;
    let ctx = test_context(now, repos.clone(), game_data.clone(), messenger.clone());
    let summary = execute(tick(3 * MINUTE), &ctx).await.unwrap();
    assert_eq!(summary.rolled_back, 1);
    assert_eq!(summary.dispatched, 0);
    assert_eq!(messenger.delivery_count(), 0);
    // The claim is gone, so the pair can be retried
    assert!(repos.dispatch_records.find(&r.id, &cycle_id).await.is_none());

    // Next tick, delivery works again
    let ctx = test_context(
        now + 2 * MINUTE,
        repos.clone(),
        game_data.clone(),
        messenger.clone(),
    );
    let summary = execute(tick(3 * MINUTE), &ctx).await.unwrap();
    assert_eq!(summary.dispatched, 1);
    assert_eq!(messenger.delivery_count(), 1);
    let record = repos.dispatch_records.find(&r.id, &cycle_id).await.unwrap();
    assert_eq!(record.status, DispatchStatus::Dispatched);
}

#[tokio::test]
async fn longer_lead_times_fire_strictly_before_shorter_ones() {
    let close = 1_700_000_000_000;
    let group = GroupRef::new("#AAA");
    let repos = Repos::create_inmemory();
    let game_data = Arc::new(InMemoryGameDataClient::new());
    let messenger = Arc::new(InMemoryMessenger::new());
    game_data.put_cycle(war_cycle(&group, close, vec![war_member("ada", 1)]));

    let mut one_hour = reminder(&group, war_filter(Vec::new()), HOUR, close - HOUR);
    one_hour.message_template = "one hour warning".to_string();
    let mut ten_minutes = reminder(&group, war_filter(Vec::new()), 10 * MINUTE, close - 10 * MINUTE);
    ten_minutes.message_template = "last call".to_string();
    repos.reminders.insert(&one_hour).await.unwrap();
    repos.reminders.insert(&ten_minutes).await.unwrap();

    // 59 minutes before close only the one hour reminder fires
    let ctx = test_context(
        close - 59 * MINUTE,
        repos.clone(),
        game_data.clone(),
        messenger.clone(),
    );
    let summary = execute(tick(2 * MINUTE), &ctx).await.unwrap();
    assert_eq!(summary.dispatched, 1);

    // Nine minutes before close the short one follows
    let ctx = test_context(
        close - 9 * MINUTE,
        repos.clone(),
        game_data.clone(),
        messenger.clone(),
    );
    let summary = execute(tick(2 * MINUTE), &ctx).await.unwrap();
    assert_eq!(summary.dispatched, 1);

    let deliveries = messenger.deliveries();
    assert_eq!(deliveries.len(), 2);
    assert_eq!(deliveries[0].1, "one hour warning");
    assert_eq!(deliveries[1].1, "last call");
}

#[tokio::test]
async fn zero_points_threshold_addresses_every_participant() {
    let close = 1_700_000_000_000;
    let group = GroupRef::new("#AAA");
    let repos = Repos::create_inmemory();
    let game_data = Arc::new(InMemoryGameDataClient::new());
    let messenger = Arc::new(InMemoryMessenger::new());
    game_data.put_cycle(Cycle::new(
        EventFamily::PointsEvent,
        group.clone(),
        close - 6 * 24 * HOUR,
        close,
        CycleState::Active,
        vec![points_member("ada", 0), points_member("brin", 4000)],
    ));

    let r = reminder(
        &group,
        ReminderFilter::PointsEvent {
            min_points: Some(0),
        },
        2 * HOUR,
        close - 2 * HOUR,
    );
    repos.reminders.insert(&r).await.unwrap();

    let ctx = test_context(
        close - 90 * MINUTE,
        repos.clone(),
        game_data.clone(),
        messenger.clone(),
    );
    let summary = execute(tick(3 * MINUTE), &ctx).await.unwrap();
    assert_eq!(summary.dispatched, 1);
    let (_, content) = messenger.deliveries().remove(0);
    assert!(content.contains("ada"));
    assert!(content.contains("brin"));
}

#[tokio::test]
async fn everyone_past_the_points_threshold_suppresses_without_a_claim() {
    let close = 1_700_000_000_000;
    let group = GroupRef::new("#AAA");
    let repos = Repos::create_inmemory();
    let game_data = Arc::new(InMemoryGameDataClient::new());
    let messenger = Arc::new(InMemoryMessenger::new());
    game_data.put_cycle(Cycle::new(
        EventFamily::PointsEvent,
        group.clone(),
        close - 6 * 24 * HOUR,
        close,
        CycleState::Active,
        vec![points_member("ada", 2500), points_member("brin", 4000)],
    ));

    let r = reminder(
        &group,
        ReminderFilter::PointsEvent {
            min_points: Some(1000),
        },
        2 * HOUR,
        close - 2 * HOUR,
    );
    repos.reminders.insert(&r).await.unwrap();

    let ctx = test_context(
        close - 90 * MINUTE,
        repos.clone(),
        game_data.clone(),
        messenger.clone(),
    );
    let summary = execute(tick(3 * MINUTE), &ctx).await.unwrap();
    assert_eq!(summary.suppressed, 1);
    assert_eq!(summary.dispatched, 0);
    assert_eq!(messenger.delivery_count(), 0);

    let cycle_id = CycleId::derive(EventFamily::PointsEvent, &group, close - 6 * 24 * HOUR);
    assert!(repos.dispatch_records.find(&r.id, &cycle_id).await.is_none());
}

#[tokio::test]
async fn permanently_broken_channels_are_never_retried() {
    let close = 1_700_000_000_000;
    let group = GroupRef::new("#AAA");
    let repos = Repos::create_inmemory();
    let game_data = Arc::new(InMemoryGameDataClient::new());
    let messenger = Arc::new(InMemoryMessenger::new());
    game_data.put_cycle(war_cycle(&group, close, vec![war_member("ada", 1)]));

    let r = reminder(&group, war_filter(Vec::new()), 4 * HOUR, close - 4 * HOUR);
    repos.reminders.insert(&r).await.unwrap();
    let cycle_id = CycleId::derive(EventFamily::War, &group, close - 47 * HOUR);

    messenger.push_failure(DeliveryError::PermissionDenied(
        "channel deleted".to_string(),
    ));

    let now = close - 3 * HOUR;
    let ctx = test_context(now, repos.clone(), game_data.clone(), messenger.clone());
    let summary = execute(tick(3 * MINUTE), &ctx).await.unwrap();
    assert_eq!(summary.undeliverable, 1);
    assert_eq!(messenger.delivery_count(), 0);

    // The pair counts as fired; the claim stays committed
    let record = repos.dispatch_records.find(&r.id, &cycle_id).await.unwrap();
    assert_eq!(record.status, DispatchStatus::Dispatched);

    // Force the reminder due again: the ledger keeps the pair terminal even
    // though delivery never happened
    let mut stored = repos.reminders.find(&r.id).await.unwrap();
    stored.next_fire_at = now + 2 * MINUTE;
    repos.reminders.save(&stored).await.unwrap();

    let ctx = test_context(
        now + 2 * MINUTE,
        repos.clone(),
        game_data.clone(),
        messenger.clone(),
    );
    let summary = execute(tick(3 * MINUTE), &ctx).await.unwrap();
    assert_eq!(summary.already_claimed, 1);
    assert_eq!(summary.dispatched, 0);
    assert_eq!(messenger.delivery_count(), 0);
}

#[tokio::test]
async fn reminders_without_groups_expand_to_every_tracked_group() {
    let close = 1_700_000_000_000;
    let group_a = GroupRef::new("#AAA");
    let group_b = GroupRef::new("#BBB");
    let repos = Repos::create_inmemory();
    let game_data = Arc::new(InMemoryGameDataClient::new());
    let messenger = Arc::new(InMemoryMessenger::new());
    game_data.put_cycle(war_cycle(&group_a, close, vec![war_member("ada", 1)]));
    game_data.put_cycle(war_cycle(&group_b, close, vec![war_member("brin", 0)]));

    let guild_id = GuildId::new("g-1");
    for group in [&group_a, &group_b].iter() {
        repos
            .guild_groups
            .link(&warden_domain::GuildGroupLink {
                guild_id: guild_id.clone(),
                group_ref: (*group).clone(),
            })
            .await
            .unwrap();
    }

    let mut r = reminder(&group_a, war_filter(Vec::new()), 4 * HOUR, close - 4 * HOUR);
    r.group_refs = Vec::new(); // any group the guild tracks
    repos.reminders.insert(&r).await.unwrap();

    let ctx = test_context(
        close - 3 * HOUR,
        repos.clone(),
        game_data.clone(),
        messenger.clone(),
    );
    let summary = execute(tick(3 * MINUTE), &ctx).await.unwrap();
    assert_eq!(summary.evaluated, 2);
    assert_eq!(summary.dispatched, 2);
    // Both group alerts share the channel and go out as one delivery
    assert_eq!(messenger.delivery_count(), 1);
    let (_, content) = messenger.deliveries().remove(0);
    assert!(content.contains("ada"));
    assert!(content.contains("brin"));
}
