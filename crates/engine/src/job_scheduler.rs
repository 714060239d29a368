use crate::reminder::evaluate_due_reminders::EvaluateDueRemindersUseCase;
use crate::shared::usecase::execute;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};
use warden_infra::WardenContext;

/// Seconds until the next minute boundary. Ticks land on whole minutes so
/// lead times expressed in minutes behave predictably.
pub fn get_start_delay(now_ts_millis: i64) -> u64 {
    (60 - (now_ts_millis / 1000) % 60) as u64
}

/// The single polling loop driving all three event families. One loop per
/// process; additional processes are coordinated purely through the
/// dispatch ledger.
pub fn start_reminder_tick_job(ctx: WardenContext) -> JoinHandle<()> {
    tokio::spawn(async move {
        let delay = get_start_delay(ctx.sys.get_timestamp_millis());
        tokio::time::sleep(Duration::from_secs(delay)).await;

        let mut interval =
            tokio::time::interval(Duration::from_secs(ctx.config.tick_interval_secs.max(1)));
        loop {
            interval.tick().await;

            let usecase = EvaluateDueRemindersUseCase {
                lookahead_millis: ctx.config.lookahead_millis(),
            };
            match execute(usecase, &ctx).await {
                Ok(summary) => info!("Reminder tick done: {:?}", summary),
                Err(e) => error!(
                    "Reminder tick failed, will retry on the next interval: {:?}",
                    e
                ),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_delay_works() {
        assert_eq!(get_start_delay(50 * 1000), 10);
        assert_eq!(get_start_delay(60 * 1000), 60);
        assert_eq!(get_start_delay(59 * 1000), 1);
        assert_eq!(get_start_delay(59_999), 1);
    }
}
