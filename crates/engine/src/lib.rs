mod cycle_resolver;
mod dispatcher;
mod job_scheduler;
mod reminder;
mod shared;

use tracing::info;
use warden_infra::WardenContext;

pub use cycle_resolver::{resolve_cycle, ResolveError};
pub use dispatcher::{render_message, DispatchOutcome, PendingDispatch};
pub use job_scheduler::start_reminder_tick_job;
pub use reminder::create_reminder::CreateReminderUseCase;
pub use reminder::delete_reminder::DeleteReminderUseCase;
pub use reminder::edit_reminder::EditReminderUseCase;
pub use reminder::evaluate_due_reminders::{EvaluateDueRemindersUseCase, TickSummary};
pub use reminder::list_reminders::ListRemindersUseCase;
pub use shared::usecase::{execute, UseCase};

pub struct Application {
    context: WardenContext,
}

impl Application {
    pub fn new(context: WardenContext) -> Self {
        Self { context }
    }

    /// Runs the tick loop until the process receives ctrl-c.
    pub async fn start(self) -> std::io::Result<()> {
        let job = start_reminder_tick_job(self.context);

        tokio::signal::ctrl_c().await?;
        info!("Shutdown signal received");
        job.abort();
        Ok(())
    }
}
