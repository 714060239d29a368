pub mod create_reminder;
pub mod delete_reminder;
pub mod edit_reminder;
pub mod evaluate_due_reminders;
pub mod list_reminders;
