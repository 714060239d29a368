mod cycle_cache;
mod game_data;
mod messenger;

pub use cycle_cache::CycleCache;
pub use game_data::{GameApiClient, GameDataError, IGameDataClient, InMemoryGameDataClient};
pub use messenger::{DeliveryError, IMessenger, InMemoryMessenger, WebhookMessenger};
