//! Two-way USD/VED form synchronization driven by the latest fetched rate

pub mod events;
pub mod rate_sync;
pub mod state;
pub mod view;

pub use events::{EventBus, EventKind, FormEvent, SubscriptionId};
pub use rate_sync::RateSync;
pub use view::{FormView, MemoryView};
