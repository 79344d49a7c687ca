pub mod notifier;
pub mod provider;

pub use notifier::{NotificationContext, NotificationResult, Notifier};
pub use provider::ProviderAdapter;
