pub mod notifiers;
pub mod price;
pub mod providers;
pub mod registry;
pub mod traits;

pub use registry::ProviderRegistry;
pub use traits::{Notifier, ProviderAdapter};
