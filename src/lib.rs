pub mod config;
pub mod fetcher;
pub mod models;
pub mod plugins;
pub mod scheduler;
pub mod storage;
pub mod tracker;
pub mod utils;

// Re-export commonly used types
pub use config::AppConfig;
pub use fetcher::{Document, Fetcher};
pub use models::{DocumentFormat, NewTrackedItem, SearchDefinition, Status, TrackedItem};
pub use plugins::ProviderRegistry;
pub use scheduler::{CycleReport, RunMode, Scheduler, SchedulerSettings};
pub use storage::{SqliteStore, Store};
pub use utils::error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;
