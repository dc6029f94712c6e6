pub mod binding;
pub mod host;
pub mod logger;

pub use binding::{bind_settings, BindingError};
pub use host::{CollectorJobRunner, JobKind, ModuleHost};
pub use logger::ModuleLogger;
