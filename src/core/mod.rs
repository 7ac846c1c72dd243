pub mod config;
pub mod config_loader;
pub mod error;
pub mod retry;
pub mod traits;

pub use config::{PublisherConfig, RegistryConfig, ValidationConfig};
pub use config_loader::{CONFIG_FILENAME, ConfigLoader};
pub use error::*;
pub use retry::*;
pub use traits::*;
