//! Carina Azure Resource Manager Provider
//!
//! Typed handlers for DNS, Sentinel data connectors and Data Factory
//! credentials, running against the ARM REST API or an in-memory store.

pub mod arm;
pub mod config;
pub mod framework;
pub mod ids;
pub mod provider;
pub mod services;

pub use arm::{HttpManagementClient, InMemoryManagementClient, ManagementClient};
pub use config::{ConfigError, ProviderConfig};
pub use framework::Clients;
pub use provider::{AzureRmProvider, PROVIDER_NAME};
