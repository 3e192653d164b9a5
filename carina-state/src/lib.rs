//! Carina State Management
//!
//! Persists what Carina has created so later runs can tell existing
//! resources from new ones, plus a lock that keeps two runs from
//! modifying the same state at once.
//!
//! - **StateFile**: all managed resources with their Azure IDs and attributes
//! - **StateBackend**: storage for the state file (local file system)
//! - **LockInfo**: who holds the state lock and until when
//!
//! # Example
//!
//! ```ignore
//! use carina_state::{create_backend, BackendConfig};
//!
//! let backend = create_backend(&BackendConfig::local()).await?;
//! let lock = backend.acquire_lock("apply").await?;
//!
//! let mut state = backend.read_or_new().await?;
//! // ... record apply results ...
//! state.increment_serial();
//! backend.write_state(&state).await?;
//!
//! backend.release_lock(&lock).await?;
//! ```

pub mod backend;
pub mod backends;
pub mod lock;
pub mod state;

pub use backend::{BackendConfig, BackendError, BackendResult, StateBackend};
pub use backends::{LocalBackend, create_backend};
pub use lock::LockInfo;
pub use state::{ResourceState, StateFile};
