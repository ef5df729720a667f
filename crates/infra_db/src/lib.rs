//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the rental billing core, implemented with
//! SQLx. The crate follows the repository pattern: one repository per
//! aggregate, plus the billing orchestrator whose use cases ("create
//! invoice", "record payment") each run as a single all-or-nothing
//! transaction.
//!
//! Uniqueness and state invariants are enforced twice: by schema
//! constraints in `migrations/` and by re-running the domain rules inside
//! the transaction, so violations surface as domain errors rather than
//! bare SQL errors.

pub mod error;
pub mod pool;
pub mod repositories;

pub use error::{DatabaseError, RepositoryError};
pub use pool::{create_pool, create_pool_from_url, run_migrations, DatabaseConfig, DatabasePool};
pub use repositories::billing::BillingRepository;
pub use repositories::contract::ContractRepository;
pub use repositories::metering::MeteringRepository;
pub use repositories::pricing::PricingRepository;
