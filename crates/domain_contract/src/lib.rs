//! Contract Domain - Lease Lifecycle
//!
//! The Contract aggregate is the consistency boundary for a lease: one room,
//! one or more occupants, a date range, and an agreed rent. Its state
//! machine gates everything downstream — invoices may only be assembled for
//! an `Active` contract, and termination is refused while unsettled invoices
//! exist.
//!
//! # State Machine
//!
//! Valid transitions:
//! - Created -> Active (start date reached)
//! - Active -> Expired (end date passed)
//! - Created | Active | Expired -> Terminated (explicit, terminal)
//!
//! `Created -> Active` and `Active -> Expired` are passage-of-time
//! judgements applied by an external sweep via [`Contract::roll_status`];
//! nothing in this crate transitions on the clock by itself.

pub mod error;
pub mod occupant;
pub mod contract;
pub mod room;

pub use error::ContractError;
pub use occupant::Occupant;
pub use contract::{Contract, ContractStatus, PaymentPeriod};
pub use room::{derive_room_status, RoomStatus};
