//! Admission services
//!
//! The ledger components each own one kind of counter; the coordinator is
//! the only caller that combines them.

pub mod context;
pub mod coordinator;
pub mod error;
pub mod invitation;
pub mod ledger;
pub mod referral;
pub mod retry;
pub mod sweeper;

pub use context::{ServiceContext, ServiceContextBuilder};
pub use coordinator::{AdmissionPhase, RegistrationCoordinator, RegistrationIntent};
pub use error::{ServiceError, ServiceResult};
pub use invitation::{InvitationRedeemer, RedemptionToken};
pub use ledger::{InventoryLedger, ReservationToken};
pub use referral::ReferralGraph;
pub use retry::RetryPolicy;
pub use sweeper::{spawn_sweeper, sweep_once, SweepReport, SweeperHandle};
