//! Archive access gate.
//!
//! Serves brotli-compressed daily and per-match JSON archives from local disk
//! or an S3-compatible bucket, and decides whether details of matches that
//! have not started yet may be shown to the caller.
//!
//! Leaf first: [`storage`] → [`codec`] → [`clock`] → [`entitlement`] →
//! [`gateway`]. The gateway is built once at startup and shared by handlers.

pub mod clock;
pub mod codec;
pub mod display;
pub mod entitlement;
pub mod error;
pub mod gateway;
pub mod keys;
pub mod lock;
pub mod storage;

pub use clock::{clock_from_override, Clock, FixedClock, SystemClock};
pub use entitlement::{Account, CallerIdentity, Entitlement, EntitlementEvaluator};
pub use error::{ArchiveError, ArchiveResult};
pub use gateway::{ArchiveGateway, MatchDetails, PlayerPhoto};
pub use keys::{ArchiveKind, ArchiveObjectRef, IndexEntity, PhotoGender};
pub use lock::LockedDetails;
pub use storage::ArchiveStorage;
