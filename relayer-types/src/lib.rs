//! Shared data model for the relayer: identifiers, wire-format codecs, and
//! the three record types (`AMBMessage`, `AMBProof`, `RelayState`) that the
//! store persists and every worker exchanges.

pub mod codec;
pub mod ids;
pub mod message;
pub mod proof;
pub mod state;

pub use ids::{AmbId, ChainId, MessageIdentifier, TxDescriptor};
pub use message::AmbMessage;
pub use proof::AmbProof;
pub use state::{
	BountyClaimedEvent, BountyIncreasedEvent, BountyPlacedEvent, MessageDeliveredEvent, RelayState, RelayStatus,
	StateError,
};
