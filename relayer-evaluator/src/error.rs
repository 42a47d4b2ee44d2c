use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
	#[error("message {0} has no bountyPlacedEvent recorded yet")]
	NoBountyPlaced(relayer_types::MessageIdentifier),
	#[error("bountyPlacedEvent.fromChainId does not match the chain requesting an ack decision")]
	ChainMismatch,
	#[error("failed to price a value for the evaluator: {0}")]
	Pricing(#[source] anyhow::Error),
}
