//! The API for the supported EVM RPC methods, and the `web3`-backed client
//! that implements it. Every worker that talks to a chain (monitor,
//! collector, wallet) takes a `ChainClient` rather than a concrete
//! transport, so tests can swap in a mock.

use crate::error::{Error, Result};
use async_trait::async_trait;
use web3::signing::SecretKey;
use web3::transports::Http;
use web3::types::{
	Address, Block, BlockId, BlockNumber, Bytes, CallRequest, Filter, Log, TransactionParameters, TransactionReceipt,
	H256, U256,
};
use web3::Web3;

/// A block header stripped down to the fields the relayer actually needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChainHead {
	pub block_number: u64,
	pub hash: H256,
	pub timestamp: u64,
}

/// The API for the supported EVM RPC methods.
///
/// Cloning a client is expected to be a lightweight operation that only
/// clones internal references (connection pool handles).
#[async_trait]
pub trait ChainClient: 'static + Send + Sync + Clone {
	/// Retrieve the latest block's header, stripped to what the monitor needs.
	async fn head(&self) -> Result<ChainHead>;
	/// Estimate gas usage for the given call.
	async fn estimate_gas(&self, call: CallRequest) -> Result<U256>;
	/// Current suggested gas price (`eth_gasPrice`).
	async fn gas_price(&self) -> Result<U256>;
	/// The next nonce to use for `address` (`eth_getTransactionCount`, pending tag).
	async fn next_nonce(&self, address: Address) -> Result<U256>;
	/// Submit a pre-signed raw transaction.
	async fn send_raw_transaction(&self, raw: Bytes) -> Result<H256>;
	/// Fetch a transaction receipt, if the transaction has been mined.
	async fn transaction_receipt(&self, hash: H256) -> Result<Option<TransactionReceipt>>;
	/// `eth_getLogs` over `filter`. Collectors are responsible for keeping the
	/// queried block range within the node's log-query limits.
	async fn get_logs(&self, filter: Filter) -> Result<Vec<Log>>;
	/// Sign `params` with `key` and broadcast it. Callers are expected to have
	/// already filled in `nonce`, `gas`, and `gas_price` themselves; the
	/// wallet is the only thing allowed to pick those, so this never guesses.
	async fn sign_and_send_transaction(&self, params: TransactionParameters, key: &SecretKey) -> Result<H256>;
}

/// `ChainClient` implementation backed by `web3`'s HTTP JSON-RPC transport.
#[derive(Clone)]
pub struct Web3Client {
	web3: Web3<Http>,
}

impl Web3Client {
	pub fn new(rpc_url: &str) -> std::result::Result<Self, web3::Error> {
		let transport = Http::new(rpc_url)?;
		Ok(Web3Client { web3: Web3::new(transport) })
	}
}

#[async_trait]
impl ChainClient for Web3Client {
	async fn head(&self) -> Result<ChainHead> {
		let block: Option<Block<H256>> =
			self.web3.eth().block(BlockId::Number(BlockNumber::Latest)).await.map_err(Error::Transport)?;
		let block = block.ok_or(Error::IncompleteBlock)?;
		let number = block.number.ok_or(Error::IncompleteBlock)?;
		let hash = block.hash.ok_or(Error::IncompleteBlock)?;
		Ok(ChainHead { block_number: number.as_u64(), hash, timestamp: block.timestamp.as_u64() })
	}

	async fn estimate_gas(&self, call: CallRequest) -> Result<U256> {
		self.web3.eth().estimate_gas(call, None).await.map_err(Error::Transport)
	}

	async fn gas_price(&self) -> Result<U256> {
		self.web3.eth().gas_price().await.map_err(Error::Transport)
	}

	async fn next_nonce(&self, address: Address) -> Result<U256> {
		self.web3
			.eth()
			.transaction_count(address, Some(BlockNumber::Pending))
			.await
			.map_err(Error::Transport)
	}

	async fn send_raw_transaction(&self, raw: Bytes) -> Result<H256> {
		self.web3.eth().send_raw_transaction(raw).await.map_err(Error::Transport)
	}

	async fn transaction_receipt(&self, hash: H256) -> Result<Option<TransactionReceipt>> {
		self.web3.eth().transaction_receipt(hash).await.map_err(Error::Transport)
	}

	async fn get_logs(&self, filter: Filter) -> Result<Vec<Log>> {
		self.web3.eth().logs(filter).await.map_err(Error::Transport)
	}

	async fn sign_and_send_transaction(&self, params: TransactionParameters, key: &SecretKey) -> Result<H256> {
		let signed = self.web3.accounts().sign_transaction(params, key).await.map_err(Error::Transport)?;
		self.web3.eth().send_raw_transaction(signed.raw_transaction).await.map_err(Error::Transport)
	}
}
