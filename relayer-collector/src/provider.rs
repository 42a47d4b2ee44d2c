//! The AMB provider plug-in interface, and the mock provider used for local
//! development and the cross-chain happy-path test scenario.

use crate::error::{Error, Result};
use async_trait::async_trait;
use relayer_types::{AmbId, AmbMessage, AmbProof};
use web3::types::{Filter, Log};

/// A cross-chain messaging bridge's collector-side plug-in: how to recognise
/// its dispatch events on a source chain, and (optionally) how to produce
/// the proof a destination contract needs to accept the message.
#[async_trait]
pub trait AmbProvider: Send + Sync {
	fn id(&self) -> &AmbId;
	/// The filter to query for `[from_block, to_block]` on this provider's
	/// source-chain contract.
	fn filter(&self, from_block: u64, to_block: u64) -> Filter;
	/// Decode a single matching log into an `AMBMessage`, or `None` if the
	/// log isn't actually one of this provider's dispatch events (the filter
	/// may be coarser than an exact topic match, e.g. when several event
	/// kinds share a contract).
	fn decode(&self, log: &Log) -> Result<Option<AmbMessage>>;
	/// Produce the out-of-band proof for `message`, if this provider can
	/// derive one without further observation (e.g. by signing). Providers
	/// whose proof instead arrives as its own on-chain event (a relay
	/// network's attestation) return `Ok(None)` here and are expected to
	/// populate `AMBProof` from a second log kind decoded elsewhere.
	async fn build_proof(&self, message: &AmbMessage) -> Result<Option<AmbProof>>;
}

/// Constructs an [`AmbProvider`] from a configuration string (`"mock"`,
/// `"wormhole"`, ...). Implementations are indexed in a static table built at
/// startup, per the no-dynamic-loading requirement.
pub fn build(kind: &str, config: &ProviderConfig) -> Result<Box<dyn AmbProvider>> {
	match kind {
		"mock" => Ok(Box::new(mock::MockProvider::new(config.clone()))),
		other => Err(Error::UnknownProvider(AmbId::from(other))),
	}
}

/// Settings common to every provider kind; provider-specific settings (a
/// signing key, a remote attestor endpoint) are read from the same value by
/// whichever `build` branch needs them.
#[derive(Clone, Debug)]
pub struct ProviderConfig {
	pub amb_id: AmbId,
	pub contract_address: web3::types::Address,
	pub from_chain_id: relayer_types::ChainId,
	/// Guardian secret key used by the mock provider to sign messages it
	/// observes, standing in for a real attestation network.
	pub mock_signing_key: Option<web3::signing::SecretKey>,
}

mod mock {
	use super::ProviderConfig;
	use crate::error::{Error, Result};
	use async_trait::async_trait;
	use ethabi::{Event, EventParam, ParamType, RawLog, Token};
	use relayer_types::{AmbId, AmbMessage, AmbProof, ChainId, MessageIdentifier};
	use secp256k1::{Message, Secp256k1};
	use web3::types::{Filter, FilterBuilder, Log};

	/// The mock AMB's dispatch event: a source-chain contract that emits the
	/// full packet inline, so no further observation is needed to build an
	/// `AMBMessage`. A real bridge's provider would instead decode whatever
	/// shape its own dispatcher emits.
	fn dispatch_event() -> Event {
		Event {
			name: "Dispatch".into(),
			inputs: vec![
				EventParam { name: "messageIdentifier".into(), kind: ParamType::FixedBytes(32), indexed: true },
				EventParam { name: "toChainId".into(), kind: ParamType::Uint(256), indexed: false },
				EventParam { name: "toIncentivesAddress".into(), kind: ParamType::FixedBytes(32), indexed: false },
				EventParam { name: "payload".into(), kind: ParamType::Bytes, indexed: false },
			],
			anonymous: false,
		}
	}

	pub struct MockProvider {
		config: ProviderConfig,
		dispatch: Event,
	}

	impl MockProvider {
		pub fn new(config: ProviderConfig) -> Self {
			MockProvider { dispatch: dispatch_event(), config }
		}
	}

	#[async_trait]
	impl super::AmbProvider for MockProvider {
		fn id(&self) -> &AmbId {
			&self.config.amb_id
		}

		fn filter(&self, from_block: u64, to_block: u64) -> Filter {
			FilterBuilder::default()
				.address(vec![self.config.contract_address])
				.topics(Some(vec![self.dispatch.signature()]), None, None, None)
				.from_block(from_block.into())
				.to_block(to_block.into())
				.build()
		}

		fn decode(&self, log: &Log) -> Result<Option<AmbMessage>> {
			if log.topics.first() != Some(&self.dispatch.signature()) {
				return Ok(None);
			}
			let raw = RawLog { topics: log.topics.clone(), data: log.data.0.clone() };
			let parsed = self
				.dispatch
				.parse_log(raw)
				.map_err(|e| Error::Decode { address: log.address, reason: e.to_string() })?;

			let message_identifier = field(&parsed, log, "messageIdentifier")?
				.clone()
				.into_fixed_bytes()
				.ok_or_else(|| decode_err(log, "messageIdentifier is not fixed bytes"))?;
			let to_chain_id = field(&parsed, log, "toChainId")?
				.clone()
				.into_uint()
				.ok_or_else(|| decode_err(log, "toChainId is not a uint"))?;
			let to_incentives_address = field(&parsed, log, "toIncentivesAddress")?
				.clone()
				.into_fixed_bytes()
				.ok_or_else(|| decode_err(log, "toIncentivesAddress is not fixed bytes"))?;
			let payload = field(&parsed, log, "payload")?
				.clone()
				.into_bytes()
				.ok_or_else(|| decode_err(log, "payload is not bytes"))?;

			let mut message_id_bytes = [0u8; 32];
			if message_identifier.len() != 32 {
				return Err(decode_err(log, "messageIdentifier is not 32 bytes"));
			}
			message_id_bytes.copy_from_slice(&message_identifier);

			let transaction_hash = log.transaction_hash.ok_or_else(|| decode_err(log, "missing transaction hash"))?;
			let block_hash = log.block_hash.ok_or_else(|| decode_err(log, "missing block hash"))?;
			let block_number = log.block_number.ok_or_else(|| decode_err(log, "missing block number"))?;

			Ok(Some(AmbMessage {
				message_identifier: MessageIdentifier::new(message_id_bytes),
				amb: self.config.amb_id.clone(),
				from_chain_id: self.config.from_chain_id,
				to_chain_id: ChainId(to_chain_id.as_u64()),
				from_incentives_address: address32(log.address),
				to_incentives_address: Some(to_incentives_address),
				incentives_payload: payload,
				recovery_context: None,
				transaction_hash: transaction_hash.0,
				block_hash: block_hash.0,
				block_number: block_number.as_u64(),
				priority: false,
			}))
		}

		async fn build_proof(&self, message: &AmbMessage) -> Result<Option<AmbProof>> {
			let Some(signing_key) = self.config.mock_signing_key.as_ref() else {
				return Ok(None);
			};
			let mut preimage = message.message_identifier.as_bytes().to_vec();
			preimage.extend_from_slice(&message.incentives_payload);
			let digest = web3::signing::keccak256(&preimage);
			let secp = Secp256k1::signing_only();
			let digest_message = Message::from_slice(&digest).expect("keccak256 output is always 32 bytes");
			let signature = secp.sign_ecdsa(&digest_message, signing_key);
			Ok(Some(AmbProof {
				message_identifier: message.message_identifier,
				amb: self.config.amb_id.clone(),
				from_chain_id: message.from_chain_id,
				to_chain_id: message.to_chain_id,
				message: signature.serialize_compact().to_vec(),
				message_ctx: vec![],
			}))
		}
	}

	fn address32(address: web3::types::Address) -> [u8; 32] {
		let mut bytes = [0u8; 32];
		bytes[12..].copy_from_slice(address.as_bytes());
		bytes
	}

	fn decode_err(log: &Log, reason: &str) -> Error {
		Error::Decode { address: log.address, reason: reason.to_string() }
	}

	fn field<'a>(parsed: &'a ethabi::Log, log: &Log, name: &str) -> Result<&'a Token> {
		parsed
			.params
			.iter()
			.find(|p| p.name == name)
			.map(|p| &p.value)
			.ok_or_else(|| decode_err(log, &format!("missing field {name}")))
	}
}
