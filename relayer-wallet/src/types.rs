use web3::types::{Address, Bytes, CallRequest, U256};

/// An unsigned delivery or ack transaction handed to the wallet. Nonce, gas,
/// and fee fields are filled in by the wallet itself; callers only describe
/// the call.
#[derive(Clone, Debug)]
pub struct TxRequest {
	pub to: Address,
	pub data: Vec<u8>,
	pub value: U256,
}

impl TxRequest {
	pub fn as_call_request(&self, from: Address) -> CallRequest {
		CallRequest {
			from: Some(from),
			to: Some(self.to),
			value: Some(self.value),
			data: Some(Bytes(self.data.clone())),
			..Default::default()
		}
	}
}
