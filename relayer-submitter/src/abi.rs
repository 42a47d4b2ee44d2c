//! Encodes the generalised-incentives escrow contract's
//! `processPacket(messageCtx, message, feeRecipient)` call, the one
//! downstream transaction shape every submitted delivery or ack produces.

use ethabi::{Function, Param, ParamType, StateMutability, Token};
use web3::types::Address;

fn process_packet_function() -> Function {
	#[allow(deprecated)]
	Function {
		name: "processPacket".into(),
		inputs: vec![
			Param { name: "messageCtx".into(), kind: ParamType::Bytes, internal_type: None },
			Param { name: "message".into(), kind: ParamType::Bytes, internal_type: None },
			Param { name: "feeRecipient".into(), kind: ParamType::Address, internal_type: None },
		],
		outputs: vec![],
		constant: None,
		state_mutability: StateMutability::NonPayable,
	}
}

pub fn encode_process_packet(message_ctx: &[u8], message: &[u8], fee_recipient: Address) -> ethabi::Result<Vec<u8>> {
	process_packet_function().encode_input(&[
		Token::Bytes(message_ctx.to_vec()),
		Token::Bytes(message.to_vec()),
		Token::Address(fee_recipient),
	])
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn encodes_with_the_function_selector_first() {
		let data = encode_process_packet(&[1, 2], &[3, 4, 5], Address::zero()).unwrap();
		let selector = &process_packet_function().short_signature();
		assert_eq!(&data[..4], &selector[..]);
	}
}
