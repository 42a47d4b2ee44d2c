//! The pending/ack-pending queue: arrival-ordered, with a priority message
//! jumping to the front and skipping backoff once, and exponential backoff
//! on re-enqueue after a transient failure.

use relayer_types::MessageIdentifier;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

#[derive(Clone, Debug)]
pub struct PendingEntry {
	pub message_identifier: MessageIdentifier,
	pub attempts: u32,
	pub next_attempt: Instant,
	pub priority: bool,
	priority_bypass_used: bool,
}

pub struct PendingQueue {
	entries: VecDeque<PendingEntry>,
	base_backoff: Duration,
	max_backoff: Duration,
	max_attempts: u32,
}

impl PendingQueue {
	pub fn new(base_backoff: Duration, max_backoff: Duration, max_attempts: u32) -> Self {
		PendingQueue { entries: VecDeque::new(), base_backoff, max_backoff, max_attempts }
	}

	/// Enqueue a message seen for the first time. Priority messages jump to
	/// the head; everything else arrives at the back, preserving arrival order.
	pub fn enqueue(&mut self, message_identifier: MessageIdentifier, priority: bool) {
		if self.entries.iter().any(|entry| entry.message_identifier == message_identifier) {
			return;
		}
		let entry = PendingEntry {
			message_identifier,
			attempts: 0,
			next_attempt: Instant::now(),
			priority,
			priority_bypass_used: false,
		};
		if priority {
			self.entries.push_front(entry);
		} else {
			self.entries.push_back(entry);
		}
	}

	/// Pop the earliest-arrived entry whose `next_attempt` has passed, if any.
	pub fn pop_ready(&mut self) -> Option<PendingEntry> {
		let now = Instant::now();
		let position = self.entries.iter().position(|entry| entry.next_attempt <= now)?;
		self.entries.remove(position)
	}

	/// Re-enqueue `entry` after a transient failure, bumping its backoff. A
	/// priority message's first re-enqueue after a failure skips the backoff
	/// entirely; every one after that backs off normally. Returns `false` (and
	/// drops the entry) once `max_attempts` is reached.
	pub fn requeue_after_failure(&mut self, mut entry: PendingEntry) -> bool {
		entry.attempts += 1;
		if entry.attempts >= self.max_attempts {
			log::warn!("message {} exhausted its retry budget, marking fatal", entry.message_identifier);
			return false;
		}

		if entry.priority && !entry.priority_bypass_used {
			entry.priority_bypass_used = true;
			entry.next_attempt = Instant::now();
			self.entries.push_front(entry);
		} else {
			let backoff = self.base_backoff.saturating_mul(1u32.checked_shl(entry.attempts).unwrap_or(u32::MAX));
			entry.next_attempt = Instant::now() + backoff.min(self.max_backoff);
			self.entries.push_back(entry);
		}
		true
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn id(byte: u8) -> MessageIdentifier {
		MessageIdentifier::new([byte; 32])
	}

	#[test]
	fn priority_message_jumps_the_queue_and_skips_backoff_once() {
		let mut queue = PendingQueue::new(Duration::from_secs(10), Duration::from_secs(60), 5);
		queue.enqueue(id(1), false);
		queue.enqueue(id(2), true);

		let first = queue.pop_ready().unwrap();
		assert_eq!(first.message_identifier, id(2));

		assert!(queue.requeue_after_failure(first));
		let retried = queue.pop_ready().unwrap();
		assert_eq!(retried.message_identifier, id(2), "priority bypass should make it immediately ready again");
	}

	#[test]
	fn non_priority_failure_backs_off_and_is_not_immediately_ready() {
		let mut queue = PendingQueue::new(Duration::from_secs(10), Duration::from_secs(60), 5);
		queue.enqueue(id(1), false);
		let entry = queue.pop_ready().unwrap();
		assert!(queue.requeue_after_failure(entry));
		assert!(queue.pop_ready().is_none(), "should still be backing off");
	}

	#[test]
	fn drops_after_max_attempts() {
		let mut queue = PendingQueue::new(Duration::from_millis(0), Duration::from_millis(0), 2);
		queue.enqueue(id(1), false);
		let entry = queue.pop_ready().unwrap();
		assert!(queue.requeue_after_failure(entry));
		let entry = queue.pop_ready().unwrap();
		assert!(!queue.requeue_after_failure(entry), "second failure should exhaust max_attempts=2");
		assert!(queue.is_empty());
	}

	#[test]
	fn enqueue_ignores_a_message_identifier_already_pending() {
		let mut queue = PendingQueue::new(Duration::from_secs(1), Duration::from_secs(1), 5);
		queue.enqueue(id(1), false);
		queue.enqueue(id(1), false);
		assert_eq!(queue.len(), 1);
	}
}
