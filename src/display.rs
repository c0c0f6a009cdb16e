use crate::prelude::*;

const UPDATE_QUEUE_BOUND: usize = 8;
const RECV_TIMEOUT: Duration = Duration::from_millis(250);

/// Sender half of the update queue. Never blocks the localizer: when the
/// display side falls behind, the oldest queued update is dropped to make
/// room for the newest.
#[derive(Clone)]
pub struct UpdateSender {
	tx: crossbeam::Sender<PositionUpdate>,
	rx: crossbeam::Receiver<PositionUpdate>,
}
impl UpdateSender {
	pub fn send(&self, update: PositionUpdate) {
		let mut update = update;
		loop {
			match self.tx.try_send(update) {
				Ok(()) => return,
				Err(crossbeam::TrySendError::Full(returned)) => {
					self.rx.try_recv().ok();
					update = returned;
				}
				Err(crossbeam::TrySendError::Disconnected(_)) => return,
			}
		}
	}
}

pub fn channel() -> (UpdateSender, crossbeam::Receiver<PositionUpdate>) {
	let (tx, rx) = crossbeam::bounded(UPDATE_QUEUE_BOUND);
	(UpdateSender { tx, rx: rx.clone() }, rx)
}

/// Runs on the main thread until shutdown, consuming position updates.
pub fn run(rx: crossbeam::Receiver<PositionUpdate>) {
	loop {
		if crate::is_shutdown() {
			break;
		}
		match rx.recv_timeout(RECV_TIMEOUT) {
			Ok(update) => log::info!("{:?} at {}", update.subject, update.position),
			Err(crossbeam::RecvTimeoutError::Timeout) => {}
			Err(crossbeam::RecvTimeoutError::Disconnected) => break,
		}
	}

	log::info!("display shutting down...");
}

#[cfg(test)]
mod tests {
	use super::*;

	fn update(x: f64) -> PositionUpdate {
		PositionUpdate {
			position: RelativePosition::new(x, 0.0, 0.0, 1.0, "map8192x8192"),
			subject: Subject::Player,
		}
	}

	#[test]
	fn overflow_drops_the_oldest_update() {
		let (tx, rx) = channel();
		for i in 0..10 {
			tx.send(update(i as f64));
		}

		// updates 0 and 1 were dropped to make room for 8 and 9
		let received = rx.try_iter().collect::<Vec<_>>();
		assert_eq!(received.len(), UPDATE_QUEUE_BOUND);
		assert_eq!(received[0].position.x, 2.0);
		assert_eq!(received.last().unwrap().position.x, 9.0);
	}
}
