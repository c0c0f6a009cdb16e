#[macro_use]
extern crate lazy_static;

mod capture;
mod display;
mod localizer;
mod settings;

use prelude::*;
mod prelude {
	pub(crate) use crate::{capture, display, settings::SETTINGS};
	pub(crate) use ovm_vision::prelude::*;
}

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

fn main() {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	// a panicking worker must still bring the process down, or main would
	// block forever joining the parked capture thread
	let default_panic = std::panic::take_hook();
	std::panic::set_hook(Box::new(move |info| {
		default_panic(info);
		shutdown();
	}));

	if ctrlc::set_handler(shutdown).is_err() {
		log::error!("failed to set CTRL+C handler, shutting down might not work");
	}

	let (updates, update_rx) = display::channel();

	let capture = capture::spawn();
	let localizer = std::thread::Builder::new()
		.name("localizer".to_string())
		.spawn(move || localizer::start(updates))
		.expect("failed to spawn localizer thread");

	display::run(update_rx);

	for thread in [capture, localizer] {
		if thread.join().is_err() {
			log::error!("a worker thread panicked during shutdown");
		}
	}
}

fn shutdown() {
	if !SHUTDOWN.swap(true, std::sync::atomic::Ordering::SeqCst) {
		log::info!("shutting down...");
		capture::unpark();
	}
}

fn is_shutdown() -> bool {
	SHUTDOWN.load(std::sync::atomic::Ordering::Relaxed)
}
