use crate::prelude::*;

lazy_static! {
	static ref FRAME: Mutex<Option<RgbImage>> = Mutex::new(None);
	static ref THREAD_HANDLE: Mutex<Option<std::thread::Thread>> = Mutex::new(None);
}

/// Takes the most recent unseen frame, if any. Always leaves the capture
/// thread running towards the next one.
#[inline]
pub fn fresh_frame() -> Option<RgbImage> {
	let frame = FRAME.lock().take();

	if frame.is_none() {
		unpark();
	}

	frame
}

#[inline]
pub fn unpark() {
	if let Some(thread) = THREAD_HANDLE.lock().as_ref() {
		thread.unpark();
	}
}

fn start() {
	let display = scrap::Display::primary().expect("failed to find primary display");
	let mut capturer = scrap::Capturer::new(display).expect("failed to initialize display capturer");
	let (width, height) = (capturer.width() as u32, capturer.height() as u32);

	// Don't waste time and resources with duplicate frames
	let mut last_frame_crc32 = 0;

	// a persistent capture error would otherwise spam the log at 20 Hz
	let mut last_error = String::new();

	'thread: loop {
		if crate::is_shutdown() {
			break;
		}

		let capture = loop {
			match capturer.frame() {
				Ok(frame) => {
					let crc32 = crc32fast::hash(&frame);
					if last_frame_crc32 != crc32 {
						last_frame_crc32 = crc32;
						break Ok(frame.to_vec());
					}
				}

				Err(ref err) if err.kind() == std::io::ErrorKind::WouldBlock => {}

				Err(err) => break Err(err),
			}

			if crate::is_shutdown() {
				break 'thread;
			}

			std::thread::sleep(Duration::from_millis(50)); // 20 Hz

			if crate::is_shutdown() {
				break 'thread;
			}
		};

		match capture {
			Err(err) => {
				let message = err.to_string();
				if message != last_error {
					log::warn!("error while capturing frame: {message}");
					last_error = message;
				}
				std::thread::sleep(Duration::from_millis(50));
			}

			Ok(capture) => {
				let capture = image::ImageBuffer::<image::Bgra<u8>, Vec<u8>>::from_raw(width, height, capture)
					.expect("failed to create image buffer");

				*FRAME.lock() = Some(capture.convert());
				last_error.clear();

				if crate::is_shutdown() {
					break 'thread;
				}
				std::thread::park();
			}
		}
	}

	log::info!("capture shutting down...");
}

pub fn spawn() -> JoinHandle<()> {
	let handle = std::thread::spawn(start);
	*THREAD_HANDLE.lock() = Some(handle.thread().to_owned());
	handle
}
