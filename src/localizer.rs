use crate::prelude::*;

/// How far a fix may jump from the last accepted position, in map pixels
/// scaled by the fix's confidence. Full-confidence fixes always pass.
const MAX_JUMP_PER_CERTAINTY: f64 = 500.0;

const IDLE_SLEEP: Duration = Duration::from_millis(50);

/// Shuts the process down when the localizer stops for any reason,
/// including an unwind; the capture thread stays parked otherwise.
struct ShutdownGuard;
impl Drop for ShutdownGuard {
	fn drop(&mut self) {
		crate::shutdown();
	}
}

pub fn start(updates: display::UpdateSender) {
	let _guard = ShutdownGuard;

	if let Err(err) = run(updates) {
		log::error!("localizer failed: {err:#}");
	}
}

fn run(updates: display::UpdateSender) -> Result<(), AnyError> {
	let frames = FrameTable::builtin();
	let sink = SETTINGS.debug_sink();

	let map_edges = image::open(&SETTINGS.map_edges)
		.with_context(|| format!("failed to load map edge image from {}", SETTINGS.map_edges.display()))?
		.into_luma8();
	let mut minimap = MinimapLocalizer::new(map_edges);

	let start = SETTINGS.start_position().context("invalid start_position in settings.json")?;
	let mut last = start.to_frame(&frames, minimap::MAP_FRAME);
	let mut stale_cycles = 0u32;

	log::info!("localizer starting from {last}");

	while !crate::is_shutdown() {
		let frame = match capture::fresh_frame() {
			Some(frame) => frame,
			None => {
				std::thread::sleep(IDLE_SLEEP);
				continue;
			}
		};

		// the minimap fix is preferred; the full-map detector only runs
		// when the minimap says the capture isn't showing the minimap
		let candidate = match minimap.localize(&frame, last.point(), &sink)? {
			MinimapFix::Detected(position) => Some(position),
			MinimapFix::NotApplicable => {
				arrow::detect(&frame, &sink)?.map(|position| position.to_frame(&frames, minimap::MAP_FRAME))
			}
			MinimapFix::Failed => None,
		};

		match candidate {
			Some(position) if plausible_jump(&last, &position) => {
				stale_cycles = 0;
				log::info!("position fix {position} (certainty {})", position.certainty);
				updates.send(PositionUpdate {
					position: position.clone(),
					subject: Subject::Player,
				});
				last = position;
			}
			Some(position) => {
				stale_cycles += 1;
				log::debug!("rejected implausible fix {position}, {stale_cycles} stale cycles");
			}
			None => {
				stale_cycles += 1;
				log::debug!("no fix, {stale_cycles} stale cycles");
			}
		}
	}

	log::info!("localizer shutting down...");
	Ok(())
}

fn plausible_jump(last: &RelativePosition, fix: &RelativePosition) -> bool {
	if fix.certainty >= 1.0 {
		return true;
	}
	last.point().distance(&fix.point()) <= MAX_JUMP_PER_CERTAINTY * fix.certainty
}
