use crate::prelude::*;

/// Read once from `settings.json` next to the executable; defaults apply
/// for anything missing.
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Settings {
	/// Precomputed edge image of the full map, in `map8192x8192` scale
	pub map_edges: PathBuf,
	/// `frame:x:y` or `frame:x:y:heading`
	pub start_position: String,
	/// Diagnostic image hooks: hook name to path template, `{time}` expands
	/// to a timestamp
	pub debug_images: BTreeMap<String, String>,
}
impl Default for Settings {
	fn default() -> Self {
		Self {
			map_edges: PathBuf::from("map_edges.png"),
			start_position: format!("{}:3100:2600", minimap::MAP_FRAME),
			debug_images: BTreeMap::new(),
		}
	}
}
impl Settings {
	fn load() -> Self {
		std::fs::File::open("settings.json")
			.ok()
			.and_then(|f| serde_json::from_reader(f).ok())
			.unwrap_or_else(Settings::default)
	}

	pub fn start_position(&self) -> Result<RelativePosition, AnyError> {
		self.start_position.parse()
	}

	pub fn debug_sink(&self) -> DebugSink {
		DebugSink::new(self.debug_images.clone())
	}
}

lazy_static! {
	pub static ref SETTINGS: Settings = Settings::load();
}
