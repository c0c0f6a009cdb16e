pub use image::{buffer::ConvertBuffer, DynamicImage, GenericImage, GenericImageView, GrayImage, RgbImage};
pub use parking_lot::{Condvar, Mutex, RwLock};
pub use rayon::prelude::*;

pub type AnyError = anyhow::Error;
pub use anyhow::Context;

pub use std::{
	borrow::Cow,
	collections::{BTreeMap, HashMap, VecDeque},
	path::{Path, PathBuf},
	sync::{
		atomic::{AtomicBool, AtomicU32, AtomicUsize},
		Arc,
	},
	thread::JoinHandle,
	time::{Instant, SystemTime},
};

pub use core::{
	ops::{Deref, DerefMut},
	time::Duration,
};

pub use crossbeam_channel as crossbeam;
pub use anyhow;
pub use chrono;
pub use image;
pub use imageproc;
pub use log;
pub use rayon;

mod geometry;
pub use geometry::*;

mod debug;
pub use debug::*;

#[path = "image.rs"]
mod util_image;
pub use util_image::*;
