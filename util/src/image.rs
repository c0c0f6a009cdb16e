fn hsv(r: u8, g: u8, b: u8) -> (u16, u8, u8) {
	let r = r as f32 / 255.0;
	let g = g as f32 / 255.0;
	let b = b as f32 / 255.0;

	let max = r.max(g.max(b));
	let min = r.min(g.min(b));
	let delta = max - min;

	let h = if max == min {
		0.0
	} else if max == r {
		60.0 * (((g - b) / delta).rem_euclid(6.0))
	} else if max == g {
		60.0 * (((b - r) / delta) + 2.0)
	} else {
		60.0 * (((r - g) / delta) + 4.0)
	};
	let s = 100.0 * delta / max;
	let v = 100.0 * max;

	(h as u16, s as u8, v as u8)
}

/// Hue 0-359, saturation and value 0-100
pub trait HSV: image::Pixel {
	fn to_hsv(self) -> (u16, u8, u8);
}
impl HSV for image::Rgb<u8> {
	#[inline]
	fn to_hsv(self) -> (u16, u8, u8) {
		hsv(self.0[0], self.0[1], self.0[2])
	}
}
impl HSV for image::Rgba<u8> {
	#[inline]
	fn to_hsv(self) -> (u16, u8, u8) {
		hsv(self.0[0], self.0[1], self.0[2])
	}
}

pub trait FastPixelGet: image::GenericImageView {
	fn get_pixel_fast(&self, x: u32, y: u32) -> <Self as image::GenericImageView>::Pixel;
}
impl<I: image::GenericImageView> FastPixelGet for I {
	#[inline]
	#[cfg(debug_assertions)]
	fn get_pixel_fast(&self, x: u32, y: u32) -> <Self as image::GenericImageView>::Pixel {
		self.get_pixel(x, y)
	}

	#[inline]
	#[cfg(not(debug_assertions))]
	fn get_pixel_fast(&self, x: u32, y: u32) -> <Self as image::GenericImageView>::Pixel {
		unsafe { self.unsafe_get_pixel(x, y) }
	}
}

pub trait FastPixelSet: image::GenericImageView + image::GenericImage {
	fn put_pixel_fast(&mut self, x: u32, y: u32, pixel: <Self as image::GenericImageView>::Pixel);
}
impl<I: image::GenericImageView + image::GenericImage> FastPixelSet for I {
	#[inline]
	#[cfg(debug_assertions)]
	fn put_pixel_fast(&mut self, x: u32, y: u32, pixel: <Self as image::GenericImageView>::Pixel) {
		self.put_pixel(x, y, pixel)
	}

	#[inline]
	#[cfg(not(debug_assertions))]
	fn put_pixel_fast(&mut self, x: u32, y: u32, pixel: <Self as image::GenericImageView>::Pixel) {
		unsafe { self.unsafe_put_pixel(x, y, pixel) }
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn hsv_bands() {
		// pure teal-blue, the map arrow color family
		assert_eq!(image::Rgb([0u8, 100, 150]).to_hsv(), (200, 100, 58));
		// grays carry no hue and no saturation
		assert_eq!(image::Rgb([60u8, 60, 60]).to_hsv(), (0, 0, 23));
		assert_eq!(image::Rgb([255u8, 255, 255]).to_hsv(), (0, 0, 100));
	}
}
