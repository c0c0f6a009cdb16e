use core::ops::*;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point<T> {
	pub x: T,
	pub y: T,
}
impl<T> Point<T> {
	#[inline]
	pub const fn new(x: T, y: T) -> Self {
		Self { x, y }
	}
}
impl Point<f64> {
	#[inline]
	pub fn distance(&self, other: &Self) -> f64 {
		(*self - *other).length()
	}

	#[inline]
	pub fn length(&self) -> f64 {
		self.x.hypot(self.y)
	}

	#[inline]
	pub fn round(&self) -> Point<i64> {
		Point::new(self.x.round() as i64, self.y.round() as i64)
	}
}
impl Point<i32> {
	#[inline]
	pub fn to_f64(self) -> Point<f64> {
		Point::new(self.x as f64, self.y as f64)
	}
}
impl<T> From<Point<T>> for [T; 2] {
	#[inline]
	fn from(pt: Point<T>) -> Self {
		[pt.x, pt.y]
	}
}
impl<T: Copy> From<[T; 2]> for Point<T> {
	#[inline]
	fn from(pt: [T; 2]) -> Self {
		Point { x: pt[0], y: pt[1] }
	}
}
impl<T> From<(T, T)> for Point<T> {
	#[inline]
	fn from((x, y): (T, T)) -> Self {
		Point { x, y }
	}
}
impl<T: Sub<T, Output = T>> Sub for Point<T> {
	type Output = Point<T>;

	#[inline]
	fn sub(self, rhs: Self) -> Self::Output {
		Point::new(self.x - rhs.x, self.y - rhs.y)
	}
}
impl<T: Add<T, Output = T>> Add for Point<T> {
	type Output = Point<T>;

	#[inline]
	fn add(self, rhs: Self) -> Self::Output {
		Point::new(self.x + rhs.x, self.y + rhs.y)
	}
}
impl<T: Mul<T, Output = T> + Copy> Mul<T> for Point<T> {
	type Output = Point<T>;

	#[inline]
	fn mul(self, rhs: T) -> Self::Output {
		Point::new(self.x * rhs, self.y * rhs)
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rect<T> {
	pub left: T,
	pub top: T,
	pub right: T,
	pub bottom: T,
}
impl<T: Copy + Sub<Output = T>> Rect<T> {
	#[inline]
	pub fn width(&self) -> T {
		self.right - self.left
	}

	#[inline]
	pub fn height(&self) -> T {
		self.bottom - self.top
	}
}
