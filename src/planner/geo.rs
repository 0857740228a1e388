//! Geographic coordinates and the local planar frame the planner measures distances in.
//!
//! A map covers at most a few kilometres so every [GeoCoord] is projected onto a plane tangent to the
//! Earth at the map origin:
//!
//! ```text
//!  north (m)
//!    ^
//!    |      . end
//!    |    .
//!    |  .
//!    |.
//!    +------------> east (m)
//!  origin
//! ```
//!

/// A latitude/longitude pair in decimal degrees
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct GeoCoord {
	/// Latitude in degrees, positive towards the north
	pub lat: f64,
	/// Longitude in degrees, positive towards the east
	pub lon: f64,
}

impl GeoCoord {
	/// Create a new coordinate
	pub const fn new(lat: f64, lon: f64) -> Self {
		GeoCoord { lat, lon }
	}
	/// Are both components finite numbers
	pub fn is_finite(&self) -> bool {
		self.lat.is_finite() && self.lon.is_finite()
	}
}

/// A position in metres within a [LocalProjection]
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct PlanarPoint {
	/// Metres towards the east of the projection origin
	pub east: f64,
	/// Metres towards the north of the projection origin
	pub north: f64,
}

impl PlanarPoint {
	/// Create a new point
	pub const fn new(east: f64, north: f64) -> Self {
		PlanarPoint { east, north }
	}
	/// Euclidean length of the vector from the origin
	pub fn length(&self) -> f64 {
		self.east.hypot(self.north)
	}
	/// Euclidean distance between two points
	pub fn distance(&self, other: &PlanarPoint) -> f64 {
		(*self - *other).length()
	}
	/// Multiply both components by `factor`
	pub fn scale(&self, factor: f64) -> PlanarPoint {
		PlanarPoint::new(self.east * factor, self.north * factor)
	}
	/// Dot product
	pub fn dot(&self, other: &PlanarPoint) -> f64 {
		self.east * other.east + self.north * other.north
	}
}

impl std::ops::Add for PlanarPoint {
	type Output = PlanarPoint;
	fn add(self, rhs: PlanarPoint) -> PlanarPoint {
		PlanarPoint::new(self.east + rhs.east, self.north + rhs.north)
	}
}

impl std::ops::Sub for PlanarPoint {
	type Output = PlanarPoint;
	fn sub(self, rhs: PlanarPoint) -> PlanarPoint {
		PlanarPoint::new(self.east - rhs.east, self.north - rhs.north)
	}
}

/// Equirectangular projection about an origin, accurate for the small extents of a single map
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocalProjection {
	/// Tangent point of the plane
	origin: GeoCoord,
	/// Radius of the Earth in metres
	earth_radius: f64,
	/// Cosine of the origin latitude, shrinks longitudinal distances away from the equator
	cos_lat: f64,
}

impl LocalProjection {
	/// Create a projection tangent at `origin`
	pub fn new(origin: GeoCoord, earth_radius: f64) -> Self {
		// clamp so that a pole origin doesn't divide by zero when unprojecting
		let cos_lat = origin.lat.to_radians().cos().max(1e-9);
		LocalProjection {
			origin,
			earth_radius,
			cos_lat,
		}
	}
	/// Get the origin
	pub fn get_origin(&self) -> GeoCoord {
		self.origin
	}
	/// Get the Earth radius the projection was built with
	pub fn get_earth_radius(&self) -> f64 {
		self.earth_radius
	}
	/// Project a [GeoCoord] onto the plane
	pub fn to_planar(&self, coord: &GeoCoord) -> PlanarPoint {
		let east = (coord.lon - self.origin.lon).to_radians() * self.earth_radius * self.cos_lat;
		let north = (coord.lat - self.origin.lat).to_radians() * self.earth_radius;
		PlanarPoint::new(east, north)
	}
	/// Unproject a [PlanarPoint] back into a [GeoCoord]
	pub fn to_geo(&self, point: &PlanarPoint) -> GeoCoord {
		let lat = self.origin.lat + (point.north / self.earth_radius).to_degrees();
		let lon = self.origin.lon + (point.east / (self.earth_radius * self.cos_lat)).to_degrees();
		GeoCoord::new(lat, lon)
	}
}

/// Great-circle distance in metres between two coordinates
pub fn haversine_distance(a: &GeoCoord, b: &GeoCoord, earth_radius: f64) -> f64 {
	let lat1 = a.lat.to_radians();
	let lat2 = b.lat.to_radians();
	let d_lat = (b.lat - a.lat).to_radians();
	let d_lon = (b.lon - a.lon).to_radians();

	let sin_d_lat = (d_lat / 2.0).sin();
	let sin_d_lon = (d_lon / 2.0).sin();
	let h = sin_d_lat.mul_add(sin_d_lat, lat1.cos() * lat2.cos() * sin_d_lon * sin_d_lon);
	2.0 * earth_radius * h.sqrt().min(1.0).asin()
}

/// Ray casting test of whether `point` lies inside the (implicitly closed) `polygon`
pub fn point_in_polygon(point: &PlanarPoint, polygon: &[PlanarPoint]) -> bool {
	if polygon.len() < 3 {
		return false;
	}
	let mut inside = false;
	let mut j = polygon.len() - 1;
	for i in 0..polygon.len() {
		let a = polygon[i];
		let b = polygon[j];
		if (a.north > point.north) != (b.north > point.north) {
			let crossing = (b.east - a.east) * (point.north - a.north) / (b.north - a.north) + a.east;
			if point.east < crossing {
				inside = !inside;
			}
		}
		j = i;
	}
	inside
}

/// Shortest distance from `point` to the segment `a`-`b`
pub fn distance_to_segment(point: &PlanarPoint, a: &PlanarPoint, b: &PlanarPoint) -> f64 {
	let ab = *b - *a;
	let length_sq = ab.dot(&ab);
	if length_sq == 0.0 {
		return point.distance(a);
	}
	let t = ((*point - *a).dot(&ab) / length_sq).clamp(0.0, 1.0);
	point.distance(&(*a + ab.scale(t)))
}

/// Shortest distance from `point` to any edge of the closed `polygon`
pub fn distance_to_polygon_edge(point: &PlanarPoint, polygon: &[PlanarPoint]) -> f64 {
	let mut shortest = f64::INFINITY;
	for (i, a) in polygon.iter().enumerate() {
		let b = &polygon[(i + 1) % polygon.len()];
		shortest = shortest.min(distance_to_segment(point, a, b));
	}
	shortest
}

#[cfg(test)]
mod tests {
	use super::*;

	const EARTH: f64 = 6_371_000.0;

	#[test]
	fn projection_round_trip() {
		let projection = LocalProjection::new(GeoCoord::new(59.3, 18.0), EARTH);
		let coord = GeoCoord::new(59.31, 18.02);
		let actual = projection.to_geo(&projection.to_planar(&coord));
		assert!((actual.lat - coord.lat).abs() < 1e-9);
		assert!((actual.lon - coord.lon).abs() < 1e-9);
	}
	#[test]
	fn one_degree_latitude() {
		let projection = LocalProjection::new(GeoCoord::new(0.0, 0.0), EARTH);
		let actual = projection.to_planar(&GeoCoord::new(1.0, 0.0)).north;
		let result = EARTH * std::f64::consts::PI / 180.0;
		assert!((actual - result).abs() < 1e-6);
	}
	#[test]
	fn planar_agrees_with_haversine_at_short_range() {
		let origin = GeoCoord::new(55.6, 12.5);
		let projection = LocalProjection::new(origin, EARTH);
		let target = GeoCoord::new(55.605, 12.51);
		let planar = projection.to_planar(&target).length();
		let great_circle = haversine_distance(&origin, &target, EARTH);
		assert!((planar - great_circle).abs() < 1.0);
	}
	#[test]
	fn haversine_zero() {
		let a = GeoCoord::new(10.0, 10.0);
		assert_eq!(haversine_distance(&a, &a, EARTH), 0.0);
	}
	#[test]
	fn inside_square() {
		let square = vec![
			PlanarPoint::new(0.0, 0.0),
			PlanarPoint::new(10.0, 0.0),
			PlanarPoint::new(10.0, 10.0),
			PlanarPoint::new(0.0, 10.0),
		];
		assert!(point_in_polygon(&PlanarPoint::new(5.0, 5.0), &square));
		assert!(!point_in_polygon(&PlanarPoint::new(15.0, 5.0), &square));
	}
	#[test]
	fn degenerate_polygon_contains_nothing() {
		let line = vec![PlanarPoint::new(0.0, 0.0), PlanarPoint::new(10.0, 0.0)];
		assert!(!point_in_polygon(&PlanarPoint::new(5.0, 0.0), &line));
	}
	#[test]
	fn segment_distance() {
		let a = PlanarPoint::new(0.0, 0.0);
		let b = PlanarPoint::new(10.0, 0.0);
		assert_eq!(distance_to_segment(&PlanarPoint::new(5.0, 3.0), &a, &b), 3.0);
		assert_eq!(distance_to_segment(&PlanarPoint::new(13.0, 4.0), &a, &b), 5.0);
	}
}
