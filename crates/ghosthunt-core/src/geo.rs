//! Coordinates and great-circle distance.

use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
  pub lat: f64,
  pub lng: f64,
}

impl Coordinates {
  pub fn new(lat: f64, lng: f64) -> Self { Self { lat, lng } }
}

/// Haversine distance in kilometres.
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
  let d_lat = (b.lat - a.lat).to_radians();
  let d_lng = (b.lng - a.lng).to_radians();
  let h = (d_lat / 2.0).sin().powi(2)
    + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
  2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Distance between two optional points. A missing point is infinitely far
/// away, so it never falls inside a proximity radius.
pub fn distance_km(a: Option<Coordinates>, b: Option<Coordinates>) -> f64 {
  match (a, b) {
    (Some(a), Some(b)) => haversine_km(a, b),
    _ => f64::INFINITY,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn same_point_is_zero() {
    let p = Coordinates::new(52.52, 13.405);
    assert_eq!(haversine_km(p, p), 0.0);
  }

  #[test]
  fn one_degree_of_latitude() {
    let d = haversine_km(Coordinates::new(0.0, 0.0), Coordinates::new(1.0, 0.0));
    assert!((d - 111.195).abs() < 0.01, "got {d}");
  }

  #[test]
  fn paris_to_london() {
    let paris = Coordinates::new(48.8566, 2.3522);
    let london = Coordinates::new(51.5074, -0.1278);
    let d = haversine_km(paris, london);
    assert!((d - 343.5).abs() < 1.0, "got {d}");
  }

  #[test]
  fn missing_point_is_infinite() {
    let p = Some(Coordinates::new(1.0, 1.0));
    assert!(distance_km(None, p).is_infinite());
    assert!(distance_km(p, None).is_infinite());
    assert!(distance_km(None, None).is_infinite());
  }
}
