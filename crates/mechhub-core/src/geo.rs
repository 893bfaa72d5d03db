//! Distance, ETA, and live-location throttling helpers.

use serde::{Deserialize, Serialize};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    #[serde(alias = "lat")]
    pub latitude: f64,
    #[serde(alias = "lng")]
    pub longitude: f64,
}

impl Coordinates {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance in kilometres (haversine).
    pub fn distance_km(&self, other: &Self) -> f64 {
        let d_lat = (other.latitude - self.latitude).to_radians();
        let d_lon = (other.longitude - self.longitude).to_radians();
        let a = (d_lat / 2.0).sin().powi(2)
            + self.latitude.to_radians().cos()
                * other.latitude.to_radians().cos()
                * (d_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_KM * c
    }
}

/// "850m" below one kilometre, "2.4km" above.
pub fn format_distance(km: f64) -> String {
    if km < 1.0 {
        format!("{}m", (km * 1000.0).round())
    } else {
        format!("{km:.1}km")
    }
}

/// Travel time in whole minutes at `average_speed_kmh`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn travel_minutes(km: f64, average_speed_kmh: f64) -> u64 {
    if average_speed_kmh <= 0.0 || !km.is_finite() || km <= 0.0 {
        return 0;
    }
    (km / average_speed_kmh * 60.0).round() as u64
}

/// "25 min" under an hour, "1h 12m" otherwise.
pub fn format_eta(minutes: u64) -> String {
    if minutes < 60 {
        format!("{minutes} min")
    } else {
        format!("{}h {}m", minutes / 60, minutes % 60)
    }
}

/// A device location reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationFix {
    pub coordinates: Coordinates,
    /// Horizontal accuracy radius in metres.
    pub accuracy_meters: f64,
}

/// Decides which live-location fixes are worth pushing to the backend.
///
/// A fix is pushed when its accuracy is within `accuracy_threshold_meters`
/// and it is at least `min_distance_meters` away from the last pushed fix.
#[derive(Debug, Clone)]
pub struct LocationThrottle {
    min_distance_meters: f64,
    accuracy_threshold_meters: f64,
    last_sent: Option<Coordinates>,
}

impl LocationThrottle {
    pub const fn new(min_distance_meters: f64, accuracy_threshold_meters: f64) -> Self {
        Self {
            min_distance_meters,
            accuracy_threshold_meters,
            last_sent: None,
        }
    }

    /// Returns `true` and records the fix if it should be sent.
    pub fn offer(&mut self, fix: LocationFix) -> bool {
        if fix.accuracy_meters > self.accuracy_threshold_meters {
            return false;
        }
        if let Some(last) = self.last_sent {
            let moved_m = last.distance_km(&fix.coordinates) * 1000.0;
            if moved_m < self.min_distance_meters {
                return false;
            }
        }
        self.last_sent = Some(fix.coordinates);
        true
    }

    pub const fn last_sent(&self) -> Option<Coordinates> {
        self.last_sent
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const LAHORE: Coordinates = Coordinates::new(31.5204, 74.3587);
    const ISLAMABAD: Coordinates = Coordinates::new(33.6844, 73.0479);

    #[test]
    fn lahore_to_islamabad_is_about_270km() {
        let d = LAHORE.distance_km(&ISLAMABAD);
        assert!((d - 270.0).abs() < 10.0, "got {d}");
        assert!(LAHORE.distance_km(&LAHORE).abs() < f64::EPSILON);
    }

    #[test]
    fn formats_short_and_long_distances() {
        assert_eq!(format_distance(0.85), "850m");
        assert_eq!(format_distance(2.44), "2.4km");
    }

    #[test]
    fn eta_at_city_speed() {
        assert_eq!(travel_minutes(10.0, 25.0), 24);
        assert_eq!(format_eta(24), "24 min");
        assert_eq!(format_eta(72), "1h 12m");
        assert_eq!(travel_minutes(10.0, 0.0), 0);
    }

    #[test]
    fn throttle_skips_small_moves_and_inaccurate_fixes() {
        let mut throttle = LocationThrottle::new(50.0, 100.0);
        let fix = |lat: f64, acc: f64| LocationFix {
            coordinates: Coordinates::new(lat, 74.3587),
            accuracy_meters: acc,
        };

        assert!(throttle.offer(fix(31.5204, 20.0)));
        // ~11 m north
        assert!(!throttle.offer(fix(31.5205, 20.0)));
        // ~111 m north but too inaccurate
        assert!(!throttle.offer(fix(31.5214, 250.0)));
        assert!(throttle.offer(fix(31.5214, 20.0)));
        assert_eq!(throttle.last_sent().unwrap().latitude, 31.5214);
    }

    #[test]
    fn coordinates_accept_short_keys() {
        let c: Coordinates = serde_json::from_str(r#"{"lat": 31.5, "lng": 74.3}"#).unwrap();
        assert_eq!(c, Coordinates::new(31.5, 74.3));
    }
}
