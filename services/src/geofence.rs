//! Geographic distance and reliability model for scan verification.
//!
//! Distances are geodesic on the WGS-84 ellipsoid (Vincenty's inverse
//! formula, falling back to a great-circle estimate for the near-antipodal
//! pairs where the iteration does not converge). Each supplied GPS accuracy
//! widens an error margin; a reading whose margin is large relative to the
//! measured distance is treated as unreliable and tightens the allowed
//! radius rather than loosening it.

use serde::{Deserialize, Serialize};

// WGS-84 ellipsoid.
const SEMI_MAJOR_AXIS_M: f64 = 6_378_137.0;
const SEMI_MINOR_AXIS_M: f64 = 6_356_752.314245;
const FLATTENING: f64 = 1.0 / 298.257_223_563;

// IUGG mean Earth radius, used by the great-circle fallback only.
const MEAN_EARTH_RADIUS_M: f64 = 6_371_008.8;

const VINCENTY_TOLERANCE: f64 = 1e-12;
const VINCENTY_MAX_ITERATIONS: usize = 200;

/// Error margin assumed when neither side reports a GPS accuracy.
pub const DEFAULT_ERROR_MARGIN_M: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// Distance plus the confidence model derived from reported accuracies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DistanceEstimate {
    /// Meters; `+inf` when either coordinate is missing.
    pub distance_m: f64,
    pub error_margin_m: f64,
    pub reliable: bool,
}

/// Outcome of checking a claimant against an issuer geofence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeofenceCheck {
    pub within_radius: bool,
    pub distance_m: f64,
    pub error_margin_m: f64,
    pub reliable: bool,
    pub effective_radius_m: f64,
    pub allowed_radius_m: f64,
    /// Both sides reported exactly the same fix; accepted, but callers
    /// surface it as an anti-spoofing signal.
    pub identical_coordinates: bool,
}

/// Geodesic distance in meters between two points on the WGS-84 ellipsoid.
pub fn geodesic_distance_m(from: Coordinates, to: Coordinates) -> f64 {
    vincenty_inverse(from, to).unwrap_or_else(|| haversine_distance_m(from, to))
}

/// Vincenty's inverse formula. Returns `None` when the iteration fails to
/// converge, which only happens for near-antipodal points.
fn vincenty_inverse(from: Coordinates, to: Coordinates) -> Option<f64> {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let delta_lng = (to.longitude - from.longitude).to_radians();

    let reduced_lat1 = ((1.0 - FLATTENING) * lat1.tan()).atan();
    let reduced_lat2 = ((1.0 - FLATTENING) * lat2.tan()).atan();
    let (sin_u1, cos_u1) = reduced_lat1.sin_cos();
    let (sin_u2, cos_u2) = reduced_lat2.sin_cos();

    let mut lambda = delta_lng;
    let mut iterations = 0;

    let (sin_sigma, cos_sigma, sigma, cos_sq_alpha, cos_2sigma_m) = loop {
        let (sin_lambda, cos_lambda) = lambda.sin_cos();

        let sin_sigma = ((cos_u2 * sin_lambda).powi(2)
            + (cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda).powi(2))
        .sqrt();
        if sin_sigma == 0.0 {
            // Coincident points.
            return Some(0.0);
        }

        let cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lambda;
        let sigma = sin_sigma.atan2(cos_sigma);

        let sin_alpha = cos_u1 * cos_u2 * sin_lambda / sin_sigma;
        let cos_sq_alpha = 1.0 - sin_alpha * sin_alpha;
        let cos_2sigma_m = if cos_sq_alpha == 0.0 {
            // Equatorial line.
            0.0
        } else {
            cos_sigma - 2.0 * sin_u1 * sin_u2 / cos_sq_alpha
        };

        let c = FLATTENING / 16.0 * cos_sq_alpha * (4.0 + FLATTENING * (4.0 - 3.0 * cos_sq_alpha));
        let previous_lambda = lambda;
        lambda = delta_lng
            + (1.0 - c)
                * FLATTENING
                * sin_alpha
                * (sigma
                    + c * sin_sigma
                        * (cos_2sigma_m
                            + c * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)));

        if (lambda - previous_lambda).abs() < VINCENTY_TOLERANCE {
            break (sin_sigma, cos_sigma, sigma, cos_sq_alpha, cos_2sigma_m);
        }

        iterations += 1;
        if iterations >= VINCENTY_MAX_ITERATIONS {
            return None;
        }
    };

    let u_sq = cos_sq_alpha
        * (SEMI_MAJOR_AXIS_M * SEMI_MAJOR_AXIS_M - SEMI_MINOR_AXIS_M * SEMI_MINOR_AXIS_M)
        / (SEMI_MINOR_AXIS_M * SEMI_MINOR_AXIS_M);
    let a = 1.0 + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
    let b = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));

    let delta_sigma = b
        * sin_sigma
        * (cos_2sigma_m
            + b / 4.0
                * (cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)
                    - b / 6.0
                        * cos_2sigma_m
                        * (-3.0 + 4.0 * sin_sigma * sin_sigma)
                        * (-3.0 + 4.0 * cos_2sigma_m * cos_2sigma_m)));

    Some(SEMI_MINOR_AXIS_M * a * (sigma - delta_sigma))
}

fn haversine_distance_m(from: Coordinates, to: Coordinates) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let delta_lat = (to.latitude - from.latitude).to_radians();
    let delta_lng = (to.longitude - from.longitude).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lng / 2.0).sin().powi(2);

    2.0 * MEAN_EARTH_RADIUS_M * h.sqrt().asin()
}

/// Combines the distance between two optional fixes with the error margin
/// implied by their reported accuracies.
///
/// Accuracies that are absent, zero, or negative do not contribute; if none
/// contributes the margin falls back to [`DEFAULT_ERROR_MARGIN_M`]. A missing
/// coordinate on either side yields an infinite distance, which no finite
/// radius accepts.
pub fn estimate_distance(
    from: Option<Coordinates>,
    to: Option<Coordinates>,
    from_accuracy_m: Option<f64>,
    to_accuracy_m: Option<f64>,
) -> DistanceEstimate {
    let supplied: f64 = [from_accuracy_m, to_accuracy_m]
        .into_iter()
        .flatten()
        .filter(|a| *a > 0.0)
        .sum();
    let error_margin_m = if supplied > 0.0 {
        supplied
    } else {
        DEFAULT_ERROR_MARGIN_M
    };

    let (Some(from), Some(to)) = (from, to) else {
        return DistanceEstimate {
            distance_m: f64::INFINITY,
            error_margin_m,
            reliable: false,
        };
    };

    let distance_m = geodesic_distance_m(from, to);
    DistanceEstimate {
        distance_m,
        error_margin_m,
        reliable: error_margin_m < 0.5 * distance_m,
    }
}

/// Applies the radius-tightening policy: an unreliable reading whose margin
/// is smaller than the allowed radius shrinks the radius by that margin, so
/// low-confidence fixes never pass on a technicality.
pub fn check_within_radius(
    claimant: Option<Coordinates>,
    claimant_accuracy_m: Option<f64>,
    issuer: Coordinates,
    issuer_accuracy_m: Option<f64>,
    allowed_radius_m: f64,
) -> GeofenceCheck {
    let estimate = estimate_distance(claimant, Some(issuer), claimant_accuracy_m, issuer_accuracy_m);

    let effective_radius_m = if !estimate.reliable && estimate.error_margin_m < allowed_radius_m {
        (allowed_radius_m - estimate.error_margin_m).max(0.0)
    } else {
        allowed_radius_m
    };

    GeofenceCheck {
        within_radius: estimate.distance_m <= effective_radius_m,
        distance_m: estimate.distance_m,
        error_margin_m: estimate.error_margin_m,
        reliable: estimate.reliable,
        effective_radius_m,
        allowed_radius_m,
        identical_coordinates: claimant == Some(issuer),
    }
}
