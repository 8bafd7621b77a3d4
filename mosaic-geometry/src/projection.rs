//! Spherical Web-Mercator projection onto the unit square.
//!
//! `x` grows eastwards from 0 at -180° to 1 at 180°, `y` grows southwards from 0 at the
//! northern clipping latitude to 1 at the southern one.

use std::f64::consts::PI;

pub fn lng_x(lng: f64) -> f64 {
    lng / 360.0 + 0.5
}

pub fn lat_y(lat: f64) -> f64 {
    let sin = (lat * PI / 180.0).sin();
    let y = 0.5 - 0.25 * ((1.0 + sin) / (1.0 - sin)).ln() / PI;
    y.clamp(0.0, 1.0)
}

pub fn x_lng(x: f64) -> f64 {
    (x - 0.5) * 360.0
}

pub fn y_lat(y: f64) -> f64 {
    let y2 = (180.0 - y * 360.0) * PI / 180.0;
    360.0 * y2.exp().atan() / PI - 90.0
}

/// Project `[lng, lat]` to unit-square coordinates
pub fn project(position: [f64; 2]) -> [f64; 2] {
    [lng_x(position[0]), lat_y(position[1])]
}

/// Inverse of [`project`]
pub fn unproject(point: [f64; 2]) -> [f64; 2] {
    [x_lng(point[0]), y_lat(point[1])]
}
