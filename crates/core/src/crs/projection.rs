//! Pure-Rust projections between WGS84, Web Mercator and UTM (Snyder 1987).
//!
//! Every supported CRS converts to and from WGS84 longitude/latitude, so any
//! pair of them can be chained through geographic coordinates. No libproj.
//!
//! NAD83 (EPSG:4269 and its UTM zones 269xx) runs on the same math: GRS80 and
//! WGS84 differ by about 0.1 mm in the semi-minor axis, and the datum shift is
//! under two metres, well below a DEM cell.

use super::CRS;
use crate::error::{Error, Result};

// ── WGS84 ellipsoid constants ────────────────────────────────────────────

const A: f64 = 6_378_137.0; // semi-major axis (m)
const F: f64 = 1.0 / 298.257_223_563; // flattening
const E2: f64 = 2.0 * F - F * F; // eccentricity squared
const E_PRIME2: f64 = E2 / (1.0 - E2); // second eccentricity squared
const K0: f64 = 0.9996; // UTM scale factor
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;
const MERCATOR_MAX_LAT: f64 = 85.051_128_779_806_59;

/// Something that moves coordinates from one CRS into another.
pub trait CoordinateTransform {
    /// Source → target
    fn transform(&self, x: f64, y: f64) -> Result<(f64, f64)>;

    /// Target → source
    fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64)>;
}

/// A supported map projection
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// EPSG:4326 or 4269, x = longitude, y = latitude (degrees)
    Geographic,
    /// EPSG:3857 spherical Mercator (metres)
    WebMercator,
    /// EPSG:326xx / 327xx, NAD83 269xx
    Utm { zone: u32, north: bool },
}

impl Projection {
    /// Resolve the projection behind a CRS
    pub fn from_crs(crs: &CRS) -> Result<Self> {
        let Some(epsg) = crs.epsg() else {
            return Err(Error::UnsupportedCrs(crs.identifier()));
        };
        match epsg {
            4326 | 4269 => Ok(Projection::Geographic),
            3857 => Ok(Projection::WebMercator),
            _ => parse_utm_epsg(epsg)
                .map(|(zone, north)| Projection::Utm { zone, north })
                .ok_or_else(|| Error::UnsupportedCrs(crs.identifier())),
        }
    }

    /// Projected (x, y) → WGS84 (lon, lat)
    pub fn unproject(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        match *self {
            Projection::Geographic => check_geographic(x, y),
            Projection::WebMercator => Ok(web_mercator_to_wgs84(x, y)),
            Projection::Utm { zone, north } => Ok(utm_to_wgs84(x, y, zone, north)),
        }
    }

    /// WGS84 (lon, lat) → projected (x, y)
    pub fn project(&self, lon: f64, lat: f64) -> Result<(f64, f64)> {
        let (lon, lat) = check_geographic(lon, lat)?;
        match *self {
            Projection::Geographic => Ok((lon, lat)),
            Projection::WebMercator => {
                if lat.abs() > MERCATOR_MAX_LAT {
                    return Err(Error::Projection {
                        x: lon,
                        y: lat,
                        reason: "latitude outside Web Mercator range".into(),
                    });
                }
                Ok(wgs84_to_web_mercator(lon, lat))
            }
            Projection::Utm { zone, north } => Ok(wgs84_to_utm(lon, lat, zone, north)),
        }
    }
}

/// Transformer between two supported projections, chained through WGS84.
#[derive(Debug, Clone, Copy)]
pub struct Transformer {
    source: Projection,
    target: Projection,
}

impl Transformer {
    pub fn new(source: Projection, target: Projection) -> Self {
        Self { source, target }
    }

    pub fn source(&self) -> Projection {
        self.source
    }

    pub fn target(&self) -> Projection {
        self.target
    }
}

impl CoordinateTransform for Transformer {
    fn transform(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        if self.source == self.target {
            return Ok((x, y));
        }
        let (lon, lat) = self.source.unproject(x, y)?;
        self.target.project(lon, lat)
    }

    fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        if self.source == self.target {
            return Ok((x, y));
        }
        let (lon, lat) = self.target.unproject(x, y)?;
        self.source.project(lon, lat)
    }
}

/// Build a transformer from `from` into `to`.
///
/// Fails with [`Error::UnsupportedCrs`] when either side is not one of
/// EPSG:4326, EPSG:4269, EPSG:3857 or a WGS84/NAD83 UTM zone.
pub fn transformer(from: &CRS, to: &CRS) -> Result<Transformer> {
    Ok(Transformer::new(Projection::from_crs(from)?, Projection::from_crs(to)?))
}

/// Parse an EPSG code into UTM zone info: `Some((zone, is_north))`.
///
/// - EPSG 326xx → zone xx, North hemisphere
/// - EPSG 327xx → zone xx, South hemisphere
/// - EPSG 269xx → NAD83 zone xx (1-23), North hemisphere
pub fn parse_utm_epsg(epsg: u32) -> Option<(u32, bool)> {
    if (32601..=32660).contains(&epsg) {
        Some((epsg - 32600, true))
    } else if (32701..=32760).contains(&epsg) {
        Some((epsg - 32700, false))
    } else if (26901..=26923).contains(&epsg) {
        Some((epsg - 26900, true))
    } else {
        None
    }
}

/// True when both CRSs resolve to the same supported projection
pub fn same_projection(a: &CRS, b: &CRS) -> bool {
    match (Projection::from_crs(a), Projection::from_crs(b)) {
        (Ok(pa), Ok(pb)) => pa == pb,
        _ => false,
    }
}

fn check_geographic(lon: f64, lat: f64) -> Result<(f64, f64)> {
    if !lon.is_finite() || !lat.is_finite() || lat.abs() > 90.0 {
        return Err(Error::Projection {
            x: lon,
            y: lat,
            reason: "not a valid longitude/latitude".into(),
        });
    }
    Ok((lon, lat))
}

fn central_meridian(zone: u32) -> f64 {
    ((zone as f64 - 1.0) * 6.0 - 180.0 + 3.0).to_radians()
}

// ── Core projection (Snyder 1987, USGS Prof. Paper 1395, pp. 61-64) ─────

/// Convert WGS84 (longitude, latitude) in degrees to UTM (easting, northing)
/// in metres for the given zone and hemisphere.
fn wgs84_to_utm(lon_deg: f64, lat_deg: f64, zone: u32, north: bool) -> (f64, f64) {
    let lat = lat_deg.to_radians();
    let lon = lon_deg.to_radians();
    let lon0 = central_meridian(zone);

    let sin_lat = lat.sin();
    let cos_lat = lat.cos();
    let tan_lat = lat.tan();

    let n = A / (1.0 - E2 * sin_lat * sin_lat).sqrt();
    let t = tan_lat * tan_lat;
    let c = E_PRIME2 * cos_lat * cos_lat;
    let a_coeff = cos_lat * (lon - lon0);

    // Meridional arc length M (Snyder eq. 3-21)
    let m = meridional_arc(lat);

    let a2 = a_coeff * a_coeff;
    let a4 = a2 * a2;
    let a6 = a4 * a2;

    // Easting (Snyder eq. 8-9)
    let easting = K0 * n
        * (a_coeff
            + (1.0 - t + c) * a2 * a_coeff / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * E_PRIME2) * a4 * a_coeff / 120.0)
        + FALSE_EASTING;

    // Northing (Snyder eq. 8-10)
    let northing = K0
        * (m + n
            * tan_lat
            * (a2 / 2.0
                + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * E_PRIME2) * a6 / 720.0));

    let northing = if north {
        northing
    } else {
        northing + FALSE_NORTHING_SOUTH
    };

    (easting, northing)
}

/// Convert UTM (easting, northing) back to WGS84 (longitude, latitude).
/// Snyder eq. 8-12 to 8-25 (footpoint latitude series).
fn utm_to_wgs84(easting: f64, northing: f64, zone: u32, north: bool) -> (f64, f64) {
    let northing = if north {
        northing
    } else {
        northing - FALSE_NORTHING_SOUTH
    };

    let e4 = E2 * E2;
    let e6 = e4 * E2;
    let sqrt_1_e2 = (1.0 - E2).sqrt();
    let e1 = (1.0 - sqrt_1_e2) / (1.0 + sqrt_1_e2);

    let m = northing / K0;
    let mu = m / (A * (1.0 - E2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));

    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1 * e1 / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

    let sin_phi1 = phi1.sin();
    let cos_phi1 = phi1.cos();
    let tan_phi1 = phi1.tan();

    let c1 = E_PRIME2 * cos_phi1 * cos_phi1;
    let t1 = tan_phi1 * tan_phi1;
    let denom = 1.0 - E2 * sin_phi1 * sin_phi1;
    let n1 = A / denom.sqrt();
    let r1 = A * (1.0 - E2) / denom.powf(1.5);
    let d = (easting - FALSE_EASTING) / (n1 * K0);

    let d2 = d * d;
    let d4 = d2 * d2;
    let d6 = d4 * d2;

    let lat = phi1
        - (n1 * tan_phi1 / r1)
            * (d2 / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * E_PRIME2) * d4 / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * E_PRIME2
                    - 3.0 * c1 * c1)
                    * d6
                    / 720.0);

    let lon = central_meridian(zone)
        + (d - (1.0 + 2.0 * t1 + c1) * d2 * d / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * E_PRIME2 + 24.0 * t1 * t1)
                * d4
                * d
                / 120.0)
            / cos_phi1;

    (lon.to_degrees(), lat.to_degrees())
}

/// Meridional arc from equator to latitude `lat` (radians).
/// Snyder eq. 3-21.
fn meridional_arc(lat: f64) -> f64 {
    let e2 = E2;
    let e4 = e2 * e2;
    let e6 = e4 * e2;

    A * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * lat
        - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * lat).sin()
        + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * lat).sin()
        - (35.0 * e6 / 3072.0) * (6.0 * lat).sin())
}

fn wgs84_to_web_mercator(lon_deg: f64, lat_deg: f64) -> (f64, f64) {
    let x = A * lon_deg.to_radians();
    let y = A * (std::f64::consts::FRAC_PI_4 + lat_deg.to_radians() / 2.0).tan().ln();
    (x, y)
}

fn web_mercator_to_wgs84(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / A).to_degrees();
    let lat = (2.0 * (y / A).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();
    (lon, lat)
}
