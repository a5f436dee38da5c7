//! Terrain Shape Index (TSI)
//!
//! TSI describes the local shape of the terrain around a plot from 8 sample
//! points placed at a fixed radius along the compass axes and diagonals:
//!
//!   z-hat = mean(z_cardinal - z_plot)   over cardinals with an elevation
//!   TSI   = z-hat / radius
//!
//! The sign of TSI follows z-hat. Plots or cardinals that cannot be sampled
//! are left without a value and reported, never fatal to the run.

mod cardinals;
mod index;
mod pipeline;
mod zhat;

pub use cardinals::{cardinal_offsets, generate_cardinals, Direction};
pub use index::{compute_tsi, terrain_shape_index};
pub use pipeline::{run_tsi, TsiRun};
pub use zhat::{compute_zhat, zhat_of};

use crate::report::RunSummary;
use crate::sampling::SampleMethod;
use terrashape_core::{Algorithm, Error, PointCollection, Raster, Result};

/// Elevation sampled from the surface (plots and cardinals)
pub const ELEVATION_FIELD: &str = "elev";
/// Mean cardinal elevation difference (plots)
pub const ZHAT_FIELD: &str = "zhat";
/// Terrain Shape Index (plots)
pub const TSI_FIELD: &str = "tsi";
/// Owning plot id (cardinals)
pub const PLOT_ID_FIELD: &str = "plot_id";
/// Compass label (cardinals)
pub const DIRECTION_FIELD: &str = "direction";

/// Reject radii that are not finite and strictly positive
pub fn validate_radius(radius: f64) -> Result<()> {
    if radius.is_finite() && radius > 0.0 {
        Ok(())
    } else {
        Err(Error::PreconditionViolation {
            name: "radius",
            value: radius.to_string(),
            reason: "must be finite and greater than zero".into(),
        })
    }
}

/// Parameters for a TSI run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TsiParams {
    /// Distance from the plot to each cardinal point, in CRS units
    pub radius: f64,
    /// How elevations are read from the surface
    pub method: SampleMethod,
}

impl Default for TsiParams {
    fn default() -> Self {
        Self {
            radius: 1.0,
            method: SampleMethod::Nearest,
        }
    }
}

impl TsiParams {
    pub fn new(radius: f64) -> Self {
        Self {
            radius,
            ..Default::default()
        }
    }

    pub fn with_method(mut self, method: SampleMethod) -> Self {
        self.method = method;
        self
    }
}

/// Result of [`Tsi::execute`]
#[derive(Debug, Clone)]
pub struct TsiOutput {
    /// Plots carrying `elev`, `zhat` and `tsi`
    pub plots: PointCollection,
    /// The generated cardinal layer with `elev`
    pub cardinals: PointCollection,
    pub summary: RunSummary,
}

/// TSI algorithm over an in-memory plot layer and raster surface
#[derive(Debug, Clone, Default)]
pub struct Tsi;

impl Algorithm for Tsi {
    type Input = (PointCollection, Raster);
    type Output = TsiOutput;
    type Params = TsiParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "TSI"
    }

    fn description(&self) -> &'static str {
        "Terrain Shape Index: mean elevation difference of 8 surrounding points divided by the radius"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        let (mut plots, surface) = input;
        let TsiRun { cardinals, summary } = run_tsi(&mut plots, &surface, &params)?;
        Ok(TsiOutput {
            plots,
            cardinals,
            summary,
        })
    }
}
