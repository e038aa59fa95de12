//! Velocity-field overlay plot.
//!
//! Renders the per-pixel velocity estimates as arrows colored by their
//! confidence, on top of the camera pixel layout, the dead-pixel markers,
//! the limiter contour and the time-averaged LCFS envelope.

use crate::camera::{CameraError, PixelGrid};
use crate::dead_pixels::DeadPixelMap;
use crate::lcfs::LcfsEnvelope;
use ndarray::Array2;
use plotters::prelude::*;

/// Arrow length in data units (cm) per unit of velocity (m/s).
const ARROW_SCALE: f64 = 1.0 / 210_000.0;
/// Margin around the pixel grid [cm].
const VIEW_MARGIN: f64 = 0.5;

const MIDNIGHT_BLUE: RGBColor = RGBColor(25, 25, 112);
const LIGHT_STEEL_BLUE: RGBColor = RGBColor(176, 196, 222);

/// Per-pixel velocity estimates on the camera pixel grid.
#[derive(Debug, Clone)]
pub struct VelocityField {
    pub grid: PixelGrid,
    /// Radial velocity [m/s].
    pub vx: Array2<f64>,
    /// Poloidal velocity [m/s].
    pub vy: Array2<f64>,
    /// Estimation confidence, normalized into [0, 1] for the colormap.
    pub confidence: Array2<f64>,
}

impl VelocityField {
    pub fn new(
        grid: PixelGrid,
        vx: Array2<f64>,
        vy: Array2<f64>,
        confidence: Array2<f64>,
    ) -> Result<Self, CameraError> {
        for field in [&vx, &vy, &confidence] {
            if field.dim() != grid.shape() {
                return Err(CameraError::ShapeMismatch {
                    r: grid.shape(),
                    z: field.dim(),
                });
            }
        }
        Ok(Self {
            grid,
            vx,
            vy,
            confidence,
        })
    }
}

fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

/// Plot the velocity field with the boundary geometry overlay to an SVG file.
pub fn plot_velocity_field(
    filename: &str,
    field: &VelocityField,
    dead: &DeadPixelMap,
    envelope: &LcfsEnvelope,
    title: Option<&str>,
) {
    let (x_min, x_max) = bounds(field.grid.r.iter().copied());
    let (y_min, y_max) = bounds(field.grid.z.iter().copied());

    let root = SVGBackend::new(filename, (768, 768)).into_drawing_area();
    root.fill(&WHITE).unwrap();

    let default_title = format!("Shot {}", dead.shot());
    let mut chart = ChartBuilder::on(&root)
        .caption(title.unwrap_or(&default_title), ("sans-serif", 20))
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .margin(10)
        .build_cartesian_2d(
            x_min - VIEW_MARGIN..x_max + VIEW_MARGIN,
            y_min - VIEW_MARGIN..y_max + VIEW_MARGIN,
        )
        .unwrap();
    chart
        .configure_mesh()
        .x_desc("R / cm")
        .y_desc("Z / cm")
        .draw()
        .unwrap();

    // Envelope band between the minimum and maximum LCFS excursions.
    let band: Vec<(f64, f64)> = envelope
        .r_min
        .iter()
        .zip(envelope.z_lcfs.iter())
        .map(|(&r, &z)| (r, z))
        .chain(
            envelope
                .r_max
                .iter()
                .zip(envelope.z_lcfs.iter())
                .rev()
                .map(|(&r, &z)| (r, z)),
        )
        .collect();
    chart
        .draw_series(std::iter::once(Polygon::new(
            band,
            LIGHT_STEEL_BLUE.mix(0.2).filled(),
        )))
        .unwrap();

    chart
        .draw_series(LineSeries::new(
            envelope
                .r_mean
                .iter()
                .zip(envelope.z_lcfs.iter())
                .map(|(&r, &z)| (r, z)),
            &BLACK,
        ))
        .unwrap()
        .label("LCFS (mean)")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLACK));
    chart
        .draw_series(LineSeries::new(
            envelope
                .r_limiter
                .iter()
                .zip(envelope.z_limiter.iter())
                .map(|(&r, &z)| (r, z)),
            &BLACK,
        ))
        .unwrap();

    // Alive pixels as dots, dead pixels as crosses.
    let pixel = |i: usize, j: usize| (field.grid.r[(i, j)], field.grid.z[(i, j)]);
    let (rows, cols) = field.grid.shape();
    let indices = || (0..rows).flat_map(move |i| (0..cols).map(move |j| (i, j)));
    chart
        .draw_series(
            indices()
                .filter(|&(i, j)| !dead[(i, j)])
                .map(|(i, j)| Circle::new(pixel(i, j), 1, MIDNIGHT_BLUE.filled())),
        )
        .unwrap();
    chart
        .draw_series(
            indices()
                .filter(|&(i, j)| dead[(i, j)])
                .map(|(i, j)| Cross::new(pixel(i, j), 3, MIDNIGHT_BLUE.stroke_width(1))),
        )
        .unwrap();

    // Velocity arrows colored by confidence.
    chart
        .draw_series(indices().map(|(i, j)| {
            let (r, z) = pixel(i, j);
            let tip = (
                r + field.vx[(i, j)] * ARROW_SCALE,
                z + field.vy[(i, j)] * ARROW_SCALE,
            );
            let c = colorous::VIRIDIS.eval_continuous(field.confidence[(i, j)].clamp(0.0, 1.0));
            PathElement::new(vec![(r, z), tip], RGBColor(c.r, c.g, c.b).stroke_width(1))
        }))
        .unwrap();

    chart
        .configure_series_labels()
        .border_style(&BLACK)
        .background_style(&WHITE.mix(0.8))
        .position(SeriesLabelPosition::UpperRight)
        .draw()
        .unwrap();
}
