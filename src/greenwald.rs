//! Greenwald fraction of a shot over a time window.

use crate::source::{PlasmaSource, Shot, SourceError};
use crate::timeseries::TimeSeries;

/// Default minor radius [m] of the reference machine.
pub const DEFAULT_MINOR_RADIUS: f64 = 0.22;

/// Plasma current scale from the collaborator convention to mega-amperes.
const CURRENT_TO_MA: f64 = 1e-3;
/// Line-averaged density scale from per cubic meter to 10^20 per cubic meter.
const DENSITY_TO_1E20: f64 = 1e-20;

#[derive(thiserror::Error, Debug)]
pub enum GreenwaldError {
    #[error("no samples inside the time window ({t_start}, {t_end})s")]
    EmptyWindow { t_start: f64, t_end: f64 },
    #[error(transparent)]
    Upstream(#[from] SourceError),
}

/// Ratio of the time-averaged line-averaged density to the Greenwald density
/// limit `|I_p| / (pi a^2)`.
///
/// Both series are averaged over samples strictly inside `(t_start, t_end)`;
/// an empty window in either series fails instead of yielding NaN.
pub fn greenwald_fraction<P: PlasmaSource>(
    plasma: &P,
    shot: Shot,
    t_start: f64,
    t_end: f64,
    minor_radius: f64,
) -> Result<f64, GreenwaldError> {
    if !(t_start < t_end) {
        return Err(GreenwaldError::EmptyWindow { t_start, t_end });
    }
    let current = plasma.plasma_current(shot)?.scaled(CURRENT_TO_MA);
    let density = plasma.line_averaged_density(shot)?;
    window_fraction(&current, &density, t_start, t_end, minor_radius)
}

fn window_fraction(
    current: &TimeSeries,
    density: &TimeSeries,
    t_start: f64,
    t_end: f64,
    minor_radius: f64,
) -> Result<f64, GreenwaldError> {
    let empty = || GreenwaldError::EmptyWindow { t_start, t_end };
    let mean_current = current.window_mean(t_start, t_end).ok_or_else(empty)?;
    let mean_density = density.window_mean(t_start, t_end).ok_or_else(empty)?;
    // Greenwald density limit in 10^20 m^-3, current in MA, radius in m.
    let greenwald_density = mean_current.abs() / (std::f64::consts::PI * minor_radius * minor_radius);
    Ok(mean_density * DENSITY_TO_1E20 / greenwald_density)
}
