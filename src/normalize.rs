//! Running-window normalization of camera frame stacks.
//!
//! Both operations slide a centered window of `2 * radius + 1` frames along
//! the time axis of every pixel, so the output stack is shorter by `radius`
//! frames on each end and its time base is trimmed to match.

use crate::source::FrameStack;
use ndarray::{s, Array3};

#[derive(thiserror::Error, Debug)]
pub enum NormalizeError {
    #[error("window radius must be at least 1")]
    ZeroRadius,
    #[error("{got} frames is too few for a running window of radius {radius}")]
    ShapeMismatch { radius: usize, got: usize },
}

fn check_window(stack: &FrameStack, radius: usize) -> Result<usize, NormalizeError> {
    if radius == 0 {
        return Err(NormalizeError::ZeroRadius);
    }
    let t_len = stack.len();
    if t_len <= 2 * radius {
        return Err(NormalizeError::ShapeMismatch {
            radius,
            got: t_len,
        });
    }
    Ok(t_len)
}

fn trimmed(stack: &FrameStack, radius: usize, t_len: usize, frames: Array3<f64>) -> FrameStack {
    FrameStack {
        time: stack.time.slice(s![radius..t_len - radius]).to_owned(),
        frames,
    }
}

/// Moving average of every pixel along the time axis.
pub fn running_mean(stack: &FrameStack, radius: usize) -> Result<FrameStack, NormalizeError> {
    let t_len = check_window(stack, radius)?;
    let (rows, cols) = stack.spatial_shape();
    let window = (2 * radius + 1) as f64;
    let mut out = Array3::zeros((t_len - 2 * radius, rows, cols));
    for y in 0..rows {
        for x in 0..cols {
            let mut sum: f64 = stack
                .frames
                .slice(s![..2 * radius + 1, y, x])
                .iter()
                .sum();
            out[(0, y, x)] = sum / window;
            for t in radius + 1..t_len - radius {
                sum += stack.frames[(t + radius, y, x)] - stack.frames[(t - radius - 1, y, x)];
                out[(t - radius, y, x)] = sum / window;
            }
        }
    }
    Ok(trimmed(stack, radius, t_len, out))
}

/// Moving standardization of every pixel along the time axis:
/// `(x - mean) / std` over the centered window.
///
/// A window with zero variance (a locally constant signal) produces NaN at
/// that sample, matching the undefined standardization of a flat window.
pub fn running_normalize(stack: &FrameStack, radius: usize) -> Result<FrameStack, NormalizeError> {
    let t_len = check_window(stack, radius)?;
    let (rows, cols) = stack.spatial_shape();
    let window = (2 * radius + 1) as f64;
    let mut out = Array3::zeros((t_len - 2 * radius, rows, cols));
    for y in 0..rows {
        for x in 0..cols {
            for t in radius..t_len - radius {
                let slice = stack.frames.slice(s![t - radius..=t + radius, y, x]);
                let mean = slice.sum() / window;
                let var = slice.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / window;
                out[(t - radius, y, x)] = (stack.frames[(t, y, x)] - mean) / var.sqrt();
            }
        }
    }
    Ok(trimmed(stack, radius, t_len, out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{s, Array1, Array3};
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn stack_of(frames: Array3<f64>) -> FrameStack {
        let t_len = frames.shape()[0];
        FrameStack {
            time: Array1::linspace(0.0, (t_len - 1) as f64, t_len),
            frames,
        }
    }

    #[test]
    fn constant_stack_keeps_its_value() {
        let stack = stack_of(Array3::from_elem((11, 2, 3), 7.5));
        let out = running_mean(&stack, 2).unwrap();
        assert_eq!(out.len(), 7);
        assert_eq!(out.time[0], 2.0);
        assert_eq!(out.time[6], 8.0);
        for v in out.frames.iter() {
            assert_relative_eq!(*v, 7.5);
        }
    }

    #[test]
    fn running_mean_matches_direct_average() {
        let mut rng = StdRng::seed_from_u64(7);
        let frames = Array3::from_shape_fn((25, 2, 2), |_| rng.gen_range(-1.0..1.0));
        let stack = stack_of(frames);
        let radius = 3;
        let out = running_mean(&stack, radius).unwrap();
        for t in 0..out.len() {
            let direct: f64 = stack
                .frames
                .slice(s![t..t + 2 * radius + 1, 1, 0])
                .iter()
                .sum::<f64>()
                / (2 * radius + 1) as f64;
            assert_relative_eq!(out.frames[(t, 1, 0)], direct, epsilon = 1e-12);
        }
    }

    #[test]
    fn linear_ramp_normalizes_to_zero() {
        // Each sample sits at the center of its own window, so the centered
        // mean equals the sample and the normalized value is exactly zero.
        let frames = Array3::from_shape_fn((9, 1, 2), |(t, _, x)| (t as f64) * (x as f64 + 1.0));
        let stack = stack_of(frames);
        let out = running_normalize(&stack, 2).unwrap();
        assert_eq!(out.len(), 5);
        for v in out.frames.iter() {
            assert_relative_eq!(*v, 0.0);
        }
    }

    #[test]
    fn normalized_window_has_unit_scale() {
        let frames = Array3::from_shape_fn((7, 1, 1), |(t, _, _)| if t % 2 == 0 { 1.0 } else { -1.0 });
        let stack = stack_of(frames);
        let out = running_normalize(&stack, 1).unwrap();
        // window [1,-1,1]: mean 1/3, var 8/9, x = -1 => (-4/3)/sqrt(8/9)
        let expected = (-4.0 / 3.0) / (8.0f64 / 9.0).sqrt();
        assert_relative_eq!(out.frames[(0, 0, 0)], expected, epsilon = 1e-12);
    }

    #[test]
    fn too_short_stack_is_rejected() {
        let stack = stack_of(Array3::zeros((4, 1, 1)));
        assert!(matches!(
            running_mean(&stack, 2),
            Err(NormalizeError::ShapeMismatch { radius: 2, got: 4 })
        ));
        assert!(matches!(
            running_normalize(&stack, 0),
            Err(NormalizeError::ZeroRadius)
        ));
    }
}
