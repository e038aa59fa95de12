use ndarray::Array1;

/// A sampled scalar signal on a monotonically increasing time base.
///
/// The time base may be irregularly spaced; samples and times are
/// index-aligned.
#[derive(Debug, Clone)]
pub struct TimeSeries {
    pub time: Array1<f64>,
    pub values: Array1<f64>,
}

impl TimeSeries {
    pub fn new(time: Array1<f64>, values: Array1<f64>) -> Self {
        Self { time, values }
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Samples falling strictly inside the open window `(t_start, t_end)`.
    pub fn window(&self, t_start: f64, t_end: f64) -> impl Iterator<Item = f64> + '_ {
        self.time
            .iter()
            .zip(self.values.iter())
            .filter(move |(&t, _)| t > t_start && t < t_end)
            .map(|(_, &v)| v)
    }

    /// Arithmetic mean over the open window; `None` when no sample falls inside.
    pub fn window_mean(&self, t_start: f64, t_end: f64) -> Option<f64> {
        let (n, sum) = self
            .window(t_start, t_end)
            .fold((0usize, 0f64), |(n, s), v| (n + 1, s + v));
        (n > 0).then(|| sum / n as f64)
    }

    /// Rescale the sample values by a constant factor, leaving the time base alone.
    pub fn scaled(mut self, factor: f64) -> Self {
        self.values *= factor;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn window_is_open_on_both_ends() {
        let ts = TimeSeries::new(array![0., 1., 2., 3., 4.], array![10., 20., 30., 40., 50.]);
        let inside: Vec<f64> = ts.window(1.0, 3.0).collect();
        assert_eq!(inside, vec![30.0]);
    }

    #[test]
    fn window_mean_of_empty_window_is_none() {
        let ts = TimeSeries::new(array![0., 1., 2.], array![1., 2., 3.]);
        assert!(ts.window_mean(0.4, 0.6).is_none());
        assert!(ts.window_mean(2.0, 1.0).is_none());
    }

    #[test]
    fn window_mean() {
        let ts = TimeSeries::new(array![0., 1., 2., 3.], array![1., 2., 4., 8.]);
        assert_relative_eq!(ts.window_mean(0.5, 3.5).unwrap(), (2. + 4. + 8.) / 3.);
    }

    #[test]
    fn scaled_leaves_time_base_alone() {
        let ts = TimeSeries::new(array![0., 1.], array![3., 5.]).scaled(1e-3);
        assert_relative_eq!(ts.values[1], 5e-3);
        assert_relative_eq!(ts.time[1], 1.0);
    }
}
