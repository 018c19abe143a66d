//! Two-pass altitude noise filter: centered median, then centered moving average.
//! Windows are truncated at the sequence boundaries, never padded or wrapped,
//! so both passes preserve length and leave a constant profile untouched.

/// Bounds of a centered window of `window` samples around `i`, clipped to `[0, len)`.
fn window_bounds(i: usize, window: usize, len: usize) -> (usize, usize) {
    let half = window / 2;
    let start = i.saturating_sub(half);
    let end = (i + half).min(len - 1);
    (start, end)
}

/// Centered median filter (spike removal). Even-length windows average the two middle values.
pub fn median_filter(elevations: &[f64], window: usize) -> Vec<f64> {
    let mut result = Vec::with_capacity(elevations.len());

    for i in 0..elevations.len() {
        let (start, end) = window_bounds(i, window, elevations.len());
        let mut window_data = elevations[start..=end].to_vec();
        window_data.sort_by(f64::total_cmp);

        let mid = window_data.len() / 2;
        let median = if window_data.len() % 2 == 0 {
            (window_data[mid - 1] + window_data[mid]) / 2.0
        } else {
            window_data[mid]
        };
        result.push(median);
    }

    result
}

/// Centered moving average.
pub fn moving_average(elevations: &[f64], window: usize) -> Vec<f64> {
    let mut result = Vec::with_capacity(elevations.len());

    for i in 0..elevations.len() {
        let (start, end) = window_bounds(i, window, elevations.len());
        let samples = &elevations[start..=end];
        // offsets from the first sample keep a flat window bit-exact
        let base = samples[0];
        let offset: f64 = samples.iter().map(|e| e - base).sum();
        result.push(base + offset / samples.len() as f64);
    }

    result
}

/// Median filter followed by moving average.
pub fn smooth_profile(elevations: &[f64], median_window: usize, average_window: usize) -> Vec<f64> {
    let despiked = median_filter(elevations, median_window);
    moving_average(&despiked, average_window)
}
