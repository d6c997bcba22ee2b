/// Display intervals for cutout normalization
///
/// The ZScale interval fits a line to a sorted sample of the image and keeps
/// the range around the median that the line's slope (divided by the contrast)
/// spans. It ignores bright sources and hot pixels, which is what survey
/// thumbnails need.
use ndarray::ArrayView2;

use super::RenderError;

/// Lower and upper data values mapped to black and white.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub vmin: f64,
    pub vmax: f64,
}

impl Interval {
    /// Map `value` into `[0, 1]`, clipping outside the interval.
    pub fn normalize(&self, value: f64) -> f64 {
        let span = self.vmax - self.vmin;
        if span <= 0.0 {
            return 0.0;
        }
        ((value - self.vmin) / span).clamp(0.0, 1.0)
    }
}

/// ZScale parameters (IRAF defaults).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZScale {
    pub n_samples: usize,
    pub contrast: f64,
    /// Maximum fraction of samples that may be rejected.
    pub max_reject: f64,
    pub min_npixels: usize,
    /// Rejection threshold in units of the residual standard deviation.
    pub krej: f64,
    pub max_iterations: usize,
}

impl Default for ZScale {
    fn default() -> Self {
        Self {
            n_samples: 1000,
            contrast: 0.25,
            max_reject: 0.5,
            min_npixels: 5,
            krej: 2.5,
            max_iterations: 5,
        }
    }
}

impl ZScale {
    /// Compute the interval over the finite pixels of `data`.
    pub fn limits(&self, data: ArrayView2<f64>) -> Result<Interval, RenderError> {
        let values: Vec<f64> = data.iter().copied().filter(|v| v.is_finite()).collect();
        if values.is_empty() {
            return Err(RenderError::NoFiniteData);
        }

        let stride = ((values.len() as f64 / self.n_samples as f64) as usize).max(1);
        let mut samples: Vec<f64> = values
            .iter()
            .step_by(stride)
            .take(self.n_samples)
            .copied()
            .collect();
        samples.sort_by(f64::total_cmp);

        let npix = samples.len();
        let mut vmin = samples[0];
        let mut vmax = samples[npix - 1];

        let min_pix = self.min_npixels.max((npix as f64 * self.max_reject) as usize);
        let ngrow = ((npix as f64 * 0.01) as usize).max(1);

        let mut bad = vec![false; npix];
        let mut good_count = npix;
        let mut last_good_count = npix + 1;
        let mut slope = 0.0;

        for _ in 0..self.max_iterations {
            if good_count >= last_good_count || good_count < min_pix {
                break;
            }

            let (fit_slope, intercept) = fit_line(&samples, &bad);
            slope = fit_slope;

            let residuals: Vec<f64> = samples
                .iter()
                .enumerate()
                .map(|(i, &s)| s - (intercept + slope * i as f64))
                .collect();
            let threshold = self.krej * std_dev(&residuals, &bad);

            for (flag, &r) in bad.iter_mut().zip(&residuals) {
                if r < -threshold || r > threshold {
                    *flag = true;
                }
            }
            bad = grow_mask(&bad, ngrow);

            last_good_count = good_count;
            good_count = bad.iter().filter(|b| !**b).count();
        }

        if good_count >= min_pix {
            if self.contrast > 0.0 {
                slope /= self.contrast;
            }
            let center = (npix - 1) / 2;
            let median = median_of_sorted(&samples);
            vmin = vmin.max(median - (center as f64 - 1.0) * slope);
            vmax = vmax.min(median + (npix - center) as f64 * slope);
        }

        if !(vmin.is_finite() && vmax.is_finite()) || vmax <= vmin {
            return Err(RenderError::DegenerateInterval { vmin, vmax });
        }
        Ok(Interval { vmin, vmax })
    }
}

/// Plain min/max over the finite pixels, used when ZScale gives up.
///
/// Never fails: with no finite data the interval is `[0, 0]` and everything
/// normalizes to zero.
pub fn min_max(data: ArrayView2<f64>) -> Interval {
    let (vmin, vmax) = data
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if vmin.is_finite() {
        Interval { vmin, vmax }
    } else {
        Interval {
            vmin: 0.0,
            vmax: 0.0,
        }
    }
}

/// Least-squares line through the unmasked samples, indexed by position.
fn fit_line(samples: &[f64], bad: &[bool]) -> (f64, f64) {
    let (mut n, mut sx, mut sy) = (0.0, 0.0, 0.0);
    for (i, (&s, &b)) in samples.iter().zip(bad).enumerate() {
        if !b {
            n += 1.0;
            sx += i as f64;
            sy += s;
        }
    }
    if n == 0.0 {
        return (0.0, 0.0);
    }
    let (mx, my) = (sx / n, sy / n);

    let (mut sxx, mut sxy) = (0.0, 0.0);
    for (i, (&s, &b)) in samples.iter().zip(bad).enumerate() {
        if !b {
            let dx = i as f64 - mx;
            sxx += dx * dx;
            sxy += dx * (s - my);
        }
    }
    let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
    (slope, my - slope * mx)
}

/// Population standard deviation of the unmasked values.
fn std_dev(values: &[f64], bad: &[bool]) -> f64 {
    let good: Vec<f64> = values
        .iter()
        .zip(bad)
        .filter(|(_, b)| !**b)
        .map(|(v, _)| *v)
        .collect();
    if good.is_empty() {
        return 0.0;
    }
    let mean = good.iter().sum::<f64>() / good.len() as f64;
    let var = good.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / good.len() as f64;
    var.sqrt()
}

/// Dilate the rejection mask with a box of `width` samples, centred the way a
/// same-length convolution centres an even kernel.
fn grow_mask(bad: &[bool], width: usize) -> Vec<bool> {
    let n = bad.len() as isize;
    let before = (width / 2) as isize;
    let after = ((width - 1) / 2) as isize;
    (0..n)
        .map(|i| {
            let lo = (i - before).max(0);
            let hi = (i + after).min(n - 1);
            (lo..=hi).any(|j| bad[j as usize])
        })
        .collect()
}

fn median_of_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        0.5 * (sorted[n / 2 - 1] + sorted[n / 2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array2;

    #[test]
    fn test_linear_ramp_keeps_full_range() {
        // A perfect ramp fits exactly; slope/contrast overshoots the ends so
        // the sample extremes win.
        let data = Array2::from_shape_fn((10, 10), |(y, x)| (y * 10 + x) as f64);
        let interval = ZScale::default().limits(data.view()).unwrap();
        assert_relative_eq!(interval.vmin, 0.0);
        assert_relative_eq!(interval.vmax, 99.0);
    }

    #[test]
    fn test_outliers_are_clipped() {
        // Flat sky with a little structure and one very bright source
        let mut data = Array2::from_shape_fn((40, 40), |(y, x)| ((x * 7 + y * 13) % 10) as f64);
        data[[20, 20]] = 1.0e6;
        data[[20, 21]] = 5.0e5;
        let interval = ZScale::default().limits(data.view()).unwrap();
        assert!(interval.vmax < 1000.0, "vmax = {}", interval.vmax);
        assert!(interval.vmin >= 0.0);
    }

    #[test]
    fn test_nan_pixels_ignored() {
        let mut data = Array2::from_shape_fn((10, 10), |(y, x)| (y * 10 + x) as f64);
        data[[0, 0]] = f64::NAN;
        data[[9, 9]] = f64::NAN;
        let interval = ZScale::default().limits(data.view()).unwrap();
        assert_relative_eq!(interval.vmin, 1.0);
        assert_relative_eq!(interval.vmax, 98.0);
    }

    #[test]
    fn test_failures() {
        let empty = Array2::<f64>::from_elem((4, 4), f64::NAN);
        assert!(matches!(
            ZScale::default().limits(empty.view()),
            Err(RenderError::NoFiniteData)
        ));

        let flat = Array2::<f64>::from_elem((4, 4), 3.0);
        assert!(matches!(
            ZScale::default().limits(flat.view()),
            Err(RenderError::DegenerateInterval { .. })
        ));
    }

    #[test]
    fn test_min_max_fallback() {
        let mut data = Array2::from_shape_fn((3, 3), |(y, x)| (y * 3 + x) as f64 - 2.0);
        data[[1, 1]] = f64::INFINITY;
        let interval = min_max(data.view());
        assert_eq!(interval, Interval { vmin: -2.0, vmax: 6.0 });
        assert_relative_eq!(interval.normalize(2.0), 0.5);
        assert_relative_eq!(interval.normalize(100.0), 1.0);

        let blank = min_max(Array2::<f64>::zeros((0, 0)).view());
        assert_eq!(blank.normalize(5.0), 0.0);
    }

    #[test]
    fn test_grow_mask_matches_same_convolution() {
        let mask = [false, false, true, false, false];
        assert_eq!(grow_mask(&mask, 1), mask.to_vec());
        assert_eq!(grow_mask(&mask, 2), vec![false, false, true, true, false]);
        assert_eq!(grow_mask(&mask, 3), vec![false, true, true, true, false]);
    }
}
