// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use std::f64::consts::PI;

/// Equal-width histogram over the data range.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    /// `bins + 1` ascending edges
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl Histogram {
    pub fn bin_width(&self) -> f64 {
        match (self.edges.first(), self.edges.last()) {
            (Some(lo), Some(hi)) if !self.counts.is_empty() => (hi - lo) / self.counts.len() as f64,
            _ => 0.0,
        }
    }

    pub fn max_count(&self) -> usize {
        self.counts.iter().copied().max().unwrap_or(0)
    }
}

/// Bin `values` into `bins` equal-width bins spanning min..=max. The last
/// bin is closed on the right. A constant series is widened by 0.5 on each
/// side. Returns `None` when there are no finite values.
pub fn histogram(values: &[f64], bins: usize) -> Option<Histogram> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() || bins == 0 {
        return None;
    }

    let mut lo = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let mut hi = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }

    let width = (hi - lo) / bins as f64;
    let edges: Vec<f64> = (0..=bins).map(|i| lo + width * i as f64).collect();

    let mut counts = vec![0usize; bins];
    for v in finite {
        let idx = (((v - lo) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }

    Some(Histogram { edges, counts })
}

fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(var.sqrt())
}

/// Gaussian kernel density estimate with Scott's bandwidth, evaluated at
/// `points` evenly spaced over `range`.
///
/// `None` when the bandwidth is zero or undefined (fewer than two values,
/// or all values equal).
pub fn gaussian_kde(values: &[f64], range: (f64, f64), points: usize) -> Option<Vec<(f64, f64)>> {
    let std = sample_std(values)?;
    let bandwidth = std * (values.len() as f64).powf(-0.2);
    if bandwidth.is_nan() || bandwidth <= 0.0 || points < 2 {
        return None;
    }

    let norm = 1.0 / (values.len() as f64 * bandwidth * (2.0 * PI).sqrt());
    let step = (range.1 - range.0) / (points - 1) as f64;
    let curve = (0..points)
        .map(|i| {
            let x = range.0 + step * i as f64;
            let density: f64 = values
                .iter()
                .map(|v| (-0.5 * ((x - v) / bandwidth).powi(2)).exp())
                .sum::<f64>()
                * norm;
            (x, density)
        })
        .collect();
    Some(curve)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_histogram_counts_and_edges() {
        let h = histogram(&[0.0, 1.0, 2.0, 3.0, 4.0], 4).unwrap();
        assert_eq!(h.edges, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        // Max value falls in the last, closed bin
        assert_eq!(h.counts, vec![1, 1, 1, 2]);
        assert_relative_eq!(h.bin_width(), 1.0);
        assert_eq!(h.max_count(), 2);
    }

    #[test]
    fn test_histogram_twenty_bins_keeps_every_value() {
        let values: Vec<f64> = (0..57).map(|i| -40.0 + i as f64 * 1.7).collect();
        let h = histogram(&values, 20).unwrap();
        assert_eq!(h.counts.len(), 20);
        assert_eq!(h.edges.len(), 21);
        assert_eq!(h.counts.iter().sum::<usize>(), 57);
    }

    #[test]
    fn test_histogram_constant_and_empty() {
        let h = histogram(&[5.0, 5.0], 2).unwrap();
        assert_eq!(h.edges, vec![4.5, 5.0, 5.5]);
        assert_eq!(h.counts, vec![0, 2]);

        assert!(histogram(&[], 20).is_none());
        assert!(histogram(&[f64::NAN, f64::INFINITY], 20).is_none());
    }

    #[test]
    fn test_kde_integrates_to_about_one() {
        let values = [-10.0, -5.0, 0.0, 2.0, 3.0, 8.0, 20.0];
        let curve = gaussian_kde(&values, (-200.0, 200.0), 4001).unwrap();
        let step = curve[1].0 - curve[0].0;
        let area: f64 = curve.iter().map(|(_, d)| d * step).sum();
        assert_relative_eq!(area, 1.0, epsilon = 1e-3);
    }

    #[test]
    fn test_kde_needs_spread() {
        assert!(gaussian_kde(&[1.0], (0.0, 2.0), 10).is_none());
        assert!(gaussian_kde(&[1.0, 1.0, 1.0], (0.0, 2.0), 10).is_none());
    }
}
