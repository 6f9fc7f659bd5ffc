//! Shannon entropy of cluster label distributions

use serde::{Deserialize, Serialize};

/// Entropy of a label distribution with its bias-corrected variance
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EntropyEstimate {
    /// Shannon entropy in bits
    pub entropy: f64,
    /// Variance estimate of `entropy`
    pub variance: f64,
    /// Number of labels
    pub n_samples: usize,
    /// Number of non-empty classes
    pub n_classes: usize,
}

/// Shannon entropy `H = -Σ p log2 p` over the non-empty classes of `labels`.
///
/// The variance is `(Σ p (log2 p)² - Σ (p log2 p)²) / N - (K - 1) / (2 N²)`
/// with `K` the number of observed classes. With one sample or one class both are 0.
#[must_use]
pub fn shannon_entropy(labels: &[usize]) -> EntropyEstimate {
    let n = labels.len();
    let n_bins = labels.iter().max().map_or(0, |&m| m + 1);
    let mut counts = vec![0usize; n_bins];
    for &l in labels {
        counts[l] += 1;
    }
    let probs: Vec<f64> = counts.iter().filter(|&&c| c > 0).map(|&c| c as f64 / n as f64).collect();
    let n_classes = probs.len();

    if n <= 1 || n_classes <= 1 {
        return EntropyEstimate { entropy: 0.0, variance: 0.0, n_samples: n, n_classes };
    }

    let entropy = -probs.iter().map(|p| p * p.log2()).sum::<f64>();
    let second_moment: f64 = probs.iter().map(|p| p * p.log2() * p.log2()).sum();
    let squared_terms: f64 = probs.iter().map(|p| (p * p.log2()).powi(2)).sum();
    let nf = n as f64;
    let variance = (second_moment - squared_terms) / nf - (n_classes - 1) as f64 / (2.0 * nf * nf);

    EntropyEstimate { entropy, variance, n_samples: n, n_classes }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_class_is_zero() {
        let est = shannon_entropy(&[2, 2, 2, 2]);
        assert_eq!(est.entropy, 0.0);
        assert_eq!(est.variance, 0.0);
        assert_eq!(est.n_classes, 1);
        assert_eq!(est.n_samples, 4);
    }

    #[test]
    fn test_uniform_is_log2_k() {
        let labels: Vec<usize> = (0..12).map(|i| i % 4).collect();
        let est = shannon_entropy(&labels);
        assert!((est.entropy - 2.0).abs() < 1e-12);
        // Σ p (log2 p)² = 4, Σ (p log2 p)² = 1
        assert!((est.variance - (3.0 / 12.0 - 3.0 / 288.0)).abs() < 1e-12);
    }

    #[test]
    fn test_skewed_distribution() {
        let est = shannon_entropy(&[0, 0, 0, 1]);
        let expected = -(0.75_f64 * 0.75_f64.log2() + 0.25 * 0.25_f64.log2());
        assert!((est.entropy - expected).abs() < 1e-12);
        assert_eq!(est.n_classes, 2);
    }

    #[test]
    fn test_skewed_variance() {
        let est = shannon_entropy(&[0, 0, 0, 1]);
        let (a, b) = (0.75_f64, 0.25_f64);
        let second_moment = a * a.log2().powi(2) + b * b.log2().powi(2);
        let squared_terms = (a * a.log2()).powi(2) + (b * b.log2()).powi(2);
        let expected = (second_moment - squared_terms) / 4.0 - 1.0 / 32.0;
        assert!((est.variance - expected).abs() < 1e-12);
        assert!((est.variance - 0.164_324).abs() < 1e-5);
    }

    #[test]
    fn test_gaps_in_labels_are_ignored() {
        let est = shannon_entropy(&[0, 5, 0, 5]);
        assert_eq!(est.n_classes, 2);
        assert!((est.entropy - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert_eq!(shannon_entropy(&[]), EntropyEstimate::default());
        assert_eq!(shannon_entropy(&[7]).entropy, 0.0);
    }
}
