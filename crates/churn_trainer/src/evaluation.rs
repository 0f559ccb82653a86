//! Holdout metrics

use churn_core::to_label;
use serde::Serialize;

/// Metrics of a scorer on rows it was not fit on
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub rows: usize,
    /// `None` when the holdout contains a single class
    pub roc_auc: Option<f64>,
    pub accuracy: f64,
}

impl Evaluation {
    pub fn compute(probabilities: &[f64], labels: &[u8]) -> Self {
        Self {
            rows: labels.len(),
            roc_auc: roc_auc(probabilities, labels),
            accuracy: accuracy(probabilities, labels),
        }
    }
}

/// Area under the ROC curve via the rank-sum statistic, ties averaged
pub fn roc_auc(probabilities: &[f64], labels: &[u8]) -> Option<f64> {
    let positives = labels.iter().filter(|&&label| label == 1).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..probabilities.len()).collect();
    order.sort_by(|&a, &b| probabilities[a].total_cmp(&probabilities[b]));

    let mut positive_rank_sum = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && probabilities[order[end]] == probabilities[order[start]] {
            end += 1;
        }
        // ranks are 1-based; a tie group shares its mean rank
        let mean_rank = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            if labels[idx] == 1 {
                positive_rank_sum += mean_rank;
            }
        }
        start = end;
    }

    let p = positives as f64;
    let n = negatives as f64;
    Some((positive_rank_sum - p * (p + 1.0) / 2.0) / (p * n))
}

pub fn accuracy(probabilities: &[f64], labels: &[u8]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    let correct = probabilities
        .iter()
        .zip(labels)
        .filter(|(&p, &label)| to_label(p) == label)
        .count();
    correct as f64 / labels.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_and_inverted_ranking() {
        let labels = [0, 0, 1, 1];
        assert_eq!(roc_auc(&[0.1, 0.2, 0.8, 0.9], &labels), Some(1.0));
        assert_eq!(roc_auc(&[0.9, 0.8, 0.2, 0.1], &labels), Some(0.0));
    }

    #[test]
    fn test_ties_count_half() {
        assert_eq!(roc_auc(&[0.5, 0.5], &[0, 1]), Some(0.5));
        let auc = roc_auc(&[0.1, 0.4, 0.35, 0.8], &[0, 0, 1, 1]).unwrap();
        assert!((auc - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_single_class_has_no_auc() {
        let eval = Evaluation::compute(&[0.2, 0.7], &[1, 1]);
        assert_eq!(eval.roc_auc, None);
        assert_eq!(eval.accuracy, 0.5);
    }
}
