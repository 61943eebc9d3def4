//! Depth-limited CART regression tree.
//!
//! Splits minimise the summed squared error of the two children; thresholds
//! sit halfway between adjacent distinct feature values.

use super::{Predictor, Regressor};
use crate::error::AgentError;
use crate::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum TreeNode {
    Leaf {
        value: f64,
        samples: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

impl TreeNode {
    fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 0,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

/// Fitted tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    pub n_features: usize,
    pub root: TreeNode,
}

impl RegressionTree {
    pub fn depth(&self) -> usize {
        self.root.depth()
    }
}

impl Predictor for RegressionTree {
    fn predict(&self, row: &[f64]) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                TreeNode::Leaf { value, .. } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let x = row.get(*feature).copied().unwrap_or(f64::NAN);
                    node = if x <= *threshold { &**left } else { &**right };
                }
            }
        }
    }

    fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Regression tree learner.
#[derive(Debug, Clone)]
pub struct DecisionTreeRegressor {
    pub max_depth: usize,
    pub min_samples_split: usize,
}

impl DecisionTreeRegressor {
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            min_samples_split: 2,
        }
    }

    pub fn fit_tree(&self, features: &[Vec<f64>], target: &[f64]) -> Result<RegressionTree> {
        let n_features = validate(features, target)?;
        let indices: Vec<usize> = (0..target.len()).collect();
        let root = self.grow(features, target, indices, 0);

        Ok(RegressionTree { n_features, root })
    }

    fn grow(&self, x: &[Vec<f64>], y: &[f64], indices: Vec<usize>, depth: usize) -> TreeNode {
        let n = indices.len();
        let sum: f64 = indices.iter().map(|&i| y[i]).sum();
        let sum_sq: f64 = indices.iter().map(|&i| y[i] * y[i]).sum();
        let value = sum / n as f64;
        let impurity = sum_sq - sum * sum / n as f64;

        let leaf = TreeNode::Leaf { value, samples: n };

        if depth >= self.max_depth || n < self.min_samples_split || impurity <= 1e-12 {
            return leaf;
        }

        let Some((feature, threshold)) = best_split(x, y, &indices) else {
            return leaf;
        };

        let (left, right): (Vec<usize>, Vec<usize>) =
            indices.into_iter().partition(|&i| x[i][feature] <= threshold);

        TreeNode::Split {
            feature,
            threshold,
            left: Box::new(self.grow(x, y, left, depth + 1)),
            right: Box::new(self.grow(x, y, right, depth + 1)),
        }
    }
}

impl Regressor for DecisionTreeRegressor {
    fn kind(&self) -> &'static str {
        "decision_tree_regressor"
    }

    fn fit(&self, features: &[Vec<f64>], target: &[f64]) -> Result<Box<dyn Predictor>> {
        Ok(Box::new(self.fit_tree(features, target)?))
    }
}

/// Lowest-SSE split across all features, or `None` when every feature is constant.
fn best_split(x: &[Vec<f64>], y: &[f64], indices: &[usize]) -> Option<(usize, f64)> {
    let n = indices.len();
    let total_sum: f64 = indices.iter().map(|&i| y[i]).sum();
    let total_sq: f64 = indices.iter().map(|&i| y[i] * y[i]).sum();

    let mut best: Option<(f64, usize, f64)> = None;
    let mut order = indices.to_vec();

    for feature in 0..x[indices[0]].len() {
        order.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;

        for split in 1..n {
            let prev = order[split - 1];
            left_sum += y[prev];
            left_sq += y[prev] * y[prev];

            let lo = x[prev][feature];
            let hi = x[order[split]][feature];
            if lo >= hi {
                continue;
            }

            let left_n = split as f64;
            let right_n = (n - split) as f64;
            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;

            let sse = (left_sq - left_sum * left_sum / left_n)
                + (right_sq - right_sum * right_sum / right_n);

            if best.map_or(true, |(b, _, _)| sse < b) {
                let mid = lo + (hi - lo) / 2.0;
                // adjacent floats can round the midpoint up onto `hi`
                let threshold = if mid < hi { mid } else { lo };
                best = Some((sse, feature, threshold));
            }
        }
    }

    best.map(|(_, feature, threshold)| (feature, threshold))
}

fn validate(features: &[Vec<f64>], target: &[f64]) -> Result<usize> {
    if target.is_empty() {
        return Err(AgentError::Model("no training rows".to_string()));
    }
    if features.len() != target.len() {
        return Err(AgentError::Model(format!(
            "{} feature rows but {} targets",
            features.len(),
            target.len()
        )));
    }

    let width = features[0].len();
    if width == 0 {
        return Err(AgentError::Model("feature rows are empty".to_string()));
    }

    for (i, row) in features.iter().enumerate() {
        if row.len() != width {
            return Err(AgentError::Model(format!(
                "row {} has {} features, expected {}",
                i,
                row.len(),
                width
            )));
        }
        if row.iter().chain(std::iter::once(&target[i])).any(|v| !v.is_finite()) {
            return Err(AgentError::Model(format!("row {} contains a non-finite value", i)));
        }
    }

    Ok(width)
}
