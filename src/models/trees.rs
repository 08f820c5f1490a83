use serde::Deserialize;

use super::{check_len, Regressor};
use crate::errors::ModelError;

/// A node of a regression tree stored in a flat array.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeNode {
    /// Internal node; samples with `features[feature] < threshold` go left.
    Split {
        /// Index of the feature tested at this node.
        feature: usize,
        /// Split threshold.
        threshold: f64,
        /// Index of the left child.
        left: usize,
        /// Index of the right child.
        right: usize,
    },
    /// Terminal node contributing `value` to the ensemble sum.
    Leaf {
        /// Leaf output.
        value: f64,
    },
}

/// A single regression tree, rooted at node zero.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Tree {
    /// Nodes in topological order; children always follow their parent.
    pub nodes: Vec<TreeNode>,
}

impl Tree {
    fn validate(&self, index: usize, input_len: usize) -> Result<(), ModelError> {
        if self.nodes.is_empty() {
            return Err(ModelError::InvalidModel(format!("tree {index} is empty")));
        }
        for (position, node) in self.nodes.iter().enumerate() {
            if let TreeNode::Split {
                feature,
                left,
                right,
                ..
            } = *node
            {
                if feature >= input_len {
                    return Err(ModelError::InvalidModel(format!(
                        "tree {index} node {position} splits on feature {feature} of {input_len}"
                    )));
                }
                for child in [left, right] {
                    if child <= position || child >= self.nodes.len() {
                        return Err(ModelError::InvalidModel(format!(
                            "tree {index} node {position} has invalid child {child}"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn leaf_value(&self, features: &[f64]) -> f64 {
        let mut position = 0;
        loop {
            match self.nodes[position] {
                TreeNode::Leaf { value } => return value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    position = if features[feature] < threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

/// Gradient-boosted ensemble of regression trees.
///
/// The prediction is `base_score` plus the sum of one leaf value per tree.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(try_from = "RawEnsemble")]
pub struct TreeEnsemble {
    /// Number of input features.
    input_len: usize,
    /// Constant offset added to every prediction.
    base_score: f64,
    /// Boosted trees.
    trees: Vec<Tree>,
}

#[derive(Deserialize)]
struct RawEnsemble {
    input_len: usize,
    #[serde(default)]
    base_score: f64,
    trees: Vec<Tree>,
}

impl TryFrom<RawEnsemble> for TreeEnsemble {
    type Error = ModelError;

    fn try_from(raw: RawEnsemble) -> Result<Self, Self::Error> {
        TreeEnsemble::new(raw.input_len, raw.base_score, raw.trees)
    }
}

impl TreeEnsemble {
    /// Assemble an ensemble, validating every tree.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidModel`] when a tree is empty, splits on a
    /// feature outside `input_len`, or links to a child that does not follow it.
    pub fn new(input_len: usize, base_score: f64, trees: Vec<Tree>) -> Result<Self, ModelError> {
        if input_len == 0 {
            return Err(ModelError::InvalidModel(
                "ensemble must take at least one feature".to_string(),
            ));
        }
        for (index, tree) in trees.iter().enumerate() {
            tree.validate(index, input_len)?;
        }
        Ok(Self {
            input_len,
            base_score,
            trees,
        })
    }

    /// Number of boosted trees.
    #[must_use]
    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }
}

impl Regressor for TreeEnsemble {
    fn predict(&self, features: &[f64]) -> Result<f64, ModelError> {
        check_len(self.input_len, features)?;
        Ok(self.base_score
            + self
                .trees
                .iter()
                .map(|tree| tree.leaf_value(features))
                .sum::<f64>())
    }

    fn input_len(&self) -> usize {
        self.input_len
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn stump(feature: usize, threshold: f64, left: f64, right: f64) -> Tree {
        Tree {
            nodes: vec![
                TreeNode::Split {
                    feature,
                    threshold,
                    left: 1,
                    right: 2,
                },
                TreeNode::Leaf { value: left },
                TreeNode::Leaf { value: right },
            ],
        }
    }

    #[test]
    fn sums_leaves_over_base_score() {
        let ensemble = TreeEnsemble::new(
            4,
            0.5,
            vec![stump(0, 45.0, -1.0, 1.0), stump(2, 0.5, 2.0, 4.0)],
        )
        .expect("valid trees");
        assert_eq!(ensemble.tree_count(), 2);
        assert_relative_eq!(
            ensemble.predict(&[30.0, 0.0, 0.7, 0.0]).expect("four inputs"),
            0.5 - 1.0 + 4.0
        );
        // Equality goes right.
        assert_relative_eq!(
            ensemble.predict(&[45.0, 0.0, 0.2, 0.0]).expect("four inputs"),
            0.5 + 1.0 + 2.0
        );
    }

    #[test]
    fn rejects_out_of_range_features() {
        let error = TreeEnsemble::new(2, 0.0, vec![stump(3, 0.0, 0.0, 0.0)])
            .expect_err("feature 3 of 2");
        assert!(matches!(error, ModelError::InvalidModel(_)));
    }

    #[test]
    fn rejects_backward_links() {
        let tree = Tree {
            nodes: vec![
                TreeNode::Leaf { value: 0.0 },
                TreeNode::Split {
                    feature: 0,
                    threshold: 0.0,
                    left: 0,
                    right: 0,
                },
            ],
        };
        assert!(TreeEnsemble::new(1, 0.0, vec![tree]).is_err());
    }

    #[test]
    fn loads_from_json() {
        let ensemble: TreeEnsemble = serde_json::from_str(
            r#"{
                "input_len": 1,
                "trees": [{"nodes": [
                    {"split": {"feature": 0, "threshold": 1.0, "left": 1, "right": 2}},
                    {"leaf": {"value": -3.0}},
                    {"leaf": {"value": 3.0}}
                ]}]
            }"#,
        )
        .expect("valid ensemble");
        assert_relative_eq!(ensemble.predict(&[0.0]).expect("one input"), -3.0);
    }
}
