//! Bagged ensemble of shallow decision trees for binary direction
//! classification.
//!
//! Each member tree is fit on a seeded bootstrap sample of the training
//! rows; the ensemble probability is the mean class-1 probability across
//! members. Training data that carries a single label class cannot grow a
//! tree, so such a sample contributes a constant vote instead; a fully
//! single-class training set collapses the whole forest to one constant
//! learner that predicts that class with certainty.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::arrays::Array;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::tree::decision_tree_classifier::{
    DecisionTreeClassifier, DecisionTreeClassifierParameters,
};

type Tree = DecisionTreeClassifier<f64, u32, DenseMatrix<f64>, Vec<u32>>;

#[derive(Serialize, Deserialize)]
enum Learner {
    Constant(u32),
    Tree(Tree),
}

/// A fixed-size forest with a deterministic seed: the same rows, seed, and
/// shape always produce the same votes.
#[derive(Serialize, Deserialize)]
pub struct Forest {
    learners: Vec<Learner>,
}

impl Forest {
    pub fn fit(
        x: &Vec<Vec<f64>>,
        y: &[u32],
        n_trees: u16,
        max_depth: u16,
        seed: u64,
    ) -> Result<Self, String> {
        if x.is_empty() || x.len() != y.len() {
            return Err(format!(
                "invalid training data: {} feature rows, {} labels",
                x.len(),
                y.len()
            ));
        }

        // Single-class data: nothing to split on, the forest is a constant.
        let first = y[0];
        if y.iter().all(|&label| label == first) {
            return Ok(Self {
                learners: vec![Learner::Constant(first)],
            });
        }

        let n = x.len();
        let mut learners = Vec::with_capacity(usize::from(n_trees));
        for t in 0..u64::from(n_trees) {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(t));
            let indices: Vec<usize> = (0..n).map(|_| rng.random_range(0..n)).collect();
            let sample_y: Vec<u32> = indices.iter().map(|&i| y[i]).collect();

            // A bootstrap draw can still miss one class entirely.
            let sample_first = sample_y[0];
            if sample_y.iter().all(|&label| label == sample_first) {
                learners.push(Learner::Constant(sample_first));
                continue;
            }

            let sample_x: Vec<Vec<f64>> = indices.iter().map(|&i| x[i].clone()).collect();
            let matrix = DenseMatrix::from_2d_vec(&sample_x)
                .map_err(|e| format!("bootstrap matrix: {e}"))?;
            let params = DecisionTreeClassifierParameters::default().with_max_depth(max_depth);
            let tree = Tree::fit(&matrix, &sample_y, params)
                .map_err(|e| format!("tree fit: {e}"))?;
            learners.push(Learner::Tree(tree));
        }

        Ok(Self { learners })
    }

    pub fn len(&self) -> usize {
        self.learners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.learners.is_empty()
    }

    /// Mean class-1 probability per row, in `[0, 1]`.
    pub fn predict_proba(&self, rows: &Vec<Vec<f64>>) -> Result<Vec<f64>, String> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let matrix =
            DenseMatrix::from_2d_vec(rows).map_err(|e| format!("input matrix: {e}"))?;

        let mut sums = vec![0.0; rows.len()];
        for learner in &self.learners {
            match learner {
                Learner::Constant(label) => {
                    for sum in sums.iter_mut() {
                        *sum += f64::from(*label);
                    }
                }
                Learner::Tree(tree) => {
                    let proba = tree
                        .predict_proba(&matrix)
                        .map_err(|e| format!("tree scoring: {e}"))?;
                    // Trees are only grown on two-class samples, so the
                    // probability matrix has a column per class, class 1 last.
                    if proba.shape().1 < 2 {
                        return Err(format!(
                            "unexpected class count {} in tree output",
                            proba.shape().1
                        ));
                    }
                    for (i, sum) in sums.iter_mut().enumerate() {
                        *sum += *proba.get((i, 1));
                    }
                }
            }
        }

        let members = self.learners.len() as f64;
        Ok(sums.into_iter().map(|sum| sum / members).collect())
    }

    /// Hard 0/1 decision per row: the averaged probability against 0.5.
    pub fn predict(&self, rows: &Vec<Vec<f64>>) -> Result<Vec<u32>, String> {
        Ok(self
            .predict_proba(rows)?
            .into_iter()
            .map(|p| u32::from(p > 0.5))
            .collect())
    }
}
