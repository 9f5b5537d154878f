//! Weighted L2-regularized logistic regression
//!
//! Minimizes `C * Σ sᵢ · loss(yᵢ, w·xᵢ + b) + ½‖w‖²` with damped Newton steps
//! and Cholesky solves. The intercept is not penalized. The same solver backs
//! the per-target classifiers and both calibration families.

use crate::config::SolverConfig;
use crate::error::{Result, TrainerError};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const MAX_HALVINGS: usize = 40;
const ARMIJO: f64 = 1e-4;

/// Logistic link, stable for large |z|
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Log-odds of a probability strictly inside (0, 1)
pub fn logit(p: f64) -> f64 {
    (p / (1.0 - p)).ln()
}

/// ln(1 + e^z)
fn softplus(z: f64) -> f64 {
    if z > 0.0 {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}

/// Per-class sample weights
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassWeights {
    pub negative: f64,
    pub positive: f64,
}

impl ClassWeights {
    pub fn uniform() -> Self {
        Self { negative: 1.0, positive: 1.0 }
    }

    /// Inverse-frequency weights: `total / (num_classes * count_c)`.
    /// Absent classes get weight zero.
    pub fn balanced(labels: &[u8]) -> Self {
        let positives = labels.iter().filter(|&&y| y == 1).count();
        let negatives = labels.len() - positives;
        let num_classes = usize::from(positives > 0) + usize::from(negatives > 0);
        let weight = |count: usize| {
            if count == 0 {
                0.0
            } else {
                labels.len() as f64 / (num_classes * count) as f64
            }
        };
        Self {
            negative: weight(negatives),
            positive: weight(positives),
        }
    }

    pub fn for_label(&self, label: u8) -> f64 {
        if label == 1 {
            self.positive
        } else {
            self.negative
        }
    }
}

/// Fitted weights and bias
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub weights: Vec<f64>,
    pub bias: f64,
}

impl LinearModel {
    pub fn decision(&self, x: &[f64]) -> f64 {
        self.weights.iter().zip(x).map(|(w, v)| w * v).sum::<f64>() + self.bias
    }

    /// Raw probability of the positive class
    pub fn predict_proba(&self, x: &[f64]) -> f64 {
        sigmoid(self.decision(x))
    }

    pub fn predict_proba_batch(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.iter().map(|row| self.predict_proba(row)).collect()
    }
}

/// Result of a fit
#[derive(Debug, Clone)]
pub struct FitReport {
    pub model: LinearModel,
    pub iterations: usize,
    pub converged: bool,
}

/// Logistic regression solver
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    config: SolverConfig,
    class_weights: ClassWeights,
}

impl LogisticRegression {
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            class_weights: ClassWeights::uniform(),
        }
    }

    pub fn with_class_weights(mut self, class_weights: ClassWeights) -> Self {
        self.class_weights = class_weights;
        self
    }

    /// Fit on rows `x` with binary labels `y`
    pub fn fit(&self, x: &[Vec<f64>], y: &[u8]) -> Result<FitReport> {
        if x.is_empty() {
            return Err(TrainerError::InvalidInput("cannot fit on zero rows".to_string()));
        }
        if x.len() != y.len() {
            return Err(TrainerError::DimensionMismatch {
                expected: x.len(),
                actual: y.len(),
            });
        }
        let p = x[0].len();
        if let Some(row) = x.iter().find(|row| row.len() != p) {
            return Err(TrainerError::DimensionMismatch {
                expected: p,
                actual: row.len(),
            });
        }
        if self.config.c <= 0.0 {
            return Err(TrainerError::InvalidInput(format!(
                "regularization C must be positive, got {}",
                self.config.c
            )));
        }

        let sample_weights: Vec<f64> = y.iter().map(|&label| self.class_weights.for_label(label)).collect();
        let total_weight: f64 = sample_weights.iter().sum();
        if total_weight <= 0.0 {
            return Err(TrainerError::InvalidInput("total sample weight is zero".to_string()));
        }
        let problem = Problem {
            x,
            y,
            sample_weights: &sample_weights,
            c: self.config.c,
            p,
        };

        // theta = [w_0 .. w_{p-1}, b]
        let mut theta = vec![0.0; p + 1];
        let mut objective = problem.objective(&theta);
        let gradient_scale = self.config.c * total_weight;

        for iteration in 0..self.config.max_iter {
            let (grad, hess) = problem.derivatives(&theta);
            let grad_max = grad.iter().fold(0.0_f64, |m, g| m.max(g.abs())) / gradient_scale;
            if grad_max <= self.config.tol {
                debug!(iteration, grad_max, "logistic fit converged");
                return Ok(finish(theta, iteration, true));
            }

            let direction = newton_direction(hess, &grad)?;
            let slope: f64 = -grad.iter().zip(&direction).map(|(g, d)| g * d).sum::<f64>();

            let mut step = 1.0;
            let mut accepted = false;
            for _ in 0..MAX_HALVINGS {
                let candidate: Vec<f64> = theta.iter().zip(&direction).map(|(t, d)| t - step * d).collect();
                let candidate_objective = problem.objective(&candidate);
                if candidate_objective <= objective + ARMIJO * step * slope {
                    theta = candidate;
                    objective = candidate_objective;
                    accepted = true;
                    break;
                }
                step *= 0.5;
            }

            if !accepted {
                warn!(iteration, grad_max, "line search stalled before reaching tolerance");
                return Ok(finish(theta, iteration, false));
            }
        }

        warn!(
            max_iter = self.config.max_iter,
            "logistic fit did not converge within the iteration cap"
        );
        Ok(finish(theta, self.config.max_iter, false))
    }
}

fn finish(mut theta: Vec<f64>, iterations: usize, converged: bool) -> FitReport {
    let bias = theta.pop().unwrap_or(0.0);
    FitReport {
        model: LinearModel { weights: theta, bias },
        iterations,
        converged,
    }
}

struct Problem<'a> {
    x: &'a [Vec<f64>],
    y: &'a [u8],
    sample_weights: &'a [f64],
    c: f64,
    p: usize,
}

impl Problem<'_> {
    fn decision(&self, theta: &[f64], row: &[f64]) -> f64 {
        row.iter().zip(theta).map(|(v, w)| v * w).sum::<f64>() + theta[self.p]
    }

    fn objective(&self, theta: &[f64]) -> f64 {
        let loss: f64 = self
            .x
            .iter()
            .zip(self.y)
            .zip(self.sample_weights)
            .map(|((row, &label), &s)| {
                let z = self.decision(theta, row);
                s * (softplus(z) - f64::from(label) * z)
            })
            .sum();
        let penalty: f64 = theta[..self.p].iter().map(|w| w * w).sum();
        self.c * loss + 0.5 * penalty
    }

    fn derivatives(&self, theta: &[f64]) -> (Vec<f64>, Vec<Vec<f64>>) {
        let dim = self.p + 1;
        let mut grad = vec![0.0; dim];
        let mut hess = vec![vec![0.0; dim]; dim];

        for ((row, &label), &s) in self.x.iter().zip(self.y).zip(self.sample_weights) {
            let prob = sigmoid(self.decision(theta, row));
            let residual = self.c * s * (prob - f64::from(label));
            let curvature = self.c * s * prob * (1.0 - prob);

            for j in 0..self.p {
                grad[j] += residual * row[j];
                let hj = curvature * row[j];
                for k in 0..=j {
                    hess[j][k] += hj * row[k];
                }
                hess[self.p][j] += hj;
            }
            grad[self.p] += residual;
            hess[self.p][self.p] += curvature;
        }

        for j in 0..self.p {
            grad[j] += theta[j];
            hess[j][j] += 1.0;
        }
        // Mirror lower triangle
        for j in 0..dim {
            for k in (j + 1)..dim {
                hess[j][k] = hess[k][j];
            }
        }

        (grad, hess)
    }
}

/// Solve `H d = g`, adding diagonal jitter when `H` is numerically singular
fn newton_direction(hess: Vec<Vec<f64>>, grad: &[f64]) -> Result<Vec<f64>> {
    if let Ok(direction) = solve_spd(hess.clone(), grad) {
        return Ok(direction);
    }

    let max_diag = (0..hess.len()).map(|i| hess[i][i].abs()).fold(1.0_f64, f64::max);
    for jitter in [1e-10, 1e-8, 1e-6, 1e-4] {
        let mut damped = hess.clone();
        for (i, row) in damped.iter_mut().enumerate() {
            row[i] += jitter * max_diag;
        }
        if let Ok(direction) = solve_spd(damped, grad) {
            debug!(jitter, "Newton step needed diagonal jitter");
            return Ok(direction);
        }
    }
    Err(TrainerError::SingularMatrix)
}

/// Cholesky solve for a symmetric positive-definite matrix
fn solve_spd(mut a: Vec<Vec<f64>>, b: &[f64]) -> Result<Vec<f64>> {
    let n = b.len();

    for j in 0..n {
        let mut diag = a[j][j];
        for k in 0..j {
            diag -= a[j][k] * a[j][k];
        }
        if diag <= 0.0 || !diag.is_finite() {
            return Err(TrainerError::SingularMatrix);
        }
        let l_jj = diag.sqrt();
        a[j][j] = l_jj;
        for i in (j + 1)..n {
            let mut value = a[i][j];
            for k in 0..j {
                value -= a[i][k] * a[j][k];
            }
            a[i][j] = value / l_jj;
        }
    }

    // L z = b
    let mut z = vec![0.0; n];
    for i in 0..n {
        let mut value = b[i];
        for k in 0..i {
            value -= a[i][k] * z[k];
        }
        z[i] = value / a[i][i];
    }

    // Lᵀ x = z
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut value = z[i];
        for k in (i + 1)..n {
            value -= a[k][i] * x[k];
        }
        x[i] = value / a[i][i];
    }

    Ok(x)
}
