//! Sequential Minimal Optimization (SMO) for binary C-SVC
//!
//! Solves the dual
//!
//! ```text
//! min  1/2 a^T Q a - e^T a
//! s.t. y^T a = 0,  0 <= a_t <= C,  Q_st = y_s y_t K(x_s, x_t)
//! ```
//!
//! by repeatedly optimizing a pair of multipliers. The pair is picked by
//! maximal violation for the first variable and second-order gain for the
//! second (Fan, Chen and Lin, 2005). The gradient `G = Q a - e` is kept for
//! every variable, so a shrunk variable can be restored without recomputation.

use crate::cache::KernelCache;
use crate::core::{EncodedValue, Result, SVMError};
use crate::kernel::KernelFunction;
use crate::solver::shrinking::{ShrinkingStrategy, ViolationBounds};
use crate::solver::SvmParameter;
use log::{debug, warn};

/// Floor for the curvature of a non positive definite pair
const TAU: f64 = 1e-12;

/// Observations a variable must stay settled before it is shrunk
const SHRINKING_HISTORY: usize = 3;

/// Iterations between shrinking passes, capped by the problem size
const SHRINKING_INTERVAL: usize = 1000;

#[derive(Debug, Clone)]
pub struct SmoConfig {
    pub c: f64,
    /// Stop once the maximal violation drops below this
    pub eps: f64,
    pub max_iterations: usize,
    pub shrinking: bool,
    pub cache_bytes: usize,
}

impl SmoConfig {
    pub fn from_parameter(param: &SvmParameter) -> Self {
        Self {
            c: param.c,
            eps: param.eps,
            max_iterations: param.max_iterations,
            shrinking: param.shrinking,
            cache_bytes: param.cache_bytes(),
        }
    }
}

/// Optimal multipliers of one binary problem
///
/// The decision function is `f(x) = sum_t alpha_t y_t K(x_t, x) - rho`.
#[derive(Debug, Clone)]
pub struct BinarySolution {
    pub alpha: Vec<f64>,
    pub rho: f64,
    pub iterations: usize,
    /// Dual objective value
    pub objective: f64,
    /// False when the iteration limit stopped the optimizer first
    pub converged: bool,
}

impl BinarySolution {
    /// Indices of the support vectors (non-zero multipliers)
    pub fn support_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.alpha
            .iter()
            .enumerate()
            .filter(|(_, a)| **a > 0.0)
            .map(|(t, _)| t)
    }
}

/// Kernel matrix entries of one problem, evaluated lazily through the cache
struct Gram<'a> {
    kernel: &'a KernelFunction,
    values: &'a [&'a EncodedValue],
    cache: KernelCache,
}

impl Gram<'_> {
    fn at(&mut self, s: usize, t: usize) -> f64 {
        let kernel = self.kernel;
        let values = self.values;
        self.cache
            .get_or_compute(s, t, || kernel.compute(values[s], values[t]))
    }
}

pub struct SmoSolver<'k> {
    kernel: &'k KernelFunction,
    config: SmoConfig,
}

impl<'k> SmoSolver<'k> {
    pub fn new(kernel: &'k KernelFunction, config: SmoConfig) -> Self {
        Self { kernel, config }
    }

    /// Solve the binary problem over `values` with labels `y` in {+1, -1}
    pub fn solve(&self, values: &[&EncodedValue], y: &[f64]) -> Result<BinarySolution> {
        if values.is_empty() {
            return Err(SVMError::EmptyDataset);
        }
        if values.len() != y.len() {
            return Err(SVMError::InvalidDataset(format!(
                "Need equal number of values and labels, got {} values and {} labels",
                values.len(),
                y.len()
            )));
        }
        if let Some(&bad) = y.iter().find(|&&l| l != 1.0 && l != -1.0) {
            return Err(SVMError::OptimizationError(format!(
                "Binary labels must be +1 or -1, got: {}",
                bad
            )));
        }

        let n = values.len();
        let c = self.config.c;
        let mut gram = Gram {
            kernel: self.kernel,
            values,
            cache: KernelCache::for_problem(n, self.config.cache_bytes),
        };
        let diag: Vec<f64> = (0..n).map(|t| gram.at(t, t)).collect();

        let mut alpha = vec![0.0; n];
        let mut gradient = vec![-1.0; n];
        let mut active: Vec<usize> = (0..n).collect();
        let mut shrinking = self
            .config
            .shrinking
            .then(|| ShrinkingStrategy::new(n, SHRINKING_HISTORY));
        let interval = n.min(SHRINKING_INTERVAL);
        let mut counter = 0;
        let mut iterations = 0;
        let mut converged = false;

        loop {
            let (pair, bounds) =
                self.select_working_set(&active, &alpha, &gradient, y, &diag, &mut gram);

            let Some((i, j)) = pair else {
                if active.len() < n {
                    debug!(
                        "Active set of {} converged, re-checking all {} variables",
                        active.len(),
                        n
                    );
                    active = (0..n).collect();
                    if let Some(strategy) = shrinking.as_mut() {
                        strategy.reset_history();
                    }
                    counter = 0;
                    continue;
                }
                converged = true;
                break;
            };
            if iterations >= self.config.max_iterations {
                warn!(
                    "SMO stopped after {} iterations without converging",
                    iterations
                );
                break;
            }

            let (old_i, old_j) = (alpha[i], alpha[j]);
            let quad = (diag[i] + diag[j] - 2.0 * gram.at(i, j)).max(TAU);
            if y[i] != y[j] {
                let delta = (-gradient[i] - gradient[j]) / quad;
                let diff = alpha[i] - alpha[j];
                alpha[i] += delta;
                alpha[j] += delta;
                if diff > 0.0 {
                    if alpha[j] < 0.0 {
                        alpha[j] = 0.0;
                        alpha[i] = diff;
                    }
                } else if alpha[i] < 0.0 {
                    alpha[i] = 0.0;
                    alpha[j] = -diff;
                }
                if diff > 0.0 {
                    if alpha[i] > c {
                        alpha[i] = c;
                        alpha[j] = c - diff;
                    }
                } else if alpha[j] > c {
                    alpha[j] = c;
                    alpha[i] = c + diff;
                }
            } else {
                let delta = (gradient[i] - gradient[j]) / quad;
                let sum = alpha[i] + alpha[j];
                alpha[i] -= delta;
                alpha[j] += delta;
                if sum > c {
                    if alpha[i] > c {
                        alpha[i] = c;
                        alpha[j] = sum - c;
                    }
                    if alpha[j] > c {
                        alpha[j] = c;
                        alpha[i] = sum - c;
                    }
                } else {
                    if alpha[j] < 0.0 {
                        alpha[j] = 0.0;
                        alpha[i] = sum;
                    }
                    if alpha[i] < 0.0 {
                        alpha[i] = 0.0;
                        alpha[j] = sum;
                    }
                }
            }

            let delta_i = alpha[i] - old_i;
            let delta_j = alpha[j] - old_j;
            for t in 0..n {
                gradient[t] +=
                    y[t] * (y[i] * gram.at(i, t) * delta_i + y[j] * gram.at(j, t) * delta_j);
            }
            iterations += 1;

            if let Some(strategy) = shrinking.as_mut() {
                strategy.observe(&active, &alpha, &gradient, y, c, bounds);
                counter += 1;
                if counter >= interval && strategy.has_sufficient_history() {
                    let before = active.len();
                    active.retain(|&t| !strategy.is_shrinkable(t));
                    if active.len() < before {
                        debug!(
                            "Shrunk {} variables, {} remain active",
                            before - active.len(),
                            active.len()
                        );
                    }
                    counter = 0;
                }
            }
        }

        let rho = Self::compute_rho(&alpha, &gradient, y, c);
        let objective = alpha
            .iter()
            .zip(&gradient)
            .map(|(a, g)| a * (g - 1.0))
            .sum::<f64>()
            / 2.0;
        let stats = gram.cache.stats();
        debug!(
            "SMO finished: {} iterations, objective {:.6}, cache hits {} misses {}",
            iterations, objective, stats.hits, stats.misses
        );

        Ok(BinarySolution {
            alpha,
            rho,
            iterations,
            objective,
            converged,
        })
    }

    /// Pick the next pair among `active`, or `None` when the iterate is optimal
    fn select_working_set(
        &self,
        active: &[usize],
        alpha: &[f64],
        gradient: &[f64],
        y: &[f64],
        diag: &[f64],
        gram: &mut Gram<'_>,
    ) -> (Option<(usize, usize)>, ViolationBounds) {
        let c = self.config.c;

        let mut gmax = f64::NEG_INFINITY;
        let mut first = None;
        for &t in active {
            let can_move_up = if y[t] > 0.0 { alpha[t] < c } else { alpha[t] > 0.0 };
            if can_move_up && -y[t] * gradient[t] >= gmax {
                gmax = -y[t] * gradient[t];
                first = Some(t);
            }
        }

        let mut gmax_low = f64::NEG_INFINITY;
        let mut second = None;
        let mut best_gain = f64::INFINITY;
        if let Some(i) = first {
            for &t in active {
                let can_move_down = if y[t] > 0.0 { alpha[t] > 0.0 } else { alpha[t] < c };
                if !can_move_down {
                    continue;
                }
                let violation = y[t] * gradient[t];
                gmax_low = gmax_low.max(violation);
                let grad_diff = gmax + violation;
                if grad_diff > 0.0 {
                    let quad = (diag[i] + diag[t] - 2.0 * gram.at(i, t)).max(TAU);
                    let gain = -(grad_diff * grad_diff) / quad;
                    if gain <= best_gain {
                        best_gain = gain;
                        second = Some(t);
                    }
                }
            }
        }

        let bounds = ViolationBounds {
            up: gmax,
            low: gmax_low,
        };
        if gmax + gmax_low < self.config.eps {
            return (None, bounds);
        }
        (first.zip(second), bounds)
    }

    /// Offset of the decision function
    ///
    /// Averaged over free multipliers; without any, the midpoint of the
    /// feasible interval.
    fn compute_rho(alpha: &[f64], gradient: &[f64], y: &[f64], c: f64) -> f64 {
        let mut upper = f64::INFINITY;
        let mut lower = f64::NEG_INFINITY;
        let mut free_sum = 0.0;
        let mut free_count = 0usize;

        for t in 0..alpha.len() {
            let yg = y[t] * gradient[t];
            if alpha[t] >= c {
                if y[t] < 0.0 {
                    upper = upper.min(yg);
                } else {
                    lower = lower.max(yg);
                }
            } else if alpha[t] <= 0.0 {
                if y[t] > 0.0 {
                    upper = upper.min(yg);
                } else {
                    lower = lower.max(yg);
                }
            } else {
                free_sum += yg;
                free_count += 1;
            }
        }

        if free_count > 0 {
            free_sum / free_count as f64
        } else {
            match (upper.is_finite(), lower.is_finite()) {
                (true, true) => (upper + lower) / 2.0,
                (true, false) => upper,
                (false, true) => lower,
                (false, false) => 0.0,
            }
        }
    }
}
