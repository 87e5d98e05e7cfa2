//! Shrinking heuristic
//!
//! Follows the idea of Section 4 of "Making Large-Scale SVM Learning
//! Practical" (Joachims): a variable that sits at a bound and whose gradient
//! keeps pushing it against that bound for `h` consecutive observations is
//! unlikely to move again, so it is taken out of the working-set search.
//!
//! Shrunk variables keep their gradient up to date; the solver only narrows
//! the set it searches. Once the active set has converged the solver restores
//! every variable and re-checks optimality on the full problem.

use std::collections::VecDeque;

#[derive(Debug)]
pub struct ShrinkingStrategy {
    /// Whether each variable looked settled at a bound, most recent last
    settled_history: Vec<VecDeque<bool>>,
    /// h in the paper
    history_size: usize,
    observations: usize,
}

/// Extreme violations of the current iterate
///
/// `up` is the largest `-y_t G_t` over variables that may increase along
/// `y`, `low` the largest `y_t G_t` over variables that may decrease.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViolationBounds {
    pub up: f64,
    pub low: f64,
}

impl ShrinkingStrategy {
    pub fn new(n_variables: usize, history_size: usize) -> Self {
        let history_size = history_size.max(1);
        Self {
            settled_history: vec![VecDeque::with_capacity(history_size); n_variables],
            history_size,
            observations: 0,
        }
    }

    /// Whether variable `t` cannot improve the objective from where it is
    pub fn is_settled(alpha: f64, gradient: f64, y: f64, c: f64, bounds: ViolationBounds) -> bool {
        if alpha >= c {
            if y > 0.0 {
                -gradient > bounds.up
            } else {
                -gradient > bounds.low
            }
        } else if alpha <= 0.0 {
            if y > 0.0 {
                gradient > bounds.low
            } else {
                gradient > bounds.up
            }
        } else {
            false
        }
    }

    /// Record one observation of every variable in `active`
    pub fn observe(
        &mut self,
        active: &[usize],
        alpha: &[f64],
        gradient: &[f64],
        y: &[f64],
        c: f64,
        bounds: ViolationBounds,
    ) {
        for &t in active {
            let settled = Self::is_settled(alpha[t], gradient[t], y[t], c, bounds);
            let history = &mut self.settled_history[t];
            if history.len() >= self.history_size {
                history.pop_front();
            }
            history.push_back(settled);
        }
        self.observations += 1;
    }

    /// Settled for the whole history window
    pub fn is_shrinkable(&self, t: usize) -> bool {
        let history = &self.settled_history[t];
        history.len() == self.history_size && history.iter().all(|&settled| settled)
    }

    pub fn has_sufficient_history(&self) -> bool {
        self.observations >= self.history_size
    }

    /// Forget all observations, used when the full set is restored
    pub fn reset_history(&mut self) {
        for history in &mut self.settled_history {
            history.clear();
        }
        self.observations = 0;
    }
}
