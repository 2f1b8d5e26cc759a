use hicmat_core::models::ContactMatrix;

use crate::config::BalancerConfig;
use crate::errors::{BalanceError, Result};
use crate::system::ActiveSystem;

// forcing-term parameters of the inexact Newton iteration
const ETA_MAX: f64 = 0.1;
const ETA_DECAY: f64 = 0.9;

///
/// The outcome of a successful balancing run.
///
#[derive(Debug, Clone, PartialEq)]
pub struct Balance {
    /// One scaling factor per bin; masked and excluded bins are NaN.
    pub factors: Vec<f64>,
    /// Outer iterations performed.
    pub iterations: usize,
    /// Largest relative deviation of a scaled row sum from the target.
    pub residual: f64,
    /// Iterations that fell back to a fixed-point step.
    pub fallback_steps: usize,
    /// Unmasked rows that were left out for having no contacts.
    pub excluded: Vec<usize>,
}

impl Balance {
    ///
    /// Rescale a matrix with the computed factors. Rows excluded from
    /// balancing are masked in the result.
    ///
    pub fn apply_to(&self, matrix: &ContactMatrix) -> Result<ContactMatrix> {
        let mut balanced = matrix.apply_correction(&self.factors)?;
        balanced.mask(self.excluded.iter().copied())?;
        Ok(balanced)
    }
}

///
/// Knight–Ruiz balancer for symmetric, non-negative contact matrices.
///
/// Solves `x ∘ (A x) = 1` over the unmasked bins with an inexact Newton
/// method. Each Newton step is found by conjugate gradients and kept inside
/// the cone `[lower_bound, upper_bound]` relative to the current iterate.
/// When the inner solve stalls, or the Newton step would not reduce the
/// residual, the iteration takes a damped symmetric Sinkhorn step
/// `x ← x / sqrt(x ∘ A x)` instead and tries Newton again afterwards.
///
#[derive(Debug, Clone, Default)]
pub struct KnightRuiz {
    config: BalancerConfig,
}

/// One point of the outer iteration with everything derived from it.
struct Iterate {
    x: Vec<f64>,
    /// `x ∘ (A x)`, the row sums of the scaled matrix
    v: Vec<f64>,
    /// `1 - v`
    rk: Vec<f64>,
    /// squared 2-norm of `rk`
    rout: f64,
    /// max-norm of `rk`
    residual: f64,
}

impl Iterate {
    fn evaluate(system: &ActiveSystem, x: Vec<f64>, iteration: usize) -> Result<Self> {
        if x.iter().any(|xi| !xi.is_finite()) {
            return Err(BalanceError::NumericOverflow {
                iteration,
                context: "scaling vector".to_string(),
            });
        }
        let ax = system.mul_vec(&x);
        let v = hadamard(&x, &ax);
        if v.iter().any(|vi| !vi.is_finite() || *vi <= 0.0) {
            return Err(BalanceError::NumericOverflow {
                iteration,
                context: "scaled row sums".to_string(),
            });
        }
        let rk: Vec<f64> = v.iter().map(|vi| 1.0 - vi).collect();
        let rout = dot(&rk, &rk);
        let residual = rk.iter().fold(0.0_f64, |acc, r| acc.max(r.abs()));
        Ok(Iterate {
            x,
            v,
            rk,
            rout,
            residual,
        })
    }
}

struct Solution {
    x: Vec<f64>,
    residual: f64,
    iterations: usize,
    fallback_steps: usize,
    converged: bool,
}

impl KnightRuiz {
    pub fn new(config: BalancerConfig) -> Self {
        KnightRuiz { config }
    }

    pub fn config(&self) -> &BalancerConfig {
        &self.config
    }

    ///
    /// Compute the balancing factors of a contact matrix. The matrix itself
    /// is not modified; see [Balance::apply_to].
    ///
    /// # Arguments
    /// - matrix: symmetric non-negative contact matrix; its masked bins are ignored
    pub fn balance(&self, matrix: &ContactMatrix) -> Result<Balance> {
        self.config.validate()?;

        let system = ActiveSystem::from_matrix(matrix, self.config.exclude_empty_rows)?;
        if !system.excluded().is_empty() {
            log::info!(
                "Excluding {} rows without contacts from balancing",
                system.excluded().len()
            );
        }

        let scale = self.config.target_sum.sqrt();
        let expand = |x: &[f64]| -> Vec<f64> {
            let mut factors = vec![f64::NAN; matrix.len()];
            for (&index, &xi) in system.active().iter().zip(x) {
                factors[index] = xi * scale;
            }
            factors
        };

        if system.is_empty() {
            log::warn!("Every bin is masked, nothing to balance");
            return Ok(Balance {
                factors: expand(&[]),
                iterations: 0,
                residual: 0.0,
                fallback_steps: 0,
                excluded: system.excluded().to_vec(),
            });
        }

        let solution = self.solve(&system)?;
        if !solution.converged {
            return Err(BalanceError::NonConvergence {
                iterations: solution.iterations,
                residual: solution.residual,
                best: expand(&solution.x),
            });
        }

        log::info!(
            "Balancing converged after {} iterations ({} fixed-point steps), residual {:e}",
            solution.iterations,
            solution.fallback_steps,
            solution.residual
        );

        Ok(Balance {
            factors: expand(&solution.x),
            iterations: solution.iterations,
            residual: solution.residual,
            fallback_steps: solution.fallback_steps,
            excluded: system.excluded().to_vec(),
        })
    }

    fn solve(&self, system: &ActiveSystem) -> Result<Solution> {
        let tol = self.config.tolerance;
        let rt = tol * tol;
        let stop_tol = 0.5 * tol;

        // a uniform start that balances the mean row sum; this also makes the
        // whole iteration scale with the matrix (c·A gives x / sqrt(c))
        let mean_row_sum = system.total() / system.len() as f64;
        let x0 = vec![1.0 / mean_row_sum.sqrt(); system.len()];
        let mut state = Iterate::evaluate(system, x0, 0)?;

        let mut best_x = state.x.clone();
        let mut best_residual = state.residual;
        let mut eta = ETA_MAX;
        let mut rold = state.rout;
        let mut iterations = 0;
        let mut fallback_steps = 0;

        while state.residual >= tol {
            if iterations >= self.config.max_iterations {
                return Ok(Solution {
                    x: best_x,
                    residual: best_residual,
                    iterations,
                    fallback_steps,
                    converged: false,
                });
            }
            iterations += 1;

            let inner_tol = (eta * eta * state.rout).max(rt);
            let newton = match self.newton_step(system, &state, inner_tol) {
                Some(y) => Some(Iterate::evaluate(system, hadamard(&state.x, &y), iterations)?)
                    .filter(|candidate| candidate.rout < state.rout),
                None => None,
            };

            state = match newton {
                Some(candidate) => candidate,
                None => {
                    fallback_steps += 1;
                    log::debug!(
                        "Newton step stalled at iteration {}, taking a fixed-point step",
                        iterations
                    );
                    let x = state
                        .x
                        .iter()
                        .zip(&state.v)
                        .map(|(xi, vi)| xi / vi.sqrt())
                        .collect();
                    Iterate::evaluate(system, x, iterations)?
                }
            };

            // update the inner stopping criterion
            let rat = state.rout / rold;
            rold = state.rout;
            let eta_o = eta;
            eta = ETA_DECAY * rat;
            if ETA_DECAY * eta_o * eta_o > 0.1 {
                eta = eta.max(ETA_DECAY * eta_o * eta_o);
            }
            eta = eta.min(ETA_MAX);
            let res_norm = state.rout.sqrt();
            if res_norm > 0.0 {
                eta = eta.max(stop_tol / res_norm);
            }

            if state.residual < best_residual {
                best_residual = state.residual;
                best_x.clone_from(&state.x);
            }
            log::debug!("iteration {}: residual {:e}", iterations, state.residual);
        }

        Ok(Solution {
            x: state.x,
            residual: state.residual,
            iterations,
            fallback_steps,
            converged: true,
        })
    }

    ///
    /// Solve for the multiplicative Newton update `y` with preconditioned
    /// conjugate gradients, stopping early at the edge of the cone.
    /// Returns `None` when the solve could not move `y` at all.
    ///
    fn newton_step(&self, system: &ActiveSystem, state: &Iterate, inner_tol: f64) -> Option<Vec<f64>> {
        let n = state.x.len();
        let (x, v) = (&state.x, &state.v);
        let (delta, upper) = (self.config.lower_bound, self.config.upper_bound);

        let mut y = vec![1.0; n];
        let mut rk = state.rk.clone();
        let mut z: Vec<f64> = Vec::new();
        let mut p: Vec<f64> = Vec::new();
        let mut rho_km1 = state.rout;
        let mut rho_km2 = 0.0;
        let mut moved = false;
        let mut k = 0;

        while rho_km1 > inner_tol && k < self.config.max_inner_iterations {
            k += 1;
            if k == 1 {
                z = rk.iter().zip(v).map(|(r, vi)| r / vi).collect();
                p.clone_from(&z);
                rho_km1 = dot(&rk, &z);
            } else {
                let beta = rho_km1 / rho_km2;
                p = z.iter().zip(&p).map(|(zi, pi)| zi + beta * pi).collect();
            }

            let axp = system.mul_vec(&hadamard(x, &p));
            let w: Vec<f64> = (0..n).map(|i| x[i] * axp[i] + v[i] * p[i]).collect();
            let pw = dot(&p, &w);
            if !(pw.is_finite() && pw > 0.0) {
                break;
            }
            let alpha = rho_km1 / pw;
            let ap: Vec<f64> = p.iter().map(|pi| alpha * pi).collect();
            let ynew: Vec<f64> = y.iter().zip(&ap).map(|(yi, api)| yi + api).collect();

            // test the distance to the boundary of the cone
            if ynew.iter().any(|&yi| yi <= delta) {
                if delta > 0.0 {
                    let gamma = (0..n)
                        .filter(|&i| ap[i] < 0.0)
                        .map(|i| (delta - y[i]) / ap[i])
                        .fold(f64::INFINITY, f64::min);
                    moved |= axpy_in_place(&mut y, gamma, &ap);
                }
                break;
            }
            if ynew.iter().any(|&yi| yi >= upper) {
                let gamma = (0..n)
                    .filter(|&i| ynew[i] >= upper)
                    .map(|i| (upper - y[i]) / ap[i])
                    .fold(f64::INFINITY, f64::min);
                moved |= axpy_in_place(&mut y, gamma, &ap);
                break;
            }

            y = ynew;
            moved = true;
            for (ri, wi) in rk.iter_mut().zip(&w) {
                *ri -= alpha * wi;
            }
            rho_km2 = rho_km1;
            z = rk.iter().zip(v).map(|(r, vi)| r / vi).collect();
            rho_km1 = dot(&rk, &z);
        }

        if !moved || y.iter().any(|yi| !yi.is_finite() || *yi <= 0.0) {
            return None;
        }
        Some(y)
    }
}

/// `y += gamma * d`, skipped when `gamma` is not a usable step length.
fn axpy_in_place(y: &mut [f64], gamma: f64, d: &[f64]) -> bool {
    if !(gamma.is_finite() && gamma > 0.0) {
        return false;
    }
    for (yi, di) in y.iter_mut().zip(d) {
        *yi += gamma * di;
    }
    true
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(ai, bi)| ai * bi).sum()
}

fn hadamard(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(ai, bi)| ai * bi).collect()
}
