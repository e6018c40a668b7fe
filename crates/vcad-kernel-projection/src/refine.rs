//! Local Newton refinement of a seed parameter on one face.
//!
//! Minimizes `f(p) = ½|S(p) − q|²` over the face's parameter rectangle.
//! Each iteration solves the 2×2 (or 1×1 for curve faces) stationarity
//! system `H·δ = −∇f` with
//!
//! ```text
//! ∇f = [r·Su, r·Sv]
//! H  = [Su·Su + r·Suu, Su·Sv + r·Suv; Su·Sv + r·Suv, Sv·Sv + r·Svv]
//! ```
//!
//! where `r = S(p) − q`. The full Hessian is used when it is positive
//! definite; otherwise the Gauss-Newton matrix (first-order terms only)
//! is used. Variables sitting on a domain bound whose step points out of
//! the domain are held fixed for that iteration. The step is then
//! backtracked until the distance does not increase, so the recorded
//! distance history is non-increasing.

use nalgebra::{Matrix2, Vector2};
use vcad_kernel_brep::{FaceEval, FaceEvaluator, FaceId, ParamDomain, Parameter};
use vcad_kernel_math::{Point3, Vec3};

use crate::error::{ConvergenceFailure, ProjectionError, Result};

/// Relative threshold below which a 2×2 system counts as singular.
const SINGULAR_EPS: f64 = 1e-12;

/// Step halvings tried before declaring no descent.
const MAX_HALVINGS: usize = 30;

/// Stopping rules for [`refine`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefineOptions {
    /// Converged once a full Newton step moves the point less than this.
    pub tolerance: f64,
    /// Iteration cap.
    pub max_iterations: usize,
}

/// Outcome of a converged refinement.
#[derive(Debug, Clone, PartialEq)]
pub struct Refinement {
    /// Final parameter, inside the face domain.
    pub parameter: Parameter,
    /// Final position.
    pub point: Point3,
    /// Distance from the query to `point`.
    pub distance: f64,
    /// Newton iterations performed.
    pub iterations: usize,
    /// Distance at the seed followed by the distance after every accepted
    /// step. Never increases.
    pub history: Vec<f64>,
}

/// Refine `seed` on `face` towards the point closest to `query`.
///
/// Returns [`ProjectionError::DidNotConverge`] if the iteration cap is hit,
/// the linear system is singular, no descent step exists, or a value goes
/// non-finite.
pub fn refine<E>(
    evaluator: &E,
    face: FaceId,
    domain: &ParamDomain,
    seed: Parameter,
    query: &Point3,
    options: &RefineOptions,
) -> Result<Refinement>
where
    E: FaceEvaluator + ?Sized,
{
    let fail = |reason, iterations| ProjectionError::DidNotConverge {
        face,
        reason,
        iterations,
    };
    let eval_at = |param: Parameter, iterations: usize| -> Result<FaceEval> {
        let eval = evaluator
            .evaluate(face, param)
            .ok_or_else(|| fail(ConvergenceFailure::EvaluationFailed, iterations))?;
        if is_finite(&eval) {
            Ok(eval)
        } else {
            Err(fail(ConvergenceFailure::NonFinite, iterations))
        }
    };
    let done = |parameter, eval: &FaceEval, dist_sq: f64, iterations, history| Refinement {
        parameter,
        point: eval.point,
        distance: dist_sq.sqrt(),
        iterations,
        history,
    };

    let mut param = domain.clamp(seed);
    let mut eval = eval_at(param, 0)?;
    let mut dist_sq = (eval.point - query).norm_squared();
    let mut history = vec![dist_sq.sqrt()];

    if dist_sq.sqrt() < options.tolerance {
        return Ok(done(param, &eval, dist_sq, 0, history));
    }

    for iteration in 1..=options.max_iterations {
        let step = newton_step(&eval, query, domain, param).map_err(|r| fail(r, iteration))?;
        let sv = eval.dv.unwrap_or_else(Vec3::zeros);
        let predicted = (eval.du * step.x + sv * step.y).norm();

        let mut accepted = None;
        let mut alpha = 1.0;
        for halvings in 0..MAX_HALVINGS {
            let candidate = domain.clamp(offset(param, &step, alpha));
            let next = eval_at(candidate, iteration)?;
            let next_dist_sq = (next.point - query).norm_squared();
            if next_dist_sq <= dist_sq {
                accepted = Some((candidate, next, next_dist_sq, halvings));
                break;
            }
            alpha *= 0.5;
        }

        let Some((next_param, next_eval, next_dist_sq, halvings)) = accepted else {
            // Rounding can defeat the descent test right at the minimum.
            if predicted < options.tolerance {
                history.push(dist_sq.sqrt());
                return Ok(done(param, &eval, dist_sq, iteration, history));
            }
            return Err(fail(ConvergenceFailure::NoDescent, iteration));
        };

        let moved = (next_eval.point - eval.point).norm();
        param = next_param;
        eval = next_eval;
        dist_sq = next_dist_sq;
        history.push(dist_sq.sqrt());

        // A tiny damped step says nothing about convergence.
        if moved < options.tolerance && (halvings == 0 || predicted < options.tolerance) {
            return Ok(done(param, &eval, dist_sq, iteration, history));
        }
    }

    Err(fail(ConvergenceFailure::IterationLimit, options.max_iterations))
}

fn is_finite(eval: &FaceEval) -> bool {
    let finite = |v: &Vec3| v.iter().all(|c| c.is_finite());
    eval.point.coords.iter().all(|c| c.is_finite())
        && finite(&eval.du)
        && eval.dv.as_ref().map_or(true, finite)
        && eval
            .second
            .as_ref()
            .map_or(true, |s| finite(&s.duu) && finite(&s.duv) && finite(&s.dvv))
}

fn offset(param: Parameter, step: &Vector2<f64>, alpha: f64) -> Parameter {
    match param {
        Parameter::Curve(t) => Parameter::Curve(t + alpha * step.x),
        Parameter::Surface(uv) => Parameter::Surface(uv + step * alpha),
    }
}

fn positive_definite(h: &Matrix2<f64>) -> bool {
    let (a, b, d) = (h[(0, 0)], h[(0, 1)], h[(1, 1)]);
    a.is_finite() && b.is_finite() && d.is_finite() && a > 0.0 && a * d - b * b > SINGULAR_EPS * a * d
}

/// Newton step in parameter space, with bound-pinned variables held at zero.
///
/// Curve faces are handled as surfaces whose second coordinate has unit
/// curvature and zero gradient, so its step is always zero.
fn newton_step(
    eval: &FaceEval,
    query: &Point3,
    domain: &ParamDomain,
    param: Parameter,
) -> std::result::Result<Vector2<f64>, ConvergenceFailure> {
    let r = eval.point - query;
    let su = eval.du;
    let sv = eval.dv.unwrap_or_else(Vec3::zeros);
    let is_surface = eval.dv.is_some();

    let gradient = Vector2::new(r.dot(&su), r.dot(&sv));
    let cross = su.dot(&sv);
    let mut gauss = Matrix2::new(su.dot(&su), cross, cross, sv.dot(&sv));
    if !is_surface {
        gauss[(1, 1)] = 1.0;
    }
    let full = eval.second.map(|s| {
        let mixed = r.dot(&s.duv);
        gauss + Matrix2::new(r.dot(&s.duu), mixed, mixed, r.dot(&s.dvv))
    });

    let hessian = match full {
        Some(h) if positive_definite(&h) => h,
        _ if positive_definite(&gauss) => gauss,
        _ => return Err(ConvergenceFailure::SingularSystem),
    };

    let bounds = [Some(domain.u()), domain.v()];
    let coords = [param.u(), param.v().unwrap_or(0.0)];
    let mut free = [true, is_surface];

    loop {
        let step = solve(&hessian, &gradient, free);
        if !step.iter().all(|c| c.is_finite()) {
            return Err(ConvergenceFailure::NonFinite);
        }

        let mut pinned = false;
        for k in 0..2 {
            let Some(interval) = bounds[k].filter(|_| free[k]) else {
                continue;
            };
            let outward = match interval.bound_side(coords[k]) {
                Some(-1) => step[k] < 0.0,
                Some(1) => step[k] > 0.0,
                _ => false,
            };
            if outward {
                free[k] = false;
                pinned = true;
            }
        }
        if !pinned {
            return Ok(step);
        }
    }
}

/// Solve `H·δ = −g` over the free variables. `H` is positive definite.
fn solve(h: &Matrix2<f64>, g: &Vector2<f64>, free: [bool; 2]) -> Vector2<f64> {
    match free {
        [true, true] => {
            let det = h[(0, 0)] * h[(1, 1)] - h[(0, 1)] * h[(1, 0)];
            Vector2::new(
                -(h[(1, 1)] * g.x - h[(0, 1)] * g.y) / det,
                -(h[(0, 0)] * g.y - h[(1, 0)] * g.x) / det,
            )
        }
        [true, false] => Vector2::new(-g.x / h[(0, 0)], 0.0),
        [false, true] => Vector2::new(0.0, -g.y / h[(1, 1)]),
        [false, false] => Vector2::zeros(),
    }
}
