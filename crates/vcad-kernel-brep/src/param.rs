//! Face parameters and parameter domains.

use serde::{Deserialize, Serialize};
use vcad_kernel_math::{Interval, Point2};

/// A location inside a face's parameter domain.
///
/// Surface faces take `(u, v)`; curve faces (wire edges) take a single `t`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Parameter {
    /// Curve parameter `t`.
    Curve(f64),
    /// Surface parameter `(u, v)`.
    Surface(Point2),
}

impl Parameter {
    /// Number of real coordinates (1 or 2).
    pub fn dim(&self) -> usize {
        match self {
            Parameter::Curve(_) => 1,
            Parameter::Surface(_) => 2,
        }
    }

    /// First coordinate (`t` or `u`).
    pub fn u(&self) -> f64 {
        match self {
            Parameter::Curve(t) => *t,
            Parameter::Surface(uv) => uv.x,
        }
    }

    /// Second coordinate, present only for surface parameters.
    pub fn v(&self) -> Option<f64> {
        match self {
            Parameter::Curve(_) => None,
            Parameter::Surface(uv) => Some(uv.y),
        }
    }

    /// True if every coordinate is finite.
    pub fn is_finite(&self) -> bool {
        self.u().is_finite() && self.v().map_or(true, f64::is_finite)
    }
}

/// The bounded parameter domain of a face.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ParamDomain {
    /// Domain of a curve face.
    Curve(Interval),
    /// Domain of a surface face.
    Surface {
        /// Range of `u`.
        u: Interval,
        /// Range of `v`.
        v: Interval,
    },
}

impl ParamDomain {
    /// Rectangle domain `u × v`.
    pub fn rect(u: Interval, v: Interval) -> Self {
        ParamDomain::Surface { u, v }
    }

    /// Number of parameter coordinates (1 or 2).
    pub fn dim(&self) -> usize {
        match self {
            ParamDomain::Curve(_) => 1,
            ParamDomain::Surface { .. } => 2,
        }
    }

    /// True if every interval is finite and non-inverted.
    pub fn is_valid(&self) -> bool {
        match self {
            ParamDomain::Curve(t) => t.is_valid(),
            ParamDomain::Surface { u, v } => u.is_valid() && v.is_valid(),
        }
    }

    /// Interval of the first coordinate.
    pub fn u(&self) -> Interval {
        match self {
            ParamDomain::Curve(t) => *t,
            ParamDomain::Surface { u, .. } => *u,
        }
    }

    /// Interval of the second coordinate, if any.
    pub fn v(&self) -> Option<Interval> {
        match self {
            ParamDomain::Curve(_) => None,
            ParamDomain::Surface { v, .. } => Some(*v),
        }
    }

    /// Clamp a parameter into the domain.
    ///
    /// A parameter of the wrong kind is returned unchanged.
    pub fn clamp(&self, param: Parameter) -> Parameter {
        match (self, param) {
            (ParamDomain::Curve(t_range), Parameter::Curve(t)) => {
                Parameter::Curve(t_range.clamp(t))
            }
            (ParamDomain::Surface { u, v }, Parameter::Surface(uv)) => {
                Parameter::Surface(Point2::new(u.clamp(uv.x), v.clamp(uv.y)))
            }
            (_, other) => other,
        }
    }

    /// True if the parameter has the right kind and lies inside the domain.
    pub fn contains(&self, param: Parameter) -> bool {
        match (self, param) {
            (ParamDomain::Curve(t_range), Parameter::Curve(t)) => t_range.contains(t),
            (ParamDomain::Surface { u, v }, Parameter::Surface(uv)) => {
                u.contains(uv.x) && v.contains(uv.y)
            }
            _ => false,
        }
    }

    /// Map normalized coordinates in `[0, 1]` to a parameter in the domain.
    /// `sv` is ignored for curve domains.
    pub fn at(&self, su: f64, sv: f64) -> Parameter {
        match self {
            ParamDomain::Curve(t) => Parameter::Curve(t.lerp(su)),
            ParamDomain::Surface { u, v } => Parameter::Surface(Point2::new(u.lerp(su), v.lerp(sv))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_surface() {
        let d = ParamDomain::rect(Interval::unit(), Interval::new(-1.0, 1.0));
        let p = d.clamp(Parameter::Surface(Point2::new(2.0, -3.0)));
        assert_eq!(p, Parameter::Surface(Point2::new(1.0, -1.0)));
        assert!(d.contains(p));
    }

    #[test]
    fn test_clamp_curve() {
        let d = ParamDomain::Curve(Interval::new(0.0, 2.0));
        assert_eq!(d.clamp(Parameter::Curve(-0.5)), Parameter::Curve(0.0));
        assert!(!d.contains(Parameter::Surface(Point2::new(1.0, 1.0))));
    }

    #[test]
    fn test_at_maps_corners() {
        let d = ParamDomain::rect(Interval::new(1.0, 3.0), Interval::new(0.0, 4.0));
        assert_eq!(d.at(0.0, 0.0), Parameter::Surface(Point2::new(1.0, 0.0)));
        assert_eq!(d.at(1.0, 1.0), Parameter::Surface(Point2::new(3.0, 4.0)));
        assert_eq!(ParamDomain::Curve(Interval::unit()).at(0.25, 0.9), Parameter::Curve(0.25));
    }

    #[test]
    fn test_parameter_accessors() {
        let p = Parameter::Surface(Point2::new(0.5, 0.25));
        assert_eq!(p.dim(), 2);
        assert_eq!(p.v(), Some(0.25));
        assert_eq!(Parameter::Curve(0.1).v(), None);
        assert!(!Parameter::Curve(f64::NAN).is_finite());
    }
}
