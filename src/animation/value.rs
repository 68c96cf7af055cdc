use std::fmt;

use crate::foundation::error::{SuiteError, SuiteResult};

/// Values an action can interpolate between two endpoints.
///
/// `k` is the eased time and `scale` the action's scale factor; implementations compute
/// `a + (b - a) * k * scale` per component, in that association order.
pub trait Lerp: Sized {
    fn lerp(a: &Self, b: &Self, k: f64, scale: f64) -> Self;

    /// Number of numeric components. Both endpoints of an action must match their parameter.
    fn arity(&self) -> usize;
}

impl Lerp for f64 {
    fn lerp(a: &Self, b: &Self, k: f64, scale: f64) -> Self {
        a + (b - a) * k * scale
    }

    fn arity(&self) -> usize {
        1
    }
}

/// Fixed-length numeric vector, written POV-Ray style as `< x, y, z >`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct Vector(Vec<f64>);

impl Vector {
    pub fn new(components: impl Into<Vec<f64>>) -> SuiteResult<Self> {
        let components = components.into();
        if components.is_empty() {
            return Err(SuiteError::configuration("vector must have at least one component"));
        }
        Ok(Self(components))
    }

    /// Infallible constructor for fixed-size arrays; zero-length arrays fail to compile.
    pub fn from_array<const N: usize>(components: [f64; N]) -> Self {
        const { assert!(N > 0, "vector must have at least one component") };
        Self(components.to_vec())
    }

    pub fn components(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`: empty vectors cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<Vec<f64>> for Vector {
    type Error = SuiteError;

    fn try_from(value: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Vector> for Vec<f64> {
    fn from(value: Vector) -> Self {
        value.0
    }
}

impl Lerp for Vector {
    fn lerp(a: &Self, b: &Self, k: f64, scale: f64) -> Self {
        Self(
            a.0.iter()
                .zip(&b.0)
                .map(|(s, p)| s + ((p - s) * k) * scale)
                .collect(),
        )
    }

    fn arity(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("< ")?;
        for (i, c) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{c}")?;
        }
        f.write_str(" >")
    }
}

/// Shorthand for building vectors in code: `vector![0.0, 5.0, 20.0]`.
#[macro_export]
macro_rules! vector {
    ($($c:expr),+ $(,)?) => {
        $crate::Vector::from_array([$(f64::from($c)),+])
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_vector_is_rejected() {
        assert!(Vector::new(Vec::<f64>::new()).is_err());
        assert!(serde_json::from_str::<Vector>("[]").is_err());
    }

    #[test]
    fn display_uses_angle_brackets() {
        assert_eq!(vector![0, 20, 2].to_string(), "< 0, 20, 2 >");
        assert_eq!(vector![0.5, -1.25].to_string(), "< 0.5, -1.25 >");
        assert_eq!(vector![7].to_string(), "< 7 >");
    }

    #[test]
    fn lerp_is_componentwise_and_scaled() {
        let a = vector![0, 10, -4];
        let b = vector![10, 20, 4];
        assert_eq!(Vector::lerp(&a, &b, 0.5, 1.0), vector![5, 15, 0]);
        assert_eq!(Vector::lerp(&a, &b, 1.0, 0.5), vector![5, 15, 0]);
        assert_eq!(f64::lerp(&2.0, &4.0, 0.25, 2.0), 3.0);
    }
}
