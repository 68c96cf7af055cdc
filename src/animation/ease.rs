/// Easing law applied to normalized episode time before interpolation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ease {
    /// `k = t`.
    #[default]
    Linear,
    /// `k = tanh(3t)`. Reaches `tanh(3) ≈ 0.99505` at `t = 1`, not 1.
    TanHyp,
}

impl Ease {
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::TanHyp => (t * 3.0).tanh(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_endpoints_are_exact() {
        assert_eq!(Ease::Linear.apply(0.0), 0.0);
        assert_eq!(Ease::Linear.apply(1.0), 1.0);
    }

    #[test]
    fn tanhyp_stops_short_of_one() {
        assert_eq!(Ease::TanHyp.apply(0.0), 0.0);
        assert_eq!(Ease::TanHyp.apply(1.0), 3.0f64.tanh());
        assert!(Ease::TanHyp.apply(1.0) < 1.0);
        assert!((Ease::TanHyp.apply(1.0) - 0.995_054_753_686_730_5).abs() < 1e-12);
    }

    #[test]
    fn monotonic_spot_check() {
        for ease in [Ease::Linear, Ease::TanHyp] {
            let a = ease.apply(0.25);
            let b = ease.apply(0.5);
            let c = ease.apply(0.75);
            assert!(a < b);
            assert!(b < c);
        }
    }

    #[test]
    fn names_round_trip_through_json() {
        let e: Ease = serde_json::from_str("\"tanhyp\"").unwrap();
        assert_eq!(e, Ease::TanHyp);
        assert_eq!(serde_json::to_string(&Ease::Linear).unwrap(), "\"linear\"");
    }
}
