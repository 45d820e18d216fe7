//! Thermodynamic rate formulas.
//!
//! The Schoolfield model (Schoolfield, Sharpe & Magnuson 1981) scales a
//! reference rate `p` by an Arrhenius activation term and divides by the
//! probability that the rate-controlling enzyme is active:
//!
//! ```text
//! rate(T) = p * (T/T_ref) * exp(ΔH_A/R * (1/T_ref - 1/T))
//!           / (1 + exp(ΔH_L/R * (1/T_halfL - 1/T)) + exp(ΔH_H/R * (1/T_halfH - 1/T)))
//! ```
//!
//! All temperatures are Kelvin, enthalpies J/mol.

/// Universal gas constant, J mol⁻¹ K⁻¹.
pub const GAS_CONSTANT: f64 = 8.314_462_618;

/// Plain numeric Schoolfield coefficients.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchoolfieldTerms {
    /// Rate at the reference temperature with no inactivation.
    pub p: f64,
    pub delta_h_a: f64,
    pub delta_h_l: f64,
    pub t_half_l: f64,
    pub delta_h_h: f64,
    pub t_half_h: f64,
    pub t_ref: f64,
}

impl SchoolfieldTerms {
    /// Rate at temperature `t` (K). NaN for non-positive or non-finite `t`.
    pub fn rate(&self, t: f64) -> f64 {
        if !(t.is_finite() && t > 0.0) {
            return f64::NAN;
        }
        let numer = self.p * (t / self.t_ref) * arrhenius(self.delta_h_a, self.t_ref, t);
        let denom = 1.0 + arrhenius(self.delta_h_l, self.t_half_l, t) + arrhenius(self.delta_h_h, self.t_half_h, t);
        numer / denom
    }
}

/// `exp(ΔH/R * (1/t0 - 1/t))`.
#[inline]
pub fn arrhenius(delta_h: f64, t0: f64, t: f64) -> f64 {
    (delta_h / GAS_CONSTANT * (1.0 / t0 - 1.0 / t)).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn negligible_inactivation() -> SchoolfieldTerms {
        SchoolfieldTerms {
            p: 0.3,
            delta_h_a: 2e4,
            delta_h_l: -1e5,
            t_half_l: 150.0,
            delta_h_h: 3e5,
            t_half_h: 400.0,
            t_ref: 298.15,
        }
    }

    #[test]
    fn reference_temperature_returns_p() {
        let m = negligible_inactivation();
        assert!((m.rate(298.15) - 0.3).abs() < 1e-9);
    }

    #[test]
    fn inactivation_lowers_the_reference_rate() {
        let m = SchoolfieldTerms {
            t_half_l: 250.0,
            t_half_h: 300.0,
            ..negligible_inactivation()
        };
        let r = m.rate(298.15);
        assert!(r > 0.0 && r < 0.3, "got {r}");
    }

    #[test]
    fn arrhenius_is_one_at_reference() {
        assert_eq!(arrhenius(5e4, 290.0, 290.0), 1.0);
    }

    #[test]
    fn non_physical_temperature_is_nan() {
        let m = negligible_inactivation();
        assert!(m.rate(0.0).is_nan());
        assert!(m.rate(-5.0).is_nan());
        assert!(m.rate(f64::NAN).is_nan());
    }
}
