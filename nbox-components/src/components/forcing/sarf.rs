//! Stratospherically adjusted radiative forcing expressions
//!
//! Concentrations are in ppmv (CO₂) and ppbv (CH₄, N₂O). Every function
//! returns W/m² and is zero when the gas is at its preindustrial level.

use crate::constants::{
    A1, A2, A3, B1, B2, B3, C1, C2, D1, D3, H2O_STRAT_FRACTION, H2O_STRAT_SCALE,
    O3_TROP_EFFICIENCY,
};
use nbox_core::timeseries::FloatValue;

/// CO₂ concentration above which the CO₂ scaling term stops growing
pub fn co2_alpha_max(c0: FloatValue) -> FloatValue {
    c0 - B1 / (2.0 * A1)
}

/// CO₂ forcing, including the N₂O overlap term
///
/// $$ SARF = (\alpha' + c_1 \sqrt{N_a}) \ln\frac{C_a}{C_0} $$
///
/// with $\alpha'$ quadratic in $C_a - C_0$ between $C_0$ and $C_{\alpha,max}$
/// and fixed at $d_1 - b_1^2 / 2a_1$ above it. That constant is not the value
/// of the quadratic at $C_{\alpha,max}$, so forcing jumps there.
pub fn co2_sarf(ca: FloatValue, c0: FloatValue, n2o: FloatValue) -> FloatValue {
    let alpha_prime = if ca > co2_alpha_max(c0) {
        D1 - B1 * B1 / (2.0 * A1)
    } else if ca > c0 {
        let dc = ca - c0;
        D1 + A1 * dc * dc + B1 * dc
    } else {
        D1
    };
    let alpha_n2o = C1 * n2o.sqrt();
    (alpha_prime + alpha_n2o) * (ca / c0).ln()
}

/// N₂O forcing
///
/// $$ SARF = (a_2 \sqrt{C_a} + b_2 \sqrt{N_a} + c_2 \sqrt{M_a}) (\sqrt{N_a} - \sqrt{N_0}) $$
pub fn n2o_sarf(ca: FloatValue, n2o: FloatValue, ch4: FloatValue, n0: FloatValue) -> FloatValue {
    (A2 * ca.sqrt() + B2 * n2o.sqrt() + C2 * ch4.sqrt()) * (n2o.sqrt() - n0.sqrt())
}

/// CH₄ forcing
///
/// $$ SARF = (a_3 \sqrt{M_a} + b_3 \sqrt{N_a} + d_3) (\sqrt{M_a} - \sqrt{M_0}) $$
pub fn ch4_sarf(ch4: FloatValue, n2o: FloatValue, m0: FloatValue) -> FloatValue {
    (A3 * ch4.sqrt() + B3 * n2o.sqrt() + D3) * (ch4.sqrt() - m0.sqrt())
}

/// Stratospheric water vapour from methane oxidation
pub fn h2o_strat_forcing(ch4: FloatValue, m0: FloatValue) -> FloatValue {
    H2O_STRAT_FRACTION * H2O_STRAT_SCALE * (ch4.sqrt() - m0.sqrt())
}

/// Tropospheric ozone from its column in Dobson units
pub fn o3_trop_forcing(ozone_du: FloatValue) -> FloatValue {
    O3_TROP_EFFICIENCY * ozone_du
}

/// Aerosol-cloud interactions
///
/// Not modelled; always zero and never part of total forcing.
pub fn aerosol_cloud_interactions() -> FloatValue {
    0.0
}
