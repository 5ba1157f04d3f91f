use std::f64::consts::PI;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// The rotation operator `a = e^{j2π/3}`.
#[inline(always)]
pub fn a_operator() -> Complex64 {
    Complex64::from_polar(1.0, 2.0 * PI / 3.0)
}

/// Zero-, positive- and negative-sequence components of a three-phase quantity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SequenceComponents {
    pub zero: Complex64,
    pub positive: Complex64,
    pub negative: Complex64,
}

/// Phase quantities of phases a, b and c.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseComponents {
    pub a: Complex64,
    pub b: Complex64,
    pub c: Complex64,
}

impl SequenceComponents {
    pub fn new(zero: Complex64, positive: Complex64, negative: Complex64) -> Self {
        Self {
            zero,
            positive,
            negative,
        }
    }

    /// `[a, b, c]ᵀ = [[1, 1, 1], [1, a², a], [1, a, a²]] · [0, 1, 2]ᵀ`
    pub fn to_phase(&self) -> PhaseComponents {
        let a = a_operator();
        let a2 = a * a;
        let (v0, v1, v2) = (self.zero, self.positive, self.negative);
        PhaseComponents {
            a: v0 + v1 + v2,
            b: v0 + a2 * v1 + a * v2,
            c: v0 + a * v1 + a2 * v2,
        }
    }
}

impl PhaseComponents {
    /// Inverse of [`SequenceComponents::to_phase`].
    pub fn to_sequence(&self) -> SequenceComponents {
        let a = a_operator();
        let a2 = a * a;
        let (va, vb, vc) = (self.a, self.b, self.c);
        SequenceComponents {
            zero: (va + vb + vc) / 3.0,
            positive: (va + a * vb + a2 * vc) / 3.0,
            negative: (va + a2 * vb + a * vc) / 3.0,
        }
    }
}
