use crate::data_types::nucleotides::{Nucleotide, PairType, NUM_NUCLEOTIDES, NUM_PAIR_TYPES};

/// Effectively infinite energy (dcal/mol), small enough that a handful of them can be added without overflow
pub const INF: i32 = 10_000_000;
/// Largest loop length that has a tabulated initiation energy; anything longer is extrapolated
pub const MAXLOOP: usize = 30;
/// Gas constant in cal/(mol*K)
pub const GAS_CONSTANT: f64 = 1.98717;
/// 0 Celsius in Kelvin
pub const K0: f64 = 273.15;
/// Reference temperature for all tabulated free energies
pub const T37: f64 = 37.0;

// Tables below are dcal/mol at 37C and follow the Turner 2004 nearest neighbor rules.
// Pair order everywhere is CG, GC, GU, UG, AU, UA, NS; nucleotide order is A, C, G, U, N.

/// Stacking free energy; `STACK37[type(i,j)][type(l,k)]` for the stack of (i,j) on (k,l)
const STACK37: [[i32; NUM_PAIR_TYPES]; NUM_PAIR_TYPES] = [
    [ -240, -330, -210, -140, -210, -210, 0],
    [ -330, -340, -250, -150, -220, -240, 0],
    [ -210, -250,  130,  -50, -140, -130, 0],
    [ -140, -150,  -50,   30,  -60, -100, 0],
    [ -210, -220, -140,  -60, -110,  -90, 0],
    [ -210, -240, -130, -100,  -90, -130, 0],
    [    0,    0,    0,    0,    0,    0, 0],
];

/// Stacking enthalpy, same layout as `STACK37`
const STACK_DH: [[i32; NUM_PAIR_TYPES]; NUM_PAIR_TYPES] = [
    [-1060, -1340, -1210,  -560, -1050, -1040, 0],
    [-1340, -1490, -1260,  -830, -1140, -1240, 0],
    [-1210, -1260, -1460, -1350,  -880, -1280, 0],
    [ -560,  -830, -1350,  -930,  -320,  -700, 0],
    [-1050, -1140,  -880,  -320,  -940,  -680, 0],
    [-1040, -1240, -1280,  -700,  -680,  -770, 0],
    [    0,     0,     0,     0,     0,     0, 0],
];

const HAIRPIN37: [i32; MAXLOOP + 1] = [
    INF, INF, INF, 540, 560, 570, 540, 600, 550, 640,
    650, 660, 670, 678, 686, 694, 701, 707, 713, 719,
    725, 730, 735, 740, 744, 749, 753, 757, 761, 765,
    769
];

const BULGE37: [i32; MAXLOOP + 1] = [
    INF, 380, 280, 320, 360, 400, 440, 459, 470, 480,
    490, 500, 510, 519, 527, 534, 541, 548, 554, 560,
    565, 571, 576, 580, 585, 589, 594, 598, 602, 605,
    609
];

// sizes 2 and 3 are the 1x1 and 1x2 loops
const INTERIOR37: [i32; MAXLOOP + 1] = [
    INF, INF,  50, 160, 110, 200, 200, 210, 230, 240,
    250, 260, 270, 280, 290, 290, 300, 310, 310, 320,
    330, 330, 340, 340, 350, 350, 350, 360, 360, 370,
    370
];

/// 5' dangle: nucleotide i-1 dangling off pair (i,j)
const DANGLE5_37: [[i32; NUM_NUCLEOTIDES]; NUM_PAIR_TYPES] = [
    [ -50, -30, -20, -10, 0],
    [ -20, -30,   0,   0, 0],
    [ -30, -30, -40, -20, 0],
    [ -30, -10, -20, -20, 0],
    [ -30, -30, -40, -20, 0],
    [ -30, -10, -20, -20, 0],
    [   0,   0,   0,   0, 0],
];

/// 3' dangle: nucleotide j+1 dangling off pair (i,j)
const DANGLE3_37: [[i32; NUM_NUCLEOTIDES]; NUM_PAIR_TYPES] = [
    [-110,  -40, -130,  -60, 0],
    [-170,  -80, -170, -120, 0],
    [ -70,  -10,  -70,  -10, 0],
    [ -80,  -50,  -80,  -60, 0],
    [ -70,  -10,  -70,  -10, 0],
    [ -80,  -50,  -80,  -60, 0],
    [   0,    0,    0,    0, 0],
];

/// Base terminal mismatch bonus for a hairpin closing pair
const HAIRPIN_MISMATCH37: [i32; NUM_PAIR_TYPES] = [-150, -150, -90, -90, -80, -80, 0];

const TERMINAL_AU37: i32 = 50;
const TERMINAL_AU_DH: i32 = 370;
const ML_CLOSING37: i32 = 930;
const ML_CLOSING_DH: i32 = 3000;
const ML_INTERN37: i32 = -90;
const ML_INTERN_DH: i32 = -220;
const ML_BASE37: i32 = 0;
const NINIO37: i32 = 60;
const MAX_NINIO: i32 = 300;
const LXC37: f64 = 107.856;
/// Per-side AU/GU closure penalty inside interior loops
const INTERIOR_AU37: i32 = 70;
/// First mismatch bonuses inside interior loops
const INTERIOR_GA_BONUS37: i32 = -80;
const INTERIOR_UU_BONUS37: i32 = -70;
const INTERIOR_GG_BONUS37: i32 = -100;
/// First mismatch bonuses inside hairpins
const HAIRPIN_UU_BONUS37: i32 = -90;
const HAIRPIN_GA_BONUS37: i32 = -80;
/// Poly-C hairpin penalties
const C_HAIRPIN3_37: i32 = 140;
const C_HAIRPIN_SLOPE37: i32 = 30;
const C_HAIRPIN_INTERCEPT37: i32 = 160;

/// Temperature adjusted nearest neighbor parameters; all energies are dcal/mol
#[derive(Clone, Debug)]
pub struct EnergyParameters {
    /// Temperature in Celsius these parameters were built for
    temperature: f64,
    /// RT in kcal/mol
    kt: f64,
    pub stack: [[i32; NUM_PAIR_TYPES]; NUM_PAIR_TYPES],
    pub hairpin: [i32; MAXLOOP + 1],
    pub bulge: [i32; MAXLOOP + 1],
    pub interior: [i32; MAXLOOP + 1],
    pub dangle5: [[i32; NUM_NUCLEOTIDES]; NUM_PAIR_TYPES],
    pub dangle3: [[i32; NUM_NUCLEOTIDES]; NUM_PAIR_TYPES],
    pub hairpin_mismatch: [i32; NUM_PAIR_TYPES],
    pub terminal_au: i32,
    pub ml_closing: i32,
    pub ml_intern: i32,
    pub ml_base: i32,
    pub ninio: i32,
    pub max_ninio: i32,
    /// Coefficient for extrapolating loop energies beyond `MAXLOOP`
    pub lxc: f64,
    pub interior_au: i32,
    pub interior_ga_bonus: i32,
    pub interior_uu_bonus: i32,
    pub interior_gg_bonus: i32,
    pub hairpin_uu_bonus: i32,
    pub hairpin_ga_bonus: i32,
    pub c_hairpin3: i32,
    pub c_hairpin_slope: i32,
    pub c_hairpin_intercept: i32,
}

impl Default for EnergyParameters {
    fn default() -> Self {
        Self::at_temperature(T37)
    }
}

impl EnergyParameters {
    /// Builds the parameter set for a given temperature.
    /// Terms with a tabulated enthalpy are rescaled as dG(T) = dH - (dH - dG37) * T / T37.
    /// Loop terms are treated as purely entropic, so they scale linearly with absolute temperature.
    /// # Arguments
    /// * `temperature` - temperature in Celsius
    pub fn at_temperature(temperature: f64) -> Self {
        let ratio = (temperature + K0) / (T37 + K0);
        let entropic = |dg: i32| -> i32 {
            if dg >= INF {
                INF
            } else {
                (dg as f64 * ratio).round() as i32
            }
        };
        let enthalpic = |dg: i32, dh: i32| -> i32 {
            (dh as f64 - (dh - dg) as f64 * ratio).round() as i32
        };

        let mut stack = [[0; NUM_PAIR_TYPES]; NUM_PAIR_TYPES];
        for (p1, row) in stack.iter_mut().enumerate() {
            for (p2, value) in row.iter_mut().enumerate() {
                *value = enthalpic(STACK37[p1][p2], STACK_DH[p1][p2]);
            }
        }

        Self {
            temperature,
            kt: GAS_CONSTANT * (temperature + K0) / 1000.0,
            stack,
            hairpin: HAIRPIN37.map(entropic),
            bulge: BULGE37.map(entropic),
            interior: INTERIOR37.map(entropic),
            dangle5: DANGLE5_37.map(|row| row.map(entropic)),
            dangle3: DANGLE3_37.map(|row| row.map(entropic)),
            hairpin_mismatch: HAIRPIN_MISMATCH37.map(entropic),
            terminal_au: enthalpic(TERMINAL_AU37, TERMINAL_AU_DH),
            ml_closing: enthalpic(ML_CLOSING37, ML_CLOSING_DH),
            ml_intern: enthalpic(ML_INTERN37, ML_INTERN_DH),
            ml_base: entropic(ML_BASE37),
            ninio: entropic(NINIO37),
            max_ninio: entropic(MAX_NINIO),
            lxc: LXC37 * ratio,
            interior_au: entropic(INTERIOR_AU37),
            interior_ga_bonus: entropic(INTERIOR_GA_BONUS37),
            interior_uu_bonus: entropic(INTERIOR_UU_BONUS37),
            interior_gg_bonus: entropic(INTERIOR_GG_BONUS37),
            hairpin_uu_bonus: entropic(HAIRPIN_UU_BONUS37),
            hairpin_ga_bonus: entropic(HAIRPIN_GA_BONUS37),
            c_hairpin3: entropic(C_HAIRPIN3_37),
            c_hairpin_slope: entropic(C_HAIRPIN_SLOPE37),
            c_hairpin_intercept: entropic(C_HAIRPIN_INTERCEPT37),
        }
    }

    /// Temperature in Celsius
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// RT in kcal/mol
    pub fn kt(&self) -> f64 {
        self.kt
    }

    /// Penalty for a helix ending in an AU, GU (or non-standard) pair
    pub fn terminal_penalty(&self, pair_type: PairType) -> i32 {
        if pair_type.is_weak() {
            self.terminal_au
        } else {
            0
        }
    }

    /// Stacking energy of outer pair type `outer` on the reversed inner pair type `inner_reversed`
    pub fn stack_energy(&self, outer: PairType, inner_reversed: PairType) -> i32 {
        self.stack[outer.index()][inner_reversed.index()]
    }

    pub fn dangle5_energy(&self, pair_type: PairType, base: Nucleotide) -> i32 {
        self.dangle5[pair_type.index()][base.index()]
    }

    pub fn dangle3_energy(&self, pair_type: PairType, base: Nucleotide) -> i32 {
        self.dangle3[pair_type.index()][base.index()]
    }

    /// Terminal mismatch inside a hairpin: `x` follows the 5' base of the pair, `y` precedes the 3' base
    pub fn hairpin_mismatch_energy(&self, pair_type: PairType, x: Nucleotide, y: Nucleotide) -> i32 {
        let bonus = match (x, y) {
            (Nucleotide::U, Nucleotide::U) => self.hairpin_uu_bonus,
            (Nucleotide::G, Nucleotide::A) => self.hairpin_ga_bonus,
            _ => 0
        };
        self.hairpin_mismatch[pair_type.index()] + bonus
    }

    /// Terminal mismatch inside a generic interior loop, including the AU/GU closure penalty
    pub fn interior_mismatch_energy(&self, pair_type: PairType, x: Nucleotide, y: Nucleotide) -> i32 {
        let bonus = match (x, y) {
            (Nucleotide::G, Nucleotide::A) |
            (Nucleotide::A, Nucleotide::G) => self.interior_ga_bonus,
            (Nucleotide::U, Nucleotide::U) => self.interior_uu_bonus,
            (Nucleotide::G, Nucleotide::G) => self.interior_gg_bonus,
            _ => 0
        };
        self.interior_closure_penalty(pair_type) + bonus
    }

    /// AU/GU closure penalty for a pair closing an interior loop
    pub fn interior_closure_penalty(&self, pair_type: PairType) -> i32 {
        if pair_type.is_weak() {
            self.interior_au
        } else {
            0
        }
    }

    /// Looks up a loop initiation table, extrapolating logarithmically beyond `MAXLOOP`
    pub fn loop_initiation(&self, table: &[i32; MAXLOOP + 1], size: usize) -> i32 {
        if size <= MAXLOOP {
            table[size]
        } else {
            table[MAXLOOP] + (self.lxc * (size as f64 / MAXLOOP as f64).ln()).round() as i32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx_eq::assert_approx_eq;

    #[test]
    fn test_stack_symmetry() {
        for p1 in 0..NUM_PAIR_TYPES {
            for p2 in 0..NUM_PAIR_TYPES {
                assert_eq!(STACK37[p1][p2], STACK37[p2][p1]);
                assert_eq!(STACK_DH[p1][p2], STACK_DH[p2][p1]);
            }
        }
    }

    #[test]
    fn test_default_is_37() {
        let params = EnergyParameters::default();
        assert_eq!(params.stack, STACK37);
        assert_eq!(params.hairpin[3], 540);
        assert_eq!(params.terminal_au, TERMINAL_AU37);
        assert_eq!(params.ml_closing, ML_CLOSING37);
        assert_approx_eq!(params.kt(), GAS_CONSTANT * (T37 + K0) / 1000.0);
    }

    #[test]
    fn test_temperature_scaling() {
        let hot = EnergyParameters::at_temperature(60.0);
        // stacks lose stability as temperature rises
        assert!(hot.stack[PairType::GC.index()][PairType::GC.index()] > STACK37[1][1]);
        // loops get more expensive
        assert!(hot.hairpin[4] > HAIRPIN37[4]);
        assert_eq!(hot.hairpin[0], INF);
        assert_approx_eq!(hot.temperature(), 60.0);
    }

    #[test]
    fn test_loop_extrapolation() {
        let params = EnergyParameters::default();
        assert_eq!(params.loop_initiation(&params.hairpin, 30), 769);
        let extrapolated = params.loop_initiation(&params.hairpin, 60);
        assert_eq!(extrapolated, 769 + (LXC37 * 2.0_f64.ln()).round() as i32);
    }
}
