//! Heuristic / profile manager (C6): combines a measured register profile
//! with the estimated fill ratio and a workload's kernel weights to pick
//! the `(r, c)` block size that minimizes estimated time.

use crate::csr::CsrMatrix;
use crate::error::{EngineError, Result};
use crate::fill::FillTable;
use crate::types::Precision;
use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

/// A per-platform `perf[r, c]` table (Mflop/s, or an abstract performance
/// score) for one kernel variant, measured offline.
#[derive(Debug, Clone)]
pub struct RegisterProfile {
    r_max: usize,
    c_max: usize,
    values: Vec<Precision>,
}

impl RegisterProfile {
    /// Build a profile from an explicit `perf[r][c]` table, row-major over
    /// `r in [1, r_max]`, `c in [1, c_max]`.
    pub fn from_table(r_max: usize, c_max: usize, values: Vec<Precision>) -> Result<Self> {
        if values.len() != r_max * c_max {
            return Err(EngineError::BadArg {
                parameter: "values".into(),
                message: "register profile table size does not match (r_max, c_max)".into(),
            });
        }
        Ok(Self { r_max, c_max, values })
    }

    /// Parse the persisted text format: each non-comment line is
    /// `r c v mflops`, where `v == value_tag` selects this profile (the
    /// engine persists one profile per kernel variant per value-type tag
    /// in the same file, spec.md §6).
    #[cfg(feature = "std")]
    pub fn parse(text: &str, r_max: usize, c_max: usize, value_tag: u32) -> Result<Self> {
        let mut values = alloc::vec![1.0; r_max * c_max];
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() != 4 {
                return Err(EngineError::Syntax {
                    recipe: line.to_string(),
                    message: "expected 'r c v mflops'".into(),
                });
            }
            let parse_field = |s: &str| {
                s.parse::<Precision>().map_err(|_| EngineError::Syntax {
                    recipe: line.to_string(),
                    message: "non-numeric field".into(),
                })
            };
            let r = parse_field(fields[0])? as usize;
            let c = parse_field(fields[1])? as usize;
            let v = parse_field(fields[2])? as u32;
            let mflops = parse_field(fields[3])?;
            if v != value_tag {
                continue;
            }
            if r >= 1 && r <= r_max && c >= 1 && c <= c_max {
                values[(r - 1) * c_max + (c - 1)] = mflops;
            }
        }
        Self::from_table(r_max, c_max, values)
    }

    pub fn get(&self, r: usize, c: usize) -> Precision {
        self.values[(r - 1) * self.c_max + (c - 1)]
    }

    pub fn r_max(&self) -> usize {
        self.r_max
    }

    pub fn c_max(&self) -> usize {
        self.c_max
    }
}

/// Observed or hinted call counts, keyed by kernel-id (e.g. `"spmv"`,
/// `"spmv_trans"`, `"ata"`).
#[derive(Debug, Clone, Default)]
pub struct Workload {
    weights: BTreeMap<String, Precision>,
}

impl Workload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weight(mut self, kernel_id: &str, weight: Precision) -> Self {
        self.weights.insert(kernel_id.to_string(), weight);
        self
    }

    pub fn weight(&self, kernel_id: &str) -> Precision {
        self.weights.get(kernel_id).copied().unwrap_or(0.0)
    }

    pub fn kernels(&self) -> impl Iterator<Item = &String> {
        self.weights.keys()
    }
}

/// The outcome of evaluating the heuristic: a chosen block size, the
/// kernels the tuned representation cannot serve (so the dispatcher must
/// fall back to the generic path for them), and the winning estimated
/// time, used only for logging.
#[derive(Debug, Clone)]
pub struct HeuristicDecision {
    pub r: usize,
    pub c: usize,
    pub disabled_kernels: Vec<String>,
    pub estimated_time: Precision,
}

/// Evaluate the heuristic over the fill table and register profiles,
/// returning the `(r, c)` minimizing estimated time, or
/// [`EngineError::TuneNotApplicable`] if this matrix's shape isn't one the
/// engine's fused kernels support (symmetric/Hermitian half storage has no
/// fused register-blocked kernel in this implementation, so the heuristic
/// declines and the tuner moves on, spec.md §4.5).
pub fn evaluate(
    csr: &CsrMatrix<'_>,
    fill: &FillTable,
    profiles: &BTreeMap<String, RegisterProfile>,
    alternate_profiles: &BTreeMap<String, RegisterProfile>,
    workload: &Workload,
) -> Result<Option<HeuristicDecision>> {
    if csr.shape().is_symmetric_like() {
        log::debug!("register-blocking heuristic declines: matrix has symmetric/Hermitian shape");
        return Err(EngineError::TuneNotApplicable {
            heuristic: "register_blocking".into(),
        });
    }

    let mut best: Option<(usize, usize, Precision, Vec<String>)> = None;

    for r in 1..=fill.r_max() {
        for c in 1..=fill.c_max() {
            let fill_rc = fill.get(r, c);
            if !fill_rc.is_finite() {
                continue;
            }

            let mut total = 0.0;
            let mut disabled = Vec::new();

            for kernel in workload.kernels() {
                let weight = workload.weight(kernel);
                if weight <= 0.0 {
                    continue;
                }
                let fused = profiles.get(kernel).map(|p| p.get(r, c));
                let alt = alternate_profiles.get(kernel).map(|p| 0.5 * p.get(r, c));

                let (chosen_perf, alt_wins) = match (fused, alt) {
                    (Some(f), Some(a)) if a > f => (a, true),
                    (Some(f), _) => (f, false),
                    (None, Some(a)) => (a, true),
                    (None, None) => continue,
                };
                if alt_wins {
                    disabled.push(kernel.clone());
                }
                total += weight / chosen_perf;
            }

            let estimated_time = fill_rc * total;
            if best.as_ref().map_or(true, |(_, _, t, _)| estimated_time < *t) {
                best = Some((r, c, estimated_time, disabled));
            }
        }
    }

    Ok(best.map(|(r, c, estimated_time, disabled_kernels)| HeuristicDecision {
        r,
        c,
        disabled_kernels,
        estimated_time,
    }))
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn symmetric_matrix_is_not_applicable() {
        let props = crate::csr::AssertedProperties {
            shape: crate::types::StoredShape::SymmetricLower,
            ..Default::default()
        };
        let a = CsrMatrix::from_owned(alloc::vec![0, 0], alloc::vec![], alloc::vec![], 1, 1, props, true).unwrap();
        let fill = crate::fill::estimate_fill(&a, 2, 2, 1.0, 1);
        let profiles = BTreeMap::new();
        let alt = BTreeMap::new();
        let workload = Workload::new().with_weight("spmv", 1.0);
        let err = evaluate(&a, &fill, &profiles, &alt, &workload).unwrap_err();
        assert!(err.is_tune_skip());
    }

    #[test]
    fn picks_block_size_minimizing_estimated_time() {
        let a = CsrMatrix::from_triplets(&[(0, 0, 1.0), (0, 1, 2.0), (1, 0, 3.0), (1, 1, 4.0)], 2, 2).unwrap();
        let fill = crate::fill::estimate_fill(&a, 2, 2, 1.0, 9);

        let mut profiles = BTreeMap::new();
        // (2,2) has much better throughput than (1,1).
        profiles.insert(
            "spmv".to_string(),
            RegisterProfile::from_table(2, 2, alloc::vec![100.0, 100.0, 100.0, 800.0]).unwrap(),
        );
        let alt = BTreeMap::new();
        let workload = Workload::new().with_weight("spmv", 1.0);

        let decision = evaluate(&a, &fill, &profiles, &alt, &workload).unwrap().unwrap();
        assert_eq!((decision.r, decision.c), (2, 2));
    }

    #[test]
    fn parses_register_profile_text() {
        let text = "# comment\n1 1 1 100.0\n2 2 1 400.0\n1 1 2 50.0\n";
        let profile = RegisterProfile::parse(text, 2, 2, 1).unwrap();
        assert_eq!(profile.get(1, 1), 100.0);
        assert_eq!(profile.get(2, 2), 400.0);
    }
}
