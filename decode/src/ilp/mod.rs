mod error;
mod generator;
mod linear;
mod logic;
mod size;

pub use error::ModelError;
pub use generator::VarLayout;
pub use linear::{emit_lp, Constraint, Ilp, LinearExpr, ObjSense, Sense};
pub use logic::{all_match, any_match};
pub use size::{BinEdges, SizeRegime, FIRST_BIN_LOWER};

use crate::codon_table::CodonTable;
use crate::encoder::EncodedTargets;
use generator::Generator;
use serde::{Deserialize, Serialize};

/// Structural parameters of a library model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryParams {
    /// Budget on the total number of sequences across sub-libraries.
    pub lib_limit: u64,
    pub n_sublibs: usize,
    /// Requested bin count for the approximate size constraint.
    pub bins: usize,
    /// Use binning even for a single sub-library.
    pub approximate: bool,
}

/// A formulated library model, ready for an LP-reading MIP solver.
#[derive(Clone, Debug)]
pub struct LibraryModel {
    pub ilp: Ilp,
    pub layout: VarLayout,
    pub regime: SizeRegime,
    pub lib_limit: u64,
}

impl LibraryModel {
    pub fn to_lp(&self) -> String {
        self.ilp.to_lp()
    }
}

/// Entry point: formulate the coverage-maximization model for `targets`.
pub fn build_library_model(
    targets: &EncodedTargets,
    params: &LibraryParams,
    table: &CodonTable,
) -> Result<LibraryModel, ModelError> {
    if params.n_sublibs == 0 {
        return Err(ModelError::NoSublibraries);
    }
    if targets.n_targets() == 0 {
        return Err(ModelError::NoTargets);
    }
    if table.is_empty() {
        return Err(ModelError::EmptyCodonTable);
    }
    let regime = SizeRegime::select(
        params.lib_limit,
        params.n_sublibs,
        params.bins,
        params.approximate,
    )?;

    let layout = VarLayout {
        n_targets: targets.n_targets(),
        n_var_pos: targets.n_var_pos(),
        n_classes: table.len(),
        n_sublibs: params.n_sublibs,
        n_bins: regime.n_bins(),
    };
    tracing::info!(
        "building model: {} targets, {} variable positions, {} codon classes, {} sub-libraries",
        layout.n_targets,
        layout.n_var_pos,
        layout.n_classes,
        layout.n_sublibs
    );

    let mut gen = Generator::new(targets, table, layout);
    gen.declare_binaries();

    // 1) one codon class per position
    gen.emit_one_codon_per_position();

    // 2) coverage logic
    gen.emit_and_constraints();
    gen.emit_or_constraints();

    // 3) size budget
    match &regime {
        SizeRegime::Exact => gen.emit_exact_size(params.lib_limit),
        SizeRegime::Binned(edges) => gen.emit_binned_size(params.lib_limit, edges),
    }

    gen.emit_objective();
    let (ilp, layout) = gen.finish();
    tracing::debug!(
        "model has {} binaries and {} constraints",
        ilp.binaries.len(),
        ilp.constraints.len()
    );

    Ok(LibraryModel {
        ilp,
        layout,
        regime,
        lib_limit: params.lib_limit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::Alignment;
    use crate::encoder::encode;

    fn params(lib_limit: u64, n_sublibs: usize) -> LibraryParams {
        LibraryParams {
            lib_limit,
            n_sublibs,
            bins: 100,
            approximate: false,
        }
    }

    #[test]
    fn test_model_dimensions_exact() {
        let targets = encode(&Alignment::from_sequences(&["AC", "AD"])).unwrap();
        let table = CodonTable::standard();
        let m = build_library_model(&targets, &params(1000, 1), table).unwrap();
        assert_eq!(m.regime, SizeRegime::Exact);
        assert_eq!(m.layout.n_bins, 0);
        // t, B, G
        assert_eq!(m.ilp.binaries.len(), 2 + 2 + table.len());
        let names: Vec<&str> = m.ilp.constraints.iter().map(|c| c.name.as_str()).collect();
        assert!(names.contains(&"onecodon_0_0"));
        assert!(names.contains(&"size_exact_0"));
        assert!(names.iter().any(|n| n.starts_with("and_1_0_")));
        assert!(names.iter().any(|n| n.starts_with("or_0_")));
        assert_eq!(m.ilp.sense, ObjSense::Maximize);
        assert_eq!(m.ilp.objective.terms.len(), 2);
    }

    #[test]
    fn test_model_binned_for_many_sublibs() {
        let targets = encode(&Alignment::from_sequences(&["AC", "AD", "AE"])).unwrap();
        let table = CodonTable::standard();
        let m = build_library_model(&targets, &params(8, 2), table).unwrap();
        assert_eq!(m.layout.n_bins, 8);
        assert!(m.ilp.binaries.contains("bin_1_7"));
        assert!(m.ilp.constraints.iter().any(|c| c.name == "size_total"));
        let lp = m.to_lp();
        assert!(lp.starts_with("Maximize"));
        assert!(lp.contains(" bin_lo_0: "));
    }

    #[test]
    fn test_huge_limit_is_written_exactly() {
        let targets = encode(&Alignment::from_sequences(&["AC", "AD"])).unwrap();
        let table = CodonTable::standard();
        let p = LibraryParams {
            lib_limit: u64::MAX,
            n_sublibs: 2,
            bins: 3,
            approximate: false,
        };
        let lp = build_library_model(&targets, &p, table).unwrap().to_lp();
        let total = lp.lines().find(|l| l.trim_start().starts_with("size_total:")).unwrap();
        assert!(total.ends_with("<= 18446744073709551616"), "{total}");
        assert!(!lp.contains("9223372036854775807"));
    }

    #[test]
    fn test_invalid_params() {
        let targets = encode(&Alignment::from_sequences(&["AC", "AD"])).unwrap();
        let table = CodonTable::standard();
        assert_eq!(
            build_library_model(&targets, &params(0, 1), table).err(),
            Some(ModelError::InvalidLimit(0))
        );
        assert_eq!(
            build_library_model(&targets, &params(10, 0), table).err(),
            Some(ModelError::NoSublibraries)
        );
    }
}
