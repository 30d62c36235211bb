//! Model-level checks against a brute-force reference. Candidate codon
//! choices are turned into full assignments and checked against the
//! generated constraints, so no external solver is needed.

use decode::codon_table::CodonTable;
use decode::design::decode_outcome;
use decode::ilp::{BinEdges, LibraryModel, SizeRegime, VarLayout};
use decode::solver::{SolveStatus, SolverOutcome};
use decode::{build_library_model, encode, Alignment, EncodedTargets, LibraryParams};
use std::collections::HashMap;
use std::io::Write;
use std::time::Duration;

const TOL: f64 = 1e-6;

fn params(lib_limit: u64, n_sublibs: usize) -> LibraryParams {
    LibraryParams {
        lib_limit,
        n_sublibs,
        bins: 100,
        approximate: false,
    }
}

fn log_size(table: &CodonTable, row: &[usize]) -> f64 {
    row.iter().map(|&c| f64::from(table.class(c).size()).ln()).sum()
}

/// Complete a codon selection into an assignment of every model variable.
fn derive_assignment(
    targets: &EncodedTargets,
    table: &CodonTable,
    model: &LibraryModel,
    selection: &[Vec<usize>],
) -> HashMap<String, f64> {
    let l: &VarLayout = &model.layout;
    let mut a = HashMap::new();
    for (s, row) in selection.iter().enumerate() {
        for (p, &c) in row.iter().enumerate() {
            a.insert(l.codon(s, p, c), 1.0);
        }
        if let SizeRegime::Binned(edges) = &model.regime {
            if let Some(k) = edges.bin_for(log_size(table, row)) {
                a.insert(l.bin(s, k), 1.0);
            }
        }
    }
    for i in 0..l.n_targets {
        let mut any = false;
        for (s, row) in selection.iter().enumerate() {
            let hit = row
                .iter()
                .enumerate()
                .all(|(p, &c)| table.class(c).coverage[targets.residue(i, p)]);
            if hit {
                a.insert(l.matched(i, s), 1.0);
                any = true;
            }
        }
        if any {
            a.insert(l.target(i), 1.0);
        }
    }
    a
}

/// Best coverage of a one-position, one-sub-library instance by enumeration.
fn reference_optimum(targets: &EncodedTargets, table: &CodonTable, lib_limit: u64) -> usize {
    (0..table.len())
        .filter(|&c| u64::from(table.class(c).size()) <= lib_limit)
        .map(|c| {
            (0..targets.n_targets())
                .filter(|&i| table.class(c).coverage[targets.residue(i, 0)])
                .count()
        })
        .max()
        .unwrap_or(0)
}

/// Best objective over all feasible derived assignments.
fn model_optimum(targets: &EncodedTargets, table: &CodonTable, model: &LibraryModel) -> usize {
    let mut best = 0;
    for c in 0..table.len() {
        let a = derive_assignment(targets, table, model, &[vec![c]]);
        let feasible = model.ilp.violations(&a, TOL).is_empty();
        assert_eq!(
            feasible,
            u64::from(table.class(c).size()) <= model.lib_limit,
            "class {c} feasibility disagrees with its size"
        );
        if feasible {
            best = best.max(model.ilp.objective_value(&a).round() as usize);
        }
    }
    best
}

fn outcome(assignments: HashMap<String, f64>) -> SolverOutcome {
    SolverOutcome {
        status: SolveStatus::Optimal,
        objective: None,
        assignments,
        solve_time: Duration::from_millis(1),
    }
}

#[test]
fn exhaustive_single_position_matches_reference() {
    let table = CodonTable::standard();
    let targets = encode(&Alignment::from_sequences(&["MAC", "MAD", "MAE", "MAW", "MAK"])).unwrap();
    assert_eq!(targets.variable_positions, vec![2]);
    for lim in [1, 2, 4, 6] {
        let model = build_library_model(&targets, &params(lim, 1), table).unwrap();
        assert_eq!(
            model_optimum(&targets, table, &model),
            reference_optimum(&targets, table, lim),
            "lib_limit {lim}"
        );
    }
}

#[test]
fn unit_budget_covers_one_target() {
    let table = CodonTable::standard();
    let targets = encode(&Alignment::from_sequences(&["AC", "AD"])).unwrap();
    let model = build_library_model(&targets, &params(1, 1), table).unwrap();
    assert_eq!(model_optimum(&targets, table, &model), 1);
}

#[test]
fn coverage_is_monotone_in_budget() {
    let table = CodonTable::standard();
    let targets = encode(&Alignment::from_sequences(&["C", "D", "G", "Y", "W", "F"])).unwrap();
    let mut last = 0;
    for lim in [1, 2, 3, 4, 8, 16, 64] {
        let model = build_library_model(&targets, &params(lim, 1), table).unwrap();
        let best = model_optimum(&targets, table, &model);
        assert!(best >= last, "coverage dropped from {last} to {best} at {lim}");
        last = best;
    }
    assert!(last >= 2);
}

#[test]
fn two_targets_share_one_degenerate_codon() {
    let table = CodonTable::standard();
    let targets = encode(&Alignment::from_sequences(&["AC", "AD"])).unwrap();
    let model = build_library_model(&targets, &params(1_000, 1), table).unwrap();
    // no codon reaches exactly {C, D}; take the smallest superset
    assert_eq!(table.class_for(b"CD"), None);
    let cd = (0..table.len())
        .filter(|&c| {
            let cov = &table.class(c).coverage;
            (0..2).all(|i| cov[targets.residue(i, 0)])
        })
        .min_by_key(|&c| table.class(c).size())
        .unwrap();
    let a = derive_assignment(&targets, table, &model, &[vec![cd]]);
    assert!(model.ilp.violations(&a, TOL).is_empty());

    let rec = decode_outcome(&targets, &model, &outcome(a), table).unwrap();
    assert_eq!(rec.n_covered, 2);
    assert_eq!(rec.in_library, vec![true, true]);
    assert!(rec.total_lib_size >= 2);
}

#[test]
fn exact_size_sums_logs_across_positions() {
    let table = CodonTable::standard();
    let targets = encode(&Alignment::from_sequences(&["MGA", "MWD", "MGV"])).unwrap();
    assert_eq!(targets.n_var_pos(), 2);

    // KGG -> {G, W}; GHT -> {A, D, V}
    let gw = table.class_for(b"GW").unwrap();
    let adv = table.class_for(b"ADV").unwrap();
    assert_eq!(table.class(gw).size(), 2);
    assert_eq!(table.class(adv).size(), 3);
    let selection = [vec![gw, adv]];

    let model = build_library_model(&targets, &params(5, 1), table).unwrap();
    assert_eq!(model.regime, SizeRegime::Exact);
    let a = derive_assignment(&targets, table, &model, &selection);
    assert_eq!(model.ilp.violations(&a, TOL), vec!["size_exact_0".to_string()]);

    let model = build_library_model(&targets, &params(6, 1), table).unwrap();
    let a = derive_assignment(&targets, table, &model, &selection);
    assert!(model.ilp.violations(&a, TOL).is_empty());
    assert_eq!(model.ilp.objective_value(&a).round() as usize, 3);
}

#[test]
fn one_sublibrary_per_target_covers_all() {
    let table = CodonTable::standard();
    let seqs = ["AC", "AD", "AW"];
    let targets = encode(&Alignment::from_sequences(&seqs)).unwrap();
    let model = build_library_model(&targets, &params(3, 3), table).unwrap();
    assert!(matches!(model.regime, SizeRegime::Binned(_)));

    let selection: Vec<Vec<usize>> = [b'C', b'D', b'W']
        .iter()
        .map(|&r| vec![table.class_for(&[r]).unwrap()])
        .collect();
    let a = derive_assignment(&targets, table, &model, &selection);
    assert!(model.ilp.violations(&a, TOL).is_empty());
    assert_eq!(model.ilp.objective_value(&a).round() as usize, 3);

    let rec = decode_outcome(&targets, &model, &outcome(a), table).unwrap();
    assert_eq!(rec.n_covered, 3);
    assert_eq!(rec.total_lib_size, 3);
    assert_eq!(rec.size_upper_bound, Some(3.0));
    assert!((rec.on_target_p - 1.0).abs() < 1e-12);
    assert_eq!(rec.parsed_lib.len(), 3);
}

#[test]
fn binned_bound_dominates_true_size() {
    let table = CodonTable::standard();
    let targets = encode(&Alignment::from_sequences(&["MCC", "MDD", "MCD", "MWW"])).unwrap();
    let lim = 40;
    let model = build_library_model(&targets, &params(lim, 2), table).unwrap();
    let SizeRegime::Binned(edges) = &model.regime else {
        panic!("expected binned size constraint");
    };
    assert_eq!(edges.len(), 40);

    let cd = (0..table.len())
        .filter(|&c| table.class(c).coverage[targets.residue(0, 0)] && table.class(c).coverage[targets.residue(1, 0)])
        .min_by_key(|&c| table.class(c).size())
        .unwrap();
    let w = table.class_for(b"W").unwrap();
    let selection = vec![vec![cd, cd], vec![w, w]];
    let a = derive_assignment(&targets, table, &model, &selection);
    assert!(model.ilp.violations(&a, TOL).is_empty(), "{:?}", model.ilp.violations(&a, TOL));

    let rec = decode_outcome(&targets, &model, &outcome(a), table).unwrap();
    assert_eq!(rec.n_covered, 4);
    let bound = rec.size_upper_bound.unwrap();
    assert!(rec.total_lib_size as f64 <= bound + TOL);
    assert!(bound <= lim as f64 + TOL);
}

#[test]
fn oversized_binned_choice_is_rejected() {
    let table = CodonTable::standard();
    let targets = encode(&Alignment::from_sequences(&["AC", "AD"])).unwrap();
    let model = build_library_model(&targets, &params(4, 2), table).unwrap();
    let nnn = (0..table.len()).max_by_key(|&c| table.class(c).size()).unwrap();
    let m = table.class_for(b"M").unwrap();
    let a = derive_assignment(&targets, table, &model, &[vec![nnn], vec![m]]);
    assert!(!model.ilp.violations(&a, TOL).is_empty());
}

#[test]
fn bin_edges_cover_log_budget() {
    let edges = BinEdges::new(1_000, 10).unwrap();
    assert_eq!(edges.lower[0], 0.0);
    assert!((edges.upper[9] - 1_000f64.ln()).abs() < 1e-12);
    for k in 1..edges.len() {
        assert_eq!(edges.lower[k], edges.upper[k - 1]);
    }
    assert_eq!(edges.bin_for(0.0), Some(0));
    assert_eq!(edges.bin_for(1_001f64.ln()), None);
}

#[test]
fn fasta_alignment_from_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, ">wt\nMKAC\n>v1\nMKAD\n>v2\nMRAD").unwrap();
    let aln = Alignment::read(file.path(), decode::AlignmentFormat::Fasta).unwrap();
    assert_eq!(aln.ids, vec!["wt", "v1", "v2"]);
    let targets = encode(&aln).unwrap();
    assert_eq!(targets.variable_positions, vec![1, 3]);
    assert_eq!(targets.sequences, vec!["KC", "KD", "RD"]);

    let model = build_library_model(&targets, &params(100, 1), CodonTable::standard()).unwrap();
    let lp = model.to_lp();
    assert!(lp.contains("Binaries") || lp.contains("Binary"));
    assert!(lp.contains("t_2"));
}
