use std::fmt::Write;

use crate::data_types::fold_results::{AlifoldReport, EnsembleReport, FoldReport, SuboptReport};
use crate::data_types::structure::Structure;

/// Threshold used by the pseudo-bracket notation to call a position
const SYMBOL_THRESHOLD: f64 = 0.667;

/// Standard `structure ( energy)` line
pub fn format_energy_line(structure: &Structure, energy: f64) -> String {
    format!("{structure} ({energy:6.2})")
}

/// Condenses pair probabilities into one character per position.
/// `.`, `(`, `)` mark positions that are unpaired, paired downstream, or paired upstream with p > 2/3;
/// `{`, `}`, `|` mark mostly paired positions; `,` and `:` mark mostly or weakly unpaired ones.
/// # Arguments
/// * `length` - sequence length
/// * `pair_probabilities` - (i, j, p) with 0-based positions and i < j
pub fn probability_symbols(length: usize, pair_probabilities: &[(usize, usize, f64)]) -> String {
    // probability of being paired with a partner downstream, resp. upstream
    let mut downstream = vec![0.0; length];
    let mut upstream = vec![0.0; length];
    for &(i, j, p) in pair_probabilities.iter() {
        downstream[i] += p;
        upstream[j] += p;
    }

    downstream.iter().zip(upstream.iter())
        .map(|(&down, &up)| {
            let unpaired = (1.0 - down - up).max(0.0);
            if unpaired > SYMBOL_THRESHOLD {
                '.'
            } else if down > SYMBOL_THRESHOLD {
                '('
            } else if up > SYMBOL_THRESHOLD {
                ')'
            } else if down + up > unpaired {
                if down / (down + up) > SYMBOL_THRESHOLD {
                    '{'
                } else if up / (down + up) > SYMBOL_THRESHOLD {
                    '}'
                } else {
                    '|'
                }
            } else if unpaired > down + up {
                ','
            } else {
                ':'
            }
        })
        .collect()
}

/// Appends the ensemble block shared by single-sequence and alignment output
fn write_ensemble(output: &mut String, length: usize, ensemble: &EnsembleReport) -> std::fmt::Result {
    writeln!(output, "{} [{:6.2}]", probability_symbols(length, &ensemble.pair_probabilities), ensemble.stats.ensemble_energy)?;
    writeln!(output, "{} {{{:6.2} d={:.2}}}", ensemble.centroid.structure, ensemble.centroid.energy, ensemble.centroid.distance)?;
    writeln!(output, "{} {{{:6.2} MEA={:.2}}}", ensemble.mea.structure, ensemble.mea.energy, ensemble.mea.expected_accuracy)?;
    writeln!(
        output, " frequency of mfe structure in ensemble {}; ensemble diversity {:.2}",
        format_frequency(ensemble.stats.mfe_frequency), ensemble.stats.diversity
    )?;
    for sample in ensemble.samples.iter() {
        writeln!(output, "{}", format_energy_line(&sample.structure, sample.energy))?;
    }
    Ok(())
}

/// Small frequencies switch to scientific notation
fn format_frequency(frequency: f64) -> String {
    if frequency >= 1e-3 {
        format!("{frequency:.4}")
    } else {
        format!("{frequency:.3e}")
    }
}

/// Renders a single-sequence result
pub fn format_fold_report(report: &FoldReport) -> String {
    let mut output = String::new();
    // writing to a String does not fail
    let _ = write_fold_report(&mut output, report);
    output
}

fn write_fold_report(output: &mut String, report: &FoldReport) -> std::fmt::Result {
    writeln!(output, ">{}", report.name)?;
    writeln!(output, "{}", report.sequence)?;
    writeln!(output, "{}", format_energy_line(&report.mfe.structure, report.mfe.energy))?;
    if let Some(ensemble) = report.ensemble.as_ref() {
        write_ensemble(output, report.sequence.len(), ensemble)?;
    }
    Ok(())
}

/// Renders suboptimal structures with the MFE and band in the header line
pub fn format_subopt_report(report: &SuboptReport) -> String {
    let mut output = String::new();
    let _ = write_subopt_report(&mut output, report);
    output
}

fn write_subopt_report(output: &mut String, report: &SuboptReport) -> std::fmt::Result {
    writeln!(output, ">{}", report.name)?;
    let mfe = report.structures.first().map(|s| s.energy).unwrap_or_default();
    writeln!(output, "{} {:6.2} {:6.2}", report.sequence, mfe, report.delta)?;
    for scored in report.structures.iter() {
        writeln!(output, "{} {:6.2}", scored.structure, scored.energy)?;
    }
    Ok(())
}

/// Renders a consensus result; the energy is split into free energy and covariance
pub fn format_alifold_report(report: &AlifoldReport) -> String {
    let mut output = String::new();
    let _ = write_alifold_report(&mut output, report);
    output
}

fn write_alifold_report(output: &mut String, report: &AlifoldReport) -> std::fmt::Result {
    writeln!(output, "{}", report.consensus)?;
    writeln!(
        output, "{} ({:6.2} = {:6.2} + {:6.2})",
        report.mfe.structure, report.mfe.energy, report.free_energy, report.covariance
    )?;
    if let Some(ensemble) = report.ensemble.as_ref() {
        write_ensemble(output, report.consensus.len(), ensemble)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::fold_results::ScoredStructure;
    use crate::energy::loops::Dangles;
    use crate::fold_solver::{solve_fold_record, FoldConfigBuilder};

    #[test]
    fn test_energy_line() {
        let structure = Structure::from_dot_bracket("(((...)))").unwrap();
        assert_eq!(format_energy_line(&structure, -1.2), "(((...))) ( -1.20)");
        assert_eq!(format_energy_line(&structure, 12.345), "(((...))) ( 12.35)");
    }

    #[test]
    fn test_probability_symbols() {
        assert_eq!(probability_symbols(5, &[(0, 4, 0.9)]), "(...)");
        assert_eq!(probability_symbols(5, &[(0, 4, 0.6), (1, 4, 0.1)]), "{...)");
        assert_eq!(probability_symbols(4, &[(0, 3, 0.4), (0, 2, 0.2)]), "{..,");
        assert_eq!(probability_symbols(4, &[(0, 3, 0.5)]), ":..:");
        assert_eq!(probability_symbols(5, &[(0, 2, 0.4), (2, 4, 0.4)]), ",.|.,");
        assert_eq!(probability_symbols(0, &[]), "");
    }

    #[test]
    fn test_fold_report() {
        let config = FoldConfigBuilder::default()
            .dangles(Dangles::None)
            .build().unwrap();
        let report = solve_fold_record("hairpin", b"GGGAAACCC", config).unwrap();
        assert_eq!(format_fold_report(&report), ">hairpin\nGGGAAACCC\n(((...))) ( -1.20)\n");

        let config = FoldConfigBuilder::default()
            .enable_partition(true)
            .num_samples(2)
            .build().unwrap();
        let report = solve_fold_record("hairpin", b"GGGAAACCC", config).unwrap();
        let output = format_fold_report(&report);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 9);
        assert!(lines[3].ends_with(']'));
        assert!(lines[4].contains(" d="));
        assert!(lines[5].contains(" MEA="));
        assert!(lines[6].starts_with(" frequency of mfe structure in ensemble"));
    }

    #[test]
    fn test_subopt_report() {
        let report = SuboptReport {
            name: "mock".to_string(),
            sequence: "GGGAAACCC".to_string(),
            delta: 1.0,
            structures: vec![
                ScoredStructure::new(Structure::from_dot_bracket("(((...)))").unwrap(), -1.2),
                ScoredStructure::new(Structure::unpaired(9), 0.0)
            ]
        };
        assert_eq!(
            format_subopt_report(&report),
            ">mock\nGGGAAACCC  -1.20   1.00\n(((...)))  -1.20\n.........   0.00\n"
        );
    }

    #[test]
    fn test_frequency() {
        assert_eq!(format_frequency(0.5), "0.5000");
        assert_eq!(format_frequency(0.00012), "1.200e-4");
    }
}
