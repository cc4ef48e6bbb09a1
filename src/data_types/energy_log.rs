use anyhow::{bail, ensure, Context};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::data_types::structure::Structure;
use crate::energy::eval::{EnergyEvaluation, LoopKind};
use crate::energy::model::LoopEnergyModel;

/// A pair as it appears in an energy log
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LoggedPair {
    /// 0-based 5' position
    pub i: usize,
    /// 0-based 3' position
    pub j: usize,
    /// Two letter label such as "GC"
    pub label: String
}

impl fmt::Display for LoggedPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // logs are 1-based
        write!(f, "({},{}) {}", self.i + 1, self.j + 1, self.label)
    }
}

impl FromStr for LoggedPair {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let Some(inner) = s.strip_prefix('(') else {
            bail!("Pair must start with '(': {s:?}");
        };
        let Some((positions, label)) = inner.split_once(')') else {
            bail!("Pair is missing ')': {s:?}");
        };
        let Some((i, j)) = positions.split_once(',') else {
            bail!("Pair is missing ',': {s:?}");
        };
        let i: usize = i.trim().parse().with_context(|| format!("Invalid position in {s:?}"))?;
        let j: usize = j.trim().parse().with_context(|| format!("Invalid position in {s:?}"))?;
        ensure!(i > 0 && j > 0, "Positions are 1-based: {s:?}");
        Ok(LoggedPair {
            i: i - 1,
            j: j - 1,
            label: label.trim().to_string()
        })
    }
}

/// One loop line of an energy log
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LoggedLoop {
    pub kind: LoopKind,
    /// `None` for the exterior loop
    pub closing: Option<LoggedPair>,
    /// Branches enclosed by the loop
    pub inner: Vec<LoggedPair>,
    /// Energy in kcal/mol
    pub energy: f64
}

/// Plain-text, loop-by-loop energy breakdown of one structure.
/// ```text
/// # name: hairpin
/// # sequence: GGGAAACCC
/// # structure: (((...)))
/// External loop -; (1,9) GC : 0.00
/// Stack loop (1,9) GC; (2,8) GC : -3.30
/// Stack loop (2,8) GC; (3,7) GC : -3.30
/// Hairpin loop (3,7) GC : 5.40
/// # total: -1.20 kcal/mol
/// ```
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EnergyLog {
    pub name: String,
    /// The sequence, or the consensus sequence of an alignment
    pub sequence: String,
    pub structure: Structure,
    pub loops: Vec<LoggedLoop>,
    /// Total energy in kcal/mol
    pub total: f64
}

impl EnergyLog {
    /// Converts a loop decomposition into a log
    /// # Arguments
    /// * `name` - label for the record
    /// * `sequence` - the sequence (or consensus) the structure belongs to
    /// * `structure` - the evaluated structure
    /// * `evaluation` - the loop decomposition of `structure`
    /// * `model` - the model that produced `evaluation`, for pair labels and units
    pub fn from_evaluation(name: &str, sequence: &str, structure: &Structure, evaluation: &EnergyEvaluation, model: &impl LoopEnergyModel) -> Self {
        let logged_pair = |(i, j): (usize, usize)| LoggedPair { i, j, label: model.pair_label(i, j) };
        let loops = evaluation.contributions.iter()
            .map(|c| LoggedLoop {
                kind: c.kind,
                closing: c.closing.map(logged_pair),
                inner: c.inner.iter().copied().map(logged_pair).collect(),
                energy: model.to_kcal(c.energy)
            })
            .collect();

        Self {
            name: name.to_string(),
            sequence: sequence.to_string(),
            structure: structure.clone(),
            loops,
            total: model.to_kcal(evaluation.total)
        }
    }

    /// Sum over all loop energies, which should match `total` up to rounding in the text form
    pub fn loop_sum(&self) -> f64 {
        self.loops.iter().map(|l| l.energy).sum()
    }
}

impl fmt::Display for EnergyLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# name: {}", self.name)?;
        writeln!(f, "# sequence: {}", self.sequence)?;
        writeln!(f, "# structure: {}", self.structure)?;
        for logged_loop in self.loops.iter() {
            write!(f, "{} loop ", logged_loop.kind)?;
            match logged_loop.closing.as_ref() {
                Some(pair) => write!(f, "{pair}")?,
                None => write!(f, "-")?
            };
            for pair in logged_loop.inner.iter() {
                write!(f, "; {pair}")?;
            }
            writeln!(f, " : {:.2}", logged_loop.energy)?;
        }
        writeln!(f, "# total: {:.2} kcal/mol", self.total)
    }
}

impl FromStr for EnergyLog {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut name = None;
        let mut sequence = None;
        let mut structure = None;
        let mut total = None;
        let mut loops = vec![];

        for (line_index, line) in s.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let line_number = line_index + 1;

            if let Some(header) = line.strip_prefix('#') {
                let Some((key, value)) = header.split_once(':') else {
                    bail!("Line {line_number}: header without ':'");
                };
                let value = value.trim();
                match key.trim() {
                    "name" => name = Some(value.to_string()),
                    "sequence" => sequence = Some(value.to_string()),
                    "structure" => structure = Some(Structure::from_dot_bracket(value)
                        .with_context(|| format!("Line {line_number}: invalid structure"))?),
                    "total" => {
                        let value = value.trim_end_matches("kcal/mol").trim();
                        total = Some(value.parse::<f64>()
                            .with_context(|| format!("Line {line_number}: invalid total {value:?}"))?);
                    },
                    other => bail!("Line {line_number}: unknown header {other:?}")
                };
                continue;
            }

            let Some((description, energy)) = line.rsplit_once(" : ") else {
                bail!("Line {line_number}: missing energy");
            };
            let energy: f64 = energy.trim().parse()
                .with_context(|| format!("Line {line_number}: invalid energy {energy:?}"))?;
            let Some((kind, pairs)) = description.split_once(" loop ") else {
                bail!("Line {line_number}: missing loop type");
            };
            let kind = LoopKind::from_str(kind.trim())
                .with_context(|| format!("Line {line_number}: unknown loop type {kind:?}"))?;

            let mut pair_fields = pairs.split(';').map(|p| p.trim());
            let closing = match pair_fields.next() {
                Some("-") | None => None,
                Some(p) => Some(p.parse::<LoggedPair>().with_context(|| format!("Line {line_number}"))?)
            };
            let inner = pair_fields
                .map(|p| p.parse::<LoggedPair>())
                .collect::<anyhow::Result<Vec<LoggedPair>>>()
                .with_context(|| format!("Line {line_number}"))?;

            loops.push(LoggedLoop { kind, closing, inner, energy });
        }

        let Some(structure) = structure else {
            bail!("Energy log is missing the structure header");
        };
        let Some(total) = total else {
            bail!("Energy log is missing the total");
        };
        Ok(EnergyLog {
            name: name.unwrap_or_default(),
            sequence: sequence.unwrap_or_default(),
            structure,
            loops,
            total
        })
    }
}

#[cfg(test)]
mod tests {
    use approx_eq::assert_approx_eq;

    use super::*;
    use crate::data_types::nucleotides::encode_sequence;
    use crate::energy::eval::evaluate_structure;
    use crate::energy::loops::Dangles;
    use crate::energy::model::SequenceModel;
    use crate::energy::parameters::{EnergyParameters, MAXLOOP};

    fn hairpin_log() -> EnergyLog {
        let model = SequenceModel::new(encode_sequence(b"GGGAAACCC").unwrap(), EnergyParameters::default(), Dangles::None, MAXLOOP);
        let structure = Structure::from_dot_bracket("(((...)))").unwrap();
        let evaluation = evaluate_structure(&model, &structure).unwrap();
        EnergyLog::from_evaluation("hairpin", "GGGAAACCC", &structure, &evaluation, &model)
    }

    #[test]
    fn test_format() {
        let log = hairpin_log();
        let expected = "# name: hairpin
# sequence: GGGAAACCC
# structure: (((...)))
External loop -; (1,9) GC : 0.00
Stack loop (1,9) GC; (2,8) GC : -3.30
Stack loop (2,8) GC; (3,7) GC : -3.30
Hairpin loop (3,7) GC : 5.40
# total: -1.20 kcal/mol
";
        assert_eq!(log.to_string(), expected);
    }

    #[test]
    fn test_parse_round_trip() {
        let log = hairpin_log();
        let parsed: EnergyLog = log.to_string().parse().unwrap();
        assert_eq!(parsed.name, log.name);
        assert_eq!(parsed.sequence, log.sequence);
        assert_eq!(parsed.structure, log.structure);
        assert_eq!(parsed.loops.len(), log.loops.len());
        for (a, b) in parsed.loops.iter().zip(log.loops.iter()) {
            assert_eq!(a.kind, b.kind);
            assert_eq!(a.closing, b.closing);
            assert_eq!(a.inner, b.inner);
        }
        assert_approx_eq!(parsed.total, -1.2);
        assert_approx_eq!(parsed.loop_sum(), -1.2);
    }

    #[test]
    fn test_parse_errors() {
        assert!("Stack loop (1,9) GC : -3.30\n".parse::<EnergyLog>().is_err());
        assert!("# structure: ((...))\nWeird loop - : 0.00\n# total: 0.00 kcal/mol\n".parse::<EnergyLog>().is_err());
        assert!("# structure: .....\nExternal loop - : zero\n# total: 0.00 kcal/mol\n".parse::<EnergyLog>().is_err());
        assert!("(0,4) GC".parse::<LoggedPair>().is_err());
        let pair: LoggedPair = "(3,7) GC".parse().unwrap();
        assert_eq!((pair.i, pair.j), (2, 6));
    }
}
