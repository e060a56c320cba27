//! Whole-dataset passes run once per document, after every page has been
//! consumed. Each pass is its own named function so the layout heuristics
//! stay visible and testable on their own.

use std::collections::HashMap;

use super::cells::{derive_tot_tipo, repair_mojibake};
use super::record::{DetailRecord, NormalRecord};

/// Run all passes in order and produce the final typed records.
pub fn run(records: Vec<DetailRecord>) -> Vec<NormalRecord> {
    let mut records = restore_order(records);
    reverse_def_runs(&mut records);
    repair_text(&mut records);
    let mut out = coerce_metrics(&records);
    backfill_tot_tipo(&mut out);
    out
}

/// Restore original appearance order. Accumulation order (blocks, hole
/// fills, totals patches) never leaks into the output.
pub(crate) fn restore_order(mut records: Vec<DetailRecord>) -> Vec<DetailRecord> {
    records.sort_by_key(|r| r.order);
    records
}

/// Observed-source heuristic: when a professor mixes INT and DEF rows, the
/// claves inside each contiguous DEF run arrive in reverse order. Flip the
/// clave values back; every other field stays put. Runs of one are left
/// alone, as are professors without both segments.
pub(crate) fn reverse_def_runs(records: &mut [DetailRecord]) {
    let mut seen: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, r) in records.iter().enumerate() {
        if !groups.contains_key(&r.no_prof) {
            seen.push(r.no_prof.clone());
        }
        groups.entry(r.no_prof.clone()).or_default().push(i);
    }

    for no in &seen {
        let idxs = &groups[no];
        let cats: Vec<String> = idxs
            .iter()
            .map(|&i| records[i].categoria.to_uppercase())
            .collect();
        let has_int = cats.iter().any(|c| c.contains("INT"));
        let has_def = cats.iter().any(|c| c.contains("DEF"));
        if !(has_int && has_def) {
            continue;
        }

        let is_def: Vec<bool> = cats.iter().map(|c| c.contains("DEF")).collect();
        let mut run_start: Option<usize> = None;
        // Trailing sentinel closes a run ending on the last row.
        for k in 0..=is_def.len() {
            let flag = k < is_def.len() && is_def[k];
            if flag {
                run_start.get_or_insert(k);
            } else if let Some(start) = run_start.take() {
                let run = &idxs[start..k];
                if run.len() > 1 {
                    let mut claves: Vec<String> =
                        run.iter().map(|&i| records[i].clave_asig.clone()).collect();
                    claves.reverse();
                    for (&i, clave) in run.iter().zip(claves) {
                        records[i].clave_asig = clave;
                    }
                }
            }
        }
    }
}

/// Best-effort repair of latin1/UTF-8 mis-decoding in the main text fields.
pub(crate) fn repair_text(records: &mut [DetailRecord]) {
    for r in records {
        r.asignatura = repair_mojibake(&r.asignatura);
        r.profesor = repair_mojibake(&r.profesor);
        r.categoria = repair_mojibake(&r.categoria);
    }
}

/// Coerce the 12 metric fields to numbers; anything non-numeric is missing.
pub(crate) fn coerce_metrics(records: &[DetailRecord]) -> Vec<NormalRecord> {
    records
        .iter()
        .map(|r| NormalRecord {
            no_prof: r.no_prof.clone(),
            profesor: r.profesor.clone(),
            categoria: r.categoria.clone(),
            clave_asig: r.clave_asig.clone(),
            asignatura: r.asignatura.clone(),
            grupo_anterior: r.grupo_anterior.clone(),
            grupo_actual: r.grupo_actual.clone(),
            sem_ant_teo: parse_metric(&r.sem_ant_teo),
            sem_ant_pra: parse_metric(&r.sem_ant_pra),
            sem_ant_total: parse_metric(&r.sem_ant_total),
            sem_act_teo: parse_metric(&r.sem_act_teo),
            sem_act_pra: parse_metric(&r.sem_act_pra),
            sem_act_total: parse_metric(&r.sem_act_total),
            tot_tipo: r.tot_tipo.clone(),
            tot_sem_ant_teo: parse_metric(&r.tot_sem_ant_teo),
            tot_sem_ant_pra: parse_metric(&r.tot_sem_ant_pra),
            tot_sem_ant_total: parse_metric(&r.tot_sem_ant_total),
            tot_sem_act_teo: parse_metric(&r.tot_sem_act_teo),
            tot_sem_act_pra: parse_metric(&r.tot_sem_act_pra),
            tot_sem_act_total: parse_metric(&r.tot_sem_act_total),
        })
        .collect()
}

fn parse_metric(s: &str) -> Option<f64> {
    let t = s.trim();
    if t.is_empty() {
        return None;
    }
    t.parse::<f64>().ok()
}

/// Fill the derived type tag from the category wherever totals application
/// left it empty. Already-assigned tags are respected.
pub(crate) fn backfill_tot_tipo(records: &mut [NormalRecord]) {
    for r in records {
        if r.tot_tipo.is_empty() {
            r.tot_tipo = derive_tot_tipo(&r.categoria).to_string();
        }
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(no: &str, cat: &str, clave: &str, order: u64) -> DetailRecord {
        DetailRecord {
            no_prof: no.to_string(),
            categoria: cat.to_string(),
            clave_asig: clave.to_string(),
            order,
            ..Default::default()
        }
    }

    #[test]
    fn order_restored_and_stable() {
        let records = vec![rec("1", "", "b", 2), rec("1", "", "a", 0), rec("1", "", "c", 1)];
        let sorted = restore_order(records);
        let claves: Vec<&str> = sorted.iter().map(|r| r.clave_asig.as_str()).collect();
        assert_eq!(claves, vec!["a", "c", "b"]);

        // Sorting a sorted sequence is a fixed point.
        let again = restore_order(sorted.clone());
        assert_eq!(again, sorted);
    }

    #[test]
    fn def_runs_reversed_only_with_both_segments() {
        let int = "PROF ASIG A INT.";
        let def = "PROF ASIG B DEF.";
        let mut records = vec![
            rec("1", int, "100", 0),
            rec("1", def, "200", 1),
            rec("1", def, "300", 2),
            rec("1", int, "400", 3),
            rec("1", def, "500", 4),
        ];
        reverse_def_runs(&mut records);
        let claves: Vec<&str> = records.iter().map(|r| r.clave_asig.as_str()).collect();
        // The two-row DEF run flips; the lone trailing DEF row does not.
        assert_eq!(claves, vec!["100", "300", "200", "400", "500"]);
    }

    #[test]
    fn def_only_professor_untouched() {
        let def = "PROF ASIG B DEF.";
        let mut records = vec![rec("1", def, "100", 0), rec("1", def, "200", 1)];
        reverse_def_runs(&mut records);
        let claves: Vec<&str> = records.iter().map(|r| r.clave_asig.as_str()).collect();
        assert_eq!(claves, vec!["100", "200"]);
    }

    #[test]
    fn def_runs_are_per_professor() {
        let int = "PROF ASIG A INT.";
        let def = "PROF ASIG B DEF.";
        let mut records = vec![
            // Professor 1 has both segments; professor 2 is DEF-only.
            rec("1", int, "100", 0),
            rec("1", def, "200", 1),
            rec("1", def, "300", 2),
            rec("2", def, "900", 3),
            rec("2", def, "901", 4),
        ];
        reverse_def_runs(&mut records);
        let claves: Vec<&str> = records.iter().map(|r| r.clave_asig.as_str()).collect();
        assert_eq!(claves, vec!["100", "300", "200", "900", "901"]);
    }

    #[test]
    fn metrics_coerced() {
        let mut r = rec("1", "", "", 0);
        r.sem_ant_teo = "3".into();
        r.sem_ant_pra = "3.5".into();
        r.sem_ant_total = "6,5".into();
        r.sem_act_teo = "".into();
        r.sem_act_pra = "N/A".into();
        let out = coerce_metrics(&[r]);
        assert_eq!(out[0].sem_ant_teo, Some(3.0));
        assert_eq!(out[0].sem_ant_pra, Some(3.5));
        // Comma decimals only survive the splitter's normalization; a raw
        // comma here is non-numeric, hence missing.
        assert_eq!(out[0].sem_ant_total, None);
        assert_eq!(out[0].sem_act_teo, None);
        assert_eq!(out[0].sem_act_pra, None);
    }

    #[test]
    fn tot_tipo_backfilled_where_empty() {
        let mut out = coerce_metrics(&[
            rec("1", "PROF ASIG A INT.", "", 0),
            rec("1", "PROF ASIG B DEF.", "", 1),
            rec("1", "TITULAR", "", 2),
        ]);
        out[1].tot_tipo = "INTERINO".into(); // assigned during totals: kept
        backfill_tot_tipo(&mut out);
        assert_eq!(out[0].tot_tipo, "INTERINO");
        assert_eq!(out[1].tot_tipo, "INTERINO");
        assert_eq!(out[2].tot_tipo, "");

        // Back-filling again changes nothing.
        let snapshot = out.clone();
        backfill_tot_tipo(&mut out);
        assert_eq!(out, snapshot);
    }

    #[test]
    fn text_repaired_in_place() {
        let mut r = rec("1", "", "", 0);
        r.asignatura = "DISE\u{C3}\u{91}O".into();
        r.profesor = "GARCIA".into();
        let mut records = vec![r];
        repair_text(&mut records);
        assert_eq!(records[0].asignatura, "DISEÑO");
        assert_eq!(records[0].profesor, "GARCIA");
    }

    #[test]
    fn full_run_orders_and_types() {
        let mut a = rec("1", "PROF ASIG A INT.", "1111", 1);
        a.sem_ant_teo = "2".into();
        let b = rec("1", "PROF ASIG A INT.", "2222", 0);
        let out = run(vec![a, b]);
        assert_eq!(out[0].clave_asig, "2222");
        assert_eq!(out[1].clave_asig, "1111");
        assert_eq!(out[1].sem_ant_teo, Some(2.0));
        assert_eq!(out[0].tot_tipo, "INTERINO");
    }
}
