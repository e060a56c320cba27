//! Row-reconstruction engine: folds the raw rows of a document, in page
//! order, into flat (professor, subject-assignment) records.
//!
//! The engine owns the record arena plus the active professor block (the
//! slots continuation and totals rows patch). One engine instance serves
//! exactly one document.

pub mod cells;
pub mod classify;
pub mod columns;
pub mod postprocess;
pub mod record;

use tracing::warn;

use crate::extract::{RawPage, RawRow};
use self::cells::{derive_tot_tipo, split_cell, split_lines, CellKind};
use self::classify::{classify, RowClass};
use self::columns::{detect_columns, ColumnMap, MappingError};
use self::record::{DetailRecord, NormalRecord};

/// Column positions a continuation row is read at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Alignment {
    Normal,
    /// Every field sits one column to the right of its mapped position; the
    /// last metric spills past the map entirely.
    ShiftedRight,
}

/// The ten splittable cell groups of a detail or continuation row.
struct RowValues {
    claves: Vec<String>,
    asigns: Vec<String>,
    gant: Vec<String>,
    gact: Vec<String>,
    ant_teo: Vec<String>,
    ant_pra: Vec<String>,
    ant_tot: Vec<String>,
    act_teo: Vec<String>,
    act_pra: Vec<String>,
    act_tot: Vec<String>,
}

impl RowValues {
    fn from_cells(raw: [&str; 10]) -> Self {
        RowValues {
            claves: split_cell(raw[0], CellKind::Clave),
            asigns: split_cell(raw[1], CellKind::Text),
            gant: split_cell(raw[2], CellKind::Grupo),
            gact: split_cell(raw[3], CellKind::Grupo),
            ant_teo: split_cell(raw[4], CellKind::Metric),
            ant_pra: split_cell(raw[5], CellKind::Metric),
            ant_tot: split_cell(raw[6], CellKind::Metric),
            act_teo: split_cell(raw[7], CellKind::Metric),
            act_pra: split_cell(raw[8], CellKind::Metric),
            act_tot: split_cell(raw[9], CellKind::Metric),
        }
    }

    /// Truncate or pad every list to exactly `k` values.
    fn fit(&mut self, k: usize) {
        for list in [
            &mut self.claves,
            &mut self.asigns,
            &mut self.gant,
            &mut self.gact,
            &mut self.ant_teo,
            &mut self.ant_pra,
            &mut self.ant_tot,
            &mut self.act_teo,
            &mut self.act_pra,
            &mut self.act_tot,
        ] {
            list.resize(k, String::new());
        }
    }
}

/// The field cells of one row, in field order (clave, asignatura, groups,
/// six metrics). The shifted alignment reads each field from the next
/// field's column.
fn field_cells<'a>(row: &'a RawRow, map: &ColumnMap, alignment: Alignment) -> [&'a str; 10] {
    match alignment {
        Alignment::Normal => [
            row.cell(map.clave),
            row.cell(map.asignatura),
            row.cell(map.grupo_anterior),
            row.cell(map.grupo_actual),
            row.cell(map.sem_ant_teo),
            row.cell(map.sem_ant_pra),
            row.cell(map.sem_ant_total),
            row.cell(map.sem_act_teo),
            row.cell(map.sem_act_pra),
            row.cell(map.sem_act_total),
        ],
        Alignment::ShiftedRight => [
            row.cell(map.asignatura),
            row.cell(map.grupo_anterior),
            row.cell(map.grupo_actual),
            row.cell(map.sem_ant_teo),
            row.cell(map.sem_ant_pra),
            row.cell(map.sem_ant_total),
            row.cell(map.sem_act_teo),
            row.cell(map.sem_act_pra),
            row.cell(map.sem_act_total),
            row.cell(map.sem_act_total + 1),
        ],
    }
}

/// Stateful reconstruction engine. Use one instance per document.
#[derive(Default)]
pub struct Normalizer {
    records: Vec<DetailRecord>,
    prof_no: String,
    prof_nombre: String,
    /// Arena indices of the records created since the last new-professor
    /// row; continuation and totals rows only ever touch these.
    prof_row_idxs: Vec<usize>,
    /// Guards against the same visual totals row being detected twice.
    last_tot_fingerprint: Option<String>,
    order_counter: u64,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one page in document order. Column mapping failures abort
    /// only this page; nothing is mutated before mapping succeeds.
    pub fn consume_page(&mut self, page: &RawPage) -> Result<(), MappingError> {
        if page.rows.is_empty() {
            return Ok(());
        }
        let map = detect_columns(&page.rows)?;

        for row in &page.rows {
            match classify(row, &map) {
                RowClass::Header | RowClass::Empty => {}
                RowClass::Totals { tipo } => self.apply_totals(row, &map, &tipo),
                RowClass::NewProfessor => {
                    self.start_new_prof(row.cell(map.no), row.cell(map.profesor));
                    // The row usually carries the professor's first
                    // assignments as well.
                    if !row.cell(map.clave).is_empty() || !row.cell(map.asignatura).is_empty() {
                        self.push_details(row, &map);
                    }
                }
                RowClass::ContRight => self.merge_continuation(row, &map, Alignment::Normal),
                RowClass::ContShifted => {
                    self.merge_continuation(row, &map, Alignment::ShiftedRight)
                }
                RowClass::Detail => self.push_details(row, &map),
            }
        }
        Ok(())
    }

    /// Run the whole-dataset passes and hand the records over.
    pub fn finish(self) -> Vec<NormalRecord> {
        postprocess::run(self.records)
    }

    fn next_order(&mut self) -> u64 {
        let current = self.order_counter;
        self.order_counter += 1;
        current
    }

    fn push_record(&mut self, rec: DetailRecord) {
        self.records.push(rec);
        self.prof_row_idxs.push(self.records.len() - 1);
    }

    fn start_new_prof(&mut self, no: &str, nombre: &str) {
        self.prof_row_idxs.clear();
        self.prof_no = no.to_string();
        self.prof_nombre = nombre.to_string();
        self.last_tot_fingerprint = None;
    }

    /// Emit K records for a detail row carrying K stacked claves.
    fn push_details(&mut self, row: &RawRow, map: &ColumnMap) {
        let mut v = RowValues::from_cells(field_cells(row, map, Alignment::Normal));
        let cat_lines = split_lines(row.cell(map.categoria));

        let k = v.claves.len().max(1);
        // A single subject name spanning several claves applies to all.
        if v.asigns.len() == 1 && k > 1 {
            v.asigns = vec![v.asigns[0].clone(); k];
        }
        v.fit(k);

        for j in 0..k {
            // The j-th category line, sticking to the last one available.
            let categoria = if cat_lines.is_empty() {
                String::new()
            } else if j < cat_lines.len() {
                cat_lines[j].clone()
            } else {
                cat_lines[cat_lines.len() - 1].clone()
            };
            let rec = DetailRecord {
                no_prof: self.prof_no.clone(),
                profesor: self.prof_nombre.clone(),
                categoria,
                clave_asig: v.claves[j].clone(),
                asignatura: v.asigns[j].clone(),
                grupo_anterior: v.gant[j].clone(),
                grupo_actual: v.gact[j].clone(),
                sem_ant_teo: v.ant_teo[j].clone(),
                sem_ant_pra: v.ant_pra[j].clone(),
                sem_ant_total: v.ant_tot[j].clone(),
                sem_act_teo: v.act_teo[j].clone(),
                sem_act_pra: v.act_pra[j].clone(),
                sem_act_total: v.act_tot[j].clone(),
                order: self.next_order(),
                ..Default::default()
            };
            self.push_record(rec);
        }
    }

    /// Merge a continuation row into the active block: fill the slots still
    /// missing a subject name, then append whatever is left over.
    fn merge_continuation(&mut self, row: &RawRow, map: &ColumnMap, alignment: Alignment) {
        let mut v = RowValues::from_cells(field_cells(row, map, alignment));
        let k = v.asigns.len().max(1);
        v.fit(k);

        // Slots still waiting for a subject name, in creation order.
        let holes: Vec<usize> = self
            .prof_row_idxs
            .iter()
            .copied()
            .filter(|&i| self.records[i].asignatura.is_empty())
            .collect();
        let fill_n = holes.len().min(k);

        // The PDF lays continuation values out bottom-up relative to slot
        // creation order: holes fill forward, values are consumed in reverse.
        for j in 0..fill_n {
            let d = fill_n - 1 - j;
            let r = &mut self.records[holes[j]];
            r.asignatura = v.asigns[d].clone();
            r.grupo_anterior = v.gant[d].clone();
            r.grupo_actual = v.gact[d].clone();
            r.sem_ant_teo = v.ant_teo[d].clone();
            r.sem_ant_pra = v.ant_pra[d].clone();
            r.sem_ant_total = v.ant_tot[d].clone();
            r.sem_act_teo = v.act_teo[d].clone();
            r.sem_act_pra = v.act_pra[d].clone();
            r.sem_act_total = v.act_tot[d].clone();
            if r.clave_asig.is_empty() {
                r.clave_asig = v.claves[d].clone();
            }
        }

        // Leftover values become fresh records for the same block,
        // inheriting the most recent non-empty category.
        if k > fill_n {
            let last_cat = self
                .prof_row_idxs
                .iter()
                .rev()
                .map(|&i| self.records[i].categoria.as_str())
                .find(|c| !c.is_empty())
                .unwrap_or("")
                .to_string();
            for j in fill_n..k {
                let rec = DetailRecord {
                    no_prof: self.prof_no.clone(),
                    profesor: self.prof_nombre.clone(),
                    categoria: last_cat.clone(),
                    clave_asig: v.claves[j].clone(),
                    asignatura: v.asigns[j].clone(),
                    grupo_anterior: v.gant[j].clone(),
                    grupo_actual: v.gact[j].clone(),
                    sem_ant_teo: v.ant_teo[j].clone(),
                    sem_ant_pra: v.ant_pra[j].clone(),
                    sem_ant_total: v.ant_tot[j].clone(),
                    sem_act_teo: v.act_teo[j].clone(),
                    sem_act_pra: v.act_pra[j].clone(),
                    sem_act_total: v.act_tot[j].clone(),
                    order: self.next_order(),
                    ..Default::default()
                };
                self.push_record(rec);
            }
        }
    }

    /// Patch a totals annotation into the matching slots of the active
    /// block, once per distinct fingerprint.
    fn apply_totals(&mut self, row: &RawRow, map: &ColumnMap, tipo: &str) {
        let nums: [String; 6] = [
            row.cell(map.sem_ant_teo).to_string(),
            row.cell(map.sem_ant_pra).to_string(),
            row.cell(map.sem_ant_total).to_string(),
            row.cell(map.sem_act_teo).to_string(),
            row.cell(map.sem_act_pra).to_string(),
            row.cell(map.sem_act_total).to_string(),
        ];
        let fingerprint = nums.join("|");
        if self.last_tot_fingerprint.as_deref() == Some(fingerprint.as_str()) {
            return;
        }
        if self.apply_totals_to_block(&nums, tipo) > 0 {
            self.last_tot_fingerprint = Some(fingerprint);
        }
    }

    fn apply_totals_to_block(&mut self, nums: &[String; 6], tipo: &str) -> usize {
        if self.prof_row_idxs.is_empty() {
            return 0;
        }
        let cats: Vec<String> = self
            .prof_row_idxs
            .iter()
            .map(|&i| self.records[i].categoria.to_uppercase())
            .collect();
        let has_tagged =
            cats.iter().any(|c| c.contains("INT")) || cats.iter().any(|c| c.contains("DEF"));

        let mut updated = 0;
        for (slot, &ridx) in self.prof_row_idxs.iter().enumerate() {
            // A typed totals row only reaches its own segment when the block
            // has tagged categories; otherwise it applies to every slot.
            let matches = if has_tagged {
                match tipo {
                    "INTERINO" => cats[slot].contains("INT"),
                    "DEFINITIVO" => cats[slot].contains("DEF"),
                    _ => true,
                }
            } else {
                true
            };
            if !matches {
                continue;
            }

            let r = &mut self.records[ridx];
            r.tot_sem_ant_teo = nums[0].clone();
            r.tot_sem_ant_pra = nums[1].clone();
            r.tot_sem_ant_total = nums[2].clone();
            r.tot_sem_act_teo = nums[3].clone();
            r.tot_sem_act_pra = nums[4].clone();
            r.tot_sem_act_total = nums[5].clone();

            let derived = derive_tot_tipo(&r.categoria);
            if !derived.is_empty() {
                r.tot_tipo = derived.to_string();
            } else if tipo == "INTERINO" || tipo == "DEFINITIVO" {
                r.tot_tipo = tipo.to_string();
            }
            updated += 1;
        }
        updated
    }
}

/// Fold every page of one document through a fresh engine and run the
/// whole-dataset passes. Pages whose headers cannot be mapped are skipped
/// with a warning; the rest of the document still contributes.
pub fn normalize_pages(pages: &[RawPage]) -> Vec<NormalRecord> {
    let mut engine = Normalizer::new();
    for page in pages {
        if let Err(e) = engine.consume_page(page) {
            warn!(page = page.page, "skipping page: {e}");
        }
    }
    engine.finish()
}

// ── Tests ──
