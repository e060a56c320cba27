//! Structural classification of raw data rows.
//!
//! Rows are not self-describing: a continuation row is recognized purely by
//! which mapped columns are empty, and a totals annotation by its marker
//! text anywhere in the row.

use std::sync::LazyLock;

use regex::Regex;

use super::cells::looks_digit;
use super::columns::ColumnMap;
use crate::extract::RawRow;

static TOTALES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bTOTALES\b").unwrap());
static ETIQUETA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(INTERINO|DEFINITIVO)").unwrap());

/// Shape of one raw row relative to a page's column map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowClass {
    /// Header or subheader row; carries no data.
    Header,
    /// Totals annotation; `tipo` is `INTERINO`, `DEFINITIVO` or the generic
    /// `TOTALES` when no category label appears in the row.
    Totals { tipo: String },
    /// Sequence number and professor name both present: starts a new block.
    /// The row may still carry its own assignments.
    NewProfessor,
    /// Identifying columns empty, subject name present: overflow values for
    /// the active block at the normal column positions.
    ContRight,
    /// Identifying columns and subject name empty, but the previous-group
    /// column holds a long spaced string: the whole row is shifted one
    /// column right (a known extraction artifact).
    ContShifted,
    /// Neither clave nor subject present; skipped.
    Empty,
    /// Ordinary detail row.
    Detail,
}

/// Classify one row. Precedence mirrors the reconstruction order: header,
/// totals, new professor, continuations, empty, detail.
pub fn classify(row: &RawRow, map: &ColumnMap) -> RowClass {
    if row.header_level == 1 || row.header_level == 2 {
        return RowClass::Header;
    }

    let joined = row.cells.join(" | ");
    if TOTALES_RE.is_match(&joined) {
        let tipo = ETIQUETA_RE
            .captures(&joined)
            .map(|c| c[1].to_uppercase())
            .unwrap_or_else(|| "TOTALES".to_string());
        return RowClass::Totals { tipo };
    }

    if looks_digit(row.cell(map.no)) && !row.cell(map.profesor).is_empty() {
        return RowClass::NewProfessor;
    }

    if is_cont_right_only(row, map) {
        return RowClass::ContRight;
    }
    if is_cont_shifted(row, map) {
        return RowClass::ContShifted;
    }

    if row.cell(map.clave).is_empty() && row.cell(map.asignatura).is_empty() {
        return RowClass::Empty;
    }

    RowClass::Detail
}

fn is_cont_right_only(row: &RawRow, map: &ColumnMap) -> bool {
    row.cell(map.no).is_empty()
        && row.cell(map.profesor).is_empty()
        && row.cell(map.categoria).is_empty()
        && row.cell(map.clave).is_empty()
        && !row.cell(map.asignatura).is_empty()
}

fn is_cont_shifted(row: &RawRow, map: &ColumnMap) -> bool {
    if !row.cell(map.asignatura).is_empty() {
        return false;
    }
    let g_ant = row.cell(map.grupo_anterior);
    row.cell(map.no).is_empty()
        && row.cell(map.profesor).is_empty()
        && g_ant.chars().count() > 10
        && g_ant.contains(' ')
}

// ── Tests ──
