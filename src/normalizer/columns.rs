//! Per-page column detection from the two header rows.
//!
//! Layouts shift between pages of the same document, so the map is
//! recomputed for every page. All thirteen columns must resolve; a page
//! whose headers cannot be mapped is skipped as a whole.

use thiserror::Error;

use super::cells::strip_accents_upper;
use crate::extract::RawRow;

/// Raw-column index of each semantic field on one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub no: usize,
    pub profesor: usize,
    pub categoria: usize,
    pub clave: usize,
    pub asignatura: usize,
    pub grupo_anterior: usize,
    pub grupo_actual: usize,
    pub sem_ant_teo: usize,
    pub sem_ant_pra: usize,
    pub sem_ant_total: usize,
    pub sem_act_teo: usize,
    pub sem_act_pra: usize,
    pub sem_act_total: usize,
}

/// Why a page's header rows could not be mapped. Fatal for the page only.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MappingError {
    #[error("page has no header rows (levels 1/2)")]
    MissingHeaders,
    #[error("header keyword '{0}' not found in the primary header row")]
    MissingColumn(&'static str),
    #[error("subheader lacks ANTERIOR/ACTUAL group markers")]
    MissingGroupMarkers,
    #[error("cannot pair TEO/PRA/TOTAL for both terms")]
    UnpairedMetrics,
}

/// Infer the column map from a page's rows.
///
/// The primary header is matched by accent-insensitive keyword substrings
/// (first hit left-to-right). The subheader contributes the repeated
/// ANTERIOR/ACTUAL/TEO/PRA/TOTAL tokens; the two lowest indices of each
/// metric token pair up as (previous term, current term), and the lowest
/// ANTERIOR/ACTUAL index is that term's group column.
pub fn detect_columns(rows: &[RawRow]) -> Result<ColumnMap, MappingError> {
    let h0 = rows
        .iter()
        .find(|r| r.header_level == 1)
        .ok_or(MappingError::MissingHeaders)?;
    let h1 = rows
        .iter()
        .find(|r| r.header_level == 2)
        .ok_or(MappingError::MissingHeaders)?;

    let find_like = |keys: &[&str], label: &'static str| {
        h0.cells
            .iter()
            .position(|v| {
                let val = strip_accents_upper(v);
                keys.iter().any(|k| val.contains(k))
            })
            .ok_or(MappingError::MissingColumn(label))
    };

    let no = find_like(&["NO"], "NO")?;
    let profesor = find_like(&["PROFESOR"], "PROFESOR")?;
    let categoria = find_like(&["CATEG"], "CATEGORIA")?;
    let clave = find_like(&["CLAVE"], "CLAVE")?;
    let asignatura = find_like(&["ASIGNAT"], "ASIGNATURA")?;

    let mut anterior = Vec::new();
    let mut actual = Vec::new();
    let mut teos = Vec::new();
    let mut pras = Vec::new();
    let mut tots = Vec::new();
    for (i, v) in h1.cells.iter().enumerate() {
        match strip_accents_upper(v).trim() {
            "ANTERIOR" => anterior.push(i),
            "ACTUAL" => actual.push(i),
            "TEO" => teos.push(i),
            "PRA" => pras.push(i),
            "TOTAL" => tots.push(i),
            _ => {}
        }
    }

    if anterior.is_empty() || actual.is_empty() {
        return Err(MappingError::MissingGroupMarkers);
    }
    if teos.len() < 2 || pras.len() < 2 || tots.len() < 2 {
        return Err(MappingError::UnpairedMetrics);
    }

    // Indices come out ascending; lower index = previous term by column order.
    Ok(ColumnMap {
        no,
        profesor,
        categoria,
        clave,
        asignatura,
        grupo_anterior: anterior[0],
        grupo_actual: actual[0],
        sem_ant_teo: teos[0],
        sem_act_teo: teos[1],
        sem_ant_pra: pras[0],
        sem_act_pra: pras[1],
        sem_ant_total: tots[0],
        sem_act_total: tots[1],
    })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::table_to_rows;

    fn header_page(h0: &[&str], h1: &[&str]) -> Vec<RawRow> {
        table_to_rows(
            1,
            0,
            vec![
                h0.iter().map(|s| s.to_string()).collect(),
                h1.iter().map(|s| s.to_string()).collect(),
            ],
        )
    }

    fn standard_page() -> Vec<RawRow> {
        header_page(
            &[
                "NO", "PROFESOR", "CATEGORÍA", "CLAVE", "ASIGNATURA", "SEMESTRE ANTERIOR", "",
                "", "", "SEMESTRE ACTUAL", "", "", "",
            ],
            &[
                "", "", "", "", "", "ANTERIOR", "TEO", "PRA", "TOTAL", "ACTUAL", "TEO", "PRA",
                "TOTAL",
            ],
        )
    }

    #[test]
    fn standard_layout_resolves_all_columns() {
        let map = detect_columns(&standard_page()).unwrap();
        assert_eq!(map.no, 0);
        assert_eq!(map.profesor, 1);
        assert_eq!(map.categoria, 2);
        assert_eq!(map.clave, 3);
        assert_eq!(map.asignatura, 4);
        assert_eq!(map.grupo_anterior, 5);
        assert_eq!(map.grupo_actual, 9);
        assert_eq!(map.sem_ant_teo, 6);
        assert_eq!(map.sem_ant_pra, 7);
        assert_eq!(map.sem_ant_total, 8);
        assert_eq!(map.sem_act_teo, 10);
        assert_eq!(map.sem_act_pra, 11);
        assert_eq!(map.sem_act_total, 12);
    }

    #[test]
    fn accented_keywords_match() {
        // CATEGORÍA above already; also check a lowercase accented variant.
        let rows = header_page(
            &[
                "No.", "Profesor", "categoría", "Clave", "Asignatura", "x", "", "", "", "y", "",
                "", "",
            ],
            &[
                "", "", "", "", "", "ANTERIOR", "TEO", "PRA", "TOTAL", "ACTUAL", "TEO", "PRA",
                "TOTAL",
            ],
        );
        let map = detect_columns(&rows).unwrap();
        assert_eq!(map.categoria, 2);
    }

    #[test]
    fn missing_header_rows() {
        let rows = vec![RawRow {
            page: 1,
            table_index: 0,
            row_index: 2,
            header_level: 0,
            cells: vec!["1".into()],
        }];
        assert_eq!(detect_columns(&rows), Err(MappingError::MissingHeaders));
    }

    #[test]
    fn missing_keyword_column() {
        let rows = header_page(
            &["NO", "PROFESOR", "CATEG", "CLAVE", "MATERIA"],
            &["ANTERIOR", "ACTUAL", "TEO", "TEO", "PRA"],
        );
        assert_eq!(
            detect_columns(&rows),
            Err(MappingError::MissingColumn("ASIGNATURA"))
        );
    }

    #[test]
    fn missing_group_markers() {
        let rows = header_page(
            &["NO", "PROFESOR", "CATEG", "CLAVE", "ASIGNAT"],
            &["TEO", "PRA", "TOTAL", "TEO", "PRA", "TOTAL"],
        );
        assert_eq!(detect_columns(&rows), Err(MappingError::MissingGroupMarkers));
    }

    #[test]
    fn unpaired_metric_tokens() {
        let rows = header_page(
            &["NO", "PROFESOR", "CATEG", "CLAVE", "ASIGNAT"],
            &["ANTERIOR", "ACTUAL", "TEO", "PRA", "TOTAL"],
        );
        assert_eq!(detect_columns(&rows), Err(MappingError::UnpairedMetrics));
    }
}
