//! Dataset export: one workbook (and optionally a CSV) per input document.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::Workbook;

use crate::normalizer::record::{Cell, NormalRecord};

pub const SHEET_NAME: &str = "normalizado";

/// Column width heuristic: longest of the header and the first 200 values,
/// plus padding, capped so one verbose subject cannot blow up the sheet.
const WIDTH_SAMPLE_ROWS: usize = 200;
const WIDTH_PADDING: usize = 2;
const WIDTH_CAP: usize = 42;

/// Write the dataset as a workbook with sized columns and a frozen header.
pub fn write_xlsx(records: &[NormalRecord], path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, header) in NormalRecord::HEADERS.iter().enumerate() {
        sheet.write_string(0, col as u16, *header)?;
    }
    for (i, record) in records.iter().enumerate() {
        let row = (i + 1) as u32;
        for (col, cell) in record.cells().iter().enumerate() {
            match cell {
                Cell::Text(t) if !t.is_empty() => {
                    sheet.write_string(row, col as u16, *t)?;
                }
                Cell::Number(Some(v)) => {
                    sheet.write_number(row, col as u16, *v)?;
                }
                _ => {}
            }
        }
    }

    for (col, header) in NormalRecord::HEADERS.iter().enumerate() {
        let mut width = header.chars().count();
        for record in records.iter().take(WIDTH_SAMPLE_ROWS) {
            width = width.max(cell_display_len(&record.cells()[col]));
        }
        sheet.set_column_width(col as u16, (width + WIDTH_PADDING).min(WIDTH_CAP) as f64)?;
    }
    sheet.set_freeze_panes(1, 0)?;

    workbook
        .save(path)
        .with_context(|| format!("cannot write {}", path.display()))?;
    Ok(())
}

fn cell_display_len(cell: &Cell<'_>) -> usize {
    match cell {
        Cell::Text(t) => t.chars().count(),
        Cell::Number(Some(v)) => format!("{v}").chars().count(),
        Cell::Number(None) => 0,
    }
}

/// Write the dataset as CSV with the same columns as the workbook.
pub fn write_csv(records: &[NormalRecord], path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("cannot write {}", path.display()))?;
    write_csv_to(records, file)
}

fn write_csv_to<W: Write>(records: &[NormalRecord], out: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_headers_match_output_contract() {
        let rec = NormalRecord {
            no_prof: "1".into(),
            profesor: "GARCIA LUIS".into(),
            clave_asig: "1234".into(),
            sem_ant_teo: Some(3.0),
            tot_tipo: "INTERINO".into(),
            tot_sem_act_total: Some(5.0),
            ..Default::default()
        };

        let mut buf = Vec::new();
        write_csv_to(&[rec], &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();

        assert_eq!(
            lines.next().unwrap(),
            NormalRecord::HEADERS.join(",")
        );
        let data = lines.next().unwrap();
        assert!(data.starts_with("1,GARCIA LUIS,,1234,"));
        assert!(data.ends_with(",5.0"));
    }

    #[test]
    fn empty_metrics_serialize_as_blank() {
        let rec = NormalRecord::default();
        let mut buf = Vec::new();
        write_csv_to(&[rec], &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let data = text.lines().nth(1).unwrap();
        assert_eq!(data, ",".repeat(NormalRecord::HEADERS.len() - 1));
    }
}
