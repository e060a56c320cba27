//! Best-effort table recovery from PDFs via `lopdf`.
//!
//! Positioned text spans are pulled out of each page's content stream, then
//! clustered into a row/column grid: rows by Y with a font-derived
//! tolerance, columns by X, spans stacked inside one cell joined with a
//! line break. This is the extraction collaborator the engine sits behind;
//! fidelity dumps produced by other extractors can be fed in as raw CSV
//! instead (see `extract::read_raw_dump`).

use std::path::Path;

use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};

use crate::extract::{table_to_rows, ExtractError, RawPage};

const DEFAULT_FONT_SIZE: f64 = 10.0;
/// X positions closer than this fall into the same column.
const COLUMN_TOLERANCE: f64 = 10.0;
/// Y distance below which two spans in one cell count as the same line.
const SAME_LINE_EPSILON: f64 = 1.0;

#[derive(Debug, Clone)]
struct TextSpan {
    text: String,
    x: f64,
    y: f64,
    font_size: f64,
}

/// Load a document and recover one table per page. Pages where no grid can
/// be made out yield an empty page.
pub fn load_tables(path: &Path) -> Result<Vec<RawPage>, ExtractError> {
    let doc = Document::load(path).map_err(|e| ExtractError::Pdf {
        path: path.to_path_buf(),
        source: e,
    })?;
    if doc.is_encrypted() {
        return Err(ExtractError::Unavailable {
            path: path.to_path_buf(),
        });
    }

    let mut pages = Vec::new();
    for (page_no, page_id) in doc.get_pages() {
        let spans = page_spans(&doc, page_id).map_err(|e| ExtractError::Pdf {
            path: path.to_path_buf(),
            source: e,
        })?;
        let grid = grid_from_spans(spans);
        let rows = if grid.len() >= 2 {
            table_to_rows(page_no, 0, grid)
        } else {
            Vec::new()
        };
        pages.push(RawPage { page: page_no, rows });
    }
    Ok(pages)
}

/// Walk the content stream with a simplified text cursor (translation only;
/// the source reports are unrotated) and collect every shown string.
fn page_spans(doc: &Document, page_id: ObjectId) -> Result<Vec<TextSpan>, lopdf::Error> {
    let bytes = doc.get_page_content(page_id)?;
    let content = Content::decode(&bytes)?;

    let mut spans = Vec::new();
    let mut x = 0.0_f64;
    let mut y = 0.0_f64;
    let mut line_x = 0.0_f64;
    let mut line_y = 0.0_f64;
    let mut leading = 0.0_f64;
    let mut font_size = DEFAULT_FONT_SIZE;

    let mut emit = |x: &mut f64, y: f64, font_size: f64, text: String| {
        if !text.trim().is_empty() {
            let advance = text.chars().count() as f64 * font_size * 0.5;
            spans.push(TextSpan { text, x: *x, y, font_size });
            *x += advance;
        }
    };

    for op in &content.operations {
        match op.operator.as_str() {
            "BT" => {
                x = 0.0;
                y = 0.0;
                line_x = 0.0;
                line_y = 0.0;
            }
            "Tf" => {
                if let Some(size) = op.operands.get(1).and_then(number) {
                    font_size = size;
                }
            }
            "TL" => {
                if let Some(l) = op.operands.first().and_then(number) {
                    leading = l;
                }
            }
            "Tm" => {
                if op.operands.len() == 6 {
                    if let (Some(e), Some(f)) =
                        (number(&op.operands[4]), number(&op.operands[5]))
                    {
                        line_x = e;
                        line_y = f;
                        x = e;
                        y = f;
                    }
                }
            }
            "Td" | "TD" => {
                if let (Some(tx), Some(ty)) = (
                    op.operands.first().and_then(number),
                    op.operands.get(1).and_then(number),
                ) {
                    if op.operator == "TD" {
                        leading = -ty;
                    }
                    line_x += tx;
                    line_y += ty;
                    x = line_x;
                    y = line_y;
                }
            }
            "T*" => {
                line_y -= leading;
                x = line_x;
                y = line_y;
            }
            "Tj" => {
                if let Some(Object::String(bytes, _)) = op.operands.first() {
                    emit(&mut x, y, font_size, decode_pdf_string(bytes));
                }
            }
            "'" => {
                line_y -= leading;
                x = line_x;
                y = line_y;
                if let Some(Object::String(bytes, _)) = op.operands.first() {
                    emit(&mut x, y, font_size, decode_pdf_string(bytes));
                }
            }
            "\"" => {
                line_y -= leading;
                x = line_x;
                y = line_y;
                if let Some(Object::String(bytes, _)) = op.operands.get(2) {
                    emit(&mut x, y, font_size, decode_pdf_string(bytes));
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = op.operands.first() {
                    let mut text = String::new();
                    for item in items {
                        if let Object::String(bytes, _) = item {
                            text.push_str(&decode_pdf_string(bytes));
                        }
                    }
                    emit(&mut x, y, font_size, text);
                }
            }
            _ => {}
        }
    }
    Ok(spans)
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

/// PDF string bytes: UTF-16BE when BOM-prefixed, WinAnsi otherwise.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if bytes.starts_with(&[0xFE, 0xFF]) {
        let (decoded, _, _) = encoding_rs::UTF_16BE.decode(&bytes[2..]);
        decoded.into_owned()
    } else {
        let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
        decoded.into_owned()
    }
}

/// Cluster spans into a rectangular cell grid. Returns an empty grid when
/// fewer than two columns can be made out.
fn grid_from_spans(spans: Vec<TextSpan>) -> Vec<Vec<String>> {
    let spans: Vec<_> = spans
        .into_iter()
        .filter(|s| !s.text.trim().is_empty())
        .collect();
    if spans.is_empty() {
        return Vec::new();
    }

    let avg_font = spans.iter().map(|s| s.font_size).sum::<f64>() / spans.len() as f64;
    let row_tolerance = avg_font * 0.6;

    let mut rows = cluster_into_rows(spans, row_tolerance);
    for row in &mut rows {
        row.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));
    }

    let columns = detect_columns(&rows);
    if columns.len() < 2 {
        return Vec::new();
    }
    assign_to_columns(rows, &columns)
}

/// Group spans into rows by Y (top to bottom).
fn cluster_into_rows(mut spans: Vec<TextSpan>, tolerance: f64) -> Vec<Vec<TextSpan>> {
    spans.sort_by(|a, b| {
        b.y.partial_cmp(&a.y)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
    });

    let mut rows: Vec<Vec<TextSpan>> = Vec::new();
    let mut current: Vec<TextSpan> = Vec::new();
    let mut current_y: Option<f64> = None;

    for span in spans {
        match current_y {
            Some(y) if (span.y - y).abs() <= tolerance => current.push(span),
            _ => {
                if !current.is_empty() {
                    rows.push(std::mem::take(&mut current));
                }
                current_y = Some(span.y);
                current.push(span);
            }
        }
    }
    if !current.is_empty() {
        rows.push(current);
    }
    rows
}

/// Detect column X positions by clustering the span origins.
fn detect_columns(rows: &[Vec<TextSpan>]) -> Vec<f64> {
    let mut xs: Vec<f64> = rows.iter().flat_map(|r| r.iter().map(|s| s.x)).collect();
    if xs.is_empty() {
        return Vec::new();
    }
    xs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mut columns = Vec::new();
    let mut cluster: Vec<f64> = Vec::new();
    for x in xs {
        match cluster.last() {
            Some(&last) if (x - last).abs() <= COLUMN_TOLERANCE => cluster.push(x),
            _ => {
                if !cluster.is_empty() {
                    columns.push(cluster.iter().sum::<f64>() / cluster.len() as f64);
                    cluster.clear();
                }
                cluster.push(x);
            }
        }
    }
    if !cluster.is_empty() {
        columns.push(cluster.iter().sum::<f64>() / cluster.len() as f64);
    }
    columns
}

/// Assign each span to its nearest column. Spans stacking vertically inside
/// one cell are joined with a line break (those are the multi-line cells
/// the engine splits back apart); same-line neighbors get a space.
fn assign_to_columns(rows: Vec<Vec<TextSpan>>, columns: &[f64]) -> Vec<Vec<String>> {
    rows.into_iter()
        .map(|row| {
            let mut cells: Vec<String> = vec![String::new(); columns.len()];
            let mut last_y: Vec<Option<f64>> = vec![None; columns.len()];

            for span in row {
                let col = columns
                    .iter()
                    .enumerate()
                    .min_by(|(_, a), (_, b)| {
                        let da = (span.x - **a).abs();
                        let db = (span.x - **b).abs();
                        da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
                    })
                    .map(|(i, _)| i)
                    .unwrap_or(0);

                if !cells[col].is_empty() {
                    let stacked = last_y[col]
                        .map(|y| (span.y - y).abs() > SAME_LINE_EPSILON)
                        .unwrap_or(false);
                    cells[col].push(if stacked { '\n' } else { ' ' });
                }
                cells[col].push_str(span.text.trim());
                last_y[col] = Some(span.y);
            }
            cells
        })
        .collect()
}

// ── Tests ──
