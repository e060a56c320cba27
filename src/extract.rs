//! Raw table model shared by every source: rectangular string rows tagged
//! with their page/table position and header level, plus the raw-dump CSV
//! format (`page,table_index,row_index,is_header,col_0..col_N`) used both as
//! a debugging artifact and as an ingestion path for dumps produced by other
//! table extractors.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Marker emitted in a dump for pages where no table was detected.
pub const NO_TABLES_MARKER: &str = "[NO_TABLES_ON_PAGE]";

/// One raw table row as yielded by a table source. Immutable once produced.
#[derive(Debug, Clone)]
pub struct RawRow {
    /// 1-based page number.
    pub page: u32,
    /// 0-based table index within the page.
    pub table_index: usize,
    /// 0-based row index within the table.
    pub row_index: usize,
    /// 0 = data, 1 = primary header, 2 = subheader.
    pub header_level: u8,
    /// Rectangular within a table; cells keep internal line breaks.
    pub cells: Vec<String>,
}

impl RawRow {
    /// Safe cell lookup; anything out of range reads as empty.
    pub fn cell(&self, idx: usize) -> &str {
        self.cells.get(idx).map(String::as_str).unwrap_or("")
    }
}

/// One page's worth of detected rows. A page with no detected tables has an
/// empty `rows`.
#[derive(Debug, Clone)]
pub struct RawPage {
    pub page: u32,
    pub rows: Vec<RawRow>,
}

/// Document-level extraction failures. These abort the document (never the
/// whole batch); page-level problems are handled downstream by the engine.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse {path}: {source}")]
    Pdf {
        path: PathBuf,
        #[source]
        source: lopdf::Error,
    },
    #[error("{path}: document is encrypted; table detection is unavailable")]
    Unavailable { path: PathBuf },
    #[error("malformed raw table dump {path}: {message}")]
    BadDump { path: PathBuf, message: String },
    #[error("csv error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Normalize a raw cell: unify line endings and trim every line while
/// keeping the internal breaks (stacked values depend on them).
pub fn coerce_cell(s: &str) -> String {
    s.replace("\r\n", "\n")
        .replace('\r', "\n")
        .split('\n')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Rectangularize one detected table and tag its first two rows as the
/// primary header and subheader (the two-header-row convention).
pub fn table_to_rows(page: u32, table_index: usize, data: Vec<Vec<String>>) -> Vec<RawRow> {
    let max_cols = data.iter().map(Vec::len).max().unwrap_or(0);
    data.into_iter()
        .enumerate()
        .map(|(row_index, r)| {
            let mut cells: Vec<String> = r.iter().map(|c| coerce_cell(c)).collect();
            cells.resize(max_cols, String::new());
            RawRow {
                page,
                table_index,
                row_index,
                header_level: match row_index {
                    0 => 1,
                    1 => 2,
                    _ => 0,
                },
                cells,
            }
        })
        .collect()
}

/// Write pages to the raw-dump CSV format. Pages without tables get the
/// `[NO_TABLES_ON_PAGE]` marker row with `table_index = -1`.
pub fn write_raw_dump(pages: &[RawPage], path: &Path) -> Result<(), ExtractError> {
    let file = File::create(path).map_err(|e| ExtractError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    write_raw_dump_to(pages, file).map_err(|e| ExtractError::Csv {
        path: path.to_path_buf(),
        source: e,
    })
}

fn write_raw_dump_to<W: Write>(pages: &[RawPage], out: W) -> Result<(), csv::Error> {
    let max_cols = pages
        .iter()
        .flat_map(|p| p.rows.iter().map(|r| r.cells.len()))
        .max()
        .unwrap_or(0)
        .max(1);

    let mut wtr = csv::Writer::from_writer(out);
    let mut header = vec![
        "page".to_string(),
        "table_index".to_string(),
        "row_index".to_string(),
        "is_header".to_string(),
    ];
    header.extend((0..max_cols).map(|i| format!("col_{i}")));
    wtr.write_record(&header)?;

    for page in pages {
        if page.rows.is_empty() {
            let mut rec = vec![page.page.to_string(), "-1".into(), "-1".into(), String::new()];
            rec.push(NO_TABLES_MARKER.to_string());
            rec.extend(std::iter::repeat(String::new()).take(max_cols - 1));
            wtr.write_record(&rec)?;
            continue;
        }
        for row in &page.rows {
            let mut rec = vec![
                row.page.to_string(),
                row.table_index.to_string(),
                row.row_index.to_string(),
                if row.row_index == 0 { "yes".into() } else { String::new() },
            ];
            rec.extend(row.cells.iter().cloned());
            rec.extend(std::iter::repeat(String::new()).take(max_cols - row.cells.len()));
            wtr.write_record(&rec)?;
        }
    }
    wtr.flush()?;
    Ok(())
}

/// Read a raw-dump CSV back into pages, restoring the header-level tags from
/// the per-table row indices. Marker rows become empty pages.
pub fn read_raw_dump(path: &Path) -> Result<Vec<RawPage>, ExtractError> {
    let file = File::open(path).map_err(|e| ExtractError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    read_raw_dump_from(file).map_err(|message| ExtractError::BadDump {
        path: path.to_path_buf(),
        message,
    })
}

fn read_raw_dump_from<R: Read>(input: R) -> Result<Vec<RawPage>, String> {
    let mut rdr = csv::Reader::from_reader(input);
    {
        let headers = rdr.headers().map_err(|e| e.to_string())?;
        let expected = ["page", "table_index", "row_index", "is_header"];
        for (i, name) in expected.iter().enumerate() {
            if headers.get(i) != Some(*name) {
                return Err(format!("expected column '{name}' at position {i}"));
            }
        }
    }

    let mut pages: Vec<RawPage> = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| e.to_string())?;
        let page: u32 = record
            .get(0)
            .unwrap_or("")
            .parse()
            .map_err(|_| format!("bad page number {:?}", record.get(0)))?;
        let table_index: i64 = record
            .get(1)
            .unwrap_or("")
            .parse()
            .map_err(|_| format!("bad table_index {:?}", record.get(1)))?;

        if pages.last().map(|p| p.page) != Some(page) {
            pages.push(RawPage { page, rows: Vec::new() });
        }

        // Pages without detected tables are dumped as a single marker row.
        if table_index < 0 || record.get(4) == Some(NO_TABLES_MARKER) {
            continue;
        }

        let row_index: usize = record
            .get(2)
            .unwrap_or("")
            .parse()
            .map_err(|_| format!("bad row_index {:?}", record.get(2)))?;
        let cells: Vec<String> = record.iter().skip(4).map(coerce_cell).collect();
        let current = pages.last_mut().expect("page pushed above");
        current.rows.push(RawRow {
            page,
            table_index: table_index as usize,
            row_index,
            header_level: match row_index {
                0 => 1,
                1 => 2,
                _ => 0,
            },
            cells,
        });
    }
    Ok(pages)
}

// ── Tests ──
