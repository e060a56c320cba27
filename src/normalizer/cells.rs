//! Cell-level text utilities: splitting stacked cell values, accent folding,
//! category-type derivation and the small text repairs the source PDFs need.

use std::sync::LazyLock;

use regex::Regex;

/// 3–5 consecutive digits: subject claves and group codes.
static NUM_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d{3,5}\b").unwrap());
/// Integers or decimals, comma or dot as separator (load metrics).
static NUM_FLOAT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+(?:[.,]\d+)?").unwrap());
/// Abbreviated category markers. `INTERINO` spelled out does NOT match `INT\.?`
/// at a word boundary; only the abbreviated form tags a category.
static TIPO_INT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bINT\.?\b").unwrap());
static TIPO_DEF_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bDEF\.?\b").unwrap());

/// Parsing strategy for one raw cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    /// Subject clave (3–5 digit identifier).
    Clave,
    /// Group code. Same token shape as claves in the source documents.
    Grupo,
    /// Load metric (integer or decimal, comma decimals normalized to dot).
    Metric,
    /// Free text (subject names, categories).
    Text,
}

/// Split a cell on line breaks, trimming each line and dropping blanks.
pub fn split_lines(cell: &str) -> Vec<String> {
    cell.split('\n')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split one raw cell into its stacked values.
///
/// Line breaks win when present; otherwise the kind's token regex is tried,
/// and if nothing matches the whole trimmed cell comes back as a single
/// value. Empty input yields an empty vec. Never fails.
pub fn split_cell(cell: &str, kind: CellKind) -> Vec<String> {
    let s = cell.trim();
    if s.is_empty() {
        return Vec::new();
    }

    match kind {
        CellKind::Clave | CellKind::Grupo => {
            let parts = split_lines(s);
            if parts.len() > 1 {
                return parts;
            }
            let tokens: Vec<String> = NUM_TOKEN_RE
                .find_iter(s)
                .map(|m| m.as_str().to_string())
                .collect();
            if tokens.is_empty() {
                vec![s.to_string()]
            } else {
                tokens
            }
        }
        CellKind::Metric => {
            let parts = split_lines(s);
            if parts.len() > 1 {
                return parts.into_iter().map(|p| p.replace(',', ".")).collect();
            }
            let tokens: Vec<String> = NUM_FLOAT_RE
                .find_iter(s)
                .map(|m| m.as_str().replace(',', "."))
                .collect();
            if tokens.is_empty() {
                vec![s.to_string()]
            } else {
                tokens
            }
        }
        CellKind::Text => split_lines(s),
    }
}

/// Uppercase with Spanish diacritics folded away. Header keywords arrive as
/// `CATEGORÍA`, `No.`, etc. and must compare accent-insensitively.
pub fn strip_accents_upper(s: &str) -> String {
    s.to_uppercase()
        .chars()
        .map(|c| match c {
            'Á' | 'À' | 'Â' | 'Ä' => 'A',
            'É' | 'È' | 'Ê' | 'Ë' => 'E',
            'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
            'Ó' | 'Ò' | 'Ô' | 'Ö' => 'O',
            'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
            'Ñ' => 'N',
            _ => c,
        })
        .collect()
}

/// True when the trimmed cell is a non-empty run of digits.
pub fn looks_digit(s: &str) -> bool {
    let t = s.trim();
    !t.is_empty() && t.chars().all(|c| c.is_ascii_digit())
}

/// Derive the totals type from a category label: `INT.` → INTERINO,
/// `DEF.` → DEFINITIVO, anything else → empty (unknown).
pub fn derive_tot_tipo(categoria: &str) -> &'static str {
    if TIPO_INT_RE.is_match(categoria) {
        "INTERINO"
    } else if TIPO_DEF_RE.is_match(categoria) {
        "DEFINITIVO"
    } else {
        ""
    }
}

/// Repair the common latin1-misread-as-text artifact ("Ã\u{91}" where "Ñ"
/// was meant): re-encode as latin1 and re-decode as UTF-8. The repair is
/// strict: any char above U+00FF or an invalid byte sequence returns the
/// input unchanged.
pub fn repair_mojibake(s: &str) -> String {
    if s.is_empty() || !s.chars().all(|c| (c as u32) <= 0xFF) {
        return s.to_string();
    }
    let bytes: Vec<u8> = s.chars().map(|c| c as u8).collect();
    match std::str::from_utf8(&bytes) {
        Ok(fixed) => fixed.to_string(),
        Err(_) => s.to_string(),
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clave_multiline() {
        assert_eq!(split_cell("1234\n5678", CellKind::Clave), vec!["1234", "5678"]);
    }

    #[test]
    fn clave_tokens_on_single_line() {
        assert_eq!(split_cell("1234 5678", CellKind::Clave), vec!["1234", "5678"]);
    }

    #[test]
    fn clave_no_tokens_keeps_cell() {
        // Two digits never match the 3–5 digit token shape.
        assert_eq!(split_cell("12", CellKind::Clave), vec!["12"]);
    }

    #[test]
    fn clave_empty() {
        assert!(split_cell("", CellKind::Clave).is_empty());
        assert!(split_cell("   \n ", CellKind::Clave).is_empty());
    }

    #[test]
    fn grupo_same_token_shape() {
        assert_eq!(split_cell("01832", CellKind::Grupo), vec!["01832"]);
    }

    #[test]
    fn metric_comma_decimal() {
        assert_eq!(split_cell("3,5", CellKind::Metric), vec!["3.5"]);
    }

    #[test]
    fn metric_multiline_normalizes_each_line() {
        assert_eq!(split_cell("1\n2,5", CellKind::Metric), vec!["1", "2.5"]);
    }

    #[test]
    fn metric_fallback_keeps_cell() {
        assert_eq!(split_cell("N/A", CellKind::Metric), vec!["N/A"]);
    }

    #[test]
    fn text_drops_blank_lines() {
        assert_eq!(
            split_cell("MATE I\n\n  MATE II ", CellKind::Text),
            vec!["MATE I", "MATE II"]
        );
    }

    #[test]
    fn accents_folded() {
        assert_eq!(strip_accents_upper("Categoría"), "CATEGORIA");
        assert_eq!(strip_accents_upper("año"), "ANO");
    }

    #[test]
    fn digit_check() {
        assert!(looks_digit(" 12 "));
        assert!(!looks_digit(""));
        assert!(!looks_digit("1a"));
        assert!(!looks_digit("1.2"));
    }

    #[test]
    fn tot_tipo_from_abbreviations() {
        assert_eq!(derive_tot_tipo("PROF. ASIG. A INT."), "INTERINO");
        assert_eq!(derive_tot_tipo("PROF. ASIG. B DEF."), "DEFINITIVO");
        assert_eq!(derive_tot_tipo("TITULAR"), "");
    }

    #[test]
    fn tot_tipo_ignores_spelled_out_words() {
        // No word boundary after INT inside INTERINO.
        assert_eq!(derive_tot_tipo("INTERINO"), "");
        assert_eq!(derive_tot_tipo("DEFINITIVO"), "");
    }

    #[test]
    fn mojibake_repaired() {
        // "Ñ" (C3 91) misread as latin1 is "Ã" + U+0091.
        assert_eq!(repair_mojibake("DISE\u{C3}\u{91}O"), "DISEÑO");
        // "é" (C3 A9) misread the same way.
        assert_eq!(repair_mojibake("M\u{C3}\u{A9}XICO"), "MéXICO");
    }

    #[test]
    fn mojibake_ascii_unchanged() {
        assert_eq!(repair_mojibake("MATE I"), "MATE I");
    }

    #[test]
    fn mojibake_keeps_original_when_roundtrip_fails() {
        // Proper accented text is not valid UTF-8 when re-read as latin1
        // bytes; the original must come back untouched.
        assert_eq!(repair_mojibake("MATEMÁTICAS"), "MATEMÁTICAS");
        // Chars above U+00FF cannot be latin1 at all.
        assert_eq!(repair_mojibake("A\u{2018}B"), "A\u{2018}B");
    }
}
