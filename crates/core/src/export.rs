//! Self-describing export of result pages.
//!
//! Pages can be exported as CSV or as an xlsx workbook. Both formats
//! replace each strain genotype with a small integer relative to the row's
//! reference allele, and the reference column with a
//! `ref/alt1,alt2` summary, so they can be read without the vocabulary.

use crate::config;
use crate::decode::{DecodedCell, RowDecoder};
use crate::error::ExportError;
use crate::reference::{ConsequenceVocabulary, StrainRegistry};
use rust_xlsxwriter::{Format, Workbook};
use serde_json::Value;
use std::io::Write;

/// Code for a value equal to the reference allele.
pub const REFERENCE_CODE: i32 = 0;
/// Code for lower-case (low confidence) and heterozygous values.
pub const AMBIGUOUS_CODE: i32 = -1;

/// Reference/alternatives encoding of one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlleleEncoding {
    /// `ref/alt1,alt2,...`
    pub summary: String,
    /// One code per input value.
    pub codes: Vec<i32>,
}

/// Encode a row's strain values against its reference allele.
///
/// Values equal to the reference get 0, lower-case values (including `het`)
/// get -1, and each distinct upper-case alternative gets 1..N in first-seen order.
pub fn encode_alleles<S: AsRef<str>>(reference: &str, values: &[S]) -> AlleleEncoding {
    let mut alternatives: Vec<&str> = Vec::new();
    let codes = values
        .iter()
        .map(|v| {
            let value = v.as_ref();
            if value == reference {
                REFERENCE_CODE
            } else if value.to_lowercase() == value {
                AMBIGUOUS_CODE
            } else {
                let position = match alternatives.iter().position(|a| *a == value) {
                    Some(p) => p,
                    None => {
                        alternatives.push(value);
                        alternatives.len() - 1
                    }
                };
                position as i32 + 1
            }
        })
        .collect();
    AlleleEncoding {
        summary: format!("{}/{}", reference, alternatives.join(",")),
        codes,
    }
}

/// File formats offered by the exporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Csv,
    Xlsx,
}

impl ExportFormat {
    /// Parse the `format` request parameter.
    pub fn parse(text: &str) -> Result<Self, ExportError> {
        match text.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "xlsx" | "excel" => Ok(ExportFormat::Xlsx),
            _ => Err(ExportError::UnknownFormat(text.to_string())),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }
}

/// Decoded header and rows with the reference column summarised and strain
/// columns replaced by their codes.
struct EncodedTable {
    header: Vec<String>,
    rows: Vec<Vec<DecodedCell>>,
}

fn encode_table(
    columns: &[String],
    rows: &[Vec<Value>],
    consequences: &ConsequenceVocabulary,
    strains: &StrainRegistry,
) -> Result<EncodedTable, ExportError> {
    let decoder = RowDecoder::new(columns, consequences, strains);
    let reference_idx = decoder.reference_index();
    let strain_idx: Vec<usize> = (0..columns.len())
        .filter(|&i| decoder.is_strain_column(i))
        .collect();
    let encode = reference_idx.is_some() && !strain_idx.is_empty();

    let header = columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            if encode && Some(i) == reference_idx {
                config::EXPORT_REFERENCE_HEADER.to_string()
            } else {
                c.clone()
            }
        })
        .collect();

    let mut encoded = Vec::with_capacity(rows.len());
    for row in rows {
        let mut cells = decoder.decode(row)?;
        if let (true, Some(ref_i)) = (encode, reference_idx) {
            let values: Vec<String> = strain_idx.iter().map(|&i| cells[i].text()).collect();
            let encoding = encode_alleles(&cells[ref_i].text(), &values);
            for (&i, code) in strain_idx.iter().zip(encoding.codes) {
                cells[i] = DecodedCell::Number(i64::from(code));
            }
            cells[ref_i] = DecodedCell::Text(encoding.summary);
        }
        encoded.push(cells);
    }
    Ok(EncodedTable {
        header,
        rows: encoded,
    })
}

/// Write rows as CSV with decoded consequences and encoded genotypes.
///
/// Returns the number of data rows written.
pub fn write_csv<W: Write>(
    out: W,
    columns: &[String],
    rows: &[Vec<Value>],
    consequences: &ConsequenceVocabulary,
    strains: &StrainRegistry,
) -> Result<usize, ExportError> {
    let table = encode_table(columns, rows, consequences, strains)?;
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(&table.header)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(DecodedCell::text))?;
    }
    writer.flush()?;
    Ok(table.rows.len())
}

/// Write rows as a single-sheet xlsx workbook with the same encoding as
/// [`write_csv`]. Numbers and genotype codes are stored as numeric cells;
/// empty values are left blank.
///
/// Returns the number of data rows written.
pub fn write_xlsx<W: Write>(
    mut out: W,
    columns: &[String],
    rows: &[Vec<Value>],
    consequences: &ConsequenceVocabulary,
    strains: &StrainRegistry,
) -> Result<usize, ExportError> {
    if rows.len() + 1 > config::MAX_SHEET_ROWS {
        return Err(ExportError::SheetLimit(format!("{} rows", rows.len())));
    }
    if columns.len() > config::MAX_SHEET_COLUMNS {
        return Err(ExportError::SheetLimit(format!("{} columns", columns.len())));
    }
    let table = encode_table(columns, rows, consequences, strains)?;

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(config::EXPORT_SHEET_NAME)?;
    let bold = Format::new().set_bold();

    for (c, name) in table.header.iter().enumerate() {
        sheet.write_string_with_format(0, sheet_col(c)?, name, &bold)?;
    }
    for (r, cells) in table.rows.iter().enumerate() {
        let row = sheet_row(r + 1)?;
        for (c, cell) in cells.iter().enumerate() {
            let col = sheet_col(c)?;
            match cell {
                DecodedCell::Number(n) => {
                    sheet.write_number(row, col, *n as f64)?;
                }
                other => {
                    let text = other.text();
                    if !text.is_empty() {
                        sheet.write_string(row, col, &text)?;
                    }
                }
            }
        }
    }

    out.write_all(&workbook.save_to_buffer()?)?;
    Ok(table.rows.len())
}

fn sheet_row(index: usize) -> Result<u32, ExportError> {
    u32::try_from(index).map_err(|_| ExportError::SheetLimit(format!("{} rows", index)))
}

fn sheet_col(index: usize) -> Result<u16, ExportError> {
    u16::try_from(index).map_err(|_| ExportError::SheetLimit(format!("{} columns", index)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode_genotype;
    use serde_json::json;

    #[test]
    fn alternatives_numbered_in_first_seen_order() {
        let enc = encode_alleles("A", &["A", "T", "g", "het", "C", "T", ""]);
        assert_eq!(enc.codes, vec![0, 1, -1, -1, 2, 1, -1]);
        assert_eq!(enc.summary, "A/T,C");
    }

    #[test]
    fn no_alternatives_gives_bare_reference() {
        let enc = encode_alleles("G", &["G", "G"]);
        assert_eq!(enc.codes, vec![0, 0]);
        assert_eq!(enc.summary, "G/");
    }

    #[test]
    fn decode_then_encode_is_deterministic() {
        let raw = [json!("T"), json!("?"), json!("C"), json!("T"), json!("a")];
        let tokens = |raw: &[Value]| -> Vec<String> {
            raw.iter()
                .map(|v| decode_genotype(v, Some("A")).token)
                .collect()
        };
        let first = encode_alleles("A", &tokens(&raw));
        let second = encode_alleles("A", &tokens(&raw));
        assert_eq!(first, second);
        assert_eq!(first.codes, vec![1, -1, 2, 1, -1]);
        assert_eq!(first.summary, "A/T,C");
    }

    fn fixture() -> (StrainRegistry, ConsequenceVocabulary, Vec<String>, Vec<Vec<Value>>) {
        let strains = StrainRegistry::new(vec!["A_J".into(), "CAST_EiJ".into()], vec![]).unwrap();
        let vocab = ConsequenceVocabulary::new(
            vec!["missense_variant".into(), "stop_gained".into()],
            vec![],
        );
        let columns: Vec<String> = ["symbol", "chrom", "pos", "consequence", "ref", "A_J", "CAST_EiJ"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let rows = vec![
            vec![json!("Pax6"), json!("2"), json!(105_000), json!([0, 1]), json!("A"), json!("G"), json!("?")],
            vec![json!(null), json!("2"), json!(105_010), json!([1]), json!("C"), json!("C"), json!("T")],
        ];
        (strains, vocab, columns, rows)
    }

    #[test]
    fn csv_export_rewrites_reference_and_strains() {
        let (strains, vocab, columns, rows) = fixture();

        let mut out = Vec::new();
        let written = write_csv(&mut out, &columns, &rows, &vocab, &strains).unwrap();
        assert_eq!(written, 2);
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "symbol,chrom,pos,consequence,reference/alternatives,A_J,CAST_EiJ");
        assert_eq!(lines[1], "Pax6,2,105000,missense_variant&stop_gained,A/G,1,-1");
        assert_eq!(lines[2], ",2,105010,stop_gained,C/T,0,1");
    }

    #[test]
    fn xlsx_export_matches_csv_encoding() {
        use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
        use std::io::Cursor;

        let (strains, vocab, columns, rows) = fixture();
        let mut out = Vec::new();
        let written = write_xlsx(&mut out, &columns, &rows, &vocab, &strains).unwrap();
        assert_eq!(written, 2);

        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(out)).unwrap();
        let range = workbook.worksheet_range(config::EXPORT_SHEET_NAME).unwrap();
        let sheet: Vec<Vec<Data>> = range.rows().map(|r| r.to_vec()).collect();
        assert_eq!(sheet.len(), 3);

        let header: Vec<Data> = [
            "symbol",
            "chrom",
            "pos",
            "consequence",
            "reference/alternatives",
            "A_J",
            "CAST_EiJ",
        ]
        .iter()
        .map(|h| Data::String(h.to_string()))
        .collect();
        assert_eq!(sheet[0], header);

        assert_eq!(sheet[1][0], Data::String("Pax6".into()));
        assert_eq!(sheet[1][2], Data::Float(105_000.0));
        assert_eq!(sheet[1][3], Data::String("missense_variant&stop_gained".into()));
        assert_eq!(sheet[1][4], Data::String("A/G".into()));
        assert_eq!(sheet[1][5], Data::Float(1.0));
        assert_eq!(sheet[1][6], Data::Float(-1.0));

        assert_eq!(sheet[2][0], Data::Empty);
        assert_eq!(sheet[2][4], Data::String("C/T".into()));
        assert_eq!(sheet[2][5], Data::Float(0.0));
        assert_eq!(sheet[2][6], Data::Float(1.0));
    }

    #[test]
    fn export_format_parsing() {
        assert_eq!(ExportFormat::parse("csv").unwrap(), ExportFormat::Csv);
        assert_eq!(ExportFormat::parse("XLSX").unwrap(), ExportFormat::Xlsx);
        assert_eq!(ExportFormat::parse("excel").unwrap(), ExportFormat::Xlsx);
        assert!(matches!(
            ExportFormat::parse("pdf"),
            Err(ExportError::UnknownFormat(_))
        ));
        assert_eq!(ExportFormat::default().extension(), "csv");
    }

    #[test]
    fn xlsx_rejects_more_columns_than_a_sheet_holds() {
        let (strains, vocab, _, _) = fixture();
        let columns: Vec<String> = (0..=config::MAX_SHEET_COLUMNS).map(|i| format!("c{}", i)).collect();
        let err = write_xlsx(Vec::new(), &columns, &[], &vocab, &strains).unwrap_err();
        assert!(matches!(err, ExportError::SheetLimit(_)));
    }
}
