//! Expansion of compact row encodings into display values.
//!
//! Consequences arrive as vocabulary indices and genotypes as small integer
//! codes or allele calls. Decoding never truncates; [`display_consequence`]
//! and [`display_call`] are the only places a value is shortened for display.

use crate::config;
use crate::error::DecodeError;
use crate::reference::{ConsequenceVocabulary, StrainRegistry};
use serde::Serialize;
use serde_json::Value;

/// Styling class of a decoded genotype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GenotypeClass {
    /// The strain differs from the reference.
    Positive,
    /// The strain matches the reference.
    Negative,
    /// Heterozygous, low confidence, or missing.
    Unknown,
}

/// A genotype ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Genotype {
    pub token: String,
    pub class: GenotypeClass,
}

impl Genotype {
    fn new(token: impl Into<String>, class: GenotypeClass) -> Self {
        Self {
            token: token.into(),
            class,
        }
    }
}

/// Token shown for heterozygous or ambiguous calls.
pub const HET_TOKEN: &str = "het";
/// Token shown for a positive integer code.
pub const ALT_TOKEN: &str = "alt";

/// Decode a consequence cell: one index or an array of indices.
///
/// Several consequences are joined with `&`.
pub fn decode_consequence(value: &Value, vocabulary: &ConsequenceVocabulary) -> Result<String, DecodeError> {
    let indices: Vec<i64> = match value {
        Value::Null => return Ok(String::new()),
        Value::Number(n) => vec![n
            .as_i64()
            .ok_or_else(|| DecodeError::MalformedConsequence(value.to_string()))?],
        Value::Array(items) => items
            .iter()
            .map(|v| {
                v.as_i64()
                    .ok_or_else(|| DecodeError::MalformedConsequence(value.to_string()))
            })
            .collect::<Result<_, _>>()?,
        _ => return Err(DecodeError::MalformedConsequence(value.to_string())),
    };
    let names = indices
        .into_iter()
        .map(|i| {
            vocabulary
                .name(i)
                .map(str::to_string)
                .ok_or(DecodeError::UnknownConsequence(i))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names.join(config::CONSEQUENCE_SEPARATOR))
}

/// Display form of a decoded consequence: first consequence only, `_` as
/// spaces, title case, with `...` when more were present.
pub fn display_consequence(decoded: &str) -> String {
    let (first, more) = match decoded.split_once(config::CONSEQUENCE_SEPARATOR) {
        Some((first, _)) => (first, true),
        None => (decoded, false),
    };
    let title = first
        .replace('_', " ")
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(c) => c.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ");
    if more {
        format!("{}...", title)
    } else {
        title
    }
}

/// Display form of an allele call, truncated to `max` characters.
pub fn display_call(call: &str, max: usize) -> String {
    if call.chars().count() > max {
        format!("{}...", call.chars().take(max).collect::<String>())
    } else {
        call.to_string()
    }
}

/// Decode a genotype cell relative to the row's reference allele.
///
/// Integer codes: `1` positive, `2` heterozygous, anything else matches the
/// reference. Allele calls: `?` heterozygous, same as the reference
/// (case-insensitive) negative, upper-case differing positive, lower-case
/// differing is a low-confidence call.
pub fn decode_genotype(value: &Value, reference: Option<&str>) -> Genotype {
    match value {
        Value::Number(n) => match n.as_i64() {
            Some(1) => Genotype::new(ALT_TOKEN, GenotypeClass::Positive),
            Some(2) => Genotype::new(HET_TOKEN, GenotypeClass::Unknown),
            _ => Genotype::new("", GenotypeClass::Negative),
        },
        Value::String(call) => decode_call(call, reference),
        _ => Genotype::new("", GenotypeClass::Unknown),
    }
}

fn decode_call(call: &str, reference: Option<&str>) -> Genotype {
    if call.is_empty() || call.eq_ignore_ascii_case("null") {
        return Genotype::new("", GenotypeClass::Unknown);
    }
    if call == "?" {
        return Genotype::new(HET_TOKEN, GenotypeClass::Unknown);
    }
    let matches_reference = reference.is_some_and(|r| r.eq_ignore_ascii_case(call));
    let class = if matches_reference {
        GenotypeClass::Negative
    } else if call.to_lowercase() != call {
        GenotypeClass::Positive
    } else {
        GenotypeClass::Unknown
    };
    Genotype::new(call, class)
}

/// A decoded cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DecodedCell {
    Text(String),
    Number(i64),
    Genotype(Genotype),
}

impl DecodedCell {
    /// Plain text form, as written to exports.
    pub fn text(&self) -> String {
        match self {
            DecodedCell::Text(s) => s.clone(),
            DecodedCell::Number(n) => n.to_string(),
            DecodedCell::Genotype(g) => g.token.clone(),
        }
    }
}

/// Decodes rows of a page response given their column names.
pub struct RowDecoder<'a> {
    columns: &'a [String],
    consequences: &'a ConsequenceVocabulary,
    strains: &'a StrainRegistry,
    consequence_idx: Option<usize>,
    reference_idx: Option<usize>,
}

impl<'a> RowDecoder<'a> {
    pub fn new(
        columns: &'a [String],
        consequences: &'a ConsequenceVocabulary,
        strains: &'a StrainRegistry,
    ) -> Self {
        let position = |name: &str| columns.iter().position(|c| c == name);
        Self {
            consequence_idx: position("consequence"),
            reference_idx: position(config::REFERENCE_COLUMN),
            columns,
            consequences,
            strains,
        }
    }

    pub fn is_strain_column(&self, index: usize) -> bool {
        self.columns
            .get(index)
            .is_some_and(|c| self.strains.contains(c))
    }

    pub fn reference_index(&self) -> Option<usize> {
        self.reference_idx
    }

    pub fn decode(&self, row: &[Value]) -> Result<Vec<DecodedCell>, DecodeError> {
        if row.len() != self.columns.len() {
            return Err(DecodeError::RowWidth {
                expected: self.columns.len(),
                actual: row.len(),
            });
        }
        let reference = self
            .reference_idx
            .and_then(|i| row[i].as_str())
            .filter(|r| !r.eq_ignore_ascii_case("null"));

        row.iter()
            .enumerate()
            .map(|(i, value)| {
                if Some(i) == self.consequence_idx {
                    decode_consequence(value, self.consequences).map(DecodedCell::Text)
                } else if self.is_strain_column(i) {
                    Ok(DecodedCell::Genotype(decode_genotype(value, reference)))
                } else {
                    Ok(plain_cell(value))
                }
            })
            .collect()
    }
}

fn plain_cell(value: &Value) -> DecodedCell {
    match value {
        Value::Null => DecodedCell::Text(String::new()),
        Value::String(s) if s.eq_ignore_ascii_case("null") => DecodedCell::Text(String::new()),
        Value::String(s) => DecodedCell::Text(s.clone()),
        Value::Number(n) => match n.as_i64() {
            Some(i) => DecodedCell::Number(i),
            None => DecodedCell::Text(n.to_string()),
        },
        other => DecodedCell::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vocabulary() -> ConsequenceVocabulary {
        ConsequenceVocabulary::new(
            vec![
                "missense_variant".into(),
                "splice_region_variant".into(),
                "stop_gained".into(),
            ],
            vec!["stop_gained".into()],
        )
    }

    #[test]
    fn consequences_join_with_ampersand() {
        let v = vocabulary();
        assert_eq!(decode_consequence(&json!([0, 1]), &v).unwrap(), "missense_variant&splice_region_variant");
        assert_eq!(decode_consequence(&json!([2]), &v).unwrap(), "stop_gained");
        assert_eq!(decode_consequence(&json!(2), &v).unwrap(), "stop_gained");
        assert_eq!(decode_consequence(&json!(7), &v), Err(DecodeError::UnknownConsequence(7)));
        assert!(decode_consequence(&json!("x"), &v).is_err());
    }

    #[test]
    fn display_truncates_only_for_display() {
        let decoded = "missense_variant&splice_region_variant";
        assert_eq!(display_consequence(decoded), "Missense Variant...");
        assert_eq!(display_consequence("STOP_GAINED"), "Stop Gained");
        assert_eq!(display_call("ACGTT", 3), "ACG...");
        assert_eq!(display_call("A", 3), "A");
    }

    #[test]
    fn integer_codes() {
        assert_eq!(decode_genotype(&json!(1), None).class, GenotypeClass::Positive);
        let het = decode_genotype(&json!(2), None);
        assert_eq!((het.token.as_str(), het.class), (HET_TOKEN, GenotypeClass::Unknown));
        assert_eq!(decode_genotype(&json!(0), None).class, GenotypeClass::Negative);
        assert_eq!(decode_genotype(&json!(9), None).class, GenotypeClass::Negative);
        assert_eq!(decode_genotype(&Value::Null, None).class, GenotypeClass::Unknown);
    }

    #[test]
    fn allele_calls() {
        let r = Some("A");
        assert_eq!(decode_genotype(&json!("G"), r).class, GenotypeClass::Positive);
        assert_eq!(decode_genotype(&json!("a"), r).class, GenotypeClass::Negative);
        assert_eq!(decode_genotype(&json!("g"), r).class, GenotypeClass::Unknown);
        assert_eq!(decode_genotype(&json!("?"), r).token, HET_TOKEN);
        assert_eq!(decode_genotype(&json!("NULL"), r).token, "");
    }

    #[test]
    fn row_decoder_uses_column_roles() {
        let strains = StrainRegistry::new(vec!["A_J".into(), "CAST_EiJ".into()], vec![]).unwrap();
        let v = vocabulary();
        let columns: Vec<String> = ["symbol", "pos", "consequence", "ref", "A_J", "CAST_EiJ"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let decoder = RowDecoder::new(&columns, &v, &strains);
        let row = vec![json!("Pax6"), json!(105_000), json!([2]), json!("C"), json!("T"), json!("C")];
        let cells = decoder.decode(&row).unwrap();
        assert_eq!(cells[0], DecodedCell::Text("Pax6".into()));
        assert_eq!(cells[1], DecodedCell::Number(105_000));
        assert_eq!(cells[2], DecodedCell::Text("stop_gained".into()));
        assert_eq!(
            cells[4],
            DecodedCell::Genotype(Genotype::new("T", GenotypeClass::Positive))
        );
        assert_eq!(
            cells[5],
            DecodedCell::Genotype(Genotype::new("C", GenotypeClass::Negative))
        );

        assert_eq!(
            decoder.decode(&row[..3]),
            Err(DecodeError::RowWidth {
                expected: 6,
                actual: 3
            })
        );
    }
}
