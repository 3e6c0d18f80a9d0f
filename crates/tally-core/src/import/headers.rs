//! Column inference for statements with unknown header labels
//!
//! Headers are normalized (accents folded, lowercase, punctuation collapsed)
//! and matched against per-field label dictionaries: exact matches first,
//! then the first header containing a candidate label.

use serde::{Deserialize, Serialize};

use super::normalize::fold_accents;
use crate::error::RowError;

const DATE_LABELS: &[&str] = &[
    "data",
    "date",
    "data lancamento",
    "data do lancamento",
    "data da compra",
    "data compra",
    "data movimento",
    "transaction date",
    "posting date",
    "fecha",
    "dt",
];

const DESCRIPTION_LABELS: &[&str] = &[
    "descricao",
    "description",
    "historico",
    "estabelecimento",
    "lancamento",
    "memo",
    "detalhes",
    "details",
    "merchant",
    "payee",
    "concepto",
];

const AMOUNT_LABELS: &[&str] = &[
    "valor",
    "value",
    "amount",
    "valor r",
    "valor rs",
    "valor brl",
    "quantia",
    "importe",
    "monto",
];

const CATEGORY_LABELS: &[&str] = &["categoria", "category"];

/// Caller-supplied column mapping (field -> header name), used verbatim
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub date: Option<String>,
    pub description: Option<String>,
    pub value: Option<String>,
    pub category: Option<String>,
}

/// Resolved column positions.
///
/// A `None` in a mandatory field only happens with an explicit mapping whose
/// header is absent from the file; the cell then reads as empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnMap {
    pub date: Option<usize>,
    pub description: Option<usize>,
    pub amount: Option<usize>,
    pub category: Option<usize>,
}

/// Fold accents, lowercase, collapse non-alphanumeric runs to one space
pub fn normalize_header(header: &str) -> String {
    let folded = fold_accents(header).to_lowercase();
    folded
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolve which columns carry date, description, amount and category
pub fn resolve_columns(
    headers: &[String],
    mapping: Option<&ColumnMapping>,
) -> Result<ColumnMap, RowError> {
    match mapping {
        Some(mapping) => resolve_explicit(headers, mapping),
        None => infer_columns(headers),
    }
}

fn resolve_explicit(headers: &[String], mapping: &ColumnMapping) -> Result<ColumnMap, RowError> {
    let required = |key: &Option<String>| -> Result<Option<usize>, RowError> {
        match key.as_deref() {
            Some(name) if !name.is_empty() => Ok(headers.iter().position(|h| h == name)),
            _ => Err(RowError::MappingNotFound),
        }
    };

    Ok(ColumnMap {
        date: required(&mapping.date)?,
        description: required(&mapping.description)?,
        amount: required(&mapping.value)?,
        category: mapping
            .category
            .as_deref()
            .and_then(|name| headers.iter().position(|h| h == name)),
    })
}

fn infer_columns(headers: &[String]) -> Result<ColumnMap, RowError> {
    let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
    let mut claimed = vec![false; headers.len()];

    let date = claim(&normalized, &mut claimed, DATE_LABELS);
    let description = claim(&normalized, &mut claimed, DESCRIPTION_LABELS);
    let amount = claim(&normalized, &mut claimed, AMOUNT_LABELS);
    let category = claim(&normalized, &mut claimed, CATEGORY_LABELS);

    if date.is_none() || description.is_none() || amount.is_none() {
        return Err(RowError::MappingNotFound);
    }

    Ok(ColumnMap {
        date,
        description,
        amount,
        category,
    })
}

/// Exact label match first, then the first unclaimed header containing a label
fn claim(normalized: &[String], claimed: &mut [bool], labels: &[&str]) -> Option<usize> {
    let available = |i: &usize| !claimed[*i];

    let exact = (0..normalized.len())
        .filter(available)
        .find(|&i| labels.contains(&normalized[i].as_str()));

    let found = exact.or_else(|| {
        (0..normalized.len())
            .filter(available)
            .find(|&i| labels.iter().any(|label| contains_label(&normalized[i], label)))
    })?;

    claimed[found] = true;
    Some(found)
}

/// Labels this short only match as whole words ("dt" must not hit "loadtime")
const WHOLE_WORD_MAX_LEN: usize = 2;

fn contains_label(header: &str, label: &str) -> bool {
    if label.len() <= WHOLE_WORD_MAX_LEN {
        header.split(' ').any(|word| word == label)
    } else {
        header.contains(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("Data Lançamento"), "data lancamento");
        assert_eq!(normalize_header("  Valor (R$) "), "valor r");
        assert_eq!(normalize_header("DESCRIÇÃO"), "descricao");
        assert_eq!(normalize_header("Transaction_Date"), "transaction date");
    }

    #[test]
    fn test_infer_portuguese_headers() {
        let map = resolve_columns(
            &headers(&["Data Lançamento", "Estabelecimento", "Valor (R$)"]),
            None,
        )
        .unwrap();
        assert_eq!(map.date, Some(0));
        assert_eq!(map.description, Some(1));
        assert_eq!(map.amount, Some(2));
        assert_eq!(map.category, None);
    }

    #[test]
    fn test_infer_english_headers_any_order() {
        let map = resolve_columns(
            &headers(&["Amount", "Category", "Description", "Date"]),
            None,
        )
        .unwrap();
        assert_eq!(map.date, Some(3));
        assert_eq!(map.description, Some(2));
        assert_eq!(map.amount, Some(0));
        assert_eq!(map.category, Some(1));
    }

    #[test]
    fn test_exact_match_beats_substring() {
        // "Data Vencimento" contains "data" but the exact "Data" column wins
        let map = resolve_columns(
            &headers(&["Data Vencimento", "Data", "Histórico", "Valor"]),
            None,
        )
        .unwrap();
        assert_eq!(map.date, Some(1));
        assert_eq!(map.description, Some(2));
    }

    #[test]
    fn test_claimed_header_not_reused() {
        // "Data Lançamento" also contains the description label "lancamento",
        // but it already belongs to the date field
        let map = resolve_columns(
            &headers(&["Data Lançamento", "Valor", "Histórico do cliente"]),
            None,
        )
        .unwrap();
        assert_eq!(map.date, Some(0));
        assert_eq!(map.description, Some(2));
        assert_eq!(map.amount, Some(1));
    }

    #[test]
    fn test_infer_labels_inside_longer_headers() {
        for names in [
            ["Data", "Descrição", "Valores"],
            ["DataMov", "Historico", "Valor"],
            ["Data", "Descricao", "ValorTotal"],
        ] {
            let map = resolve_columns(&headers(&names), None);
            assert!(map.is_ok(), "{:?} -> {:?}", names, map);
            assert_eq!(
                map.unwrap(),
                ColumnMap {
                    date: Some(0),
                    description: Some(1),
                    amount: Some(2),
                    category: None,
                }
            );
        }
    }

    #[test]
    fn test_short_label_needs_whole_word() {
        let map = resolve_columns(&headers(&["Dt Mov", "Historico", "Valor"]), None).unwrap();
        assert_eq!(map.date, Some(0));

        // "loadtime" contains "dt" only as letters, not as a word
        let err = resolve_columns(&headers(&["Loadtime", "Description", "Amount"]), None);
        assert_eq!(err, Err(RowError::MappingNotFound));
    }

    #[test]
    fn test_missing_mandatory_field() {
        let err = resolve_columns(&headers(&["Data", "Valor"]), None).unwrap_err();
        assert_eq!(err, RowError::MappingNotFound);
        assert_eq!(err.to_string(), "mapping_not_found");
    }

    #[test]
    fn test_explicit_mapping_used_verbatim() {
        let mapping = ColumnMapping {
            date: Some("Quando".into()),
            description: Some("O que".into()),
            value: Some("Quanto".into()),
            category: None,
        };
        let map = resolve_columns(&headers(&["Quanto", "Quando", "O que"]), Some(&mapping))
            .unwrap();
        assert_eq!(map.date, Some(1));
        assert_eq!(map.description, Some(2));
        assert_eq!(map.amount, Some(0));
    }

    #[test]
    fn test_explicit_mapping_absent_header_reads_empty() {
        let mapping = ColumnMapping {
            date: Some("Data".into()),
            description: Some("Descricao".into()),
            value: Some("Montante".into()),
            category: None,
        };
        let map = resolve_columns(&headers(&["Data", "Descricao", "Valor"]), Some(&mapping))
            .unwrap();
        assert_eq!(map.amount, None);
    }

    #[test]
    fn test_explicit_mapping_missing_key() {
        let mapping = ColumnMapping {
            date: Some("Data".into()),
            ..Default::default()
        };
        assert_eq!(
            resolve_columns(&headers(&["Data"]), Some(&mapping)),
            Err(RowError::MappingNotFound)
        );
    }
}
