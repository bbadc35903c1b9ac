use crate::ingestion::LineItemRow;
use crate::utils::parse_amount;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Strips diacritics, lowercases and collapses whitespace.
/// "Receita Líquida " and "receita  liquida" normalize to the same key.
pub fn normalize_key(raw: &str) -> String {
    let stripped: String = raw
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase();

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Named line items keyed by normalized description. Lookups are exact on the
/// normalized key; there is no partial matching.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineItemIndex {
    items: BTreeMap<String, f64>,
}

impl LineItemIndex {
    /// Items whose descriptions normalize to the same key are summed.
    pub fn from_items<S: AsRef<str>>(items: impl IntoIterator<Item = (S, f64)>) -> Self {
        let mut index: BTreeMap<String, f64> = BTreeMap::new();

        for (description, value) in items {
            let key = normalize_key(description.as_ref());
            if key.is_empty() {
                continue;
            }
            let slot = index.entry(key).or_insert(0.0);
            *slot += value;
        }

        debug!("Indexed {} line items", index.len());
        Self { items: index }
    }

    pub fn from_rows(rows: &[LineItemRow]) -> Self {
        Self::from_items(
            rows.iter()
                .map(|r| (r.description.as_str(), parse_amount(&r.value))),
        )
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.items.get(&normalize_key(name)).copied()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.items.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("Receita Líquida"), "receita liquida");
        assert_eq!(normalize_key("  CUSTO  DAS   Mercadorias "), "custo das mercadorias");
        assert_eq!(normalize_key("Saídas ção"), "saidas cao");
    }

    #[test]
    fn test_lookup_is_accent_and_case_insensitive() {
        let index = LineItemIndex::from_items([
            ("Receita Bruta", 1000.0),
            ("Receita Líquida", 850.0),
            ("Lucro Líquido", 120.0),
        ]);

        assert_eq!(index.get("RECEITA LIQUIDA"), Some(850.0));
        assert_eq!(index.get("lucro liquido"), Some(120.0));
    }

    #[test]
    fn test_partial_names_do_not_match() {
        let index = LineItemIndex::from_items([("Receita Bruta", 1000.0), ("Receita Líquida", 850.0)]);
        assert_eq!(index.get("Receita"), None);
    }

    #[test]
    fn test_duplicate_descriptions_are_summed() {
        let rows = vec![
            LineItemRow {
                description: "Despesas Operacionais".to_string(),
                value: "100".to_string(),
            },
            LineItemRow {
                description: "despesas operacionais".to_string(),
                value: "50.5".to_string(),
            },
            LineItemRow {
                description: "   ".to_string(),
                value: "1".to_string(),
            },
        ];

        let index = LineItemIndex::from_rows(&rows);
        assert_eq!(index.len(), 1);
        assert_eq!(index.get("Despesas Operacionais"), Some(150.5));
    }

    #[test]
    fn test_index_serializes_as_map() {
        let index = LineItemIndex::from_items([("Lucro Líquido", 120.0), ("Receita Bruta", 1000.0)]);
        let json = serde_json::to_string(&index).unwrap();
        assert_eq!(json, r#"{"lucro liquido":120.0,"receita bruta":1000.0}"#);
    }
}
