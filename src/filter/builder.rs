use std::collections::HashMap;

use tracing::warn;

use super::error::FilterError;
use super::specification::{Predicate, Specification};
use super::types::{FieldDescriptor, FieldKind, FieldValue, Filterable, SearchType};

/// Query-string key selecting AND/OR combination
pub const SEARCH_TYPE_KEY: &str = "searchType";

/// Builds a `Specification` for `T` from a flat query-string map.
///
/// Keys that are not declared fields of `T` (paging keys, `searchType`, typos)
/// are ignored. Empty values are ignored. A field whose value cannot be coerced
/// to its kind is logged and skipped rather than failing the whole request.
pub struct FilterSpecificationBuilder;

impl FilterSpecificationBuilder {
    pub fn build<T: Filterable>(params: &HashMap<String, String>) -> Specification {
        let search_type = SearchType::parse(params.get(SEARCH_TYPE_KEY).map(String::as_str));

        // Walk the declared table rather than the map so predicate order is stable
        let predicates = T::FIELDS
            .iter()
            .filter_map(|field| {
                let raw = params.get(field.name)?;
                if raw.trim().is_empty() {
                    return None;
                }
                match Self::predicate(field, raw) {
                    Ok(predicate) => Some(predicate),
                    Err(e) => {
                        warn!("Skipping filter field: {}", e);
                        None
                    }
                }
            })
            .collect();

        Specification::new(predicates, search_type)
    }

    pub fn predicate(field: &FieldDescriptor, raw: &str) -> Result<Predicate, FilterError> {
        let raw = raw.trim();
        let predicate = match field.kind {
            FieldKind::Id => {
                let id = raw.parse::<i64>().map_err(|_| FilterError::InvalidId {
                    field: field.name.to_string(),
                    value: raw.to_string(),
                })?;
                Predicate::Equals { field: *field, value: FieldValue::Id(id) }
            }
            FieldKind::Boolean => Predicate::Equals {
                field: *field,
                value: FieldValue::Bool(raw.eq_ignore_ascii_case("true")),
            },
            FieldKind::Enumerated(variants) => {
                let variant = variants.iter().find(|v| **v == raw).ok_or_else(|| {
                    FilterError::InvalidEnum {
                        field: field.name.to_string(),
                        value: raw.to_string(),
                        allowed: variants.join(", "),
                    }
                })?;
                Predicate::Equals {
                    field: *field,
                    value: FieldValue::Text((*variant).to_string()),
                }
            }
            FieldKind::Text => Predicate::Contains {
                field: *field,
                needle: raw.to_lowercase(),
            },
        };
        Ok(predicate)
    }
}
