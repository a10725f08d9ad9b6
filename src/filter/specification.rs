use serde_json::Value;

use super::types::{FieldDescriptor, FieldValue, Filterable, SearchType, SqlResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Equals {
        field: FieldDescriptor,
        value: FieldValue,
    },
    /// `needle` is already lowercased
    Contains {
        field: FieldDescriptor,
        needle: String,
    },
}

impl Predicate {
    pub fn field(&self) -> &FieldDescriptor {
        match self {
            Predicate::Equals { field, .. } | Predicate::Contains { field, .. } => field,
        }
    }

    pub fn matches<T: Filterable>(&self, record: &T) -> bool {
        let actual = record.field_value(self.field().name);
        match (self, actual) {
            (Predicate::Equals { value, .. }, Some(actual)) => &actual == value,
            (Predicate::Contains { needle, .. }, Some(FieldValue::Text(text))) => {
                text.to_lowercase().contains(needle.as_str())
            }
            _ => false,
        }
    }

    fn to_sql(&self, params: &mut Vec<Value>, offset: usize) -> String {
        match self {
            Predicate::Equals { field, value } => {
                params.push(value.to_json());
                format!("\"{}\" = ${}", field.column, offset + params.len())
            }
            Predicate::Contains { field, needle } => {
                params.push(Value::String(format!("%{}%", escape_like(needle))));
                format!("LOWER(\"{}\") LIKE ${}", field.column, offset + params.len())
            }
        }
    }
}

/// Storage-agnostic filter: a flat list of predicates joined by AND or OR.
/// No predicates matches every record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Specification {
    predicates: Vec<Predicate>,
    search_type: SearchType,
}

impl Specification {
    pub fn new(predicates: Vec<Predicate>, search_type: SearchType) -> Self {
        Self { predicates, search_type }
    }

    pub fn match_all() -> Self {
        Self::default()
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn search_type(&self) -> SearchType {
        self.search_type
    }

    pub fn is_match_all(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn matches<T: Filterable>(&self, record: &T) -> bool {
        if self.predicates.is_empty() {
            return true;
        }
        match self.search_type {
            SearchType::And => self.predicates.iter().all(|p| p.matches(record)),
            SearchType::Or => self.predicates.iter().any(|p| p.matches(record)),
        }
    }

    /// Render as a WHERE fragment. Placeholders are numbered after
    /// `starting_param_index` so the caller can append more parameters.
    pub fn to_sql(&self, starting_param_index: usize) -> SqlResult {
        if self.predicates.is_empty() {
            return SqlResult { query: "1=1".to_string(), params: vec![] };
        }

        let mut params = Vec::with_capacity(self.predicates.len());
        let parts: Vec<String> = self
            .predicates
            .iter()
            .map(|p| p.to_sql(&mut params, starting_param_index))
            .collect();

        SqlResult {
            query: format!("({})", parts.join(self.search_type.sql_joiner())),
            params,
        }
    }
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::types::FieldKind;

    const NAME: FieldDescriptor = FieldDescriptor::new("name", "name", FieldKind::Text);
    const ACTIVE: FieldDescriptor = FieldDescriptor::new("active", "active", FieldKind::Boolean);

    #[test]
    fn renders_and_with_numbered_params() {
        let spec = Specification::new(
            vec![
                Predicate::Contains { field: NAME, needle: "acme".to_string() },
                Predicate::Equals { field: ACTIVE, value: FieldValue::Bool(true) },
            ],
            SearchType::And,
        );
        let sql = spec.to_sql(0);
        assert_eq!(sql.query, "(LOWER(\"name\") LIKE $1 AND \"active\" = $2)");
        assert_eq!(sql.params, vec![Value::String("%acme%".into()), Value::Bool(true)]);
    }

    #[test]
    fn renders_or_after_offset() {
        let spec = Specification::new(
            vec![
                Predicate::Contains { field: NAME, needle: "a".to_string() },
                Predicate::Equals { field: ACTIVE, value: FieldValue::Bool(false) },
            ],
            SearchType::Or,
        );
        let sql = spec.to_sql(2);
        assert_eq!(sql.query, "(LOWER(\"name\") LIKE $3 OR \"active\" = $4)");
        assert_eq!(sql.params.len(), 2);
    }

    #[test]
    fn empty_specification_matches_everything() {
        let sql = Specification::match_all().to_sql(0);
        assert_eq!(sql.query, "1=1");
        assert!(sql.params.is_empty());
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
    }
}
