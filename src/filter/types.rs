use serde_json::Value;

/// How a declared field is matched when it appears in a filter map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Numeric identifier, exact equality
    Id,
    /// `true` (any case) or false, exact equality
    Boolean,
    /// One of a fixed set of variant names, exact equality
    Enumerated(&'static [&'static str]),
    /// Case-insensitive substring match
    Text,
}

/// Static description of one filterable field: the camelCase key accepted in
/// query strings and the storage column it maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub column: &'static str,
    pub kind: FieldKind,
}

impl FieldDescriptor {
    pub const fn new(name: &'static str, column: &'static str, kind: FieldKind) -> Self {
        Self { name, column, kind }
    }
}

/// Runtime value of a field on a record, used for in-memory evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Id(i64),
    Bool(bool),
    Text(String),
}

impl FieldValue {
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Id(id) => Value::from(*id),
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Text(s) => Value::String(s.clone()),
        }
    }
}

/// Implemented by every entity that list endpoints can filter
pub trait Filterable {
    const FIELDS: &'static [FieldDescriptor];

    /// Current value of the named field; `None` when the field is null
    fn field_value(&self, name: &str) -> Option<FieldValue>;

    fn describe(name: &str) -> Option<&'static FieldDescriptor> {
        Self::FIELDS.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchType {
    #[default]
    And,
    Or,
}

impl SearchType {
    /// Anything other than `or` (case-insensitive) means AND
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case("or") => SearchType::Or,
            _ => SearchType::And,
        }
    }

    pub fn sql_joiner(&self) -> &'static str {
        match self {
            SearchType::And => " AND ",
            SearchType::Or => " OR ",
        }
    }
}

/// Rendered SQL fragment plus its positional parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<Value>,
}
