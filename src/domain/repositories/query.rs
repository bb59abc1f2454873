use serde_json::Value;

use crate::domain::repositories::document::{compare_values, Document};

/// Sort direction for `orderBy`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Filter on a dotted field path
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq { field: String, value: Value },
    In { field: String, values: Vec<Value> },
}

impl Filter {
    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Filter::Eq { field, value } => document.field(field) == Some(value),
            Filter::In { field, values } => document
                .field(field)
                .map(|v| values.contains(v))
                .unwrap_or(false),
        }
    }
}

/// Collection query: filters are AND-ed, then results are ordered
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order_by: Option<OrderBy>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq {
            field: field.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn where_in(mut self, field: &str, values: Vec<Value>) -> Self {
        self.filters.push(Filter::In {
            field: field.to_string(),
            values,
        });
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.to_string(),
            direction,
        });
        self
    }

    pub fn matches(&self, document: &Document) -> bool {
        self.filters.iter().all(|f| f.matches(document))
    }

    /// Filter and order a full collection scan
    pub fn apply(&self, documents: impl IntoIterator<Item = Document>) -> Vec<Document> {
        let mut result: Vec<Document> = documents.into_iter().filter(|d| self.matches(d)).collect();

        if let Some(order) = &self.order_by {
            result.sort_by(|a, b| {
                let ordering = compare_values(a.field(&order.field), b.field(&order.field));
                let ordering = match order.direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                };
                ordering.then_with(|| a.id.cmp(&b.id))
            });
        } else {
            result.sort_by(|a, b| a.id.cmp(&b.id));
        }

        result
    }
}
