use super::Sorter;
use crate::core::query::{OrderTerm, ProfileQuery, SortField};
use crate::core::Params;
use crate::models::SortDirection;
use serde_json::json;

/// Plain column ordering (relevance, experience, newest, name, ...)
#[derive(Debug, Clone)]
pub struct FieldSorter {
    field: SortField,
    direction: SortDirection,
}

impl FieldSorter {
    /// Names sort A-Z by default, everything else highest first
    pub fn new(field: SortField) -> Self {
        let direction = match field {
            SortField::Name => SortDirection::Asc,
            _ => SortDirection::Desc,
        };
        Self { field, direction }
    }

    pub fn with_direction(mut self, direction: SortDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn field(&self) -> SortField {
        self.field
    }

    fn field_name(&self) -> &'static str {
        match self.field {
            SortField::Relevance => "relevance",
            SortField::Experience => "experience",
            SortField::RegisteredAt => "newest",
            SortField::Name => "name",
            SortField::Reviews => "reviews",
            SortField::LastActivity => "activity",
            SortField::Views => "views",
        }
    }
}

impl Sorter for FieldSorter {
    fn name(&self) -> &'static str {
        self.field_name()
    }

    fn apply(&self, query: ProfileQuery) -> ProfileQuery {
        query.order_by(OrderTerm::Field {
            field: self.field,
            direction: self.direction,
        })
    }

    fn params(&self) -> Params {
        Params::from([
            ("field".to_string(), json!(self.field_name())),
            ("direction".to_string(), json!(self.direction.to_string())),
        ])
    }

    fn description(&self) -> String {
        let label = match self.field {
            SortField::Relevance => "по релевантности",
            SortField::Experience => "по опыту",
            SortField::RegisteredAt => "сначала новые",
            SortField::Name => "по имени",
            SortField::Reviews => "по количеству отзывов",
            SortField::LastActivity => "по активности",
            SortField::Views => "по просмотрам",
        };
        label.to_string()
    }

    fn direction(&self) -> SortDirection {
        self.direction
    }

    fn set_direction(&mut self, direction: SortDirection) {
        self.direction = direction;
    }

    fn box_clone(&self) -> Box<dyn Sorter> {
        Box::new(self.clone())
    }
}
