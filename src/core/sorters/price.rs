use super::Sorter;
use crate::core::query::{OrderTerm, ProfileQuery};
use crate::core::Params;
use crate::models::{PriceField, SortDirection};
use serde_json::json;

/// Orders by price; rows without a price always come last
#[derive(Debug, Clone)]
pub struct PriceSorter {
    field: PriceField,
    direction: SortDirection,
}

impl PriceSorter {
    pub fn new() -> Self {
        Self {
            field: PriceField::MinPrice,
            direction: SortDirection::Asc,
        }
    }

    pub fn with_field(mut self, field: PriceField) -> Self {
        self.field = field;
        self
    }

    pub fn with_direction(mut self, direction: SortDirection) -> Self {
        self.direction = direction;
        self
    }
}

impl Default for PriceSorter {
    fn default() -> Self {
        Self::new()
    }
}

impl Sorter for PriceSorter {
    fn name(&self) -> &'static str {
        "price"
    }

    fn apply(&self, query: ProfileQuery) -> ProfileQuery {
        query.order_by(OrderTerm::Price {
            field: self.field,
            direction: self.direction,
        })
    }

    fn params(&self) -> Params {
        Params::from([
            ("price_field".to_string(), json!(self.field.to_string())),
            ("direction".to_string(), json!(self.direction.to_string())),
        ])
    }

    fn description(&self) -> String {
        match self.direction {
            SortDirection::Asc => "сначала дешевле".to_string(),
            SortDirection::Desc => "сначала дороже".to_string(),
        }
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SearchableProfile;
    use chrono::Utc;

    #[test]
    fn test_price_desc_keeps_nulls_last() {
        let profiles = [Some(500.0), None, Some(3000.0), Some(1200.0)]
            .into_iter()
            .enumerate()
            .map(|(i, price)| SearchableProfile {
                id: i as u64 + 1,
                min_price: price,
                ..Default::default()
            });
        let query = ProfileQuery::from_profiles(profiles, Utc::now());

        let sorted = PriceSorter::new().with_direction(SortDirection::Desc).apply(query);
        let ids: Vec<_> = sorted.fetch().iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec![3, 4, 1, 2]);
    }
}
