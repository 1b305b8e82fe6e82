use super::Filter;
use crate::core::query::ProfileQuery;
use crate::core::Params;
use crate::models::{FilterCriteria, PriceField, SearchableProfile};
use serde_json::json;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceParams {
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Also admit rows whose price is unknown
    pub include_null_prices: bool,
    pub field: PriceField,
}

/// Inclusive `[min, max]` price range
#[derive(Debug, Clone, Default)]
pub struct PriceFilter {
    params: PriceParams,
}

impl PriceFilter {
    pub fn new(params: PriceParams) -> Self {
        Self { params }
    }

    pub fn between(min: Option<f64>, max: Option<f64>) -> Self {
        Self::new(PriceParams {
            min,
            max,
            ..Default::default()
        })
    }

    /// Explicit bounds win over `price_range`
    pub fn from_criteria(criteria: &FilterCriteria) -> Self {
        let (range_min, range_max) = criteria
            .price_range
            .map_or((None, None), |(lo, hi)| (Some(lo), Some(hi)));
        Self::new(PriceParams {
            min: criteria.price_min.or(range_min),
            max: criteria.price_max.or(range_max),
            include_null_prices: criteria.include_null_prices,
            field: criteria.price_field.unwrap_or_default(),
        })
    }

    pub fn params(&self) -> &PriceParams {
        &self.params
    }

    fn in_range(&self, price: f64) -> bool {
        self.params.min.map_or(true, |min| price >= min)
            && self.params.max.map_or(true, |max| price <= max)
    }

    fn matches(&self, profile: &SearchableProfile) -> bool {
        let mut prices = match self.params.field {
            PriceField::MinPrice => profile.min_price.into_iter().collect::<Vec<_>>(),
            PriceField::ListingPrice => profile.listings.iter().filter_map(|l| l.price).collect(),
        };
        if prices.is_empty() {
            return self.params.include_null_prices;
        }
        prices.retain(|p| self.in_range(*p));
        !prices.is_empty()
    }
}

impl Filter for PriceFilter {
    fn name(&self) -> &'static str {
        "price"
    }

    fn apply(&self, query: ProfileQuery) -> ProfileQuery {
        if !self.is_active() {
            return query;
        }
        query.filter(|row| self.matches(&row.profile))
    }

    fn is_active(&self) -> bool {
        self.params.min.is_some() || self.params.max.is_some()
    }

    fn active_params(&self) -> Params {
        let mut params = Params::new();
        if !self.is_active() {
            return params;
        }
        if let Some(min) = self.params.min {
            params.insert("price_min".into(), json!(min));
        }
        if let Some(max) = self.params.max {
            params.insert("price_max".into(), json!(max));
        }
        if self.params.include_null_prices {
            params.insert("include_null_prices".into(), json!(true));
        }
        if self.params.field != PriceField::default() {
            params.insert("price_field".into(), json!(self.params.field.to_string()));
        }
        params
    }

    fn description(&self) -> String {
        match (self.params.min, self.params.max) {
            (Some(min), Some(max)) => format!("цена от {} до {} ₽", min, max),
            (Some(min), None) => format!("цена от {} ₽", min),
            (None, Some(max)) => format!("цена до {} ₽", max),
            (None, None) => String::new(),
        }
    }

    fn reset(&mut self) {
        self.params = PriceParams::default();
    }

    fn box_clone(&self) -> Box<dyn Filter> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ListingSummary;
    use chrono::Utc;

    fn query() -> ProfileQuery {
        let prices = [Some(1000.0), Some(2000.0), Some(7000.0), None];
        let profiles = prices.iter().enumerate().map(|(i, price)| SearchableProfile {
            id: i as u64 + 1,
            min_price: *price,
            ..Default::default()
        });
        ProfileQuery::from_profiles(profiles, Utc::now())
    }

    fn ids(query: ProfileQuery) -> Vec<u64> {
        query.fetch().iter().map(|r| r.id()).collect()
    }

    #[test]
    fn test_inclusive_bounds() {
        let filter = PriceFilter::between(Some(1000.0), Some(2000.0));
        assert_eq!(ids(filter.apply(query())), vec![1, 2]);
    }

    #[test]
    fn test_null_prices_excluded_unless_requested() {
        let mut params = PriceParams {
            min: Some(1500.0),
            ..Default::default()
        };
        assert_eq!(ids(PriceFilter::new(params.clone()).apply(query())), vec![2, 3]);

        params.include_null_prices = true;
        assert_eq!(ids(PriceFilter::new(params).apply(query())), vec![2, 3, 4]);
    }

    #[test]
    fn test_listing_price_field() {
        let profile = SearchableProfile {
            id: 1,
            min_price: Some(100.0),
            listings: vec![
                ListingSummary { id: 1, price: Some(5000.0), ..Default::default() },
                ListingSummary { id: 2, price: Some(9000.0), ..Default::default() },
            ],
            ..Default::default()
        };
        let filter = PriceFilter::new(PriceParams {
            min: Some(8000.0),
            field: PriceField::ListingPrice,
            ..Default::default()
        });
        let query = ProfileQuery::from_profiles(vec![profile], Utc::now());

        assert_eq!(filter.apply(query).len(), 1);
        assert_eq!(filter.active_params()["price_field"], json!("listing_price"));
    }

    #[test]
    fn test_range_fallback() {
        let criteria = FilterCriteria {
            price_range: Some((1500.0, 6000.0)),
            ..Default::default()
        };
        let filter = PriceFilter::from_criteria(&criteria);
        assert_eq!(ids(filter.apply(query())), vec![2]);
    }
}
