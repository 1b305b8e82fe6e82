use super::Sorter;
use crate::core::query::{OrderTerm, ProfileQuery};
use crate::core::Params;
use crate::models::{PopularityWeights, SearchableProfile, SortDirection};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeSet;

const WEIGHT_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PopularityFactor {
    Views,
    Bookings,
    Reviews,
    Rating,
}

impl PopularityFactor {
    pub const ALL: [PopularityFactor; 4] = [
        PopularityFactor::Views,
        PopularityFactor::Bookings,
        PopularityFactor::Reviews,
        PopularityFactor::Rating,
    ];

    fn weight(self, weights: &PopularityWeights) -> f64 {
        match self {
            Self::Views => weights.views,
            Self::Bookings => weights.bookings,
            Self::Reviews => weights.reviews,
            Self::Rating => weights.rating,
        }
    }

    /// Un-weighted factor value
    fn value(self, profile: &SearchableProfile) -> f64 {
        match self {
            Self::Views => (profile.views_count as f64 + 1.0).log10(),
            Self::Bookings => profile.bookings_count as f64,
            Self::Reviews => (profile.review_count as f64).sqrt(),
            Self::Rating => profile.rating.unwrap_or(0.0) / 5.0,
        }
    }
}

/// Weighted multi-factor popularity
///
/// `log10(views+1)·w_v + bookings·w_b + sqrt(reviews)·w_r + (rating/5)·w_g`,
/// normalized by the sum of enabled weights whenever that sum is not 1.
#[derive(Debug, Clone)]
pub struct PopularitySorter {
    weights: PopularityWeights,
    disabled: BTreeSet<PopularityFactor>,
    direction: SortDirection,
}

impl PopularitySorter {
    pub fn new(weights: PopularityWeights) -> Self {
        Self {
            weights,
            disabled: BTreeSet::new(),
            direction: SortDirection::Desc,
        }
    }

    pub fn disable(mut self, factor: PopularityFactor) -> Self {
        self.disabled.insert(factor);
        self
    }

    fn enabled(&self) -> impl Iterator<Item = PopularityFactor> + '_ {
        PopularityFactor::ALL
            .into_iter()
            .filter(|f| !self.disabled.contains(f))
    }

    pub fn score(&self, profile: &SearchableProfile) -> f64 {
        let raw: f64 = self
            .enabled()
            .map(|f| f.value(profile) * f.weight(&self.weights))
            .sum();
        let total_weight: f64 = self.enabled().map(|f| f.weight(&self.weights)).sum();

        if total_weight.abs() > WEIGHT_EPSILON && (total_weight - 1.0).abs() > WEIGHT_EPSILON {
            raw / total_weight
        } else {
            raw
        }
    }
}

impl Default for PopularitySorter {
    fn default() -> Self {
        Self::new(PopularityWeights::default())
    }
}

impl Sorter for PopularitySorter {
    fn name(&self) -> &'static str {
        "popularity"
    }

    fn apply(&self, query: ProfileQuery) -> ProfileQuery {
        query
            .map_rows(|row| row.popularity_score = Some(self.score(&row.profile)))
            .order_by(OrderTerm::Popularity {
                direction: self.direction,
            })
    }

    fn params(&self) -> Params {
        let mut params = Params::from([
            ("weights".to_string(), json!(self.weights)),
            ("direction".to_string(), json!(self.direction.to_string())),
        ]);
        if !self.disabled.is_empty() {
            params.insert("disabled_factors".into(), json!(self.disabled));
        }
        params
    }

    fn description(&self) -> String {
        "по популярности".to_string()
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
    use chrono::Utc;

    #[test]
    fn test_default_weights_sum_to_one() {
        let profile = SearchableProfile {
            views_count: 99,
            bookings_count: 2,
            review_count: 16,
            rating: Some(5.0),
            ..Default::default()
        };
        // 2·0.1 + 2·0.4 + 4·0.3 + 1·0.2
        let score = PopularitySorter::default().score(&profile);
        assert!((score - 2.4).abs() < 1e-9);
    }

    #[test]
    fn test_disabled_factor_renormalizes() {
        let profile = SearchableProfile {
            bookings_count: 10,
            ..Default::default()
        };
        let sorter = PopularitySorter::default().disable(PopularityFactor::Views);
        // 10·0.4 / 0.9
        assert!((sorter.score(&profile) - 4.0 / 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_orders_by_score_desc() {
        let profiles = vec![
            SearchableProfile { id: 1, bookings_count: 1, ..Default::default() },
            SearchableProfile { id: 2, bookings_count: 9, ..Default::default() },
        ];
        let query = ProfileQuery::from_profiles(profiles, Utc::now());
        let rows = PopularitySorter::default().apply(query).fetch();

        assert_eq!(rows[0].id(), 2);
        assert!(rows.iter().all(|r| r.popularity_score.is_some()));
    }
}
