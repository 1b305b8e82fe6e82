use super::Sorter;
use crate::core::query::{OrderTerm, ProfileQuery};
use crate::core::Params;
use crate::models::{BayesianPrior, SortDirection};
use serde_json::json;

/// Orders by Bayesian-smoothed rating
///
/// With `consider_reviews_count` off, orders by the raw average instead.
/// Unrated profiles sort last in either mode and either direction.
#[derive(Debug, Clone)]
pub struct RatingSorter {
    prior: BayesianPrior,
    consider_reviews_count: bool,
    direction: SortDirection,
}

impl RatingSorter {
    pub fn new(prior: BayesianPrior) -> Self {
        Self {
            prior,
            consider_reviews_count: true,
            direction: SortDirection::Desc,
        }
    }

    pub fn consider_reviews_count(mut self, enabled: bool) -> Self {
        self.consider_reviews_count = enabled;
        self
    }
}

impl Default for RatingSorter {
    fn default() -> Self {
        Self::new(BayesianPrior::default())
    }
}

impl Sorter for RatingSorter {
    fn name(&self) -> &'static str {
        "rating"
    }

    fn apply(&self, query: ProfileQuery) -> ProfileQuery {
        let prior = self.consider_reviews_count.then_some(self.prior);
        query.order_by(OrderTerm::Rating {
            prior,
            direction: self.direction,
        })
    }

    fn params(&self) -> Params {
        let mut params = Params::from([
            ("consider_reviews_count".to_string(), json!(self.consider_reviews_count)),
            ("direction".to_string(), json!(self.direction.to_string())),
        ]);
        if self.consider_reviews_count {
            params.insert("min_votes".into(), json!(self.prior.min_votes));
            params.insert("prior_mean".into(), json!(self.prior.prior_mean));
        }
        params
    }

    fn description(&self) -> String {
        match self.direction {
            SortDirection::Desc => "по рейтингу".to_string(),
            SortDirection::Asc => "по рейтингу (по возрастанию)".to_string(),
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
