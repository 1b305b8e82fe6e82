//! Composable filter predicates.
//!
//! Every filter owns its own parameter struct and turns a [`ProfileQuery`]
//! into a narrower one. A filter with no active parameters returns the query
//! untouched.

pub mod advanced;
pub mod attributes;
pub mod category;
pub mod location;
pub mod personal;
pub mod price;
pub mod rating;

pub use advanced::{
    ActivityFilter, ExclusionFilter, MasterLevelFilter, RegistrationFilter, SpecialOfferFilter,
};
pub use attributes::{AvailabilityFilter, ExperienceFilter, QualityFilter, QualityParams};
pub use category::{CategoryFilter, CategoryParams, CategoryTree};
pub use location::{LocationFilter, LocationParams};
pub use personal::{LanguageFilter, PersonalFilter, PersonalParams, PortfolioFilter};
pub use price::{PriceFilter, PriceParams};
pub use rating::{RatingFilter, RatingParams};

use crate::core::query::ProfileQuery;
use crate::core::sorters::Sorter;
use crate::core::Params;
use crate::models::FilterCriteria;
use chrono::Duration;
use std::fmt;
use std::sync::Arc;

/// Default "online now" window
pub const ONLINE_WINDOW_MINUTES: i64 = 15;

/// Core trait for candidate filters
///
/// `apply` takes the query by value and returns a new one, so a filter can
/// never alter a query another caller still holds. `Clone` on the boxed trait
/// object produces a fully independent filter.
pub trait Filter: Send + Sync + fmt::Debug {
    /// Returns the name of this filter (for logging/debugging)
    fn name(&self) -> &'static str;

    fn apply(&self, query: ProfileQuery) -> ProfileQuery;

    fn is_active(&self) -> bool;

    /// Parameters currently set on this filter; empty when inactive
    fn active_params(&self) -> Params;

    /// Human readable summary for the UI
    fn description(&self) -> String;

    fn reset(&mut self);

    fn box_clone(&self) -> Box<dyn Filter>;

    /// Ordering this filter requires alongside it (radius search)
    fn companion_sorter(&self) -> Option<Box<dyn Sorter>> {
        None
    }
}

impl Clone for Box<dyn Filter> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// Lookups a filter set may need while being built from criteria
#[derive(Debug, Clone)]
pub struct FilterContext {
    pub online_window: Duration,
    pub category_tree: Option<Arc<CategoryTree>>,
}

impl Default for FilterContext {
    fn default() -> Self {
        Self {
            online_window: Duration::minutes(ONLINE_WINDOW_MINUTES),
            category_tree: None,
        }
    }
}

/// Ordered list of filters applied in sequence to an accumulator query
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    filters: Vec<Box<dyn Filter>>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter (builder pattern)
    pub fn with(mut self, filter: impl Filter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    pub fn push(&mut self, filter: Box<dyn Filter>) {
        self.filters.push(filter);
    }

    /// The standard browsing filters
    pub fn from_criteria(criteria: &FilterCriteria, context: &FilterContext) -> Self {
        Self::new()
            .with(LocationFilter::from_criteria(criteria))
            .with(CategoryFilter::from_criteria(criteria, context.category_tree.clone()))
            .with(RatingFilter::from_criteria(criteria))
            .with(PriceFilter::from_criteria(criteria))
            .with(ExperienceFilter::from_criteria(criteria))
            .with(AvailabilityFilter::from_criteria(criteria, context.online_window))
            .with(QualityFilter::from_criteria(criteria))
            .with(PersonalFilter::from_criteria(criteria))
            .with(LanguageFilter::from_criteria(criteria))
            .with(PortfolioFilter::from_criteria(criteria))
    }

    /// Filters only offered by advanced search
    pub fn advanced_from_criteria(criteria: &FilterCriteria) -> Self {
        Self::new()
            .with(ExclusionFilter::from_criteria(criteria))
            .with(RegistrationFilter::from_criteria(criteria))
            .with(MasterLevelFilter::from_criteria(criteria))
            .with(ActivityFilter::from_criteria(criteria))
            .with(SpecialOfferFilter::from_criteria(criteria))
    }

    pub fn extend(mut self, other: FilterSet) -> Self {
        self.filters.extend(other.filters);
        self
    }

    pub fn filters(&self) -> &[Box<dyn Filter>] {
        &self.filters
    }

    pub fn active(&self) -> impl Iterator<Item = &dyn Filter> {
        self.filters.iter().map(|f| f.as_ref()).filter(|f| f.is_active())
    }

    pub fn is_active(&self) -> bool {
        self.active().next().is_some()
    }

    /// Apply every active filter in order
    pub fn apply(&self, query: ProfileQuery) -> ProfileQuery {
        let mut current = query;
        for filter in self.active() {
            let before = current.len();
            current = filter.apply(current);
            tracing::debug!(
                "Filter applied: {} ({} -> {} candidates)",
                filter.name(),
                before,
                current.len()
            );
        }
        current
    }

    /// Merged parameters of all active filters
    pub fn active_params(&self) -> Params {
        self.filters
            .iter()
            .flat_map(|f| f.active_params())
            .collect()
    }

    pub fn description(&self) -> String {
        self.active()
            .map(|f| f.description())
            .filter(|d| !d.is_empty())
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn companion_sorters(&self) -> Vec<Box<dyn Sorter>> {
        self.active().filter_map(|f| f.companion_sorter()).collect()
    }

    pub fn reset(&mut self) {
        self.filters.iter_mut().for_each(|f| f.reset());
    }
}
