//! Composable ranking strategies.
//!
//! A sorter never reorders rows itself: it may attach computed columns and
//! then appends an [`OrderTerm`](crate::core::query::OrderTerm) that is
//! evaluated when the query is fetched.

pub mod distance;
pub mod field;
pub mod popularity;
pub mod price;
pub mod rating;

pub use distance::DistanceSorter;
pub use field::FieldSorter;
pub use popularity::{PopularityFactor, PopularitySorter};
pub use price::PriceSorter;
pub use rating::RatingSorter;

use crate::core::query::{ProfileQuery, SortField};
use crate::core::Params;
use crate::models::{BayesianPrior, PopularityWeights, SortDirection, SortKey, SortSpec};
use std::fmt;

pub trait Sorter: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn apply(&self, query: ProfileQuery) -> ProfileQuery;

    fn params(&self) -> Params;

    fn description(&self) -> String;

    fn direction(&self) -> SortDirection;

    fn set_direction(&mut self, direction: SortDirection);

    fn invert(&mut self) {
        let flipped = self.direction().inverted();
        self.set_direction(flipped);
    }

    fn box_clone(&self) -> Box<dyn Sorter>;
}

impl Clone for Box<dyn Sorter> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// Engine-wide ranking constants handed to sorters built from a [`SortSpec`]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RankingOptions {
    pub prior: BayesianPrior,
    pub popularity_weights: PopularityWeights,
}

/// Build the sorter a client selected
///
/// An explicit direction in the sort selection overrides the sorter's default.
pub fn build_sorter(spec: &SortSpec, options: &RankingOptions) -> Box<dyn Sorter> {
    let mut sorter: Box<dyn Sorter> = match spec.key {
        SortKey::Relevance => Box::new(FieldSorter::new(SortField::Relevance)),
        SortKey::Rating => Box::new(
            RatingSorter::new(options.prior)
                .consider_reviews_count(spec.consider_reviews_count.unwrap_or(true)),
        ),
        SortKey::PriceAsc => Box::new(PriceSorter::new().with_direction(SortDirection::Asc)),
        SortKey::PriceDesc => Box::new(PriceSorter::new().with_direction(SortDirection::Desc)),
        SortKey::Distance => {
            Box::new(DistanceSorter::new(spec.point).only_with_coordinates(spec.only_with_coordinates))
        }
        SortKey::Popularity => Box::new(PopularitySorter::new(
            spec.popularity_weights.unwrap_or(options.popularity_weights),
        )),
        SortKey::Experience => Box::new(FieldSorter::new(SortField::Experience)),
        SortKey::Newest => Box::new(FieldSorter::new(SortField::RegisteredAt)),
        SortKey::NameAsc => Box::new(FieldSorter::new(SortField::Name)),
        SortKey::NameDesc => {
            Box::new(FieldSorter::new(SortField::Name).with_direction(SortDirection::Desc))
        }
        SortKey::Reviews => Box::new(FieldSorter::new(SortField::Reviews)),
        SortKey::Activity => Box::new(FieldSorter::new(SortField::LastActivity)),
        SortKey::Views => Box::new(FieldSorter::new(SortField::Views)),
    };
    if let Some(direction) = spec.direction {
        sorter.set_direction(direction);
    }
    sorter
}

/// Sorters in priority order; the first one is the primary key
#[derive(Debug, Clone, Default)]
pub struct SorterSet {
    sorters: Vec<Box<dyn Sorter>>,
}

impl SorterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sorter: impl Sorter + 'static) -> Self {
        self.sorters.push(Box::new(sorter));
        self
    }

    pub fn push(&mut self, sorter: Box<dyn Sorter>) {
        self.sorters.push(sorter);
    }

    /// Insert ahead of every existing sorter
    pub fn prepend(&mut self, sorter: Box<dyn Sorter>) {
        self.sorters.insert(0, sorter);
    }

    pub fn from_spec(spec: &SortSpec, options: &RankingOptions) -> Self {
        let mut set = Self::new();
        set.push(build_sorter(spec, options));
        set
    }

    pub fn sorters(&self) -> &[Box<dyn Sorter>] {
        &self.sorters
    }

    pub fn is_empty(&self) -> bool {
        self.sorters.is_empty()
    }

    pub fn apply(&self, query: ProfileQuery) -> ProfileQuery {
        self.sorters.iter().fold(query, |current, sorter| {
            tracing::debug!(
                "Sorter applied: {} ({}, {} candidates)",
                sorter.name(),
                sorter.direction(),
                current.len()
            );
            sorter.apply(current)
        })
    }

    pub fn params(&self) -> Params {
        self.sorters.iter().flat_map(|s| s.params()).collect()
    }

    pub fn description(&self) -> String {
        self.sorters
            .iter()
            .map(|s| s.description())
            .collect::<Vec<_>>()
            .join(", затем ")
    }
}
