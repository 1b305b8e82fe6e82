//! The queryable candidate set.
//!
//! [`ProfileQuery`] is a value: filters and sorters take it by value and hand
//! back a new one, and diverging computations (facets, counts) clone it first.
//! Nothing is ever mutated behind a caller's back.
//!
//! Ordering is declarative. Sorters push [`OrderTerm`]s; the terms are only
//! evaluated when rows are fetched, and the final comparison always falls
//! back to ascending profile id so equal keys still produce a reproducible
//! sequence.

use crate::models::{
    BayesianPrior, PriceField, ProfileId, RankedResult, SearchPage, SearchableProfile,
    SortDirection,
};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;

/// Plain column orderings not backed by a dedicated sorter strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    /// relevance score, then premium, rating and review count
    Relevance,
    Experience,
    RegisteredAt,
    Name,
    Reviews,
    LastActivity,
    Views,
}

/// A single ORDER BY clause
#[derive(Debug, Clone, PartialEq)]
pub enum OrderTerm {
    /// Nulls last in both directions
    Price { field: PriceField, direction: SortDirection },
    /// Smoothed when a prior is set, raw rating otherwise; unrated rows last
    Rating { prior: Option<BayesianPrior>, direction: SortDirection },
    /// Reads `distance_km`; rows without a distance sort last
    Distance { direction: SortDirection },
    /// Reads `popularity_score`
    Popularity { direction: SortDirection },
    /// Reads `similarity_score`
    Similarity { direction: SortDirection },
    Field { field: SortField, direction: SortDirection },
}

/// Compare optional keys with `None` after every value, whatever the direction
fn nulls_last<T, F>(a: Option<T>, b: Option<T>, direction: SortDirection, cmp: F) -> Ordering
where
    F: Fn(&T, &T) -> Ordering,
{
    match (a, b) {
        (Some(a), Some(b)) => direction.orient(cmp(&a, &b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Price of a row for the given column; listing prices use the cheapest listing
pub fn price_of(profile: &SearchableProfile, field: PriceField) -> Option<f64> {
    match field {
        PriceField::MinPrice => profile.min_price,
        PriceField::ListingPrice => profile
            .listings
            .iter()
            .filter_map(|l| l.price)
            .min_by(f64::total_cmp),
    }
}

impl OrderTerm {
    pub fn compare(&self, a: &RankedResult, b: &RankedResult) -> Ordering {
        match *self {
            OrderTerm::Price { field, direction } => nulls_last(
                price_of(&a.profile, field),
                price_of(&b.profile, field),
                direction,
                f64::total_cmp,
            ),
            OrderTerm::Rating { prior: Some(prior), direction } => {
                // Unrated profiles have nothing to smooth and sort last
                let smoothed = |r: &RankedResult| {
                    let votes = r.profile.review_count as f64;
                    r.profile.rating.map(|rating| prior.smooth(rating, votes))
                };
                nulls_last(smoothed(a), smoothed(b), direction, f64::total_cmp)
            }
            OrderTerm::Rating { prior: None, direction } => {
                nulls_last(a.profile.rating, b.profile.rating, direction, f64::total_cmp)
            }
            OrderTerm::Distance { direction } => {
                nulls_last(a.distance_km, b.distance_km, direction, f64::total_cmp)
            }
            OrderTerm::Popularity { direction } => direction.orient(
                a.popularity_score
                    .unwrap_or(0.0)
                    .total_cmp(&b.popularity_score.unwrap_or(0.0)),
            ),
            OrderTerm::Similarity { direction } => direction.orient(
                a.similarity_score
                    .unwrap_or(0)
                    .cmp(&b.similarity_score.unwrap_or(0)),
            ),
            OrderTerm::Field { field, direction } => compare_field(field, a, b, direction),
        }
    }
}

fn compare_field(field: SortField, a: &RankedResult, b: &RankedResult, direction: SortDirection) -> Ordering {
    let (pa, pb) = (&a.profile, &b.profile);
    match field {
        SortField::Relevance => direction
            .orient(
                a.relevance_score
                    .unwrap_or(0.0)
                    .total_cmp(&b.relevance_score.unwrap_or(0.0)),
            )
            .then_with(|| direction.orient(pa.is_premium.cmp(&pb.is_premium)))
            .then_with(|| nulls_last(pa.rating, pb.rating, direction, f64::total_cmp))
            .then_with(|| direction.orient(pa.review_count.cmp(&pb.review_count))),
        SortField::Experience => {
            nulls_last(pa.experience_years, pb.experience_years, direction, |x, y| x.cmp(y))
        }
        SortField::RegisteredAt => direction.orient(pa.registered_at.cmp(&pb.registered_at)),
        SortField::Name => direction.orient(pa.name.to_lowercase().cmp(&pb.name.to_lowercase())),
        SortField::Reviews => direction.orient(pa.review_count.cmp(&pb.review_count)),
        SortField::LastActivity => {
            nulls_last(pa.last_activity_at, pb.last_activity_at, direction, |x, y| x.cmp(y))
        }
        SortField::Views => direction.orient(pa.views_count.cmp(&pb.views_count)),
    }
}

fn compare_rows(order: &[OrderTerm], a: &RankedResult, b: &RankedResult) -> Ordering {
    order
        .iter()
        .map(|term| term.compare(a, b))
        .find(|o| *o != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.id().cmp(&b.id()))
}

/// Candidate set plus accumulated ordering
#[derive(Debug, Clone)]
pub struct ProfileQuery {
    rows: Vec<RankedResult>,
    order: Vec<OrderTerm>,
    now: DateTime<Utc>,
}

impl ProfileQuery {
    /// `now` is the reference clock for every time-relative predicate
    /// (online window, age, activity level) evaluated against this query.
    pub fn new(rows: Vec<RankedResult>, now: DateTime<Utc>) -> Self {
        Self {
            rows,
            order: Vec::new(),
            now,
        }
    }

    pub fn from_profiles<I>(profiles: I, now: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = SearchableProfile>,
    {
        Self::new(profiles.into_iter().map(RankedResult::new).collect(), now)
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows in candidate (unsorted) order
    pub fn rows(&self) -> &[RankedResult] {
        &self.rows
    }

    pub fn order_terms(&self) -> &[OrderTerm] {
        &self.order
    }

    pub fn find(&self, id: ProfileId) -> Option<&RankedResult> {
        self.rows.iter().find(|r| r.id() == id)
    }

    /// Keep rows matching the predicate (a WHERE clause)
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&RankedResult) -> bool,
    {
        self.rows.retain(|row| predicate(row));
        self
    }

    /// Count rows matching the predicate without consuming the query
    pub fn count_where<F>(&self, predicate: F) -> usize
    where
        F: Fn(&RankedResult) -> bool,
    {
        self.rows.iter().filter(|row| predicate(row)).count()
    }

    /// Attach computed columns to every row
    pub fn map_rows<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut RankedResult),
    {
        self.rows.iter_mut().for_each(f);
        self
    }

    /// Append an ORDER BY term (lower priority than existing terms)
    pub fn order_by(mut self, term: OrderTerm) -> Self {
        self.order.push(term);
        self
    }

    /// Insert an ORDER BY term ahead of existing ones
    pub fn order_first(mut self, term: OrderTerm) -> Self {
        self.order.insert(0, term);
        self
    }

    pub fn clear_order(mut self) -> Self {
        self.order.clear();
        self
    }

    /// Evaluate the ordering and return every row
    pub fn fetch(self) -> Vec<RankedResult> {
        let Self { mut rows, order, .. } = self;
        rows.sort_by(|a, b| compare_rows(&order, a, b));
        rows
    }

    /// Evaluate the ordering and return at most `limit` rows
    pub fn take(self, limit: usize) -> Vec<RankedResult> {
        let mut rows = self.fetch();
        rows.truncate(limit);
        rows
    }

    /// Evaluate the ordering and slice out one page (1-based)
    pub fn paginate(self, page: u32, per_page: u32) -> SearchPage {
        let per_page = per_page.max(1);
        let page = page.max(1);
        let total = self.len();
        let last_page = (total as u32).div_ceil(per_page).max(1);
        let offset = (page as usize - 1).saturating_mul(per_page as usize);

        let items = self
            .fetch()
            .into_iter()
            .skip(offset)
            .take(per_page as usize)
            .collect();

        SearchPage {
            items,
            total,
            page,
            per_page,
            last_page,
        }
    }
}

/// Case-insensitive substring test, the engine's equivalent of `LIKE '%term%'`
#[inline]
pub fn contains_ignore_case(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}
