//! Filters only offered by advanced search.

use super::Filter;
use crate::core::query::ProfileQuery;
use crate::core::Params;
use crate::models::{ActivityLevel, FilterCriteria, MasterLevel, ProfileId, SearchableProfile};
use chrono::{DateTime, Duration, Months, Utc};
use serde_json::json;
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct ExclusionFilter {
    ids: Vec<ProfileId>,
}

impl ExclusionFilter {
    pub fn new(ids: Vec<ProfileId>) -> Self {
        Self { ids }
    }

    pub fn from_criteria(criteria: &FilterCriteria) -> Self {
        Self::new(criteria.exclude_ids.clone())
    }
}

impl Filter for ExclusionFilter {
    fn name(&self) -> &'static str {
        "exclusion"
    }

    fn apply(&self, query: ProfileQuery) -> ProfileQuery {
        if !self.is_active() {
            return query;
        }
        let excluded: HashSet<ProfileId> = self.ids.iter().copied().collect();
        query.filter(|row| !excluded.contains(&row.id()))
    }

    fn is_active(&self) -> bool {
        !self.ids.is_empty()
    }

    fn active_params(&self) -> Params {
        let mut params = Params::new();
        if self.is_active() {
            params.insert("exclude_ids".into(), json!(self.ids));
        }
        params
    }

    fn description(&self) -> String {
        if self.is_active() {
            format!("исключено: {}", self.ids.len())
        } else {
            String::new()
        }
    }

    fn reset(&mut self) {
        self.ids.clear();
    }

    fn box_clone(&self) -> Box<dyn Filter> {
        Box::new(self.clone())
    }
}

/// Registration timestamp within `[from, to]`
#[derive(Debug, Clone, Default)]
pub struct RegistrationFilter {
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
}

impl RegistrationFilter {
    pub fn new(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        Self { from, to }
    }

    pub fn from_criteria(criteria: &FilterCriteria) -> Self {
        Self::new(criteria.registered_from, criteria.registered_to)
    }
}

impl Filter for RegistrationFilter {
    fn name(&self) -> &'static str {
        "registration"
    }

    fn apply(&self, query: ProfileQuery) -> ProfileQuery {
        if !self.is_active() {
            return query;
        }
        query.filter(|row| {
            let at = row.profile.registered_at;
            self.from.map_or(true, |from| at >= from) && self.to.map_or(true, |to| at <= to)
        })
    }

    fn is_active(&self) -> bool {
        self.from.is_some() || self.to.is_some()
    }

    fn active_params(&self) -> Params {
        let mut params = Params::new();
        if let Some(from) = self.from {
            params.insert("registered_from".into(), json!(from.to_rfc3339()));
        }
        if let Some(to) = self.to {
            params.insert("registered_to".into(), json!(to.to_rfc3339()));
        }
        params
    }

    fn description(&self) -> String {
        let fmt = |d: DateTime<Utc>| d.format("%d.%m.%Y").to_string();
        match (self.from, self.to) {
            (Some(from), Some(to)) => format!("регистрация {} - {}", fmt(from), fmt(to)),
            (Some(from), None) => format!("регистрация с {}", fmt(from)),
            (None, Some(to)) => format!("регистрация до {}", fmt(to)),
            (None, None) => String::new(),
        }
    }

    fn reset(&mut self) {
        self.from = None;
        self.to = None;
    }

    fn box_clone(&self) -> Box<dyn Filter> {
        Box::new(self.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MasterLevelFilter {
    level: Option<MasterLevel>,
}

impl MasterLevelFilter {
    pub fn new(level: Option<MasterLevel>) -> Self {
        Self { level }
    }

    pub fn from_criteria(criteria: &FilterCriteria) -> Self {
        Self::new(criteria.master_level)
    }

    fn matches(level: MasterLevel, profile: &SearchableProfile, now: DateTime<Utc>) -> bool {
        let rating = profile.rating.unwrap_or(0.0);
        let experience = profile.experience_years;
        match level {
            MasterLevel::Top => {
                rating >= 4.7 && profile.review_count >= 50 && experience.is_some_and(|e| e >= 3)
            }
            MasterLevel::Experienced => {
                rating >= 4.0 && profile.review_count >= 10 && experience.is_some_and(|e| e >= 1)
            }
            MasterLevel::Newcomer => {
                let since = now.checked_sub_months(Months::new(6)).unwrap_or(now);
                profile.registered_at >= since && experience.is_some_and(|e| e <= 1)
            }
        }
    }
}

impl Filter for MasterLevelFilter {
    fn name(&self) -> &'static str {
        "master_level"
    }

    fn apply(&self, query: ProfileQuery) -> ProfileQuery {
        let Some(level) = self.level else {
            return query;
        };
        let now = query.now();
        query.filter(|row| Self::matches(level, &row.profile, now))
    }

    fn is_active(&self) -> bool {
        self.level.is_some()
    }

    fn active_params(&self) -> Params {
        let mut params = Params::new();
        if let Some(level) = self.level {
            params.insert("master_level".into(), json!(level));
        }
        params
    }

    fn description(&self) -> String {
        match self.level {
            Some(MasterLevel::Top) => "топ-мастера".to_string(),
            Some(MasterLevel::Experienced) => "опытные мастера".to_string(),
            Some(MasterLevel::Newcomer) => "новички".to_string(),
            None => String::new(),
        }
    }

    fn reset(&mut self) {
        self.level = None;
    }

    fn box_clone(&self) -> Box<dyn Filter> {
        Box::new(self.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    level: Option<ActivityLevel>,
}

impl ActivityFilter {
    pub fn new(level: Option<ActivityLevel>) -> Self {
        Self { level }
    }

    pub fn from_criteria(criteria: &FilterCriteria) -> Self {
        Self::new(criteria.activity_level)
    }

    fn matches(level: ActivityLevel, profile: &SearchableProfile, now: DateTime<Utc>) -> bool {
        let last = profile.last_activity_at;
        match level {
            ActivityLevel::VeryActive => {
                last.is_some_and(|t| t >= now - Duration::days(1)) && profile.listing_count >= 3
            }
            ActivityLevel::Active => {
                last.is_some_and(|t| t >= now - Duration::days(7)) && profile.listing_count >= 1
            }
            ActivityLevel::Inactive => last.is_some_and(|t| t <= now - Duration::days(30)),
        }
    }
}

impl Filter for ActivityFilter {
    fn name(&self) -> &'static str {
        "activity"
    }

    fn apply(&self, query: ProfileQuery) -> ProfileQuery {
        let Some(level) = self.level else {
            return query;
        };
        let now = query.now();
        query.filter(|row| Self::matches(level, &row.profile, now))
    }

    fn is_active(&self) -> bool {
        self.level.is_some()
    }

    fn active_params(&self) -> Params {
        let mut params = Params::new();
        if let Some(level) = self.level {
            params.insert("activity_level".into(), json!(level));
        }
        params
    }

    fn description(&self) -> String {
        match self.level {
            Some(ActivityLevel::VeryActive) => "очень активные".to_string(),
            Some(ActivityLevel::Active) => "активные".to_string(),
            Some(ActivityLevel::Inactive) => "неактивные".to_string(),
            None => String::new(),
        }
    }

    fn reset(&mut self) {
        self.level = None;
    }

    fn box_clone(&self) -> Box<dyn Filter> {
        Box::new(self.clone())
    }
}

/// At least one discounted or featured listing
#[derive(Debug, Clone, Default)]
pub struct SpecialOfferFilter {
    required: bool,
}

impl SpecialOfferFilter {
    pub fn new(required: bool) -> Self {
        Self { required }
    }

    pub fn from_criteria(criteria: &FilterCriteria) -> Self {
        Self::new(criteria.has_special_offers)
    }
}

impl Filter for SpecialOfferFilter {
    fn name(&self) -> &'static str {
        "special_offer"
    }

    fn apply(&self, query: ProfileQuery) -> ProfileQuery {
        if !self.required {
            return query;
        }
        query.filter(|row| {
            row.profile
                .listings
                .iter()
                .any(|l| l.has_discount || l.is_featured)
        })
    }

    fn is_active(&self) -> bool {
        self.required
    }

    fn active_params(&self) -> Params {
        let mut params = Params::new();
        if self.required {
            params.insert("has_special_offers".into(), json!(true));
        }
        params
    }

    fn description(&self) -> String {
        if self.required { "со спецпредложениями".to_string() } else { String::new() }
    }

    fn reset(&mut self) {
        self.required = false;
    }

    fn box_clone(&self) -> Box<dyn Filter> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ListingSummary;

    fn ids(query: ProfileQuery) -> Vec<ProfileId> {
        query.fetch().iter().map(|r| r.id()).collect()
    }

    #[test]
    fn test_master_levels() {
        let now = Utc::now();
        let profiles = vec![
            SearchableProfile {
                id: 1,
                rating: Some(4.8),
                review_count: 60,
                experience_years: Some(5),
                registered_at: now - Duration::days(900),
                ..Default::default()
            },
            SearchableProfile {
                id: 2,
                rating: Some(4.2),
                review_count: 12,
                experience_years: Some(2),
                registered_at: now - Duration::days(400),
                ..Default::default()
            },
            SearchableProfile {
                id: 3,
                experience_years: Some(0),
                registered_at: now - Duration::days(30),
                ..Default::default()
            },
        ];
        let query = ProfileQuery::from_profiles(profiles, now);

        let top = MasterLevelFilter::new(Some(MasterLevel::Top));
        let experienced = MasterLevelFilter::new(Some(MasterLevel::Experienced));
        let newcomer = MasterLevelFilter::new(Some(MasterLevel::Newcomer));

        assert_eq!(ids(top.apply(query.clone())), vec![1]);
        assert_eq!(ids(experienced.apply(query.clone())), vec![1, 2]);
        assert_eq!(ids(newcomer.apply(query)), vec![3]);
    }

    #[test]
    fn test_activity_levels() {
        let now = Utc::now();
        let profiles = vec![
            SearchableProfile {
                id: 1,
                last_activity_at: Some(now - Duration::hours(2)),
                listing_count: 4,
                ..Default::default()
            },
            SearchableProfile {
                id: 2,
                last_activity_at: Some(now - Duration::days(3)),
                listing_count: 1,
                ..Default::default()
            },
            SearchableProfile {
                id: 3,
                last_activity_at: Some(now - Duration::days(45)),
                ..Default::default()
            },
        ];
        let query = ProfileQuery::from_profiles(profiles, now);

        let very_active = ActivityFilter::new(Some(ActivityLevel::VeryActive));
        let active = ActivityFilter::new(Some(ActivityLevel::Active));
        let inactive = ActivityFilter::new(Some(ActivityLevel::Inactive));

        assert_eq!(ids(very_active.apply(query.clone())), vec![1]);
        assert_eq!(ids(active.apply(query.clone())), vec![1, 2]);
        assert_eq!(ids(inactive.apply(query)), vec![3]);
    }

    #[test]
    fn test_exclusion_and_special_offers() {
        let profiles = vec![
            SearchableProfile {
                id: 1,
                listings: vec![ListingSummary { id: 1, has_discount: true, ..Default::default() }],
                ..Default::default()
            },
            SearchableProfile {
                id: 2,
                listings: vec![ListingSummary { id: 2, is_featured: true, ..Default::default() }],
                ..Default::default()
            },
            SearchableProfile { id: 3, ..Default::default() },
        ];
        let query = ProfileQuery::from_profiles(profiles, Utc::now());

        let offers = SpecialOfferFilter::new(true).apply(query);
        let remaining = ExclusionFilter::new(vec![2]).apply(offers);
        assert_eq!(ids(remaining), vec![1]);
    }
}
