//! Personal attribute, language and portfolio filters.

use super::Filter;
use crate::core::query::ProfileQuery;
use crate::core::Params;
use crate::models::FilterCriteria;
use chrono::Datelike;
use serde_json::json;

/// Ages above this are treated as an open upper bound
pub const MAX_AGE: u32 = 150;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersonalParams {
    pub gender: Option<String>,
    /// Inclusive `(min_age, max_age)` in years
    pub age_range: Option<(u32, u32)>,
}

#[derive(Debug, Clone, Default)]
pub struct PersonalFilter {
    params: PersonalParams,
}

impl PersonalFilter {
    pub fn new(params: PersonalParams) -> Self {
        Self { params }
    }

    pub fn from_criteria(criteria: &FilterCriteria) -> Self {
        let age_range = criteria
            .age_range
            .filter(|(lo, hi)| *lo >= 0.0 && hi >= lo)
            .map(|(lo, hi)| {
                let clamp = |age: f64| age.trunc().min(MAX_AGE as f64) as u32;
                (clamp(lo), clamp(hi))
            });
        Self::new(PersonalParams {
            gender: criteria.gender.clone(),
            age_range,
        })
    }

    /// Birth years `[now - max_age, now - min_age]`
    fn birth_years(&self, current_year: i32) -> Option<(i32, i32)> {
        let (min_age, max_age) = self.params.age_range?;
        let year = |age: u32| current_year - age.min(MAX_AGE) as i32;
        Some((year(max_age), year(min_age)))
    }
}

impl Filter for PersonalFilter {
    fn name(&self) -> &'static str {
        "personal"
    }

    fn apply(&self, query: ProfileQuery) -> ProfileQuery {
        if !self.is_active() {
            return query;
        }
        let years = self.birth_years(query.now().year());
        let gender = self.params.gender.as_deref().map(str::to_lowercase);
        query.filter(|row| {
            let profile = &row.profile;
            gender.as_deref().map_or(true, |g| {
                profile.gender.as_deref().is_some_and(|pg| pg.to_lowercase() == g)
            }) && years.map_or(true, |(from, to)| {
                profile
                    .birth_date
                    .is_some_and(|d| (from..=to).contains(&d.year()))
            })
        })
    }

    fn is_active(&self) -> bool {
        self.params.gender.is_some() || self.params.age_range.is_some()
    }

    fn active_params(&self) -> Params {
        let mut params = Params::new();
        if let Some(gender) = &self.params.gender {
            params.insert("gender".into(), json!(gender));
        }
        if let Some((lo, hi)) = self.params.age_range {
            params.insert("age_range".into(), json!([lo, hi]));
        }
        params
    }

    fn description(&self) -> String {
        let mut parts = Vec::new();
        if let Some(gender) = &self.params.gender {
            parts.push(format!("пол: {}", gender));
        }
        if let Some((lo, hi)) = self.params.age_range {
            parts.push(format!("возраст {}-{}", lo, hi));
        }
        parts.join(", ")
    }

    fn reset(&mut self) {
        self.params = PersonalParams::default();
    }

    fn box_clone(&self) -> Box<dyn Filter> {
        Box::new(self.clone())
    }
}

/// Any of the requested languages appears in the profile's language list
#[derive(Debug, Clone, Default)]
pub struct LanguageFilter {
    languages: Vec<String>,
}

impl LanguageFilter {
    pub fn new(languages: Vec<String>) -> Self {
        Self { languages }
    }

    pub fn from_criteria(criteria: &FilterCriteria) -> Self {
        Self::new(criteria.languages.clone())
    }
}

impl Filter for LanguageFilter {
    fn name(&self) -> &'static str {
        "language"
    }

    fn apply(&self, query: ProfileQuery) -> ProfileQuery {
        if !self.is_active() {
            return query;
        }
        let wanted: Vec<String> = self.languages.iter().map(|l| l.to_lowercase()).collect();
        query.filter(|row| {
            row.profile.languages.as_deref().is_some_and(|spoken| {
                let spoken = spoken.to_lowercase();
                wanted.iter().any(|l| spoken.contains(l.as_str()))
            })
        })
    }

    fn is_active(&self) -> bool {
        !self.languages.is_empty()
    }

    fn active_params(&self) -> Params {
        let mut params = Params::new();
        if self.is_active() {
            params.insert("languages".into(), json!(self.languages));
        }
        params
    }

    fn description(&self) -> String {
        if self.is_active() {
            format!("языки: {}", self.languages.join(", "))
        } else {
            String::new()
        }
    }

    fn reset(&mut self) {
        self.languages.clear();
    }

    fn box_clone(&self) -> Box<dyn Filter> {
        Box::new(self.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct PortfolioFilter {
    required: bool,
}

impl PortfolioFilter {
    pub fn new(required: bool) -> Self {
        Self { required }
    }

    pub fn from_criteria(criteria: &FilterCriteria) -> Self {
        Self::new(criteria.has_portfolio)
    }
}

impl Filter for PortfolioFilter {
    fn name(&self) -> &'static str {
        "portfolio"
    }

    fn apply(&self, query: ProfileQuery) -> ProfileQuery {
        if !self.required {
            return query;
        }
        query.filter(|row| row.profile.has_portfolio())
    }

    fn is_active(&self) -> bool {
        self.required
    }

    fn active_params(&self) -> Params {
        let mut params = Params::new();
        if self.required {
            params.insert("has_portfolio".into(), json!(true));
        }
        params
    }

    fn description(&self) -> String {
        if self.required { "с портфолио".to_string() } else { String::new() }
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
    use crate::models::{MediaItem, MediaKind, SearchableProfile};
    use chrono::{NaiveDate, TimeZone, Utc};

    #[test]
    fn test_age_range_uses_birth_year() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let born = |year| NaiveDate::from_ymd_opt(year, 3, 15);
        let profiles = vec![
            SearchableProfile { id: 1, birth_date: born(1994), ..Default::default() },
            SearchableProfile { id: 2, birth_date: born(1970), ..Default::default() },
            SearchableProfile { id: 3, birth_date: None, ..Default::default() },
        ];
        let query = ProfileQuery::from_profiles(profiles, now);

        let filter = PersonalFilter::new(PersonalParams {
            gender: None,
            age_range: Some((25, 35)),
        });
        let ids: Vec<_> = filter.apply(query).fetch().iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn test_huge_age_bound_is_open_ended() {
        let born_1988 = SearchableProfile {
            id: 1,
            birth_date: NaiveDate::from_ymd_opt(1988, 1, 10),
            ..Default::default()
        };
        let query = ProfileQuery::from_profiles(vec![born_1988], Utc::now());

        for range in [(18.0, 1_000_000_000_000.0), (0.0, 2_147_483_648.0)] {
            let filter = PersonalFilter::from_criteria(&FilterCriteria {
                age_range: Some(range),
                ..Default::default()
            });
            assert_eq!(filter.active_params()["age_range"], json!([range.0 as u32, MAX_AGE]));
            assert_eq!(filter.apply(query.clone()).len(), 1);
        }

        let direct = PersonalFilter::new(PersonalParams {
            gender: None,
            age_range: Some((0, u32::MAX)),
        });
        assert_eq!(direct.apply(query).len(), 1);
    }

    #[test]
    fn test_languages_match_any_substring() {
        let profiles = vec![
            SearchableProfile { id: 1, languages: Some("Русский, English".into()), ..Default::default() },
            SearchableProfile { id: 2, languages: Some("Русский".into()), ..Default::default() },
            SearchableProfile { id: 3, languages: None, ..Default::default() },
        ];
        let query = ProfileQuery::from_profiles(profiles, Utc::now());

        let filter = LanguageFilter::new(vec!["english".into(), "deutsch".into()]);
        let ids: Vec<_> = filter.apply(query).fetch().iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn test_portfolio_requires_portfolio_media() {
        let with_portfolio = SearchableProfile {
            id: 1,
            media: vec![MediaItem { kind: MediaKind::Portfolio, url: "/p/1.jpg".into() }],
            ..Default::default()
        };
        let avatar_only = SearchableProfile {
            id: 2,
            media: vec![MediaItem { kind: MediaKind::Avatar, url: "/a/2.jpg".into() }],
            ..Default::default()
        };
        let query = ProfileQuery::from_profiles(vec![with_portfolio, avatar_only], Utc::now());
        assert_eq!(PortfolioFilter::new(true).apply(query).len(), 1);
    }
}
