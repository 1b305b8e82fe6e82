//! Experience, availability and quality flag filters.

use super::Filter;
use crate::core::query::ProfileQuery;
use crate::core::Params;
use crate::models::FilterCriteria;
use chrono::Duration;
use serde_json::json;

/// Minimum years of experience; unknown experience never passes
#[derive(Debug, Clone, Default)]
pub struct ExperienceFilter {
    min_years: Option<u32>,
}

impl ExperienceFilter {
    pub fn new(min_years: Option<u32>) -> Self {
        Self { min_years }
    }

    pub fn from_criteria(criteria: &FilterCriteria) -> Self {
        Self::new(criteria.experience)
    }
}

impl Filter for ExperienceFilter {
    fn name(&self) -> &'static str {
        "experience"
    }

    fn apply(&self, query: ProfileQuery) -> ProfileQuery {
        let Some(min) = self.min_years.filter(|_| self.is_active()) else {
            return query;
        };
        query.filter(|row| row.profile.experience_years.is_some_and(|e| e >= min))
    }

    fn is_active(&self) -> bool {
        self.min_years.is_some_and(|y| y > 0)
    }

    fn active_params(&self) -> Params {
        let mut params = Params::new();
        if let Some(years) = self.min_years.filter(|_| self.is_active()) {
            params.insert("experience".into(), json!(years));
        }
        params
    }

    fn description(&self) -> String {
        match self.min_years.filter(|_| self.is_active()) {
            Some(years) => format!("опыт от {} лет", years),
            None => String::new(),
        }
    }

    fn reset(&mut self) {
        self.min_years = None;
    }

    fn box_clone(&self) -> Box<dyn Filter> {
        Box::new(self.clone())
    }
}

/// Available-now flag and recent activity ("online")
#[derive(Debug, Clone)]
pub struct AvailabilityFilter {
    available: bool,
    online: bool,
    online_window: Duration,
}

impl AvailabilityFilter {
    pub fn new(available: bool, online: bool, online_window: Duration) -> Self {
        Self {
            available,
            online,
            online_window,
        }
    }

    pub fn from_criteria(criteria: &FilterCriteria, online_window: Duration) -> Self {
        Self::new(criteria.availability, criteria.online, online_window)
    }
}

impl Filter for AvailabilityFilter {
    fn name(&self) -> &'static str {
        "availability"
    }

    fn apply(&self, query: ProfileQuery) -> ProfileQuery {
        if !self.is_active() {
            return query;
        }
        let online_since = query.now() - self.online_window;
        query.filter(|row| {
            (!self.available || row.profile.is_available)
                && (!self.online || row.profile.last_activity_at.is_some_and(|t| t >= online_since))
        })
    }

    fn is_active(&self) -> bool {
        self.available || self.online
    }

    fn active_params(&self) -> Params {
        let mut params = Params::new();
        if self.available {
            params.insert("availability".into(), json!(true));
        }
        if self.online {
            params.insert("online".into(), json!(true));
        }
        params
    }

    fn description(&self) -> String {
        let mut parts = Vec::new();
        if self.available {
            parts.push("доступен сейчас");
        }
        if self.online {
            parts.push("онлайн");
        }
        parts.join(", ")
    }

    fn reset(&mut self) {
        self.available = false;
        self.online = false;
    }

    fn box_clone(&self) -> Box<dyn Filter> {
        Box::new(self.clone())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QualityParams {
    pub verified: bool,
    pub premium: bool,
    pub has_certificates: bool,
}

#[derive(Debug, Clone, Default)]
pub struct QualityFilter {
    params: QualityParams,
}

impl QualityFilter {
    pub fn new(params: QualityParams) -> Self {
        Self { params }
    }

    pub fn from_criteria(criteria: &FilterCriteria) -> Self {
        Self::new(QualityParams {
            verified: criteria.verified,
            premium: criteria.premium,
            has_certificates: criteria.has_certificates,
        })
    }
}

impl Filter for QualityFilter {
    fn name(&self) -> &'static str {
        "quality"
    }

    fn apply(&self, query: ProfileQuery) -> ProfileQuery {
        if !self.is_active() {
            return query;
        }
        let p = &self.params;
        query.filter(|row| {
            (!p.verified || row.profile.is_verified)
                && (!p.premium || row.profile.is_premium)
                && (!p.has_certificates || row.profile.certificate_count > 0)
        })
    }

    fn is_active(&self) -> bool {
        let p = &self.params;
        p.verified || p.premium || p.has_certificates
    }

    fn active_params(&self) -> Params {
        let p = &self.params;
        [
            ("verified", p.verified),
            ("premium", p.premium),
            ("has_certificates", p.has_certificates),
        ]
        .into_iter()
        .filter(|(_, on)| *on)
        .map(|(key, _)| (key.to_string(), json!(true)))
        .collect()
    }

    fn description(&self) -> String {
        let p = &self.params;
        let mut parts = Vec::new();
        if p.verified {
            parts.push("проверенные");
        }
        if p.premium {
            parts.push("премиум");
        }
        if p.has_certificates {
            parts.push("с сертификатами");
        }
        parts.join(", ")
    }

    fn reset(&mut self) {
        self.params = QualityParams::default();
    }

    fn box_clone(&self) -> Box<dyn Filter> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SearchableProfile;
    use chrono::Utc;

    #[test]
    fn test_online_window() {
        let now = Utc::now();
        let profiles = vec![
            SearchableProfile {
                id: 1,
                last_activity_at: Some(now - Duration::minutes(5)),
                ..Default::default()
            },
            SearchableProfile {
                id: 2,
                last_activity_at: Some(now - Duration::minutes(30)),
                ..Default::default()
            },
            SearchableProfile { id: 3, ..Default::default() },
        ];
        let query = ProfileQuery::from_profiles(profiles, now);

        let filter = AvailabilityFilter::new(false, true, Duration::minutes(15));
        let ids: Vec<_> = filter.apply(query).fetch().iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn test_experience_excludes_unknown() {
        let profiles = vec![
            SearchableProfile { id: 1, experience_years: Some(5), ..Default::default() },
            SearchableProfile { id: 2, experience_years: None, ..Default::default() },
        ];
        let query = ProfileQuery::from_profiles(profiles, Utc::now());
        assert_eq!(ExperienceFilter::new(Some(3)).apply(query).len(), 1);
    }

    #[test]
    fn test_quality_flags_combine() {
        let profiles = vec![
            SearchableProfile { id: 1, is_verified: true, certificate_count: 2, ..Default::default() },
            SearchableProfile { id: 2, is_verified: true, ..Default::default() },
        ];
        let query = ProfileQuery::from_profiles(profiles, Utc::now());
        let filter = QualityFilter::new(QualityParams {
            verified: true,
            has_certificates: true,
            ..Default::default()
        });

        let ids: Vec<_> = filter.apply(query).fetch().iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec![1]);
        assert_eq!(filter.active_params().len(), 2);
    }
}
