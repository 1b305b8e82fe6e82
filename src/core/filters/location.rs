use super::Filter;
use crate::core::distance::{calculate_bounding_box, distance_between, is_within_bounding_box};
use crate::core::query::ProfileQuery;
use crate::core::sorters::{DistanceSorter, Sorter};
use crate::core::Params;
use crate::models::{FilterCriteria, GeoPoint, SearchableProfile, SortDirection};
use serde_json::json;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationParams {
    pub city: Option<String>,
    pub region: Option<String>,
    pub district: Option<String>,
    pub metro_station: Option<String>,
    pub point: Option<GeoPoint>,
    pub radius_km: Option<f64>,
}

/// Place filter plus optional radius search
///
/// City, district and metro station match when the profile itself or any
/// of its listings carries the value. A radius search keeps rows strictly
/// closer than `radius_km` and records their distance.
#[derive(Debug, Clone, Default)]
pub struct LocationFilter {
    params: LocationParams,
}

impl LocationFilter {
    pub fn new(params: LocationParams) -> Self {
        Self { params }
    }

    pub fn from_criteria(criteria: &FilterCriteria) -> Self {
        Self::new(LocationParams {
            city: criteria.city.clone(),
            region: criteria.region.clone(),
            district: criteria.district.clone(),
            metro_station: criteria.metro_station.clone(),
            point: criteria.point(),
            radius_km: criteria.radius,
        })
    }

    pub fn params(&self) -> &LocationParams {
        &self.params
    }

    /// Point and a positive radius, when a radius search is requested
    fn radius_search(&self) -> Option<(GeoPoint, f64)> {
        let point = self.params.point?;
        let radius = self.params.radius_km.filter(|r| *r > 0.0)?;
        Some((point, radius))
    }
}

fn same_place(value: Option<&str>, wanted: &str) -> bool {
    value.is_some_and(|v| v.to_lowercase() == wanted.to_lowercase())
}

fn matches_city(profile: &SearchableProfile, city: &str) -> bool {
    same_place(profile.city.as_deref(), city)
        || profile.listings.iter().any(|l| same_place(l.city.as_deref(), city))
}

fn matches_district(profile: &SearchableProfile, district: &str) -> bool {
    same_place(profile.district.as_deref(), district)
        || profile
            .listings
            .iter()
            .any(|l| same_place(l.district.as_deref(), district))
}

fn matches_metro(profile: &SearchableProfile, station: &str) -> bool {
    profile
        .metro_stations
        .iter()
        .any(|s| same_place(Some(s.as_str()), station))
        || profile
            .listings
            .iter()
            .any(|l| same_place(l.metro_station.as_deref(), station))
}

impl Filter for LocationFilter {
    fn name(&self) -> &'static str {
        "location"
    }

    fn apply(&self, query: ProfileQuery) -> ProfileQuery {
        if !self.is_active() {
            return query;
        }

        let p = &self.params;
        let mut query = query.filter(|row| {
            let profile = &row.profile;
            p.city.as_deref().map_or(true, |c| matches_city(profile, c))
                && p.region
                    .as_deref()
                    .map_or(true, |r| same_place(profile.region.as_deref(), r))
                && p.district.as_deref().map_or(true, |d| matches_district(profile, d))
                && p.metro_station
                    .as_deref()
                    .map_or(true, |m| matches_metro(profile, m))
        });

        if let Some((point, radius)) = self.radius_search() {
            let bbox = calculate_bounding_box(point.lat, point.lng, radius);
            query = query
                .filter(|row| {
                    row.profile
                        .location
                        .is_some_and(|loc| is_within_bounding_box(loc.lat, loc.lng, &bbox))
                })
                .map_rows(|row| {
                    row.distance_km = row.profile.location.map(|loc| distance_between(point, loc));
                })
                .filter(|row| row.distance_km.is_some_and(|d| d < radius));
        }

        query
    }

    fn is_active(&self) -> bool {
        let p = &self.params;
        p.city.is_some()
            || p.region.is_some()
            || p.district.is_some()
            || p.metro_station.is_some()
            || self.radius_search().is_some()
    }

    fn active_params(&self) -> Params {
        let p = &self.params;
        let mut params = Params::new();
        if let Some(city) = &p.city {
            params.insert("city".into(), json!(city));
        }
        if let Some(region) = &p.region {
            params.insert("region".into(), json!(region));
        }
        if let Some(district) = &p.district {
            params.insert("district".into(), json!(district));
        }
        if let Some(metro) = &p.metro_station {
            params.insert("metro_station".into(), json!(metro));
        }
        if let Some((point, radius)) = self.radius_search() {
            params.insert("lat".into(), json!(point.lat));
            params.insert("lng".into(), json!(point.lng));
            params.insert("radius".into(), json!(radius));
        }
        params
    }

    fn description(&self) -> String {
        let p = &self.params;
        let mut parts = Vec::new();
        if let Some(city) = &p.city {
            parts.push(format!("город: {}", city));
        }
        if let Some(region) = &p.region {
            parts.push(format!("регион: {}", region));
        }
        if let Some(district) = &p.district {
            parts.push(format!("район: {}", district));
        }
        if let Some(metro) = &p.metro_station {
            parts.push(format!("метро: {}", metro));
        }
        if let Some((_, radius)) = self.radius_search() {
            parts.push(format!("в радиусе {} км", radius));
        }
        parts.join(", ")
    }

    fn reset(&mut self) {
        self.params = LocationParams::default();
    }

    fn box_clone(&self) -> Box<dyn Filter> {
        Box::new(self.clone())
    }

    fn companion_sorter(&self) -> Option<Box<dyn Sorter>> {
        let (point, _) = self.radius_search()?;
        Some(Box::new(DistanceSorter::new(Some(point)).with_direction(SortDirection::Asc)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ListingSummary;
    use chrono::Utc;

    fn profile(id: u64, city: &str, location: Option<GeoPoint>) -> SearchableProfile {
        SearchableProfile {
            id,
            name: format!("Provider {}", id),
            city: Some(city.to_string()),
            location,
            ..Default::default()
        }
    }

    #[test]
    fn test_city_matches_listing_location() {
        let mut remote = profile(2, "Казань", None);
        remote.listings.push(ListingSummary {
            id: 10,
            city: Some("Москва".to_string()),
            ..Default::default()
        });
        let query = ProfileQuery::from_profiles(
            vec![profile(1, "Москва", None), remote, profile(3, "Казань", None)],
            Utc::now(),
        );

        let filter = LocationFilter::new(LocationParams {
            city: Some("москва".to_string()),
            ..Default::default()
        });
        let ids: Vec<_> = filter.apply(query).fetch().iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_radius_attaches_distance_and_excludes_missing_coordinates() {
        let center = GeoPoint::new(55.7558, 37.6173);
        let query = ProfileQuery::from_profiles(
            vec![
                profile(1, "Москва", Some(GeoPoint::new(55.76, 37.62))),
                profile(2, "Москва", None),
                profile(3, "Санкт-Петербург", Some(GeoPoint::new(59.9343, 30.3351))),
            ],
            Utc::now(),
        );

        let filter = LocationFilter::new(LocationParams {
            point: Some(center),
            radius_km: Some(10.0),
            ..Default::default()
        });
        let rows = filter.apply(query).fetch();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id(), 1);
        assert!(rows[0].distance_km.is_some_and(|d| d < 1.0));
        assert!(filter.companion_sorter().is_some());
    }

    #[test]
    fn test_point_without_radius_is_inactive() {
        let filter = LocationFilter::new(LocationParams {
            point: Some(GeoPoint::new(55.0, 37.0)),
            ..Default::default()
        });
        assert!(!filter.is_active());
        assert!(filter.companion_sorter().is_none());
    }
}
