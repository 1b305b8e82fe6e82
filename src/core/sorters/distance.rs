use super::Sorter;
use crate::core::distance::distance_between;
use crate::core::query::{OrderTerm, ProfileQuery};
use crate::core::Params;
use crate::models::{GeoPoint, SortDirection};
use serde_json::json;

/// Orders by great-circle distance from a query point
///
/// Without a point this sorter does nothing. With one, every row's distance
/// is measured from that point, replacing any distance already on the row.
/// Rows without coordinates sort last, or are dropped when
/// `only_with_coordinates` is set.
#[derive(Debug, Clone)]
pub struct DistanceSorter {
    point: Option<GeoPoint>,
    only_with_coordinates: bool,
    direction: SortDirection,
}

impl DistanceSorter {
    pub fn new(point: Option<GeoPoint>) -> Self {
        Self {
            point,
            only_with_coordinates: false,
            direction: SortDirection::Asc,
        }
    }

    pub fn only_with_coordinates(mut self, enabled: bool) -> Self {
        self.only_with_coordinates = enabled;
        self
    }

    pub fn with_direction(mut self, direction: SortDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn point(&self) -> Option<GeoPoint> {
        self.point
    }
}

impl Sorter for DistanceSorter {
    fn name(&self) -> &'static str {
        "distance"
    }

    fn apply(&self, query: ProfileQuery) -> ProfileQuery {
        let Some(point) = self.point else {
            tracing::debug!("Distance sort skipped: no reference point");
            return query;
        };

        let mut query = query.map_rows(|row| {
            row.distance_km = row.profile.location.map(|loc| distance_between(point, loc));
        });
        if self.only_with_coordinates {
            query = query.filter(|row| row.distance_km.is_some());
        }
        query.order_by(OrderTerm::Distance {
            direction: self.direction,
        })
    }

    fn params(&self) -> Params {
        let mut params = Params::from([(
            "direction".to_string(),
            json!(self.direction.to_string()),
        )]);
        if let Some(point) = self.point {
            params.insert("lat".into(), json!(point.lat));
            params.insert("lng".into(), json!(point.lng));
        }
        if self.only_with_coordinates {
            params.insert("only_with_coordinates".into(), json!(true));
        }
        params
    }

    fn description(&self) -> String {
        match self.direction {
            SortDirection::Asc => "сначала ближайшие".to_string(),
            SortDirection::Desc => "сначала дальние".to_string(),
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
