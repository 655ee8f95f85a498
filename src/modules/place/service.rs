use serde::Serialize;

use super::repository::Place;
use crate::utils::geo;

/// Places farther than this from the query point are not recommended. The
/// boundary itself is excluded.
pub const NEARBY_RADIUS_KM: f64 = 10.0;
pub const TOP_RATED_LIMIT: i64 = 10;

#[derive(Serialize, Clone)]
pub struct RecommendedPlace {
    #[serde(flatten)]
    pub place: Place,
    pub distance_km: f64,
}

pub fn cache_key(location: &Option<String>, latitude: &Option<f64>, longitude: &Option<f64>) -> String {
    format!(
        "recommendations:{}:{}:{}",
        location.as_deref().unwrap_or("-"),
        latitude.map(|l| l.to_string()).unwrap_or_else(|| "-".to_string()),
        longitude.map(|l| l.to_string()).unwrap_or_else(|| "-".to_string()),
    )
}

/// Keeps places strictly within the nearby radius of the query point,
/// closest first.
pub fn rank_by_distance(places: Vec<Place>, latitude: f64, longitude: f64) -> Vec<RecommendedPlace> {
    let mut nearby = places
        .into_iter()
        .map(|place| {
            let distance_km =
                geo::haversine_distance_km(latitude, longitude, place.latitude, place.longitude);
            RecommendedPlace { place, distance_km }
        })
        .filter(|recommended| recommended.distance_km < NEARBY_RADIUS_KM)
        .collect::<Vec<_>>();

    nearby.sort_by(|a, b| {
        a.distance_km
            .partial_cmp(&b.distance_km)
            .expect("Distances are never NaN")
    });

    nearby
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ulid::Ulid;

    fn place_at(name: &str, latitude: f64, longitude: f64) -> Place {
        Place {
            id: Ulid::new().to_string(),
            name: name.to_string(),
            type_: "food".to_string(),
            sub_type: "mess".to_string(),
            address: "Peelamedu, Coimbatore".to_string(),
            latitude,
            longitude,
            price_level: "economical".to_string(),
            description: String::new(),
            contact_info: None,
            tags: String::new(),
            photo: None,
            is_approved: true,
            reported: false,
            average_rating: 4.0,
            added_by: Ulid::new().to_string(),
            created_at: Utc::now().naive_utc(),
            updated_at: None,
        }
    }

    #[test]
    fn sorts_nearby_places_closest_first() {
        // Roughly 0, 1.2 and 5 km east of the query point.
        let places = vec![
            place_at("far", 11.0, 77.046),
            place_at("here", 11.0, 77.0),
            place_at("near", 11.0, 77.011),
        ];

        let ranked = rank_by_distance(places, 11.0, 77.0);

        let names = ranked
            .iter()
            .map(|r| r.place.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["here", "near", "far"]);
    }

    #[test]
    fn excludes_places_outside_the_radius() {
        // A degree of latitude is ~111 km.
        let places = vec![place_at("elsewhere", 12.0, 77.0)];

        assert!(rank_by_distance(places, 11.0, 77.0).is_empty());
    }

    #[test]
    fn boundary_is_exclusive() {
        // One degree of longitude on the equator is 2*pi*R/360 km, so this
        // sits a hair past the 10 km radius.
        const KM_PER_DEGREE: f64 = 111.194_926_644_558_74;
        let at_boundary = place_at("boundary", 0.0, 10.000_001 / KM_PER_DEGREE);
        let just_inside = place_at("inside", 0.0, 9.99 / KM_PER_DEGREE);

        let distance = crate::utils::geo::haversine_distance_km(
            0.0,
            0.0,
            at_boundary.latitude,
            at_boundary.longitude,
        );
        assert!((distance - NEARBY_RADIUS_KM).abs() < 1e-3);

        let ranked = rank_by_distance(vec![at_boundary, just_inside], 0.0, 0.0);

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].place.name, "inside");
    }

    #[test]
    fn cache_key_covers_all_three_inputs() {
        assert_eq!(cache_key(&None, &None, &None), "recommendations:-:-:-");
        assert_eq!(
            cache_key(&Some("Peelamedu".to_string()), &None, &None),
            "recommendations:Peelamedu:-:-"
        );
        assert_ne!(
            cache_key(&None, &Some(11.0), &Some(77.0)),
            cache_key(&None, &Some(11.0), &Some(77.1)),
        );
    }
}
