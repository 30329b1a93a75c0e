use crate::types::{AccessPoint, Dataset};
use geo::{Centroid, MultiPoint, Point};
use std::collections::HashSet;

/// Treats `None` and blank strings the same: nothing selected.
pub fn selected(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Distinct neighborhoods of `borough`, in source order. Empty when no borough is selected.
pub fn neighborhood_options(dataset: &Dataset, borough: Option<&str>) -> Vec<String> {
    let Some(borough) = selected(borough) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    dataset
        .points
        .iter()
        .filter(|p| p.borough == borough)
        .filter(|p| seen.insert(p.neighborhood.as_str()))
        .map(|p| p.neighborhood.clone())
        .collect()
}

pub fn filter_points<'a>(
    dataset: &'a Dataset,
    borough: &str,
    neighborhood: &str,
) -> Vec<&'a AccessPoint> {
    dataset
        .points
        .iter()
        .filter(|p| p.borough == borough && p.neighborhood == neighborhood)
        .collect()
}

/// Arithmetic mean of the located points. `None` when none has a location.
pub fn mean_center(points: &[&AccessPoint]) -> Option<Point<f64>> {
    let located: MultiPoint<f64> = points.iter().filter_map(|p| p.location).collect();
    located.centroid()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::build_dataset;

    fn point(borough: &str, neighborhood: &str, lon: f64, lat: f64) -> AccessPoint {
        AccessPoint {
            borough: borough.to_string(),
            neighborhood: neighborhood.to_string(),
            location: Some(Point::new(lon, lat)),
            access_points: 1,
        }
    }

    fn dataset() -> Dataset {
        build_dataset(vec![
            point("CUAUHTÉMOC", "ROMA NORTE", -99.16, 19.42),
            point("CUAUHTÉMOC", "CENTRO", -99.14, 19.43),
            point("CUAUHTÉMOC", "ROMA NORTE", -99.18, 19.40),
            point("Coyoacán", "DEL CARMEN", -99.16, 19.35),
            point("Coyoacán", "CENTRO", -99.17, 19.34),
        ])
    }

    #[test]
    fn neighborhoods_are_distinct_and_in_source_order() {
        let options = neighborhood_options(&dataset(), Some("CUAUHTÉMOC"));
        assert_eq!(options, vec!["ROMA NORTE", "CENTRO"]);
    }

    #[test]
    fn neighborhoods_only_come_from_the_selected_borough() {
        let options = neighborhood_options(&dataset(), Some("Coyoacán"));
        assert_eq!(options, vec!["DEL CARMEN", "CENTRO"]);
    }

    #[test]
    fn no_borough_means_no_neighborhoods() {
        let data = dataset();
        assert!(neighborhood_options(&data, None).is_empty());
        assert!(neighborhood_options(&data, Some("")).is_empty());
        assert!(neighborhood_options(&data, Some("   ")).is_empty());
    }

    #[test]
    fn unknown_borough_has_no_neighborhoods() {
        assert!(neighborhood_options(&dataset(), Some("Tlalpan")).is_empty());
    }

    #[test]
    fn filter_requires_both_columns_to_match() {
        let data = dataset();
        assert_eq!(filter_points(&data, "CUAUHTÉMOC", "ROMA NORTE").len(), 2);
        assert_eq!(filter_points(&data, "Coyoacán", "CENTRO").len(), 1);
        assert!(filter_points(&data, "Coyoacán", "ROMA NORTE").is_empty());
    }

    #[test]
    fn mean_center_is_the_average_coordinate() {
        let data = dataset();
        let matched = filter_points(&data, "CUAUHTÉMOC", "ROMA NORTE");
        let center = mean_center(&matched).unwrap();
        assert!((center.x() - (-99.17)).abs() < 1e-9);
        assert!((center.y() - 19.41).abs() < 1e-9);
    }

    #[test]
    fn mean_center_skips_points_without_location() {
        let mut unlocated = point("CUAUHTÉMOC", "ROMA NORTE", 0.0, 0.0);
        unlocated.location = None;
        let located = point("CUAUHTÉMOC", "ROMA NORTE", -99.16, 19.42);

        let center = mean_center(&[&unlocated, &located]).unwrap();
        assert_eq!(center, Point::new(-99.16, 19.42));
        assert!(mean_center(&[&unlocated]).is_none());
    }
}
