//! Map view state: pins, the user marker and the visible region.
//!
//! [`MapView`] is owned by the [`App`](crate::app::App) and rebuilt whenever
//! a search finishes. Drawing happens in `ui`, which only reads the pins and
//! asks for [`MapView::bounds`].

use crate::models::{Coordinate, GolfLocation};

/// Zoom used when there is nothing to fit around the user.
pub const DEFAULT_ZOOM: u8 = 12;
/// Extra space around fitted pins, as a share of the span on each side.
pub const FIT_PADDING: f64 = 0.15;
/// Smallest span (degrees) a fitted view may have.
pub const MIN_SPAN: f64 = 0.01;

/// A numbered location marker.
#[derive(Debug, Clone, PartialEq)]
pub struct Pin {
    /// 1-based position of the location in the ranked list.
    pub rank: usize,
    pub position: Coordinate,
    pub name: String,
}

/// Geographic rectangle in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    fn around(point: Coordinate) -> Self {
        Self {
            south: point.latitude,
            west: point.longitude,
            north: point.latitude,
            east: point.longitude,
        }
    }

    fn extend(&mut self, point: Coordinate) {
        self.south = self.south.min(point.latitude);
        self.north = self.north.max(point.latitude);
        self.west = self.west.min(point.longitude);
        self.east = self.east.max(point.longitude);
    }

    /// Grows the box by `ratio` of its span on every side, never letting a
    /// side collapse below [`MIN_SPAN`].
    fn padded(self, ratio: f64) -> Self {
        let lat_span = (self.north - self.south).max(MIN_SPAN);
        let lon_span = (self.east - self.west).max(MIN_SPAN);
        let lat_mid = (self.north + self.south) / 2.0;
        let lon_mid = (self.east + self.west) / 2.0;
        let half_lat = lat_span * (0.5 + ratio);
        let half_lon = lon_span * (0.5 + ratio);
        Self {
            south: (lat_mid - half_lat).max(-90.0),
            north: (lat_mid + half_lat).min(90.0),
            west: (lon_mid - half_lon).max(-180.0),
            east: (lon_mid + half_lon).min(180.0),
        }
    }

    #[cfg(test)]
    fn contains(&self, point: Coordinate) -> bool {
        (self.south..=self.north).contains(&point.latitude)
            && (self.west..=self.east).contains(&point.longitude)
    }
}

/// What part of the world the map shows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Viewport {
    World,
    Center { center: Coordinate, zoom: u8 },
    Fit(Bounds),
}

#[derive(Debug, Clone)]
pub struct MapView {
    pins: Vec<Pin>,
    user: Option<Coordinate>,
    viewport: Viewport,
}

impl Default for MapView {
    fn default() -> Self {
        Self::new()
    }
}

impl MapView {
    pub fn new() -> Self {
        Self {
            pins: Vec::new(),
            user: None,
            viewport: Viewport::World,
        }
    }

    pub fn pins(&self) -> &[Pin] {
        &self.pins
    }

    pub fn user(&self) -> Option<Coordinate> {
        self.user
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Drops every marker.
    pub fn clear(&mut self) {
        self.pins.clear();
        self.user = None;
        self.viewport = Viewport::World;
    }

    /// Replaces the markers with the given results and refits the view.
    ///
    /// Locations without a usable coordinate get no pin but still take up
    /// their rank, so pin numbers always match the list.
    pub fn update(&mut self, locations: &[GolfLocation], user: Option<Coordinate>) {
        self.clear();
        self.user = user.filter(Coordinate::is_valid);

        self.pins = locations
            .iter()
            .enumerate()
            .filter_map(|(i, loc)| {
                loc.coordinate().map(|position| Pin {
                    rank: i + 1,
                    position,
                    name: loc.name.clone(),
                })
            })
            .collect();

        self.viewport = match (self.pins.first(), self.user) {
            (Some(first), _) => {
                let mut bounds = Bounds::around(first.position);
                for pin in &self.pins[1..] {
                    bounds.extend(pin.position);
                }
                if let Some(user) = self.user {
                    bounds.extend(user);
                }
                Viewport::Fit(bounds.padded(FIT_PADDING))
            }
            // A single point has no extent to fit.
            (None, Some(center)) => Viewport::Center {
                center,
                zoom: DEFAULT_ZOOM,
            },
            (None, None) => Viewport::World,
        };
    }

    /// Canvas bounds as `(x = [west, east], y = [south, north])`.
    pub fn bounds(&self) -> ([f64; 2], [f64; 2]) {
        match self.viewport {
            Viewport::World => ([-180.0, 180.0], [-90.0, 90.0]),
            Viewport::Center { center, zoom } => {
                let half = span_for_zoom(zoom) / 2.0;
                (
                    [center.longitude - half, center.longitude + half],
                    [center.latitude - half, center.latitude + half],
                )
            }
            Viewport::Fit(b) => ([b.west, b.east], [b.south, b.north]),
        }
    }
}

/// Degrees of longitude covered at a web-map zoom level.
pub fn span_for_zoom(zoom: u8) -> f64 {
    360.0 / 2f64.powi(i32::from(zoom))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(name: &str, lat: f64, lon: f64) -> GolfLocation {
        GolfLocation {
            name: name.into(),
            latitude: Some(lat),
            longitude: Some(lon),
            ..Default::default()
        }
    }

    #[test]
    fn no_valid_pins_centers_on_user_at_default_zoom() {
        let user = Coordinate::new(37.77, -122.41);
        let unplaced = GolfLocation {
            name: "Nowhere".into(),
            ..Default::default()
        };

        let mut map = MapView::new();
        map.update(&[unplaced], Some(user));

        assert!(map.pins().is_empty());
        assert_eq!(map.user(), Some(user));
        assert_eq!(
            map.viewport(),
            Viewport::Center {
                center: user,
                zoom: DEFAULT_ZOOM
            }
        );

        let ([west, east], [south, north]) = map.bounds();
        assert!(west < user.longitude && user.longitude < east);
        assert!(south < user.latitude && user.latitude < north);
        assert!((east - west - span_for_zoom(DEFAULT_ZOOM)).abs() < 1e-9);
    }

    #[test]
    fn nothing_at_all_shows_the_world() {
        let mut map = MapView::new();
        map.update(&[], None);
        assert_eq!(map.viewport(), Viewport::World);
        assert_eq!(map.bounds(), ([-180.0, 180.0], [-90.0, 90.0]));
    }

    #[test]
    fn pins_keep_their_list_rank() {
        let locations = [
            at("First", 37.80, -122.40),
            GolfLocation {
                name: "No coords".into(),
                ..Default::default()
            },
            at("Third", 37.70, -122.50),
        ];

        let mut map = MapView::new();
        map.update(&locations, None);

        let ranks: Vec<_> = map.pins().iter().map(|p| (p.rank, p.name.as_str())).collect();
        assert_eq!(ranks, [(1, "First"), (3, "Third")]);
    }

    #[test]
    fn fit_covers_all_pins_and_the_user() {
        let user = Coordinate::new(37.60, -122.60);
        let locations = [at("A", 37.80, -122.40), at("B", 37.70, -122.50)];

        let mut map = MapView::new();
        map.update(&locations, Some(user));

        let Viewport::Fit(bounds) = map.viewport() else {
            panic!("expected a fitted view, got {:?}", map.viewport());
        };
        assert!(bounds.contains(user));
        for pin in map.pins() {
            assert!(bounds.contains(pin.position));
        }
        // Padding keeps markers off the edge.
        assert!(bounds.north > 37.80 && bounds.south < 37.60);
        assert!(bounds.east > -122.40 && bounds.west < -122.60);
    }

    #[test]
    fn single_pin_still_has_a_visible_span() {
        let mut map = MapView::new();
        map.update(&[at("Only", 10.0, 20.0)], None);

        let ([west, east], [south, north]) = map.bounds();
        assert!(east - west >= MIN_SPAN);
        assert!(north - south >= MIN_SPAN);
    }

    #[test]
    fn update_replaces_previous_markers() {
        let mut map = MapView::new();
        map.update(&[at("A", 1.0, 1.0), at("B", 2.0, 2.0)], Some(Coordinate::new(0.0, 0.0)));
        map.update(&[at("C", 3.0, 3.0)], None);

        assert_eq!(map.pins().len(), 1);
        assert_eq!(map.pins()[0].name, "C");
        assert_eq!(map.user(), None);
    }
}
