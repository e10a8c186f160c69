use std::collections::HashMap;

/// Axis-aligned latitude/longitude rectangle. All four bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBox {
    pub north: f64,
    pub east: f64,
    pub south: f64,
    pub west: f64,
}

impl GeoBox {
    /// Bounds in the registry's storage order: max lat, max lng, min lat, min lng.
    pub const fn new(north: f64, east: f64, south: f64, west: f64) -> Self {
        Self {
            north,
            east,
            south,
            west,
        }
    }

    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        self.south <= lat && lat <= self.north && self.west <= lng && lng <= self.east
    }
}

/// Regions selectable with `city_id`.
const CITIES: [(i64, GeoBox); 10] = [
    (1, GeoBox::new(36.852702785393014, 36.87286376953126, 36.535570922786015, 35.88409423828126)),
    (2, GeoBox::new(36.2104851748389, 36.81861877441407, 35.84286468375614, 35.82984924316407)),
    (3, GeoBox::new(36.495937096205274, 36.649870522206335, 36.064120488812605, 35.4740187605459)),
    (4, GeoBox::new(36.50903585150776, 36.402143998719424, 36.47976138594277, 36.31474829364722)),
    (5, GeoBox::new(36.64234742932176, 36.3232450328562, 36.53629731173617, 36.029282092441115)),
    (6, GeoBox::new(36.116001873480265, 36.06470054394251, 36.0627178139989, 35.91771907373497)),
    (7, GeoBox::new(38.53348725642158, 38.78062516773912, 37.32756763881127, 35.45481415037825)),
    (8, GeoBox::new(37.35461473302187, 38.0755896764663, 36.85431769725969, 36.67725839531126)),
    (9, GeoBox::new(39.065058845523424, 40.013647871307754, 37.86798402826048, 36.687836853946884)),
    (10, GeoBox::new(38.160827052916495, 39.33362355320935, 37.44250898099215, 37.35608449070936)),
];

/// Static mapping from city id to its bounding box.
#[derive(Debug, Clone)]
pub struct CityRegistry {
    boxes: HashMap<i64, GeoBox>,
}

impl Default for CityRegistry {
    fn default() -> Self {
        CITIES.into_iter().collect()
    }
}

impl FromIterator<(i64, GeoBox)> for CityRegistry {
    fn from_iter<I: IntoIterator<Item = (i64, GeoBox)>>(iter: I) -> Self {
        Self {
            boxes: iter.into_iter().collect(),
        }
    }
}

impl CityRegistry {
    pub fn get(&self, city_id: i64) -> Option<&GeoBox> {
        self.boxes.get(&city_id)
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }
}

/// Google Maps link centred on a point at street zoom.
pub fn maps_link(lat: f64, lng: f64) -> String {
    format!("https://www.google.com/maps/?q={lat:.6},{lng:.6}&ll={lat:.6},{lng:.6}&z=21")
}
