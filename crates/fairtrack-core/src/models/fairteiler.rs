use serde::{Deserialize, Serialize};

/// A Fairteiler record as delivered by the data provider.
///
/// Coordinates arrive as decimal-degree strings and may be missing or malformed;
/// turning them into a usable target is the job of `fairtrack_geo::target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fairteiler {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub latitude: Option<String>,
    #[serde(default)]
    pub longitude: Option<String>,
}

impl Fairteiler {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into(), latitude: None, longitude: None }
    }

    pub fn with_location(
        mut self,
        latitude: impl Into<String>,
        longitude: impl Into<String>,
    ) -> Self {
        self.latitude = Some(latitude.into());
        self.longitude = Some(longitude.into());
        self
    }
}
