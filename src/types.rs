use crate::plate::PlateFormat;
use crate::region::Region;
use serde::Serialize;

/// Upstream attributes under stable names. `None` serializes as null.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Vehicle {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub color: Option<String>,
    pub year: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookupResult {
    pub plate: String,
    pub format: PlateFormat,
    #[serde(flatten)]
    pub vehicle: Vehicle,
    pub region: Option<Region>,
}
