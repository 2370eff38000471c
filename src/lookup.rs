use crate::normalize::normalize;
use crate::plate::{Plate, PlateError};
use crate::region::RegionTable;
use crate::types::LookupResult;
use crate::upstream::{PlateSource, UpstreamError};
use log::{info, warn};
use std::sync::Arc;
use warp::http::StatusCode;

#[derive(Debug, Fail)]
pub enum LookupError {
    #[fail(display = "invalid plate: {}", _0)]
    InvalidPlate(#[cause] PlateError),
    #[fail(display = "no data for plate {}", _0)]
    NotFound(String),
    #[fail(display = "{}", _0)]
    Upstream(#[cause] UpstreamError),
}

impl LookupError {
    pub fn status(&self) -> StatusCode {
        match self {
            LookupError::InvalidPlate(_) => StatusCode::BAD_REQUEST,
            LookupError::NotFound(_) => StatusCode::NOT_FOUND,
            LookupError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the user by the form.
    pub fn public_message(&self) -> &'static str {
        match self {
            LookupError::InvalidPlate(_) => "Placa inválida. Use 7 caracteres: letras e números.",
            LookupError::NotFound(_) => {
                "Não foram encontradas informações detalhadas para esta placa."
            }
            LookupError::Upstream(_) => "Placa inválida ou não encontrada.",
        }
    }
}

/// Everything a request needs. Read-only once built, shared between
/// requests.
#[derive(Clone)]
pub struct Lookup {
    source: Arc<dyn PlateSource>,
    regions: Arc<RegionTable>,
}

impl Lookup {
    pub fn new(source: Arc<dyn PlateSource>, regions: RegionTable) -> Self {
        Lookup {
            source,
            regions: Arc::new(regions),
        }
    }

    pub async fn run(&self, raw: &str) -> Result<LookupResult, LookupError> {
        let plate = Plate::parse(raw).map_err(|e| {
            warn!("Rejecting plate {:?}: {}", raw, e);
            LookupError::InvalidPlate(e)
        })?;
        let region = self.regions.lookup(plate.prefix());
        info!(
            "Looking up {} plate {} (region {:?})",
            plate.format(),
            plate.formatted(),
            region.as_ref().map(|r| r.uf.as_str())
        );

        let fields = match self.source.fetch(&plate).await {
            Ok(fields) => fields,
            Err(UpstreamError::NotFound) => {
                warn!("Upstream does not know plate {}", plate);
                return Err(LookupError::NotFound(plate.to_string()));
            }
            Err(e) => return Err(LookupError::Upstream(e)),
        };
        let mut vehicle = normalize(fields).ok_or_else(|| {
            warn!("Upstream has no vehicle data for {}", plate);
            LookupError::NotFound(plate.to_string())
        })?;
        if vehicle.state.is_none() {
            vehicle.state = region.as_ref().map(|r| r.uf.clone());
        }

        Ok(LookupResult {
            plate: plate.to_string(),
            format: plate.format(),
            vehicle,
            region,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::plate::PlateFormat;
    use crate::upstream::Fields;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves canned fields for one plate, 404 for anything else.
    pub(crate) struct FakeSource {
        pub plate: &'static str,
        pub fields: Vec<(&'static str, &'static str)>,
        pub fail: bool,
        pub calls: AtomicUsize,
    }

    impl FakeSource {
        pub(crate) fn new(plate: &'static str, fields: Vec<(&'static str, &'static str)>) -> Self {
            FakeSource {
                plate,
                fields,
                fail: false,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PlateSource for FakeSource {
        async fn fetch(&self, plate: &Plate) -> Result<Fields, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(UpstreamError::Status(503));
            }
            if plate.as_str() != self.plate {
                return Err(UpstreamError::NotFound);
            }
            Ok(self
                .fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect())
        }
    }

    fn build(source: FakeSource) -> (Lookup, Arc<FakeSource>) {
        let source = Arc::new(source);
        (
            Lookup::new(source.clone(), RegionTable::southern().unwrap()),
            source,
        )
    }

    #[tokio::test]
    async fn test_lookup_success() {
        let (lookup, source) = build(FakeSource::new(
            "AAA1D23",
            vec![
                ("Marca", "VW"),
                ("Modelo", "GOL"),
                ("Cor", "Prata"),
                ("Ano Modelo", "2020"),
                ("UF", "PR"),
                ("Município", "Curitiba"),
            ],
        ));
        let result = lookup.run("aaa-1d23").await.unwrap();
        assert_eq!(result.plate, "AAA1D23");
        assert_eq!(result.format, PlateFormat::Mercosul);
        assert_eq!(result.vehicle.brand.as_deref(), Some("VW"));
        assert_eq!(result.vehicle.city.as_deref(), Some("Curitiba"));
        assert_eq!(result.region.unwrap().name, "Paraná");
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_state_falls_back_to_region() {
        let (lookup, _) = build(FakeSource::new("MAB1234", vec![("Marca", "FIAT")]));
        let result = lookup.run("MAB1234").await.unwrap();
        assert_eq!(result.format, PlateFormat::Legacy);
        assert_eq!(result.vehicle.state.as_deref(), Some("SC"));
    }

    #[tokio::test]
    async fn test_unknown_region_keeps_upstream_state() {
        let (lookup, _) = build(FakeSource::new(
            "ZZZ1234",
            vec![("Marca", "FIAT"), ("UF", "SP")],
        ));
        let result = lookup.run("ZZZ1234").await.unwrap();
        assert_eq!(result.region, None);
        assert_eq!(result.vehicle.state.as_deref(), Some("SP"));
    }

    #[tokio::test]
    async fn test_invalid_plate_skips_upstream() {
        let (lookup, source) = build(FakeSource::new("ABC1234", vec![]));
        let err = lookup.run("ABCD123").await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        let err = lookup.run("AB1234").await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_sentinel_brand_is_not_found() {
        let (lookup, _) = build(FakeSource::new(
            "ABC1234",
            vec![("Marca", "----"), ("Modelo", "----")],
        ));
        let err = lookup.run("ABC1234").await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_upstream_not_found() {
        let (lookup, _) = build(FakeSource::new("ABC1234", vec![("Marca", "VW")]));
        let err = lookup.run("XYZ9876").await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_not_retried() {
        let mut source = FakeSource::new("ABC1234", vec![("Marca", "VW")]);
        source.fail = true;
        let (lookup, source) = build(source);
        let err = lookup.run("ABC1234").await.unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Placa inválida ou não encontrada.");
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }
}
