use crate::types::Vehicle;
use crate::upstream::Fields;

/// Placeholders the upstream uses for "no data".
const SENTINELS: &[&str] = &["", "-", "---", "----"];

// Raw names each field is read from, in order of preference.
const BRAND: &[&str] = &["marca"];
const MODEL: &[&str] = &["modelo"];
const COLOR: &[&str] = &["cor"];
const YEAR: &[&str] = &["ano modelo", "ano"];
const STATE: &[&str] = &["uf", "estado"];
const CITY: &[&str] = &["município", "municipio", "cidade"];

pub fn is_sentinel(value: &str) -> bool {
    SENTINELS.contains(&value.trim())
}

fn raw_key(key: &str) -> String {
    key.trim().trim_end_matches(':').trim_end().to_lowercase()
}

/// Removes the first alias found with a real value. Sentinel-valued aliases
/// are removed as well.
fn take(fields: &mut Fields, aliases: &[&str]) -> Option<String> {
    let mut found = None;
    for alias in aliases {
        let keys: Vec<String> = fields
            .keys()
            .filter(|k| raw_key(k) == *alias)
            .cloned()
            .collect();
        for key in keys {
            if let Some(value) = fields.remove(&key) {
                let value = value.trim();
                if found.is_none() && !is_sentinel(value) {
                    found = Some(value.to_string());
                }
            }
        }
    }
    found
}

/// Renames the known fields and drops everything else. Returns `None` when
/// the upstream has no brand for the plate, which is how it reports an
/// unknown plate.
pub fn normalize(mut fields: Fields) -> Option<Vehicle> {
    let vehicle = Vehicle {
        brand: take(&mut fields, BRAND),
        model: take(&mut fields, MODEL),
        color: take(&mut fields, COLOR),
        year: take(&mut fields, YEAR),
        state: take(&mut fields, STATE).map(|s| s.to_uppercase()),
        city: take(&mut fields, CITY),
    };
    if vehicle.brand.is_none() {
        return None;
    }
    Some(vehicle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_renames_scraped_fields() {
        let vehicle = normalize(fields(&[
            ("Marca", "VW"),
            ("Modelo", "GOL 1.0"),
            ("Cor", "Prata"),
            ("Ano Modelo", "2015"),
            ("Ano", "2014"),
            ("UF", "pr"),
            ("Município", "Curitiba"),
            ("Chassi", "*****12345"),
        ]))
        .unwrap();
        assert_eq!(
            vehicle,
            Vehicle {
                brand: Some("VW".to_string()),
                model: Some("GOL 1.0".to_string()),
                color: Some("Prata".to_string()),
                year: Some("2015".to_string()),
                state: Some("PR".to_string()),
                city: Some("Curitiba".to_string()),
            }
        );
    }

    #[test]
    fn test_keys_are_case_insensitive() {
        let vehicle = normalize(fields(&[
            ("marca", "FIAT"),
            ("cor", "Branca"),
            ("municipio", "Joinville"),
            ("uf:", "SC"),
        ]))
        .unwrap();
        assert_eq!(vehicle.brand.as_deref(), Some("FIAT"));
        assert_eq!(vehicle.color.as_deref(), Some("Branca"));
        assert_eq!(vehicle.city.as_deref(), Some("Joinville"));
        assert_eq!(vehicle.state.as_deref(), Some("SC"));
        assert_eq!(vehicle.model, None);
        assert_eq!(vehicle.year, None);
    }

    #[test]
    fn test_falls_back_to_later_alias() {
        let vehicle = normalize(fields(&[
            ("Marca", "FORD"),
            ("Ano Modelo", "----"),
            ("Ano", "2009"),
        ]))
        .unwrap();
        assert_eq!(vehicle.year.as_deref(), Some("2009"));
    }

    #[test]
    fn test_brand_sentinels_are_not_found() {
        assert_eq!(normalize(fields(&[("Marca", "---"), ("Modelo", "X")])), None);
        assert_eq!(normalize(fields(&[("Marca", "----")])), None);
        assert_eq!(normalize(fields(&[("Marca", "  ")])), None);
        assert_eq!(normalize(fields(&[("Modelo", "UNO")])), None);
        assert_eq!(normalize(Fields::new()), None);
    }

    #[test]
    fn test_other_sentinels_become_null() {
        let vehicle =
            normalize(fields(&[("Marca", "GM"), ("Cor", "---"), ("UF", "-")])).unwrap();
        assert_eq!(vehicle.color, None);
        assert_eq!(vehicle.state, None);
    }
}
