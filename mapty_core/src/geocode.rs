//! Reverse geocoding and country flags for new workouts.
//!
//! Both lookups are network calls that may fail. Workout creation never
//! waits on them: `enrich` runs afterwards and fills in whatever it can.

use crate::config::GeocodingConfig;
use crate::{Coords, Error, Result};
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_REVERSE_URL: &str =
    "https://api.bigdatacloud.net/data/reverse-geocode-client";
pub const DEFAULT_FLAG_URL: &str = "https://restcountries.com/v3.1/alpha";

/// Result of a reverse geocoding lookup
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Place {
    pub city: Option<String>,
    pub country_name: Option<String>,
    /// ISO 3166-1 alpha-2
    pub country_code: Option<String>,
}

pub trait Geocoder {
    fn reverse_geocode(&self, coords: Coords) -> Result<Place>;
    /// Image URL of the country's flag
    fn country_flag(&self, country_code: &str) -> Result<String>;
}

/// Optional fields gathered for a workout
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Enrichment {
    pub location: Option<String>,
    pub flag: Option<String>,
}

impl Enrichment {
    pub fn is_empty(&self) -> bool {
        self.location.is_none() && self.flag.is_none()
    }
}

/// Look up place name and flag, keeping whatever succeeds
pub fn enrich(geocoder: &dyn Geocoder, coords: Coords) -> Enrichment {
    let place = match geocoder.reverse_geocode(coords) {
        Ok(place) => place,
        Err(e) => {
            tracing::warn!("Reverse geocoding failed for {}: {}", coords, e);
            return Enrichment::default();
        }
    };

    let location = place.city.clone().or_else(|| place.country_name.clone());

    let flag = match place.country_code.as_deref() {
        Some(code) => match geocoder.country_flag(code) {
            Ok(flag) => Some(flag),
            Err(e) => {
                tracing::warn!("Flag lookup failed for {}: {}", code, e);
                None
            }
        },
        None => {
            tracing::debug!("No country code for {}, skipping flag", coords);
            None
        }
    };

    Enrichment { location, flag }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReverseResponse {
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    locality: Option<String>,
    #[serde(default)]
    country_name: Option<String>,
    #[serde(default)]
    country_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CountryResponse {
    flags: FlagUrls,
}

#[derive(Debug, Deserialize)]
struct FlagUrls {
    png: Option<String>,
    svg: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Geocoder backed by the BigDataCloud and REST Countries HTTP APIs
pub struct HttpGeocoder {
    agent: ureq::Agent,
    reverse_url: String,
    flag_url: String,
}

impl HttpGeocoder {
    pub fn new(reverse_url: impl Into<String>, flag_url: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            reverse_url: reverse_url.into(),
            flag_url: flag_url.into(),
        }
    }

    pub fn from_config(config: &GeocodingConfig) -> Self {
        Self::new(
            config.reverse_url.clone(),
            config.flag_url.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, request: ureq::Request) -> Result<T> {
        match request.set("Accept", "application/json").call() {
            Ok(response) => response
                .into_json::<T>()
                .map_err(|e| Error::Geocoding(format!("malformed response: {}", e))),
            Err(ureq::Error::Status(code, _)) => {
                Err(Error::Geocoding(format!("request failed with status {}", code)))
            }
            Err(e) => Err(Error::Geocoding(e.to_string())),
        }
    }
}

impl Default for HttpGeocoder {
    fn default() -> Self {
        Self::from_config(&GeocodingConfig::default())
    }
}

impl Geocoder for HttpGeocoder {
    fn reverse_geocode(&self, coords: Coords) -> Result<Place> {
        let request = self
            .agent
            .get(&self.reverse_url)
            .query("latitude", &coords.lat.to_string())
            .query("longitude", &coords.lng.to_string())
            .query("localityLanguage", "en");
        let data: ReverseResponse = self.get_json(request)?;

        tracing::debug!("Reverse geocoded {} to {:?}", coords, data);
        Ok(Place {
            city: non_empty(data.city).or_else(|| non_empty(data.locality)),
            country_name: non_empty(data.country_name),
            country_code: non_empty(data.country_code),
        })
    }

    fn country_flag(&self, country_code: &str) -> Result<String> {
        let request = self.agent.get(&self.flag_url).query("codes", country_code);
        let countries: Vec<CountryResponse> = self.get_json(request)?;

        countries
            .into_iter()
            .next()
            .and_then(|c| non_empty(c.flags.png).or_else(|| non_empty(c.flags.svg)))
            .ok_or_else(|| Error::Geocoding(format!("no flag for country {}", country_code)))
    }
}
