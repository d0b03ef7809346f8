//! `ShippingClient` implementation.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::future::Cache;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};
use url::Url;

use evmarket_core::Vnd;

use super::types::{
    DeliveryArea, District, Envelope, FeeRequest, FeeResponse, LeadTimeRequest, LeadTimeResponse,
    Parcel, Province, ResolvedArea, ShippingQuote, Ward,
};
use super::{ShippingError, find_by_name};
use crate::config::ShippingConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const MASTER_DATA_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Standard (non-express) delivery.
const STANDARD_SERVICE_TYPE: u32 = 2;

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    Provinces,
    Districts(i64),
    Wards(i64),
}

#[derive(Debug, Clone)]
enum CacheValue {
    Provinces(Arc<Vec<Province>>),
    Districts(Arc<Vec<District>>),
    Wards(Arc<Vec<Ward>>),
}

/// Client for the GHN-style shipping-rate API.
#[derive(Clone)]
pub struct ShippingClient {
    inner: Arc<ShippingClientInner>,
}

struct ShippingClientInner {
    client: reqwest::Client,
    base_url: Url,
    service_id: u32,
    cache: Cache<CacheKey, CacheValue>,
}

impl ShippingClient {
    /// Create a new shipping-rate client.
    ///
    /// # Errors
    ///
    /// Returns error if the token or shop id is not a valid header value, or
    /// if the HTTP client fails to build.
    pub fn new(config: &ShippingConfig) -> Result<Self, ShippingError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "Token",
            HeaderValue::from_str(config.token.expose_secret())
                .map_err(|e| ShippingError::Config(format!("Invalid token format: {e}")))?,
        );
        headers.insert(
            "ShopId",
            HeaderValue::from_str(&config.shop_id)
                .map_err(|e| ShippingError::Config(format!("Invalid shop id: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let cache = Cache::builder()
            .max_capacity(2000)
            .time_to_live(MASTER_DATA_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(ShippingClientInner {
                client,
                base_url: config.api_url.clone(),
                service_id: config.service_id,
                cache,
            }),
        })
    }

    fn url(&self, path: &str) -> Result<Url, ShippingError> {
        self.inner
            .base_url
            .join(path)
            .map_err(|e| ShippingError::Config(format!("Invalid URL for {path}: {e}")))
    }

    /// Unwrap the `{code, message, data}` envelope.
    async fn unwrap_envelope<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ShippingError> {
        let status = response.status();
        let body = response.text().await?;

        let envelope: Envelope<T> = serde_json::from_str(&body).map_err(|e| {
            warn!(
                status = %status,
                body = %body.chars().take(300).collect::<String>(),
                "Unreadable shipping-rate response"
            );
            ShippingError::Parse(e.to_string())
        })?;

        if envelope.code != 200 || !status.is_success() {
            return Err(ShippingError::Api {
                code: envelope.code,
                message: envelope.message.unwrap_or_default(),
            });
        }

        envelope
            .data
            .ok_or_else(|| ShippingError::Parse("response has no data".to_string()))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, i64)],
    ) -> Result<T, ShippingError> {
        let response = self
            .inner
            .client
            .get(self.url(path)?)
            .query(query)
            .send()
            .await?;
        Self::unwrap_envelope(response).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ShippingError> {
        let response = self
            .inner
            .client
            .post(self.url(path)?)
            .json(body)
            .send()
            .await?;
        Self::unwrap_envelope(response).await
    }

    // =========================================================================
    // Master data
    // =========================================================================

    /// All provinces.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn provinces(&self) -> Result<Arc<Vec<Province>>, ShippingError> {
        if let Some(CacheValue::Provinces(list)) = self.inner.cache.get(&CacheKey::Provinces).await
        {
            debug!("Cache hit for provinces");
            return Ok(list);
        }
        let list = Arc::new(self.get::<Vec<Province>>("master-data/province", &[]).await?);
        self.inner
            .cache
            .insert(CacheKey::Provinces, CacheValue::Provinces(Arc::clone(&list)))
            .await;
        Ok(list)
    }

    /// Districts of a province.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn districts(&self, province_id: i64) -> Result<Arc<Vec<District>>, ShippingError> {
        let key = CacheKey::Districts(province_id);
        if let Some(CacheValue::Districts(list)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for districts");
            return Ok(list);
        }
        let list = Arc::new(
            self.get::<Vec<District>>("master-data/district", &[("province_id", province_id)])
                .await?,
        );
        self.inner
            .cache
            .insert(key, CacheValue::Districts(Arc::clone(&list)))
            .await;
        Ok(list)
    }

    /// Wards of a district.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn wards(&self, district_id: i64) -> Result<Arc<Vec<Ward>>, ShippingError> {
        let key = CacheKey::Wards(district_id);
        if let Some(CacheValue::Wards(list)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for wards");
            return Ok(list);
        }
        let list = Arc::new(
            self.get::<Vec<Ward>>("master-data/ward", &[("district_id", district_id)])
                .await?,
        );
        self.inner
            .cache
            .insert(key, CacheValue::Wards(Arc::clone(&list)))
            .await;
        Ok(list)
    }

    // =========================================================================
    // Quotes
    // =========================================================================

    /// Map an address given by names to carrier codes.
    ///
    /// Returns `Ok(None)` when the province, district or ward has no match.
    ///
    /// # Errors
    ///
    /// Returns error if a master-data request fails.
    #[instrument(skip(self))]
    pub async fn resolve(&self, area: &DeliveryArea) -> Result<Option<ResolvedArea>, ShippingError> {
        let provinces = self.provinces().await?;
        let Some(province) = find_by_name(provinces.as_slice(), &area.province, |p| p.name.as_str()) else {
            debug!("No matching province");
            return Ok(None);
        };

        let districts = self.districts(province.id).await?;
        let Some(district) = find_by_name(districts.as_slice(), &area.district, |d| d.name.as_str()) else {
            debug!("No matching district");
            return Ok(None);
        };

        let wards = self.wards(district.id).await?;
        let Some(ward) = find_by_name(wards.as_slice(), &area.ward, |w| w.name.as_str()) else {
            debug!("No matching ward");
            return Ok(None);
        };

        Ok(Some(ResolvedArea {
            district_id: district.id,
            ward_code: ward.code.clone(),
        }))
    }

    /// Shipping fee for the standard parcel.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn fee(&self, area: &ResolvedArea) -> Result<Vnd, ShippingError> {
        let request = FeeRequest {
            area,
            parcel: Parcel::STANDARD,
            service_type_id: STANDARD_SERVICE_TYPE,
        };
        let response: FeeResponse = self.post("v2/shipping-order/fee", &request).await?;
        Ok(response.total)
    }

    /// Expected delivery time with the configured service.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn lead_time(
        &self,
        area: &ResolvedArea,
    ) -> Result<Option<DateTime<Utc>>, ShippingError> {
        let request = LeadTimeRequest {
            area,
            service_id: self.inner.service_id,
        };
        let response: LeadTimeResponse = self.post("v2/shipping-order/leadtime", &request).await?;
        Ok(DateTime::from_timestamp(response.leadtime, 0))
    }

    /// Resolve an address and quote fee plus expected delivery.
    ///
    /// A failed lead-time lookup is logged and leaves the date empty; the fee
    /// is required.
    ///
    /// # Errors
    ///
    /// [`ShippingError::UnknownArea`] when the address does not resolve, or
    /// any API failure from the fee request.
    #[instrument(skip(self))]
    pub async fn estimate(&self, area: &DeliveryArea) -> Result<ShippingQuote, ShippingError> {
        let resolved = self.resolve(area).await?.ok_or_else(|| {
            ShippingError::UnknownArea(format!(
                "{}, {}, {}",
                area.ward, area.district, area.province
            ))
        })?;

        let fee = self.fee(&resolved).await?;
        let expected_delivery = match self.lead_time(&resolved).await {
            Ok(date) => date,
            Err(e) => {
                warn!(error = %e, "Lead time lookup failed");
                None
            }
        };

        Ok(ShippingQuote {
            fee,
            expected_delivery,
        })
    }
}
