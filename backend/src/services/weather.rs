//! Weather data service: cached forecasts and historical quarter baselines

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use sqlx::{types::Json, FromRow, PgPool};
use uuid::Uuid;

use shared::{
    DateRange, GpsCoordinates, HistoricalRecord, HistoricalWeather, Quarter, WeatherForecast,
};

use crate::error::{AppError, AppResult};
use crate::external::{OpenMeteoClient, WeatherForecastProvider};

/// Forecast provider backed by the forecast API and PostgreSQL
#[derive(Clone)]
pub struct WeatherService {
    db: PgPool,
    weather_client: OpenMeteoClient,
    cache_ttl: Duration,
}

/// Cached forecast record
#[derive(Debug, Clone, FromRow)]
pub struct CachedForecast {
    pub id: Uuid,
    pub latitude: Decimal,
    pub longitude: Decimal,
    pub horizon_days: i32,
    pub forecast: Json<WeatherForecast>,
    pub fetched_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Historical quarter baseline as stored
#[derive(Debug, Clone, FromRow)]
pub struct HistoricalRow {
    pub quarter: i16,
    pub year: i32,
    pub yield_t_per_ha: Decimal,
    pub sample_size: i32,
    pub mean_temperature_c: Decimal,
    pub weekly_precipitation_mm: Decimal,
    pub mean_humidity_percent: Decimal,
    pub mean_wind_mps: Decimal,
}

impl HistoricalRow {
    pub fn into_record(self) -> AppResult<HistoricalRecord> {
        let quarter = u8::try_from(self.quarter)
            .ok()
            .and_then(|q| Quarter::try_from(q).ok())
            .ok_or_else(|| AppError::Provider(format!("Stored quarter {} is invalid", self.quarter)))?;
        let sample_size = u32::try_from(self.sample_size).map_err(|_| {
            AppError::Provider(format!("Stored sample size {} is invalid", self.sample_size))
        })?;

        Ok(HistoricalRecord {
            quarter,
            year: self.year,
            yield_t_per_ha: decimal_to_f64(self.yield_t_per_ha, "yield_t_per_ha")?,
            sample_size,
            weather: HistoricalWeather {
                mean_temperature_c: decimal_to_f64(self.mean_temperature_c, "mean_temperature_c")?,
                weekly_precipitation_mm: decimal_to_f64(
                    self.weekly_precipitation_mm,
                    "weekly_precipitation_mm",
                )?,
                mean_humidity_percent: decimal_to_f64(
                    self.mean_humidity_percent,
                    "mean_humidity_percent",
                )?,
                mean_wind_mps: decimal_to_f64(self.mean_wind_mps, "mean_wind_mps")?,
            },
        })
    }
}

const HISTORICAL_COLUMNS: &str = "quarter, year, yield_t_per_ha, sample_size, mean_temperature_c, \
     weekly_precipitation_mm, mean_humidity_percent, mean_wind_mps";

impl WeatherService {
    /// Create a new WeatherService with the forecast API client
    pub fn new(db: PgPool, client: OpenMeteoClient, cache_ttl_minutes: i64) -> Self {
        Self {
            db,
            weather_client: client,
            cache_ttl: Duration::minutes(cache_ttl_minutes),
        }
    }

    // ========================================================================
    // Forecast cache
    // ========================================================================

    /// Cache forecast data
    pub async fn cache_forecast(
        &self,
        forecast: &WeatherForecast,
        horizon_days: u32,
    ) -> AppResult<CachedForecast> {
        let (latitude, longitude) = coordinates_to_decimal(&forecast.location)?;
        let expires_at = Utc::now() + self.cache_ttl;

        let cached = sqlx::query_as::<_, CachedForecast>(
            r#"
            INSERT INTO weather_forecast_cache (latitude, longitude, horizon_days, forecast, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, latitude, longitude, horizon_days, forecast, fetched_at, expires_at
            "#,
        )
        .bind(latitude)
        .bind(longitude)
        .bind(horizon_days as i32)
        .bind(Json(forecast))
        .bind(expires_at)
        .fetch_one(&self.db)
        .await?;

        Ok(cached)
    }

    /// Get cached forecast if not expired and long enough
    pub async fn get_cached_forecast(
        &self,
        coordinates: &GpsCoordinates,
        horizon_days: u32,
    ) -> AppResult<Option<CachedForecast>> {
        let (latitude, longitude) = coordinates_to_decimal(coordinates)?;

        let cached = sqlx::query_as::<_, CachedForecast>(
            r#"
            SELECT id, latitude, longitude, horizon_days, forecast, fetched_at, expires_at
            FROM weather_forecast_cache
            WHERE ABS(latitude - $1) < 0.01
              AND ABS(longitude - $2) < 0.01
              AND horizon_days >= $3
              AND expires_at > NOW()
            ORDER BY fetched_at DESC
            LIMIT 1
            "#,
        )
        .bind(latitude)
        .bind(longitude)
        .bind(horizon_days as i32)
        .fetch_optional(&self.db)
        .await?;

        Ok(cached)
    }

    /// Drop expired cache rows
    pub async fn purge_expired_forecasts(&self) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM weather_forecast_cache WHERE expires_at <= NOW()")
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected())
    }
}

#[axum::async_trait]
impl WeatherForecastProvider for WeatherService {
    /// Fetch forecast (from cache or API)
    async fn get_forecast(
        &self,
        coordinates: GpsCoordinates,
        horizon_days: u32,
    ) -> AppResult<WeatherForecast> {
        match self.get_cached_forecast(&coordinates, horizon_days).await {
            Ok(Some(cached)) => {
                tracing::debug!(cache_id = %cached.id, "Using cached forecast");
                let first_day = cached.fetched_at.date_naive();
                let Json(mut forecast) = cached.forecast;
                forecast.location = coordinates;
                trim_to_horizon(&mut forecast, first_day, horizon_days);
                return Ok(forecast);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Forecast cache lookup failed: {}", e),
        }

        let forecast = self
            .weather_client
            .get_daily_forecast(coordinates, horizon_days)
            .await?;

        if let Err(e) = self.cache_forecast(&forecast, horizon_days).await {
            tracing::warn!("Failed to cache forecast: {}", e);
        }

        Ok(forecast)
    }

    async fn get_historical(
        &self,
        quarter: Quarter,
        year: i32,
    ) -> AppResult<Option<HistoricalRecord>> {
        let row = sqlx::query_as::<_, HistoricalRow>(&format!(
            "SELECT {} FROM historical_quarter_records WHERE quarter = $1 AND year = $2",
            HISTORICAL_COLUMNS
        ))
        .bind(quarter.number() as i16)
        .bind(year)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| AppError::Provider(format!("Historical lookup failed: {}", e)))?;

        row.map(HistoricalRow::into_record).transpose()
    }

    async fn list_historical(&self, quarter: Quarter) -> AppResult<Vec<HistoricalRecord>> {
        let rows = sqlx::query_as::<_, HistoricalRow>(&format!(
            "SELECT {} FROM historical_quarter_records WHERE quarter = $1 ORDER BY year",
            HISTORICAL_COLUMNS
        ))
        .bind(quarter.number() as i16)
        .fetch_all(&self.db)
        .await
        .map_err(|e| AppError::Provider(format!("Historical lookup failed: {}", e)))?;

        rows.into_iter().map(HistoricalRow::into_record).collect()
    }
}

/// Keep only the first `horizon_days` days of a cached series that began on `first_day`
fn trim_to_horizon(forecast: &mut WeatherForecast, first_day: NaiveDate, horizon_days: u32) {
    let horizon = DateRange::following(first_day, horizon_days);
    forecast.days.retain(|d| horizon.contains(d.date));
}

fn coordinates_to_decimal(coordinates: &GpsCoordinates) -> AppResult<(Decimal, Decimal)> {
    let latitude = Decimal::from_f64(coordinates.latitude)
        .ok_or_else(|| AppError::input("latitude", "Latitude is not a finite number"))?;
    let longitude = Decimal::from_f64(coordinates.longitude)
        .ok_or_else(|| AppError::input("longitude", "Longitude is not a finite number"))?;
    Ok((latitude.round_dp(5), longitude.round_dp(5)))
}

fn decimal_to_f64(value: Decimal, column: &str) -> AppResult<f64> {
    value
        .to_f64()
        .ok_or_else(|| AppError::Provider(format!("Stored {} is out of range", column)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::WeatherDayPoint;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn row(quarter: i16, sample_size: i32) -> HistoricalRow {
        HistoricalRow {
            quarter,
            year: 2023,
            yield_t_per_ha: dec("4.250"),
            sample_size,
            mean_temperature_c: dec("28.4"),
            weekly_precipitation_mm: dec("52.0"),
            mean_humidity_percent: dec("79.5"),
            mean_wind_mps: dec("3.1"),
        }
    }

    #[test]
    fn test_historical_row_converts() {
        let record = row(2, 14).into_record().unwrap();
        assert_eq!(record.quarter, Quarter::Q2);
        assert_eq!(record.yield_t_per_ha, 4.25);
        assert_eq!(record.sample_size, 14);
        assert_eq!(record.weather.mean_humidity_percent, 79.5);
    }

    #[test]
    fn test_historical_row_rejects_bad_quarter() {
        assert!(matches!(row(5, 10).into_record(), Err(AppError::Provider(_))));
        assert!(matches!(row(-1, 10).into_record(), Err(AppError::Provider(_))));
    }

    #[test]
    fn test_historical_row_rejects_negative_sample() {
        assert!(matches!(row(1, -3).into_record(), Err(AppError::Provider(_))));
    }

    #[test]
    fn test_cached_forecast_trimmed_to_requested_horizon() {
        let first_day = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
        let days = (0..16)
            .map(|i| WeatherDayPoint {
                date: first_day + Duration::days(i),
                temperature_c: 28.0,
                humidity_percent: 80.0,
                precipitation_mm: 5.0,
                wind_mps: 3.0,
            })
            .collect();
        let mut forecast = WeatherForecast::new(GpsCoordinates::new(14.6, 121.0), days);

        trim_to_horizon(&mut forecast, first_day, 10);

        assert_eq!(forecast.days.len(), 10);
        assert_eq!(
            forecast.days.last().unwrap().date,
            NaiveDate::from_ymd_opt(2025, 4, 10).unwrap()
        );
    }

    #[test]
    fn test_coordinates_round_for_cache_key() {
        let (lat, lon) = coordinates_to_decimal(&GpsCoordinates::new(14.599512345, 120.9842)).unwrap();
        assert_eq!(lat, dec("14.59951"));
        assert_eq!(lon, dec("120.9842"));

        assert!(coordinates_to_decimal(&GpsCoordinates::new(f64::NAN, 0.0)).is_err());
    }
}
