/// Show-status backend client
///
/// Posts a show title and the caller's date to the AI summary service and
/// returns its status label, summary and citations. The service is opaque to
/// this crate; only the request/response contract is relied on.
use chrono::NaiveDate;
use reqwest::Client as HttpClient;

use crate::{
    error::{AppError, AppResult},
    models::{ShowType, StatusRequest, StatusResponse, TrackedShow},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait StatusClient: Send + Sync {
    async fn fetch_status(&self, request: StatusRequest) -> AppResult<StatusResponse>;
}

/// Builds the request for `show` as of `today`
pub fn status_request(show: &TrackedShow, today: NaiveDate) -> StatusRequest {
    StatusRequest {
        show_name: show.title.clone(),
        is_tv: show.show_type == ShowType::Series,
        current_date: today.format("%Y-%m-%d").to_string(),
    }
}

#[derive(Clone)]
pub struct HttpStatusClient {
    http_client: HttpClient,
    api_url: String,
}

impl HttpStatusClient {
    pub fn new(http_client: HttpClient, api_url: String) -> Self {
        Self {
            http_client,
            api_url,
        }
    }
}

#[async_trait::async_trait]
impl StatusClient for HttpStatusClient {
    async fn fetch_status(&self, request: StatusRequest) -> AppResult<StatusResponse> {
        let response = self
            .http_client
            .post(&self.api_url)
            .json(&request)
            .send()
            .await?;

        if response.status() != reqwest::StatusCode::OK {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                show = %request.show_name,
                status = %status,
                body = %body,
                "Status backend request failed"
            );
            return Err(AppError::ExternalApi(format!(
                "Status backend returned status {}",
                status
            )));
        }

        let status: StatusResponse = response.json().await?;

        tracing::info!(
            show = %request.show_name,
            status = %status.status,
            cached = ?status.cached,
            "Show status fetched"
        );

        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_request_for_series() {
        let show = TrackedShow::new("95396", "Severance", "2022", ShowType::Series);
        let today = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();

        let request = status_request(&show, today);
        assert_eq!(request.show_name, "Severance");
        assert!(request.is_tv);
        assert_eq!(request.current_date, "2024-06-10");
    }

    #[test]
    fn test_status_request_for_movie() {
        let show = TrackedShow::new("603", "The Matrix", "1999", ShowType::Movie);
        let today = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();

        let request = status_request(&show, today);
        assert!(!request.is_tv);
        assert_eq!(request.current_date, "2024-01-05");
    }
}
