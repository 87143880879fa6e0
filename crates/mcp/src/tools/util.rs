use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use taskmark_core::services::TasksService;

pub async fn with_service<T, F>(service: Arc<TasksService>, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&TasksService) -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || f(service.as_ref()))
        .await
        .map_err(|err| anyhow!("blocking task failed: {}", err))?
}

pub fn validation_error(err: impl std::fmt::Display) -> pmcp::Error {
    pmcp::Error::validation(err.to_string())
}

pub fn internal_error(err: impl Into<anyhow::Error>) -> pmcp::Error {
    pmcp::Error::internal(err.into().to_string())
}

pub fn parse_datetime_opt(value: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    match value {
        Some(raw) => {
            let parsed = DateTime::parse_from_rfc3339(raw)
                .map_err(|_| anyhow!("invalid RFC3339 timestamp: {}", raw))?;
            Ok(Some(parsed.with_timezone(&Utc)))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
pub(crate) fn fixed_now() -> DateTime<Utc> {
    use chrono::TimeZone;

    Utc.with_ymd_and_hms(2026, 4, 10, 12, 0, 0).unwrap()
}

#[cfg(test)]
pub(crate) fn test_service() -> Arc<TasksService> {
    use taskmark_core::api::MemoryTaskApi;
    use taskmark_core::status::StatusResolver;

    let api = MemoryTaskApi::new().with_clock(fixed_now);
    let service =
        TasksService::with_api(Arc::new(api), StatusResolver::default(), 2).with_clock(fixed_now);
    Arc::new(service)
}

#[cfg(test)]
pub(crate) fn test_extra() -> pmcp::RequestHandlerExtra {
    pmcp::RequestHandlerExtra::new(
        "test-request".to_string(),
        tokio_util::sync::CancellationToken::new(),
    )
}
