//! Usage: Run blocking work (cache IO) on the tokio blocking pool with a stable label.

use crate::client::error_code::LocalErrorCode;
use crate::shared::error::{ApiError, ApiResult};

pub(crate) async fn run<T>(label: &'static str, f: impl FnOnce() -> T + Send + 'static) -> ApiResult<T>
where
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(value) => Ok(value),
        Err(join_err) => {
            // Panic payloads may contain user content, so only the label is reported.
            if join_err.is_panic() {
                tracing::error!(label, "blocking task panicked");
                return Err(ApiError::local(
                    LocalErrorCode::Undefined,
                    format!("{label}: task panicked"),
                ));
            }

            tracing::warn!(label, "blocking task cancelled");
            Err(ApiError::local(
                LocalErrorCode::Undefined,
                format!("{label}: task cancelled"),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::run;
    use crate::client::error_code::LocalErrorCode;

    #[tokio::test]
    async fn returns_closure_value() {
        let value = run("add", || 2 + 2).await.expect("blocking task");
        assert_eq!(value, 4);
    }

    #[tokio::test]
    async fn panics_become_local_undefined() {
        let err = run("boom", || -> u8 { panic!("secret payload") })
            .await
            .expect_err("panic surfaces as error");
        assert!(err.is_local(LocalErrorCode::Undefined));
        assert!(!err.message().contains("secret payload"));
    }
}
