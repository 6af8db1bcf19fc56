use std::time::Duration;

use crate::error::Error;

const MAX_RETRIES: u32 = 3;
const BACKOFF_SECONDS: &[u64] = &[30, 60, 120];

/// Check if an API error is a 429 rate limit. The client folds the HTTP
/// status into the `Api` message, so this matches on the text.
pub fn is_rate_limited(e: &Error) -> bool {
    match e {
        Error::Api(msg) => msg.contains("429") || msg.to_lowercase().contains("rate limit"),
        _ => false,
    }
}

/// Retry an API call expression with backoff on 429 errors.
///
/// Usage: `retry_api!(client.list_tasks_page(list_id, page, since))`
///
/// The expression is re-evaluated on each retry attempt. This is a macro
/// because async closures that return borrowed futures can't satisfy `Fn`.
macro_rules! retry_api {
    ($expr:expr) => {{
        let mut _attempt: u32 = 0;
        loop {
            match $expr.await {
                Ok(val) => break Ok::<_, crate::error::Error>(val),
                Err(e) => {
                    if $crate::sync::rate_limit::is_rate_limited(&e) && _attempt < 3 {
                        let wait = [30u64, 60, 120]
                            .get(_attempt as usize)
                            .copied()
                            .unwrap_or(120);
                        log::warn!(
                            "Rate limited (429). Waiting {wait}s before retry {}/3",
                            _attempt + 1
                        );
                        tokio::time::sleep(std::time::Duration::from_secs(wait)).await;
                        _attempt += 1;
                    } else {
                        break Err(e);
                    }
                }
            }
        }
    }};
}

pub(crate) use retry_api;

/// Sleep for the backoff duration (for use in non-macro contexts).
pub async fn backoff_sleep(attempt: u32) {
    let wait = BACKOFF_SECONDS
        .get(attempt as usize)
        .copied()
        .unwrap_or(120);
    log::warn!(
        "Rate limited (429). Waiting {wait}s before retry {}/{}",
        attempt + 1,
        MAX_RETRIES
    );
    tokio::time::sleep(Duration::from_secs(wait)).await;
}
