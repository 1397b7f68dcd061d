//! Client side of the deployment smoke test.

use serde_json::{Value, json};

pub const DEFAULT_SMOKE_URL: &str = "http://localhost:8000/invocations";

pub const BOSTON_HOUSING_COLUMNS: [&str; 13] = [
    "CRIM", "ZN", "INDUS", "CHAS", "NOX", "RM", "AGE", "DIS", "RAD", "TAX", "PTRATIO", "B", "LSTAT",
];

/// One row of the Boston housing dataset in split orientation.
pub fn boston_housing_payload() -> Value {
    json!({
        "columns": BOSTON_HOUSING_COLUMNS,
        "data": [[0.00632, 18.0, 2.31, 0, 0.538, 6.575, 65.2, 4.0900, 1, 296.0, 15.3, 396.90, 4.98]]
    })
}

#[derive(Debug)]
pub enum SmokeOutcome {
    Success(Value),
    Failure { status: u16, body: String },
}

pub async fn post_payload(
    client: &reqwest::Client,
    url: &str,
    payload: &Value,
) -> Result<SmokeOutcome, reqwest::Error> {
    let response = client.post(url).json(payload).send().await?;
    let status = response.status();
    let body = response.text().await?;
    if status.is_success() {
        // A 2xx that is not JSON is still a failed prediction.
        if let Ok(value) = serde_json::from_str(&body) {
            return Ok(SmokeOutcome::Success(value));
        }
    }
    Ok(SmokeOutcome::Failure {
        status: status.as_u16(),
        body,
    })
}
