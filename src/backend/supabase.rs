/// Hosted backend client (Supabase-compatible REST surface)
///
/// One client serves all three seams: GoTrue auth under `/auth/v1`,
/// storage under `/storage/v1` and PostgREST under `/rest/v1`.
use crate::{
    auth::Session,
    backend::{AuthBackend, ObjectStore, PhotoQuery, PhotoTable},
    error::{GalleryError, GalleryResult},
    gallery::{listing::SortOrder, NewPhoto, Photo},
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error};

/// HTTP client for the hosted backend
#[derive(Clone)]
pub struct SupabaseClient {
    http: Client,
    base_url: String,
    anon_key: String,
    bucket: String,
    table: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    user: Option<UserResponse>,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl SupabaseClient {
    /// Create a new client
    pub fn new(
        base_url: String,
        anon_key: String,
        bucket: String,
        table: String,
    ) -> GalleryResult<Self> {
        let http = Client::builder()
            .user_agent(concat!("petal-gallery/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key,
            bucket,
            table,
        })
    }

    /// Attach the project key and a bearer token
    ///
    /// Anonymous reads present the anon key as the bearer.
    fn authorize(&self, request: RequestBuilder, session: Option<&Session>) -> RequestBuilder {
        let token = session
            .map(|s| s.access_token.as_str())
            .unwrap_or(self.anon_key.as_str());
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url,
            self.bucket,
            encode_object_path(path)
        )
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    fn filter_params(query: &PhotoQuery) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(id) = &query.id {
            params.push(("id", format!("eq.{}", id)));
        }
        if let Some(category) = query.category {
            params.push(("category", format!("eq.{}", category.as_str())));
        }
        if let Some(since) = query.created_since {
            params.push(("created_at", format!("gte.{}", format_timestamp(since))));
        }
        params
    }
}

#[async_trait]
impl AuthBackend for SupabaseClient {
    async fn sign_in(&self, email: &str, password: &str) -> GalleryResult<Session> {
        let response = self
            .http
            .post(format!("{}/auth/v1/token", self.base_url))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        if matches!(
            response.status(),
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED
        ) {
            let message = error_message(response).await;
            return Err(GalleryError::Authentication(message));
        }

        let token: TokenResponse = check(response).await?.json().await?;
        let user = token
            .user
            .ok_or_else(|| GalleryError::Authentication("Login failed".to_string()))?;

        Ok(Session {
            access_token: token.access_token,
            user_id: user.id,
            email: user.email,
            expires_at: token.expires_in.map(|secs| Utc::now() + Duration::seconds(secs)),
        })
    }

    async fn sign_out(&self, session: &Session) -> GalleryResult<()> {
        let response = self
            .authorize(
                self.http.post(format!("{}/auth/v1/logout", self.base_url)),
                Some(session),
            )
            .send()
            .await?;

        // A token the server no longer knows is already signed out
        if response.status() == StatusCode::UNAUTHORIZED {
            return Ok(());
        }
        check(response).await?;
        Ok(())
    }

    async fn get_session(&self, access_token: &str) -> GalleryResult<Option<Session>> {
        let response = self
            .http
            .get(format!("{}/auth/v1/user", self.base_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            return Ok(None);
        }

        let user: UserResponse = check(response).await?.json().await?;
        Ok(Some(Session {
            access_token: access_token.to_string(),
            user_id: user.id,
            email: user.email,
            expires_at: None,
        }))
    }
}

#[async_trait]
impl ObjectStore for SupabaseClient {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn upload(
        &self,
        session: &Session,
        path: &str,
        data: Vec<u8>,
        mime_type: &str,
    ) -> GalleryResult<()> {
        debug!("Uploading {} ({} bytes) to bucket {}", path, data.len(), self.bucket);

        let response = self
            .authorize(self.http.post(self.object_url(path)), Some(session))
            .header(header::CONTENT_TYPE, mime_type)
            .header(header::CACHE_CONTROL, "max-age=3600")
            .header("x-upsert", "false")
            .body(data)
            .send()
            .await?;

        check(response).await.map_err(|e| {
            error!("Object upload failed for {}: {}", path, e);
            GalleryError::Storage(format!("Failed to upload {}: {}", path, e))
        })?;
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url,
            self.bucket,
            encode_object_path(path)
        )
    }

    async fn remove(&self, session: &Session, paths: &[String]) -> GalleryResult<()> {
        let response = self
            .authorize(
                self.http
                    .delete(format!("{}/storage/v1/object/{}", self.base_url, self.bucket)),
                Some(session),
            )
            .json(&json!({ "prefixes": paths }))
            .send()
            .await?;

        check(response).await.map_err(|e| {
            error!("Object removal failed for {:?}: {}", paths, e);
            GalleryError::Storage(format!("Failed to remove {:?}: {}", paths, e))
        })?;
        Ok(())
    }
}

#[async_trait]
impl PhotoTable for SupabaseClient {
    async fn select(
        &self,
        session: Option<&Session>,
        query: &PhotoQuery,
    ) -> GalleryResult<Vec<Photo>> {
        let mut params = vec![
            ("select", "*".to_string()),
            ("order", order_param(query.order)),
        ];
        params.extend(Self::filter_params(query));
        if let Some(limit) = query.limit {
            params.push(("limit", limit.to_string()));
        }

        let response = self
            .authorize(self.http.get(self.table_url()), session)
            .query(&params)
            .send()
            .await?;

        Ok(check(response).await?.json().await?)
    }

    async fn count(
        &self,
        session: Option<&Session>,
        created_since: Option<DateTime<Utc>>,
    ) -> GalleryResult<u64> {
        let query = PhotoQuery {
            created_since,
            ..PhotoQuery::default()
        };
        let mut params = vec![("select", "*".to_string())];
        params.extend(Self::filter_params(&query));

        let response = self
            .authorize(self.http.head(self.table_url()), session)
            .header("Prefer", "count=exact")
            .query(&params)
            .send()
            .await?;
        let response = check(response).await?;

        response
            .headers()
            .get(header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total)
            .ok_or_else(|| GalleryError::Backend {
                status: response.status().as_u16(),
                message: "Count response missing Content-Range".to_string(),
            })
    }

    async fn insert(&self, session: &Session, photo: &NewPhoto) -> GalleryResult<Photo> {
        let response = self
            .authorize(self.http.post(self.table_url()), Some(session))
            .header("Prefer", "return=representation")
            .json(photo)
            .send()
            .await?;

        let rows: Vec<Photo> = check(response).await?.json().await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| GalleryError::Internal("Insert returned no row".to_string()))
    }

    async fn delete(&self, session: &Session, id: &str) -> GalleryResult<()> {
        let response = self
            .authorize(self.http.delete(self.table_url()), Some(session))
            .query(&[("id", format!("eq.{}", id))])
            .send()
            .await?;

        check(response).await?;
        Ok(())
    }
}

/// Pass successful responses through, turn the rest into `GalleryError::Backend`
async fn check(response: Response) -> GalleryResult<Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let message = error_message(response).await;
    Err(GalleryError::Backend { status, message })
}

/// Pull a readable message out of an error body
async fn error_message(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    extract_error_message(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string()
    })
}

fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "error_description", "msg", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
        .map(String::from)
}

fn order_param(order: SortOrder) -> String {
    match order {
        SortOrder::NewestFirst => "created_at.desc".to_string(),
        SortOrder::OldestFirst => "created_at.asc".to_string(),
    }
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Percent-encode each segment of an object key, keeping the separators
fn encode_object_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Total from a PostgREST `Content-Range` header (`0-9/10`, `*/0`)
fn parse_content_range_total(value: &str) -> Option<u64> {
    let (_, total) = value.rsplit_once('/')?;
    total.trim().parse().ok()
}
