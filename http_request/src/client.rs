//! Base-URL bound HTTP client
//!
//! Every call reads the whole response body, runs the configured error
//! checker over it and hands back a [`Response`]. The `*_json` variants
//! additionally decode the body with the client's [`ResponseDecoder`].

use crate::errors::{HttpError, RequestError};
use crate::response::{JsonDecoder, Response, ResponseDecoder};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Body, Method};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use tracing::Instrument;

pub const DEFAULT_USER_AGENT: &str = concat!("svc-common/request@v", env!("CARGO_PKG_VERSION"));

const DEFAULT_SERVICE_NAME: &str = "http-client";

/// Decides whether a received response is a failure.
pub type ErrChecker = Arc<dyn Fn(&Method, &Response) -> Result<(), RequestError> + Send + Sync>;

/// Fails every response outside 2xx with [`RequestError::Status`].
pub fn default_err_checker(_method: &Method, response: &Response) -> Result<(), RequestError> {
    if response.is_success() {
        return Ok(());
    }
    Err(HttpError::new(response.clone()).into())
}

#[derive(Clone)]
enum Auth {
    None,
    Basic {
        user: String,
        pass: String,
    },
    Bearer(String),
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::None => f.write_str("None"),
            Auth::Basic { user, .. } => f.debug_struct("Basic").field("user", user).finish(),
            Auth::Bearer(_) => f.write_str("Bearer"),
        }
    }
}

/// Options for a [`Client`].
///
/// ```rust,ignore
/// let client = ClientBuilder::new("https://scheduling.internal/")
///     .bearer_auth(token)
///     .service_name("scheduling")
///     .build()?;
///
/// let slots: Vec<Slot> = client.get_json("slots", &[("day", "2024-03-01")], None).await?;
/// ```
pub struct ClientBuilder<D = JsonDecoder> {
    base_url: String,
    user_agent: String,
    content_type: Option<String>,
    http_client: Option<reqwest::Client>,
    auth: Auth,
    err_checker: Option<ErrChecker>,
    decoder: D,
    service_name: Option<String>,
}

impl ClientBuilder<JsonDecoder> {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            content_type: None,
            http_client: None,
            auth: Auth::None,
            err_checker: None,
            decoder: JsonDecoder,
            service_name: None,
        }
    }
}

impl<D: ResponseDecoder> ClientBuilder<D> {
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Content type sent with request bodies that don't set their own.
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn basic_auth(mut self, user: impl Into<String>, pass: impl Into<String>) -> Self {
        self.auth = Auth::Basic {
            user: user.into(),
            pass: pass.into(),
        };
        self
    }

    pub fn bearer_auth(mut self, token: impl Into<String>) -> Self {
        self.auth = Auth::Bearer(token.into());
        self
    }

    pub fn err_checker(
        mut self,
        checker: impl Fn(&Method, &Response) -> Result<(), RequestError> + Send + Sync + 'static,
    ) -> Self {
        self.err_checker = Some(Arc::new(checker));
        self
    }

    pub fn decoder<D2: ResponseDecoder>(self, decoder: D2) -> ClientBuilder<D2> {
        ClientBuilder {
            base_url: self.base_url,
            user_agent: self.user_agent,
            content_type: self.content_type,
            http_client: self.http_client,
            auth: self.auth,
            err_checker: self.err_checker,
            decoder,
            service_name: self.service_name,
        }
    }

    /// Name recorded on each request's span.
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    pub fn build(self) -> Result<Client<D>, RequestError> {
        let user_agent = HeaderValue::from_str(&self.user_agent).map_err(|source| {
            RequestError::InvalidHeader {
                what: "user agent",
                source,
            }
        })?;
        let content_type = self
            .content_type
            .as_deref()
            .map(HeaderValue::from_str)
            .transpose()
            .map_err(|source| RequestError::InvalidHeader {
                what: "content type",
                source,
            })?;

        Ok(Client {
            http: self.http_client.unwrap_or_default(),
            base_url: self.base_url.trim_end_matches('/').to_owned(),
            user_agent,
            content_type,
            auth: self.auth,
            err_checker: self
                .err_checker
                .unwrap_or_else(|| Arc::new(default_err_checker) as ErrChecker),
            decoder: self.decoder,
            service_name: self
                .service_name
                .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_owned()),
        })
    }
}

#[derive(Clone)]
pub struct Client<D = JsonDecoder> {
    http: reqwest::Client,
    base_url: String,
    user_agent: HeaderValue,
    content_type: Option<HeaderValue>,
    auth: Auth,
    err_checker: ErrChecker,
    decoder: D,
    service_name: String,
}

impl<D> fmt::Debug for Client<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("user_agent", &self.user_agent)
            .field("auth", &self.auth)
            .field("service_name", &self.service_name)
            .finish()
    }
}

impl<D: ResponseDecoder> Client<D> {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL of `path`, which may omit its leading `/`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, normalize_path(path))
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Body>,
        headers: Option<HeaderMap>,
    ) -> Result<Response, RequestError> {
        self.execute(method, path, &[], body, headers).await
    }

    pub async fn get(
        &self,
        path: &str,
        query: &[(&str, &str)],
        headers: Option<HeaderMap>,
    ) -> Result<Response, RequestError> {
        self.execute(Method::GET, path, query, None, headers).await
    }

    pub async fn post(
        &self,
        path: &str,
        body: impl Into<Body>,
        headers: Option<HeaderMap>,
    ) -> Result<Response, RequestError> {
        self.execute(Method::POST, path, &[], Some(body.into()), headers)
            .await
    }

    pub async fn put(
        &self,
        path: &str,
        body: impl Into<Body>,
        headers: Option<HeaderMap>,
    ) -> Result<Response, RequestError> {
        self.execute(Method::PUT, path, &[], Some(body.into()), headers)
            .await
    }

    pub async fn patch(
        &self,
        path: &str,
        body: impl Into<Body>,
        headers: Option<HeaderMap>,
    ) -> Result<Response, RequestError> {
        self.execute(Method::PATCH, path, &[], Some(body.into()), headers)
            .await
    }

    pub async fn delete(
        &self,
        path: &str,
        body: impl Into<Body>,
        headers: Option<HeaderMap>,
    ) -> Result<Response, RequestError> {
        self.execute(Method::DELETE, path, &[], Some(body.into()), headers)
            .await
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        headers: Option<HeaderMap>,
    ) -> Result<T, RequestError> {
        let response = self.get(path, query, headers).await?;
        self.decode(&response)
    }

    pub async fn post_json<T, B>(
        &self,
        path: &str,
        body: &B,
        headers: Option<HeaderMap>,
    ) -> Result<T, RequestError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_json(Method::POST, path, body, headers).await
    }

    pub async fn put_json<T, B>(
        &self,
        path: &str,
        body: &B,
        headers: Option<HeaderMap>,
    ) -> Result<T, RequestError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_json(Method::PUT, path, body, headers).await
    }

    pub async fn patch_json<T, B>(
        &self,
        path: &str,
        body: &B,
        headers: Option<HeaderMap>,
    ) -> Result<T, RequestError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_json(Method::PATCH, path, body, headers).await
    }

    pub async fn delete_json<T, B>(
        &self,
        path: &str,
        body: &B,
        headers: Option<HeaderMap>,
    ) -> Result<T, RequestError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_json(Method::DELETE, path, body, headers).await
    }

    /// Decode `response`'s body with the client's decoder.
    pub fn decode<T: DeserializeOwned>(&self, response: &Response) -> Result<T, RequestError> {
        self.decoder
            .decode(&response.body)
            .map_err(RequestError::Decode)
    }

    async fn send_json<T, B>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        headers: Option<HeaderMap>,
    ) -> Result<T, RequestError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let encoded = serde_json::to_vec(body).map_err(RequestError::Encode)?;
        let mut headers = headers.unwrap_or_default();
        if !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        let response = self
            .execute(method, path, &[], Some(encoded.into()), Some(headers))
            .await?;
        self.decode(&response)
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Body>,
        headers: Option<HeaderMap>,
    ) -> Result<Response, RequestError> {
        let path = normalize_path(path);
        let span = tracing::info_span!(
            "http.request",
            service = %self.service_name,
            method = %method,
            path = %path,
        );

        async move {
            let mut headers = headers.unwrap_or_default();
            headers.append(USER_AGENT, self.user_agent.clone());
            if body.is_some() && !headers.contains_key(CONTENT_TYPE) {
                if let Some(content_type) = &self.content_type {
                    headers.insert(CONTENT_TYPE, content_type.clone());
                }
            }
            if !matches!(self.auth, Auth::None) {
                headers.remove(AUTHORIZATION);
            }

            let mut builder = self
                .http
                .request(method.clone(), format!("{}{}", self.base_url, path))
                .headers(headers);
            if !query.is_empty() {
                builder = builder.query(query);
            }
            builder = match &self.auth {
                Auth::None => builder,
                Auth::Basic { user, pass } => builder.basic_auth(user, Some(pass)),
                Auth::Bearer(token) => builder.bearer_auth(token),
            };
            if let Some(body) = body {
                builder = builder.body(body);
            }

            let res = builder.send().await?;
            let response = Response {
                status: res.status(),
                headers: res.headers().clone(),
                body: res.bytes().await?.to_vec(),
            };
            tracing::debug!(
                status = response.status.as_u16(),
                bytes = response.body.len(),
                "response received"
            );

            (self.err_checker)(&method, &response)?;
            Ok(response)
        }
        .instrument(span)
        .await
    }
}

fn normalize_path(path: &str) -> Cow<'_, str> {
    if path.starts_with('/') {
        Cow::Borrowed(path)
    } else {
        Cow::Owned(format!("/{path}"))
    }
}
