// SPDX-FileCopyrightText: (C) 2024 Graylog SDK Contributors
// SPDX-License-Identifier: MIT

use std::time::Duration;

use async_trait::async_trait;

use crate::config::Config;
use crate::prelude::*;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
        }
    }
}

/// A single call against the Graylog API. The path is relative to the
/// API base URL, without a leading slash.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub params: Vec<(String, String)>,
    pub body: Option<JsonValue>,
}

impl ApiRequest {
    pub fn get(path: &str) -> Self {
        Self {
            method: Method::Get,
            path: path.to_string(),
            params: vec![],
            body: None,
        }
    }

    pub fn post(path: &str, body: JsonValue) -> Self {
        Self {
            method: Method::Post,
            path: path.to_string(),
            params: vec![],
            body: Some(body),
        }
    }

    pub fn param<V: ToString>(mut self, key: &str, value: V) -> Self {
        self.params.push((key.to_string(), value.to_string()));
        self
    }

    /// Look up the first value of a query parameter.
    pub fn get_param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Something that can send an ApiRequest to Graylog and return the raw
/// response body.
///
/// Implementations must return `GraylogError::Status` for non-2xx
/// responses and must not retry.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> Result<String>;
}

/// Graylog HTTP client.
#[derive(Debug, Clone)]
pub struct Client {
    url: String,
    username: Option<String>,
    password: Option<String>,
    http: reqwest::Client,
}

impl Client {
    pub fn new(url: &str) -> Result<Self> {
        ClientBuilder::new(url).build()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn request(&self, request: &ApiRequest) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.url, request.path.trim_start_matches('/'));
        let builder = match request.method {
            Method::Get => self.http.get(&url),
            Method::Post => self.http.post(&url),
        };
        let builder = builder
            .header("Accept", "application/json")
            .header("X-Requested-By", crate::version::user_agent());
        let builder = if request.params.is_empty() {
            builder
        } else {
            builder.query(&request.params)
        };
        let builder = if let Some(body) = &request.body {
            builder.json(body)
        } else {
            builder
        };
        if let Some(username) = &self.username {
            builder.basic_auth(username, self.password.clone())
        } else {
            builder
        }
    }
}

#[async_trait]
impl Transport for Client {
    async fn execute(&self, request: ApiRequest) -> Result<String> {
        debug!(method = %request.method, path = %request.path, "Sending Graylog request");
        if let Some(body) = &request.body {
            trace!("Request body: {}", body);
        }
        let response = self.request(&request).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            warn!(
                "Graylog request {} {} failed with status {}",
                request.method, request.path, status
            );
            return Err(GraylogError::Status {
                status: status.as_u16(),
                body,
            });
        }
        trace!("Response body: {}", body);
        Ok(body)
    }
}

#[derive(Default, Debug)]
pub struct ClientBuilder {
    url: String,
    disable_certificate_validation: bool,
    username: Option<String>,
    password: Option<String>,
    timeout: Option<Duration>,
}

impl ClientBuilder {
    pub fn new(url: &str) -> ClientBuilder {
        ClientBuilder {
            url: url.trim_end_matches('/').to_string(),
            ..ClientBuilder::default()
        }
    }

    /// Configure from the url, username, password, token, timeout and
    /// no-check-certificate keys.
    pub fn from_config(config: &Config) -> Result<ClientBuilder> {
        let url = config
            .get_string("url")?
            .ok_or_else(|| GraylogError::Config("no Graylog URL configured".to_string()))?;
        let mut builder = ClientBuilder::new(&url);
        if let Some(token) = config.get_string("token")? {
            builder = builder.with_token(&token);
        } else if let Some(username) = config.get_string("username")? {
            builder = builder.with_username(&username);
            if let Some(password) = config.get_string("password")? {
                builder = builder.with_password(&password);
            }
        }
        if let Some(timeout) = config.get_duration("timeout")? {
            builder = builder.with_timeout(timeout);
        }
        builder = builder.disable_certificate_validation(config.get_bool("no-check-certificate")?);
        Ok(builder)
    }

    pub fn disable_certificate_validation(mut self, yes: bool) -> Self {
        self.disable_certificate_validation = yes;
        self
    }

    pub fn with_username(mut self, username: &str) -> Self {
        self.username = Some(username.to_string());
        self
    }

    pub fn with_password(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }

    /// Authenticate with a Graylog access token. Graylog expects the
    /// token as the username and the literal "token" as the password.
    pub fn with_token(mut self, token: &str) -> Self {
        self.username = Some(token.to_string());
        self.password = Some("token".to_string());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<Client> {
        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10);
        if self.disable_certificate_validation {
            warn!("TLS certificate validation is disabled for {}", self.url);
            builder = builder.danger_accept_invalid_certs(true);
        }
        Ok(Client {
            url: self.url,
            username: self.username,
            password: self.password,
            http: builder.build()?,
        })
    }
}
