// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Rollbar item API client.
//!
//! Each report is one JSON item POSTed to the item endpoint; the response carries
//! the UUID assigned to the item. No retries: the caller decides what a failure means.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::{RemoteClient, Severity};
use crate::constants::{DEFAULT_ENDPOINT, DEFAULT_TIMEOUT};
use crate::errors::ReportError;

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub token: String,
    pub environment: String,
    pub endpoint: String,
    pub timeout: Duration,
}

impl HttpClientConfig {
    pub fn new(token: &str, environment: &str) -> Self {
        Self {
            token: token.to_string(),
            environment: environment.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    token: String,
    environment: String,
    endpoint: String,
}

#[derive(Serialize)]
struct Item<'a> {
    access_token: &'a str,
    data: ItemData<'a>,
}

#[derive(Serialize)]
struct ItemData<'a> {
    environment: &'a str,
    level: Severity,
    timestamp: i64,
    language: &'static str,
    body: ItemBody<'a>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    custom: &'a BTreeMap<String, String>,
}

#[derive(Serialize)]
struct ItemBody<'a> {
    message: ItemMessage<'a>,
}

#[derive(Serialize)]
struct ItemMessage<'a> {
    body: &'a str,
}

#[derive(Deserialize)]
struct ItemResponse {
    result: Option<ItemResult>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct ItemResult {
    uuid: String,
}

impl HttpClient {
    pub fn new(token: &str, environment: &str) -> Result<Self, ReportError> {
        Self::with_config(HttpClientConfig::new(token, environment))
    }

    pub fn with_config(config: HttpClientConfig) -> Result<Self, ReportError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ReportError::Client)?;
        Ok(Self {
            client,
            token: config.token,
            environment: config.environment,
            endpoint: config.endpoint,
        })
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }
}

#[async_trait]
impl RemoteClient for HttpClient {
    async fn report(
        &self,
        severity: Severity,
        message: &str,
        fields: &BTreeMap<String, String>,
    ) -> Result<String, ReportError> {
        let item = Item {
            access_token: &self.token,
            data: ItemData {
                environment: &self.environment,
                level: severity,
                timestamp: Utc::now().timestamp(),
                language: "rust",
                body: ItemBody {
                    message: ItemMessage { body: message },
                },
                custom: fields,
            },
        };

        let resp = self.client.post(&self.endpoint).json(&item).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ReportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ItemResponse = resp
            .json()
            .await
            .map_err(|e| ReportError::Response(e.to_string()))?;
        match parsed.result {
            Some(result) => {
                debug!("Reported item {}", result.uuid);
                Ok(result.uuid)
            }
            None => Err(ReportError::Response(
                parsed
                    .message
                    .unwrap_or_else(|| "missing result".to_string()),
            )),
        }
    }
}
