//! Hosted search index client
//!
//! REST implementation of [`IndexStore`] over HTTPS. Reads go to the
//! `-dsn` host, writes to the primary host. Write calls return a task id;
//! when `wait_for_tasks` is configured the client polls until the task is
//! published before returning.

use super::{BrowsePage, BrowseParams, IndexStore};
use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sift_common::config::AppConfig;
use sift_common::{Error, Record, Result};
use std::time::Duration;

const USER_AGENT: &str = concat!("sift/", env!("CARGO_PKG_VERSION"));
const TASK_POLL_INTERVAL_MS: u64 = 500;
const TASK_POLL_MAX_ATTEMPTS: u32 = 240;
/// Page size for rules/synonyms listing
const LIST_PAGE_SIZE: usize = 1000;

/// One entry of a `/batch` request body
#[derive(Debug, Clone, Serialize, PartialEq)]
struct BatchRequest {
    action: &'static str,
    body: Value,
}

#[derive(Debug, Deserialize)]
struct BrowseResponse {
    #[serde(default)]
    hits: Vec<Value>,
    cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TaskResponse {
    #[serde(rename = "taskID")]
    task_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TaskStatus {
    status: String,
}

#[derive(Debug, Deserialize)]
struct SearchHitsResponse {
    #[serde(default)]
    hits: Vec<Value>,
}

/// Client for one index of the hosted search service
pub struct AlgoliaStore {
    http_client: reqwest::Client,
    app_id: String,
    api_key: String,
    index_name: String,
    read_host: Url,
    write_host: Url,
    wait_for_tasks: bool,
}

impl AlgoliaStore {
    pub fn new(config: &AppConfig, index_name: &str) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        let read_host = parse_host(&format!("https://{}-dsn.algolia.net", config.app_id))?;
        let write_host = parse_host(&format!("https://{}.algolia.net", config.app_id))?;

        Ok(Self {
            http_client,
            app_id: config.app_id.clone(),
            api_key: config.api_key.clone(),
            index_name: index_name.to_string(),
            read_host,
            write_host,
            wait_for_tasks: config.wait_for_tasks,
        })
    }

    /// Point the client at different hosts (proxies, local emulators)
    pub fn with_hosts(mut self, read_host: &str, write_host: &str) -> Result<Self> {
        self.read_host = parse_host(read_host)?;
        self.write_host = parse_host(write_host)?;
        Ok(self)
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// `{host}/1/indexes/{index}/{path...}` with the index name encoded
    fn index_url(&self, host: &Url, path: &[&str]) -> Result<Url> {
        let mut url = host.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("Invalid host URL: {}", host)))?
            .clear()
            .extend(["1", "indexes", self.index_name.as_str()])
            .extend(path);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http_client
            .request(method, url)
            .header("X-Algolia-Application-Id", &self.app_id)
            .header("X-Algolia-API-Key", &self.api_key)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::Processing(format!(
                "index service returned {}: {}",
                status.as_u16(),
                error_text
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| Error::Processing(format!("Undecodable response: {}", e)))
    }

    /// Send a write and optionally wait for it to be applied
    async fn send_write(&self, request: RequestBuilder) -> Result<()> {
        let task: TaskResponse = self.send_json(request).await?;
        match (self.wait_for_tasks, task.task_id) {
            (true, Some(task_id)) => self.wait_task(task_id).await,
            _ => Ok(()),
        }
    }

    async fn wait_task(&self, task_id: u64) -> Result<()> {
        let url = self.index_url(&self.read_host, &["task", &task_id.to_string()])?;
        for attempt in 0..TASK_POLL_MAX_ATTEMPTS {
            let status: TaskStatus = self
                .send_json(self.request(Method::GET, url.clone()))
                .await?;
            if status.status == "published" {
                tracing::debug!(task_id, attempt, "Task published");
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(TASK_POLL_INTERVAL_MS)).await;
        }
        Err(Error::Processing(format!(
            "Task {} not published after {} polls",
            task_id, TASK_POLL_MAX_ATTEMPTS
        )))
    }

    async fn batch(&self, requests: Vec<BatchRequest>) -> Result<()> {
        if requests.is_empty() {
            return Ok(());
        }
        let url = self.index_url(&self.write_host, &["batch"])?;
        let body = json!({ "requests": requests });
        self.send_write(self.request(Method::POST, url).json(&body))
            .await
    }

    /// Page through a `/search` listing endpoint (rules, synonyms)
    async fn list_all(&self, kind: &str) -> Result<Vec<Value>> {
        let url = self.index_url(&self.read_host, &[kind, "search"])?;
        let mut all = Vec::new();
        let mut page = 0usize;
        loop {
            let body = json!({ "query": "", "page": page, "hitsPerPage": LIST_PAGE_SIZE });
            let response: SearchHitsResponse = self
                .send_json(self.request(Method::POST, url.clone()).json(&body))
                .await?;
            let count = response.hits.len();
            all.extend(response.hits.into_iter().map(strip_highlights));
            if count < LIST_PAGE_SIZE {
                break;
            }
            page += 1;
        }
        tracing::debug!(kind, count = all.len(), "Listed index {}", kind);
        Ok(all)
    }
}

fn parse_host(host: &str) -> Result<Url> {
    Url::parse(host).map_err(|e| Error::Config(format!("Invalid host URL '{}': {}", host, e)))
}

fn browse_body(params: &BrowseParams, cursor: Option<&str>) -> Value {
    match cursor {
        Some(cursor) => json!({ "cursor": cursor }),
        None => {
            let mut body = json!({ "hitsPerPage": params.page_size });
            if let Some(filter) = params.filter.as_deref().filter(|f| !f.trim().is_empty()) {
                body["filters"] = Value::String(filter.to_string());
            }
            body
        }
    }
}

fn upsert_requests(records: &[Record]) -> Vec<BatchRequest> {
    records
        .iter()
        .map(|record| BatchRequest {
            action: "updateObject",
            body: record.clone().into_value(),
        })
        .collect()
}

fn delete_requests(object_ids: &[String]) -> Vec<BatchRequest> {
    object_ids
        .iter()
        .map(|id| BatchRequest {
            action: "deleteObject",
            body: json!({ "objectID": id }),
        })
        .collect()
}

/// Listing endpoints decorate hits with highlight metadata
fn strip_highlights(mut hit: Value) -> Value {
    if let Some(map) = hit.as_object_mut() {
        map.remove("_highlightResult");
    }
    hit
}

#[async_trait::async_trait]
impl IndexStore for AlgoliaStore {
    async fn browse(&self, params: &BrowseParams, cursor: Option<&str>) -> Result<BrowsePage> {
        let url = self.index_url(&self.read_host, &["browse"])?;
        let body = browse_body(params, cursor);
        tracing::debug!(index = %self.index_name, has_cursor = cursor.is_some(), "Browsing index");

        let response: BrowseResponse = self
            .send_json(self.request(Method::POST, url).json(&body))
            .await?;
        Ok(BrowsePage {
            items: response.hits,
            cursor: response.cursor.filter(|c| !c.is_empty()),
        })
    }

    async fn save_objects(&self, records: &[Record]) -> Result<()> {
        self.batch(upsert_requests(records)).await
    }

    async fn delete_objects(&self, object_ids: &[String]) -> Result<()> {
        self.batch(delete_requests(object_ids)).await
    }

    async fn get_settings(&self) -> Result<Value> {
        let url = self.index_url(&self.read_host, &["settings"])?;
        self.send_json(self.request(Method::GET, url)).await
    }

    async fn set_settings(&self, settings: &Value) -> Result<()> {
        let url = self.index_url(&self.write_host, &["settings"])?;
        self.send_write(self.request(Method::PUT, url).json(settings))
            .await
    }

    async fn list_rules(&self) -> Result<Vec<Value>> {
        self.list_all("rules").await
    }

    async fn save_rules(&self, rules: &[Value], clear_existing: bool) -> Result<()> {
        let mut url = self.index_url(&self.write_host, &["rules", "batch"])?;
        url.query_pairs_mut()
            .append_pair("clearExistingRules", &clear_existing.to_string());
        self.send_write(self.request(Method::POST, url).json(rules))
            .await
    }

    async fn list_synonyms(&self) -> Result<Vec<Value>> {
        self.list_all("synonyms").await
    }

    async fn save_synonyms(&self, synonyms: &[Value], replace_existing: bool) -> Result<()> {
        let mut url = self.index_url(&self.write_host, &["synonyms", "batch"])?;
        url.query_pairs_mut()
            .append_pair("replaceExistingSynonyms", &replace_existing.to_string());
        self.send_write(self.request(Method::POST, url).json(synonyms))
            .await
    }
}
