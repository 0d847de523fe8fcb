//! Notion page-database implementation of [`StructuredStoreClient`].

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, SecondsFormat};
use jobtrack_core::{DateRange, JobRecord, JobStatus, StoredJob};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info_span, Instrument};

use crate::{StoreError, StoreFilter, StoreQuery, StoreSort, StructuredStoreClient};

pub const DEFAULT_NOTION_BASE_URL: &str = "https://api.notion.com/v1";
pub const NOTION_VERSION: &str = "2022-06-28";

const PAGE_SIZE: u32 = 100;
/// Per-segment character cap for title and rich-text values.
const TEXT_SEGMENT_LIMIT: usize = 2000;

/// Property names of the job database.
pub mod property {
    pub const LINK: &str = "Link";
    pub const STATUS: &str = "Status";
    pub const COMPANY: &str = "Company";
    pub const COUNTRY: &str = "Country";
    pub const URL: &str = "URL";
    pub const DESCRIPTION: &str = "Description";
    pub const APPLIED_DATE: &str = "Applied Date";
    pub const CREATED_DATE: &str = "Created Date";
}

#[derive(Clone)]
pub struct NotionConfig {
    pub api_key: String,
    pub database_id: String,
    pub base_url: String,
}

impl fmt::Debug for NotionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotionConfig")
            .field("api_key", &"<redacted>")
            .field("database_id", &self.database_id)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct NotionStore {
    client: reqwest::Client,
    config: NotionConfig,
}

impl NotionStore {
    pub fn new(client: reqwest::Client, config: NotionConfig) -> Self {
        Self { client, config }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), path);
        self.client
            .request(method, url)
            .bearer_auth(&self.config.api_key)
            .header("Notion-Version", NOTION_VERSION)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        path: &str,
        request: RequestBuilder,
    ) -> Result<T, StoreError> {
        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl StructuredStoreClient for NotionStore {
    async fn query_records(&self, query: &StoreQuery) -> Result<Vec<StoredJob>, StoreError> {
        let path = format!("databases/{}/query", self.config.database_id);
        let span = info_span!("store_query", filter = ?query.filter);

        async {
            let mut records = Vec::new();
            let mut cursor: Option<String> = None;
            loop {
                let body = QueryBody::new(query, cursor.as_deref());
                let page: QueryResponse = self
                    .execute(&path, self.request(Method::POST, &path).json(&body))
                    .await?;
                records.extend(page.results.into_iter().map(Page::into_stored_job));
                match (page.has_more, page.next_cursor) {
                    (true, Some(next)) => cursor = Some(next),
                    _ => break,
                }
            }
            debug!(records = records.len(), "store query complete");
            Ok(records)
        }
        .instrument(span)
        .await
    }

    async fn create_record(&self, job: &JobRecord) -> Result<JobRecord, StoreError> {
        let body = CreatePageBody {
            parent: Parent {
                database_id: &self.config.database_id,
            },
            properties: WriteProperties::for_new_job(job),
        };
        let span = info_span!("store_create", url = %job.url);

        async {
            let page: Page = self
                .execute("pages", self.request(Method::POST, "pages").json(&body))
                .await?;
            debug!(page_id = %page.id, "store page created");
            Ok(page.into_stored_job().record)
        }
        .instrument(span)
        .await
    }

    async fn fetch_record(&self, id: &str) -> Result<StoredJob, StoreError> {
        let path = format!("pages/{id}");
        let span = info_span!("store_fetch", page_id = id);

        async {
            let page: Page = self.execute(&path, self.request(Method::GET, &path)).await?;
            Ok(page.into_stored_job())
        }
        .instrument(span)
        .await
    }

    async fn update_status_to_applied(
        &self,
        id: &str,
        applied_at: DateTime<FixedOffset>,
    ) -> Result<(), StoreError> {
        let path = format!("pages/{id}");
        let body = UpdatePageBody {
            properties: AppliedProperties {
                status: StatusValue::named(JobStatus::Applied),
                applied_date: DateValue {
                    date: DateStart {
                        start: applied_at.to_rfc3339_opts(SecondsFormat::Secs, false),
                    },
                },
            },
        };
        let span = info_span!("store_update", page_id = id);

        async {
            let _page: serde_json::Value = self
                .execute(&path, self.request(Method::PATCH, &path).json(&body))
                .await?;
            Ok(())
        }
        .instrument(span)
        .await
    }
}

// ---- query wire types ----

#[derive(Debug, Serialize)]
struct QueryBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<PropertyFilter>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sorts: Vec<PropertySort>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_cursor: Option<&'a str>,
    page_size: u32,
}

impl<'a> QueryBody<'a> {
    fn new(query: &StoreQuery, start_cursor: Option<&'a str>) -> Self {
        Self {
            filter: query.filter.as_ref().map(PropertyFilter::from),
            sorts: query.sort.iter().map(|s| PropertySort::from(*s)).collect(),
            start_cursor,
            page_size: PAGE_SIZE,
        }
    }
}

#[derive(Debug, Serialize)]
struct PropertyFilter {
    property: &'static str,
    #[serde(flatten)]
    condition: FilterCondition,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
enum FilterCondition {
    Url(EqualsCondition),
    Status(EqualsCondition),
    Date(DateCondition),
}

#[derive(Debug, Serialize)]
struct EqualsCondition {
    equals: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
enum DateCondition {
    PastWeek(EmptyObject),
    PastMonth(EmptyObject),
    PastYear(EmptyObject),
    IsNotEmpty(bool),
}

#[derive(Debug, Serialize)]
struct EmptyObject {}

impl From<&StoreFilter> for PropertyFilter {
    fn from(filter: &StoreFilter) -> Self {
        match filter {
            StoreFilter::UrlEquals(url) => Self {
                property: property::URL,
                condition: FilterCondition::Url(EqualsCondition { equals: url.clone() }),
            },
            StoreFilter::StatusEquals(status) => Self {
                property: property::STATUS,
                condition: FilterCondition::Status(EqualsCondition {
                    equals: status.label().to_string(),
                }),
            },
            StoreFilter::CreatedWithin(range) => Self {
                property: property::CREATED_DATE,
                condition: FilterCondition::Date(match range {
                    DateRange::PastWeek => DateCondition::PastWeek(EmptyObject {}),
                    DateRange::PastMonth => DateCondition::PastMonth(EmptyObject {}),
                    DateRange::PastYear => DateCondition::PastYear(EmptyObject {}),
                }),
            },
            StoreFilter::AppliedDatePresent => Self {
                property: property::APPLIED_DATE,
                condition: FilterCondition::Date(DateCondition::IsNotEmpty(true)),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct PropertySort {
    property: &'static str,
    direction: &'static str,
}

impl From<StoreSort> for PropertySort {
    fn from(sort: StoreSort) -> Self {
        match sort {
            StoreSort::AppliedDateDescending => Self {
                property: property::APPLIED_DATE,
                direction: "descending",
            },
        }
    }
}

// ---- write wire types ----

#[derive(Debug, Serialize)]
struct CreatePageBody<'a> {
    parent: Parent<'a>,
    properties: WriteProperties,
}

#[derive(Debug, Serialize)]
struct Parent<'a> {
    database_id: &'a str,
}

#[derive(Debug, Serialize)]
struct WriteProperties {
    #[serde(rename = "Link")]
    link: TitleValue,
    #[serde(rename = "Status")]
    status: StatusValue,
    #[serde(rename = "Country")]
    country: SelectValue,
    #[serde(rename = "Company")]
    company: SelectValue,
    #[serde(rename = "URL")]
    url: UrlValue,
    #[serde(rename = "Description")]
    description: RichTextValue,
}

impl WriteProperties {
    fn for_new_job(job: &JobRecord) -> Self {
        let link = (!job.url.is_empty()).then_some(job.url.as_str());
        Self {
            link: TitleValue {
                title: text_segments(&job.title, link),
            },
            status: StatusValue::named(JobStatus::NotApplied),
            country: SelectValue::from_name(&job.country),
            company: SelectValue::from_name(&job.company),
            url: UrlValue {
                url: link.map(ToString::to_string),
            },
            description: RichTextValue {
                rich_text: text_segments(&job.description, None),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct UpdatePageBody {
    properties: AppliedProperties,
}

#[derive(Debug, Serialize)]
struct AppliedProperties {
    #[serde(rename = "Status")]
    status: StatusValue,
    #[serde(rename = "Applied Date")]
    applied_date: DateValue,
}

#[derive(Debug, Serialize)]
struct TitleValue {
    title: Vec<TextSegment>,
}

#[derive(Debug, Serialize)]
struct RichTextValue {
    rich_text: Vec<TextSegment>,
}

#[derive(Debug, Serialize)]
struct TextSegment {
    text: TextContent,
}

#[derive(Debug, Serialize)]
struct TextContent {
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    link: Option<LinkTarget>,
}

#[derive(Debug, Serialize)]
struct LinkTarget {
    url: String,
}

#[derive(Debug, Serialize)]
struct StatusValue {
    status: OptionName,
}

impl StatusValue {
    fn named(status: JobStatus) -> Self {
        Self {
            status: OptionName {
                name: status.label().to_string(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct SelectValue {
    select: Option<OptionName>,
}

impl SelectValue {
    /// Select option names may not contain commas; an empty name clears the select.
    fn from_name(name: &str) -> Self {
        let name = name.replace(',', " ").trim().to_string();
        Self {
            select: (!name.is_empty()).then_some(OptionName { name }),
        }
    }
}

#[derive(Debug, Serialize)]
struct OptionName {
    name: String,
}

#[derive(Debug, Serialize)]
struct UrlValue {
    url: Option<String>,
}

#[derive(Debug, Serialize)]
struct DateValue {
    date: DateStart,
}

#[derive(Debug, Serialize)]
struct DateStart {
    start: String,
}

fn text_segments(text: &str, link: Option<&str>) -> Vec<TextSegment> {
    let chars = text.chars().collect::<Vec<_>>();
    chars
        .chunks(TEXT_SEGMENT_LIMIT)
        .map(|chunk| TextSegment {
            text: TextContent {
                content: chunk.iter().collect(),
                link: link.map(|url| LinkTarget {
                    url: url.to_string(),
                }),
            },
        })
        .collect()
}

// ---- read wire types ----

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<Page>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Page {
    id: String,
    #[serde(default)]
    properties: ReadProperties,
}

#[derive(Debug, Default, Deserialize)]
struct ReadProperties {
    #[serde(rename = "Applied Date", default)]
    applied_date: DateProperty,
    #[serde(rename = "Status", default)]
    status: StatusProperty,
    #[serde(rename = "Link", default)]
    link: TitleProperty,
    #[serde(rename = "Company", default)]
    company: SelectProperty,
    #[serde(rename = "Country", default)]
    country: SelectProperty,
    #[serde(rename = "URL", default)]
    url: UrlProperty,
    #[serde(rename = "Description", default)]
    description: RichTextProperty,
}

#[derive(Debug, Default, Deserialize)]
struct DateProperty {
    #[serde(default)]
    date: Option<DateRead>,
}

#[derive(Debug, Default, Deserialize)]
struct DateRead {
    #[serde(default)]
    start: String,
}

#[derive(Debug, Default, Deserialize)]
struct StatusProperty {
    #[serde(default)]
    status: Option<NameRead>,
}

#[derive(Debug, Default, Deserialize)]
struct SelectProperty {
    #[serde(default)]
    select: Option<NameRead>,
}

#[derive(Debug, Default, Deserialize)]
struct NameRead {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct UrlProperty {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TitleProperty {
    #[serde(default)]
    title: Vec<PlainText>,
}

#[derive(Debug, Default, Deserialize)]
struct RichTextProperty {
    #[serde(default)]
    rich_text: Vec<PlainText>,
}

#[derive(Debug, Default, Deserialize)]
struct PlainText {
    #[serde(default)]
    plain_text: String,
}

fn join_plain_text(segments: Vec<PlainText>) -> String {
    segments.into_iter().map(|s| s.plain_text).collect()
}

fn option_name(value: Option<NameRead>) -> String {
    value.map(|n| n.name).unwrap_or_default()
}

impl Page {
    /// Missing or empty properties read as empty strings.
    fn into_stored_job(self) -> StoredJob {
        let props = self.properties;
        StoredJob {
            record: JobRecord {
                id: Some(self.id),
                country: option_name(props.country.select),
                company: option_name(props.company.select),
                url: props.url.url.unwrap_or_default(),
                title: join_plain_text(props.link.title),
                description: join_plain_text(props.description.rich_text),
            },
            status: option_name(props.status.status),
            applied_date: props.applied_date.date.map(|d| d.start),
        }
    }
}
