use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::config::PageConfig;
use crate::error::{AgencyError, Result};

/// A page could not be downloaded.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("failed to fetch {url}: {reason}")]
pub struct PageFetchError {
    pub url: String,
    pub reason: String,
}

/// Downloads the html some agents read before building their request.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> std::result::Result<String, PageFetchError>;
}

pub struct HttpPageFetcher {
    client: Client,
}

impl HttpPageFetcher {
    pub fn new(config: &PageConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout())
            .build()
            .map_err(|e| AgencyError::NetworkError(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<String, PageFetchError> {
        let failed = |reason: String| PageFetchError {
            url: url.to_string(),
            reason,
        };

        debug!("Fetching page {}", url);
        let response = self.client.get(url).send().await.map_err(|e| failed(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(failed(format!("HTTP {}", status)));
        }
        response.text().await.map_err(|e| failed(e.to_string()))
    }
}

/// On-page SEO elements pulled from a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeoElements {
    pub title: String,
    pub meta_description: String,
    pub h1: Vec<String>,
}

/// html extractor for the pieces agents put into prompts
pub struct PageParser {
    title_selector: Selector,
    meta_description_selector: Selector,
    h1_selector: Selector,
    price_selector: Selector,
}

impl PageParser {
    pub fn new() -> std::result::Result<Self, AgencyError> {
        Ok(Self {
            title_selector: Selector::parse("title")
                .map_err(|e| AgencyError::ParseError(format!("Invalid title selector: {}", e)))?,
            meta_description_selector: Selector::parse("meta[name='description']")
                .map_err(|e| AgencyError::ParseError(format!("Invalid meta selector: {}", e)))?,
            h1_selector: Selector::parse("h1")
                .map_err(|e| AgencyError::ParseError(format!("Invalid h1 selector: {}", e)))?,
            price_selector: Selector::parse("span.price")
                .map_err(|e| AgencyError::ParseError(format!("Invalid price selector: {}", e)))?,
        })
    }

    pub fn seo_elements(&self, html: &str) -> SeoElements {
        let document = Html::parse_document(html);

        let title = document
            .select(&self.title_selector)
            .next()
            .map(|element| collapse_whitespace(&element.text().collect::<String>()))
            .unwrap_or_default();

        let meta_description = document
            .select(&self.meta_description_selector)
            .next()
            .and_then(|element| element.value().attr("content"))
            .map(collapse_whitespace)
            .unwrap_or_default();

        let h1 = document
            .select(&self.h1_selector)
            .map(|element| collapse_whitespace(&element.text().collect::<String>()))
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>();

        debug!("Extracted SEO elements: title {:?}, {} h1 tags", title, h1.len());
        SeoElements {
            title,
            meta_description,
            h1,
        }
    }

    // first span.price on the page, simplified on purpose; real shops vary
    pub fn price(&self, html: &str) -> Option<String> {
        let document = Html::parse_document(html);
        document
            .select(&self.price_selector)
            .next()
            .map(|element| collapse_whitespace(&element.text().collect::<String>()))
            .filter(|text| !text.is_empty())
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
