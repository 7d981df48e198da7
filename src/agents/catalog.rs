//! Built-in marketing agents. Each entry is a prompt or query template plus
//! a parser for the provider payload; none of them perform I/O.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::agents::agent::{
    count_param, required_text, text_list, text_map, text_param, AgentDescriptor, PageInputs, Params,
    ParseFailure, ResultData,
};
use crate::gateway::{ProviderKind, ProviderRequest, RequestError};
use crate::page::{PageParser, SeoElements};

const CONTENT_PREVIEW_CHARS: usize = 100;
const PRICE_NOT_FOUND: &str = "Price not found";

pub fn descriptors() -> Vec<AgentDescriptor> {
    vec![
        AgentDescriptor {
            name: "seo_optimizer",
            description: "Reviews on-page SEO elements against target keywords",
            required_inputs: &["url", "keywords"],
            provider: ProviderKind::Generation,
            pages: PageInputs::Required(seo_page_urls),
            build_request: build_seo_optimizer,
            parse_response: parse_seo_optimizer,
        },
        AgentDescriptor {
            name: "competitor_rankings",
            description: "Collects search rankings for a competitor",
            required_inputs: &["competitor"],
            provider: ProviderKind::Search,
            pages: PageInputs::None,
            build_request: build_competitor_rankings,
            parse_response: parse_competitor_rankings,
        },
        AgentDescriptor {
            name: "competitor_analysis",
            description: "Summarizes a competitor's market position and content strategy",
            required_inputs: &["competitor", "keywords"],
            provider: ProviderKind::Generation,
            pages: PageInputs::None,
            build_request: build_competitor_analysis,
            parse_response: parse_competitor_analysis,
        },
        AgentDescriptor {
            name: "product_recommendation",
            description: "Personalized product recommendations from customer data",
            required_inputs: &["customer_data"],
            provider: ProviderKind::Generation,
            pages: PageInputs::None,
            build_request: build_product_recommendation,
            parse_response: parse_product_recommendation,
        },
        AgentDescriptor {
            name: "post_creator",
            description: "Drafts a social media post with hashtags and a call to action",
            required_inputs: &["topic", "platform"],
            provider: ProviderKind::Generation,
            pages: PageInputs::None,
            build_request: build_post_creator,
            parse_response: parse_post_creator,
        },
        AgentDescriptor {
            name: "email_campaign",
            description: "Writes campaign email copy for one audience segment",
            required_inputs: &["campaign_type", "segment_name"],
            provider: ProviderKind::Generation,
            pages: PageInputs::None,
            build_request: build_email_campaign,
            parse_response: parse_email_campaign,
        },
        AgentDescriptor {
            name: "subject_lines",
            description: "Suggests email subject lines for a segment",
            required_inputs: &["campaign_type", "segment_name"],
            provider: ProviderKind::Generation,
            pages: PageInputs::None,
            build_request: build_subject_lines,
            parse_response: parse_subject_lines,
        },
        AgentDescriptor {
            name: "brand_mentions",
            description: "Finds recent brand mentions on social networks",
            required_inputs: &["brand_name"],
            provider: ProviderKind::Search,
            pages: PageInputs::None,
            build_request: build_brand_mentions,
            parse_response: parse_brand_mentions,
        },
        AgentDescriptor {
            name: "sentiment_analyzer",
            description: "Scores brand sentiment and suggests improvements",
            required_inputs: &["brand_name"],
            provider: ProviderKind::Generation,
            pages: PageInputs::None,
            build_request: build_sentiment_analyzer,
            parse_response: parse_sentiment_analyzer,
        },
        AgentDescriptor {
            name: "content_performance",
            description: "Predicts engagement for a piece of content",
            required_inputs: &["content", "platform"],
            provider: ProviderKind::Generation,
            pages: PageInputs::None,
            build_request: build_content_performance,
            parse_response: parse_content_performance,
        },
        AgentDescriptor {
            name: "price_monitor",
            description: "Compares product pricing against competitors",
            required_inputs: &["product_url"],
            provider: ProviderKind::Generation,
            pages: PageInputs::BestEffort(price_page_urls),
            build_request: build_price_monitor,
            parse_response: parse_price_monitor,
        },
        AgentDescriptor {
            name: "customer_journey",
            description: "Maps customer journey touchpoints and next best actions",
            required_inputs: &["customer_data"],
            provider: ProviderKind::Generation,
            pages: PageInputs::None,
            build_request: build_customer_journey,
            parse_response: parse_customer_journey,
        },
    ]
}

// -- shared payload readers -------------------------------------------------

/// Text of the first chat-completion choice.
pub(crate) fn completion_text(payload: &Value) -> Result<String, ParseFailure> {
    let content = payload
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .ok_or_else(|| ParseFailure("completion has no choices[0].message.content".to_string()))?;

    let text = content
        .as_str()
        .ok_or_else(|| ParseFailure("completion content is not text".to_string()))?
        .trim();
    if text.is_empty() {
        return Err(ParseFailure("completion content is empty".to_string()));
    }
    Ok(text.to_string())
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    position: Option<u32>,
    title: Option<String>,
    link: Option<String>,
    snippet: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub position: u32,
    pub title: String,
    pub url: String,
    pub snippet: String,
}

pub(crate) fn search_hits(payload: &Value) -> Result<Vec<SearchHit>, ParseFailure> {
    let organic = payload
        .get("organic_results")
        .ok_or_else(|| ParseFailure("search response has no organic_results".to_string()))?;
    let results: Vec<OrganicResult> = serde_json::from_value(organic.clone())
        .map_err(|e| ParseFailure(format!("unexpected organic_results shape: {}", e)))?;

    Ok(results
        .into_iter()
        .enumerate()
        .map(|(i, result)| SearchHit {
            position: result.position.unwrap_or(i as u32 + 1),
            title: result.title.unwrap_or_default(),
            url: result.link.unwrap_or_default(),
            snippet: result.snippet.unwrap_or_default(),
        })
        .collect())
}

fn hits_value(hits: &[SearchHit]) -> Result<Value, ParseFailure> {
    serde_json::to_value(hits).map_err(|e| ParseFailure(format!("failed to encode search hits: {}", e)))
}

fn data(fields: Vec<(&str, Value)>) -> ResultData {
    fields
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

fn echo(params: &Params, name: &str) -> Value {
    text_param(params, name).map(Value::String).unwrap_or(Value::Null)
}

fn describe_object(params: &Params, name: &str) -> Result<String, RequestError> {
    match params.get(name) {
        Some(value) if value.is_object() => serde_json::to_string_pretty(value)
            .map_err(|e| RequestError(format!("'{}' could not be rendered: {}", name, e))),
        _ => Err(RequestError(format!("'{}' must be an object", name))),
    }
}

fn customer_id(params: &Params) -> Value {
    params
        .get("customer_data")
        .and_then(|data| data.get("customer_id"))
        .cloned()
        .unwrap_or(Value::Null)
}

fn page_parser() -> Result<PageParser, String> {
    PageParser::new().map_err(|e| e.to_string())
}

// -- seo_optimizer ----------------------------------------------------------

fn seo_elements(params: &Params) -> Result<SeoElements, String> {
    let fetched = match text_param(params, "url") {
        Some(url) => text_map(params, "pages").map_err(|e| e.0)?.remove(&url),
        None => None,
    };
    if let Some(html) = text_param(params, "page_html").or(fetched) {
        return Ok(page_parser()?.seo_elements(&html));
    }
    Ok(SeoElements {
        title: text_param(params, "title").unwrap_or_default(),
        meta_description: text_param(params, "meta_description").unwrap_or_default(),
        h1: text_list(params, "h1").map_err(|e| e.0)?,
    })
}

/// The page at `url`, unless its html or its elements were supplied.
fn seo_page_urls(params: &Params) -> Vec<String> {
    let supplied = ["page_html", "title", "meta_description", "h1"]
        .iter()
        .any(|name| params.contains_key(*name));
    match text_param(params, "url") {
        Some(url) if !supplied && !has_page(params, &url) => vec![url],
        _ => Vec::new(),
    }
}

fn has_page(params: &Params, url: &str) -> bool {
    params
        .get("pages")
        .and_then(|pages| pages.get(url))
        .is_some()
}

fn build_seo_optimizer(params: &Params) -> Result<ProviderRequest, RequestError> {
    let url = required_text(params, "url")?;
    let keywords = text_list(params, "keywords")?;
    let elements = seo_elements(params).map_err(RequestError)?;

    Ok(ProviderRequest::generation(format!(
        "Analyze this webpage SEO for the following elements:\n\
         URL: {}\n\
         Title: {}\n\
         Meta Description: {}\n\
         H1 Tags: {}\n\
         Target Keywords: {}\n\n\
         Provide specific recommendations for:\n\
         1. Title optimization\n\
         2. Meta description improvements\n\
         3. Content structure\n\
         4. Keyword placement\n\
         5. Technical SEO improvements",
        url,
        elements.title,
        elements.meta_description,
        elements.h1.join(", "),
        keywords.join(", ")
    )))
}

fn parse_seo_optimizer(params: &Params, payload: &Value) -> Result<ResultData, ParseFailure> {
    let recommendations = completion_text(payload)?;
    let elements = seo_elements(params).map_err(ParseFailure)?;

    Ok(data(vec![
        ("url", echo(params, "url")),
        ("current_title", json!(elements.title)),
        ("current_meta", json!(elements.meta_description)),
        ("current_h1", json!(elements.h1)),
        ("recommendations", json!(recommendations)),
    ]))
}

// -- competitor_rankings / competitor_analysis --------------------------------

fn build_competitor_rankings(params: &Params) -> Result<ProviderRequest, RequestError> {
    let competitor = required_text(params, "competitor")?;
    let result_count = count_param(params, "result_count")?;
    Ok(ProviderRequest::search(competitor, result_count))
}

fn parse_competitor_rankings(params: &Params, payload: &Value) -> Result<ResultData, ParseFailure> {
    let hits = search_hits(payload)?;
    Ok(data(vec![
        ("competitor", echo(params, "competitor")),
        ("rankings", hits_value(&hits)?),
    ]))
}

fn build_competitor_analysis(params: &Params) -> Result<ProviderRequest, RequestError> {
    let competitor = required_text(params, "competitor")?;
    let keywords = text_list(params, "keywords")?;

    // optional ranking titles from a previous competitor_rankings run
    let ranking_titles: Vec<String> = match params.get("rankings") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.get("title").and_then(Value::as_str))
            .take(10)
            .map(|title| format!("- {}", title))
            .collect(),
        _ => Vec::new(),
    };
    let rankings_section = if ranking_titles.is_empty() {
        String::new()
    } else {
        format!("\nCurrent top search results:\n{}\n", ranking_titles.join("\n"))
    };

    Ok(ProviderRequest::generation(format!(
        "Analyze the market position and strategy for {} based on:\n\
         1. Search rankings\n\
         2. Content strategy\n\
         3. Keywords they're ranking for: {}\n\
         4. Recent changes or updates\n{}",
        competitor,
        keywords.join(", "),
        rankings_section
    )))
}

fn parse_competitor_analysis(params: &Params, payload: &Value) -> Result<ResultData, ParseFailure> {
    let analysis = completion_text(payload)?;
    Ok(data(vec![
        ("competitor", echo(params, "competitor")),
        ("analysis", json!(analysis)),
    ]))
}

// -- product_recommendation -------------------------------------------------

fn build_product_recommendation(params: &Params) -> Result<ProviderRequest, RequestError> {
    let customer = describe_object(params, "customer_data")?;
    Ok(ProviderRequest::generation(format!(
        "Based on the following customer data:\n{}\n\n\
         Generate personalized product recommendations considering:\n\
         1. Past purchase history\n\
         2. Browsing behavior\n\
         3. Demographics\n\
         4. Market trends",
        customer
    )))
}

fn parse_product_recommendation(params: &Params, payload: &Value) -> Result<ResultData, ParseFailure> {
    let recommendations = completion_text(payload)?;
    Ok(data(vec![
        ("customer_id", customer_id(params)),
        ("recommendations", json!(recommendations)),
    ]))
}

// -- post_creator -----------------------------------------------------------

fn post_tone(params: &Params) -> String {
    text_param(params, "tone").unwrap_or_else(|| "professional".to_string())
}

fn build_post_creator(params: &Params) -> Result<ProviderRequest, RequestError> {
    let topic = required_text(params, "topic")?;
    let platform = required_text(params, "platform")?;
    Ok(ProviderRequest::generation(format!(
        "Create a {} post about {} with a {} tone.\n\
         Include:\n\
         1. Main post content\n\
         2. Relevant hashtags\n\
         3. Call to action\n\
         4. Best posting time recommendation",
        platform,
        topic,
        post_tone(params)
    )))
}

pub(crate) fn hashtags(text: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for token in text.split_whitespace() {
        let Some(rest) = token.strip_prefix('#') else {
            continue;
        };
        let tag: String = rest.chars().take_while(|c| c.is_alphanumeric() || *c == '_').collect();
        if tag.is_empty() {
            continue;
        }
        let tag = format!("#{}", tag);
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

fn parse_post_creator(params: &Params, payload: &Value) -> Result<ResultData, ParseFailure> {
    let content = completion_text(payload)?;
    Ok(data(vec![
        ("platform", echo(params, "platform")),
        ("topic", echo(params, "topic")),
        ("tone", json!(post_tone(params))),
        ("hashtags", json!(hashtags(&content))),
        ("content", json!(content)),
    ]))
}

// -- email_campaign / subject_lines -----------------------------------------

pub(crate) fn send_time(characteristics: Option<&str>) -> &'static str {
    match characteristics {
        Some("first_time_buyers") => "14:00",
        Some("repeat_buyers") => "09:00",
        _ => "10:00",
    }
}

fn build_email_campaign(params: &Params) -> Result<ProviderRequest, RequestError> {
    let campaign_type = required_text(params, "campaign_type")?;
    let segment_name = required_text(params, "segment_name")?;
    let segment = match text_param(params, "characteristics") {
        Some(characteristics) => format!("{} ({})", segment_name, characteristics),
        None => segment_name,
    };

    Ok(ProviderRequest::generation(format!(
        "Create an email campaign for:\n\
         Campaign Type: {}\n\
         Audience Segment: {}\n\n\
         Include:\n\
         1. Subject line options\n\
         2. Email body\n\
         3. Call to action\n\
         4. Personalization elements",
        campaign_type, segment
    )))
}

fn parse_email_campaign(params: &Params, payload: &Value) -> Result<ResultData, ParseFailure> {
    let content = completion_text(payload)?;
    let characteristics = text_param(params, "characteristics");
    Ok(data(vec![
        ("segment_name", echo(params, "segment_name")),
        ("campaign_type", echo(params, "campaign_type")),
        ("content", json!(content)),
        ("send_time", json!(send_time(characteristics.as_deref()))),
    ]))
}

fn build_subject_lines(params: &Params) -> Result<ProviderRequest, RequestError> {
    let campaign_type = required_text(params, "campaign_type")?;
    let segment_name = required_text(params, "segment_name")?;
    Ok(ProviderRequest::generation(format!(
        "Generate 5 engaging subject lines for {} campaign targeting {}",
        campaign_type, segment_name
    )))
}

/// One subject line per non-empty line, list markers and quotes removed.
pub(crate) fn subject_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| strip_list_marker(line.trim()).trim_matches('"').trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

// "1." / "2)" numbering or a leading bullet
fn strip_list_marker(line: &str) -> &str {
    let digits = line.len() - line.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    let rest = &line[digits..];
    if digits > 0 && (rest.starts_with('.') || rest.starts_with(')')) {
        return rest[1..].trim_start();
    }
    for bullet in ['-', '*', '•'] {
        if let Some(rest) = line.strip_prefix(bullet) {
            return rest.trim_start();
        }
    }
    line
}

fn parse_subject_lines(params: &Params, payload: &Value) -> Result<ResultData, ParseFailure> {
    let lines = subject_lines(&completion_text(payload)?);
    if lines.is_empty() {
        return Err(ParseFailure("no subject lines in completion".to_string()));
    }
    Ok(data(vec![
        ("segment_name", echo(params, "segment_name")),
        ("subject_lines", json!(lines)),
    ]))
}

// -- brand_mentions / sentiment_analyzer ------------------------------------

fn timeframe(params: &Params) -> String {
    text_param(params, "timeframe").unwrap_or_else(|| "past_month".to_string())
}

/// Google's `tbs` recency filter for a named timeframe.
pub(crate) fn recency_filter(timeframe: &str) -> Option<&'static str> {
    match timeframe {
        "past_hour" => Some("qdr:h"),
        "past_day" => Some("qdr:d"),
        "past_week" => Some("qdr:w"),
        "past_month" => Some("qdr:m"),
        "past_year" => Some("qdr:y"),
        _ => None,
    }
}

fn build_brand_mentions(params: &Params) -> Result<ProviderRequest, RequestError> {
    let brand = required_text(params, "brand_name")?;
    let timeframe = timeframe(params);
    let filter = recency_filter(&timeframe).ok_or_else(|| {
        RequestError(format!(
            "unsupported timeframe '{}', expected past_hour, past_day, past_week, past_month or past_year",
            timeframe
        ))
    })?;
    let result_count = count_param(params, "result_count")?.or(Some(20));

    Ok(ProviderRequest::search(
        format!(
            "{} reviews OR mentions OR feedback site:twitter.com OR site:linkedin.com",
            brand
        ),
        result_count,
    )
    .with_search_param("tbs", filter))
}

fn parse_brand_mentions(params: &Params, payload: &Value) -> Result<ResultData, ParseFailure> {
    let hits = search_hits(payload)?;
    Ok(data(vec![
        ("brand", echo(params, "brand_name")),
        ("timeframe", json!(timeframe(params))),
        ("mentions", hits_value(&hits)?),
    ]))
}

fn mention_lines(params: &Params) -> Vec<String> {
    match params.get("mentions") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(text) => Some(format!("- {}", text)),
                Value::Object(_) => {
                    let title = item.get("title").and_then(Value::as_str).unwrap_or_default();
                    let snippet = item.get("snippet").and_then(Value::as_str).unwrap_or_default();
                    if title.is_empty() && snippet.is_empty() {
                        None
                    } else {
                        Some(format!("- {}: {}", title, snippet))
                    }
                }
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn build_sentiment_analyzer(params: &Params) -> Result<ProviderRequest, RequestError> {
    let brand = required_text(params, "brand_name")?;
    let mentions = mention_lines(params);
    let mentions = if mentions.is_empty() {
        "(no mentions supplied, rely on general knowledge)".to_string()
    } else {
        mentions.join("\n")
    };

    Ok(ProviderRequest::generation(format!(
        "Analyze the sentiment and brand perception for {} over the {} based on these mentions:\n\
         {}\n\n\
         Provide:\n\
         1. Overall sentiment score (positive/negative/neutral)\n\
         2. Key positive mentions\n\
         3. Key concerns or negative feedback\n\
         4. Trend analysis\n\
         5. Recommendations for improvement",
        brand,
        timeframe(params).replace('_', " "),
        mentions
    )))
}

/// The earliest sentiment word in the analysis, or "unknown".
pub(crate) fn overall_sentiment(analysis: &str) -> &'static str {
    let lowered = analysis.to_lowercase();
    ["positive", "negative", "neutral", "mixed"]
        .into_iter()
        .filter_map(|label| lowered.find(label).map(|at| (at, label)))
        .min_by_key(|(at, _)| *at)
        .map(|(_, label)| label)
        .unwrap_or("unknown")
}

fn parse_sentiment_analyzer(params: &Params, payload: &Value) -> Result<ResultData, ParseFailure> {
    let analysis = completion_text(payload)?;
    Ok(data(vec![
        ("brand", echo(params, "brand_name")),
        ("timeframe", json!(timeframe(params))),
        ("overall_sentiment", json!(overall_sentiment(&analysis))),
        ("analysis", json!(analysis)),
    ]))
}

// -- content_performance ----------------------------------------------------

pub(crate) fn content_preview(content: &str) -> String {
    let preview: String = content.chars().take(CONTENT_PREVIEW_CHARS).collect();
    format!("{}...", preview)
}

fn build_content_performance(params: &Params) -> Result<ProviderRequest, RequestError> {
    let content = required_text(params, "content")?;
    let platform = required_text(params, "platform")?;
    Ok(ProviderRequest::generation(format!(
        "Analyze this content for {} and predict its performance:\n{}\n\n\
         Consider:\n\
         1. Engagement potential (likes, shares, comments)\n\
         2. Viral potential\n\
         3. SEO impact\n\
         4. Target audience resonance\n\
         5. Best posting time and frequency\n\
         6. Potential improvements",
        platform, content
    )))
}

fn parse_content_performance(params: &Params, payload: &Value) -> Result<ResultData, ParseFailure> {
    let prediction = completion_text(payload)?;
    let content = text_param(params, "content").unwrap_or_default();
    Ok(data(vec![
        ("platform", echo(params, "platform")),
        ("content_preview", json!(content_preview(&content))),
        ("prediction", json!(prediction)),
    ]))
}

// -- price_monitor ----------------------------------------------------------

/// Product and competitor pages that have neither a price nor html yet.
fn price_page_urls(params: &Params) -> Vec<String> {
    let Some(product_url) = text_param(params, "product_url") else {
        return Vec::new();
    };
    let has_price = |url: &str| {
        params
            .get("prices")
            .and_then(|prices| prices.get(url))
            .is_some()
    };

    let mut urls: Vec<String> = Vec::new();
    for url in std::iter::once(product_url).chain(text_list(params, "competitors").unwrap_or_default()) {
        if !urls.contains(&url) && !has_price(&url) && !has_page(params, &url) {
            urls.push(url);
        }
    }
    urls
}

/// Price text per url: explicit prices first, then extracted from page
/// html, then the fetch error, otherwise "Price not found".
fn price_table(params: &Params) -> Result<BTreeMap<String, String>, RequestError> {
    let product_url = required_text(params, "product_url")?;
    let prices = text_map(params, "prices")?;
    let pages = text_map(params, "pages")?;
    let page_errors = text_map(params, "page_errors")?;

    let mut urls = vec![product_url];
    for url in text_list(params, "competitors")?
        .into_iter()
        .chain(prices.keys().cloned())
        .chain(pages.keys().cloned())
    {
        if !urls.contains(&url) {
            urls.push(url);
        }
    }

    let parser = if pages.is_empty() {
        None
    } else {
        Some(page_parser().map_err(RequestError)?)
    };

    Ok(urls
        .into_iter()
        .map(|url| {
            let price = prices
                .get(&url)
                .cloned()
                .or_else(|| {
                    let html = pages.get(&url)?;
                    parser.as_ref()?.price(html)
                })
                .or_else(|| page_errors.get(&url).map(|reason| format!("Error: {}", reason)))
                .unwrap_or_else(|| PRICE_NOT_FOUND.to_string());
            (url, price)
        })
        .collect())
}

fn build_price_monitor(params: &Params) -> Result<ProviderRequest, RequestError> {
    let product_url = required_text(params, "product_url")?;
    let table = price_table(params)?;
    let main_price = table
        .get(&product_url)
        .cloned()
        .unwrap_or_else(|| PRICE_NOT_FOUND.to_string());
    let competitor_prices: Vec<String> = table
        .iter()
        .filter(|(url, _)| **url != product_url)
        .map(|(url, price)| format!("- {}: {}", url, price))
        .collect();

    Ok(ProviderRequest::generation(format!(
        "Analyze these prices and provide recommendations:\n\
         Main product ({}): {}\n\
         Competitor prices:\n{}\n\n\
         Consider:\n\
         1. Price positioning\n\
         2. Competitive advantage\n\
         3. Pricing strategy recommendations\n\
         4. Market opportunity",
        product_url,
        main_price,
        if competitor_prices.is_empty() {
            "- none supplied".to_string()
        } else {
            competitor_prices.join("\n")
        }
    )))
}

fn parse_price_monitor(params: &Params, payload: &Value) -> Result<ResultData, ParseFailure> {
    let analysis = completion_text(payload)?;
    let table = price_table(params).map_err(|e| ParseFailure(e.0))?;
    Ok(data(vec![
        ("product_url", echo(params, "product_url")),
        ("prices", json!(table)),
        ("analysis", json!(analysis)),
    ]))
}

// -- customer_journey -------------------------------------------------------

fn build_customer_journey(params: &Params) -> Result<ProviderRequest, RequestError> {
    let customer = describe_object(params, "customer_data")?;
    Ok(ProviderRequest::generation(format!(
        "Analyze this customer's journey based on their data:\n{}\n\n\
         Map out:\n\
         1. Key touchpoints\n\
         2. Pain points\n\
         3. Conversion opportunities\n\
         4. Personalization recommendations\n\
         5. Next best actions\n\
         6. Retention strategies",
        customer
    )))
}

fn parse_customer_journey(params: &Params, payload: &Value) -> Result<ResultData, ParseFailure> {
    let journey_map = completion_text(payload)?;
    Ok(data(vec![
        ("customer_id", customer_id(params)),
        ("journey_map", json!(journey_map)),
    ]))
}
