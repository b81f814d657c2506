use crate::config::Config;
use crate::constants::{MAX_PAGE_SIZE_BYTES, MAX_REDIRECTS, USER_AGENT};
use crate::models::PageMetadata;
use crate::persistence::{PersistError, SaveReceipt};
use crate::session::SaveTicket;

use regex::Regex;
use reqwest::Client;
use reqwest::cookie::Jar;
use scraper::{Html, Selector};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub enum NetworkResponse {
    Loading,
    PageLoaded(Url, PageMetadata, String),
    Error(String),
    SaveFinished(SaveTicket, Result<SaveReceipt, PersistError>),
}

#[derive(Debug, Error)]
pub enum PageError {
    #[error("could not build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("{0}")]
    Fetch(#[from] reqwest::Error),
    #[error("server answered {0}")]
    Status(reqwest::StatusCode),
    #[error("page too large ({0} bytes)")]
    TooLarge(u64),
}

pub fn parse_html_metadata(html: &str) -> PageMetadata {
    let document = Html::parse_document(html);
    static TITLE_SELECTOR: OnceLock<Selector> = OnceLock::new();
    static BODY_SELECTOR: OnceLock<Selector> = OnceLock::new();
    static CSRF_SELECTOR: OnceLock<Selector> = OnceLock::new();
    static STAFF_SCRIPT: OnceLock<Regex> = OnceLock::new();
    let title_selector = TITLE_SELECTOR.get_or_init(|| Selector::parse("title").unwrap());
    let body_selector = BODY_SELECTOR.get_or_init(|| Selector::parse("body").unwrap());
    let csrf_selector = CSRF_SELECTOR.get_or_init(|| {
        Selector::parse(r#"input[name="csrfmiddlewaretoken"], meta[name="csrf-token"]"#).unwrap()
    });
    let staff_script = STAFF_SCRIPT
        .get_or_init(|| Regex::new(r"window\.isStaffUser\s*=\s*true\b").unwrap());

    let title = document
        .select(title_selector)
        .next()
        .map(|element| {
            element
                .text()
                .collect::<Vec<_>>()
                .join(" ")
                .trim()
                .to_string()
        })
        .unwrap_or_else(|| "No Title".to_string());

    let body = document.select(body_selector).next();
    let staff_attr = body
        .and_then(|b| b.value().attr("data-staff-user"))
        .is_some_and(|v| v.eq_ignore_ascii_case("true"));
    let content_id = body
        .and_then(|b| b.value().attr("data-content-id"))
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string);
    let csrf_token = document.select(csrf_selector).find_map(|el| {
        el.value()
            .attr("value")
            .or_else(|| el.value().attr("content"))
            .map(str::to_string)
    });

    PageMetadata {
        title,
        staff_user: staff_attr || staff_script.is_match(html),
        content_id,
        csrf_token,
    }
}

pub fn strict_redirect_policy() -> reqwest::redirect::Policy {
    reqwest::redirect::Policy::custom(|attempt| {
        if attempt.previous().len() > MAX_REDIRECTS {
            return attempt.error("Too many redirects");
        }
        attempt.follow()
    })
}

/// Owns the HTTP client shared by page loads and saves, so the session
/// cookie and anything the server sets on the page load go out with saves.
pub struct NetworkManager {
    client: Client,
}

impl NetworkManager {
    pub fn new(config: &Config, page_url: &Url) -> Result<Self, PageError> {
        let jar = Arc::new(Jar::default());
        if let Some(cookie) = &config.session_cookie {
            for pair in cookie.split(';').map(str::trim).filter(|p| !p.is_empty()) {
                jar.add_cookie_str(pair, page_url);
            }
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .redirect(strict_redirect_policy())
            .cookie_provider(jar)
            .build()
            .map_err(PageError::Client)?;
        Ok(Self { client })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub async fn fetch_page(&self, url: &Url) -> Result<(PageMetadata, String), PageError> {
        tracing::info!(%url, "fetching page");
        let response = self.client.get(url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(PageError::Status(response.status()));
        }
        if let Some(len) = response.content_length() {
            if len > MAX_PAGE_SIZE_BYTES {
                return Err(PageError::TooLarge(len));
            }
        }
        let html = response.text().await?;
        let metadata = parse_html_metadata(&html);
        tracing::debug!(title = %metadata.title, staff = metadata.staff_user, "page parsed");
        Ok((metadata, html))
    }
}
