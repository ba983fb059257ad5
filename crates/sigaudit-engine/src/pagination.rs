//! Page-token hygiene and continuation metadata.

use regex::Regex;
use serde::Serialize;
use sigaudit_types::TimeRange;
use std::sync::LazyLock;

static TOKEN_ALPHABET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9+/=\-_]+$").unwrap());

static SALVAGEABLE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9+/=\-_]{200,400}").unwrap());

/// Validate a page token before it is sent back to the backend.
///
/// Tokens survive a round trip through a conversational caller, which
/// sometimes wraps or decorates them. A clean token is returned as is; a
/// decorated one is reduced to its leftmost 200-400 character run of token
/// characters; anything else restarts pagination.
pub fn clean_page_token(token: Option<&str>) -> Option<String> {
    let token = token?.trim();

    if TOKEN_ALPHABET.is_match(token) {
        return Some(token.to_string());
    }

    tracing::warn!(chars = token.len(), "page token contains invalid characters");
    match SALVAGEABLE_TOKEN.find(token) {
        Some(found) => {
            tracing::info!(chars = found.len(), "salvaged page token");
            Some(found.as_str().to_string())
        }
        None => {
            tracing::error!("could not recover page token, restarting pagination");
            None
        }
    }
}

/// Parameters a caller passes back to fetch the next page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResumeParams {
    pub tool: String,
    pub start_time: String,
    pub end_time: String,
    pub next_token: String,
    pub max_param: String,
    pub max_value: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginationInfo {
    pub item_type: String,
    pub names_in_page: Vec<String>,
    pub has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume: Option<ResumeParams>,
}

/// What a tool call looked like, so it can be repeated for the next page.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest<'a> {
    pub tool: &'a str,
    pub item_type: &'a str,
    pub time_range: &'a TimeRange,
    pub max_param: &'a str,
    pub max_value: u32,
}

impl PaginationInfo {
    /// `None` unless a lookup ran and either listed names or left more pages.
    pub fn build(
        request: PageRequest<'_>,
        lookup_used: bool,
        names_in_page: Vec<String>,
        next_token: Option<String>,
    ) -> Option<Self> {
        if !lookup_used || (names_in_page.is_empty() && next_token.is_none()) {
            return None;
        }

        let resume = next_token.as_ref().map(|token| ResumeParams {
            tool: request.tool.to_string(),
            start_time: request.time_range.unix_start().to_string(),
            end_time: request.time_range.unix_end().to_string(),
            next_token: token.clone(),
            max_param: request.max_param.to_string(),
            max_value: request.max_value,
        });

        Some(Self {
            item_type: request.item_type.to_string(),
            names_in_page,
            has_more: next_token.is_some(),
            next_token,
            resume,
        })
    }
}
