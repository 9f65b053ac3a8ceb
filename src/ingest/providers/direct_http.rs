// src/ingest/providers/direct_http.rs
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::ingest::normalize::normalize_text;
use crate::ingest::providers::scrape_api::parse_timestamp;
use crate::ingest::providers::ContentProvider;
use crate::ingest::types::Fetched;

pub const RAW_HTML_WARNING: &str =
    "extracted from raw HTML; navigation or boilerplate text may be included";

/// Last-resort provider: fetch the page itself and strip markup.
pub struct DirectHttpProvider {
    http: reqwest::Client,
}

impl DirectHttpProvider {
    pub fn new(user_agent: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .context("building direct http client")?;
        Ok(Self { http })
    }

    /// Pull readable text and the published time out of an HTML document.
    pub fn extract(html: &str) -> Fetched {
        static RE_DROP: OnceCell<Regex> = OnceCell::new();
        static RE_BODY: OnceCell<Regex> = OnceCell::new();
        let re_drop = RE_DROP.get_or_init(|| {
            Regex::new(r"(?is)<(script|style|noscript|nav|header|footer|svg)\b.*?</(script|style|noscript|nav|header|footer|svg)>")
                .expect("drop regex")
        });
        let re_body = RE_BODY.get_or_init(|| {
            Regex::new(r"(?is)<(article|main)\b[^>]*>(.*?)</(article|main)>").expect("body regex")
        });

        let cleaned = re_drop.replace_all(html, " ");
        // Prefer <article>/<main> when the page has one.
        let region = re_body
            .captures(&cleaned)
            .and_then(|c| c.get(2))
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| cleaned.to_string());

        Fetched {
            content: normalize_text(&region),
            published_at: published_meta(html).and_then(|s| parse_timestamp(&s)),
            warning: Some(RAW_HTML_WARNING.to_string()),
        }
    }
}

fn published_meta(html: &str) -> Option<String> {
    static RE_META: OnceCell<Regex> = OnceCell::new();
    let re = RE_META.get_or_init(|| {
        Regex::new(
            r#"(?i)<meta[^>]+(?:property|name)\s*=\s*["'](?:article:published_time|date|pubdate)["'][^>]*content\s*=\s*["']([^"']+)["']"#,
        )
        .expect("meta regex")
    });
    re.captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

#[async_trait]
impl ContentProvider for DirectHttpProvider {
    async fn retrieve(&self, uri: &str, timeout: Duration) -> Result<Fetched> {
        let resp = self
            .http
            .get(uri)
            .timeout(timeout)
            .send()
            .await
            .context("direct http get()")?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("source page HTTP {status}"));
        }
        let body = resp.text().await.context("direct http .text()")?;
        Ok(Self::extract(&body))
    }

    fn name(&self) -> &'static str {
        "direct_http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head>
        <meta property="article:published_time" content="2024-05-02T08:30:00+02:00">
        <style>.x{color:red}</style><script>track()</script></head>
        <body><nav>Home | Blog</nav>
        <article><h1>Launch&nbsp;notes</h1><p>We shipped   the &ldquo;thing&rdquo;.</p></article>
        <footer>© corp</footer></body></html>"#;

    #[test]
    fn extracts_article_text_and_date() {
        let f = DirectHttpProvider::extract(PAGE);
        assert_eq!(f.content, r#"Launch notes We shipped the "thing"."#);
        assert_eq!(
            f.published_at.unwrap().to_rfc3339(),
            "2024-05-02T06:30:00+00:00"
        );
        assert_eq!(f.warning.as_deref(), Some(RAW_HTML_WARNING));
    }

    #[test]
    fn without_article_uses_whole_body() {
        let f = DirectHttpProvider::extract("<body><div>Plain <b>page</b></div></body>");
        assert_eq!(f.content, "Plain page");
        assert!(f.published_at.is_none());
    }
}
