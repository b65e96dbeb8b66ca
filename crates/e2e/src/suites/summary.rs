//! Summary generation
//!
//! Generation calls a paid model on the backend, so the suite triggers it
//! exactly once per run.

use std::time::Duration;

use super::{require, Outcome, Scenario, ScenarioContext};
use crate::ensure;
use crate::error::E2eResult;
use crate::fixtures::Fixture;
use crate::pages::FeedStatus;

pub fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "summary-disabled-without-feeds",
            suite: "summary",
            tags: &["smoke"],
            fixture: Fixture::Authenticated,
            timeout: None,
            body: |cx| Box::pin(disabled_without_feeds(cx)),
        },
        Scenario {
            name: "generate-summary-with-timestamp",
            suite: "summary",
            tags: &["status"],
            fixture: Fixture::Authenticated,
            timeout: Some(Duration::from_secs(60)),
            body: |cx| Box::pin(generate_summary(cx)),
        },
    ]
}

async fn disabled_without_feeds(cx: ScenarioContext) -> E2eResult<Outcome> {
    let summary = cx.summary();
    summary.base.goto("/dashboard").await?;

    ensure!(summary.is_summary_button_disabled().await?, "summary button is not in its disabled variant");
    let button = require(
        summary.summary_button_disabled.first_snapshot().await?,
        "disabled summary button",
    )?;
    ensure!(button.disabled, "summary button is clickable without feeds");
    Ok(Outcome::Passed)
}

async fn generate_summary(cx: ScenarioContext) -> E2eResult<Outcome> {
    let feeds = cx.feeds();
    let summary = cx.summary();
    feeds.goto_feeds().await?;

    let name = "E2E Test - Generate Summary";
    feeds.search_feeds(name).await?;
    feeds.add_feed(name, &feeds.feed_url_from_name(name)).await?;
    let feed = require(feeds.feed_by_name(name).await?, "summary source feed")?;
    feeds.wait_for_feed_status(&feed.id, FeedStatus::Ok).await?;

    summary.open_summary_modal().await?;
    ensure!(summary.is_empty_state_displayed().await?, "summary modal has no empty state");
    ensure!(summary.is_generate_button_visible().await?, "generate button not shown");

    summary.generate_summary().await?;

    let content = require(summary.summary_content().await?, "summary content")?;
    ensure!(!content.is_empty(), "summary content is empty");
    let timestamp = require(summary.summary_timestamp().await?, "summary timestamp")?;
    ensure!(!timestamp.trim().is_empty(), "summary timestamp is empty");

    summary.close_modal().await?;
    ensure!(!summary.is_modal_open().await?, "summary modal still open");
    Ok(Outcome::Passed)
}
