//! Feed management: add, validate, edit, delete, search, filter, status
//!
//! Every scenario uses its own feed name, and the feed URL is derived
//! from that name, so scenarios running in parallel against the same
//! account never trip the duplicate URL check for each other.

use std::time::Duration;
use tracing::info;

use super::{ensure_matches, require, Outcome, Scenario, ScenarioContext};
use crate::ensure;
use crate::error::E2eResult;
use crate::fixtures::Fixture;
use crate::pages::{FeedPage, FeedRef, FeedStatus, StatusFilter};

const SLOW: Option<Duration> = Some(Duration::from_secs(60));
const UNREACHABLE_FEED_URL: &str = "https://invalid-feed-url-example.com/feed.xml";

macro_rules! feed_scenario {
    ($name:literal, [$($tag:literal),*], $timeout:expr, $body:path) => {
        Scenario {
            name: $name,
            suite: "feeds",
            tags: &[$($tag),*],
            fixture: Fixture::Authenticated,
            timeout: $timeout,
            body: |cx| Box::pin($body(cx)),
        }
    };
}

pub fn scenarios() -> Vec<Scenario> {
    vec![
        feed_scenario!("empty-state", ["smoke"], None, empty_state),
        feed_scenario!("add-feed-shows-pending", ["smoke"], None, add_feed_shows_pending),
        feed_scenario!("name-required", ["validation"], None, name_required),
        feed_scenario!("url-required", ["validation"], None, url_required),
        feed_scenario!("invalid-url-format", ["validation"], None, invalid_url_format),
        feed_scenario!("duplicate-url", ["validation"], None, duplicate_url),
        feed_scenario!("edit-feed-name", [], None, edit_feed_name),
        feed_scenario!("delete-feed", [], None, delete_feed),
        feed_scenario!("cancel-delete", [], None, cancel_delete),
        feed_scenario!("search-partial-match", ["search"], None, search_partial_match),
        feed_scenario!("search-non-existing", ["search"], None, search_non_existing),
        feed_scenario!("filter-pending", ["filter"], None, filter_pending),
        feed_scenario!("filter-only-working-feeds", ["filter", "status"], SLOW, filter_only_working),
        feed_scenario!("reset-filter", ["filter"], None, reset_filter),
        feed_scenario!("status-pending-to-ok", ["status"], SLOW, status_pending_to_ok),
        feed_scenario!("fetch-error-handling", ["status"], SLOW, fetch_error_handling),
    ]
}

/// Narrow the list to `name`, add it and return the new row.
async fn add_searched_feed(feeds: &FeedPage, name: &str) -> E2eResult<FeedRef> {
    feeds.search_feeds(name).await?;
    feeds.add_feed(name, &feeds.feed_url_from_name(name)).await?;
    require(feeds.feed_by_name(name).await?, &format!("feed {:?} in the list", name))
}

async fn empty_state(cx: ScenarioContext) -> E2eResult<Outcome> {
    let feeds = cx.feeds();
    feeds.goto_feeds().await?;

    ensure!(feeds.is_empty_state_displayed().await?, "empty state not displayed");
    Ok(Outcome::Passed)
}

async fn add_feed_shows_pending(cx: ScenarioContext) -> E2eResult<Outcome> {
    let feeds = cx.feeds();
    feeds.goto_feeds().await?;

    let feed = add_searched_feed(&feeds, "E2E Test - Add New Feed").await?;
    ensure!(!feed.id.is_empty(), "feed row has no id");

    let status = feeds.feed_status(&feed.id).await?;
    ensure!(
        status.contains(FeedStatus::Pending.label()),
        "new feed status is {:?}",
        status
    );
    Ok(Outcome::Passed)
}

async fn name_required(cx: ScenarioContext) -> E2eResult<Outcome> {
    let feeds = cx.feeds();
    feeds.goto_feeds().await?;
    feeds.open_add_feed_form().await?;

    let url = feeds.feed_url_from_name("E2E Test - Name Validation");
    feeds.fill_feed_form("", &url).await?;
    feeds.submit_feed_form().await?;

    let message = feeds.wait_for_name_field_error().await?;
    ensure_matches("name field error", &message, "(required|cannot be empty)")?;
    Ok(Outcome::Passed)
}

async fn url_required(cx: ScenarioContext) -> E2eResult<Outcome> {
    let feeds = cx.feeds();
    feeds.goto_feeds().await?;
    feeds.open_add_feed_form().await?;

    feeds.fill_feed_form("E2E Test - URL Required Validation", "").await?;
    feeds.submit_feed_form().await?;

    let message = feeds.wait_for_url_field_error().await?;
    ensure_matches("url field error", &message, "(required|cannot be empty)")?;
    Ok(Outcome::Passed)
}

async fn invalid_url_format(cx: ScenarioContext) -> E2eResult<Outcome> {
    let feeds = cx.feeds();
    feeds.goto_feeds().await?;
    feeds.open_add_feed_form().await?;

    feeds
        .fill_feed_form("E2E Test - Invalid URL Format", "not-a-valid-url")
        .await?;
    feeds.submit_feed_form().await?;

    let message = feeds.wait_for_url_field_error().await?;
    ensure_matches("url field error", &message, "(invalid|valid url|https)")?;
    Ok(Outcome::Passed)
}

async fn duplicate_url(cx: ScenarioContext) -> E2eResult<Outcome> {
    let feeds = cx.feeds();
    feeds.goto_feeds().await?;

    let first = "E2E Test - Duplicate URL First";
    let url = feeds.feed_url_from_name(first);
    feeds.search_feeds(first).await?;
    feeds.add_feed(first, &url).await?;

    let second = "E2E Test - Duplicate URL Second";
    feeds.search_feeds(second).await?;
    feeds.open_add_feed_form().await?;
    feeds.fill_feed_form(second, &url).await?;
    feeds.submit_feed_form().await?;

    let message = feeds.wait_for_url_field_error().await?;
    ensure_matches("url field error", &message, "already")?;
    Ok(Outcome::Passed)
}

async fn edit_feed_name(cx: ScenarioContext) -> E2eResult<Outcome> {
    let feeds = cx.feeds();
    feeds.goto_feeds().await?;
    let feed = add_searched_feed(&feeds, "E2E Test - Edit Feed Name").await?;

    let renamed = "E2E Test - Edit Feed Name Updated";
    feeds.search_feeds(renamed).await?;
    feeds.edit_feed(&feed.id, Some(renamed), None).await?;

    ensure!(feeds.feed_exists(renamed).await?, "renamed feed not listed");
    Ok(Outcome::Passed)
}

async fn delete_feed(cx: ScenarioContext) -> E2eResult<Outcome> {
    let feeds = cx.feeds();
    feeds.goto_feeds().await?;
    let name = "E2E Test - Delete Feed";
    let feed = add_searched_feed(&feeds, name).await?;

    feeds.delete_feed(&feed.id).await?;

    feeds.search_feeds(name).await?;
    ensure!(!feeds.feed_exists(name).await?, "deleted feed still listed");
    Ok(Outcome::Passed)
}

async fn cancel_delete(cx: ScenarioContext) -> E2eResult<Outcome> {
    let feeds = cx.feeds();
    feeds.goto_feeds().await?;
    let name = "E2E Test - Cancel Delete";
    let feed = add_searched_feed(&feeds, name).await?;

    feeds
        .base
        .by_test_id(&format!("feed-delete-btn-{}", feed.id))
        .click()
        .await?;
    feeds.delete_confirmation.wait_visible().await?;
    feeds.close_delete_confirmation().await?;

    ensure!(feeds.feed_exists(name).await?, "feed vanished after cancelled delete");
    Ok(Outcome::Passed)
}

async fn search_partial_match(cx: ScenarioContext) -> E2eResult<Outcome> {
    let feeds = cx.feeds();
    feeds.goto_feeds().await?;

    let wanted = "E2E Test - Search By Name";
    let other = "E2E Test - Other Feed";
    let atom = feeds.fixtures().atom.clone();
    feeds.add_feed(wanted, &feeds.feed_url_from_name(wanted)).await?;
    feeds
        .add_feed(other, &crate::pages::feed::feed_url_from_name(other, &atom))
        .await?;

    feeds.search_feeds("Search By Name").await?;

    ensure!(feeds.feed_exists(wanted).await?, "partial search did not find {:?}", wanted);
    Ok(Outcome::Passed)
}

async fn search_non_existing(cx: ScenarioContext) -> E2eResult<Outcome> {
    let feeds = cx.feeds();
    feeds.goto_feeds().await?;

    let name = "E2E Test - Non Existing Search";
    feeds.add_feed(name, &feeds.feed_url_from_name(name)).await?;

    let query = "NonExistingFeedQuery12345XYZ";
    feeds.search_feeds(query).await?;

    ensure!(!feeds.feed_exists(query).await?, "search for {:?} returned a feed", query);
    Ok(Outcome::Passed)
}

async fn filter_pending(cx: ScenarioContext) -> E2eResult<Outcome> {
    let feeds = cx.feeds();
    feeds.goto_feeds().await?;
    let name = "E2E Test - Filter By Status";
    add_searched_feed(&feeds, name).await?;

    feeds.filter_by_status(StatusFilter::Pending).await?;

    ensure!(feeds.feed_exists(name).await?, "pending feed hidden by pending filter");
    Ok(Outcome::Passed)
}

async fn filter_only_working(cx: ScenarioContext) -> E2eResult<Outcome> {
    let feeds = cx.feeds();
    feeds.goto_feeds().await?;
    let name = "E2E Test - Filter By Status Only Working";
    let feed = add_searched_feed(&feeds, name).await?;

    feeds.wait_for_feed_status(&feed.id, FeedStatus::Ok).await?;
    feeds.filter_by_status(StatusFilter::Working).await?;

    ensure!(feeds.feed_exists(name).await?, "working feed hidden by working filter");
    Ok(Outcome::Passed)
}

async fn reset_filter(cx: ScenarioContext) -> E2eResult<Outcome> {
    let feeds = cx.feeds();
    feeds.goto_feeds().await?;
    let name = "E2E Test - Filter Reset To All";
    add_searched_feed(&feeds, name).await?;

    feeds.filter_by_status(StatusFilter::Pending).await?;
    ensure!(feeds.feed_exists(name).await?, "feed hidden by pending filter");

    feeds.filter_by_status(StatusFilter::All).await?;
    ensure!(feeds.feed_exists(name).await?, "feed hidden after resetting filter");
    Ok(Outcome::Passed)
}

async fn status_pending_to_ok(cx: ScenarioContext) -> E2eResult<Outcome> {
    let feeds = cx.feeds();
    feeds.goto_feeds().await?;
    let feed = add_searched_feed(&feeds, "E2E Test - Status Update Pending To OK").await?;

    let status = feeds.feed_status(&feed.id).await?;
    ensure!(status.contains(FeedStatus::Pending.label()), "initial status is {:?}", status);

    feeds.wait_for_feed_status(&feed.id, FeedStatus::Ok).await?;

    let status = feeds.feed_status(&feed.id).await?;
    ensure!(status.contains(FeedStatus::Ok.label()), "final status is {:?}", status);
    Ok(Outcome::Passed)
}

/// The fetcher may still be retrying the unreachable host when the wait
/// runs out; that is reported as a skip rather than a pass.
async fn fetch_error_handling(cx: ScenarioContext) -> E2eResult<Outcome> {
    let feeds = cx.feeds();
    feeds.goto_feeds().await?;
    let name = "E2E Test - Handle Fetch Errors";
    feeds.search_feeds(name).await?;
    feeds.add_feed(name, UNREACHABLE_FEED_URL).await?;
    let feed = require(feeds.feed_by_name(name).await?, "unreachable feed in the list")?;

    match feeds.wait_for_feed_status(&feed.id, FeedStatus::Error).await {
        Ok(_) => {
            let status = feeds.feed_status(&feed.id).await?;
            ensure!(status.contains(FeedStatus::Error.label()), "status is {:?}", status);
            Ok(Outcome::Passed)
        }
        Err(e) if e.is_deadline() => {
            info!("Feed {} never reported an error: {}", feed.id, e);
            Ok(Outcome::Skipped(format!("feed still not in error state: {}", e)))
        }
        Err(e) => Err(e),
    }
}
