//! Read-only feeds: the daily schedule and the news.

use chrono::{Datelike, Days, NaiveDate};
use schoolhub_protocol::{Endpoint, Lesson, NewsFeed, NewsItem};
use schoolhub_session::TokenStorage;
use schoolhub_transport::Transport;

use crate::ClientError;
use crate::client::Api;

pub(crate) async fn schedule<T: Transport, S: TokenStorage>(
    api: &Api<T, S>,
    date: NaiveDate,
) -> Result<Vec<Lesson>, ClientError> {
    match api.fetch::<Vec<Lesson>>(&Endpoint::schedule(date)).await {
        Ok(lessons) => {
            tracing::debug!(%date, count = lessons.len(), "schedule loaded");
            Ok(lessons)
        }
        Err(e) => {
            api.report_failure("Failed to load schedule", &e);
            Err(e)
        }
    }
}

pub(crate) async fn news<T: Transport, S: TokenStorage>(
    api: &Api<T, S>,
    feed: NewsFeed,
) -> Result<Vec<NewsItem>, ClientError> {
    match api.fetch::<Vec<NewsItem>>(&Endpoint::news(feed)).await {
        Ok(items) => {
            tracing::debug!(%feed, count = items.len(), "news loaded");
            Ok(items)
        }
        Err(e) => {
            api.report_failure("Failed to load news", &e);
            Err(e)
        }
    }
}

/// The Monday-to-Sunday week containing `date`, for the day picker.
pub fn week_of(date: NaiveDate) -> [NaiveDate; 7] {
    let offset = u64::from(date.weekday().num_days_from_monday());
    let monday = date.checked_sub_days(Days::new(offset)).unwrap_or(date);
    std::array::from_fn(|i| {
        monday
            .checked_add_days(Days::new(i as u64))
            .unwrap_or(monday)
    })
}
