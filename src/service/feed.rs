//! Feed assembly
//!
//! Fan-out-on-read: the home feed is computed per request by querying the
//! newest posts of every followed author and merging them newest first.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use serde::Serialize;

use super::backfill::ProfileLookup;
use crate::config::FeedConfig;
use crate::data::{Direction, DocumentStore, Post, Query, collections, timestamp};
use crate::error::AppError;
use crate::metrics::FEED_FAN_OUT;

/// Position after the last post of a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedCursor {
    pub created_at: DateTime<Utc>,
    pub post_id: String,
}

impl FeedCursor {
    fn of(post: &Post) -> Self {
        Self {
            created_at: post.created_at,
            post_id: post.id.clone(),
        }
    }

    /// Opaque token handed to clients
    pub fn encode(&self) -> String {
        let raw = format!("{}:{}", self.created_at.timestamp_micros(), self.post_id);
        general_purpose::URL_SAFE_NO_PAD.encode(raw.as_bytes())
    }

    pub fn decode(token: &str) -> Result<Self, AppError> {
        let invalid = || AppError::validation("invalid feed cursor");

        let bytes = general_purpose::URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| invalid())?;
        let raw = String::from_utf8(bytes).map_err(|_| invalid())?;
        let (micros, post_id) = raw.split_once(':').ok_or_else(invalid)?;
        let micros: i64 = micros.parse().map_err(|_| invalid())?;
        let created_at = DateTime::from_timestamp_micros(micros).ok_or_else(invalid)?;
        if post_id.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            created_at,
            post_id: post_id.to_string(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage {
    pub posts: Vec<Post>,
    pub next_cursor: Option<String>,
}

/// One followed author's newest posts, newest first
struct AuthorRun {
    posts: Vec<Post>,
    /// The query hit its limit, so older posts may exist beyond this run
    saturated: bool,
}

/// Feed assembler
pub struct FeedAssembler {
    store: Arc<dyn DocumentStore>,
    config: FeedConfig,
}

impl FeedAssembler {
    pub fn new(store: Arc<dyn DocumentStore>, config: FeedConfig) -> Self {
        Self { store, config }
    }

    /// Home feed of `user_id`: posts by followed users, newest first
    ///
    /// # Arguments
    /// * `limit` - Page size (default `feed.default_page_size`, capped at
    ///   `feed.max_page_size`)
    /// * `cursor` - `nextCursor` from the previous page
    pub async fn home_feed(
        &self,
        user_id: &str,
        limit: Option<usize>,
        cursor: Option<&str>,
    ) -> Result<FeedPage, AppError> {
        let limit = limit
            .unwrap_or(self.config.default_page_size)
            .clamp(1, self.config.max_page_size);
        let cursor = cursor.map(FeedCursor::decode).transpose()?;

        let authors = self.resolve_authors(user_id).await?;
        FEED_FAN_OUT.observe(authors.len() as f64);
        if authors.is_empty() {
            return Ok(FeedPage {
                posts: Vec::new(),
                next_cursor: None,
            });
        }

        let per_author = self.config.per_author_limit.min(limit + 1);
        let runs = try_join_all(
            authors
                .iter()
                .map(|author| self.author_run(author, per_author, cursor.as_ref())),
        )
        .await?;

        let mut page = merge_runs(runs, limit);
        let mut lookup = ProfileLookup::new(self.store.clone());
        for post in &mut page.posts {
            let (username, avatar) = lookup
                .backfill(&post.user_id, post.username.as_deref(), post.avatar.as_deref())
                .await?;
            post.username = Some(username);
            post.avatar = Some(avatar);
        }
        tracing::debug!(
            user_id,
            authors = authors.len(),
            posts = page.posts.len(),
            "Feed assembled"
        );
        Ok(page)
    }

    /// Followed ids that still resolve to a user, capped at `max_fan_out`
    async fn resolve_authors(&self, user_id: &str) -> Result<Vec<String>, AppError> {
        let mut following: Vec<String> = self
            .store
            .query(&Query::collection(collections::following(user_id)))
            .await?
            .into_iter()
            .map(|document| document.id)
            .collect();

        if following.len() > self.config.max_fan_out {
            tracing::warn!(
                user_id,
                following = following.len(),
                max_fan_out = self.config.max_fan_out,
                "Feed fan-out truncated"
            );
            following.truncate(self.config.max_fan_out);
        }

        let profiles = try_join_all(
            following
                .iter()
                .map(|id| self.store.get(collections::USERS, id)),
        )
        .await?;

        Ok(profiles
            .into_iter()
            .flatten()
            .map(|document| document.id)
            .collect())
    }

    async fn author_run(
        &self,
        author_id: &str,
        limit: usize,
        cursor: Option<&FeedCursor>,
    ) -> Result<AuthorRun, AppError> {
        let mut query = Query::collection(collections::POSTS)
            .where_eq("userId", author_id)
            .order_by("createdAt", Direction::Descending)
            .limit(limit);
        if let Some(cursor) = cursor {
            query = query.start_after(timestamp::format(&cursor.created_at), cursor.post_id.clone());
        }

        let posts = self
            .store
            .query(&query)
            .await?
            .into_iter()
            .map(|document| document.decode::<Post>())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(AuthorRun {
            saturated: posts.len() == limit,
            posts,
        })
    }
}

/// k-way merge of newest-first runs by `(createdAt, id)` descending
///
/// Stops early once a saturated run is drained: its unseen posts could
/// sort before anything still queued.
fn merge_runs(runs: Vec<AuthorRun>, limit: usize) -> FeedPage {
    let mut runs: Vec<(std::vec::IntoIter<Post>, bool)> = runs
        .into_iter()
        .map(|run| (run.posts.into_iter(), run.saturated))
        .collect();

    let mut heap = BinaryHeap::new();
    let mut heads: Vec<Option<Post>> = Vec::with_capacity(runs.len());
    for (index, (run, _)) in runs.iter_mut().enumerate() {
        let head = run.next();
        if let Some(post) = &head {
            heap.push((post.created_at, post.id.clone(), Reverse(index)));
        }
        heads.push(head);
    }

    let mut posts = Vec::with_capacity(limit);
    let mut truncated = false;
    while let Some((_, _, Reverse(index))) = heap.pop() {
        let Some(post) = heads[index].take() else {
            continue;
        };
        posts.push(post);

        let (run, saturated) = &mut runs[index];
        match run.next() {
            Some(next) => {
                heap.push((next.created_at, next.id.clone(), Reverse(index)));
                heads[index] = Some(next);
            }
            None if *saturated => {
                truncated = true;
                break;
            }
            None => {}
        }

        if posts.len() == limit {
            break;
        }
    }

    let has_more = truncated || !heap.is_empty();
    let next_cursor = if has_more {
        posts.last().map(|post| FeedCursor::of(post).encode())
    } else {
        None
    };

    FeedPage { posts, next_cursor }
}
