//! Series navigation document for the post currently being read.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::models::{Post, PostId, Series, SeriesId};
use crate::repo::Repo;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PostLink {
    pub id: PostId,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SeriesEntry {
    pub id: PostId,
    pub title: String,
    pub order_in_series: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SeriesInfo {
    pub id: SeriesId,
    pub title: String,
    pub current_post: SeriesEntry,
    pub prev_post: Option<PostLink>,
    pub next_post: Option<PostLink>,
    pub total_posts: usize,
    pub posts: Vec<SeriesEntry>,
    /// Percentage of the series read before the current post.
    pub progress: u8,
}

impl SeriesInfo {
    /// `posts` must be the published posts of `series` in reading order.
    /// Returns `None` when `current` is not among them.
    pub fn build(series: Series, posts: &[Post], current: PostId) -> Option<Self> {
        let idx = posts.iter().position(|p| p.id == current)?;
        let entries: Vec<SeriesEntry> = posts
            .iter()
            .enumerate()
            .map(|(i, p)| SeriesEntry {
                id: p.id,
                title: p.title.clone(),
                order_in_series: p.order_in_series.unwrap_or(i as i32 + 1),
            })
            .collect();
        let link = |p: &Post| PostLink { id: p.id, title: p.title.clone() };
        let current_post = entries[idx].clone();
        let total = entries.len();
        Some(Self {
            id: series.id,
            title: series.title,
            progress: progress(current_post.order_in_series, total),
            prev_post: idx.checked_sub(1).map(|i| link(&posts[i])),
            next_post: posts.get(idx + 1).map(link),
            current_post,
            total_posts: total,
            posts: entries,
        })
    }
}

fn progress(order: i32, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let done = order.saturating_sub(1).max(0) as f64;
    ((done / total as f64) * 100.0).round().clamp(0.0, 100.0) as u8
}

/// 404 unless the post exists, is published and belongs to a series.
pub async fn series_info(repo: &dyn Repo, post_id: PostId) -> Result<SeriesInfo, ApiError> {
    let post = repo.get_post(post_id).await?;
    let series_id = match (post.published, post.series_id) {
        (true, Some(id)) => id,
        _ => return Err(ApiError::NotFound),
    };
    let series = repo.get_series(series_id).await?;
    let posts = repo.list_series_posts(series_id).await?;
    SeriesInfo::build(series, &posts, post_id).ok_or(ApiError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn post(id: PostId, order: i32) -> Post {
        Post {
            id,
            title: format!("Part {order}"),
            content: String::new(),
            published: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            category_id: None,
            series_id: Some(1),
            order_in_series: Some(order),
        }
    }

    fn series() -> Series {
        Series { id: 1, title: "Rust from scratch".into() }
    }

    #[test]
    fn middle_post_has_both_neighbours() {
        let posts = vec![post(10, 1), post(11, 2), post(12, 3), post(13, 4)];
        let info = SeriesInfo::build(series(), &posts, 12).unwrap();
        assert_eq!(info.current_post.order_in_series, 3);
        assert_eq!(info.prev_post.unwrap().id, 11);
        assert_eq!(info.next_post.unwrap().id, 13);
        assert_eq!(info.total_posts, 4);
        assert_eq!(info.progress, 50);
    }

    #[test]
    fn first_and_last_post_edges() {
        let posts = vec![post(10, 1), post(11, 2), post(12, 3)];
        let first = SeriesInfo::build(series(), &posts, 10).unwrap();
        assert!(first.prev_post.is_none());
        assert_eq!(first.progress, 0);

        let last = SeriesInfo::build(series(), &posts, 12).unwrap();
        assert!(last.next_post.is_none());
        assert_eq!(last.progress, 67);
    }

    #[test]
    fn out_of_range_order_is_clamped() {
        let posts = vec![post(10, i32::MIN), post(11, i32::MAX)];
        let low = SeriesInfo::build(series(), &posts, 10).unwrap();
        assert_eq!(low.progress, 0);
        let high = SeriesInfo::build(series(), &posts, 11).unwrap();
        assert_eq!(high.progress, 100);
    }

    #[test]
    fn post_outside_series_yields_none() {
        let posts = vec![post(10, 1)];
        assert!(SeriesInfo::build(series(), &posts, 99).is_none());
    }
}
