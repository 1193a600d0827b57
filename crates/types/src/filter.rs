use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use serde::Serialize;

use crate::{
    post::{Media, Post, PostNo},
    settings::{PinnedSet, TagAssignment, ThreadKey},
    utils,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum MediaFilter {
    #[default]
    All,
    Images,
    Videos,
}

impl MediaFilter {
    fn admits(&self, media: Option<&Media>) -> bool {
        match (self, media) {
            (MediaFilter::All, _) => true,
            (MediaFilter::Images, Some(media)) => media.is_image(),
            (MediaFilter::Videos, Some(media)) => media.is_video(),
            (_, None) => false,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum SortKey {
    /// Catalog order as served, i.e. last bump first.
    #[default]
    Bump,
    Replies,
    Recent,
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown option: {0}")]
pub struct UnknownOption(String);

impl FromStr for MediaFilter {
    type Err = UnknownOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(MediaFilter::All),
            "images" => Ok(MediaFilter::Images),
            "videos" => Ok(MediaFilter::Videos),
            _ => Err(UnknownOption(s.to_string())),
        }
    }
}

impl Display for MediaFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            MediaFilter::All => "all",
            MediaFilter::Images => "images",
            MediaFilter::Videos => "videos",
        })
    }
}

impl FromStr for SortKey {
    type Err = UnknownOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bump" => Ok(SortKey::Bump),
            "replies" => Ok(SortKey::Replies),
            "recent" => Ok(SortKey::Recent),
            _ => Err(UnknownOption(s.to_string())),
        }
    }
}

impl Display for SortKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SortKey::Bump => "bump",
            SortKey::Replies => "replies",
            SortKey::Recent => "recent",
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CatalogQuery {
    pub filter: String,
    pub media: MediaFilter,
    pub sort: SortKey,
}

/// A reply shown under a catalog entry.
#[derive(Clone, Debug, Serialize)]
pub struct ReplyPreview {
    pub no: PostNo,
    pub author: String,
    pub time: i64,
    pub posted: String,
    pub excerpt: String,
    pub media: Option<String>,
}

impl ReplyPreview {
    const EXCERPT_CHARS: usize = 50;

    pub fn from_post(post: &Post) -> Self {
        ReplyPreview {
            no: post.no,
            author: post.author().to_string(),
            time: post.time,
            posted: utils::format_timestamp(post.time),
            excerpt: post.comment().preview(Self::EXCERPT_CHARS),
            media: post.media().map(|m| m.file_name()),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ThreadSummary {
    pub no: PostNo,
    pub board: String,
    pub title: String,
    pub subject: Option<String>,
    pub author: String,
    pub posted: String,
    pub preview: String,
    pub replies: u32,
    pub images: u32,
    pub last_modified: i64,
    #[serde(skip)]
    pub media: Option<Media>,
    pub pinned: bool,
    pub sticky: bool,
    pub closed: bool,
    pub tags: Vec<String>,
    pub recent_replies: Vec<ReplyPreview>,
}

impl ThreadSummary {
    pub fn key(&self) -> ThreadKey {
        ThreadKey::new(self.board.clone(), self.no)
    }

    fn new(thread: &Post, board: &str, pins: &PinnedSet, tags: &TagAssignment) -> Self {
        let key = ThreadKey::new(board, thread.no);
        ThreadSummary {
            no: thread.no,
            board: board.to_string(),
            title: thread.title(),
            subject: thread.subject().map(str::to_string),
            author: thread.author().to_string(),
            posted: utils::format_timestamp(thread.time),
            preview: utils::preview_text(thread.com.as_deref()),
            replies: thread.reply_count(),
            images: thread.image_count(),
            last_modified: thread.last_modified.unwrap_or(0),
            media: thread.media(),
            pinned: pins.contains(&key),
            sticky: thread.is_sticky(),
            closed: thread.is_closed(),
            tags: tags.get(&key).cloned().unwrap_or_default(),
            recent_replies: vec![],
        }
    }
}

fn matches_text(thread: &Post, needle: &str) -> bool {
    thread
        .subject()
        .map_or(false, |s| s.to_lowercase().contains(needle))
        || thread
            .comment()
            .plain_text()
            .to_lowercase()
            .contains(needle)
}

/// Filters, sorts and pins catalog threads for display.
pub fn apply<'a>(
    threads: impl IntoIterator<Item = &'a Post>,
    board: &str,
    query: &CatalogQuery,
    pins: &PinnedSet,
    tags: &TagAssignment,
) -> Vec<ThreadSummary> {
    let needle = query.filter.trim().to_lowercase();
    let mut selected: Vec<&Post> = threads
        .into_iter()
        .filter(|t| needle.is_empty() || matches_text(t, &needle))
        .filter(|t| query.media.admits(t.media().as_ref()))
        .collect();

    // sort_by is stable, so ties keep catalog order.
    match query.sort {
        SortKey::Bump => {}
        SortKey::Replies => selected.sort_by(|a, b| b.reply_count().cmp(&a.reply_count())),
        SortKey::Recent => selected.sort_by(|a, b| {
            b.last_modified
                .unwrap_or(0)
                .cmp(&a.last_modified.unwrap_or(0))
        }),
    }

    let (pinned, unpinned): (Vec<ThreadSummary>, Vec<ThreadSummary>) = selected
        .into_iter()
        .map(|t| ThreadSummary::new(t, board, pins, tags))
        .partition(|summary| summary.pinned);
    pinned.into_iter().chain(unpinned).collect()
}
