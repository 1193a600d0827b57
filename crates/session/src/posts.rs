use std::{collections::HashMap, num::NonZeroUsize, sync::Arc};

use chanview_types::{
    filter::ReplyPreview,
    post::{PostNo, Thread},
    settings::ThreadKey,
};
use lru::LruCache;
use tracing::debug;

/// Thread posts fetched for catalog previews, per board. Only the most
/// recently used boards are kept.
#[derive(Debug)]
pub struct PostStore {
    boards: LruCache<String, HashMap<PostNo, Arc<Thread>>>,
}

impl PostStore {
    pub fn new(capacity: NonZeroUsize) -> Self {
        PostStore {
            boards: LruCache::new(capacity),
        }
    }

    /// Drops whatever was stored for `board` and keeps `threads` instead.
    pub fn replace_board(&mut self, board: &str, threads: Vec<Arc<Thread>>) {
        let entries: HashMap<PostNo, Arc<Thread>> = threads
            .into_iter()
            .filter_map(|thread| thread.no().map(|no| (no, thread)))
            .collect();
        debug!("Caching {} threads for /{}/", entries.len(), board);
        if let Some((evicted, _)) = self.boards.push(board.to_string(), entries) {
            if evicted != board {
                debug!("Evicted cached posts for /{}/", evicted);
            }
        }
    }

    pub fn insert(&mut self, board: &str, thread: Arc<Thread>) {
        let Some(no) = thread.no() else {
            return;
        };
        match self.boards.get_mut(board) {
            Some(entries) => {
                entries.insert(no, thread);
            }
            None => self.replace_board(board, vec![thread]),
        }
    }

    /// Looks a thread up without touching the board's recency.
    pub fn peek(&self, key: &ThreadKey) -> Option<&Arc<Thread>> {
        self.boards.peek(&key.board)?.get(&key.no)
    }

    pub fn get(&mut self, key: &ThreadKey) -> Option<&Arc<Thread>> {
        self.boards.get(&key.board)?.get(&key.no)
    }

    /// The last `n` replies of a cached thread, oldest first.
    pub fn recent_replies(&self, key: &ThreadKey, n: usize) -> Vec<ReplyPreview> {
        let Some(thread) = self.peek(key) else {
            return vec![];
        };
        let replies = thread.posts.get(1..).unwrap_or(&[]);
        replies[replies.len().saturating_sub(n)..]
            .iter()
            .map(ReplyPreview::from_post)
            .collect()
    }

    pub fn boards(&self) -> Vec<&str> {
        self.boards.iter().map(|(board, _)| board.as_str()).collect()
    }

    pub fn contains_board(&self, board: &str) -> bool {
        self.boards.contains(board)
    }
}
