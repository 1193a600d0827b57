use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::{Display, Formatter},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::post::PostNo;

/// A thread on a particular board, written `board:no`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ThreadKey {
    pub board: String,
    pub no: PostNo,
}

impl ThreadKey {
    pub fn new(board: impl Into<String>, no: PostNo) -> Self {
        ThreadKey {
            board: board.into(),
            no,
        }
    }
}

impl Display for ThreadKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.board, self.no)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Invalid thread key: {0}")]
pub struct ParseKeyError(String);

impl FromStr for ThreadKey {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (board, no) = s
            .rsplit_once(':')
            .ok_or_else(|| ParseKeyError(s.to_string()))?;
        let no = no.parse().map_err(|_| ParseKeyError(s.to_string()))?;
        if board.is_empty() {
            return Err(ParseKeyError(s.to_string()));
        }
        Ok(ThreadKey::new(board, no))
    }
}

impl TryFrom<String> for ThreadKey {
    type Error = ParseKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ThreadKey> for String {
    fn from(key: ThreadKey) -> Self {
        key.to_string()
    }
}

pub type PinnedSet = BTreeSet<ThreadKey>;
pub type TagAssignment = BTreeMap<ThreadKey, Vec<String>>;

/// The persisted user settings snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub hover_zoom: bool,
    pub autoplay: bool,
    pub high_contrast: bool,
    pub auto_refresh: bool,
    pub favorite_boards: Vec<String>,
    pub pinned_threads: PinnedSet,
    /// Tag catalog, in the order tags were defined.
    pub thread_tags: Vec<String>,
    pub tagged_threads: TagAssignment,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            hover_zoom: true,
            autoplay: true,
            high_contrast: false,
            auto_refresh: false,
            favorite_boards: vec![],
            pinned_threads: PinnedSet::new(),
            thread_tags: vec![],
            tagged_threads: TagAssignment::new(),
        }
    }
}
