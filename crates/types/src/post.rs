use serde::{Deserialize, Serialize};

use crate::comment::{self, Comment};

/// Post numbers are unique per board; the OP's number is the thread number.
pub type PostNo = u64;

pub const DEFAULT_AUTHOR: &str = "Anonymous";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Thread {
    pub posts: Vec<Post>,
}

impl Thread {
    pub fn op(&self) -> Option<&Post> {
        self.posts.first()
    }

    pub fn no(&self) -> Option<PostNo> {
        self.op().map(|op| op.no)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Post {
    pub no: PostNo,
    #[serde(default)]
    pub resto: PostNo,
    pub sticky: Option<i32>,
    pub closed: Option<i32>,
    pub name: Option<String>,
    pub sub: Option<String>,
    pub com: Option<String>,
    pub capcode: Option<String>,
    #[serde(default)]
    pub time: i64,
    pub tim: Option<i64>,
    pub filename: Option<String>,
    pub ext: Option<String>,
    pub w: Option<u32>,
    pub h: Option<u32>,
    pub fsize: Option<u64>,
    pub replies: Option<u32>,
    pub images: Option<u32>,
    pub omitted_posts: Option<u32>,
    pub omitted_images: Option<u32>,
    pub last_modified: Option<i64>,
    pub last_replies: Option<Vec<Post>>,
}

/// An attachment as the API describes it. `stem` is the server-side file
/// name (`tim`) the media host serves it under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Media {
    pub stem: i64,
    pub filename: Option<String>,
    pub ext: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl Media {
    pub fn file_name(&self) -> String {
        format!("{}{}", self.stem, self.ext)
    }

    fn ext_lowercase(&self) -> String {
        self.ext.trim_start_matches('.').to_ascii_lowercase()
    }

    pub fn is_image(&self) -> bool {
        matches!(self.ext_lowercase().as_str(), "jpg" | "png" | "gif")
    }

    pub fn is_video(&self) -> bool {
        matches!(self.ext_lowercase().as_str(), "mp4" | "webm")
    }
}

impl Post {
    pub fn is_op(&self) -> bool {
        self.resto == 0
    }

    pub fn is_reply(&self) -> bool {
        !self.is_op()
    }

    pub fn thread_no(&self) -> PostNo {
        if self.resto != 0 {
            self.resto
        } else {
            self.no
        }
    }

    pub fn is_sticky(&self) -> bool {
        self.sticky.map_or(false, |s| s != 0)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.map_or(false, |c| c != 0)
    }

    pub fn author(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => DEFAULT_AUTHOR,
        }
    }

    pub fn subject(&self) -> Option<&str> {
        self.sub.as_deref().filter(|s| !s.is_empty())
    }

    /// Subject line, or the generic `Thread #<no>` heading.
    pub fn title(&self) -> String {
        match self.subject() {
            Some(sub) => sub.to_string(),
            None => format!("Thread #{}", self.no),
        }
    }

    pub fn media(&self) -> Option<Media> {
        match (self.tim, self.ext.as_ref()) {
            (Some(stem), Some(ext)) if !ext.is_empty() => Some(Media {
                stem,
                filename: self.filename.clone(),
                ext: ext.clone(),
                width: self.w,
                height: self.h,
            }),
            _ => None,
        }
    }

    pub fn has_media(&self) -> bool {
        self.media().is_some()
    }

    pub fn reply_count(&self) -> u32 {
        self.replies.unwrap_or(0)
    }

    pub fn image_count(&self) -> u32 {
        self.images.unwrap_or(0)
    }

    pub fn comment(&self) -> Comment {
        comment::sanitize(self.com.as_deref())
    }

    pub fn quotes(&self) -> Vec<PostNo> {
        self.comment().references().collect()
    }
}

impl PartialEq for Post {
    fn eq(&self, other: &Self) -> bool {
        self.no == other.no
    }
}

impl Eq for Post {}

impl PartialOrd for Post {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Post {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.no.cmp(&other.no)
    }
}

#[cfg(test)]
pub(crate) fn post(no: PostNo, com: Option<&str>) -> Post {
    Post {
        no,
        com: com.map(str::to_string),
        ..Default::default()
    }
}
