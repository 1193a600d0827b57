use std::fmt::{Display, Formatter};

use chanview_types::post::{Media, PostNo};

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Endpoint {
    Boards,
    Catalog(String),
    Thread(String, PostNo),
}

impl Endpoint {
    const BASE_URL: &'static str = "a.4cdn.org";
    const MEDIA_URL: &'static str = "i.4cdn.org";

    pub fn http(&self) -> String {
        format!("http://{}", self)
    }

    pub fn https(&self) -> String {
        format!("https://{}", self)
    }

    pub fn url(&self, https: bool) -> String {
        if https {
            self.https()
        } else {
            self.http()
        }
    }

    /// Where the media host serves a post's attachment.
    pub fn media_url(board: &str, media: &Media, https: bool) -> String {
        format!(
            "{}://{}/{}/{}",
            if https { "https" } else { "http" },
            Self::MEDIA_URL,
            board,
            media.file_name()
        )
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Boards => write!(f, "{}/boards.json", Self::BASE_URL),
            Self::Catalog(board) => write!(f, "{}/{}/catalog.json", Self::BASE_URL, board),
            Self::Thread(board, thread_no) => {
                write!(f, "{}/{}/thread/{}.json", Self::BASE_URL, board, thread_no)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        assert_eq!(Endpoint::Boards.url(true), "https://a.4cdn.org/boards.json");
        assert_eq!(
            Endpoint::Catalog("g".to_string()).url(false),
            "http://a.4cdn.org/g/catalog.json"
        );
        assert_eq!(
            Endpoint::Thread("g".to_string(), 99566851).url(true),
            "https://a.4cdn.org/g/thread/99566851.json"
        );
        let media = Media {
            stem: 1709287200123,
            filename: None,
            ext: ".png".to_string(),
            width: None,
            height: None,
        };
        assert_eq!(
            Endpoint::media_url("g", &media, true),
            "https://i.4cdn.org/g/1709287200123.png"
        );
    }
}
