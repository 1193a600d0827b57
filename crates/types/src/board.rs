use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Board {
    pub board: String,
    pub title: String,
    #[serde(default)]
    pub ws_board: i32,
    #[serde(default)]
    pub per_page: i32,
    #[serde(default)]
    pub pages: i32,
    #[serde(default)]
    pub bump_limit: i32,
    #[serde(default)]
    pub image_limit: i32,
    pub meta_description: Option<String>,
    pub is_archived: Option<i32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BoardsResponse {
    pub boards: Vec<Board>,
}

impl Board {
    pub fn name(&self) -> &str {
        &self.board
    }

    /// `[/g/] Technology`
    pub fn label(&self) -> String {
        format!("[/{}/] {}", self.board, self.title)
    }

    pub fn description(&self) -> &str {
        self.meta_description.as_deref().unwrap_or("No description")
    }

    fn matches(&self, query: &str) -> bool {
        self.board.to_lowercase().contains(query)
            || self.title.to_lowercase().contains(query)
            || self
                .meta_description
                .as_ref()
                .map_or(false, |d| d.to_lowercase().contains(query))
    }
}

/// Suggestions for a partially typed board query.
pub fn search<'a>(boards: &'a [Board], query: &str) -> Vec<&'a Board> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return vec![];
    }
    boards.iter().filter(|b| b.matches(&query)).collect()
}

/// Exact lookup by board code or title, ignoring case.
pub fn find<'a>(boards: &'a [Board], query: &str) -> Option<&'a Board> {
    let query = query.trim().to_lowercase();
    boards
        .iter()
        .find(|b| b.board == query || b.title.to_lowercase() == query)
}
