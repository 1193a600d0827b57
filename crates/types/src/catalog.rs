use serde::{Deserialize, Serialize};

use super::post::Post;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CatalogPage {
    pub page: i32,
    pub threads: Vec<Post>,
}

/// Flattens the catalog pages into one list, keeping bump order.
pub fn threads(pages: &[CatalogPage]) -> impl Iterator<Item = &Post> {
    pages.iter().flat_map(|page| page.threads.iter())
}
