use std::sync::Arc;

use async_trait::async_trait;
use chanview_types::{board::Board, catalog::CatalogPage, post::{PostNo, Thread}};

use super::{client::Client, error::Error};

/// Where boards, catalogs and threads come from.
#[async_trait]
pub trait Source: Send + Sync {
    async fn boards(&self) -> Result<Arc<Vec<Board>>, Error>;

    /// Catalog pages in bump order.
    async fn catalog(&self, board: &str) -> Result<Arc<Vec<CatalogPage>>, Error>;

    /// All posts of a thread, OP first.
    async fn thread(&self, board: &str, no: PostNo) -> Result<Arc<Thread>, Error>;
}

#[async_trait]
impl Source for Client {
    async fn boards(&self) -> Result<Arc<Vec<Board>>, Error> {
        self.get_boards().await
    }

    async fn catalog(&self, board: &str) -> Result<Arc<Vec<CatalogPage>>, Error> {
        self.get_catalog(board).await
    }

    async fn thread(&self, board: &str, no: PostNo) -> Result<Arc<Thread>, Error> {
        self.get_thread(board, no).await
    }
}
