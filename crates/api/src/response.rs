use std::sync::Arc;

use super::endpoint::Endpoint;
use chanview_types::{
    board::{Board, BoardsResponse},
    catalog::CatalogPage,
    post::Thread,
};

#[derive(Debug, Clone)]
pub enum ClientResponse {
    Boards(Arc<Vec<Board>>),
    Catalog(Arc<Vec<CatalogPage>>),
    Thread(Arc<Thread>),
}

impl ClientResponse {
    pub async fn parse(
        endpoint: &Endpoint,
        resp: reqwest::Response,
    ) -> Result<Self, reqwest::Error> {
        match endpoint {
            Endpoint::Boards => Ok(ClientResponse::Boards(Arc::new(
                resp.json::<BoardsResponse>().await?.boards,
            ))),
            Endpoint::Catalog(_) => Ok(ClientResponse::Catalog(Arc::new(resp.json().await?))),
            Endpoint::Thread(_, _) => Ok(ClientResponse::Thread(Arc::new(resp.json().await?))),
        }
    }
}
