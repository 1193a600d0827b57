use chanview_types::{board::Board, catalog::CatalogPage, post::{PostNo, Thread}};
use chrono::{DateTime, Utc};
use tracing::{debug, error};

use super::{
    cache::ClientCache, endpoint::Endpoint, error::Error, rate_limit::RateLimitedClient,
    response::ClientResponse,
};
use std::sync::Arc;

fn http_date(time: DateTime<Utc>) -> String {
    time.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Configuration for the client.
/// use_https: Whether to use HTTPS for requests. (default: false)
/// max_retries: How often a failed request is retried. (default: 2)
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub use_https: Option<bool>,
    pub max_retries: Option<usize>,
}

impl Config {
    const DEFAULT_USE_HTTPS: bool = false;
    const DEFAULT_MAX_RETRIES: usize = 2;

    pub fn new(use_https: Option<bool>, max_retries: Option<usize>) -> Self {
        Config {
            use_https,
            max_retries,
        }
    }

    pub fn use_https(&self) -> bool {
        self.use_https.unwrap_or(Self::DEFAULT_USE_HTTPS)
    }

    pub fn max_retries(&self) -> usize {
        self.max_retries.unwrap_or(Self::DEFAULT_MAX_RETRIES)
    }
}

/// A client for the 4chan read API.
/// It follows the API rules from
/// https://github.com/4chan/4chan-API/blob/master/README.md
/// 1. No more than one request per second.
/// 2. Use If-Modified-Since when doing requests.
/// 3. Make API requests using the same protocol as the app.
#[derive(Debug, Clone)]
pub struct Client {
    cfg: Config,
    http: Arc<RateLimitedClient>,
    cache: Arc<ClientCache>,
}

impl Client {
    pub fn new(cfg: Option<Config>) -> Self {
        Self {
            cfg: cfg.unwrap_or_default(),
            http: Arc::new(RateLimitedClient::default()),
            cache: Arc::new(ClientCache::new()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    async fn new_request(
        &self,
        endpoint: &Endpoint,
        https: bool,
    ) -> Result<reqwest::Request, Error> {
        let url = endpoint
            .url(https)
            .parse::<reqwest::Url>()
            .map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let mut request = reqwest::Request::new(reqwest::Method::GET, url);
        if let Some(time) = self.cache.last_called(endpoint.clone()).await {
            match reqwest::header::HeaderValue::from_str(&http_date(time)) {
                Ok(value) => {
                    request
                        .headers_mut()
                        .insert(reqwest::header::IF_MODIFIED_SINCE, value);
                }
                Err(e) => debug!("Skipping If-Modified-Since for {}: {}", endpoint, e),
            }
        }
        Ok(request)
    }

    pub async fn get(&self, endpoint: &Endpoint, https: bool) -> Result<ClientResponse, Error> {
        debug!("Sending request to {}", endpoint.url(https));
        let request = self.new_request(endpoint, https).await?;
        let response = self.http.execute(request).await?;
        self.handle_response(endpoint, response).await
    }

    pub async fn get_with_retry(
        &self,
        endpoint: &Endpoint,
        https: bool,
    ) -> Result<ClientResponse, Error> {
        let mut retries: usize = 0;
        loop {
            tokio::time::sleep(std::time::Duration::from_secs(retries as u64)).await;
            match self.get(endpoint, https).await {
                Ok(resp) => return Ok(resp),
                Err(e) if e.is_not_found() => return Err(e),
                Err(e) => {
                    if retries >= self.cfg.max_retries() {
                        error!("Giving up on {}: {}", endpoint, e);
                        return Err(e);
                    }
                    error!(
                        "Error getting {}: {}, retrying {} more times",
                        endpoint,
                        e,
                        self.cfg.max_retries() - retries,
                    );
                    retries += 1;
                }
            }
        }
    }

    pub async fn handle_response(
        &self,
        endpoint: &Endpoint,
        resp: reqwest::Response,
    ) -> Result<ClientResponse, Error> {
        match resp.status() {
            reqwest::StatusCode::OK => {
                debug!("request: {} status: OK", endpoint);
                let parsed = ClientResponse::parse(endpoint, resp).await?;
                self.cache.update(endpoint.clone(), parsed.clone()).await;
                Ok(parsed)
            }
            reqwest::StatusCode::NOT_MODIFIED => {
                debug!("request: {} status: NOT_MODIFIED", endpoint);
                self.cache
                    .last_response(endpoint.clone())
                    .await
                    .ok_or(Error::NoCachedResponse)
            }
            status => {
                error!("request {} status: {}", endpoint, status);
                Err(Error::StatusCode(status.as_u16()))
            }
        }
    }

    pub async fn get_boards(&self) -> Result<Arc<Vec<Board>>, Error> {
        match self
            .get_with_retry(&Endpoint::Boards, self.cfg.use_https())
            .await?
        {
            ClientResponse::Boards(boards) => Ok(boards),
            _ => Err(Error::InvalidResponse),
        }
    }

    pub async fn get_catalog(&self, board: &str) -> Result<Arc<Vec<CatalogPage>>, Error> {
        match self
            .get_with_retry(&Endpoint::Catalog(board.to_string()), self.cfg.use_https())
            .await?
        {
            ClientResponse::Catalog(catalog) => Ok(catalog),
            _ => Err(Error::InvalidResponse),
        }
    }

    pub async fn get_thread(&self, board: &str, no: PostNo) -> Result<Arc<Thread>, Error> {
        match self
            .get_with_retry(&Endpoint::Thread(board.to_string(), no), self.cfg.use_https())
            .await?
        {
            ClientResponse::Thread(thread) => Ok(thread),
            _ => Err(Error::InvalidResponse),
        }
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new(None)
    }
}
