use std::sync::Arc;

use chanview_api::{endpoint::Endpoint, error::Error as ApiError, source::Source};
use chanview_types::{
    board::{self, Board},
    catalog::{self, CatalogPage},
    filter::{self, CatalogQuery, MediaFilter, SortKey, ThreadSummary},
    post::{Post, PostNo, Thread},
    preview::{Positioner, Size},
    settings::{Settings, ThreadKey},
    tree::{ReplyNode, ReplyTree},
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::{
    config::Config,
    error::Error,
    hover::{HoverContent, HoverPreview},
    posts::PostStore,
    schedule::Debouncer,
    settings::SettingsStore,
    tags::TagStore,
    worker::{self, RefreshHandle},
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum View {
    #[default]
    Boards,
    Catalog {
        board: String,
    },
    Thread {
        board: String,
        no: PostNo,
    },
}

impl View {
    pub fn board(&self) -> Option<&str> {
        match self {
            View::Boards => None,
            View::Catalog { board } | View::Thread { board, .. } => Some(board),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Ready,
    Unavailable(String),
}

/// Identifies a fetch: the view it was made for and when it was issued.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ticket {
    seq: u64,
    view: View,
}

/// A catalog plus the threads fetched for its reply previews.
#[derive(Debug)]
pub struct CatalogFetch {
    pub pages: Arc<Vec<CatalogPage>>,
    pub threads: Vec<Arc<Thread>>,
}

#[derive(Debug)]
pub enum Event {
    CatalogLoaded {
        ticket: Ticket,
        result: Result<CatalogFetch, ApiError>,
    },
    ThreadLoaded {
        ticket: Ticket,
        result: Result<Arc<Thread>, ApiError>,
    },
    RefreshDue {
        board: String,
    },
    FilterSettled {
        board: String,
    },
}

/// What changed after an [`Event`] was applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Update {
    Catalog,
    Thread,
    Loading,
    Unavailable(String),
    /// The event no longer matched the current view and was dropped.
    Stale,
}

async fn filter_settled(events_tx: mpsc::Sender<Event>, board: String) {
    let event = Event::FilterSettled {
        board: board.clone(),
    };
    if events_tx.send(event).await.is_err() {
        debug!("Browser gone before filter for /{}/ settled", board);
    }
}

/// Fetches a catalog, then the first `limit` of its threads one at a time
/// for reply previews. A thread that fails to load is skipped.
pub async fn fetch_catalog_with_previews<S: Source + ?Sized>(
    source: &S,
    board: &str,
    limit: usize,
) -> Result<CatalogFetch, ApiError> {
    let pages = source.catalog(board).await?;
    let nos: Vec<PostNo> = catalog::threads(&pages).take(limit).map(|t| t.no).collect();
    let mut threads = Vec::with_capacity(nos.len());
    for no in nos {
        match source.thread(board, no).await {
            Ok(thread) => threads.push(thread),
            Err(e) => warn!("Skipping reply previews for /{}/{}: {}", board, no, e),
        }
    }
    Ok(CatalogFetch { pages, threads })
}

/// Session state of the browsing client.
///
/// The browser is the only writer of its state. Fetches run as spawned
/// tasks and report back as [`Event`]s, which are applied in
/// [`Browser::next_update`]. A result is applied only while the view it
/// was fetched for is still current and nothing newer was applied.
pub struct Browser<S, P> {
    cfg: Config,
    source: Arc<S>,
    tags: TagStore<P>,
    posts: PostStore,
    boards: Arc<Vec<Board>>,

    view: View,
    query: CatalogQuery,
    catalog: Option<(String, Arc<Vec<CatalogPage>>)>,
    listing: Vec<ThreadSummary>,
    thread: Option<ReplyTree>,
    state: LoadState,

    next_seq: u64,
    applied_seq: u64,
    events_tx: mpsc::Sender<Event>,
    events_rx: mpsc::Receiver<Event>,

    refresh: Option<RefreshHandle>,
    filter_debounce: Debouncer,
}

impl<S, P> Browser<S, P>
where
    S: Source + 'static,
    P: SettingsStore,
{
    pub fn new(cfg: Config, source: Arc<S>, store: P) -> Self {
        let (events_tx, events_rx) = mpsc::channel(100);
        Browser {
            tags: TagStore::load(store),
            posts: PostStore::new(cfg.cached_boards()),
            filter_debounce: Debouncer::new(cfg.filter_debounce()),
            cfg,
            source,
            boards: Arc::new(vec![]),
            view: View::Boards,
            query: CatalogQuery::default(),
            catalog: None,
            listing: vec![],
            thread: None,
            state: LoadState::Idle,
            next_seq: 0,
            applied_seq: 0,
            events_tx,
            events_rx,
            refresh: None,
        }
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn query(&self) -> &CatalogQuery {
        &self.query
    }

    pub fn listing(&self) -> &[ThreadSummary] {
        &self.listing
    }

    pub fn thread(&self) -> Option<&ReplyTree> {
        self.thread.as_ref()
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn settings(&self) -> &Settings {
        self.tags.settings()
    }

    pub fn tags(&self) -> &TagStore<P> {
        &self.tags
    }

    pub fn posts(&self) -> &PostStore {
        &self.posts
    }

    pub fn is_refreshing(&self) -> bool {
        self.refresh.as_ref().map_or(false, RefreshHandle::is_running)
    }

    fn current_board(&self) -> Result<String, Error> {
        self.view.board().map(str::to_string).ok_or(Error::NoBoard)
    }

    /// Switches views; anything fetched for an earlier view is stale from
    /// here on.
    fn navigate(&mut self, view: View) {
        debug!("Navigating to {:?}", view);
        self.refresh = None;
        self.filter_debounce.cancel();
        self.view = view;
        self.applied_seq = self.next_seq;
    }

    fn ticket(&mut self) -> Ticket {
        self.next_seq += 1;
        Ticket {
            seq: self.next_seq,
            view: self.view.clone(),
        }
    }

    fn is_current(&self, ticket: &Ticket) -> bool {
        ticket.view == self.view && ticket.seq > self.applied_seq
    }

    fn start_refresh(&mut self) {
        if let View::Catalog { board } = &self.view {
            if self.refresh.as_ref().map(RefreshHandle::board) != Some(board.as_str()) {
                self.refresh = Some(worker::start(
                    board,
                    self.cfg.refresh_interval(),
                    self.events_tx.clone(),
                ));
            }
        }
    }

    fn fetch_catalog(&mut self) -> Result<(), Error> {
        let View::Catalog { board } = &self.view else {
            return Err(Error::NoBoard);
        };
        let board = board.clone();
        let ticket = self.ticket();
        let source = self.source.clone();
        let events_tx = self.events_tx.clone();
        let limit = self.cfg.preview_threads();
        self.state = LoadState::Loading;
        info!("Fetching catalog for /{}/", board);
        tokio::spawn(async move {
            let result = fetch_catalog_with_previews(source.as_ref(), &board, limit).await;
            if events_tx
                .send(Event::CatalogLoaded { ticket, result })
                .await
                .is_err()
            {
                debug!("Browser gone before catalog for /{}/ arrived", board);
            }
        });
        Ok(())
    }

    fn fetch_thread(&mut self) -> Result<(), Error> {
        let View::Thread { board, no } = &self.view else {
            return Err(Error::NoBoard);
        };
        let (board, no) = (board.clone(), *no);
        let ticket = self.ticket();
        let source = self.source.clone();
        let events_tx = self.events_tx.clone();
        self.state = LoadState::Loading;
        info!("Fetching thread /{}/{}", board, no);
        tokio::spawn(async move {
            let result = source.thread(&board, no).await;
            if events_tx
                .send(Event::ThreadLoaded { ticket, result })
                .await
                .is_err()
            {
                debug!("Browser gone before thread /{}/{} arrived", board, no);
            }
        });
        Ok(())
    }

    /// Shows a board's catalog and starts auto-refresh if it is enabled.
    pub fn open_board(&mut self, board: &str) -> Result<(), Error> {
        let board = board.trim().trim_matches('/');
        if board.is_empty() {
            return Err(Error::NoBoard);
        }
        if self.catalog.as_ref().map(|(b, _)| b.as_str()) != Some(board) {
            self.catalog = None;
            self.listing.clear();
        }
        self.thread = None;
        self.navigate(View::Catalog {
            board: board.to_string(),
        });
        self.fetch_catalog()?;
        if self.tags.settings().auto_refresh {
            self.start_refresh();
        }
        Ok(())
    }

    /// Opens a thread of the current board. Auto-refresh stops while a
    /// thread is open.
    pub fn open_thread(&mut self, no: PostNo) -> Result<(), Error> {
        let board = self.current_board()?;
        self.thread = None;
        self.navigate(View::Thread { board, no });
        self.fetch_thread()
    }

    pub fn back_to_catalog(&mut self) -> Result<(), Error> {
        let board = self.current_board()?;
        self.thread = None;
        self.navigate(View::Catalog {
            board: board.clone(),
        });
        if self.catalog.as_ref().map(|(b, _)| b.as_str()) == Some(board.as_str()) {
            self.rebuild_listing();
            self.state = LoadState::Ready;
        } else {
            self.fetch_catalog()?;
        }
        if self.tags.settings().auto_refresh {
            self.start_refresh();
        }
        Ok(())
    }

    /// Sets the text filter. The catalog is refetched once typing pauses.
    pub fn set_filter_text(&mut self, text: &str) {
        self.query.filter = text.to_string();
        let View::Catalog { board } = &self.view else {
            return;
        };
        let events_tx = self.events_tx.clone();
        let board = board.clone();
        self.filter_debounce.schedule(filter_settled(events_tx, board));
    }

    pub fn set_sort(&mut self, sort: SortKey) -> Result<(), Error> {
        self.query.sort = sort;
        self.requery()
    }

    pub fn set_media(&mut self, media: MediaFilter) -> Result<(), Error> {
        self.query.media = media;
        self.requery()
    }

    fn requery(&mut self) -> Result<(), Error> {
        if !matches!(self.view, View::Catalog { .. }) {
            return Ok(());
        }
        self.filter_debounce.cancel();
        self.fetch_catalog()
    }

    /// Fetches the current catalog or thread again.
    pub fn refresh(&mut self) -> Result<(), Error> {
        match self.view {
            View::Catalog { .. } => self.fetch_catalog(),
            View::Thread { .. } => self.fetch_thread(),
            View::Boards => Err(Error::NoBoard),
        }
    }

    fn rebuild_listing(&mut self) {
        let Some((board, pages)) = &self.catalog else {
            return;
        };
        let mut listing = filter::apply(
            catalog::threads(pages),
            board,
            &self.query,
            self.tags.pinned(),
            self.tags.assignments(),
        );
        for summary in listing.iter_mut() {
            summary.recent_replies = self
                .posts
                .recent_replies(&summary.key(), self.cfg.recent_replies());
        }
        self.listing = listing;
    }

    fn key(&self, no: PostNo) -> Result<ThreadKey, Error> {
        Ok(ThreadKey::new(self.current_board()?, no))
    }

    /// Pins or unpins a thread of the current board. The listing is
    /// reordered even when saving fails.
    pub fn toggle_pin(&mut self, no: PostNo) -> Result<bool, Error> {
        let key = self.key(no)?;
        let result = self.tags.toggle_pin(&key);
        self.rebuild_listing();
        result
    }

    pub fn toggle_tag(&mut self, no: PostNo, tag: &str) -> Result<bool, Error> {
        let key = self.key(no)?;
        let result = self.tags.toggle_tag(&key, tag);
        self.rebuild_listing();
        result
    }

    pub fn define_tag(&mut self, tag: &str) -> Result<bool, Error> {
        self.tags.define_tag(tag)
    }

    pub fn delete_tag(&mut self, tag: &str) -> Result<bool, Error> {
        let result = self.tags.delete_tag(tag);
        self.rebuild_listing();
        result
    }

    pub fn set_auto_refresh(&mut self, on: bool) -> Result<(), Error> {
        let result = self.tags.set_auto_refresh(on);
        if on {
            self.start_refresh();
        } else {
            self.refresh = None;
        }
        result
    }

    pub fn set_hover_zoom(&mut self, on: bool) -> Result<(), Error> {
        self.tags.set_hover_zoom(on)
    }

    pub fn set_autoplay(&mut self, on: bool) -> Result<(), Error> {
        self.tags.set_autoplay(on)
    }

    pub fn set_high_contrast(&mut self, on: bool) -> Result<(), Error> {
        self.tags.set_high_contrast(on)
    }

    /// Waits for the next fetch, refresh tick or settled filter and applies it.
    pub async fn next_update(&mut self) -> Option<Update> {
        let event = self.events_rx.recv().await?;
        Some(self.apply(event))
    }

    pub fn apply(&mut self, event: Event) -> Update {
        match event {
            Event::CatalogLoaded { ticket, result } => {
                if !self.is_current(&ticket) {
                    debug!("Dropping stale catalog for {:?}", ticket.view);
                    return Update::Stale;
                }
                self.applied_seq = ticket.seq;
                let View::Catalog { board } = ticket.view else {
                    return Update::Stale;
                };
                match result {
                    Ok(fetch) => {
                        self.posts.replace_board(&board, fetch.threads);
                        self.catalog = Some((board, fetch.pages));
                        self.rebuild_listing();
                        self.state = LoadState::Ready;
                        Update::Catalog
                    }
                    Err(e) => self.unavailable(e),
                }
            }
            Event::ThreadLoaded { ticket, result } => {
                if !self.is_current(&ticket) {
                    debug!("Dropping stale thread for {:?}", ticket.view);
                    return Update::Stale;
                }
                self.applied_seq = ticket.seq;
                let View::Thread { board, .. } = ticket.view else {
                    return Update::Stale;
                };
                match result {
                    Ok(thread) => {
                        self.posts.insert(&board, thread.clone());
                        self.thread = Some(ReplyTree::build(thread.posts.clone()));
                        self.state = LoadState::Ready;
                        Update::Thread
                    }
                    Err(e) => self.unavailable(e),
                }
            }
            Event::RefreshDue { board } | Event::FilterSettled { board } => {
                match &self.view {
                    View::Catalog { board: current } if *current == board => {}
                    _ => {
                        debug!("Ignoring refresh for /{}/", board);
                        return Update::Stale;
                    }
                }
                match self.fetch_catalog() {
                    Ok(()) => Update::Loading,
                    Err(_) => Update::Stale,
                }
            }
        }
    }

    fn unavailable(&mut self, e: ApiError) -> Update {
        error!("Unable to load {:?}: {}", self.view, e);
        let reason = e.to_string();
        self.state = LoadState::Unavailable(reason.clone());
        Update::Unavailable(reason)
    }

    pub async fn load_boards(&mut self) -> Result<(), Error> {
        self.boards = self.source.boards().await?;
        info!("Loaded {} boards", self.boards.len());
        Ok(())
    }

    pub fn boards(&self) -> &[Board] {
        &self.boards
    }

    /// Favorite boards first, in the order they were added, then all boards.
    pub fn board_directory(&self) -> Vec<&Board> {
        let favorites = self
            .settings()
            .favorite_boards
            .iter()
            .filter_map(|name| self.boards.iter().find(|b| b.name() == name));
        favorites.chain(self.boards.iter()).collect()
    }

    pub fn search_boards(&self, query: &str) -> Vec<&Board> {
        board::search(&self.boards, query)
    }

    pub fn find_board(&self, query: &str) -> Option<&Board> {
        board::find(&self.boards, query)
    }

    pub fn toggle_favorite_board(&mut self, board: &str) -> Result<bool, Error> {
        self.tags.toggle_favorite_board(board)
    }

    fn find_post(&self, no: PostNo) -> Option<&Post> {
        if let Some(node) = self.thread.as_ref().and_then(|t| t.node(no)) {
            return Some(&node.post);
        }
        let (board, pages) = self.catalog.as_ref()?;
        if self.view.board() != Some(board.as_str()) {
            return None;
        }
        catalog::threads(pages).find(|t| t.no == no)
    }

    /// The media preview for a post, unless hover zoom is turned off.
    pub fn hover_content(&self, no: PostNo) -> Option<HoverContent> {
        if !self.settings().hover_zoom {
            return None;
        }
        let board = self.view.board()?;
        let media = self.find_post(no)?.media()?;
        let natural = match (media.width, media.height) {
            (Some(w), Some(h)) => Some(Size::new(w as f64, h as f64)),
            _ => None,
        };
        Some(HoverContent {
            url: Endpoint::media_url(board, &media, self.cfg.use_https()),
            natural,
            is_video: media.is_video(),
            autoplay: self.settings().autoplay,
        })
    }

    pub fn hover_preview(&self, viewport: Size) -> HoverPreview {
        HoverPreview::new(Positioner::MEDIA, viewport, self.cfg.hover_throttle())
    }

    pub fn popup_preview(&self, viewport: Size) -> HoverPreview {
        HoverPreview::new(Positioner::POPUP, viewport, self.cfg.hover_throttle())
    }

    /// The post a `>>no` reference in the open thread points at.
    pub fn reply_popup(&self, no: PostNo) -> Option<&ReplyNode> {
        self.thread.as_ref()?.node(no)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MemoryStore;
    use async_trait::async_trait;
    use std::{
        collections::{HashMap, HashSet},
        sync::Mutex,
        time::Duration,
    };

    /// In-memory source: every board has threads `base+1..=base+count`, each
    /// with two replies quoting the OP.
    #[derive(Default)]
    struct FakeSource {
        boards: HashMap<String, (PostNo, usize)>,
        delays: Mutex<HashMap<String, Duration>>,
        failing: Mutex<HashSet<String>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeSource {
        fn with_board(mut self, board: &str, base: PostNo, count: usize) -> Self {
            self.boards.insert(board.to_string(), (base, count));
            self
        }

        fn with_delay(self, call: &str, delay: Duration) -> Self {
            self.set_delay(call, delay);
            self
        }

        fn set_delay(&self, call: &str, delay: Duration) {
            self.delays.lock().unwrap().insert(call.to_string(), delay);
        }

        fn fail(&self, call: &str) {
            self.failing.lock().unwrap().insert(call.to_string());
        }

        fn calls(&self, prefix: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.starts_with(prefix))
                .count()
        }

        async fn record(&self, call: String) -> Result<(), ApiError> {
            self.calls.lock().unwrap().push(call.clone());
            let delay = self.delays.lock().unwrap().get(&call).copied();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if self.failing.lock().unwrap().contains(&call) {
                return Err(ApiError::StatusCode(500));
            }
            Ok(())
        }

        fn op(no: PostNo) -> Post {
            Post {
                no,
                sub: Some(format!("thread {}", no)),
                com: Some(format!("opening post {}", no)),
                replies: Some(no as u32 % 7),
                last_modified: Some(no as i64),
                tim: Some(1_700_000_000_000 + no as i64),
                ext: Some(".jpg".to_string()),
                w: Some(400),
                h: Some(300),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl Source for FakeSource {
        async fn boards(&self) -> Result<Arc<Vec<Board>>, ApiError> {
            self.record("boards".to_string()).await?;
            let mut boards: Vec<Board> = self
                .boards
                .keys()
                .map(|b| Board {
                    board: b.clone(),
                    title: format!("Board {}", b),
                    ..Default::default()
                })
                .collect();
            boards.sort_by(|a, b| a.board.cmp(&b.board));
            Ok(Arc::new(boards))
        }

        async fn catalog(&self, board: &str) -> Result<Arc<Vec<CatalogPage>>, ApiError> {
            self.record(format!("catalog:{}", board)).await?;
            let (base, count) = self.boards.get(board).copied().ok_or(ApiError::StatusCode(404))?;
            let threads = (1..=count as PostNo).map(|i| Self::op(base + i)).collect();
            Ok(Arc::new(vec![CatalogPage { page: 1, threads }]))
        }

        async fn thread(&self, board: &str, no: PostNo) -> Result<Arc<Thread>, ApiError> {
            self.record(format!("thread:{}:{}", board, no)).await?;
            let replies = (1..=2).map(|i| Post {
                no: no * 100 + i,
                resto: no,
                com: Some(format!("&gt;&gt;{}<br>reply {}", no, i)),
                time: i as i64,
                ..Default::default()
            });
            let posts = std::iter::once(Self::op(no)).chain(replies).collect();
            Ok(Arc::new(Thread { posts }))
        }
    }

    fn board_g(count: usize) -> FakeSource {
        FakeSource::default().with_board("g", 0, count)
    }

    fn browser(
        source: FakeSource,
        settings: Settings,
    ) -> (Browser<FakeSource, MemoryStore>, Arc<FakeSource>) {
        let source = Arc::new(source);
        let browser = Browser::new(Config::default(), source.clone(), MemoryStore::with(settings));
        (browser, source)
    }

    fn nos(browser: &Browser<FakeSource, MemoryStore>) -> Vec<PostNo> {
        browser.listing().iter().map(|s| s.no).collect()
    }

    #[tracing_test::traced_test]
    #[tokio::test]
    async fn test_catalog_previews_are_capped_and_best_effort() {
        let source = FakeSource::default().with_board("g", 0, 15);
        source.fail("thread:g:3");
        let (mut browser, source) = browser(source, Settings::default());

        browser.open_board("g").unwrap();
        assert_eq!(browser.state(), &LoadState::Loading);
        assert_eq!(browser.next_update().await, Some(Update::Catalog));
        assert_eq!(browser.state(), &LoadState::Ready);
        assert_eq!(source.calls("catalog:g"), 1);
        assert_eq!(source.calls("thread:g:"), 10);
        assert_eq!(browser.listing().len(), 15);

        let summary = |no| browser.listing().iter().find(|s| s.no == no).unwrap();
        let replies: Vec<_> = summary(1).recent_replies.iter().map(|r| r.no).collect();
        assert_eq!(replies, vec![101, 102]);
        assert_eq!(summary(1).recent_replies[0].excerpt, "reply 1");
        assert!(summary(3).recent_replies.is_empty());
        assert!(summary(11).recent_replies.is_empty());
    }

    #[tokio::test]
    async fn test_pins_lead_listing_without_refetch() {
        let (mut browser, source) = browser(board_g(5), Settings::default());
        browser.open_board("g").unwrap();
        browser.next_update().await;
        assert_eq!(nos(&browser), vec![1, 2, 3, 4, 5]);

        assert!(browser.toggle_pin(4).unwrap());
        assert_eq!(nos(&browser), vec![4, 1, 2, 3, 5]);
        assert!(browser.listing()[0].pinned);
        assert!(browser.tags().is_pinned(&ThreadKey::new("g", 4)));

        browser.set_sort(SortKey::Recent).unwrap();
        browser.next_update().await;
        assert_eq!(nos(&browser), vec![4, 5, 3, 2, 1]);

        assert!(!browser.toggle_pin(4).unwrap());
        assert_eq!(nos(&browser), vec![5, 4, 3, 2, 1]);
        assert_eq!(source.calls("catalog:g"), 2);
    }

    #[tracing_test::traced_test]
    #[tokio::test(start_paused = true)]
    async fn test_late_response_for_previous_board_is_ignored() {
        let source = FakeSource::default()
            .with_board("g", 0, 3)
            .with_board("v", 100, 2)
            .with_delay("catalog:g", Duration::from_secs(5))
            .with_delay("catalog:v", Duration::from_secs(1));
        let (mut browser, _source) = browser(source, Settings::default());

        browser.open_board("g").unwrap();
        browser.open_board("v").unwrap();
        assert_eq!(browser.next_update().await, Some(Update::Catalog));
        assert_eq!(nos(&browser), vec![101, 102]);
        assert_eq!(browser.next_update().await, Some(Update::Stale));
        assert_eq!(nos(&browser), vec![101, 102]);
        assert_eq!(browser.view(), &View::Catalog { board: "v".to_string() });
    }

    #[tokio::test(start_paused = true)]
    async fn test_older_request_for_same_view_loses() {
        let source = FakeSource::default()
            .with_board("g", 0, 3)
            .with_delay("catalog:g", Duration::from_secs(5));
        let (mut browser, source) = browser(source, Settings::default());
        browser.open_board("g").unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        source.set_delay("catalog:g", Duration::ZERO);
        browser.refresh().unwrap();
        assert_eq!(browser.next_update().await, Some(Update::Catalog));
        assert_eq!(browser.next_update().await, Some(Update::Stale));
        assert_eq!(source.calls("catalog:g"), 2);
        assert_eq!(browser.state(), &LoadState::Ready);
    }

    #[tracing_test::traced_test]
    #[tokio::test]
    async fn test_failed_refresh_keeps_listing() {
        let (mut browser, source) = browser(board_g(4), Settings::default());
        browser.open_board("g").unwrap();
        browser.next_update().await;
        let before = nos(&browser);

        source.fail("catalog:g");
        browser.refresh().unwrap();
        match browser.next_update().await {
            Some(Update::Unavailable(reason)) => assert!(reason.contains("500")),
            other => panic!("unexpected update: {:?}", other),
        }
        assert!(matches!(browser.state(), LoadState::Unavailable(_)));
        assert_eq!(nos(&browser), before);
        assert_eq!(browser.listing()[0].recent_replies.len(), 2);
    }

    #[tracing_test::traced_test]
    #[tokio::test(start_paused = true)]
    async fn test_auto_refresh_follows_navigation() {
        let settings = Settings {
            auto_refresh: true,
            ..Default::default()
        };
        let source = FakeSource::default().with_board("g", 0, 2).with_board("v", 100, 2);
        let (mut browser, source) = browser(source, settings);

        browser.open_board("g").unwrap();
        assert!(browser.is_refreshing());
        assert_eq!(browser.next_update().await, Some(Update::Catalog));
        assert_eq!(browser.next_update().await, Some(Update::Loading));
        assert_eq!(browser.next_update().await, Some(Update::Catalog));
        assert_eq!(source.calls("catalog:g"), 2);

        browser.open_board("v").unwrap();
        let updates = [
            Update::Catalog,
            Update::Loading,
            Update::Catalog,
            Update::Loading,
            Update::Catalog,
        ];
        for expected in updates {
            assert_eq!(browser.next_update().await, Some(expected));
        }
        assert_eq!(source.calls("catalog:g"), 2);
        assert_eq!(source.calls("catalog:v"), 3);
        assert!(browser.listing().iter().all(|s| s.board == "v"));

        browser.open_thread(101).unwrap();
        assert!(!browser.is_refreshing());
        let mut seen = vec![];
        while let Ok(update) =
            tokio::time::timeout(Duration::from_secs(100), browser.next_update()).await
        {
            seen.push(update);
        }
        assert!(seen.contains(&Some(Update::Thread)));
        assert_eq!(source.calls("catalog:v"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_filter_typing_refetches_once() {
        let (mut browser, source) = browser(board_g(12), Settings::default());
        browser.open_board("g").unwrap();
        browser.next_update().await;

        for text in ["1", "11", "thread 11"] {
            browser.set_filter_text(text);
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(browser.next_update().await, Some(Update::Loading));
        assert_eq!(browser.next_update().await, Some(Update::Catalog));
        assert_eq!(source.calls("catalog:g"), 2);
        assert_eq!(nos(&browser), vec![11]);

        let settled = tokio::time::timeout(Duration::from_secs(5), browser.next_update()).await;
        assert!(settled.is_err());
    }

    #[tracing_test::traced_test]
    #[tokio::test]
    async fn test_filter_settled_after_browser_gone_is_logged() {
        let (events_tx, events_rx) = mpsc::channel(1);
        drop(events_rx);
        filter_settled(events_tx, "g".to_string()).await;
        assert!(logs_contain("Browser gone before filter for /g/ settled"));
    }

    #[tracing_test::traced_test]
    #[tokio::test(start_paused = true)]
    async fn test_thread_view_and_late_thread_after_back() {
        let source = FakeSource::default()
            .with_board("g", 0, 3)
            .with_delay("thread:g:2", Duration::from_secs(3));
        let (mut browser, _source) = browser(source, Settings::default());
        browser.open_board("g").unwrap();
        browser.next_update().await;

        browser.open_thread(1).unwrap();
        assert_eq!(browser.next_update().await, Some(Update::Thread));
        let tree = browser.thread().unwrap();
        assert_eq!(tree.op().unwrap().post.no, 1);
        assert_eq!(tree.children_of(1).len(), 2);
        let popup = browser.reply_popup(102).unwrap();
        assert_eq!(popup.comment.plain_text(), ">>1\nreply 2");

        browser.open_thread(2).unwrap();
        browser.back_to_catalog().unwrap();
        assert_eq!(browser.state(), &LoadState::Ready);
        assert_eq!(browser.next_update().await, Some(Update::Stale));
        assert!(browser.thread().is_none());
        assert_eq!(browser.view(), &View::Catalog { board: "g".to_string() });
    }

    #[tokio::test]
    async fn test_tags_flow_into_listing() {
        let (mut browser, _source) = browser(board_g(3), Settings::default());
        browser.open_board("g").unwrap();
        browser.next_update().await;

        assert!(matches!(browser.toggle_tag(2, "later"), Err(Error::UnknownTag(_))));
        assert!(browser.define_tag("later").unwrap());
        assert!(browser.toggle_tag(2, "later").unwrap());
        assert_eq!(browser.listing()[1].tags, vec!["later".to_string()]);
        assert!(browser.delete_tag("later").unwrap());
        assert!(browser.listing()[1].tags.is_empty());
        assert!(browser.tags().assignments().is_empty());
    }

    #[tokio::test]
    async fn test_hover_content_respects_settings() {
        let (mut browser, _source) = browser(board_g(3), Settings::default());
        assert!(browser.hover_content(1).is_none());
        browser.open_board("g").unwrap();
        browser.next_update().await;

        let content = browser.hover_content(2).unwrap();
        assert_eq!(content.url, "https://i.4cdn.org/g/1700000000002.jpg");
        assert_eq!(content.natural, Some(Size::new(400.0, 300.0)));
        assert!(!content.is_video);
        assert!(browser.hover_content(99).is_none());

        browser.set_hover_zoom(false).unwrap();
        assert!(browser.hover_content(2).is_none());
    }

    #[tokio::test]
    async fn test_board_directory_and_search() {
        let source = FakeSource::default()
            .with_board("a", 0, 1)
            .with_board("g", 0, 1)
            .with_board("v", 0, 1);
        let (mut browser, _source) = browser(source, Settings::default());
        browser.load_boards().await.unwrap();
        assert!(browser.toggle_favorite_board("v").unwrap());

        let names: Vec<_> = browser.board_directory().iter().map(|b| b.name()).collect();
        assert_eq!(names, vec!["v", "a", "g", "v"]);
        assert_eq!(browser.search_boards("BOARD G").len(), 1);
        assert_eq!(browser.find_board("g").map(Board::name), Some("g"));
        assert!(browser.find_board("x").is_none());
    }

    #[tokio::test]
    async fn test_actions_without_board() {
        let (mut browser, _source) = browser(FakeSource::default(), Settings::default());
        assert!(matches!(browser.refresh(), Err(Error::NoBoard)));
        assert!(matches!(browser.open_thread(1), Err(Error::NoBoard)));
        assert!(matches!(browser.toggle_pin(1), Err(Error::NoBoard)));
        assert!(matches!(browser.open_board("/ "), Err(Error::NoBoard)));
    }
}
