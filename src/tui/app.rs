use std::io;
use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use crate::dashboard::{Dashboard, NoticeKind};
use crate::io::comments::{CommentPool, CommentResult};
use crate::io::config_io::{Workspace, open_workspace};
use crate::io::create::{CreateResult, IssueCreator, NewIssue, spawn_create};
use crate::io::fetch::{FetchSlot, RefreshOutcome, RefreshTicket, fetch_and_build, spawn_refresh};
use crate::io::source::IssueSource;
use crate::io::watcher::{StoreWatcher, latest_mtime, store_paths};
use crate::telemetry::{self, LogTarget};
use crate::view::Focus;

use super::input;
use super::render;
use super::theme::Theme;

/// How long the loop waits for a key before servicing background work
const TICK: Duration = Duration::from_millis(100);

/// Current interaction mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Navigate,
    /// Typing into the filter prompt; rows update as you type
    Filter,
    /// Typing the title of a new issue
    Create,
}

/// Results delivered by background threads
#[derive(Debug)]
pub enum AppEvent {
    Refresh(RefreshOutcome),
    Comments(CommentResult),
    Created(CreateResult),
}

impl From<RefreshOutcome> for AppEvent {
    fn from(outcome: RefreshOutcome) -> Self {
        AppEvent::Refresh(outcome)
    }
}

impl From<CommentResult> for AppEvent {
    fn from(result: CommentResult) -> Self {
        AppEvent::Comments(result)
    }
}

impl From<CreateResult> for AppEvent {
    fn from(result: CreateResult) -> Self {
        AppEvent::Created(result)
    }
}

/// Main application state
pub struct App {
    pub dashboard: Dashboard,
    pub theme: Theme,
    pub mode: Mode,
    pub should_quit: bool,
    /// Text typed into the filter or create prompt
    pub prompt: String,
    /// Filter text to put back when the filter prompt is cancelled
    pub prompt_saved: String,
    /// Parent for the issue being typed in create mode
    pub create_parent: Option<String>,
    /// Detail pane follows the cursor
    pub show_detail: bool,
    pub detail_scroll: u16,
    /// Rows that fit in the tree pane at the last draw
    pub tree_height: usize,
    /// Creations waiting to be handed to the background creator
    pub outbox: Vec<NewIssue>,
}

impl App {
    pub fn new(dashboard: Dashboard, theme: Theme, show_detail: bool) -> Self {
        let mut app = App {
            dashboard,
            theme,
            mode: Mode::Navigate,
            should_quit: false,
            prompt: String::new(),
            prompt_saved: String::new(),
            create_parent: None,
            show_detail,
            detail_scroll: 0,
            tree_height: 0,
            outbox: Vec::new(),
        };
        app.sync_detail();
        app
    }

    /// Point the detail pane at the selected issue while it follows the cursor
    pub fn sync_detail(&mut self) {
        if !self.show_detail || self.dashboard.focus() == Focus::Detail {
            return;
        }
        let before = self.dashboard.detail_node().map(|n| n.id().to_string());
        self.dashboard.open_detail();
        let after = self.dashboard.detail_node().map(|n| n.id());
        if before.as_deref() != after {
            self.detail_scroll = 0;
        }
    }

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
        if self.show_detail {
            self.sync_detail();
        } else {
            self.dashboard.close_detail();
        }
    }

    /// Apply one background result
    pub fn apply(&mut self, event: AppEvent) {
        match event {
            AppEvent::Refresh(outcome) => self.dashboard.apply_refresh(outcome),
            AppEvent::Comments(loaded) => self.dashboard.apply_comments(loaded),
            AppEvent::Created(created) => self.created(created),
        }
        self.sync_detail();
    }

    fn created(&mut self, created: CreateResult) {
        let parent = created.request.parent.as_deref();
        match created.result {
            Ok(issue) => {
                let id = issue.id.clone();
                if self.dashboard.inject(issue, parent).is_ok() {
                    tracing::info!(issue = %id, parent = ?parent, "issue created");
                }
            }
            Err(err) => {
                tracing::warn!(title = %created.request.title, %err, "create failed");
                self.dashboard
                    .notify(NoticeKind::Operation, format!("create failed: {err}"));
            }
        }
    }
}

/// Handles to everything that runs off the UI thread
struct Background {
    events: Sender<AppEvent>,
    source: Arc<dyn IssueSource>,
    creator: Arc<dyn IssueCreator>,
    comments: Option<CommentPool>,
    timeout: Duration,
    fetch: FetchSlot,
}

impl Background {
    fn start(workspace: &Workspace) -> (Self, Receiver<AppEvent>) {
        let (events, rx) = mpsc::channel();
        let config = &workspace.config;
        let comments = config.comments.prefetch.then(|| {
            CommentPool::start(
                workspace.comment_loader(),
                config.comments.max_workers,
                events.clone(),
            )
        });
        let background = Background {
            events,
            source: workspace.issue_source(),
            creator: workspace.issue_creator(),
            comments,
            timeout: config.refresh.timeout(),
            fetch: FetchSlot::default(),
        };
        (background, rx)
    }

    fn refresh(&self, ticket: RefreshTicket) {
        spawn_refresh(
            Arc::clone(&self.source),
            ticket,
            self.timeout,
            &self.fetch,
            self.events.clone(),
        );
    }

    /// A fetch worker is still running, possibly one that already timed out
    fn fetch_busy(&self) -> bool {
        self.fetch.is_busy()
    }

    fn create(&self, request: NewIssue) {
        tracing::debug!(title = %request.title, parent = ?request.parent, "create requested");
        spawn_create(Arc::clone(&self.creator), request, self.events.clone());
    }

    /// Release bookkeeping for a result before it is applied
    fn settle(&mut self, event: &AppEvent) {
        if let AppEvent::Comments(loaded) = event
            && let Some(pool) = &mut self.comments
        {
            pool.complete(&loaded.issue_id);
        }
    }

    fn prefetch(&mut self, dashboard: &Dashboard) {
        let Some(pool) = &mut self.comments else {
            return;
        };
        for id in dashboard.wanted_comments() {
            pool.request(&id);
        }
    }
}

/// Run the TUI application against the workspace above `start`
pub fn run(start: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let workspace = open_workspace(start)?;
    let config = &workspace.config;

    // The terminal belongs to the UI, so logs go to a file
    if let Err(err) = telemetry::init(
        LogTarget::File(workspace.log_path()),
        &config.logging.filter,
    ) {
        eprintln!("warning: {err}");
    }

    let paths = store_paths(&workspace.store_path());
    // Read before fetching so a write during the fetch still triggers a refresh
    let observed = latest_mtime(&paths);
    let (mut background, rx) = Background::start(&workspace);
    let graph = fetch_and_build(background.source.as_ref())?;
    tracing::info!(
        root = %workspace.root.display(),
        source = %background.source.describe(),
        issues = graph.len(),
        "beadtree started"
    );

    let watcher = match StoreWatcher::start(paths.clone()) {
        Ok(watcher) => watcher,
        Err(err) => {
            tracing::warn!(%err, "file watching unavailable, polling only");
            StoreWatcher::polling(paths)
        }
    };

    let dashboard = Dashboard::new(graph, observed, config.inject.clone());
    let mut app = App::new(
        dashboard,
        Theme::from_config(&config.ui),
        config.ui.show_detail,
    );

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    // Install panic hook to restore terminal on panic
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let result = run_event_loop(
        &mut terminal,
        &mut app,
        &mut background,
        &watcher,
        &rx,
        config.refresh.poll_interval(),
    );

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    tracing::info!("beadtree stopped");
    result
}

fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    background: &mut Background,
    watcher: &StoreWatcher,
    rx: &Receiver<AppEvent>,
    poll_interval: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut mtime = watcher.latest_mtime();
    let mut next_poll = Instant::now() + poll_interval;
    background.prefetch(&app.dashboard);

    loop {
        terminal.draw(|frame| render::render(frame, app))?;

        if event::poll(TICK)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            input::handle_key(app, key);
        }

        if app.should_quit {
            break;
        }

        while let Ok(event) = rx.try_recv() {
            background.settle(&event);
            app.apply(event);
        }
        for request in app.outbox.drain(..) {
            background.create(request);
        }

        let now = Instant::now();
        if watcher.take_hint() || now >= next_poll {
            mtime = watcher.latest_mtime();
            next_poll = now + poll_interval;
        }
        if !background.fetch_busy()
            && let Some(ticket) = app.dashboard.check_for_changes(mtime, now)
        {
            background.refresh(ticket);
        }
        background.prefetch(&app.dashboard);
    }
    Ok(())
}
