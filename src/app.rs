use std::sync::Arc;

use chrono::{DateTime, Datelike, Local, NaiveDate, Utc};
use tokio::sync::mpsc;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::Document;
use crate::services::{DocumentFetcher, ListFilter, ListTransport, Pause, ReadwiseClient, TokioPause};
use crate::settings::{validate_token, Settings, SettingsPatch, SettingsStore};
use crate::stats::{DashboardStats, DateRange};
use crate::tui::AppAction;

pub const ACCESS_TOKEN_URL: &str = "https://readwise.io/access_token";

const SPINNER_FRAMES: [&str; 4] = ["|", "/", "-", "\\"];

pub type SharedFetcher = Arc<DocumentFetcher<Arc<dyn ListTransport>, Arc<dyn Pause>>>;

// Message for a completed refresh
pub struct RefreshResult {
    pub result: std::result::Result<Vec<Document>, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Dashboard,
    Settings,
}

/// Which text input, if any, receives key presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Token,
    Range,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub is_error: bool,
}

impl StatusMessage {
    fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

pub struct App {
    // Data
    settings: Settings,
    pub stats: DashboardStats,
    pub stats_as_of: DateTime<Local>,
    pub date_range: DateRange<Local>,
    pub last_saved: Option<DateTime<Utc>>,
    stored_size_kb: f64,

    // UI State
    pub screen: Screen,
    pub show_help: bool,
    pub token_input: String,
    pub token_error: Option<String>,
    pub range_input_active: bool,
    pub range_input: String,
    pub status: Option<StatusMessage>,
    spinner_frame: usize,

    // Async state
    pub is_refreshing: bool,
    refresh_rx: mpsc::Receiver<RefreshResult>,
    refresh_tx: mpsc::Sender<RefreshResult>,

    // Services
    store: SettingsStore,
    fetcher: SharedFetcher,
    filter: ListFilter,
}

impl App {
    pub async fn new(config: &Config) -> Result<Self> {
        let store = SettingsStore::open(&config.db_path).await?;
        let client: Arc<dyn ListTransport> = Arc::new(ReadwiseClient::new(&config.api_url)?);
        let pause: Arc<dyn Pause> = Arc::new(TokioPause);
        let fetcher = Arc::new(DocumentFetcher::with_pause(
            client,
            pause,
            config.request_delay(),
        ));
        let filter = ListFilter {
            updated_after: None,
            location: config.location_filter.clone(),
        };

        Ok(Self::with_parts(store, fetcher, filter).await)
    }

    pub async fn with_parts(store: SettingsStore, fetcher: SharedFetcher, filter: ListFilter) -> Self {
        let settings = store.load().await;
        let last_saved = store.last_saved().await;
        let now = Local::now();
        let date_range = DateRange::year_to_date(&now);
        let stats = DashboardStats::compute(&settings.data, &date_range, &now);
        let token_input = settings.token().unwrap_or_default().to_string();
        let stored_size_kb = settings.approximate_size_kb();

        let (refresh_tx, refresh_rx) = mpsc::channel(1);

        Self {
            settings,
            stats,
            stats_as_of: now,
            date_range,
            last_saved,
            stored_size_kb,
            screen: Screen::Dashboard,
            show_help: false,
            token_input,
            token_error: None,
            range_input_active: false,
            range_input: String::new(),
            status: None,
            spinner_frame: 0,
            is_refreshing: false,
            refresh_rx,
            refresh_tx,
            store,
            fetcher,
            filter,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn has_token(&self) -> bool {
        self.settings.has_token()
    }

    /// Merge `patch` into the settings record and persist the whole record.
    pub async fn update_settings(&mut self, patch: SettingsPatch) {
        self.settings = self.settings.merged(patch);
        self.stored_size_kb = self.settings.approximate_size_kb();
        self.store.save(&self.settings).await;
        self.last_saved = self.store.last_saved().await;
        self.recompute_stats();
    }

    pub fn set_date_range(&mut self, range: DateRange<Local>) {
        self.date_range = range;
        self.recompute_stats();
    }

    fn recompute_stats(&mut self) {
        self.recompute_stats_at(Local::now());
    }

    fn recompute_stats_at(&mut self, now: DateTime<Local>) {
        self.stats = DashboardStats::compute(&self.settings.data, &self.date_range, &now);
        self.stats_as_of = now;
    }

    /// Recompute the stats once the calendar month has moved on, so the
    /// rolling window follows the clock while the app stays open.
    pub fn roll_over_month(&mut self, now: DateTime<Local>) -> bool {
        let computed = (self.stats_as_of.year(), self.stats_as_of.month());
        if computed == (now.year(), now.month()) {
            return false;
        }
        tracing::debug!("Month changed, recomputing stats");
        self.recompute_stats_at(now);
        true
    }

    pub fn input_mode(&self) -> InputMode {
        if self.range_input_active {
            InputMode::Range
        } else if self.screen == Screen::Settings {
            InputMode::Token
        } else {
            InputMode::Normal
        }
    }

    pub fn spinner(&self) -> &'static str {
        SPINNER_FRAMES[self.spinner_frame % SPINNER_FRAMES.len()]
    }

    pub fn tick(&mut self) {
        if self.is_refreshing {
            self.spinner_frame = self.spinner_frame.wrapping_add(1);
        }
        self.roll_over_month(Local::now());
    }

    pub async fn handle_action(&mut self, action: AppAction) -> Result<bool> {
        match action {
            AppAction::Quit => return Ok(true),

            AppAction::Refresh => {
                self.start_refresh();
            }

            AppAction::ShowSettings => {
                self.open_settings();
            }

            AppAction::ShowDashboard => {
                self.screen = Screen::Dashboard;
                self.token_error = None;
            }

            AppAction::OpenTokenPage => {
                if let Err(e) = open::that(ACCESS_TOKEN_URL) {
                    tracing::warn!("Failed to open browser: {}", e);
                    self.status = Some(StatusMessage::error(format!(
                        "Open {} in your browser",
                        ACCESS_TOKEN_URL
                    )));
                }
            }

            AppAction::EditRange => {
                self.range_input_active = true;
                self.range_input = self.range_label();
            }

            AppAction::ResetRange => {
                self.set_date_range(DateRange::year_to_date(&Local::now()));
            }

            AppAction::ShowHelp => {
                self.show_help = true;
            }

            AppAction::HideHelp => {
                self.show_help = false;
            }

            AppAction::TokenInputChar(c) => {
                self.token_input.push(c);
                self.token_error = None;
            }

            AppAction::TokenInputBackspace => {
                self.token_input.pop();
                self.token_error = None;
            }

            AppAction::TokenInputConfirm => {
                self.save_token().await;
            }

            AppAction::TokenInputCancel => {
                self.screen = Screen::Dashboard;
                self.token_error = None;
            }

            AppAction::RangeInputChar(c) => {
                self.range_input.push(c);
            }

            AppAction::RangeInputBackspace => {
                self.range_input.pop();
            }

            AppAction::RangeInputConfirm => {
                match parse_range_input(&self.range_input) {
                    Ok((from, to)) => {
                        self.set_date_range(DateRange::from_days(from, to, &Local));
                        self.range_input_active = false;
                        self.range_input.clear();
                    }
                    Err(e) => {
                        self.status = Some(StatusMessage::error(e.to_string()));
                    }
                }
            }

            AppAction::RangeInputCancel => {
                self.range_input_active = false;
                self.range_input.clear();
            }
        }

        Ok(false)
    }

    fn open_settings(&mut self) {
        // Form mirrors whatever is stored
        self.token_input = self.settings.token().unwrap_or_default().to_string();
        self.token_error = None;
        self.screen = Screen::Settings;
    }

    async fn save_token(&mut self) {
        match validate_token(&self.token_input) {
            Ok(token) => {
                self.token_input = token.clone();
                self.update_settings(SettingsPatch::token(token)).await;
                self.token_error = None;
                self.status = Some(StatusMessage::info("Settings saved."));
            }
            Err(e) => {
                self.token_error = Some(e.to_string());
            }
        }
    }

    /// Current range as "YYYY-MM-DD..YYYY-MM-DD"; empty bounds stay empty.
    pub fn range_label(&self) -> String {
        let day = |d: &Option<DateTime<Local>>| {
            d.as_ref()
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default()
        };
        format!("{}..{}", day(&self.date_range.from), day(&self.date_range.to))
    }

    /// Kick off a background refresh. Returns false when nothing was
    /// started: no token, or a refresh is already running.
    pub fn start_refresh(&mut self) -> bool {
        if self.is_refreshing {
            tracing::debug!("Refresh already in progress, ignoring");
            return false;
        }
        let Some(token) = self.settings.token().map(str::to_string) else {
            return false;
        };

        self.is_refreshing = true;
        self.status = None;

        let fetcher = Arc::clone(&self.fetcher);
        let filter = self.filter.clone();
        let tx = self.refresh_tx.clone();

        tokio::spawn(async move {
            let result = fetcher
                .fetch_documents(Some(&token), &filter)
                .await
                .map_err(|e| e.to_string());

            let _ = tx.send(RefreshResult { result }).await;
        });

        true
    }

    /// Poll for a completed refresh (non-blocking)
    pub async fn poll_refresh_result(&mut self) -> Result<()> {
        if let Ok(result) = self.refresh_rx.try_recv() {
            self.finish_refresh(result).await;
        }
        Ok(())
    }

    async fn finish_refresh(&mut self, result: RefreshResult) {
        self.is_refreshing = false;
        match result.result {
            Ok(data) => {
                let count = data.len();
                self.update_settings(SettingsPatch::data(data)).await;
                tracing::info!("Refreshed {} documents", count);
                self.status = Some(StatusMessage::info("Data refreshed."));
            }
            Err(e) => {
                // Stored data is left as it was
                tracing::error!("Failed to refresh data: {}", e);
                self.status = Some(StatusMessage::error(format!("Error: {}", e)));
            }
        }
    }

    /// Refresh in the foreground and wait for it. Used by `--refresh`.
    pub async fn refresh_blocking(&mut self) -> Result<usize> {
        let Some(token) = self.settings.token().map(str::to_string) else {
            return Err(AppError::Config(
                "No Readwise access token set. Run with --token <TOKEN> first.".to_string(),
            ));
        };

        let data = self.fetcher.fetch_documents(Some(&token), &self.filter).await?;
        let count = data.len();
        self.update_settings(SettingsPatch::data(data)).await;
        Ok(count)
    }

    /// Validate and store a token. Used by `--token`.
    pub async fn set_token(&mut self, input: &str) -> Result<()> {
        let token = validate_token(input)?;
        self.update_settings(SettingsPatch::token(token)).await;
        Ok(())
    }

    /// Size of the stored record, updated on every settings change.
    pub fn stored_size_kb(&self) -> f64 {
        self.stored_size_kb
    }
}

/// Parse "YYYY-MM-DD..YYYY-MM-DD". Either side may be left empty, which
/// leaves that bound unset. A single date selects that one day.
pub fn parse_range_input(input: &str) -> Result<(Option<NaiveDate>, Option<NaiveDate>)> {
    let parse_day = |s: &str| -> Result<Option<NaiveDate>> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(None);
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| AppError::InvalidRange(format!("'{}' is not a YYYY-MM-DD date", s)))
    };

    match input.split_once("..") {
        Some((from, to)) => Ok((parse_day(from)?, parse_day(to)?)),
        None => {
            let day = parse_day(input)?;
            Ok((day, day))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::db::Repository;
    use crate::services::{ListPage, ListQuery};

    struct QueuedPages {
        pages: Mutex<VecDeque<Result<ListPage>>>,
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl ListTransport for QueuedPages {
        async fn list_page(&self, _token: &str, _query: &ListQuery) -> Result<ListPage> {
            *self.calls.lock().unwrap() += 1;
            self.pages
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(AppError::ReadwiseApi("exhausted".to_string())))
        }
    }

    struct NoPause;

    #[async_trait]
    impl Pause for NoPause {
        async fn pause(&self, _duration: Duration) {}
    }

    fn stamped(id: &str, location: &str, at: DateTime<Utc>) -> Document {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "location": location,
            "saved_at": at.to_rfc3339(),
            "last_moved_at": at.to_rfc3339(),
        }))
        .unwrap()
    }

    async fn app_with(pages: Vec<Result<ListPage>>) -> (App, Arc<QueuedPages>) {
        let transport = Arc::new(QueuedPages {
            pages: Mutex::new(pages.into()),
            calls: Mutex::new(0),
        });
        let client: Arc<dyn ListTransport> = transport.clone();
        let pause: Arc<dyn Pause> = Arc::new(NoPause);
        let fetcher = Arc::new(DocumentFetcher::with_pause(client, pause, Duration::ZERO));
        let store = SettingsStore::new(Repository::in_memory().await.unwrap());
        let app = App::with_parts(store, fetcher, ListFilter::default()).await;
        (app, transport)
    }

    async fn wait_for_refresh(app: &mut App) {
        for _ in 0..100 {
            app.poll_refresh_result().await.unwrap();
            if !app.is_refreshing {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("refresh did not finish");
    }

    #[tokio::test]
    async fn refresh_without_token_does_nothing() {
        let (mut app, transport) = app_with(vec![]).await;
        assert!(!app.has_token());
        assert!(!app.start_refresh());
        assert!(!app.is_refreshing);
        assert_eq!(*transport.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn refresh_replaces_stored_data() {
        let now = Utc::now();
        let page = ListPage {
            results: vec![stamped("a", "later", now), stamped("b", "archive", now)],
            next_page_cursor: None,
        };
        let (mut app, _) = app_with(vec![Ok(page)]).await;
        app.set_token("my-token").await.unwrap();

        assert!(app.start_refresh());
        // A second trigger while in flight is ignored
        assert!(!app.start_refresh());
        wait_for_refresh(&mut app).await;

        assert_eq!(app.settings().data.len(), 2);
        assert_eq!(app.settings().token(), Some("my-token"));
        assert_eq!(app.stats.archived_total, 1);
        assert_eq!(app.status, Some(StatusMessage::info("Data refreshed.")));
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_data() {
        let now = Utc::now();
        let first = ListPage {
            results: vec![stamped("kept", "archive", now)],
            next_page_cursor: None,
        };
        let partial = ListPage {
            results: vec![stamped("partial", "later", now)],
            next_page_cursor: Some("more".to_string()),
        };
        let (mut app, transport) = app_with(vec![
            Ok(first),
            Ok(partial),
            Err(AppError::ReadwiseApi("HTTP 500".to_string())),
        ])
        .await;
        app.set_token("my-token").await.unwrap();

        assert_eq!(app.refresh_blocking().await.unwrap(), 1);

        assert!(app.start_refresh());
        wait_for_refresh(&mut app).await;

        assert_eq!(*transport.calls.lock().unwrap(), 3);
        let ids: Vec<_> = app.settings().data.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["kept"]);
        let status = app.status.clone().unwrap();
        assert!(status.is_error);
        assert!(status.text.starts_with("Error: "));
        assert!(status.text.contains("HTTP 500"));
    }

    #[tokio::test]
    async fn settings_form_validates_before_saving() {
        let (mut app, _) = app_with(vec![]).await;
        app.handle_action(AppAction::ShowSettings).await.unwrap();
        assert_eq!(app.input_mode(), InputMode::Token);

        app.handle_action(AppAction::TokenInputChar('x')).await.unwrap();
        app.handle_action(AppAction::TokenInputConfirm).await.unwrap();
        assert!(app.token_error.is_some());
        assert!(!app.has_token());

        app.handle_action(AppAction::TokenInputChar('y')).await.unwrap();
        app.handle_action(AppAction::TokenInputConfirm).await.unwrap();
        assert!(app.token_error.is_none());
        assert_eq!(app.settings().token(), Some("xy"));
        assert_eq!(app.status, Some(StatusMessage::info("Settings saved.")));
    }

    #[tokio::test]
    async fn range_input_updates_the_custom_chart() {
        let (mut app, _) = app_with(vec![]).await;
        app.handle_action(AppAction::EditRange).await.unwrap();
        assert_eq!(app.input_mode(), InputMode::Range);

        app.range_input = "2025-11-20..2026-01-03".to_string();
        app.handle_action(AppAction::RangeInputConfirm).await.unwrap();

        assert!(!app.range_input_active);
        let labels: Vec<_> = app.stats.range.iter().map(|b| b.month.as_str()).collect();
        assert_eq!(labels, vec!["November 2025", "December 2025", "January 2026"]);

        app.handle_action(AppAction::EditRange).await.unwrap();
        app.range_input = "2026-01-01..".to_string();
        app.handle_action(AppAction::RangeInputConfirm).await.unwrap();
        assert!(app.stats.range.is_empty());
    }

    #[tokio::test]
    async fn stats_follow_the_calendar_month() {
        let (mut app, _) = app_with(vec![]).await;
        let now = Local::now();
        let last_month = now.checked_sub_months(chrono::Months::new(1)).unwrap();
        app.recompute_stats_at(last_month);
        assert!(!app.roll_over_month(last_month));

        assert!(app.roll_over_month(now));
        assert_eq!(
            app.stats.current_month().map(|b| b.month.clone()),
            Some(now.format("%B %Y").to_string())
        );
        assert!(!app.roll_over_month(now));
    }

    #[tokio::test]
    async fn stored_size_tracks_settings_updates() {
        let (mut app, _) = app_with(vec![]).await;
        let empty = app.stored_size_kb();
        assert_eq!(empty, Settings::default().approximate_size_kb());

        let docs = vec![stamped("a", "later", Utc::now()); 20];
        app.update_settings(SettingsPatch::data(docs)).await;
        assert!(app.stored_size_kb() > empty);
        assert_eq!(app.stored_size_kb(), app.settings().approximate_size_kb());
    }

    #[test]
    fn range_input_parsing() {
        let day = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok();
        assert_eq!(
            parse_range_input("2026-01-01..2026-03-31").unwrap(),
            (day("2026-01-01"), day("2026-03-31"))
        );
        assert_eq!(parse_range_input("..2026-03-31").unwrap(), (None, day("2026-03-31")));
        assert_eq!(
            parse_range_input(" 2026-02-14 ").unwrap(),
            (day("2026-02-14"), day("2026-02-14"))
        );
        assert!(parse_range_input("2026-13-01..").is_err());
    }
}
