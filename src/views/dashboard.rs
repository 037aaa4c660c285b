//! Researcher dashboard: news feed, FOIA tracker and document analysis.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::model::{seed_files, seed_foia_requests, FoiaRequest, NewsArticle, UfoFile};
use crate::service::GenerationClient;
use super::TextInput;

pub const NEWS_UNAVAILABLE: &str = "Could not fetch recent news. Please check your API key or try again later.";
pub const FILE_READ_FAILED: &str = "Failed to read file.";
pub const FILE_EMPTY: &str = "Could not read the file.";

/// Extensions accepted by the document picker
pub const TEXT_EXTENSIONS: [&str; 3] = ["txt", "md", "text"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardFocus {
    News,
    Foia,
    Files,
}

// =============================================================================
// NEWS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewsState {
    Loading,
    Loaded(Vec<NewsArticle>),
}

#[derive(Debug)]
pub struct NewsWidget {
    pub state: NewsState,
    pub scroll: u16,
}

impl NewsWidget {
    pub fn new() -> Self {
        Self {
            state: NewsState::Loading,
            scroll: 0,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.state == NewsState::Loading
    }

    /// Returns false while a fetch is already running
    pub fn begin_refresh(&mut self) -> bool {
        if self.is_loading() {
            return false;
        }
        self.state = NewsState::Loading;
        self.scroll = 0;
        true
    }

    pub fn apply(&mut self, articles: Vec<NewsArticle>) {
        self.state = NewsState::Loaded(articles);
    }
}

// =============================================================================
// FILES
// =============================================================================

/// Result of one background analysis run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisOutcome {
    ReadFailed(String),
    Analyzed { name: String, description: String },
}

pub fn has_text_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| TEXT_EXTENSIONS.iter().any(|allowed| ext.eq_ignore_ascii_case(allowed)))
        .unwrap_or(false)
}

/// Read the whole document; the error is the inline message to show
pub async fn read_document(path: &Path) -> Result<String, String> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) if content.is_empty() => Err(FILE_EMPTY.to_string()),
        Ok(content) => Ok(content),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "files: read failed");
            Err(FILE_READ_FAILED.to_string())
        }
    }
}

/// Read `path` and send its contents for analysis
pub async fn run_analysis(client: &GenerationClient, path: &Path) -> AnalysisOutcome {
    let content = match read_document(path).await {
        Ok(content) => content,
        Err(message) => return AnalysisOutcome::ReadFailed(message),
    };

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let description = client.analyze_file_content(&name, &content).await;

    AnalysisOutcome::Analyzed { name, description }
}

#[derive(Debug)]
pub struct FilesWidget {
    pub files: Vec<UfoFile>,
    pub path_input: TextInput,
    pub selected: Option<PathBuf>,
    pub analyzing: bool,
    pub error: Option<String>,
    pub scroll: u16,
}

impl FilesWidget {
    pub fn new(files: Vec<UfoFile>) -> Self {
        Self {
            files,
            path_input: TextInput::default(),
            selected: None,
            analyzing: false,
            error: None,
            scroll: 0,
        }
    }

    /// Pick the file named in the path input. Non-text extensions are refused.
    pub fn select_from_input(&mut self) -> bool {
        if self.analyzing || self.path_input.is_blank() {
            return false;
        }

        let path = PathBuf::from(self.path_input.value.trim());
        if !has_text_extension(&path) {
            self.error = Some(format!("Choose a text file ({}).", TEXT_EXTENSIONS.map(|e| format!(".{e}")).join(", ")));
            return false;
        }

        self.selected = Some(path);
        self.error = None;
        true
    }

    /// Start analyzing the selected file; `None` if one is running or nothing is selected
    pub fn begin_analysis(&mut self) -> Option<PathBuf> {
        if self.analyzing {
            return None;
        }
        let path = self.selected.clone()?;
        self.analyzing = true;
        self.error = None;
        Some(path)
    }

    pub fn apply(&mut self, outcome: AnalysisOutcome) {
        match outcome {
            AnalysisOutcome::ReadFailed(message) => {
                self.error = Some(message);
            }
            AnalysisOutcome::Analyzed { name, description } => {
                let now = chrono::Local::now();
                self.files.insert(
                    0,
                    UfoFile {
                        id: format!("FILE-{}", now.timestamp_millis()),
                        name,
                        description,
                        added: now.format("%Y-%m-%d").to_string(),
                    },
                );
                self.selected = None;
                self.path_input.take();
                self.scroll = 0;
            }
        }
        self.analyzing = false;
    }
}

// =============================================================================
// DASHBOARD
// =============================================================================

#[derive(Debug)]
pub struct DashboardView {
    pub focus: DashboardFocus,
    pub news: NewsWidget,
    pub foia: Vec<FoiaRequest>,
    pub files: FilesWidget,
}

impl DashboardView {
    pub fn new() -> Self {
        Self {
            focus: DashboardFocus::News,
            news: NewsWidget::new(),
            foia: seed_foia_requests(),
            files: FilesWidget::new(seed_files()),
        }
    }

    pub fn cycle_focus(&mut self) {
        self.focus = match self.focus {
            DashboardFocus::News => DashboardFocus::Foia,
            DashboardFocus::Foia => DashboardFocus::Files,
            DashboardFocus::Files => DashboardFocus::News,
        };
    }

    pub fn scroll_down(&mut self) {
        match self.focus {
            DashboardFocus::News => self.news.scroll = self.news.scroll.saturating_add(1),
            DashboardFocus::Files => self.files.scroll = self.files.scroll.saturating_add(1),
            DashboardFocus::Foia => {}
        }
    }

    pub fn scroll_up(&mut self) {
        match self.focus {
            DashboardFocus::News => self.news.scroll = self.news.scroll.saturating_sub(1),
            DashboardFocus::Files => self.files.scroll = self.files.scroll.saturating_sub(1),
            DashboardFocus::Foia => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::service::MISSING_KEY_MESSAGE;
    use crate::testing::{FakeTransport, FixedCredential};

    fn client(transport: Arc<FakeTransport>) -> GenerationClient {
        GenerationClient::new(transport, Arc::new(FixedCredential::new(Some("key"))), "gemini-2.5-flash")
    }

    #[test]
    fn test_news_starts_loading_and_refresh_waits_for_result() {
        let mut news = NewsWidget::new();
        assert!(news.is_loading());
        assert!(!news.begin_refresh());

        news.apply(Vec::new());
        assert_eq!(news.state, NewsState::Loaded(Vec::new()));
        assert!(news.begin_refresh());
        assert!(news.is_loading());
    }

    #[test]
    fn test_text_extension_filter() {
        assert!(has_text_extension(Path::new("notes/varginha.txt")));
        assert!(has_text_extension(Path::new("README.MD")));
        assert!(has_text_extension(Path::new("memo.text")));
        assert!(!has_text_extension(Path::new("gimbal.pdf")));
        assert!(!has_text_extension(Path::new("no_extension")));
    }

    #[test]
    fn test_select_rejects_non_text_file() {
        let mut files = FilesWidget::new(Vec::new());
        files.path_input = TextInput::with_value("report.pdf");
        assert!(!files.select_from_input());
        assert!(files.selected.is_none());
        assert!(files.error.is_some());
    }

    #[test]
    fn test_second_analysis_refused_while_running() {
        let mut files = FilesWidget::new(Vec::new());
        files.path_input = TextInput::with_value("a.txt");
        assert!(files.select_from_input());
        assert!(files.begin_analysis().is_some());
        assert!(files.begin_analysis().is_none());

        files.path_input = TextInput::with_value("b.txt");
        assert!(!files.select_from_input());
    }

    #[test]
    fn test_begin_analysis_requires_selection() {
        let mut files = FilesWidget::new(Vec::new());
        assert!(files.begin_analysis().is_none());
        assert!(!files.analyzing);
    }

    #[tokio::test]
    async fn test_unreadable_file_leaves_list_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(FakeTransport::replying("analysis"));
        let client = client(Arc::clone(&transport));

        let mut files = FilesWidget::new(seed_files());
        let before = files.files.clone();
        files.selected = Some(dir.path().join("missing.txt"));

        let path = files.begin_analysis().unwrap();
        let outcome = run_analysis(&client, &path).await;
        files.apply(outcome);

        assert_eq!(files.files, before);
        assert_eq!(files.error.as_deref(), Some(FILE_READ_FAILED));
        assert!(!files.analyzing);
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_file_is_reported_without_analysis() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        std::fs::write(&path, "").unwrap();

        let transport = Arc::new(FakeTransport::replying("analysis"));
        let outcome = run_analysis(&client(Arc::clone(&transport)), &path).await;

        assert_eq!(outcome, AnalysisOutcome::ReadFailed(FILE_EMPTY.to_string()));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_analyzed_file_is_prepended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nimitz.txt");
        std::fs::write(&path, "FLIR footage, 2004, USS Princeton radar").unwrap();

        let transport = Arc::new(FakeTransport::replying("1. Key entities: USS Princeton"));
        let client = client(Arc::clone(&transport));

        let mut files = FilesWidget::new(seed_files());
        files.path_input = TextInput::with_value(&path.display().to_string());
        assert!(files.select_from_input());

        let path = files.begin_analysis().unwrap();
        files.apply(run_analysis(&client, &path).await);

        assert_eq!(files.files.len(), 3);
        let added = &files.files[0];
        assert_eq!(added.name, "nimitz.txt");
        assert_eq!(added.description, "1. Key entities: USS Princeton");
        assert!(added.id.starts_with("FILE-"));
        assert_eq!(added.added.len(), "2024-01-15".len());
        assert!(files.selected.is_none());
        assert!(files.path_input.is_blank());
        assert!(!files.analyzing);

        let prompt = &transport.last_request().unwrap().contents[0].parts[0].text;
        assert!(prompt.contains("USS Princeton radar"));
    }

    #[tokio::test]
    async fn test_analysis_without_key_records_fallback_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memo.md");
        std::fs::write(&path, "# memo").unwrap();

        let client = GenerationClient::new(
            Arc::new(FakeTransport::replying("unused")),
            Arc::new(FixedCredential::new(None)),
            "gemini-2.5-flash",
        );
        let outcome = run_analysis(&client, &path).await;
        assert_eq!(
            outcome,
            AnalysisOutcome::Analyzed {
                name: "memo.md".to_string(),
                description: MISSING_KEY_MESSAGE.to_string(),
            }
        );
    }

    #[test]
    fn test_dashboard_seeds_foia_and_files() {
        let mut dashboard = DashboardView::new();
        assert_eq!(dashboard.foia.len(), 2);
        assert_eq!(dashboard.files.files.len(), 2);
        dashboard.cycle_focus();
        dashboard.cycle_focus();
        assert_eq!(dashboard.focus, DashboardFocus::Files);
    }
}
