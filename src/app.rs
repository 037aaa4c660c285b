use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use crate::credentials::CredentialStore;
use crate::service::GenerationClient;
use crate::tui::AppEvent;
use crate::views::chat::ChatView;
use crate::views::dashboard::{self, DashboardView};
use crate::views::planner::PlannerView;
use crate::views::TextInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Dashboard,
    Chat,
    Planner,
}

impl Screen {
    pub fn all() -> [Screen; 3] {
        [Screen::Dashboard, Screen::Chat, Screen::Planner]
    }

    pub fn title(&self) -> &'static str {
        match self {
            Screen::Dashboard => "Dashboard",
            Screen::Chat => "AI Assistant",
            Screen::Planner => "Social Planner",
        }
    }

    pub fn next(&self) -> Screen {
        match self {
            Screen::Dashboard => Screen::Chat,
            Screen::Chat => Screen::Planner,
            Screen::Planner => Screen::Dashboard,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// The credential form shown until a usable key is stored
#[derive(Debug, Default)]
pub struct SetupForm {
    pub input: TextInput,
    pub error: Option<String>,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub screen: Screen,
    pub input_mode: InputMode,

    // Credential gate
    pub credentials: Arc<CredentialStore>,
    pub setup: SetupForm,
    views_mounted: bool,

    // Views
    pub dashboard: DashboardView,
    pub chat: ChatView,
    pub planner: PlannerView,

    // Chat area dimensions for scroll calculations (updated during render)
    pub chat_height: u16,
    pub chat_width: u16,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    pub client: Arc<GenerationClient>,
    events: UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(
        credentials: Arc<CredentialStore>,
        client: Arc<GenerationClient>,
        events: UnboundedSender<AppEvent>,
    ) -> Self {
        let mut app = Self {
            should_quit: false,
            screen: Screen::Dashboard,
            input_mode: InputMode::Normal,

            credentials,
            setup: SetupForm::default(),
            views_mounted: false,

            dashboard: DashboardView::new(),
            chat: ChatView::new(None),
            planner: PlannerView::new(),

            chat_height: 0,
            chat_width: 0,

            animation_frame: 0,

            client,
            events,
        };

        if app.credentials.is_set() {
            app.mount_views();
        } else {
            app.input_mode = InputMode::Editing;
        }
        app
    }

    /// True while the setup screen gates the views
    pub fn needs_setup(&self) -> bool {
        !self.views_mounted
    }

    /// Mount-time work: open the chat session and issue the one news fetch
    fn mount_views(&mut self) {
        if self.views_mounted {
            return;
        }
        self.views_mounted = true;
        self.input_mode = InputMode::Normal;
        self.chat.set_session(self.client.init_chat());
        self.spawn_news_fetch();
        info!(model = self.client.model(), "views mounted");
    }

    pub fn save_credential(&mut self) {
        let value = self.setup.input.value.clone();
        match self.credentials.save(&value) {
            Ok(()) if self.credentials.is_set() => {
                self.setup = SetupForm::default();
                self.mount_views();
            }
            Ok(()) => {
                self.setup.error = Some("That looks like the placeholder key. Paste your real key.".to_string());
            }
            Err(e) => {
                warn!(error = %e, "setup: could not save credential");
                self.setup.error = Some(e.to_string());
            }
        }
    }

    // Background operations. Each view's own guard decides whether one may start.

    fn spawn_news_fetch(&self) {
        let client = Arc::clone(&self.client);
        let tx = self.events.clone();
        tokio::spawn(async move {
            let articles = client.fetch_recent_news().await;
            let _ = tx.send(AppEvent::News(articles));
        });
    }

    pub fn refresh_news(&mut self) {
        if self.dashboard.news.begin_refresh() {
            self.spawn_news_fetch();
        }
    }

    pub fn send_chat_message(&mut self) {
        let Some(pending) = self.chat.begin_send() else {
            return;
        };
        self.scroll_chat_to_bottom();

        let tx = self.events.clone();
        tokio::spawn(async move {
            pending
                .session
                .send_message_stream(&pending.message, |event| {
                    let _ = tx.send(AppEvent::Chat(event));
                })
                .await;
        });
    }

    pub fn analyze_selected_file(&mut self) {
        let Some(path) = self.dashboard.files.begin_analysis() else {
            return;
        };

        let client = Arc::clone(&self.client);
        let tx = self.events.clone();
        tokio::spawn(async move {
            let outcome = dashboard::run_analysis(&client, &path).await;
            let _ = tx.send(AppEvent::Analysis(outcome));
        });
    }

    pub fn generate_ideas(&mut self) {
        let Some(topic) = self.planner.begin_generate() else {
            return;
        };

        let client = Arc::clone(&self.client);
        let tx = self.events.clone();
        tokio::spawn(async move {
            let ideas = client.generate_social_post_ideas(&topic).await;
            let _ = tx.send(AppEvent::Ideas(ideas));
        });
    }

    /// Any operation whose spinner should animate
    pub fn is_busy(&self) -> bool {
        self.chat.is_loading()
            || self.dashboard.news.is_loading()
            || self.dashboard.files.analyzing
            || self.planner.loading
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_busy() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Keep the newest chat text visible
    pub fn scroll_chat_to_bottom(&mut self) {
        // Fall back to sane defaults before the first render
        let wrap_width = if self.chat_width > 0 { self.chat_width as usize } else { 50 };
        let visible_height = if self.chat_height > 0 { self.chat_height } else { 20 };
        self.chat.scroll_to_bottom(visible_height, wrap_width);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeTransport;
    use tokio::sync::mpsc;

    fn app_with(key: Option<&str>, transport: FakeTransport) -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let credentials = Arc::new(CredentialStore::in_memory(key.map(str::to_string)));
        let client = Arc::new(GenerationClient::new(
            Arc::new(transport),
            credentials.clone(),
            "gemini-2.5-flash",
        ));
        let (tx, rx) = mpsc::unbounded_channel();
        (App::new(credentials, client, tx), rx)
    }

    #[tokio::test]
    async fn test_missing_credential_shows_setup_without_network() {
        let (app, mut rx) = app_with(None, FakeTransport::replying("{}"));
        assert!(app.needs_setup());
        assert_eq!(app.input_mode, InputMode::Editing);
        assert!(!app.chat.has_session());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_saving_credential_mounts_views_and_fetches_news() {
        let (mut app, mut rx) = app_with(None, FakeTransport::replying(r#"{"articles":[]}"#));

        app.setup.input = TextInput::with_value("   ");
        app.save_credential();
        assert!(app.needs_setup());
        assert!(app.setup.error.is_some());

        app.setup.input = TextInput::with_value("AIza-real");
        app.save_credential();
        assert!(!app.needs_setup());
        assert!(app.chat.has_session());

        match rx.recv().await {
            Some(AppEvent::News(articles)) => assert!(articles.is_empty()),
            other => panic!("expected news event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_chat_send_streams_through_event_channel() {
        let (mut app, mut rx) = app_with(Some("key"), FakeTransport::streaming(&["Hel", "lo", " world"]));
        // Drain the mount-time news fetch
        assert!(matches!(rx.recv().await, Some(AppEvent::News(_))));

        app.chat.input = TextInput::with_value("hi");
        app.send_chat_message();
        let count = app.chat.messages.len();

        // A second send while the first streams changes nothing
        app.chat.input = TextInput::with_value("again");
        app.send_chat_message();
        assert_eq!(app.chat.messages.len(), count);

        while let Some(AppEvent::Chat(event)) = rx.recv().await {
            let done = !matches!(event, crate::service::ChatEvent::Fragment(_));
            app.chat.apply(event);
            if done {
                break;
            }
        }

        let reply = app.chat.last_model_message().unwrap();
        assert_eq!(reply.text, "Hello world");
        assert!(!reply.is_streaming);
    }
}
