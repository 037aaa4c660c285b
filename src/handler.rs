use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crate::app::{App, InputMode, Screen};
use crate::tui::AppEvent;
use crate::views::dashboard::DashboardFocus;
use crate::views::TextInput;

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick_animation();
        }
        AppEvent::News(articles) => app.dashboard.news.apply(articles),
        AppEvent::Chat(event) => {
            app.chat.apply(event);
            app.scroll_chat_to_bottom();
        }
        AppEvent::Analysis(outcome) => app.dashboard.files.apply(outcome),
        AppEvent::Ideas(ideas) => app.planner.apply(ideas),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    if app.needs_setup() {
        handle_setup(app, key);
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_setup(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.should_quit = true,
        KeyCode::Enter => app.save_credential(),
        _ => {
            edit_input(&mut app.setup.input, key);
            app.setup.error = None;
        }
    }
}

/// Shared line-editing keys. Returns false for keys it does not handle.
fn edit_input(input: &mut TextInput, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char(c) => input.insert(c),
        KeyCode::Backspace => input.backspace(),
        KeyCode::Delete => input.delete(),
        KeyCode::Left => input.left(),
        KeyCode::Right => input.right(),
        KeyCode::Home => input.home(),
        KeyCode::End => input.end(),
        _ => return false,
    }
    true
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    // Screen switching
    match key.code {
        KeyCode::Char('q') => {
            app.should_quit = true;
            return;
        }
        KeyCode::Char('1') => {
            app.screen = Screen::Dashboard;
            return;
        }
        KeyCode::Char('2') => {
            app.screen = Screen::Chat;
            return;
        }
        KeyCode::Char('3') => {
            app.screen = Screen::Planner;
            return;
        }
        KeyCode::BackTab => {
            app.screen = app.screen.next();
            return;
        }
        _ => {}
    }

    match app.screen {
        Screen::Dashboard => handle_dashboard_normal(app, key),
        Screen::Chat => handle_chat_normal(app, key),
        Screen::Planner => handle_planner_normal(app, key),
    }
}

fn handle_dashboard_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Tab => app.dashboard.cycle_focus(),
        KeyCode::Char('j') | KeyCode::Down => app.dashboard.scroll_down(),
        KeyCode::Char('k') | KeyCode::Up => app.dashboard.scroll_up(),
        KeyCode::Char('r') => app.refresh_news(),

        // Choose a file to analyze
        KeyCode::Char('o') | KeyCode::Char('i') => {
            if !app.dashboard.files.analyzing {
                app.dashboard.focus = DashboardFocus::Files;
                app.input_mode = InputMode::Editing;
            }
        }
        KeyCode::Enter => {
            if app.dashboard.focus == DashboardFocus::Files {
                app.analyze_selected_file();
            }
        }
        _ => {}
    }
}

fn handle_chat_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('i') | KeyCode::Tab => {
            if !app.chat.is_loading() {
                app.input_mode = InputMode::Editing;
                app.chat.input.end();
            }
        }
        KeyCode::Char('j') | KeyCode::Down => app.chat.scroll = app.chat.scroll.saturating_add(1),
        KeyCode::Char('k') | KeyCode::Up => app.chat.scroll = app.chat.scroll.saturating_sub(1),
        KeyCode::Char('g') => app.chat.scroll = 0,
        KeyCode::Char('G') => app.scroll_chat_to_bottom(),
        _ => {}
    }
}

fn handle_planner_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('i') | KeyCode::Tab => {
            if !app.planner.loading {
                app.input_mode = InputMode::Editing;
                app.planner.topic.end();
            }
        }
        KeyCode::Enter => app.generate_ideas(),
        KeyCode::Char('j') | KeyCode::Down => app.planner.scroll = app.planner.scroll.saturating_add(1),
        KeyCode::Char('k') | KeyCode::Up => app.planner.scroll = app.planner.scroll.saturating_sub(1),
        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Esc {
        app.input_mode = InputMode::Normal;
        return;
    }

    match app.screen {
        Screen::Dashboard => {
            if key.code == KeyCode::Enter {
                if app.dashboard.files.select_from_input() {
                    app.input_mode = InputMode::Normal;
                    app.analyze_selected_file();
                }
            } else {
                edit_input(&mut app.dashboard.files.path_input, key);
            }
        }
        Screen::Chat => {
            if key.code == KeyCode::Enter {
                if !app.chat.is_loading() && !app.chat.input.is_blank() {
                    app.send_chat_message();
                    app.input_mode = InputMode::Normal;
                }
            } else {
                edit_input(&mut app.chat.input, key);
            }
        }
        Screen::Planner => {
            if key.code == KeyCode::Enter {
                if !app.planner.topic.is_blank() {
                    app.generate_ideas();
                    app.input_mode = InputMode::Normal;
                }
            } else {
                edit_input(&mut app.planner.topic, key);
            }
        }
    }
}
