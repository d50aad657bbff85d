use crate::app::{App, Focus, Task};
use crate::manager::ManagerTab;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use lead_core::Decision;

#[derive(Debug, PartialEq)]
pub enum KeyOutcome {
    Quit,
    Continue(Vec<Task>),
}

impl KeyOutcome {
    fn none() -> Self {
        KeyOutcome::Continue(Vec::new())
    }
}

pub fn handle_input(event: Event, app: &mut App) -> KeyOutcome {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => handle_key(key, app),
        _ => KeyOutcome::none(),
    }
}

pub fn handle_key(key: KeyEvent, app: &mut App) -> KeyOutcome {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return KeyOutcome::Quit;
    }
    let typing = app.focus != Focus::Browse;
    if key.code == KeyCode::F(1) || (!typing && key.code == KeyCode::Char('?')) {
        app.help_open = !app.help_open;
        return KeyOutcome::none();
    }
    if app.help_open {
        if key.code == KeyCode::Esc {
            app.help_open = false;
        }
        return KeyOutcome::none();
    }

    if app.editor.pending_confirm().is_some() {
        return match key.code {
            KeyCode::Char('y') | KeyCode::Enter => KeyOutcome::Continue(app.confirm()),
            KeyCode::Char('n') | KeyCode::Esc => {
                app.editor.cancel_confirm();
                KeyOutcome::none()
            }
            _ => KeyOutcome::none(),
        };
    }

    match app.focus {
        Focus::Browse => handle_browse(key, app),
        Focus::Search => handle_search_input(key, app),
        Focus::Form => handle_form_input(key, app),
        Focus::Chat => handle_chat_input(key, app),
        Focus::Login => handle_login_input(key, app),
        Focus::AnalysisSearch => {
            match key.code {
                KeyCode::Char(ch) => app.manager.analysis.search.push(ch),
                KeyCode::Backspace => {
                    app.manager.analysis.search.pop();
                }
                KeyCode::Enter | KeyCode::Esc => app.focus = Focus::Browse,
                _ => {}
            }
            app.manager.analysis_scroll = 0;
            KeyOutcome::none()
        }
    }
}

fn handle_search_input(key: KeyEvent, app: &mut App) -> KeyOutcome {
    match key.code {
        KeyCode::Char(ch) => app.editor.search_input.push(ch),
        KeyCode::Backspace => {
            app.editor.search_input.pop();
        }
        KeyCode::Enter => {
            app.focus = Focus::Browse;
            return KeyOutcome::Continue(app.search());
        }
        KeyCode::Esc => app.focus = Focus::Browse,
        _ => {}
    }
    KeyOutcome::none()
}

fn handle_form_input(key: KeyEvent, app: &mut App) -> KeyOutcome {
    match key.code {
        KeyCode::Char(ch) => app.editor.type_char(ch),
        KeyCode::Backspace => app.editor.backspace(),
        KeyCode::Tab | KeyCode::Down => app.editor.move_focus(1),
        KeyCode::BackTab | KeyCode::Up => app.editor.move_focus(-1),
        KeyCode::Enter => return KeyOutcome::Continue(app.submit()),
        KeyCode::Esc => app.focus = Focus::Browse,
        _ => {}
    }
    KeyOutcome::none()
}

fn handle_chat_input(key: KeyEvent, app: &mut App) -> KeyOutcome {
    match key.code {
        KeyCode::Char(ch) => app.chat.draft.push(ch),
        KeyCode::Backspace => {
            app.chat.draft.pop();
        }
        KeyCode::Enter => return KeyOutcome::Continue(app.send_chat()),
        KeyCode::Esc => app.focus = Focus::Browse,
        _ => {}
    }
    KeyOutcome::none()
}

fn handle_login_input(key: KeyEvent, app: &mut App) -> KeyOutcome {
    match key.code {
        KeyCode::Char(ch) => app.manager.login.type_char(ch),
        KeyCode::Backspace => app.manager.login.backspace(),
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
            app.manager.login.toggle_focus()
        }
        KeyCode::Enter => return KeyOutcome::Continue(app.login()),
        KeyCode::Esc => app.focus = Focus::Browse,
        _ => {}
    }
    KeyOutcome::none()
}

fn handle_browse(key: KeyEvent, app: &mut App) -> KeyOutcome {
    match key.code {
        KeyCode::Char('q') => return KeyOutcome::Quit,
        KeyCode::Char('r') => return KeyOutcome::Continue(app.refresh()),
        _ => {}
    }
    if app.is_manager() {
        handle_manager_browse(key, app)
    } else if app.is_operator_portal() {
        handle_portal_browse(key, app)
    } else {
        match key.code {
            KeyCode::Char('b') => app.stats.toggle(),
            KeyCode::Down | KeyCode::Char('j') => app.scroll = app.scroll.saturating_add(1),
            KeyCode::Up | KeyCode::Char('k') => app.scroll = app.scroll.saturating_sub(1),
            _ => {}
        }
        KeyOutcome::none()
    }
}

fn handle_portal_browse(key: KeyEvent, app: &mut App) -> KeyOutcome {
    if !app.editor.candidates().is_empty() {
        match key.code {
            KeyCode::Down | KeyCode::Char('j') => {
                app.editor.move_candidate(1);
                return KeyOutcome::none();
            }
            KeyCode::Up | KeyCode::Char('k') => {
                app.editor.move_candidate(-1);
                return KeyOutcome::none();
            }
            KeyCode::Enter => return KeyOutcome::Continue(app.choose_candidate()),
            KeyCode::Esc => {
                app.editor.dismiss_candidates();
                return KeyOutcome::none();
            }
            _ => {}
        }
    }
    match key.code {
        KeyCode::Char('/') | KeyCode::Char('f') => app.focus = Focus::Search,
        KeyCode::Char('e') | KeyCode::Enter => app.focus = Focus::Form,
        KeyCode::Char('s') => return KeyOutcome::Continue(app.submit()),
        KeyCode::Char('t') => app.editor.toggle_timestamp_mode(),
        KeyCode::Char('n') => app.reset_editor(),
        KeyCode::Char('b') => app.stats.toggle(),
        KeyCode::Char('c') => app.toggle_chat(),
        KeyCode::Char('m') => {
            if !app.chat.is_open() {
                app.toggle_chat();
            }
            if app.chat.is_open() {
                app.focus = Focus::Chat;
            }
        }
        KeyCode::Down | KeyCode::Char('j') => app.scroll = app.scroll.saturating_add(1),
        KeyCode::Up | KeyCode::Char('k') => app.scroll = app.scroll.saturating_sub(1),
        KeyCode::Char('g') => app.scroll = 0,
        _ => {}
    }
    KeyOutcome::none()
}

fn handle_manager_browse(key: KeyEvent, app: &mut App) -> KeyOutcome {
    if !app.manager.is_logged_in() {
        if matches!(key.code, KeyCode::Enter | KeyCode::Char('l')) {
            app.focus = Focus::Login;
        }
        return KeyOutcome::none();
    }
    match key.code {
        KeyCode::Char(digit @ '1'..='4') => {
            let index = digit as usize - '1' as usize;
            app.manager.set_tab(ManagerTab::ALL[index]);
            return KeyOutcome::none();
        }
        KeyCode::Tab => {
            app.manager.set_tab(app.manager.tab().next());
            return KeyOutcome::none();
        }
        KeyCode::Char('o') => {
            app.logout();
            return KeyOutcome::none();
        }
        _ => {}
    }
    match app.manager.tab() {
        ManagerTab::Stats => {
            if key.code == KeyCode::Char('b') {
                app.manager.toggle_stats_type();
            }
            KeyOutcome::none()
        }
        ManagerTab::Pending => match key.code {
            KeyCode::Down | KeyCode::Char('j') => {
                app.manager.move_selection(1);
                KeyOutcome::none()
            }
            KeyCode::Up | KeyCode::Char('k') => {
                app.manager.move_selection(-1);
                KeyOutcome::none()
            }
            KeyCode::Char('b') => {
                app.manager.toggle_pending_type();
                KeyOutcome::none()
            }
            KeyCode::Char('a') => KeyOutcome::Continue(app.decide(Decision::Approve)),
            KeyCode::Char('d') => KeyOutcome::Continue(app.decide(Decision::Decline)),
            _ => KeyOutcome::none(),
        },
        ManagerTab::Analysis => {
            let manager = &mut app.manager;
            match key.code {
                KeyCode::Char('b') => manager.toggle_analysis_type(),
                KeyCode::Char('[') => manager.analysis.shift_start(-1),
                KeyCode::Char(']') => manager.analysis.shift_start(1),
                KeyCode::Char('{') => manager.analysis.shift_end(-1),
                KeyCode::Char('}') => manager.analysis.shift_end(1),
                KeyCode::Char('u') => manager.cycle_analysis_agent(),
                KeyCode::Char('s') => manager.analysis.cycle_status(),
                KeyCode::Char('/') => app.focus = Focus::AnalysisSearch,
                KeyCode::Down | KeyCode::Char('j') => {
                    manager.analysis_scroll = manager.analysis_scroll.saturating_add(1)
                }
                KeyCode::Up | KeyCode::Char('k') => {
                    manager.analysis_scroll = manager.analysis_scroll.saturating_sub(1)
                }
                KeyCode::Char('g') => manager.analysis_scroll = 0,
                _ => {}
            }
            KeyOutcome::none()
        }
        ManagerTab::Edit => match key.code {
            KeyCode::Char('/') | KeyCode::Char('f') => {
                app.focus = Focus::Search;
                KeyOutcome::none()
            }
            KeyCode::Char('b') => {
                let next = app.editor.lead_type().toggle();
                app.editor.set_lead_type(next);
                KeyOutcome::none()
            }
            KeyCode::Char('e') | KeyCode::Enter => {
                if app.editor.form_visible() {
                    app.focus = Focus::Form;
                }
                KeyOutcome::none()
            }
            KeyCode::Char('s') => KeyOutcome::Continue(app.submit()),
            KeyCode::Char('x') => KeyOutcome::Continue(app.request_delete()),
            KeyCode::Char('t') => {
                app.editor.toggle_timestamp_mode();
                KeyOutcome::none()
            }
            KeyCode::Char('n') => {
                app.reset_editor();
                KeyOutcome::none()
            }
            _ => KeyOutcome::none(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AppEvent;
    use crate::config::Config;
    use chrono::NaiveDate;
    use lead_core::stats::ManagerData;
    use lead_core::{LeadRecord, LeadType, Portal, SearchResult};

    fn app(portal: Portal, token: Option<&str>) -> App {
        App::new(
            &Config {
                api_url: "http://127.0.0.1:8000".to_string(),
                portal,
                agent: Some("Haziq".to_string()),
                push: None,
                manager_token: token.map(str::to_string),
                sound: false,
            },
            NaiveDate::from_ymd_opt(2026, 1, 2).expect("date"),
        )
    }

    fn press(app: &mut App, code: KeyCode) -> KeyOutcome {
        handle_key(KeyEvent::new(code, KeyModifiers::NONE), app)
    }

    fn type_text(app: &mut App, text: &str) {
        for ch in text.chars() {
            press(app, KeyCode::Char(ch));
        }
    }

    #[test]
    fn quit_and_help_toggle() {
        let mut app = app(Portal::Billing, None);
        press(&mut app, KeyCode::Char('?'));
        assert!(app.help_open);
        assert_eq!(press(&mut app, KeyCode::Char('q')), KeyOutcome::none());
        press(&mut app, KeyCode::Esc);
        assert!(!app.help_open);
        assert_eq!(press(&mut app, KeyCode::Char('q')), KeyOutcome::Quit);
        assert_eq!(
            handle_key(
                KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
                &mut app
            ),
            KeyOutcome::Quit
        );
    }

    #[test]
    fn typing_a_search_id_then_enter_sends_lookup() {
        let mut app = app(Portal::Billing, None);
        press(&mut app, KeyCode::Char('/'));
        assert_eq!(app.focus, Focus::Search);
        type_text(&mut app, "A1q?");
        let outcome = press(&mut app, KeyCode::Enter);
        assert_eq!(
            outcome,
            KeyOutcome::Continue(vec![Task::Search {
                lead_type: LeadType::Billing,
                id: "A1q?".to_string(),
                row_index: None,
            }])
        );
        assert_eq!(app.focus, Focus::Browse);
    }

    #[test]
    fn update_waits_for_y() {
        let mut app = app(Portal::Billing, None);
        app.editor.search_input = "A100".to_string();
        app.search();
        app.apply_event(AppEvent::Search(Ok(SearchResult::Single(
            LeadRecord::new(Some(7)).with_field("Order ID", "A100"),
        ))));
        assert_eq!(press(&mut app, KeyCode::Char('s')), KeyOutcome::none());
        assert!(app.editor.pending_confirm().is_some());
        let KeyOutcome::Continue(tasks) = press(&mut app, KeyCode::Char('y')) else {
            panic!("confirm should continue")
        };
        assert!(matches!(tasks.as_slice(), [Task::Save(save)] if save.is_edit));
    }

    #[test]
    fn manager_pending_keys_send_one_request() {
        let mut app = app(Portal::Manager, Some("tok"));
        app.startup_tasks();
        app.apply_event(AppEvent::ManagerData(Ok(ManagerData {
            insurance: vec![LeadRecord::new(Some(3))
                .with_field("Record_ID", "INS-1")
                .with_field("Status", "Submitted")],
            ..ManagerData::default()
        })));
        press(&mut app, KeyCode::Char('2'));
        assert_eq!(app.manager.tab(), ManagerTab::Pending);
        assert_eq!(press(&mut app, KeyCode::Char('d')), KeyOutcome::none());
        press(&mut app, KeyCode::Char('b'));
        let KeyOutcome::Continue(tasks) = press(&mut app, KeyCode::Char('d')) else {
            panic!("decline should continue")
        };
        assert_eq!(tasks.len(), 1);
        assert_eq!(press(&mut app, KeyCode::Char('a')), KeyOutcome::none());
    }

    #[test]
    fn manager_without_token_types_into_login() {
        let mut app = app(Portal::Manager, None);
        assert_eq!(app.focus, Focus::Login);
        type_text(&mut app, "boss");
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "pw");
        assert_eq!(
            press(&mut app, KeyCode::Enter),
            KeyOutcome::Continue(vec![Task::Login {
                user_id: "boss".to_string(),
                password: "pw".to_string(),
            }])
        );
    }

    #[test]
    fn chat_draft_is_sent_with_enter() {
        let mut app = app(Portal::Insurance, None);
        press(&mut app, KeyCode::Char('m'));
        assert!(app.chat.is_open());
        assert_eq!(app.focus, Focus::Chat);
        type_text(&mut app, "hello q");
        let KeyOutcome::Continue(tasks) = press(&mut app, KeyCode::Enter) else {
            panic!("send should continue")
        };
        assert!(matches!(
            tasks.as_slice(),
            [Task::SendChat(message)] if message.message == "hello q"
        ));
    }
}
