use crate::analysis::{self, column_value};
use crate::app::{App, Focus};
use crate::editor::{EditorSurface, LeadEditor};
use crate::manager::{CardState, ManagerTab, NO_PENDING};
use crate::notifications::Tone;
use crate::stats::EMPTY_BREAKDOWN;
use lead_core::format::{clean_card_number, clean_charge, clean_expiry, format_currency};
use lead_core::{fields, Decision, TimestampMode};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

const COMPACT_WIDTH: u16 = 92;
const ANALYSIS_COLUMNS: &[&str] = &[
    fields::RECORD_ID,
    fields::AGENT_NAME,
    fields::NAME,
    fields::CHARGE,
    fields::STATUS,
    fields::TIMESTAMP,
];

#[derive(Clone, Copy)]
struct DeskTheme {
    bg: Color,
    surface: Color,
    border: Color,
    title: Color,
    text: Color,
    muted: Color,
    accent: Color,
    ok: Color,
    warn: Color,
    critical: Color,
    info: Color,
}

fn desk_theme() -> DeskTheme {
    DeskTheme {
        bg: Color::Rgb(11, 18, 32),
        surface: Color::Rgb(17, 26, 46),
        border: Color::Rgb(71, 85, 105),
        title: Color::Rgb(191, 219, 254),
        text: Color::Rgb(226, 232, 240),
        muted: Color::Rgb(148, 163, 184),
        accent: Color::Rgb(56, 189, 248),
        ok: Color::Rgb(34, 197, 94),
        warn: Color::Rgb(245, 158, 11),
        critical: Color::Rgb(239, 68, 68),
        info: Color::Rgb(59, 130, 246),
    }
}

pub fn render_ui(frame: &mut Frame, app: &App) {
    let size = frame.size();
    let theme = desk_theme();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(size);
    frame.render_widget(render_header(app, theme, size.width), layout[0]);
    frame.render_widget(render_kpis(app, theme, size.width), layout[1]);
    if app.is_manager() {
        render_manager_body(frame, app, theme, layout[2]);
    } else {
        render_portal_body(frame, app, theme, layout[2]);
    }
    if let Some(confirm) = app.editor.pending_confirm() {
        render_confirm(frame, confirm.prompt(), theme);
    }
    render_toast(frame, app, theme);
    if app.help_open {
        render_help_overlay(frame, app, theme);
    }
}

fn panel(title: impl Into<String>, theme: DeskTheme) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border))
        .style(Style::default().bg(theme.surface))
        .title(Span::styled(
            title.into(),
            Style::default()
                .fg(theme.title)
                .add_modifier(Modifier::BOLD),
        ))
}

fn render_header(app: &App, theme: DeskTheme, width: u16) -> Paragraph<'static> {
    let inner_width = width.saturating_sub(4) as usize;
    let mut status_fields = vec![
        format!("Portal: {}", app.portal()),
        format!("Live: {}", app.push_status.label()),
    ];
    if let Some(agent) = app.chat.sender() {
        status_fields.push(format!("Agent: {agent}"));
    }
    if app.is_manager() {
        status_fields.push(format!(
            "Session: {}",
            if app.manager.is_logged_in() {
                "signed in"
            } else {
                "signed out"
            }
        ));
    }
    let status_line = fit_fields(&status_fields, inner_width.max(12));

    let action_text = match app.status_note.as_deref() {
        Some(note) => format!("Last Action: {note}"),
        None if is_compact(width) => "Last Action: ready".to_string(),
        None => "Last Action: ready (? help, q quit)".to_string(),
    };
    let action_color = match app.status_note.as_deref() {
        Some(note) => status_note_color(note, theme),
        None => theme.muted,
    };

    Paragraph::new(Text::from(vec![
        Line::from(Span::styled(status_line, Style::default().fg(theme.text))),
        Line::from(Span::styled(
            ellipsize(&action_text, inner_width.max(12)),
            Style::default().fg(action_color),
        )),
    ]))
    .style(Style::default().fg(theme.text).bg(theme.bg))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.border))
            .style(Style::default().bg(theme.bg))
            .title(Span::styled(
                "Status",
                Style::default()
                    .fg(theme.title)
                    .add_modifier(Modifier::BOLD),
            )),
    )
}

fn render_kpis(app: &App, theme: DeskTheme, width: u16) -> Paragraph<'static> {
    let inner_width = width.saturating_sub(4) as usize;
    let mut fields = Vec::new();
    if app.is_manager() {
        let stats = app.manager.stats();
        fields.push(format!(
            "Pending: {}",
            app.manager.pending_cards().len()
        ));
        fields.push(format!(
            "{} Today: {}",
            app.manager.stats_type().title(),
            format_currency(stats.today)
        ));
        fields.push(format!("Night: {}", format_currency(stats.night)));
        fields.push(format!(
            "Data: {}",
            if app.manager.is_fetching() {
                "refreshing"
            } else if app.manager.is_loaded() {
                "loaded"
            } else {
                "waiting"
            }
        ));
    } else {
        fields.push(format!(
            "{} Night: {}",
            app.stats.selected().title(),
            format_currency(app.stats.total())
        ));
        if let Some((agent, amount)) = app.stats.rows().first() {
            fields.push(format!("Top: {agent} {}", format_currency(*amount)));
        }
        if let Some(at) = app.stats.updated_at() {
            fields.push(format!("Updated: {}", at.format("%H:%M:%S")));
        }
        if app.stats.failures() > 0 {
            fields.push(format!("Poll Failures: {}", app.stats.failures()));
        }
        if let Some(badge) = app.chat.badge() {
            fields.push(format!("Chat: {badge} unread"));
        }
    }
    let line = fit_fields(&fields, inner_width.max(12));
    Paragraph::new(Line::from(Span::styled(
        line,
        Style::default().fg(theme.text),
    )))
    .style(Style::default().fg(theme.text).bg(theme.surface))
    .block(panel("Totals", theme))
}

fn render_portal_body(frame: &mut Frame, app: &App, theme: DeskTheme, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    if app.is_operator_portal() {
        let title = format!("{} Lead", app.editor.lead_type().title());
        frame.render_widget(
            Paragraph::new(Text::from(editor_lines(app, &app.editor, theme)))
                .style(Style::default().fg(theme.text).bg(theme.surface))
                .block(panel(title, theme))
                .scroll((app.scroll, 0)),
            columns[0],
        );
    } else {
        frame.render_widget(
            Paragraph::new(Text::from(stats_lines(app, theme)))
                .style(Style::default().fg(theme.text).bg(theme.surface))
                .block(panel(
                    format!("Night Sales ({})", app.stats.selected().title()),
                    theme,
                ))
                .scroll((app.scroll, 0)),
            columns[0],
        );
    }

    let mut side = vec![Constraint::Min(5)];
    if app.is_operator_portal() {
        side.insert(0, Constraint::Length(9));
    }
    if app.chat.is_open() {
        side.push(Constraint::Percentage(45));
    }
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(side)
        .split(columns[1]);
    let mut slot = 0;
    if app.is_operator_portal() {
        frame.render_widget(
            Paragraph::new(Text::from(stats_lines(app, theme)))
                .style(Style::default().fg(theme.text).bg(theme.surface))
                .block(panel(
                    format!("Night Sales ({})", app.stats.selected().title()),
                    theme,
                )),
            rows[slot],
        );
        slot += 1;
    }
    render_notifications(frame, app, theme, rows[slot]);
    if app.chat.is_open() {
        render_chat(frame, app, theme, rows[slot + 1]);
    }
}

fn stats_lines(app: &App, theme: DeskTheme) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(vec![
        Span::styled("Total ", Style::default().fg(theme.muted)),
        Span::styled(
            format_currency(app.stats.total()),
            Style::default().fg(theme.ok).add_modifier(Modifier::BOLD),
        ),
    ])];
    let rows = app.stats.rows();
    if rows.is_empty() {
        lines.push(Line::from(Span::styled(
            EMPTY_BREAKDOWN,
            Style::default().fg(theme.muted),
        )));
    }
    lines.extend(rows.into_iter().map(|(agent, amount)| breakdown_line(&agent, amount, theme)));
    lines
}

fn breakdown_line(agent: &str, amount: f64, theme: DeskTheme) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{:<20}", ellipsize(agent, 20)), Style::default().fg(theme.text)),
        Span::styled(format_currency(amount), Style::default().fg(theme.accent)),
    ])
}

fn editor_lines(app: &App, editor: &LeadEditor, theme: DeskTheme) -> Vec<Line<'static>> {
    let lead_type = editor.lead_type();
    let search_focused = app.focus == Focus::Search;
    let mut lines = vec![Line::from(vec![
        Span::styled(
            format!("Find {}: ", lead_type.id_label()),
            Style::default().fg(theme.muted),
        ),
        Span::styled(
            format!(
                "{}{}",
                editor.search_input,
                if search_focused { "_" } else { "" }
            ),
            input_style(search_focused, theme),
        ),
        Span::raw("  "),
        Span::styled(
            format!("[{}]", editor.search_label()),
            Style::default().fg(if editor.is_searching() {
                theme.warn
            } else {
                theme.accent
            }),
        ),
    ])];

    if !editor.candidates().is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!(
                "Multiple records found ({}). Enter to load, Esc to dismiss:",
                editor.candidates().len()
            ),
            Style::default().fg(theme.warn).add_modifier(Modifier::BOLD),
        )));
        for (idx, candidate) in editor.candidates().iter().enumerate() {
            let selected = idx == editor.selected_candidate();
            lines.push(Line::from(Span::styled(
                format!(
                    "{} row {:<5} {:<22} {:<10} {}",
                    if selected { ">>" } else { "  " },
                    candidate.row_index,
                    ellipsize(&candidate.name, 22),
                    candidate.charge,
                    candidate.timestamp
                ),
                if selected {
                    Style::default()
                        .fg(theme.bg)
                        .bg(theme.accent)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(theme.text)
                },
            )));
        }
    }

    if !editor.form_visible() {
        return lines;
    }
    lines.push(Line::from(""));
    let form_focused = app.focus == Focus::Form;
    let focused_field = editor.focused_field();
    for field in editor.fields() {
        let focused = form_focused && field == focused_field;
        let locked = field == crate::form::FormField::BusinessId && editor.id_locked();
        let value = editor.form().get(field).to_string();
        lines.push(Line::from(vec![
            Span::styled(
                format!(
                    "{}{:<18}",
                    if focused { "> " } else { "  " },
                    field.label(lead_type)
                ),
                Style::default().fg(if focused { theme.accent } else { theme.muted }),
            ),
            Span::styled(
                format!("{value}{}", if locked { " (locked)" } else { "" }),
                if locked {
                    Style::default().fg(theme.muted)
                } else {
                    input_style(focused, theme)
                },
            ),
        ]));
    }

    lines.push(Line::from(""));
    let mut actions = vec![Span::styled(
        format!("[s] {}", editor.submit_label()),
        Style::default().fg(theme.ok).add_modifier(Modifier::BOLD),
    )];
    if editor.is_editing() {
        let mode = match editor.timestamp_mode() {
            TimestampMode::Keep => "keep original",
            TimestampMode::Now => "use now",
        };
        actions.push(Span::raw("  "));
        actions.push(Span::styled(
            format!("[t] timestamp: {mode}"),
            Style::default().fg(theme.info),
        ));
        if editor.surface() == EditorSurface::Manager {
            actions.push(Span::raw("  "));
            actions.push(Span::styled(
                format!("[x] {}", editor.delete_label()),
                Style::default().fg(theme.critical),
            ));
        }
    }
    lines.push(Line::from(actions));
    lines
}

fn input_style(focused: bool, theme: DeskTheme) -> Style {
    if focused {
        Style::default()
            .fg(theme.title)
            .add_modifier(Modifier::UNDERLINED)
    } else {
        Style::default().fg(theme.text)
    }
}

fn tone_color(tone: Tone, theme: DeskTheme) -> Color {
    match tone {
        Tone::Success => theme.ok,
        Tone::Error => theme.critical,
        Tone::Warning => theme.warn,
        Tone::Info => theme.info,
    }
}

fn render_notifications(frame: &mut Frame, app: &App, theme: DeskTheme, area: Rect) {
    let capacity = area.height.saturating_sub(2) as usize;
    let mut lines = Vec::new();
    for notification in app.notifications.tail(capacity) {
        for (idx, part) in notification.text.lines().enumerate() {
            lines.push(Line::from(Span::styled(
                format!("{}{part}", if idx == 0 { "* " } else { "  " }),
                Style::default().fg(tone_color(notification.tone, theme)),
            )));
        }
    }
    // Keep the newest lines in view when multi-line entries overflow.
    let overflow = lines.len().saturating_sub(capacity) as u16;
    frame.render_widget(
        Paragraph::new(Text::from(lines))
            .style(Style::default().fg(theme.text).bg(theme.surface))
            .block(panel("Notifications", theme))
            .scroll((overflow, 0)),
        area,
    );
}

fn render_chat(frame: &mut Frame, app: &App, theme: DeskTheme, area: Rect) {
    let capacity = area.height.saturating_sub(3) as usize;
    let messages: Vec<_> = app.chat.messages().collect();
    let skip = messages.len().saturating_sub(capacity);
    let own = app.chat.sender();
    let mut lines: Vec<Line<'static>> = messages
        .into_iter()
        .skip(skip)
        .map(|message| {
            let color = if own == Some(message.sender.as_str()) {
                theme.accent
            } else {
                theme.title
            };
            Line::from(vec![
                Span::styled(
                    format!("{}: ", message.sender),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ),
                Span::styled(message.message.clone(), Style::default().fg(theme.text)),
            ])
        })
        .collect();
    let focused = app.focus == Focus::Chat;
    lines.push(Line::from(Span::styled(
        format!("> {}{}", app.chat.draft, if focused { "_" } else { "" }),
        input_style(focused, theme),
    )));
    let title = match app.chat.department() {
        Some(department) => format!("Chat ({})", department.title()),
        None => "Chat".to_string(),
    };
    frame.render_widget(
        Paragraph::new(Text::from(lines))
            .style(Style::default().fg(theme.text).bg(theme.surface))
            .block(panel(title, theme))
            .wrap(Wrap { trim: false }),
        area,
    );
}

fn render_manager_body(frame: &mut Frame, app: &App, theme: DeskTheme, area: Rect) {
    if !app.manager.is_logged_in() {
        frame.render_widget(
            Paragraph::new(Text::from(login_lines(app, theme)))
                .style(Style::default().fg(theme.text).bg(theme.surface))
                .block(panel("Manager Login", theme)),
            area,
        );
        return;
    }
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(68), Constraint::Percentage(32)])
        .split(area);
    let tab = app.manager.tab();
    let tabs = ManagerTab::ALL
        .iter()
        .enumerate()
        .map(|(idx, candidate)| {
            if *candidate == tab {
                format!("[{} {}]", idx + 1, candidate.title())
            } else {
                format!(" {} {} ", idx + 1, candidate.title())
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    let (lines, scroll) = match tab {
        ManagerTab::Stats => (manager_stats_lines(app, theme), 0),
        ManagerTab::Pending => (pending_lines(app, theme), 0),
        ManagerTab::Analysis => (analysis_lines(app, theme), app.manager.analysis_scroll),
        ManagerTab::Edit => (manager_edit_lines(app, theme), app.scroll),
    };
    frame.render_widget(
        Paragraph::new(Text::from(lines))
            .style(Style::default().fg(theme.text).bg(theme.surface))
            .block(panel(tabs, theme))
            .scroll((scroll, 0)),
        columns[0],
    );
    render_notifications(frame, app, theme, columns[1]);
}

fn login_lines(app: &App, theme: DeskTheme) -> Vec<Line<'static>> {
    let login = &app.manager.login;
    let typing = app.focus == Focus::Login;
    let user_focused = typing && login.focused() == crate::manager::LoginField::UserId;
    let password_focused = typing && login.focused() == crate::manager::LoginField::Password;
    let mut lines = vec![
        Line::from(vec![
            Span::styled("User ID   ", Style::default().fg(theme.muted)),
            Span::styled(login.user_id.clone(), input_style(user_focused, theme)),
        ]),
        Line::from(vec![
            Span::styled("Password  ", Style::default().fg(theme.muted)),
            Span::styled(
                "*".repeat(login.password.chars().count()),
                input_style(password_focused, theme),
            ),
        ]),
        Line::from(""),
    ];
    let (status, color) = if login.is_busy() {
        ("Signing in...", theme.warn)
    } else if login.failed() {
        ("Invalid credentials", theme.critical)
    } else if typing {
        ("Tab switch field, Enter sign in", theme.muted)
    } else {
        ("Enter to type credentials", theme.muted)
    };
    lines.push(Line::from(Span::styled(status, Style::default().fg(color))));
    lines
}

fn manager_stats_lines(app: &App, theme: DeskTheme) -> Vec<Line<'static>> {
    let stats = app.manager.stats();
    let mut lines = vec![
        Line::from(Span::styled(
            format!("{} (b to switch)", app.manager.stats_type().title()),
            Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
        )),
        Line::from(format!("Today    {}", format_currency(stats.today))),
        Line::from(format!("Night    {}", format_currency(stats.night))),
        Line::from(format!("Pending  {}", stats.pending)),
        Line::from(""),
        Line::from(Span::styled(
            "Agent Breakdown",
            Style::default().fg(theme.title).add_modifier(Modifier::BOLD),
        )),
    ];
    let rows = stats.sorted_breakdown();
    if rows.is_empty() {
        lines.push(Line::from(Span::styled(
            "No sales yet.",
            Style::default().fg(theme.muted),
        )));
    }
    lines.extend(rows.into_iter().map(|(agent, amount)| breakdown_line(&agent, amount, theme)));
    lines
}

fn pending_lines(app: &App, theme: DeskTheme) -> Vec<Line<'static>> {
    let manager = &app.manager;
    let mut lines = vec![Line::from(Span::styled(
        format!(
            "{} pending (b to switch, a approve, d decline)",
            manager.pending_type().title()
        ),
        Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
    ))];
    let cards = manager.pending_cards();
    if cards.is_empty() {
        lines.push(Line::from(Span::styled(
            NO_PENDING,
            Style::default().fg(theme.muted),
        )));
        return lines;
    }
    for (idx, record) in cards.into_iter().enumerate() {
        let selected = idx == manager.selected_card();
        let key = manager.card_key(idx, record);
        let state = manager.card_state(&key);
        let base = if state == CardState::Fading {
            Style::default()
                .fg(theme.muted)
                .add_modifier(Modifier::DIM)
        } else if selected {
            Style::default().fg(theme.title).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.text)
        };
        lines.push(Line::from(vec![
            Span::styled(if selected { ">> " } else { "   " }, base),
            Span::styled(
                format!(
                    "{:<10} {:<14} {:<18} ${:<9}",
                    ellipsize(key.id_label(), 10),
                    ellipsize(record.agent().unwrap_or_default(), 14),
                    ellipsize(record.client_name().unwrap_or_default(), 18),
                    clean_charge(record.charge().unwrap_or_default())
                ),
                base,
            ),
        ]));
        let enabled = manager.buttons_enabled(&key);
        let button = |decision: Decision, color: Color| {
            Span::styled(
                format!("[{}]", manager.button_label(&key, decision)),
                if enabled {
                    Style::default().fg(color).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(theme.muted)
                },
            )
        };
        lines.push(Line::from(vec![
            Span::styled(
                format!(
                    "     card {} exp {} cvc {}  ",
                    clean_card_number(record.get(fields::CARD_NUMBER).unwrap_or_default()),
                    clean_expiry(record.get(fields::EXPIRY_DATE).unwrap_or_default()),
                    record.get(fields::CVC).unwrap_or_default()
                ),
                Style::default().fg(theme.muted),
            ),
            button(Decision::Approve, theme.ok),
            Span::raw(" "),
            button(Decision::Decline, theme.critical),
        ]));
    }
    lines
}

fn analysis_lines(app: &App, theme: DeskTheme) -> Vec<Line<'static>> {
    let manager = &app.manager;
    let filter = &manager.analysis;
    let (start, end) = filter.window();
    let searching = app.focus == Focus::AnalysisSearch;
    let mut lines = vec![
        Line::from(Span::styled(
            format!(
                "{} | {} -> {} | agent: {} | status: {}",
                filter.lead_type.title(),
                start.format("%Y-%m-%d %H:%M"),
                end.format("%Y-%m-%d %H:%M"),
                filter.agent.as_deref().unwrap_or("all"),
                filter.status.as_deref().unwrap_or("all"),
            ),
            Style::default().fg(theme.accent),
        )),
        Line::from(vec![
            Span::styled("search: ", Style::default().fg(theme.muted)),
            Span::styled(
                format!("{}{}", filter.search, if searching { "_" } else { "" }),
                input_style(searching, theme),
            ),
        ]),
    ];
    let report = manager.analysis_report();
    lines.push(Line::from(vec![
        Span::styled(
            format!("Total {}  ", format_currency(report.total_charged)),
            Style::default().fg(theme.ok).add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(
            "Count {}  Avg {}  Peak {}",
            report.count,
            format_currency(report.average),
            report.peak_hour
        )),
    ]));
    if !report.hourly.is_empty() {
        let hours = report
            .hourly
            .iter()
            .map(|(hour, amount)| format!("{hour} {}", format_currency(*amount)))
            .collect::<Vec<_>>()
            .join("  ");
        lines.push(Line::from(Span::styled(hours, Style::default().fg(theme.muted))));
    }
    lines.push(Line::from(""));
    let lead_type = filter.lead_type;
    lines.push(Line::from(Span::styled(
        ANALYSIS_COLUMNS
            .iter()
            .map(|column| format!("{:<16}", ellipsize(&analysis::column_title(column, lead_type), 16)))
            .collect::<String>(),
        Style::default().fg(theme.title).add_modifier(Modifier::BOLD),
    )));
    if report.rows.is_empty() {
        lines.push(Line::from(Span::styled(
            "No records in this window.",
            Style::default().fg(theme.muted),
        )));
    }
    for record in &report.rows {
        let status = record.status().unwrap_or_default().trim().to_string();
        let color = match status.as_str() {
            lead_core::STATUS_CHARGED => theme.ok,
            lead_core::STATUS_DECLINED => theme.critical,
            _ => theme.text,
        };
        lines.push(Line::from(Span::styled(
            ANALYSIS_COLUMNS
                .iter()
                .map(|column| format!("{:<16}", ellipsize(column_value(record, column), 16)))
                .collect::<String>(),
            Style::default().fg(color),
        )));
    }
    lines
}

fn manager_edit_lines(app: &App, theme: DeskTheme) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(Span::styled(
        format!(
            "Sheet: {} (b to switch, / find, e edit, n clear)",
            app.editor.lead_type().title()
        ),
        Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
    ))];
    lines.extend(editor_lines(app, &app.editor, theme));
    lines
}

fn render_confirm(frame: &mut Frame, prompt: &str, theme: DeskTheme) {
    let area = centered_rect(50, 20, frame.size());
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(Text::from(vec![
            Line::from(prompt.to_string()),
            Line::from(""),
            Line::from(Span::styled(
                "y confirm   n cancel",
                Style::default().fg(theme.muted),
            )),
        ]))
        .style(Style::default().fg(theme.text).bg(theme.surface))
        .block(panel("Confirm", theme))
        .wrap(Wrap { trim: true }),
        area,
    );
}

fn render_toast(frame: &mut Frame, app: &App, theme: DeskTheme) {
    let Some(toast) = app.toast.current() else {
        return;
    };
    let size = frame.size();
    let width = (toast.text.chars().count() as u16 + 4).clamp(20, size.width.max(20)).min(size.width);
    let height = 3.min(size.height);
    let area = Rect {
        x: size.width.saturating_sub(width),
        y: size.height.saturating_sub(height),
        width,
        height,
    };
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            toast.text.clone(),
            Style::default()
                .fg(tone_color(toast.tone, theme))
                .add_modifier(Modifier::BOLD),
        )))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(tone_color(toast.tone, theme)))
                .style(Style::default().bg(theme.bg)),
        ),
        area,
    );
}

fn render_help_overlay(frame: &mut Frame, app: &App, theme: DeskTheme) {
    let area = centered_rect(78, 72, frame.size());
    let section = |title: &'static str| {
        Line::from(Span::styled(
            title,
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        ))
    };
    let mut lines = vec![
        Line::from(vec![
            Span::styled(
                "Controls",
                Style::default()
                    .fg(theme.title)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(
                format!("portal:{}", app.portal()),
                Style::default().fg(theme.muted),
            ),
        ]),
    ];
    if app.is_manager() {
        lines.extend([
            section("Manager"),
            Line::from("  1/2/3/4  Stats / Pending / Analysis / Edit"),
            Line::from("  Tab      cycle tab"),
            Line::from("  r        refresh data    o  log out"),
            Line::from("  Pending  j/k select, a approve, d decline, b sheet"),
            Line::from("  Analysis [ ] start day, { } end day, u agent, s status, / search"),
            Line::from("  Edit     / find, e edit fields, s update, x delete, t timestamp"),
        ]);
    } else if app.is_operator_portal() {
        lines.extend([
            section("Lead Form"),
            Line::from("  / or f   type an id, Enter to find"),
            Line::from("  j/k      pick a duplicate, Enter to load, Esc to dismiss"),
            Line::from("  e        edit fields (Tab/Up/Down move, Enter submit)"),
            Line::from("  s        submit or update    t  timestamp keep/now"),
            Line::from("  n        clear the form"),
            Line::from(""),
            section("Side Panels"),
            Line::from("  b        billing/insurance night totals"),
            Line::from("  c        toggle chat    m  write a chat message"),
            Line::from("  r        refresh night totals"),
        ]);
    } else {
        lines.extend([
            section("Night Totals"),
            Line::from("  b        billing/insurance"),
            Line::from("  r        refresh"),
        ]);
    }
    lines.extend([
        Line::from(""),
        section("Session & Exit"),
        Line::from("  ? or F1  toggle this help"),
        Line::from("  Esc      close help / leave input"),
        Line::from("  q        quit"),
    ]);
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(Text::from(lines))
            .style(Style::default().fg(theme.text).bg(theme.surface))
            .block(panel("Help", theme))
            .wrap(Wrap { trim: false }),
        area,
    );
}

fn status_note_color(note: &str, theme: DeskTheme) -> Color {
    let normalized = note.to_ascii_lowercase();
    if normalized.contains("failed")
        || normalized.contains("error")
        || normalized.contains("invalid")
        || normalized.contains("expired")
    {
        return theme.critical;
    }
    if normalized.contains("queued") || normalized.contains("started") {
        return theme.info;
    }
    theme.warn
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100u16.saturating_sub(percent_y)) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100u16.saturating_sub(percent_y)) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100u16.saturating_sub(percent_x)) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100u16.saturating_sub(percent_x)) / 2),
        ])
        .split(vertical[1])[1]
}

fn is_compact(width: u16) -> bool {
    width < COMPACT_WIDTH
}

fn ellipsize(input: &str, max: usize) -> String {
    if input.chars().count() <= max {
        return input.to_string();
    }
    if max <= 3 {
        return input.chars().take(max).collect();
    }
    let mut out: String = input.chars().take(max - 3).collect();
    out.push_str("...");
    out
}

/// Joins fields with `|`, dropping trailing ones that do not fit.
fn fit_fields(fields: &[String], max: usize) -> String {
    let mut out = String::new();
    for field in fields {
        let candidate = if out.is_empty() {
            field.clone()
        } else {
            format!("{out} | {field}")
        };
        if candidate.chars().count() > max {
            if out.is_empty() {
                return ellipsize(field, max);
            }
            break;
        }
        out = candidate;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AppEvent;
    use crate::config::Config;
    use chrono::NaiveDate;
    use lead_core::stats::{DeptTotals, ManagerData, NightStats};
    use lead_core::{Candidate, LeadRecord, LeadType, Portal, SearchResult};
    use ratatui::{backend::TestBackend, Terminal};
    use std::collections::BTreeMap;

    fn app(portal: Portal) -> App {
        App::new(
            &Config {
                api_url: "http://127.0.0.1:8000".to_string(),
                portal,
                agent: Some("Haziq".to_string()),
                push: None,
                manager_token: Some("tok".to_string()),
                sound: false,
            },
            NaiveDate::from_ymd_opt(2026, 1, 2).expect("date"),
        )
    }

    fn draw(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).expect("terminal");
        terminal
            .draw(|frame| render_ui(frame, app))
            .expect("draw");
        let buffer = terminal.backend().buffer().clone();
        let width = buffer.area.width as usize;
        buffer
            .content()
            .chunks(width)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn fit_fields_drops_what_does_not_fit() {
        let fields = vec!["Portal: billing".to_string(), "Live: off".to_string()];
        assert_eq!(fit_fields(&fields, 40), "Portal: billing | Live: off");
        assert_eq!(fit_fields(&fields, 20), "Portal: billing");
        assert_eq!(ellipsize("abcdefgh", 6), "abc...");
    }

    #[test]
    fn portal_shows_candidates_and_empty_breakdown() {
        let mut app = app(Portal::Billing);
        app.editor.search_input = "A100".to_string();
        app.search();
        app.apply_event(AppEvent::Search(Ok(SearchResult::Multiple(vec![
            Candidate {
                row_index: 9,
                name: "Jane Roe".to_string(),
                charge: "120".to_string(),
                timestamp: "2026-01-02 21:15".to_string(),
            },
            Candidate {
                row_index: 7,
                name: "John Roe".to_string(),
                charge: "80".to_string(),
                timestamp: "2026-01-01 22:00".to_string(),
            },
        ]))));
        let screen = draw(&app);
        assert!(screen.contains("Multiple records found (2)"));
        assert!(screen.contains("row 7"));
        assert!(screen.contains("[Find]"));
        assert!(screen.contains(EMPTY_BREAKDOWN));
        assert!(screen.contains("[s] Submit Lead"));
    }

    #[test]
    fn stats_breakdown_is_rendered_for_selected_department() {
        let mut app = app(Portal::Insurance);
        app.startup_tasks();
        app.apply_event(AppEvent::Stats(Ok(NightStats {
            billing: DeptTotals::default(),
            insurance: DeptTotals {
                total: 300.0,
                breakdown: BTreeMap::from([("Areeb".to_string(), 300.0)]),
            },
        })));
        let screen = draw(&app);
        assert!(screen.contains("Insurance Night: $300.00"));
        assert!(screen.contains("Areeb"));
    }

    #[test]
    fn manager_pending_cards_show_busy_button() {
        let mut app = app(Portal::Manager);
        app.startup_tasks();
        app.apply_event(AppEvent::ManagerData(Ok(ManagerData {
            billing: vec![LeadRecord::new(Some(2))
                .with_field("Record_ID", "A1")
                .with_field("Agent Name", "Haziq")
                .with_field("Name", "Jane")
                .with_field("Charge", "$120.00")
                .with_field("Status", "Submitted")],
            ..ManagerData::default()
        })));
        app.manager.set_tab(ManagerTab::Pending);
        app.decide(Decision::Approve);
        let screen = draw(&app);
        assert!(screen.contains("[...]"));
        assert!(screen.contains("[Decline]"));
        assert!(screen.contains("120.00"));
    }

    #[test]
    fn manager_without_session_renders_login() {
        let mut app = app(Portal::Manager);
        app.logout();
        let screen = draw(&app);
        assert!(screen.contains("Manager Login"));
        assert!(screen.contains("User ID"));
    }

    #[test]
    fn confirm_and_help_overlays() {
        let mut app = app(Portal::Billing);
        app.editor.search_input = "A1".to_string();
        app.search();
        app.apply_event(AppEvent::Search(Ok(SearchResult::Single(
            LeadRecord::new(Some(3)).with_field("Order ID", "A1"),
        ))));
        app.submit();
        assert!(draw(&app).contains("Are you sure you want to update this record?"));

        app.editor.cancel_confirm();
        app.help_open = true;
        assert!(draw(&app).contains("Session & Exit"));
        assert_eq!(app.editor.lead_type(), LeadType::Billing);
    }
}
