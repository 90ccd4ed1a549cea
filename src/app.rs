use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::model::catalog::{Catalog, CatalogEntry, SearchStatus};
use crate::model::config::AppConfig;
use crate::model::mode::Mode;
use crate::msg::{Msg, Operation, OperationResult};
use crate::plugin::PluginManager;
use crate::plugin::updater::{LOCAL_VERSION, SelfUpdater, UpdateState};

const CARD_HEIGHT: u16 = 4;
const WATCH_DEBOUNCE: Duration = Duration::from_millis(250);

/// Parsed `:` palette input.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PaletteCommand {
    Help,
    Refresh,
    UpdateCheck,
    UpdateApply,
    Install(String),
    Uninstall(String),
    Quit,
    Unknown(String),
}

pub struct App {
    pub mode: Mode,
    pub config: AppConfig,
    catalog: Catalog,
    manager: Arc<PluginManager>,
    updater: SelfUpdater,
    installed: Vec<String>,
    filter: SearchStatus,
    query: String,
    selected: usize,
    busy: HashMap<String, Operation>,
    update_state: UpdateState,
    update_applying: bool,
    command_input: String,
    pending_uninstall: Option<String>,
    refresh_due: Option<Instant>,
    quit_confirm_until: Option<Instant>,
    pub should_quit: bool,
    pub event_tx: mpsc::Sender<Msg>,
    pub notifications: VecDeque<String>,
}

impl App {
    pub fn new(config: AppConfig, event_tx: mpsc::Sender<Msg>) -> Result<Self> {
        let catalog = Catalog::load(config.extra_catalog_path(), config.catalog.new_window_days)?;
        let manager = Arc::new(PluginManager::from_config(&config)?);
        let updater = SelfUpdater::from_config(&config.updater);

        let mut app = Self {
            mode: Mode::Browse,
            catalog,
            manager,
            updater,
            installed: Vec::new(),
            filter: SearchStatus::All,
            query: String::new(),
            selected: 0,
            busy: HashMap::new(),
            update_state: UpdateState::Idle,
            update_applying: false,
            command_input: String::new(),
            pending_uninstall: None,
            refresh_due: None,
            quit_confirm_until: None,
            should_quit: false,
            event_tx,
            notifications: VecDeque::new(),
            config,
        };
        app.refresh_installed();
        app.push_notification(format!(
            "{} plugins in catalog, {} entries under {}",
            app.catalog.len(),
            app.installed.len(),
            app.manager.root().display()
        ));
        Ok(app)
    }

    /// Work that should start once the event loop is running.
    pub fn on_startup(&mut self) {
        if self.config.updater.check_on_startup {
            self.check_update();
        }
    }

    // ── MVU: Update ──────────────────────────────────────────────

    pub fn update(&mut self, msg: Msg) -> Result<()> {
        match msg {
            Msg::Key(key) => self.handle_key(key)?,
            Msg::Resize(_, _) => {}
            Msg::PaletteCommand(command) => self.handle_palette_command(&command),
            Msg::Start(operation, key) => self.start_operation(operation, &key),
            Msg::Finished {
                key,
                operation,
                result,
            } => self.handle_finished(key, operation, result),
            Msg::Update(state) => self.handle_update_state(state),
            Msg::InstalledChanged => {
                self.refresh_due.get_or_insert_with(|| Instant::now() + WATCH_DEBOUNCE);
            }
            Msg::Tick => self.handle_tick(),
        }
        Ok(())
    }

    fn handle_tick(&mut self) {
        let now = Instant::now();
        if self.refresh_due.is_some_and(|due| now >= due) {
            self.refresh_due = None;
            self.refresh_installed();
        }
        if self.quit_confirm_until.is_some_and(|until| now >= until) {
            self.quit_confirm_until = None;
        }
    }

    fn push_notification(&mut self, message: String) {
        self.notifications.push_back(message);
        while self.notifications.len() > 8 {
            self.notifications.pop_front();
        }
    }

    fn refresh_installed(&mut self) {
        match self.manager.list_installed() {
            Ok(installed) => self.installed = installed,
            Err(err) => {
                tracing::warn!("failed to list installed plugins: {err}");
                self.push_notification(format!("{} error: {err}", err.kind().label()));
            }
        }
        self.clamp_selection();
    }

    fn visible_entries(&self) -> Vec<&CatalogEntry> {
        self.catalog
            .filtered(self.filter, &self.query, &self.installed, Utc::now())
    }

    fn selected_entry(&self) -> Option<CatalogEntry> {
        self.visible_entries().get(self.selected).map(|entry| (*entry).clone())
    }

    fn clamp_selection(&mut self) {
        let count = self.visible_entries().len();
        self.selected = self.selected.min(count.saturating_sub(1));
    }

    fn is_installed(&self, entry: &CatalogEntry) -> bool {
        let key = entry.descriptor.lookup_key.as_str();
        self.installed.iter().any(|name| name == key)
    }

    // ── Keys ─────────────────────────────────────────────────────

    fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return Ok(());
        }

        match self.mode {
            Mode::Browse => self.handle_key_browse(key),
            Mode::Search => self.handle_key_search(key),
            Mode::Command => self.handle_key_command(key),
            Mode::Info => self.handle_key_info(key),
            Mode::ConfirmUninstall => self.handle_key_confirm(key),
        }
        Ok(())
    }

    fn handle_key_browse(&mut self, key: KeyEvent) {
        if key.code != KeyCode::Char('q') {
            self.quit_confirm_until = None;
        }

        match key.code {
            KeyCode::Char('q') => self.request_quit(),
            KeyCode::Char('j') | KeyCode::Down => {
                let count = self.visible_entries().len();
                if self.selected + 1 < count {
                    self.selected += 1;
                }
            }
            KeyCode::Char('k') | KeyCode::Up => self.selected = self.selected.saturating_sub(1),
            KeyCode::Char('g') | KeyCode::Home => self.selected = 0,
            KeyCode::Char('G') | KeyCode::End => {
                self.selected = self.visible_entries().len().saturating_sub(1);
            }
            KeyCode::Char('/') => self.mode = Mode::Search,
            KeyCode::Char('f') => {
                self.filter = self.filter.next();
                self.selected = 0;
            }
            KeyCode::Char('i') => {
                if self.selected_entry().is_some() {
                    self.mode = Mode::Info;
                }
            }
            KeyCode::Char('r') => self.refresh_installed(),
            KeyCode::Char('u') => self.check_update(),
            KeyCode::Char('U') => self.apply_update(),
            KeyCode::Char(':') => {
                self.mode = Mode::Command;
                self.command_input.clear();
            }
            KeyCode::Enter => self.activate_selected(),
            KeyCode::Esc if !self.query.is_empty() => {
                self.query.clear();
                self.selected = 0;
            }
            _ => {}
        }
    }

    fn request_quit(&mut self) {
        if self.busy.is_empty() || self.quit_confirm_until.is_some() {
            self.should_quit = true;
            return;
        }
        self.quit_confirm_until = Some(Instant::now() + Duration::from_secs(2));
    }

    fn handle_key_search(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.query.clear();
                self.mode = Mode::Browse;
            }
            KeyCode::Enter => self.mode = Mode::Browse,
            KeyCode::Backspace => {
                self.query.pop();
            }
            KeyCode::Char(ch)
                if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT =>
            {
                self.query.push(ch);
            }
            _ => {}
        }
        self.selected = 0;
    }

    fn handle_key_command(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.mode = Mode::Browse;
                self.command_input.clear();
            }
            KeyCode::Enter => {
                let command = self.command_input.trim().to_string();
                self.mode = Mode::Browse;
                self.command_input.clear();

                if !command.is_empty() {
                    let _ = self.event_tx.send(Msg::PaletteCommand(command));
                }
            }
            KeyCode::Backspace => {
                self.command_input.pop();
            }
            KeyCode::Char(ch)
                if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT =>
            {
                self.command_input.push(ch);
            }
            _ => {}
        }
    }

    fn handle_key_info(&mut self, key: KeyEvent) {
        if matches!(
            key.code,
            KeyCode::Esc | KeyCode::Char('i') | KeyCode::Char('q') | KeyCode::Enter
        ) {
            self.mode = Mode::Browse;
        }
    }

    fn handle_key_confirm(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                self.mode = Mode::Browse;
                if let Some(key) = self.pending_uninstall.take() {
                    let _ = self.event_tx.send(Msg::Start(Operation::Uninstall, key));
                }
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.mode = Mode::Browse;
                self.pending_uninstall = None;
            }
            _ => {}
        }
    }

    fn activate_selected(&mut self) {
        let Some(entry) = self.selected_entry() else {
            return;
        };
        let key = entry.descriptor.lookup_key.to_string();
        if self.is_installed(&entry) {
            self.pending_uninstall = Some(key);
            self.mode = Mode::ConfirmUninstall;
        } else {
            let _ = self.event_tx.send(Msg::Start(Operation::Install, key));
        }
    }

    // ── Palette ──────────────────────────────────────────────────

    fn handle_palette_command(&mut self, raw: &str) {
        match parse_palette_command(raw) {
            PaletteCommand::Help => {
                for line in [
                    "commands:",
                    "  install <name>    uninstall <name>",
                    "  refresh           update.check    update.apply",
                    "keys: / search, f filter, i info, Enter install/uninstall, u/U update, q quit",
                ] {
                    self.push_notification(line.to_string());
                }
            }
            PaletteCommand::Refresh => {
                self.refresh_installed();
                self.push_notification(format!("{} entries installed", self.installed.len()));
            }
            PaletteCommand::UpdateCheck => self.check_update(),
            PaletteCommand::UpdateApply => self.apply_update(),
            PaletteCommand::Install(name) => self.start_by_name(Operation::Install, &name),
            PaletteCommand::Uninstall(name) => self.start_by_name(Operation::Uninstall, &name),
            PaletteCommand::Quit => self.request_quit(),
            PaletteCommand::Unknown(command) => {
                self.push_notification(format!("unknown command: {command} (try :help)"));
            }
        }
    }

    fn start_by_name(&mut self, operation: Operation, name: &str) {
        match self.catalog.find(name) {
            Some(entry) => {
                let key = entry.descriptor.lookup_key.to_string();
                self.start_operation(operation, &key);
            }
            None => self.push_notification(format!("no plugin named {name:?}")),
        }
    }

    // ── Workers ──────────────────────────────────────────────────

    fn start_operation(&mut self, operation: Operation, key: &str) {
        if self.busy.contains_key(key) {
            self.push_notification(format!("{key} is already busy"));
            return;
        }
        let Some(entry) = self.catalog.find(key) else {
            self.push_notification(format!("no plugin with key {key}"));
            return;
        };

        let descriptor = entry.descriptor.clone();
        let manager = Arc::clone(&self.manager);
        let tx = self.event_tx.clone();
        let key = key.to_string();
        self.busy.insert(key.clone(), operation);

        thread::spawn(move || {
            let outcome = match operation {
                Operation::Install => manager.install(&descriptor).map(OperationResult::Installed),
                Operation::Uninstall => manager
                    .uninstall(&descriptor)
                    .map(|_| OperationResult::Uninstalled),
            };
            let result = outcome.unwrap_or_else(|err| {
                tracing::error!("{} failed: {err}", descriptor.name);
                OperationResult::Failed {
                    kind: err.kind(),
                    message: err.to_string(),
                }
            });
            let _ = tx.send(Msg::Finished {
                key,
                operation,
                result,
            });
        });
    }

    fn handle_finished(&mut self, key: String, operation: Operation, result: OperationResult) {
        self.busy.remove(&key);
        let name = self
            .catalog
            .find(&key)
            .map_or_else(|| key.clone(), |entry| entry.name().to_string());

        let message = match (operation, result) {
            (_, OperationResult::Installed(report)) => {
                format!("installed {name}: {}", report.summary())
            }
            (_, OperationResult::Uninstalled) => format!("uninstalled {name}"),
            (Operation::Install, OperationResult::Failed { kind, message }) => {
                format!("install {name} failed ({} error): {message}", kind.label())
            }
            (Operation::Uninstall, OperationResult::Failed { kind, message }) => {
                format!("uninstall {name} failed ({} error): {message}", kind.label())
            }
        };
        self.push_notification(message);
        self.refresh_installed();
    }

    fn check_update(&mut self) {
        if self.update_state.is_busy() {
            self.push_notification(self.update_state.label());
            return;
        }
        self.update_state = UpdateState::CheckingVersion;

        let updater = self.updater.clone();
        let manager = Arc::clone(&self.manager);
        let tx = self.event_tx.clone();
        thread::spawn(move || {
            let state = updater.check(manager.fetcher());
            let _ = tx.send(Msg::Update(state));
        });
    }

    fn apply_update(&mut self) {
        if !matches!(self.update_state, UpdateState::UpdateAvailable(_)) {
            self.push_notification("no update available, run update.check first".to_string());
            return;
        }
        self.update_applying = true;
        self.update_state = UpdateState::Updating;

        let updater = self.updater.clone();
        let manager = Arc::clone(&self.manager);
        let tx = self.event_tx.clone();
        thread::spawn(move || {
            let progress = tx.clone();
            let state = updater.apply(&manager, |state| {
                let _ = progress.send(Msg::Update(state.clone()));
            });
            let _ = tx.send(Msg::Update(state));
        });
    }

    fn handle_update_state(&mut self, state: UpdateState) {
        if state == self.update_state && state.is_busy() {
            return;
        }

        match &state {
            UpdateState::Idle if self.update_applying => {
                self.update_applying = false;
                let note = if self.update_state == UpdateState::Restarting {
                    "update installed, host restarted"
                } else {
                    "update installed, restart the host to finish"
                };
                self.push_notification(note.to_string());
                self.refresh_installed();
            }
            UpdateState::Idle => {
                self.push_notification(format!("plugin repo {LOCAL_VERSION} is up to date"));
            }
            UpdateState::Failed { .. } => {
                self.update_applying = false;
                self.push_notification(state.label());
            }
            UpdateState::UpdateAvailable(_) | UpdateState::Restarting => {
                self.push_notification(state.label());
            }
            UpdateState::CheckingVersion | UpdateState::Updating => {}
        }
        self.update_state = state;
    }

    // ── MVU: View ────────────────────────────────────────────────

    pub fn view(&mut self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // header
                Constraint::Min(1),    // cards
                Constraint::Length(3), // notifications
                Constraint::Length(1), // status bar
            ])
            .split(frame.area());

        self.render_header(frame, chunks[0]);
        self.render_cards(frame, chunks[1]);
        self.render_notifications(frame, chunks[2]);
        self.render_status_bar(frame, chunks[3]);

        match self.mode {
            Mode::Info => self.render_info_overlay(frame),
            Mode::Command => self.render_command_overlay(frame),
            _ => {}
        }
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let mut spans = vec![
            Span::styled(
                format!(" Plugin Repo {LOCAL_VERSION} "),
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Magenta)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(" filter: {} ", self.filter.label()),
                Style::default().fg(Color::Cyan),
            ),
        ];
        if !self.query.is_empty() || self.mode == Mode::Search {
            spans.push(Span::styled(
                format!(" search: {} ", self.query),
                Style::default().fg(Color::Yellow),
            ));
        }
        let cursor = search_cursor_offset(&spans);
        let header = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Rgb(15, 15, 24)));
        frame.render_widget(header, area);

        if self.mode == Mode::Search {
            frame.set_cursor_position((area.x.saturating_add(cursor), area.y));
        }
    }

    fn render_cards(&self, frame: &mut Frame, area: Rect) {
        let entries = self.visible_entries();
        if entries.is_empty() {
            let empty = Paragraph::new(Span::styled(
                "  No plugins match",
                Style::default().fg(Color::DarkGray),
            ));
            frame.render_widget(empty, area);
            return;
        }

        let now = Utc::now();
        let mut lines: Vec<Line> = Vec::with_capacity(entries.len() * CARD_HEIGHT as usize);
        for (idx, entry) in entries.iter().enumerate() {
            let selected = idx == self.selected;
            let marker = if selected { "> " } else { "  " };
            let title_style = if selected {
                Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
            };

            let mut title = vec![Span::styled(format!("{marker}{}", entry.name()), title_style)];
            if self.catalog.is_new(entry, now) {
                title.push(Span::styled(
                    " NEW ",
                    Style::default().fg(Color::Black).bg(Color::Green),
                ));
            }
            let (label, label_style) = self.state_label(entry);
            title.push(Span::raw("  "));
            title.push(Span::styled(format!("[{label}]"), label_style));
            lines.push(Line::from(title));

            let authors = if entry.authors.is_empty() {
                "    unknown author".to_string()
            } else {
                format!("    by {}", entry.authors.join(", "))
            };
            lines.push(Line::from(Span::styled(authors, Style::default().fg(Color::DarkGray))));
            lines.push(Line::from(Span::styled(
                format!("    {}", entry.description),
                Style::default().fg(Color::Gray),
            )));
            lines.push(Line::default());
        }

        let visible_cards = (area.height / CARD_HEIGHT).max(1) as usize;
        let first_card = (self.selected + 1).saturating_sub(visible_cards);
        let scroll = first_card as u16 * CARD_HEIGHT;

        let cards = Paragraph::new(lines)
            .scroll((scroll, 0))
            .block(Block::default().borders(Borders::NONE));
        frame.render_widget(cards, area);
    }

    fn state_label(&self, entry: &CatalogEntry) -> (&'static str, Style) {
        let key = entry.descriptor.lookup_key.as_str();
        if let Some(operation) = self.busy.get(key) {
            return (operation.progress_label(), Style::default().fg(Color::Yellow));
        }
        if self.is_installed(entry) {
            ("Installed", Style::default().fg(Color::Green))
        } else {
            ("Install", Style::default().fg(Color::Blue))
        }
    }

    fn render_notifications(&self, frame: &mut Frame, area: Rect) {
        let lines: Vec<Line> = self
            .notifications
            .iter()
            .rev()
            .take(area.height as usize)
            .rev()
            .map(|note| {
                let style = if note.contains("failed") || note.contains("error") {
                    Style::default().fg(Color::Red)
                } else {
                    Style::default().fg(Color::Gray)
                };
                Line::from(Span::styled(format!(" {note}"), style))
            })
            .collect();
        let panel = Paragraph::new(lines).style(Style::default().bg(Color::Rgb(10, 10, 18)));
        frame.render_widget(panel, area);
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let mode_style = match self.mode {
            Mode::Browse => Style::default()
                .fg(Color::Black)
                .bg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
            Mode::Search => Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            _ => Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        };
        let mode_span = Span::styled(format!(" {} ", self.mode.label()), mode_style);

        let mut suffix = match self.mode {
            Mode::ConfirmUninstall => {
                let name = self
                    .pending_uninstall
                    .as_deref()
                    .and_then(|key| self.catalog.find(key))
                    .map_or("plugin", CatalogEntry::name);
                format!(" | uninstall {name}? (y/n)")
            }
            Mode::Command => format!(" | :{}", self.command_input),
            _ => String::new(),
        };

        if !self.busy.is_empty() {
            suffix.push_str(&format!(" | {} running", self.busy.len()));
        }
        if self.quit_confirm_until.is_some() {
            suffix.push_str(" | operations running, press q again to quit");
        }

        let info = Span::styled(
            format!(
                " {} shown  update: {}{} ",
                self.visible_entries().len(),
                self.update_state.label(),
                suffix
            ),
            Style::default().fg(Color::Gray).bg(Color::DarkGray),
        );

        let bar = Line::from(vec![mode_span, info]);
        let status = Paragraph::new(bar).style(Style::default().bg(Color::DarkGray));
        frame.render_widget(status, area);
    }

    fn render_info_overlay(&self, frame: &mut Frame) {
        let Some(entry) = self.selected_entry() else {
            return;
        };
        let area = centered_rect(70, 60, frame.area());
        frame.render_widget(Clear, area);

        let heading = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
        let mut lines = vec![
            Line::from(Span::styled("About", heading)),
            Line::from(entry.description.clone()),
            Line::default(),
            Line::from(Span::styled("Tags", heading)),
            Line::from(entry.tags.join(", ")),
        ];
        if !entry.authors.is_empty() {
            lines.push(Line::default());
            lines.push(Line::from(Span::styled("Authors", heading)));
            lines.push(Line::from(entry.authors.join(", ")));
        }
        if let Some(info) = &entry.custom_info {
            lines.push(Line::default());
            lines.push(Line::from(Span::styled("Info", heading)));
            lines.push(Line::from(info.clone()));
        }
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            format!("source: {}", entry.descriptor.archive_url),
            Style::default().fg(Color::DarkGray),
        )));
        if let Some(patterns) = entry.descriptor.patterns() {
            lines.push(Line::from(Span::styled(
                format!("files: {}", patterns.join(", ")),
                Style::default().fg(Color::DarkGray),
            )));
        }

        let overlay = Paragraph::new(lines).wrap(Wrap { trim: true }).block(
            Block::default()
                .title(format!(" {} ", entry.name()))
                .borders(Borders::ALL)
                .style(Style::default().bg(Color::Rgb(15, 15, 24))),
        );
        frame.render_widget(overlay, area);
    }

    fn render_command_overlay(&self, frame: &mut Frame) {
        let area = centered_rect(70, 20, frame.area());
        frame.render_widget(Clear, area);

        let prompt = Paragraph::new(format!(":{}", self.command_input)).block(
            Block::default()
                .title(" Command ")
                .borders(Borders::ALL)
                .style(Style::default().bg(Color::Rgb(15, 15, 24))),
        );
        frame.render_widget(prompt, area);

        let cursor_x = area.x + 2 + self.command_input.len() as u16;
        let cursor_y = area.y + 1;
        frame.set_cursor_position((cursor_x, cursor_y));
    }
}

/// Display column just after the query, which sits before the trailing
/// space of the last header span.
fn search_cursor_offset(spans: &[Span]) -> u16 {
    let width = spans.iter().map(Span::width).sum::<usize>().saturating_sub(1);
    u16::try_from(width).unwrap_or(u16::MAX)
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn parse_palette_command(raw: &str) -> PaletteCommand {
    let input = raw.trim();
    let (head, rest) = match input.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, unquote(rest.trim())),
        None => (input, String::new()),
    };

    match (head, rest.is_empty()) {
        ("help" | "h", _) => PaletteCommand::Help,
        ("refresh", true) => PaletteCommand::Refresh,
        ("update.check", true) => PaletteCommand::UpdateCheck,
        ("update.apply", true) => PaletteCommand::UpdateApply,
        ("q" | "quit", true) => PaletteCommand::Quit,
        ("install" | "i", false) => PaletteCommand::Install(rest),
        ("uninstall" | "rm", false) => PaletteCommand::Uninstall(rest),
        _ => PaletteCommand::Unknown(input.to_string()),
    }
}

fn unquote(input: &str) -> String {
    let mut chars = input.chars();
    match (chars.next(), chars.next_back()) {
        (Some(first), Some(last)) if first == last && (first == '"' || first == '\'') => {
            chars.as_str().trim().to_string()
        }
        _ => input.to_string(),
    }
}
