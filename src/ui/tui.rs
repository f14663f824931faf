use std::io;
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame, Terminal,
};

use crate::core::{FileEvent, FileEventKind, MessageLevel, Session, TIMESTAMP_FORMAT};
use crate::view::{
    format_size, latest_file, list_directory, DirEntryInfo, EntryKind, Preview, PreviewCache,
};

const REFRESH_STEP_MS: i64 = 500;
const INPUT_POLL: Duration = Duration::from_millis(100);

/// What the "Latest File" panel currently shows.
enum LatestView {
    Empty,
    File { entry: DirEntryInfo, preview: Preview },
    Error(String),
}

pub struct TuiApp {
    pub session: Session,
    previews: PreviewCache,
    listing: Result<Vec<DirEntryInfo>, String>,
    latest: LatestView,
    /// Folder path being typed, when in edit mode.
    input: Option<String>,
    events_scroll: usize,
    show_help: bool,
    should_quit: bool,
    last_refresh: Option<Instant>,
}

impl TuiApp {
    pub fn new(session: Session, previews: PreviewCache) -> Self {
        Self {
            session,
            previews,
            listing: Ok(Vec::new()),
            latest: LatestView::Empty,
            input: None,
            events_scroll: 0,
            show_help: false,
            should_quit: false,
            last_refresh: None,
        }
    }

    /// Runs until the user quits, then stops monitoring. The session is
    /// handed back so the caller can inspect it.
    pub fn run<B: Backend>(mut self, terminal: &mut Terminal<B>) -> io::Result<Session> {
        loop {
            let due = self
                .last_refresh
                .map_or(true, |last| last.elapsed() >= self.session.refresh_interval());
            if due {
                self.refresh();
            }

            terminal.draw(|f| self.ui(f))?;

            if event::poll(INPUT_POLL)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key);
                    }
                }
            }

            if self.should_quit {
                break;
            }
        }

        if let Err(err) = self.session.stop_monitoring() {
            tracing::error!("Failed to stop monitoring on exit: {}", err);
        }
        Ok(self.session)
    }

    /// Drains pending events and re-reads the folder views.
    pub fn refresh(&mut self) {
        self.last_refresh = Some(Instant::now());
        let added = self.session.poll_events();
        if added > 0 {
            self.events_scroll = 0;
        }

        let Some(folder) = self.session.folder().map(|p| p.to_path_buf()) else {
            self.listing = Err("Please enter a valid folder path.".to_string());
            self.latest = LatestView::Empty;
            return;
        };
        let filter = self.session.filter().clone();

        self.listing = list_directory(&folder, &filter).map_err(|err| err.to_string());
        self.latest = match latest_file(&folder, &filter) {
            Ok(Some(entry)) => match self.previews.get_or_build(&entry.path) {
                Ok(preview) => LatestView::File { entry, preview },
                Err(err) => LatestView::Error(format!("Cannot preview {}: {}", entry.name, err)),
            },
            Ok(None) => LatestView::Empty,
            Err(err) => LatestView::Error(err.to_string()),
        };
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if let Some(input) = self.input.as_mut() {
            match key.code {
                KeyCode::Enter => {
                    let raw = input.clone();
                    self.input = None;
                    if self.session.set_folder(&raw).is_ok() {
                        self.session.clear_message();
                        self.refresh();
                    }
                }
                KeyCode::Esc => self.input = None,
                KeyCode::Backspace => {
                    input.pop();
                }
                KeyCode::Char(c) => input.push(c),
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('h') | KeyCode::F(1) => self.show_help = !self.show_help,
            KeyCode::Char('s') => {
                // Failures are already recorded as the session message.
                let _ = self.session.toggle_monitoring();
            }
            KeyCode::Char('o') => {
                let current = self
                    .session
                    .folder()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                self.input = Some(current);
            }
            KeyCode::Char('r') => self.refresh(),
            KeyCode::Char('+') | KeyCode::Char('=') => {
                self.session.adjust_refresh_interval(REFRESH_STEP_MS);
            }
            KeyCode::Char('-') => {
                self.session.adjust_refresh_interval(-REFRESH_STEP_MS);
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.events_scroll = self.events_scroll.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                let max_scroll = self.session.recent_events().len().saturating_sub(1);
                if self.events_scroll < max_scroll {
                    self.events_scroll += 1;
                }
            }
            _ => {}
        }
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    fn ui(&mut self, f: &mut Frame) {
        if self.show_help {
            self.render_help(f);
            return;
        }

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(5),      // Header
                Constraint::Percentage(30), // New events
                Constraint::Min(8),         // Listing + latest file
                Constraint::Length(3),      // Status bar
            ])
            .split(f.area());

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(chunks[2]);

        self.render_header(f, chunks[0]);
        self.render_events(f, chunks[1]);
        self.render_listing(f, body[0]);
        self.render_latest(f, body[1]);
        self.render_status(f, chunks[3]);
    }

    fn render_header(&self, f: &mut Frame, area: Rect) {
        let folder_line = match &self.input {
            Some(input) => Line::from(vec![
                Span::styled("Folder: ", Style::default().fg(Color::Gray)),
                Span::styled(format!("{}_", input), Style::default().fg(Color::Yellow)),
            ]),
            None => Line::from(vec![
                Span::styled("Folder: ", Style::default().fg(Color::Gray)),
                Span::styled(
                    self.session
                        .folder()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "(none)".to_string()),
                    Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
                ),
            ]),
        };

        let (state, state_color) = if self.session.is_monitoring() {
            ("● MONITORING", Color::Green)
        } else {
            ("○ STOPPED", Color::Red)
        };

        let mut lines = vec![
            folder_line,
            Line::from(vec![
                Span::styled(state, Style::default().fg(state_color).add_modifier(Modifier::BOLD)),
                Span::styled(
                    format!("  refresh every {} ms", self.session.refresh_interval().as_millis()),
                    Style::default().fg(Color::Gray),
                ),
            ]),
        ];
        if let Some(message) = self.session.message() {
            let color = match message.level {
                MessageLevel::Info => Color::Cyan,
                MessageLevel::Success => Color::Green,
                MessageLevel::Warning => Color::Yellow,
                MessageLevel::Error => Color::Red,
            };
            lines.push(Line::from(Span::styled(message.text.clone(), Style::default().fg(color))));
        }

        let header = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Rgb(80, 80, 80)))
                .title(" Real-Time File Viewer ")
                .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        );
        f.render_widget(header, area);
    }

    fn render_events(&self, f: &mut Frame, area: Rect) {
        let recent = self.session.recent_events();
        let visible_height = (area.height as usize).saturating_sub(2);

        let lines: Vec<Line> = if recent.is_empty() {
            let text = if self.session.is_monitoring() {
                let minutes = self.session.recent_window().num_minutes();
                format!("No events in the last {} minutes.", minutes)
            } else {
                "Press s to start monitoring.".to_string()
            };
            vec![Line::from(Span::styled(text, Style::default().fg(Color::Gray)))]
        } else {
            recent
                .iter()
                .rev()
                .skip(self.events_scroll)
                .take(visible_height)
                .map(|event| format_event(event))
                .collect()
        };

        let paragraph = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Rgb(80, 80, 80)))
                .title(format!(" New Events ({}) ", recent.len()))
                .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        );
        f.render_widget(paragraph, area);
    }

    fn render_listing(&self, f: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Rgb(80, 80, 80)))
            .title_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));

        match &self.listing {
            Ok(entries) => {
                let items: Vec<ListItem> = entries
                    .iter()
                    .map(|entry| {
                        let (icon, color) = match entry.kind {
                            EntryKind::Folder => ("📁 ", Color::Blue),
                            EntryKind::File => ("📄 ", Color::Cyan),
                        };
                        ListItem::new(Line::from(vec![
                            Span::styled(icon, Style::default().fg(color)),
                            Span::styled(
                                entry.name.clone(),
                                Style::default().add_modifier(Modifier::BOLD),
                            ),
                            Span::styled(
                                format!(
                                    "  {}  {}",
                                    entry.modified.format(TIMESTAMP_FORMAT),
                                    format_size(entry.size)
                                ),
                                Style::default().fg(Color::Rgb(120, 120, 120)),
                            ),
                        ]))
                    })
                    .collect();
                let title = format!(" Current Directory Contents ({}) ", entries.len());
                let list = List::new(items).block(block.title(title));
                f.render_widget(list, area);
            }
            Err(message) => {
                let error = Span::styled(message.clone(), Style::default().fg(Color::Red));
                let paragraph = Paragraph::new(error)
                    .block(block.title(" Current Directory Contents "))
                    .wrap(Wrap { trim: true });
                f.render_widget(paragraph, area);
            }
        }
    }

    fn render_latest(&self, f: &mut Frame, area: Rect) {
        let (title, lines) = match &self.latest {
            LatestView::Empty => (
                " Latest File ".to_string(),
                vec![Line::from(Span::styled(
                    "No valid files found in the directory.",
                    Style::default().fg(Color::Yellow),
                ))],
            ),
            LatestView::Error(message) => (
                " Latest File ".to_string(),
                vec![Line::from(Span::styled(message.clone(), Style::default().fg(Color::Red)))],
            ),
            LatestView::File { entry, preview } => (
                format!(" Latest File: {} [{}] ", entry.name, preview.title()),
                preview
                    .render_lines()
                    .into_iter()
                    .map(|line| Line::from(Span::raw(line)))
                    .collect(),
            ),
        };

        let paragraph = Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Rgb(80, 80, 80)))
                    .title(title)
                    .title_style(Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD)),
            )
            .wrap(Wrap { trim: false });
        f.render_widget(paragraph, area);
    }

    fn render_status(&self, f: &mut Frame, area: Rect) {
        let key = |k: &'static str, bg: Color| {
            Span::styled(k, Style::default().fg(Color::White).bg(bg).add_modifier(Modifier::BOLD))
        };
        let text =
            |t: &'static str| Span::styled(t, Style::default().fg(Color::Rgb(150, 150, 150)));

        let (total, ..) = self.session.log().counts();
        let status = Paragraph::new(Line::from(vec![
            key(" s ", Color::Green),
            text(" start/stop  "),
            key(" o ", Color::Blue),
            text(" folder  "),
            key(" +/- ", Color::Blue),
            text(" refresh  "),
            key(" h ", Color::Magenta),
            text(" help  "),
            key(" q ", Color::Red),
            text(" quit  "),
            Span::styled(format!("| events: {}", total), Style::default().fg(Color::Cyan)),
        ]))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Rgb(80, 80, 80))),
        )
        .alignment(Alignment::Center);

        f.render_widget(status, area);
    }

    fn render_help(&self, f: &mut Frame) {
        let popup_area = centered_rect(70, 60, f.area());

        let entry = |keys: &'static str, what: &'static str, color: Color| {
            Line::from(vec![
                Span::styled(keys, Style::default().fg(color).add_modifier(Modifier::BOLD)),
                Span::raw(what),
            ])
        };

        let help_text = vec![
            Line::from(Span::styled(
                "dirview - Real-Time File Viewer",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            entry("  s          ", "- Start/stop monitoring", Color::Green),
            entry(
                "  o          ",
                "- Edit folder path (Enter to apply, Esc to cancel)",
                Color::Blue,
            ),
            entry("  + / -      ", "- Increase/decrease refresh interval", Color::Blue),
            entry("  r          ", "- Refresh now", Color::Blue),
            entry("  ↑↓, j/k    ", "- Scroll events", Color::Yellow),
            entry("  h, F1      ", "- Show/hide this help", Color::Magenta),
            entry("  q, Esc     ", "- Quit", Color::Red),
        ];

        let paragraph = Paragraph::new(help_text)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Help ")
                    .title_style(Style::default().fg(Color::Cyan)),
            )
            .wrap(Wrap { trim: true });

        f.render_widget(Clear, popup_area);
        f.render_widget(paragraph, popup_area);
    }
}

fn format_event(event: &FileEvent) -> Line<'static> {
    let color = match event.kind() {
        FileEventKind::Created => Color::Green,
        FileEventKind::Modified => Color::Yellow,
        FileEventKind::Deleted => Color::Red,
        FileEventKind::Moved => Color::Blue,
    };

    let mut spans = vec![
        Span::styled(
            format!("[{}] ", event.observed_at().format(TIMESTAMP_FORMAT)),
            Style::default().fg(Color::Rgb(100, 100, 100)),
        ),
        Span::styled(
            format!("{:<9}", event.kind().label()),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::styled(event.path().display().to_string(), Style::default().fg(Color::White)),
    ];
    if let Some(to) = event.destination() {
        spans.push(Span::styled(
            format!(" -> {}", to.display()),
            Style::default().fg(Color::White),
        ));
    }
    Line::from(spans)
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

pub fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>, io::Error> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend)
}

pub fn restore_terminal(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
) -> Result<(), io::Error> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()
}
