use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use pandoc_blocks_engine::{BlockId, BlockKind, Converter, ENVIRONMENTS, EditorSession, Preview};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::{Stdout, stdout};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Normal,
    Editing,
    /// Choosing which environment to insert
    Environment,
    /// Typing the title for `ENVIRONMENTS[index]`
    Title(usize),
}

struct App<C> {
    session: EditorSession<C>,
    list_state: ListState,
    mode: Mode,
    status: String,
    preview: Vec<String>,
    title: String,
    quit_armed: bool,
}

impl<C: Converter> App<C> {
    fn new(session: EditorSession<C>, status: Option<String>) -> Self {
        let mut app = Self {
            session,
            list_state: ListState::default(),
            mode: Mode::Normal,
            status: status.unwrap_or_default(),
            preview: Vec::new(),
            title: String::new(),
            quit_armed: false,
        };
        app.list_state.select(Some(0));
        app.refresh_preview();
        app
    }

    fn selected_id(&self) -> Option<BlockId> {
        let index = self.list_state.selected()?;
        self.session
            .document()
            .blocks()
            .get(index)
            .map(|b| b.id.clone())
    }

    fn next_block(&mut self) {
        let len = self.session.document().len();
        let i = match self.list_state.selected() {
            Some(i) => (i + 1) % len,
            None => 0,
        };
        self.list_state.select(Some(i));
        self.refresh_preview();
    }

    fn previous_block(&mut self) {
        let len = self.session.document().len();
        let i = match self.list_state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.list_state.select(Some(i));
        self.refresh_preview();
    }

    fn refresh_preview(&mut self) {
        let Some(id) = self.selected_id() else {
            self.preview.clear();
            return;
        };
        self.preview = match self.session.preview(&id) {
            Some(Preview::Html(html)) => html.lines().map(str::to_string).collect(),
            Some(error @ Preview::Error { .. }) => vec![error.to_html()],
            None => Vec::new(),
        };
    }

    fn append_block(&mut self) {
        let id = self.session.append_block();
        let index = self.session.document().position(&id);
        self.list_state.select(index);
        self.mode = Mode::Editing;
        self.preview.clear();
    }

    fn append_environment(&mut self, index: usize) {
        let title = std::mem::take(&mut self.title);
        let id = self
            .session
            .append_semantic(ENVIRONMENTS[index], Some(title.as_str()));
        let index = self.session.document().position(&id);
        self.list_state.select(index);
        self.mode = Mode::Editing;
        self.preview.clear();
    }

    fn selected_is_heading(&self) -> bool {
        self.selected_id()
            .and_then(|id| self.session.document().get(&id).map(|b| b.is_heading()))
            .unwrap_or(false)
    }

    fn save(&mut self) {
        self.status = match self.session.save() {
            Ok(path) => format!("Saved {}", path.display()),
            Err(e) => format!("Save failed: {e}"),
        };
    }

    /// Apply an edit to the selected block's content
    fn edit_selected(&mut self, edit: impl FnOnce(&mut String)) {
        let Some(id) = self.selected_id() else { return };
        let Some(block) = self.session.document().get(&id) else {
            return;
        };
        let mut content = block.content.clone();
        edit(&mut content);
        self.session.set_block_content(&id, content);
    }

    /// Returns true when the app should exit
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        match self.mode {
            Mode::Editing => {
                match key.code {
                    KeyCode::Esc => {
                        self.mode = Mode::Normal;
                        self.refresh_preview();
                    }
                    // A heading is a single line
                    KeyCode::Enter if self.selected_is_heading() => {}
                    KeyCode::Enter => self.edit_selected(|c| c.push('\n')),
                    KeyCode::Tab => self.edit_selected(|c| c.push('\t')),
                    KeyCode::Backspace => self.edit_selected(|c| {
                        c.pop();
                    }),
                    KeyCode::Char(ch) => self.edit_selected(|c| c.push(ch)),
                    _ => {}
                }
                false
            }
            Mode::Environment => {
                match key.code {
                    KeyCode::Char(ch) => {
                        let picked = ch.to_digit(10).and_then(|d| (d as usize).checked_sub(1));
                        if let Some(index) = picked.filter(|&i| i < ENVIRONMENTS.len()) {
                            self.title.clear();
                            self.mode = Mode::Title(index);
                        }
                    }
                    KeyCode::Esc => self.mode = Mode::Normal,
                    _ => {}
                }
                false
            }
            Mode::Title(index) => {
                match key.code {
                    KeyCode::Enter => self.append_environment(index),
                    KeyCode::Esc => self.mode = Mode::Normal,
                    KeyCode::Backspace => {
                        self.title.pop();
                    }
                    KeyCode::Char(ch) => self.title.push(ch),
                    _ => {}
                }
                false
            }
            Mode::Normal => {
                let quit_armed = std::mem::take(&mut self.quit_armed);
                match key.code {
                    KeyCode::Char('q') => {
                        if !self.session.is_dirty() || quit_armed {
                            return true;
                        }
                        self.quit_armed = true;
                        self.status = "Unsaved changes: press q again to quit".to_string();
                    }
                    KeyCode::Down | KeyCode::Char('j') => self.next_block(),
                    KeyCode::Up | KeyCode::Char('k') => self.previous_block(),
                    KeyCode::Enter | KeyCode::Char('e') => {
                        self.mode = Mode::Editing;
                        self.status.clear();
                    }
                    KeyCode::Char('a') => self.append_block(),
                    KeyCode::Char('n') => self.mode = Mode::Environment,
                    KeyCode::Char('s') => self.save(),
                    _ => {}
                }
                false
            }
        }
    }
}

pub fn run<C: Converter>(session: EditorSession<C>, status: Option<String>) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(session, status);

    // Main loop
    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res
}

fn run_app<C: Converter>(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App<C>,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
            && app.handle_key(key)
        {
            return Ok(());
        }
    }
}

fn kind_label(kind: BlockKind, level: u8) -> String {
    match kind {
        BlockKind::Heading => format!("H{level}"),
        BlockKind::Semantic => ":::".to_string(),
        BlockKind::Paragraph => "¶".to_string(),
    }
}

fn ui<C: Converter>(f: &mut Frame, app: &mut App<C>) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(2)])
        .split(f.area());
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(30),
            Constraint::Percentage(35),
            Constraint::Percentage(35),
        ])
        .split(rows[0]);

    // Block list panel
    let items: Vec<ListItem> = app
        .session
        .document()
        .iter()
        .map(|block| {
            let label = kind_label(block.kind, block.level);
            ListItem::new(Line::from(vec![
                Span::styled(format!("{label:<4}"), Style::default().fg(Color::Cyan)),
                Span::raw(block.summary().to_string()),
            ]))
        })
        .collect();

    let title = match (app.session.path(), app.session.is_dirty()) {
        (Some(path), true) => format!("Blocks: {} *", path.display()),
        (Some(path), false) => format!("Blocks: {}", path.display()),
        (None, _) => "Blocks".to_string(),
    };
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().bg(Color::Yellow).fg(Color::Black));
    f.render_stateful_widget(list, columns[0], &mut app.list_state);

    // Content panel
    let selected = app
        .selected_id()
        .and_then(|id| app.session.document().get(&id).cloned());
    let (content_title, content) = match &selected {
        Some(block) => (
            format!("{} {}", block.kind, block.id),
            block.content.lines().map(Line::from).collect::<Vec<_>>(),
        ),
        None => ("Content".to_string(), Vec::new()),
    };
    let border_style = if app.mode == Mode::Editing {
        Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    let content = Paragraph::new(content)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(content_title),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(content, columns[1]);

    // Preview panel
    let preview: Vec<Line> = app.preview.iter().map(|l| Line::from(l.as_str())).collect();
    let preview = Paragraph::new(preview)
        .block(Block::default().borders(Borders::ALL).title("Preview (HTML)"))
        .wrap(Wrap { trim: true });
    f.render_widget(preview, columns[2]);

    // Instructions
    let help = match app.mode {
        Mode::Normal => {
            "q: Quit | ↑/k: Previous | ↓/j: Next | e: Edit | a: Append | n: New environment | s: Save"
                .to_string()
        }
        Mode::Editing => "Esc: Stop editing | typing edits the selected block".to_string(),
        Mode::Environment => {
            let choices: Vec<String> = ENVIRONMENTS
                .iter()
                .enumerate()
                .map(|(i, name)| format!("{}: {name}", i + 1))
                .collect();
            format!("{} | Esc: Cancel", choices.join(" | "))
        }
        Mode::Title(index) => format!(
            "{} title (optional): {}_ | Enter: Insert | Esc: Cancel",
            ENVIRONMENTS[index], app.title
        ),
    };
    let footer = Paragraph::new(vec![
        Line::from(help),
        Line::from(Span::styled(
            app.status.as_str(),
            Style::default().fg(Color::Magenta),
        )),
    ]);
    f.render_widget(footer, rows[1]);
}
