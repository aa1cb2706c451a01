use std::io;
use std::sync::Arc;
use std::time::Duration;

use course_rag::{AnswerResult, Assistant, BOT_NAME, ChatTurn, Message, Role, Source};
use crossterm::event::{Event, EventStream, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use futures::StreamExt;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Margin};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap};
use tokio::sync::mpsc;

const WELCOME: &str = "Hi! I'm PantherBot. Ask me about UWM courses, prerequisites, credits, \
and program requirements. Try a course code like INFOST 790.";

/// Runs the chat screen until the user quits. The assistant is built outside the
/// runtime; in-flight requests are abandoned on exit.
pub fn run(assistant: Assistant) -> io::Result<()> {
    let assistant = Arc::new(assistant);
    let runtime = tokio::runtime::Runtime::new()?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(Arc::clone(&assistant));
    let res = runtime.block_on(run_app(&mut terminal, &mut app));
    drop(app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    runtime.shutdown_timeout(Duration::from_millis(200));
    res
}

struct App {
    input: String,
    /// Cursor position in chars, not bytes.
    cursor: usize,
    transcript: Vec<ChatTurn>,
    sources: Vec<Source>,
    documents: Vec<String>,
    status: Option<String>,
    assistant: Arc<Assistant>,
    output_focus: OutputFocus,
    chat_scroll: usize,
    chat_content_len: usize,
    chat_view_height: usize,
    chat_auto_scroll: bool,
    sources_scroll: usize,
    sources_content_len: usize,
    sources_view_height: usize,
    is_loading: bool,
    spinner_idx: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFocus {
    Chat,
    Sources,
}

enum Response {
    Answer(AnswerResult),
    Index(Result<usize, String>),
}

impl App {
    fn new(assistant: Arc<Assistant>) -> Self {
        Self {
            input: String::new(),
            cursor: 0,
            transcript: Vec::new(),
            sources: Vec::new(),
            documents: Vec::new(),
            status: None,
            assistant,
            output_focus: OutputFocus::Chat,
            chat_scroll: 0,
            chat_content_len: 0,
            chat_view_height: 0,
            chat_auto_scroll: false,
            sources_scroll: 0,
            sources_content_len: 0,
            sources_view_height: 0,
            is_loading: false,
            spinner_idx: 0,
        }
    }

    fn byte_offset(&self, cursor: usize) -> usize {
        self.input
            .char_indices()
            .nth(cursor)
            .map_or(self.input.len(), |(i, _)| i)
    }

    fn insert_char(&mut self, c: char) {
        let at = self.byte_offset(self.cursor);
        self.input.insert(at, c);
        self.cursor += 1;
    }

    fn delete_char(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let at = self.byte_offset(self.cursor);
        self.input.remove(at);
    }

    fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    fn move_right(&mut self) {
        if self.cursor < self.input.chars().count() {
            self.cursor += 1;
        }
    }

    fn submit(&mut self, tx: mpsc::UnboundedSender<Response>) {
        if self.input.trim().is_empty() || self.is_loading {
            return;
        }

        let question = self.input.trim().to_string();
        self.transcript.push(Message::user(question.clone()));
        self.is_loading = true;
        self.status = None;
        self.chat_auto_scroll = true;
        let assistant = Arc::clone(&self.assistant);
        tokio::task::spawn_blocking(move || {
            let _ = tx.send(Response::Answer(assistant.ask(&question)));
        });

        self.input.clear();
        self.cursor = 0;
    }

    fn index_now(&mut self, tx: mpsc::UnboundedSender<Response>) {
        if self.is_loading {
            return;
        }
        self.is_loading = true;
        self.status = Some("Indexing the course catalog...".to_string());
        let assistant = Arc::clone(&self.assistant);
        tokio::task::spawn_blocking(move || {
            let result = assistant.index_catalog().map_err(|err| err.to_string());
            let _ = tx.send(Response::Index(result));
        });
    }

    fn receive(&mut self, response: Response) {
        self.is_loading = false;
        match response {
            Response::Answer(result) => {
                self.transcript.push(Message::assistant(result.answer));
                self.sources = result.sources;
                self.documents = result.documents;
                self.sources_scroll = 0;
            }
            Response::Index(Ok(stored)) => {
                self.status = Some(format!("Indexed {stored} courses. Ask away!"));
            }
            Response::Index(Err(err)) => {
                tracing::warn!("catalog indexing failed: {err}");
                self.status = Some(format!("Indexing failed: {err}"));
            }
        }
        self.chat_auto_scroll = true;
    }

    fn scroll_up(&mut self, by: usize) {
        match self.output_focus {
            OutputFocus::Chat => self.chat_scroll = self.chat_scroll.saturating_sub(by),
            OutputFocus::Sources => self.sources_scroll = self.sources_scroll.saturating_sub(by),
        }
    }

    fn scroll_down(&mut self, by: usize) {
        match self.output_focus {
            OutputFocus::Chat => {
                let max_scroll = self.chat_content_len.saturating_sub(self.chat_view_height);
                self.chat_scroll = (self.chat_scroll + by).min(max_scroll);
            }
            OutputFocus::Sources => {
                let max_scroll = self
                    .sources_content_len
                    .saturating_sub(self.sources_view_height);
                self.sources_scroll = (self.sources_scroll + by).min(max_scroll);
            }
        }
    }

    fn scroll_to_start(&mut self) {
        match self.output_focus {
            OutputFocus::Chat => self.chat_scroll = 0,
            OutputFocus::Sources => self.sources_scroll = 0,
        }
    }

    fn scroll_to_end(&mut self) {
        match self.output_focus {
            OutputFocus::Chat => {
                self.chat_scroll = self.chat_content_len.saturating_sub(self.chat_view_height);
            }
            OutputFocus::Sources => {
                self.sources_scroll = self
                    .sources_content_len
                    .saturating_sub(self.sources_view_height);
            }
        }
    }

    fn focused_view_height(&self) -> usize {
        match self.output_focus {
            OutputFocus::Chat => self.chat_view_height,
            OutputFocus::Sources => self.sources_view_height,
        }
    }
}

/// Transcript as displayed: one labeled block per turn, oldest first.
fn render_transcript(turns: &[ChatTurn], status: Option<&str>) -> String {
    let mut blocks: Vec<String> = if turns.is_empty() {
        vec![WELCOME.to_string()]
    } else {
        turns
            .iter()
            .map(|turn| {
                let speaker = match turn.role {
                    Role::User => "You",
                    _ => BOT_NAME,
                };
                format!("{speaker}: {}", turn.content)
            })
            .collect()
    };
    if let Some(status) = status {
        blocks.push(format!("[{status}]"));
    }
    blocks.join("\n\n")
}

/// One markdown bullet per source; the URL is omitted when unknown.
pub fn render_sources(sources: &[Source]) -> String {
    sources
        .iter()
        .map(|s| {
            if s.url.is_empty() {
                format!("- **{}**\n", s.title)
            } else {
                format!("- **{}** — {}\n", s.title, s.url)
            }
        })
        .collect()
}

fn render_sources_panel(sources: &[Source], documents: &[String]) -> String {
    if sources.is_empty() {
        return "Sources for the latest answer appear here.".to_string();
    }
    let mut text = render_sources(sources);
    if !documents.is_empty() {
        text.push_str("\nRetrieved context:\n");
        for (i, doc) in documents.iter().enumerate() {
            text.push_str(&format!("[{}] {}\n", i + 1, preview(doc, 400)));
        }
    }
    text
}

/// First `max_chars` characters of `text`, marked when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

fn inner_width(area: ratatui::layout::Rect) -> usize {
    area.width.saturating_sub(2) as usize
}

fn inner_height(area: ratatui::layout::Rect) -> usize {
    area.height.saturating_sub(2) as usize
}

/// First visible char index of the input line, keeping the cursor in view.
fn view_start(len: usize, cursor: usize, max_width: usize) -> usize {
    if len <= max_width {
        return 0;
    }
    let cursor = cursor.min(len);
    let start = cursor.saturating_sub(max_width / 2);
    start.min(len - max_width)
}

fn truncate_input(input: &str, cursor: usize, max_width: usize) -> String {
    if max_width == 0 {
        return String::new();
    }
    let len = input.chars().count();
    let start = view_start(len, cursor, max_width);
    input.chars().skip(start).take(max_width).collect()
}

fn cursor_x_in_view(input: &str, cursor: usize, max_width: usize) -> usize {
    if max_width == 0 {
        return 0;
    }
    let len = input.chars().count();
    let cursor = cursor.min(len);
    cursor
        .saturating_sub(view_start(len, cursor, max_width))
        .min(max_width)
}

fn line_count(text: &str) -> usize {
    text.lines().count().max(1)
}

fn draw_ui(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> io::Result<()> {
    let spinner = ["|", "/", "-", "\\"];

    terminal.draw(|frame| {
        let title_style = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
        let info_border = Style::default().fg(Color::Yellow);
        let input_border = Style::default().fg(Color::DarkGray);
        let help_border = Style::default().fg(Color::DarkGray);
        let chat_text_style = Style::default().fg(Color::White);
        let sources_text_style = Style::default().fg(Color::Blue);
        let help_text_style = Style::default().fg(Color::DarkGray);
        let input_text_style = Style::default().fg(Color::Gray);

        let area = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(8),
                Constraint::Length(3),
                Constraint::Length(3),
            ])
            .split(area);
        let output_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
            .split(chunks[0]);

        let chat_text = render_transcript(&app.transcript, app.status.as_deref());
        let sources_text = render_sources_panel(&app.sources, &app.documents);

        let focus_mark = |focus: OutputFocus| if app.output_focus == focus { " *" } else { "" };
        let chat_title = if app.is_loading {
            format!("{BOT_NAME} {}{}", spinner[app.spinner_idx], focus_mark(OutputFocus::Chat))
        } else {
            format!("{BOT_NAME}{}", focus_mark(OutputFocus::Chat))
        };
        let sources_title = format!("Sources{}", focus_mark(OutputFocus::Sources));

        let chat_block = Block::bordered()
            .title(chat_title)
            .title_style(title_style)
            .border_style(info_border);
        let sources_block = Block::bordered()
            .title(sources_title)
            .title_style(title_style)
            .border_style(info_border);

        app.chat_content_len = line_count(&chat_text);
        app.chat_view_height = inner_height(output_chunks[0]);
        let chat_max = app.chat_content_len.saturating_sub(app.chat_view_height);
        if app.chat_auto_scroll {
            app.chat_scroll = chat_max;
            app.chat_auto_scroll = false;
        } else if app.chat_scroll > chat_max {
            app.chat_scroll = chat_max;
        }

        app.sources_content_len = line_count(&sources_text);
        app.sources_view_height = inner_height(output_chunks[1]);
        let sources_max = app
            .sources_content_len
            .saturating_sub(app.sources_view_height);
        if app.sources_scroll > sources_max {
            app.sources_scroll = sources_max;
        }

        let chat = Paragraph::new(chat_text)
            .style(chat_text_style)
            .scroll((app.chat_scroll as u16, 0))
            .wrap(Wrap { trim: false })
            .block(chat_block);
        frame.render_widget(chat, output_chunks[0]);

        let mut chat_scrollbar = ScrollbarState::new(app.chat_content_len).position(app.chat_scroll);
        let chat_scrollbar_widget = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .track_style(Style::default().fg(Color::DarkGray))
            .thumb_style(Style::default().fg(Color::Yellow));
        frame.render_stateful_widget(
            chat_scrollbar_widget,
            output_chunks[0].inner(Margin {
                vertical: 1,
                horizontal: 0,
            }),
            &mut chat_scrollbar,
        );

        let sources = Paragraph::new(sources_text)
            .style(sources_text_style)
            .scroll((app.sources_scroll as u16, 0))
            .wrap(Wrap { trim: true })
            .block(sources_block);
        frame.render_widget(sources, output_chunks[1]);

        let mut sources_scrollbar =
            ScrollbarState::new(app.sources_content_len).position(app.sources_scroll);
        let sources_scrollbar_widget = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .track_style(Style::default().fg(Color::DarkGray))
            .thumb_style(Style::default().fg(Color::Blue));
        frame.render_stateful_widget(
            sources_scrollbar_widget,
            output_chunks[1].inner(Margin {
                vertical: 1,
                horizontal: 0,
            }),
            &mut sources_scrollbar,
        );

        let input_block = Block::bordered()
            .title("Ask about UWM courses")
            .title_style(title_style)
            .border_style(input_border);
        let input_view = truncate_input(&app.input, app.cursor, inner_width(chunks[1]));
        let input = Paragraph::new(input_view)
            .style(input_text_style)
            .block(input_block);
        frame.render_widget(input, chunks[1]);

        let cursor_x = cursor_x_in_view(&app.input, app.cursor, inner_width(chunks[1]));
        let x = chunks[1].x + 1 + cursor_x as u16;
        let y = chunks[1].y + 1;
        frame.set_cursor_position((x, y));

        let help_block = Block::bordered()
            .title("Controls")
            .title_style(title_style)
            .border_style(help_border);
        let help = Paragraph::new(
            "Enter: Ask | F2/Ctrl+R: Index catalog | Ctrl+O: Focus | Up/Down/PgUp/PgDn/Home/End: Scroll | Esc/Ctrl+C: Quit",
        )
        .style(help_text_style)
        .wrap(Wrap { trim: true })
        .block(help_block);
        frame.render_widget(help, chunks[2]);
    })?;

    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> io::Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Response>();
    let mut events = EventStream::new();
    let mut spinner_tick = tokio::time::interval(Duration::from_millis(100));
    spinner_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    draw_ui(terminal, app)?;

    loop {
        tokio::select! {
            _ = spinner_tick.tick() => {
                if app.is_loading {
                    app.spinner_idx = (app.spinner_idx + 1) % 4;
                    draw_ui(terminal, app)?;
                }
            }
            maybe_result = rx.recv() => {
                if let Some(result) = maybe_result {
                    app.receive(result);
                    draw_ui(terminal, app)?;
                }
            }
            maybe_event = events.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
                        match key.code {
                            KeyCode::Char('c') if ctrl => return Ok(()),
                            KeyCode::Char('r') if ctrl => app.index_now(tx.clone()),
                            KeyCode::Char('o') if ctrl => {
                                app.output_focus = match app.output_focus {
                                    OutputFocus::Chat => OutputFocus::Sources,
                                    OutputFocus::Sources => OutputFocus::Chat,
                                };
                            }
                            KeyCode::F(2) => app.index_now(tx.clone()),
                            KeyCode::Esc => return Ok(()),
                            KeyCode::Enter => app.submit(tx.clone()),
                            KeyCode::Up => app.scroll_up(1),
                            KeyCode::Down => app.scroll_down(1),
                            KeyCode::PageUp => app.scroll_up(app.focused_view_height().max(1)),
                            KeyCode::PageDown => app.scroll_down(app.focused_view_height().max(1)),
                            KeyCode::Home => app.scroll_to_start(),
                            KeyCode::End => app.scroll_to_end(),
                            KeyCode::Left => app.move_left(),
                            KeyCode::Right => app.move_right(),
                            KeyCode::Backspace => app.delete_char(),
                            KeyCode::Char(ch) => app.insert_char(ch),
                            _ => {}
                        }
                        draw_ui(terminal, app)?;
                    }
                    Some(Ok(Event::Resize(..))) => draw_ui(terminal, app)?,
                    Some(Ok(_)) | Some(Err(_)) => {}
                    None => return Ok(()),
                }
            }
        }
    }
}
