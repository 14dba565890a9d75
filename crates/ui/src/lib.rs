//! ratatui-based UI.

use std::io::{self, Stdout};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{event, terminal};
use plotshelf_application::{AppContext, LoadRequest, Row, ViewStatus};
use plotshelf_core::format_label;
use plotshelf_engine::{ImageLoader, LoadedImage};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{
    Block, Borders, Clear, HighlightSpacing, List, ListItem, ListState, Paragraph, Wrap,
};
use ratatui_image::picker::Picker;
use ratatui_image::protocol::Protocol as ImageProtocol;
use ratatui_image::{Image as ImageWidget, Resize};
use unicode_width::UnicodeWidthStr;

mod image_protocol;

const IDLE_TICK: Duration = Duration::from_millis(250);
const LOADING_TICK: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Tree,
    Search,
}

struct RenderedImage {
    generation: u64,
    area: Rect,
    protocol: ImageProtocol,
}

pub struct Ui {
    ctx: AppContext,
    cwd: PathBuf,
    loader: ImageLoader,
    image_picker: Picker,
    focus: Focus,
    current_image: Option<Arc<image::DynamicImage>>,
    rendered: Option<RenderedImage>,
    render_error: Option<String>,
}

impl Ui {
    /// Takes the loaded context and performs the initial image selection.
    pub fn new(ctx: AppContext, cwd: PathBuf) -> Self {
        let mut ui = Self {
            ctx,
            cwd,
            loader: ImageLoader::new(),
            image_picker: Picker::halfblocks(),
            focus: Focus::Tree,
            current_image: None,
            rendered: None,
            render_error: None,
        };
        if ui.ctx.load_error.is_none() {
            if let Some(request) = ui.ctx.start() {
                ui.request_image(request);
            } else {
                tracing::info!("no timeseries graph to show at startup");
            }
        }
        ui
    }

    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    pub fn run(&mut self) -> anyhow::Result<()> {
        let mut terminal = setup_terminal()?;
        let hints = image_protocol::TerminalHints::from_env();
        self.image_picker = image_protocol::detect_picker(&hints);
        terminal.clear().ok();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.event_loop(&mut terminal)
        }));
        let restore_result = restore_terminal(&mut terminal);

        match (result, restore_result) {
            (Ok(Ok(())), Ok(())) => Ok(()),
            (Ok(Err(err)), _) => Err(err),
            (Ok(Ok(())), Err(err)) => Err(err),
            (Err(panic), Ok(())) => Err(anyhow::anyhow!(panic_to_string(panic))),
            (Err(panic), Err(err)) => Err(anyhow::anyhow!(
                "{}\n(additionally failed to restore terminal: {err})",
                panic_to_string(panic)
            )),
        }
    }

    fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    ) -> anyhow::Result<()> {
        let mut needs_redraw = true;

        loop {
            if self.apply_finished_loads() {
                needs_redraw = true;
            }

            if needs_redraw {
                terminal.draw(|frame| self.draw(frame.area(), frame))?;
                needs_redraw = false;
            }

            let tick = if self.loader.in_flight() > 0 {
                LOADING_TICK
            } else {
                IDLE_TICK
            };
            if !event::poll(tick)? {
                continue;
            }

            match event::read()? {
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                Event::Key(key) => {
                    if key.kind == KeyEventKind::Release {
                        continue;
                    }
                    needs_redraw = true;

                    let quit = match self.focus {
                        Focus::Search => self.handle_search_key(key),
                        Focus::Tree => self.handle_tree_key(key),
                    };
                    if quit {
                        return Ok(());
                    }
                }
                _ => {}
            }
        }
    }

    /// Returns `true` when the UI should quit.
    fn handle_tree_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return true,
            KeyCode::Down | KeyCode::Char('j') => self.ctx.select_next_row(),
            KeyCode::Up | KeyCode::Char('k') => self.ctx.select_prev_row(),
            KeyCode::Enter | KeyCode::Char(' ') => {
                if let Some(request) = self.ctx.activate_selected() {
                    self.request_image(request);
                }
            }
            KeyCode::Char('/') => self.focus = Focus::Search,
            KeyCode::Tab => self.ctx.cycle_category(1),
            KeyCode::BackTab => self.ctx.cycle_category(-1),
            KeyCode::Char(ch @ '1'..='9') => {
                let index = (ch as u8 - b'1') as usize;
                self.ctx.select_category(index);
            }
            _ => {}
        }
        false
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') if ctrl => return true,
            KeyCode::Char('u') if ctrl => self.ctx.clear_search(),
            KeyCode::Esc | KeyCode::Enter | KeyCode::Down => self.focus = Focus::Tree,
            KeyCode::Backspace => self.ctx.pop_search_char(),
            KeyCode::Tab => self.ctx.cycle_category(1),
            KeyCode::BackTab => self.ctx.cycle_category(-1),
            KeyCode::Char(ch) if !ctrl => self.ctx.push_search_char(ch),
            _ => {}
        }
        false
    }

    fn request_image(&mut self, request: LoadRequest) {
        // Hidden until the matching load completes.
        self.current_image = None;
        self.rendered = None;
        self.render_error = None;
        let path = self.ctx.settings.asset_path(&self.cwd, &request.path);
        tracing::info!(generation = request.generation, path = %path.display(), "loading graph");
        self.loader.request(&request, path);
    }

    /// Applies finished loads; returns `true` if the display changed.
    fn apply_finished_loads(&mut self) -> bool {
        let mut changed = false;
        for LoadedImage {
            generation, result, ..
        } in self.loader.poll()
        {
            let outcome = result
                .as_ref()
                .map(|_| ())
                .map_err(|err| format!("{err:#}"));
            if !self.ctx.viewer.complete(generation, outcome) {
                continue;
            }
            changed = true;
            self.rendered = None;
            self.current_image = result.ok().map(Arc::new);
        }
        changed
    }

    fn accent_color(&self) -> Color {
        Color::Yellow
    }

    fn draw(&mut self, area: Rect, frame: &mut ratatui::Frame) {
        frame.render_widget(Clear, area);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4),
                Constraint::Min(0),
                Constraint::Length(2),
            ])
            .split(area);

        let header = Paragraph::new(Text::from(self.header_lines()))
            .block(Block::default().borders(Borders::BOTTOM));
        frame.render_widget(header, layout[0]);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
            .split(layout[1]);

        self.draw_tree(frame, body[0]);
        self.draw_viewer(frame, body[1]);

        let footer = Paragraph::new(Text::from(self.footer_lines()))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::TOP));
        frame.render_widget(footer, layout[2]);
    }

    fn header_lines(&self) -> Vec<Line<'static>> {
        let mut chips = vec![Span::styled(
            "Category: ",
            Style::default().add_modifier(Modifier::BOLD),
        )];
        for (idx, tag) in self.ctx.controls.tags().iter().enumerate() {
            if idx > 0 {
                chips.push(Span::raw(" "));
            }
            let label = format!("{}:{}", idx + 1, format_label(tag));
            chips.push(category_chip(&label, idx == self.ctx.controls.active()));
        }

        let search = self.ctx.controls.search();
        let search_style = if self.focus == Focus::Search {
            Style::default().fg(self.accent_color())
        } else {
            Style::default()
        };
        let mut search_spans = vec![
            Span::styled("Search: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(search.to_string(), search_style),
        ];
        if self.focus == Focus::Search {
            search_spans.push(Span::styled("█", search_style));
        } else if search.is_empty() {
            search_spans.push(Span::styled(
                "(press / to search)",
                Style::default().fg(Color::DarkGray),
            ));
        }

        vec![
            Line::from(vec![
                Span::styled("Plotshelf", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" · charts"),
                Span::styled(
                    format!("  [{}]", image_protocol::protocol_label(&self.image_picker)),
                    Style::default().fg(Color::DarkGray),
                ),
            ]),
            Line::from(chips),
            Line::from(search_spans),
        ]
    }

    fn footer_lines(&self) -> Vec<Line<'static>> {
        let key = |k: &'static str| Span::styled(k, Style::default().add_modifier(Modifier::BOLD));
        if self.focus == Focus::Search {
            return vec![Line::from(vec![
                key("Esc/Enter"),
                Span::raw(" done  "),
                key("Backspace"),
                Span::raw(" delete  "),
                key("Ctrl+u"),
                Span::raw(" clear  "),
                key("Tab"),
                Span::raw(" category"),
            ])];
        }
        vec![Line::from(vec![
            key("Esc"),
            Span::raw(" quit  "),
            key("↑/↓"),
            Span::raw(" move  "),
            key("Enter"),
            Span::raw(" open/toggle  "),
            key("Tab/1-9"),
            Span::raw(" category  "),
            key("/"),
            Span::raw(" search"),
        ])]
    }

    fn draw_tree(&self, frame: &mut ratatui::Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Graphs");

        if let Some(err) = self.ctx.load_error.as_deref() {
            let lines = vec![
                Line::styled(
                    "Could not load the manifest.",
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                ),
                Line::raw(""),
                Line::raw(err.to_string()),
            ];
            let paragraph = Paragraph::new(Text::from(lines))
                .block(block)
                .wrap(Wrap { trim: true });
            frame.render_widget(paragraph, area);
            return;
        }

        let max_width = area.width.saturating_sub(4) as usize;
        let items: Vec<ListItem> = self
            .ctx
            .tree
            .rows()
            .iter()
            .map(|row| match row {
                Row::Header {
                    depth,
                    label,
                    collapsed,
                    ..
                } => {
                    let marker = if *collapsed { "▸ " } else { "▾ " };
                    let text = format!("{}{marker}{label}", "  ".repeat(*depth));
                    ListItem::new(Line::styled(
                        fit_width(&text, max_width),
                        Style::default().add_modifier(Modifier::BOLD),
                    ))
                }
                Row::Leaf { depth, leaf } => {
                    let text = format!("{}{}", "  ".repeat(*depth), leaf.label);
                    let style = if self.ctx.viewer.path() == Some(leaf.path.as_str()) {
                        Style::default().fg(Color::Cyan)
                    } else {
                        Style::default()
                    };
                    ListItem::new(Line::styled(fit_width(&text, max_width), style))
                }
            })
            .collect();

        let highlight_style = Style::default()
            .fg(Color::Black)
            .bg(self.accent_color())
            .add_modifier(Modifier::BOLD);

        let list = List::new(items)
            .block(block)
            .highlight_style(highlight_style)
            .highlight_spacing(HighlightSpacing::Always);

        let mut state = ListState::default();
        if self.focus == Focus::Tree {
            state.select(Some(self.ctx.selected_row));
        }
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_viewer(&mut self, frame: &mut ratatui::Frame, area: Rect) {
        let title = match self.ctx.viewer.title() {
            "" => "Viewer".to_string(),
            title => title.to_string(),
        };
        let block = Block::default().borders(Borders::ALL).title(Span::styled(
            title,
            Style::default().add_modifier(Modifier::BOLD),
        ));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let placeholder = match self.ctx.viewer.status() {
            ViewStatus::Idle => Some(Line::raw("No graph selected.")),
            ViewStatus::Loading => Some(Line::styled(
                "Loading…",
                Style::default().fg(Color::DarkGray),
            )),
            ViewStatus::Failed(err) => Some(Line::styled(
                format!("Could not load image: {err}"),
                Style::default().fg(Color::Red),
            )),
            ViewStatus::Ready => None,
        };
        if let Some(line) = placeholder {
            let paragraph = Paragraph::new(line)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true });
            frame.render_widget(paragraph, centered_rows(inner, 3));
            return;
        }

        self.ensure_rendered(inner);
        if let Some(rendered) = self.rendered.as_ref() {
            frame.render_widget(ImageWidget::new(&rendered.protocol), inner);
        } else if let Some(err) = self.render_error.as_deref() {
            let paragraph = Paragraph::new(Line::styled(
                format!("Could not display image: {err}"),
                Style::default().fg(Color::Red),
            ))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
            frame.render_widget(paragraph, centered_rows(inner, 3));
        }
    }

    fn ensure_rendered(&mut self, area: Rect) {
        let generation = self.ctx.viewer.generation();
        if self
            .rendered
            .as_ref()
            .is_some_and(|r| r.generation == generation && r.area == area)
        {
            return;
        }
        let Some(image) = self.current_image.as_ref() else {
            self.rendered = None;
            return;
        };
        if area.width == 0 || area.height == 0 {
            self.rendered = None;
            return;
        }

        match self.image_picker.new_protocol(
            (**image).clone(),
            area,
            Resize::Fit(Some(image::imageops::FilterType::Triangle)),
        ) {
            Ok(protocol) => {
                self.render_error = None;
                self.rendered = Some(RenderedImage {
                    generation,
                    area,
                    protocol,
                });
            }
            Err(err) => {
                tracing::warn!(%err, "failed to encode image for terminal");
                self.render_error = Some(err.to_string());
                self.rendered = None;
            }
        }
    }
}

fn setup_terminal() -> anyhow::Result<Terminal<CrosstermBackend<Stdout>>> {
    terminal::enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, EnterAlternateScreen).context("enter alt screen")?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).context("create terminal")
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
    terminal::disable_raw_mode().context("disable raw mode")?;
    crossterm::execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("leave alt screen")?;
    Ok(())
}

fn panic_to_string(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic: (unknown payload)".to_string()
    }
}

fn centered_rows(area: Rect, height: u16) -> Rect {
    let height = height.min(area.height);
    let top = area.y + (area.height - height) / 2;
    Rect::new(area.x, top, area.width, height)
}

fn category_chip(label: &str, active: bool) -> Span<'static> {
    let style = if active {
        Style::default()
            .fg(Color::Black)
            .bg(Color::Cyan)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    };
    Span::styled(format!(" {label} "), style)
}

/// Truncates to `max_width` display columns, ending in an ellipsis when cut.
fn fit_width(text: &str, max_width: usize) -> String {
    if max_width == 0 || UnicodeWidthStr::width(text) <= max_width {
        return text.to_string();
    }

    let mut out = String::new();
    let mut width = 0usize;
    for ch in text.chars() {
        let mut buf = [0u8; 4];
        let w = UnicodeWidthStr::width(&*ch.encode_utf8(&mut buf));
        if width + w + 1 > max_width {
            break;
        }
        out.push(ch);
        width += w;
    }
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use plotshelf_test::{item, make_settings, manifest_with, tagged};
    use ratatui::backend::TestBackend;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ui_with(ctx: AppContext) -> Ui {
        Ui::new(ctx, PathBuf::from("/nonexistent-plotshelf-root"))
    }

    fn screen_text(ui: &mut Ui, width: u16, height: u16) -> anyhow::Result<String> {
        let mut terminal = Terminal::new(TestBackend::new(width, height))?;
        terminal.draw(|frame| ui.draw(frame.area(), frame))?;
        let buffer = terminal.backend().buffer();
        let mut out = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                out.push_str(buffer[(x, y)].symbol());
            }
            out.push('\n');
        }
        Ok(out)
    }

    fn wait_for_load(ui: &mut Ui) {
        for _ in 0..200 {
            if ui.apply_finished_loads() {
                return;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn fit_width_truncates_with_ellipsis() {
        assert_eq!(fit_width("Temp Avg", 20), "Temp Avg");
        assert_eq!(fit_width("Temperature Max", 6), "Tempe…");
        assert_eq!(fit_width("abc", 0), "abc");
    }

    #[test]
    fn startup_requests_first_graph() {
        let manifest = manifest_with(vec![tagged("x/temp_avg.png", "weather")], vec![], vec![]);
        let ui = ui_with(AppContext::new(make_settings()).with_manifest(manifest));
        assert_eq!(ui.context().viewer.title(), "Temp Avg");
        assert_eq!(ui.context().viewer.path(), Some("x/temp_avg.png"));
    }

    #[test]
    fn missing_image_shows_failure_placeholder() -> anyhow::Result<()> {
        let manifest = manifest_with(vec![item("x/temp_avg.png")], vec![], vec![]);
        let mut ui = ui_with(AppContext::new(make_settings()).with_manifest(manifest));
        wait_for_load(&mut ui);
        assert!(matches!(ui.context().viewer.status(), ViewStatus::Failed(_)));

        let screen = screen_text(&mut ui, 100, 20)?;
        assert!(screen.contains("Could not load image"));
        assert!(!screen.contains("Loading…"));
        Ok(())
    }

    #[test]
    fn tree_renders_sections_and_leaves() -> anyhow::Result<()> {
        let manifest = manifest_with(
            vec![item("t/temp_avg.png")],
            vec![],
            vec![("gdp_growth", vec![item("c/a.png")]), ("cpi", vec![item("c/b.png")])],
        );
        let mut ui = ui_with(AppContext::new(make_settings()).with_manifest(manifest));
        let screen = screen_text(&mut ui, 120, 24)?;
        assert!(screen.contains("Timeseries Graphs"));
        assert!(screen.contains("Temp Avg"));
        assert!(screen.contains("Seasonal Correlations"));
        let cpi = screen.find("Cpi").expect("cpi subsection");
        let gdp = screen.find("Gdp Growth").expect("gdp subsection");
        assert!(cpi < gdp);
        Ok(())
    }

    #[test]
    fn manifest_error_is_visible() -> anyhow::Result<()> {
        let mut ui = ui_with(AppContext::new(make_settings()).with_load_error("no such file"));
        assert_eq!(ui.context().viewer.path(), None);
        let screen = screen_text(&mut ui, 100, 20)?;
        assert!(screen.contains("Could not load the manifest."));
        assert!(screen.contains("no such file"));
        assert!(screen.contains("No graph selected."));
        Ok(())
    }

    #[test]
    fn search_typing_rebuilds_without_changing_image() {
        let manifest = manifest_with(
            vec![item("t/temp_avg.png"), item("t/humidity.png")],
            vec![],
            vec![],
        );
        let mut ui = ui_with(AppContext::new(make_settings()).with_manifest(manifest));
        assert!(!ui.handle_tree_key(key(KeyCode::Char('/'))));
        for ch in "HUM".chars() {
            ui.handle_search_key(key(KeyCode::Char(ch)));
        }
        assert_eq!(ui.context().controls.search(), "HUM");
        assert_eq!(ui.context().tree.visible_leaf_labels(), vec!["Humidity"]);
        assert_eq!(ui.context().viewer.path(), Some("t/temp_avg.png"));

        ui.handle_search_key(key(KeyCode::Backspace));
        assert_eq!(ui.context().controls.search(), "HU");
        ui.handle_search_key(key(KeyCode::Esc));
        assert!(ui.handle_tree_key(key(KeyCode::Char('q'))));
    }

    #[test]
    fn number_keys_pick_category() {
        let manifest = manifest_with(
            vec![tagged("t/a.png", "lake"), tagged("t/b.png", "weather")],
            vec![],
            vec![],
        );
        let mut ui = ui_with(AppContext::new(make_settings()).with_manifest(manifest));
        ui.handle_tree_key(key(KeyCode::Char('3')));
        assert_eq!(ui.context().controls.active(), 2);
        assert_eq!(ui.context().tree.visible_leaf_labels(), vec!["B"]);
        ui.handle_tree_key(key(KeyCode::Tab));
        assert_eq!(ui.context().controls.active(), 0);
        assert_eq!(ui.context().tree.leaf_count(), 2);
    }

    #[test]
    fn enter_on_leaf_switches_graph() {
        let manifest = manifest_with(vec![item("t/a.png"), item("t/b.png")], vec![], vec![]);
        let mut ui = ui_with(AppContext::new(make_settings()).with_manifest(manifest));
        assert_eq!(ui.context().selected_row, 1);
        ui.handle_tree_key(key(KeyCode::Down));
        ui.handle_tree_key(key(KeyCode::Enter));
        assert_eq!(ui.context().viewer.path(), Some("t/b.png"));
        assert_eq!(ui.context().viewer.generation(), 2);
        assert!(ui.context().viewer.is_loading());
    }
}
