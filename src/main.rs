use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Widget};

use glyphdr::app::{App, AppScreen};
use glyphdr::catalog::Catalog;
use glyphdr::config::Config;
use glyphdr::event::{AppEvent, EventHandler};
use glyphdr::session::speech::{CommandSpeaker, SilentSpeaker, Speaker};
use glyphdr::store::json_store::{JsonStore, MemoryStore};
use glyphdr::store::score_store::ScoreStore;
use glyphdr::ui::components::character_grid::CharacterGrid;
use glyphdr::ui::components::progress_bar::PassProgress;
use glyphdr::ui::components::quiz_area::QuizArea;
use glyphdr::ui::layout::{AppLayout, pack_hint_lines};
use glyphdr::ui::theme::Theme;
use glyphdr::ui;

const TICK_RATE: Duration = Duration::from_millis(50);

#[derive(Parser)]
#[command(name = "glyphdr", version, about = "Writing system flashcards with adaptive repetition")]
struct Cli {
    #[arg(short, long, help = "Theme name")]
    theme: Option<String>,

    #[arg(
        short,
        long,
        requires = "writing_system",
        help = "Language code to start with (e.g. el-GR)"
    )]
    language: Option<String>,

    #[arg(
        short,
        long,
        requires = "language",
        help = "Writing system to start with (e.g. Hiragana)"
    )]
    writing_system: Option<String>,

    #[arg(long, help = "Directory with index.json and per-language files")]
    catalog: Option<PathBuf>,

    #[arg(long, help = "Disable speech")]
    mute: bool,

    #[arg(long, help = "Log filter (overrides RUST_LOG), e.g. debug")]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());
    init_ui_locale();

    let mut config = Config::load().unwrap_or_else(|e| {
        log::warn!("ignoring unreadable config: {e}");
        Config::default()
    });
    if let Some(theme) = &cli.theme {
        config.theme = theme.clone();
    }
    if let (Some(language), Some(ws)) = (&cli.language, &cli.writing_system) {
        config.set_selection(language, ws);
    }
    if cli.mute {
        config.speech_enabled = false;
    }

    let catalog_dir = cli
        .catalog
        .clone()
        .or_else(|| config.catalog_dir.as_ref().map(PathBuf::from));
    let catalog = match catalog_dir {
        Some(dir) => Catalog::from_dir(&dir)
            .with_context(|| format!("loading catalog from {}", dir.display()))?,
        None => Catalog::embedded().context("loading bundled catalog")?,
    };

    let store = match JsonStore::new() {
        Ok(storage) => ScoreStore::new(Box::new(storage)),
        Err(e) => {
            log::warn!("scores will not persist: {e}");
            ScoreStore::new(Box::new(MemoryStore::new()))
        }
    };

    let theme = Theme::load(&config.theme).unwrap_or_else(|| {
        log::warn!(
            "unknown theme '{}', available: {}",
            config.theme,
            Theme::available_themes().join(", ")
        );
        Theme::default()
    });
    let theme: &'static Theme = Box::leak(Box::new(theme));

    let events = EventHandler::new(TICK_RATE);
    let speaker = make_speaker(&config, &events);

    let mut app = App::new(config, Arc::new(catalog), store, speaker, theme)
        .with_config_persistence();
    app.resume(Instant::now());

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app, &events);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        eprintln!("Error: {err:?}");
    }

    Ok(())
}

/// Log to a file under the data dir; the terminal belongs to the UI.
fn init_logging(level: Option<&str>) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if let Some(level) = level {
        builder.parse_filters(level);
    }

    let log_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("glyphdr");
    let file = fs::create_dir_all(&log_dir).and_then(|_| {
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_dir.join("glyphdr.log"))
    });
    match file {
        Ok(file) => {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        Err(_) => {
            builder.filter_level(log::LevelFilter::Off);
        }
    }
    builder.init();
}

fn init_ui_locale() {
    let lang = std::env::var("LC_ALL")
        .or_else(|_| std::env::var("LANG"))
        .unwrap_or_default();
    if !ui::init_locale(&lang) {
        log::debug!("no UI translation for '{lang}', using English");
    }
}

fn make_speaker(config: &Config, events: &EventHandler) -> Box<dyn Speaker> {
    if !config.speech_enabled {
        return Box::new(SilentSpeaker);
    }
    let tx = events.sender();
    Box::new(CommandSpeaker::new(
        config.speech_command.clone(),
        config.speech_rate,
        config.voices.clone(),
        Arc::new(move |utterance| {
            let _ = tx.send(AppEvent::SpeechFinished(utterance));
        }),
    ))
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &EventHandler,
) -> Result<()> {
    loop {
        terminal.draw(|frame| render(frame, app))?;

        match events.next()? {
            AppEvent::Key(key) => handle_key(app, key),
            AppEvent::Tick => {}
            AppEvent::Resize(_, _) => {}
            AppEvent::SpeechFinished(utterance) => app.speech_finished(utterance, Instant::now()),
        }
        // Timers are checked after every event, not only on ticks.
        app.tick(Instant::now());

        if app.should_quit {
            return Ok(());
        }
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if key.kind != KeyEventKind::Press {
        return;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.quit();
        return;
    }

    match app.screen {
        AppScreen::Menu => handle_menu_key(app, key),
        AppScreen::Quiz => handle_quiz_key(app, key),
    }
}

fn handle_menu_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Esc => app.leave_menu(Instant::now()),
        KeyCode::Up | KeyCode::Char('k') => app.menu.prev(),
        KeyCode::Down | KeyCode::Char('j') => app.menu.next(),
        KeyCode::Enter => app.select_menu_item(Instant::now()),
        _ => {}
    }
}

fn handle_quiz_key(app: &mut App, key: KeyEvent) {
    let now = Instant::now();
    match key.code {
        KeyCode::Esc => app.open_menu(now),
        KeyCode::Backspace => {
            app.backspace(now);
        }
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.type_char(ch, now);
        }
        _ => {}
    }
}

fn render(frame: &mut ratatui::Frame, app: &App) {
    let area = frame.area();
    let colors = &app.theme.colors;

    if app.screen == AppScreen::Menu {
        let buf = frame.buffer_mut();
        let menu_area = area.inner(ratatui::layout::Margin::new(2, 1));
        app.menu.render(menu_area, buf);
        if let Some(status) = &app.status {
            let status_area = ratatui::layout::Rect::new(
                area.x,
                area.y + area.height.saturating_sub(1),
                area.width,
                1,
            );
            Paragraph::new(Span::styled(status.as_str(), Style::default().fg(colors.error())))
                .render(status_area, buf);
        }
        return;
    }

    let view = app.session.view();
    let layout = AppLayout::new(area);
    let buf = frame.buffer_mut();

    let title = match (view.language, view.writing_system) {
        (Some(language), Some(ws)) => format!(" glyphdr │ {} {}", language.name, ws.name),
        _ => " glyphdr".to_string(),
    };
    Paragraph::new(Line::from(Span::styled(
        title,
        Style::default()
            .fg(colors.header_fg())
            .bg(colors.header_bg())
            .add_modifier(Modifier::BOLD),
    )))
    .render(layout.header, buf);

    QuizArea::new(&view, app.theme).render(layout.quiz, buf);
    if let Some(ws) = view.writing_system {
        CharacterGrid::new(ws, view.scores, view.character_index, app.theme)
            .render(layout.grid, buf);
    }
    PassProgress::new(&view, app.theme).render(layout.progress, buf);

    let hint = ui::quiz_hint();
    let hints = pack_hint_lines(&[hint.as_str()], layout.footer.width as usize);
    if let Some(line) = hints.first() {
        Paragraph::new(Span::styled(line.as_str(), Style::default().fg(colors.pending())))
            .render(layout.footer, buf);
    }
}
