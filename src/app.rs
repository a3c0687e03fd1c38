use std::sync::Arc;
use std::time::Instant;

use crate::catalog::Catalog;
use crate::config::Config;
use crate::session::input;
use crate::session::quiz::{InputOutcome, QuizSession};
use crate::session::speech::{Speaker, Utterance};
use crate::store::score_store::ScoreStore;
use crate::ui::components::menu::Menu;
use crate::ui::theme::Theme;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppScreen {
    Menu,
    Quiz,
}

pub struct App {
    pub screen: AppScreen,
    pub session: QuizSession,
    pub menu: Menu<'static>,
    pub theme: &'static Theme,
    pub config: Config,
    /// Last selection error, shown in the menu until the next action.
    pub status: Option<String>,
    pub should_quit: bool,
    persist_config: bool,
}

impl App {
    pub fn new(
        config: Config,
        catalog: Arc<Catalog>,
        store: ScoreStore,
        speaker: Box<dyn Speaker>,
        theme: &'static Theme,
    ) -> Self {
        let menu = Menu::new(&catalog, theme);
        let session = QuizSession::new(catalog, store, speaker);
        Self {
            screen: AppScreen::Menu,
            session,
            menu,
            theme,
            config,
            status: None,
            should_quit: false,
            persist_config: false,
        }
    }

    /// Write the last selection back to the config file on every change.
    pub fn with_config_persistence(mut self) -> Self {
        self.persist_config = true;
        self
    }

    /// Resume the configured selection, else start on the menu.
    pub fn resume(&mut self, now: Instant) {
        let Some((language, writing_system)) = self.config.selection() else {
            return;
        };
        let (language, writing_system) = (language.to_string(), writing_system.to_string());
        match self.session.select_by_name(&language, &writing_system, now) {
            Ok(()) => self.after_selection(),
            Err(e) => log::warn!("could not resume {language} {writing_system}: {e}"),
        }
    }

    pub fn select_menu_item(&mut self, now: Instant) {
        let Some(item) = self.menu.selected_item() else {
            return;
        };
        let (language, writing_system) = (item.language, item.writing_system);
        match self.session.select_writing_system(language, writing_system, now) {
            Ok(()) => {
                self.status = None;
                self.after_selection();
                self.remember_selection();
            }
            Err(e) => self.status = Some(e.to_string()),
        }
    }

    fn after_selection(&mut self) {
        if self.session.view().close_menu {
            self.session.acknowledge_menu_closed();
            self.screen = AppScreen::Quiz;
        }
        if let Some((l, w)) = self.session.selection() {
            self.menu.focus(l, w);
        }
    }

    fn remember_selection(&mut self) {
        let view = self.session.view();
        let (Some(language), Some(ws)) = (view.language, view.writing_system) else {
            return;
        };
        let (code, name) = (language.code.clone(), ws.name.clone());
        self.config.set_selection(&code, &name);
        if self.persist_config
            && let Err(e) = self.config.save()
        {
            log::warn!("could not save config: {e}");
        }
    }

    /// Show the menu over a running quiz. The failure clock stops until the
    /// quiz is back on screen.
    pub fn open_menu(&mut self, now: Instant) {
        self.session.pause(now);
        self.screen = AppScreen::Menu;
    }

    /// Back from the menu to a running quiz; quit when there is none.
    pub fn leave_menu(&mut self, now: Instant) {
        if self.session.selection().is_some() {
            self.session.resume(now);
            self.screen = AppScreen::Quiz;
        } else {
            self.should_quit = true;
        }
    }

    pub fn type_char(&mut self, ch: char, now: Instant) -> InputOutcome {
        let change = input::process_char(self.session.response(), ch);
        self.session.on_response_input(change, now)
    }

    pub fn backspace(&mut self, now: Instant) -> InputOutcome {
        let change = input::process_backspace(self.session.response());
        self.session.on_response_input(change, now)
    }

    pub fn tick(&mut self, now: Instant) {
        self.session.tick(now);
    }

    pub fn speech_finished(&mut self, utterance: Utterance, now: Instant) {
        self.session.on_speech_finished(utterance, now);
    }

    pub fn quit(&mut self) {
        self.session.close();
        self.should_quit = true;
    }
}
