use ratatui::Frame;

use crate::{
    ui::{render_results, render_stats, render_typing},
    App, AppScreen,
};

/// A UI screen boundary: responsible for rendering the whole frame
pub trait Screen {
    fn render(&self, app: &App, f: &mut Frame);
}

/// Target prompt with live figures
pub struct TypingScreen;

impl Screen for TypingScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        render_typing(app, f.area(), f.buffer_mut());
    }
}

/// Tier and figures for the round that just finished
pub struct ResultsScreen;

impl Screen for ResultsScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        render_results(app, f.area(), f.buffer_mut());
    }
}

/// Session aggregate and recent rounds
pub struct StatsScreen;

impl Screen for StatsScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        render_stats(app, f.area(), f.buffer_mut());
    }
}

pub fn current_screen(screen: AppScreen) -> Box<dyn Screen> {
    match screen {
        AppScreen::Typing => Box::new(TypingScreen),
        AppScreen::Results => Box::new(ResultsScreen),
        AppScreen::Stats => Box::new(StatsScreen),
    }
}
