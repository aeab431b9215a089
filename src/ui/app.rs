use crate::engine::{AggregationResult, ExtractionRun, MatchRecord, RuleReport};
use color_eyre::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{DefaultTerminal, Frame};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Dashboard,
    MatchDetail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPanel {
    Rules,
    Groups,
    Matches,
}

pub struct App {
    pub run: ExtractionRun,
    pub view: View,
    pub focus_panel: FocusPanel,
    pub selected_rule: usize,
    /// 0 = all groups, then one entry per group value.
    pub selected_group: usize,
    pub selected_match: usize,
    pub diagnostics_scroll_offset: usize,
    pub should_quit: bool,
}

impl App {
    #[must_use]
    pub fn new(run: ExtractionRun) -> Self {
        Self {
            run,
            view: View::Dashboard,
            focus_panel: FocusPanel::Rules,
            selected_rule: 0,
            selected_group: 0,
            selected_match: 0,
            diagnostics_scroll_offset: 0,
            should_quit: false,
        }
    }

    pub fn run(mut self, mut terminal: DefaultTerminal) -> Result<()> {
        while !self.should_quit {
            terminal.draw(|frame| self.draw(frame))?;
            self.handle_events()?;
        }
        Ok(())
    }

    fn draw(&self, frame: &mut Frame) {
        match self.view {
            View::Dashboard => super::dashboard::draw_dashboard(frame, self),
            View::MatchDetail => super::dashboard::draw_match_detail(frame, self),
        }
    }

    fn handle_events(&mut self) -> Result<()> {
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                self.handle_key(key.code);
            }
        }
        Ok(())
    }

    pub fn handle_key(&mut self, code: KeyCode) {
        match self.view {
            View::Dashboard => self.handle_dashboard_keys(code),
            View::MatchDetail => self.handle_detail_keys(code),
        }
    }

    fn handle_dashboard_keys(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab => self.cycle_focus(),
            KeyCode::Up | KeyCode::Char('k') => self.previous_item(),
            KeyCode::Down | KeyCode::Char('j') => self.next_item(),
            KeyCode::Left | KeyCode::Char('h') => self.focus_left(),
            KeyCode::Right | KeyCode::Char('l') => self.focus_right(),
            KeyCode::Enter => self.enter_match_detail(),
            _ => {}
        }
    }

    fn handle_detail_keys(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Esc | KeyCode::Backspace | KeyCode::Enter => {
                self.view = View::Dashboard;
                self.diagnostics_scroll_offset = 0;
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.diagnostics_scroll_offset = self.diagnostics_scroll_offset.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => self.scroll_diagnostics_down(),
            KeyCode::Left | KeyCode::Char('h') => self.previous_match_in_detail(),
            KeyCode::Right | KeyCode::Char('l') => self.next_match_in_detail(),
            _ => {}
        }
    }

    fn cycle_focus(&mut self) {
        self.focus_panel = match self.focus_panel {
            FocusPanel::Rules => FocusPanel::Groups,
            FocusPanel::Groups => FocusPanel::Matches,
            FocusPanel::Matches => FocusPanel::Rules,
        };
    }

    fn focus_left(&mut self) {
        self.focus_panel = match self.focus_panel {
            FocusPanel::Rules | FocusPanel::Groups => FocusPanel::Rules,
            FocusPanel::Matches => FocusPanel::Groups,
        };
    }

    fn focus_right(&mut self) {
        self.focus_panel = match self.focus_panel {
            FocusPanel::Rules => FocusPanel::Groups,
            FocusPanel::Groups | FocusPanel::Matches => FocusPanel::Matches,
        };
    }

    fn previous_item(&mut self) {
        match self.focus_panel {
            FocusPanel::Rules => {
                if self.selected_rule > 0 {
                    self.selected_rule -= 1;
                    self.reset_rule_selection();
                }
            }
            FocusPanel::Groups => {
                if self.selected_group > 0 {
                    self.selected_group -= 1;
                    self.selected_match = 0;
                }
            }
            FocusPanel::Matches => self.selected_match = self.selected_match.saturating_sub(1),
        }
    }

    fn next_item(&mut self) {
        match self.focus_panel {
            FocusPanel::Rules => {
                if self.selected_rule < self.run.rules.len().saturating_sub(1) {
                    self.selected_rule += 1;
                    self.reset_rule_selection();
                }
            }
            FocusPanel::Groups => {
                let groups = self.selected_result().map_or(0, |r| r.groups.len());
                if self.selected_group < groups {
                    self.selected_group += 1;
                    self.selected_match = 0;
                }
            }
            FocusPanel::Matches => {
                if self.selected_match < self.filtered_matches().len().saturating_sub(1) {
                    self.selected_match += 1;
                }
            }
        }
    }

    fn reset_rule_selection(&mut self) {
        self.selected_group = 0;
        self.selected_match = 0;
    }

    fn enter_match_detail(&mut self) {
        if self.focus_panel == FocusPanel::Matches && self.selected_match_record().is_some() {
            self.view = View::MatchDetail;
            self.diagnostics_scroll_offset = 0;
        }
    }

    fn scroll_diagnostics_down(&mut self) {
        let max = self
            .selected_result()
            .map_or(0, |r| r.diagnostics.len())
            .saturating_sub(1);
        if self.diagnostics_scroll_offset < max {
            self.diagnostics_scroll_offset += 1;
        }
    }

    /// Wraps around.
    fn previous_match_in_detail(&mut self) {
        let count = self.filtered_matches().len();
        if count == 0 {
            return;
        }
        self.selected_match = if self.selected_match > 0 {
            self.selected_match - 1
        } else {
            count - 1
        };
    }

    /// Wraps around.
    fn next_match_in_detail(&mut self) {
        let count = self.filtered_matches().len();
        if count == 0 {
            return;
        }
        self.selected_match = if self.selected_match < count - 1 {
            self.selected_match + 1
        } else {
            0
        };
    }

    #[must_use]
    pub fn selected_report(&self) -> Option<&RuleReport> {
        self.run.rules.get(self.selected_rule)
    }

    #[must_use]
    pub fn selected_result(&self) -> Option<&AggregationResult> {
        self.selected_report().and_then(|r| r.outcome.result())
    }

    /// Group value picked in the groups panel, `None` for "All".
    #[must_use]
    pub fn selected_group_value(&self) -> Option<&str> {
        let index = self.selected_group.checked_sub(1)?;
        self.selected_result()
            .and_then(|r| r.groups.get(index))
            .map(|g| g.value.as_str())
    }

    /// Matches of the selected rule, narrowed to the selected group.
    #[must_use]
    pub fn filtered_matches(&self) -> Vec<&MatchRecord> {
        let Some(result) = self.selected_result() else {
            return Vec::new();
        };
        match self.selected_group_value() {
            Some(value) => result
                .matches
                .iter()
                .filter(|m| m.group.as_deref() == Some(value))
                .collect(),
            None => result.matches.iter().collect(),
        }
    }

    #[must_use]
    pub fn selected_match_record(&self) -> Option<&MatchRecord> {
        self.filtered_matches().get(self.selected_match).copied()
    }

    /// WBS code the selected match is written under.
    #[must_use]
    pub fn code_of(&self, record: &MatchRecord) -> String {
        let Some(report) = self.selected_report() else {
            return String::new();
        };
        let Some(extension) = self.run.plan.get(&report.code) else {
            return String::new();
        };
        record
            .group
            .as_deref()
            .and_then(|g| extension.group_code(g))
            .unwrap_or(extension.description_code.as_str())
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{index, LOAD_BEARING_WALLS};
    use crate::engine::{run_rules, ExtractOptions};
    use crate::rules::{PropertyRef, RuleSet, SelectionRule};
    use pretty_assertions::assert_eq;

    fn app() -> App {
        let mut set = RuleSet::new();
        let walls = SelectionRule::new(
            "IfcWall",
            "STANDARD",
            PropertyRef::new("Qto_WallBaseQuantities", "NetVolume"),
            PropertyRef::new("Pset_WallCommon", "LoadBearing"),
        );
        let mut broken = walls.clone();
        broken.quantity = PropertyRef::default();
        set.rules.insert("1.1".into(), walls);
        set.rules.insert("1.2".into(), broken);
        let run = run_rules(&index(LOAD_BEARING_WALLS), &set, &ExtractOptions::default(), |_| {})
            .unwrap();
        App::new(run)
    }

    #[test]
    fn group_selection_narrows_matches() {
        let mut app = app();
        assert_eq!(app.filtered_matches().len(), 3);

        app.handle_key(KeyCode::Right);
        app.handle_key(KeyCode::Down);
        assert_eq!(app.selected_group_value(), Some("true"));
        assert_eq!(app.filtered_matches().len(), 2);

        app.handle_key(KeyCode::Down);
        app.handle_key(KeyCode::Down);
        assert_eq!(app.selected_group_value(), Some("false"));
        assert_eq!(app.filtered_matches().len(), 1);
        let record = app.filtered_matches()[0];
        assert_eq!(app.code_of(record), "1.1.01.02");
    }

    #[test]
    fn failed_rule_has_no_matches() {
        let mut app = app();
        app.handle_key(KeyCode::Down);
        assert_eq!(app.selected_report().unwrap().code, "1.2");
        assert!(app.filtered_matches().is_empty());

        app.focus_panel = FocusPanel::Matches;
        app.handle_key(KeyCode::Enter);
        assert_eq!(app.view, View::Dashboard);
    }

    #[test]
    fn detail_view_wraps_between_matches() {
        let mut app = app();
        app.focus_panel = FocusPanel::Matches;
        app.handle_key(KeyCode::Enter);
        assert_eq!(app.view, View::MatchDetail);

        app.handle_key(KeyCode::Left);
        assert_eq!(app.selected_match, 2);
        app.handle_key(KeyCode::Right);
        assert_eq!(app.selected_match, 0);

        app.handle_key(KeyCode::Esc);
        assert_eq!(app.view, View::Dashboard);
        app.handle_key(KeyCode::Char('q'));
        assert!(app.should_quit);
    }
}
