use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::collections::HashSet;
use std::io::stdout;

use crate::card::{self, CardVariant};
use crate::db::Database;
use crate::filter::SearchFilters;
use crate::models::{InternshipListing, Role};
use crate::session::SessionContext;
use crate::validation::ApplicationInput;
use crate::workflow;

struct AppState {
    listings: Vec<InternshipListing>,
    selected: usize,
    scroll_offset: u16,
    applied: HashSet<i64>,
    can_apply: bool,
    message: Option<String>,
}

impl AppState {
    fn new(listings: Vec<InternshipListing>, applied: HashSet<i64>, can_apply: bool) -> Self {
        Self {
            listings,
            selected: 0,
            scroll_offset: 0,
            applied,
            can_apply,
            message: None,
        }
    }

    fn current(&self) -> Option<&InternshipListing> {
        self.listings.get(self.selected)
    }

    fn next(&mut self) {
        if !self.listings.is_empty() && self.selected < self.listings.len() - 1 {
            self.selected += 1;
            self.scroll_offset = 0;
        }
    }

    fn prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.scroll_offset = 0;
        }
    }

    fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(3);
    }

    fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(3);
    }

    fn apply(&mut self, db: &Database, session: &SessionContext) {
        let Some(id) = self.current().map(|l| l.internship.id) else {
            return;
        };
        if !self.can_apply {
            self.message = Some("Sign in as a student to apply".to_string());
            return;
        }
        self.message = Some(match workflow::submit(db, session, id, &ApplicationInput::default()) {
            Ok(_) => {
                self.applied.insert(id);
                "Application submitted".to_string()
            }
            Err(e) => e.user_message(),
        });
    }
}

/// Browse active internships matching `filters`. Signed-in students can apply
/// from the list.
pub fn run_browse(
    db: &Database,
    session: &SessionContext,
    filters: &SearchFilters,
    max_input_len: usize,
) -> Result<()> {
    let listings = db.search_internships(filters, max_input_len)?;
    if listings.is_empty() {
        println!("No internships found.");
        return Ok(());
    }

    let student = match session.account() {
        Some(account) if account.role == Role::Student => db.get_student_profile(&account.user_id)?,
        _ => None,
    };
    let applied = match &student {
        Some(profile) => db
            .list_student_applications(profile.id, None)?
            .into_iter()
            .map(|a| a.application.internship_id)
            .collect(),
        None => HashSet::new(),
    };
    let mut state = AppState::new(listings, applied, student.is_some());

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state, db, session);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState,
    db: &Database,
    session: &SessionContext,
) -> Result<()> {
    let mut list_state = ListState::default();
    list_state.select(Some(0));

    loop {
        terminal.draw(|frame| draw(frame, state, &mut list_state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            let prev_selected = state.selected;
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Down | KeyCode::Char('j') => state.next(),
                KeyCode::Up | KeyCode::Char('k') => state.prev(),
                KeyCode::Char('J') | KeyCode::PageDown => state.scroll_down(),
                KeyCode::Char('K') | KeyCode::PageUp => state.scroll_up(),
                KeyCode::Char('a') => state.apply(db, session),
                _ => {}
            }
            if state.selected != prev_selected {
                list_state.select(Some(state.selected));
                state.message = None;
            }
        }
    }
    Ok(())
}

fn draw(frame: &mut Frame, state: &AppState, list_state: &mut ListState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(35),
            Constraint::Percentage(65),
        ])
        .split(frame.area());

    // Left panel: listings
    let items: Vec<ListItem> = state
        .listings
        .iter()
        .map(|l| {
            let marker = if state.applied.contains(&l.internship.id) { "+" } else { " " };
            ListItem::new(format!(
                "{} #{:<4} {} | {}",
                marker,
                l.internship.id,
                card::truncate(&l.internship.title, 35),
                l.company.company_name
            ))
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(format!(
            " Internships ({}) ", state.listings.len()
        )))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, chunks[0], list_state);

    // Right panel: detailed card
    let width = chunks[1].width.saturating_sub(2) as usize;
    let detail_widget = Paragraph::new(build_detail(state, width))
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));

    frame.render_widget(detail_widget, chunks[1]);

    // Footer help
    let help_area = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());

    let footer = match &state.message {
        Some(msg) => Paragraph::new(format!(" {}", msg)).style(Style::default().fg(Color::Yellow)),
        None => Paragraph::new(" j/k:navigate  J/K:scroll  a:apply  q:quit")
            .style(Style::default().fg(Color::DarkGray)),
    };
    frame.render_widget(footer, help_area[1]);
}

fn build_detail(state: &AppState, width: usize) -> Text<'static> {
    let Some(listing) = state.current() else {
        return Text::raw("No internship selected");
    };

    let mut lines: Vec<Line> = card::render(listing, CardVariant::Detailed, width)
        .into_iter()
        .enumerate()
        .map(|(n, text)| {
            if n == 0 {
                Line::from(Span::styled(text, Style::default().add_modifier(Modifier::BOLD)))
            } else {
                Line::from(text)
            }
        })
        .collect();

    lines.push(Line::from(""));
    if state.applied.contains(&listing.internship.id) {
        lines.push(Line::from(Span::styled(
            "You have applied",
            Style::default().fg(Color::Cyan),
        )));
    }

    Text::from(lines)
}
