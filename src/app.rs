use crate::api::ApiClient;
use crate::config::Config;
use crate::feeds::{self, FeedMessage, FetchRequest};
use crate::ui::widgets::{operations::OperationsDashboard, tweets::TweetBrowser, FeedWidget};
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Tabs},
    Frame, Terminal,
};
use std::io;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Owns the widgets, the in-flight fetch tasks and the channel their
/// results come back on.
pub struct App {
    client: ApiClient,
    widgets: Vec<Box<dyn FeedWidget>>,
    active: usize,
    tx: mpsc::UnboundedSender<FeedMessage>,
    rx: mpsc::UnboundedReceiver<FeedMessage>,
    tasks: JoinSet<()>,
    should_quit: bool,
}

impl App {
    pub fn new(client: ApiClient, config: &Config) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let widgets: Vec<Box<dyn FeedWidget>> = vec![
            Box::new(TweetBrowser::new(config.browser.clone())),
            Box::new(OperationsDashboard::new(config.dashboard.clone())),
        ];

        let mut app = Self {
            client,
            widgets,
            active: 0,
            tx,
            rx,
            tasks: JoinSet::new(),
            should_quit: false,
        };
        app.select_tab(0);
        app
    }

    /// Takes over the terminal until the user quits. Must be called from
    /// inside a tokio runtime.
    pub fn run(mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.event_loop(&mut terminal);

        self.shutdown();
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        info!(backend = self.client.base_url(), "dashboard started");
        self.start_widgets();

        loop {
            terminal.draw(|f| self.render(f))?;

            if event::poll(POLL_INTERVAL)? {
                if let Event::Key(key) = event::read()? {
                    self.handle_key(key);
                }
            }

            self.drain_messages();
            self.tick(Instant::now());
            self.reap_tasks();

            if self.should_quit {
                break;
            }
        }

        info!("dashboard stopped");
        Ok(())
    }

    fn start_widgets(&mut self) {
        let requests: Vec<FetchRequest> = self
            .widgets
            .iter_mut()
            .flat_map(|widget| widget.start())
            .collect();
        self.dispatch(requests);
    }

    fn dispatch(&mut self, requests: Vec<FetchRequest>) {
        for request in requests {
            debug!(widget = %request.widget_id, kind = ?request.request.kind(), "dispatching request");
            let client = self.client.clone();
            let tx = self.tx.clone();
            self.tasks.spawn(async move {
                let message = feeds::run_request(client, request).await;
                if tx.send(message).is_err() {
                    debug!("dashboard closed, dropping fetch result");
                }
            });
        }
    }

    /// Hands every finished result to its widget. Returns how many were
    /// routed.
    fn drain_messages(&mut self) -> usize {
        let mut routed = 0;
        while let Ok(message) = self.rx.try_recv() {
            match self
                .widgets
                .iter_mut()
                .find(|w| w.id() == message.widget_id)
            {
                Some(widget) => {
                    widget.update_data(message);
                    routed += 1;
                }
                None => debug!(widget = %message.widget_id, "no widget for fetch result"),
            }
        }
        routed
    }

    fn tick(&mut self, now: Instant) {
        let requests: Vec<FetchRequest> = self
            .widgets
            .iter_mut()
            .flat_map(|widget| widget.tick(now))
            .collect();
        self.dispatch(requests);
    }

    fn reap_tasks(&mut self) {
        while let Some(result) = self.tasks.try_join_next() {
            if let Err(e) = result {
                if !e.is_cancelled() {
                    warn!(error = %e, "fetch task failed");
                }
            }
        }
    }

    /// Cancels outstanding fetches. Anything still in flight can no longer
    /// reach a widget.
    fn shutdown(&mut self) {
        self.tasks.abort_all();
        self.rx.close();
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        if !self.widgets[self.active].is_capturing_input() {
            match key.code {
                KeyCode::Char('q') => {
                    self.should_quit = true;
                    return;
                }
                KeyCode::Tab => {
                    self.select_tab((self.active + 1) % self.widgets.len());
                    return;
                }
                KeyCode::BackTab => {
                    let len = self.widgets.len();
                    self.select_tab((self.active + len - 1) % len);
                    return;
                }
                KeyCode::Char(c @ '1'..='9') => {
                    let index = c as usize - '1' as usize;
                    if index < self.widgets.len() {
                        self.select_tab(index);
                    }
                    return;
                }
                _ => {}
            }
        }

        let requests = self.widgets[self.active].handle_key(key);
        self.dispatch(requests);
    }

    fn select_tab(&mut self, index: usize) {
        self.active = index;
        for (i, widget) in self.widgets.iter_mut().enumerate() {
            widget.set_selected(i == index);
        }
    }

    fn render(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0)])
            .split(frame.area());

        let titles: Vec<String> = self
            .widgets
            .iter()
            .enumerate()
            .map(|(i, w)| format!("{} {}", i + 1, w.title()))
            .collect();
        let tabs = Tabs::new(titles)
            .select(self.active)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!(" tweetdash · {} ", self.client.base_url())),
            )
            .highlight_style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            );
        frame.render_widget(tabs, chunks[0]);

        self.widgets[self.active].render(frame, chunks[1], true);
    }
}
