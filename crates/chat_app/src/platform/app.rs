use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use chat_core::{update, AppState, Effect, EventBus, EventKind, Msg};
use chat_engine::{EngineHandle, SourceProvider, StaticSourceProvider};
use chat_logging::{chat_debug, chat_info, chat_warn};

use super::config::AppConfig;
use super::effects::EffectRunner;
use super::ui::input::{parse_line, Command, HELP_TEXT};
use super::ui::render::render_frame;

const TICK_INTERVAL: Duration = Duration::from_millis(50);
const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

pub fn run_console(config: &AppConfig) -> anyhow::Result<()> {
    let sources: Arc<dyn SourceProvider> = match &config.sources_file {
        Some(path) => Arc::new(StaticSourceProvider::from_file(path)?),
        None => Arc::new(StaticSourceProvider::empty()),
    };
    let engine = EngineHandle::connect(config.engine_settings(), sources)?;
    let state = AppState::new().with_page_host(&config.page_host());
    chat_info!(
        "console talking to {} (page host {:?})",
        config.server_url,
        config.page_host()
    );

    let (line_tx, line_rx) = mpsc::channel::<String>();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if line_tx.send(line).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    chat_warn!("stdin closed: {}", err);
                    break;
                }
            }
        }
    });

    let mut console = Console::new(state, EffectRunner::new(engine));
    console.redraw()?;

    loop {
        let engine_msgs = console.runner.poll_events();
        console.queue.extend(engine_msgs);
        console.drain()?;

        match line_rx.recv_timeout(TICK_INTERVAL) {
            Ok(line) => {
                let view = console.state.view();
                match parse_line(&line, &view, Instant::now()) {
                    Command::Dispatch(msgs) => console.queue.extend(msgs),
                    Command::Quit => break,
                    Command::Help => console.notice(HELP_TEXT)?,
                    Command::Invalid(hint) => console.notice(&hint)?,
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                console.queue.push_back(Msg::Tick(Instant::now()));
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
        console.drain()?;
    }
    chat_info!("console closed");
    Ok(())
}

/// Owns the state, the bus and the engine runner; all updates happen here.
struct Console {
    state: AppState,
    runner: EffectRunner,
    bus: EventBus,
    bus_rx: mpsc::Receiver<Msg>,
    queue: VecDeque<Msg>,
}

impl Console {
    fn new(state: AppState, runner: EffectRunner) -> Self {
        let (bus_tx, bus_rx) = mpsc::channel();
        let mut bus = EventBus::new();
        for kind in [EventKind::SourcesOpen, EventKind::PanelOpen] {
            let tx = bus_tx.clone();
            bus.subscribe(kind, move |event| {
                let _ = tx.send(Msg::Bus(event.clone()));
            });
        }
        Self {
            state,
            runner,
            bus,
            bus_rx,
            queue: VecDeque::new(),
        }
    }

    /// Runs queued messages, including those the bus forwards while they
    /// run, then redraws once if anything changed.
    fn drain(&mut self) -> io::Result<()> {
        loop {
            while let Ok(msg) = self.bus_rx.try_recv() {
                self.queue.push_back(msg);
            }
            let Some(msg) = self.queue.pop_front() else {
                break;
            };
            self.dispatch_msg(msg);
        }
        if self.state.consume_dirty() {
            self.redraw()?;
        }
        Ok(())
    }

    fn dispatch_msg(&mut self, msg: Msg) {
        if !matches!(msg, Msg::Tick(_)) {
            chat_debug!("dispatch {:?}", msg);
        }
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;

        for effect in self.runner.run(effects) {
            match effect {
                Effect::Emit(event) => {
                    self.bus.emit(&event);
                }
                Effect::OpenUrl(url) => {
                    chat_info!("open url {}", url);
                    println!("\n打开链接: {url}");
                }
                other => chat_warn!("unhandled effect {:?}", other),
            }
        }
    }

    fn redraw(&self) -> io::Result<()> {
        let frame = render_frame(&self.state.view());
        let mut stdout = io::stdout().lock();
        write!(stdout, "{CLEAR_SCREEN}{frame}")?;
        stdout.flush()
    }

    fn notice(&self, text: &str) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "\n{text}")?;
        write!(stdout, "> ")?;
        stdout.flush()
    }
}
