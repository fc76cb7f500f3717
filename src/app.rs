use crate::config::{load_settings, project_paths, save_settings_atomic, Paths, Settings};
use crate::input::{collect_input_nonblocking, map_event, Command};
use crate::logging;
use crate::model::{Notice, Vitals};
use crate::render::{draw_frame, Frame, Terminal};
use crate::scheduler::Scheduler;
use crate::sim::{CatchUp, PetAction};
use crate::storage::{persist, resume, JsonFileStore, SnapshotStore};
use anyhow::Context;
use chrono::Utc;
use std::time::{Duration, Instant};

/// Live session state, independent of the terminal.
pub(crate) struct Session<S: SnapshotStore> {
    settings: Settings,
    store: S,
    vitals: Vitals,
    scheduler: Scheduler,
    notice: Option<(Notice, Instant)>,
    help_open: bool,
}

impl<S: SnapshotStore> Session<S> {
    pub(crate) fn start(settings: Settings, mut store: S, now: Instant) -> Self {
        let resumed = resume(&store, Utc::now(), &settings);
        if !resumed.restored {
            tracing::info!("a new pet hatched");
        }
        persist(&mut store, &resumed.vitals);

        let mut scheduler = Scheduler::new(settings.tick_period());
        scheduler.start(now);

        let mut session = Self {
            settings,
            store,
            vitals: resumed.vitals,
            scheduler,
            notice: None,
            help_open: false,
        };
        if let Some(n) = recap_notice(&resumed.replayed) {
            session.show(n, now);
        }
        session
    }

    pub(crate) fn vitals(&self) -> &Vitals {
        &self.vitals
    }

    fn show(&mut self, notice: Notice, now: Instant) {
        self.notice = Some((notice, now));
    }

    fn active_notice(&self, now: Instant) -> Option<&Notice> {
        let ttl = self.settings.notice_ttl();
        self.notice
            .as_ref()
            .filter(|(_, shown)| now.saturating_duration_since(*shown) < ttl)
            .map(|(n, _)| n)
    }

    /// Runs a player action and saves if anything changed.
    pub(crate) fn act(&mut self, action: PetAction, now: Instant) {
        let wall = Utc::now();

        if action == PetAction::Reset {
            if let Err(err) = self.store.discard() {
                tracing::warn!(%err, "could not discard old snapshot");
            }
            self.scheduler.start(now);
            tracing::info!("pet reset");
        }

        let outcome = self.vitals.apply(action, wall);
        tracing::debug!(?action, changed = outcome.changed, "action");
        if outcome.changed {
            persist(&mut self.store, &self.vitals);
        }
        if let Some(n) = outcome.notice {
            self.show(n, now);
        }
    }

    /// Applies every decay tick that fell due by `now`.
    pub(crate) fn pump(&mut self, now: Instant) {
        let due = self.scheduler.due(now);
        if due == 0 {
            return;
        }

        let mut dirty = false;
        for _ in 0..due {
            let out = self.vitals.tick(Utc::now());
            dirty |= out.ticked;
            if out.died {
                tracing::info!(age_minutes = self.vitals.age_minutes(Utc::now()), "pet died");
            }
            if let Some(n) = out.notice() {
                self.show(n, now);
            }
        }
        if dirty {
            tracing::debug!(
                health = self.vitals.health,
                hunger = self.vitals.hunger,
                energy = self.vitals.energy,
                clean = self.vitals.clean,
                "tick"
            );
            persist(&mut self.store, &self.vitals);
        }
    }

    pub(crate) fn save(&mut self) {
        persist(&mut self.store, &self.vitals);
    }
}

fn recap_notice(replayed: &CatchUp) -> Option<Notice> {
    if replayed.died {
        return Some(Notice::negative(
            "Your pet passed away while you were gone. Press R to start over.",
        ));
    }
    match replayed.steps {
        0 => None,
        1 => Some(Notice::plain("While you were away: 1 minute passed")),
        n => Some(Notice::plain(format!("While you were away: {n} minutes passed"))),
    }
}

pub(crate) struct App {
    paths: Paths,
    session: Session<JsonFileStore>,
    term: Terminal,
    should_quit: bool,
}

impl App {
    fn init() -> anyhow::Result<Self> {
        let paths = project_paths()?;
        if let Err(err) = logging::init(&paths.log_path) {
            eprintln!("pocketpet: logging disabled: {err:#}");
        }

        let settings = load_settings(&paths.settings_path);
        let store = JsonFileStore::new(paths.save_path.clone());
        tracing::info!(save = %store.path().display(), "starting");

        let session = Session::start(settings, store, Instant::now());
        let term = Terminal::begin().context("could not set up the terminal")?;

        Ok(Self {
            paths,
            session,
            term,
            should_quit: false,
        })
    }

    fn run(&mut self) -> anyhow::Result<()> {
        let fps = self.session.settings.fps_cap.max(1);
        let frame_dt = Duration::from_secs_f32(1.0 / fps as f32);

        while !self.should_quit {
            self.term.resize_if_needed()?;

            for ev in collect_input_nonblocking(frame_dt)? {
                match map_event(self.session.help_open, ev) {
                    Some(Command::Quit) => {
                        self.should_quit = true;
                        break;
                    }
                    Some(Command::HelpToggle) => self.session.help_open = !self.session.help_open,
                    Some(Command::Pet(action)) => self.session.act(action, Instant::now()),
                    None => {}
                }
            }

            self.session.pump(Instant::now());
            self.render_frame()?;
        }
        Ok(())
    }

    fn render_frame(&mut self) -> anyhow::Result<()> {
        let now = Instant::now();
        let view = self.session.vitals().status(Utc::now());
        let frame = Frame {
            view: &view,
            notice: self.session.active_notice(now),
            help_open: self.session.help_open,
            enable_color: self.session.settings.enable_color,
        };
        draw_frame(&mut self.term.cur, &frame);
        self.term.present()
    }

    fn shutdown(&mut self) -> anyhow::Result<()> {
        self.session.save();
        self.term.end()?;
        save_settings_atomic(&self.paths.settings_path, &self.session.settings)?;
        tracing::info!("bye");
        Ok(())
    }
}

pub(crate) fn run() -> anyhow::Result<()> {
    let mut app = App::init()?;
    let result = app.run();
    let closed = app.shutdown();
    result.and(closed)
}
