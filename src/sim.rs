use crate::model::{bump, Mood, Notice, StatusView, Vitals};
use chrono::{DateTime, Duration as ChronoDuration, Utc};

// Per-tick deltas.
const SLEEP_HUNGER: i32 = 2;
const SLEEP_ENERGY: i32 = 6;
const SLEEP_CLEAN: i32 = -1;
const SLEEP_HEALTH: i32 = 1;

const AWAKE_HUNGER: i32 = 3;
const AWAKE_ENERGY: i32 = -2;
const AWAKE_CLEAN: i32 = -1;

const STARVING_AT: u8 = 80;
const STARVING_PENALTY: i32 = -3;
const PECKISH_AT: u8 = 60;
const PECKISH_PENALTY: i32 = -1;
const EXHAUSTED_AT: u8 = 10;
const EXHAUSTED_PENALTY: i32 = -2;
const FILTHY_AT: u8 = 10;
const FILTHY_PENALTY: i32 = -2;

const AUTO_WAKE_AT: u8 = 98;

const PLAY_MIN_ENERGY: u8 = 10;
const HEAL_MIN_ENERGY: u8 = 8;

/// Advances the vitals by one simulated tick. Timestamps and flags are
/// left alone; only the four vitals change.
pub(crate) fn advance(s: &Vitals) -> Vitals {
    let mut next = s.clone();

    if s.is_sleeping {
        next.hunger = bump(s.hunger, SLEEP_HUNGER);
        next.energy = bump(s.energy, SLEEP_ENERGY);
        next.clean = bump(s.clean, SLEEP_CLEAN);
        next.health = bump(s.health, SLEEP_HEALTH);
        return next;
    }

    next.hunger = bump(s.hunger, AWAKE_HUNGER);
    next.energy = bump(s.energy, AWAKE_ENERGY);
    next.clean = bump(s.clean, AWAKE_CLEAN);

    // penalties stack and read the post-decay values
    let mut penalty = 0;
    if next.hunger >= STARVING_AT {
        penalty += STARVING_PENALTY;
    } else if next.hunger >= PECKISH_AT {
        penalty += PECKISH_PENALTY;
    }
    if next.energy <= EXHAUSTED_AT {
        penalty += EXHAUSTED_PENALTY;
    }
    if next.clean <= FILTHY_AT {
        penalty += FILTHY_PENALTY;
    }
    next.health = bump(s.health, penalty);

    next
}

/// First matching rule wins; the order matters for overlapping conditions.
pub(crate) fn classify(s: &Vitals) -> (Mood, &'static str) {
    if s.is_sleeping {
        return (Mood::Sleepy, "Sleeping...");
    }
    if s.health <= 25 {
        return (Mood::Sick, "Needs care!");
    }
    if s.hunger >= 75 {
        return (Mood::Hungry, "Feed me!");
    }
    if s.energy <= 25 {
        return (Mood::Sleepy, "Very tired");
    }
    if s.clean <= 25 {
        return (Mood::Sick, "Dirty & cranky");
    }
    if s.health >= 70 && s.hunger <= 40 && s.energy >= 40 {
        return (Mood::Happy, "Great");
    }
    (Mood::Okay, "Doing fine")
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PetAction {
    Feed,
    Play,
    ToggleSleep,
    Heal,
    TogglePause,
    Reset,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ActionOutcome {
    pub(crate) changed: bool,
    pub(crate) notice: Option<Notice>,
}

impl ActionOutcome {
    fn changed(notice: Notice) -> Self {
        Self {
            changed: true,
            notice: Some(notice),
        }
    }

    fn refused(notice: Notice) -> Self {
        Self {
            changed: false,
            notice: Some(notice),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct TickOutcome {
    pub(crate) ticked: bool,
    pub(crate) woke: bool,
    pub(crate) died: bool,
}

impl TickOutcome {
    pub(crate) fn notice(&self) -> Option<Notice> {
        if self.died {
            Some(Notice::negative(
                "Your pet has passed away. Press R to start over.",
            ))
        } else if self.woke {
            Some(Notice::positive("Fully rested and awake!"))
        } else {
            None
        }
    }
}

/// Summary of an offline catch-up run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct CatchUp {
    pub(crate) steps: u32,
    pub(crate) died: bool,
}

impl Vitals {
    pub(crate) fn status(&self, now: DateTime<Utc>) -> StatusView {
        let (mood, condition) = classify(self);
        StatusView {
            health: self.health,
            hunger: self.hunger,
            energy: self.energy,
            clean: self.clean,
            is_sleeping: self.is_sleeping,
            paused: self.paused,
            needs_reset: self.is_terminal(),
            mood,
            condition,
            age_minutes: self.age_minutes(now),
        }
    }

    /// Applies a player action. Every action except pause and reset is
    /// inert once the pet needs a reset.
    pub(crate) fn apply(&mut self, action: PetAction, now: DateTime<Utc>) -> ActionOutcome {
        match action {
            PetAction::TogglePause => {
                self.paused = !self.paused;
                let text = if self.paused { "Paused." } else { "Resumed." };
                ActionOutcome::changed(Notice::plain(text))
            }
            PetAction::Reset => {
                *self = Vitals::fresh(now);
                ActionOutcome::changed(Notice::positive("A new pet hatched!"))
            }
            _ if self.is_terminal() => {
                ActionOutcome::refused(Notice::plain("Your pet needs a reset (press R)."))
            }
            PetAction::Feed => {
                self.hunger = bump(self.hunger, -25);
                self.clean = bump(self.clean, -5);
                self.energy = bump(self.energy, 5);
                ActionOutcome::changed(Notice::positive("Yum! Thanks for the snack."))
            }
            PetAction::Play => {
                if self.energy <= PLAY_MIN_ENERGY {
                    return ActionOutcome::refused(Notice::negative("Too tired to play..."));
                }
                self.energy = bump(self.energy, -18);
                self.hunger = bump(self.hunger, 8);
                self.clean = bump(self.clean, -10);
                self.health = bump(self.health, 3);
                ActionOutcome::changed(Notice::positive("Wheee! That was fun."))
            }
            PetAction::ToggleSleep => {
                self.is_sleeping = !self.is_sleeping;
                let text = if self.is_sleeping {
                    "Good night..."
                } else {
                    "Good morning!"
                };
                ActionOutcome::changed(Notice::plain(text))
            }
            PetAction::Heal => {
                if self.energy <= HEAL_MIN_ENERGY {
                    return ActionOutcome::refused(Notice::negative(
                        "Too weak for medicine, let it rest first.",
                    ));
                }
                self.health = bump(self.health, 18);
                self.clean = bump(self.clean, 12);
                self.energy = bump(self.energy, -10);
                ActionOutcome::changed(Notice::positive("Medicine applied. Feeling better."))
            }
        }
    }

    /// One live scheduler tick: decay, then auto-wake, then the terminal latch.
    pub(crate) fn tick(&mut self, now: DateTime<Utc>) -> TickOutcome {
        if self.paused {
            return TickOutcome::default();
        }

        let mut out = TickOutcome {
            ticked: true,
            ..TickOutcome::default()
        };

        let was_alive = !self.is_terminal();
        self.decay_step(now);

        if self.is_sleeping && self.energy >= AUTO_WAKE_AT {
            self.is_sleeping = false;
            out.woke = true;
        }
        out.died = self.latch_if_dead() && was_alive;
        out
    }

    fn decay_step(&mut self, now: DateTime<Utc>) {
        self.decay_once();
        self.stamp(now);
    }

    fn decay_once(&mut self) {
        let next = advance(self);
        self.health = next.health;
        self.hunger = next.hunger;
        self.energy = next.energy;
        self.clean = next.clean;
    }

    /// Forces the "needs reset" flags when health is zero.
    fn latch_if_dead(&mut self) -> bool {
        if !self.is_terminal() {
            return false;
        }
        self.paused = true;
        self.is_sleeping = false;
        true
    }
}

/// Replays the minutes missed since `last_tick_at`, one decay per `step`,
/// never more than `max_steps`. `last_tick_at` ends at `now` (or stays put
/// if the clock went backwards).
pub(crate) fn catch_up(
    state: &mut Vitals,
    now: DateTime<Utc>,
    step: ChronoDuration,
    max_steps: u32,
) -> CatchUp {
    let mut summary = CatchUp::default();

    let step_ms = step.num_milliseconds().max(1);
    let elapsed_ms = (now - state.last_tick_at).num_milliseconds().max(0);
    let steps = (elapsed_ms / step_ms).min(max_steps as i64) as u32;

    // pause only stops the live scheduler; offline time still passes
    let was_alive = !state.is_terminal();
    if was_alive {
        for _ in 0..steps {
            state.decay_once();
            summary.steps += 1;
            if state.is_terminal() {
                break;
            }
        }
    }
    // also latches snapshots that were saved at zero health
    summary.died = state.latch_if_dead() && was_alive;

    state.stamp(now);
    summary
}
