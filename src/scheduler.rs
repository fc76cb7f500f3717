use std::time::{Duration, Instant};

/// Upper bound on ticks released by a single poll, so a stalled frame
/// loop does not replay a long burst at once.
const MAX_BURST: u32 = 12;

const MAX_PERIOD: Duration = Duration::from_secs(24 * 3600);

/// Fixed-period decay timer polled from the frame loop. There is only ever
/// one pending deadline, so restarting can never leave a second timer behind.
pub(crate) struct Scheduler {
    period: Duration,
    next_due: Option<Instant>,
}

impl Scheduler {
    pub(crate) fn new(period: Duration) -> Self {
        Self {
            period: period.clamp(Duration::from_millis(1), MAX_PERIOD),
            next_due: None,
        }
    }

    /// Arms the timer one period from `now`, replacing any pending deadline.
    pub(crate) fn start(&mut self, now: Instant) {
        self.cancel();
        self.next_due = Some(now + self.period);
    }

    pub(crate) fn cancel(&mut self) {
        self.next_due = None;
    }

    /// Number of periods that elapsed by `now`; advances the deadline past them.
    pub(crate) fn due(&mut self, now: Instant) -> u32 {
        let Some(mut next) = self.next_due else {
            return 0;
        };

        let mut fired = 0;
        while now >= next {
            fired += 1;
            next += self.period;
            if fired == MAX_BURST {
                // drop the backlog instead of queueing it
                if now >= next {
                    next = now + self.period;
                }
                break;
            }
        }
        self.next_due = Some(next);
        fired
    }
}
