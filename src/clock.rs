use chrono::{DateTime, SubsecRound, Utc};
use chrono_tz::Tz;

/// Source of "now" in the time zone all stored timestamps are read in.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Tz>;

    fn timezone(&self) -> Tz;
}

/// Wall clock in a named zone, truncated to whole seconds.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    tz: Tz,
}

impl SystemClock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.tz).trunc_subsecs(0)
    }

    fn timezone(&self) -> Tz {
        self.tz
    }
}

/// A clock stopped at one instant. Used by tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    at: DateTime<Tz>,
}

impl FixedClock {
    pub fn new(at: DateTime<Tz>) -> Self {
        Self { at }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Tz> {
        self.at
    }

    fn timezone(&self) -> Tz {
        self.at.timezone()
    }
}

/// Parse an IANA zone name such as `Europe/Paris`.
pub fn parse_timezone(value: &str) -> Result<Tz, String> {
    value
        .parse::<Tz>()
        .map_err(|_| format!("unknown time zone `{value}`, expected an IANA name like Europe/Paris"))
}
