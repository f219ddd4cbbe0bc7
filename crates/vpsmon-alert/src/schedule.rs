use std::str::FromStr;

/// Check cadence: either every `N` minutes, or at fixed minute-of-hour marks
/// (e.g. `"15,45"` fires at :15 and :45 of every hour).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckSchedule {
    Every(u32),
    Marks(Vec<u32>),
}

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("invalid check interval '{0}': expected minutes or a comma list of minute marks")]
    Invalid(String),
    #[error("minute mark {0} is out of range (0-59)")]
    MarkOutOfRange(u32),
    #[error("check interval must be between 1 and 60 minutes, got {0}")]
    IntervalOutOfRange(u32),
}

impl FromStr for CheckSchedule {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.contains(',') {
            let mut marks = s
                .split(',')
                .map(|m| {
                    m.trim()
                        .parse::<u32>()
                        .map_err(|_| ScheduleError::Invalid(s.to_string()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            if let Some(&bad) = marks.iter().find(|&&m| m > 59) {
                return Err(ScheduleError::MarkOutOfRange(bad));
            }
            marks.sort_unstable();
            marks.dedup();
            if marks.is_empty() {
                return Err(ScheduleError::Invalid(s.to_string()));
            }
            Ok(CheckSchedule::Marks(marks))
        } else {
            let minutes = s
                .trim()
                .parse::<u32>()
                .map_err(|_| ScheduleError::Invalid(s.to_string()))?;
            if minutes == 0 || minutes > 60 {
                return Err(ScheduleError::IntervalOutOfRange(minutes));
            }
            Ok(CheckSchedule::Every(minutes))
        }
    }
}

impl CheckSchedule {
    /// How far back a run scans for new spikes.
    ///
    /// For a single interval this is the interval itself. For minute marks it
    /// is the maximum gap between consecutive marks, including the wrap from
    /// the last mark of one hour to the first mark of the next, so a spike
    /// seen by one run is never re-scanned by the following run.
    pub fn lookback_minutes(&self) -> u32 {
        match self {
            Self::Every(minutes) => *minutes,
            Self::Marks(marks) => {
                let mut max_gap = 0;
                for pair in marks.windows(2) {
                    max_gap = max_gap.max(pair[1] - pair[0]);
                }
                if let (Some(first), Some(last)) = (marks.first(), marks.last()) {
                    max_gap = max_gap.max(60 - last + first);
                }
                max_gap
            }
        }
    }

    /// Whether a run fires at this minute of the hour.
    pub fn is_due(&self, minute: u32) -> bool {
        match self {
            Self::Every(60) => minute == 0,
            Self::Every(interval) => minute % interval == 0,
            Self::Marks(marks) => marks.binary_search(&minute).is_ok(),
        }
    }

    /// Minutes from `minute` of the current hour until the next run.
    ///
    /// Single interval `N`: the smallest multiple of `N` strictly greater
    /// than the current minute, wrapping into the next hour when needed.
    /// Mark list: the smallest mark greater than the current minute, else the
    /// first mark of the next hour.
    pub fn minutes_until_next(&self, minute: u32) -> u32 {
        match self {
            Self::Every(interval) => (minute / interval + 1) * interval - minute,
            Self::Marks(marks) => match marks.iter().find(|&&m| m > minute) {
                Some(next) => next - minute,
                None => (60 - minute) + marks[0],
            },
        }
    }
}
