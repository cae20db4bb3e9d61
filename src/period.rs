use chrono::{Datelike, NaiveDate};
use strum::Display;
use tracing::warn;

const TITLE_COLOR: &str = "\x1b[34m";
const RESET: &str = "\x1b[0m";

const FR_MONTHS: [&str; 12] = [
    "janvier",
    "février",
    "mars",
    "avril",
    "mai",
    "juin",
    "juillet",
    "août",
    "septembre",
    "octobre",
    "novembre",
    "décembre",
];

/// How much of the date needs repeating to describe a period unambiguously.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum PeriodKind {
    #[strum(serialize = "single day")]
    SingleDay,
    #[strum(serialize = "same month")]
    SameMonth,
    #[strum(serialize = "cross month")]
    CrossMonth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Colored,
    Plain,
}

impl Period {
    /// Earliest and latest of the given dates. `None` when no value parses.
    pub fn from_dates<I, S>(dates: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parsed = dates.into_iter().filter_map(|raw| {
            let raw = raw.as_ref();
            let date = parse_date(raw);
            if date.is_none() {
                warn!(date = raw, "ignoring unparseable race date");
            }
            date
        });

        let first = parsed.next()?;
        let (start, end) = parsed.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
        Some(Self { start, end })
    }

    pub fn kind(&self) -> PeriodKind {
        if self.start == self.end {
            PeriodKind::SingleDay
        } else if self.start.year() == self.end.year() && self.start.month() == self.end.month() {
            PeriodKind::SameMonth
        } else {
            PeriodKind::CrossMonth
        }
    }

    /// The date part alone, e.g. `10-11 Jan 25`.
    pub fn label(&self) -> String {
        match self.kind() {
            PeriodKind::SingleDay => self.start.format("%d %b %y").to_string(),
            PeriodKind::SameMonth => format!(
                "{}-{}",
                self.start.format("%d"),
                self.end.format("%d %b %y")
            ),
            PeriodKind::CrossMonth => format!(
                "{} - {}",
                self.start.format("%d %b"),
                self.end.format("%d %b %Y")
            ),
        }
    }

    pub fn describe(&self, title: &str, style: Style) -> String {
        let title = style_title(title, style);
        match self.kind() {
            PeriodKind::SingleDay => format!("{} {}", self.label(), title),
            PeriodKind::SameMonth => format!("{} ➙ {}", self.label(), title),
            PeriodKind::CrossMonth => format!("{} ➞ {}", self.label(), title),
        }
    }
}

/// Period line for a race; degrades to the title alone without a period.
pub fn period_line(period: Option<&Period>, title: &str, style: Style) -> String {
    match period {
        Some(period) => period.describe(title, style),
        None => style_title(title, style),
    }
}

fn style_title(title: &str, style: Style) -> String {
    match style {
        Style::Colored => format!("{}{}{}", TITLE_COLOR, title, RESET),
        Style::Plain => title.to_string(),
    }
}

/// Accepts `YYYY-MM-DD`, or any longer value starting with one.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let head = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

/// Long French date, e.g. `19 octobre 2026`.
pub fn format_long_fr(date: NaiveDate) -> String {
    format!(
        "{} {} {}",
        date.day(),
        FR_MONTHS[date.month0() as usize],
        date.year()
    )
}
