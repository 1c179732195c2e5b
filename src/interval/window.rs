use std::fmt;
use std::str::FromStr;

use jiff::civil::Date;
use thiserror::Error;

#[derive(Error, Debug)]
#[error("{0}")]
pub struct WindowError(pub String);

/// An inclusive range of days, the unit of one AEMET request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    start: Date,
    end: Date,
}

impl DateWindow {
    pub fn new(start: Date, end: Date) -> Result<DateWindow, WindowError> {
        if end < start {
            return Err(WindowError(format!(
                "Window end {} is before window start {}",
                end, start
            )));
        }
        Ok(DateWindow { start, end })
    }

    /// All the days of months `first..=last` of the given year.
    pub fn months(year: i16, first: i8, last: i8) -> Result<DateWindow, WindowError> {
        let start = Date::new(year, first, 1)
            .map_err(|e| WindowError(format!("Invalid start month {year}-{first}: {e}")))?;
        let end = Date::new(year, last, 1)
            .map_err(|e| WindowError(format!("Invalid end month {year}-{last}: {e}")))?
            .last_of_month();
        DateWindow::new(start, end)
    }

    pub fn start(&self) -> Date {
        self.start
    }

    pub fn end(&self) -> Date {
        self.end
    }

    /// Start of the first day, in the format the AEMET path expects.
    pub fn start_param(&self) -> String {
        format!("{}T00:00:00UTC", self.start)
    }

    /// End of the last day, in the format the AEMET path expects.
    pub fn end_param(&self) -> String {
        format!("{}T23:59:59UTC", self.end)
    }

    pub fn contains(&self, date: Date) -> bool {
        date >= self.start && date <= self.end
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.start, self.end)
    }
}

/// How one calendar year is cut into request windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowSplit {
    /// Jan-Jun and Jul-Dec
    #[default]
    HalfYear,
    FullYear,
}

impl WindowSplit {
    pub fn windows(&self, year: i16) -> Result<Vec<DateWindow>, WindowError> {
        let months: &[(i8, i8)] = match self {
            WindowSplit::HalfYear => &[(1, 6), (7, 12)],
            WindowSplit::FullYear => &[(1, 12)],
        };
        months
            .iter()
            .map(|&(first, last)| DateWindow::months(year, first, last))
            .collect()
    }
}

impl fmt::Display for WindowSplit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowSplit::HalfYear => write!(f, "half-year"),
            WindowSplit::FullYear => write!(f, "full-year"),
        }
    }
}

impl FromStr for WindowSplit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "half-year" | "6m" => Ok(WindowSplit::HalfYear),
            "full-year" | "12m" => Ok(WindowSplit::FullYear),
            _ => Err(format!("Failed to parse {s} as WindowSplit")),
        }
    }
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;

    use super::*;

    #[test]
    fn half_year_windows() -> Result<(), WindowError> {
        let ws = WindowSplit::HalfYear.windows(2015)?;
        assert_eq!(ws.len(), 2);
        assert_eq!(ws[0].start(), date(2015, 1, 1));
        assert_eq!(ws[0].end(), date(2015, 6, 30));
        assert_eq!(ws[1].start(), date(2015, 7, 1));
        assert_eq!(ws[1].end(), date(2015, 12, 31));
        Ok(())
    }

    #[test]
    fn windows_cover_the_year_without_overlap() -> Result<(), WindowError> {
        for split in [WindowSplit::HalfYear, WindowSplit::FullYear] {
            let ws = split.windows(2016)?;
            let mut day = date(2016, 1, 1);
            while day.year() == 2016 {
                let n = ws.iter().filter(|w| w.contains(day)).count();
                assert_eq!(n, 1, "{day} is in {n} windows for {split}");
                day = day.tomorrow().unwrap();
            }
        }
        Ok(())
    }

    #[test]
    fn url_params() -> Result<(), WindowError> {
        let w = DateWindow::months(2015, 1, 6)?;
        assert_eq!(w.start_param(), "2015-01-01T00:00:00UTC");
        assert_eq!(w.end_param(), "2015-06-30T23:59:59UTC");
        assert_eq!(w.to_string(), "2015-01-01/2015-06-30");
        Ok(())
    }

    #[test]
    fn reject_inverted_window() {
        assert!(DateWindow::new(date(2015, 2, 1), date(2015, 1, 1)).is_err());
        assert!(DateWindow::months(2015, 13, 12).is_err());
    }

    #[test]
    fn parse_split() {
        assert_eq!("half-year".parse::<WindowSplit>(), Ok(WindowSplit::HalfYear));
        assert_eq!("Full-Year".parse::<WindowSplit>(), Ok(WindowSplit::FullYear));
        assert!("quarter".parse::<WindowSplit>().is_err());
    }
}
