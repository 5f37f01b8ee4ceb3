use super::domain::YearMonth;
use serde::Serialize;

/// Ordered run of consecutive reporting months, newest last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ReportingWindow {
    months: Vec<YearMonth>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WindowError {
    #[error("reporting window must contain at least one month")]
    Empty,
    #[error("reporting window months must be consecutive: {previous} is followed by {next}")]
    NotConsecutive { previous: YearMonth, next: YearMonth },
}

impl ReportingWindow {
    pub fn from_months(months: Vec<YearMonth>) -> Result<Self, WindowError> {
        if months.is_empty() {
            return Err(WindowError::Empty);
        }

        if let Some(pair) = months.windows(2).find(|pair| pair[0].next() != pair[1]) {
            return Err(WindowError::NotConsecutive {
                previous: pair[0],
                next: pair[1],
            });
        }

        Ok(Self { months })
    }

    /// Window of `len` months ending with (and including) `end`.
    pub fn trailing(end: YearMonth, len: usize) -> Result<Self, WindowError> {
        if len == 0 {
            return Err(WindowError::Empty);
        }
        let start = end.minus_months((len - 1) as u32);
        let months = std::iter::successors(Some(start), |month| Some(month.next()))
            .take(len)
            .collect();
        Ok(Self { months })
    }

    pub fn months(&self) -> &[YearMonth] {
        &self.months
    }

    pub fn len(&self) -> usize {
        self.months.len()
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }

    pub fn first(&self) -> YearMonth {
        self.months[0]
    }

    pub fn last(&self) -> YearMonth {
        self.months[self.months.len() - 1]
    }

    /// Position of `month` within the window, if covered.
    pub fn position(&self, month: YearMonth) -> Option<usize> {
        if month < self.first() || month > self.last() {
            return None;
        }
        let offset = (month.year() - self.first().year()) * 12 + month.month() as i32
            - self.first().month() as i32;
        usize::try_from(offset).ok()
    }

    pub fn contains(&self, month: YearMonth) -> bool {
        self.position(month).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ym(year: i32, month: u32) -> YearMonth {
        YearMonth::new(year, month).expect("valid month")
    }

    #[test]
    fn trailing_window_ends_with_requested_month() {
        let window = ReportingWindow::trailing(ym(2024, 2), 13).expect("window");
        assert_eq!(window.len(), 13);
        assert_eq!(window.first(), ym(2023, 2));
        assert_eq!(window.last(), ym(2024, 2));
    }

    #[test]
    fn rejects_gaps_and_empty_windows() {
        assert_eq!(
            ReportingWindow::from_months(Vec::new()),
            Err(WindowError::Empty)
        );
        let err = ReportingWindow::from_months(vec![ym(2024, 1), ym(2024, 3)])
            .expect_err("gap rejected");
        assert!(matches!(err, WindowError::NotConsecutive { .. }));
    }

    #[test]
    fn position_maps_months_to_indices() {
        let window = ReportingWindow::trailing(ym(2024, 3), 6).expect("window");
        assert_eq!(window.position(ym(2023, 10)), Some(0));
        assert_eq!(window.position(ym(2024, 1)), Some(3));
        assert_eq!(window.position(ym(2024, 3)), Some(5));
        assert_eq!(window.position(ym(2024, 4)), None);
        assert_eq!(window.position(ym(2023, 9)), None);
    }
}
