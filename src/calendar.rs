//! A股交易日历
//!
//! 支持范围内：周六、周日以及当年公告的休市日为非交易日，其余为交易日。
//! 范围内但没有休市表的年份只按周末判断。范围外一律返回 [`TradingDay::Unknown`]，
//! 调用方需要自行上报，不能猜测。

use crate::errors::{BriefError, Result};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike, Weekday};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

/// 三值的交易日判断结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradingDay {
    Trading,
    Closed,
    Unknown,
}

impl TradingDay {
    pub fn is_trading(self) -> bool {
        self == TradingDay::Trading
    }
}

#[derive(Debug, Clone)]
pub struct TradingCalendar {
    start: NaiveDate,
    end: NaiveDate,
    holidays: HashMap<i32, HashSet<NaiveDate>>,
}

// (月, 日) 起止区间，闭区间，整理自上交所/深交所休市安排公告
type ClosedRange = ((u32, u32), (u32, u32));

const CLOSED_2022: &[ClosedRange] = &[((12, 31), (12, 31))];

const CLOSED_2023: &[ClosedRange] = &[
    ((1, 1), (1, 2)),   // 元旦
    ((1, 21), (1, 27)), // 春节
    ((4, 5), (4, 5)),   // 清明
    ((4, 29), (5, 3)),  // 劳动节
    ((6, 22), (6, 24)), // 端午
    ((9, 29), (10, 6)), // 中秋、国庆
];

const CLOSED_2024: &[ClosedRange] = &[
    ((1, 1), (1, 1)),
    ((2, 9), (2, 17)),
    ((4, 4), (4, 6)),
    ((5, 1), (5, 5)),
    ((6, 10), (6, 10)),
    ((9, 15), (9, 17)),
    ((10, 1), (10, 7)),
];

const CLOSED_2025: &[ClosedRange] = &[
    ((1, 1), (1, 1)),
    ((1, 28), (2, 4)),
    ((4, 4), (4, 6)),
    ((5, 1), (5, 5)),
    ((5, 31), (6, 2)),
    ((10, 1), (10, 8)),
];

const CLOSED_2026: &[ClosedRange] = &[
    ((1, 1), (1, 3)),
    ((2, 15), (2, 23)),
    ((4, 4), (4, 6)),
    ((5, 1), (5, 5)),
    ((6, 19), (6, 21)),
    ((9, 25), (9, 27)),
    ((10, 1), (10, 7)),
];

static A_SHARE: Lazy<TradingCalendar> = Lazy::new(|| {
    let start = NaiveDate::from_ymd_opt(2022, 11, 1).unwrap_or_default();
    let end = NaiveDate::from_ymd_opt(2026, 12, 31).unwrap_or_default();
    let tables: [(i32, &[ClosedRange]); 5] = [
        (2022, CLOSED_2022),
        (2023, CLOSED_2023),
        (2024, CLOSED_2024),
        (2025, CLOSED_2025),
        (2026, CLOSED_2026),
    ];

    let mut calendar = TradingCalendar::new(start, end);
    for (year, ranges) in tables {
        calendar = calendar.with_holidays(expand_ranges(year, ranges));
    }
    calendar
});

fn expand_ranges(year: i32, ranges: &[ClosedRange]) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    for &((from_m, from_d), (to_m, to_d)) in ranges {
        let (Some(from), Some(to)) = (
            NaiveDate::from_ymd_opt(year, from_m, from_d),
            NaiveDate::from_ymd_opt(year, to_m, to_d),
        ) else {
            continue;
        };
        let mut day = from;
        while day <= to {
            dates.push(day);
            day += Duration::days(1);
        }
    }
    dates
}

impl TradingCalendar {
    /// 创建只按周末判断的日历，支持范围为 `[start, end]`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: start.min(end),
            end: end.max(start),
            holidays: HashMap::new(),
        }
    }

    /// 追加休市日，按年份归档
    pub fn with_holidays(mut self, dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        for date in dates {
            self.holidays.entry(date.year()).or_default().insert(date);
        }
        self
    }

    /// 内置的A股日历（2022-11-01 至 2026-12-31）
    pub fn a_share() -> &'static TradingCalendar {
        &A_SHARE
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn is_trading_day(&self, date: NaiveDate) -> TradingDay {
        if date < self.start || date > self.end {
            return TradingDay::Unknown;
        }

        if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            return TradingDay::Closed;
        }

        let closed = self
            .holidays
            .get(&date.year())
            .map(|days| days.contains(&date))
            .unwrap_or(false);

        if closed {
            TradingDay::Closed
        } else {
            TradingDay::Trading
        }
    }

    /// 严格早于 `date` 的最近一个交易日
    pub fn previous_trading_day(&self, date: NaiveDate) -> Result<NaiveDate> {
        let mut current = date;
        loop {
            current = current
                .pred_opt()
                .ok_or(BriefError::CalendarExhausted(date))?;
            match self.is_trading_day(current) {
                TradingDay::Trading => return Ok(current),
                TradingDay::Closed => continue,
                TradingDay::Unknown => return Err(BriefError::CalendarExhausted(date)),
            }
        }
    }

    /// `date` 本身是交易日则返回它，否则回退到上一个交易日
    pub fn latest_trading_day_on_or_before(&self, date: NaiveDate) -> Result<NaiveDate> {
        match self.is_trading_day(date) {
            TradingDay::Trading => Ok(date),
            TradingDay::Closed => self.previous_trading_day(date),
            TradingDay::Unknown => Err(BriefError::CalendarUnknown(date)),
        }
    }

    /// 计算内容对应的基准交易日
    ///
    /// 未指定日期或指定的就是今天时，`now` 的小时数早于 `cutoff_hour`
    /// 则以前一天为基准，否则以今天为基准；指定历史日期时直接使用该日期。
    /// 基准日不是交易日时回退到上一个交易日。
    pub fn adjusted_reference_day(
        &self,
        now: NaiveDateTime,
        requested: Option<NaiveDate>,
        cutoff_hour: u32,
    ) -> Result<NaiveDate> {
        let today = now.date();
        let by_clock = || {
            if now.hour() < cutoff_hour {
                today.pred_opt().unwrap_or(today)
            } else {
                today
            }
        };

        let base = match requested {
            None => by_clock(),
            Some(date) if date == today => by_clock(),
            Some(date) => date,
        };

        self.latest_trading_day_on_or_before(base)
    }

    /// `[from, to]` 内的所有交易日，升序
    pub fn trading_days(&self, from: NaiveDate, to: NaiveDate) -> impl Iterator<Item = NaiveDate> + '_ {
        let first = from.max(self.start);
        let last = to.min(self.end);
        first
            .iter_days()
            .take_while(move |day| *day <= last)
            .filter(move |day| self.is_trading_day(*day).is_trading())
    }

    pub fn count_trading_days(&self, from: NaiveDate, to: NaiveDate) -> usize {
        if to < from {
            return 0;
        }
        self.trading_days(from, to).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn at(date: NaiveDate, hour: u32) -> NaiveDateTime {
        date.and_hms_opt(hour, 0, 0).unwrap()
    }

    #[test]
    fn weekends_are_never_trading_days() {
        let cal = TradingCalendar::a_share();
        for day in cal.start().iter_days().take_while(|day| *day <= cal.end()) {
            if matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
                assert_eq!(cal.is_trading_day(day), TradingDay::Closed, "{}", day);
            }
        }
    }

    #[test]
    fn holidays_and_out_of_range() {
        let cal = TradingCalendar::a_share();
        assert_eq!(cal.is_trading_day(d(2024, 2, 9)), TradingDay::Closed);
        assert_eq!(cal.is_trading_day(d(2023, 10, 6)), TradingDay::Closed);
        assert_eq!(cal.is_trading_day(d(2024, 2, 19)), TradingDay::Trading);
        assert_eq!(cal.is_trading_day(d(2022, 10, 31)), TradingDay::Unknown);
        assert_eq!(cal.is_trading_day(d(2027, 1, 4)), TradingDay::Unknown);
    }

    #[test]
    fn year_without_table_uses_weekdays_only() {
        let cal = TradingCalendar::new(d(2030, 1, 1), d(2030, 12, 31));
        assert_eq!(cal.is_trading_day(d(2030, 1, 1)), TradingDay::Trading);
        assert_eq!(cal.is_trading_day(d(2030, 1, 5)), TradingDay::Closed);
    }

    #[test]
    fn previous_trading_day_skips_spring_festival() {
        let cal = TradingCalendar::a_share();
        assert_eq!(cal.previous_trading_day(d(2024, 2, 19)).unwrap(), d(2024, 2, 8));
        assert_eq!(cal.previous_trading_day(d(2024, 2, 8)).unwrap(), d(2024, 2, 7));
    }

    #[test]
    fn previous_trading_day_never_returns_closed_day() {
        let cal = TradingCalendar::a_share();
        let mut day = d(2025, 10, 9);
        for _ in 0..300 {
            let prev = cal.previous_trading_day(day).unwrap();
            assert!(prev < day);
            assert!(cal.is_trading_day(prev).is_trading());
            day = prev;
        }
    }

    #[test]
    fn previous_trading_day_exhausts_at_range_start() {
        let cal = TradingCalendar::a_share();
        // 2022-11-01 是周二，也是范围内第一天
        let err = cal.previous_trading_day(d(2022, 11, 1)).unwrap_err();
        assert!(matches!(err, BriefError::CalendarExhausted(_)));
    }

    #[test]
    fn sunday_morning_rolls_back_to_friday() {
        let cal = TradingCalendar::a_share();
        let sunday = d(2024, 3, 10);
        let day = cal.adjusted_reference_day(at(sunday, 9), None, 10).unwrap();
        assert_eq!(day, d(2024, 3, 8));

        let day = cal.adjusted_reference_day(at(sunday, 9), Some(sunday), 10).unwrap();
        assert_eq!(day, d(2024, 3, 8));
    }

    #[test]
    fn cutoff_hour_decides_today_or_yesterday() {
        let cal = TradingCalendar::a_share();
        let wednesday = d(2024, 3, 13);
        assert_eq!(cal.adjusted_reference_day(at(wednesday, 9), None, 10).unwrap(), d(2024, 3, 12));
        assert_eq!(cal.adjusted_reference_day(at(wednesday, 10), None, 10).unwrap(), wednesday);
    }

    #[test]
    fn past_dates_ignore_time_of_day() {
        let cal = TradingCalendar::a_share();
        let now = at(d(2024, 3, 13), 8);
        assert_eq!(cal.adjusted_reference_day(now, Some(d(2024, 3, 11)), 10).unwrap(), d(2024, 3, 11));
        // 2024-10-05 国庆休市
        assert_eq!(cal.adjusted_reference_day(now, Some(d(2024, 10, 5)), 10).unwrap(), d(2024, 9, 30));
    }

    #[test]
    fn out_of_range_reference_day_escalates() {
        let cal = TradingCalendar::a_share();
        let err = cal
            .adjusted_reference_day(at(d(2027, 3, 3), 12), None, 10)
            .unwrap_err();
        assert!(matches!(err, BriefError::CalendarUnknown(_)));
    }

    #[test]
    fn counts_trading_days_inclusive() {
        let cal = TradingCalendar::a_share();
        // 2022-11-02 (周三) 起的第25个交易日是 2022-12-06
        assert_eq!(cal.count_trading_days(d(2022, 11, 2), d(2022, 12, 6)), 25);
        assert_eq!(cal.count_trading_days(d(2022, 11, 2), d(2022, 11, 1)), 0);
    }
}
