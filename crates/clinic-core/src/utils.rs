//! 通用工具函数

use chrono::{Months, NaiveDate};

/// 允许的最早出生日期（含）
pub const EARLIEST_BIRTH_DATE: (i32, u32, u32) = (1880, 1, 1);

/// 去掉养老保险号中的所有非数字字符
pub fn normalize_pension_number(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// 出生日期允许区间 `[1880-01-01, today + 1 年)`
pub fn birth_date_window(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let (y, m, d) = EARLIEST_BIRTH_DATE;
    let lower = NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN);
    let upper = today
        .checked_add_months(Months::new(12))
        .unwrap_or(NaiveDate::MAX);
    (lower, upper)
}

/// 判断出生日期是否落在允许区间内
pub fn is_valid_birth_date(date: NaiveDate, today: NaiveDate) -> bool {
    let (lower, upper) = birth_date_window(today);
    lower <= date && date < upper
}

/// 解析表单中的出生日期，格式 `YYYY-MM-DD`
pub fn parse_birth_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}
