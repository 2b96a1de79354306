//! 字段校验

use chrono::NaiveDate;
use clinic_core::utils::{birth_date_window, is_valid_birth_date, parse_birth_date};
use clinic_core::{Field, FieldError, Patient};

/// 校验出生日期：可解析，且位于 `[1880-01-01, today + 1 年)`
///
/// 空值和无法解析的值同样视为超出范围。
pub fn validate_birth_date(raw: &str, today: NaiveDate) -> Result<NaiveDate, FieldError> {
    let (lower, upper) = birth_date_window(today);
    let out_of_range = || FieldError {
        field: Field::BirthDate,
        message: format!(
            "Birth date must be on or after {} and before {}",
            lower.format("%Y-%m-%d"),
            upper.format("%Y-%m-%d")
        ),
    };

    let date = parse_birth_date(raw).ok_or_else(out_of_range)?;
    if !is_valid_birth_date(date, today) {
        return Err(out_of_range());
    }
    Ok(date)
}

/// 校验养老保险号未被其他患者占用
///
/// `existing` 是按规范化号码查到的患者；编辑时 `editing_id` 为当前患者，
/// 号码属于自己时放行。
pub fn ensure_pension_available(
    pension_number: &str,
    existing: Option<&Patient>,
    editing_id: Option<i64>,
) -> Result<(), FieldError> {
    match existing {
        Some(owner) if Some(owner.id) != editing_id => Err(duplicate_pension(pension_number)),
        _ => Ok(()),
    }
}

pub(crate) fn duplicate_pension(pension_number: &str) -> FieldError {
    FieldError {
        field: Field::PensionNumber,
        message: format!(
            "A patient with pension number {} already exists",
            pension_number
        ),
    }
}
