use std::str::FromStr;

use chrono::{DateTime, Local, Utc};
use cron::Schedule;
use tracing::warn;

use curator_core::{CuratorError, CuratorResult};

/// CRON表达式解析和调度工具
///
/// 接受crontab风格的表达式：5段（分 时 日 月 周），6段在末尾追加秒，7段再追加年。
/// 星期字段按crontab习惯解释（0和7为周日），解析前转换为星期名称。
/// 表达式按本地时区求值，结果以UTC保存。
pub struct CronScheduler {
    schedule: Schedule,
}

impl CronScheduler {
    pub fn new(cron_expr: &str) -> CuratorResult<Self> {
        let normalized = normalize(cron_expr)?;
        let schedule = Schedule::from_str(&normalized).map_err(|e| CuratorError::InvalidCron {
            expr: cron_expr.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self { schedule })
    }

    /// 严格晚于 `from` 的下一次执行时间
    pub fn next_execution_time(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let local_from = from.with_timezone(&Local);
        self.schedule
            .after(&local_from)
            .next()
            .map(|next| next.with_timezone(&Utc))
    }

    /// 获取从指定时间开始的多个执行时间
    pub fn upcoming_times(&self, from: DateTime<Utc>, count: usize) -> Vec<DateTime<Utc>> {
        let local_from = from.with_timezone(&Local);
        self.schedule
            .after(&local_from)
            .take(count)
            .map(|next| next.with_timezone(&Utc))
            .collect()
    }

    /// 验证CRON表达式是否有效
    pub fn validate_cron_expression(cron_expr: &str) -> CuratorResult<()> {
        Self::new(cron_expr).map(|_| ())
    }
}

/// 计算下一次执行时间，表达式无效或没有后续时间时返回错误
pub fn next_run_time(cron_expr: &str, from: DateTime<Utc>) -> CuratorResult<DateTime<Utc>> {
    let scheduler = CronScheduler::new(cron_expr)?;
    scheduler.next_execution_time(from).ok_or_else(|| {
        warn!("CRON表达式 {} 没有后续执行时间", cron_expr);
        CuratorError::InvalidCron {
            expr: cron_expr.to_string(),
            message: "没有后续执行时间".to_string(),
        }
    })
}

const WEEKDAYS: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

/// 转换为 `cron` crate 的字段顺序：秒 分 时 日 月 周 [年]
fn normalize(cron_expr: &str) -> CuratorResult<String> {
    let fields: Vec<&str> = cron_expr.split_whitespace().collect();
    let (seconds, year) = match fields.len() {
        5 => ("0", None),
        6 => (fields[5], None),
        7 => (fields[5], Some(fields[6])),
        n => {
            return Err(invalid(cron_expr, format!("需要5到7个字段，实际为{n}个")));
        }
    };

    let day_of_week = translate_day_of_week(fields[4])
        .map_err(|message| invalid(cron_expr, message))?;
    let mut normalized = vec![
        seconds,
        fields[0],
        fields[1],
        fields[2],
        fields[3],
        day_of_week.as_str(),
    ];
    if let Some(year) = year {
        normalized.push(year);
    }
    Ok(normalized.join(" "))
}

/// crontab 的星期从0（周日）开始，`cron` crate 从1开始，统一展开为星期名称
fn translate_day_of_week(field: &str) -> Result<String, String> {
    if field == "*" || field == "?" {
        return Ok(field.to_string());
    }

    let mut days: Vec<usize> = Vec::new();
    for item in field.split(',') {
        let (base, step) = match item.split_once('/') {
            Some((base, step)) => {
                let step: usize = step
                    .parse()
                    .ok()
                    .filter(|s| *s > 0)
                    .ok_or_else(|| format!("无效的星期步长: {item}"))?;
                (base, Some(step))
            }
            None => (item, None),
        };

        let (start, end) = match base {
            "*" | "?" => (0, 6),
            _ => match base.split_once('-') {
                Some((start, end)) => (parse_weekday(start)?, parse_weekday(end)?),
                None => {
                    let start = parse_weekday(base)?;
                    (start, if step.is_some() { 6 } else { start })
                }
            },
        };
        if start > end {
            return Err(format!("无效的星期范围: {item}"));
        }

        for day in (start..=end).step_by(step.unwrap_or(1)) {
            let day = day % 7;
            if !days.contains(&day) {
                days.push(day);
            }
        }
    }

    days.sort_unstable();
    Ok(days
        .into_iter()
        .map(|day| WEEKDAYS[day])
        .collect::<Vec<_>>()
        .join(","))
}

fn parse_weekday(token: &str) -> Result<usize, String> {
    if let Ok(number) = token.parse::<usize>() {
        return if number <= 7 {
            Ok(number)
        } else {
            Err(format!("星期取值超出范围: {token}"))
        };
    }
    WEEKDAYS
        .iter()
        .position(|name| name.eq_ignore_ascii_case(token))
        .ok_or_else(|| format!("未知的星期: {token}"))
}

fn invalid(cron_expr: &str, message: String) -> CuratorError {
    CuratorError::InvalidCron {
        expr: cron_expr.to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Duration, Timelike, Weekday};

    #[test]
    fn test_five_field_expression() {
        let scheduler = CronScheduler::new("*/5 * * * *").unwrap();
        let now = Utc::now();
        let next = scheduler.next_execution_time(now).unwrap();
        assert!(next > now);
        assert!(next - now <= Duration::minutes(5));
        assert_eq!(next.second(), 0);
        assert_eq!(next.minute() % 5, 0);
    }

    #[test]
    fn test_six_field_expression_has_trailing_seconds() {
        let scheduler = CronScheduler::new("* * * * * 30").unwrap();
        let next = scheduler.next_execution_time(Utc::now()).unwrap();
        assert_eq!(next.second(), 30);
        assert_eq!(normalize("0 9 * * * 15").unwrap(), "15 0 9 * * *");
        assert_eq!(normalize("0 9 * * 1 0 2030").unwrap(), "0 0 9 * * MON 2030");
    }

    #[test]
    fn test_day_of_week_translation() {
        assert_eq!(normalize("0 9 * * 0").unwrap(), "0 0 9 * * SUN");
        assert_eq!(normalize("0 9 * * 7").unwrap(), "0 0 9 * * SUN");
        assert_eq!(
            normalize("* * * * 1-5").unwrap(),
            "0 * * * * MON,TUE,WED,THU,FRI"
        );
        assert_eq!(normalize("0 9 * * 5-7").unwrap(), "0 0 9 * * SUN,FRI,SAT");
        assert_eq!(normalize("0 9 * * sat,Sun").unwrap(), "0 0 9 * * SUN,SAT");
        assert_eq!(normalize("0 9 * * mon-wed").unwrap(), "0 0 9 * * MON,TUE,WED");
        assert_eq!(normalize("0 9 * * */2").unwrap(), "0 0 9 * * SUN,TUE,THU,SAT");
        assert_eq!(normalize("0 9 * * ?").unwrap(), "0 0 9 * * ?");
    }

    #[test]
    fn test_weekday_schedules_land_on_local_weekdays() {
        let now = Utc::now();
        let sunday = next_run_time("0 9 * * 0", now).unwrap().with_timezone(&Local);
        assert_eq!(sunday.weekday(), Weekday::Sun);
        assert_eq!(sunday.hour(), 9);

        let also_sunday = next_run_time("0 9 * * 7", now).unwrap().with_timezone(&Local);
        assert_eq!(also_sunday.weekday(), Weekday::Sun);

        let monday = next_run_time("0 9 * * 1", now).unwrap().with_timezone(&Local);
        assert_eq!(monday.weekday(), Weekday::Mon);

        let named = next_run_time("0 9 * * FRI", now).unwrap().with_timezone(&Local);
        assert_eq!(named.weekday(), Weekday::Fri);

        let workdays = CronScheduler::new("0 9 * * 1-5").unwrap().upcoming_times(now, 10);
        assert_eq!(workdays.len(), 10);
        assert!(workdays.iter().all(|t| !matches!(
            t.with_timezone(&Local).weekday(),
            Weekday::Sat | Weekday::Sun
        )));
    }

    #[test]
    fn test_next_is_strictly_after() {
        let scheduler = CronScheduler::new("* * * * *").unwrap();
        let from = Utc::now().with_nanosecond(0).unwrap().with_second(0).unwrap();
        let next = scheduler.next_execution_time(from).unwrap();
        assert_eq!(next, from + Duration::minutes(1));
    }

    #[test]
    fn test_upcoming_times_are_ordered() {
        let scheduler = CronScheduler::new("0 */6 * * *").unwrap();
        let times = scheduler.upcoming_times(Utc::now(), 3);
        assert_eq!(times.len(), 3);
        assert!(times[0] < times[1] && times[1] < times[2]);
    }

    #[test]
    fn test_invalid_expression() {
        let err = next_run_time("not a cron", Utc::now()).unwrap_err();
        assert!(matches!(err, CuratorError::InvalidCron { .. }));
        assert!(CronScheduler::validate_cron_expression("61 * * * *").is_err());
        assert!(CronScheduler::validate_cron_expression("0 9 * * 8").is_err());
        assert!(CronScheduler::validate_cron_expression("0 9 * * 5-1").is_err());
        assert!(CronScheduler::validate_cron_expression("0 9 * * funday").is_err());
        assert!(CronScheduler::validate_cron_expression("* * * *").is_err());
    }
}
