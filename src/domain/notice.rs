use chrono::{DateTime, Datelike, Days, NaiveDate, TimeZone, Utc};
use serde::Serialize;

use super::DateComparison;

/// 返却予定日の表示形式（日/月/年、ゼロ埋め、4桁年）
pub const EXPIRATION_DATE_FORMAT: &str = "%d/%m/%Y";

/// 返却予定日の何日前に予告通知を送るか
pub const DUE_SOON_DAYS: u64 = 3;

/// 延滞通知を送る日（毎月1日と15日）
pub const OVERDUE_NOTICE_DAYS_OF_MONTH: [u32; 2] = [1, 15];

/// 通知の種類（バケット）
///
/// 種類ごとに選択述語（比較演算子と対象日）と文面テンプレートが決まる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    /// 延滞中
    Overdue,
    /// 3日後に返却期限
    DueInThreeDays,
    /// 本日が返却期限
    DueToday,
}

impl NoticeKind {
    /// 1回の実行で処理する順序
    pub const RUN_ORDER: [NoticeKind; 3] = [
        NoticeKind::Overdue,
        NoticeKind::DueInThreeDays,
        NoticeKind::DueToday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NoticeKind::Overdue => "overdue",
            NoticeKind::DueInThreeDays => "due_in_three_days",
            NoticeKind::DueToday => "due_today",
        }
    }

    /// 選択に使う比較演算子
    pub fn comparison(&self) -> DateComparison {
        match self {
            NoticeKind::Overdue => DateComparison::Before,
            NoticeKind::DueInThreeDays | NoticeKind::DueToday => DateComparison::Equal,
        }
    }

    /// 基準日から選択対象日を求める
    pub fn target_date(&self, today: NaiveDate) -> NaiveDate {
        match self {
            NoticeKind::Overdue | NoticeKind::DueToday => today,
            // NaiveDateの上限付近以外では失敗しない
            NoticeKind::DueInThreeDays => today
                .checked_add_days(Days::new(DUE_SOON_DAYS))
                .unwrap_or(NaiveDate::MAX),
        }
    }

    /// このバケットを基準日に処理すべきか
    ///
    /// ビジネスルール: 延滞通知は毎月1日と15日のみ。他のバケットは毎回。
    pub fn is_scheduled_on(&self, today: NaiveDate) -> bool {
        match self {
            NoticeKind::Overdue => OVERDUE_NOTICE_DAYS_OF_MONTH.contains(&today.day()),
            NoticeKind::DueInThreeDays | NoticeKind::DueToday => true,
        }
    }
}

/// テンプレートに埋め込む値
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticeFields {
    pub name: String,
    pub email_addr: String,
    pub book_title: String,
    /// `EXPIRATION_DATE_FORMAT`で整形済みの返却予定日
    pub expiration_date: String,
    pub days_late: i64,
}

/// 送信する通知（宛先と本文）
///
/// 貸出ごとに組み立てられ、送信後は破棄される。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub recipient: String,
    pub body: String,
}

/// 時刻を図書館のタイムゾーンでの暦日に変換する
///
/// 基準日・選択・表示はすべてこの暦日で揃える。
pub fn local_date<Tz: TimeZone>(instant: DateTime<Utc>, timezone: &Tz) -> NaiveDate {
    instant.with_timezone(timezone).date_naive()
}

/// 返却予定日を日/月/年で整形する
pub fn format_expiration_date(date: NaiveDate) -> String {
    date.format(EXPIRATION_DATE_FORMAT).to_string()
}

/// 延滞日数（基準日 − 返却予定日）
///
/// 延滞バケット以外では負またはゼロになりうる。
pub fn days_late(today: NaiveDate, expected_return: NaiveDate) -> i64 {
    (today - expected_return).num_days()
}

/// 通知本文を組み立てる
pub fn render(kind: NoticeKind, fields: &NoticeFields) -> String {
    match kind {
        NoticeKind::Overdue => format!(
            "Dear {name},\n\
             \n\
             Our records show that \"{title}\", due back on {date}, is now {days} day(s) overdue.\n\
             Please return it to the library as soon as possible.\n\
             \n\
             This notice was sent to {email}.\n",
            name = fields.name,
            title = fields.book_title,
            date = fields.expiration_date,
            days = fields.days_late,
            email = fields.email_addr,
        ),
        NoticeKind::DueInThreeDays => format!(
            "Dear {name},\n\
             \n\
             This is a reminder that \"{title}\" is due back on {date}, in three days.\n\
             \n\
             This notice was sent to {email}.\n",
            name = fields.name,
            title = fields.book_title,
            date = fields.expiration_date,
            email = fields.email_addr,
        ),
        NoticeKind::DueToday => format!(
            "Dear {name},\n\
             \n\
             \"{title}\" is due back today, {date}.\n\
             \n\
             This notice was sent to {email}.\n",
            name = fields.name,
            title = fields.book_title,
            date = fields.expiration_date,
            email = fields.email_addr,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn fields() -> NoticeFields {
        NoticeFields {
            name: "Ana".to_string(),
            email_addr: "ana@x.com".to_string(),
            book_title: "Dune".to_string(),
            expiration_date: "01/01/2024".to_string(),
            days_late: 4,
        }
    }

    #[test]
    fn test_format_expiration_date_is_zero_padded() {
        assert_eq!(format_expiration_date(date(2024, 3, 7)), "07/03/2024");
        assert_eq!(format_expiration_date(date(987, 12, 25)), "25/12/0987");
    }

    #[test]
    fn test_local_date_follows_library_timezone() {
        let evening_in_sao_paulo = Utc.with_ymd_and_hms(2024, 3, 15, 1, 0, 0).unwrap();
        assert_eq!(
            local_date(evening_in_sao_paulo, &chrono_tz::America::Sao_Paulo),
            date(2024, 3, 14)
        );
        assert_eq!(local_date(evening_in_sao_paulo, &chrono_tz::UTC), date(2024, 3, 15));
    }

    #[test]
    fn test_days_late() {
        assert_eq!(days_late(date(2024, 1, 5), date(2024, 1, 1)), 4);
        assert_eq!(days_late(date(2024, 3, 1), date(2024, 2, 28)), 2);
        assert_eq!(days_late(date(2024, 1, 5), date(2024, 1, 8)), -3);
    }

    #[test]
    fn test_target_dates() {
        let today = date(2024, 2, 27);
        assert_eq!(NoticeKind::Overdue.target_date(today), today);
        assert_eq!(NoticeKind::DueToday.target_date(today), today);
        assert_eq!(NoticeKind::DueInThreeDays.target_date(today), date(2024, 3, 1));
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(NoticeKind::Overdue.comparison(), DateComparison::Before);
        assert_eq!(NoticeKind::DueInThreeDays.comparison(), DateComparison::Equal);
        assert_eq!(NoticeKind::DueToday.comparison(), DateComparison::Equal);
    }

    #[test]
    fn test_overdue_scheduled_only_on_first_and_fifteenth() {
        for day in 1..=31 {
            let today = date(2024, 1, day);
            let expected = day == 1 || day == 15;
            assert_eq!(NoticeKind::Overdue.is_scheduled_on(today), expected, "day {}", day);
            assert!(NoticeKind::DueInThreeDays.is_scheduled_on(today));
            assert!(NoticeKind::DueToday.is_scheduled_on(today));
        }
    }

    #[test]
    fn test_render_overdue_includes_days_late() {
        let body = render(NoticeKind::Overdue, &fields());
        assert!(body.contains("Ana"));
        assert!(body.contains("ana@x.com"));
        assert!(body.contains("\"Dune\""));
        assert!(body.contains("01/01/2024"));
        assert!(body.contains("4 day(s) overdue"));
    }

    #[test]
    fn test_render_reminders_omit_days_late() {
        for kind in [NoticeKind::DueInThreeDays, NoticeKind::DueToday] {
            let body = render(kind, &fields());
            assert!(body.contains("Ana"));
            assert!(body.contains("ana@x.com"));
            assert!(body.contains("\"Dune\""));
            assert!(body.contains("01/01/2024"));
            assert!(!body.contains("overdue"));
        }
    }
}
