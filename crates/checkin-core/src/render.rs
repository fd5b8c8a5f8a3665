//! Text shown in the channel: the weekly summary and short notices.

use std::fmt::Write as _;

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::attendance::WeekRecord;
use crate::clock::WeekContext;

/// Language of everything the bot posts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    /// Korean.
    #[default]
    Ko,
    /// English.
    En,
}

impl Locale {
    /// Full weekday name.
    pub fn weekday_name(self, weekday: Weekday) -> &'static str {
        match (self, weekday) {
            (Self::Ko, Weekday::Mon) => "월요일",
            (Self::Ko, Weekday::Tue) => "화요일",
            (Self::Ko, Weekday::Wed) => "수요일",
            (Self::Ko, Weekday::Thu) => "목요일",
            (Self::Ko, Weekday::Fri) => "금요일",
            (Self::Ko, Weekday::Sat) => "토요일",
            (Self::Ko, Weekday::Sun) => "일요일",
            (Self::En, Weekday::Mon) => "Monday",
            (Self::En, Weekday::Tue) => "Tuesday",
            (Self::En, Weekday::Wed) => "Wednesday",
            (Self::En, Weekday::Thu) => "Thursday",
            (Self::En, Weekday::Fri) => "Friday",
            (Self::En, Weekday::Sat) => "Saturday",
            (Self::En, Weekday::Sun) => "Sunday",
        }
    }

    fn header(self, ctx: &WeekContext) -> String {
        let day = self.weekday_name(ctx.weekday);
        match self {
            Self::Ko => format!("{}월 {}주차 {} 인증 기록", ctx.month, ctx.week_of_month, day),
            Self::En => format!(
                "{} week {} {} check-in log",
                month_name(ctx.month),
                ctx.week_of_month,
                day
            ),
        }
    }
}

fn month_name(month: u32) -> &'static str {
    const NAMES: [&str; 12] = [
        "January",
        "February",
        "March",
        "April",
        "May",
        "June",
        "July",
        "August",
        "September",
        "October",
        "November",
        "December",
    ];
    NAMES
        .get(month.saturating_sub(1) as usize)
        .copied()
        .unwrap_or("?")
}

/// Render the summary message for `record` as seen at `ctx`.
///
/// One header line, then `name : glyphs` per participant in record order.
/// Every line ends with a newline.
pub fn render(ctx: &WeekContext, record: &WeekRecord, locale: Locale) -> String {
    let mut text = locale.header(ctx);
    text.push('\n');
    for participant in record.participants() {
        let _ = writeln!(text, "{} : {}", participant.name, participant.days.glyphs());
    }
    text
}

/// Short user-facing replies posted in the event's thread.
#[derive(Clone, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Notice {
    SubmissionClosed,
    MissingLink,
    /// Carries the keyword that starts a week.
    NotStarted { start_command: String },
    UnknownParticipant,
    AlreadyCompleted,
    NoSlotToday,
    Deleted,
    NothingToDelete,
    /// Summary requested but this week has no record.
    NoRecord,
    PostFailed,
    DeleteFailed,
    CompletionFailed,
}

impl Notice {
    /// Text in `locale`.
    pub fn text(&self, locale: Locale) -> String {
        match locale {
            Locale::Ko => match self {
                Self::SubmissionClosed => "오늘 챌린지 인증 마감 되었습니다.".into(),
                Self::MissingLink => "인증이 실패했습니다. 쓰레드 링크를 포함해야 합니다.".into(),
                Self::NotStarted { start_command } => {
                    format!("챌린지가 아직 시작되지 않았습니다. '{start_command}'을 입력하세요.")
                }
                Self::UnknownParticipant => "참가자 이름을 확인해 주세요.".into(),
                Self::AlreadyCompleted => "오늘 인증을 이미 완료했습니다.".into(),
                Self::NoSlotToday => "오늘은 인증하는 날이 아닙니다.".into(),
                Self::Deleted => "현재 주차의 챌린지 기록이 삭제되었습니다.".into(),
                Self::NothingToDelete => "삭제할 챌린지 기록이 없습니다.".into(),
                Self::NoRecord => "현재 주차의 챌린지 기록이 없습니다.".into(),
                Self::PostFailed => "챌린지 메시지 생성 중 오류가 발생했습니다.".into(),
                Self::DeleteFailed => "챌린지 기록 삭제 중 오류가 발생했습니다.".into(),
                Self::CompletionFailed => "인증 처리 중 오류가 발생했습니다.".into(),
            },
            Locale::En => match self {
                Self::SubmissionClosed => "Check-ins are closed for today.".into(),
                Self::MissingLink => "Check-in failed: include a thread link.".into(),
                Self::NotStarted { start_command } => {
                    format!("The challenge has not started yet. Type '{start_command}'.")
                }
                Self::UnknownParticipant => "You are not on this week's participant list.".into(),
                Self::AlreadyCompleted => "You already checked in today.".into(),
                Self::NoSlotToday => "There is no check-in today.".into(),
                Self::Deleted => "This week's challenge record was deleted.".into(),
                Self::NothingToDelete => "There is no challenge record to delete.".into(),
                Self::NoRecord => "There is no challenge record for this week.".into(),
                Self::PostFailed => "Something went wrong while posting the challenge message.".into(),
                Self::DeleteFailed => "Something went wrong while deleting the challenge record.".into(),
                Self::CompletionFailed => "Something went wrong while recording your check-in.".into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::{DaySlot, SlotPolicy, WeekLength};
    use crate::clock::resolve;
    use chrono::{DateTime, Utc};
    use chrono_tz::Asia::Seoul;

    fn wednesday() -> WeekContext {
        let t = DateTime::parse_from_rfc3339("2024-09-11T03:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        resolve(t, Seoul)
    }

    fn kim_lee() -> WeekRecord {
        let mut record = WeekRecord::new(WeekLength::Business, ["Kim", "Lee"]);
        let slot = DaySlot::for_weekday(2, WeekLength::Business).unwrap();
        record.mark("Kim", slot, SlotPolicy::Today).unwrap();
        record
    }

    #[test]
    fn korean_summary() {
        let text = render(&wednesday(), &kim_lee(), Locale::Ko);
        assert_eq!(
            text,
            "9월 3주차 수요일 인증 기록\nKim : ❌❌✅❌❌\nLee : ❌❌❌❌❌\n"
        );
    }

    #[test]
    fn english_summary() {
        let text = render(&wednesday(), &kim_lee(), Locale::En);
        assert_eq!(
            text,
            "September week 3 Wednesday check-in log\nKim : ❌❌✅❌❌\nLee : ❌❌❌❌❌\n"
        );
    }

    #[test]
    fn render_is_deterministic() {
        let ctx = wednesday();
        let record = kim_lee();
        let a = render(&ctx, &record, Locale::Ko);
        let b = render(&ctx, &record, Locale::Ko);
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn empty_record_renders_header_only() {
        let record = WeekRecord::new(WeekLength::Business, Vec::<String>::new());
        let text = render(&wednesday(), &record, Locale::Ko);
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn full_week_shows_weekend_glyphs() {
        let record = WeekRecord::new(WeekLength::Full, ["Kim"]);
        let text = render(&wednesday(), &record, Locale::Ko);
        assert!(text.ends_with("Kim : ❌❌❌❌❌➖➖\n"));
    }

    #[test]
    fn not_started_mentions_start_command() {
        let notice = Notice::NotStarted {
            start_command: "챌린지 시작".into(),
        };
        assert!(notice.text(Locale::Ko).contains("'챌린지 시작'"));
    }
}
