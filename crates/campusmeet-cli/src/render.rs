//! Output rendering for expanded occurrences.

use campusmeet_core::{Meeting, MeetingId, Occurrence};
use serde::Serialize;

use crate::config::OutputSettings;

/// JSON output for an expansion.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput<'a> {
    pub meeting_id: MeetingId,
    pub title: &'a str,
    pub count: usize,
    pub occurrences: &'a [Occurrence],
}

/// Formats occurrences for the terminal or as JSON.
#[derive(Debug, Clone)]
pub struct OccurrenceFormatter {
    options: OutputSettings,
}

impl OccurrenceFormatter {
    /// Creates a formatter with the given output settings.
    pub fn new(options: OutputSettings) -> Self {
        Self { options }
    }

    /// Creates a formatter with default output settings.
    pub fn with_defaults() -> Self {
        Self::new(OutputSettings::default())
    }

    /// Formats one occurrence as a single line.
    pub fn format_line(&self, occurrence: &Occurrence) -> String {
        let date = occurrence.effective_start.date();
        let mut line = format!(
            "{}  {}-{}  {}",
            date.format(&self.options.date_format),
            occurrence.effective_start.format(&self.options.time_format),
            occurrence.effective_end.format(&self.options.time_format),
            occurrence.effective_location,
        );
        if let Some(room) = &occurrence.effective_room {
            line.push_str(&format!(", room {room}"));
        }
        if date != occurrence.original_date {
            line.push_str(&format!(
                "  (moved from {})",
                occurrence.original_date.format(&self.options.date_format)
            ));
        } else if occurrence.is_overridden {
            line.push_str("  (changed)");
        }
        line
    }

    /// Formats a titled table of occurrences, without a trailing newline.
    pub fn format_table(&self, meeting: &Meeting, occurrences: &[Occurrence]) -> String {
        let mut lines = vec![format!("{} (meeting {})", meeting.title, meeting.id)];
        if occurrences.is_empty() {
            lines.push(format!("  {}", self.options.no_occurrence_text));
        }
        lines.extend(
            occurrences
                .iter()
                .map(|occurrence| format!("  {}", self.format_line(occurrence))),
        );
        lines.join("\n")
    }

    /// Builds the JSON output structure.
    pub fn format_json<'a>(
        &self,
        meeting: &'a Meeting,
        occurrences: &'a [Occurrence],
    ) -> JsonOutput<'a> {
        JsonOutput {
            meeting_id: meeting.id,
            title: &meeting.title,
            count: occurrences.len(),
            occurrences,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campusmeet_core::{
        DateWindow, MeetingException, OccurrenceOverride, RecurrenceRule, expand,
    };
    use chrono::{NaiveDate, NaiveTime};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn film_club() -> Meeting {
        Meeting::new(
            7,
            2,
            "Film Club",
            "Student Union",
            date(2024, 3, 4),
            time(19, 0),
            time(21, 30),
        )
        .with_recurrence(
            RecurrenceRule::weekly()
                .with_weekdays(["MO"])
                .with_count(4)
                .with_exception(MeetingException::new(date(2024, 3, 11)))
                .with_override(
                    OccurrenceOverride::new(date(2024, 3, 18))
                        .with_times(
                            date(2024, 3, 19).and_time(time(19, 0)),
                            date(2024, 3, 19).and_time(time(21, 0)),
                        )
                        .with_room("Cinema 2"),
                )
                .with_override(
                    OccurrenceOverride::new(date(2024, 3, 25)).with_location("Library"),
                ),
        )
    }

    fn occurrences(meeting: &Meeting) -> Vec<Occurrence> {
        let window = DateWindow::new(date(2024, 3, 1), date(2024, 3, 31)).unwrap();
        expand(meeting, Some(window)).unwrap().collect()
    }

    #[test]
    fn table() {
        let meeting = film_club();
        let output = OccurrenceFormatter::with_defaults()
            .format_table(&meeting, &occurrences(&meeting));
        insta::assert_snapshot!(output, @r###"
        Film Club (meeting 7)
          Mon 2024-03-04  19:00-21:30  Student Union
          Tue 2024-03-19  19:00-21:00  Student Union, room Cinema 2  (moved from Mon 2024-03-18)
          Mon 2024-03-25  19:00-21:30  Library  (changed)
        "###);
    }

    #[test]
    fn empty_table_uses_configured_text() {
        let meeting = film_club();
        let options = OutputSettings {
            no_occurrence_text: "Nothing scheduled".to_string(),
            ..Default::default()
        };
        let output = OccurrenceFormatter::new(options).format_table(&meeting, &[]);
        assert_eq!(output, "Film Club (meeting 7)\n  Nothing scheduled");
    }

    #[test]
    fn custom_formats() {
        let meeting = film_club();
        let options = OutputSettings {
            date_format: "%d/%m".to_string(),
            time_format: "%I:%M%P".to_string(),
            ..Default::default()
        };
        let formatter = OccurrenceFormatter::new(options);
        let first = &occurrences(&meeting)[0];
        assert_eq!(
            formatter.format_line(first),
            "04/03  07:00pm-09:30pm  Student Union"
        );
    }

    #[test]
    fn json_output() {
        let meeting = film_club();
        let occurrences = occurrences(&meeting);
        let output = OccurrenceFormatter::with_defaults().format_json(&meeting, &occurrences);
        insta::assert_json_snapshot!(output, {
            ".occurrences" => "[occurrences]",
        }, @r###"
        {
          "meeting_id": 7,
          "title": "Film Club",
          "count": 3,
          "occurrences": "[occurrences]"
        }
        "###);
    }
}
