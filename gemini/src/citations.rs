use std::sync::OnceLock;

use qtube_protocol::Citation;
use qtube_protocol::ParsedAnswer;
use regex_lite::Regex;

// Minutes take one or two digits, seconds exactly two. Values such as `[00:75]`
// are accepted as written; no range check is applied.
fn citation_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\[(\d{1,2}):(\d{2})\](?:[ \t]*-[ \t]*([^\n]*))?(?:\n|$)")
            .unwrap_or_else(|err| panic!("valid citation regex: {err}"))
    })
}

fn blank_run_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\n(?:[ \t]*\n){2,}")
            .unwrap_or_else(|err| panic!("valid blank line regex: {err}"))
    })
}

/// Splits a raw model answer into display text and timestamp citations.
///
/// Citations keep the order in which they appear in `raw`, not time order.
/// Every matched citation line is removed from the answer, runs of blank lines
/// left behind collapse to a single blank line, and the result is trimmed.
pub fn parse_answer(raw: &str) -> ParsedAnswer {
    let re = citation_regex();

    let mut timestamps = Vec::new();
    for captures in re.captures_iter(raw) {
        let (Some(minutes), Some(seconds)) = (captures.get(1), captures.get(2)) else {
            continue;
        };
        let (Ok(minutes), Ok(seconds)) = (
            minutes.as_str().parse::<u32>(),
            seconds.as_str().parse::<u32>(),
        ) else {
            continue;
        };
        let description = captures
            .get(3)
            .map(|m| m.as_str().trim())
            .unwrap_or_default();
        timestamps.push(Citation::new(minutes, seconds, description));
    }

    let stripped = re.replace_all(raw, "");
    let collapsed = blank_run_regex().replace_all(&stripped, "\n\n");

    ParsedAnswer {
        answer: collapsed.trim().to_string(),
        timestamps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn extracts_citations_in_order_and_cleans_answer() {
        let parsed = parse_answer("[01:23] - Intro\nSome text\n[00:05]\n");
        assert_eq!(
            parsed.timestamps,
            vec![
                Citation {
                    time: 83,
                    label: "01:23".to_string(),
                    description: "Intro".to_string(),
                },
                Citation {
                    time: 5,
                    label: "00:05".to_string(),
                    description: String::new(),
                },
            ]
        );
        assert_eq!(parsed.answer, "Some text");
        assert!(!parsed.answer.contains('['));
    }

    #[test]
    fn single_digit_minutes_are_padded() {
        let parsed = parse_answer("Summary.\n[3:07] - The demo\n");
        assert_eq!(parsed.timestamps[0].label, "03:07");
        assert_eq!(parsed.timestamps[0].time, 187);
        assert_eq!(parsed.answer, "Summary.");
    }

    #[test]
    fn out_of_range_seconds_are_accepted_as_written() {
        let parsed = parse_answer("[00:75] - Odd\n");
        assert_eq!(parsed.timestamps[0].time, 75);
        assert_eq!(parsed.timestamps[0].label, "00:75");
    }

    #[test]
    fn blank_line_runs_collapse_after_removal() {
        let raw = "First paragraph.\n\n[00:10] - a\n\n[00:20] - b\n\nSecond paragraph.";
        let parsed = parse_answer(raw);
        assert_eq!(parsed.answer, "First paragraph.\n\nSecond paragraph.");
        assert_eq!(parsed.timestamps.len(), 2);
    }

    #[test]
    fn inline_brackets_without_line_end_are_left_alone() {
        let parsed = parse_answer("See [01:00] for details.");
        assert!(parsed.timestamps.is_empty());
        assert_eq!(parsed.answer, "See [01:00] for details.");
    }

    #[test]
    fn answer_without_citations_is_trimmed() {
        let parsed = parse_answer("  \n  just text \n\n");
        assert_eq!(parsed.answer, "just text");
        assert!(parsed.timestamps.is_empty());
    }

    #[test]
    fn citations_keep_appearance_order_not_time_order() {
        let parsed = parse_answer("[05:00] - late\n[00:30] - early\n");
        let times: Vec<u32> = parsed.timestamps.iter().map(|c| c.time).collect();
        assert_eq!(times, vec![300, 30]);
    }
}
