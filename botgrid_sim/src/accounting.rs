//! Command cost used for par scoring.
//!
//! This is a line-oriented substring scan over the raw script, not a
//! tokenizer. Scoring compares the result against each level's par, so the
//! matching rules below are part of the external contract: call text inside
//! string literals still counts, and anything after the first `--` on a line
//! does not.
//!
//! Every occurrence on a line is billed, so `bot.turn_left() bot.turn_left()`
//! costs 2. Scorers that bill at most one call per line will see lower costs
//! for scripts that pack several calls onto one line.

/// Line comment marker of the script language.
pub const COMMENT_MARKER: &str = "--";

/// Billable actuator calls, matched literally including the parentheses.
pub const BILLABLE_CALLS: [&str; 6] = [
    "move_forward()",
    "move_backward()",
    "turn_left()",
    "turn_right()",
    "can_move()",
    "can_move_back()",
];

pub fn count_commands(script: &str) -> usize {
    script.split('\n').map(count_line).sum()
}

fn count_line(line: &str) -> usize {
    let comment_at = line.find(COMMENT_MARKER);
    BILLABLE_CALLS
        .iter()
        .flat_map(|call| line.match_indices(call))
        .filter(|(position, _)| comment_at.map_or(true, |comment| comment > *position))
        .count()
}

#[cfg(test)]
mod tests {
    use super::count_commands;

    #[test]
    fn trailing_comment_hides_later_calls() {
        assert_eq!(count_commands("bot.move_forward() -- bot.turn_left()"), 1);
    }

    #[test]
    fn every_call_on_a_line_counts() {
        let script = "bot.move_forward(); bot.move_forward(); bot.move_forward(); \
                      bot.turn_right(); bot.move_forward()";
        assert_eq!(count_commands(script), 5);
    }

    #[test]
    fn can_move_does_not_match_can_move_back() {
        assert_eq!(count_commands("if bot.can_move_back() then end"), 1);
        assert_eq!(count_commands("if bot.can_move() then end"), 1);
    }

    #[test]
    fn earlier_comment_excludes_the_whole_line() {
        let script = "-- plan: bot.turn_left()\n\
                      x = 1 -- then bot.move_forward()\n\
                      bot.turn_right()";
        assert_eq!(count_commands(script), 1);
    }

    #[test]
    fn calls_inside_strings_still_count() {
        assert_eq!(count_commands("local s = \"bot.turn_left()\""), 1);
    }

    #[test]
    fn packed_lines_bill_each_call() {
        let script = "fwd(2) bot.turn_right() fwd(2) bot.turn_left() fwd(2) bot.turn_left()";
        assert_eq!(count_commands(script), 3);
    }

    #[test]
    fn loops_are_billed_once_per_written_call() {
        let script = "for i = 1, 10 do\n  bot.move_forward()\nend\nbot:turn_left()\n";
        assert_eq!(count_commands(script), 2);
    }
}
