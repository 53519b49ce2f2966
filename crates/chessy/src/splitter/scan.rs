//! Game-boundary scanner for PGN archive text.
//!
//! A PGN game is a block of `[Tag "Value"]` header lines followed by
//! movetext ending in a result token (`1-0`, `0-1`, `1/2-1/2`, `*`).
//! Games are separated by blank lines that follow the result token; the
//! blank line between a game's headers and its movetext does NOT end the
//! game, which is why the scanner tracks whether a result has been seen.

/// The four legal game-termination markers.
const RESULT_TOKENS: [&str; 4] = ["1-0", "0-1", "1/2-1/2", "*"];

/// Returns true if `line` is movetext whose final token terminates a game.
fn ends_with_result(line: &str) -> bool {
    if line.trim_start().starts_with('[') {
        return false;
    }
    line.split_whitespace()
        .next_back()
        .is_some_and(|token| RESULT_TOKENS.contains(&token))
}

/// Lazily split archive text into raw per-game blocks.
///
/// Each yielded block keeps its original header and movetext lines
/// (trailing blank separator lines trimmed). Order is the file order.
pub fn split_games(text: &str) -> impl Iterator<Item = String> + '_ {
    GameScanner {
        lines: text.lines(),
        done: false,
    }
}

struct GameScanner<'a> {
    lines: std::str::Lines<'a>,
    done: bool,
}

impl Iterator for GameScanner<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.done {
            return None;
        }

        let mut block: Vec<&str> = Vec::new();
        let mut saw_result = false;

        for line in self.lines.by_ref() {
            if line.trim().is_empty() {
                if saw_result {
                    return Some(block.join("\n"));
                }
                // Header/movetext separator inside a game; skip leading blanks
                if !block.is_empty() {
                    block.push("");
                }
                continue;
            }

            block.push(line);
            if ends_with_result(line) {
                saw_result = true;
            }
        }

        self.done = true;
        if block.is_empty() {
            None
        } else {
            Some(block.join("\n"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_GAMES: &str = "\
[Event \"Rapid\"]
[White \"Anand\"]
[Black \"Carlsen\"]
[Result \"1-0\"]

1. e4 e5 2. Nf3 1-0

[Event \"Rapid\"]
[White \"Carlsen\"]
[Black \"Anand\"]
[Result \"1/2-1/2\"]

1. d4 d5 1/2-1/2
";

    #[test]
    fn test_splits_on_blank_line_after_result() {
        let games: Vec<String> = split_games(TWO_GAMES).collect();
        assert_eq!(games.len(), 2);
        assert!(games[0].starts_with("[Event \"Rapid\"]"));
        assert!(games[0].ends_with("1-0"));
        assert!(games[1].ends_with("1/2-1/2"));
    }

    #[test]
    fn test_header_movetext_blank_line_does_not_split() {
        let games: Vec<String> = split_games(TWO_GAMES).collect();
        // Each game retains its internal blank separator
        assert!(games[0].contains("\n\n1. e4"));
    }

    #[test]
    fn test_unterminated_game_yields_trailing_block() {
        let text = "[Event \"x\"]\n\n1. e4 e5";
        let games: Vec<String> = split_games(text).collect();
        assert_eq!(games.len(), 1);
    }

    #[test]
    fn test_result_inside_header_does_not_terminate() {
        let text = "[Result \"1-0\"]\n[White \"A\"]\n\n1. e4 1-0\n\n[Event \"next\"]\n\n1. d4 *";
        let games: Vec<String> = split_games(text).collect();
        assert_eq!(games.len(), 2);
    }

    #[test]
    fn test_asterisk_result_and_multiline_movetext() {
        let text = "[Event \"adjourned\"]\n\n1. e4 e5\n2. Nf3 Nc6\n*\n\n[Event \"b\"]\n\n1. c4 0-1";
        let games: Vec<String> = split_games(text).collect();
        assert_eq!(games.len(), 2);
        assert!(games[0].ends_with('*'));
    }

    #[test]
    fn test_empty_input_yields_nothing() {
        assert_eq!(split_games("").count(), 0);
        assert_eq!(split_games("\n\n\n").count(), 0);
    }
}
