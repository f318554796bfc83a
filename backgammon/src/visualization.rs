use crate::PositionArray;

/// Draws the board as text, the top half holding points 13-24 and the bottom
/// half points 12-1, as seen by `player_1`.
///
/// Each point shows its checker count, `O` for `player_1` and `X` for `player_2`.
pub fn visualize_positions(positions: &PositionArray) -> String {
    let cell = |point: usize| -> String {
        match positions.get(point) {
            0 => String::from(" . "),
            v if v > 0 => format!("{:>2}O", v),
            v => format!("{:>2}X", -v),
        }
    };
    let row = |points: &[usize]| -> String {
        let (left, right) = points.split_at(6);
        let left: String = left.iter().map(|&p| cell(p)).collect();
        let right: String = right.iter().map(|&p| cell(p)).collect();
        format!("│{}│ │{}│", left, right)
    };

    let top: Vec<usize> = (13..=24).collect();
    let bottom: Vec<usize> = (1..=12).rev().collect();
    let labels = |points: &[usize]| -> String {
        let (left, right) = points.split_at(6);
        let left: String = left.iter().map(|p| format!("{:>3}", p)).collect();
        let right: String = right.iter().map(|p| format!("{:>3}", p)).collect();
        format!(" {}   {} ", left, right)
    };

    let mut result = labels(&top);
    result += "\n╭──────────────────┬─┬──────────────────╮\n";
    result += &row(&top);
    result += "\n│                  │ │                  │\n";
    result += &row(&bottom);
    result += "\n╰──────────────────┴─┴──────────────────╯\n";
    result += &labels(&bottom);
    result
}
