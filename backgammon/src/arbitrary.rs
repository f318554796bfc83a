use quickcheck::Arbitrary;

use crate::{CheckerPositions, Player, NUM_POINTS};

impl Arbitrary for Player {
    fn arbitrary(g: &mut quickcheck::Gen) -> Self {
        if bool::arbitrary(g) {
            Player::One
        } else {
            Player::Two
        }
    }
}

/// Usually one owner per point, as on a real board, but occasionally mixed.
impl Arbitrary for CheckerPositions {
    fn arbitrary(g: &mut quickcheck::Gen) -> Self {
        let mut positions = CheckerPositions::empty();
        for point in 1..=NUM_POINTS {
            let count = (u8::arbitrary(g) % 16) as usize;
            let owner = Player::arbitrary(g);
            let tokens = positions.point_mut(point);
            for _ in 0..count {
                if u8::arbitrary(g) % 20 == 0 {
                    tokens.push(owner.opponent());
                } else {
                    tokens.push(owner);
                }
            }
        }
        positions
    }
}
