//! Round resolution rules
//!
//! Rock beats Scissor, Scissor beats Paper, Paper beats Rock; equal moves
//! draw. The asymmetric stake pricing in `stakes` exists because of this
//! cycle - the cheaper move is the riskier one.

use serde::{Deserialize, Serialize};

use super::Move;

/// Outcome of a resolved round from player A's perspective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundOutcome {
    PlayerA,
    PlayerB,
    Draw,
}

/// Resolve a round given both cleartext moves
pub fn resolve(move_a: Move, move_b: Move) -> RoundOutcome {
    use Move::*;
    match (move_a, move_b) {
        (Rock, Scissor) | (Scissor, Paper) | (Paper, Rock) => RoundOutcome::PlayerA,
        (Scissor, Rock) | (Paper, Scissor) | (Rock, Paper) => RoundOutcome::PlayerB,
        (Rock, Rock) | (Scissor, Scissor) | (Paper, Paper) => RoundOutcome::Draw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_nine_pairings() {
        use Move::*;
        let cases = [
            (Rock, Rock, RoundOutcome::Draw),
            (Rock, Scissor, RoundOutcome::PlayerA),
            (Rock, Paper, RoundOutcome::PlayerB),
            (Scissor, Rock, RoundOutcome::PlayerB),
            (Scissor, Scissor, RoundOutcome::Draw),
            (Scissor, Paper, RoundOutcome::PlayerA),
            (Paper, Rock, RoundOutcome::PlayerA),
            (Paper, Scissor, RoundOutcome::PlayerB),
            (Paper, Paper, RoundOutcome::Draw),
        ];
        for (a, b, expected) in cases {
            assert_eq!(resolve(a, b), expected, "{:?} vs {:?}", a, b);
        }
    }

    #[test]
    fn test_resolution_is_antisymmetric() {
        for a in Move::ALL {
            for b in Move::ALL {
                let forward = resolve(a, b);
                let reverse = resolve(b, a);
                match forward {
                    RoundOutcome::Draw => assert_eq!(reverse, RoundOutcome::Draw),
                    RoundOutcome::PlayerA => assert_eq!(reverse, RoundOutcome::PlayerB),
                    RoundOutcome::PlayerB => assert_eq!(reverse, RoundOutcome::PlayerA),
                }
            }
        }
    }
}
