//! Judge rotation and game length.

use std::collections::HashMap;

use crate::types::{Player, PlayerId};

/// Players who take turns, in join order.
pub fn turn_order(players: &HashMap<PlayerId, Player>) -> Vec<PlayerId> {
    let mut seated: Vec<&Player> = players.values().filter(|p| p.in_rotation()).collect();
    seated.sort_by(|a, b| a.seat.cmp(&b.seat).then_with(|| a.id.cmp(&b.id)));
    seated.into_iter().map(|p| p.id.clone()).collect()
}

/// The player after `previous` in `order`, wrapping around.
///
/// A judge missing from the order (should not happen once a game runs)
/// hands over to the first seat.
pub fn next_judge(order: &[PlayerId], previous: &str) -> Option<PlayerId> {
    if order.is_empty() {
        return None;
    }
    let next = match order.iter().position(|id| id == previous) {
        Some(idx) => (idx + 1) % order.len(),
        None => 0,
    };
    Some(order[next].clone())
}

/// Every player judges `rounds_per_player` times.
pub fn total_rounds(rounds_per_player: u32, player_count: usize) -> u32 {
    rounds_per_player.saturating_mul(player_count as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PlayerStatus;

    fn order(ids: &[&str]) -> Vec<PlayerId> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_next_judge_wraps() {
        let o = order(&["p1", "p2", "p3"]);
        assert_eq!(next_judge(&o, "p1").as_deref(), Some("p2"));
        assert_eq!(next_judge(&o, "p2").as_deref(), Some("p3"));
        assert_eq!(next_judge(&o, "p3").as_deref(), Some("p1"));
    }

    #[test]
    fn test_next_judge_unknown_previous_starts_over() {
        let o = order(&["p1", "p2", "p3"]);
        assert_eq!(next_judge(&o, "ghost").as_deref(), Some("p1"));
        assert_eq!(next_judge(&[], "p1"), None);
    }

    #[test]
    fn test_full_cycle_visits_everyone_once() {
        let o = order(&["a", "b", "c", "d"]);
        let mut judge = o[0].clone();
        let mut seen = vec![judge.clone()];
        for _ in 1..o.len() {
            judge = next_judge(&o, &judge).unwrap();
            seen.push(judge.clone());
        }
        assert_eq!(seen, o);
        assert_eq!(next_judge(&o, &judge).unwrap(), o[0]);
    }

    #[test]
    fn test_turn_order_by_seat_skips_spectators() {
        let mut players = HashMap::new();
        for (id, seat, status) in [
            ("late", 2, PlayerStatus::Playing),
            ("first", 0, PlayerStatus::Disconnected),
            ("watcher", 1, PlayerStatus::Spectating),
            ("second", 1, PlayerStatus::Playing),
        ] {
            players.insert(
                id.to_string(),
                Player {
                    id: id.to_string(),
                    display_name: id.to_string(),
                    status,
                    is_host: false,
                    seat,
                    score: 0,
                    hand: vec![],
                },
            );
        }

        assert_eq!(turn_order(&players), order(&["first", "second", "late"]));
    }

    #[test]
    fn test_total_rounds() {
        assert_eq!(total_rounds(1, 3), 3);
        assert_eq!(total_rounds(2, 5), 10);
    }
}
