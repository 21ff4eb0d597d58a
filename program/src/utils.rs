// Raffle Program - Utility Functions
use solana_program::{hash::hashv, native_token::LAMPORTS_PER_SOL};

/// Index of the winning entry for a delivered random word.
/// Modulo bias is accepted at this scale.
pub fn winner_index(random_word: u64, total_players: u64) -> u64 {
    if total_players == 0 {
        return 0;
    }
    random_word % total_players
}

/// Deterministic words the mock coordinator delivers for a request:
/// word `i` is the first 8 bytes of `hash(request_id, i)`.
pub fn mock_random_words(request_id: u64, num_words: u32) -> Vec<u64> {
    (0..num_words)
        .map(|i| {
            let digest = hashv(&[&request_id.to_le_bytes(), &i.to_le_bytes()]);
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&digest.to_bytes()[..8]);
            u64::from_le_bytes(bytes)
        })
        .collect()
}

/// Convert SOL to lamports
pub fn sol_to_lamports(sol: f64) -> u64 {
    (sol * LAMPORTS_PER_SOL as f64) as u64
}

/// Convert lamports to SOL (for display purposes)
pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_words_are_deterministic_and_distinct() {
        let first = mock_random_words(1, 2);
        assert_eq!(first, mock_random_words(1, 2));
        assert_eq!(first.len(), 2);
        assert_ne!(first[0], first[1]);
        assert_ne!(first[0], mock_random_words(2, 1)[0]);
    }

    #[test]
    fn zero_players_never_divides() {
        assert_eq!(winner_index(42, 0), 0);
        assert_eq!(winner_index(42, 5), 2);
    }

    #[test]
    fn tenth_of_a_sol() {
        assert_eq!(sol_to_lamports(0.1), 100_000_000);
        assert_eq!(lamports_to_sol(250_000_000), 0.25);
    }
}
