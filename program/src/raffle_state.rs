use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{clock::UnixTimestamp, pubkey::Pubkey};

use crate::raffle_error::RaffleError;
use crate::state::AccountData;
use crate::vrf_state::CONSUMER_AUTHORITY_SEED;

/// Maximum number of entries a single round can hold
pub const MAX_PLAYERS: usize = 64;

/// Confirmations the coordinator should wait before answering
pub const REQUEST_CONFIRMATIONS: u16 = 3;

/// Random words requested per round
pub const NUM_WORDS: u32 = 1;

/// Status of a raffle
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RaffleState {
    /// Accepting entries
    Open,
    /// A randomness request is outstanding
    Calculating,
}

impl From<RaffleState> for u8 {
    fn from(state: RaffleState) -> Self {
        match state {
            RaffleState::Open => 0,
            RaffleState::Calculating => 1,
        }
    }
}

/// Raffle account data
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq)]
pub struct Raffle {
    /// Is the account initialized
    pub is_initialized: bool,
    /// Current lifecycle state
    pub state: RaffleState,
    /// Minimum lamports per entry
    pub entrance_fee: u64,
    /// Seconds that must pass between winner selections
    pub interval: u64,
    /// Time of the previous winner selection (or of initialization)
    pub last_timestamp: UnixTimestamp,
    /// Most recent winner, default key until the first round completes
    pub recent_winner: Pubkey,
    /// Program id of the VRF coordinator answering our requests
    pub vrf_coordinator: Pubkey,
    /// Subscription paying for randomness
    pub subscription_id: u64,
    /// Key hash selecting the coordinator's gas lane
    pub gas_lane: [u8; 32],
    /// Gas budget the coordinator may spend on the callback
    pub callback_gas_limit: u32,
    /// Outstanding request id, zero when none
    pub pending_request_id: u64,
    /// Entries for the current round, in order
    pub players: Vec<Pubkey>,
}

impl AccountData for Raffle {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl Raffle {
    /// Account size with room for `MAX_PLAYERS` entries.
    pub const LEN: usize = 1 + 1 + 8 + 8 + 8 + 32 + 32 + 8 + 32 + 4 + 8 + 4 + 32 * MAX_PLAYERS;

    pub fn new(
        vrf_coordinator: Pubkey,
        subscription_id: u64,
        gas_lane: [u8; 32],
        interval: u64,
        entrance_fee: u64,
        callback_gas_limit: u32,
        now: UnixTimestamp,
    ) -> Self {
        Self {
            is_initialized: true,
            state: RaffleState::Open,
            entrance_fee,
            interval,
            last_timestamp: now,
            recent_winner: Pubkey::default(),
            vrf_coordinator,
            subscription_id,
            gas_lane,
            callback_gas_limit,
            pending_request_id: 0,
            players: Vec::new(),
        }
    }

    /// True when every condition for drawing a winner holds:
    /// open, at least one player, a non-empty pot and the interval elapsed.
    pub fn check_upkeep(&self, now: UnixTimestamp, pot: u64) -> bool {
        let is_open = self.state == RaffleState::Open;
        let time_passed = now.saturating_sub(self.last_timestamp) > self.interval as i64;
        let has_players = !self.players.is_empty();
        let has_balance = pot > 0;
        is_open && time_passed && has_players && has_balance
    }

    pub fn player(&self, index: usize) -> Result<Pubkey, RaffleError> {
        self.players
            .get(index)
            .copied()
            .ok_or(RaffleError::PlayerIndexOutOfRange)
    }

    pub fn num_players(&self) -> usize {
        self.players.len()
    }

    pub fn has_pending_request(&self) -> bool {
        self.pending_request_id != 0
    }

    /// Picks the winner for a delivered random word.
    pub fn winner_for(&self, random_word: u64) -> Option<Pubkey> {
        if self.players.is_empty() {
            return None;
        }
        let index = crate::utils::winner_index(random_word, self.players.len() as u64);
        self.players.get(index as usize).copied()
    }
}

/// PDA the raffle program signs coordinator requests with.
pub fn find_consumer_authority(raffle: &Pubkey, program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[CONSUMER_AUTHORITY_SEED, raffle.as_ref()], program_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_raffle() -> Raffle {
        Raffle::new(Pubkey::new_unique(), 1, [7u8; 32], 30, 100, 500_000, 1_000)
    }

    #[test]
    fn full_raffle_fits_in_len() {
        let mut raffle = open_raffle();
        raffle.players = (0..MAX_PLAYERS).map(|_| Pubkey::new_unique()).collect();
        let bytes = borsh::to_vec(&raffle).unwrap();
        assert_eq!(bytes.len(), Raffle::LEN);

        let mut data = vec![0u8; Raffle::LEN];
        raffle.pack(&mut data).unwrap();
        assert_eq!(Raffle::unpack(&data).unwrap(), raffle);
    }

    #[test]
    fn unpack_ignores_trailing_capacity() {
        let mut raffle = open_raffle();
        raffle.players.push(Pubkey::new_unique());
        let mut data = vec![0u8; Raffle::LEN];
        raffle.pack(&mut data).unwrap();
        let unpacked = Raffle::unpack(&data).unwrap();
        assert_eq!(unpacked.players, raffle.players);
    }

    #[test]
    fn zeroed_account_is_not_initialized() {
        let data = vec![0u8; Raffle::LEN];
        assert!(Raffle::unpack_initialized(&data).is_none());
    }

    #[test]
    fn check_upkeep_needs_every_condition() {
        let mut raffle = open_raffle();
        raffle.players.push(Pubkey::new_unique());
        let later = raffle.last_timestamp + raffle.interval as i64 + 1;
        assert!(raffle.check_upkeep(later, 100));

        // interval must be strictly exceeded
        assert!(!raffle.check_upkeep(raffle.last_timestamp + raffle.interval as i64, 100));
        assert!(!raffle.check_upkeep(later, 0));

        let mut calculating = raffle.clone();
        calculating.state = RaffleState::Calculating;
        assert!(!calculating.check_upkeep(later, 100));

        let mut empty = raffle.clone();
        empty.players.clear();
        assert!(!empty.check_upkeep(later, 100));
    }

    #[test]
    fn winner_is_word_modulo_player_count() {
        let mut raffle = open_raffle();
        assert_eq!(raffle.winner_for(5), None);
        raffle.players = (0..4).map(|_| Pubkey::new_unique()).collect();
        assert_eq!(raffle.winner_for(5), Some(raffle.players[1]));
        assert_eq!(raffle.winner_for(u64::MAX), Some(raffle.players[3]));
        assert_eq!(raffle.player(4), Err(RaffleError::PlayerIndexOutOfRange));
    }
}
