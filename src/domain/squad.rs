//! Squad capacity bookkeeping for a team.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Team squad is full")]
pub struct SquadFull;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Squad {
    pub current_player_count: i32,
    pub max_players: i32,
    pub is_squad_full: bool,
}

impl Squad {
    /// Refuses new players once the captain (or the count) has closed the squad.
    pub fn ensure_open(&self) -> Result<(), SquadFull> {
        if self.is_squad_full || self.current_player_count >= self.max_players {
            Err(SquadFull)
        } else {
            Ok(())
        }
    }

    /// Add one player; the squad closes itself when it reaches `max_players`.
    pub fn admit(&mut self) -> Result<(), SquadFull> {
        self.ensure_open()?;
        self.current_player_count += 1;
        if self.current_player_count >= self.max_players {
            self.is_squad_full = true;
        }
        Ok(())
    }
}
