//! Scoring service backed by a process-local table, used for offline play
//! and in tests.

use std::{
    collections::{HashMap, VecDeque},
    sync::atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use shared::{
    domain::{DieFace, IdentityCode},
    error::ServiceFailure,
    protocol::{ChancesPayload, LoginPayload},
};
use tokio::sync::Mutex;
use tracing::debug;

use crate::ScoringService;

pub const UNKNOWN_CODE_MESSAGE: &str = "번호를 다시 확인해주세요.";
pub const NO_CHANCES_MESSAGE: &str = "남은 기회가 없어요.";
/// Most recent rolls kept by [`InMemoryScoringService::roll_log`].
pub const ROLL_LOG_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub name: String,
    pub chances: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollRecord {
    pub code: IdentityCode,
    pub roll_result: DieFace,
}

#[derive(Default)]
pub struct InMemoryScoringService {
    players: Mutex<HashMap<String, Player>>,
    roll_log: Mutex<VecDeque<RollRecord>>,
    transport_down: AtomicBool,
}

impl InMemoryScoringService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_demo_players() -> Self {
        Self::new()
            .with_player("user123", "Kim", 3)
            .with_player("user456", "Lee", 0)
            .with_player("user789", "Park", 1)
    }

    pub fn with_player(
        mut self,
        code: impl Into<String>,
        name: impl Into<String>,
        chances: u32,
    ) -> Self {
        self.players.get_mut().insert(
            code.into(),
            Player {
                name: name.into(),
                chances,
            },
        );
        self
    }

    /// Makes every call fail as if the service were unreachable.
    pub fn fail_transport(&self, down: bool) {
        self.transport_down.store(down, Ordering::SeqCst);
    }

    pub async fn player(&self, code: &str) -> Option<Player> {
        self.players.lock().await.get(code).cloned()
    }

    /// The last [`ROLL_LOG_CAPACITY`] accepted rolls, oldest first.
    pub async fn roll_log(&self) -> Vec<RollRecord> {
        self.roll_log.lock().await.iter().cloned().collect()
    }

    fn ensure_reachable(&self) -> Result<(), ServiceFailure> {
        if self.transport_down.load(Ordering::SeqCst) {
            return Err(ServiceFailure::Transport(
                "in-memory scoring service is offline".into(),
            ));
        }
        Ok(())
    }
}

fn unknown_code() -> ServiceFailure {
    ServiceFailure::Rejected(UNKNOWN_CODE_MESSAGE.into())
}

#[async_trait]
impl ScoringService for InMemoryScoringService {
    async fn login(&self, code: &IdentityCode) -> Result<LoginPayload, ServiceFailure> {
        self.ensure_reachable()?;
        let players = self.players.lock().await;
        let player = players.get(code.as_str()).ok_or_else(unknown_code)?;
        Ok(LoginPayload {
            name: player.name.clone(),
            chances: player.chances,
        })
    }

    async fn roll_dice(
        &self,
        code: &IdentityCode,
        roll_result: DieFace,
    ) -> Result<ChancesPayload, ServiceFailure> {
        self.ensure_reachable()?;
        let mut players = self.players.lock().await;
        let player = players.get_mut(code.as_str()).ok_or_else(unknown_code)?;
        if player.chances == 0 {
            return Err(ServiceFailure::Rejected(NO_CHANCES_MESSAGE.into()));
        }
        player.chances -= 1;
        let chances = player.chances;
        drop(players);

        debug!(%code, face = roll_result.value(), chances, "recorded roll");
        let mut log = self.roll_log.lock().await;
        if log.len() == ROLL_LOG_CAPACITY {
            log.pop_front();
        }
        log.push_back(RollRecord {
            code: code.clone(),
            roll_result,
        });
        Ok(ChancesPayload { chances })
    }

    async fn add_chance(&self, code: &IdentityCode) -> Result<ChancesPayload, ServiceFailure> {
        self.ensure_reachable()?;
        let mut players = self.players.lock().await;
        let player = players.get_mut(code.as_str()).ok_or_else(unknown_code)?;
        player.chances = player.chances.saturating_add(1);
        Ok(ChancesPayload {
            chances: player.chances,
        })
    }
}

#[cfg(test)]
#[path = "tests/in_memory_tests.rs"]
mod tests;
