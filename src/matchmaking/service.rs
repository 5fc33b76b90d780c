//! Lobby service - owns the forming rounds and launches full ones

use bytes::Bytes;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::game::constants::LOBBY_TICK;
use crate::game::sprites::SpriteSet;
use crate::game::{RoundRegistry, RoundRunner, RoundSettings};

use super::pool::{FormingRound, JoinError, JoinReceipt, LobbyPool, PendingPlayer};

const COMMAND_CAPACITY: usize = 64;

enum LobbyCommand {
    Join {
        player: PendingPlayer,
        reply: oneshot::Sender<Result<JoinReceipt, JoinError>>,
    },
    Stats {
        reply: oneshot::Sender<LobbyStats>,
    },
}

/// Lobby occupancy for the status endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LobbyStats {
    pub open_rounds: usize,
    pub waiting_players: usize,
}

/// Handle to the lobby task
#[derive(Clone)]
pub struct LobbyService {
    commands: mpsc::Sender<LobbyCommand>,
}

impl LobbyService {
    /// Start the lobby task
    pub fn spawn(
        settings: RoundSettings,
        registry: Arc<RoundRegistry>,
        sprites: Arc<SpriteSet>,
    ) -> (Self, JoinHandle<()>) {
        let (commands, rx) = mpsc::channel(COMMAND_CAPACITY);
        let coordinator = LobbyCoordinator {
            pool: LobbyPool::new(settings),
            registry,
            sprites,
        };
        let handle = tokio::spawn(coordinator.run(rx));
        (Self { commands }, handle)
    }

    /// Seat a named player in a forming round
    pub async fn join(&self, player: PendingPlayer) -> Result<JoinReceipt, JoinError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(LobbyCommand::Join { player, reply })
            .await
            .map_err(|_| JoinError::Unavailable)?;
        rx.await.map_err(|_| JoinError::Unavailable)?
    }

    pub async fn stats(&self) -> LobbyStats {
        let (reply, rx) = oneshot::channel();
        if self.commands.send(LobbyCommand::Stats { reply }).await.is_err() {
            return LobbyStats::default();
        }
        rx.await.unwrap_or_default()
    }
}

struct LobbyCoordinator {
    pool: LobbyPool,
    registry: Arc<RoundRegistry>,
    sprites: Arc<SpriteSet>,
}

impl LobbyCoordinator {
    async fn run(mut self, mut commands: mpsc::Receiver<LobbyCommand>) {
        let mut ticker = interval(LOBBY_TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                _ = ticker.tick() => self.tick(),
            }
        }
        info!("Lobby stopped");
    }

    fn handle(&mut self, command: LobbyCommand) {
        match command {
            LobbyCommand::Join { player, reply } => {
                let name = player.name.clone();
                let result = match self.pool.join(player, Instant::now()) {
                    Ok((receipt, promoted)) => {
                        info!(
                            player = %name,
                            round_id = %receipt.round_id,
                            seat = receipt.seat,
                            "Player joined lobby"
                        );
                        if let Some(round) = promoted {
                            self.launch(round);
                        }
                        Ok(receipt)
                    }
                    Err(err) => {
                        warn!(player = %name, error = %err, "Join refused");
                        Err(err)
                    }
                };
                let _ = reply.send(result);
            }
            LobbyCommand::Stats { reply } => {
                let _ = reply.send(LobbyStats {
                    open_rounds: self.pool.len(),
                    waiting_players: self.pool.waiting_players(),
                });
            }
        }
    }

    fn tick(&mut self) {
        let report = self.pool.tick(Instant::now());

        for round_id in report.abandoned {
            info!(round_id = %round_id, "Forming round abandoned");
        }

        for reminder in report.reminders {
            let text = Bytes::from(format!(
                "Waiting {} seconds for other players to join\r\n",
                reminder.seconds_left
            ));
            for connection in reminder.players.iter().filter_map(|p| p.connection()) {
                if connection.send_notice(text.clone()).is_err() {
                    debug!(round_id = %reminder.round_id, peer = connection.peer(), "Waiting player gone");
                }
            }
        }

        for round in report.promoted {
            self.launch(round);
        }
    }

    fn launch(&self, forming: FormingRound) {
        let seed = rand::random::<u64>();
        let round = Arc::new(forming.into_round(self.pool.settings(), seed));
        self.registry.insert(Arc::clone(&round));

        let runner = RoundRunner::new(round, Arc::clone(&self.sprites), Arc::clone(&self.registry));
        tokio::spawn(runner.run());
    }
}
