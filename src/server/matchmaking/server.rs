/// Matchmaking server actor.
///
/// Owns the queue and the ID counters. Accepted clients are appended to the
/// queue in arrival order; as soon as enough of them are queued a group is
/// formed, every member gets its handshake reply, and the new game is
/// published to the game session manager.
///
/// The actor's mailbox is the single serialization point of matchmaking:
/// `Accept` is answered with an `AtomicResponse`, so no other arrival is
/// processed while a group's replies are being written.
use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use actix::prelude::*;
use log::{debug, error, info, warn};
use tokio::io::AsyncWriteExt;

use super::messages::{Accept, GetQueueState, QueueSnapshot};
use super::types::{ClientId, Connection, GameId, IdAllocator, Session, SessionState};
use crate::frame::encode_handshake;
use crate::server::auth::CredentialChecker;
use crate::server::game_session::messages::PublishGame;
use crate::server::game_session::server::GameSessionManager;

/// Main matchmaking server actor.
pub struct Matchmaker {
    /// Sessions waiting for a game, in arrival order.
    queue: VecDeque<Session>,
    game_size: usize,
    checker: Arc<dyn CredentialChecker>,
    client_ids: IdAllocator,
    game_ids: IdAllocator,
    /// Address of the game session manager, where formed games are published.
    game_session_manager: Addr<GameSessionManager>,
}

/// Members of a group whose handshake replies are being written.
type Members = Vec<(ClientId, Connection)>;

/// Outcome of writing the handshake replies of one group.
enum Delivery {
    Delivered(Members),
    /// Writing to `failed` broke. `members` holds every other connection.
    Failed {
        failed: ClientId,
        error: io::Error,
        members: Members,
    },
}

impl Matchmaker {
    pub fn new(
        game_size: usize,
        checker: Arc<dyn CredentialChecker>,
        game_session_manager: Addr<GameSessionManager>,
    ) -> Self {
        Self {
            queue: VecDeque::new(),
            game_size,
            checker,
            client_ids: IdAllocator::new(),
            game_ids: IdAllocator::new(),
            game_session_manager,
        }
    }

    fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            queued: self
                .queue
                .iter()
                .filter(|s| s.state == SessionState::Queued)
                .map(|s| s.client_id)
                .collect(),
            next_client_id: self.client_ids.peek(),
            next_game_id: self.game_ids.peek(),
        }
    }

    /// Check the credential and queue a new session. Dropping `conn` on any
    /// failure closes the connection.
    fn admit(
        &mut self,
        conn: Connection,
        token: &[u8],
        peer: Option<SocketAddr>,
    ) -> Option<ClientId> {
        let remote = describe_peer(peer);
        if !self.checker.check(token) {
            warn!("[Matchmaking] Auth failed, closing connection from {}", remote);
            return None;
        }
        let Some(client_id) = self.client_ids.allocate() else {
            error!("[Matchmaking] Client ID space exhausted, refusing {}", remote);
            return None;
        };
        self.queue.push_back(Session::new(client_id, conn, peer));
        info!(
            "[Matchmaking] Client {} from {} queued ({} waiting)",
            client_id,
            remote,
            self.queue.len()
        );
        Some(client_id)
    }

    /// Collect queued sessions in arrival order until the game size is reached.
    /// On success the members are moved to `Pooled` and their connections are
    /// handed out for the handshake replies.
    fn try_form_game(&mut self) -> Option<(GameId, Members)> {
        let group: Vec<ClientId> = self
            .queue
            .iter()
            .filter(|s| s.state == SessionState::Queued)
            .take(self.game_size)
            .map(|s| s.client_id)
            .collect();
        if group.len() < self.game_size {
            debug!("[Matchmaking] Waiting for players: {}/{}", group.len(), self.game_size);
            return None;
        }
        let Some(game_id) = self.game_ids.allocate() else {
            error!("[Matchmaking] Game ID space exhausted, cannot group {:?}", group);
            return None;
        };

        let mut members = Vec::with_capacity(group.len());
        for session in self.queue.iter_mut().filter(|s| group.contains(&s.client_id)) {
            session.state = SessionState::Pooled;
            if let Some(conn) = session.conn.take() {
                members.push((session.client_id, conn));
            }
        }
        info!("[Matchmaking] Enough players for game {}: {:?}", game_id, group);
        Some((game_id, members))
    }

    fn finish_group(&mut self, game_id: GameId, delivery: Delivery) {
        match delivery {
            Delivery::Delivered(members) => {
                let member_ids: Vec<ClientId> = members.iter().map(|(id, _)| *id).collect();
                for session in self.queue.iter_mut().filter(|s| member_ids.contains(&s.client_id)) {
                    session.state = SessionState::InGame;
                }
                // Published before this actor yields, so the game is in the
                // registry ahead of any Register its members send.
                self.game_session_manager.do_send(PublishGame {
                    game_id,
                    members: member_ids.clone(),
                });
                self.queue.retain(|s| s.state != SessionState::InGame);
                actix::spawn(close_connections(members));
                info!("[Matchmaking] Game {} created with clients {:?}", game_id, member_ids);
            }
            Delivery::Failed { failed, error, members } => {
                let failed_peer = self
                    .queue
                    .iter()
                    .find(|s| s.client_id == failed)
                    .and_then(|s| s.peer);
                warn!(
                    "[Matchmaking] Reply to client {} at {} failed ({}), aborting game {}",
                    failed,
                    describe_peer(failed_peer),
                    error,
                    game_id
                );
                let mut members = members;
                for session in self
                    .queue
                    .iter_mut()
                    .filter(|s| s.state == SessionState::Pooled && s.client_id != failed)
                {
                    session.state = SessionState::Queued;
                    if let Some(pos) = members.iter().position(|(id, _)| *id == session.client_id) {
                        session.conn = Some(members.swap_remove(pos).1);
                    }
                    debug!(
                        "[Matchmaking] Client {} from {} back in queue",
                        session.client_id,
                        describe_peer(session.peer)
                    );
                }
                self.queue.retain(|s| s.client_id != failed);
                debug!(
                    "[Matchmaking] Client {} evicted, queue: {:?}",
                    failed,
                    self.snapshot().queued
                );
            }
        }
    }
}

/// Write `{game_id, client_id}` to every member in order, stopping at the
/// first failure. The failing connection is dropped, which closes it.
async fn deliver(game_id: GameId, members: Members) -> Delivery {
    let mut written = Vec::with_capacity(members.len());
    let mut pending = members.into_iter();
    while let Some((client_id, mut conn)) = pending.next() {
        let reply = encode_handshake(game_id, client_id);
        let result = match conn.write_all(&reply).await {
            Ok(()) => conn.flush().await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => written.push((client_id, conn)),
            Err(error) => {
                drop(conn);
                written.extend(pending);
                return Delivery::Failed {
                    failed: client_id,
                    error,
                    members: written,
                };
            }
        }
    }
    Delivery::Delivered(written)
}

async fn close_connections(members: Members) {
    for (client_id, mut conn) in members {
        if let Err(e) = conn.shutdown().await {
            debug!("[Matchmaking] Closing connection of client {}: {}", client_id, e);
        }
    }
}

fn describe_peer(peer: Option<SocketAddr>) -> String {
    peer.map(|p| p.to_string()).unwrap_or_else(|| "<unknown>".to_string())
}

impl Actor for Matchmaker {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        info!("[Matchmaking] Matching service is on, game size {}", self.game_size);
    }
}

impl Handler<Accept> for Matchmaker {
    type Result = AtomicResponse<Self, ()>;

    /// Handles an arriving client: admit, then try to form a game.
    fn handle(&mut self, msg: Accept, _ctx: &mut Self::Context) -> Self::Result {
        let Accept { conn, token, peer } = msg;
        let formed = self
            .admit(conn, &token, peer)
            .and_then(|_| self.try_form_game());
        let Some((game_id, members)) = formed else {
            return AtomicResponse::new(Box::pin(fut::ready(())));
        };
        AtomicResponse::new(Box::pin(
            deliver(game_id, members)
                .into_actor(self)
                .map(move |delivery, act, _ctx| act.finish_group(game_id, delivery)),
        ))
    }
}

impl Handler<GetQueueState> for Matchmaker {
    type Result = MessageResult<GetQueueState>;

    fn handle(&mut self, _msg: GetQueueState, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.snapshot())
    }
}
