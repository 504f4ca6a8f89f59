use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use actix::prelude::*;
use log::{debug, info, warn};

use super::messages::{ListGames, PublishGame, RetireGame, RoutePacket, TerminateAll, TerminateGame};
use super::relay::Relay;
use super::types::{Game, Registration};
use crate::config::ServerConfig;
use crate::frame::{EventKind, Packet};
use crate::server::matchmaking::types::{ClientId, GameId};

/// One live game. Its mailbox serializes every change to the game's members,
/// so concurrent Register packets can never both complete the registration.
pub struct GameSession {
    game: Game,
    /// Pending termination timer, armed once the game is fully registered.
    game_over_timer: Option<SpawnHandle>,
    relay: Relay,
    config: Arc<ServerConfig>,
    manager: Addr<GameSessionManager>,
}

impl Actor for GameSession {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        debug!(
            "[GameSession] Game {} waiting for {} registrations",
            self.game.game_id(),
            self.game.members().len()
        );
    }
}

impl GameSession {
    pub fn new(
        game_id: GameId,
        members: &[ClientId],
        relay: Relay,
        config: Arc<ServerConfig>,
        manager: Addr<GameSessionManager>,
    ) -> Self {
        Self {
            game: Game::new(game_id, members),
            game_over_timer: None,
            relay,
            config,
            manager,
        }
    }

    fn on_register(&mut self, client_id: ClientId, source: SocketAddr, ctx: &mut Context<Self>) {
        let game_id = self.game.game_id();
        let Some(endpoint) = self
            .config
            .endpoint_mode
            .resolve(source, client_id, self.config.client_port)
        else {
            warn!(
                "[GameSession] No {:?} endpoint for client {} from {}",
                self.config.endpoint_mode, client_id, source
            );
            return;
        };

        match self.game.register(client_id, endpoint) {
            Registration::Bound => {
                info!(
                    "[GameSession] Client {} of game {} registered at {} ({}/{})",
                    client_id,
                    game_id,
                    endpoint,
                    self.game.registered_count(),
                    self.game.members().len()
                );
            }
            Registration::FullyRegistered => {
                info!(
                    "[GameSession] Client {} of game {} registered at {}",
                    client_id, game_id, endpoint
                );
                info!("[GameSession] All players of game {} registered, sending start", game_id);
                self.relay
                    .broadcast_packet(&Packet::start(game_id), self.game.endpoints());
                self.arm_game_over_timer(ctx);
            }
            Registration::AlreadyRegistered => {
                debug!("[GameSession] Client {} of game {} already registered", client_id, game_id);
            }
            Registration::UnknownMember => {
                warn!("[GameSession] Client {} is not a member of game {}", client_id, game_id);
            }
            Registration::Closed => {}
        }
    }

    fn arm_game_over_timer(&mut self, ctx: &mut Context<Self>) {
        let delay = self.config.game_over_delay();
        debug!("[GameSession] Game {} ends in {:?}", self.game.game_id(), delay);
        let handle = ctx.run_later(delay, |act, ctx| {
            act.game_over_timer = None;
            if act.game.is_terminated() {
                return;
            }
            info!("[GameSession] Game {} time is up", act.game.game_id());
            act.terminate(ctx);
        });
        self.game_over_timer = Some(handle);
    }

    /// Broadcast GameOver and retire the game. Only the first call acts.
    fn terminate(&mut self, ctx: &mut Context<Self>) {
        let previous = self.game.state();
        if !self.game.terminate() {
            return;
        }
        let game_id = self.game.game_id();
        debug!("[GameSession] Game {} terminating from {:?}", game_id, previous);
        if let Some(handle) = self.game_over_timer.take() {
            ctx.cancel_future(handle);
        }
        self.relay
            .broadcast_packet(&Packet::game_over(game_id), self.game.endpoints());
        self.manager.do_send(RetireGame { game_id });
        info!("[GameSession] Game {} over", game_id);
        ctx.stop();
    }
}

impl Handler<RoutePacket> for GameSession {
    type Result = ();

    fn handle(&mut self, msg: RoutePacket, ctx: &mut Self::Context) -> Self::Result {
        if self.game.is_terminated() {
            return;
        }
        let RoutePacket { packet, raw, source } = msg;
        match packet.sole_event() {
            Some(EventKind::Register) => self.on_register(packet.client_id, source, ctx),
            Some(EventKind::Disconnect) => {
                info!(
                    "[GameSession] Client {} disconnected from game {}",
                    packet.client_id,
                    self.game.game_id()
                );
                self.terminate(ctx);
            }
            _ => {
                debug!(
                    "[GameSession] Relaying {} ({} events) from client {} in game {}",
                    packet.describe(),
                    packet.events.len(),
                    packet.client_id,
                    self.game.game_id()
                );
                self.relay
                    .broadcast(self.game.game_id(), raw, self.game.endpoints());
            }
        }
    }
}

impl Handler<TerminateGame> for GameSession {
    type Result = ();

    fn handle(&mut self, _msg: TerminateGame, ctx: &mut Self::Context) -> Self::Result {
        self.terminate(ctx);
    }
}

/// Registry of live games, keyed by game ID.
pub struct GameSessionManager {
    sessions: HashMap<GameId, Addr<GameSession>>,
    relay: Relay,
    config: Arc<ServerConfig>,
}

impl GameSessionManager {
    pub fn new(relay: Relay, config: Arc<ServerConfig>) -> Self {
        Self {
            sessions: HashMap::new(),
            relay,
            config,
        }
    }
}

impl Actor for GameSessionManager {
    type Context = Context<Self>;
}

impl Handler<PublishGame> for GameSessionManager {
    type Result = ();

    fn handle(&mut self, msg: PublishGame, ctx: &mut Context<Self>) -> Self::Result {
        if self.sessions.contains_key(&msg.game_id) {
            warn!("[GameSession] Game {} already published, ignoring", msg.game_id);
            return;
        }
        let session = GameSession::new(
            msg.game_id,
            &msg.members,
            self.relay.clone(),
            self.config.clone(),
            ctx.address(),
        )
        .start();
        self.sessions.insert(msg.game_id, session);
        info!("[GameSession] Game {} published with clients {:?}", msg.game_id, msg.members);
    }
}

impl Handler<RoutePacket> for GameSessionManager {
    type Result = ();

    fn handle(&mut self, msg: RoutePacket, _ctx: &mut Context<Self>) -> Self::Result {
        match self.sessions.get(&msg.packet.game_id) {
            Some(session) => session.do_send(msg),
            None => debug!(
                "[GameSession] No game with ID {}, dropping {} from {}",
                msg.packet.game_id,
                msg.packet.describe(),
                msg.source
            ),
        }
    }
}

impl Handler<RetireGame> for GameSessionManager {
    type Result = ();

    fn handle(&mut self, msg: RetireGame, _ctx: &mut Context<Self>) -> Self::Result {
        if self.sessions.remove(&msg.game_id).is_some() {
            debug!("[GameSession] Game {} retired", msg.game_id);
        }
    }
}

impl Handler<TerminateAll> for GameSessionManager {
    type Result = usize;

    fn handle(&mut self, _msg: TerminateAll, _ctx: &mut Context<Self>) -> Self::Result {
        for session in self.sessions.values() {
            session.do_send(TerminateGame);
        }
        self.sessions.len()
    }
}

impl Handler<ListGames> for GameSessionManager {
    type Result = MessageResult<ListGames>;

    fn handle(&mut self, _msg: ListGames, _ctx: &mut Context<Self>) -> Self::Result {
        let mut games: Vec<GameId> = self.sessions.keys().copied().collect();
        games.sort_unstable();
        MessageResult(games)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tokio::net::UdpSocket;

    use crate::config::EndpointMode;
    use crate::frame::{decode, encode, Event};

    struct Harness {
        manager: Addr<GameSessionManager>,
    }

    async fn start(min_ms: u64, max_ms: u64) -> Harness {
        let socket = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
        let config = Arc::new(ServerConfig {
            endpoint_mode: EndpointMode::Source,
            min_game_over_ms: min_ms,
            max_game_over_ms: max_ms,
            ..ServerConfig::default()
        });
        let manager = GameSessionManager::new(Relay::new(Some(socket)), config).start();
        Harness { manager }
    }

    async fn member() -> UdpSocket {
        UdpSocket::bind("127.0.0.1:0").await.unwrap()
    }

    fn route(socket: &UdpSocket, packet: Packet) -> RoutePacket {
        RoutePacket {
            raw: encode(&packet).unwrap(),
            packet,
            source: socket.local_addr().unwrap(),
        }
    }

    async fn next(socket: &UdpSocket) -> Option<Packet> {
        let mut buf = [0u8; 2048];
        let (len, _) = tokio::time::timeout(Duration::from_millis(300), socket.recv_from(&mut buf))
            .await
            .ok()?
            .ok()?;
        decode(&buf[..len]).ok()
    }

    #[actix::test]
    async fn test_start_is_broadcast_once() {
        let h = start(60_000, 60_000).await;
        let (a, b) = (member().await, member().await);
        h.manager.send(PublishGame { game_id: 1, members: vec![1, 2] }).await.unwrap();

        h.manager.send(route(&a, Packet::register(1, 1))).await.unwrap();
        h.manager.send(route(&b, Packet::register(1, 2))).await.unwrap();
        h.manager.send(route(&a, Packet::register(1, 1))).await.unwrap();
        h.manager.send(route(&b, Packet::register(1, 2))).await.unwrap();

        for socket in [&a, &b] {
            let start = next(socket).await.expect("no start");
            assert!(start.is_event_pack(EventKind::Start));
            assert_eq!(start.game_id, 1);
            assert!(next(socket).await.is_none());
        }
    }

    #[actix::test]
    async fn test_disconnect_ends_game_before_timer() {
        let h = start(60_000, 60_000).await;
        let (a, b) = (member().await, member().await);
        h.manager.send(PublishGame { game_id: 3, members: vec![5, 6] }).await.unwrap();
        h.manager.send(route(&a, Packet::register(3, 5))).await.unwrap();
        h.manager.send(route(&b, Packet::register(3, 6))).await.unwrap();
        h.manager.send(route(&b, Packet::disconnect(3, 6))).await.unwrap();

        for socket in [&a, &b] {
            assert!(next(socket).await.unwrap().is_event_pack(EventKind::Start));
            assert!(next(socket).await.unwrap().is_event_pack(EventKind::GameOver));
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(h.manager.send(ListGames).await.unwrap().is_empty());

        // Traffic for a retired game goes nowhere.
        let data = Packet::new(5, 3, vec![Event::new(EventKind::Data, 1)]);
        h.manager.send(route(&a, data)).await.unwrap();
        assert!(next(&a).await.is_none());
        assert!(next(&b).await.is_none());
    }

    #[actix::test]
    async fn test_timer_after_disconnect_is_a_no_op() {
        let h = start(50, 60).await;
        let (a, b) = (member().await, member().await);
        h.manager.do_send(PublishGame { game_id: 5, members: vec![1, 2] });
        h.manager.do_send(route(&a, Packet::register(5, 1)));
        h.manager.do_send(route(&b, Packet::register(5, 2)));
        h.manager.do_send(route(&a, Packet::register(5, 1)));
        h.manager.do_send(route(&b, Packet::disconnect(5, 2)));

        // Well past the timer window.
        tokio::time::sleep(Duration::from_millis(200)).await;
        for socket in [&a, &b] {
            let mut seen = Vec::new();
            while let Some(packet) = next(socket).await {
                seen.push(packet.describe());
            }
            assert_eq!(seen, vec!["start", "gameover"]);
        }
        assert!(h.manager.send(ListGames).await.unwrap().is_empty());
    }

    #[actix::test]
    async fn test_timer_ends_game() {
        let h = start(20, 40).await;
        let (a, b) = (member().await, member().await);
        h.manager.send(PublishGame { game_id: 2, members: vec![3, 4] }).await.unwrap();
        h.manager.send(route(&a, Packet::register(2, 3))).await.unwrap();
        h.manager.send(route(&b, Packet::register(2, 4))).await.unwrap();

        for socket in [&a, &b] {
            assert!(next(socket).await.unwrap().is_event_pack(EventKind::Start));
            assert!(next(socket).await.unwrap().is_event_pack(EventKind::GameOver));
            assert!(next(socket).await.is_none());
        }
        assert!(h.manager.send(ListGames).await.unwrap().is_empty());
    }

    #[actix::test]
    async fn test_data_is_relayed_verbatim_to_every_member() {
        let h = start(60_000, 60_000).await;
        let (a, b) = (member().await, member().await);
        h.manager.send(PublishGame { game_id: 4, members: vec![7, 8] }).await.unwrap();
        h.manager.send(route(&a, Packet::register(4, 7))).await.unwrap();
        h.manager.send(route(&b, Packet::register(4, 8))).await.unwrap();
        for socket in [&a, &b] {
            assert!(next(socket).await.unwrap().is_event_pack(EventKind::Start));
        }

        let data = Packet::new(7, 4, vec![Event { id: 42, data: -5 }, Event { id: 0, data: 9 }]);
        h.manager.send(route(&a, data.clone())).await.unwrap();
        for socket in [&a, &b] {
            assert_eq!(next(socket).await.unwrap(), data);
        }
    }

    #[actix::test]
    async fn test_retire_and_terminate_all() {
        let h = start(60_000, 60_000).await;
        h.manager.send(PublishGame { game_id: 1, members: vec![1] }).await.unwrap();
        h.manager.send(PublishGame { game_id: 2, members: vec![2] }).await.unwrap();
        h.manager.send(RetireGame { game_id: 1 }).await.unwrap();
        h.manager.send(RetireGame { game_id: 1 }).await.unwrap();
        h.manager.send(RetireGame { game_id: 99 }).await.unwrap();
        assert_eq!(h.manager.send(ListGames).await.unwrap(), vec![2]);

        assert_eq!(h.manager.send(TerminateAll).await.unwrap(), 1);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(h.manager.send(ListGames).await.unwrap().is_empty());
    }
}
