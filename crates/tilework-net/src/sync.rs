//! The per-connection synchronizer.
//!
//! A [`Synchronizer`] sits between one [`Session`] and one remote peer.
//! Outbound, it frames the session's sync events and sends them.
//! Inbound, it decodes frames and queues the structural changes they
//! carry on the session; nothing touches the slot table until the
//! session's next tick.
//!
//! # Join handshake
//!
//! ```text
//! joining peer                      authoritative peer
//!   JoinRequest { peer, fp }  ──►
//!                             ◄──   CloneSync x N (slot order)
//!                             ◄──   JoinComplete { count: N }
//! ```
//!
//! If the fingerprints differ the authoritative peer answers with
//! `JoinRejected` instead and sends no instances. If any clone-sync is
//! lost on the joining side before `JoinComplete` arrives, the join ends
//! [`JoinState::Incomplete`] rather than `Complete`.

use log::{debug, info, warn};
use tilework_core::{PacketWriter, PeerId};
use tilework_engine::{Session, StructuralChange, SyncEvent};

use crate::error::NetError;
use crate::message::NetMessage;
use crate::transport::Transport;

/// Progress of this peer's own join request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinState {
    /// No join requested.
    Idle,
    /// Request sent; snapshot not finished.
    Requested,
    /// The snapshot arrived in full.
    Complete {
        /// Instances in the snapshot.
        count: u32,
    },
    /// `JoinComplete` arrived but part of the snapshot was not queued.
    Incomplete {
        /// Instances the authoritative peer sent.
        expected: u32,
        /// Clone-syncs queued since the request.
        received: u32,
    },
    /// The authoritative peer refused the join.
    Rejected {
        /// The authoritative peer's fingerprint.
        remote: u64,
    },
}

/// Counters from one [`Synchronizer::receive`] call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReceiveReport {
    /// Packets taken from the transport.
    pub packets: u32,
    /// Clone-syncs queued on the session.
    pub clones_queued: u32,
    /// Mod payloads queued on the session.
    pub payloads_queued: u32,
    /// Join requests answered with a snapshot.
    pub joins_served: u32,
    /// Join requests refused for a fingerprint mismatch.
    pub joins_rejected: u32,
    /// Messages skipped: undecodable packets or frames, unknown types, or
    /// a full pending queue.
    pub skipped: u32,
}

/// Connects a session to one remote peer.
pub struct Synchronizer<T: Transport> {
    transport: T,
    peer: PeerId,
    fingerprint: u64,
    join: JoinState,
    join_received: u32,
    join_lost: u32,
}

impl<T: Transport> Synchronizer<T> {
    /// Bind `transport` to `session`, identifying this end as `peer`.
    pub fn new(transport: T, peer: PeerId, session: &Session) -> Self {
        Self {
            transport,
            peer,
            fingerprint: session.registry().fingerprint(),
            join: JoinState::Idle,
            join_received: 0,
            join_lost: 0,
        }
    }

    /// This end's peer ID.
    pub fn peer(&self) -> PeerId {
        self.peer
    }

    /// Fingerprint of the registry this end was built with.
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// Progress of this end's join request.
    pub fn join_state(&self) -> JoinState {
        self.join
    }

    // ── Outbound ────────────────────────────────────────────────

    /// Drain the session's outbox and send it as one packet.
    ///
    /// Returns the number of messages sent.
    pub fn flush(&mut self, session: &mut Session) -> Result<usize, NetError> {
        let events = session.drain_outbox();
        self.send_events(&events)
    }

    /// Send already-drained events. A host fanning out to several peers
    /// drains the outbox once and calls this per connection.
    pub fn send_events(&mut self, events: &[SyncEvent]) -> Result<usize, NetError> {
        if events.is_empty() {
            return Ok(0);
        }
        let mut w = PacketWriter::new();
        for event in events {
            self.to_message(event).encode_into(&mut w);
        }
        self.transport.send(w.into_bytes())?;
        debug!("peer {}: sent {} sync messages", self.peer, events.len());
        Ok(events.len())
    }

    fn to_message(&self, event: &SyncEvent) -> NetMessage {
        match event {
            SyncEvent::CloneSync { type_id, payload } => NetMessage::CloneSync {
                type_id: *type_id,
                payload: payload.clone(),
            },
            SyncEvent::ModData {
                type_id,
                slot,
                data,
            } => NetMessage::ModPayload {
                type_id: *type_id,
                slot: *slot,
                sender: self.peer,
                data: data.clone(),
            },
        }
    }

    /// Ask the remote authoritative peer for its world state.
    pub fn request_join(&mut self) -> Result<(), NetError> {
        let msg = NetMessage::JoinRequest {
            peer: self.peer,
            fingerprint: self.fingerprint,
        };
        self.transport.send(msg.encode())?;
        self.join = JoinState::Requested;
        self.join_received = 0;
        self.join_lost = 0;
        info!("peer {}: join requested ({:#018x})", self.peer, self.fingerprint);
        Ok(())
    }

    /// Send the join-sync snapshot to `peer`, followed by `JoinComplete`.
    ///
    /// A fingerprint mismatch sends `JoinRejected` and returns
    /// [`NetError::RegistryMismatch`]. Returns the number of instances sent.
    pub fn serve_join(
        &mut self,
        session: &Session,
        peer: PeerId,
        remote_fingerprint: u64,
    ) -> Result<usize, NetError> {
        if remote_fingerprint != self.fingerprint {
            self.transport.send(
                NetMessage::JoinRejected {
                    fingerprint: self.fingerprint,
                }
                .encode(),
            )?;
            return Err(NetError::RegistryMismatch {
                local: self.fingerprint,
                remote: remote_fingerprint,
            });
        }

        let snapshot = session.join_snapshot();
        let count = u32::try_from(snapshot.len()).map_err(|_| NetError::Malformed {
            detail: format!("join snapshot of {} instances", snapshot.len()),
        })?;
        let mut w = PacketWriter::new();
        for event in &snapshot {
            self.to_message(event).encode_into(&mut w);
        }
        NetMessage::JoinComplete { count }.encode_into(&mut w);
        self.transport.send(w.into_bytes())?;
        info!("served join for peer {peer}: {count} instances");
        Ok(snapshot.len())
    }

    // ── Inbound ─────────────────────────────────────────────────

    /// Process every waiting packet.
    ///
    /// Replication messages become pending changes on `session`.
    /// Undecodable packets and unknown types are logged and skipped. A
    /// rejected join or a closed channel is returned as an error.
    pub fn receive(&mut self, session: &mut Session) -> Result<ReceiveReport, NetError> {
        let mut report = ReceiveReport::default();
        while let Some(packet) = self.transport.try_recv()? {
            report.packets += 1;
            let decoded = match NetMessage::decode_frames(&packet) {
                Ok(d) => d,
                Err(e) => {
                    warn!("peer {}: dropped undecodable packet: {e}", self.peer);
                    report.skipped += 1;
                    self.note_join_loss();
                    continue;
                }
            };
            for e in &decoded.skipped {
                warn!("peer {}: skipped frame: {e}", self.peer);
                report.skipped += 1;
            }
            for msg in decoded.messages {
                self.dispatch(session, msg, &mut report)?;
            }
        }
        Ok(report)
    }

    fn dispatch(
        &mut self,
        session: &mut Session,
        msg: NetMessage,
        report: &mut ReceiveReport,
    ) -> Result<(), NetError> {
        match msg {
            NetMessage::CloneSync { type_id, payload } => {
                if let Err(e) = session.registry().entry(type_id) {
                    warn!("desync: clone-sync skipped: {e}");
                    report.skipped += 1;
                    self.note_join_loss();
                    return Ok(());
                }
                match session.enqueue(StructuralChange::ApplyClone { type_id, payload }) {
                    Ok(()) => {
                        report.clones_queued += 1;
                        if self.join == JoinState::Requested {
                            self.join_received += 1;
                        }
                    }
                    Err(_) => {
                        report.skipped += 1;
                        self.note_join_loss();
                    }
                }
            }
            NetMessage::ModPayload {
                type_id,
                slot,
                sender,
                data,
            } => {
                let change = StructuralChange::ModPayload {
                    type_id,
                    slot,
                    sender,
                    data,
                };
                match session.enqueue(change) {
                    Ok(()) => report.payloads_queued += 1,
                    Err(_) => report.skipped += 1,
                }
            }
            NetMessage::JoinRequest { peer, fingerprint } => {
                if !session.authority().is_authoritative() {
                    warn!("join request from peer {peer} sent to a non-authoritative peer");
                    report.skipped += 1;
                    return Ok(());
                }
                match self.serve_join(session, peer, fingerprint) {
                    Ok(_) => report.joins_served += 1,
                    Err(e @ NetError::RegistryMismatch { .. }) => {
                        warn!("join from peer {peer} rejected: {e}");
                        report.joins_rejected += 1;
                    }
                    Err(e) => return Err(e),
                }
            }
            NetMessage::JoinComplete { count } => {
                if self.join_lost == 0 && self.join_received >= count {
                    self.join = JoinState::Complete { count };
                    info!("peer {}: join complete, {count} instances", self.peer);
                } else {
                    self.join = JoinState::Incomplete {
                        expected: count,
                        received: self.join_received,
                    };
                    warn!(
                        "peer {}: join incomplete, {} of {count} instances queued",
                        self.peer, self.join_received
                    );
                }
            }
            NetMessage::JoinRejected { fingerprint } => {
                self.join = JoinState::Rejected {
                    remote: fingerprint,
                };
                let err = NetError::RegistryMismatch {
                    local: self.fingerprint,
                    remote: fingerprint,
                };
                warn!("peer {}: {err}", self.peer);
                return Err(err);
            }
        }
        Ok(())
    }

    fn note_join_loss(&mut self) {
        if self.join == JoinState::Requested {
            self.join_lost += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::loopback_pair;
    use tilework_core::Authority;
    use tilework_engine::SessionConfig;
    use tilework_test_utils::{init_logging, sample_registry};

    fn session(authority: Authority) -> Session {
        Session::new(sample_registry().registry, SessionConfig::new(authority)).unwrap()
    }

    #[test]
    fn flush_stamps_mod_payloads_with_own_peer() {
        init_logging();
        let types = sample_registry();
        let mut client = Session::new(types.registry.clone(), SessionConfig::new(Authority::Client))
            .unwrap();
        let (a, mut b) = loopback_pair();
        let mut sync = Synchronizer::new(a, PeerId(4), &client);

        let event = SyncEvent::ModData {
            type_id: types.furnace,
            slot: tilework_core::SlotId(2),
            data: vec![7],
        };
        assert_eq!(sync.send_events(std::slice::from_ref(&event)).unwrap(), 1);
        assert_eq!(sync.flush(&mut client).unwrap(), 0);

        let packet = b.try_recv().unwrap().unwrap();
        let msgs = NetMessage::decode_packet(&packet).unwrap();
        assert!(matches!(
            msgs[..],
            [NetMessage::ModPayload { sender: PeerId(4), .. }]
        ));
    }

    #[test]
    fn clone_sync_for_unknown_type_is_skipped() {
        init_logging();
        let mut client = session(Authority::Client);
        let (mut a, b) = loopback_pair();
        let mut sync = Synchronizer::new(b, PeerId(1), &client);
        a.send(
            NetMessage::CloneSync {
                type_id: tilework_core::ProcessorTypeId(99),
                payload: vec![1, 0, 0, 0, 0, 0, 0, 0, 0],
            }
            .encode(),
        )
        .unwrap();
        let report = sync.receive(&mut client).unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(client.pending_len(), 0);
    }

    #[test]
    fn garbage_packet_is_skipped_not_fatal() {
        init_logging();
        let mut client = session(Authority::Client);
        let (mut a, b) = loopback_pair();
        let mut sync = Synchronizer::new(b, PeerId(1), &client);
        a.send(vec![0xEE, 0, 0, 0, 0]).unwrap();
        a.send(NetMessage::JoinComplete { count: 0 }.encode()).unwrap();
        let report = sync.receive(&mut client).unwrap();
        assert_eq!((report.packets, report.skipped), (2, 1));
        assert_eq!(sync.join_state(), JoinState::Complete { count: 0 });
    }

    #[test]
    fn client_ignores_join_requests() {
        init_logging();
        let mut client = session(Authority::Client);
        let (mut a, b) = loopback_pair();
        let mut sync = Synchronizer::new(b, PeerId(1), &client);
        let fp = sync.fingerprint();
        a.send(
            NetMessage::JoinRequest {
                peer: PeerId(2),
                fingerprint: fp,
            }
            .encode(),
        )
        .unwrap();
        let report = sync.receive(&mut client).unwrap();
        assert_eq!(report.joins_served, 0);
        assert_eq!(a.try_recv().unwrap(), None);
    }
}
