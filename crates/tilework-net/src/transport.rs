//! Packet transport between two peers.
//!
//! The synchronizer only needs an ordered, reliable packet pipe. Hosts
//! plug in their own socket layer through [`Transport`];
//! [`loopback_pair`] connects two in-process peers.

use crossbeam_channel::{Receiver, Sender, TryRecvError};

use crate::error::NetError;

/// An ordered, reliable packet channel to one remote peer.
pub trait Transport: Send {
    /// Queue a packet for the remote peer.
    fn send(&mut self, packet: Vec<u8>) -> Result<(), NetError>;

    /// Take the next received packet, if one is waiting.
    fn try_recv(&mut self) -> Result<Option<Vec<u8>>, NetError>;
}

/// One end of an in-process channel pair.
pub struct LoopbackTransport {
    tx: Sender<Vec<u8>>,
    rx: Receiver<Vec<u8>>,
}

/// Two connected loopback ends.
pub fn loopback_pair() -> (LoopbackTransport, LoopbackTransport) {
    let (a_tx, b_rx) = crossbeam_channel::unbounded();
    let (b_tx, a_rx) = crossbeam_channel::unbounded();
    (
        LoopbackTransport { tx: a_tx, rx: a_rx },
        LoopbackTransport { tx: b_tx, rx: b_rx },
    )
}

impl Transport for LoopbackTransport {
    fn send(&mut self, packet: Vec<u8>) -> Result<(), NetError> {
        self.tx.send(packet).map_err(|_| NetError::ChannelClosed)
    }

    fn try_recv(&mut self) -> Result<Option<Vec<u8>>, NetError> {
        match self.rx.try_recv() {
            Ok(packet) => Ok(Some(packet)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(NetError::ChannelClosed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packets_arrive_in_order() {
        let (mut a, mut b) = loopback_pair();
        a.send(vec![1]).unwrap();
        a.send(vec![2, 2]).unwrap();
        assert_eq!(b.try_recv().unwrap(), Some(vec![1]));
        assert_eq!(b.try_recv().unwrap(), Some(vec![2, 2]));
        assert_eq!(b.try_recv().unwrap(), None);
        assert_eq!(a.try_recv().unwrap(), None);
    }

    #[test]
    fn dropped_peer_closes_channel() {
        let (mut a, b) = loopback_pair();
        drop(b);
        assert_eq!(a.send(vec![0]), Err(NetError::ChannelClosed));
        assert_eq!(a.try_recv(), Err(NetError::ChannelClosed));
    }
}
