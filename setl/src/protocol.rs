// THEORY:
// The protocol module is the only thing the coordinator and the workers share.
// Each role runs as its own task, owns all of its buffers, and talks to the
// others exclusively through point-to-point messages addressed by
// (source rank, destination rank, tag).
//
// Key architectural principles:
// 1.  **One inbox per rank**: every rank owns a bounded `mpsc` receiver, and
//     every `Endpoint` can send to any rank's inbox. A full inbox makes the
//     sender wait, which is the only flow control in the system.
// 2.  **Tag matching**: a receive names the exact source and tag it wants.
//     Messages that arrive early (a halo for the next generation, a report from
//     a fast worker) are parked in a local pending queue until asked for, so
//     arrival order between different peers never matters.
// 3.  **Typed payloads**: each tag has exactly one payload shape. Receiving a
//     payload that does not fit the tag, or finding a peer gone, is a
//     `ProtocolViolation` rather than undefined behaviour.

use crate::core_modules::cell::cell::Cell;
use crate::core_modules::grid::Grid;
use crate::core_modules::match_codec::PackedMatch;
use crate::core_modules::pattern::{Pattern, Rotation};
use crate::error::{Result, SetlError};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;

/// A participant's ordinal identity. Workers are `0..W`, the coordinator is `W`.
pub type Rank = usize;

/// Run parameters broadcast once before anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetupInfo {
    pub size: usize,
    pub generations: usize,
    pub pattern_size: usize,
}

/// Message labels. Per-generation traffic carries its generation index so a
/// message can never be consumed by the wrong round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Setup,
    Pattern(Rotation),
    InitialBand,
    Halo { generation: usize },
    Report { generation: usize },
}

/// Full-width boundary rows, starting at global padded row `first_row`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HaloRows {
    pub first_row: usize,
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Setup(SetupInfo),
    Pattern(Pattern),
    Band(Grid),
    Halo(HaloRows),
    /// Number of matches in the report that follows under the same tag.
    MatchCount(usize),
    Matches(Vec<PackedMatch>),
}

impl Payload {
    fn kind(&self) -> &'static str {
        match self {
            Payload::Setup(_) => "setup",
            Payload::Pattern(_) => "pattern",
            Payload::Band(_) => "band",
            Payload::Halo(_) => "halo",
            Payload::MatchCount(_) => "match count",
            Payload::Matches(_) => "matches",
        }
    }
}

#[derive(Debug)]
pub struct Envelope {
    pub source: Rank,
    pub tag: Tag,
    pub payload: Payload,
}

/// Builds the channel mesh for a fixed set of ranks.
pub struct Fabric;

impl Fabric {
    /// One endpoint per rank, in rank order.
    pub fn new(ranks: usize, capacity: usize) -> Vec<Endpoint> {
        let (senders, receivers): (Vec<_>, Vec<_>) = (0..ranks)
            .map(|_| mpsc::channel::<Envelope>(capacity.max(1)))
            .unzip();
        let peers: Arc<[mpsc::Sender<Envelope>]> = senders.into();

        receivers
            .into_iter()
            .enumerate()
            .map(|(rank, inbox)| Endpoint {
                rank,
                inbox,
                pending: VecDeque::new(),
                peers: Arc::clone(&peers),
            })
            .collect()
    }
}

/// One rank's connection to the fabric.
pub struct Endpoint {
    rank: Rank,
    inbox: mpsc::Receiver<Envelope>,
    pending: VecDeque<Envelope>,
    peers: Arc<[mpsc::Sender<Envelope>]>,
}

impl Endpoint {
    pub fn rank(&self) -> Rank {
        self.rank
    }

    pub fn ranks(&self) -> usize {
        self.peers.len()
    }

    pub async fn send(&self, dest: Rank, tag: Tag, payload: Payload) -> Result<()> {
        let peer = self
            .peers
            .get(dest)
            .ok_or_else(|| SetlError::protocol(self.rank, format!("no rank {dest}")))?;
        let envelope = Envelope {
            source: self.rank,
            tag,
            payload,
        };
        peer.send(envelope).await.map_err(|_| {
            SetlError::protocol(self.rank, format!("rank {dest} hung up before {tag:?}"))
        })
    }

    /// Waits for the next message from `source` carrying exactly `tag`.
    pub async fn recv(&mut self, source: Rank, tag: Tag) -> Result<Payload> {
        if let Some(pos) = self
            .pending
            .iter()
            .position(|e| e.source == source && e.tag == tag)
        {
            if let Some(envelope) = self.pending.remove(pos) {
                return Ok(envelope.payload);
            }
        }
        loop {
            let envelope = self.inbox.recv().await.ok_or_else(|| {
                SetlError::protocol(self.rank, format!("inbox closed awaiting {tag:?} from {source}"))
            })?;
            if envelope.source == source && envelope.tag == tag {
                return Ok(envelope.payload);
            }
            self.pending.push_back(envelope);
        }
    }

    pub async fn recv_setup(&mut self, source: Rank) -> Result<SetupInfo> {
        match self.recv(source, Tag::Setup).await? {
            Payload::Setup(info) => Ok(info),
            other => Err(self.unexpected(Tag::Setup, &other)),
        }
    }

    pub async fn recv_pattern(&mut self, source: Rank, rotation: Rotation) -> Result<Pattern> {
        let tag = Tag::Pattern(rotation);
        match self.recv(source, tag).await? {
            Payload::Pattern(pattern) => Ok(pattern),
            other => Err(self.unexpected(tag, &other)),
        }
    }

    pub async fn recv_band(&mut self, source: Rank) -> Result<Grid> {
        match self.recv(source, Tag::InitialBand).await? {
            Payload::Band(grid) => Ok(grid),
            other => Err(self.unexpected(Tag::InitialBand, &other)),
        }
    }

    pub async fn recv_halo(&mut self, source: Rank, generation: usize) -> Result<HaloRows> {
        let tag = Tag::Halo { generation };
        match self.recv(source, tag).await? {
            Payload::Halo(rows) => Ok(rows),
            other => Err(self.unexpected(tag, &other)),
        }
    }

    /// Receives a count-then-array match report and checks the two agree.
    pub async fn recv_report(&mut self, source: Rank, generation: usize) -> Result<Vec<PackedMatch>> {
        let tag = Tag::Report { generation };
        let count = match self.recv(source, tag).await? {
            Payload::MatchCount(count) => count,
            other => return Err(self.unexpected(tag, &other)),
        };
        let matches = match self.recv(source, tag).await? {
            Payload::Matches(matches) => matches,
            other => return Err(self.unexpected(tag, &other)),
        };
        if matches.len() != count {
            return Err(SetlError::protocol(
                self.rank,
                format!(
                    "rank {source} announced {count} matches for generation {generation} but sent {}",
                    matches.len()
                ),
            ));
        }
        Ok(matches)
    }

    /// Sends a match report as a count followed by the packed array.
    pub async fn send_report(&self, dest: Rank, generation: usize, matches: Vec<PackedMatch>) -> Result<()> {
        let tag = Tag::Report { generation };
        self.send(dest, tag, Payload::MatchCount(matches.len())).await?;
        self.send(dest, tag, Payload::Matches(matches)).await
    }

    fn unexpected(&self, tag: Tag, payload: &Payload) -> SetlError {
        SetlError::protocol(
            self.rank,
            format!("unexpected {} payload under {tag:?}", payload.kind()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn receives_by_source_and_tag_regardless_of_arrival() {
        let mut endpoints = Fabric::new(3, 8);
        let mut sink = endpoints.remove(2);
        let b = endpoints.remove(1);
        let a = endpoints.remove(0);

        b.send_report(2, 1, vec![]).await.unwrap();
        b.send_report(2, 0, vec![]).await.unwrap();
        let m = PackedMatch::encode(1, 2, Rotation::East).unwrap();
        a.send_report(2, 0, vec![m]).await.unwrap();

        assert_eq!(sink.recv_report(0, 0).await.unwrap(), vec![m]);
        assert_eq!(sink.recv_report(1, 0).await.unwrap(), vec![]);
        assert_eq!(sink.recv_report(1, 1).await.unwrap(), vec![]);
    }

    #[tokio::test]
    async fn same_tag_messages_stay_in_order() {
        let mut endpoints = Fabric::new(2, 8);
        let mut rx = endpoints.remove(1);
        let tx = endpoints.remove(0);
        for first_row in [3, 4] {
            let halo = HaloRows { first_row, cells: vec![Cell::Dead; 2] };
            tx.send(1, Tag::Halo { generation: 0 }, Payload::Halo(halo)).await.unwrap();
        }
        assert_eq!(rx.recv_halo(0, 0).await.unwrap().first_row, 3);
        assert_eq!(rx.recv_halo(0, 0).await.unwrap().first_row, 4);
    }

    #[tokio::test]
    async fn wrong_payload_is_a_protocol_violation() {
        let mut endpoints = Fabric::new(2, 4);
        let mut rx = endpoints.remove(1);
        let tx = endpoints.remove(0);
        tx.send(1, Tag::Setup, Payload::MatchCount(3)).await.unwrap();
        assert!(matches!(
            rx.recv_setup(0).await,
            Err(SetlError::ProtocolViolation { rank: 1, .. })
        ));
    }

    #[tokio::test]
    async fn count_mismatch_is_rejected() {
        let mut endpoints = Fabric::new(2, 4);
        let mut rx = endpoints.remove(1);
        let tx = endpoints.remove(0);
        let tag = Tag::Report { generation: 0 };
        tx.send(1, tag, Payload::MatchCount(2)).await.unwrap();
        tx.send(1, tag, Payload::Matches(vec![])).await.unwrap();
        assert!(rx.recv_report(0, 0).await.is_err());
    }

    #[tokio::test]
    async fn sending_to_a_dropped_rank_fails() {
        let mut endpoints = Fabric::new(2, 4);
        drop(endpoints.remove(1));
        let tx = endpoints.remove(0);
        assert!(tx.send(1, Tag::Setup, Payload::MatchCount(0)).await.is_err());
        assert!(tx.send(7, Tag::Setup, Payload::MatchCount(0)).await.is_err());
    }
}
