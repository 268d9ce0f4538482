use hopmap_model::{HopEvent, Round};
use std::collections::BTreeMap;
use std::net::Ipv4Addr;

/// Bucket key within one distance. Timeouts never share a bucket with a
/// responder, even one reporting the unspecified address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Responder {
    Timeout,
    Address(Ipv4Addr),
}

impl Responder {
    fn of(event: &HopEvent) -> Self {
        if event.success {
            Responder::Address(event.address)
        } else {
            Responder::Timeout
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub responder: Responder,
    pub events: Vec<HopEvent>,
}

/// Events of many rounds grouped by distance, then by responder. Distances
/// iterate ascending; responders keep first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregated {
    pub distances: BTreeMap<u32, Vec<Cluster>>,
}

impl Aggregated {
    pub fn clusters(&self, distance: u32) -> &[Cluster] {
        self.distances
            .get(&distance)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn event_count(&self) -> usize {
        self.distances
            .values()
            .flatten()
            .map(|cluster| cluster.events.len())
            .sum()
    }
}

pub fn aggregate<'a, I>(rounds: I) -> Aggregated
where
    I: IntoIterator<Item = &'a Round>,
{
    let mut distances: BTreeMap<u32, Vec<Cluster>> = BTreeMap::new();

    for event in rounds.into_iter().flat_map(|round| round.events.iter()) {
        let responder = Responder::of(event);
        let clusters = distances.entry(event.distance).or_default();
        match clusters.iter_mut().find(|cluster| cluster.responder == responder) {
            Some(cluster) => cluster.events.push(event.clone()),
            None => clusters.push(Cluster {
                responder,
                events: vec![event.clone()],
            }),
        }
    }

    Aggregated { distances }
}
