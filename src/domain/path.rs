use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::domain::ids::{BusId, IdAllocator, PathId};
use crate::domain::line::Line;
use crate::error::{Error, Result};

/// An ordered, cycle-free chain of lines connecting two distinct buses.
///
/// Construction validates the chain in three steps, linear in the number of
/// lines:
///
/// 1. every line must share an endpoint with its predecessor in the given
///    order; lines supplied in any endpoint-incompatible order fail;
/// 2. endpoint occurrences are counted per bus: internal buses appear
///    exactly twice, the two terminals once; any bus appearing more often
///    marks a revisit and the chain is rejected as circular, as is a chain
///    with no terminals at all (a closed ring);
/// 3. the bus sequence is read off by walking the lines from the terminal
///    endpoint of the first line.
///
/// Once built, a path's lines and buses are permanently fixed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    id: PathId,
    lines: Vec<Line>,
    buses: Vec<BusId>,
}

impl Path {
    pub fn new(ids: &IdAllocator, lines: Vec<Line>) -> Result<Self> {
        if lines.is_empty() {
            return Err(Error::Topology(
                "a path needs at least one line".to_string(),
            ));
        }

        for (prev, next) in lines.iter().tuple_windows() {
            if !next.touches(prev.bus0()) && !next.touches(prev.bus1()) {
                return Err(Error::Topology(format!(
                    "line {} does not share an endpoint with its predecessor {}",
                    next.id(),
                    prev.id()
                )));
            }
        }

        let mut occurrences: HashMap<BusId, usize> = HashMap::new();
        for line in &lines {
            *occurrences.entry(line.bus0()).or_insert(0) += 1;
            *occurrences.entry(line.bus1()).or_insert(0) += 1;
        }

        let mut terminals = Vec::new();
        for (&bus, &count) in &occurrences {
            match count {
                1 => terminals.push(bus),
                2 => {}
                _ => {
                    return Err(Error::Topology(format!(
                        "bus {bus} is visited {count} times, the chain contains a cycle"
                    )))
                }
            }
        }
        if terminals.len() != 2 {
            return Err(Error::Topology(format!(
                "a chain must end in exactly two terminal buses, found {}",
                terminals.len()
            )));
        }

        let start = if occurrences[&lines[0].bus0()] == 1 {
            lines[0].bus0()
        } else {
            lines[0].bus1()
        };

        let mut buses = Vec::with_capacity(lines.len() + 1);
        let mut seen = HashSet::with_capacity(lines.len() + 1);
        let mut current = start;
        buses.push(current);
        seen.insert(current);
        for line in &lines {
            let next = line.other_end(current).ok_or_else(|| {
                Error::Topology(format!(
                    "line {} does not continue the chain at bus {current}",
                    line.id()
                ))
            })?;
            if !seen.insert(next) {
                return Err(Error::Topology(format!(
                    "bus {next} reappears along the chain, the path is circular"
                )));
            }
            buses.push(next);
            current = next;
        }

        Ok(Self {
            id: ids.next_path(),
            lines,
            buses,
        })
    }

    pub fn id(&self) -> PathId {
        self.id
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// Buses along the chain, in order, endpoints included.
    pub fn buses(&self) -> &[BusId] {
        &self.buses
    }

    pub fn line_amount(&self) -> usize {
        self.lines.len()
    }

    pub fn bus_amount(&self) -> usize {
        self.buses.len()
    }

    /// Cumulative length of all lines on the path.
    pub fn length(&self) -> f64 {
        self.lines.iter().map(Line::length).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bus::Bus;
    use crate::domain::line_type::LineType;

    struct Fixture {
        ids: IdAllocator,
        buses: Vec<Bus>,
        line_type: LineType,
    }

    fn fixture(bus_count: usize) -> Fixture {
        let ids = IdAllocator::new();
        let buses = (0..bus_count)
            .map(|i| Bus::new(&ids, 100.0 * (i + 1) as f64, None, 0.0).unwrap())
            .collect();
        let line_type = LineType::new(&ids, "Cool", 1000.0).unwrap();
        Fixture {
            ids,
            buses,
            line_type,
        }
    }

    impl Fixture {
        fn line(&self, a: usize, b: usize, length: f64) -> Line {
            Line::new(
                &self.ids,
                self.buses[a].id(),
                self.buses[b].id(),
                length,
                self.line_type.clone(),
            )
            .unwrap()
        }
    }

    #[test]
    fn sanity() {
        let f = fixture(4);
        let lines = vec![f.line(0, 1, 30.0), f.line(1, 2, 40.0), f.line(2, 3, 50.0)];
        let path = Path::new(&f.ids, lines).unwrap();

        assert_eq!(path.line_amount(), 3);
        assert_eq!(path.bus_amount(), 4);
        assert_eq!(path.bus_amount(), path.line_amount() + 1);
        assert_eq!(
            path.buses(),
            &[
                f.buses[0].id(),
                f.buses[1].id(),
                f.buses[2].id(),
                f.buses[3].id()
            ]
        );
        assert_eq!(path.length(), 120.0);
    }

    #[test]
    fn single_line_path() {
        let f = fixture(2);
        let path = Path::new(&f.ids, vec![f.line(0, 1, 5.0)]).unwrap();
        assert_eq!(path.buses(), &[f.buses[0].id(), f.buses[1].id()]);
        assert_eq!(path.bus_amount(), 2);
    }

    #[test]
    fn reversed_middle_line_still_chains() {
        // Lines need not be oriented, only chained.
        let f = fixture(4);
        let lines = vec![f.line(0, 1, 30.0), f.line(2, 1, 40.0), f.line(2, 3, 50.0)];
        let path = Path::new(&f.ids, lines).unwrap();
        assert_eq!(
            path.buses(),
            &[
                f.buses[0].id(),
                f.buses[1].id(),
                f.buses[2].id(),
                f.buses[3].id()
            ]
        );
    }

    #[test]
    fn rejects_circle() {
        let f = fixture(3);
        let lines = vec![f.line(0, 1, 30.0), f.line(1, 2, 40.0), f.line(2, 0, 50.0)];
        let err = Path::new(&f.ids, lines).unwrap_err();
        assert!(matches!(err, Error::Topology(_)));
    }

    #[test]
    fn rejects_unchained_order() {
        let f = fixture(4);
        let lines = vec![f.line(0, 1, 30.0), f.line(2, 3, 40.0), f.line(1, 2, 50.0)];
        assert!(Path::new(&f.ids, lines).is_err());
    }

    #[test]
    fn rejects_doubled_line_pair() {
        // Two lines over the same pair close a two-bus ring.
        let f = fixture(2);
        let lines = vec![f.line(0, 1, 30.0), f.line(0, 1, 35.0)];
        let err = Path::new(&f.ids, lines).unwrap_err();
        assert!(matches!(err, Error::Topology(_)));
    }

    #[test]
    fn rejects_branching_chain() {
        let f = fixture(4);
        let lines = vec![f.line(0, 1, 30.0), f.line(1, 2, 40.0), f.line(1, 3, 50.0)];
        assert!(Path::new(&f.ids, lines).is_err());
    }

    #[test]
    fn rejects_empty_line_list() {
        let f = fixture(1);
        assert!(Path::new(&f.ids, Vec::new()).is_err());
    }

    #[test]
    fn rejects_lasso_shape() {
        // A tail that runs into a loop: bus 1 is visited three times.
        let f = fixture(4);
        let lines = vec![
            f.line(0, 1, 10.0),
            f.line(1, 2, 10.0),
            f.line(2, 3, 10.0),
            f.line(3, 1, 10.0),
        ];
        let err = Path::new(&f.ids, lines).unwrap_err();
        assert!(matches!(err, Error::Topology(_)));
    }
}
