//! s/t max-flow / min-cut over a sparse graph (Dinic's algorithm with an
//! iterative blocking-flow search, so long augmenting paths cannot overflow the stack).
use std::collections::VecDeque;

const NONE: u32 = u32::MAX;
const EPS: f64 = 1e-9;

pub struct FlowGraph {
    node_count: usize,
    source: usize,
    sink: usize,
    head: Vec<u32>,
    next: Vec<u32>,
    to: Vec<u32>,
    cap: Vec<f64>,
}

impl FlowGraph {
    /// Graph with `nodes` inner nodes plus a source and a sink.
    pub fn new(nodes: usize, edge_hint: usize) -> Self {
        let node_count = nodes + 2;
        Self {
            node_count,
            source: nodes,
            sink: nodes + 1,
            head: vec![NONE; node_count],
            next: Vec::with_capacity(edge_hint * 2),
            to: Vec::with_capacity(edge_hint * 2),
            cap: Vec::with_capacity(edge_hint * 2),
        }
    }

    fn push_arc(&mut self, from: usize, to: usize, cap: f64) {
        let id = self.to.len() as u32;
        self.to.push(to as u32);
        self.cap.push(cap);
        self.next.push(self.head[from]);
        self.head[from] = id;
    }

    /// Arc pair `from -> to` with capacity `cap` and `to -> from` with `rev_cap`.
    pub fn add_edge(&mut self, from: usize, to: usize, cap: f64, rev_cap: f64) {
        self.push_arc(from, to, cap);
        self.push_arc(to, from, rev_cap);
    }

    /// Terminal link of a node. Only the difference between the two weights
    /// matters for the cut, so just one of the terminal arcs is created.
    pub fn add_terminal_weights(&mut self, node: usize, source_weight: f64, sink_weight: f64) {
        let delta = source_weight - sink_weight;
        if delta > 0.0 {
            self.add_edge(self.source, node, delta, 0.0);
        } else if delta < 0.0 {
            self.add_edge(node, self.sink, -delta, 0.0);
        }
    }

    fn build_levels(&self, level: &mut [i32], queue: &mut VecDeque<usize>) -> bool {
        level.iter_mut().for_each(|l| *l = -1);
        level[self.source] = 0;
        queue.clear();
        queue.push_back(self.source);
        while let Some(v) = queue.pop_front() {
            let mut e = self.head[v];
            while e != NONE {
                let u = self.to[e as usize] as usize;
                if level[u] < 0 && self.cap[e as usize] > EPS {
                    level[u] = level[v] + 1;
                    queue.push_back(u);
                }
                e = self.next[e as usize];
            }
        }
        level[self.sink] >= 0
    }

    fn blocking_flow(&mut self, level: &mut [i32], current: &mut [u32]) -> f64 {
        let mut total = 0.0;
        let mut path: Vec<u32> = Vec::new();
        let mut v = self.source;

        loop {
            if v == self.sink {
                let bottleneck = path
                    .iter()
                    .map(|&e| self.cap[e as usize])
                    .fold(f64::INFINITY, f64::min);
                for &e in &path {
                    self.cap[e as usize] -= bottleneck;
                    self.cap[(e ^ 1) as usize] += bottleneck;
                }
                total += bottleneck;

                // Resume from the tail of the first saturated arc
                let first_saturated = path
                    .iter()
                    .position(|&e| self.cap[e as usize] <= EPS)
                    .unwrap_or(0);
                v = self.to[(path[first_saturated] ^ 1) as usize] as usize;
                path.truncate(first_saturated);
                continue;
            }

            let mut e = current[v];
            while e != NONE {
                let u = self.to[e as usize] as usize;
                if self.cap[e as usize] > EPS && level[u] == level[v] + 1 {
                    break;
                }
                e = self.next[e as usize];
            }
            current[v] = e;

            if e != NONE {
                path.push(e);
                v = self.to[e as usize] as usize;
            } else {
                // Dead end: prune the node and retreat one arc
                level[v] = -1;
                match path.pop() {
                    Some(back) => {
                        v = self.to[(back ^ 1) as usize] as usize;
                        current[v] = self.next[back as usize];
                    }
                    None => return total,
                }
            }
        }
    }

    /// Run max-flow to completion and return the flow value.
    pub fn max_flow(&mut self) -> f64 {
        let mut level = vec![-1i32; self.node_count];
        let mut current = vec![NONE; self.node_count];
        let mut queue = VecDeque::new();
        let mut flow = 0.0;
        while self.build_levels(&mut level, &mut queue) {
            current.copy_from_slice(&self.head);
            flow += self.blocking_flow(&mut level, &mut current);
        }
        flow
    }

    /// After `max_flow`: the source side of the minimum cut, taken as every inner
    /// node that can no longer reach the sink in the residual graph. Nodes the cut
    /// is indifferent about (no terminal preference, no path to the sink) land on
    /// the source side.
    pub fn source_side(&self) -> Vec<bool> {
        let mut reaches_sink = vec![false; self.node_count];
        let mut queue = VecDeque::new();
        reaches_sink[self.sink] = true;
        queue.push_back(self.sink);
        while let Some(v) = queue.pop_front() {
            let mut e = self.head[v];
            while e != NONE {
                let u = self.to[e as usize] as usize;
                // Paired arc runs u -> v
                if !reaches_sink[u] && self.cap[(e ^ 1) as usize] > EPS {
                    reaches_sink[u] = true;
                    queue.push_back(u);
                }
                e = self.next[e as usize];
            }
        }
        reaches_sink
            .into_iter()
            .take(self.node_count - 2)
            .map(|r| !r)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_chain() {
        let mut g = FlowGraph::new(2, 4);
        g.add_terminal_weights(0, 5.0, 0.0);
        g.add_terminal_weights(1, 0.0, 3.0);
        g.add_edge(0, 1, 4.0, 4.0);
        let flow = g.max_flow();
        assert!((flow - 3.0).abs() < 1e-9);
        let side = g.source_side();
        assert!(side[0]);
        assert!(side[1]);
    }

    #[test]
    fn test_cut_through_weak_link() {
        // source -> 0 -> 1 -> 2 -> sink with a weak middle link
        let mut g = FlowGraph::new(3, 6);
        g.add_terminal_weights(0, 10.0, 0.0);
        g.add_terminal_weights(2, 0.0, 10.0);
        g.add_edge(0, 1, 8.0, 8.0);
        g.add_edge(1, 2, 1.5, 1.5);
        let flow = g.max_flow();
        assert!((flow - 1.5).abs() < 1e-9);
        assert_eq!(g.source_side(), vec![true, true, false]);
    }

    #[test]
    fn test_classic_network() {
        // Two parallel routes that share a cross link
        let mut g = FlowGraph::new(4, 10);
        g.add_terminal_weights(0, 10.0, 0.0);
        g.add_terminal_weights(1, 10.0, 0.0);
        g.add_terminal_weights(2, 0.0, 10.0);
        g.add_terminal_weights(3, 0.0, 10.0);
        g.add_edge(0, 2, 4.0, 0.0);
        g.add_edge(1, 3, 9.0, 0.0);
        g.add_edge(1, 2, 6.0, 0.0);
        g.add_edge(0, 3, 2.0, 0.0);
        let flow = g.max_flow();
        assert!((flow - 16.0).abs() < 1e-9);
        assert_eq!(g.source_side(), vec![true, false, false, false]);
    }

    #[test]
    fn test_opposing_terminal_weights_cancel() {
        let mut g = FlowGraph::new(1, 2);
        g.add_terminal_weights(0, 7.0, 7.0);
        assert_eq!(g.max_flow(), 0.0);
        assert_eq!(g.source_side(), vec![true]);
    }

    #[test]
    fn test_indifferent_nodes_join_source_side() {
        // 0 and 1 have no terminal preference; 2 is pulled to the sink
        let mut g = FlowGraph::new(3, 6);
        g.add_terminal_weights(0, 3.0, 3.0);
        g.add_edge(0, 1, 1.0, 1.0);
        g.add_terminal_weights(2, 0.0, 5.0);
        assert_eq!(g.max_flow(), 0.0);
        assert_eq!(g.source_side(), vec![true, true, false]);
    }
}
