//! Module implement the skip-list dictionary engine.
//!
//! A probabilistic multi-level forward list. Every node carries a
//! tower of forward links, one per level, drawn uniformly in
//! `1..=max_level` at insert time. Search enters at the header's
//! highest occupied level and drops a level whenever the next node
//! would overshoot, which gives expected O(log n) walks without any
//! rebalancing. Node 0 is the header, it holds no item and its tower
//! grows and shrinks with the tallest live node.

use rand::{rngs::SmallRng, Rng, SeedableRng};

use std::{cmp::Ordering, fmt};

use crate::{dict::Handler, Error, Result};

// arena slot of the header node, never a forward target.
const HEAD: usize = 0;

/// Hard cap on `max_level`, towers beyond this buy nothing.
pub const MAX_LEVEL_LIMIT: usize = 64;

struct Node<T> {
    item: Option<T>,
    forward: Vec<usize>,
}

/// Index type implementing the skip-list engine.
pub struct Index<T, H>
where
    H: Handler<T>,
{
    nodes: Vec<Node<T>>,
    free: Vec<usize>,
    max_level: usize,
    n_count: usize,
    handler: H,
    rng: SmallRng,
}

impl<T, H> Index<T, H>
where
    H: Handler<T>,
{
    /// Create a skip-list with tower height `max_level`, within
    /// `1..=`[MAX_LEVEL_LIMIT]. Level randomness is seeded from
    /// entropy, use [Index::with_seed] for reproducible towers.
    pub fn new(max_level: usize, handler: H) -> Result<Index<T, H>> {
        Index::with_seed(max_level, handler, rand::random::<u64>())
    }

    pub fn with_seed(max_level: usize, handler: H, seed: u64) -> Result<Index<T, H>> {
        if max_level < 1 || max_level > MAX_LEVEL_LIMIT {
            err_at!(InvalidInput, msg: "skiplist max_level {}", max_level)?;
        }

        let head = Node { item: None, forward: vec![0] };
        Ok(Index {
            nodes: vec![head],
            free: Vec::new(),
            max_level,
            n_count: 0,
            handler,
            rng: SmallRng::seed_from_u64(seed),
        })
    }

    /// Insert `item`. If an item with an equal key is present, it is
    /// overwritten in place and returned.
    pub fn insert(&mut self, item: T) -> Option<T> {
        let mut path = Vec::new();
        let cand = {
            let handler = &self.handler;
            self.find_path(&|x| handler.compare(x, &item), &mut path)
        };

        if cand != 0 && self.handler.compare(self.item(cand), &item) == Ordering::Equal {
            let slot = &mut self.nodes[cand].item;
            return Some(std::mem::replace(slot, Some(item)).unwrap());
        }

        let level = self.random_level();
        let height = self.nodes[HEAD].forward.len();
        for _i in height..level {
            // extend the header, new levels enter the path at the head.
            self.nodes[HEAD].forward.push(0);
            path.push(HEAD);
        }

        let id = self.alloc_node(item, level);
        for (i, p) in path.iter().enumerate().take(level) {
            self.nodes[id].forward[i] = self.nodes[*p].forward[i];
            self.nodes[*p].forward[i] = id;
        }

        self.n_count += 1;
        None
    }

    /// Return a borrow of the stored item with key equal to `key`.
    pub fn search(&self, key: &T) -> Option<&T> {
        let handler = &self.handler;
        self.search_with(|x| handler.compare(x, key))
    }

    /// Search by comparator closure, `f` returning `stored.cmp(key)`.
    pub fn search_with<F>(&self, f: F) -> Option<&T>
    where
        F: Fn(&T) -> Ordering,
    {
        let mut cur = HEAD;
        for i in (0..self.nodes[HEAD].forward.len()).rev() {
            loop {
                let next = self.nodes[cur].forward[i];
                if next == 0 {
                    break;
                }
                match f(self.item(next)) {
                    Ordering::Less => cur = next,
                    Ordering::Equal => return Some(self.item(next)),
                    Ordering::Greater => break,
                }
            }
        }
        None
    }

    /// Remove the item with key equal to `key`, return ownership.
    pub fn remove(&mut self, key: &T) -> Option<T> {
        let (cand, path) = {
            let handler = &self.handler;
            let f = |x: &T| handler.compare(x, key);
            let mut path = Vec::new();
            match self.find_path(&f, &mut path) {
                0 => return None,
                c if f(self.item(c)) != Ordering::Equal => return None,
                c => (c, path),
            }
        };
        Some(self.unlink(cand, &path))
    }

    /// Remove by comparator closure, refer [Index::search_with].
    pub fn remove_with<F>(&mut self, f: F) -> Option<T>
    where
        F: Fn(&T) -> Ordering,
    {
        let (cand, path) = {
            let mut path = Vec::new();
            match self.find_path(&f, &mut path) {
                0 => return None,
                c if f(self.item(c)) != Ordering::Equal => return None,
                c => (c, path),
            }
        };
        Some(self.unlink(cand, &path))
    }

    /// Return number of live items.
    #[inline]
    pub fn len(&self) -> usize {
        self.n_count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n_count == 0
    }

    /// Iterate items in comparator order, the level-0 chain.
    pub fn iter(&self) -> Iter<T> {
        Iter { nodes: &self.nodes, cur: self.nodes[HEAD].forward[0] }
    }

    /// Confirm level-0 ordering, per-level forward consistency, the
    /// header height and the live count.
    pub fn validate(&self) -> Result<()>
    where
        T: fmt::Debug,
    {
        let height = self.nodes[HEAD].forward.len();
        if height < 1 || height > self.max_level {
            err_at!(Fatal, msg: "skiplist header height {}", height)?;
        }

        let mut n = 0;
        let mut cur = self.nodes[HEAD].forward[0];
        let mut prev: Option<usize> = None;
        while cur != 0 {
            if let Some(prev) = prev {
                let (a, b) = (self.item(prev), self.item(cur));
                if self.handler.compare(a, b) != Ordering::Less {
                    err_at!(Fatal, msg: "skiplist order {:?} !< {:?}", a, b)?;
                }
            }

            let node = &self.nodes[cur];
            if node.forward.is_empty() || node.forward.len() > self.max_level {
                err_at!(Fatal, msg: "skiplist tower {} at {}", node.forward.len(), cur)?;
            }
            for (i, next) in node.forward.iter().enumerate() {
                if *next == 0 {
                    continue;
                }
                // a forward target must be taller than the level it
                // is reached from, and strictly greater.
                if self.nodes[*next].forward.len() < i + 1 {
                    err_at!(Fatal, msg: "skiplist short tower at {} level {}", next, i)?;
                }
                let (a, b) = (self.item(cur), self.item(*next));
                if self.handler.compare(a, b) != Ordering::Less {
                    err_at!(Fatal, msg: "skiplist forward {:?} !< {:?}", a, b)?;
                }
            }

            prev = Some(cur);
            cur = node.forward[0];
            n += 1;
        }

        if n != self.n_count {
            err_at!(Fatal, msg: "skiplist count {} != {}", n, self.n_count)?;
        }

        Ok(())
    }
}

impl<T, H> Index<T, H>
where
    H: Handler<T>,
{
    #[inline]
    fn item(&self, n: usize) -> &T {
        match &self.nodes[n].item {
            Some(item) => item,
            None => unreachable!(),
        }
    }

    // uniform height in 1..=max_level.
    fn random_level(&mut self) -> usize {
        self.rng.gen_range(1..=self.max_level)
    }

    fn alloc_node(&mut self, item: T, level: usize) -> usize {
        let node = Node { item: Some(item), forward: vec![0; level] };
        match self.free.pop() {
            Some(id) => {
                self.nodes[id] = node;
                id
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    // walk forward at the highest occupied level, dropping a level on
    // overshoot. `path` records the last non-overshooting node per
    // level, the return value is the level-0 candidate.
    fn find_path<F>(&self, f: &F, path: &mut Vec<usize>) -> usize
    where
        F: Fn(&T) -> Ordering,
    {
        let height = self.nodes[HEAD].forward.len();
        path.clear();
        path.resize(height, HEAD);

        let mut cur = HEAD;
        for i in (0..height).rev() {
            loop {
                let next = self.nodes[cur].forward[i];
                if next == 0 {
                    break;
                }
                match f(self.item(next)) {
                    Ordering::Less => cur = next,
                    Ordering::Equal | Ordering::Greater => break,
                }
            }
            path[i] = cur;
        }

        self.nodes[cur].forward[0]
    }

    // splice `cand` out of every level it occupies and recycle it.
    fn unlink(&mut self, cand: usize, path: &[usize]) -> T {
        for i in 0..self.nodes[cand].forward.len() {
            let p = path[i];
            if self.nodes[p].forward[i] == cand {
                self.nodes[p].forward[i] = self.nodes[cand].forward[i];
            }
        }

        let item = match self.nodes[cand].item.take() {
            Some(item) => item,
            None => unreachable!(),
        };
        self.nodes[cand].forward.clear();
        self.free.push(cand);

        // shrink the header while the top level runs empty.
        while self.nodes[HEAD].forward.len() > 1 {
            match self.nodes[HEAD].forward.last() {
                Some(0) => self.nodes[HEAD].forward.pop(),
                _ => break,
            };
        }

        self.n_count -= 1;
        item
    }
}

/// Iterator type, walk the level-0 chain.
pub struct Iter<'a, T> {
    nodes: &'a [Node<T>],
    cur: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.cur == 0 {
            return None;
        }
        let nodes = self.nodes;
        let node = &nodes[self.cur];
        self.cur = node.forward[0];
        node.item.as_ref()
    }
}
