use std::{cmp::Ordering, fmt, mem};

use crate::{
    dict::{Depth, Handler},
    rbt::{Node, Stats, NIL},
    Error, Result,
};

/// Index type implementing the red-black-tree engine.
///
/// Balanced lookups and mutations in O(log n), at the cost of the
/// recolor/rotate fixup passes. The sentinel encoding keeps those
/// passes free of nil checks, refer to the module documentation.
pub struct Index<T, H>
where
    H: Handler<T>,
{
    nodes: Vec<Node<T>>,
    free: Vec<usize>,
    n_count: usize,
    handler: H,
}

impl<T, H> Index<T, H>
where
    H: Handler<T>,
{
    pub fn new(handler: H) -> Index<T, H> {
        Index {
            nodes: vec![Node::sentinel()],
            free: Vec::new(),
            n_count: 0,
            handler,
        }
    }

    /// Insert `item`. If an item with an equal key is present, it is
    /// overwritten in place and returned.
    pub fn insert(&mut self, item: T) -> Option<T> {
        // bst descent from the real root, tracking the attach point.
        let (mut parent, mut attach_left) = (NIL, false);
        let mut cur = self.nodes[NIL].right;
        while cur != NIL {
            match self.handler.compare(self.item(cur), &item) {
                Ordering::Greater => {
                    parent = cur;
                    attach_left = true;
                    cur = self.nodes[cur].left;
                }
                Ordering::Less => {
                    parent = cur;
                    attach_left = false;
                    cur = self.nodes[cur].right;
                }
                Ordering::Equal => {
                    let slot = &mut self.nodes[cur].item;
                    return Some(mem::replace(slot, Some(item)).unwrap());
                }
            }
        }

        let id = self.alloc_node(item, parent);
        if parent == NIL {
            self.nodes[NIL].right = id;
        } else if attach_left {
            self.nodes[parent].left = id;
        } else {
            self.nodes[parent].right = id;
        }

        self.insert_fixup(id);
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
        let mut cur = self.nodes[NIL].right;
        while cur != NIL {
            cur = match f(self.item(cur)) {
                Ordering::Greater => self.nodes[cur].left,
                Ordering::Less => self.nodes[cur].right,
                Ordering::Equal => return Some(self.item(cur)),
            };
        }
        None
    }

    /// Remove the item with key equal to `key`, return ownership.
    pub fn remove(&mut self, key: &T) -> Option<T> {
        let mut cur = self.nodes[NIL].right;
        while cur != NIL {
            cur = match self.handler.compare(self.item(cur), key) {
                Ordering::Greater => self.nodes[cur].left,
                Ordering::Less => self.nodes[cur].right,
                Ordering::Equal => return Some(self.remove_at(cur)),
            };
        }
        None
    }

    /// Remove by comparator closure, refer [Index::search_with].
    pub fn remove_with<F>(&mut self, f: F) -> Option<T>
    where
        F: Fn(&T) -> Ordering,
    {
        let mut cur = self.nodes[NIL].right;
        while cur != NIL {
            cur = match f(self.item(cur)) {
                Ordering::Greater => self.nodes[cur].left,
                Ordering::Less => self.nodes[cur].right,
                Ordering::Equal => return Some(self.remove_at(cur)),
            };
        }
        None
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

    /// Iterate items in comparator order, walking successor links.
    pub fn iter(&self) -> Iter<T> {
        let cur = leftmost(&self.nodes, self.nodes[NIL].right);
        Iter { nodes: &self.nodes, cur }
    }

    pub fn to_stats(&self) -> Stats {
        Stats {
            n_count: self.n_count,
            n_free: self.free.len(),
            node_size: mem::size_of::<Node<T>>(),
            blacks: None,
            depths: None,
        }
    }

    /// Verifier for the tree invariants. Checks parent back-links,
    /// node colors, black root and sentinel, absence of red-red
    /// chains and equal black count on every root-to-sentinel path.
    /// Returns [Stats] with `blacks` and `depths` populated.
    pub fn validate(&self) -> Result<Stats>
    where
        T: fmt::Debug,
    {
        let root = self.nodes[NIL].right;

        if !self.nodes[NIL].black {
            err_at!(Fatal, msg: "rbt sentinel is red")?;
        }
        if self.nodes[NIL].left != NIL {
            err_at!(Fatal, msg: "rbt sentinel left {}", self.nodes[NIL].left)?;
        }
        if !self.nodes[root].black {
            err_at!(Fatal, msg: "rbt root is red")?;
        }

        let mut depths = Depth::default();
        let (blacks, count) =
            self.validate_tree(root, NIL, false, 1, &mut depths)?;
        if count != self.n_count {
            err_at!(Fatal, msg: "rbt count {} != {}", count, self.n_count)?;
        }

        let mut stats = self.to_stats();
        stats.blacks = Some(blacks);
        stats.depths = Some(depths);
        Ok(stats)
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

    #[inline]
    fn is_red(&self, n: usize) -> bool {
        !self.nodes[n].black
    }

    fn alloc_node(&mut self, item: T, parent: usize) -> usize {
        match self.free.pop() {
            Some(id) => {
                self.nodes[id] = Node::red(item, parent);
                id
            }
            None => {
                self.nodes.push(Node::red(item, parent));
                self.nodes.len() - 1
            }
        }
    }

    fn free_node(&mut self, id: usize) {
        let node = &mut self.nodes[id];
        node.item = None;
        node.left = NIL;
        node.right = NIL;
        node.parent = NIL;
        node.black = true;
        self.free.push(id);
    }

    // The generic re-parent arm also covers the root, the sentinel's
    // left is itself so a root `x` never matches it and the new node
    // lands on sentinel.right.
    fn rotate_left(&mut self, x: usize) {
        let y = self.nodes[x].right;
        let yl = self.nodes[y].left;

        self.nodes[x].right = yl;
        if yl != NIL {
            self.nodes[yl].parent = x;
        }

        let xp = self.nodes[x].parent;
        self.nodes[y].parent = xp;
        if x == self.nodes[xp].left {
            self.nodes[xp].left = y;
        } else {
            self.nodes[xp].right = y;
        }

        self.nodes[y].left = x;
        self.nodes[x].parent = y;
    }

    fn rotate_right(&mut self, x: usize) {
        let y = self.nodes[x].left;
        let yr = self.nodes[y].right;

        self.nodes[x].left = yr;
        if yr != NIL {
            self.nodes[yr].parent = x;
        }

        let xp = self.nodes[x].parent;
        self.nodes[y].parent = xp;
        if x == self.nodes[xp].left {
            self.nodes[xp].left = y;
        } else {
            self.nodes[xp].right = y;
        }

        self.nodes[y].right = x;
        self.nodes[x].parent = y;
    }

    fn insert_fixup(&mut self, mut x: usize) {
        while self.is_red(self.nodes[x].parent) {
            let p = self.nodes[x].parent;
            let g = self.nodes[p].parent;

            if p == self.nodes[g].left {
                let u = self.nodes[g].right;
                if self.is_red(u) {
                    self.nodes[p].set_black();
                    self.nodes[u].set_black();
                    self.nodes[g].set_red();
                    x = g;
                } else {
                    if x == self.nodes[p].right {
                        // inner child, align into the outer shape.
                        x = p;
                        self.rotate_left(x);
                    }
                    let p = self.nodes[x].parent;
                    let g = self.nodes[p].parent;
                    self.nodes[p].set_black();
                    self.nodes[g].set_red();
                    self.rotate_right(g);
                }
            } else {
                let u = self.nodes[g].left;
                if self.is_red(u) {
                    self.nodes[p].set_black();
                    self.nodes[u].set_black();
                    self.nodes[g].set_red();
                    x = g;
                } else {
                    if x == self.nodes[p].left {
                        x = p;
                        self.rotate_right(x);
                    }
                    let p = self.nodes[x].parent;
                    let g = self.nodes[p].parent;
                    self.nodes[p].set_black();
                    self.nodes[g].set_red();
                    self.rotate_left(g);
                }
            }
        }

        let root = self.nodes[NIL].right;
        self.nodes[root].set_black();
        self.nodes[NIL].set_black();
    }

    fn remove_at(&mut self, z: usize) -> T {
        let y = if self.nodes[z].left != NIL && self.nodes[z].right != NIL {
            // two real children, swap the successor's item into z and
            // splice out the successor instead.
            let mut y = self.nodes[z].right;
            while self.nodes[y].left != NIL {
                y = self.nodes[y].left;
            }
            let item = self.nodes[y].item.take();
            self.nodes[y].item = mem::replace(&mut self.nodes[z].item, item);
            y
        } else {
            z
        };
        let old = self.nodes[y].item.take().unwrap();

        // y has at most one real child, splice it into y's slot. The
        // sentinel's parent is scribbled on when the child is nil,
        // remove_fixup reads it right back.
        let x = if self.nodes[y].left != NIL {
            self.nodes[y].left
        } else {
            self.nodes[y].right
        };
        let yp = self.nodes[y].parent;
        self.nodes[x].parent = yp;
        if y == self.nodes[yp].left {
            self.nodes[yp].left = x;
        } else {
            self.nodes[yp].right = x;
        }

        if self.nodes[y].black {
            self.remove_fixup(x);
        }

        self.free_node(y);
        self.nodes[NIL].parent = NIL;
        self.nodes[NIL].set_black();
        self.n_count -= 1;

        old
    }

    fn remove_fixup(&mut self, mut x: usize) {
        while x != self.nodes[NIL].right && !self.is_red(x) {
            let p = self.nodes[x].parent;
            if x == self.nodes[p].left {
                let mut w = self.nodes[p].right;
                if self.is_red(w) {
                    self.nodes[w].set_black();
                    self.nodes[p].set_red();
                    self.rotate_left(p);
                    w = self.nodes[p].right;
                }
                let (wl, wr) = (self.nodes[w].left, self.nodes[w].right);
                if !self.is_red(wl) && !self.is_red(wr) {
                    self.nodes[w].set_red();
                    x = p;
                } else {
                    if !self.is_red(wr) {
                        self.nodes[wl].set_black();
                        self.nodes[w].set_red();
                        self.rotate_right(w);
                        w = self.nodes[p].right;
                    }
                    self.nodes[w].black = self.nodes[p].black;
                    self.nodes[p].set_black();
                    let wr = self.nodes[w].right;
                    self.nodes[wr].set_black();
                    self.rotate_left(p);
                    x = self.nodes[NIL].right;
                }
            } else {
                let mut w = self.nodes[p].left;
                if self.is_red(w) {
                    self.nodes[w].set_black();
                    self.nodes[p].set_red();
                    self.rotate_right(p);
                    w = self.nodes[p].left;
                }
                let (wl, wr) = (self.nodes[w].left, self.nodes[w].right);
                if !self.is_red(wl) && !self.is_red(wr) {
                    self.nodes[w].set_red();
                    x = p;
                } else {
                    if !self.is_red(wl) {
                        self.nodes[wr].set_black();
                        self.nodes[w].set_red();
                        self.rotate_left(w);
                        w = self.nodes[p].left;
                    }
                    self.nodes[w].black = self.nodes[p].black;
                    self.nodes[p].set_black();
                    let wl = self.nodes[w].left;
                    self.nodes[wl].set_black();
                    self.rotate_right(p);
                    x = self.nodes[NIL].right;
                }
            }
        }
        self.nodes[x].set_black();
    }

    fn validate_tree(
        &self,
        n: usize,
        parent: usize,
        parent_red: bool,
        depth: usize,
        depths: &mut Depth,
    ) -> Result<(usize, usize)>
    where
        T: fmt::Debug,
    {
        if n == NIL {
            depths.sample(depth);
            return Ok((1, 0));
        }

        let node = &self.nodes[n];
        if node.parent != parent {
            err_at!(Fatal, msg: "rbt parent link {} at {}", node.parent, n)?;
        }
        if node.item.is_none() {
            err_at!(Fatal, msg: "rbt item-less node {} in tree", n)?;
        }

        let red = !node.black;
        if red && parent_red {
            err_at!(Fatal, msg: "rbt red-red chain at {:?}", self.item(n))?;
        }

        if node.left != NIL {
            let (l, c) = (self.item(node.left), self.item(n));
            if self.handler.compare(l, c) != Ordering::Less {
                err_at!(Fatal, msg: "rbt left {:?} !< {:?}", l, c)?;
            }
        }
        if node.right != NIL {
            let (c, r) = (self.item(n), self.item(node.right));
            if self.handler.compare(c, r) != Ordering::Less {
                err_at!(Fatal, msg: "rbt right {:?} !> {:?}", r, c)?;
            }
        }

        let (lb, lc) = self.validate_tree(node.left, n, red, depth + 1, depths)?;
        let (rb, rc) = self.validate_tree(node.right, n, red, depth + 1, depths)?;
        if lb != rb {
            err_at!(Fatal, msg: "rbt unbalanced blacks l:{} r:{}", lb, rb)?;
        }

        let blacks = lb + if node.black { 1 } else { 0 };
        Ok((blacks, lc + rc + 1))
    }
}

fn leftmost<T>(nodes: &[Node<T>], mut n: usize) -> usize {
    if n == NIL {
        return NIL;
    }
    while nodes[n].left != NIL {
        n = nodes[n].left;
    }
    n
}

fn successor<T>(nodes: &[Node<T>], mut n: usize) -> usize {
    if nodes[n].right != NIL {
        return leftmost(nodes, nodes[n].right);
    }
    let mut p = nodes[n].parent;
    while p != NIL && n == nodes[p].right {
        n = p;
        p = nodes[p].parent;
    }
    p
}

/// Iterator type, to do full scans in comparator order.
pub struct Iter<'a, T> {
    nodes: &'a [Node<T>],
    cur: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.cur == NIL {
            return None;
        }
        let nodes = self.nodes;
        let item = match &nodes[self.cur].item {
            Some(item) => item,
            None => unreachable!(),
        };
        self.cur = successor(nodes, self.cur);
        Some(item)
    }
}

#[cfg(test)]
#[path = "index_test.rs"]
mod index_test;
