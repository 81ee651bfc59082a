use std::{cmp::Ordering, result};

use crate::btree::NIL;

// Node correspond to a single btree node, leaves keep `childs` empty.
pub struct Node<T> {
    pub items: Vec<T>,
    pub childs: Vec<usize>,
    pub parent: usize,
}

impl<T> Node<T> {
    pub fn leaf(parent: usize) -> Node<T> {
        Node { items: Vec::new(), childs: Vec::new(), parent }
    }

    pub fn new(items: Vec<T>, childs: Vec<usize>, parent: usize) -> Node<T> {
        Node { items, childs, parent }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.childs.is_empty()
    }

    // position of `child` among this node's children.
    pub fn child_index(&self, child: usize) -> usize {
        for (i, c) in self.childs.iter().enumerate() {
            if *c == child {
                return i;
            }
        }
        unreachable!()
    }

    pub fn reset(&mut self) {
        self.items.clear();
        self.childs.clear();
        self.parent = NIL;
    }
}

// Binary search within one node over [first, first+size). On a miss
// the Err carries the child/insert position.
pub fn search_in<T, F>(items: &[T], f: &F) -> result::Result<usize, usize>
where
    F: Fn(&T) -> Ordering,
{
    let (mut first, mut size) = (0, items.len());

    while size > 0 {
        let half = size / 2;
        let mid = first + half;
        match f(&items[mid]) {
            Ordering::Less => {
                first = mid + 1;
                size = size - half - 1;
            }
            Ordering::Greater => size = half,
            Ordering::Equal => return Ok(mid),
        }
    }

    Err(first)
}
