//! Index-addressed linked sequence
//!
//! Outline building and edge splitting insert points next to an existing
//! one while walking. Nodes live in a growable arena and link to each other
//! by index, so inserting never moves existing entries and a handle returned
//! by an insert stays valid for the life of the list.

#[derive(Debug, Clone)]
struct Node<T> {
    value: T,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Ordered sequence with O(1) insertion next to any node
#[derive(Debug, Clone)]
pub struct LinkedPoints<T> {
    nodes: Vec<Node<T>>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl<T> Default for LinkedPoints<T> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            head: None,
            tail: None,
        }
    }
}

impl<T> LinkedPoints<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, handle: usize) -> &T {
        &self.nodes[handle].value
    }

    pub fn first(&self) -> Option<&T> {
        self.head.map(|h| &self.nodes[h].value)
    }

    pub fn last(&self) -> Option<&T> {
        self.tail.map(|t| &self.nodes[t].value)
    }

    /// Append at the end, returns the new node's handle
    pub fn push_back(&mut self, value: T) -> usize {
        let handle = self.nodes.len();
        self.nodes.push(Node {
            value,
            prev: self.tail,
            next: None,
        });
        match self.tail {
            Some(tail) => self.nodes[tail].next = Some(handle),
            None => self.head = Some(handle),
        }
        self.tail = Some(handle);
        handle
    }

    /// Insert directly after `anchor`
    pub fn insert_after(&mut self, anchor: usize, value: T) -> usize {
        let handle = self.nodes.len();
        let next = self.nodes[anchor].next;
        self.nodes.push(Node {
            value,
            prev: Some(anchor),
            next,
        });
        self.nodes[anchor].next = Some(handle);
        match next {
            Some(next) => self.nodes[next].prev = Some(handle),
            None => self.tail = Some(handle),
        }
        handle
    }

    /// Insert directly before `anchor`
    pub fn insert_before(&mut self, anchor: usize, value: T) -> usize {
        let handle = self.nodes.len();
        let prev = self.nodes[anchor].prev;
        self.nodes.push(Node {
            value,
            prev,
            next: Some(anchor),
        });
        self.nodes[anchor].prev = Some(handle);
        match prev {
            Some(prev) => self.nodes[prev].next = Some(handle),
            None => self.head = Some(handle),
        }
        handle
    }

    /// Values in list order
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        std::iter::successors(self.head, move |&h| self.nodes[h].next).map(move |h| &self.nodes[h].value)
    }

    /// Values in reverse list order
    pub fn iter_rev(&self) -> impl Iterator<Item = &T> + '_ {
        std::iter::successors(self.tail, move |&h| self.nodes[h].prev).map(move |h| &self.nodes[h].value)
    }
}

impl<T: Clone> LinkedPoints<T> {
    /// Flatten into a vector in list order
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_after_and_before() {
        let mut list = LinkedPoints::new();
        let a = list.push_back(1);
        let c = list.push_back(3);
        list.insert_after(a, 2);
        list.insert_before(a, 0);
        let d = list.insert_after(c, 4);
        list.insert_before(d, 35);
        assert_eq!(list.to_vec(), vec![0, 1, 2, 3, 35, 4]);
        assert_eq!(list.first(), Some(&0));
        assert_eq!(list.last(), Some(&4));
        assert_eq!(list.len(), 6);
    }

    #[test]
    fn test_reverse_iteration() {
        let mut list = LinkedPoints::new();
        let a = list.push_back('a');
        list.insert_after(a, 'b');
        list.push_back('c');
        assert_eq!(list.iter_rev().copied().collect::<String>(), "cba");
    }

    #[test]
    fn test_handles_stay_valid() {
        let mut list = LinkedPoints::new();
        let first = list.push_back(10);
        for i in 0..5 {
            list.insert_after(first, i);
        }
        assert_eq!(*list.get(first), 10);
        assert_eq!(list.to_vec(), vec![10, 4, 3, 2, 1, 0]);
    }
}
