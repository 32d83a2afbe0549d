use std::{collections::VecDeque, iter::Fuse};

/// Buffered look-ahead over any iterator.
///
/// End of input is `None`, never an error; peeking or discarding past the
/// end is harmless.
pub struct LookAhead<I>
where
    I: Iterator,
{
    inner: Fuse<I>,
    peeked: VecDeque<I::Item>,
}

impl<I> LookAhead<I>
where
    I: Iterator,
{
    pub fn new(iterator: I) -> Self {
        Self {
            inner: iterator.fuse(),
            peeked: VecDeque::new(),
        }
    }

    /// The next item, without consuming it.
    pub fn peek(&mut self) -> Option<&I::Item> {
        self.peek_nth(0)
    }

    /// The item `index` positions ahead, without consuming anything. Pulls
    /// from the underlying iterator only as far as it has to.
    pub fn peek_nth(&mut self, index: usize) -> Option<&I::Item> {
        while self.peeked.len() <= index {
            self.peeked.push_back(self.inner.next()?);
        }

        self.peeked.get(index)
    }

    pub fn discard(&mut self, count: usize) {
        for _ in 0..count {
            if self.next().is_none() {
                break;
            }
        }
    }
}

impl<I> LookAhead<I>
where
    I: Iterator,
    I::Item: PartialEq,
{
    /// Consumes `expected` if and only if it is what comes next.
    pub fn eat(&mut self, expected: &[I::Item]) -> bool {
        for (i, want) in expected.iter().enumerate() {
            if self.peek_nth(i) != Some(want) {
                return false;
            }
        }

        self.discard(expected.len());
        true
    }
}

impl<I: Iterator> Iterator for LookAhead<I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(buffered) = self.peeked.pop_front() {
            return Some(buffered);
        }

        self.inner.next()
    }
}
