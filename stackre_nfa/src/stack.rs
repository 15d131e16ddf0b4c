/// A Vec-backed stack whose accessors count from the top. Reaching below the
/// bottom is a construction bug, never a user error, so every out-of-range
/// access panics instead of returning an `Option`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stack<T> {
    backing: Vec<T>,
}

impl<T: Copy> Stack<T> {
    pub fn new() -> Stack<T> {
        Stack {
            backing: Vec::new(),
        }
    }

    pub fn with_bottom(bottom: T) -> Stack<T> {
        Stack {
            backing: vec![bottom],
        }
    }

    pub fn push(&mut self, item: T) {
        self.backing.push(item);
    }

    pub fn pop(&mut self) -> T {
        match self.backing.pop() {
            Some(item) => item,
            None => panic!("stack underflow: pop on an empty stack"),
        }
    }

    /// Drops the `n` topmost items.
    pub fn pop_n(&mut self, n: usize) {
        let len = self.backing.len();
        if n > len {
            panic!("stack underflow: cannot pop {} of {} items", n, len);
        }
        self.backing.truncate(len - n);
    }

    pub fn top(&self) -> T {
        self.back(1)
    }

    /// Returns the item `n` positions from the top, where `back(1)` is the
    /// top itself.
    pub fn back(&self, n: usize) -> T {
        let len = self.backing.len();
        if n == 0 || n > len {
            panic!("stack index -{} is out of bounds for length {}", n, len);
        }
        self.backing[len - n]
    }

    pub fn replace_top(&mut self, item: T) {
        match self.backing.last_mut() {
            Some(top) => *top = item,
            None => panic!("stack underflow: replace on an empty stack"),
        }
    }

    pub fn len(&self) -> usize {
        self.backing.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backing.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.backing.iter()
    }
}

impl<T: Copy> Default for Stack<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple() {
        let mut s = Stack::<u64>::with_bottom(0);
        assert_eq!(s.top(), 0);

        s.push(1);
        s.push(2);
        assert_eq!(s.len(), 3);
        assert_eq!(s.back(1), 2);
        assert_eq!(s.back(3), 0);

        s.replace_top(7);
        assert_eq!(s.pop(), 7);

        s.pop_n(2);
        assert!(s.is_empty());
    }

    #[test]
    #[should_panic(expected = "stack underflow")]
    fn test_pop_n_underflow() {
        let mut s = Stack::<u64>::with_bottom(0);
        s.pop_n(2);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_back_out_of_bounds() {
        let s = Stack::<u64>::with_bottom(0);
        s.back(2);
    }
}
