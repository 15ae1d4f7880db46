/// Tracks which question is on screen.
///
/// Out-of-range moves are ignored rather than reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Navigator {
    current: usize,
    len: usize,
}

impl Navigator {
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self { current: 0, len }
    }

    #[must_use]
    pub fn current(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn is_first(&self) -> bool {
        self.current == 0
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        self.current + 1 >= self.len
    }

    /// Moves forward one question. Returns `false` at the last question.
    pub fn next(&mut self) -> bool {
        if self.is_last() {
            return false;
        }
        self.current += 1;
        true
    }

    /// Moves back one question. Returns `false` at the first question.
    pub fn previous(&mut self) -> bool {
        if self.is_first() {
            return false;
        }
        self.current -= 1;
        true
    }

    /// Jumps to `index` if it names a question; negative or too-large
    /// indexes leave the position unchanged.
    pub fn jump_to(&mut self, index: i64) -> bool {
        match usize::try_from(index) {
            Ok(i) if i < self.len => {
                self.current = i;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_saturates_at_last_question() {
        let mut nav = Navigator::new(3);
        assert!(nav.next());
        assert!(nav.next());
        assert!(!nav.next());
        assert_eq!(nav.current(), 2);
        assert!(nav.is_last());
    }

    #[test]
    fn previous_saturates_at_zero() {
        let mut nav = Navigator::new(3);
        assert!(!nav.previous());
        nav.next();
        assert!(nav.previous());
        assert_eq!(nav.current(), 0);
    }

    #[test]
    fn jump_rejects_out_of_range() {
        let mut nav = Navigator::new(4);
        assert!(nav.jump_to(2));
        assert_eq!(nav.current(), 2);

        assert!(!nav.jump_to(-1));
        assert!(!nav.jump_to(4));
        assert!(!nav.jump_to(i64::MAX));
        assert_eq!(nav.current(), 2);
    }

    #[test]
    fn empty_navigator_never_moves() {
        let mut nav = Navigator::new(0);
        assert!(nav.is_empty());
        assert!(!nav.next());
        assert!(!nav.previous());
        assert!(!nav.jump_to(0));
        assert_eq!(nav.current(), 0);
    }
}
