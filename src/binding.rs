// Program binding state - which program the draw loop currently has bound

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgramBinding {
    current: Option<usize>,
}

impl ProgramBinding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when the binding changed; re-binding the current
    /// program is a no-op
    pub fn bind(&mut self, program: usize) -> bool {
        if self.current == Some(program) {
            return false;
        }
        self.current = Some(program);
        true
    }

    pub fn unbind(&mut self) {
        self.current = None;
    }

    pub fn current(&self) -> Option<usize> {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_unbound() {
        assert_eq!(ProgramBinding::new().current(), None);
    }

    #[test]
    fn test_redundant_binds_are_suppressed() {
        let mut binding = ProgramBinding::new();
        let changes = [2, 2, 3, 2].iter().filter(|&&i| binding.bind(i)).count();
        assert_eq!(changes, 3);
        assert_eq!(binding.current(), Some(2));
    }

    #[test]
    fn test_unbind_resets() {
        let mut binding = ProgramBinding::new();
        assert!(binding.bind(0));
        binding.unbind();
        assert_eq!(binding.current(), None);
        assert!(binding.bind(0));
    }
}
