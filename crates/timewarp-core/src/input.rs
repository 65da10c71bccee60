//! Modifier keys that steer the dilation factor

/// One of the four keys the speed sampler watches
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Modifier {
    RightShift = 0,
    LeftShift = 1,
    RightControl = 2,
    LeftControl = 3,
}

impl Modifier {
    /// All modifiers, in the order their factors are applied
    pub const ALL: [Modifier; 4] = [
        Modifier::RightShift,
        Modifier::LeftShift,
        Modifier::RightControl,
        Modifier::LeftControl,
    ];

    #[inline]
    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// Set of modifiers held at one poll
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ModifierSet(u8);

impl ModifierSet {
    #[inline]
    pub const fn empty() -> Self {
        ModifierSet(0)
    }

    #[inline]
    pub fn contains(self, modifier: Modifier) -> bool {
        self.0 & modifier.bit() != 0
    }

    #[inline]
    pub fn insert(&mut self, modifier: Modifier) {
        self.0 |= modifier.bit();
    }

    #[inline]
    pub fn remove(&mut self, modifier: Modifier) {
        self.0 &= !modifier.bit();
    }

    /// Builder-style insert
    #[inline]
    pub fn with(mut self, modifier: Modifier) -> Self {
        self.insert(modifier);
        self
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Modifier> {
        Modifier::ALL.into_iter().filter(move |m| self.contains(*m))
    }
}

impl FromIterator<Modifier> for ModifierSet {
    fn from_iter<I: IntoIterator<Item = Modifier>>(iter: I) -> Self {
        let mut set = ModifierSet::empty();
        for m in iter {
            set.insert(m);
        }
        set
    }
}

impl std::fmt::Debug for ModifierSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_set_ops() {
        let mut set = ModifierSet::empty();
        assert!(set.is_empty());

        set.insert(Modifier::LeftControl);
        assert!(set.contains(Modifier::LeftControl));
        assert!(!set.contains(Modifier::RightControl));

        set.remove(Modifier::LeftControl);
        assert!(set.is_empty());
    }

    #[test]
    fn test_iter_follows_application_order() {
        let set: ModifierSet = [Modifier::LeftControl, Modifier::RightShift]
            .into_iter()
            .collect();
        let order: Vec<_> = set.iter().collect();
        assert_eq!(order, vec![Modifier::RightShift, Modifier::LeftControl]);
    }
}
