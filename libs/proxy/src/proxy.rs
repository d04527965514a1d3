//! The transparent lazy proxy.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Deref, DerefMut};

use once_cell::sync::OnceCell;
use serde::{Deserialize, Deserializer as SerdeDeserializer, Serialize, Serializer};

use crate::factory::ProxyFactory;

/// Cached answers to introspection-style queries, stapled on at construction
/// time so a handful of cheap queries don't force resolution.
///
/// Mirrors the Python proxy's "cached defaults" for hash/bool/length: when a
/// producer already knows e.g. the length of the object it is about to
/// proxy, it can avoid a round-trip through `resolve()` purely to answer
/// `len(proxy)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProxyHints {
    pub len: Option<usize>,
    pub is_truthy: Option<bool>,
}

/// A by-value handle that behaves like the object returned by its
/// [`ProxyFactory`], materializing that object at-most-once on first use.
///
/// `Proxy<F>` is itself the unit of serialization: serializing a proxy
/// serializes only `F`, never the resolved target (spec §4.1, "Serialization
/// contract"). Deserializing produces a proxy with an empty target slot;
/// resolution is deferred until the first operation that needs it.
pub struct Proxy<F: ProxyFactory> {
    factory: F,
    cell: OnceCell<F::Target>,
    hints: ProxyHints,
}

impl<F: ProxyFactory> Proxy<F> {
    /// Construct a proxy that will resolve lazily through `factory`.
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            cell: OnceCell::new(),
            hints: ProxyHints::default(),
        }
    }

    /// Construct a proxy with hints that let a handful of introspection
    /// queries (`len`, `is_truthy`) avoid forcing resolution.
    pub fn with_hints(factory: F, hints: ProxyHints) -> Self {
        Self {
            factory,
            cell: OnceCell::new(),
            hints,
        }
    }

    /// Construct a proxy with a pre-populated target, e.g. so the producing
    /// side does not pay for an immediate resolve. Does not change the
    /// serialization contract: serializing still only emits the factory.
    pub fn with_target(factory: F, target: F::Target) -> Self {
        let cell = OnceCell::new();
        // infallible: cell was just created empty.
        let _ = cell.set(target);
        Self {
            factory,
            cell,
            hints: ProxyHints::default(),
        }
    }

    /// Whether the factory has already been invoked for this instance.
    pub fn is_resolved(&self) -> bool {
        self.cell.get().is_some()
    }

    /// The factory backing this proxy, without forcing resolution.
    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Hints stapled on at construction time.
    pub fn hints(&self) -> &ProxyHints {
        &self.hints
    }

    /// Resolve the target, calling the factory at most once, without
    /// panicking on failure.
    pub fn try_resolve(&self) -> Result<&F::Target, F::Error> {
        self.cell.get_or_try_init(|| self.factory.resolve())
    }

    /// Force resolution, panicking if the factory fails. Backs `Deref`.
    fn force(&self) -> &F::Target {
        match self.try_resolve() {
            Ok(t) => t,
            Err(e) => panic!("proxy resolution failed: {e}"),
        }
    }

    fn force_mut(&mut self) -> &mut F::Target {
        if self.cell.get().is_none() {
            match self.factory.resolve() {
                Ok(t) => {
                    let _ = self.cell.set(t);
                }
                Err(e) => panic!("proxy resolution failed: {e}"),
            }
        }
        self.cell.get_mut().expect("resolved above")
    }

    /// Length without forcing resolution, if a hint was stapled on;
    /// otherwise forces and delegates to the target's own length.
    pub fn len_hint(&self) -> Option<usize> {
        self.hints.len
    }
}

impl<F: ProxyFactory> Deref for Proxy<F> {
    type Target = F::Target;

    fn deref(&self) -> &Self::Target {
        self.force()
    }
}

impl<F: ProxyFactory> DerefMut for Proxy<F> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.force_mut()
    }
}

impl<F: ProxyFactory> fmt::Debug for Proxy<F>
where
    F::Target: fmt::Debug,
{
    /// Does not force resolution: an unresolved proxy prints as such rather
    /// than materializing its target purely for a debug print.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.get() {
            Some(target) => f.debug_tuple("Proxy").field(target).finish(),
            None => write!(f, "Proxy(<unresolved: {:?}>)", self.factory),
        }
    }
}

impl<F: ProxyFactory> fmt::Display for Proxy<F>
where
    F::Target: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.force(), f)
    }
}

impl<F: ProxyFactory> PartialEq for Proxy<F>
where
    F::Target: PartialEq,
{
    /// A proxy compares equal to another proxy iff their targets compare
    /// equal, holding even when either side is itself wrapped by another
    /// proxy.
    fn eq(&self, other: &Self) -> bool {
        self.force() == other.force()
    }
}

impl<F: ProxyFactory> Eq for Proxy<F> where F::Target: Eq {}

impl<F: ProxyFactory> PartialOrd for Proxy<F>
where
    F::Target: PartialOrd,
{
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.force().partial_cmp(other.force())
    }
}

impl<F: ProxyFactory> Ord for Proxy<F>
where
    F::Target: Ord,
{
    fn cmp(&self, other: &Self) -> Ordering {
        self.force().cmp(other.force())
    }
}

impl<F: ProxyFactory> Hash for Proxy<F>
where
    F::Target: Hash,
{
    /// Hashing delegates to the target, per spec §4.1.
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.force().hash(state)
    }
}

impl<F: ProxyFactory + Serialize> Serialize for Proxy<F> {
    /// A proxy serializes to its factory only; the resolved target, if any,
    /// is never serialized.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.factory.serialize(serializer)
    }
}

impl<'de, F: ProxyFactory + Deserialize<'de>> Deserialize<'de> for Proxy<F> {
    /// Deserializing a proxy yields an empty target slot; resolution is
    /// deferred until first use.
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: SerdeDeserializer<'de>,
    {
        let factory = F::deserialize(deserializer)?;
        Ok(Proxy::new(factory))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize as SDe, Serialize as SSer};
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use std::sync::Arc;

    #[derive(Debug, Clone, SSer, SDe)]
    struct ConstFactory {
        value: Vec<i32>,
        #[serde(skip)]
        calls: Arc<AtomicUsize>,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("const factory never fails")]
    struct Never;

    impl ProxyFactory for ConstFactory {
        type Target = Vec<i32>;
        type Error = Never;

        fn resolve(&self) -> Result<Self::Target, Self::Error> {
            self.calls.fetch_add(1, AtomicOrdering::SeqCst);
            Ok(self.value.clone())
        }
    }

    fn factory(value: Vec<i32>) -> (ConstFactory, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            ConstFactory {
                value,
                calls: calls.clone(),
            },
            calls,
        )
    }

    #[test]
    fn resolves_at_most_once() {
        let (f, calls) = factory(vec![1, 2, 3]);
        let p = Proxy::new(f);
        assert!(!p.is_resolved());
        assert_eq!(&*p, &vec![1, 2, 3]);
        assert_eq!(&*p, &vec![1, 2, 3]);
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 1);
        assert!(p.is_resolved());
    }

    #[test]
    fn equality_delegates_to_target() {
        let (f, _) = factory(vec![1, 2, 3]);
        let p = Proxy::new(f);
        assert_eq!(*p, vec![1, 2, 3]);
    }

    #[test]
    fn equality_through_nested_proxy() {
        let (inner_factory, _) = factory(vec![9, 9]);
        let (outer_factory, _) = factory(vec![9, 9]);
        let inner = Proxy::new(inner_factory);
        let outer = Proxy::new(outer_factory);
        assert_eq!(inner, outer);
    }

    #[test]
    fn serialize_round_trip_does_not_resolve() {
        let (f, calls) = factory(vec![4, 5, 6]);
        let p = Proxy::new(f);
        let bytes = bincode::serialize(&p).unwrap();
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 0);

        let q: Proxy<ConstFactory> = bincode::deserialize(&bytes).unwrap();
        assert!(!q.is_resolved());
        assert_eq!(q.factory().calls.load(AtomicOrdering::SeqCst), 0);
        assert_eq!(*q, vec![4, 5, 6]);
        assert!(q.is_resolved());
    }

    #[test]
    fn construction_with_target_skips_resolve() {
        let (f, calls) = factory(vec![7]);
        let p = Proxy::with_target(f, vec![7]);
        assert!(p.is_resolved());
        assert_eq!(*p, vec![7]);
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 0);
    }

    #[test]
    fn deref_mut_allows_in_place_mutation() {
        let (f, _) = factory(vec![1]);
        let mut p = Proxy::new(f);
        p.push(2);
        assert_eq!(*p, vec![1, 2]);
    }

    #[test]
    fn debug_does_not_force_resolution() {
        let (f, calls) = factory(vec![1, 2]);
        let p = Proxy::new(f);
        let _ = format!("{:?}", p);
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 0);
    }
}
