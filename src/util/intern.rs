use std::{collections::HashMap, fmt, hash::Hash, marker::PhantomData, num::NonZeroU32, rc::Rc};

/// A handle to some interned value of type `T`. To retrieve a `&T`, use
/// [`Interner::get`].
///
/// Handles are only meaningful for the interner which produced them.
pub struct Interned<T: ?Sized> {
    // Zero is never a valid handle, which gives `Option<Interned<_>>` the same
    // size as the handle itself.
    handle: NonZeroU32,
    _ty: PhantomData<fn() -> Rc<T>>,
}

impl<T: ?Sized> Interned<T> {
    pub(crate) const fn unchecked_new(handle: NonZeroU32) -> Self {
        Interned {
            handle,
            _ty: PhantomData,
        }
    }

    /// Builds a handle from its raw 1-based index. Used to declare the
    /// pre-interned builtin names as constants.
    pub(crate) const fn from_raw(raw: u32) -> Self {
        match NonZeroU32::new(raw) {
            Some(handle) => Self::unchecked_new(handle),
            None => panic!("interned handles start at one"),
        }
    }

    fn index(self) -> usize {
        self.handle.get() as usize - 1
    }
}

impl<T: ?Sized> Copy for Interned<T> {}

impl<T: ?Sized> Clone for Interned<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> PartialEq for Interned<T> {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl<T: ?Sized> Eq for Interned<T> {}

impl<T: ?Sized> Hash for Interned<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.handle.hash(state);
    }
}

impl<T: ?Sized> PartialOrd for Interned<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: ?Sized> Ord for Interned<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.handle.cmp(&other.handle)
    }
}

impl<T: ?Sized> fmt::Debug for Interned<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Interned({})", self.handle)
    }
}

impl<T: ?Sized> From<&Interned<T>> for Interned<T> {
    fn from(value: &Interned<T>) -> Self {
        *value
    }
}

/// Deduplicating storage for names. Each distinct value is stored once and
/// handles are assigned in insertion order, starting at one.
pub struct Interner<T: ?Sized> {
    handles: HashMap<Rc<T>, Interned<T>>,
    values: Vec<Rc<T>>,
}

impl<T> fmt::Debug for Interner<T>
where
    T: ?Sized + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.values.iter().enumerate().map(|(i, v)| (i + 1, v)))
            .finish()
    }
}

impl<T: ?Sized> Interner<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Interner {
            handles: HashMap::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Interns the provided value, returning a handle which can be used to
    /// retrieve it later. Interning an already known value returns the
    /// previous handle.
    pub fn intern(&mut self, value: &T) -> Interned<T>
    where
        T: Eq + Hash + ToOwned,
        T::Owned: Into<Rc<T>>,
    {
        if let Some(handle) = self.handles.get(value) {
            return *handle;
        }
        let raw = u32::try_from(self.values.len() + 1).expect("interner out of capacity");
        let handle = Interned::from_raw(raw);
        let key: Rc<T> = value.to_owned().into();
        self.values.push(Rc::clone(&key));
        self.handles.insert(key, handle);
        handle
    }

    /// Returns the handle of an already interned value, without interning it.
    pub fn lookup(&self, value: &T) -> Option<Interned<T>>
    where
        T: Eq + Hash,
    {
        self.handles.get(value).copied()
    }

    /// Returns the corresponding value for the provided [`Interned`] handle.
    /// Panics if the handle was not produced by this interner.
    pub fn get(&self, handle: impl Into<Interned<T>>) -> &T {
        &self.values[handle.into().index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interner() {
        let mut i = Interner::<str>::with_capacity(3);

        let counter = i.intern("counter");
        let reset = i.intern("reset");
        let print = i.intern("print");
        assert_eq!(i.len(), 3);

        assert_eq!(i.intern("counter"), counter);
        assert_eq!(i.intern("reset"), reset);
        assert_eq!(i.intern("print"), print);
        assert_eq!(i.len(), 3);

        assert_eq!(i.get(counter), "counter");
        assert_eq!(i.get(&reset), "reset");
        assert_ne!(counter, reset);
    }

    #[test]
    fn handles_follow_insertion_order() {
        let mut i = Interner::<str>::with_capacity(2);
        assert!(i.is_empty());
        assert_eq!(i.intern("a"), Interned::from_raw(1));
        assert_eq!(i.intern("b"), Interned::from_raw(2));
        assert_eq!(i.lookup("b"), Some(Interned::from_raw(2)));
        assert_eq!(i.lookup("c"), None);
    }
}
