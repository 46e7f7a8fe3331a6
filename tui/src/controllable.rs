//! A value that is either owned by the caller (controlled) or tracked by the
//! component itself (uncontrolled).

/// Controlled/uncontrolled state cell.
///
/// [`Controllable::get`] reports the caller's value whenever one is present,
/// otherwise the shadow copy kept by [`Controllable::set`].
///
/// A cell made with [`Controllable::new`] decides once, at construction,
/// whether it is controlled; later attempts to switch are ignored. A cell made
/// with [`Controllable::following`] re-decides on every
/// [`Controllable::sync_external`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Controllable<T> {
    external: Option<T>,
    shadow: T,
    pinned: bool,
}

impl<T: Clone> Controllable<T> {
    pub fn new(external: Option<T>, initial: T) -> Self {
        let shadow = external.clone().unwrap_or(initial);
        Self {
            external,
            shadow,
            pinned: true,
        }
    }

    /// A cell whose mode tracks the presence of the caller's value.
    pub fn following(external: Option<T>, initial: T) -> Self {
        Self {
            external,
            shadow: initial,
            pinned: false,
        }
    }

    pub fn get(&self) -> &T {
        self.external.as_ref().unwrap_or(&self.shadow)
    }

    pub fn set(&mut self, value: T) {
        self.shadow = value;
    }

    pub fn is_controlled(&self) -> bool {
        self.external.is_some()
    }

    /// Applies the caller's next supplied value.
    ///
    /// Returns `true` when the effective value may have changed.
    pub fn sync_external(&mut self, external: Option<T>) -> bool {
        if !self.pinned {
            let changed = self.external.is_some() || external.is_some();
            self.external = external;
            return changed;
        }
        match (self.external.is_some(), external) {
            (true, Some(value)) => {
                self.external = Some(value);
                true
            }
            (false, None) => false,
            (true, None) => {
                tracing::warn!("ignoring switch from controlled to uncontrolled value");
                false
            }
            (false, Some(_)) => {
                tracing::warn!("ignoring switch from uncontrolled to controlled value");
                false
            }
        }
    }
}
